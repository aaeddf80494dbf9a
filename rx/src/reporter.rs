use std::any::Any;
use std::sync::{Arc, RwLock};

/// Which notification left an error without a consumer-side recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The `return` handler failed after the observer had already terminated.
    Return,
    /// There was no `throw` handler, or the `throw` handler itself failed.
    Throw,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Return => f.write_str("return"),
            Origin::Throw => f.write_str("throw"),
        }
    }
}

/// An error that no consumer handler is left to receive.
#[derive(Debug, thiserror::Error)]
#[error("unhandled error during {origin}: {description}")]
pub struct UnhandledError {
    origin: Origin,
    description: String,
    value: Box<dyn Any + Send>,
}

impl UnhandledError {
    pub fn new<E>(origin: Origin, error: E) -> Self
    where E: std::fmt::Debug + Send + 'static {
        Self { origin, description: format!("{error:?}"), value: Box::new(error) }
    }

    pub fn origin(&self) -> Origin { self.origin }

    /// `Debug` rendering of the original error value.
    pub fn description(&self) -> &str { &self.description }

    pub fn downcast_ref<E: Any>(&self) -> Option<&E> { self.value.downcast_ref() }

    /// Recover the original error value, or get `self` back if it is not an `E`.
    pub fn downcast<E: Any>(self) -> Result<E, Self> {
        let Self { origin, description, value } = self;
        match value.downcast::<E>() {
            Ok(error) => Ok(*error),
            Err(value) => Err(Self { origin, description, value }),
        }
    }
}

/// A sink for unhandled errors.
pub trait Report: Send + Sync {
    fn report(&self, error: UnhandledError);
}

impl<F> Report for F
where F: Fn(UnhandledError) + Send + Sync
{
    fn report(&self, error: UnhandledError) { self(error) }
}

/// Runs a callback on a fresh execution turn, never on the caller's stack.
pub trait Defer: Send + Sync {
    fn defer(&self, task: Box<dyn FnOnce() + Send + 'static>);
}

/// Defers onto the current tokio runtime when called from inside one,
/// otherwise onto a new thread.
///
/// A task that panics on the runtime is caught by tokio and its `JoinHandle` is
/// not kept, so the process-wide panic hook is where the fault shows up (it
/// prints to stderr by default, and aborts under `panic = "abort"`). Use
/// [`Thread`] to keep the fault off the runtime entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct Spawn;

/// Always defers onto a new thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Thread;

impl Defer for Spawn {
    fn defer(&self, task: Box<dyn FnOnce() + Send + 'static>) {
        #[cfg(feature = "tokio")]
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move { task() });
            return;
        }
        Thread.defer(task)
    }
}

impl Defer for Thread {
    fn defer(&self, task: Box<dyn FnOnce() + Send + 'static>) {
        if let Err(e) = std::thread::Builder::new().name("rx-unhandled-error".into()).spawn(task) {
            tracing::error!("failed to spawn thread for unhandled error: {e}");
        }
    }
}

/// Logs the error, then re-raises it as a panic on a deferred turn so it
/// reaches the process-level panic hook (or the runtime's task panic handling)
/// without unwinding through the producer that delivered the notification.
/// The panic payload is the [`UnhandledError`] itself.
///
/// Either way the error is logged first with `tracing::error!`, so it is never
/// lost even where the deferred panic is caught (see [`Spawn`]).
#[derive(Debug, Clone, Default)]
pub struct RaiseReporter<D = Spawn> {
    defer: D,
}

impl<D: Defer> RaiseReporter<D> {
    pub fn new(defer: D) -> Self { Self { defer } }
}

impl<D: Defer> Report for RaiseReporter<D> {
    fn report(&self, error: UnhandledError) {
        tracing::error!("{error}");
        self.defer.defer(Box::new(move || std::panic::panic_any(error)));
    }
}

static REPORTER: RwLock<Option<Arc<dyn Report>>> = RwLock::new(None);

/// Replace the process-wide reporter used by observers that were not given
/// one of their own.
pub fn set_reporter(reporter: Arc<dyn Report>) { *REPORTER.write().expect("reporter lock is poisoned") = Some(reporter); }

/// The process-wide reporter. Defaults to [`RaiseReporter<Spawn>`].
pub fn reporter() -> Arc<dyn Report> {
    match REPORTER.read().expect("reporter lock is poisoned").as_ref() {
        Some(reporter) => reporter.clone(),
        None => Arc::new(RaiseReporter::<Spawn>::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Queue(Mutex<Vec<Box<dyn FnOnce() + Send + 'static>>>);

    impl Defer for Arc<Queue> {
        fn defer(&self, task: Box<dyn FnOnce() + Send + 'static>) { self.0.lock().unwrap().push(task) }
    }

    #[test]
    fn raise_reporter_defers_a_panic_carrying_the_error() {
        let queue = Arc::new(Queue::default());
        let reporter = RaiseReporter::new(queue.clone());

        reporter.report(UnhandledError::new(Origin::Throw, "boom"));

        // nothing ran on the reporting stack
        let mut tasks = std::mem::take(&mut *queue.0.lock().unwrap());
        assert_eq!(tasks.len(), 1);

        let task = tasks.pop().unwrap();
        let payload = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task)).unwrap_err();
        let error = *payload.downcast::<UnhandledError>().unwrap();
        assert_eq!(error.origin(), Origin::Throw);
        assert_eq!(error.downcast::<&str>().unwrap(), "boom");
    }

    #[test]
    fn downcast_mismatch_gives_the_error_back() {
        let error = UnhandledError::new(Origin::Return, 42u32);
        let error = error.downcast::<String>().unwrap_err();
        assert_eq!(error.downcast_ref::<u32>(), Some(&42));
        assert_eq!(error.to_string(), "unhandled error during return: 42");
    }

    #[test]
    fn closures_are_reporters() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let reporter: Arc<dyn Report> = {
            let seen = seen.clone();
            Arc::new(move |error: UnhandledError| seen.lock().unwrap().push(error.description().to_string()))
        };
        reporter.report(UnhandledError::new(Origin::Throw, "x"));
        assert_eq!(*seen.lock().unwrap(), vec!["\"x\"".to_string()]);
    }

    #[cfg(feature = "tokio")]
    #[tokio::test]
    async fn spawn_defers_onto_the_running_runtime() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));

        {
            let ran = ran.clone();
            Spawn.defer(Box::new(move || {
                ran.store(true, std::sync::atomic::Ordering::SeqCst);
                let _ = tx.send(());
            }));
        }
        // current-thread runtime: the task cannot have run before we yield
        assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));

        rx.await.unwrap();
        assert!(ran.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn thread_defer_runs_off_the_calling_thread() {
        let (tx, rx) = std::sync::mpsc::channel();
        let caller = std::thread::current().id();
        Thread.defer(Box::new(move || tx.send(std::thread::current().id()).unwrap()));
        assert_ne!(rx.recv().unwrap(), caller);
    }

    #[test]
    fn raised_error_surfaces_as_a_panic_on_its_own_thread() {
        #[derive(Default)]
        struct Joined(Mutex<Vec<std::thread::JoinHandle<()>>>);

        impl Defer for Arc<Joined> {
            fn defer(&self, task: Box<dyn FnOnce() + Send + 'static>) { self.0.lock().unwrap().push(std::thread::spawn(task)) }
        }

        let joined = Arc::new(Joined::default());
        RaiseReporter::new(joined.clone()).report(UnhandledError::new(Origin::Return, 7u8));

        let handle = joined.0.lock().unwrap().pop().unwrap();
        let payload = handle.join().unwrap_err();
        let error = *payload.downcast::<UnhandledError>().unwrap();
        assert_eq!(error.origin(), Origin::Return);
        assert_eq!(error.downcast_ref::<u8>(), Some(&7));
    }
}
