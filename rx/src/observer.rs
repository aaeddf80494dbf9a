use std::sync::Arc;

use crate::{CancellationToken, Observe, Origin, Report, UnhandledError};

mod partial;
pub use partial::*;

/// The canonical consumer of a sequence of values.
///
/// An observer is either *active* or *terminated*; it is terminated exactly
/// when [`signal`](Self::signal) is aborted.
///
/// - `next(value)` is dropped once terminated. Otherwise the `next` handler is
///   called; if it fails, its error is delivered to this observer's own
///   [`throw`](Self::throw).
/// - `return()` and `throw(error)` are dropped once terminated. Otherwise the
///   observer aborts its owned token **before** calling the handler, so any
///   notification the handler (or an abort listener) sends back into this
///   observer is dropped. A failing `return`/`throw` handler, or a `throw`
///   with no handler at all, goes to the unhandled-error reporter, never back
///   to the caller.
/// - An observer built with an external signal that is already aborted is
///   terminated from birth and never calls any handler.
///
/// At most one of `return`/`throw` is ever delivered, and nothing is delivered
/// after it. Cloning yields another handle to the same observer; equality is
/// identity.
pub struct Observer<T, E>(pub(crate) Arc<Inner<T, E>>);

pub(crate) struct Inner<T, E> {
    sink: Option<Box<dyn Observe<T, E>>>,
    // owned; aborting it is the transition to terminated
    controller: CancellationToken,
    // the owned token, or its merge with the caller's
    signal: CancellationToken,
    reporter: Option<Arc<dyn Report>>,
}

impl<T, E> Clone for Observer<T, E> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T, E> PartialEq for Observer<T, E> {
    fn eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) }
}
impl<T, E> Eq for Observer<T, E> {}

impl<T, E> std::fmt::Debug for Observer<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer").field("aborted", &self.is_aborted()).field("handlers", &self.0.sink.is_some()).finish()
    }
}

impl<T: 'static, E: 'static> Default for Observer<T, E> {
    /// An observer with no handlers: values are ignored and any `throw` is unhandled.
    fn default() -> Self { Self::build(None, None, None) }
}

impl<T: 'static, E: 'static> Observer<T, E> {
    pub fn new(partial: Partial<T, E>) -> Self {
        let (callbacks, signal, reporter) = partial.split();
        Self::build(Some(Box::new(callbacks)), signal, reporter)
    }

    /// An observer with only a `next` handler.
    pub fn from_next<F, R>(next: F) -> Self
    where
        F: Fn(T) -> R + Send + Sync + 'static,
        R: crate::IntoOutcome<E>,
    {
        Self::new(Partial::new().on_next(next))
    }

    pub(crate) fn from_sink(sink: Box<dyn Observe<T, E>>, signal: Option<CancellationToken>) -> Self { Self::build(Some(sink), signal, None) }

    fn build(sink: Option<Box<dyn Observe<T, E>>>, external: Option<CancellationToken>, reporter: Option<Arc<dyn Report>>) -> Self {
        let controller = CancellationToken::new();
        let signal = match external {
            Some(external) => CancellationToken::merge([&external, &controller]),
            None => controller.clone(),
        };
        Self(Arc::new(Inner { sink, controller, signal, reporter }))
    }
}

impl<T, E> Observer<T, E> {
    /// Aborted once this observer has terminated, or once the external signal
    /// it was built with has been aborted. Producers poll this or listen for its
    /// abort to stop producing.
    pub fn signal(&self) -> &CancellationToken { &self.0.signal }

    pub fn is_aborted(&self) -> bool { self.0.signal.is_aborted() }

    pub fn ptr_eq(this: &Self, other: &Self) -> bool { Arc::ptr_eq(&this.0, &other.0) }
}

impl<T, E> Observer<T, E>
where E: std::fmt::Debug + Send + 'static
{
    pub fn next(&self, value: T) {
        if self.is_aborted() {
            return;
        }
        if let Some(sink) = &self.0.sink {
            if let Err(error) = sink.next(value) {
                self.throw(error);
            }
        }
    }

    pub fn r#return(&self) {
        if !self.terminate() {
            return;
        }
        if let Some(sink) = &self.0.sink {
            if let Err(error) = sink.r#return() {
                self.report(Origin::Return, error);
            }
        }
    }

    pub fn throw(&self, error: E) {
        if !self.terminate() {
            return;
        }
        let outcome = match &self.0.sink {
            Some(sink) => sink.throw(error),
            None => Err(error),
        };
        if let Err(error) = outcome {
            self.report(Origin::Throw, error);
        }
    }

    /// Moves to terminated. Only the call that wins the transition may
    /// deliver `return`/`throw`.
    fn terminate(&self) -> bool { !self.is_aborted() && self.0.controller.abort() }

    fn report(&self, origin: Origin, error: E) {
        let error = UnhandledError::new(origin, error);
        tracing::debug!("observer reporting {error}");
        match &self.0.reporter {
            Some(reporter) => reporter.report(error),
            None => crate::reporter().report(error),
        }
    }
}

/// A canonical observer also satisfies the capability set, and never fails.
impl<T, E> Observe<T, E> for Observer<T, E>
where E: std::fmt::Debug + Send + 'static
{
    fn signal(&self) -> Option<CancellationToken> { Some(self.0.signal.clone()) }

    fn next(&self, value: T) -> Result<(), E> {
        Observer::next(self, value);
        Ok(())
    }

    fn r#return(&self) -> Result<(), E> {
        Observer::r#return(self);
        Ok(())
    }

    fn throw(&self, error: E) -> Result<(), E> {
        Observer::throw(self, error);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn collector() -> (Arc<dyn Report>, Arc<Mutex<Vec<UnhandledError>>>) {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let reporter = {
            let errors = errors.clone();
            Arc::new(move |error: UnhandledError| errors.lock().unwrap().push(error))
        };
        (reporter, errors)
    }

    #[test]
    fn owned_token_aborts_on_return() {
        let observer: Observer<u8, String> = Observer::default();
        observer.r#return();
        assert!(observer.0.controller.is_aborted());
        assert!(observer.signal().reason().unwrap().is::<crate::AbortError>());
    }

    #[test]
    fn external_signal_is_merged_not_replaced() {
        let external = CancellationToken::new();
        let observer: Observer<u8, String> = Observer::new(Partial::new().signal(external.clone()));
        assert_ne!(observer.signal(), &external);

        observer.r#return();
        assert!(observer.is_aborted());
        // terminating the observer never aborts the caller's token
        assert!(!external.is_aborted());
    }

    #[test]
    fn throw_without_handler_reports_the_value() {
        let (reporter, errors) = collector();
        let observer: Observer<u8, &'static str> = Observer::new(Partial::new().reporter(reporter));

        observer.throw("lost");
        observer.throw("dropped");

        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].origin(), Origin::Throw);
        assert_eq!(errors[0].downcast_ref::<&str>(), Some(&"lost"));
    }

    #[test]
    fn canonical_observer_as_capability_set() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let observer: Observer<u8, String> = {
            let seen = seen.clone();
            Observer::from_next(move |value| seen.lock().unwrap().push(value))
        };
        let sink: &dyn Observe<u8, String> = &observer;

        assert_eq!(sink.signal().as_ref(), Some(observer.signal()));
        assert!(sink.next(1).is_ok());
        assert!(sink.r#return().is_ok());
        assert!(sink.next(2).is_ok());
        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }
}
