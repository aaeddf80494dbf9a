use std::sync::Arc;

use crate::{CancellationToken, IntoOutcome, Observe, Report};

type NextFn<T, E> = Box<dyn Fn(T) -> Result<(), E> + Send + Sync + 'static>;
type ReturnFn<E> = Box<dyn Fn() -> Result<(), E> + Send + Sync + 'static>;
type ThrowFn<E> = Box<dyn Fn(E) -> Result<(), E> + Send + Sync + 'static>;

/// A partial set of observer callbacks plus an optional external signal,
/// assembled builder-style and turned into an [`Observer`](crate::Observer).
///
/// ```rust
/// use rx::*;
///
/// let token = CancellationToken::new();
/// let observer: Observer<i32, String> = Observer::new(
///     Partial::new()
///         .signal(token.clone())
///         .on_next(|value: i32| println!("{value}"))
///         .on_throw(|error: String| eprintln!("{error}")),
/// );
/// token.abort();
/// assert!(observer.is_aborted());
/// ```
pub struct Partial<T, E> {
    next: Option<NextFn<T, E>>,
    ret: Option<ReturnFn<E>>,
    throw: Option<ThrowFn<E>>,
    signal: Option<CancellationToken>,
    reporter: Option<Arc<dyn Report>>,
}

impl<T, E> Default for Partial<T, E> {
    fn default() -> Self { Self { next: None, ret: None, throw: None, signal: None, reporter: None } }
}

impl<T, E> std::fmt::Debug for Partial<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Partial")
            .field("next", &self.next.is_some())
            .field("return", &self.ret.is_some())
            .field("throw", &self.throw.is_some())
            .field("signal", &self.signal)
            .finish()
    }
}

impl<T, E> Partial<T, E> {
    pub fn new() -> Self { Self::default() }

    pub fn on_next<F, R>(mut self, next: F) -> Self
    where
        F: Fn(T) -> R + Send + Sync + 'static,
        R: IntoOutcome<E>,
    {
        self.next = Some(Box::new(move |value| next(value).into_outcome()));
        self
    }

    pub fn on_return<F, R>(mut self, ret: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: IntoOutcome<E>,
    {
        self.ret = Some(Box::new(move || ret().into_outcome()));
        self
    }

    pub fn on_throw<F, R>(mut self, throw: F) -> Self
    where
        F: Fn(E) -> R + Send + Sync + 'static,
        R: IntoOutcome<E>,
    {
        self.throw = Some(Box::new(move |error| throw(error).into_outcome()));
        self
    }

    /// Merge the observer's own signal with `signal`; aborting either one
    /// terminates the observer.
    pub fn signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Route this observer's unhandled errors to `reporter` instead of the
    /// process-wide one.
    pub fn reporter(mut self, reporter: Arc<dyn Report>) -> Self {
        self.reporter = Some(reporter);
        self
    }
}

impl<T, E> Partial<T, E> {
    // The callbacks become the observer's sink; signal and reporter are the observer's own.
    pub(crate) fn split(self) -> (Callbacks<T, E>, Option<CancellationToken>, Option<Arc<dyn Report>>) {
        let Self { next, ret, throw, signal, reporter } = self;
        (Callbacks { next, ret, throw }, signal, reporter)
    }
}

pub(crate) struct Callbacks<T, E> {
    next: Option<NextFn<T, E>>,
    ret: Option<ReturnFn<E>>,
    throw: Option<ThrowFn<E>>,
}

impl<T, E> Observe<T, E> for Callbacks<T, E> {
    fn next(&self, value: T) -> Result<(), E> {
        match &self.next {
            Some(next) => next(value),
            None => Ok(()),
        }
    }

    fn r#return(&self) -> Result<(), E> {
        match &self.ret {
            Some(ret) => ret(),
            None => Ok(()),
        }
    }

    fn throw(&self, error: E) -> Result<(), E> {
        match &self.throw {
            Some(throw) => throw(error),
            None => Err(error),
        }
    }
}
