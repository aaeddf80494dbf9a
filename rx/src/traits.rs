use crate::{CancellationToken, Observer};

/// The observer capability set, for consumers that are not built through
/// [`Observer`]. Every method is optional; the defaults describe a consumer
/// that ignores values, ignores completion and has no error handler.
///
/// Foreign implementations are turned into canonical observers with
/// [`as_observer`](crate::as_observer) (or anywhere an
/// [`IntoObserver`](crate::IntoObserver) is accepted) by wrapping them in an
/// `Arc`.
pub trait Observe<T, E>: Send + Sync {
    /// An external signal the canonical observer should be merged with.
    fn signal(&self) -> Option<CancellationToken> { None }

    fn next(&self, value: T) -> Result<(), E> {
        let _ = value;
        Ok(())
    }

    fn r#return(&self) -> Result<(), E> { Ok(()) }

    /// Returning `Err` hands the error to the unhandled-error reporter.
    /// The default has no handler at all, so the error itself is unhandled.
    fn throw(&self, error: E) -> Result<(), E> { Err(error) }
}

/// The observable capability set, for producers that are not built through
/// [`Observable`](crate::Observable).
pub trait Subscribe<T, E>: Send + Sync {
    fn subscribe(&self, observer: Observer<T, E>);
}

/// Conversion of a callback's return value into success or a thrown error.
///
/// Lets callbacks be written as plain `|value| ...` closures, or return
/// `Result<(), E>` when they can fail.
pub trait IntoOutcome<E> {
    fn into_outcome(self) -> Result<(), E>;
}

impl<E> IntoOutcome<E> for () {
    fn into_outcome(self) -> Result<(), E> { Ok(()) }
}

impl<E> IntoOutcome<E> for Result<(), E> {
    fn into_outcome(self) -> Result<(), E> { self }
}
