use std::sync::Arc;

use crate::{IntoObserver, IntoOutcome, Observer, Subscribe};

type Producer<T, E> = Box<dyn Fn(Observer<T, E>) -> Result<(), E> + Send + Sync + 'static>;

/// A template for connecting a consumer to a producer.
///
/// The producer-setup function runs once per [`subscribe`](Self::subscribe)
/// call, with a canonical [`Observer`]. It may push synchronously, or keep the
/// observer and push later; either way it should stop once the observer's
/// signal is aborted.
///
/// ```rust
/// use rx::*;
///
/// let numbers = Observable::<i32, String>::new(|observer: Observer<i32, String>| {
///     for value in [1, 2, 3] {
///         observer.next(value);
///         if observer.is_aborted() {
///             return;
///         }
///     }
///     observer.r#return();
/// });
///
/// numbers.subscribe(Partial::new().on_next(|value: i32| println!("{value}")).on_return(|| println!("return")));
/// ```
pub struct Observable<T, E>(pub(crate) Arc<Inner<T, E>>);

pub(crate) struct Inner<T, E> {
    producer: Producer<T, E>,
}

impl<T, E> Clone for Observable<T, E> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T, E> PartialEq for Observable<T, E> {
    fn eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) }
}
impl<T, E> Eq for Observable<T, E> {}

impl<T, E> std::fmt::Debug for Observable<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_tuple("Observable").field(&Arc::as_ptr(&self.0)).finish() }
}

impl<T: 'static, E: 'static> Default for Observable<T, E> {
    /// An observable that never notifies.
    fn default() -> Self { Self::new(|_observer: Observer<T, E>| {}) }
}

impl<T, E> Observable<T, E> {
    /// `producer` may fail by returning `Err`; the error is delivered to the
    /// subscribing observer's `throw`.
    pub fn new<F, R>(producer: F) -> Self
    where
        F: Fn(Observer<T, E>) -> R + Send + Sync + 'static,
        R: IntoOutcome<E>,
    {
        Self(Arc::new(Inner { producer: Box::new(move |observer| producer(observer).into_outcome()) }))
    }

    pub fn ptr_eq(this: &Self, other: &Self) -> bool { Arc::ptr_eq(&this.0, &other.0) }
}

impl<T, E> Observable<T, E>
where
    T: 'static,
    E: std::fmt::Debug + Send + 'static,
{
    /// Run the producer for a new subscription.
    ///
    /// Never fails and never returns anything: a producer that is already
    /// cancelled is not started, and a producer that fails has its error
    /// delivered to the observer.
    pub fn subscribe<O>(&self, observer: O)
    where O: IntoObserver<T, E> {
        let observer = observer.into_observer();
        if observer.is_aborted() {
            tracing::debug!("skipping subscribe for an already aborted observer");
            return;
        }
        if let Err(error) = (self.0.producer)(observer.clone()) {
            observer.throw(error);
        }
    }
}

impl<T, E> Subscribe<T, E> for Observable<T, E>
where
    T: 'static,
    E: std::fmt::Debug + Send + 'static,
{
    fn subscribe(&self, observer: Observer<T, E>) { Observable::subscribe(self, observer) }
}
