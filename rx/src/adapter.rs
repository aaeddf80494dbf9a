//! Normalizing foreign producers and consumers into canonical instances.
//!
//! A canonical [`Observer`]/[`Observable`] passes through unchanged. Anything
//! else that implements the capability set ([`Observe`] / [`Subscribe`]) is
//! shared through an `Arc` and wrapped exactly once per distinct object: for as
//! long as anything outside the wrapper can still reach that `Arc`, adapting it
//! again returns the same canonical instance. A consumer that has already
//! terminated therefore stays terminated, and subscribing it again is a no-op.

use std::sync::Arc;

use crate::{CancellationToken, Observable, Observe, Observer, Partial, Subscribe};

mod cache;
pub(crate) use cache::IdentityCache;

static OBSERVERS: IdentityCache = IdentityCache::new();
static OBSERVABLES: IdentityCache = IdentityCache::new();

/// Anything [`Observable::subscribe`] accepts as a consumer.
pub trait IntoObserver<T, E> {
    fn into_observer(self) -> Observer<T, E>;
}

/// Anything that can be normalized into a canonical [`Observable`].
pub trait IntoObservable<T, E> {
    fn into_observable(self) -> Observable<T, E>;
}

/// A pipeline stage that normalizes its input into a canonical observer.
pub fn as_observer<S, T, E>() -> impl Fn(S) -> Observer<T, E>
where S: IntoObserver<T, E> {
    |source: S| source.into_observer()
}

/// A pipeline stage that normalizes its input into a canonical observable.
pub fn as_observable<S, T, E>() -> impl Fn(S) -> Observable<T, E>
where S: IntoObservable<T, E> {
    |source: S| source.into_observable()
}

impl<T, E> IntoObserver<T, E> for Observer<T, E> {
    fn into_observer(self) -> Observer<T, E> { self }
}

impl<T, E> IntoObserver<T, E> for &Observer<T, E> {
    fn into_observer(self) -> Observer<T, E> { self.clone() }
}

// A partial is owned and moved in, so it can never be seen twice: no caching.
impl<T: 'static, E: 'static> IntoObserver<T, E> for Partial<T, E> {
    fn into_observer(self) -> Observer<T, E> { Observer::new(self) }
}

impl<S, T, E> IntoObserver<T, E> for Arc<S>
where
    S: Observe<T, E> + ?Sized + 'static,
    T: 'static,
    E: 'static,
{
    fn into_observer(self) -> Observer<T, E> {
        let inner = OBSERVERS.get_or_insert_with(&self, || {
            let signal = self.signal();
            Observer::from_sink(Box::new(Foreign(self.clone())), signal).0
        });
        Observer(inner)
    }
}

impl<T, E> IntoObservable<T, E> for Observable<T, E> {
    fn into_observable(self) -> Observable<T, E> { self }
}

impl<T, E> IntoObservable<T, E> for &Observable<T, E> {
    fn into_observable(self) -> Observable<T, E> { self.clone() }
}

impl<S, T, E> IntoObservable<T, E> for Arc<S>
where
    S: Subscribe<T, E> + ?Sized + 'static,
    T: 'static,
    E: 'static,
{
    fn into_observable(self) -> Observable<T, E> {
        let inner = OBSERVABLES.get_or_insert_with(&self, || {
            let source = self.clone();
            Observable::new(move |observer: Observer<T, E>| source.subscribe(observer)).0
        });
        Observable(inner)
    }
}

// Delegates to a foreign implementation the canonical observer does not own.
struct Foreign<S: ?Sized>(Arc<S>);

impl<S, T, E> Observe<T, E> for Foreign<S>
where S: Observe<T, E> + ?Sized
{
    fn signal(&self) -> Option<CancellationToken> { self.0.signal() }

    fn next(&self, value: T) -> Result<(), E> { self.0.next(value) }

    fn r#return(&self) -> Result<(), E> { self.0.r#return() }

    fn throw(&self, error: E) -> Result<(), E> { self.0.throw(error) }
}
