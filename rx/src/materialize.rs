use crate::adapter::IdentityCache;
use crate::{Observable, Observer, Partial};

static MATERIALIZED: IdentityCache = IdentityCache::new();

/// One notification, as a plain value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification<T, E> {
    Next(T),
    Return,
    Throw(E),
}

/// A pipeline stage that turns every notification of the source into a `next`
/// of [`Notification`] values. The source's `return` or `throw` arrives as a
/// final `Notification::Return` / `Notification::Throw` followed by a plain
/// `return`; the resulting observable itself never throws.
///
/// The materialized observable is cached per source, so materializing the same
/// observable twice yields the same instance for as long as the source is reachable.
pub fn materialize<T, E, X>() -> impl Fn(Observable<T, E>) -> Observable<Notification<T, E>, X>
where
    T: 'static,
    E: std::fmt::Debug + Send + 'static,
    X: std::fmt::Debug + Send + 'static,
{
    |source: Observable<T, E>| {
        let inner = MATERIALIZED.get_or_insert_with(&source.0, || {
            let source = source.clone();
            Observable::new(move |observer: Observer<Notification<T, E>, X>| {
                source.subscribe(
                    Partial::new()
                        .signal(observer.signal().clone())
                        .on_next({
                            let observer = observer.clone();
                            move |value: T| observer.next(Notification::Next(value))
                        })
                        .on_return({
                            let observer = observer.clone();
                            move || {
                                observer.next(Notification::Return);
                                observer.r#return();
                            }
                        })
                        .on_throw(move |error: E| {
                            observer.next(Notification::Throw(error));
                            observer.r#return();
                        }),
                )
            })
            .0
        });
        Observable(inner)
    }
}
