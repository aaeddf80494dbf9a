mod common;
use common::{Failure, recorder};
use rx::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type Materialized = Observable<Notification<i32, Failure>, Failure>;

fn collect(observable: &Materialized) -> Vec<&'static str> {
    let (log, check) = recorder();
    observable.subscribe(
        Partial::new()
            .on_next({
                let log = log.clone();
                move |notification: Notification<i32, Failure>| {
                    log.lock().unwrap().push(match notification {
                        Notification::Next(_) => "next",
                        Notification::Return => "next(return)",
                        Notification::Throw(_) => "next(throw)",
                    })
                }
            })
            .on_return({
                let log = log.clone();
                move || log.lock().unwrap().push("return")
            })
            .on_throw(move |_: Failure| log.lock().unwrap().push("throw")),
    );
    check()
}

#[test]
fn values_and_return_become_notifications() {
    let source = Observable::new(|observer: Observer<i32, Failure>| {
        observer.next(1);
        observer.next(2);
        observer.r#return();
    });

    let materialized = source.pipe(materialize::<i32, Failure, Failure>());

    assert_eq!(collect(&materialized), ["next", "next", "next(return)", "return"]);
}

#[test]
fn throw_becomes_a_notification_and_a_plain_return() {
    let source = Observable::new(|observer: Observer<i32, Failure>| {
        observer.next(1);
        Err::<(), _>(Failure("source failed"))
    });

    let materialized = source.pipe(materialize::<i32, Failure, Failure>());

    assert_eq!(collect(&materialized), ["next", "next(throw)", "return"]);
}

#[test]
fn carries_the_values() {
    let source = Observable::new(|observer: Observer<i32, Failure>| {
        observer.next(4);
        observer.throw(Failure("done"));
    });
    let (log, check) = recorder();

    materialize::<i32, Failure, Failure>()(source).subscribe(Observer::from_next(move |notification: Notification<i32, Failure>| log.lock().unwrap().push(notification)));

    assert_eq!(check(), [Notification::Next(4), Notification::Throw(Failure("done"))]);
}

#[test]
fn downstream_abort_reaches_the_source() {
    let produced = Arc::new(AtomicUsize::new(0));
    let source = {
        let produced = produced.clone();
        Observable::new(move |observer: Observer<i32, Failure>| {
            for value in 0..10 {
                if observer.is_aborted() {
                    return;
                }
                produced.fetch_add(1, Ordering::SeqCst);
                observer.next(value);
            }
            observer.r#return();
        })
    };
    let controller = CancellationToken::new();

    source.pipe(materialize::<i32, Failure, Failure>()).subscribe(Partial::new().signal(controller.clone()).on_next({
        let controller = controller.clone();
        move |_: Notification<i32, Failure>| {
            controller.abort();
        }
    }));

    assert_eq!(produced.load(Ordering::SeqCst), 1);
}

#[test]
fn materializing_is_cached_per_source() {
    let source: Observable<i32, Failure> = Observable::default();
    let other: Observable<i32, Failure> = Observable::default();

    let a: Materialized = materialize()(source.clone());
    let b: Materialized = materialize()(source);
    let c: Materialized = materialize()(other);

    assert_eq!(a, b);
    assert_ne!(a, c);
}
