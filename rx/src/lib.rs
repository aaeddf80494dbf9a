/*!
Push-based Observer/Observable primitives with cooperative cancellation.

An [`Observable`] wraps a producer-setup function; [`Observable::subscribe`]
normalizes its argument into a canonical [`Observer`] and runs the producer with
it. The producer pushes values with `next` and finishes with exactly one
`return` or `throw`. Cancellation is cooperative: whoever holds the observer's
[`CancellationToken`] aborts it, and the producer polls or listens for that.

# Guarantees
- at most one of `return`/`throw` is delivered, and nothing after it
- an observer aborts *before* calling its `return`/`throw` handler, so handlers that
  re-enter the observer are ignored
- errors never escape `subscribe`, `next`, `return` or `throw` synchronously: a
  failing producer or `next` handler is routed to `throw`, and anything left without
  a recipient goes to the unhandled-error [`Report`] sink, which by default re-raises
  it on a fresh task
- foreign implementations of [`Observe`]/[`Subscribe`] are adapted into canonical
  instances once per distinct `Arc`

# Basic usage

```rust
use rx::*;
use std::sync::{Arc, Mutex};

let numbers = Observable::<i32, String>::new(|observer: Observer<i32, String>| {
    for value in [1, 2, 3] {
        if observer.is_aborted() {
            return;
        }
        observer.next(value);
    }
    observer.r#return();
});

let seen = Arc::new(Mutex::new(Vec::new()));
let token = CancellationToken::new();
numbers.subscribe(
    Partial::new()
        .signal(token.clone())
        .on_next({
            let seen = seen.clone();
            move |value: i32| seen.lock().unwrap().push(value)
        })
        .on_return(|| println!("return"))
        .on_throw(|error: String| eprintln!("{error}")),
);
assert_eq!(*seen.lock().unwrap(), [1, 2, 3]);
```

# Asynchronous producers

```rust
use rx::*;
use std::time::Duration;

let ticks = Observable::<u32, String>::new(|observer: Observer<u32, String>| {
    std::thread::spawn(move || {
        for tick in 0.. {
            // stop producing once the consumer goes away
            if observer.is_aborted() {
                return;
            }
            observer.next(tick);
            std::thread::sleep(Duration::from_millis(10));
        }
    });
});

let token = CancellationToken::new();
let (tx, rx) = std::sync::mpsc::channel();
ticks.subscribe(Partial::new().signal(token.clone()).on_next(move |tick: u32| {
    let _ = tx.send(tick);
}));
assert_eq!(rx.recv().unwrap(), 0);
token.abort();
```
*/

mod adapter;
mod broadcast;
mod materialize;
mod observable;
mod observer;
mod pipe;
mod reporter;
mod token;
mod traits;

pub use adapter::{IntoObservable, IntoObserver, as_observable, as_observer};
pub use broadcast::ListenerGuard;
pub use materialize::*;
pub use observable::Observable;
pub use observer::{Observer, Partial};
pub use pipe::Pipe;
pub use reporter::*;
pub use token::*;
pub use traits::*;
