use rx::{Report, UnhandledError};
use std::sync::{Arc, Mutex};

#[allow(unused)]
pub fn init_tracing() { let _ = tracing_subscriber::fmt().with_test_writer().with_max_level(tracing::Level::DEBUG).try_init(); }

/// Everything an observer saw, in order.
#[allow(unused)]
#[derive(Debug, Clone, PartialEq)]
pub enum Seen<T, E> {
    Next(T),
    Return,
    Throw(E),
}

/// Returns a shared log plus a function that drains it.
#[allow(unused)]
pub fn recorder<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, Box<dyn Fn() -> Vec<T> + Send + Sync>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let check = {
        let log = log.clone();
        Box::new(move || log.lock().unwrap().drain(..).collect::<Vec<T>>())
    };
    (log, check)
}

/// A reporter that keeps every unhandled error for inspection.
#[allow(unused)]
pub fn collector() -> (Arc<dyn Report>, Arc<Mutex<Vec<UnhandledError>>>) {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let reporter = {
        let errors = errors.clone();
        Arc::new(move |error: UnhandledError| errors.lock().unwrap().push(error))
    };
    (reporter, errors)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failure: {0}")]
pub struct Failure(pub &'static str);
