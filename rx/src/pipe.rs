/// Left-to-right application of unary functions, so adapters and operators
/// read in the order they run:
///
/// ```rust
/// use rx::*;
///
/// let source = Observable::<u8, String>::new(|observer: Observer<u8, String>| observer.r#return());
/// let materialized = source.pipe(as_observable()).pipe(materialize::<u8, String, String>());
/// # let _ = materialized;
/// ```
pub trait Pipe: Sized {
    fn pipe<R>(self, f: impl FnOnce(Self) -> R) -> R { f(self) }
}

impl<T> Pipe for T {}

/// Compose unary functions left to right into one closure.
///
/// `pipe!()` is the identity, `pipe!(f)` is `f`, and `pipe!(f, g, h)` is
/// `|x| h(g(f(x)))`.
#[macro_export]
macro_rules! pipe {
    () => {
        |value| value
    };
    ($f:expr $(,)?) => {
        $f
    };
    ($f:expr, $($rest:expr),+ $(,)?) => {{
        let f = $f;
        let rest = $crate::pipe!($($rest),+);
        move |value| rest(f(value))
    }};
}
