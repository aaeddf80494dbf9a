use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::broadcast::{Broadcast, ListenerGuard};

/// The reason recorded by [`CancellationToken::abort`] when none is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("signal is aborted without reason")]
pub struct AbortError;

/// Why a [`CancellationToken`] was aborted. Type-erased and cheap to clone;
/// clones of one reason compare equal under [`AbortReason::ptr_eq`].
#[derive(Clone)]
pub struct AbortReason {
    value: Arc<dyn Any + Send + Sync>,
    description: Arc<str>,
}

impl AbortReason {
    pub fn new<R>(reason: R) -> Self
    where R: std::fmt::Debug + Send + Sync + 'static {
        let description = format!("{reason:?}").into();
        Self { value: Arc::new(reason), description }
    }

    pub fn downcast_ref<R: Any>(&self) -> Option<&R> { self.value.downcast_ref() }

    pub fn is<R: Any>(&self) -> bool { self.value.is::<R>() }

    /// True when both reasons come from the same `abort_with` call.
    pub fn ptr_eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.value, &other.value) }

    pub fn description(&self) -> &str { &self.description }
}

impl std::fmt::Debug for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_tuple("AbortReason").field(&format_args!("{}", self.description)).finish() }
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(&self.description) }
}

impl From<AbortError> for AbortReason {
    fn from(error: AbortError) -> Self { Self::new(error) }
}

/// A shareable, one-way abort flag with a reason.
///
/// Clones share state. Aborting is idempotent: only the first call records its
/// reason and notifies the `on_abort` listeners; later calls return `false`.
/// Listeners run synchronously on the aborting thread, in registration order,
/// after the flag is already visible, so anything they call back into sees an
/// aborted token.
#[derive(Clone)]
pub struct CancellationToken(Arc<Inner>);

struct Inner {
    aborted: AtomicBool,
    reason: Mutex<Option<AbortReason>>,
    listeners: Broadcast<AbortReason>,
    // Guards on the inputs of a merged token; dropped once this token aborts.
    sources: Mutex<Vec<ListenerGuard<AbortReason>>>,
}

impl Default for CancellationToken {
    fn default() -> Self { Self::new() }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken").field("aborted", &self.is_aborted()).field("reason", &self.reason()).finish()
    }
}

impl PartialEq for CancellationToken {
    fn eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) }
}
impl Eq for CancellationToken {}

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(Inner {
            aborted: AtomicBool::new(false),
            reason: Mutex::new(None),
            listeners: Broadcast::new(),
            sources: Mutex::new(Vec::new()),
        }))
    }

    /// A token that is aborted from birth with `reason`.
    pub fn aborted(reason: impl Into<AbortReason>) -> Self {
        let token = Self::new();
        token.abort_with(reason);
        token
    }

    pub fn is_aborted(&self) -> bool { self.0.aborted.load(Ordering::Acquire) }

    /// `None` until the token is aborted.
    pub fn reason(&self) -> Option<AbortReason> { self.0.reason.lock().expect("reason lock is poisoned").clone() }

    /// Abort with [`AbortError`] as the reason. Returns `true` only for the
    /// call that actually aborted the token.
    pub fn abort(&self) -> bool { self.abort_with(AbortError) }

    pub fn abort_with(&self, reason: impl Into<AbortReason>) -> bool {
        let reason = {
            let mut slot = self.0.reason.lock().expect("reason lock is poisoned");
            if slot.is_some() {
                return false;
            }
            let reason = reason.into();
            *slot = Some(reason.clone());
            self.0.aborted.store(true, Ordering::Release);
            reason
        };

        // no longer interested in the inputs of a merged token
        let sources = std::mem::take(&mut *self.0.sources.lock().expect("sources lock is poisoned"));
        drop(sources);

        self.0.listeners.fire(reason);
        true
    }

    /// Call `listener` once when this token aborts. Nothing happens if the token
    /// is already aborted, so check [`is_aborted`](Self::is_aborted) first.
    pub fn on_abort<F>(&self, listener: F) -> ListenerGuard<AbortReason>
    where F: Fn(AbortReason) + Send + Sync + 'static {
        self.0.listeners.listen(listener)
    }

    /// A token that aborts as soon as any of `tokens` aborts, with that token's
    /// reason. If one of them is already aborted the result is aborted on
    /// return, with the reason of the first such token in iteration order.
    ///
    /// The merged token holds no strong reference to its inputs and the inputs
    /// hold none to it.
    pub fn merge<'a, I>(tokens: I) -> Self
    where I: IntoIterator<Item = &'a CancellationToken> {
        let tokens: Vec<&CancellationToken> = tokens.into_iter().collect();
        let merged = Self::new();

        // listen first so an abort racing with this call is never missed
        let guards: Vec<_> = tokens
            .iter()
            .map(|token| {
                let weak = Arc::downgrade(&merged.0);
                token.on_abort(move |reason| {
                    if let Some(merged) = Weak::upgrade(&weak) {
                        CancellationToken(merged).abort_with(reason);
                    }
                })
            })
            .collect();
        *merged.0.sources.lock().expect("sources lock is poisoned") = guards;

        for token in tokens {
            if let Some(reason) = token.reason() {
                merged.abort_with(reason);
                break;
            }
        }
        merged
    }
}
