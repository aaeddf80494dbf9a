use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// A listener registered on a [`Broadcast`].
pub type Listener<T> = Arc<dyn Fn(T) + Send + Sync + 'static>;

/// A one-shot broadcast: every registered listener is called at most once,
/// in registration order, by the first [`Broadcast::fire`].
pub struct Broadcast<T>(Arc<Inner<T>>);

struct Inner<T> {
    listeners: Mutex<BTreeMap<usize, Listener<T>>>,
    next_id: AtomicUsize,
}

impl<T> std::fmt::Debug for Broadcast<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcast").field("listeners", &self.0.listeners.lock().expect("listeners lock is poisoned").len()).finish()
    }
}

/// Detaches its listener when dropped. Does not keep the broadcast alive.
#[must_use = "the listener is removed as soon as the guard is dropped"]
pub struct ListenerGuard<T> {
    inner: Weak<Inner<T>>,
    id: usize,
}

impl<T> Default for Broadcast<T> {
    fn default() -> Self { Self::new() }
}

impl<T> Broadcast<T> {
    pub fn new() -> Self { Self(Arc::new(Inner { listeners: Mutex::new(BTreeMap::new()), next_id: AtomicUsize::new(0) })) }

    /// Register a listener for the next (and only) firing.
    pub fn listen<F>(&self, listener: F) -> ListenerGuard<T>
    where F: Fn(T) + Send + Sync + 'static {
        let id = self.0.next_id.fetch_add(1, Ordering::Relaxed);
        self.0.listeners.lock().expect("listeners lock is poisoned").insert(id, Arc::new(listener));
        ListenerGuard { inner: Arc::downgrade(&self.0), id }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize { self.0.listeners.lock().expect("listeners lock is poisoned").len() }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl<T: Clone> Broadcast<T> {
    /// Takes every listener out of the registry and calls each with `value`.
    /// The lock is released before the first call, so listeners may register,
    /// drop guards or fire again without deadlocking.
    pub fn fire(&self, value: T) {
        let listeners = std::mem::take(&mut *self.0.listeners.lock().expect("listeners lock is poisoned"));

        if let Some((_, last)) = listeners.iter().next_back() {
            let last = last.clone();
            for listener in listeners.values().take(listeners.len() - 1) {
                listener(value.clone());
            }
            last(value);
        }
    }
}

impl<T> Drop for ListenerGuard<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.listeners.lock().expect("listeners lock is poisoned").remove(&self.id);
        }
    }
}
