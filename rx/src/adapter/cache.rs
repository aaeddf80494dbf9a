use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, Weak};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

const MIN_SWEEP_THRESHOLD: usize = 64;

/// Identity-keyed map from a foreign source to the canonical instance built for
/// it.
///
/// Keys are the source's address plus the canonical type, so one object
/// adapted as two different canonical types gets two entries. A slot owns its
/// canonical instance, and every canonical instance owns exactly one strong
/// reference to its source, so a cached source cannot be freed and its address
/// cannot be reused while the slot exists. Once the canonical instances are the
/// only owners left, nobody can present the source again and its slots are
/// dead; dead slots are swept as the map grows.
pub(crate) struct IdentityCache {
    slots: LazyLock<DashMap<(usize, TypeId), Slot>>,
    // sweep dead slots once the map grows past this
    threshold: AtomicUsize,
}

struct Slot {
    source: Box<dyn Owners>,
    canonical: Arc<dyn Any + Send + Sync>,
}

trait Owners: Send + Sync {
    fn owners(&self) -> usize;
}

impl<S: ?Sized + Send + Sync> Owners for Weak<S> {
    fn owners(&self) -> usize { self.strong_count() }
}

impl Slot {
    fn new<S, C>(source: &Arc<S>, canonical: &Arc<C>) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        C: Any + Send + Sync,
    {
        Self { source: Box::new(Arc::downgrade(source)), canonical: canonical.clone() }
    }

    // `siblings` is the number of slots for this source, each holding one reference
    fn is_dead(&self, siblings: usize) -> bool { self.source.owners() <= siblings }

    fn get<C: Any + Send + Sync>(&self) -> Option<Arc<C>> { self.canonical.clone().downcast::<C>().ok() }
}

impl IdentityCache {
    pub(crate) const fn new() -> Self { Self { slots: LazyLock::new(DashMap::new), threshold: AtomicUsize::new(MIN_SWEEP_THRESHOLD) } }

    /// The canonical instance cached for `source`, or the one `make` builds,
    /// which is then cached. `make` must return a canonical instance that holds
    /// exactly one strong reference to `source`.
    ///
    /// No lock is held while `make` runs or while anything the cache lets go of
    /// is dropped, so both may run user code, including code that adapts other
    /// sources. Racing callers for one source may each run `make`; only the first
    /// insert is kept and every caller gets that one.
    pub(crate) fn get_or_insert_with<S, C>(&self, source: &Arc<S>, make: impl FnOnce() -> Arc<C>) -> Arc<C>
    where
        S: ?Sized + Send + Sync + 'static,
        C: Any + Send + Sync,
    {
        let key = (Arc::as_ptr(source) as *const () as usize, TypeId::of::<C>());
        if let Some(canonical) = self.slots.get(&key).and_then(|slot| slot.value().get::<C>()) {
            return canonical;
        }

        let built = make();
        let (canonical, displaced) = match self.slots.entry(key) {
            Entry::Occupied(mut occupied) => match occupied.get().get::<C>() {
                Some(existing) => (existing, None),
                None => (built.clone(), Some(occupied.insert(Slot::new(source, &built)))),
            },
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::new(source, &built));
                (built.clone(), None)
            }
        };
        // shard lock released; a losing `built` is dropped here
        drop(displaced);
        drop(built);

        tracing::trace!("adapter cache miss for {key:?}");
        self.maybe_sweep();
        canonical
    }

    fn maybe_sweep(&self) {
        let len = self.slots.len();
        if len < self.threshold.load(Ordering::Relaxed) {
            return;
        }
        let snapshot: Vec<_> = self.slots.iter().map(|slot| (*slot.key(), slot.value().source.owners())).collect();
        let mut siblings: HashMap<usize, usize> = HashMap::new();
        for ((address, _), _) in &snapshot {
            *siblings.entry(*address).or_default() += 1;
        }
        let dead = snapshot.into_iter().filter_map(|(key, owners)| {
            let count = siblings[&key.0];
            (owners <= count).then_some((key, count))
        });
        let mut swept = 0;
        for (key, count) in dead {
            // removed under the shard lock, dropped after it
            if self.slots.remove_if(&key, |_, slot| slot.is_dead(count)).is_some() {
                swept += 1;
            }
        }
        let live = self.slots.len();
        self.threshold.store((live * 2).max(MIN_SWEEP_THRESHOLD), Ordering::Relaxed);
        tracing::trace!("adapter cache swept {swept} dead slots");
    }

    #[cfg(test)]
    fn len(&self) -> usize { self.slots.len() }
}
