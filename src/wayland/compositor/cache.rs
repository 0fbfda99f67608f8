// The caching logic decouples the moment a client sends `commit` from the moment the
// committed state actually becomes current.
//
// Each piece of double-buffered state is stored in a `CachedState<T>`, and the full
// double-buffered state of a surface is the set of those held by a `MultiCache`:
//
// - requests mutably access the `pending` state to record client changes
// - on commit, a snapshot of the pending state is produced by `Cacheable::commit`. It is
//   either merged straight into `current`, or parked in the cache under a commit id when
//   the surface is not allowed to present yet
// - `MultiCache::apply_state` merges every parked snapshot up to the given commit id into
//   `current`, in commit order
//
// Commit ids are drawn from a per-surface counter, see `SurfaceData::commit`.

use std::{
    cell::{RefCell, RefMut},
    collections::VecDeque,
};

use downcast_rs::{impl_downcast, Downcast};

use crate::utils::Serial;

/// Trait representing a value that can be used in double-buffered storage
///
/// The type needs to implement the [`Default`] trait, which will be used
/// to initialize it. You further need to provide two methods:
/// [`Cacheable::commit`] and [`Cacheable::merge_into`].
///
/// When the client commits, [`Cacheable::commit`] is invoked on the pending value and
/// must produce the snapshot to be cached. Fields that are only valid for one commit
/// (attached buffers, damage) should be moved out of the pending state at this point,
/// leaving it reset for the next cycle.
///
/// [`Cacheable::merge_into`] is then invoked when the snapshot becomes current, `self`
/// being the update and `into` the current state.
pub trait Cacheable: Default {
    /// Produce a new state to be cached from the pending state
    fn commit(&mut self) -> Self;
    /// Merge a state update into the current state
    fn merge_into(self, into: &mut Self);
}

struct CachedState<T> {
    pending: T,
    cache: VecDeque<(Serial, T)>,
    current: T,
}

impl<T: Default> Default for CachedState<T> {
    fn default() -> Self {
        CachedState {
            pending: T::default(),
            cache: VecDeque::new(),
            current: T::default(),
        }
    }
}

trait Cache: Downcast {
    fn commit(&self, commit_id: Option<Serial>);
    fn apply_state(&self, commit_id: Serial);
    fn cached_len(&self) -> usize;
}
impl_downcast!(Cache);

impl<T: Cacheable + 'static> Cache for RefCell<CachedState<T>> {
    fn commit(&self, commit_id: Option<Serial>) {
        let mut guard = self.borrow_mut();
        let me = &mut *guard;
        let new_state = me.pending.commit();
        if let Some(id) = commit_id {
            match me.cache.back_mut() {
                Some(&mut (cid, ref mut state)) if cid == id => new_state.merge_into(state),
                _ => me.cache.push_back((id, new_state)),
            }
        } else {
            for (_, state) in me.cache.drain(..) {
                state.merge_into(&mut me.current);
            }
            new_state.merge_into(&mut me.current);
        }
    }

    fn apply_state(&self, commit_id: Serial) {
        let mut guard = self.borrow_mut();
        let me = &mut *guard;
        while let Some(&(id, _)) = me.cache.front() {
            if id > commit_id {
                break;
            }
            if let Some((_, state)) = me.cache.pop_front() {
                state.merge_into(&mut me.current);
            }
        }
    }

    fn cached_len(&self) -> usize {
        self.borrow().cache.len()
    }
}

/// A typemap-like container for double-buffered values
///
/// All values inserted into this container must implement the [`Cacheable`] trait,
/// which defines their buffering semantics.
///
/// Consumers of surface state will mostly be concerned with [`MultiCache::current`], while
/// request handlers write into [`MultiCache::pending`].
///
/// This container has [`RefCell`]-like semantics: values of multiple stored types can be
/// accessed at the same time. The stored values are initialized lazily the first time
/// `current()` or `pending()` are invoked with this type as argument.
pub struct MultiCache {
    caches: appendlist::AppendList<Box<dyn Cache>>,
}

impl std::fmt::Debug for MultiCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiCache").finish_non_exhaustive()
    }
}

impl MultiCache {
    pub(crate) fn new() -> Self {
        Self {
            caches: appendlist::AppendList::new(),
        }
    }

    fn find_or_insert<T: Cacheable + 'static>(&self) -> &RefCell<CachedState<T>> {
        let found = self
            .caches
            .iter()
            .position(|cache| (**cache).as_any().is::<RefCell<CachedState<T>>>());
        let index = match found {
            Some(index) => index,
            None => {
                self.caches
                    .push(Box::new(RefCell::new(CachedState::<T>::default())) as Box<_>);
                self.caches.len() - 1
            }
        };
        match (*self.caches[index]).as_any().downcast_ref() {
            Some(cache) => cache,
            None => unreachable!("cache entry has been type-checked"),
        }
    }

    /// Access the pending state associated with type `T`
    pub fn pending<T: Cacheable + 'static>(&self) -> RefMut<'_, T> {
        RefMut::map(self.find_or_insert::<T>().borrow_mut(), |cs| &mut cs.pending)
    }

    /// Access the current state associated with type `T`
    pub fn current<T: Cacheable + 'static>(&self) -> RefMut<'_, T> {
        RefMut::map(self.find_or_insert::<T>().borrow_mut(), |cs| &mut cs.current)
    }

    /// Check if the container currently contains values for type `T`
    pub fn has<T: Cacheable + 'static>(&self) -> bool {
        self.caches
            .iter()
            .any(|c| (**c).as_any().is::<RefCell<CachedState<T>>>())
    }

    /// Whether some committed state is waiting to be applied
    pub fn has_cached_state(&self) -> bool {
        self.caches.iter().any(|c| c.cached_len() > 0)
    }

    /// Commits the pending state, invoking [`Cacheable::commit`]
    ///
    /// If `commit_id` is `None`, the pending state is directly merged into the current state,
    /// after every state still waiting in the cache. Otherwise the snapshot is parked under
    /// this id. Ids are expected to be provided in increasing order according to [`Serial`]
    /// semantics.
    pub(crate) fn commit(&mut self, commit_id: Option<Serial>) {
        // none of the underlying borrow_mut() can panic, as we hold
        // a &mut reference to the container
        for cache in &self.caches {
            cache.commit(commit_id);
        }
    }

    /// Apply given identified cached state to the current one
    ///
    /// All other preceding states are applied as well, to preserve commit ordering
    pub(crate) fn apply_state(&mut self, commit_id: Serial) {
        for cache in &self.caches {
            cache.apply_state(commit_id);
        }
    }
}
