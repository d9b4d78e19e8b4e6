//! Thread-local pool of visited sets for the recursive walkers.
//!
//! A walker acquires a set at entry and the guard hands it back, cleared,
//! when it drops. Nothing survives from one query to the next.

use std::cell::RefCell;
use std::collections::HashSet;

/// Identity of a visited symbol or node, see [`crate::model::Symbol::key`].
pub(crate) type VisitKey = (u8, usize);

thread_local! {
    static VISITED_POOL: RefCell<Vec<HashSet<VisitKey>>> = const { RefCell::new(Vec::new()) };
}

const MAX_POOLED_SETS: usize = 16;

/// RAII guard around a pooled visited set.
pub(crate) struct Visited {
    set: Option<HashSet<VisitKey>>,
}

impl Visited {
    pub(crate) fn acquire() -> Self {
        let set = VISITED_POOL
            .with(|pool| pool.borrow_mut().pop())
            .unwrap_or_default();
        Self { set: Some(set) }
    }

    /// `true` on first visit.
    pub(crate) fn insert(&mut self, key: VisitKey) -> bool {
        self.set.as_mut().is_some_and(|s| s.insert(key))
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, key: VisitKey) -> bool {
        self.set.as_ref().is_some_and(|s| s.contains(&key))
    }

    pub(crate) fn remove(&mut self, key: VisitKey) {
        if let Some(set) = self.set.as_mut() {
            set.remove(&key);
        }
    }
}

impl Drop for Visited {
    fn drop(&mut self) {
        if let Some(mut set) = self.set.take() {
            set.clear();
            VISITED_POOL.with(|pool| {
                let mut pool = pool.borrow_mut();
                if pool.len() < MAX_POOLED_SETS {
                    pool.push(set);
                }
            });
        }
    }
}

#[cfg(test)]
fn pooled_sets() -> usize {
    VISITED_POOL.with(|pool| pool.borrow().len())
}
