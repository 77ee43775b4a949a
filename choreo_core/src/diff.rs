// Copyright 2026 the Choreo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Order reconciliation shared by the element-keyed arrangers.
//!
//! [`reconcile`] walks the old and target orders side by side. At each index
//! `i`:
//!
//! 1. An old item absent from the target set starts leaving. If it keeps
//!    its slot while its exit transition plays, it is spliced into the
//!    working order at `i` and every later insertion shifts right by one.
//! 2. A target item that was not present before, or that was mid-exit, is
//!    entered afresh and spliced in at `i + leaving`.
//! 3. Any other target item is retained and spliced in at `i + leaving`.
//!
//! The callbacks run synchronously and in index order; leave requests at an
//! index are issued before enter requests at the same index.

use core::hash::Hash;

use indexmap::IndexSet;

/// Lifecycle hooks invoked by [`reconcile`].
pub(crate) trait Reconcile<K> {
    /// Starts the exit of `key`. Returns `true` if the item must keep its
    /// slot in the working order until its exit transition completes.
    fn leave(&mut self, key: K) -> bool;

    /// Starts the entry of `key`.
    fn enter(&mut self, key: K);

    /// Returns whether `key` is currently mid-exit.
    fn is_leaving(&self, key: K) -> bool;
}

/// Removes duplicates, keeping the first occurrence of each key.
pub(crate) fn dedup<K: Copy + Eq + Hash>(keys: impl IntoIterator<Item = K>) -> Vec<K> {
    keys.into_iter().collect::<IndexSet<K>>().into_iter().collect()
}

/// Computes the working order for one container.
///
/// `was_present` reports whether a key was part of the arrangement before
/// this pass; `is_targeted` whether it is part of the new one. For a single
/// container those are membership in `old` and `target`; multi-container
/// arrangers pass the union across all containers so that an item moving
/// between containers neither leaves nor re-enters.
pub(crate) fn reconcile<K, R>(
    old: &[K],
    target: &[K],
    was_present: impl Fn(K) -> bool,
    is_targeted: impl Fn(K) -> bool,
    ops: &mut R,
) -> Vec<K>
where
    K: Copy,
    R: Reconcile<K> + ?Sized,
{
    let mut order = Vec::with_capacity(old.len().max(target.len()));
    let mut leaving = 0;

    for i in 0..old.len().max(target.len()) {
        if let Some(&old_key) = old.get(i)
            && !is_targeted(old_key)
            && ops.leave(old_key)
        {
            order.insert(i.min(order.len()), old_key);
            leaving += 1;
        }

        if let Some(&key) = target.get(i) {
            if !was_present(key) || ops.is_leaving(key) {
                ops.enter(key);
            }
            order.insert((i + leaving).min(order.len()), key);
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    /// Records calls. With `keep` set, leaving items hold their slot.
    #[derive(Default)]
    struct Recorder {
        keep: bool,
        leaving: HashSet<char>,
        log: Vec<String>,
    }

    impl Reconcile<char> for Recorder {
        fn leave(&mut self, key: char) -> bool {
            self.log.push(format!("leave {key}"));
            self.leaving.insert(key);
            self.keep
        }

        fn enter(&mut self, key: char) {
            self.log.push(format!("enter {key}"));
            self.leaving.remove(&key);
        }

        fn is_leaving(&self, key: char) -> bool {
            self.leaving.contains(&key)
        }
    }

    fn run(old: &[char], target: &[char], ops: &mut Recorder) -> Vec<char> {
        let target = dedup(target.iter().copied());
        let old_set: HashSet<char> = old.iter().copied().collect();
        let target_set: HashSet<char> = target.iter().copied().collect();
        reconcile(
            old,
            &target,
            |k| old_set.contains(&k),
            |k| target_set.contains(&k),
            ops,
        )
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        assert_eq!(dedup(['a', 'b', 'a', 'c', 'b']), vec!['a', 'b', 'c']);
    }

    #[test]
    fn reorder_with_immediate_leave() {
        let mut ops = Recorder::default();
        let order = run(&['a', 'b', 'c'], &['c', 'a'], &mut ops);
        assert_eq!(order, vec!['c', 'a']);
        assert_eq!(ops.log, vec!["leave b"]);
    }

    #[test]
    fn leaving_items_keep_their_slot() {
        let mut ops = Recorder {
            keep: true,
            ..Recorder::default()
        };
        let order = run(&['a', 'b', 'c'], &['c', 'a'], &mut ops);
        assert_eq!(order, vec!['c', 'b', 'a']);
    }

    #[test]
    fn new_items_enter_in_index_order() {
        let mut ops = Recorder::default();
        let order = run(&['a'], &['x', 'a', 'y'], &mut ops);
        assert_eq!(order, vec!['x', 'a', 'y']);
        assert_eq!(ops.log, vec!["enter x", "enter y"]);
    }

    #[test]
    fn duplicates_enter_once() {
        let mut ops = Recorder::default();
        let order = run(&[], &['a', 'b', 'a'], &mut ops);
        assert_eq!(order, vec!['a', 'b']);
        assert_eq!(ops.log, vec!["enter a", "enter b"]);
    }

    #[test]
    fn leave_is_requested_before_enter_at_same_index() {
        let mut ops = Recorder::default();
        let order = run(&['a'], &['b'], &mut ops);
        assert_eq!(order, vec!['b']);
        assert_eq!(ops.log, vec!["leave a", "enter b"]);
    }

    #[test]
    fn leaving_item_requested_again_reenters() {
        let mut ops = Recorder {
            keep: true,
            ..Recorder::default()
        };
        let first = run(&['a', 'b'], &['a'], &mut ops);
        assert_eq!(first, vec!['a', 'b']);

        let second = run(&first, &['a', 'b'], &mut ops);
        assert_eq!(second, vec!['a', 'b']);
        assert_eq!(ops.log, vec!["leave b", "enter b"]);
    }

    #[test]
    fn reconcile_is_deterministic() {
        let old = ['a', 'b', 'c', 'd'];
        let target = ['d', 'x', 'b', 'x', 'y'];
        let mut first = Recorder {
            keep: true,
            ..Recorder::default()
        };
        let mut second = Recorder {
            keep: true,
            ..Recorder::default()
        };
        assert_eq!(run(&old, &target, &mut first), run(&old, &target, &mut second));
        assert_eq!(first.log, second.log);
    }
}
