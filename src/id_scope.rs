/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Identifier allocation.
//!
//! An `IdScope` hands out identifiers from named *buckets*. Each bucket has a
//! counter holding the next free identifier; counters only ever move forward.
//! Several type tags may share one bucket via the scope's remap table (for
//! example all three operation tags draw from the `operation` bucket).

use std::collections::HashMap;
use std::cmp::max;

/// Per-bucket monotonic identifier allocator.
///
/// This structure never fails: explicit identifiers supplied by callers are
/// not checked for collisions here.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct IdScope {
    begin_id: u64,
    ids: HashMap<String, u64>,
    remap: HashMap<String, String>,
}

impl IdScope {
    /// Create a scope where unseen buckets start at zero.
    ///
    /// `remap` maps a type tag onto the bucket it draws from. Tags not listed
    /// are their own bucket.
    pub fn new<'a, I>(remap: I) -> IdScope
        where I: IntoIterator<Item = (&'a str, &'a str)>
    {
        IdScope::with_begin_id(0, remap)
    }

    /// Create a scope where unseen buckets start at `begin_id`.
    pub fn with_begin_id<'a, I>(begin_id: u64, remap: I) -> IdScope
        where I: IntoIterator<Item = (&'a str, &'a str)>
    {
        IdScope {
            begin_id: begin_id,
            ids: HashMap::new(),
            remap: remap.into_iter()
                    .map(|(tag, bucket)| (tag.to_string(), bucket.to_string()))
                    .collect(),
        }
    }

    /// Resolve a type tag to its canonical bucket name.
    pub fn bucket<'a>(&'a self, tag: &'a str) -> &'a str {
        self.remap.get(tag).map_or(tag, |b| b.as_str())
    }

    /// Return the next unused id for the bucket `tag` resolves to, then
    /// advance that bucket.
    pub fn get_new_id(&mut self, tag: &str) -> u64 {
        let bucket = self.bucket(tag).to_string();
        let begin_id = self.begin_id;
        let counter = self.ids.entry(bucket).or_insert(begin_id);
        let id = *counter;
        *counter += 1;
        id
    }

    /// Initialise a bucket's counter to `n`.
    ///
    /// Unlike `update_begin_id` this may move a counter backwards; it is only
    /// meant for use on a freshly created scope.
    pub fn set_begin_id(&mut self, tag: &str, n: u64) {
        let bucket = self.bucket(tag).to_string();
        self.ids.insert(bucket, n);
    }

    /// Advance a bucket's counter to at least `n`. Never decreases it.
    ///
    /// Call this with `id + 1` for every id observed in loaded data so that
    /// later allocations cannot collide with it.
    pub fn update_begin_id(&mut self, tag: &str, n: u64) {
        let bucket = self.bucket(tag).to_string();
        let begin_id = self.begin_id;
        let counter = self.ids.entry(bucket).or_insert(begin_id);
        *counter = max(*counter, n);
    }

    /// Get the id `get_new_id` would return next for this tag, without
    /// advancing anything.
    pub fn current_id(&self, tag: &str) -> u64 {
        self.ids.get(self.bucket(tag)).map_or(self.begin_id, |n| *n)
    }

    /// Iterate over `(bucket, next id)` pairs of all buckets touched so far.
    pub fn buckets(&self) -> ::std::collections::hash_map::Iter<String, u64> {
        self.ids.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> IdScope {
        IdScope::new(vec![("add", "operation"), ("change", "operation"),
                ("abstraction", "module")])
    }

    #[test]
    fn allocation_is_monotonic() {
        let mut s = scope();
        assert_eq!(s.get_new_id("module"), 0);
        assert_eq!(s.get_new_id("module"), 1);
        s.update_begin_id("module", 10);
        assert_eq!(s.get_new_id("module"), 10);
        // never goes backwards
        s.update_begin_id("module", 3);
        assert_eq!(s.get_new_id("module"), 11);
        assert_eq!(s.current_id("module"), 12);
    }

    #[test]
    fn remapped_tags_share_a_bucket() {
        let mut s = scope();
        assert_eq!(s.get_new_id("add"), 0);
        assert_eq!(s.get_new_id("change"), 1);
        assert_eq!(s.get_new_id("operation"), 2);
        s.update_begin_id("abstraction", 7);
        assert_eq!(s.current_id("module"), 7);
        assert_eq!(s.bucket("change"), "operation");
        assert_eq!(s.bucket("connection"), "connection");
    }

    #[test]
    fn set_begin_id_initialises() {
        let mut s = scope();
        s.set_begin_id("action", 1);
        assert_eq!(s.current_id("action"), 1);
        assert_eq!(s.get_new_id("action"), 1);
        assert_eq!(s.current_id("never_seen"), 0);
    }

    #[test]
    fn unseen_buckets_start_at_begin_id() {
        let mut s = IdScope::with_begin_id(100, vec![("add", "operation")]);
        assert_eq!(s.current_id("module"), 100);
        assert_eq!(s.get_new_id("add"), 100);
        assert_eq!(s.current_id("operation"), 101);
        s.update_begin_id("port", 5);
        assert_eq!(s.current_id("port"), 100);
        s.update_begin_id("port", 150);
        assert_eq!(s.get_new_id("port"), 150);
        // an explicit initialisation still wins
        s.set_begin_id("action", 1);
        assert_eq!(s.get_new_id("action"), 1);
    }

    #[test]
    fn clones_are_independent() {
        let mut a = scope();
        a.get_new_id("module");
        let mut b = a.clone();
        b.get_new_id("module");
        b.get_new_id("module");
        assert_eq!(a.current_id("module"), 1);
        assert_eq!(b.current_id("module"), 3);
    }
}
