/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Checkout marking: annotations recording the state of a vistrail when an
//! application last checked it out.
//!
//! Three annotations are stored per application tag: the latest action id
//! and digests of the annotations and action annotations. Comparing these
//! with recomputed values tells whether the document changed since.

use std::collections::{BTreeMap, BTreeSet};

use crypto::digest::Digest;
use crypto::md5::Md5;

use action::{ActionAnnotation, Annotation};
use vistrail::Vistrail;

/// Annotation keys used to mark a checkout by one application
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CheckoutKeys {
    /// Key of the latest action id
    pub base: String,
    /// Key of the annotation digest
    pub annotation_hash: String,
    /// Key of the action annotation digest
    pub action_annotation_hash: String,
}

impl CheckoutKeys {
    /// Keys for application tag `app`
    pub fn for_app(app: &str) -> CheckoutKeys {
        let base = format!("__checkout_version_{}", app);
        CheckoutKeys {
            annotation_hash: format!("{}_annotationhash", base),
            action_annotation_hash: format!("{}_actionannotationhash", base),
            base: base,
        }
    }

    fn all(&self) -> [&str; 3] {
        [&self.base, &self.annotation_hash, &self.action_annotation_hash]
    }
}

/// Result of comparing a vistrail with its checkout markers
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CheckoutStatus {
    /// No markers for this application
    NeverCheckedOut,
    /// Nothing changed since the checkout was marked
    Unchanged,
    /// Actions or annotations changed since the checkout was marked
    Changed,
}

// Group values by key, with duplicates removed and both keys and values
// sorted, then digest keys (via `feed_key`) and values in order.
fn digest_grouped<'a, K, I, F>(items: I, feed_key: F) -> String
    where K: Ord, I: Iterator<Item = (K, &'a str)>, F: Fn(&mut Md5, &K)
{
    let mut groups: BTreeMap<K, BTreeSet<&'a str>> = BTreeMap::new();
    for (key, value) in items {
        groups.entry(key).or_insert_with(BTreeSet::new).insert(value);
    }
    let mut hasher = Md5::new();
    for (key, values) in &groups {
        feed_key(&mut hasher, key);
        for value in values {
            hasher.input_str(value);
        }
    }
    hasher.result_str()
}

fn annotation_digest<'a, I: Iterator<Item = &'a Annotation>>(annotations: I) -> String {
    digest_grouped(annotations.map(|a| (a.key.as_str(), a.value.as_str())),
            |h, key| h.input_str(key))
}

// Grouped by the pair (action id as decimal, key); the two parts are only
// joined when fed to the digest.
fn action_annotation_digest<'a, I: Iterator<Item = &'a ActionAnnotation>>(annotations: I) -> String {
    digest_grouped(annotations.map(|a| ((a.action_id.to_string(), a.key.as_str()), a.value.as_str())),
            |h, &(ref action_id, key)| {
                h.input_str(action_id);
                h.input_str(key);
            })
}

impl Vistrail {
    /// Digest of the top-level annotations (lower-case hex MD5).
    ///
    /// Independent of annotation order, and of duplicated key-value pairs.
    pub fn hash_annotations(&self) -> String {
        annotation_digest(self.annotations().iter())
    }

    /// Digest of the action annotations (lower-case hex MD5), grouping by
    /// action id and key.
    pub fn hash_action_annotations(&self) -> String {
        action_annotation_digest(self.action_annotations().iter())
    }

    /// Record the current state as checked out by application `app`.
    ///
    /// Any existing markers for `app` are removed before the digests are
    /// computed, so marking twice in a row gives the same values.
    pub fn update_checkout_version(&mut self, app: &str) {
        let keys = CheckoutKeys::for_app(app);
        for key in keys.all().iter() {
            while self.delete_annotation_by_key(key).is_some() {}
        }
        let annotation_hash = self.hash_annotations();
        self.set_annotation(&keys.annotation_hash, annotation_hash);
        let action_annotation_hash = self.hash_action_annotations();
        self.set_annotation(&keys.action_annotation_hash, action_annotation_hash);
        let version = self.latest_action_id().to_string();
        info!("marking checkout by '{}' at version {}", app, version);
        self.set_annotation(&keys.base, version);
    }

    /// Compare with the checkout markers of application `app`.
    pub fn checkout_status(&self, app: &str) -> CheckoutStatus {
        let keys = CheckoutKeys::for_app(app);
        let stored = |key: &str| self.annotation_by_key(key).map(|a| a.value.as_str());
        let (base, ann_hash, aa_hash) = match (stored(&keys.base),
                stored(&keys.annotation_hash), stored(&keys.action_annotation_hash))
        {
            (Some(b), Some(h1), Some(h2)) => (b, h1, h2),
            _ => return CheckoutStatus::NeverCheckedOut,
        };
        let markers = keys.all();
        let current_ann_hash = annotation_digest(self.annotations().iter()
                .filter(|a| !markers.contains(&a.key.as_str())));
        if base == self.latest_action_id().to_string() &&
            ann_hash == current_ann_hash &&
            aa_hash == self.hash_action_annotations()
        {
            CheckoutStatus::Unchanged
        } else {
            CheckoutStatus::Changed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action::DefaultActionMeta;
    use vistrail::Vistrail;

    #[test]
    fn keys() {
        let keys = CheckoutKeys::for_app("ui");
        assert_eq!(keys.base, "__checkout_version_ui");
        assert_eq!(keys.annotation_hash, "__checkout_version_ui_annotationhash");
        assert_eq!(keys.action_annotation_hash, "__checkout_version_ui_actionannotationhash");
    }

    #[test]
    fn empty_digest() {
        // MD5 of no input
        assert_eq!(Vistrail::new().hash_annotations(), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn hash_order_and_duplicates() {
        let mut a = Vistrail::new();
        a.add_annotation("k1", "x");
        a.add_annotation("k2", "y");
        a.add_annotation("k1", "w");
        let mut b = Vistrail::new();
        b.add_annotation("k1", "w");
        b.add_annotation("k2", "y");
        b.add_annotation("k1", "x");
        b.add_annotation("k1", "x");
        assert_eq!(a.hash_annotations(), b.hash_annotations());
        b.add_annotation("k3", "z");
        assert!(a.hash_annotations() != b.hash_annotations());
    }

    #[test]
    fn action_annotations_group_by_action() {
        let meta = DefaultActionMeta;
        let mut a = Vistrail::new();
        let act = a.new_action(0, &meta);
        a.add_action(act).expect("add");
        let mut b = a.clone();
        a.add_action_annotation(1, "note", "v", &meta).expect("aa");
        a.add_action_annotation(1, "note", "v", &meta).expect("aa");
        b.add_action_annotation(1, "note", "v", &meta).expect("aa");
        assert_eq!(a.hash_action_annotations(), b.hash_action_annotations());
    }

    #[test]
    fn mark_twice_is_stable() {
        let mut vt = Vistrail::new();
        vt.add_annotation("notes", "hello");
        vt.update_checkout_version("ui");
        let first: Vec<_> = vt.annotations().to_vec();
        vt.update_checkout_version("ui");
        let second: Vec<_> = vt.annotations().to_vec();
        let values = |anns: &[Annotation]| {
            let mut v: Vec<(String, String)> = anns.iter()
                .map(|a| (a.key.clone(), a.value.clone())).collect();
            v.sort();
            v
        };
        assert_eq!(values(&first), values(&second));
        assert_eq!(second.len(), 4);
        assert_eq!(vt.annotation_by_key("__checkout_version_ui").map(|a| a.value.as_str()), Some("0"));
    }

    #[test]
    fn status() {
        let meta = DefaultActionMeta;
        let mut vt = Vistrail::new();
        assert_eq!(vt.checkout_status("ui"), CheckoutStatus::NeverCheckedOut);
        vt.update_checkout_version("ui");
        assert_eq!(vt.checkout_status("ui"), CheckoutStatus::Unchanged);
        // other applications' markers count as ordinary annotations
        vt.update_checkout_version("batch");
        assert_eq!(vt.checkout_status("ui"), CheckoutStatus::Changed);
        assert_eq!(vt.checkout_status("batch"), CheckoutStatus::Unchanged);

        let action = vt.new_action(0, &meta);
        vt.add_action(action).expect("add");
        assert_eq!(vt.checkout_status("batch"), CheckoutStatus::Changed);
    }

    fn with_action_annotations(items: &[(u64, &str, &str)]) -> Vistrail {
        let annotations = items.iter().enumerate().map(|(i, &(action_id, key, value))| {
            ActionAnnotation {
                id: i as u64,
                key: key.to_string(),
                value: value.to_string(),
                action_id: action_id,
                date: None,
                user: None,
            }
        }).collect();
        let mut vt = Vistrail::new();
        vt.set_content(vec![], vec![], vec![], annotations);
        vt.update_id_scope();
        vt
    }

    #[test]
    fn multi_digit_action_ids() {
        // (1, "0k") and (10, "k") join to the same text but are distinct groups
        let vt = with_action_annotations(&[(1, "0k", "a"), (10, "k", "b")]);
        assert_eq!(vt.hash_action_annotations(), "14a7d20d347542a7f06307d46c0537de");
        // ("1", "zz") sorts before ("10", "a")
        let vt = with_action_annotations(&[(10, "a", "b"), (1, "zz", "a")]);
        assert_eq!(vt.hash_action_annotations(), "1c5f6cf9db18fc3207884660c1215712");
        let vt = with_action_annotations(&[(2, "k", "w"), (1, "k", "v")]);
        assert_eq!(vt.hash_action_annotations(), "f7c255ba9e0244e3c45f7070599e0afa");
    }

    #[test]
    fn purge_keeps_annotations_sharing_an_id() {
        let mut vt = Vistrail::new();
        vt.set_content(vec![], vec![], vec![
            Annotation::new(5, "notes", "keep me"),
            Annotation::new(5, "__checkout_version_ui", "3"),
            Annotation::new(5, "__checkout_version_ui", "4"),
        ], vec![]);
        vt.update_id_scope();
        vt.update_checkout_version("ui");
        assert_eq!(vt.annotation_by_key("notes").map(|a| a.value.as_str()), Some("keep me"));
        assert_eq!(vt.annotations().iter().filter(|a| a.key == "__checkout_version_ui").count(), 1);
        assert_eq!(vt.annotation_by_key("__checkout_version_ui").map(|a| a.value.as_str()), Some("0"));

        let mut plain = Vistrail::new();
        plain.add_annotation("notes", "keep me");
        plain.update_checkout_version("ui");
        assert_eq!(vt.annotation_by_key("__checkout_version_ui_annotationhash").map(|a| &a.value),
                plain.annotation_by_key("__checkout_version_ui_annotationhash").map(|a| &a.value));
    }
}
