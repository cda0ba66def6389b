/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Object table: a flat `(kind, id)` index of domain objects.

use std::collections::HashMap;
use std::collections::hash_map as hm;

use object::{DomainObject, ObjectKey, ObjectKind, Value};
use error::{Error, Result};

/// Map of domain objects keyed by kind and identifier.
///
/// Within a `Vistrail` this holds every object introduced by any action so
/// that objects can be resolved without walking the action tree. The same
/// type also holds the live objects of a materialised `Pipeline`.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct ObjectTable {
    objects: HashMap<ObjectKey, DomainObject>,
}

impl ObjectTable {
    /// Create an empty table
    pub fn new() -> ObjectTable {
        ObjectTable { objects: HashMap::new() }
    }

    /// Store an object under its key, returning any object it replaced.
    pub fn add(&mut self, obj: DomainObject) -> Option<DomainObject> {
        self.objects.insert(obj.key(), obj)
    }

    /// Look up an object. `None` is a normal outcome.
    pub fn get(&self, kind: ObjectKind, id: u64) -> Option<&DomainObject> {
        self.objects.get(&ObjectKey::new(kind, id))
    }

    /// True if an object with this key is present
    pub fn contains(&self, kind: ObjectKind, id: u64) -> bool {
        self.objects.contains_key(&ObjectKey::new(kind, id))
    }

    /// Patch fields of a stored object in place.
    ///
    /// Fails if no such object is stored or if any field is not declared by
    /// the object's kind (in which case nothing is changed).
    pub fn update(&mut self, kind: ObjectKind, id: u64, fields: &[(&str, Value)]) -> Result<()> {
        let key = ObjectKey::new(kind, id);
        match self.objects.get_mut(&key) {
            Some(obj) => obj.patch(fields),
            None => Err(Error::not_found(format!("object {}", key))),
        }
    }

    /// Remove and return an object
    pub fn remove(&mut self, kind: ObjectKind, id: u64) -> Option<DomainObject> {
        self.objects.remove(&ObjectKey::new(kind, id))
    }

    /// Number of objects held
    pub fn len(&self) -> usize { self.objects.len() }
    /// True if no objects are held
    pub fn is_empty(&self) -> bool { self.objects.is_empty() }

    /// Iterate over all objects (in no particular order)
    pub fn iter(&self) -> hm::Values<ObjectKey, DomainObject> {
        self.objects.values()
    }
    /// Iterate over objects of one kind (in no particular order)
    pub fn iter_kind<'a>(&'a self, kind: ObjectKind) -> Box<dyn Iterator<Item = &'a DomainObject> + 'a> {
        Box::new(self.objects.values().filter(move |obj| obj.kind() == kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins() {
        let mut t = ObjectTable::new();
        let a = DomainObject::new(ObjectKind::Module, 4).with("name", "A").expect("a");
        let b = DomainObject::new(ObjectKind::Module, 4).with("name", "B").expect("b");
        assert!(t.add(a.clone()).is_none());
        assert_eq!(t.add(b.clone()), Some(a));
        assert_eq!(t.get(ObjectKind::Module, 4), Some(&b));
        assert_eq!(t.len(), 1);
        // same id, other kind: distinct key
        assert!(t.get(ObjectKind::Group, 4).is_none());
    }

    #[test]
    fn update_fails_loudly() {
        let mut t = ObjectTable::new();
        t.add(DomainObject::new(ObjectKind::Parameter, 2));
        t.update(ObjectKind::Parameter, 2, &[("alias", Value::from("x"))]).expect("update");
        assert_eq!(t.get(ObjectKind::Parameter, 2).and_then(|p| p.get("alias")),
                Some(&Value::from("x")));
        assert!(t.update(ObjectKind::Parameter, 2, &[("nope", Value::Null)]).is_err());
        assert!(t.update(ObjectKind::Parameter, 3, &[("alias", Value::Null)]).is_err());
    }
}
