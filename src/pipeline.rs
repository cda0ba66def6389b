/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! The live set of objects at one version, obtained by replaying actions.

use action::{Action, Operation};
use object::{DomainObject, ObjectKind};
use table::ObjectTable;
use error::{Result, ReplayError};

/// Objects present at some version of a vistrail.
///
/// Unlike the vistrail's object table (which remembers everything ever
/// introduced), a pipeline forgets deleted and replaced objects.
#[derive(Clone, PartialEq, Debug)]
pub struct Pipeline {
    version: u64,
    objects: ObjectTable,
}

impl Pipeline {
    /// The empty pipeline at the root version (0)
    pub fn empty() -> Pipeline {
        Pipeline { version: 0, objects: ObjectTable::new() }
    }

    /// Apply an action's operations, in order.
    ///
    /// Fails if an operation is inconsistent with the current objects: adding
    /// a present object, changing or deleting an absent one, or adding
    /// without data. On failure the pipeline may be partially updated.
    pub fn apply(&mut self, action: &Action) -> Result<()> {
        for op in &action.operations {
            let fail = |msg| ReplayError::new(msg, action.id, op.id());
            match *op {
                Operation::Add(ref add) => {
                    let data = add.data.as_ref().ok_or_else(|| fail("add carries no data"))?;
                    if self.objects.contains(data.kind(), data.id()) {
                        return Err(fail("added object already present").into());
                    }
                    self.objects.add(data.clone());
                },
                Operation::Change(ref change) => {
                    if !self.objects.contains(change.what, change.old_obj_id) {
                        return Err(fail("changed object not present").into());
                    }
                    // without data, the change keeps the old object
                    if let Some(ref data) = change.data {
                        if data.id() != change.old_obj_id &&
                            self.objects.contains(data.kind(), data.id())
                        {
                            return Err(fail("replacement id already present").into());
                        }
                        self.objects.remove(change.what, change.old_obj_id);
                        self.objects.add(data.clone());
                    }
                },
                Operation::Delete(ref delete) => {
                    if self.objects.remove(delete.what, delete.object_id).is_none() {
                        return Err(fail("deleted object not present").into());
                    }
                },
            }
        }
        self.version = action.id;
        Ok(())
    }

    /// The version this pipeline represents
    pub fn version(&self) -> u64 { self.version }
    /// Look up an object
    pub fn get(&self, kind: ObjectKind, id: u64) -> Option<&DomainObject> {
        self.objects.get(kind, id)
    }
    /// All objects
    pub fn objects(&self) -> &ObjectTable { &self.objects }
    /// Number of objects
    pub fn len(&self) -> usize { self.objects.len() }
    /// True if no objects are present
    pub fn is_empty(&self) -> bool { self.objects.is_empty() }
    /// Iterate over modules (not including groups and abstractions)
    pub fn modules<'a>(&'a self) -> Box<dyn Iterator<Item = &'a DomainObject> + 'a> {
        self.objects.iter_kind(ObjectKind::Module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action::{Action, Operation};
    use object::{DomainObject, ObjectKind};
    use error::Error;

    fn module(id: u64, name: &str) -> DomainObject {
        DomainObject::new(ObjectKind::Module, id).with("name", name).expect("module")
    }

    #[test]
    fn apply_add_change_delete() {
        let mut p = Pipeline::empty();
        let mut a1 = Action::new(1, 0);
        a1.push(Operation::add(0, module(0, "A"), None));
        a1.push(Operation::add(1, module(1, "B"), None));
        p.apply(&a1).expect("a1");
        assert_eq!(p.len(), 2);
        assert_eq!(p.version(), 1);

        let mut a2 = Action::new(2, 1);
        a2.push(Operation::change(2, 0, module(2, "A2"), None));
        a2.push(Operation::delete(3, ObjectKind::Module, 1, None));
        p.apply(&a2).expect("a2");
        assert_eq!(p.len(), 1);
        assert!(p.get(ObjectKind::Module, 0).is_none());
        assert_eq!(p.get(ObjectKind::Module, 2), Some(&module(2, "A2")));
        assert_eq!(p.modules().count(), 1);
    }

    #[test]
    fn inconsistent_operations_fail() {
        let mut p = Pipeline::empty();
        let mut a = Action::new(1, 0);
        a.push(Operation::delete(0, ObjectKind::Module, 5, None));
        match p.apply(&a) {
            Err(Error::Replay(e)) => {
                assert_eq!(e.action(), 1);
                assert_eq!(e.operation(), 0);
            },
            other => panic!("unexpected: {:?}", other),
        }

        let mut a = Action::new(2, 0);
        a.push(Operation::add(1, module(3, "X"), None));
        a.push(Operation::add(2, module(3, "X"), None));
        assert!(p.apply(&a).is_err());
    }
}
