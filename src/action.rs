/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Actions, operations and annotations: the records making up a vistrail's
//! history.

use chrono::{DateTime, Timelike, Utc};

use object::{DomainObject, ObjectKind};

/// Type tag of an `Add` operation (an id scope tag)
pub const ADD_TAG: &'static str = "add";
/// Type tag of a `Change` operation (an id scope tag)
pub const CHANGE_TAG: &'static str = "change";
/// Type tag of a `Delete` operation (an id scope tag)
pub const DELETE_TAG: &'static str = "delete";
/// Bucket shared by all operations
pub const OPERATION_BUCKET: &'static str = "operation";
/// Bucket of action identifiers
pub const ACTION_BUCKET: &'static str = "action";
/// Bucket of session identifiers
pub const SESSION_BUCKET: &'static str = "session";
/// Bucket of annotation identifiers (top-level and per-action)
pub const ANNOTATION_BUCKET: &'static str = "annotation";
/// Bucket of action-annotation identifiers
pub const ACTION_ANNOTATION_BUCKET: &'static str = "actionAnnotation";

/// A key-value note. Keys are not required to be unique.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Annotation {
    /// Identifier (from the `annotation` bucket)
    pub id: u64,
    /// Key
    pub key: String,
    /// Value
    pub value: String,
}

impl Annotation {
    /// Create
    pub fn new<K: Into<String>, V: Into<String>>(id: u64, key: K, value: V) -> Annotation {
        Annotation { id: id, key: key.into(), value: value.into() }
    }
}

/// An annotation attached to a specific action without modifying it.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ActionAnnotation {
    /// Identifier (from the `actionAnnotation` bucket)
    pub id: u64,
    /// Key
    pub key: String,
    /// Value
    pub value: String,
    /// The annotated action
    pub action_id: u64,
    /// Time of creation
    pub date: Option<DateTime<Utc>>,
    /// Author
    pub user: Option<String>,
}

/// A name given to a version. The tag's `id` is the tagged action's id.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Tag {
    /// Tagged action
    pub id: u64,
    /// Name (unique within a vistrail)
    pub name: String,
}

/// Reference to the parent object of an operation's subject
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ParentRef {
    /// Parent kind
    pub kind: ObjectKind,
    /// Parent identifier
    pub id: u64,
}

/// Operation adding an object
#[derive(Clone, PartialEq, Debug)]
pub struct AddOp {
    /// Operation id
    pub id: u64,
    /// Kind of object added
    pub what: ObjectKind,
    /// Identifier of the object added
    pub object_id: u64,
    /// Parent of the added object, if any
    pub parent: Option<ParentRef>,
    /// The object
    pub data: Option<DomainObject>,
}

/// Operation replacing one object with another of the same kind
#[derive(Clone, PartialEq, Debug)]
pub struct ChangeOp {
    /// Operation id
    pub id: u64,
    /// Kind of object changed
    pub what: ObjectKind,
    /// Identifier of the replaced object
    pub old_obj_id: u64,
    /// Identifier of the replacement
    pub new_obj_id: u64,
    /// Parent of the object, if any
    pub parent: Option<ParentRef>,
    /// The replacement object. If absent the change is a placeholder which
    /// keeps the old object.
    pub data: Option<DomainObject>,
}

/// Operation removing an object
#[derive(Clone, PartialEq, Debug)]
pub struct DeleteOp {
    /// Operation id
    pub id: u64,
    /// Kind of object removed
    pub what: ObjectKind,
    /// Identifier of the object removed
    pub object_id: u64,
    /// Parent of the removed object, if any
    pub parent: Option<ParentRef>,
}

/// One atomic edit within an action
#[derive(Clone, PartialEq, Debug)]
pub enum Operation {
    /// Introduce an object
    Add(AddOp),
    /// Replace an object
    Change(ChangeOp),
    /// Remove an object
    Delete(DeleteOp),
}

impl Operation {
    /// Create an `Add` of `data`. `id` should come from the `add` tag of the
    /// owning vistrail's id scope.
    pub fn add(id: u64, data: DomainObject, parent: Option<ParentRef>) -> Operation {
        Operation::Add(AddOp {
            id: id,
            what: data.kind(),
            object_id: data.id(),
            parent: parent,
            data: Some(data),
        })
    }
    /// Create a `Change` replacing object `old_obj_id` with `data`.
    pub fn change(id: u64, old_obj_id: u64, data: DomainObject, parent: Option<ParentRef>) -> Operation {
        Operation::Change(ChangeOp {
            id: id,
            what: data.kind(),
            old_obj_id: old_obj_id,
            new_obj_id: data.id(),
            parent: parent,
            data: Some(data),
        })
    }
    /// Create a `Delete`
    pub fn delete(id: u64, what: ObjectKind, object_id: u64, parent: Option<ParentRef>) -> Operation {
        Operation::Delete(DeleteOp {
            id: id,
            what: what,
            object_id: object_id,
            parent: parent,
        })
    }

    /// The operation's type tag: `add`, `change` or `delete`
    pub fn tag(&self) -> &'static str {
        match *self {
            Operation::Add(_) => ADD_TAG,
            Operation::Change(_) => CHANGE_TAG,
            Operation::Delete(_) => DELETE_TAG,
        }
    }
    /// Operation identifier
    pub fn id(&self) -> u64 {
        match *self {
            Operation::Add(ref op) => op.id,
            Operation::Change(ref op) => op.id,
            Operation::Delete(ref op) => op.id,
        }
    }
    /// Kind of the object operated on
    pub fn what(&self) -> ObjectKind {
        match *self {
            Operation::Add(ref op) => op.what,
            Operation::Change(ref op) => op.what,
            Operation::Delete(ref op) => op.what,
        }
    }
    /// Parent reference
    pub fn parent(&self) -> Option<ParentRef> {
        match *self {
            Operation::Add(ref op) => op.parent,
            Operation::Change(ref op) => op.parent,
            Operation::Delete(ref op) => op.parent,
        }
    }
    /// Identifier of the object present *after* the operation.
    ///
    /// For a `Change` carrying no data this falls back to the old id.
    pub fn object_id(&self) -> u64 {
        match *self {
            Operation::Add(ref op) => op.object_id,
            Operation::Change(ref op) => {
                if op.data.is_some() { op.new_obj_id } else { op.old_obj_id }
            },
            Operation::Delete(ref op) => op.object_id,
        }
    }
    /// Identifier the operation allocates in its kind's bucket: `None` for
    /// deletions, the new id for changes (even without data).
    pub fn new_obj_id(&self) -> Option<u64> {
        match *self {
            Operation::Add(ref op) => Some(op.object_id),
            Operation::Change(ref op) => Some(op.new_obj_id),
            Operation::Delete(_) => None,
        }
    }
    /// Payload, if any
    pub fn data(&self) -> Option<&DomainObject> {
        match *self {
            Operation::Add(ref op) => op.data.as_ref(),
            Operation::Change(ref op) => op.data.as_ref(),
            Operation::Delete(_) => None,
        }
    }
    /// Payload, mutably
    pub fn data_mut(&mut self) -> Option<&mut DomainObject> {
        match *self {
            Operation::Add(ref mut op) => op.data.as_mut(),
            Operation::Change(ref mut op) => op.data.as_mut(),
            Operation::Delete(_) => None,
        }
    }
}

/// One committed edit: an ordered list of operations.
#[derive(Clone, PartialEq, Debug)]
pub struct Action {
    /// Identifier (from the `action` bucket); also the version number
    pub id: u64,
    /// Parent version (0 is the root)
    pub prev_id: u64,
    /// Time of creation
    pub date: Option<DateTime<Utc>>,
    /// Editing session
    pub session: Option<u64>,
    /// Author
    pub user: Option<String>,
    /// Hidden from history views
    pub prune: Option<bool>,
    /// Annotations scoped to this action
    pub annotations: Vec<Annotation>,
    /// Operations, applied in order
    pub operations: Vec<Operation>,
}

impl Action {
    /// Create with no operations. Use `Vistrail::new_action` to get an id
    /// and metadata filled in.
    pub fn new(id: u64, prev_id: u64) -> Action {
        Action {
            id: id,
            prev_id: prev_id,
            date: None,
            session: None,
            user: None,
            prune: None,
            annotations: vec![],
            operations: vec![],
        }
    }

    /// Append an operation
    pub fn push(&mut self, op: Operation) {
        self.operations.push(op);
    }

    /// Get the first annotation with this key
    pub fn annotation_by_key(&self, key: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.key == key)
    }
}


/// Interface used to customise metadata of new actions (and action
/// annotations).
pub trait MakeActionMeta {
    /// Controls creation of timestamps. The default implementation returns
    /// the current UTC time, truncated to whole seconds (the precision
    /// stored in documents).
    fn make_timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        now.with_nanosecond(0).unwrap_or(now)
    }

    /// The user recorded on new actions. Default: none.
    fn make_user(&self) -> Option<String> {
        None
    }

    /// The session recorded on new actions. Default: none.
    fn make_session(&self) -> Option<u64> {
        None
    }
}

/// `MakeActionMeta` using all defaults
pub struct DefaultActionMeta;
impl MakeActionMeta for DefaultActionMeta {}

/// `MakeActionMeta` recording a fixed user name
pub struct UserActionMeta {
    user: String,
}
impl UserActionMeta {
    /// Create
    pub fn new<S: Into<String>>(user: S) -> UserActionMeta {
        UserActionMeta { user: user.into() }
    }
}
impl MakeActionMeta for UserActionMeta {
    fn make_user(&self) -> Option<String> {
        Some(self.user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object::{DomainObject, ObjectKind};

    #[test]
    fn change_without_data_keeps_old_id() {
        let op = Operation::Change(ChangeOp {
            id: 3,
            what: ObjectKind::Module,
            old_obj_id: 4,
            new_obj_id: 9,
            parent: None,
            data: None,
        });
        assert_eq!(op.object_id(), 4);
        assert_eq!(op.new_obj_id(), Some(9));
        assert_eq!(op.tag(), CHANGE_TAG);

        let op = Operation::change(3, 4, DomainObject::new(ObjectKind::Module, 9), None);
        assert_eq!(op.object_id(), 9);
    }

    #[test]
    fn add_takes_identity_from_data() {
        let parent = ParentRef { kind: ObjectKind::Module, id: 1 };
        let op = Operation::add(7, DomainObject::new(ObjectKind::Location, 2), Some(parent));
        assert_eq!(op.what(), ObjectKind::Location);
        assert_eq!(op.object_id(), 2);
        assert_eq!(op.parent(), Some(parent));
        let del = Operation::delete(8, ObjectKind::Location, 2, Some(parent));
        assert_eq!(del.new_obj_id(), None);
        assert!(del.data().is_none());
    }
}
