/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! The vistrail: the versioned document holding a workflow's full history.
//!
//! A `Vistrail` owns an ordered list of actions (forming a tree via each
//! action's `prev_id`), tags, annotations and action annotations. Alongside
//! these it keeps two derived structures:
//!
//! *   an `IdScope`, guaranteeing newly allocated ids never collide with ids
//!     present in the document
//! *   an `ObjectTable`, indexing every object introduced by any action
//!
//! Both are rebuilt from the actions by `update_id_scope()`; `add_action()`
//! keeps them current incrementally.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use action::*;
use id_scope::IdScope;
use object::{DomainObject, ObjectKind, Value};
use pipeline::Pipeline;
use schema::{Node, CURRENT_VERSION};
use table::ObjectTable;
use error::{Error, Result};

/// Tags sharing an id bucket with another tag
pub const ID_REMAP: [(&'static str, &'static str); 5] = [
    (ADD_TAG, OPERATION_BUCKET),
    (CHANGE_TAG, OPERATION_BUCKET),
    (DELETE_TAG, OPERATION_BUCKET),
    ("abstraction", "module"),
    ("group", "module"),
];

/// Create the id scope used by vistrails: with `ID_REMAP` applied and
/// action ids starting at 1 (0 is the root version).
pub fn new_id_scope() -> IdScope {
    let mut scope = IdScope::new(ID_REMAP.iter().cloned());
    scope.set_begin_id(ACTION_BUCKET, 1);
    scope
}

/// A versioned workflow document.
///
/// Cloning copies everything, including id scope and object table; a clone
/// never shares mutable state with its source.
#[derive(Clone, PartialEq, Debug)]
pub struct Vistrail {
    id: Option<u64>,
    version: String,
    name: Option<String>,
    last_modified: Option<DateTime<Utc>>,
    actions: Vec<Action>,
    action_index: HashMap<u64, usize>,
    tags: Vec<Tag>,
    annotations: Vec<Annotation>,
    action_annotations: Vec<ActionAnnotation>,
    id_scope: IdScope,
    objects: ObjectTable,
    log_filename: Option<PathBuf>,
    log: Option<Node>,
}

/// Record every id found in `action` in the scope and register its payloads
/// in the table.
fn scan_action(scope: &mut IdScope, objects: &mut ObjectTable, action: &Action) {
    scope.update_begin_id(ACTION_BUCKET, action.id + 1);
    if let Some(session) = action.session {
        scope.update_begin_id(SESSION_BUCKET, session + 1);
    }
    for op in &action.operations {
        scope.update_begin_id(OPERATION_BUCKET, op.id() + 1);
        if let Some(new_id) = op.new_obj_id() {
            scope.update_begin_id(op.what().tag(), new_id + 1);
            match op.data() {
                Some(data) => {
                    objects.add(data.clone());
                },
                None => {
                    if let Operation::Change(ref change) = *op {
                        warn!("action {}: change {} carries no data; keeping {} {}",
                                action.id, change.id, change.what, change.old_obj_id);
                    }
                }
            }
        }
    }
    for annotation in &action.annotations {
        scope.update_begin_id(ANNOTATION_BUCKET, annotation.id + 1);
    }
}

impl Vistrail {
    /// Create an empty vistrail in the current schema version.
    pub fn new() -> Vistrail {
        Vistrail {
            id: None,
            version: CURRENT_VERSION.to_string(),
            name: None,
            last_modified: None,
            actions: vec![],
            action_index: HashMap::new(),
            tags: vec![],
            annotations: vec![],
            action_annotations: vec![],
            id_scope: new_id_scope(),
            objects: ObjectTable::new(),
            log_filename: None,
            log: None,
        }
    }

    /// Replace the document content wholesale (used when loading). The id
    /// scope and object table are *not* updated; call `update_id_scope()`.
    pub fn set_content(&mut self, actions: Vec<Action>, tags: Vec<Tag>,
            annotations: Vec<Annotation>, action_annotations: Vec<ActionAnnotation>)
    {
        self.action_index = actions.iter().enumerate().map(|(i, a)| (a.id, i)).collect();
        self.actions = actions;
        self.tags = tags;
        self.annotations = annotations;
        self.action_annotations = action_annotations;
    }

    /// Scan all actions, annotations and action annotations, advancing each
    /// id bucket past every id found and registering every payload in the
    /// object table.
    ///
    /// Running this twice yields the same scope and table as running it once.
    pub fn update_id_scope(&mut self) {
        for action in &self.actions {
            scan_action(&mut self.id_scope, &mut self.objects, action);
        }
        for annotation in &self.annotations {
            self.id_scope.update_begin_id(ANNOTATION_BUCKET, annotation.id + 1);
        }
        for annotation in &self.action_annotations {
            self.id_scope.update_begin_id(ACTION_ANNOTATION_BUCKET, annotation.id + 1);
        }
        debug!("scanned {} actions, {} annotations, {} action annotations; {} objects indexed",
                self.actions.len(), self.annotations.len(),
                self.action_annotations.len(), self.objects.len());
    }

    // —————  document fields  —————

    /// Document identifier (assigned by a database, if any)
    pub fn id(&self) -> Option<u64> { self.id }
    /// Set the document identifier
    pub fn set_id(&mut self, id: Option<u64>) { self.id = id; }
    /// Schema version the document was written in
    pub fn version(&self) -> &str { &self.version }
    /// Set the schema version string
    pub fn set_version<S: Into<String>>(&mut self, version: S) { self.version = version.into(); }
    /// Document name
    pub fn name(&self) -> Option<&str> { self.name.as_ref().map(|s| s.as_str()) }
    /// Set the document name
    pub fn set_name(&mut self, name: Option<String>) { self.name = name; }
    /// Time of last modification
    pub fn last_modified(&self) -> Option<DateTime<Utc>> { self.last_modified }
    /// Set the time of last modification
    pub fn set_last_modified(&mut self, t: Option<DateTime<Utc>>) { self.last_modified = t; }

    /// The identifier allocator
    pub fn id_scope(&self) -> &IdScope { &self.id_scope }
    /// Allocate a new id for some type tag (e.g. `"module"`, `"add"`)
    pub fn new_id(&mut self, tag: &str) -> u64 {
        self.id_scope.get_new_id(tag)
    }

    /// Execution log filename
    pub fn log_filename(&self) -> Option<&Path> {
        self.log_filename.as_ref().map(|p| p.as_path())
    }
    /// Set the execution log filename
    pub fn set_log_filename(&mut self, path: Option<PathBuf>) { self.log_filename = path; }
    /// Execution log (an object tree opaque to this crate)
    pub fn log(&self) -> Option<&Node> { self.log.as_ref() }
    /// Set the execution log
    pub fn set_log(&mut self, log: Option<Node>) { self.log = log; }

    // —————  object table  —————

    /// Store an object in the object table (last write wins).
    ///
    /// Objects added this way and not via an action will not survive
    /// rebuilding the table from the actions.
    pub fn add_object(&mut self, obj: DomainObject) {
        self.objects.add(obj);
    }
    /// Look up an object introduced by any action
    pub fn get_object(&self, kind: ObjectKind, id: u64) -> Option<&DomainObject> {
        self.objects.get(kind, id)
    }
    /// The object table
    pub fn objects(&self) -> &ObjectTable { &self.objects }

    /// Patch fields of an object in place (e.g. to fix up parameter aliases).
    ///
    /// The patch is applied to the table entry and to the payload of the
    /// latest operation which introduced it, so that rebuilding the table
    /// from the actions yields the same object. Fails without changing
    /// anything if the object is unknown or any field is not declared by its
    /// kind.
    pub fn update_object(&mut self, kind: ObjectKind, id: u64, fields: &[(&str, Value)]) -> Result<()> {
        self.objects.update(kind, id, fields)?;
        let key = (kind, id);
        let payload = self.actions.iter_mut().rev()
                .flat_map(|a| a.operations.iter_mut().rev())
                .filter_map(|op| op.data_mut())
                .find(|data| (data.kind(), data.id()) == key);
        if let Some(data) = payload {
            data.patch(fields)?;
        }
        Ok(())
    }

    // —————  actions  —————

    /// Create a new action (not yet added) with a fresh id and metadata from
    /// `meta`.
    pub fn new_action(&mut self, prev_id: u64, meta: &dyn MakeActionMeta) -> Action {
        let mut action = Action::new(self.id_scope.get_new_id(ACTION_BUCKET), prev_id);
        action.date = Some(meta.make_timestamp());
        action.user = meta.make_user();
        action.session = meta.make_session();
        action
    }

    /// Create an `Add` operation with a fresh operation id
    pub fn new_add(&mut self, data: DomainObject, parent: Option<ParentRef>) -> Operation {
        Operation::add(self.id_scope.get_new_id(ADD_TAG), data, parent)
    }
    /// Create a `Change` operation with a fresh operation id
    pub fn new_change(&mut self, old_obj_id: u64, data: DomainObject, parent: Option<ParentRef>) -> Operation {
        Operation::change(self.id_scope.get_new_id(CHANGE_TAG), old_obj_id, data, parent)
    }
    /// Create a `Delete` operation with a fresh operation id
    pub fn new_delete(&mut self, what: ObjectKind, object_id: u64, parent: Option<ParentRef>) -> Operation {
        Operation::delete(self.id_scope.get_new_id(DELETE_TAG), what, object_id, parent)
    }

    /// Append an action to the history.
    ///
    /// Fails if the action's id is 0 or already used, or its parent is
    /// neither the root (0) nor an existing action. On success the id scope
    /// and object table are updated from the action.
    pub fn add_action(&mut self, action: Action) -> Result<()> {
        if action.id == 0 || self.action_index.contains_key(&action.id) {
            return Err(Error::arg(format!("action id {} unavailable", action.id)));
        }
        if action.prev_id != 0 && !self.action_index.contains_key(&action.prev_id) {
            return Err(Error::not_found(format!("parent action {}", action.prev_id)));
        }
        trace!("adding action {} (parent {}, {} operations)",
                action.id, action.prev_id, action.operations.len());
        scan_action(&mut self.id_scope, &mut self.objects, &action);
        self.action_index.insert(action.id, self.actions.len());
        self.actions.push(action);
        Ok(())
    }

    /// Get an action by id
    pub fn action(&self, id: u64) -> Option<&Action> {
        self.action_index.get(&id).map(|i| &self.actions[*i])
    }
    /// All actions, in stored order
    pub fn actions(&self) -> &[Action] { &self.actions }
    /// Number of actions
    pub fn num_actions(&self) -> usize { self.actions.len() }
    /// Largest action id, or 0 if there are no actions
    pub fn latest_action_id(&self) -> u64 {
        self.actions.iter().map(|a| a.id).max().unwrap_or(0)
    }

    /// Get the actions leading from the root to `version`, root first.
    ///
    /// Version 0 (the root) yields an empty path.
    pub fn path_to(&self, version: u64) -> Result<Vec<&Action>> {
        let mut path = vec![];
        let mut current = version;
        while current != 0 {
            let action = self.action(current)
                    .ok_or_else(|| Error::not_found(format!("action {}", current)))?;
            path.push(action);
            if path.len() > self.actions.len() {
                return Err(Error::arg("action ancestry contains a cycle"));
            }
            current = action.prev_id;
        }
        path.reverse();
        Ok(path)
    }

    /// Replay the actions from the root to `version` and return the objects
    /// present at that version.
    pub fn materialize(&self, version: u64) -> Result<Pipeline> {
        let mut pipeline = Pipeline::empty();
        for action in self.path_to(version)? {
            pipeline.apply(action)?;
        }
        Ok(pipeline)
    }

    // —————  tags  —————

    /// All tags
    pub fn tags(&self) -> &[Tag] { &self.tags }
    /// Find a tag by name
    pub fn tag_by_name(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == name)
    }
    /// Name version `action_id`, replacing any previous name of it.
    ///
    /// Fails if the action does not exist or the name is used by another
    /// version.
    pub fn set_tag<S: Into<String>>(&mut self, action_id: u64, name: S) -> Result<()> {
        let name = name.into();
        if self.action(action_id).is_none() {
            return Err(Error::not_found(format!("action {}", action_id)));
        }
        if self.tags.iter().any(|t| t.name == name && t.id != action_id) {
            return Err(Error::arg(format!("tag '{}' already in use", name)));
        }
        self.tags.retain(|t| t.id != action_id);
        self.tags.push(Tag { id: action_id, name: name });
        Ok(())
    }

    // —————  annotations  —————

    /// All top-level annotations
    pub fn annotations(&self) -> &[Annotation] { &self.annotations }
    /// Add an annotation with a fresh id; returns the id
    pub fn add_annotation<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> u64 {
        let id = self.id_scope.get_new_id(ANNOTATION_BUCKET);
        self.annotations.push(Annotation::new(id, key, value));
        id
    }
    /// True if any annotation has this key
    pub fn has_annotation_with_key(&self, key: &str) -> bool {
        self.annotations.iter().any(|a| a.key == key)
    }
    /// Get the first annotation with this key
    pub fn annotation_by_key(&self, key: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.key == key)
    }
    /// Remove an annotation by id
    pub fn delete_annotation(&mut self, id: u64) -> Option<Annotation> {
        let pos = self.annotations.iter().position(|a| a.id == id);
        pos.map(|i| self.annotations.remove(i))
    }
    /// Remove the first annotation with this key.
    ///
    /// Annotation ids are not required to be unique, so this never touches
    /// an annotation with another key.
    pub fn delete_annotation_by_key(&mut self, key: &str) -> Option<Annotation> {
        let pos = self.annotations.iter().position(|a| a.key == key);
        pos.map(|i| self.annotations.remove(i))
    }
    /// Set the value of the first annotation with this key, or add one with a
    /// fresh id. Returns the annotation's id.
    pub fn set_annotation<V: Into<String>>(&mut self, key: &str, value: V) -> u64 {
        let value = value.into();
        if let Some(annotation) = self.annotations.iter_mut().find(|a| a.key == key) {
            annotation.value = value;
            return annotation.id;
        }
        self.add_annotation(key, value)
    }

    /// All action annotations
    pub fn action_annotations(&self) -> &[ActionAnnotation] { &self.action_annotations }
    /// Attach an annotation to an existing action; returns its id.
    pub fn add_action_annotation<K, V>(&mut self, action_id: u64, key: K, value: V,
            meta: &dyn MakeActionMeta) -> Result<u64>
        where K: Into<String>, V: Into<String>
    {
        if self.action(action_id).is_none() {
            return Err(Error::not_found(format!("action {}", action_id)));
        }
        let id = self.id_scope.get_new_id(ACTION_ANNOTATION_BUCKET);
        self.action_annotations.push(ActionAnnotation {
            id: id,
            key: key.into(),
            value: value.into(),
            action_id: action_id,
            date: Some(meta.make_timestamp()),
            user: meta.make_user(),
        });
        Ok(id)
    }
}

impl Default for Vistrail {
    fn default() -> Vistrail { Vistrail::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action::{Action, Annotation, ChangeOp, DefaultActionMeta, Operation};
    use object::{DomainObject, ObjectKind, Value};

    fn module(id: u64, name: &str) -> DomainObject {
        DomainObject::new(ObjectKind::Module, id).with("name", name).expect("module")
    }

    #[test]
    fn replay_scenario() {
        let m = module(5, "M");
        let mut action = Action::new(1, 0);
        action.push(Operation::add(3, m.clone(), None));
        action.annotations.push(Annotation::new(1, "notes", "first"));

        let mut vt = Vistrail::new();
        vt.set_content(vec![action], vec![], vec![], vec![]);
        vt.update_id_scope();

        let scope = vt.id_scope();
        assert!(scope.current_id("action") >= 2);
        assert!(scope.current_id("operation") >= 4);
        assert!(scope.current_id("module") >= 6);
        assert!(scope.current_id("annotation") >= 2);
        assert_eq!(vt.get_object(ObjectKind::Module, 5), Some(&m));
    }

    #[test]
    fn replay_change_without_data() {
        let mut action = Action::new(2, 0);
        action.session = Some(4);
        action.push(Operation::Change(ChangeOp {
            id: 6,
            what: ObjectKind::Module,
            old_obj_id: 3,
            new_obj_id: 9,
            parent: None,
            data: None,
        }));

        let mut vt = Vistrail::new();
        vt.set_content(vec![action], vec![], vec![], vec![]);
        vt.update_id_scope();

        let scope = vt.id_scope();
        assert!(scope.current_id("session") >= 5);
        assert!(scope.current_id("operation") >= 7);
        assert!(scope.current_id("module") >= 10);
        assert!(vt.get_object(ObjectKind::Module, 9).is_none());
        assert!(vt.objects().is_empty());
    }

    #[test]
    fn add_action_checks_ids() {
        let mut vt = Vistrail::new();
        let meta = DefaultActionMeta;
        let mut a = vt.new_action(0, &meta);
        assert_eq!(a.id, 1);
        let m = module(vt.new_id("module"), "A");
        let op = vt.new_add(m, None);
        a.push(op);
        vt.add_action(a.clone()).expect("add");
        assert!(vt.add_action(a).is_err());
        assert!(vt.add_action(Action::new(9, 4)).is_err());
        assert_eq!(vt.latest_action_id(), 1);
        assert_eq!(vt.new_id("action"), 2);
    }

    #[test]
    fn update_object_patches_history() {
        let mut vt = Vistrail::new();
        let meta = DefaultActionMeta;
        let mut a = vt.new_action(0, &meta);
        let p = DomainObject::new(ObjectKind::Parameter, vt.new_id("parameter"));
        let op = vt.new_add(p, None);
        a.push(op);
        vt.add_action(a).expect("add");

        vt.update_object(ObjectKind::Parameter, 0, &[("alias", Value::from("x"))])
                .expect("update");
        assert!(vt.update_object(ObjectKind::Parameter, 0, &[("colour", Value::Null)]).is_err());

        // rebuilding the table from the actions gives the patched object
        let mut rebuilt = Vistrail::new();
        rebuilt.set_content(vt.actions().to_vec(), vec![], vec![], vec![]);
        rebuilt.update_id_scope();
        assert_eq!(rebuilt.objects(), vt.objects());
    }

    #[test]
    fn set_annotation_updates_in_place() {
        let mut vt = Vistrail::new();
        let id = vt.set_annotation("k", "1");
        assert_eq!(vt.set_annotation("k", "2"), id);
        assert_eq!(vt.annotations().len(), 1);
        assert_eq!(vt.annotation_by_key("k").map(|a| a.value.as_str()), Some("2"));
        assert!(vt.delete_annotation(id).is_some());
        assert!(!vt.has_annotation_with_key("k"));
    }

    #[test]
    fn tags_are_unique() {
        let mut vt = Vistrail::new();
        let meta = DefaultActionMeta;
        let a = vt.new_action(0, &meta);
        let b = vt.new_action(1, &meta);
        vt.add_action(a).expect("a");
        vt.add_action(b).expect("b");
        vt.set_tag(1, "first").expect("tag 1");
        assert!(vt.set_tag(2, "first").is_err());
        vt.set_tag(1, "renamed").expect("rename");
        assert_eq!(vt.tags().len(), 1);
        assert_eq!(vt.tag_by_name("renamed").map(|t| t.id), Some(1));
        assert!(vt.set_tag(7, "missing").is_err());
    }
}
