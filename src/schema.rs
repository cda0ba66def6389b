/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Schema-neutral document trees and their mapping onto `Vistrail`.
//!
//! A document, in whatever schema version it was written, is first read into
//! a tree of `Node`s. Trees in older schemas are translated (see `upgrade`)
//! until they match the current schema, then converted to typed structures
//! with `Vistrail::from_node`.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

use action::*;
use object::{DomainObject, ObjectKind, Value};
use vistrail::Vistrail;
use error::{Error, Result};

/// The schema version written by this library
pub const CURRENT_VERSION: &'static str = "1.0.2";

/// All schema versions whose documents can be read. Older ones need
/// upgrading before use.
pub const SCHEMA_VERSIONS: [SchemaVersion; 3] = [
    SchemaVersion { major: 1, minor: 0, patch: 0 },
    SchemaVersion { major: 1, minor: 0, patch: 1 },
    SchemaVersion { major: 1, minor: 0, patch: 2 },
];

/// Format of timestamps in documents (always UTC)
pub const DATE_FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";

/// A schema version: `major.minor.patch`
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct SchemaVersion {
    /// Major number
    pub major: u16,
    /// Minor number
    pub minor: u16,
    /// Patch number
    pub patch: u16,
}

impl SchemaVersion {
    /// Create
    pub fn new(major: u16, minor: u16, patch: u16) -> SchemaVersion {
        SchemaVersion { major: major, minor: minor, patch: patch }
    }
    /// The version written by this library
    pub fn current() -> SchemaVersion {
        SCHEMA_VERSIONS[SCHEMA_VERSIONS.len() - 1]
    }
    /// True if documents of this version can be read
    pub fn is_supported(self) -> bool {
        SCHEMA_VERSIONS.contains(&self)
    }
}

lazy_static! {
    static ref VERSION_RE: ::std::result::Result<Regex, ::regex::Error> =
        Regex::new(r"^(\d{1,5})\.(\d{1,5})\.(\d{1,5})$");
}

fn version_regex() -> Result<&'static Regex> {
    VERSION_RE.as_ref().map_err(|e| Error::Regex(e.clone()))
}

impl FromStr for SchemaVersion {
    type Err = Error;
    fn from_str(s: &str) -> Result<SchemaVersion> {
        let caps = version_regex()?.captures(s.trim())
                .ok_or_else(|| Error::version(format!("malformed version '{}'", s)))?;
        let num = |i: usize| -> Result<u16> {
            caps[i].parse::<u16>()
                .map_err(|_| Error::version(format!("version number out of range in '{}'", s)))
        };
        Ok(SchemaVersion::new(num(1)?, num(2)?, num(3)?))
    }
}

impl Ord for SchemaVersion {
    fn cmp(&self, other: &SchemaVersion) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}
impl PartialOrd for SchemaVersion {
    fn partial_cmp(&self, other: &SchemaVersion) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}


/// A field of a node: a scalar or a list of child nodes
#[derive(Clone, PartialEq, Debug)]
pub enum Field {
    /// Scalar value
    Value(Value),
    /// Ordered child nodes
    Nodes(Vec<Node>),
}

/// A node of a document tree: a type tag and named fields.
#[derive(Clone, PartialEq, Debug)]
pub struct Node {
    vt_type: String,
    fields: BTreeMap<String, Field>,
}

impl Node {
    /// Create with no fields
    pub fn new<S: Into<String>>(vt_type: S) -> Node {
        Node { vt_type: vt_type.into(), fields: BTreeMap::new() }
    }
    /// Builder-style insertion of a scalar
    pub fn with<V: Into<Value>>(mut self, name: &str, value: V) -> Node {
        self.insert(name, Field::Value(value.into()));
        self
    }
    /// Builder-style insertion of an optional scalar (`None` becomes `Null`)
    pub fn with_opt<V: Into<Value>>(self, name: &str, value: Option<V>) -> Node {
        let value = value.map_or(Value::Null, |v| v.into());
        self.with(name, value)
    }
    /// Builder-style insertion of children
    pub fn with_nodes(mut self, name: &str, nodes: Vec<Node>) -> Node {
        self.insert(name, Field::Nodes(nodes));
        self
    }

    /// Type tag
    pub fn vt_type(&self) -> &str { &self.vt_type }
    /// Change the type tag
    pub fn set_vt_type<S: Into<String>>(&mut self, vt_type: S) { self.vt_type = vt_type.into(); }
    /// Get a field
    pub fn get(&self, name: &str) -> Option<&Field> { self.fields.get(name) }
    /// Get a scalar field (`None` if absent or a list)
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.fields.get(name) {
            Some(&Field::Value(ref v)) => Some(v),
            _ => None,
        }
    }
    /// Get child nodes (empty if absent or scalar)
    pub fn nodes(&self, name: &str) -> &[Node] {
        match self.fields.get(name) {
            Some(&Field::Nodes(ref nodes)) => nodes,
            _ => &[],
        }
    }
    /// Insert or replace a field
    pub fn insert(&mut self, name: &str, field: Field) -> Option<Field> {
        self.fields.insert(name.to_string(), field)
    }
    /// Remove a field
    pub fn remove(&mut self, name: &str) -> Option<Field> {
        self.fields.remove(name)
    }
    /// Iterate over fields, in name order
    pub fn fields_iter(&self) -> btree_map::Iter<String, Field> {
        self.fields.iter()
    }
    /// Number of fields
    pub fn num_fields(&self) -> usize { self.fields.len() }
}


/// A document tree tagged with the schema version it is written in.
///
/// The execution log and its filename are carried along when present but
/// are not part of the tree.
#[derive(Clone, PartialEq, Debug)]
pub struct Document {
    /// Schema version of `root`
    pub version: SchemaVersion,
    /// The `vistrail` node
    pub root: Node,
    /// Execution log filename
    pub log_filename: Option<PathBuf>,
    /// Execution log
    pub log: Option<Node>,
}

impl Document {
    /// Create without execution log
    pub fn new(version: SchemaVersion, root: Node) -> Document {
        Document { version: version, root: root, log_filename: None, log: None }
    }

    /// Snapshot a vistrail as a document in the current schema, including
    /// its execution log.
    pub fn from_vistrail(vistrail: &Vistrail) -> Document {
        Document {
            version: SchemaVersion::current(),
            root: vistrail.to_node(),
            log_filename: vistrail.log_filename().map(|p| p.to_path_buf()),
            log: vistrail.log().cloned(),
        }
    }
}


// —————  reading fields  —————

fn expect_type(node: &Node, vt_type: &str) -> Result<()> {
    if node.vt_type() != vt_type {
        return Err(Error::Schema(format!("expected {}, found {}", vt_type, node.vt_type())));
    }
    Ok(())
}

fn opt_id(node: &Node, name: &str) -> Result<Option<u64>> {
    match node.value(name) {
        None | Some(&Value::Null) => Ok(None),
        Some(&Value::Int(n)) if n >= 0 => Ok(Some(n as u64)),
        Some(_) => Err(Error::schema(node.vt_type(), name, "expected an identifier")),
    }
}

fn req_id(node: &Node, name: &str) -> Result<u64> {
    opt_id(node, name)?.ok_or_else(|| Error::schema(node.vt_type(), name, "missing"))
}

fn opt_text(node: &Node, name: &str) -> Result<Option<String>> {
    match node.value(name) {
        None | Some(&Value::Null) => Ok(None),
        Some(&Value::Text(ref s)) => Ok(Some(s.clone())),
        Some(_) => Err(Error::schema(node.vt_type(), name, "expected text")),
    }
}

fn req_text(node: &Node, name: &str) -> Result<String> {
    opt_text(node, name)?.ok_or_else(|| Error::schema(node.vt_type(), name, "missing"))
}

fn opt_date(node: &Node, name: &str) -> Result<Option<DateTime<Utc>>> {
    match opt_text(node, name)? {
        None => Ok(None),
        Some(s) => {
            let naive = NaiveDateTime::parse_from_str(&s, DATE_FORMAT)?;
            Ok(Some(Utc.from_utc_datetime(&naive)))
        }
    }
}

fn opt_bool(node: &Node, name: &str) -> Result<Option<bool>> {
    match node.value(name) {
        None | Some(&Value::Null) => Ok(None),
        Some(&Value::Int(n)) => Ok(Some(n != 0)),
        Some(_) => Err(Error::schema(node.vt_type(), name, "expected a flag")),
    }
}

fn opt_kind(node: &Node, name: &str) -> Result<Option<ObjectKind>> {
    match opt_text(node, name)? {
        None => Ok(None),
        Some(tag) => ObjectKind::from_tag(&tag).map(Some)
                .ok_or_else(|| Error::schema(node.vt_type(), name, "unknown object type")),
    }
}

fn req_kind(node: &Node, name: &str) -> Result<ObjectKind> {
    opt_kind(node, name)?.ok_or_else(|| Error::schema(node.vt_type(), name, "missing"))
}

fn opt_single(node: &Node, name: &str) -> Result<Option<DomainObject>> {
    match node.nodes(name) {
        [] => Ok(None),
        [data] => object_from_node(data).map(Some),
        _ => Err(Error::schema(node.vt_type(), name, "more than one object")),
    }
}

fn id_value(id: u64) -> Value {
    Value::Int(id as i64)
}

fn date_value(date: Option<DateTime<Utc>>) -> Value {
    date.map_or(Value::Null, |d| Value::Text(d.format(DATE_FORMAT).to_string()))
}


// —————  domain objects  —————

/// Convert a domain object to a node (type tag = kind tag)
pub fn object_to_node(obj: &DomainObject) -> Node {
    let mut node = Node::new(obj.kind().tag()).with("id", id_value(obj.id()));
    for (name, value) in obj.fields_iter() {
        node.insert(name, Field::Value(value.clone()));
    }
    node
}

/// Convert a node to a domain object. Fields not declared by the kind are
/// rejected.
pub fn object_from_node(node: &Node) -> Result<DomainObject> {
    let kind = ObjectKind::from_tag(node.vt_type())
            .ok_or_else(|| Error::Schema(format!("unknown object type {}", node.vt_type())))?;
    let mut obj = DomainObject::new(kind, req_id(node, "id")?);
    for (name, field) in node.fields_iter() {
        if name == "id" { continue; }
        match *field {
            Field::Value(ref v) => {
                if !kind.has_field(name) {
                    return Err(Error::schema(node.vt_type(), name, "undeclared field"));
                }
                obj.set(name, v.clone())?;
            },
            Field::Nodes(_) => {
                return Err(Error::schema(node.vt_type(), name, "nested objects are not supported"));
            },
        }
    }
    Ok(obj)
}


// —————  history records  —————

fn parent_to_node(node: Node, parent: Option<ParentRef>) -> Node {
    node.with_opt("parentObjId", parent.map(|p| p.id as i64))
        .with_opt("parentObjType", parent.map(|p| p.kind.tag()))
}

fn parent_from_node(node: &Node) -> Result<Option<ParentRef>> {
    match (opt_id(node, "parentObjId")?, opt_kind(node, "parentObjType")?) {
        (Some(id), Some(kind)) => Ok(Some(ParentRef { kind: kind, id: id })),
        (None, None) => Ok(None),
        _ => Err(Error::schema(node.vt_type(), "parentObjId", "parent id and type must be given together")),
    }
}

fn data_nodes(data: Option<&DomainObject>) -> Vec<Node> {
    data.map(|d| vec![object_to_node(d)]).unwrap_or_default()
}

/// Convert an operation to a node
pub fn operation_to_node(op: &Operation) -> Node {
    let node = match *op {
        Operation::Add(ref add) => Node::new(ADD_TAG)
                .with("objectId", id_value(add.object_id))
                .with_nodes("data", data_nodes(add.data.as_ref())),
        Operation::Change(ref change) => Node::new(CHANGE_TAG)
                .with("oldObjId", id_value(change.old_obj_id))
                .with("newObjId", id_value(change.new_obj_id))
                .with_nodes("data", data_nodes(change.data.as_ref())),
        Operation::Delete(ref delete) => Node::new(DELETE_TAG)
                .with("objectId", id_value(delete.object_id)),
    };
    let node = node.with("id", id_value(op.id())).with("what", op.what().tag());
    parent_to_node(node, op.parent())
}

/// Convert a node to an operation
pub fn operation_from_node(node: &Node) -> Result<Operation> {
    let id = req_id(node, "id")?;
    let what = req_kind(node, "what")?;
    let parent = parent_from_node(node)?;
    let op = match node.vt_type() {
        ADD_TAG => Operation::Add(AddOp {
            id: id,
            what: what,
            object_id: req_id(node, "objectId")?,
            parent: parent,
            data: opt_single(node, "data")?,
        }),
        CHANGE_TAG => Operation::Change(ChangeOp {
            id: id,
            what: what,
            old_obj_id: req_id(node, "oldObjId")?,
            new_obj_id: req_id(node, "newObjId")?,
            parent: parent,
            data: opt_single(node, "data")?,
        }),
        DELETE_TAG => Operation::Delete(DeleteOp {
            id: id,
            what: what,
            object_id: req_id(node, "objectId")?,
            parent: parent,
        }),
        other => return Err(Error::Schema(format!("unknown operation type {}", other))),
    };
    Ok(op)
}

fn annotation_to_node(a: &Annotation) -> Node {
    Node::new("annotation")
        .with("id", id_value(a.id))
        .with("key", a.key.as_str())
        .with("value", a.value.as_str())
}

fn annotation_from_node(node: &Node) -> Result<Annotation> {
    expect_type(node, "annotation")?;
    Ok(Annotation::new(req_id(node, "id")?, req_text(node, "key")?, req_text(node, "value")?))
}

fn action_annotation_to_node(a: &ActionAnnotation) -> Node {
    Node::new("actionAnnotation")
        .with("id", id_value(a.id))
        .with("key", a.key.as_str())
        .with("value", a.value.as_str())
        .with("action_id", id_value(a.action_id))
        .with("date", date_value(a.date))
        .with_opt("user", a.user.clone())
}

fn action_annotation_from_node(node: &Node) -> Result<ActionAnnotation> {
    expect_type(node, "actionAnnotation")?;
    Ok(ActionAnnotation {
        id: req_id(node, "id")?,
        key: req_text(node, "key")?,
        value: req_text(node, "value")?,
        action_id: req_id(node, "action_id")?,
        date: opt_date(node, "date")?,
        user: opt_text(node, "user")?,
    })
}

/// Convert an action to a node
pub fn action_to_node(action: &Action) -> Node {
    Node::new("action")
        .with("id", id_value(action.id))
        .with("prevId", id_value(action.prev_id))
        .with("date", date_value(action.date))
        .with_opt("session", action.session.map(|s| s as i64))
        .with_opt("user", action.user.clone())
        .with_opt("prune", action.prune.map(|p| p as i64))
        .with_nodes("annotations", action.annotations.iter().map(annotation_to_node).collect())
        .with_nodes("operations", action.operations.iter().map(operation_to_node).collect())
}

/// Convert a node to an action
pub fn action_from_node(node: &Node) -> Result<Action> {
    expect_type(node, "action")?;
    let mut action = Action::new(req_id(node, "id")?, opt_id(node, "prevId")?.unwrap_or(0));
    action.date = opt_date(node, "date")?;
    action.session = opt_id(node, "session")?;
    action.user = opt_text(node, "user")?;
    action.prune = opt_bool(node, "prune")?;
    for child in node.nodes("annotations") {
        action.annotations.push(annotation_from_node(child)?);
    }
    for child in node.nodes("operations") {
        action.operations.push(operation_from_node(child)?);
    }
    Ok(action)
}


// —————  vistrail  —————

impl Vistrail {
    /// Convert to a document tree in the current schema.
    ///
    /// The execution log and log filename are not part of the tree.
    pub fn to_node(&self) -> Node {
        Node::new("vistrail")
            .with_opt("id", self.id().map(|id| id as i64))
            .with("entity_type", "vistrail")
            .with("version", self.version())
            .with_opt("name", self.name())
            .with("last_modified", date_value(self.last_modified()))
            .with_nodes("actions", self.actions().iter().map(action_to_node).collect())
            .with_nodes("tags", self.tags().iter()
                    .map(|t| Node::new("tag").with("id", id_value(t.id)).with("name", t.name.as_str()))
                    .collect())
            .with_nodes("annotations", self.annotations().iter().map(annotation_to_node).collect())
            .with_nodes("actionAnnotations", self.action_annotations().iter()
                    .map(action_annotation_to_node).collect())
    }

    /// Replace this vistrail's content with that of a document tree in the
    /// current schema.
    ///
    /// The id scope and object table are left alone; follow with
    /// `update_id_scope()`.
    pub fn load_node(&mut self, node: &Node) -> Result<()> {
        expect_type(node, "vistrail")?;
        let mut actions = Vec::with_capacity(node.nodes("actions").len());
        for child in node.nodes("actions") {
            let action = action_from_node(child)?;
            if actions.iter().any(|a: &Action| a.id == action.id) {
                return Err(Error::schema("vistrail", "actions", "duplicate action id"));
            }
            actions.push(action);
        }
        let mut tags = vec![];
        for child in node.nodes("tags") {
            expect_type(child, "tag")?;
            tags.push(Tag { id: req_id(child, "id")?, name: req_text(child, "name")? });
        }
        let mut annotations = vec![];
        for child in node.nodes("annotations") {
            annotations.push(annotation_from_node(child)?);
        }
        let mut action_annotations = vec![];
        for child in node.nodes("actionAnnotations") {
            action_annotations.push(action_annotation_from_node(child)?);
        }

        self.set_id(opt_id(node, "id")?);
        if let Some(version) = opt_text(node, "version")? {
            self.set_version(version);
        }
        self.set_name(opt_text(node, "name")?);
        self.set_last_modified(opt_date(node, "last_modified")?);
        self.set_content(actions, tags, annotations, action_annotations);
        Ok(())
    }

    /// Build a vistrail from a document tree in the current schema, with id
    /// scope and object table derived from its content.
    pub fn from_node(node: &Node) -> Result<Vistrail> {
        let mut vistrail = Vistrail::new();
        vistrail.load_node(node)?;
        vistrail.update_id_scope();
        Ok(vistrail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action::{UserActionMeta, ParentRef};
    use object::{DomainObject, ObjectKind};
    use vistrail::Vistrail;

    #[test]
    fn parse_versions() {
        let v: SchemaVersion = "1.0.2".parse().expect("parse");
        assert_eq!(v, SchemaVersion::new(1, 0, 2));
        assert_eq!(v, SchemaVersion::current());
        assert_eq!(v.to_string(), CURRENT_VERSION);
        assert!("1.0".parse::<SchemaVersion>().is_err());
        assert!("1.0.99999".parse::<SchemaVersion>().is_err());
        assert!(SchemaVersion::new(1, 0, 1) < v);
        assert!(!SchemaVersion::new(2, 0, 0).is_supported());
    }

    #[test]
    fn version_pattern_compiled_once() {
        let first = version_regex().expect("pattern");
        for s in &["1.0.0", " 1.0.1 ", "65535.0.2"] {
            assert!(s.parse::<SchemaVersion>().is_ok());
        }
        match "1.x.0".parse::<SchemaVersion>() {
            Err(Error::Version(_)) => {},
            other => panic!("unexpected: {:?}", other),
        }
        assert!(::std::ptr::eq(first, version_regex().expect("pattern")));
    }

    #[test]
    fn tree_round_trip() {
        let mut vt = Vistrail::new();
        vt.set_name(Some("demo".to_string()));
        let meta = UserActionMeta::new("alice");
        let mut a = vt.new_action(0, &meta);
        let mid = vt.new_id("module");
        let m = DomainObject::new(ObjectKind::Module, mid)
                .with("name", "PythonSource").expect("name")
                .with("cache", 1i64).expect("cache");
        let op = vt.new_add(m, None);
        a.push(op);
        let loc = DomainObject::new(ObjectKind::Location, vt.new_id("location"))
                .with("x", 10.5).expect("x");
        let op = vt.new_add(loc, Some(ParentRef { kind: ObjectKind::Module, id: mid }));
        a.push(op);
        let aid = a.id;
        vt.add_action(a).expect("add");
        vt.set_tag(aid, "start").expect("tag");
        vt.add_annotation("notes", "hello");
        vt.add_action_annotation(aid, "__thumb__", "abc.png", &meta).expect("aa");

        let node = vt.to_node();
        assert_eq!(node.nodes("actions").len(), 1);
        let back = Vistrail::from_node(&node).expect("from_node");
        assert_eq!(back, vt);
    }

    #[test]
    fn schema_errors() {
        let bad = Node::new("vistrail").with_nodes("actions", vec![
            Node::new("action").with("id", 1i64).with_nodes("operations", vec![
                Node::new("add").with("id", 0i64).with("what", "widget").with("objectId", 1i64),
            ]),
        ]);
        match Vistrail::from_node(&bad) {
            Err(Error::Schema(msg)) => assert!(msg.contains("what")),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(Vistrail::from_node(&Node::new("workflow")).is_err());
    }
}
