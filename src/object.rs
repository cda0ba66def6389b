/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Domain objects referenced by operations.
//!
//! Every object carried by an operation is a `DomainObject`: a kind tag, a
//! numeric identifier and a set of scalar fields. The set of fields an object
//! may hold is fixed per kind (see `ObjectKind::fields`); attempts to set any
//! other field are rejected.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use error::{Result, FieldError};

/// The type of a domain object.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ObjectKind {
    /// A pipeline module
    Module,
    /// A module backed by a sub-workflow stored elsewhere
    Abstraction,
    /// A module wrapping an inline sub-workflow
    Group,
    /// A connection between two ports
    Connection,
    /// One end of a connection
    Port,
    /// A port declared on a module
    PortSpec,
    /// A function (method call) on a module
    Function,
    /// A parameter of a function
    Parameter,
    /// Position of a module on the canvas
    Location,
    /// A key-value annotation on a module
    Annotation,
}

const KINDS: [ObjectKind; 10] = [
    ObjectKind::Module, ObjectKind::Abstraction, ObjectKind::Group,
    ObjectKind::Connection, ObjectKind::Port, ObjectKind::PortSpec,
    ObjectKind::Function, ObjectKind::Parameter, ObjectKind::Location,
    ObjectKind::Annotation,
];

const MODULE_FIELDS: &'static [&'static str] =
    &["cache", "name", "namespace", "package", "version"];
const ABSTRACTION_FIELDS: &'static [&'static str] =
    &["cache", "name", "namespace", "package", "version", "internal_version"];

impl ObjectKind {
    /// The type tag used in documents and id buckets
    pub fn tag(self) -> &'static str {
        match self {
            ObjectKind::Module => "module",
            ObjectKind::Abstraction => "abstraction",
            ObjectKind::Group => "group",
            ObjectKind::Connection => "connection",
            ObjectKind::Port => "port",
            ObjectKind::PortSpec => "portSpec",
            ObjectKind::Function => "function",
            ObjectKind::Parameter => "parameter",
            ObjectKind::Location => "location",
            ObjectKind::Annotation => "annotation",
        }
    }

    /// Look up a kind from its tag
    pub fn from_tag(tag: &str) -> Option<ObjectKind> {
        KINDS.iter().cloned().find(|k| k.tag() == tag)
    }

    /// The fields objects of this kind may carry
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            ObjectKind::Module | ObjectKind::Group => MODULE_FIELDS,
            ObjectKind::Abstraction => ABSTRACTION_FIELDS,
            ObjectKind::Connection => &[],
            ObjectKind::Port => &["type", "moduleId", "moduleName", "name", "signature"],
            ObjectKind::PortSpec => &["name", "type", "spec"],
            ObjectKind::Function => &["pos", "name"],
            ObjectKind::Parameter => &["pos", "name", "type", "val", "alias"],
            ObjectKind::Location => &["x", "y"],
            ObjectKind::Annotation => &["key", "value"],
        }
    }

    /// True if objects of this kind declare the field
    pub fn has_field(self, field: &str) -> bool {
        self.fields().contains(&field)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// A scalar field value.
#[derive(Clone, PartialEq, Debug)]
pub enum Value {
    /// Absent value
    Null,
    /// Integer (also used for identifiers)
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Text
    Text(String),
}

impl Value {
    /// Get the integer, if this is one
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Value::Int(n) => Some(n),
            _ => None,
        }
    }
    /// Get the text, if this is text
    pub fn as_text(&self) -> Option<&str> {
        match *self {
            Value::Text(ref s) => Some(s),
            _ => None,
        }
    }
    /// True if `Null`
    pub fn is_null(&self) -> bool {
        *self == Value::Null
    }
}

impl<'a> From<&'a str> for Value {
    fn from(s: &'a str) -> Value { Value::Text(s.to_string()) }
}
impl From<String> for Value {
    fn from(s: String) -> Value { Value::Text(s) }
}
impl From<i64> for Value {
    fn from(n: i64) -> Value { Value::Int(n) }
}
impl From<f64> for Value {
    fn from(x: f64) -> Value { Value::Float(x) }
}

/// Key of an object in an `ObjectTable`
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ObjectKey {
    /// Object kind
    pub kind: ObjectKind,
    /// Object identifier (unique per kind bucket)
    pub id: u64,
}

impl ObjectKey {
    /// Create
    pub fn new(kind: ObjectKind, id: u64) -> ObjectKey {
        ObjectKey { kind: kind, id: id }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A domain object: kind, identifier and declared fields.
#[derive(Clone, PartialEq, Debug)]
pub struct DomainObject {
    kind: ObjectKind,
    id: u64,
    fields: BTreeMap<String, Value>,
}

impl DomainObject {
    /// Create with no fields set
    pub fn new(kind: ObjectKind, id: u64) -> DomainObject {
        DomainObject { kind: kind, id: id, fields: BTreeMap::new() }
    }

    /// Builder-style `set`; fails on fields not declared by the kind.
    pub fn with<V: Into<Value>>(mut self, field: &str, value: V) -> Result<DomainObject> {
        self.set(field, value.into())?;
        Ok(self)
    }

    /// Get the kind
    pub fn kind(&self) -> ObjectKind { self.kind }
    /// Get the identifier
    pub fn id(&self) -> u64 { self.id }
    /// Get the table key
    pub fn key(&self) -> ObjectKey { ObjectKey::new(self.kind, self.id) }

    /// Get a field. Unset fields (and those not declared) yield `None`.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Set a field. Fails if the kind does not declare this field; the object
    /// is unchanged in that case.
    pub fn set(&mut self, field: &str, value: Value) -> Result<()> {
        if !self.kind.has_field(field) {
            return Err(FieldError::new(self.kind, field).into());
        }
        self.fields.insert(field.to_string(), value);
        Ok(())
    }

    /// Apply several field updates at once. Either all fields are declared
    /// and all are applied, or an error is returned and none are.
    pub fn patch(&mut self, fields: &[(&str, Value)]) -> Result<()> {
        if let Some(&(name, _)) = fields.iter().find(|&&(name, _)| !self.kind.has_field(name)) {
            return Err(FieldError::new(self.kind, name).into());
        }
        for &(name, ref value) in fields {
            self.fields.insert(name.to_string(), value.clone());
        }
        Ok(())
    }

    /// Iterate over set fields, in name order
    pub fn fields_iter(&self) -> btree_map::Iter<String, Value> {
        self.fields.iter()
    }
}
