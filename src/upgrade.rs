/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Upgrading documents written in older schema versions.
//!
//! Each schema change is described by a `TranslationTable`: per type tag, an
//! optional new tag and rules for individual fields. Fields without a rule are
//! copied unchanged and child nodes are translated recursively. An `Upgrader`
//! chains such tables, one per version step, up to `CURRENT_VERSION`.

use std::collections::HashMap;
use std::fmt;

use schema::{Document, Field, Node, SchemaVersion, CURRENT_VERSION};
use object::Value;
use vistrail::Vistrail;
use error::{Error, Result};

/// Computes a field of the translated node from the untranslated node
pub type ComputeFn = Box<dyn Fn(&Node) -> Result<Field>>;

/// What to do with one field when translating
pub enum FieldRule {
    /// Move the value to a field of another name
    Rename(String),
    /// Omit the field
    Drop,
    /// Set the field to the result of a function of the old node. Applies
    /// whether or not the old node has the field.
    Compute(ComputeFn),
}

impl fmt::Debug for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FieldRule::Rename(ref name) => write!(f, "Rename({:?})", name),
            FieldRule::Drop => write!(f, "Drop"),
            FieldRule::Compute(_) => write!(f, "Compute(..)"),
        }
    }
}

#[derive(Debug, Default)]
struct TypeRule {
    new_type: Option<String>,
    fields: Vec<(String, FieldRule)>,
}

impl TypeRule {
    fn rule(&self, field: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|r| r.0 == field).map(|r| &r.1)
    }
}

/// Rules for translating document trees from one schema version to the next.
#[derive(Debug, Default)]
pub struct TranslationTable {
    types: HashMap<String, TypeRule>,
}

impl TranslationTable {
    /// Create an empty table (translation copies everything)
    pub fn new() -> TranslationTable {
        TranslationTable { types: HashMap::new() }
    }

    fn type_rule(&mut self, vt_type: &str) -> &mut TypeRule {
        self.types.entry(vt_type.to_string()).or_insert_with(TypeRule::default)
    }
    fn field_rule(&mut self, vt_type: &str, field: &str, rule: FieldRule) -> &mut Self {
        {
            let rules = &mut self.type_rule(vt_type).fields;
            rules.retain(|r| r.0 != field);
            rules.push((field.to_string(), rule));
        }
        self
    }

    /// Give nodes of type `old` the type tag `new`
    pub fn rename_type(&mut self, old: &str, new: &str) -> &mut Self {
        self.type_rule(old).new_type = Some(new.to_string());
        self
    }
    /// Rename a field of nodes of type `vt_type` (the old type tag)
    pub fn rename_field(&mut self, vt_type: &str, old: &str, new: &str) -> &mut Self {
        self.field_rule(vt_type, old, FieldRule::Rename(new.to_string()))
    }
    /// Drop a field of nodes of type `vt_type`
    pub fn drop_field(&mut self, vt_type: &str, field: &str) -> &mut Self {
        self.field_rule(vt_type, field, FieldRule::Drop)
    }
    /// Compute a field of nodes of type `vt_type`
    pub fn compute_field<F>(&mut self, vt_type: &str, field: &str, f: F) -> &mut Self
        where F: Fn(&Node) -> Result<Field> + 'static
    {
        self.field_rule(vt_type, field, FieldRule::Compute(Box::new(f)))
    }

    /// True if the table has no rules
    pub fn is_empty(&self) -> bool { self.types.is_empty() }
}

fn translate_field(field: &Field, table: &TranslationTable) -> Result<Field> {
    Ok(match *field {
        Field::Value(ref v) => Field::Value(v.clone()),
        Field::Nodes(ref nodes) => {
            let mut out = Vec::with_capacity(nodes.len());
            for node in nodes {
                out.push(translate(node, table)?);
            }
            Field::Nodes(out)
        },
    })
}

/// Translate a tree according to `table`.
///
/// Errors from computed fields propagate unchanged. Computed fields are
/// inserted last and are not themselves translated.
pub fn translate(node: &Node, table: &TranslationTable) -> Result<Node> {
    let rule = table.types.get(node.vt_type());
    let new_type = rule.and_then(|r| r.new_type.as_ref()).map_or(node.vt_type(), |t| t.as_str());
    let mut out = Node::new(new_type);
    for (name, field) in node.fields_iter() {
        match rule.and_then(|r| r.rule(name)) {
            None => {
                out.insert(name, translate_field(field, table)?);
            },
            Some(&FieldRule::Rename(ref new_name)) => {
                out.insert(new_name, translate_field(field, table)?);
            },
            Some(&FieldRule::Drop) | Some(&FieldRule::Compute(_)) => {},
        }
    }
    if let Some(rule) = rule {
        for &(ref name, ref field_rule) in &rule.fields {
            if let FieldRule::Compute(ref f) = *field_rule {
                out.insert(name, f(node)?);
            }
        }
    }
    Ok(out)
}

/// Build a current-schema vistrail from an older document.
///
/// The tree is translated with `table`, loaded into `new_vistrail` (or a
/// fresh vistrail) and the id scope and object table rebuilt. The execution
/// log and its filename are carried over only when the old document has
/// them. Translation and loading errors propagate unchanged.
pub fn update_version(old: &Document, table: &TranslationTable,
        new_vistrail: Option<Vistrail>) -> Result<Vistrail>
{
    let mut vistrail = new_vistrail.unwrap_or_else(Vistrail::new);
    let root = translate(&old.root, table)?;
    vistrail.load_node(&root)?;
    vistrail.set_version(CURRENT_VERSION);
    vistrail.update_id_scope();
    if let Some(ref filename) = old.log_filename {
        vistrail.set_log_filename(Some(filename.clone()));
    }
    if let Some(ref log) = old.log {
        vistrail.set_log(Some(log.clone()));
    }
    Ok(vistrail)
}


/// One step of an upgrade chain
#[derive(Debug)]
pub struct UpgradeStep {
    /// Version translated from
    pub from: SchemaVersion,
    /// Version translated to
    pub to: SchemaVersion,
    /// Translation rules
    pub table: TranslationTable,
}

/// Chains upgrade steps to bring documents to the current schema version.
#[derive(Debug, Default)]
pub struct Upgrader {
    steps: Vec<UpgradeStep>,
}

impl Upgrader {
    /// Create with no steps (only current documents can be upgraded)
    pub fn new() -> Upgrader {
        Upgrader { steps: vec![] }
    }

    /// Create with the steps between all supported schema versions
    pub fn standard() -> Result<Upgrader> {
        let mut upgrader = Upgrader::new();
        for step in standard_steps() {
            upgrader.add_step(step)?;
        }
        Ok(upgrader)
    }

    /// Add a step. Fails unless the step goes forwards and starts from a
    /// version no other step starts from.
    pub fn add_step(&mut self, step: UpgradeStep) -> Result<()> {
        if step.to <= step.from {
            return Err(Error::arg(format!("upgrade step {} -> {} does not go forwards", step.from, step.to)));
        }
        if self.steps.iter().any(|s| s.from == step.from) {
            return Err(Error::arg(format!("duplicate upgrade step from {}", step.from)));
        }
        self.steps.push(step);
        Ok(())
    }

    fn step_from(&self, version: SchemaVersion) -> Option<&UpgradeStep> {
        self.steps.iter().find(|s| s.from == version)
    }

    /// Translate a document's tree step by step until it is in the current
    /// schema. The log is carried along unchanged.
    pub fn upgrade_tree(&self, doc: &Document) -> Result<Document> {
        let current = SchemaVersion::current();
        if doc.version > current {
            return Err(Error::version(format!("document version {} is newer than {}", doc.version, current)));
        }
        self.upgrade_to(doc, current)
    }

    /// Upgrade a document to a current-schema vistrail.
    ///
    /// All but the final step translate trees only; the final step goes
    /// through `update_version`.
    pub fn upgrade(&self, doc: &Document) -> Result<Vistrail> {
        let current = SchemaVersion::current();
        if doc.version > current {
            return Err(Error::version(format!("document version {} is newer than {}", doc.version, current)));
        }
        if doc.version == current {
            return update_version(doc, &TranslationTable::new(), None);
        }
        let last = self.steps.iter().find(|s| s.to == current)
                .ok_or_else(|| Error::version(format!("no upgrade path from version {}", doc.version)))?;
        let penultimate = self.upgrade_to(doc, last.from)?;
        if penultimate.version != last.from {
            return Err(Error::version(format!("no upgrade path from version {}", doc.version)));
        }
        info!("upgrading document from schema {} to {}", last.from, last.to);
        update_version(&penultimate, &last.table, None)
    }

    // Translate trees until `target` is reached.
    fn upgrade_to(&self, doc: &Document, target: SchemaVersion) -> Result<Document> {
        let mut doc = doc.clone();
        while doc.version < target {
            let step = self.step_from(doc.version).ok_or_else(|| {
                Error::version(format!("no upgrade path from version {}", doc.version))
            })?;
            if step.to > target {
                return Err(Error::version(format!("upgrade step {} -> {} passes version {}",
                        step.from, step.to, target)));
            }
            info!("upgrading document from schema {} to {}", step.from, step.to);
            doc.root = translate(&doc.root, &step.table)?;
            doc.version = step.to;
        }
        Ok(doc)
    }
}

fn set_version(version: &'static str) -> impl Fn(&Node) -> Result<Field> {
    move |_: &Node| Ok(Field::Value(Value::from(version)))
}

fn standard_steps() -> Vec<UpgradeStep> {
    // 1.0.0: action annotations refer to their action as `actionId`; the
    // vistrail node has no `entity_type`.
    let mut t1 = TranslationTable::new();
    t1.rename_field("actionAnnotation", "actionId", "action_id")
        .compute_field("vistrail", "entity_type", |_| Ok(Field::Value(Value::from("vistrail"))))
        .compute_field("vistrail", "version", set_version("1.0.1"));

    // 1.0.1: parameter values are stored as `value`; vistrails carry an
    // unused `dbVersion`.
    let mut t2 = TranslationTable::new();
    t2.rename_field("parameter", "value", "val")
        .drop_field("vistrail", "dbVersion")
        .compute_field("vistrail", "version", set_version("1.0.2"));

    vec![
        UpgradeStep {
            from: SchemaVersion::new(1, 0, 0),
            to: SchemaVersion::new(1, 0, 1),
            table: t1,
        },
        UpgradeStep {
            from: SchemaVersion::new(1, 0, 1),
            to: SchemaVersion::new(1, 0, 2),
            table: t2,
        },
    ]
}
