/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Convenient bindings to vtdb types, traits, functions and constants.

pub use ::LIB_VERSION;
pub use action::{Action, ActionAnnotation, Annotation, Operation, AddOp, ChangeOp, DeleteOp,
        ParentRef, Tag, MakeActionMeta, DefaultActionMeta, UserActionMeta};
pub use checkout::{CheckoutKeys, CheckoutStatus};
pub use error::{Result, Error, ReadError, FieldError, ReplayError};
pub use id_scope::IdScope;
pub use object::{DomainObject, ObjectKey, ObjectKind, Value};
pub use pipeline::Pipeline;
pub use readwrite::{read_document, read_vistrail, write_document, write_vistrail};
pub use schema::{Document, Field, Node, SchemaVersion, CURRENT_VERSION, SCHEMA_VERSIONS};
pub use sum::{Sum, SUM_BYTES};
pub use table::ObjectTable;
pub use upgrade::{TranslationTable, FieldRule, Upgrader, UpgradeStep, translate, update_version};
pub use vistrail::{Vistrail, new_id_scope};
