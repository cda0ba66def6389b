/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! vtdb library
//!
//! vtdb stores the complete editing history of a workflow as a *vistrail*:
//! a tree of versions, where each version is an *action* recording a list
//! of *operations* (add, change or delete one domain object) relative to its
//! parent version. Annotations attach key-value notes to the document or to
//! individual actions, and tags name versions.
//!
//! Alongside the history a vistrail keeps two derived structures:
//!
//! *   an id scope, allocating fresh identifiers per type bucket so that new
//!     objects, operations and actions never collide with stored ones
//! *   an object table, resolving any object ever introduced by its type and
//!     identifier without walking the history
//!
//! Both are rebuilt from the actions after loading (`update_id_scope`). The
//! objects present at one version are obtained with `materialize`.
//!
//! Documents are stored as trees of generic nodes tagged with a schema
//! version. Older documents are upgraded through chains of translation
//! tables (see `upgrade`). The `readwrite` module provides a checksummed
//! binary stream format.
//!
//! Applications mark a checkout by storing digests of the annotations as
//! annotations themselves (see `update_checkout_version`), which later tells
//! them whether the document changed since.
//!
//! Terminology:
//!
//! *   **version**: the identifier of an action; version 0 is the empty root
//! *   **bucket**: an id counter, possibly shared by several type tags
//! *   **pipeline**: the live objects at one version
//!
//! Usage is normally via the `Vistrail` type; `vt` re-exports the most
//! useful names.

// This should probably be enabled by default for libraries.
#![warn(missing_docs)]

extern crate crypto;
extern crate chrono;
extern crate byteorder;
extern crate regex;
#[macro_use] extern crate lazy_static;
#[macro_use] extern crate log;

pub use vistrail::Vistrail;
pub use error::{Error, Result};

pub mod action;
pub mod checkout;
pub mod error;
pub mod id_scope;
pub mod object;
pub mod pipeline;
pub mod readwrite;
pub mod schema;
pub mod sum;
pub mod table;
pub mod upgrade;
pub mod vistrail;
pub mod vt;

/// Version. The low 16 bits are patch number, next 16 are the minor version
/// number, the next are the major version number. The top 16 are zero.
///
/// Until the library enters 'beta' phase this shall remain zero and nothing
/// shall be considered fixed.
pub const LIB_VERSION: u64 = 0x0000_0000_0000;
