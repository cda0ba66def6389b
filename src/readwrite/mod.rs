/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Support for reading documents from and writing them to streams.
//!
//! A stored document is a header (see `header`), the document tree (see
//! `tree`) and a 32-byte SHA-256 checksum of all preceding bytes. The
//! execution log is not stored.

mod sum;
mod header;
mod tree;

pub use self::sum::{HashReader, HashWriter};
pub use self::header::{read_head, write_head, HEAD_BYTES};
pub use self::tree::{read_node, write_node};

use std::io::{Read, Write};

use schema::{Document, Node, SchemaVersion};
use sum::{Sum, SUM_BYTES};
use upgrade::Upgrader;
use vistrail::Vistrail;
use error::{Result, ReadError};

/// Write a document tree, tagged with its version, to a stream.
pub fn write_document(writer: &mut dyn Write, version: SchemaVersion, root: &Node) -> Result<Sum> {
    let mut w = HashWriter::new(writer);
    write_head(&mut w, version)?;
    write_node(&mut w, root)?;
    let sum = w.sum();
    sum.write(w.inner())?;
    debug!("wrote document in schema {} (checksum {})", version, sum);
    Ok(sum)
}

/// Write a vistrail to a stream in the current schema version.
///
/// Returns the checksum written.
pub fn write_vistrail(writer: &mut dyn Write, vistrail: &Vistrail) -> Result<Sum> {
    write_document(writer, SchemaVersion::current(), &vistrail.to_node())
}

/// Read a document tree from a stream, verifying its checksum.
///
/// The tree is returned as stored, in whichever supported schema version it
/// was written.
pub fn read_document(reader: &mut dyn Read) -> Result<Document> {
    let mut r = HashReader::new(reader);
    let version = read_head(&mut r)?;
    let mut pos = HEAD_BYTES;
    let root = read_node(&mut r, &mut pos)?;

    let sum = r.sum();
    let mut buf = [0u8; SUM_BYTES];
    r.inner().read_exact(&mut buf)?;
    if sum != Sum::load(&buf) {
        return ReadError::err("checksum invalid", pos);
    }
    debug!("read document in schema {} (checksum {})", version, sum);
    Ok(Document::new(version, root))
}

/// Read a vistrail from a stream, upgrading it to the current schema if
/// necessary.
pub fn read_vistrail(reader: &mut dyn Read) -> Result<Vistrail> {
    let doc = read_document(reader)?;
    Upgrader::standard()?.upgrade(&doc)
}
