/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Read and write support for document file headers.
//!
//! A header is 16 bytes: the magic `VISTRAIL` then the schema version as
//! eight ASCII digits, `MMmmmppp` (major, minor, patch).

use std::io::{Read, Write};

use schema::SchemaVersion;
use error::{Error, Result, ReadError};

const MAGIC: [u8; 8] = *b"VISTRAIL";

/// Length of a header in bytes
pub const HEAD_BYTES: usize = 16;

// Decodes a string of ASCII digits. Returns `None` on a non-digit.
fn read_digits(s: &[u8]) -> Option<u16> {
    let mut v: u16 = 0;
    for c in s {
        if *c < b'0' || *c > b'9' { return None; }
        v = 10 * v + (*c - b'0') as u16;
    }
    Some(v)
}

/// Read a file header, returning the schema version of the document.
///
/// Fails on unknown magic or a version not listed in `SCHEMA_VERSIONS`.
pub fn read_head(r: &mut dyn Read) -> Result<SchemaVersion> {
    let mut buf = [0u8; HEAD_BYTES];
    r.read_exact(&mut buf)?;
    if buf[0..8] != MAGIC {
        return ReadError::err("not a vistrail document (expected VISTRAIL)", 0);
    }
    let version = match (read_digits(&buf[8..10]), read_digits(&buf[10..13]), read_digits(&buf[13..16])) {
        (Some(major), Some(minor), Some(patch)) => SchemaVersion::new(major, minor, patch),
        _ => return ReadError::err("malformed version in header", 8),
    };
    if !version.is_supported() {
        return Err(Error::version(format!("unsupported schema version {}", version)));
    }
    trace!("read header: schema version {}", version);
    Ok(version)
}

/// Write a file header.
pub fn write_head(w: &mut dyn Write, version: SchemaVersion) -> Result<()> {
    if version.major > 99 || version.minor > 999 || version.patch > 999 {
        return Err(Error::version(format!("version {} cannot be written in a header", version)));
    }
    let digits = format!("{:02}{:03}{:03}", version.major, version.minor, version.patch);
    w.write_all(&MAGIC)?;
    w.write_all(digits.as_bytes())?;
    Ok(())
}

#[test]
fn header_versions() {
    let mut buf = Vec::new();
    write_head(&mut buf, SchemaVersion::new(1, 0, 2)).expect("write");
    assert_eq!(&buf[..], b"VISTRAIL01000002");
    assert_eq!(read_head(&mut &buf[..]).expect("read"), SchemaVersion::new(1, 0, 2));

    let future = b"VISTRAIL09000000";
    match read_head(&mut &future[..]) {
        Err(Error::Version(_)) => {},
        other => panic!("unexpected: {:?}", other),
    }
    assert!(read_head(&mut &b"PIPPINSS20160815"[..]).is_err());
    assert!(read_head(&mut &b"VISTRAIL01x00002"[..]).is_err());
}
