/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Support for reading and writing document trees.
//!
//! A node is encoded as `N`, the type tag (u16 length then UTF-8 bytes), the
//! field count (u32) and each field: its name (u16 length then bytes), a kind
//! byte and the content:
//!
//! *   `0`: null, no content
//! *   `I`: i64
//! *   `F`: f64
//! *   `T`: u32 length then UTF-8 bytes
//! *   `L`: u32 count then that many nodes
//!
//! All numbers are big-endian.

use std::io::{Read, Write};
use std::{u16, u32};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use object::Value;
use schema::{Field, Node};
use error::{Error, Result, ReadError};

// Limit on nesting; deeper trees are rejected rather than risking the stack.
const MAX_DEPTH: usize = 64;

fn read_string(r: &mut dyn Read, len: usize, pos: &mut usize) -> Result<String> {
    let mut bytes = vec![0; len];
    r.read_exact(&mut bytes)?;
    let s = String::from_utf8(bytes)
            .map_err(|_| ReadError::new("text not valid UTF-8", *pos))?;
    *pos += len;
    Ok(s)
}

fn read_short_string(r: &mut dyn Read, pos: &mut usize) -> Result<String> {
    let len = r.read_u16::<BigEndian>()? as usize;
    *pos += 2;
    read_string(r, len, pos)
}

fn read_node_at(r: &mut dyn Read, pos: &mut usize, depth: usize) -> Result<Node> {
    if depth > MAX_DEPTH {
        return ReadError::err("document nested too deeply", *pos);
    }
    if r.read_u8()? != b'N' {
        return ReadError::err("unexpected contents (expected N)", *pos);
    }
    *pos += 1;
    let mut node = Node::new(read_short_string(r, pos)?);
    let num_fields = r.read_u32::<BigEndian>()?;
    *pos += 4;
    for _ in 0..num_fields {
        let name = read_short_string(r, pos)?;
        let kind = r.read_u8()?;
        *pos += 1;
        let field = match kind {
            b'0' => Field::Value(Value::Null),
            b'I' => {
                *pos += 8;
                Field::Value(Value::Int(r.read_i64::<BigEndian>()?))
            },
            b'F' => {
                *pos += 8;
                Field::Value(Value::Float(r.read_f64::<BigEndian>()?))
            },
            b'T' => {
                let len = r.read_u32::<BigEndian>()? as usize;
                *pos += 4;
                Field::Value(Value::Text(read_string(r, len, pos)?))
            },
            b'L' => {
                let count = r.read_u32::<BigEndian>()?;
                *pos += 4;
                let mut nodes = vec![];
                for _ in 0..count {
                    nodes.push(read_node_at(r, pos, depth + 1)?);
                }
                Field::Nodes(nodes)
            },
            _ => return ReadError::err("unknown field kind", *pos - 1),
        };
        if node.insert(&name, field).is_some() {
            return ReadError::err("duplicate field name", *pos);
        }
    }
    Ok(node)
}

/// Read one node (and its children) from a stream.
///
/// `pos` is the stream position, used for error reporting, and is advanced
/// by the number of bytes read.
pub fn read_node(r: &mut dyn Read, pos: &mut usize) -> Result<Node> {
    read_node_at(r, pos, 0)
}

fn write_short_string(w: &mut dyn Write, s: &str) -> Result<()> {
    if s.len() > u16::MAX as usize {
        return Err(Error::arg(format!("name too long to write: {} bytes", s.len())));
    }
    w.write_u16::<BigEndian>(s.len() as u16)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

fn write_len(w: &mut dyn Write, len: usize) -> Result<()> {
    if len > u32::MAX as usize {
        return Err(Error::arg("length too large to write"));
    }
    w.write_u32::<BigEndian>(len as u32)?;
    Ok(())
}

/// Write a node (and its children) to a stream.
pub fn write_node(w: &mut dyn Write, node: &Node) -> Result<()> {
    w.write_u8(b'N')?;
    write_short_string(w, node.vt_type())?;
    write_len(w, node.num_fields())?;
    for (name, field) in node.fields_iter() {
        write_short_string(w, name)?;
        match *field {
            Field::Value(Value::Null) => {
                w.write_u8(b'0')?;
            },
            Field::Value(Value::Int(n)) => {
                w.write_u8(b'I')?;
                w.write_i64::<BigEndian>(n)?;
            },
            Field::Value(Value::Float(x)) => {
                w.write_u8(b'F')?;
                w.write_f64::<BigEndian>(x)?;
            },
            Field::Value(Value::Text(ref s)) => {
                w.write_u8(b'T')?;
                write_len(w, s.len())?;
                w.write_all(s.as_bytes())?;
            },
            Field::Nodes(ref nodes) => {
                w.write_u8(b'L')?;
                write_len(w, nodes.len())?;
                for child in nodes {
                    write_node(w, child)?;
                }
            },
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::Node;

    #[test]
    fn nested_nodes() {
        let node = Node::new("vistrail")
            .with("id", 3i64)
            .with("name", "näme")
            .with("x", -1.25)
            .with_opt::<i64>("session", None)
            .with_nodes("actions", vec![Node::new("action").with("id", 1i64)]);
        let mut buf = Vec::new();
        write_node(&mut buf, &node).expect("write");
        let mut pos = 0;
        let back = read_node(&mut &buf[..], &mut pos).expect("read");
        assert_eq!(back, node);
        assert_eq!(pos, buf.len());
    }

    #[test]
    fn bad_contents() {
        let mut pos = 0;
        match read_node(&mut &b"X\x00\x00"[..], &mut pos) {
            Err(Error::Read(e)) => assert_eq!(e.pos(), 0),
            other => panic!("unexpected: {:?}", other),
        }
        let mut pos = 0;
        // truncated stream
        assert!(read_node(&mut &b"N\x00\x05vis"[..], &mut pos).is_err());
    }
}
