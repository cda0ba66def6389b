/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Error structs used by vtdb

use std::{io, error, fmt, result, string};

use chrono;
use regex;

use object::ObjectKind;

/// Our custom result type
pub type Result<T> = result::Result<T, Error>;

/// Our custom compound error type
#[derive(Debug)]
pub enum Error {
    /// Stream decoding failed
    Read(ReadError),
    /// An invalid argument was supplied
    Arg(String),
    /// No object/action found for update or retrieval
    NotFound(String),
    /// A field patch named a field the object's kind does not declare
    Field(FieldError),
    /// Replaying operations was inconsistent with the state
    Replay(ReplayError),
    /// A document tree does not fit the schema
    Schema(String),
    /// Unsupported or unreachable schema version
    Version(String),
    /// Underlying IO error
    Io(io::Error),
    /// Text was not valid UTF-8
    Utf8(string::FromUtf8Error),
    /// Regular expression failure
    Regex(regex::Error),
    /// A timestamp could not be parsed
    Date(chrono::ParseError),
}

/// For read errors; adds a read position
#[derive(PartialEq, Debug)]
pub struct ReadError {
    msg: &'static str,
    pos: usize,
}

impl ReadError {
    /// Create
    pub fn new(msg: &'static str, pos: usize) -> ReadError {
        ReadError { msg: msg, pos: pos }
    }
    /// Create, wrapped in an `Err` of our compound type
    pub fn err<T>(msg: &'static str, pos: usize) -> Result<T> {
        Err(Error::Read(ReadError::new(msg, pos)))
    }
    /// Get the message
    pub fn msg(&self) -> &'static str { self.msg }
    /// Get the stream position at which the error was detected
    pub fn pos(&self) -> usize { self.pos }
}

/// A patch named a field not declared by the target object's kind
#[derive(PartialEq, Debug)]
pub struct FieldError {
    kind: ObjectKind,
    field: String,
}

impl FieldError {
    /// Create
    pub fn new(kind: ObjectKind, field: &str) -> FieldError {
        FieldError { kind: kind, field: field.to_string() }
    }
    /// Kind of the patched object
    pub fn kind(&self) -> ObjectKind { self.kind }
    /// The rejected field name
    pub fn field(&self) -> &str { &self.field }
}

/// Errors in operation replay (due either to corruption or to actions which
/// do not match the state they are applied to)
#[derive(PartialEq, Debug)]
pub struct ReplayError {
    msg: &'static str,
    action: u64,
    operation: u64,
}

impl ReplayError {
    /// Create
    pub fn new(msg: &'static str, action: u64, operation: u64) -> ReplayError {
        ReplayError { msg: msg, action: action, operation: operation }
    }
    /// Get the message
    pub fn msg(&self) -> &'static str { self.msg }
    /// Id of the action containing the failing operation
    pub fn action(&self) -> u64 { self.action }
    /// Id of the failing operation
    pub fn operation(&self) -> u64 { self.operation }
}

impl Error {
    /// Create an "invalid argument" error
    pub fn arg<T: Into<String>>(msg: T) -> Error {
        Error::Arg(msg.into())
    }
    /// Create a "not found" error
    pub fn not_found<T: Into<String>>(msg: T) -> Error {
        Error::NotFound(msg.into())
    }
    /// Create a "schema" error for a given type and field
    pub fn schema(vt_type: &str, field: &str, msg: &str) -> Error {
        Error::Schema(format!("{}.{}: {}", vt_type, field, msg))
    }
    /// Create a "version" error
    pub fn version<T: Into<String>>(msg: T) -> Error {
        Error::Version(msg.into())
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref e) => Some(e),
            Error::Utf8(ref e) => Some(e),
            Error::Regex(ref e) => Some(e),
            Error::Date(ref e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Read(ref e) => write!(f, "read error at position {}: {}", e.pos, e.msg),
            Error::Arg(ref msg) => write!(f, "invalid argument: {}", msg),
            Error::NotFound(ref msg) => write!(f, "not found: {}", msg),
            Error::Field(ref e) => write!(f, "{} has no field '{}'", e.kind, e.field),
            Error::Replay(ref e) => write!(f, "failed to replay action {} (operation {}): {}",
                    e.action, e.operation, e.msg),
            Error::Schema(ref msg) => write!(f, "schema error: {}", msg),
            Error::Version(ref msg) => write!(f, "version error: {}", msg),
            Error::Io(ref e) => e.fmt(f),
            Error::Utf8(ref e) => e.fmt(f),
            Error::Regex(ref e) => e.fmt(f),
            Error::Date(ref e) => e.fmt(f),
        }
    }
}

// From impls
impl From<ReadError> for Error {
    fn from(e: ReadError) -> Error { Error::Read(e) }
}
impl From<FieldError> for Error {
    fn from(e: FieldError) -> Error { Error::Field(e) }
}
impl From<ReplayError> for Error {
    fn from(e: ReplayError) -> Error { Error::Replay(e) }
}
impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error { Error::Io(e) }
}
impl From<string::FromUtf8Error> for Error {
    fn from(e: string::FromUtf8Error) -> Error { Error::Utf8(e) }
}
impl From<regex::Error> for Error {
    fn from(e: regex::Error) -> Error { Error::Regex(e) }
}
impl From<chrono::ParseError> for Error {
    fn from(e: chrono::ParseError) -> Error { Error::Date(e) }
}
