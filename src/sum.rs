/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Checksums of stored documents

use std::io::{Write, Result};
use std::fmt;

/// Number of bytes in a Sum.
pub const SUM_BYTES: usize = 32;

/// A SHA-256 checksum.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Sum {
    s: [u8; SUM_BYTES]
}

impl Sum {
    /// A "sum" containing all zeros
    pub fn zero() -> Sum {
        Sum { s: [0u8; SUM_BYTES] }
    }

    /// Load from a byte slice of length `SUM_BYTES`
    pub fn load(arr: &[u8]) -> Sum {
        assert_eq!(arr.len(), SUM_BYTES);
        let mut s = [0u8; SUM_BYTES];
        s.clone_from_slice(arr);
        Sum { s: s }
    }

    /// The raw bytes
    pub fn as_bytes(&self) -> &[u8] { &self.s }

    /// Write the checksum bytes to a stream
    pub fn write(&self, w: &mut dyn Write) -> Result<()> {
        w.write_all(&self.s)
    }

    /// True if `s` is the whole or a prefix of this sum's hexadecimal
    /// rendering (case insensitive).
    pub fn matches_string(&self, s: &str) -> bool {
        let full = self.to_string();
        s.len() <= full.len() && full[..s.len()].eq_ignore_ascii_case(s)
    }
}

impl fmt::Display for Sum {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for byte in &self.s {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}
impl fmt::Debug for Sum {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Sum({})", self)
    }
}

#[test]
fn sum_formatting() {
    let mut bytes = [0u8; SUM_BYTES];
    bytes[0] = 0xAB;
    bytes[1] = 0x05;
    let sum = Sum::load(&bytes);
    assert!(sum.to_string().starts_with("AB05"));
    assert_eq!(sum.to_string().len(), 2 * SUM_BYTES);
    assert!(sum.matches_string("ab0"));
    assert!(!sum.matches_string("AC"));
    assert!(Sum::zero() != sum);
}
