/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! For calculating checksums of streams

use std::io::{Read, Write, Result};

use crypto::digest::Digest;
use crypto::sha2::Sha256;

use sum::{Sum, SUM_BYTES};


// Internal type / constructor for easy configuration.
type Hasher = Sha256;
fn mk_hasher() -> Hasher {
    Hasher::new()
}

fn load_hasher(hasher: &mut Hasher) -> Sum {
    let mut buf = [0u8; SUM_BYTES];
    assert_eq!(hasher.output_bytes(), buf.len());
    hasher.result(&mut buf);
    Sum::load(&buf)
}

impl Sum {
    /// Calculate the checksum of some data
    pub fn calculate(data: &[u8]) -> Sum {
        let mut hasher = mk_hasher();
        hasher.input(data);
        load_hasher(&mut hasher)
    }
}


// —————  hash calculators  —————

/// Reader which calculates a checksum of everything read
pub struct HashReader<R> {
    hasher: Hasher,
    inner: R
}

impl<R: Read> HashReader<R> {
    /// Create
    pub fn new(r: R) -> HashReader<R> {
        HashReader { hasher: mk_hasher(), inner: r }
    }
    /// Make a Sum from everything read so far
    pub fn sum(&mut self) -> Sum {
        load_hasher(&mut self.hasher)
    }
    /// Get the inner reader (reading from it bypasses the checksum)
    pub fn inner(&mut self) -> &mut R { &mut self.inner }
}

impl<R: Read> Read for HashReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let len = self.inner.read(buf)?;
        self.hasher.input(&buf[..len]);
        Ok(len)
    }
}


/// Writer which calculates a checksum of everything written
pub struct HashWriter<W> {
    hasher: Hasher,
    inner: W
}

impl<W: Write> HashWriter<W> {
    /// Create
    pub fn new(w: W) -> HashWriter<W> {
        HashWriter { hasher: mk_hasher(), inner: w }
    }
    /// Make a Sum from everything written so far
    pub fn sum(&mut self) -> Sum {
        load_hasher(&mut self.hasher)
    }
    /// Get the inner writer (writing to it bypasses the checksum)
    pub fn inner(&mut self) -> &mut W { &mut self.inner }
}

impl<W: Write> Write for HashWriter<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let len = self.inner.write(buf)?;
        if len > 0 {
            self.hasher.input(&buf[..len]);
        }
        Ok(len)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}

#[test]
fn reader_and_writer_agree() {
    let data = b"vistrail document";
    let mut out = Vec::new();
    let wsum = {
        let mut w = HashWriter::new(&mut out);
        w.write_all(data).expect("write");
        w.sum()
    };
    let mut r = HashReader::new(&out[..]);
    let mut back = Vec::new();
    r.read_to_end(&mut back).expect("read");
    assert_eq!(r.sum(), wsum);
    assert_eq!(wsum, Sum::calculate(data));
}
