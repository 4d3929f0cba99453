// src/ir/protocol.rs

//! Wire format constants of an IR stream and [`IrCursor`], a big-endian
//! reader over a byte buffer.
//!
//! All integers are big-endian.
//!
//! ## Preamble
//!
//! ```text
//! [magic: FD 2F B5 29][encoding_width: u8][metadata_kind: u8][metadata_length: u16][metadata]
//! ```
//!
//! `encoding_width` is `4` or `8`. `metadata_kind` [`METADATA_KIND_JSON`]
//! is the only kind understood. The metadata is a JSON object of string
//! values with keys [`METADATA_KEY_TIMESTAMP_PATTERN`],
//! [`METADATA_KEY_TIMESTAMP_PATTERN_SYNTAX`], [`METADATA_KEY_TZ_ID`], and
//! for four-byte streams [`METADATA_KEY_REFERENCE_TIMESTAMP`], a decimal
//! string.
//!
//! ## Log event record
//!
//! ```text
//! [TAG_EVENT][logtype_len: u32][logtype]
//! [var_count: u32][vars: i32 or i64 × var_count]
//! [dict_len: u32][dict_vars]
//! [offset_count: u32][offsets: i32 × offset_count]
//! [timestamp: i64]
//! ```
//!
//! For eight-byte streams `timestamp` is absolute. For four-byte streams it
//! is the delta from the prior event's timestamp (or the reference
//! timestamp for the first event).
//!
//! ## End of stream
//!
//! ```text
//! [TAG_EOIR]
//! ```
//!
//! [`IrCursor`]: crate::ir::protocol::IrCursor

use crate::common::{Bytes, IrError, ResultIr};
use crate::data::encodedmessage::EncodedVariable;

use ::serde::{Deserialize, Serialize};

/// First bytes of every IR stream.
pub const MAGIC: [u8; 4] = [0xFD, 0x2F, 0xB5, 0x29];

/// The only understood preamble `metadata_kind`; metadata is JSON.
pub const METADATA_KIND_JSON: u8 = 0x01;

/// Size in bytes of the preamble before the metadata.
pub const PREAMBLE_HEADER_SZ: usize = MAGIC.len() + 1 + 1 + 2;

/// Maximum size in bytes of the preamble metadata.
pub const METADATA_SZ_MAX: usize = u16::MAX as usize;

pub const METADATA_KEY_TIMESTAMP_PATTERN: &str = "TIMESTAMP_PATTERN";
pub const METADATA_KEY_TIMESTAMP_PATTERN_SYNTAX: &str = "TIMESTAMP_PATTERN_SYNTAX";
pub const METADATA_KEY_TZ_ID: &str = "TZ_ID";
pub const METADATA_KEY_REFERENCE_TIMESTAMP: &str = "REFERENCE_TIMESTAMP";

/// The preamble metadata JSON object.
///
/// Every value is a JSON string. Unknown keys are ignored. A key that is
/// absent is `None`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PreambleMetadata {
    #[serde(rename = "TIMESTAMP_PATTERN", default, skip_serializing_if = "Option::is_none")]
    pub timestamp_pattern: Option<String>,
    #[serde(rename = "TIMESTAMP_PATTERN_SYNTAX", default, skip_serializing_if = "Option::is_none")]
    pub timestamp_pattern_syntax: Option<String>,
    #[serde(rename = "TZ_ID", default, skip_serializing_if = "Option::is_none")]
    pub time_zone_id: Option<String>,
    /// Four-byte streams only. Decimal milliseconds since the Unix epoch.
    #[serde(rename = "REFERENCE_TIMESTAMP", default, skip_serializing_if = "Option::is_none")]
    pub reference_timestamp: Option<String>,
}

/// Record tag of a log event.
pub const TAG_EVENT: u8 = 0x01;

/// Record tag of the end of an IR stream.
pub const TAG_EOIR: u8 = 0x00;

/// Size in bytes of a record length or count field.
pub const LEN_SZ: usize = 4;

/// Size in bytes of the trailing timestamp field of a record.
pub const TIMESTAMP_SZ: usize = 8;

/// A big-endian read position within a byte buffer.
///
/// Every read that runs past the end of the buffer returns
/// [`IrError::IncompleteIR`] and does not advance.
pub struct IrCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> IrCursor<'a> {
    pub const fn new(buf: &'a [u8]) -> IrCursor<'a> {
        IrCursor { buf, pos: 0 }
    }

    /// Bytes read so far.
    #[inline(always)]
    pub const fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes not yet read.
    #[inline(always)]
    pub const fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// The next byte, without advancing.
    #[inline(always)]
    pub fn peek_u8(&self) -> ResultIr<u8> {
        match self.buf.get(self.pos) {
            Some(byte) => Ok(*byte),
            None => Err(IrError::IncompleteIR),
        }
    }

    /// Read the next `len` bytes.
    #[inline(always)]
    pub fn read_bytes(&mut self, len: usize) -> ResultIr<&'a [u8]> {
        if self.remaining() < len {
            return Err(IrError::IncompleteIR);
        }
        let beg = self.pos;
        self.pos += len;

        Ok(&self.buf[beg..self.pos])
    }

    pub fn read_u8(&mut self) -> ResultIr<u8> {
        let byte = self.peek_u8()?;
        self.pos += 1;

        Ok(byte)
    }

    pub fn read_u16(&mut self) -> ResultIr<u16> {
        let b = self.read_bytes(2)?;

        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> ResultIr<u32> {
        let b = self.read_bytes(4)?;

        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i64(&mut self) -> ResultIr<i64> {
        let b = self.read_bytes(8)?;
        let mut a: [u8; 8] = [0; 8];
        a.copy_from_slice(b);

        Ok(i64::from_be_bytes(a))
    }

    /// Read a `u32` length field then that many bytes.
    pub fn read_len_bytes(&mut self) -> ResultIr<&'a [u8]> {
        let beg = self.pos;
        let len = self.read_u32()? as usize;
        match self.read_bytes(len) {
            Ok(bytes) => Ok(bytes),
            Err(err) => {
                self.pos = beg;
                Err(err)
            }
        }
    }

    /// Read a `u32` count field then that many `V`, appended to `out`.
    pub fn read_vars<V: EncodedVariable>(&mut self, out: &mut Vec<V>) -> ResultIr<()> {
        let beg = self.pos;
        let count = self.read_u32()? as usize;
        let size = V::WIDTH.size();
        let len = match count.checked_mul(size) {
            Some(len) => len,
            None => {
                return Err(IrError::CorruptedIR(format!("variable count {} overflows", count)));
            }
        };
        let bytes = match self.read_bytes(len) {
            Ok(bytes) => bytes,
            Err(err) => {
                self.pos = beg;
                return Err(err);
            }
        };
        out.reserve(count);
        for chunk in bytes.chunks_exact(size) {
            out.push(V::get_be(chunk));
        }

        Ok(())
    }

    /// Read a `u32` count field then that many `i32`, appended to `out`.
    pub fn read_offsets(&mut self, out: &mut Vec<i32>) -> ResultIr<()> {
        self.read_vars::<i32>(out)
    }
}

/// Append `value` as big-endian `u16`.
#[inline(always)]
pub fn put_u16(out: &mut Bytes, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Append the length `len` as a big-endian `u32` field.
pub fn put_len(out: &mut Bytes, len: usize) -> ResultIr<()> {
    let len32 = match u32::try_from(len) {
        Ok(val) => val,
        Err(_) => {
            return Err(IrError::EncodeError(format!("length {} exceeds u32", len)));
        }
    };
    out.extend_from_slice(&len32.to_be_bytes());

    Ok(())
}

/// Append `value` as big-endian `i64`.
#[inline(always)]
pub fn put_i64(out: &mut Bytes, value: i64) {
    out.extend_from_slice(&value.to_be_bytes());
}
