// src/ir/deserializer.rs

//! Implements [`deserialize_preamble`] and a [`Deserializer`], the reading
//! half of an IR stream.
//!
//! A `Deserializer` works over caller-provided byte slices and never reads
//! from a byte source. Each call reports how many bytes were consumed so the
//! caller may advance. [`IrError::IncompleteIR`] means the slice holds a
//! valid but incomplete record; the caller should provide more bytes and try
//! again from the same position.
//!
//! A [`StreamReader`] drives a `Deserializer` from a byte source.
//!
//! [`deserialize_preamble`]: crate::ir::deserializer::deserialize_preamble
//! [`Deserializer`]: crate::ir::deserializer::Deserializer
//! [`StreamReader`]: crate::readers::streamreader::StreamReader
//! [`IrError::IncompleteIR`]: crate::common::IrError::IncompleteIR

use std::fmt;

use crate::common::{Bytes, EpochTimeMs, IrError, ResultIr};
use crate::data::encodedmessage::{
    EightByteEncoding,
    EncodedMessage,
    EncodedVariable,
    EncodingWidth,
    FourByteEncoding,
};
use crate::data::logevent::{LogEventView, TimestampInfo};
use crate::de_wrn;
use crate::ir::decoder::decode_message;
use crate::ir::protocol::{
    IrCursor,
    PreambleMetadata,
    MAGIC,
    METADATA_KIND_JSON,
    TAG_EOIR,
    TAG_EVENT,
};
use crate::search::wildcard::{TimestampInterval, WildcardMatcher, WildcardQuery};

use ::serde_json::{Map as JsonMap, Value as JsonValue};
#[allow(unused_imports)]
use ::si_trace_print::{defn, defo, defx, defñ};

/// Parse the preamble of an IR stream at the start of `buf`.
///
/// Returns the new [`Deserializer`] and the count of bytes of the preamble.
///
/// Errors:
/// * [`IrError::IncompleteIR`] if `buf` is a valid prefix of a preamble
/// * [`IrError::CorruptedIR`] if the magic or the encoding width is invalid
/// * [`IrError::UnsupportedVersion`] if the metadata kind is not JSON
/// * [`IrError::CorruptedMetadata`] if the metadata is not a JSON object of
///   strings, or the reference timestamp is not a decimal integer
pub fn deserialize_preamble(buf: &[u8]) -> ResultIr<(Deserializer, usize)> {
    defn!("(buf len {})", buf.len());
    if buf.len() < MAGIC.len() {
        if buf == &MAGIC[..buf.len()] {
            defx!("return IncompleteIR");
            return Err(IrError::IncompleteIR);
        }
        defx!("return CorruptedIR; bad magic prefix");
        return Err(IrError::CorruptedIR(format!("bad magic number {:02X?}", buf)));
    }
    let mut cursor = IrCursor::new(buf);
    let magic = cursor.read_bytes(MAGIC.len())?;
    if magic != MAGIC {
        defx!("return CorruptedIR; bad magic");
        return Err(IrError::CorruptedIR(format!("bad magic number {:02X?}", magic)));
    }
    let width_byte: u8 = cursor.read_u8()?;
    let width: EncodingWidth = match EncodingWidth::from_u8(width_byte) {
        Some(width) => width,
        None => {
            defx!("return CorruptedIR; bad width {}", width_byte);
            return Err(IrError::CorruptedIR(format!("bad encoding width {}", width_byte)));
        }
    };
    let kind: u8 = cursor.read_u8()?;
    if kind != METADATA_KIND_JSON {
        defx!("return UnsupportedVersion({})", kind);
        return Err(IrError::UnsupportedVersion(kind));
    }
    let metadata_len = cursor.read_u16()? as usize;
    let metadata_bytes: &[u8] = cursor.read_bytes(metadata_len)?;
    // a struct would also deserialize from a JSON array, so require an object first
    let object: JsonMap<String, JsonValue> = match serde_json::from_slice(metadata_bytes) {
        Ok(val) => val,
        Err(err) => {
            defx!("return CorruptedMetadata; {}", err);
            return Err(IrError::CorruptedMetadata(err.to_string()));
        }
    };
    let metadata: PreambleMetadata = match serde_json::from_value(JsonValue::Object(object)) {
        Ok(val) => val,
        Err(err) => {
            defx!("return CorruptedMetadata; {}", err);
            return Err(IrError::CorruptedMetadata(err.to_string()));
        }
    };
    defo!("metadata {:?}", metadata);

    let reference_timestamp: EpochTimeMs = match width {
        EncodingWidth::EightByte => 0,
        EncodingWidth::FourByte => match metadata.reference_timestamp.as_deref() {
            Some(value) => match value.trim().parse::<EpochTimeMs>() {
                Ok(ts) => ts,
                Err(err) => {
                    defx!("return CorruptedMetadata; reference timestamp {:?}", value);
                    return Err(IrError::CorruptedMetadata(format!(
                        "reference timestamp {:?}: {}",
                        value,
                        err
                    )));
                }
            },
            None => {
                de_wrn!("four-byte preamble has no reference timestamp; using 0");
                0
            }
        },
    };
    let timestamp_info = TimestampInfo {
        pattern: metadata.timestamp_pattern.unwrap_or_default(),
        pattern_syntax: metadata.timestamp_pattern_syntax.unwrap_or_default(),
        time_zone_id: metadata.time_zone_id.unwrap_or_default(),
    };
    let deserializer = Deserializer::new(width, timestamp_info, reference_timestamp);
    defx!("return {:?}, {} bytes", deserializer, cursor.pos());

    Ok((deserializer, cursor.pos()))
}

/// Read the body of an event record after the tag into `encoded`.
/// Returns the timestamp field.
fn read_event_record_body<V: EncodedVariable>(
    cursor: &mut IrCursor<'_>,
    encoded: &mut EncodedMessage<V>,
) -> ResultIr<EpochTimeMs> {
    encoded.clear();
    let logtype = cursor.read_len_bytes()?;
    encoded.logtype.extend_from_slice(logtype);
    cursor.read_vars(&mut encoded.vars)?;
    let dict_vars = cursor.read_len_bytes()?;
    encoded.dict_vars.extend_from_slice(dict_vars);
    cursor.read_offsets(&mut encoded.dict_var_end_offsets)?;

    cursor.read_i64()
}

/// Width-specific state of a [`Deserializer`].
enum DeserializerState {
    FourByte(EncodedMessage<FourByteEncoding>),
    EightByte(EncodedMessage<EightByteEncoding>),
}

/// A log event returned by [`Deserializer::deserialize_wildcard_match`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WildcardMatch<'a> {
    pub event: LogEventView<'a>,
    /// Index of the first [`WildcardQuery`] that matched.
    pub query_index: usize,
}

/// Deserializes IR event records into log events.
///
/// Created by [`deserialize_preamble`].
///
/// The `Deserializer` owns one message buffer; a returned [`LogEventView`]
/// borrows it and is valid until the next call.
///
/// For four-byte streams the running timestamp advances only when a
/// record is successfully deserialized (or skipped by
/// [`deserialize_wildcard_match`]).
///
/// After the end-of-stream tag is read, every later call returns
/// [`IrError::Eoir`].
///
/// [`deserialize_wildcard_match`]: Deserializer::deserialize_wildcard_match
pub struct Deserializer {
    /// `None` after [`close`](Deserializer::close).
    state: Option<DeserializerState>,
    width: EncodingWidth,
    timestamp_info: TimestampInfo,
    running_timestamp: EpochTimeMs,
    /// reused buffer of the decoded message of the last event
    message: Bytes,
    /// timestamp of the last event
    timestamp: EpochTimeMs,
    /// the end-of-stream tag was read
    eoir: bool,
}

impl fmt::Debug for Deserializer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Deserializer")
            .field("width", &self.width)
            .field("timestamp_info", &self.timestamp_info)
            .field("running_timestamp", &self.running_timestamp)
            .field("eoir", &self.eoir)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Deserializer {
    fn new(
        width: EncodingWidth,
        timestamp_info: TimestampInfo,
        reference_timestamp: EpochTimeMs,
    ) -> Deserializer {
        let state = match width {
            EncodingWidth::FourByte => DeserializerState::FourByte(EncodedMessage::new()),
            EncodingWidth::EightByte => DeserializerState::EightByte(EncodedMessage::new()),
        };
        Deserializer {
            state: Some(state),
            width,
            timestamp_info,
            running_timestamp: reference_timestamp,
            message: Bytes::new(),
            timestamp: 0,
            eoir: false,
        }
    }

    /// Read one record at the start of `buf` into the encoded state,
    /// returns the record size and its absolute timestamp.
    /// Does not decode the message nor advance the running timestamp.
    fn read_event_record(&mut self, buf: &[u8]) -> ResultIr<(usize, EpochTimeMs)> {
        let state: &mut DeserializerState = match self.state.as_mut() {
            Some(state) => state,
            None => {
                return Err(IrError::Closed);
            }
        };
        if self.eoir {
            return Err(IrError::Eoir);
        }
        let mut cursor = IrCursor::new(buf);
        let tag: u8 = cursor.read_u8()?;
        match tag {
            TAG_EVENT => {}
            TAG_EOIR => {
                defo!("end of IR stream");
                self.eoir = true;
                return Err(IrError::Eoir);
            }
            _ => {
                return Err(IrError::CorruptedIR(format!("unknown tag 0x{:02X}", tag)));
            }
        }
        let timestamp: EpochTimeMs = match state {
            DeserializerState::FourByte(encoded) => {
                let delta = read_event_record_body(&mut cursor, encoded)?;
                self.running_timestamp.wrapping_add(delta)
            }
            DeserializerState::EightByte(encoded) => {
                read_event_record_body(&mut cursor, encoded)?
            }
        };

        Ok((cursor.pos(), timestamp))
    }

    /// Decode the record last read by `read_event_record` into the message
    /// buffer.
    fn decode_event_record(&mut self) -> ResultIr<()> {
        self.message.clear();
        match &self.state {
            Some(DeserializerState::FourByte(encoded)) => decode_message(encoded, &mut self.message),
            Some(DeserializerState::EightByte(encoded)) => decode_message(encoded, &mut self.message),
            None => Err(IrError::Closed),
        }
    }

    /// Commit `timestamp` as the timestamp of the last event.
    #[inline(always)]
    fn commit_timestamp(&mut self, timestamp: EpochTimeMs) {
        self.running_timestamp = timestamp;
        self.timestamp = timestamp;
    }

    /// Deserialize one record into the message buffer, returns the count
    /// of bytes consumed.
    pub(crate) fn deserialize_event_into(&mut self, buf: &[u8]) -> ResultIr<usize> {
        let (consumed, timestamp) = self.read_event_record(buf)?;
        self.decode_event_record()?;
        self.commit_timestamp(timestamp);

        Ok(consumed)
    }

    /// A view of the last deserialized event.
    pub(crate) fn last_event(&self) -> LogEventView<'_> {
        LogEventView::new(self.message.as_slice(), self.timestamp)
    }

    /// Deserialize the event record at the start of `buf`.
    ///
    /// Returns the event and the count of bytes consumed.
    ///
    /// Errors:
    /// * [`IrError::IncompleteIR`] if `buf` holds a partial record; nothing
    ///   is consumed
    /// * [`IrError::Eoir`] at the end-of-stream tag, and for every later call
    /// * [`IrError::CorruptedIR`] for an unknown tag or malformed framing
    /// * [`IrError::DecodeError`] if the message cannot be reconstructed
    /// * [`IrError::Closed`] after [`close`](Deserializer::close)
    pub fn deserialize_event(&mut self, buf: &[u8]) -> ResultIr<(LogEventView<'_>, usize)> {
        defn!("(buf len {})", buf.len());
        let consumed = match self.deserialize_event_into(buf) {
            Ok(consumed) => consumed,
            Err(err) => {
                defx!("return Err {}", err);
                return Err(err);
            }
        };
        defx!("return {:?}, {}", self.last_event(), consumed);

        Ok((self.last_event(), consumed))
    }

    /// Scan records until one has a timestamp within `interval` and a
    /// message matching `matcher`. Returns the index of the matching query.
    pub(crate) fn find_wildcard_match(
        &mut self,
        buf: &[u8],
        interval: TimestampInterval,
        matcher: &WildcardMatcher,
    ) -> (ResultIr<usize>, usize) {
        let mut consumed: usize = 0;
        loop {
            let (record_len, timestamp) = match self.read_event_record(&buf[consumed..]) {
                Ok(val) => val,
                Err(IrError::IncompleteIR) if consumed > 0 => {
                    return (Err(IrError::NoMatch), consumed);
                }
                Err(err) => {
                    return (Err(err), consumed);
                }
            };
            if !interval.contains(timestamp) {
                defo!("skip timestamp {} outside {}", timestamp, interval);
                self.commit_timestamp(timestamp);
                consumed += record_len;
                continue;
            }
            if let Err(err) = self.decode_event_record() {
                return (Err(err), consumed);
            }
            self.commit_timestamp(timestamp);
            consumed += record_len;
            if let Some(index) = matcher.find_match(&self.message) {
                return (Ok(index), consumed);
            }
            defo!("skip unmatched message at timestamp {}", timestamp);
        }
    }

    /// Deserialize records from the start of `buf` until one has a
    /// timestamp within `interval` and a message matching one of
    /// `queries`. Records that do not are consumed and not returned.
    ///
    /// The returned `usize` is always the count of bytes consumed, including
    /// skipped records, so the caller never reads them again.
    ///
    /// Errors are those of [`deserialize_event`], and
    /// * [`IrError::NoMatch`] if records were skipped and `buf` holds no
    ///   further complete record
    /// * [`IrError::IncompleteIR`] if nothing was consumed
    /// * [`IrError::InvalidQuery`] if a query fails to compile
    ///
    /// [`deserialize_event`]: Deserializer::deserialize_event
    pub fn deserialize_wildcard_match(
        &mut self,
        buf: &[u8],
        interval: TimestampInterval,
        queries: &[WildcardQuery],
    ) -> (ResultIr<WildcardMatch<'_>>, usize) {
        let matcher = match WildcardMatcher::new(queries) {
            Ok(matcher) => matcher,
            Err(err) => {
                return (Err(err), 0);
            }
        };

        self.deserialize_wildcard_match_with(buf, interval, &matcher)
    }

    /// Like [`deserialize_wildcard_match`] with queries compiled once by
    /// the caller.
    ///
    /// [`deserialize_wildcard_match`]: Deserializer::deserialize_wildcard_match
    pub fn deserialize_wildcard_match_with(
        &mut self,
        buf: &[u8],
        interval: TimestampInterval,
        matcher: &WildcardMatcher,
    ) -> (ResultIr<WildcardMatch<'_>>, usize) {
        defn!("(buf len {}, {}, {} queries)", buf.len(), interval, matcher.len());
        match self.find_wildcard_match(buf, interval, matcher) {
            (Ok(query_index), consumed) => {
                defx!("return match of query {}, {} bytes", query_index, consumed);
                let found = WildcardMatch {
                    event: self.last_event(),
                    query_index,
                };
                (Ok(found), consumed)
            }
            (Err(err), consumed) => {
                defx!("return Err {}, {} bytes", err, consumed);
                (Err(err), consumed)
            }
        }
    }

    /// Release the buffers. Every later operation returns
    /// [`IrError::Closed`]. Calling `close` again does nothing.
    pub fn close(&mut self) {
        defñ!("closed {}", self.is_closed());
        self.state = None;
        self.message = Bytes::new();
    }

    #[inline(always)]
    pub const fn is_closed(&self) -> bool {
        self.state.is_none()
    }

    /// Has the end-of-stream tag been read?
    #[inline(always)]
    pub const fn is_eoir(&self) -> bool {
        self.eoir
    }

    #[inline(always)]
    pub const fn timestamp_info(&self) -> &TimestampInfo {
        &self.timestamp_info
    }

    #[inline(always)]
    pub const fn encoding_width(&self) -> EncodingWidth {
        self.width
    }

    /// The running timestamp of a four-byte `Deserializer`.
    /// `None` for an eight-byte `Deserializer`.
    pub const fn running_timestamp(&self) -> Option<EpochTimeMs> {
        match self.width {
            EncodingWidth::FourByte => Some(self.running_timestamp),
            EncodingWidth::EightByte => None,
        }
    }
}
