// src/ir/serializer.rs

//! Implements a [`Serializer`], the writing half of an IR stream.
//!
//! A `Serializer` is created along with the stream preamble bytes. Each
//! call to [`serialize_log_message`] encodes one log message and frames it
//! as one event record. The caller writes the preamble, then each record,
//! then optionally [`TAG_EOIR`], to any byte sink.
//!
//! [`Serializer`]: crate::ir::serializer::Serializer
//! [`serialize_log_message`]: crate::ir::serializer::Serializer::serialize_log_message
//! [`TAG_EOIR`]: crate::ir::protocol::TAG_EOIR

use std::fmt;

use crate::common::{Bytes, EpochTimeMs, IrError, ResultIr};
use crate::data::encodedmessage::{
    EightByteEncoding,
    EncodedMessage,
    EncodedVariable,
    EncodingWidth,
    FourByteEncoding,
};
use crate::data::logevent::{LogEvent, TimestampInfo};
#[cfg(any(debug_assertions, test))]
use crate::debug::printers::buffer_to_String_noraw;
use crate::ir::encoder::encode_message;
use crate::ir::protocol::{
    put_i64,
    put_len,
    put_u16,
    PreambleMetadata,
    MAGIC,
    METADATA_KIND_JSON,
    METADATA_SZ_MAX,
    PREAMBLE_HEADER_SZ,
    TAG_EVENT,
};

#[allow(unused_imports)]
use ::si_trace_print::{defn, defo, defx, defñ};

/// Create the preamble bytes of a new IR stream.
///
/// `reference_timestamp` is written only for [`EncodingWidth::FourByte`].
pub fn serialize_preamble(
    width: EncodingWidth,
    timestamp_info: &TimestampInfo,
    reference_timestamp: EpochTimeMs,
) -> ResultIr<Bytes> {
    defn!("({}, {:?}, {})", width, timestamp_info, reference_timestamp);
    let metadata = PreambleMetadata {
        timestamp_pattern: Some(timestamp_info.pattern.clone()),
        timestamp_pattern_syntax: Some(timestamp_info.pattern_syntax.clone()),
        time_zone_id: Some(timestamp_info.time_zone_id.clone()),
        reference_timestamp: match width {
            EncodingWidth::FourByte => Some(reference_timestamp.to_string()),
            EncodingWidth::EightByte => None,
        },
    };
    let json: Bytes = match serde_json::to_vec(&metadata) {
        Ok(val) => val,
        Err(err) => {
            defx!("return Err {}", err);
            return Err(IrError::EncodeError(format!("metadata serialization failed; {}", err)));
        }
    };
    if json.len() > METADATA_SZ_MAX {
        defx!("return Err; metadata {} bytes", json.len());
        return Err(IrError::EncodeError(format!(
            "metadata length {} exceeds maximum {}",
            json.len(),
            METADATA_SZ_MAX
        )));
    }
    let mut preamble = Bytes::with_capacity(PREAMBLE_HEADER_SZ + json.len());
    preamble.extend_from_slice(&MAGIC);
    preamble.push(width.as_u8());
    preamble.push(METADATA_KIND_JSON);
    put_u16(&mut preamble, json.len() as u16);
    preamble.extend_from_slice(&json);
    defx!("preamble {:?}", buffer_to_String_noraw(&preamble));

    Ok(preamble)
}

/// Append one event record of `encoded` and `timestamp` to `out`.
///
/// `timestamp` is the absolute timestamp for eight-byte streams and the
/// delta for four-byte streams.
pub fn serialize_event_record<V: EncodedVariable>(
    encoded: &EncodedMessage<V>,
    timestamp: EpochTimeMs,
    out: &mut Bytes,
) -> ResultIr<()> {
    out.push(TAG_EVENT);
    put_len(out, encoded.logtype.len())?;
    out.extend_from_slice(&encoded.logtype);
    put_len(out, encoded.vars.len())?;
    for var in encoded.vars.iter() {
        var.put_be(out);
    }
    put_len(out, encoded.dict_vars.len())?;
    out.extend_from_slice(&encoded.dict_vars);
    put_len(out, encoded.dict_var_end_offsets.len())?;
    for offset in encoded.dict_var_end_offsets.iter() {
        offset.put_be(out);
    }
    put_i64(out, timestamp);

    Ok(())
}

/// Width-specific state of a [`Serializer`].
enum SerializerState {
    FourByte(EncodedMessage<FourByteEncoding>),
    EightByte(EncodedMessage<EightByteEncoding>),
}

/// Serializes log events into IR event records.
///
/// The `Serializer` owns one output buffer; [`serialize_log_message`]
/// returns a view of it that is valid until the next call.
///
/// For four-byte streams the `Serializer` holds the running timestamp,
/// the timestamp of the last serialized event (or the reference timestamp).
/// Each record holds the delta from the running timestamp.
///
/// [`serialize_log_message`]: Serializer::serialize_log_message
pub struct Serializer {
    /// `None` after [`close`](Serializer::close).
    state: Option<SerializerState>,
    width: EncodingWidth,
    timestamp_info: TimestampInfo,
    running_timestamp: EpochTimeMs,
    /// reused output buffer of one event record
    buffer: Bytes,
}

impl fmt::Debug for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Serializer")
            .field("width", &self.width)
            .field("timestamp_info", &self.timestamp_info)
            .field("running_timestamp", &self.running_timestamp)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Serializer {
    /// Create a `Serializer` of `width` and the preamble bytes of the new
    /// stream. `reference_timestamp` is ignored for
    /// [`EncodingWidth::EightByte`].
    pub fn new(
        width: EncodingWidth,
        timestamp_info: TimestampInfo,
        reference_timestamp: EpochTimeMs,
    ) -> ResultIr<(Serializer, Bytes)> {
        let preamble = serialize_preamble(width, &timestamp_info, reference_timestamp)?;
        let state = match width {
            EncodingWidth::FourByte => SerializerState::FourByte(EncodedMessage::new()),
            EncodingWidth::EightByte => SerializerState::EightByte(EncodedMessage::new()),
        };
        let running_timestamp = match width {
            EncodingWidth::FourByte => reference_timestamp,
            EncodingWidth::EightByte => 0,
        };
        let serializer = Serializer {
            state: Some(state),
            width,
            timestamp_info,
            running_timestamp,
            buffer: Bytes::new(),
        };
        defñ!("{:?}", serializer);

        Ok((serializer, preamble))
    }

    /// Create an eight-byte `Serializer` and its preamble bytes.
    pub fn new_eight_byte(timestamp_info: TimestampInfo) -> ResultIr<(Serializer, Bytes)> {
        Serializer::new(EncodingWidth::EightByte, timestamp_info, 0)
    }

    /// Create a four-byte `Serializer` and its preamble bytes.
    /// `reference_timestamp` seeds the running timestamp.
    pub fn new_four_byte(
        timestamp_info: TimestampInfo,
        reference_timestamp: EpochTimeMs,
    ) -> ResultIr<(Serializer, Bytes)> {
        Serializer::new(EncodingWidth::FourByte, timestamp_info, reference_timestamp)
    }

    /// Serialize `log_event` into one event record.
    #[inline(always)]
    pub fn serialize_event(&mut self, log_event: &LogEvent) -> ResultIr<&[u8]> {
        self.serialize_log_message(&log_event.message, log_event.timestamp)
    }

    /// Serialize `message` and `timestamp` into one event record.
    ///
    /// The returned bytes are valid until the next call on this
    /// `Serializer`. For four-byte streams the running timestamp becomes
    /// `timestamp` only upon success.
    pub fn serialize_log_message(
        &mut self,
        message: &[u8],
        timestamp: EpochTimeMs,
    ) -> ResultIr<&[u8]> {
        defn!("(message len {}, timestamp {})", message.len(), timestamp);
        let state: &mut SerializerState = match self.state.as_mut() {
            Some(state) => state,
            None => {
                defx!("return Err Closed");
                return Err(IrError::Closed);
            }
        };
        self.buffer.clear();
        let result: ResultIr<()> = match state {
            SerializerState::EightByte(encoded) => {
                encode_message(message, encoded)
                    .and_then(|_| serialize_event_record(encoded, timestamp, &mut self.buffer))
            }
            SerializerState::FourByte(encoded) => {
                let delta: EpochTimeMs = timestamp.wrapping_sub(self.running_timestamp);
                defo!("delta {}", delta);
                encode_message(message, encoded)
                    .and_then(|_| serialize_event_record(encoded, delta, &mut self.buffer))
            }
        };
        if let Err(err) = result {
            self.buffer.clear();
            defx!("return Err {}", err);
            return Err(err);
        }
        if self.width == EncodingWidth::FourByte {
            self.running_timestamp = timestamp;
        }
        defx!("record {} bytes", self.buffer.len());

        Ok(self.buffer.as_slice())
    }

    /// Release the buffers. Every later operation returns
    /// [`IrError::Closed`]. Calling `close` again does nothing.
    pub fn close(&mut self) {
        defñ!("closed {}", self.is_closed());
        self.state = None;
        self.buffer = Bytes::new();
    }

    #[inline(always)]
    pub const fn is_closed(&self) -> bool {
        self.state.is_none()
    }

    #[inline(always)]
    pub const fn timestamp_info(&self) -> &TimestampInfo {
        &self.timestamp_info
    }

    #[inline(always)]
    pub const fn encoding_width(&self) -> EncodingWidth {
        self.width
    }

    /// Set the running timestamp of a four-byte `Serializer` back to
    /// `timestamp`, for a record that was serialized but never written.
    pub(crate) fn rewind_running_timestamp(&mut self, timestamp: EpochTimeMs) {
        defñ!("({})", timestamp);
        if self.width == EncodingWidth::FourByte {
            self.running_timestamp = timestamp;
        }
    }

    /// The running timestamp of a four-byte `Serializer`.
    /// `None` for an eight-byte `Serializer`.
    pub const fn running_timestamp(&self) -> Option<EpochTimeMs> {
        match self.width {
            EncodingWidth::FourByte => Some(self.running_timestamp),
            EncodingWidth::EightByte => None,
        }
    }
}
