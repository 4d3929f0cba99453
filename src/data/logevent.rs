// src/data/logevent.rs

//! Implements [`LogEvent`], [`LogEventView`], and [`TimestampInfo`].
//!
//! [`LogEvent`]: crate::data::logevent::LogEvent
//! [`LogEventView`]: crate::data::logevent::LogEventView
//! [`TimestampInfo`]: crate::data::logevent::TimestampInfo

use std::fmt;

use ::bstr::ByteSlice;

use crate::common::{Bytes, EpochTimeMs};

/// A log message and its timestamp, owned.
#[derive(Clone, Default, Eq, Hash, PartialEq)]
pub struct LogEvent {
    /// The message text. Not necessarily UTF-8.
    pub message: Bytes,
    /// Milliseconds since the Unix epoch.
    pub timestamp: EpochTimeMs,
}

impl LogEvent {
    pub fn new(message: &[u8], timestamp: EpochTimeMs) -> LogEvent {
        LogEvent {
            message: Bytes::from(message),
            timestamp,
        }
    }

    /// Borrow as a [`LogEventView`].
    pub fn as_view(&self) -> LogEventView<'_> {
        LogEventView {
            message: self.message.as_slice(),
            timestamp: self.timestamp,
        }
    }
}

impl fmt::Debug for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.as_view().fmt(f)
    }
}

/// A borrowed log message and its timestamp.
///
/// A `LogEventView` returned by a [`Deserializer`] or a [`StreamReader`]
/// borrows that instance's reusable message buffer. It is valid until the
/// next call on the same instance; the borrow checker rejects any use after
/// that call. Use [`to_log_event`] to keep a copy.
///
/// ```compile_fail
/// use lislib::data::logevent::TimestampInfo;
/// use lislib::ir::deserializer::deserialize_preamble;
/// use lislib::ir::serializer::Serializer;
///
/// let (mut ser, mut ir) = Serializer::new_eight_byte(TimestampInfo::default()).unwrap();
/// ir.extend_from_slice(ser.serialize_log_message(b"first 1", 1).unwrap());
/// ir.extend_from_slice(ser.serialize_log_message(b"second 2", 2).unwrap());
/// let (mut de, pos) = deserialize_preamble(&ir).unwrap();
/// let (first, pos1) = de.deserialize_event(&ir[pos..]).unwrap();
/// // the second call overwrites the buffer `first` borrows
/// let (_second, _) = de.deserialize_event(&ir[pos + pos1..]).unwrap();
/// assert_eq!(first.message, b"first 1");
/// ```
///
/// [`Deserializer`]: crate::ir::deserializer::Deserializer
/// [`StreamReader`]: crate::readers::streamreader::StreamReader
/// [`to_log_event`]: LogEventView::to_log_event
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct LogEventView<'a> {
    pub message: &'a [u8],
    pub timestamp: EpochTimeMs,
}

impl<'a> LogEventView<'a> {
    pub const fn new(message: &'a [u8], timestamp: EpochTimeMs) -> LogEventView<'a> {
        LogEventView { message, timestamp }
    }

    /// Copy into an owned [`LogEvent`].
    pub fn to_log_event(&self) -> LogEvent {
        LogEvent::new(self.message, self.timestamp)
    }
}

impl fmt::Debug for LogEventView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LogEvent")
            .field("timestamp", &self.timestamp)
            .field("message", &self.message.as_bstr())
            .finish()
    }
}

/// General information applying to all timestamps of one IR stream.
///
/// Stored once in the stream preamble. Fields are sparse; a field that was
/// not set is an empty `String`.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct TimestampInfo {
    /// e.g. `"yyyy-MM-dd HH:mm:ss,SSS"`
    pub pattern: String,
    /// e.g. `"java::SimpleDateFormat"`
    pub pattern_syntax: String,
    /// e.g. `"America/Toronto"`
    pub time_zone_id: String,
}

impl TimestampInfo {
    pub fn new(
        pattern: &str,
        pattern_syntax: &str,
        time_zone_id: &str,
    ) -> TimestampInfo {
        TimestampInfo {
            pattern: String::from(pattern),
            pattern_syntax: String::from(pattern_syntax),
            time_zone_id: String::from(time_zone_id),
        }
    }
}
