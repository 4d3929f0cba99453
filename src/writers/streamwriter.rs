// src/writers/streamwriter.rs

//! Implements a [`StreamWriter`], the driver of writing log events of an IR
//! stream to a byte sink.
//!
//! [`StreamWriter`]: crate::writers::streamwriter::StreamWriter

use std::io::Write;

use crate::common::{Count, EpochTimeMs, IrError, ResultIr};
use crate::de_err;
use crate::data::encodedmessage::EncodingWidth;
use crate::data::logevent::{LogEvent, TimestampInfo};
use crate::ir::protocol::TAG_EOIR;
use crate::ir::serializer::Serializer;

#[allow(unused_imports)]
use ::si_trace_print::{defn, defo, defx, defñ};

/// Writes log events of an IR stream to a byte sink `W`.
///
/// The preamble is written upon creation. [`finish`] writes the
/// end-of-stream tag, flushes, and returns `W`.
///
/// [`finish`]: StreamWriter::finish
#[derive(Debug)]
pub struct StreamWriter<W: Write> {
    sink: W,
    serializer: Serializer,
    count_events: Count,
    count_bytes_written: Count,
}

impl<W: Write> StreamWriter<W> {
    /// Create a `StreamWriter` of `width` and write the preamble to `sink`.
    pub fn new(
        mut sink: W,
        width: EncodingWidth,
        timestamp_info: TimestampInfo,
        reference_timestamp: EpochTimeMs,
    ) -> ResultIr<StreamWriter<W>> {
        defn!("({}, {:?}, {})", width, timestamp_info, reference_timestamp);
        let (serializer, preamble) = Serializer::new(width, timestamp_info, reference_timestamp)?;
        sink.write_all(&preamble)?;
        defx!("wrote preamble {} bytes", preamble.len());

        Ok(StreamWriter {
            sink,
            serializer,
            count_events: 0,
            count_bytes_written: preamble.len() as Count,
        })
    }

    pub fn new_eight_byte(sink: W, timestamp_info: TimestampInfo) -> ResultIr<StreamWriter<W>> {
        StreamWriter::new(sink, EncodingWidth::EightByte, timestamp_info, 0)
    }

    pub fn new_four_byte(
        sink: W,
        timestamp_info: TimestampInfo,
        reference_timestamp: EpochTimeMs,
    ) -> ResultIr<StreamWriter<W>> {
        StreamWriter::new(sink, EncodingWidth::FourByte, timestamp_info, reference_timestamp)
    }

    /// Serialize and write one log event.
    ///
    /// If the sink fails then the running timestamp is not advanced, so the
    /// same event may be written again. A sink that accepted part of the
    /// record before failing leaves the stream corrupted.
    pub fn write_log_message(&mut self, message: &[u8], timestamp: EpochTimeMs) -> ResultIr<()> {
        let running: Option<EpochTimeMs> = self.serializer.running_timestamp();
        let record: &[u8] = self.serializer.serialize_log_message(message, timestamp)?;
        if let Err(err) = self.sink.write_all(record) {
            de_err!("write_all of event {} failed {}", self.count_events, err);
            if let Some(running) = running {
                self.serializer.rewind_running_timestamp(running);
            }
            return Err(IrError::Io(err));
        }
        self.count_events += 1;
        self.count_bytes_written += record.len() as Count;

        Ok(())
    }

    #[inline(always)]
    pub fn write_event(&mut self, log_event: &LogEvent) -> ResultIr<()> {
        self.write_log_message(&log_event.message, log_event.timestamp)
    }

    /// Write the end-of-stream tag, flush, and return the byte sink.
    pub fn finish(mut self) -> ResultIr<W> {
        defn!("count_events {}", self.count_events);
        if self.serializer.is_closed() {
            return Err(IrError::Closed);
        }
        self.sink.write_all(&[TAG_EOIR])?;
        self.sink.flush()?;
        self.serializer.close();
        defx!("wrote {} bytes", self.count_bytes_written + 1);

        Ok(self.sink)
    }

    /// Count of log events written.
    pub const fn count_events(&self) -> Count {
        self.count_events
    }

    /// Count of bytes written, the preamble included.
    pub const fn count_bytes_written(&self) -> Count {
        self.count_bytes_written
    }

    pub fn timestamp_info(&self) -> &TimestampInfo {
        self.serializer.timestamp_info()
    }

    pub fn encoding_width(&self) -> EncodingWidth {
        self.serializer.encoding_width()
    }
}
