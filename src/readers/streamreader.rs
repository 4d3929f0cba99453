// src/readers/streamreader.rs

//! Implements a [`StreamReader`], the driver of reading log events from a
//! byte source of an IR stream.
//!
//! [`StreamReader`]: crate::readers::streamreader::StreamReader

use std::fmt;
use std::io::{ErrorKind, Read};

use crate::common::{Bytes, Count, IrError, ResultIr, ResultS3};
use crate::data::encodedmessage::EncodingWidth;
use crate::data::logevent::{LogEventView, TimestampInfo};
use crate::ir::deserializer::{deserialize_preamble, Deserializer};
use crate::search::wildcard::{TimestampInterval, WildcardMatcher, WildcardQuery};

use ::memchr::memmem;
#[allow(unused_imports)]
use ::more_asserts::{debug_assert_ge, debug_assert_le};
#[allow(unused_imports)]
use ::si_trace_print::{defn, defo, defx, defñ};

/// Absolute byte offset into an IR stream. Zero based.
pub type StreamOffset = u64;

/// Default initial capacity in bytes of the [`StreamReader`] buffer.
pub const BUFFER_CAPACITY_DEF: usize = 64 * 1024;

/// Before each read of the byte source, the buffer has at least this many
/// bytes free after the valid range.
pub const BUFFER_LOW_WATER_MARK: usize = 4096;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// StreamBuffer
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A growable buffer of bytes read from a byte source. Bytes in
/// `[start, end)` are read but not yet consumed.
struct StreamBuffer {
    buffer: Bytes,
    start: usize,
    end: usize,
    /// absolute stream offset of `buffer[0]`
    offset: StreamOffset,
    count_reads: Count,
    count_bytes_read: Count,
    count_compactions: Count,
    count_growths: Count,
}

impl StreamBuffer {
    fn new(capacity: usize) -> StreamBuffer {
        StreamBuffer {
            buffer: vec![0; std::cmp::max(capacity, 1)],
            start: 0,
            end: 0,
            offset: 0,
            count_reads: 0,
            count_bytes_read: 0,
            count_compactions: 0,
            count_growths: 0,
        }
    }

    /// The read and unconsumed bytes.
    #[inline(always)]
    fn valid(&self) -> &[u8] {
        &self.buffer[self.start..self.end]
    }

    #[inline(always)]
    fn consume(&mut self, len: usize) {
        debug_assert_le!(self.start + len, self.end, "consume {} past end", len);
        self.start += len;
    }

    #[inline(always)]
    fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Absolute stream offset of `start`.
    #[inline(always)]
    fn stream_offset(&self) -> StreamOffset {
        self.offset + self.start as StreamOffset
    }

    /// Ensure at least [`BUFFER_LOW_WATER_MARK`] bytes are free after `end`.
    /// Compact in place when `start > 0`, then grow if still needed.
    fn make_room(&mut self) {
        if self.capacity() - self.end >= BUFFER_LOW_WATER_MARK {
            return;
        }
        if self.start > 0 {
            defo!("compact [{}, {}) of capacity {}", self.start, self.end, self.capacity());
            self.buffer.copy_within(self.start..self.end, 0);
            self.offset += self.start as StreamOffset;
            self.end -= self.start;
            self.start = 0;
            self.count_compactions += 1;
        }
        if self.capacity() - self.end < BUFFER_LOW_WATER_MARK {
            let capacity_new = std::cmp::max(
                self.capacity() * 2,
                self.end + BUFFER_LOW_WATER_MARK,
            );
            defo!("grow capacity {} to {}", self.capacity(), capacity_new);
            self.buffer.resize(capacity_new, 0);
            self.count_growths += 1;
        }
        debug_assert_ge!(self.capacity() - self.end, BUFFER_LOW_WATER_MARK);
    }

    /// Read more bytes from `source` after `end`.
    /// Returns the count of bytes read; `0` means `source` is exhausted.
    fn fill<R: Read>(&mut self, source: &mut R) -> ResultIr<usize> {
        self.make_room();
        loop {
            self.count_reads += 1;
            match source.read(&mut self.buffer[self.end..]) {
                Ok(len) => {
                    defñ!("read {} bytes at stream offset {}", len, self.offset + self.end as StreamOffset);
                    self.end += len;
                    self.count_bytes_read += len as Count;
                    return Ok(len);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => {
                    defo!("read interrupted; retry");
                    continue;
                }
                Err(err) => {
                    defñ!("read Error {}", err);
                    return Err(IrError::Io(err));
                }
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// StreamReader
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Reads log events of an IR stream from a byte source `R`.
///
/// A `StreamReader` reads from `R` into a growable buffer and drives a
/// [`Deserializer`] over the buffered bytes. A record split across reads is
/// retried after the next read; [`IrError::IncompleteIR`] is returned only
/// when `R` is exhausted in the middle of a record, or before the
/// end-of-stream tag.
///
/// A returned [`LogEventView`] borrows the `StreamReader` and is valid until
/// the next call.
///
/// _This is a "reader" in an informal sense. It does not implement the
/// trait [`Read`]._
pub struct StreamReader<R: Read> {
    source: R,
    deserializer: Deserializer,
    buffer: StreamBuffer,
    /// count of log events returned
    count_events: Count,
}

impl<R: Read> fmt::Debug for StreamReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("StreamReader")
            .field("deserializer", &self.deserializer)
            .field("start", &self.buffer.start)
            .field("end", &self.buffer.end)
            .field("capacity", &self.buffer.capacity())
            .field("stream_offset", &self.buffer.stream_offset())
            .field("count_events", &self.count_events)
            .finish()
    }
}

impl<R: Read> StreamReader<R> {
    /// Read the preamble of the IR stream from `source` and create a new
    /// `StreamReader`. The buffer starts at `initial_capacity` bytes and
    /// grows as needed.
    pub fn read_preamble(mut source: R, initial_capacity: usize) -> ResultIr<StreamReader<R>> {
        defn!("(initial_capacity {})", initial_capacity);
        let mut buffer = StreamBuffer::new(initial_capacity);
        let deserializer: Deserializer = loop {
            match deserialize_preamble(buffer.valid()) {
                Ok((deserializer, len)) => {
                    buffer.consume(len);
                    break deserializer;
                }
                Err(IrError::IncompleteIR) => {
                    if buffer.fill(&mut source)? == 0 {
                        defx!("return IncompleteIR; source exhausted");
                        return Err(IrError::IncompleteIR);
                    }
                }
                Err(err) => {
                    defx!("return Err {}", err);
                    return Err(err);
                }
            }
        };
        let reader = StreamReader {
            source,
            deserializer,
            buffer,
            count_events: 0,
        };
        defx!("return {:?}", reader);

        Ok(reader)
    }

    /// Deserialize the next event into the deserializer, reading from the
    /// source as needed.
    fn read_event_into(&mut self) -> ResultIr<()> {
        loop {
            match self.deserializer.deserialize_event_into(self.buffer.valid()) {
                Ok(len) => {
                    self.buffer.consume(len);
                    self.count_events += 1;
                    return Ok(());
                }
                Err(IrError::IncompleteIR) => {
                    if self.buffer.fill(&mut self.source)? == 0 {
                        return Err(IrError::IncompleteIR);
                    }
                }
                Err(err) => {
                    return Err(err);
                }
            }
        }
    }

    /// Read the next log event.
    ///
    /// Returns `Done` at the end-of-stream tag, and for every later call.
    pub fn read_event(&mut self) -> ResultS3<LogEventView<'_>, IrError> {
        defn!();
        match self.read_event_into() {
            Ok(_) => {
                defx!("return Found");
                ResultS3::Found(self.deserializer.last_event())
            }
            Err(IrError::Eoir) => {
                defx!("return Done");
                ResultS3::Done
            }
            Err(err) => {
                defx!("return Err {}", err);
                ResultS3::Err(err)
            }
        }
    }

    fn read_until_into<F>(&mut self, predicate: &mut F) -> ResultIr<()>
    where
        F: FnMut(&LogEventView<'_>) -> bool,
    {
        loop {
            self.read_event_into()?;
            if predicate(&self.deserializer.last_event()) {
                return Ok(());
            }
        }
    }

    /// Read log events until `predicate` returns `true`, and return that
    /// log event. Log events before it are consumed.
    pub fn read_until<F>(&mut self, mut predicate: F) -> ResultS3<LogEventView<'_>, IrError>
    where
        F: FnMut(&LogEventView<'_>) -> bool,
    {
        match self.read_until_into(&mut predicate) {
            Ok(_) => ResultS3::Found(self.deserializer.last_event()),
            Err(IrError::Eoir) => ResultS3::Done,
            Err(err) => ResultS3::Err(err),
        }
    }

    /// Read until a log event with timestamp at or after `timestamp`.
    pub fn read_until_timestamp(
        &mut self,
        timestamp: crate::common::EpochTimeMs,
    ) -> ResultS3<LogEventView<'_>, IrError> {
        self.read_until(|event| event.timestamp >= timestamp)
    }

    /// Read until a log event with a message containing `needle`.
    pub fn read_until_contains(&mut self, needle: &[u8]) -> ResultS3<LogEventView<'_>, IrError> {
        let finder = memmem::Finder::new(needle);
        self.read_until(|event| finder.find(event.message).is_some())
    }

    /// Read until a log event with a message starting with `prefix`.
    pub fn read_until_prefix(&mut self, prefix: &[u8]) -> ResultS3<LogEventView<'_>, IrError> {
        self.read_until(|event| event.message.starts_with(prefix))
    }

    /// Read until a log event with a message ending with `suffix`.
    pub fn read_until_suffix(&mut self, suffix: &[u8]) -> ResultS3<LogEventView<'_>, IrError> {
        self.read_until(|event| event.message.ends_with(suffix))
    }

    fn read_wildcard_match_into(
        &mut self,
        interval: TimestampInterval,
        matcher: &WildcardMatcher,
    ) -> ResultIr<usize> {
        loop {
            let (result, consumed) =
                self.deserializer.find_wildcard_match(self.buffer.valid(), interval, matcher);
            // skipped records are consumed even when there is no match
            self.buffer.consume(consumed);
            match result {
                Ok(query_index) => {
                    self.count_events += 1;
                    return Ok(query_index);
                }
                Err(IrError::IncompleteIR) | Err(IrError::NoMatch) => {
                    if self.buffer.fill(&mut self.source)? == 0 {
                        return Err(IrError::IncompleteIR);
                    }
                }
                Err(err) => {
                    return Err(err);
                }
            }
        }
    }

    /// Read until a log event with a timestamp within `interval` and a
    /// message matching one of `queries`. Returns that log event and the
    /// index of the first matching query.
    pub fn read_wildcard_match(
        &mut self,
        interval: TimestampInterval,
        queries: &[WildcardQuery],
    ) -> ResultS3<(LogEventView<'_>, usize), IrError> {
        defn!("({}, {} queries)", interval, queries.len());
        let matcher = match WildcardMatcher::new(queries) {
            Ok(matcher) => matcher,
            Err(err) => {
                defx!("return Err {}", err);
                return ResultS3::Err(err);
            }
        };
        match self.read_wildcard_match_into(interval, &matcher) {
            Ok(query_index) => {
                defx!("return Found; query {}", query_index);
                ResultS3::Found((self.deserializer.last_event(), query_index))
            }
            Err(IrError::Eoir) => {
                defx!("return Done");
                ResultS3::Done
            }
            Err(err) => {
                defx!("return Err {}", err);
                ResultS3::Err(err)
            }
        }
    }

    /// Absolute stream offset of the next unconsumed byte.
    /// Never decreases.
    #[inline(always)]
    pub fn stream_offset(&self) -> StreamOffset {
        self.buffer.stream_offset()
    }

    /// Current buffer capacity in bytes.
    pub fn buffer_capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn timestamp_info(&self) -> &TimestampInfo {
        self.deserializer.timestamp_info()
    }

    pub fn encoding_width(&self) -> EncodingWidth {
        self.deserializer.encoding_width()
    }

    /// Count of log events returned.
    pub const fn count_events(&self) -> Count {
        self.count_events
    }

    /// Count of calls to `read` of the byte source.
    pub const fn count_reads(&self) -> Count {
        self.buffer.count_reads
    }

    /// Count of bytes read from the byte source.
    pub const fn count_bytes_read(&self) -> Count {
        self.buffer.count_bytes_read
    }

    /// Count of buffer compactions and buffer growths.
    pub const fn count_buffer_adjustments(&self) -> (Count, Count) {
        (self.buffer.count_compactions, self.buffer.count_growths)
    }

    /// Close the deserializer and release the buffer. Every later read
    /// returns [`IrError::Closed`]. Calling `close` again does nothing.
    pub fn close(&mut self) {
        defñ!();
        self.deserializer.close();
        self.buffer.offset = self.buffer.stream_offset();
        self.buffer.buffer = Bytes::new();
        self.buffer.start = 0;
        self.buffer.end = 0;
    }

    pub fn is_closed(&self) -> bool {
        self.deserializer.is_closed()
    }
}
