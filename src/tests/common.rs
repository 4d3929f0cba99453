// src/tests/common.rs

//! Common data and helpers for tests.

#![allow(non_upper_case_globals)]

use std::io::{Error, ErrorKind, Read, Result};

use crate::common::{Bytes, EpochTimeMs};
use crate::data::encodedmessage::EncodingWidth;
use crate::data::logevent::{LogEvent, TimestampInfo};
use crate::ir::protocol::TAG_EOIR;
use crate::ir::serializer::Serializer;

use ::lazy_static::lazy_static;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// log messages
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub const MSG_EMPTY: &[u8] = b"";
pub const MSG_USER: &[u8] = b"user=alice id=42 score=-1.234";
pub const MSG_COMBO0: &[u8] = b"static text dict=var notint123 -1.234 4321.";
pub const MSG_COMBO1: &[u8] = b"static123 text321 dict=var0123 321.1234 -3210.";
pub const MSG_DICT0: &[u8] = b"textint1234 textequal=variable";
pub const MSG_DICT1: &[u8] = b"test=bigint 2147483648";
pub const MSG_FLOAT0: &[u8] = b"float 1.0 1.2 1.23 1.234";
pub const MSG_FLOAT1: &[u8] = b"-float -1.0 -1.2 -1.23 -1.234";
pub const MSG_INT0: &[u8] = b"int 1 12 123 1234";
pub const MSG_INT1: &[u8] = b"-int -1 -12 -123 -1234";
pub const MSG_STATIC0: &[u8] = b"static text log zero.";
pub const MSG_STATIC1: &[u8] = b"static text log one.";
pub const MSG_HEX: &[u8] = b"addr 0xdeadbeef cafe ab a ffff:0000";
pub const MSG_NUMBERS_ODD: &[u8] = b"0 00 -0 007 +5 .5 1. 1.2.3 -. 9223372036854775807 -9223372036854775808";
/// every byte of the placeholder range and the escape byte, as static text
pub const MSG_ESCAPES: &[u8] = b"a\\b \\ \x10\x11\x12\x13\x1f \\\x11 end\\";
pub const MSG_NON_UTF8: &[u8] = b"caf\xe9 \xff\xfe 12 \xc3\x28";
pub const MSG_MULTILINE: &[u8] = b"line one 1\nline two 2\r\n\tindented=yes";

/// A message of one megabyte.
pub const MSG_LONG_SZ: usize = 1024 * 1024;

lazy_static! {
    /// All the short test messages.
    pub static ref MESSAGES_ALL: Vec<&'static [u8]> = vec![
        MSG_EMPTY,
        MSG_USER,
        MSG_COMBO0,
        MSG_COMBO1,
        MSG_DICT0,
        MSG_DICT1,
        MSG_FLOAT0,
        MSG_FLOAT1,
        MSG_INT0,
        MSG_INT1,
        MSG_STATIC0,
        MSG_STATIC1,
        MSG_HEX,
        MSG_NUMBERS_ODD,
        MSG_ESCAPES,
        MSG_NON_UTF8,
        MSG_MULTILINE,
    ];

    pub static ref MSG_LONG0: Bytes = vec![b'x'; MSG_LONG_SZ];
    pub static ref MSG_LONG1: Bytes = vec![b'x'; MSG_LONG_SZ - 1];

    pub static ref TIMESTAMP_INFO: TimestampInfo = TimestampInfo::new(
        "yyyy-MM-dd HH:mm:ss,SSS",
        "java::SimpleDateFormat",
        "America/Toronto",
    );

    /// Log events with increasing and decreasing timestamps.
    pub static ref EVENTS_ALL: Vec<LogEvent> = MESSAGES_ALL
        .iter()
        .enumerate()
        .map(|(at, msg)| {
            let ts: EpochTimeMs = match at % 3 {
                0 => 1_600_000_000_000 + at as EpochTimeMs * 1000,
                1 => 1_600_000_000_000 - at as EpochTimeMs * 7,
                _ => -(at as EpochTimeMs),
            };
            LogEvent::new(msg, ts)
        })
        .collect();
}

/// Log events `"event 1"` at timestamp `1` through `"event {count}"` at
/// timestamp `count`.
pub fn events_numbered(count: usize) -> Vec<LogEvent> {
    (1..=count)
        .map(|n| LogEvent::new(format!("event {}", n).as_bytes(), n as EpochTimeMs))
        .collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IR stream helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An IR stream split into its preamble and each event record.
pub struct StreamParts {
    pub preamble: Bytes,
    pub records: Vec<Bytes>,
}

impl StreamParts {
    /// All bytes, with the end-of-stream tag if `eoir`.
    pub fn to_bytes(&self, eoir: bool) -> Bytes {
        let mut bytes = self.preamble.clone();
        for record in self.records.iter() {
            bytes.extend_from_slice(record);
        }
        if eoir {
            bytes.push(TAG_EOIR);
        }
        bytes
    }

    /// All event record bytes, with the end-of-stream tag if `eoir`.
    pub fn records_bytes(&self, eoir: bool) -> Bytes {
        let mut bytes = Bytes::new();
        for record in self.records.iter() {
            bytes.extend_from_slice(record);
        }
        if eoir {
            bytes.push(TAG_EOIR);
        }
        bytes
    }
}

/// Serialize `events` with a new `Serializer`.
/// The four-byte reference timestamp is the first event's timestamp.
pub fn serialize_events(width: EncodingWidth, events: &[LogEvent]) -> StreamParts {
    let reference: EpochTimeMs = events.first().map(|e| e.timestamp).unwrap_or(0);
    let (mut serializer, preamble) = match Serializer::new(width, TIMESTAMP_INFO.clone(), reference) {
        Ok(val) => val,
        Err(err) => panic!("Serializer::new({}) failed {}", width, err),
    };
    let mut records: Vec<Bytes> = Vec::with_capacity(events.len());
    for event in events.iter() {
        match serializer.serialize_event(event) {
            Ok(record) => records.push(record.to_vec()),
            Err(err) => panic!("serialize_event({:?}) failed {}", event, err),
        }
    }

    StreamParts { preamble, records }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// byte sources
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A byte source returning at most `chunk` bytes per `read`. If
/// `interrupt` then every other `read` returns `ErrorKind::Interrupted`.
pub struct ChunkReader<'a> {
    data: &'a [u8],
    at: usize,
    chunk: usize,
    interrupt: bool,
    interrupted_last: bool,
    pub count_reads: usize,
}

impl<'a> ChunkReader<'a> {
    pub fn new(data: &'a [u8], chunk: usize) -> ChunkReader<'a> {
        ChunkReader {
            data,
            at: 0,
            chunk,
            interrupt: false,
            interrupted_last: false,
            count_reads: 0,
        }
    }

    pub fn new_interrupting(data: &'a [u8], chunk: usize) -> ChunkReader<'a> {
        let mut reader = ChunkReader::new(data, chunk);
        reader.interrupt = true;
        reader
    }
}

impl Read for ChunkReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.count_reads += 1;
        if self.interrupt && !self.interrupted_last {
            self.interrupted_last = true;
            return Err(Error::new(ErrorKind::Interrupted, "test interrupt"));
        }
        self.interrupted_last = false;
        let len = std::cmp::min(std::cmp::min(self.chunk, buf.len()), self.data.len() - self.at);
        buf[..len].copy_from_slice(&self.data[self.at..self.at + len]);
        self.at += len;

        Ok(len)
    }
}

/// A byte source that always fails.
pub struct FailReader {}

impl Read for FailReader {
    fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(Error::new(ErrorKind::PermissionDenied, "test failure"))
    }
}
