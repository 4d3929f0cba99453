// src/tests/streamreader_tests.rs

#![allow(non_snake_case)]

use std::fs::File;
use std::io::{Read, Write};

use crate::common::{Count, IrError, ResultS3};
use crate::data::encodedmessage::EncodingWidth;
use crate::data::logevent::{LogEvent, LogEventView};
use crate::debug::helpers::create_temp_file_bytes_with_suffix;
use crate::readers::streamreader::{
    StreamOffset,
    StreamReader,
    BUFFER_CAPACITY_DEF,
};
use crate::search::wildcard::{TimestampInterval, WildcardQuery};
use crate::tests::common::{
    events_numbered,
    serialize_events,
    ChunkReader,
    FailReader,
    EVENTS_ALL,
    MSG_LONG0,
    MSG_LONG1,
    TIMESTAMP_INFO,
};

use ::flate2::read::GzDecoder;
use ::flate2::write::GzEncoder;
use ::flate2::Compression;
use ::more_asserts::{assert_ge, assert_gt};
use ::test_case::test_case;

/// Read every log event of `reader` until a non-`Found` result.
/// Returns the events and `Ok(())` for `Done`.
fn read_all<R: Read>(reader: &mut StreamReader<R>) -> (Vec<LogEvent>, Result<(), IrError>) {
    let mut events: Vec<LogEvent> = Vec::new();
    let mut offset_last: StreamOffset = reader.stream_offset();
    loop {
        match reader.read_event() {
            ResultS3::Found(event) => {
                events.push(event.to_log_event());
            }
            ResultS3::Done => {
                return (events, Ok(()));
            }
            ResultS3::Err(err) => {
                return (events, Err(err));
            }
        }
        assert_gt!(reader.stream_offset(), offset_last, "stream offset must advance");
        offset_last = reader.stream_offset();
    }
}

fn new_reader<R: Read>(source: R, capacity: usize) -> StreamReader<R> {
    match StreamReader::read_preamble(source, capacity) {
        Ok(reader) => reader,
        Err(err) => panic!("read_preamble failed {}", err),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// read_event
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[test_case(EncodingWidth::FourByte)]
#[test_case(EncodingWidth::EightByte)]
fn test_read_event_whole(width: EncodingWidth) {
    let bytes = serialize_events(width, &EVENTS_ALL).to_bytes(true);
    let mut reader = new_reader(bytes.as_slice(), BUFFER_CAPACITY_DEF);
    assert_eq!(reader.encoding_width(), width);
    assert_eq!(reader.timestamp_info(), &*TIMESTAMP_INFO);
    let (events, result) = read_all(&mut reader);
    assert!(result.is_ok(), "{:?}", result);
    assert_eq!(events, *EVENTS_ALL);
    assert_eq!(reader.count_events(), EVENTS_ALL.len() as Count);
    assert_eq!(reader.count_bytes_read(), bytes.len() as Count);
    // positioned at the end-of-stream tag
    assert_eq!(reader.stream_offset(), (bytes.len() - 1) as StreamOffset);
}

#[test_case(EncodingWidth::FourByte, 1, false; "four-byte one byte")]
#[test_case(EncodingWidth::EightByte, 1, false; "eight-byte one byte")]
#[test_case(EncodingWidth::FourByte, 7, true; "four-byte interrupting")]
#[test_case(EncodingWidth::EightByte, 13, true; "eight-byte interrupting")]
fn test_read_event_chunks(width: EncodingWidth, chunk: usize, interrupt: bool) {
    let bytes = serialize_events(width, &EVENTS_ALL).to_bytes(true);
    let source = match interrupt {
        true => ChunkReader::new_interrupting(&bytes, chunk),
        false => ChunkReader::new(&bytes, chunk),
    };
    let mut reader = new_reader(source, 16);
    let (events, result) = read_all(&mut reader);
    assert!(result.is_ok(), "{:?}", result);
    assert_eq!(events, *EVENTS_ALL);
    assert_ge!(reader.count_reads(), (bytes.len() / chunk) as Count);
    let (compactions, growths) = reader.count_buffer_adjustments();
    assert_gt!(compactions + growths, 0);
}

#[test]
fn test_read_event_Done_repeats() {
    let bytes = serialize_events(EncodingWidth::FourByte, &events_numbered(2)).to_bytes(true);
    let mut reader = new_reader(bytes.as_slice(), BUFFER_CAPACITY_DEF);
    assert!(reader.read_event().is_found());
    assert!(reader.read_event().is_found());
    for _ in 0..3 {
        assert!(reader.read_event().is_done());
    }
    assert_eq!(reader.count_events(), 2);
}

#[test]
fn test_read_event_empty_stream() {
    let bytes = serialize_events(EncodingWidth::EightByte, &[]).to_bytes(true);
    let mut reader = new_reader(bytes.as_slice(), BUFFER_CAPACITY_DEF);
    assert!(reader.read_event().is_done());
    assert_eq!(reader.count_events(), 0);
}

#[test_case(EncodingWidth::FourByte)]
#[test_case(EncodingWidth::EightByte)]
fn test_read_event_no_eoir(width: EncodingWidth) {
    let bytes = serialize_events(width, &EVENTS_ALL).to_bytes(false);
    let mut reader = new_reader(ChunkReader::new(&bytes, 5), 64);
    let (events, result) = read_all(&mut reader);
    assert!(matches!(result, Err(IrError::IncompleteIR)), "{:?}", result);
    assert_eq!(events, *EVENTS_ALL);
}

#[test_case(1; "one byte")]
#[test_case(8; "timestamp")]
#[test_case(20; "twenty bytes")]
fn test_read_event_truncated(truncate: usize) {
    let events_in = events_numbered(3);
    let parts = serialize_events(EncodingWidth::EightByte, &events_in);
    let bytes = parts.to_bytes(false);
    let bytes = &bytes[..bytes.len() - truncate];
    let mut reader = new_reader(bytes, BUFFER_CAPACITY_DEF);
    let (events, result) = read_all(&mut reader);
    assert!(matches!(result, Err(IrError::IncompleteIR)), "{:?}", result);
    assert_eq!(events, events_in[..2]);
}

#[test]
fn test_read_event_long_messages() {
    let events_in = vec![
        LogEvent::new(&MSG_LONG0, 1),
        LogEvent::new(b"short 2", 2),
        LogEvent::new(&MSG_LONG1, 3),
    ];
    let bytes = serialize_events(EncodingWidth::FourByte, &events_in).to_bytes(true);
    let mut reader = new_reader(bytes.as_slice(), 16);
    let (events, result) = read_all(&mut reader);
    assert!(result.is_ok(), "{:?}", result);
    assert_eq!(events, events_in);
    assert_gt!(reader.buffer_capacity(), MSG_LONG0.len());
    let (_compactions, growths) = reader.count_buffer_adjustments();
    assert_gt!(growths, 0);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// read_until
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The message and timestamp of a `Found`, else panic.
fn found(result: ResultS3<LogEventView<'_>, IrError>) -> LogEvent {
    match result {
        ResultS3::Found(event) => event.to_log_event(),
        ResultS3::Done => panic!("unexpected Done"),
        ResultS3::Err(err) => panic!("unexpected Err {}", err),
    }
}

#[test]
fn test_read_until_variants() {
    let bytes = serialize_events(EncodingWidth::EightByte, &events_numbered(12)).to_bytes(true);
    let mut reader = new_reader(ChunkReader::new(&bytes, 3), 32);

    let event = found(reader.read_until_timestamp(3));
    assert_eq!(event, LogEvent::new(b"event 3", 3));
    let event = found(reader.read_until_contains(b"nt 5"));
    assert_eq!(event, LogEvent::new(b"event 5", 5));
    let event = found(reader.read_until_prefix(b"event 8"));
    assert_eq!(event, LogEvent::new(b"event 8", 8));
    let event = found(reader.read_until_suffix(b"1"));
    assert_eq!(event, LogEvent::new(b"event 11", 11));
    let event = found(reader.read_until(|event| event.message.len() > 7));
    assert_eq!(event, LogEvent::new(b"event 12", 12));
    assert_eq!(reader.count_events(), 12);
    assert!(reader.read_event().is_done());
}

#[test]
fn test_read_until_Done() {
    let bytes = serialize_events(EncodingWidth::FourByte, &events_numbered(4)).to_bytes(true);
    let mut reader = new_reader(bytes.as_slice(), BUFFER_CAPACITY_DEF);
    assert!(reader.read_until_contains(b"no such message").is_done());
    assert_eq!(reader.count_events(), 4);
}

#[test]
fn test_read_until_timestamp_unordered() {
    let bytes = serialize_events(EncodingWidth::FourByte, &EVENTS_ALL).to_bytes(true);
    let mut reader = new_reader(bytes.as_slice(), BUFFER_CAPACITY_DEF);
    let event = found(reader.read_until_timestamp(0));
    let expect = EVENTS_ALL.iter().find(|e| e.timestamp >= 0).unwrap();
    assert_eq!(&event, expect);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// read_wildcard_match
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[test_case(EncodingWidth::FourByte, 1; "four-byte one byte")]
#[test_case(EncodingWidth::EightByte, 1; "eight-byte one byte")]
#[test_case(EncodingWidth::FourByte, 4096; "four-byte whole")]
#[test_case(EncodingWidth::EightByte, 4096; "eight-byte whole")]
fn test_read_wildcard_match(width: EncodingWidth, chunk: usize) {
    let bytes = serialize_events(width, &events_numbered(20)).to_bytes(true);
    let mut reader = new_reader(ChunkReader::new(&bytes, chunk), 16);
    let queries = vec![
        WildcardQuery::new("*1?", true),
        WildcardQuery::new("EVENT 5", false),
    ];
    let interval = TimestampInterval::new(5, 15);
    let mut matches: Vec<(LogEvent, usize)> = Vec::new();
    loop {
        match reader.read_wildcard_match(interval, &queries) {
            ResultS3::Found((event, index)) => matches.push((event.to_log_event(), index)),
            ResultS3::Done => break,
            ResultS3::Err(err) => panic!("read_wildcard_match failed {}", err),
        }
    }
    let mut expect: Vec<(LogEvent, usize)> = vec![(LogEvent::new(b"event 5", 5), 1)];
    for n in 10..=15 {
        expect.push((LogEvent::new(format!("event {}", n).as_bytes(), n), 0));
    }
    assert_eq!(matches, expect);
    assert_eq!(reader.count_events(), expect.len() as Count);
    assert_eq!(reader.stream_offset(), (bytes.len() - 1) as StreamOffset);
}

#[test]
fn test_read_wildcard_match_then_read_event() {
    let bytes = serialize_events(EncodingWidth::FourByte, &events_numbered(5)).to_bytes(true);
    let mut reader = new_reader(ChunkReader::new(&bytes, 2), 16);
    match reader.read_wildcard_match(TimestampInterval::ALL, &[WildcardQuery::new("*3", true)]) {
        ResultS3::Found((event, index)) => {
            assert_eq!(event.to_log_event(), LogEvent::new(b"event 3", 3));
            assert_eq!(index, 0);
        }
        result => panic!("unexpected {}", result),
    }
    let event = found(reader.read_event());
    assert_eq!(event, LogEvent::new(b"event 4", 4));
}

#[test]
fn test_read_wildcard_match_no_eoir() {
    let bytes = serialize_events(EncodingWidth::EightByte, &events_numbered(5)).to_bytes(false);
    let mut reader = new_reader(ChunkReader::new(&bytes, 3), 16);
    match reader.read_wildcard_match(TimestampInterval::ALL, &[WildcardQuery::new("nothing", true)]) {
        ResultS3::Err(IrError::IncompleteIR) => {}
        result => panic!("unexpected {}", result),
    }
    // every record was consumed
    assert_eq!(reader.stream_offset(), bytes.len() as StreamOffset);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// sources
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();

    encoder.finish().unwrap()
}

#[test]
fn test_read_gzip() {
    let bytes = serialize_events(EncodingWidth::FourByte, &EVENTS_ALL).to_bytes(true);
    let compressed = gzip(&bytes);
    let mut reader = new_reader(GzDecoder::new(compressed.as_slice()), 64);
    let (events, result) = read_all(&mut reader);
    assert!(result.is_ok(), "{:?}", result);
    assert_eq!(events, *EVENTS_ALL);
}

#[test]
fn test_read_gzip_file() {
    let bytes = serialize_events(EncodingWidth::EightByte, &EVENTS_ALL).to_bytes(true);
    let ntf = create_temp_file_bytes_with_suffix(&gzip(&bytes), ".clp.gz");
    let file = File::open(ntf.path()).unwrap();
    let mut reader = new_reader(GzDecoder::new(file), BUFFER_CAPACITY_DEF);
    let (events, result) = read_all(&mut reader);
    assert!(result.is_ok(), "{:?}", result);
    assert_eq!(events, *EVENTS_ALL);
}

#[test]
fn test_read_preamble_empty_source() {
    let source: &[u8] = &[];
    match StreamReader::read_preamble(source, BUFFER_CAPACITY_DEF) {
        Err(IrError::IncompleteIR) => {}
        result => panic!("expected IncompleteIR, got {:?}", result.map(|_| ())),
    }
}

#[test]
fn test_read_preamble_bad_magic() {
    let source: &[u8] = b"2024-01-01 plain text log\n";
    match StreamReader::read_preamble(source, BUFFER_CAPACITY_DEF) {
        Err(IrError::CorruptedIR(_)) => {}
        result => panic!("expected CorruptedIR, got {:?}", result.map(|_| ())),
    }
}

#[test]
fn test_read_preamble_Io() {
    match StreamReader::read_preamble(FailReader {}, BUFFER_CAPACITY_DEF) {
        Err(IrError::Io(_)) => {}
        result => panic!("expected Io, got {:?}", result.map(|_| ())),
    }
}

#[test]
fn test_read_preamble_one_byte_source() {
    let bytes = serialize_events(EncodingWidth::FourByte, &[]).to_bytes(true);
    let mut source = ChunkReader::new(&bytes, 1);
    {
        let reader = new_reader(&mut source, 1);
        assert_eq!(reader.stream_offset(), (bytes.len() - 1) as StreamOffset);
    }
    assert_ge!(source.count_reads, bytes.len() - 1);
}

#[test]
fn test_StreamReader_close() {
    let bytes = serialize_events(EncodingWidth::EightByte, &events_numbered(3)).to_bytes(true);
    let mut reader = new_reader(bytes.as_slice(), BUFFER_CAPACITY_DEF);
    assert!(reader.read_event().is_found());
    let offset = reader.stream_offset();
    reader.close();
    assert!(reader.is_closed());
    assert_eq!(reader.stream_offset(), offset);
    match reader.read_event() {
        ResultS3::Err(IrError::Closed) => {}
        result => panic!("expected Closed, got {}", result),
    }
    match reader.read_wildcard_match(TimestampInterval::ALL, &[WildcardQuery::new("*", true)]) {
        ResultS3::Err(IrError::Closed) => {}
        result => panic!("expected Closed, got {}", result),
    }
    reader.close();
    assert!(reader.is_closed());
    assert_eq!(reader.buffer_capacity(), 0);
}
