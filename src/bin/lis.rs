// src/bin/lis.rs

//! Driver program _lis_ drives the [_lislib_].
//!
//! Subcommands:
//!
//! * `encode` reads text log lines and writes an IR stream.
//! * `decode` reads an IR stream and writes text log lines.
//! * `search` reads an IR stream and writes the text log lines matching
//!   wildcard queries within a timestamp interval.
//!
//! A text log line is `<epoch milliseconds> <message>`. A line without a
//! leading integer has the timestamp of the prior line.
//!
//! A path ending `.gz` is read or written through gzip. Path `-` is STDIN
//! or STDOUT.
//!
//! [_lislib_]: lislib

#![allow(non_camel_case_types)]

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::process::ExitCode;

use ::anyhow::{bail, Context, Result};
use ::chrono::{DateTime, SecondsFormat};
use ::clap::{Parser, Subcommand};
use ::const_format::concatcp;
use ::flate2::read::GzDecoder;
use ::flate2::write::GzEncoder;
use ::flate2::Compression;
#[allow(unused_imports)]
use ::si_trace_print::{defn, defo, defx, defñ};

use ::lislib::common::{Count, EpochTimeMs, ResultS3};
use ::lislib::data::encodedmessage::EncodingWidth;
use ::lislib::data::logevent::{LogEventView, TimestampInfo};
use ::lislib::e_err;
use ::lislib::readers::streamreader::{StreamReader, BUFFER_CAPACITY_DEF};
use ::lislib::search::wildcard::{TimestampInterval, WildcardQuery};
use ::lislib::writers::streamwriter::StreamWriter;

/// Path meaning STDIN or STDOUT.
const PATH_STDIO: &str = "-";

/// File name extension of gzip files.
const EXTENSION_GZ: &str = "gz";

const CLI_HELP_AFTER: &str = "\
Text log lines are \"<epoch milliseconds> <message>\".
A line without a leading integer has the timestamp of the prior line.
A PATH ending \".gz\" is read or written with gzip compression.
A PATH of \"-\" is STDIN or STDOUT.

Wildcard QUERY syntax:
    *   any run of characters
    ?   exactly one character
    \\x  the literal character x";

#[derive(Parser, Debug)]
#[clap(
    about = env!("CARGO_PKG_DESCRIPTION"),
    author = env!("CARGO_PKG_AUTHORS"),
    name = "lis",
    // write expanded information for the `--version` output
    version = concatcp!(
        "(log IR stream)\n",
        "Version: ",
        env!("CARGO_PKG_VERSION_MAJOR"), ".",
        env!("CARGO_PKG_VERSION_MINOR"), ".",
        env!("CARGO_PKG_VERSION_PATCH"), "\n",
        "MSRV: ", env!("CARGO_PKG_RUST_VERSION"), "\n",
        "License: ", env!("CARGO_PKG_LICENSE"), "\n",
        "Author: ", env!("CARGO_PKG_AUTHORS"), "\n",
    ),
    after_help = CLI_HELP_AFTER,
)]
struct CLI_Args {
    #[clap(subcommand)]
    command: CLI_Command,

    /// Print a summary of counts to STDERR.
    #[clap(short = 's', long, global = true)]
    summary: bool,
}

#[derive(Subcommand, Debug)]
enum CLI_Command {
    /// Encode text log lines into an IR stream.
    Encode {
        /// Text log lines to read.
        input: String,
        /// IR stream to write.
        output: String,
        /// Four-byte encoding; timestamps are deltas from the prior event.
        #[clap(long = "four-byte")]
        four_byte: bool,
        /// Reference timestamp of a four-byte stream. Defaults to the
        /// timestamp of the first line.
        #[clap(short = 'r', long, requires = "four_byte", allow_hyphen_values = true)]
        reference_timestamp: Option<EpochTimeMs>,
        /// Timestamp pattern stored in the stream preamble.
        #[clap(long, default_value = "")]
        timestamp_pattern: String,
        /// Timestamp pattern syntax stored in the stream preamble.
        #[clap(long, default_value = "")]
        timestamp_pattern_syntax: String,
        /// Time zone ID stored in the stream preamble.
        #[clap(long, default_value = "")]
        tz_id: String,
    },
    /// Decode an IR stream into text log lines written to STDOUT.
    Decode {
        /// IR stream to read.
        input: String,
        /// Print timestamps as epoch milliseconds instead of RFC 3339.
        #[clap(short = 'e', long)]
        epoch: bool,
    },
    /// Print the log events of an IR stream matching any QUERY.
    Search {
        /// IR stream to read.
        input: String,
        /// Wildcard queries.
        #[clap(required = true)]
        queries: Vec<String>,
        /// Match queries ignoring ASCII case.
        #[clap(short = 'i', long)]
        ignore_case: bool,
        /// Earliest timestamp in epoch milliseconds (inclusive).
        #[clap(short = 'a', long, allow_hyphen_values = true)]
        after: Option<EpochTimeMs>,
        /// Latest timestamp in epoch milliseconds (inclusive).
        #[clap(short = 'b', long, allow_hyphen_values = true)]
        before: Option<EpochTimeMs>,
        /// Print timestamps as epoch milliseconds instead of RFC 3339.
        #[clap(short = 'e', long)]
        epoch: bool,
    },
}

/// Does `path` end with extension `.gz`?
fn is_gz(path: &str) -> bool {
    Path::new(path)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case(EXTENSION_GZ))
        .unwrap_or(false)
}

/// Open `path` for reading, decompressing `.gz` paths.
fn open_input(path: &str) -> Result<Box<dyn Read>> {
    if path == PATH_STDIO {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).with_context(|| format!("open {:?}", path))?;
    if is_gz(path) {
        defo!("gzip input {:?}", path);
        return Ok(Box::new(GzDecoder::new(BufReader::new(file))));
    }

    Ok(Box::new(BufReader::new(file)))
}

/// Open `path` for writing, compressing `.gz` paths.
fn open_output(path: &str) -> Result<Box<dyn Write>> {
    if path == PATH_STDIO {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    }
    let file = File::create(path).with_context(|| format!("create {:?}", path))?;
    if is_gz(path) {
        defo!("gzip output {:?}", path);
        return Ok(Box::new(GzEncoder::new(BufWriter::new(file), Compression::default())));
    }

    Ok(Box::new(BufWriter::new(file)))
}

/// Split a text log line into its timestamp and message.
/// A line without a leading integer has timestamp `prior`.
fn split_line(line: &[u8], prior: EpochTimeMs) -> (EpochTimeMs, &[u8]) {
    let at = line.iter().position(|c| *c == b' ').unwrap_or(line.len());
    let timestamp: Option<EpochTimeMs> = std::str::from_utf8(&line[..at])
        .ok()
        .and_then(|s| s.parse::<EpochTimeMs>().ok());
    match timestamp {
        Some(ts) => (ts, &line[std::cmp::min(at + 1, line.len())..]),
        None => (prior, line),
    }
}

/// Render `timestamp` as RFC 3339 in UTC, or as epoch milliseconds.
fn timestamp_to_string(timestamp: EpochTimeMs, epoch: bool) -> String {
    if epoch {
        return timestamp.to_string();
    }
    match DateTime::from_timestamp_millis(timestamp) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => timestamp.to_string(),
    }
}

fn write_event<W: Write>(out: &mut W, event: &LogEventView<'_>, epoch: bool) -> io::Result<()> {
    out.write_all(timestamp_to_string(event.timestamp, epoch).as_bytes())?;
    out.write_all(b" ")?;
    out.write_all(event.message)?;
    out.write_all(b"\n")
}

fn summary_print(name: &str, events: Count, bytes: Count) {
    eprintln!("{}: log events {}, IR bytes {}", name, events, bytes);
}

fn command_encode(
    input: &str,
    output: &str,
    four_byte: bool,
    reference_timestamp: Option<EpochTimeMs>,
    timestamp_info: TimestampInfo,
    summary: bool,
) -> Result<()> {
    defn!("({:?}, {:?})", input, output);
    let mut lines = BufReader::new(open_input(input)?).split(b'\n').peekable();
    let width = match four_byte {
        true => EncodingWidth::FourByte,
        false => EncodingWidth::EightByte,
    };
    // the reference timestamp defaults to the timestamp of the first line
    let reference: EpochTimeMs = match (reference_timestamp, lines.peek()) {
        (Some(ts), _) => ts,
        (None, Some(Ok(line))) => split_line(line, 0).0,
        (None, _) => 0,
    };
    let mut writer = StreamWriter::new(open_output(output)?, width, timestamp_info, reference)
        .with_context(|| format!("write preamble to {:?}", output))?;
    let mut prior: EpochTimeMs = 0;
    for line in lines {
        let mut line = line.with_context(|| format!("read {:?}", input))?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        let (timestamp, message) = split_line(&line, prior);
        writer.write_log_message(message, timestamp)?;
        prior = timestamp;
    }
    let events = writer.count_events();
    let bytes = writer.count_bytes_written();
    // dropping a `GzEncoder` writes the gzip trailer
    let sink = writer.finish().with_context(|| format!("finish {:?}", output))?;
    drop(sink);
    if summary {
        summary_print("encode", events, bytes + 1);
    }
    defx!();

    Ok(())
}

fn command_decode(input: &str, epoch: bool, summary: bool) -> Result<()> {
    defn!("({:?})", input);
    let mut reader = StreamReader::read_preamble(open_input(input)?, BUFFER_CAPACITY_DEF)
        .with_context(|| format!("read preamble of {:?}", input))?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    loop {
        let err = match reader.read_event() {
            ResultS3::Found(event) => {
                write_event(&mut out, &event, epoch)?;
                continue;
            }
            ResultS3::Done => break,
            ResultS3::Err(err) => err,
        };
        out.flush()?;
        bail!("read {:?} at offset {}: {}", input, reader.stream_offset(), err);
    }
    out.flush()?;
    if summary {
        summary_print("decode", reader.count_events(), reader.count_bytes_read());
    }
    defx!();

    Ok(())
}

fn command_search(
    input: &str,
    queries: &[String],
    ignore_case: bool,
    interval: TimestampInterval,
    epoch: bool,
    summary: bool,
) -> Result<()> {
    defn!("({:?}, {:?}, {})", input, queries, interval);
    let queries: Vec<WildcardQuery> = queries
        .iter()
        .map(|query| WildcardQuery::new(query, !ignore_case))
        .collect();
    let mut reader = StreamReader::read_preamble(open_input(input)?, BUFFER_CAPACITY_DEF)
        .with_context(|| format!("read preamble of {:?}", input))?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    loop {
        let err = match reader.read_wildcard_match(interval, &queries) {
            ResultS3::Found((event, _query_index)) => {
                write_event(&mut out, &event, epoch)?;
                continue;
            }
            ResultS3::Done => break,
            ResultS3::Err(err) => err,
        };
        out.flush()?;
        bail!("search {:?} at offset {}: {}", input, reader.stream_offset(), err);
    }
    out.flush()?;
    if summary {
        summary_print("search", reader.count_events(), reader.count_bytes_read());
    }
    defx!();

    Ok(())
}

type CLI_Result = Result<()>;

pub fn main() -> ExitCode {
    let args = CLI_Args::parse();
    defn!("{:?}", args);
    let summary = args.summary;
    let result: CLI_Result = match args.command {
        CLI_Command::Encode {
            input,
            output,
            four_byte,
            reference_timestamp,
            timestamp_pattern,
            timestamp_pattern_syntax,
            tz_id,
        } => {
            let timestamp_info = TimestampInfo::new(&timestamp_pattern, &timestamp_pattern_syntax, &tz_id);
            command_encode(&input, &output, four_byte, reference_timestamp, timestamp_info, summary)
        }
        CLI_Command::Decode { input, epoch } => command_decode(&input, epoch, summary),
        CLI_Command::Search {
            input,
            queries,
            ignore_case,
            after,
            before,
            epoch,
        } => {
            let interval = TimestampInterval::new(
                after.unwrap_or(TimestampInterval::ALL.lower),
                before.unwrap_or(TimestampInterval::ALL.upper),
            );
            command_search(&input, &queries, ignore_case, interval, epoch, summary)
        }
    };
    let exitcode = match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            e_err!("{:#}", err);
            ExitCode::FAILURE
        }
    };
    defx!("exitcode {:?}", exitcode);

    exitcode
}
