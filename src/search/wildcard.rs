// src/search/wildcard.rs

//! Wildcard queries and timestamp intervals for filtering log events.
//!
//! A wildcard query is matched against the whole decoded message text.
//!
//! | query | matches |
//! |-------|---------|
//! | `*`   | any run of characters, including none |
//! | `?`   | exactly one character |
//! | `\x`  | the literal character `x` |
//!
//! Runs of `*` are the same as one `*`. A lone `\` at the end of a query
//! is ignored. Every other character matches only itself, or for a query
//! that is not case sensitive, itself ignoring ASCII case.
//!
//! Matching is done by [`glob::Pattern`]. A query is translated into a
//! `Pattern` with every literal character escaped by [`Pattern::escape`],
//! and matched without path separator rules.
//!
//! [`Pattern::escape`]: glob::Pattern::escape

use std::fmt;

use crate::common::{EpochTimeMs, IrError, ResultIr};

use ::bstr::ByteSlice;
use ::glob::{MatchOptions, Pattern};
#[allow(unused_imports)]
use ::si_trace_print::{defn, defo, defx, defñ};

/// Escape character of a wildcard query.
pub const QUERY_ESCAPE: char = '\\';
/// Wildcard of any run of characters.
pub const QUERY_WILDCARD_ANY: char = '*';
/// Wildcard of exactly one character.
pub const QUERY_WILDCARD_ONE: char = '?';

/// A wildcard query and its case sensitivity.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct WildcardQuery {
    pub query: String,
    pub case_sensitive: bool,
}

impl WildcardQuery {
    pub fn new(query: &str, case_sensitive: bool) -> WildcardQuery {
        WildcardQuery {
            query: String::from(query),
            case_sensitive,
        }
    }
}

/// An inclusive interval of timestamps, `lower <= upper`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct TimestampInterval {
    pub lower: EpochTimeMs,
    pub upper: EpochTimeMs,
}

impl TimestampInterval {
    /// The interval of every timestamp.
    pub const ALL: TimestampInterval = TimestampInterval {
        lower: EpochTimeMs::MIN,
        upper: EpochTimeMs::MAX,
    };

    pub const fn new(lower: EpochTimeMs, upper: EpochTimeMs) -> TimestampInterval {
        TimestampInterval { lower, upper }
    }

    /// Is `timestamp` within this interval?
    #[inline(always)]
    pub const fn contains(&self, timestamp: EpochTimeMs) -> bool {
        self.lower <= timestamp && timestamp <= self.upper
    }
}

impl Default for TimestampInterval {
    fn default() -> Self {
        TimestampInterval::ALL
    }
}

impl fmt::Display for TimestampInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

/// Normalize a wildcard query; collapse runs of `*` and remove a lone `\`
/// at the end.
pub fn clean_up_wildcard_search_string(query: &str) -> String {
    let mut cleaned = String::with_capacity(query.len());
    let mut chars = query.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            QUERY_ESCAPE => {
                if let Some(next) = chars.next() {
                    cleaned.push(QUERY_ESCAPE);
                    cleaned.push(next);
                }
            }
            QUERY_WILDCARD_ANY => {
                cleaned.push(QUERY_WILDCARD_ANY);
                while chars.peek() == Some(&QUERY_WILDCARD_ANY) {
                    chars.next();
                }
            }
            _ => cleaned.push(c),
        }
    }

    cleaned
}

/// Translate a wildcard query into [`glob::Pattern`] syntax.
fn query_to_glob(query: &str) -> String {
    let cleaned = clean_up_wildcard_search_string(query);
    let mut glob = String::with_capacity(cleaned.len() + 8);
    let mut buf = [0u8; 4];
    let mut chars = cleaned.chars();
    while let Some(c) = chars.next() {
        match c {
            QUERY_WILDCARD_ANY | QUERY_WILDCARD_ONE => glob.push(c),
            QUERY_ESCAPE => {
                // cleaned queries never end with a lone escape
                if let Some(next) = chars.next() {
                    glob.push_str(&Pattern::escape(next.encode_utf8(&mut buf)));
                }
            }
            _ => glob.push_str(&Pattern::escape(c.encode_utf8(&mut buf))),
        }
    }

    glob
}

const fn match_options(case_sensitive: bool) -> MatchOptions {
    MatchOptions {
        case_sensitive,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    }
}

/// Compile one [`WildcardQuery`].
fn compile(query: &WildcardQuery) -> ResultIr<(Pattern, MatchOptions)> {
    let glob = query_to_glob(&query.query);
    match Pattern::new(&glob) {
        Ok(pattern) => Ok((pattern, match_options(query.case_sensitive))),
        Err(err) => Err(IrError::InvalidQuery(format!("{:?}: {}", query.query, err))),
    }
}

/// Does all of `message` match `query`?
///
/// `message` need not be UTF-8; invalid sequences match as `U+FFFD`.
pub fn wildcard_match(message: &[u8], query: &WildcardQuery) -> ResultIr<bool> {
    let (pattern, options) = compile(query)?;

    Ok(pattern.matches_with(&message.to_str_lossy(), options))
}

/// A compiled list of [`WildcardQuery`].
///
/// An empty list matches nothing.
#[derive(Clone, Debug, Default)]
pub struct WildcardMatcher {
    patterns: Vec<(Pattern, MatchOptions)>,
}

impl WildcardMatcher {
    /// Compile `queries`.
    /// Returns `Err(InvalidQuery)` for the first query that fails.
    pub fn new(queries: &[WildcardQuery]) -> ResultIr<WildcardMatcher> {
        defn!("({} queries)", queries.len());
        let mut patterns = Vec::with_capacity(queries.len());
        for query in queries.iter() {
            let compiled = compile(query)?;
            defo!("query {:?} as {:?}", query.query, compiled.0.as_str());
            patterns.push(compiled);
        }
        defx!();

        Ok(WildcardMatcher { patterns })
    }

    /// The index of the first query that matches `message`.
    pub fn find_match(&self, message: &[u8]) -> Option<usize> {
        if self.patterns.is_empty() {
            return None;
        }
        let text = message.to_str_lossy();
        self.patterns
            .iter()
            .position(|(pattern, options)| pattern.matches_with(&text, *options))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
