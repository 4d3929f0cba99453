// src/lib.rs

//! _lislib_ is the library of the _lis_ program, a compact binary
//! "Intermediate Representation" (IR) for streams of log events.
//!
//! Each log message is separated into a static "logtype" and its variables.
//! Numeric variables are stored inline; all other variables are stored as
//! dictionary bytes. Events are framed into a stream with a preamble and an
//! optional end-of-stream tag.
//!
//! * [`ir`] encodes, decodes, serializes, and deserializes.
//! * [`readers`] reads log events from a byte source.
//! * [`writers`] writes log events to a byte sink.
//! * [`search`] filters log events by wildcard query and timestamp.
//!
//! [`ir`]: crate::ir
//! [`readers`]: crate::readers
//! [`writers`]: crate::writers
//! [`search`]: crate::search

pub mod common;
pub mod data;
pub mod debug;
pub mod ir;
pub mod readers;
pub mod search;
#[cfg(test)]
pub mod tests;
pub mod writers;
