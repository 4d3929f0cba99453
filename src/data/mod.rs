// src/data/mod.rs

//! The `data` module is data containers for [`LogEvent`]s and
//! [`EncodedMessage`]s.
//!
//! ## Definitions of data
//!
//! ### Log event
//!
//! A "log event" is a message and a timestamp, milliseconds since the Unix
//! epoch. It is represented by a [`LogEvent`], or borrowed as a
//! [`LogEventView`].
//!
//! ### Logtype
//!
//! A "logtype" is the static text of a message with each "variable"
//! replaced by a one-byte placeholder.
//!
//! ### Variable
//!
//! A "variable" is a token of a message that is likely to change between
//! messages, e.g. a number or an identifier. Integers and floats that fit
//! the [encoding width] are stored inline as numbers. All other variables
//! are "dictionary variables", stored as bytes.
//!
//! A logtype and its variables are represented by an [`EncodedMessage`].
//!
//! ### IR stream
//!
//! An "IR stream" is a preamble followed by zero or more serialized log
//! events, optionally ended by an end-of-stream tag.
//! See [`ir::protocol`].
//!
//! [`LogEvent`]: crate::data::logevent::LogEvent
//! [`LogEventView`]: crate::data::logevent::LogEventView
//! [`EncodedMessage`]: crate::data::encodedmessage::EncodedMessage
//! [encoding width]: crate::data::encodedmessage::EncodingWidth
//! [`ir::protocol`]: crate::ir::protocol

pub mod encodedmessage;
pub mod logevent;
