// src/ir/mod.rs

//! The `ir` module is the codec of the log IR stream.
//!
//! ## Overview
//!
//! * [`encoder`] separates a log message into a logtype and variables.
//! * [`decoder`] reconstructs the log message.
//! * [`protocol`] is the wire format.
//! * [`serializer`] frames encoded log events into IR bytes.
//! * [`deserializer`] parses IR bytes back into log events.
//!
//! ```text
//! message ─→ Encoder ─→ EncodedMessage ─→ Serializer ─→ IR bytes
//! IR bytes ─→ Deserializer ─→ EncodedMessage ─→ Decoder ─→ message
//! ```
//!
//! [`encoder`]: crate::ir::encoder
//! [`decoder`]: crate::ir::decoder
//! [`protocol`]: crate::ir::protocol
//! [`serializer`]: crate::ir::serializer
//! [`deserializer`]: crate::ir::deserializer

pub mod decoder;
pub mod deserializer;
pub mod encoder;
pub mod protocol;
pub mod serializer;
