// src/readers/mod.rs

//! "Readers" for _lislib_.
//!
//! A [`StreamReader`] drives a [`Deserializer`] over bytes read from a byte
//! source, e.g. a [`File`] or a [`GzDecoder`].
//!
//! _These are not rust "Readers"; these structs do not implement the trait
//! [`Read`]. These are "readers" in an informal sense._
//!
//! [`Read`]: std::io::Read
//! [`File`]: std::fs::File
//! [`GzDecoder`]: https://docs.rs/flate2/latest/flate2/read/struct.GzDecoder.html
//! [`Deserializer`]: crate::ir::deserializer::Deserializer
//! [`StreamReader`]: crate::readers::streamreader::StreamReader

pub mod streamreader;
