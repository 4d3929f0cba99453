// src/writers/mod.rs

//! "Writers" for _lislib_.
//!
//! A [`StreamWriter`] drives a [`Serializer`] and writes the IR bytes to a
//! byte sink, e.g. a [`File`] or a [`GzEncoder`].
//!
//! [`File`]: std::fs::File
//! [`GzEncoder`]: https://docs.rs/flate2/latest/flate2/write/struct.GzEncoder.html
//! [`Serializer`]: crate::ir::serializer::Serializer
//! [`StreamWriter`]: crate::writers::streamwriter::StreamWriter

pub mod streamwriter;
