// src/common.rs
//
// common imports, type aliases, and other globals (avoids circular imports)

//! Common type aliases, the [`IrError`] taxonomy, and the extended result
//! enum [`ResultS3`] used by the _Readers_.
//!
//! [`IrError`]: crate::common::IrError
//! [`ResultS3`]: crate::common::ResultS3

use ::thiserror::Error;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// general type aliases
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Milliseconds since the Unix epoch. Signed; may precede the epoch.
pub type EpochTimeMs = i64;

/// Sequence of Bytes
pub type Bytes = Vec<u8>;

/// A general-purpose counting type
pub type Count = u64;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IR errors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Errors of encoding, decoding, serializing, and deserializing IR.
///
/// Only [`IncompleteIR`] is retryable; it means "valid so far, need more
/// bytes". [`Eoir`] is the expected end of a well-formed stream. All other
/// variants are terminal for the stream.
///
/// [`IncompleteIR`]: IrError::IncompleteIR
/// [`Eoir`]: IrError::Eoir
#[derive(Debug, Error)]
pub enum IrError {
    /// An encoded message could not be reconstructed.
    #[error("decode error: {0}")]
    DecodeError(String),
    /// A message could not be encoded. Internal invariant violation.
    #[error("encode error: {0}")]
    EncodeError(String),
    /// The end-of-stream tag was read.
    #[error("end of IR stream")]
    Eoir,
    /// Malformed framing or tag; the stream cannot be recovered.
    #[error("corrupted IR: {0}")]
    CorruptedIR(String),
    /// The preamble metadata block failed to parse.
    #[error("corrupted metadata: {0}")]
    CorruptedMetadata(String),
    /// The buffer holds a valid but incomplete record.
    #[error("incomplete IR")]
    IncompleteIR,
    /// The preamble metadata kind is not understood.
    #[error("unsupported metadata kind {0:#04x}")]
    UnsupportedVersion(u8),
    /// Records were skipped and none matched the wildcard queries.
    #[error("no matching log event")]
    NoMatch,
    /// A wildcard query could not be compiled.
    #[error("invalid wildcard query: {0}")]
    InvalidQuery(String),
    /// The serializer, deserializer, or reader was closed.
    #[error("used after close")]
    Closed,
    /// The byte source or byte sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IrError {
    /// Returns `true` if more input bytes may resolve the error.
    #[inline(always)]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, IrError::IncompleteIR)
    }

    /// Returns `true` if this is the expected end of a stream.
    #[inline(always)]
    pub const fn is_eoir(&self) -> bool {
        matches!(self, IrError::Eoir)
    }
}

/// `Result` of IR functions.
pub type ResultIr<T> = std::result::Result<T, IrError>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// custom Results enums for *Reader functions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// `Result` Extended
/// for stream reading functions
#[derive(Debug, PartialEq)]
pub enum ResultS3<T, E> {
    /// Contains the success data
    Found(T),
    /// The stream ended with an end-of-stream tag; nothing to return, but no bad errors happened
    Done,
    /// Contains the error value, something bad happened
    Err(E),
}

impl<T, E> ResultS3<T, E> {
    // Querying the contained values

    /// Returns `true` if the result is [`Found`, 'Done`].
    #[must_use = "if you intended to assert that this is ok, consider `.unwrap()` instead"]
    #[inline(always)]
    pub const fn is_ok(&self) -> bool {
        matches!(*self, ResultS3::Found(_) | ResultS3::Done)
    }

    /// Returns `true` if the result is [`Found`].
    #[inline(always)]
    pub const fn is_found(&self) -> bool {
        matches!(*self, ResultS3::Found(_))
    }

    /// Returns `true` if the result is [`Err`].
    #[must_use = "if you intended to assert that this is err, consider `.unwrap_err()` instead"]
    #[inline(always)]
    pub const fn is_err(&self) -> bool {
        !self.is_ok()
    }

    /// Returns `true` if the result is [`Done`].
    #[inline(always)]
    pub const fn is_done(&self) -> bool {
        matches!(*self, ResultS3::Done)
    }

    // Adapter for each variant

    /// Converts from `ResultS3<T, E>` to [`Option<T>`].
    ///
    /// Converts `self` into an [`Option<T>`], consuming `self`,
    /// and discarding the error, if any.
    ///
    /// ```
    /// use lislib::common::ResultS3;
    ///
    /// let x: ResultS3<u32, &str> = ResultS3::Found(2);
    /// assert_eq!(x.ok(), Some(2));
    ///
    /// let x: ResultS3<u32, &str> = ResultS3::Err("Nothing here");
    /// assert_eq!(x.ok(), None);
    /// ```
    #[inline(always)]
    pub fn ok(self) -> Option<T> {
        match self {
            ResultS3::Found(x) => Some(x),
            ResultS3::Done => None,
            ResultS3::Err(_) => None,
        }
    }

    /// Converts from `ResultS3<T, E>` to [`Option<E>`].
    ///
    /// Converts `self` into an [`Option<E>`], consuming `self`,
    /// and discarding the success value, if any.
    #[inline(always)]
    pub fn err(self) -> Option<E> {
        match self {
            ResultS3::Found(_) => None,
            ResultS3::Done => None,
            ResultS3::Err(x) => Some(x),
        }
    }

    /// Maps a `ResultS3<T, E>` to `ResultS3<U, E>` by applying a function
    /// to a contained [`Found`] value.
    #[inline(always)]
    pub fn map<U, F: FnOnce(T) -> U>(self, op: F) -> ResultS3<U, E> {
        match self {
            ResultS3::Found(x) => ResultS3::Found(op(x)),
            ResultS3::Done => ResultS3::Done,
            ResultS3::Err(e) => ResultS3::Err(e),
        }
    }
}

impl<T, E> std::fmt::Display for ResultS3<T, E>
where
    E: std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultS3::Found(_) => { write!(f, "ResultS3::Found") },
            ResultS3::Done => { write!(f, "ResultS3::Done") },
            ResultS3::Err(err) => { write!(f, "ResultS3::Err({})", err) },
        }
    }
}
