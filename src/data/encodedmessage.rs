// src/data/encodedmessage.rs

//! Implements [`EncodedMessage`], the "logtype" and variable tokens of one
//! log message, and [`EncodedVariable`], the two encoding widths of inline
//! numeric variables.
//!
//! [`EncodedMessage`]: crate::data::encodedmessage::EncodedMessage
//! [`EncodedVariable`]: crate::data::encodedmessage::EncodedVariable

use std::fmt;

use crate::common::Bytes;
#[cfg(any(debug_assertions, test))]
use crate::debug::printers::buffer_to_String_noraw;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// placeholders
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Escape byte within a logtype. The byte following it is literal.
pub const PLACEHOLDER_ESCAPE: u8 = b'\\';

/// First byte of the range reserved for placeholders (inclusive).
pub const PLACEHOLDER_RESERVED_BEG: u8 = 0x10;

/// Last byte of the range reserved for placeholders (inclusive).
pub const PLACEHOLDER_RESERVED_END: u8 = 0x1F;

/// Is `byte` within the range reserved for placeholders?
/// Such bytes must be escaped when they occur in static text.
#[inline(always)]
pub const fn is_placeholder_reserved(byte: u8) -> bool {
    PLACEHOLDER_RESERVED_BEG <= byte && byte <= PLACEHOLDER_RESERVED_END
}

/// Does `byte` need a [`PLACEHOLDER_ESCAPE`] prefix when it is static text?
#[inline(always)]
pub const fn needs_escape(byte: u8) -> bool {
    byte == PLACEHOLDER_ESCAPE || is_placeholder_reserved(byte)
}

/// The kind of a variable placeholder within a logtype.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum VariablePlaceholder {
    /// An inline integer variable, consumes one of [`EncodedMessage::vars`].
    Integer = 0x11,
    /// A dictionary variable, consumes one slice of
    /// [`EncodedMessage::dict_vars`].
    Dictionary = 0x12,
    /// An inline float variable, consumes one of [`EncodedMessage::vars`].
    Float = 0x13,
}

impl VariablePlaceholder {
    /// The placeholder byte written to a logtype.
    #[inline(always)]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// The placeholder for `byte`, if `byte` is a known placeholder.
    #[inline(always)]
    pub const fn from_byte(byte: u8) -> Option<VariablePlaceholder> {
        match byte {
            0x11 => Some(VariablePlaceholder::Integer),
            0x12 => Some(VariablePlaceholder::Dictionary),
            0x13 => Some(VariablePlaceholder::Float),
            _ => None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// encoding widths
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Width of the inline numeric variables of an IR stream.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EncodingWidth {
    /// 4-byte variables, timestamps are deltas from the prior event.
    FourByte,
    /// 8-byte variables, timestamps are absolute.
    EightByte,
}

impl EncodingWidth {
    /// Size in bytes of one inline variable.
    pub const fn size(self) -> usize {
        match self {
            EncodingWidth::FourByte => 4,
            EncodingWidth::EightByte => 8,
        }
    }

    /// The preamble `encoding_width` byte.
    pub const fn as_u8(self) -> u8 {
        self.size() as u8
    }

    /// The `EncodingWidth` for a preamble `encoding_width` byte.
    pub const fn from_u8(byte: u8) -> Option<EncodingWidth> {
        match byte {
            4 => Some(EncodingWidth::FourByte),
            8 => Some(EncodingWidth::EightByte),
            _ => None,
        }
    }
}

impl fmt::Display for EncodingWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingWidth::FourByte => write!(f, "four-byte"),
            EncodingWidth::EightByte => write!(f, "eight-byte"),
        }
    }
}

/// An inline numeric variable of one [`EncodingWidth`].
///
/// Implemented for [`FourByteEncoding`] and [`EightByteEncoding`]. The
/// encoding and decoding algorithms are written once, generic over this
/// trait.
pub trait EncodedVariable: Copy + fmt::Debug + Default + Eq + Send + Sync + 'static {
    /// The width of this variable type.
    const WIDTH: EncodingWidth;
    /// Total bits of this variable type.
    const BITS: u32;
    /// Maximum count of decimal digits of an inline float.
    const FLOAT_DIGITS_MAX: usize;
    /// Bits holding the decimal digits of an inline float.
    const FLOAT_DIGITS_BITS: u32;
    /// Bits of each of the two inline float count fields.
    const FLOAT_FIELD_BITS: u32;

    /// Narrow an `i64` into this type, if it fits.
    fn from_i64(value: i64) -> Option<Self>;
    /// Widen into an `i64`.
    fn to_i64(self) -> i64;
    /// Reinterpret the low [`BITS`] of `bits`.
    ///
    /// [`BITS`]: EncodedVariable::BITS
    fn from_bits(bits: u64) -> Self;
    /// Reinterpret as unsigned bits, zero-extended.
    fn to_bits(self) -> u64;
    /// Append big-endian bytes to `out`.
    fn put_be(self, out: &mut Bytes);
    /// Read from big-endian `bytes` of exactly [`EncodingWidth::size`] bytes.
    fn get_be(bytes: &[u8]) -> Self;
}

/// Inline variable type of [`EncodingWidth::EightByte`].
pub type EightByteEncoding = i64;

/// Inline variable type of [`EncodingWidth::FourByte`].
pub type FourByteEncoding = i32;

impl EncodedVariable for EightByteEncoding {
    const WIDTH: EncodingWidth = EncodingWidth::EightByte;
    const BITS: u32 = 64;
    const FLOAT_DIGITS_MAX: usize = 16;
    const FLOAT_DIGITS_BITS: u32 = 54;
    const FLOAT_FIELD_BITS: u32 = 4;

    #[inline(always)]
    fn from_i64(value: i64) -> Option<Self> {
        Some(value)
    }

    #[inline(always)]
    fn to_i64(self) -> i64 {
        self
    }

    #[inline(always)]
    fn from_bits(bits: u64) -> Self {
        bits as i64
    }

    #[inline(always)]
    fn to_bits(self) -> u64 {
        self as u64
    }

    #[inline(always)]
    fn put_be(self, out: &mut Bytes) {
        out.extend_from_slice(&self.to_be_bytes());
    }

    #[inline(always)]
    fn get_be(bytes: &[u8]) -> Self {
        let mut a: [u8; 8] = [0; 8];
        a.copy_from_slice(&bytes[..8]);
        i64::from_be_bytes(a)
    }
}

impl EncodedVariable for FourByteEncoding {
    const WIDTH: EncodingWidth = EncodingWidth::FourByte;
    const BITS: u32 = 32;
    const FLOAT_DIGITS_MAX: usize = 8;
    const FLOAT_DIGITS_BITS: u32 = 25;
    const FLOAT_FIELD_BITS: u32 = 3;

    #[inline(always)]
    fn from_i64(value: i64) -> Option<Self> {
        i32::try_from(value).ok()
    }

    #[inline(always)]
    fn to_i64(self) -> i64 {
        self as i64
    }

    #[inline(always)]
    fn from_bits(bits: u64) -> Self {
        bits as u32 as i32
    }

    #[inline(always)]
    fn to_bits(self) -> u64 {
        self as u32 as u64
    }

    #[inline(always)]
    fn put_be(self, out: &mut Bytes) {
        out.extend_from_slice(&self.to_be_bytes());
    }

    #[inline(always)]
    fn get_be(bytes: &[u8]) -> Self {
        let mut a: [u8; 4] = [0; 4];
        a.copy_from_slice(&bytes[..4]);
        i32::from_be_bytes(a)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// EncodedMessage
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A log message separated into a static "logtype" and its variables.
///
/// The `logtype` is the original message with each variable replaced by a
/// [`VariablePlaceholder`] byte, left to right. Inline integer and float
/// variables are in `vars`, in order. Dictionary variables are
/// concatenated in `dict_vars`; `dict_var_end_offsets` holds the end
/// offset of each. Order is the only correlation between placeholders and
/// variables.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct EncodedMessage<V: EncodedVariable> {
    pub logtype: Bytes,
    pub vars: Vec<V>,
    pub dict_vars: Bytes,
    pub dict_var_end_offsets: Vec<i32>,
}

impl<V: EncodedVariable> EncodedMessage<V> {
    pub fn new() -> EncodedMessage<V> {
        EncodedMessage {
            logtype: Bytes::new(),
            vars: Vec::new(),
            dict_vars: Bytes::new(),
            dict_var_end_offsets: Vec::new(),
        }
    }

    /// Clear all fields, keeping allocations.
    pub fn clear(&mut self) {
        self.logtype.clear();
        self.vars.clear();
        self.dict_vars.clear();
        self.dict_var_end_offsets.clear();
    }

    /// Reserve for a message of `cap` bytes. The logtype of a message is
    /// usually not longer than the message.
    pub fn reserve(&mut self, cap: usize) {
        self.logtype.reserve(cap);
    }

    /// The encoding width of `V`.
    pub const fn encoding_width(&self) -> EncodingWidth {
        V::WIDTH
    }

    /// Count the unescaped placeholders in the logtype,
    /// returns `(inline count, dictionary count)`.
    pub fn count_placeholders(&self) -> (usize, usize) {
        let mut inline: usize = 0;
        let mut dict: usize = 0;
        let mut escaped = false;
        for byte in self.logtype.iter() {
            if escaped {
                escaped = false;
                continue;
            }
            if *byte == PLACEHOLDER_ESCAPE {
                escaped = true;
                continue;
            }
            match VariablePlaceholder::from_byte(*byte) {
                Some(VariablePlaceholder::Dictionary) => dict += 1,
                Some(_) => inline += 1,
                None => {}
            }
        }

        (inline, dict)
    }

    /// The dictionary variable at `index`, if the offsets are valid.
    pub fn dict_var(&self, index: usize) -> Option<&[u8]> {
        let end = *self.dict_var_end_offsets.get(index)?;
        let beg: i32 = match index {
            0 => 0,
            _ => self.dict_var_end_offsets[index - 1],
        };
        if beg < 0 || end < beg {
            return None;
        }
        self.dict_vars.get(beg as usize..end as usize)
    }
}

impl<V: EncodedVariable> fmt::Debug for EncodedMessage<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut d = f.debug_struct("EncodedMessage");
        d.field("width", &V::WIDTH);
        #[cfg(any(debug_assertions, test))]
        d.field("logtype", &buffer_to_String_noraw(&self.logtype));
        #[cfg(not(any(debug_assertions, test)))]
        d.field("logtype", &self.logtype);
        d.field("vars", &self.vars)
            .field("dict_vars", &String::from_utf8_lossy(&self.dict_vars))
            .field("dict_var_end_offsets", &self.dict_var_end_offsets)
            .finish()
    }
}
