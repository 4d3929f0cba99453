// src/ir/encoder.rs

//! Encode a log message into an [`EncodedMessage`].
//!
//! A message is scanned left to right for "tokens", maximal runs of
//! non-delimiter bytes. A token is a variable if it
//!
//! * contains a decimal digit, or
//! * directly follows a `'='` and contains an ASCII letter, or
//! * is two or more hexadecimal digits.
//!
//! All other bytes are static text copied to the logtype. Static text bytes
//! that collide with the placeholder range, or the escape byte `'\\'`, are
//! escaped.
//!
//! A variable is stored inline as an integer, else inline as a float,
//! else as a dictionary variable. Inline encodings are lossless; a number
//! that would not reproduce the exact same text, e.g. `"007"`, is a
//! dictionary variable.
//!
//! [`EncodedMessage`]: crate::data::encodedmessage::EncodedMessage

use crate::common::{Bytes, IrError, ResultIr};
use crate::data::encodedmessage::{
    needs_escape,
    EncodedMessage,
    EncodedVariable,
    VariablePlaceholder,
    PLACEHOLDER_ESCAPE,
};
#[cfg(any(debug_assertions, test))]
use crate::debug::printers::buffer_to_String_noraw;

#[allow(unused_imports)]
use ::more_asserts::{debug_assert_ge, debug_assert_le};
#[allow(unused_imports)]
use ::si_trace_print::{defn, defo, defx, defñ};

/// Is `c` a delimiter between tokens?
///
/// Non-delimiters are `+`, `-`, `.`, `/`, `0`-`9`, `A`-`Z`, `\`, `_`, and
/// `a`-`z`. Non-ASCII bytes are delimiters.
#[inline(always)]
pub const fn is_delim(c: u8) -> bool {
    !(c == b'+'
        || (b'-' <= c && c <= b'9')
        || c.is_ascii_alphabetic()
        || c == b'\\'
        || c == b'_')
}

/// Is `token` two or more hexadecimal digits?
pub fn could_be_multi_digit_hex_value(token: &[u8]) -> bool {
    token.len() >= 2 && token.iter().all(|c| c.is_ascii_hexdigit())
}

/// Find the bounds `[beg, end)` of the next variable token in `message`
/// at or after `pos`.
pub fn get_bounds_of_next_var(
    message: &[u8],
    mut pos: usize,
) -> Option<(usize, usize)> {
    let len = message.len();
    while pos < len {
        // skip delimiters
        while pos < len && is_delim(message[pos]) {
            pos += 1;
        }
        if pos >= len {
            return None;
        }
        let beg = pos;
        let mut contains_digit = false;
        let mut contains_alpha = false;
        while pos < len && !is_delim(message[pos]) {
            let c = message[pos];
            contains_digit |= c.is_ascii_digit();
            contains_alpha |= c.is_ascii_alphabetic();
            pos += 1;
        }
        let end = pos;
        if contains_digit
            || (beg > 0 && message[beg - 1] == b'=' && contains_alpha)
            || could_be_multi_digit_hex_value(&message[beg..end])
        {
            return Some((beg, end));
        }
    }

    None
}

/// Encode `token` as an inline integer.
///
/// The token must be an optional `'-'` then decimal digits, without
/// leading zeros, not `"-0"`, and within the range of `V`.
pub fn encode_integer<V: EncodedVariable>(token: &[u8]) -> Option<V> {
    let (negative, digits) = match token.first() {
        Some(b'-') => (true, &token[1..]),
        _ => (false, token),
    };
    if digits.is_empty() || !digits.iter().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if digits[0] == b'0' && (digits.len() > 1 || negative) {
        return None;
    }
    // ASCII digits are valid UTF-8
    let s = std::str::from_utf8(token).ok()?;
    let value: i64 = s.parse::<i64>().ok()?;

    V::from_i64(value)
}

/// Encode `token` as an inline float.
///
/// The token must be an optional `'-'`, then decimal digits with exactly one
/// `'.'` that is followed by at least one digit. The count of digits must
/// be at most `V::FLOAT_DIGITS_MAX` and their value must fit within
/// `V::FLOAT_DIGITS_BITS`.
///
/// Bit layout, most significant first:
///
/// ```text
/// [sign: 1][unused][digits: FLOAT_DIGITS_BITS][num_digits - 1: FLOAT_FIELD_BITS][digits_after_point - 1: FLOAT_FIELD_BITS]
/// ```
pub fn encode_float<V: EncodedVariable>(token: &[u8]) -> Option<V> {
    let (negative, body) = match token.first() {
        Some(b'-') => (true, &token[1..]),
        _ => (false, token),
    };
    if body.len() > V::FLOAT_DIGITS_MAX + 1 {
        return None;
    }
    let mut digits: u64 = 0;
    let mut num_digits: usize = 0;
    let mut point_at: Option<usize> = None;
    for (at, c) in body.iter().enumerate() {
        match c {
            b'0'..=b'9' => {
                digits = digits * 10 + (c - b'0') as u64;
                num_digits += 1;
            }
            b'.' if point_at.is_none() => {
                point_at = Some(at);
            }
            _ => {
                return None;
            }
        }
    }
    let after_point: usize = match point_at {
        Some(at) => body.len() - 1 - at,
        None => {
            return None;
        }
    };
    if after_point == 0 || num_digits == 0 || num_digits > V::FLOAT_DIGITS_MAX {
        return None;
    }
    if digits >= (1u64 << V::FLOAT_DIGITS_BITS) {
        return None;
    }
    debug_assert_le!(after_point, num_digits);

    let field_mask: u64 = (1u64 << V::FLOAT_FIELD_BITS) - 1;
    let mut bits: u64 = digits << (2 * V::FLOAT_FIELD_BITS);
    bits |= ((num_digits as u64 - 1) & field_mask) << V::FLOAT_FIELD_BITS;
    bits |= (after_point as u64 - 1) & field_mask;
    if negative {
        bits |= 1u64 << (V::BITS - 1);
    }

    Some(V::from_bits(bits))
}

/// Append `text` to `logtype`, escaping bytes that collide with
/// placeholders.
pub fn escape_and_append_to_logtype(text: &[u8], logtype: &mut Bytes) {
    for byte in text.iter() {
        if needs_escape(*byte) {
            logtype.push(PLACEHOLDER_ESCAPE);
        }
        logtype.push(*byte);
    }
}

/// Encode `message` into `encoded`, overwriting the prior contents of
/// `encoded`.
///
/// Accepts any bytes. An `Err` is an internal invariant violation, e.g.
/// dictionary variables longer in total than `i32::MAX`.
pub fn encode_message<V: EncodedVariable>(
    message: &[u8],
    encoded: &mut EncodedMessage<V>,
) -> ResultIr<()> {
    defn!("(message len {}, width {})", message.len(), V::WIDTH);
    encoded.clear();
    encoded.reserve(message.len());

    let mut last_end: usize = 0;
    while let Some((beg, end)) = get_bounds_of_next_var(message, last_end) {
        debug_assert_ge!(beg, last_end);
        escape_and_append_to_logtype(&message[last_end..beg], &mut encoded.logtype);
        let token = &message[beg..end];
        if let Some(var) = encode_integer::<V>(token) {
            encoded.logtype.push(VariablePlaceholder::Integer.as_byte());
            encoded.vars.push(var);
        } else if let Some(var) = encode_float::<V>(token) {
            encoded.logtype.push(VariablePlaceholder::Float.as_byte());
            encoded.vars.push(var);
        } else {
            encoded.logtype.push(VariablePlaceholder::Dictionary.as_byte());
            encoded.dict_vars.extend_from_slice(token);
            let offset = match i32::try_from(encoded.dict_vars.len()) {
                Ok(val) => val,
                Err(_) => {
                    let err = IrError::EncodeError(
                        format!("dictionary variables length {} exceeds i32", encoded.dict_vars.len())
                    );
                    defx!("return {}", err);
                    return Err(err);
                }
            };
            encoded.dict_var_end_offsets.push(offset);
        }
        last_end = end;
    }
    escape_and_append_to_logtype(&message[last_end..], &mut encoded.logtype);

    defx!(
        "logtype {:?}, vars {}, dict vars {}",
        buffer_to_String_noraw(&encoded.logtype),
        encoded.vars.len(),
        encoded.dict_var_end_offsets.len()
    );

    Ok(())
}

/// Encode `message` into a new [`EncodedMessage`].
pub fn encode<V: EncodedVariable>(message: &[u8]) -> ResultIr<EncodedMessage<V>> {
    let mut encoded = EncodedMessage::<V>::new();
    encode_message(message, &mut encoded)?;

    Ok(encoded)
}

/// An `Encoder` encodes log messages, reusing one [`EncodedMessage`].
///
/// The returned `&EncodedMessage` is valid until the next call to
/// [`encode_message`].
///
/// [`encode_message`]: Encoder::encode_message
#[derive(Debug, Default)]
pub struct Encoder<V: EncodedVariable> {
    encoded: EncodedMessage<V>,
}

impl<V: EncodedVariable> Encoder<V> {
    pub fn new() -> Encoder<V> {
        Encoder {
            encoded: EncodedMessage::new(),
        }
    }

    /// Encode `message`, returning a view of the reused [`EncodedMessage`].
    pub fn encode_message(&mut self, message: &[u8]) -> ResultIr<&EncodedMessage<V>> {
        encode_message(message, &mut self.encoded)?;

        Ok(&self.encoded)
    }
}
