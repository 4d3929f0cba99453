// src/ir/decoder.rs

//! Decode an [`EncodedMessage`] back into the exact original log message.
//!
//! [`EncodedMessage`]: crate::data::encodedmessage::EncodedMessage

use crate::common::{Bytes, IrError, ResultIr};
use crate::data::encodedmessage::{
    is_placeholder_reserved,
    EncodedMessage,
    EncodedVariable,
    VariablePlaceholder,
    PLACEHOLDER_ESCAPE,
};

use ::numtoa::NumToA; // adds `numtoa` method to numbers
#[allow(unused_imports)]
use ::si_trace_print::{defn, defo, defx, defñ};

/// size of the `[u8]` buffer used for `numtoa` conversions,
/// good up to `u64::MAX`
pub const NUMTOA_BUF_SZ: usize = 22;

/// Append the decimal text of integer `var` to `out`.
pub fn decode_integer<V: EncodedVariable>(var: V, out: &mut Bytes) {
    let value: i64 = var.to_i64();
    let mut buffer_num = [0u8; NUMTOA_BUF_SZ];
    if value < 0 {
        out.push(b'-');
    }
    // `unsigned_abs` so `i64::MIN` does not overflow
    let num = value.unsigned_abs().numtoa(10, &mut buffer_num);
    out.extend_from_slice(num);
}

/// Append the decimal text of float `var` to `out`.
///
/// Returns `Err(DecodeError)` if the bit fields of `var` are inconsistent.
pub fn decode_float<V: EncodedVariable>(var: V, out: &mut Bytes) -> ResultIr<()> {
    let bits: u64 = var.to_bits();
    let field_mask: u64 = (1u64 << V::FLOAT_FIELD_BITS) - 1;
    let digits_mask: u64 = (1u64 << V::FLOAT_DIGITS_BITS) - 1;
    let negative: bool = (bits >> (V::BITS - 1)) & 1 == 1;
    let after_point: usize = (bits & field_mask) as usize + 1;
    let num_digits: usize = ((bits >> V::FLOAT_FIELD_BITS) & field_mask) as usize + 1;
    let digits: u64 = (bits >> (2 * V::FLOAT_FIELD_BITS)) & digits_mask;

    let mut buffer_num = [0u8; NUMTOA_BUF_SZ];
    let num = digits.numtoa(10, &mut buffer_num);
    if num.len() > num_digits || after_point > num_digits {
        return Err(IrError::DecodeError(format!(
            "malformed float variable 0x{:X}; {} digits, {} after point, value {}",
            bits,
            num_digits,
            after_point,
            digits
        )));
    }
    if negative {
        out.push(b'-');
    }
    let point_at: usize = num_digits - after_point;
    let pad: usize = num_digits - num.len();
    for at in 0..num_digits {
        if at == point_at {
            out.push(b'.');
        }
        match at < pad {
            true => out.push(b'0'),
            false => out.push(num[at - pad]),
        }
    }

    Ok(())
}

/// Decode `encoded` and append the log message to `out`.
///
/// Returns `Err(DecodeError)` if the placeholders and variables of `encoded`
/// do not agree, e.g. a placeholder without a variable, a variable without
/// a placeholder, an invalid dictionary offset, an unknown reserved byte, or
/// an escape byte at the end of the logtype.
/// Upon `Err`, `out` holds a partial message.
pub fn decode_message<V: EncodedVariable>(
    encoded: &EncodedMessage<V>,
    out: &mut Bytes,
) -> ResultIr<()> {
    defn!("({:?})", encoded);
    out.reserve(encoded.logtype.len() + encoded.dict_vars.len());

    let mut var_index: usize = 0;
    let mut dict_index: usize = 0;
    let mut escaped: bool = false;
    for byte in encoded.logtype.iter() {
        let byte: u8 = *byte;
        if escaped {
            out.push(byte);
            escaped = false;
            continue;
        }
        if byte == PLACEHOLDER_ESCAPE {
            escaped = true;
            continue;
        }
        if !is_placeholder_reserved(byte) {
            out.push(byte);
            continue;
        }
        match VariablePlaceholder::from_byte(byte) {
            Some(VariablePlaceholder::Integer) => {
                let var: V = match encoded.vars.get(var_index) {
                    Some(var) => *var,
                    None => {
                        defx!("return Err; out of variables");
                        return Err(IrError::DecodeError(format!(
                            "integer placeholder without variable; {} variables", encoded.vars.len()
                        )));
                    }
                };
                var_index += 1;
                decode_integer(var, out);
            }
            Some(VariablePlaceholder::Float) => {
                let var: V = match encoded.vars.get(var_index) {
                    Some(var) => *var,
                    None => {
                        defx!("return Err; out of variables");
                        return Err(IrError::DecodeError(format!(
                            "float placeholder without variable; {} variables", encoded.vars.len()
                        )));
                    }
                };
                var_index += 1;
                decode_float(var, out)?;
            }
            Some(VariablePlaceholder::Dictionary) => {
                let dict_var: &[u8] = match encoded.dict_var(dict_index) {
                    Some(dict_var) => dict_var,
                    None => {
                        defx!("return Err; bad dictionary variable {}", dict_index);
                        return Err(IrError::DecodeError(format!(
                            "dictionary placeholder {} has no valid variable; offsets {:?}, dictionary length {}",
                            dict_index,
                            encoded.dict_var_end_offsets,
                            encoded.dict_vars.len(),
                        )));
                    }
                };
                dict_index += 1;
                out.extend_from_slice(dict_var);
            }
            None => {
                defx!("return Err; unknown placeholder 0x{:02X}", byte);
                return Err(IrError::DecodeError(format!("unknown placeholder byte 0x{:02X}", byte)));
            }
        }
    }
    if escaped {
        defx!("return Err; dangling escape");
        return Err(IrError::DecodeError(String::from("logtype ends with an escape byte")));
    }
    if var_index != encoded.vars.len() || dict_index != encoded.dict_var_end_offsets.len() {
        defx!("return Err; unused variables");
        return Err(IrError::DecodeError(format!(
            "unused variables; used {} of {} inline, {} of {} dictionary",
            var_index,
            encoded.vars.len(),
            dict_index,
            encoded.dict_var_end_offsets.len(),
        )));
    }
    defx!("decoded {} bytes", out.len());

    Ok(())
}

/// Decode `encoded` into a new log message.
pub fn decode<V: EncodedVariable>(encoded: &EncodedMessage<V>) -> ResultIr<Bytes> {
    let mut out = Bytes::new();
    decode_message(encoded, &mut out)?;

    Ok(out)
}

/// A `Decoder` decodes [`EncodedMessage`]s, reusing one output buffer.
///
/// The returned `&[u8]` is valid until the next call to
/// [`decode_message`].
///
/// [`decode_message`]: Decoder::decode_message
#[derive(Debug, Default)]
pub struct Decoder {
    buffer: Bytes,
}

impl Decoder {
    pub fn new() -> Decoder {
        Decoder {
            buffer: Bytes::new(),
        }
    }

    /// Decode `encoded`, returning a view of the reused output buffer.
    pub fn decode_message<V: EncodedVariable>(
        &mut self,
        encoded: &EncodedMessage<V>,
    ) -> ResultIr<&[u8]> {
        self.buffer.clear();
        decode_message(encoded, &mut self.buffer)?;

        Ok(self.buffer.as_slice())
    }
}
