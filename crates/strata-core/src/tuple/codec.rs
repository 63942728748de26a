use crate::{
    error::Error,
    tuple::{Tuple, Value},
};

///
/// Order-preserving tuple codec.
///
/// Each element is a tag byte followed by a variant payload chosen so that
/// unsigned byte comparison of packed keys equals canonical value order:
///
/// - `Int`: big-endian with the sign bit flipped.
/// - `Double`: IEEE bits; positive values flip the sign bit, negative
///   values flip every bit (so `-0.0 < 0.0` and NaN payloads stay total).
/// - `Text`/`Bytes`: content with `0x00` escaped as `0x00 0xFF`,
///   terminated by `0x00 0x00`; prefix order is preserved.
///
/// Tags start above the subspace range sentinels (`0x00`/`0xFF`), so no
/// packed key collides with a subspace boundary.
///

pub(crate) const TAG_NULL: u8 = 0x02;
pub(crate) const TAG_BOOL: u8 = 0x03;
pub(crate) const TAG_INT: u8 = 0x04;
pub(crate) const TAG_DOUBLE: u8 = 0x05;
pub(crate) const TAG_TEXT: u8 = 0x06;
pub(crate) const TAG_BYTES: u8 = 0x07;

const ESCAPE: u8 = 0x00;
const ESCAPED_NUL: u8 = 0xFF;
const TERMINATOR: [u8; 2] = [0x00, 0x00];

/// Pack a tuple into its canonical byte form.
#[must_use]
pub fn pack(tuple: &Tuple) -> Vec<u8> {
    let mut out = Vec::new();
    for element in tuple.elements() {
        push_element(&mut out, element);
    }
    out
}

/// Append one element to an existing key buffer.
pub fn push_element(out: &mut Vec<u8>, element: &Value) {
    match element {
        Value::Null => out.push(TAG_NULL),
        Value::Bool(v) => {
            out.push(TAG_BOOL);
            out.push(u8::from(*v));
        }
        Value::Int(v) => {
            out.push(TAG_INT);
            out.extend_from_slice(&ordered_i64_bytes(*v));
        }
        Value::Double(v) => {
            out.push(TAG_DOUBLE);
            out.extend_from_slice(&ordered_f64_bytes(*v));
        }
        Value::Text(v) => {
            out.push(TAG_TEXT);
            push_terminated_bytes(out, v.as_bytes());
        }
        Value::Bytes(v) => {
            out.push(TAG_BYTES);
            push_terminated_bytes(out, v);
        }
    }
}

/// Append the unterminated payload of a text element. Used to build prefix
/// scan boundaries: every string starting with `prefix` packs into
/// `[bytes, bytes || 0xFF)`.
pub fn push_text_prefix(out: &mut Vec<u8>, prefix: &str) {
    out.push(TAG_TEXT);
    push_escaped_bytes(out, prefix.as_bytes());
}

/// Unpack a full byte slice into a tuple.
pub fn unpack(bytes: &[u8]) -> Result<Tuple, Error> {
    let mut elements = Vec::new();
    let mut cursor = bytes;

    while !cursor.is_empty() {
        let (element, rest) = decode_element(cursor)?;
        elements.push(element);
        cursor = rest;
    }

    Ok(Tuple::new(elements))
}

fn push_escaped_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    for byte in bytes {
        if *byte == ESCAPE {
            out.push(ESCAPE);
            out.push(ESCAPED_NUL);
        } else {
            out.push(*byte);
        }
    }
}

fn push_terminated_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    push_escaped_bytes(out, bytes);
    out.extend_from_slice(&TERMINATOR);
}

const fn ordered_i64_bytes(value: i64) -> [u8; 8] {
    ((value as u64) ^ (1 << 63)).to_be_bytes()
}

const fn ordered_f64_bytes(value: f64) -> [u8; 8] {
    let bits = value.to_bits();
    let ordered = if bits & (1 << 63) == 0 {
        bits ^ (1 << 63)
    } else {
        !bits
    };
    ordered.to_be_bytes()
}

const fn restore_i64(bytes: [u8; 8]) -> i64 {
    (u64::from_be_bytes(bytes) ^ (1 << 63)) as i64
}

const fn restore_f64(bytes: [u8; 8]) -> f64 {
    let ordered = u64::from_be_bytes(bytes);
    let bits = if ordered & (1 << 63) != 0 {
        ordered ^ (1 << 63)
    } else {
        !ordered
    };
    f64::from_bits(bits)
}

fn decode_element(bytes: &[u8]) -> Result<(Value, &[u8]), Error> {
    let (tag, rest) = bytes
        .split_first()
        .ok_or_else(|| Error::tuple_decode("empty element"))?;

    match *tag {
        TAG_NULL => Ok((Value::Null, rest)),
        TAG_BOOL => {
            let (byte, rest) = rest
                .split_first()
                .ok_or_else(|| Error::tuple_decode("truncated bool element"))?;
            match byte {
                0 => Ok((Value::Bool(false), rest)),
                1 => Ok((Value::Bool(true), rest)),
                other => Err(Error::tuple_decode(format!("invalid bool payload {other:#04x}"))),
            }
        }
        TAG_INT => {
            let (payload, rest) = split_fixed::<8>(rest, "int")?;
            Ok((Value::Int(restore_i64(payload)), rest))
        }
        TAG_DOUBLE => {
            let (payload, rest) = split_fixed::<8>(rest, "double")?;
            Ok((Value::Double(restore_f64(payload)), rest))
        }
        TAG_TEXT => {
            let (content, rest) = decode_terminated_bytes(rest)?;
            let text = String::from_utf8(content)
                .map_err(|_| Error::tuple_decode("text element is not valid UTF-8"))?;
            Ok((Value::Text(text), rest))
        }
        TAG_BYTES => {
            let (content, rest) = decode_terminated_bytes(rest)?;
            Ok((Value::Bytes(content), rest))
        }
        other => Err(Error::tuple_decode(format!("unknown element tag {other:#04x}"))),
    }
}

fn split_fixed<'a, const N: usize>(
    bytes: &'a [u8],
    label: &str,
) -> Result<([u8; N], &'a [u8]), Error> {
    if bytes.len() < N {
        return Err(Error::tuple_decode(format!("truncated {label} element")));
    }
    let mut payload = [0u8; N];
    payload.copy_from_slice(&bytes[..N]);
    Ok((payload, &bytes[N..]))
}

fn decode_terminated_bytes(bytes: &[u8]) -> Result<(Vec<u8>, &[u8]), Error> {
    let mut out = Vec::new();
    let mut position = 0;

    while position < bytes.len() {
        let byte = bytes[position];
        if byte != ESCAPE {
            out.push(byte);
            position += 1;
            continue;
        }

        match bytes.get(position + 1) {
            Some(&ESCAPED_NUL) => {
                out.push(ESCAPE);
                position += 2;
            }
            Some(0x00) => return Ok((out, &bytes[position + 2..])),
            Some(other) => {
                return Err(Error::tuple_decode(format!(
                    "invalid escape sequence 0x00 {other:#04x}"
                )));
            }
            None => return Err(Error::tuple_decode("unterminated byte-string element")),
        }
    }

    Err(Error::tuple_decode("unterminated byte-string element"))
}

///
/// TESTS
///
