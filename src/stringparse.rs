//! String body decoding: everything between the quotes, escapes resolved,
//! appended to the document's string buffer. The caller (stage 2) owns the
//! length-prefix and NUL framing around the body.

use crate::charutils::{codepoint_to_utf8, hex_to_u32_nocheck};
use crate::error::ErrorType;

/// Decoded byte for each single-character escape, 0 for invalid escapes.
const ESCAPE_MAP: [u8; 256] = {
    let mut map = [0u8; 256];
    map[b'"' as usize] = 0x22;
    map[b'/' as usize] = 0x2F;
    map[b'\\' as usize] = 0x5C;
    map[b'b' as usize] = 0x08;
    map[b'f' as usize] = 0x0C;
    map[b'n' as usize] = 0x0A;
    map[b'r' as usize] = 0x0D;
    map[b't' as usize] = 0x09;
    map
};

/// Decode the string whose opening quote sits at `buf[offset]`, appending
/// the body to `dst`. `len` is the logical document length; running past it
/// means the string is unterminated.
pub(crate) fn parse_str(
    buf: &[u8],
    len: usize,
    offset: usize,
    dst: &mut Vec<u8>,
) -> Result<(), ErrorType> {
    let mut p = offset + 1;
    // start of the pending unescaped span
    let mut run = p;
    while p < len {
        match buf[p] {
            b'"' => {
                dst.extend_from_slice(&buf[run..p]);
                return Ok(());
            }
            b'\\' => {
                dst.extend_from_slice(&buf[run..p]);
                if p + 1 >= len {
                    return Err(ErrorType::StringError);
                }
                let escape_char = buf[p + 1];
                if escape_char == b'u' {
                    p = parse_unicode_escape(buf, len, p, dst)?;
                } else {
                    let decoded = ESCAPE_MAP[escape_char as usize];
                    if decoded == 0 {
                        return Err(ErrorType::StringError);
                    }
                    dst.push(decoded);
                    p += 2;
                }
                run = p;
            }
            0x00..=0x1F => return Err(ErrorType::StringError),
            _ => p += 1,
        }
    }
    Err(ErrorType::StringError)
}

/// Decode `\uXXXX` (possibly a surrogate pair) starting at the backslash at
/// `buf[p]`; returns the position past the escape.
fn parse_unicode_escape(
    buf: &[u8],
    len: usize,
    mut p: usize,
    dst: &mut Vec<u8>,
) -> Result<usize, ErrorType> {
    if p + 6 > len {
        return Err(ErrorType::StringError);
    }
    let mut code_point = hex_to_u32_nocheck(&buf[p + 2..p + 6]);
    if code_point > 0xFFFF {
        return Err(ErrorType::StringError);
    }
    p += 6;
    if (0xD800..0xDC00).contains(&code_point) {
        // high surrogate, the low half must follow immediately
        if p + 6 > len || buf[p] != b'\\' || buf[p + 1] != b'u' {
            return Err(ErrorType::StringError);
        }
        let low = hex_to_u32_nocheck(&buf[p + 2..p + 6]);
        if !(0xDC00..0xE000).contains(&low) {
            return Err(ErrorType::StringError);
        }
        code_point = (((code_point - 0xD800) << 10) | (low - 0xDC00)) + 0x10000;
        p += 6;
    } else if (0xDC00..0xE000).contains(&code_point) {
        // lone low surrogate
        return Err(ErrorType::StringError);
    }
    if !codepoint_to_utf8(code_point, dst) {
        return Err(ErrorType::StringError);
    }
    Ok(p)
}
