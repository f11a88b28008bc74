//! Atom validation for `true`, `false` and `null`.
//!
//! The non-root variants rely on the input padding: `loc` extends past the
//! logical document end, so checking the terminator byte after the atom is
//! always in bounds. The root variants additionally take the remaining byte
//! count so that a bare `truez` document is rejected rather than terminated
//! by padding.

use crate::charutils::is_not_structural_or_whitespace;

#[cfg_attr(not(feature = "no-inline"), inline)]
fn str4ncmp(src: &[u8], atom: &[u8; 4]) -> u32 {
    let mut chunk = [0u8; 4];
    chunk.copy_from_slice(&src[..4]);
    u32::from_ne_bytes(chunk) ^ u32::from_ne_bytes(*atom)
}

#[cfg_attr(not(feature = "no-inline"), inline)]
pub(crate) fn is_valid_true_atom(loc: &[u8]) -> bool {
    str4ncmp(loc, b"true") == 0 && is_not_structural_or_whitespace(loc[4]) == 0
}

#[cfg_attr(not(feature = "no-inline"), inline)]
pub(crate) fn is_valid_false_atom(loc: &[u8]) -> bool {
    str4ncmp(&loc[1..], b"alse") == 0
        && loc[0] == b'f'
        && is_not_structural_or_whitespace(loc[5]) == 0
}

#[cfg_attr(not(feature = "no-inline"), inline)]
pub(crate) fn is_valid_null_atom(loc: &[u8]) -> bool {
    str4ncmp(loc, b"null") == 0 && is_not_structural_or_whitespace(loc[4]) == 0
}

#[cfg_attr(not(feature = "no-inline"), inline)]
pub(crate) fn is_valid_root_true_atom(loc: &[u8], remaining: usize) -> bool {
    match remaining {
        4 => str4ncmp(loc, b"true") == 0,
        5.. => is_valid_true_atom(loc),
        _ => false,
    }
}

#[cfg_attr(not(feature = "no-inline"), inline)]
pub(crate) fn is_valid_root_false_atom(loc: &[u8], remaining: usize) -> bool {
    match remaining {
        5 => loc[0] == b'f' && str4ncmp(&loc[1..], b"alse") == 0,
        6.. => is_valid_false_atom(loc),
        _ => false,
    }
}

#[cfg_attr(not(feature = "no-inline"), inline)]
pub(crate) fn is_valid_root_null_atom(loc: &[u8], remaining: usize) -> bool {
    match remaining {
        4 => str4ncmp(loc, b"null") == 0,
        5.. => is_valid_null_atom(loc),
        _ => false,
    }
}
