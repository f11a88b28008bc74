//! Stage 1: scan the raw input and record the byte offset of every
//! structural character — `{ } [ ] : ,`, plus the first byte of each scalar
//! token — into an ordered `Vec<u32>`. Stage 2 never touches raw bytes
//! except through these offsets.
//!
//! The scan works on 64-byte chunks classified into bit masks. The mask
//! algebra (odd-backslash sequences, the quote-span prefix XOR, and the
//! pseudo-structural pass that marks scalar starts) is shared here as
//! provided trait methods; backends only supply the byte-classification
//! primitives, so a SIMD implementation drops in under `src/impls/` without
//! touching the driver.

use crate::error::ErrorType;
use crate::safer_unchecked::GetSaferUnchecked;
use crate::Parser;

const EVEN_BITS: u64 = 0x5555_5555_5555_5555;
const ODD_BITS: u64 = !EVEN_BITS;

/// One 64-byte chunk's worth of classification primitives.
pub(crate) trait Stage1Parse {
    /// Backend-native form of a broadcast byte for range comparisons.
    type SimdRepresentation;

    /// Load a chunk. `ptr` must hold at least 64 bytes.
    unsafe fn new(ptr: &[u8]) -> Self;

    /// Spread each quote bit into a mask covering its span: prefix XOR over
    /// the bit vector.
    unsafe fn compute_quote_mask(quote_bits: u64) -> u64;

    /// Bit i set iff byte i equals `m`.
    unsafe fn cmp_mask_against_input(&self, m: u8) -> u64;

    /// Bit i set iff byte i is unsigned-less-or-equal to `maxval`.
    unsafe fn unsigned_lteq_against_input(&self, maxval: Self::SimdRepresentation) -> u64;

    /// Classify whitespace and structural characters into two masks.
    unsafe fn find_whitespace_and_structurals(&self, whitespace: &mut u64, structurals: &mut u64);

    /// Append the offset of every set bit to `base`, biased by `idx - 64`
    /// (callers flatten the previous chunk's bits).
    unsafe fn flatten_bits(base: &mut Vec<u32>, idx: u32, bits: u64);

    unsafe fn fill_s8(n: i8) -> Self::SimdRepresentation;

    /// Mask of characters preceded by an odd number of backslashes, i.e.
    /// escaped characters. Carries the odd-backslash state across chunks.
    #[cfg_attr(not(feature = "no-inline"), inline)]
    unsafe fn find_odd_backslash_sequences(&self, prev_iter_ends_odd_backslash: &mut u64) -> u64 {
        let bs_bits = unsafe { self.cmp_mask_against_input(b'\\') };
        let start_edges = bs_bits & !(bs_bits << 1);
        // flip lowest if we have an odd-length run at the end of the prior
        // iteration
        let even_start_mask = EVEN_BITS ^ *prev_iter_ends_odd_backslash;
        let even_starts = start_edges & even_start_mask;
        let odd_starts = start_edges & !even_start_mask;
        let even_carries = bs_bits.wrapping_add(even_starts);

        // must record the carry-out of our odd-carries out of bit 63; this
        // indicates whether the sense of any edge going to the next
        // iteration should be flipped
        let (mut odd_carries, iter_ends_odd_backslash) = bs_bits.overflowing_add(odd_starts);
        odd_carries |= *prev_iter_ends_odd_backslash;
        *prev_iter_ends_odd_backslash = u64::from(iter_ends_odd_backslash);
        let even_carry_ends = even_carries & !bs_bits;
        let odd_carry_ends = odd_carries & !bs_bits;
        let even_start_odd_end = even_carry_ends & ODD_BITS;
        let odd_start_even_end = odd_carry_ends & EVEN_BITS;
        even_start_odd_end | odd_start_even_end
    }

    /// Quote bits (escaped quotes removed) and the in-string span mask.
    /// Unescaped control characters inside a string are accumulated into
    /// `error_mask`.
    #[cfg_attr(not(feature = "no-inline"), inline)]
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    unsafe fn find_quote_mask_and_bits(
        &self,
        odd_ends: u64,
        prev_iter_inside_quote: &mut u64,
        quote_bits: &mut u64,
        error_mask: &mut u64,
    ) -> u64 {
        unsafe {
            *quote_bits = self.cmp_mask_against_input(b'"') & !odd_ends;
            let mut quote_mask = Self::compute_quote_mask(*quote_bits);
            quote_mask ^= *prev_iter_inside_quote;
            let unescaped = self.unsigned_lteq_against_input(Self::fill_s8(0x1F));
            *error_mask |= quote_mask & unescaped;
            // right shift of a signed value expected to be well-defined and
            // sign-extending
            *prev_iter_inside_quote = (quote_mask as i64 >> 63) as u64;
            quote_mask
        }
    }

    /// Drop structurals inside strings, re-add quote starts, and mark the
    /// first byte of every scalar token (a non-whitespace byte following a
    /// structural or whitespace byte) as pseudo-structural.
    #[cfg_attr(not(feature = "no-inline"), inline)]
    fn finalize_structurals(
        mut structurals: u64,
        whitespace: u64,
        quote_mask: u64,
        quote_bits: u64,
        prev_iter_ends_pseudo_pred: &mut u64,
    ) -> u64 {
        // mask off anything inside quotes
        structurals &= !quote_mask;
        // add the real quote bits back into our bitmask as well, so we can
        // quickly traverse the strings we've spent all this trouble gathering
        structurals |= quote_bits;
        // Now, establish "pseudo-structural characters" which are non-quote
        // characters that are (a) outside quotes and (b) have a predecessor
        // that is a structural or whitespace character.
        let pseudo_pred = structurals | whitespace;
        let shifted_pseudo_pred = (pseudo_pred << 1) | *prev_iter_ends_pseudo_pred;
        *prev_iter_ends_pseudo_pred = pseudo_pred >> 63;
        let pseudo_structurals = shifted_pseudo_pred & !whitespace & !quote_mask;
        structurals |= pseudo_structurals;
        // now, we've used our close quotes; purge them from the structurals
        structurals &= !(quote_bits & !quote_mask);
        structurals
    }
}

impl Parser {
    /// Scan `input` and fill `structural_indexes`. The input here is the
    /// logical document (no padding needed); the trailing partial chunk is
    /// staged through a space-filled buffer.
    pub(crate) fn find_structural_bits<S: Stage1Parse>(
        input: &[u8],
        structural_indexes: &mut Vec<u32>,
    ) -> Result<(), ErrorType> {
        if simdutf8::basic::from_utf8(input).is_err() {
            return Err(ErrorType::InvalidUtf8);
        }

        let len = input.len();
        structural_indexes.clear();
        structural_indexes.reserve(len / 8);

        // persistent state across chunks
        let mut prev_iter_ends_odd_backslash: u64 = 0;
        // either all zeros or all ones
        let mut prev_iter_inside_quote: u64 = 0;
        // effectively the very first char is considered to follow "structure"
        let mut prev_iter_ends_pseudo_pred: u64 = 1;
        let mut structurals: u64 = 0;
        let mut error_mask: u64 = 0;

        let lenminus64 = len.saturating_sub(64);
        let mut idx = 0;
        while idx < lenminus64 {
            let chunk = unsafe { S::new(input.get_kinda_unchecked(idx..idx + 64)) };
            unsafe {
                let odd_ends = chunk.find_odd_backslash_sequences(&mut prev_iter_ends_odd_backslash);
                let mut quote_bits = 0u64;
                let quote_mask = chunk.find_quote_mask_and_bits(
                    odd_ends,
                    &mut prev_iter_inside_quote,
                    &mut quote_bits,
                    &mut error_mask,
                );
                // flatten out the structurals from the previous iteration
                #[allow(clippy::cast_possible_truncation)]
                S::flatten_bits(structural_indexes, idx as u32, structurals);
                let mut whitespace = 0u64;
                let mut chunk_structurals = 0u64;
                chunk.find_whitespace_and_structurals(&mut whitespace, &mut chunk_structurals);
                structurals = S::finalize_structurals(
                    chunk_structurals,
                    whitespace,
                    quote_mask,
                    quote_bits,
                    &mut prev_iter_ends_pseudo_pred,
                );
            }
            idx += 64;
        }

        if idx < len {
            // space-fill so the tail classifies like any other chunk
            let mut tail = [0x20u8; 64];
            tail[..len - idx].copy_from_slice(&input[idx..]);
            let chunk = unsafe { S::new(&tail) };
            unsafe {
                let odd_ends = chunk.find_odd_backslash_sequences(&mut prev_iter_ends_odd_backslash);
                let mut quote_bits = 0u64;
                let quote_mask = chunk.find_quote_mask_and_bits(
                    odd_ends,
                    &mut prev_iter_inside_quote,
                    &mut quote_bits,
                    &mut error_mask,
                );
                #[allow(clippy::cast_possible_truncation)]
                S::flatten_bits(structural_indexes, idx as u32, structurals);
                let mut whitespace = 0u64;
                let mut chunk_structurals = 0u64;
                chunk.find_whitespace_and_structurals(&mut whitespace, &mut chunk_structurals);
                structurals = S::finalize_structurals(
                    chunk_structurals,
                    whitespace,
                    quote_mask,
                    quote_bits,
                    &mut prev_iter_ends_pseudo_pred,
                );
            }
            idx += 64;
        }

        #[allow(clippy::cast_possible_truncation)]
        unsafe {
            S::flatten_bits(structural_indexes, idx as u32, structurals);
        }

        if prev_iter_inside_quote != 0 {
            // unclosed quote at end of input
            return Err(ErrorType::StringError);
        }
        if error_mask != 0 {
            // unescaped control character inside a string
            return Err(ErrorType::StringError);
        }
        Ok(())
    }
}
