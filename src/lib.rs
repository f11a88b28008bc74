//! A two-stage JSON parser that builds a **tape**: a dense, random-accessible
//! array of 64-bit tagged words, plus a buffer of decoded strings.
//!
//! Stage 1 scans the raw bytes and records the offset of every structural
//! character. Stage 2 drives a goto-style state machine over those offsets,
//! doing all grammar validation and value decoding in a single pass with no
//! per-value allocation. Scope openers carry the tape index of their matching
//! closer and a saturating child count, so a consumer can skip a whole
//! object or array in O(1).
//!
//! ```
//! let mut parser = tape_json::Parser::default();
//! let doc = parser.parse(br#"{"answer": 42}"#).expect("valid json");
//! assert_eq!(doc.to_json(), r#"{"answer":42}"#);
//! ```

#[macro_use]
mod macros;

mod atomparse;
mod charutils;
mod error;
mod impls;
mod numberparse;
mod safer_unchecked;
mod stage1;
mod stage2;
mod stringparse;
pub mod tape;

pub use crate::error::{Error, ErrorType};
pub use crate::tape::{Document, Node, TapeType};

use crate::stage2::{RetAddress, ScopeDescriptor};
use std::alloc::{Layout, alloc, dealloc, handle_alloc_error};
use std::ops::Deref;
use std::ptr::NonNull;

pub type Result<T> = std::result::Result<T, Error>;

/// Readable bytes guaranteed past the logical end of the input copy. Value
/// decoders may read this far past the last structural without bounds
/// checks.
pub const PADDING: usize = 64;

/// Default nesting limit, the document root included.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Parse a single document with a throwaway [`Parser`].
///
/// # Errors
/// Returns the first parse error encountered.
pub fn to_tape(input: &[u8]) -> Result<Document> {
    Parser::default().parse(input)
}

/// Reusable parser state: the padded input copy, the structural index array
/// and the stage-2 scope stacks. Parsing with the same instance reuses all
/// allocations.
pub struct Parser {
    input_buffer: AlignedBuf,
    /// Logical input length; the buffer extends `PADDING` bytes further.
    len: usize,
    structural_indexes: Vec<u32>,
    containing_scope: Vec<ScopeDescriptor>,
    ret_address: Vec<RetAddress>,
    next_structural_index: usize,
    max_depth: usize,
    error: ErrorType,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("len", &self.len)
            .field("structurals", &self.structural_indexes.len())
            .field("max_depth", &self.max_depth)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    /// A parser that refuses documents nesting `max_depth` scopes or more
    /// (the document root counts as one).
    #[must_use]
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            input_buffer: AlignedBuf::with_capacity(0),
            len: 0,
            structural_indexes: Vec::new(),
            containing_scope: vec![ScopeDescriptor::default(); max_depth.max(1)],
            ret_address: vec![RetAddress::default(); max_depth.max(1)],
            next_structural_index: 0,
            max_depth,
            error: ErrorType::Uninitialized,
        }
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// The code recorded by the most recent parse: `Success` after a good
    /// parse, the failure kind after a bad one, `Uninitialized` before any.
    #[must_use]
    pub fn error(&self) -> ErrorType {
        self.error
    }

    /// Index one past the last structural consumed by the previous parse.
    /// In streaming use this is where the next document starts.
    #[must_use]
    pub fn next_structural_index(&self) -> usize {
        self.next_structural_index
    }

    /// Parse one complete document.
    ///
    /// # Errors
    /// Returns the first parse error encountered.
    pub fn parse(&mut self, input: &[u8]) -> Result<Document> {
        let mut doc = Document::default();
        self.parse_into(input, &mut doc)?;
        Ok(doc)
    }

    /// Parse one complete document into a caller-supplied (and typically
    /// reused) [`Document`].
    ///
    /// # Errors
    /// Returns the first parse error encountered; `doc` contents are
    /// unspecified afterwards.
    pub fn parse_into(&mut self, input: &[u8], doc: &mut Document) -> Result<()> {
        self.stage1(input)?;
        self.parse_structurals::<false>(doc)
    }

    /// Parse a buffer holding any number of whitespace-separated documents,
    /// yielding them in order. Iteration stops at the first error.
    ///
    /// # Errors
    /// Fails up front if the input is not valid UTF-8 or too large.
    pub fn parse_many(&mut self, input: &[u8]) -> Result<ManyDocuments<'_>> {
        self.stage1(input)?;
        Ok(ManyDocuments {
            parser: self,
            failed: false,
        })
    }

    /// Copy the input into the padded buffer and run stage 1.
    fn stage1(&mut self, input: &[u8]) -> Result<()> {
        if unlikely!(input.len() >= u32::MAX as usize - PADDING) {
            self.error = ErrorType::Capacity;
            return Err(Error::generic(ErrorType::Capacity));
        }
        self.len = input.len();
        self.input_buffer.set_from(input);
        if let Err(e) =
            Self::find_structural_bits::<impls::SimdInput>(input, &mut self.structural_indexes)
        {
            self.error = e;
            return Err(Error::generic(e));
        }
        self.next_structural_index = 0;
        Ok(())
    }
}

/// Iterator over the documents of a concatenated buffer; see
/// [`Parser::parse_many`].
pub struct ManyDocuments<'parser> {
    parser: &'parser mut Parser,
    failed: bool,
}

impl Iterator for ManyDocuments<'_> {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed
            || self.parser.next_structural_index >= self.parser.structural_indexes.len()
        {
            return None;
        }
        let mut doc = Document::default();
        match self.parser.parse_structurals::<true>(&mut doc) {
            Ok(()) => Some(Ok(doc)),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// A 64-byte-aligned heap buffer holding the input plus `PADDING` zeroed
/// bytes past its logical end, so stage-1 chunk loads and stage-2 value
/// decoders never need a bounds check near the tail.
pub struct AlignedBuf {
    layout: Layout,
    inner: NonNull<u8>,
    len: usize,
}

// `inner` is exclusively owned and only reachable through &self/&mut self
unsafe impl Send for AlignedBuf {}
unsafe impl Sync for AlignedBuf {}

impl AlignedBuf {
    /// # Panics
    /// Panics if `capacity` overflows the maximum layout size.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let layout = Layout::from_size_align(capacity, 64).expect("capacity overflow");
        if capacity == 0 {
            return Self {
                layout,
                inner: NonNull::dangling(),
                len: 0,
            };
        }
        let Some(inner) = NonNull::new(unsafe { alloc(layout) }) else {
            handle_alloc_error(layout)
        };
        Self {
            layout,
            inner,
            len: 0,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.layout.size()
    }

    /// Copy `src` in and zero the `PADDING` bytes after it; the buffer then
    /// derefs to `src.len() + PADDING` readable bytes.
    fn set_from(&mut self, src: &[u8]) {
        let needed = src.len() + PADDING;
        if self.capacity() < needed {
            *self = Self::with_capacity(needed);
        }
        unsafe {
            self.inner
                .as_ptr()
                .copy_from_nonoverlapping(src.as_ptr(), src.len());
            self.inner.as_ptr().add(src.len()).write_bytes(0, PADDING);
        }
        self.len = needed;
    }
}

impl Deref for AlignedBuf {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        unsafe { std::slice::from_raw_parts(self.inner.as_ptr(), self.len) }
    }
}

impl Drop for AlignedBuf {
    fn drop(&mut self) {
        if self.layout.size() != 0 {
            unsafe {
                dealloc(self.inner.as_ptr(), self.layout);
            }
        }
    }
}
