use std::fmt;

/// The coarse kind of a parse failure.
///
/// The discriminants are stable: consumers that ferry codes across an FFI or
/// wire boundary can rely on them. `Success` and `Uninitialized` are the
/// resting states recorded on [`crate::Parser`] rather than codes a `Result`
/// ever carries.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum ErrorType {
    /// The last parse completed.
    Success = 0,
    /// A parse is in flight or was aborted before classification.
    Uninitialized = 1,
    /// No structural characters in the input.
    Empty = 2,
    /// Bad string: invalid escape, unescaped control byte, or unterminated.
    StringError = 3,
    /// Malformed number.
    NumberError = 4,
    /// Malformed `true`.
    TrueAtomError = 5,
    /// Malformed `false`.
    FalseAtomError = 6,
    /// Malformed `null`.
    NullAtomError = 7,
    /// Nesting reached the configured maximum depth.
    DepthError = 8,
    /// The document structure is invalid.
    TapeError = 9,
    /// The input is not valid UTF-8.
    InvalidUtf8 = 10,
    /// The input is too large for 32-bit tape cross-references.
    Capacity = 11,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Uninitialized => write!(f, "parser uninitialized"),
            Self::Empty => write!(f, "empty input"),
            Self::StringError => write!(f, "invalid string"),
            Self::NumberError => write!(f, "invalid number"),
            Self::TrueAtomError => write!(f, "invalid true atom"),
            Self::FalseAtomError => write!(f, "invalid false atom"),
            Self::NullAtomError => write!(f, "invalid null atom"),
            Self::DepthError => write!(f, "maximum nesting depth exceeded"),
            Self::TapeError => write!(f, "invalid document structure"),
            Self::InvalidUtf8 => write!(f, "invalid UTF-8"),
            Self::Capacity => write!(f, "document too large"),
        }
    }
}

/// A parse failure: the error kind plus the byte index and character of the
/// structural the parser was looking at when it gave up.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Error {
    index: usize,
    character: char,
    error: ErrorType,
}

impl Error {
    pub(crate) fn new_c(index: usize, character: char, error: ErrorType) -> Self {
        Self {
            index,
            character,
            error,
        }
    }

    pub(crate) fn generic(error: ErrorType) -> Self {
        Self {
            index: 0,
            character: '💩',
            error,
        }
    }

    /// The kind of failure.
    #[must_use]
    pub fn error_type(&self) -> ErrorType {
        self.error
    }

    /// Byte offset of the structural character the failure was classified at.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at character {} ('{}')",
            self.error, self.index, self.character
        )
    }
}

impl std::error::Error for Error {}
