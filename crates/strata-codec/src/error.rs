/// Errors from encoding or decoding the canonical binary format.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    /// The kind byte is not one of the defined kinds.
    #[error("invalid kind byte: {0:#04x}")]
    InvalidKind(u8),

    /// The input ended before the declared content did.
    #[error("truncated input: needed {needed} more bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// Bytes remained after a complete top-level object.
    #[error("trailing bytes after object: {0} left over")]
    TrailingBytes(usize),

    /// A bool byte was neither 0x00 nor 0x01.
    #[error("invalid bool byte: {0:#04x}")]
    InvalidBool(u8),

    /// A string was not valid UTF-8.
    #[error("invalid utf-8 in string: {0}")]
    InvalidUtf8(String),

    /// A hash field did not carry exactly 32 bytes.
    #[error("invalid hash length: {0}")]
    InvalidHashLength(u64),

    /// A declared length does not fit in memory on this platform.
    #[error("declared length {0} is out of range")]
    LengthOutOfRange(u64),

    /// Decoded a different kind than the caller asked for.
    #[error("wrong kind: expected {expected}, found {found:#04x}")]
    WrongKind { expected: &'static str, found: u8 },

    /// The value has no wire representation (null is expressed by absence).
    #[error("unencodable value: {0}")]
    Unencodable(&'static str),

    /// Map keys were out of order or duplicated.
    ///
    /// Accepting such input would break the re-encode-byte-identity
    /// invariant, so decoders reject it as corrupt.
    #[error("non-canonical map: key {0:?} out of order")]
    NonCanonicalMap(String),
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
