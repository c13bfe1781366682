//! Errors surfaced by the ChainPack reader and writer.

/// Errors that can occur while decoding or encoding a [`Value`](crate::value::Value).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The reader requested a byte past the end of the input.
    #[error("unexpected end of stream")]
    UnexpectedEndOfStream,

    /// I/O failure underlying a [`std::io::Read`] or [`std::io::Write`].
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A tag byte (or combination of tag byte and position) has no defined
    /// meaning.
    #[error("invalid tag byte: {0:#04x}")]
    InvalidTag(u8),

    /// A `String` payload was not valid UTF-8.
    #[error("invalid UTF-8 in string payload")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// A write was asked to encode a payload inconsistent with the
    /// declared type: an array element of the wrong variant, a negative
    /// IMap key, or a metadata value that cannot be represented.
    #[error("type mismatch: {0}")]
    TypeMismatch(&'static str),

    /// A UInt exceeded the 18-byte wire maximum on write, or an integer
    /// exceeded this implementation's 64-bit bound on read.
    #[error("integer overflow: {0}")]
    Overflow(&'static str),

    /// Structural recursion exceeded the configured maximum nesting depth.
    #[error("nesting depth exceeded the configured maximum of {0}")]
    DepthExceeded(usize),

    /// Attempted to serialize the sentinel invalid value.
    #[error("cannot serialize an invalid value")]
    InvalidValue,
}

/// Convenience alias for fallible ChainPack operations.
pub type Result<T> = std::result::Result<T, Error>;
