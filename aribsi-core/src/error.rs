//! Error types for transport stream scanning and SI decoding.

use std::io;

use thiserror::Error;

/// Errors raised while reading TS packets from a stream.
#[derive(Error, Debug)]
pub enum TsError {
    /// The packet at `offset` does not start with 0x47.
    ///
    /// The scan of this stream must stop; no resynchronisation is attempted.
    #[error("Invalid sync byte at offset {offset}: expected 0x47, got 0x{found:02X}")]
    SyncByte { offset: u64, found: u8 },

    /// Underlying read or seek failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised by the ARIB text decoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AribError {
    /// The output buffer could not be allocated.
    #[error("Out of memory while reserving {0} bytes for decoded text")]
    OutOfMemory(usize),
}

/// Errors raised while extracting fields from PSI/SI sections.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SiError {
    /// Buffer is shorter than the fixed part of the structure.
    #[error("{what} too short: need {need} bytes, got {got}")]
    TooShort {
        what: &'static str,
        need: usize,
        got: usize,
    },

    /// A length field points past the end of its buffer.
    #[error("{what} length {length} overruns the remaining {remaining} bytes")]
    LengthOverrun {
        what: &'static str,
        length: usize,
        remaining: usize,
    },

    /// The section carries a table id this parser does not handle.
    #[error("Unexpected table id 0x{0:02X}")]
    UnexpectedTable(u8),

    /// Text field could not be decoded.
    #[error("Text decoding failed: {0}")]
    Text(#[from] AribError),
}
