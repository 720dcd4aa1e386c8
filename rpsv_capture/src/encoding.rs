//! Encoding-tolerant reading of server log files
//!
//! Comparison runs collect logs through whatever shell redirection the
//! host offers, so the same logical content shows up as UTF-16LE with
//! a BOM (PowerShell), plain UTF-8, or a legacy single-byte codepage.
//! Rather than guess, we attempt a prioritized list of decodings and
//! take the first one that decodes cleanly. The latin-1 attempt at the
//! end of the default list cannot fail, so a default-configured read
//! only errors on I/O problems.

use std::{fs, path::Path};

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE, WINDOWS_1252};

/// Errors produced by [`read_lines`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Wrapper around [`std::io::Error`].
    #[error("Failed to read log file: {0}")]
    Io(#[from] std::io::Error),
    /// No attempted encoding decoded the file cleanly. Unreachable
    /// with the default attempt list, which ends in latin-1.
    #[error("No usable text encoding among {0} attempts")]
    Undecodable(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// One decoding attempt in the priority chain.
pub enum TextEncoding {
    /// UTF-16, endianness taken from the BOM. Files without a UTF-16
    /// BOM do not qualify: an ASCII log would otherwise "decode" into
    /// CJK soup without a single error to reject it on.
    Utf16,
    /// Strict UTF-8. A leading BOM is kept as U+FEFF, as the producer
    /// writes none.
    Utf8,
    /// Strict UTF-8 with a leading BOM stripped.
    Utf8Bom,
    /// Windows codepage 1252. Has undefined byte positions, so it can
    /// genuinely reject input.
    Windows1252,
    /// ISO-8859-1. Total over all byte sequences, never fails.
    Latin1,
}

/// Attempt order used by [`read_lines`].
pub const DEFAULT_ATTEMPTS: &[TextEncoding] = &[
    TextEncoding::Utf16,
    TextEncoding::Utf8,
    TextEncoding::Utf8Bom,
    TextEncoding::Windows1252,
    TextEncoding::Latin1,
];

impl TextEncoding {
    /// Decode `bytes` strictly, `None` on any decode error.
    fn decode(self, bytes: &[u8]) -> Option<String> {
        fn strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
            encoding
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(std::borrow::Cow::into_owned)
        }

        match self {
            TextEncoding::Utf16 => match bytes {
                [0xFF, 0xFE, rest @ ..] => strict(UTF_16LE, rest),
                [0xFE, 0xFF, rest @ ..] => strict(UTF_16BE, rest),
                _ => None,
            },
            TextEncoding::Utf8 => strict(UTF_8, bytes),
            TextEncoding::Utf8Bom => {
                let body = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
                strict(UTF_8, body)
            }
            TextEncoding::Windows1252 => strict(WINDOWS_1252, bytes),
            TextEncoding::Latin1 => Some(encoding_rs::mem::decode_latin1(bytes).into_owned()),
        }
    }
}

/// Read `path` as text lines using the default encoding priority list.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read_lines(path: &Path) -> Result<Vec<String>, Error> {
    read_lines_with(path, DEFAULT_ATTEMPTS)
}

/// Read `path` as text lines, attempting `attempts` in order.
///
/// The first attempt that decodes the entire file without error wins.
/// The file handle is released as soon as the bytes are in memory.
///
/// # Errors
///
/// Returns an error if the file cannot be read or if every attempt
/// rejects the content.
pub fn read_lines_with(path: &Path, attempts: &[TextEncoding]) -> Result<Vec<String>, Error> {
    let bytes = fs::read(path)?;
    let content = attempts
        .iter()
        .find_map(|attempt| attempt.decode(&bytes))
        .ok_or(Error::Undecodable(attempts.len()))?;
    Ok(content.lines().map(str::to_owned).collect())
}
