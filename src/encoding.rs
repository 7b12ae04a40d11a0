//! Asset text encoding detection and conversion.
//!
//! Extracted text assets come in a few flavours:
//! - UTF-16 LE (with BOM 0xFF 0xFE), the norm for metadata and UI files
//! - UTF-16 BE (with BOM 0xFE 0xFF)
//! - UTF-8 with BOM (0xEF 0xBB 0xBF)
//! - Plain UTF-8/ASCII, the norm for shader sources
//!
//! Reading detects by BOM and decodes with encoding_rs. Writing is decided
//! by the asset type alone: shader sources go back as single-byte text,
//! everything else as UTF-16 LE with a BOM. The game refuses assets in the
//! wrong encoding, so the choice is not configurable.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

/// UTF-16 LE BOM bytes
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
/// UTF-16 BE BOM bytes
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];
/// UTF-8 BOM bytes
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Extensions (lowercase, no dot) written as single-byte text.
pub const SINGLE_BYTE_EXTENSIONS: &[&str] = &["hlsl"];

/// Detected encoding of a text asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf16Le,
    Utf16Be,
    Utf8Bom,
    Utf8,
}

/// Encoding used when writing a patched asset back to the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetEncoding {
    /// One byte per character; anything outside ASCII becomes `?`
    Ascii,
    /// UTF-16 LE preceded by a BOM
    Utf16Le,
}

/// Detect the encoding of asset content by checking BOM bytes.
pub fn detect_encoding(bytes: &[u8]) -> SourceEncoding {
    if bytes.len() >= 2 && bytes[0..2] == UTF16_LE_BOM {
        SourceEncoding::Utf16Le
    } else if bytes.len() >= 2 && bytes[0..2] == UTF16_BE_BOM {
        SourceEncoding::Utf16Be
    } else if bytes.len() >= 3 && bytes[0..3] == UTF8_BOM {
        SourceEncoding::Utf8Bom
    } else {
        SourceEncoding::Utf8
    }
}

/// Read a text asset and convert it to a UTF-8 string.
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read asset: {}", path.display()))?;

    decode_text(&bytes).with_context(|| format!("Failed to decode asset: {}", path.display()))
}

/// Decode asset bytes to a UTF-8 string, handling the BOM-marked encodings.
pub fn decode_text(bytes: &[u8]) -> Result<String> {
    match detect_encoding(bytes) {
        SourceEncoding::Utf16Le => {
            let (cow, _, had_errors) = encoding_rs::UTF_16LE.decode(&bytes[2..]);
            if had_errors {
                bail!("UTF-16 LE decoding error");
            }
            Ok(cow.into_owned())
        }
        SourceEncoding::Utf16Be => {
            let (cow, _, had_errors) = encoding_rs::UTF_16BE.decode(&bytes[2..]);
            if had_errors {
                bail!("UTF-16 BE decoding error");
            }
            Ok(cow.into_owned())
        }
        SourceEncoding::Utf8Bom => {
            String::from_utf8(bytes[3..].to_vec()).context("Invalid UTF-8 after BOM")
        }
        SourceEncoding::Utf8 => String::from_utf8(bytes.to_vec()).context("Invalid UTF-8 encoding"),
    }
}

/// Pick the on-disk encoding for an asset from its extension.
pub fn encoding_for_path(path: &Path) -> TargetEncoding {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    if SINGLE_BYTE_EXTENSIONS.contains(&ext.as_str()) {
        TargetEncoding::Ascii
    } else {
        TargetEncoding::Utf16Le
    }
}

/// Encode text for writing.
pub fn encode_text(text: &str, encoding: TargetEncoding) -> Vec<u8> {
    match encoding {
        TargetEncoding::Ascii => text
            .chars()
            .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
            .collect(),
        TargetEncoding::Utf16Le => {
            let mut out = Vec::with_capacity(2 + text.len() * 2);
            out.extend_from_slice(&UTF16_LE_BOM);
            for unit in text.encode_utf16() {
                out.extend_from_slice(&unit.to_le_bytes());
            }
            out
        }
    }
}

/// Write text to `path` in the encoding its extension demands.
pub fn write_text(path: &Path, text: &str) -> Result<TargetEncoding> {
    let encoding = encoding_for_path(path);
    fs::write(path, encode_text(text, encoding))
        .with_context(|| format!("Failed to write asset: {}", path.display()))?;
    Ok(encoding)
}
