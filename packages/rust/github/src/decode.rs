//! Permissive decoding of the README `content` field.
//!
//! GitHub returns README bodies as standard base64 wrapped at 60 columns.
//! Decoding never fails: characters outside the alphabet are dropped, padding
//! is optional, and invalid UTF-8 sequences are dropped rather than replaced.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

/// Standard alphabet, padding optional, stray trailing bits ignored.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode a base64 README body into text.
pub fn decode_readme_content(content: &str) -> String {
    let mut cleaned: String = content
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '+' || *c == '/')
        .collect();

    // A lone trailing symbol carries fewer than 8 bits.
    if cleaned.len() % 4 == 1 {
        cleaned.pop();
    }

    let bytes = LENIENT.decode(cleaned.as_bytes()).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "README content is not decodable base64");
        Vec::new()
    });

    utf8_dropping_invalid(&bytes)
}

/// Keep every valid UTF-8 run; drop the bytes between them.
pub fn utf8_dropping_invalid(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}
