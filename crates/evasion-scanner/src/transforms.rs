//! Reversible-transform catalog.
//!
//! Each [`TransformKind`] names one decoding that an evasion attempt may
//! hide behind.  A transform exposes a cheap applicability guard and a
//! decode function; the detector only pays for a decode when the guard
//! passes.  Transforms are never composed: a payload hidden behind two
//! layers of encoding is out of scope, which keeps the per-input cost
//! linear in the catalog size.

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum trimmed length before a string is even considered base64.
/// Short alphanumeric words ("hello", "test1234") would otherwise decode to
/// garbage bytes and waste a scan.
const BASE64_MIN_LEN: usize = 20;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A transform could not decode the given text.
///
/// Always recovered locally by the detector and treated as "transform not
/// applicable"; never surfaced to callers as a fatal error.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("decoded bytes are not valid UTF-8: {0}")]
    NotUtf8(#[from] std::string::FromUtf8Error),
}

// ---------------------------------------------------------------------------
// TransformKind
// ---------------------------------------------------------------------------

/// The closed set of reversible transforms the detector understands.
///
/// New transforms are added by extending this enum plus one decode arm, not
/// by open polymorphism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    /// Fold common character substitutions (leetspeak digits and symbols)
    /// back to letters and lowercase the result.
    Homoglyph,
    /// Decode the whole trimmed string as standard-alphabet base64.
    Base64,
    /// Rotate ASCII letters by 13 positions.
    Rot13,
    /// Decode percent-escapes (`%69%67...`).
    Percent,
    /// Strip zero-width and other invisible code points that can split a
    /// signature without changing its rendering.
    ZeroWidth,
}

impl TransformKind {
    /// Every transform, in default catalog order.
    pub fn all() -> &'static [TransformKind] {
        &[
            Self::Homoglyph,
            Self::Base64,
            Self::Rot13,
            Self::Percent,
            Self::ZeroWidth,
        ]
    }

    /// Stable name used in config files and in `Match::via` tags.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Homoglyph => "homoglyph",
            Self::Base64 => "base64",
            Self::Rot13 => "rot13",
            Self::Percent => "percent",
            Self::ZeroWidth => "zero_width",
        }
    }

    /// Cheap heuristic: is it worth attempting [`decode`](Self::decode)?
    pub fn applies(&self, text: &str) -> bool {
        match self {
            Self::Homoglyph => text.chars().any(|c| homoglyph_fold(c).is_some()),
            Self::Base64 => {
                let t = text.trim();
                t.len() >= BASE64_MIN_LEN
                    && t.len() % 4 == 0
                    && t.chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
            }
            Self::Rot13 => text.chars().any(|c| c.is_ascii_alphabetic()),
            Self::Percent => text.contains('%'),
            Self::ZeroWidth => text.chars().any(is_invisible),
        }
    }

    /// Attempt the decode.  Fails with [`DecodeError`] when the input is
    /// malformed for this transform (e.g. bad base64 padding).
    pub fn decode(&self, text: &str) -> Result<String, DecodeError> {
        match self {
            Self::Homoglyph => Ok(text
                .chars()
                .map(|c| homoglyph_fold(c).unwrap_or_else(|| c.to_ascii_lowercase()))
                .collect()),
            Self::Base64 => {
                let bytes = base64::engine::general_purpose::STANDARD.decode(text.trim())?;
                Ok(String::from_utf8(bytes)?)
            }
            Self::Rot13 => Ok(text.chars().map(rot13_char).collect()),
            Self::Percent => Ok(urlencoding::decode(text)?.into_owned()),
            Self::ZeroWidth => Ok(text.chars().filter(|c| !is_invisible(*c)).collect()),
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Substitution table for the homoglyph fold.  Returns `None` for
/// characters that pass through (lowercased) unchanged.
fn homoglyph_fold(c: char) -> Option<char> {
    match c {
        '0' => Some('o'),
        '1' => Some('i'),
        '3' => Some('e'),
        '4' => Some('a'),
        '5' => Some('s'),
        '7' => Some('t'),
        '$' => Some('s'),
        '@' => Some('a'),
        _ => None,
    }
}

fn rot13_char(c: char) -> char {
    match c {
        'a'..='z' => (((c as u8 - b'a' + 13) % 26) + b'a') as char,
        'A'..='Z' => (((c as u8 - b'A' + 13) % 26) + b'A') as char,
        _ => c,
    }
}

/// Zero-width / invisible code points, including the Unicode tag block
/// (U+E0000..U+E007F) used to smuggle hidden instructions.
fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{E0000}'..='\u{E007F}'
    )
}
