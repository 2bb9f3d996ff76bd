//! Room code generation and parsing
//!
//! This module provides the short, human-typeable codes that address rooms.
//! Codes are drawn from an unambiguous uppercase alphabet (no `I`, `L`, `O`,
//! `0` or `1`) so they can be read aloud or typed from a projector without
//! confusion, and parsing is case-insensitive.

use std::{fmt::Display, str::FromStr};

use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;

use crate::constants::room::CODE_LENGTH;

/// Characters a room code may contain
///
/// Visually ambiguous characters are excluded on purpose.
const ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// A short, unique, case-insensitive identifier for a room
///
/// Stored in normalized (uppercase) form, so equality and hashing are
/// case-insensitive with respect to client input.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct RoomCode(String);

/// Errors that can occur when parsing a room code
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The code is not exactly [`CODE_LENGTH`] characters long
    #[error("room code must be {CODE_LENGTH} characters")]
    WrongLength,
    /// The code contains a character outside the code alphabet
    #[error("room code contains an invalid character")]
    InvalidCharacter,
}

impl RoomCode {
    /// Generates a new random room code
    ///
    /// Uniqueness is the caller's concern; the registry retries generation
    /// until the code is unused in its directory.
    pub fn generate() -> Self {
        let code = (0..CODE_LENGTH)
            .map(|_| char::from(ALPHABET[fastrand::usize(..ALPHABET.len())]))
            .collect();
        Self(code)
    }

    /// Returns the normalized code as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RoomCode {
    type Err = ParseError;

    /// Parses a room code, normalizing it to uppercase
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.chars().count() != CODE_LENGTH {
            return Err(ParseError::WrongLength);
        }
        let normalized: String = s.chars().map(|c| c.to_ascii_uppercase()).collect();
        if normalized.bytes().any(|b| !ALPHABET.contains(&b)) {
            return Err(ParseError::InvalidCharacter);
        }
        Ok(Self(normalized))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uses_alphabet() {
        for _ in 0..100 {
            let code = RoomCode::generate();
            assert_eq!(code.as_str().len(), CODE_LENGTH);
            assert!(code.as_str().bytes().all(|b| ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let lower = RoomCode::from_str("abcde").unwrap();
        let upper = RoomCode::from_str("ABCDE").unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.as_str(), "ABCDE");
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert_eq!(RoomCode::from_str("ABC"), Err(ParseError::WrongLength));
        assert_eq!(RoomCode::from_str("ABCDEF"), Err(ParseError::WrongLength));
        assert_eq!(RoomCode::from_str(""), Err(ParseError::WrongLength));
    }

    #[test]
    fn test_parse_rejects_ambiguous_characters() {
        // 0, 1, I, L and O are not in the alphabet
        assert_eq!(
            RoomCode::from_str("AB0DE"),
            Err(ParseError::InvalidCharacter)
        );
        assert_eq!(
            RoomCode::from_str("ABIDE"),
            Err(ParseError::InvalidCharacter)
        );
    }

    #[test]
    fn test_serde_round_trip() {
        let code = RoomCode::from_str("QWXYZ").unwrap();
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"QWXYZ\"");
        let back: RoomCode = serde_json::from_str("\"qwxyz\"").unwrap();
        assert_eq!(back, code);
    }

    #[test]
    fn test_generated_codes_round_trip() {
        let code = RoomCode::generate();
        let parsed = RoomCode::from_str(code.as_str()).unwrap();
        assert_eq!(parsed, code);
    }
}
