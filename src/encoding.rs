//! Single-byte text encodings used to decode lines and test for whitespace.
//!
//! Whitespace skipping between records peeks one byte at a time, so only
//! encodings mapping each byte to at most one character are supported.

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// A byte <-> text mapping with exactly one byte per character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    /// 7-bit ASCII; bytes >= 0x80 do not decode.
    #[default]
    Ascii,
    /// ISO-8859-1; every byte decodes to the code point of the same value.
    Latin1,
}

impl TextEncoding {
    /// Canonical name, as accepted by `FromStr`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ascii => "ascii",
            Self::Latin1 => "latin-1",
        }
    }

    #[inline]
    pub fn decode_byte(self, byte: u8) -> Option<char> {
        match self {
            Self::Ascii if byte.is_ascii() => Some(char::from(byte)),
            Self::Ascii => None,
            Self::Latin1 => Some(char::from(byte)),
        }
    }

    /// Decodes `bytes`, returning the first undecodable byte on failure.
    pub fn decode(self, bytes: &[u8]) -> std::result::Result<String, u8> {
        bytes
            .iter()
            .map(|&b| self.decode_byte(b).ok_or(b))
            .collect()
    }

    /// Encodes `text`, returning the first unrepresentable character on failure.
    pub fn encode(self, text: &str) -> std::result::Result<Vec<u8>, char> {
        let limit = match self {
            Self::Ascii => 0x7f,
            Self::Latin1 => 0xff,
        };
        text.chars()
            .map(|c| match u32::from(c) {
                v if v <= limit => Ok(v as u8),
                _ => Err(c),
            })
            .collect()
    }

    /// Whitespace test matching the separator set between dump records.
    ///
    /// Includes the ASCII file/group/record/unit separators (0x1c..=0x1f),
    /// which `char::is_whitespace` leaves out.
    #[inline]
    pub fn is_whitespace(c: char) -> bool {
        c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TextEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "ascii" | "us-ascii" | "646" => Ok(Self::Ascii),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" | "l1" => Ok(Self::Latin1),
            _ => Err(Error::UnknownEncoding(s.to_string())),
        }
    }
}
