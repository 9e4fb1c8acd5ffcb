//! Output byte encodings and placeholder substitution

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Replacement for characters the output encoding cannot represent
pub const PLACEHOLDER: char = '?';

/// Supported output encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputEncoding {
    #[default]
    #[serde(rename = "utf-8", alias = "utf8", alias = "UTF-8")]
    Utf8,
    #[serde(rename = "ascii", alias = "us-ascii", alias = "ASCII")]
    Ascii,
    #[serde(rename = "iso-8859-1", alias = "latin1", alias = "latin-1", alias = "ISO-8859-1")]
    Latin1,
}

impl OutputEncoding {
    pub fn name(&self) -> &'static str {
        match self {
            OutputEncoding::Utf8 => "UTF-8",
            OutputEncoding::Ascii => "ASCII",
            OutputEncoding::Latin1 => "ISO-8859-1",
        }
    }

    pub fn can_encode(&self, ch: char) -> bool {
        match self {
            OutputEncoding::Utf8 => true,
            OutputEncoding::Ascii => ch.is_ascii(),
            OutputEncoding::Latin1 => (ch as u32) <= 0xFF,
        }
    }

    /// Replace unrepresentable characters with [`PLACEHOLDER`], returning the
    /// text and each character that was replaced
    pub fn substitute<'a>(&self, text: &'a str) -> (Cow<'a, str>, Vec<char>) {
        if text.chars().all(|ch| self.can_encode(ch)) {
            return (Cow::Borrowed(text), Vec::new());
        }

        let mut replaced = Vec::new();
        let out: String = text
            .chars()
            .map(|ch| {
                if self.can_encode(ch) {
                    ch
                } else {
                    replaced.push(ch);
                    PLACEHOLDER
                }
            })
            .collect();
        (Cow::Owned(out), replaced)
    }

    /// Encode text that has already been substituted
    pub fn encode<'a>(&self, text: &'a str) -> Cow<'a, [u8]> {
        match self {
            OutputEncoding::Utf8 | OutputEncoding::Ascii => Cow::Borrowed(text.as_bytes()),
            OutputEncoding::Latin1 => {
                if text.is_ascii() {
                    Cow::Borrowed(text.as_bytes())
                } else {
                    Cow::Owned(
                        text.chars()
                            .map(|ch| if (ch as u32) <= 0xFF { ch as u32 as u8 } else { PLACEHOLDER as u8 })
                            .collect(),
                    )
                }
            }
        }
    }
}

impl fmt::Display for OutputEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(OutputEncoding::Utf8),
            "ascii" | "us-ascii" => Ok(OutputEncoding::Ascii),
            "iso-8859-1" | "latin1" | "latin-1" => Ok(OutputEncoding::Latin1),
            other => Err(format!(
                "Unsupported encoding '{}'. Use 'utf-8', 'ascii', or 'iso-8859-1'",
                other
            )),
        }
    }
}
