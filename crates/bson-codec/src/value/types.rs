//! Fixed-shape BSON types.

use super::{Document, ObjectId};

/// Binary data with its subtype byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Binary {
    pub subtype: u8,
    pub bytes: Vec<u8>,
}

impl Binary {
    pub fn new(subtype: u8, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            subtype,
            bytes: bytes.into(),
        }
    }
}

/// Regular expression; option characters are kept sorted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Regex {
    pub pattern: String,
    pub options: String,
}

impl Regex {
    pub fn new(pattern: impl Into<String>, options: &str) -> Self {
        let mut chars: Vec<char> = options.chars().collect();
        chars.sort_unstable();
        Self {
            pattern: pattern.into(),
            options: chars.into_iter().collect(),
        }
    }
}

/// Replication timestamp: seconds plus an ordinal within the second.
///
/// On the wire the increment occupies the low four bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Timestamp {
    pub time: u32,
    pub increment: u32,
}

/// Deprecated database pointer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DbPointer {
    pub namespace: String,
    pub id: ObjectId,
}

/// JavaScript code with a scope document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CodeWithScope {
    pub code: String,
    pub scope: Document,
}

/// Native JavaScript code; encodes as the JavaScript wire type, not a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct JavaScript(pub String);

/// Native symbol; encodes as the Symbol wire type, not a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Symbol(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MinKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MaxKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Undefined;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Null;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regex_options_are_sorted() {
        assert_eq!(Regex::new("^a", "xmi").options, "imx");
    }
}
