//! Raw id -> dense index mapping.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maps sparse raw ids onto `0..len()` in first-seen order; `raw_ids()[i]`
/// is the raw id behind dense index `i`.
///
/// Serialized as the plain list of raw ids; the reverse index is rebuilt on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<u32>", into = "Vec<u32>")]
pub struct IdEncoding {
    raw_ids: Vec<u32>,
    index: HashMap<u32, usize>,
}

impl IdEncoding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an id stream; repeats map to the index of their first occurrence.
    pub fn from_ids(ids: impl IntoIterator<Item = u32>) -> Self {
        let mut encoding = Self::new();
        for id in ids {
            encoding.insert(id);
        }
        encoding
    }

    /// Returns the dense index for `raw`, assigning the next one if it's new.
    pub fn insert(&mut self, raw: u32) -> usize {
        let next = self.raw_ids.len();
        let raw_ids = &mut self.raw_ids;
        *self.index.entry(raw).or_insert_with(|| {
            raw_ids.push(raw);
            next
        })
    }

    pub fn encode(&self, raw: u32) -> Option<usize> {
        self.index.get(&raw).copied()
    }

    pub fn raw_ids(&self) -> &[u32] {
        &self.raw_ids
    }

    pub fn len(&self) -> usize {
        self.raw_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw_ids.is_empty()
    }
}

impl From<Vec<u32>> for IdEncoding {
    fn from(ids: Vec<u32>) -> Self {
        Self::from_ids(ids)
    }
}

impl From<IdEncoding> for Vec<u32> {
    fn from(encoding: IdEncoding) -> Self {
        encoding.raw_ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_order() {
        let encoding = IdEncoding::from_ids([42, 7, 42, 1000]);

        assert_eq!(encoding.len(), 3);
        assert_eq!(encoding.encode(42), Some(0));
        assert_eq!(encoding.encode(7), Some(1));
        assert_eq!(encoding.encode(1000), Some(2));
        assert_eq!(encoding.raw_ids(), &[42, 7, 1000]);
    }

    #[test]
    fn test_unknown_ids() {
        let encoding = IdEncoding::from_ids([1, 2]);
        assert_eq!(encoding.encode(3), None);
        assert_eq!(encoding.raw_ids().get(2), None);
    }

    #[test]
    fn test_serializes_as_id_list() {
        let encoding = IdEncoding::from_ids([5, 3]);
        let json = serde_json::to_string(&encoding).unwrap();
        assert_eq!(json, "[5,3]");

        let back: IdEncoding = serde_json::from_str(&json).unwrap();
        assert_eq!(back, encoding);
    }
}
