//! String heap (`#Strings`) builder.
//!
//! Collects the identifier strings referenced by metadata tables: UTF-8,
//! null-terminated, deduplicated by content. Offset 0 is the shared empty
//! string.
//!
//! # Reference
//! - [ECMA-335 II.24.2.3](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use rustc_hash::FxHashMap;

use crate::{Error, Result};

/// Append-and-dedup builder for the `#Strings` heap.
///
/// `add` returns the byte offset at which the string lives; adding the same
/// content twice returns the same offset. Offsets are monotonically
/// nondecreasing over the lifetime of the builder.
///
/// # Examples
///
/// ```rust
/// use dotforge::metadata::heaps::StringsHeapBuilder;
/// let mut strings = StringsHeapBuilder::new();
/// let a = strings.add("MyClass");
/// let b = strings.add("MyClass");
/// assert_eq!(a, b);
/// assert_eq!(strings.add(""), 0);
/// ```
#[derive(Debug)]
pub struct StringsHeapBuilder {
    data: Vec<u8>,
    offsets: FxHashMap<String, u32>,
}

impl Default for StringsHeapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StringsHeapBuilder {
    /// Creates an empty heap containing only the reserved zero byte.
    #[must_use]
    pub fn new() -> Self {
        StringsHeapBuilder {
            data: vec![0],
            offsets: FxHashMap::default(),
        }
    }

    /// Seeds the heap with the raw `#Strings` content of a source module.
    ///
    /// The original bytes are kept verbatim so that every offset handed out
    /// for the source module stays valid; existing strings are indexed so
    /// that re-adding one returns its original offset. New strings append
    /// beyond the original end.
    ///
    /// # Errors
    /// Returns [`Error::MalformedHeap`] if the data is empty or does not
    /// start with the reserved zero byte.
    pub fn from_existing(raw: &[u8]) -> Result<Self> {
        if raw.is_empty() || raw[0] != 0 {
            return Err(Error::MalformedHeap(
                "#Strings does not start with the reserved zero byte".into(),
            ));
        }

        let mut offsets = FxHashMap::default();
        let mut position = 1;
        while position < raw.len() {
            let Some(terminator) = raw[position..].iter().position(|b| *b == 0) else {
                // Trailing bytes without a terminator are alignment padding.
                break;
            };
            if let Ok(existing) = std::str::from_utf8(&raw[position..position + terminator]) {
                #[allow(clippy::cast_possible_truncation)]
                offsets
                    .entry(existing.to_string())
                    .or_insert(position as u32);
            }
            position += terminator + 1;
        }

        Ok(StringsHeapBuilder {
            data: raw.to_vec(),
            offsets,
        })
    }

    /// Adds a string and returns its heap offset.
    ///
    /// The empty string maps to offset 0 without touching the heap.
    pub fn add(&mut self, value: &str) -> u32 {
        if value.is_empty() {
            return 0;
        }
        if let Some(&offset) = self.offsets.get(value) {
            return offset;
        }

        #[allow(clippy::cast_possible_truncation)]
        let offset = self.data.len() as u32;
        self.data.extend_from_slice(value.as_bytes());
        self.data.push(0);
        self.offsets.insert(value.to_string(), offset);
        offset
    }

    /// Adds an optional string; `None` maps to offset 0.
    pub fn add_optional(&mut self, value: Option<&str>) -> u32 {
        match value {
            Some(value) => self.add(value),
            None => 0,
        }
    }

    /// The raw heap bytes accumulated so far.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Current heap size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the heap holds only the reserved zero byte.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.len() <= 1
    }

    /// Consumes the builder and returns the final heap bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_zero() {
        let mut heap = StringsHeapBuilder::new();
        assert_eq!(heap.add(""), 0);
        assert_eq!(heap.data(), &[0]);
    }

    #[test]
    fn layout() {
        let mut heap = StringsHeapBuilder::new();
        let offset = heap.add("Hello");
        assert_eq!(offset, 1);
        assert_eq!(heap.data(), &[0, b'H', b'e', b'l', b'l', b'o', 0]);
    }

    #[test]
    fn dedup() {
        let mut heap = StringsHeapBuilder::new();
        let first = heap.add("<Module>");
        let second = heap.add("System");
        assert_ne!(first, second);
        assert_eq!(heap.add("<Module>"), first);
        assert_eq!(heap.add("System"), second);
    }

    #[test]
    fn offsets_nondecreasing() {
        let mut heap = StringsHeapBuilder::new();
        let mut last = 0;
        for name in ["a", "bb", "ccc", "dddd"] {
            let offset = heap.add(name);
            assert!(offset > last);
            last = offset;
        }
    }

    #[test]
    fn seeded_returns_original_offsets() {
        #[rustfmt::skip]
        let source: [u8; 17] = [
            0x00,
            0x3c, 0x4d, 0x6f, 0x64, 0x75, 0x6c, 0x65, 0x3e, 0x00, // "<Module>" at 1
            0x53, 0x79, 0x73, 0x74, 0x65, 0x6d, 0x00,             // "System" at 10
        ];

        let mut heap = StringsHeapBuilder::from_existing(&source).unwrap();
        assert_eq!(heap.add("<Module>"), 1);
        assert_eq!(heap.add("System"), 10);

        let appended = heap.add("Fresh");
        assert_eq!(appended, 17);
        assert_eq!(&heap.data()[..17], &source);
    }

    #[test]
    fn seeded_rejects_bad_start() {
        assert!(StringsHeapBuilder::from_existing(&[]).is_err());
        assert!(StringsHeapBuilder::from_existing(&[0x41, 0x00]).is_err());
    }
}
