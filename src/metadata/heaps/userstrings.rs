//! User string heap (`#US`) builder.
//!
//! Stores string literals referenced from IL (`ldstr`) as length-prefixed
//! UTF-16LE sequences followed by a one-byte wide-character marker. Offset 0
//! is reserved.
//!
//! # Reference
//! - [ECMA-335 II.24.2.4](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use rustc_hash::FxHashMap;
use widestring::U16String;

use crate::{
    utils::{read_compressed_uint, write_compressed_uint},
    Error, Result,
};

/// Code units whose presence forces the trailing marker byte to 1
/// (II.24.2.4): any unit with a nonzero high byte, or a low byte in
/// 0x01-0x08, 0x0E-0x1F, 0x27, 0x2D, 0x7F.
fn needs_wide_marker(units: &[u16]) -> bool {
    units.iter().any(|&unit| {
        unit >= 0x100
            || matches!(unit, 0x01..=0x08 | 0x0E..=0x1F | 0x27 | 0x2D | 0x7F)
    })
}

/// Append-and-dedup builder for the `#US` heap.
///
/// Each entry is the compressed byte length (`2 * code_units + 1`) followed
/// by UTF-16LE content and the marker byte. Adding identical content twice
/// returns the same offset.
#[derive(Debug)]
pub struct UserStringsHeapBuilder {
    data: Vec<u8>,
    offsets: FxHashMap<String, u32>,
}

impl Default for UserStringsHeapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl UserStringsHeapBuilder {
    /// Creates an empty heap containing only the reserved zero byte.
    #[must_use]
    pub fn new() -> Self {
        UserStringsHeapBuilder {
            data: vec![0],
            offsets: FxHashMap::default(),
        }
    }

    /// Seeds the heap with the raw `#US` content of a source module.
    ///
    /// Entries are walked so re-adding a preserved literal returns its
    /// original offset; new literals append beyond the original end.
    ///
    /// # Errors
    /// Returns [`Error::MalformedHeap`] if the data is empty, does not start
    /// with the reserved zero byte, or an entry's length prefix runs past
    /// the end of the heap.
    pub fn from_existing(raw: &[u8]) -> Result<Self> {
        if raw.is_empty() || raw[0] != 0 {
            return Err(Error::MalformedHeap(
                "#US does not start with the reserved zero byte".into(),
            ));
        }

        let mut offsets = FxHashMap::default();
        let mut position = 1;
        while position < raw.len() {
            let entry_start = position;
            let Some(length) = read_compressed_uint(raw, &mut position) else {
                // Alignment padding at the end of the heap.
                break;
            };
            let length = length as usize;
            if position + length > raw.len() {
                return Err(Error::MalformedHeap(format!(
                    "#US entry at {entry_start} overruns the heap"
                )));
            }
            if length > 0 {
                // Content is `length / 2` UTF-16 units plus the marker byte.
                let units: Vec<u16> = raw[position..position + length - 1]
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                if let Ok(existing) = String::from_utf16(&units) {
                    #[allow(clippy::cast_possible_truncation)]
                    offsets.entry(existing).or_insert(entry_start as u32);
                }
            }
            position += length;
        }

        Ok(UserStringsHeapBuilder {
            data: raw.to_vec(),
            offsets,
        })
    }

    /// Adds a string literal and returns its heap offset.
    pub fn add(&mut self, value: &str) -> u32 {
        if let Some(&offset) = self.offsets.get(value) {
            return offset;
        }

        #[allow(clippy::cast_possible_truncation)]
        let offset = self.data.len() as u32;
        let units = U16String::from_str(value);

        #[allow(clippy::cast_possible_truncation)]
        write_compressed_uint(units.len() as u32 * 2 + 1, &mut self.data);
        for unit in units.as_slice() {
            self.data.extend_from_slice(&unit.to_le_bytes());
        }
        self.data
            .push(u8::from(needs_wide_marker(units.as_slice())));

        self.offsets.insert(value.to_string(), offset);
        offset
    }

    /// Adds an optional string literal; `None` maps to offset 0.
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
    fn layout_ascii() {
        let mut heap = UserStringsHeapBuilder::new();
        let offset = heap.add("A");
        assert_eq!(offset, 1);
        // length 3 = one UTF-16 unit + marker, marker 0 for plain ASCII
        assert_eq!(heap.data(), &[0x00, 0x03, 0x41, 0x00, 0x00]);
    }

    #[test]
    fn marker_set_for_wide_chars() {
        // 0x00E9 has a zero high byte and an unremarkable low byte
        let mut heap = UserStringsHeapBuilder::new();
        heap.add("\u{00e9}");
        let data = heap.data();
        assert_eq!(data[data.len() - 1], 0);

        // 0x0153 has a nonzero high byte
        let mut heap = UserStringsHeapBuilder::new();
        heap.add("\u{0153}");
        let data = heap.data();
        assert_eq!(data[data.len() - 1], 1);
    }

    #[test]
    fn marker_set_for_special_low_bytes() {
        for value in ["\u{0007}", "'", "-", "\u{007f}"] {
            let mut heap = UserStringsHeapBuilder::new();
            heap.add(value);
            let data = heap.data();
            assert_eq!(data[data.len() - 1], 1, "marker for {value:?}");
        }
    }

    #[test]
    fn dedup() {
        let mut heap = UserStringsHeapBuilder::new();
        let first = heap.add("Hello, World!");
        assert_eq!(heap.add("Hello, World!"), first);
        assert_ne!(heap.add("Goodbye"), first);
    }

    #[test]
    fn seeded_returns_original_offsets() {
        let mut original = UserStringsHeapBuilder::new();
        let hello = original.add("Hello");
        let bye = original.add("Bye");
        let raw = original.into_bytes();

        let mut heap = UserStringsHeapBuilder::from_existing(&raw).unwrap();
        assert_eq!(heap.add("Hello"), hello);
        assert_eq!(heap.add("Bye"), bye);

        let fresh = heap.add("Fresh");
        assert!(fresh as usize >= raw.len());
    }

    #[test]
    fn seeded_rejects_overrun() {
        // Claims 0x20 bytes of content but the heap ends after two.
        let raw = [0x00, 0x20, 0x41, 0x00];
        assert!(UserStringsHeapBuilder::from_existing(&raw).is_err());
    }
}
