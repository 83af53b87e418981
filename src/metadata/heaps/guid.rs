//! GUID heap (`#GUID`) builder.
//!
//! Stores 16-byte GUID entries addressed by 1-based index (not byte
//! offset). Index 0 means no GUID.
//!
//! # Reference
//! - [ECMA-335 II.24.2.5](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::{Error, Result};

/// Append-and-dedup builder for the `#GUID` heap.
///
/// Entries use the mixed-endian field layout the runtime writes
/// (`Uuid::to_bytes_le`). The nil GUID maps to index 0.
#[derive(Debug, Default)]
pub struct GuidHeapBuilder {
    data: Vec<u8>,
    indices: FxHashMap<[u8; 16], u32>,
}

impl GuidHeapBuilder {
    /// Creates an empty heap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the heap with the raw `#GUID` content of a source module.
    ///
    /// # Errors
    /// Returns [`Error::MalformedHeap`] if the data length is not a
    /// multiple of 16.
    pub fn from_existing(raw: &[u8]) -> Result<Self> {
        if raw.len() % 16 != 0 {
            return Err(Error::MalformedHeap(format!(
                "#GUID length {} is not a multiple of 16",
                raw.len()
            )));
        }

        let mut indices = FxHashMap::default();
        for (position, entry) in raw.chunks_exact(16).enumerate() {
            let mut bytes = [0u8; 16];
            bytes.copy_from_slice(entry);
            #[allow(clippy::cast_possible_truncation)]
            indices.entry(bytes).or_insert(position as u32 + 1);
        }

        Ok(GuidHeapBuilder {
            data: raw.to_vec(),
            indices,
        })
    }

    /// Adds a GUID and returns its 1-based heap index.
    ///
    /// The nil GUID maps to index 0 without touching the heap; duplicates
    /// return the prior index.
    pub fn add(&mut self, guid: &Uuid) -> u32 {
        if guid.is_nil() {
            return 0;
        }

        let bytes = guid.to_bytes_le();
        if let Some(&index) = self.indices.get(&bytes) {
            return index;
        }

        #[allow(clippy::cast_possible_truncation)]
        let index = (self.data.len() / 16) as u32 + 1;
        self.data.extend_from_slice(&bytes);
        self.indices.insert(bytes, index);
        index
    }

    /// Adds an optional GUID; `None` maps to index 0.
    pub fn add_optional(&mut self, guid: Option<&Uuid>) -> u32 {
        match guid {
            Some(guid) => self.add(guid),
            None => 0,
        }
    }

    /// The raw heap bytes accumulated so far.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of GUID entries in the heap.
    #[must_use]
    pub fn count(&self) -> usize {
        self.data.len() / 16
    }

    /// Returns true if the heap holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
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
    fn nil_is_zero() {
        let mut heap = GuidHeapBuilder::new();
        assert_eq!(heap.add(&Uuid::nil()), 0);
        assert_eq!(heap.add_optional(None), 0);
        assert!(heap.is_empty());
    }

    #[test]
    fn one_based_indices() {
        let mut heap = GuidHeapBuilder::new();
        let first = Uuid::from_u128(0x1111_2222_3333_4444_5555_6666_7777_8888);
        let second = Uuid::from_u128(0x9999_aaaa_bbbb_cccc_dddd_eeee_ffff_0001);

        assert_eq!(heap.add(&first), 1);
        assert_eq!(heap.add(&second), 2);
        assert_eq!(heap.add(&first), 1);
        assert_eq!(heap.count(), 2);
        assert_eq!(heap.data().len(), 32);
    }

    #[test]
    fn mixed_endian_layout() {
        let mut heap = GuidHeapBuilder::new();
        let guid = Uuid::from_u128(0x0011_2233_4455_6677_8899_aabb_ccdd_eeff);
        heap.add(&guid);
        assert_eq!(&heap.data()[..4], &[0x33, 0x22, 0x11, 0x00]);
    }

    #[test]
    fn seeded_returns_original_indices() {
        let guid = Uuid::from_u128(0x1234_5678_9abc_def0_1234_5678_9abc_def0);
        let mut original = GuidHeapBuilder::new();
        original.add(&guid);
        let raw = original.into_bytes();

        let mut heap = GuidHeapBuilder::from_existing(&raw).unwrap();
        assert_eq!(heap.add(&guid), 1);

        let other = Uuid::from_u128(1);
        assert_eq!(heap.add(&other), 2);
    }

    #[test]
    fn seeded_rejects_partial_entry() {
        assert!(GuidHeapBuilder::from_existing(&[0u8; 15]).is_err());
    }
}
