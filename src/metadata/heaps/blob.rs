//! Blob heap (`#Blob`) builder.
//!
//! Stores binary data (signatures, constants, marshalling descriptors,
//! public keys) as compressed-length-prefixed entries, deduplicated by
//! content. Offset 0 is the shared empty blob.
//!
//! # Reference
//! - [ECMA-335 II.24.2.4](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use rustc_hash::FxHashMap;

use crate::{
    utils::{read_compressed_uint, write_compressed_uint},
    Error, Result,
};

/// Append-and-dedup builder for the `#Blob` heap.
///
/// # Examples
///
/// ```rust
/// use dotforge::metadata::heaps::BlobHeapBuilder;
/// let mut blobs = BlobHeapBuilder::new();
/// let sig = blobs.add(&[0x06, 0x08]);
/// assert_eq!(blobs.add(&[0x06, 0x08]), sig);
/// assert_eq!(blobs.add(&[]), 0);
/// ```
#[derive(Debug)]
pub struct BlobHeapBuilder {
    data: Vec<u8>,
    offsets: FxHashMap<Vec<u8>, u32>,
}

impl Default for BlobHeapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobHeapBuilder {
    /// Creates an empty heap containing only the reserved zero byte.
    #[must_use]
    pub fn new() -> Self {
        BlobHeapBuilder {
            data: vec![0],
            offsets: FxHashMap::default(),
        }
    }

    /// Seeds the heap with the raw `#Blob` content of a source module.
    ///
    /// Entries are walked so re-adding preserved content returns its
    /// original offset; new blobs append beyond the original end.
    ///
    /// # Errors
    /// Returns [`Error::MalformedHeap`] if the data is empty, does not start
    /// with the reserved zero byte, or an entry's length prefix runs past
    /// the end of the heap.
    pub fn from_existing(raw: &[u8]) -> Result<Self> {
        if raw.is_empty() || raw[0] != 0 {
            return Err(Error::MalformedHeap(
                "#Blob does not start with the reserved zero byte".into(),
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
                    "#Blob entry at {entry_start} overruns the heap"
                )));
            }
            #[allow(clippy::cast_possible_truncation)]
            offsets
                .entry(raw[position..position + length].to_vec())
                .or_insert(entry_start as u32);
            position += length;
        }

        Ok(BlobHeapBuilder {
            data: raw.to_vec(),
            offsets,
        })
    }

    /// Adds a blob and returns its heap offset.
    ///
    /// The empty blob maps to offset 0 without touching the heap.
    pub fn add(&mut self, content: &[u8]) -> u32 {
        if content.is_empty() {
            return 0;
        }
        if let Some(&offset) = self.offsets.get(content) {
            return offset;
        }

        #[allow(clippy::cast_possible_truncation)]
        let offset = self.data.len() as u32;
        #[allow(clippy::cast_possible_truncation)]
        write_compressed_uint(content.len() as u32, &mut self.data);
        self.data.extend_from_slice(content);
        self.offsets.insert(content.to_vec(), offset);
        offset
    }

    /// Adds an optional blob; `None` maps to offset 0.
    pub fn add_optional(&mut self, content: Option<&[u8]>) -> u32 {
        match content {
            Some(content) => self.add(content),
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
