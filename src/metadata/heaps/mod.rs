//! Builders for the four metadata heaps.
//!
//! Each heap is an append-only byte store with content deduplication:
//! `add` returns a stable offset (or 1-based index for `#GUID`) and adding
//! the same content again returns the prior offset. Offset 0 always means
//! "none"/empty.
//!
//! When token preservation is active, a heap can be seeded with the raw
//! stream bytes of a source module; preserved content then resolves to its
//! original offset and new content appends beyond the original end.

mod blob;
mod guid;
mod strings;
mod userstrings;

pub use blob::BlobHeapBuilder;
pub use guid::GuidHeapBuilder;
pub use strings::StringsHeapBuilder;
pub use userstrings::UserStringsHeapBuilder;
