//! Metadata table infrastructure: identifiers, coded indices, row schemas,
//! and the typed row store.
//!
//! The writer materializes one [`TableRows`] vector per table inside a
//! [`TablesStore`]; insertion assigns RIDs, [`TablesStore::sort`] applies
//! the ECMA-335 II.22 sort requirements once construction is complete.

mod coded;
mod id;
mod rows;
mod store;

pub use coded::CodedIndexType;
pub use id::TableId;
pub use rows::*;
pub use store::{TableRows, TablesStore};
