//! ECMA-335 metadata building blocks: tokens, heaps, tables, signatures,
//! and the input module model.

pub mod heaps;
pub mod model;
pub mod signatures;
pub mod tables;
pub mod token;
