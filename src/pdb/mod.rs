//! Legacy PDB (fixed-column text) decoding.
//!
//! [`decode_fixed_text`] buckets 80-column records into a [`PdbDict`]
//! (header records, remarks by number, coordinate lines by model), and
//! [`normalize`] reads the columns of those records into the canonical
//! [`DataDict`](crate::DataDict).

pub mod normalize;
pub mod records;

pub use normalize::normalize;
pub use records::{decode_fixed_text, PdbDict};
