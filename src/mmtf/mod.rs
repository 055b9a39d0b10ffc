//! MMTF (Macromolecular Transmission Format) decoding.
//!
//! MMTF files are a MessagePack map whose large per-atom and per-residue
//! arrays are stored as binary payloads with a codec header. Decoding happens
//! in two stages: [`decode_binary`] turns the envelope into a [`BinaryDict`]
//! with every array already expanded, and [`normalize`] maps that onto the
//! canonical [`DataDict`](crate::DataDict).
//!
//! Reference: https://github.com/rcsb/mmtf/blob/master/spec.md

pub mod codec;
pub mod envelope;
pub mod error;
pub mod normalize;

// Re-export commonly used items
pub use codec::{decode_array, delta_decode, run_length_decode, ArrayData};
pub use envelope::{decode_binary, BinaryDict, Value};
pub use error::MmtfError;
pub use normalize::normalize;
