//! Canonical data types shared by every format.

pub mod data;
pub mod date;
pub mod residue;

// Re-export commonly used items
pub use data::{
    residue_id, Assembly, Atom, DataDict, Description, Experiment, Geometry, Ligand, Model,
    Polymer, Quality, Residue, Transformation, IDENTITY,
};
pub use date::Date;
pub use residue::{classify_residue, one_letter_code, sequence_from_names, Partition};
