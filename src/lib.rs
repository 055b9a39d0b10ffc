//! Read macromolecular structure files (MMTF, mmCIF, PDB) into one
//! format-independent data dictionary.
//!
//! Each format has a decoder producing a raw dict that mirrors the file
//! (`mmtf::decode_binary`, `cif::decode_columnar_text`,
//! `pdb::decode_fixed_text`) and a normalizer mapping that raw dict onto a
//! [`DataDict`]. [`ReadOptions`] chains both steps.
//!
//! ```
//! use molfile_conv::{cif, normalize, RawDict};
//!
//! let raw: RawDict = cif::decode_columnar_text("data_1LOL\n_refine.ls_d_res_high 1.90\n")?.into();
//! let data = normalize(&raw)?;
//! assert_eq!(data.quality.resolution, Some(1.9));
//! assert_eq!(data.models.len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cif;
pub mod error;
pub mod format;
pub mod mmtf;
pub mod ops;
pub mod options;
pub mod pdb;
pub mod types;

// Re-export commonly used items
pub use error::{Error, NormalizeError, ParseWarning};
pub use format::{Format, RawDict};
pub use options::{ReadOptions, StrictnessLevel};
pub use types::{
    Assembly, Atom, DataDict, Date, Description, Experiment, Geometry, Ligand, Model, Polymer,
    Quality, Residue, Transformation,
};

/// Normalize a raw dict with default [`ReadOptions`].
pub fn normalize(raw: &RawDict) -> Result<DataDict, NormalizeError> {
    normalize_with(raw, &ReadOptions::default())
}

/// Normalize a raw dict, dispatching on the format it was decoded from.
pub fn normalize_with(raw: &RawDict, options: &ReadOptions) -> Result<DataDict, NormalizeError> {
    match raw {
        RawDict::Binary(dict) => mmtf::normalize(dict, options),
        RawDict::Columnar(dict) => cif::normalize(dict, options),
        RawDict::Fixed(dict) => pdb::normalize(dict, options),
    }
}
