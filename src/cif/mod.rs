//! mmCIF (PDBx) decoding.
//!
//! Two stages:
//! - [`decode_columnar_text`] tokenizes the text into a [`CifDict`]: the
//!   first data block's categories as tables, plus any parse warnings.
//! - [`normalize`] maps a [`CifDict`] onto the canonical
//!   [`DataDict`](crate::DataDict).
//!
//! ```
//! use molfile_conv::cif::{decode_columnar_text, Value};
//!
//! let dict = decode_columnar_text("data_1LOL\n_entry.id 1LOL\n_refine.ls_d_res_high ?\n")?;
//! assert_eq!(dict.value("entry", "id").and_then(Value::as_str), Some("1LOL"));
//! assert_eq!(dict.value("refine", "ls_d_res_high"), Some(&Value::Unknown));
//! # Ok::<(), molfile_conv::cif::CifParseError>(())
//! ```

pub mod dom;
pub mod normalize;
pub mod parse;

// Raw dict types
pub use dom::{Category, CifDict, ColumnIter, Row, RowIter, Value};

// Parser
pub use parse::{decode_columnar_text, CifParseError};

pub use normalize::normalize;
