//! Format tags and the tagged raw dictionary.

use std::fmt;

use crate::cif::CifDict;
use crate::error::ParseWarning;
use crate::mmtf::BinaryDict;
use crate::pdb::PdbDict;

/// The three supported serialization schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// MMTF: MessagePack envelope with codec-encoded arrays.
    Binary,
    /// mmCIF / PDBx columnar text.
    Columnar,
    /// Legacy fixed-column PDB text.
    Fixed,
}

impl Format {
    pub fn name(self) -> &'static str {
        match self {
            Format::Binary => "MMTF",
            Format::Columnar => "mmCIF",
            Format::Fixed => "PDB",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoder's output, tagged with the format it came from.
#[derive(Debug, Clone)]
pub enum RawDict {
    Binary(BinaryDict),
    Columnar(CifDict),
    Fixed(PdbDict),
}

impl RawDict {
    pub fn format(&self) -> Format {
        match self {
            RawDict::Binary(_) => Format::Binary,
            RawDict::Columnar(_) => Format::Columnar,
            RawDict::Fixed(_) => Format::Fixed,
        }
    }

    /// Recoverable conditions met while decoding.
    pub fn warnings(&self) -> &[ParseWarning] {
        match self {
            RawDict::Binary(_) => &[],
            RawDict::Columnar(d) => &d.warnings,
            RawDict::Fixed(d) => &d.warnings,
        }
    }
}

impl From<BinaryDict> for RawDict {
    fn from(d: BinaryDict) -> Self {
        RawDict::Binary(d)
    }
}

impl From<CifDict> for RawDict {
    fn from(d: CifDict) -> Self {
        RawDict::Columnar(d)
    }
}

impl From<PdbDict> for RawDict {
    fn from(d: PdbDict) -> Self {
        RawDict::Fixed(d)
    }
}
