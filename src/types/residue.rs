//! Residue-name tables and partition classification.
//!
//! Provides:
//! - `Partition`: which part of a model (polymer, non-polymer, water) a residue belongs to
//! - `Partition::from_entity_type()`: explicit classification from an entity type string
//! - `classify_residue()`: fallback classification from a residue name alone
//! - `one_letter_code()`: residue name to one-letter sequence code

/// The three partitions of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Polymer,
    NonPolymer,
    Water,
}

impl Partition {
    /// Map an explicit entity type (`entity.type` in mmCIF, `entityList[].type`
    /// in MMTF) onto a partition.
    ///
    /// `polymer` and `branched` entities are polymers, `water` is water, and
    /// everything else (`non-polymer`, `macrolide`, ...) is a non-polymer.
    pub fn from_entity_type(kind: &str) -> Self {
        match kind.trim().to_ascii_lowercase().as_str() {
            "polymer" | "branched" => Partition::Polymer,
            "water" => Partition::Water,
            _ => Partition::NonPolymer,
        }
    }
}

/// Amino acids, including the common non-standard but polymer-forming ones.
const PROTEIN_RESIDUES: &[(&str, char)] = &[
    ("ALA", 'A'),
    ("ARG", 'R'),
    ("ASN", 'N'),
    ("ASP", 'D'),
    ("CYS", 'C'),
    ("GLN", 'Q'),
    ("GLU", 'E'),
    ("GLY", 'G'),
    ("HIS", 'H'),
    ("ILE", 'I'),
    ("LEU", 'L'),
    ("LYS", 'K'),
    ("MET", 'M'),
    ("PHE", 'F'),
    ("PRO", 'P'),
    ("SER", 'S'),
    ("THR", 'T'),
    ("TRP", 'W'),
    ("TYR", 'Y'),
    ("VAL", 'V'),
    // Non-standard but protein-like
    ("MSE", 'M'),
    ("SEC", 'U'),
    ("PYL", 'O'),
    ("UNK", 'X'),
];

/// Standard DNA residue names.
const DNA_RESIDUES: &[(&str, char)] = &[
    ("DA", 'A'),
    ("DC", 'C'),
    ("DG", 'G'),
    ("DT", 'T'),
    ("DU", 'U'),
    ("DI", 'I'),
];

/// Standard RNA residue names.
/// Single-letter names are the mmCIF standard; three-letter variants are
/// legacy PDB conventions.
const RNA_RESIDUES: &[(&str, char)] = &[
    ("A", 'A'),
    ("C", 'C'),
    ("G", 'G'),
    ("U", 'U'),
    ("I", 'I'),
    ("N", 'N'),
    ("ADE", 'A'),
    ("CYT", 'C'),
    ("GUA", 'G'),
    ("URA", 'U'),
];

/// Water residue names.
const WATER_RESIDUES: &[&str] = &["HOH", "WAT", "H2O", "DOD", "D2O"];

fn lookup(table: &[(&str, char)], name: &str) -> Option<char> {
    table
        .iter()
        .find(|(residue, _)| *residue == name)
        .map(|&(_, code)| code)
}

/// One-letter code for a residue name, or `None` for non-standard residues.
pub fn one_letter_code(name: &str) -> Option<char> {
    let name = name.trim();
    lookup(PROTEIN_RESIDUES, name)
        .or_else(|| lookup(DNA_RESIDUES, name))
        .or_else(|| lookup(RNA_RESIDUES, name))
}

/// Whether a residue name is water.
pub fn is_water(name: &str) -> bool {
    WATER_RESIDUES.contains(&name.trim())
}

/// Whether a residue name is a standard polymer building block (amino acid or nucleotide).
pub fn is_polymer_residue(name: &str) -> bool {
    one_letter_code(name).is_some()
}

/// Classify a residue by name alone. Used when the source carries no entity
/// classification.
pub fn classify_residue(name: &str) -> Partition {
    if is_water(name) {
        Partition::Water
    } else if is_polymer_residue(name) {
        Partition::Polymer
    } else {
        Partition::NonPolymer
    }
}

/// Build a sequence string from residue names, `X` for anything non-standard.
pub fn sequence_from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names
        .into_iter()
        .map(|name| one_letter_code(name).unwrap_or('X'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_types() {
        assert_eq!(Partition::from_entity_type("polymer"), Partition::Polymer);
        assert_eq!(Partition::from_entity_type("branched"), Partition::Polymer);
        assert_eq!(Partition::from_entity_type("water"), Partition::Water);
        assert_eq!(Partition::from_entity_type("non-polymer"), Partition::NonPolymer);
        assert_eq!(Partition::from_entity_type("macrolide"), Partition::NonPolymer);
    }

    #[test]
    fn test_classify_by_name() {
        assert_eq!(classify_residue("ALA"), Partition::Polymer);
        assert_eq!(classify_residue("MSE"), Partition::Polymer);
        assert_eq!(classify_residue("DA"), Partition::Polymer);
        assert_eq!(classify_residue("U"), Partition::Polymer);
        assert_eq!(classify_residue("HOH"), Partition::Water);
        assert_eq!(classify_residue(" WAT"), Partition::Water);
        assert_eq!(classify_residue("XMP"), Partition::NonPolymer);
        assert_eq!(classify_residue("ZN"), Partition::NonPolymer);
    }

    #[test]
    fn test_one_letter_codes() {
        assert_eq!(one_letter_code("LEU"), Some('L'));
        assert_eq!(one_letter_code("DG"), Some('G'));
        assert_eq!(one_letter_code("HOH"), None);
        assert_eq!(
            sequence_from_names(["LEU", "ARG", "SER", "XYZ", "DT"]),
            "LRSXT"
        );
    }
}
