//! The canonical, format-independent data dictionary.
//!
//! Every normalizer produces a [`DataDict`]; nothing in here knows which file
//! format the data came from. Composite residue ids are `"{chain}.{number}"`
//! strings (with any insertion code appended) and are unique within one
//! model only.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::Serialize;

use super::date::Date;

/// Top-level canonical dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DataDict {
    pub description: Description,
    pub experiment: Experiment,
    pub quality: Quality,
    pub geometry: Geometry,
    pub models: Vec<Model>,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Description {
    pub code: Option<String>,
    pub title: Option<String>,
    pub deposition_date: Option<Date>,
    pub classification: Option<String>,
    pub keywords: Vec<String>,
    pub authors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Experiment {
    pub technique: Option<String>,
    pub source_organism: Option<String>,
    pub expression_system: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Quality {
    pub resolution: Option<f64>,
    pub rvalue: Option<f64>,
    pub rfree: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Geometry {
    pub assemblies: Vec<Assembly>,
}

/// A declared biological assembly.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Assembly {
    pub id: i64,
    pub software: Option<String>,
    pub delta_energy: Option<f64>,
    pub buried_surface_area: Option<f64>,
    pub surface_area: Option<f64>,
    pub transformations: Vec<Transformation>,
}

impl Assembly {
    /// An assembly with no metadata and no transformations yet.
    pub fn new(id: i64) -> Self {
        Self {
            id,
            software: None,
            delta_energy: None,
            buried_surface_area: None,
            surface_area: None,
            transformations: Vec::new(),
        }
    }

    /// The assembly assumed when a structure declares none: id 1, the
    /// identity over every chain of `model`.
    pub fn implicit(model: Option<&Model>) -> Self {
        let chains = model.map(Model::internal_ids).unwrap_or_default();
        Self {
            transformations: vec![Transformation::identity(chains)],
            ..Self::new(1)
        }
    }
}

/// One symmetry operation applied to a set of chains.
///
/// `matrix` is row-major; the transformed position is `matrix * p + vector`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Transformation {
    /// Chain ids in first-seen order, without duplicates.
    pub chains: Vec<String>,
    pub matrix: [[f64; 3]; 3],
    pub vector: [f64; 3],
}

pub const IDENTITY: [[f64; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

impl Transformation {
    /// The identity operation over `chains`.
    pub fn identity<I, S>(chains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(chains, IDENTITY, [0.0; 3])
    }

    /// Build a transformation, dropping repeated chain ids.
    pub fn new<I, S>(chains: I, matrix: [[f64; 3]; 3], vector: [f64; 3]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for chain in chains {
            let chain = chain.into();
            if !unique.contains(&chain) {
                unique.push(chain);
            }
        }
        Self {
            chains: unique,
            matrix,
            vector,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.matrix == IDENTITY && self.vector == [0.0; 3]
    }
}

/// One structural model (an NMR conformer, a trajectory frame, or the sole
/// model of a crystal structure).
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Model {
    pub polymer: BTreeMap<String, Polymer>,
    #[cfg_attr(feature = "serde", serde(rename = "non-polymer"))]
    pub non_polymer: BTreeMap<String, Ligand>,
    pub water: BTreeMap<String, Ligand>,
}

impl Model {
    /// Chain ids seen anywhere in the model, polymer chains first.
    pub fn chain_ids(&self) -> Vec<String> {
        let mut chains: Vec<String> = self.polymer.keys().cloned().collect();
        for ligand in self.non_polymer.values().chain(self.water.values()) {
            if !chains.contains(&ligand.polymer) {
                chains.push(ligand.polymer.clone());
            }
        }
        chains
    }

    /// Internal (label) chain ids, polymer chains first, without duplicates.
    pub fn internal_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        let all = self
            .polymer
            .values()
            .map(|p| &p.internal_id)
            .chain(self.non_polymer.values().map(|l| &l.internal_id))
            .chain(self.water.values().map(|l| &l.internal_id));
        for id in all {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }

    pub fn residue_count(&self) -> usize {
        self.polymer.values().map(|p| p.residues.len()).sum()
    }

    pub fn atom_count(&self) -> usize {
        self.polymer.values().map(Polymer::atom_count).sum::<usize>()
            + self
                .non_polymer
                .values()
                .chain(self.water.values())
                .map(|l| l.atoms.len())
                .sum::<usize>()
    }

    /// Whether any partition already holds an atom with this id.
    pub fn contains_atom(&self, id: i64) -> bool {
        self.polymer
            .values()
            .flat_map(|p| p.residues.values())
            .any(|r| r.atoms.contains_key(&id))
            || self
                .non_polymer
                .values()
                .chain(self.water.values())
                .any(|l| l.atoms.contains_key(&id))
    }
}

/// A polymer chain.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Polymer {
    pub internal_id: String,
    /// The declared sequence, which may be longer than the observed residues.
    pub sequence: String,
    pub residues: BTreeMap<String, Residue>,
}

impl Polymer {
    pub fn new(internal_id: impl Into<String>) -> Self {
        Self {
            internal_id: internal_id.into(),
            sequence: String::new(),
            residues: BTreeMap::new(),
        }
    }

    pub fn atom_count(&self) -> usize {
        self.residues.values().map(|r| r.atoms.len()).sum()
    }

    /// All atoms of the chain, residue by residue.
    pub fn atoms(&self) -> impl Iterator<Item = (&i64, &Atom)> {
        self.residues.values().flat_map(|r| r.atoms.iter())
    }
}

/// A residue inside a polymer chain.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Residue {
    pub name: String,
    pub atoms: BTreeMap<i64, Atom>,
}

/// A non-polymer molecule or a water.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Ligand {
    pub name: String,
    pub internal_id: String,
    /// Chain id of the polymer this molecule is associated with.
    pub polymer: String,
    pub atoms: BTreeMap<i64, Atom>,
}

/// A single atom.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Atom {
    pub element: String,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub bvalue: f64,
    pub charge: f64,
    pub occupancy: f64,
    pub alt_loc: Option<String>,
    /// U11, U22, U33, U12, U13, U23.
    pub anisotropy: [f64; 6],
}

impl Default for Atom {
    fn default() -> Self {
        Self {
            element: String::new(),
            name: String::new(),
            x: 0.0,
            y: 0.0,
            z: 0.0,
            bvalue: 0.0,
            charge: 0.0,
            occupancy: 1.0,
            alt_loc: None,
            anisotropy: [0.0; 6],
        }
    }
}

/// Composite id for a residue or ligand: `"A.11"`, `"B.52A"`.
pub fn residue_id(chain: &str, number: &str, insertion: &str) -> String {
    format!("{}.{}{}", chain.trim(), number.trim(), insertion.trim())
}
