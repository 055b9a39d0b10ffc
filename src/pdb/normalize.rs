//! PDB raw dict → canonical data dictionary.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::NormalizeError;
use crate::format::Format;
use crate::options::ReadOptions;
use crate::types::residue::is_water;
use crate::types::{
    classify_residue, residue_id, sequence_from_names, Assembly, Atom, DataDict, Date, Ligand,
    Model, Partition, Polymer, Residue, Transformation, IDENTITY,
};

use super::records::{field, keyword, PdbDict};

const FORMAT: Format = Format::Fixed;

/// Map a PDB raw dict onto the canonical schema.
pub fn normalize(dict: &PdbDict, options: &ReadOptions) -> Result<DataDict, NormalizeError> {
    let mut data = DataDict::default();

    if let Some(header) = dict.record("HEADER").first() {
        let d = &mut data.description;
        d.classification = non_empty(field(header, 10, 50));
        d.deposition_date = Date::parse_pdb(field(header, 50, 59), options.reference_year());
        d.code = non_empty(field(header, 62, 66));
    }
    let d = &mut data.description;
    d.title = non_empty(&joined(dict.record("TITLE")));
    d.keywords = split_list(&joined(dict.record("KEYWDS")));
    d.authors = split_list(&joined(dict.record("AUTHOR")));

    let e = &mut data.experiment;
    e.technique = non_empty(&joined(dict.record("EXPDTA")));
    let source = joined(dict.record("SOURCE"));
    e.source_organism = source_value(&source, "ORGANISM_SCIENTIFIC:");
    e.expression_system = source_value(&source, "EXPRESSION_SYSTEM:");

    let q = &mut data.quality;
    q.resolution = resolution(dict.remark("2"));
    let refinement = remark_text(dict.remark("3"));
    q.rvalue = labelled_number(&refinement, "R VALUE (WORKING SET) :")
        .or_else(|| labelled_number(&refinement, "R VALUE (WORKING + TEST SET) :"));
    q.rfree = labelled_number(&refinement, "FREE R VALUE :");

    let sequences = sequences(dict.record("SEQRES"));
    data.models = dict
        .models
        .iter()
        .enumerate()
        .map(|(index, lines)| model(index + 1, lines, &sequences))
        .collect::<Result<_, _>>()?;

    data.geometry.assemblies = assemblies(dict.remark("350"))?;
    if data.geometry.assemblies.is_empty() {
        let implicit = Assembly::implicit(data.models.first());
        data.geometry.assemblies.push(implicit);
    }
    Ok(data)
}

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Columns 11-80 of each line, trimmed and joined with single spaces.
fn joined(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| field(line, 10, 80).trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The value after `label` in a joined `SOURCE` record, up to the next `;`.
fn source_value(source: &str, label: &str) -> Option<String> {
    let start = source.find(label)? + label.len();
    let rest = &source[start..];
    let value = rest.split(';').next().unwrap_or_default();
    non_empty(&collapse_whitespace(value))
}

/// Remark bodies (columns 12 onwards) with runs of blanks collapsed.
fn remark_text(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|line| collapse_whitespace(field(line, 11, 80)))
        .filter(|s| !s.is_empty())
        .collect()
}

/// The first number following `label` at the start of a remark line.
fn labelled_number(lines: &[String], label: &str) -> Option<f64> {
    lines.iter().find_map(|line| {
        let rest = line.strip_prefix(label)?;
        rest.split_whitespace().next()?.parse().ok()
    })
}

fn resolution(lines: &[String]) -> Option<f64> {
    remark_text(lines).iter().find_map(|line| {
        let rest = line.strip_prefix("RESOLUTION.")?;
        rest.split_whitespace().next()?.parse().ok()
    })
}

// ---------------------------------------------------------------------------
// Assemblies
// ---------------------------------------------------------------------------

fn assemblies(lines: &[String]) -> Result<Vec<Assembly>, NormalizeError> {
    let mut result: Vec<Assembly> = Vec::new();
    let mut chains: Vec<String> = Vec::new();

    for line in remark_text(lines) {
        if let Some(rest) = line.strip_prefix("BIOMOLECULE:") {
            let id = rest.trim().parse().unwrap_or(result.len() as i64 + 1);
            result.push(Assembly::new(id));
            chains.clear();
            continue;
        }
        let Some(assembly) = result.last_mut() else {
            continue;
        };
        if let Some(rest) = line.strip_prefix("SOFTWARE USED:") {
            assembly.software = non_empty(rest);
        } else if let Some(rest) = line.strip_prefix("TOTAL BURIED SURFACE AREA:") {
            assembly.buried_surface_area = leading_number(rest);
        } else if let Some(rest) = line.strip_prefix("SURFACE AREA OF THE COMPLEX:") {
            assembly.surface_area = leading_number(rest);
        } else if let Some(rest) = line.strip_prefix("CHANGE IN SOLVENT FREE ENERGY:") {
            assembly.delta_energy = leading_number(rest);
        } else if let Some(rest) = line.strip_prefix("APPLY THE FOLLOWING TO CHAINS:") {
            chains = split_list(rest);
        } else if let Some(rest) = line.strip_prefix("AND CHAINS:") {
            chains.extend(split_list(rest));
        } else if line.starts_with("BIOMT") {
            biomt_row(assembly, &chains, &line)?;
        }
    }
    Ok(result)
}

fn leading_number(s: &str) -> Option<f64> {
    s.split_whitespace().next()?.parse().ok()
}

/// Apply one `BIOMTn  k  m1 m2 m3  v` row. Row 1 opens a new transformation.
fn biomt_row(assembly: &mut Assembly, chains: &[String], line: &str) -> Result<(), NormalizeError> {
    let mut tokens = line.split_whitespace();
    let label = tokens.next().unwrap_or_default();
    let row = match label.strip_prefix("BIOMT") {
        Some("1") => 0,
        Some("2") => 1,
        Some("3") => 2,
        _ => return Ok(()),
    };
    let values: Vec<&str> = tokens.skip(1).take(4).collect();
    let mut numbers = [0.0; 4];
    for (slot, value) in numbers.iter_mut().zip(values.iter()) {
        *slot = value.parse().map_err(|_| {
            NormalizeError::invalid_number(FORMAT, format!("REMARK 350 {label}"), *value)
        })?;
    }
    if values.len() < 4 {
        return Err(NormalizeError::invalid_number(
            FORMAT,
            format!("REMARK 350 {label}"),
            line,
        ));
    }

    if row == 0 || assembly.transformations.is_empty() {
        assembly
            .transformations
            .push(Transformation::new(chains.iter().cloned(), IDENTITY, [0.0; 3]));
    }
    if let Some(t) = assembly.transformations.last_mut() {
        t.matrix[row] = [numbers[0], numbers[1], numbers[2]];
        t.vector[row] = numbers[3];
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// Chain id → one-letter sequence from `SEQRES`.
fn sequences(lines: &[String]) -> HashMap<String, String> {
    let mut names: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for line in lines {
        let chain = field(line, 11, 12).trim().to_string();
        let residues = field(line, 19, 80).split_whitespace().map(String::from);
        names.entry(chain).or_default().extend(residues);
    }
    names
        .into_iter()
        .map(|(chain, residues)| {
            let seq = sequence_from_names(residues.iter().map(String::as_str));
            (chain, seq)
        })
        .collect()
}

/// `2+` → 2.0, `1-` → -1.0, blank → 0.0.
fn parse_charge(s: &str) -> f64 {
    let s = s.trim();
    let magnitude: f64 = s
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .unwrap_or(0.0);
    if s.contains('-') {
        -magnitude
    } else {
        magnitude
    }
}

fn required_number<T: std::str::FromStr>(
    line: &str,
    start: usize,
    end: usize,
    name: &str,
) -> Result<T, NormalizeError> {
    let value = field(line, start, end).trim();
    value
        .parse()
        .map_err(|_| NormalizeError::invalid_number(FORMAT, name, value))
}

fn optional_number(line: &str, start: usize, end: usize) -> Option<f64> {
    field(line, start, end).trim().parse().ok()
}

/// Atom serial → U11, U22, U33, U12, U13, U23 from `ANISOU` records.
fn anisotropy(lines: &[String]) -> Result<HashMap<i64, [f64; 6]>, NormalizeError> {
    let mut result = HashMap::new();
    for line in lines.iter().filter(|l| keyword(l) == "ANISOU") {
        let serial: i64 = required_number(line, 6, 11, "ANISOU serial")?;
        let mut u = [0.0; 6];
        for (i, slot) in u.iter_mut().enumerate() {
            let start = 28 + i * 7;
            *slot = optional_number(line, start, start + 7).unwrap_or(0.0) / 10000.0;
        }
        result.insert(serial, u);
    }
    Ok(result)
}

fn model(
    number: usize,
    lines: &[String],
    sequences: &HashMap<String, String>,
) -> Result<Model, NormalizeError> {
    let anisotropy = anisotropy(lines)?;
    let last_ter = lines.iter().rposition(|l| keyword(l) == "TER");
    let mut model = Model::default();
    let mut seen_ids = HashSet::new();

    for (position, line) in lines.iter().enumerate() {
        if !matches!(keyword(line), "ATOM" | "HETATM") {
            continue;
        }
        let id: i64 = required_number(line, 6, 11, "atom serial")?;
        if !seen_ids.insert(id) {
            return Err(NormalizeError::DuplicateAtomId {
                format: FORMAT,
                model: number,
                id,
            });
        }

        let alt_loc = field(line, 16, 17).trim();
        let atom = Atom {
            element: field(line, 76, 78).trim().to_string(),
            name: field(line, 12, 16).trim().to_string(),
            x: required_number(line, 30, 38, "x")?,
            y: required_number(line, 38, 46, "y")?,
            z: required_number(line, 46, 54, "z")?,
            bvalue: optional_number(line, 60, 66).unwrap_or(0.0),
            charge: parse_charge(field(line, 78, 80)),
            occupancy: optional_number(line, 54, 60).unwrap_or(1.0),
            alt_loc: (!alt_loc.is_empty()).then(|| alt_loc.to_string()),
            anisotropy: anisotropy.get(&id).copied().unwrap_or([0.0; 6]),
        };

        let name = field(line, 17, 20).trim().to_string();
        let chain = field(line, 21, 22).trim().to_string();
        let key = residue_id(&chain, field(line, 22, 26), field(line, 26, 27));

        let partition = if is_water(&name) {
            Partition::Water
        } else {
            match last_ter {
                Some(ter) if position < ter => Partition::Polymer,
                Some(_) => Partition::NonPolymer,
                None => classify_residue(&name),
            }
        };

        match partition {
            Partition::Polymer => {
                let polymer = model.polymer.entry(chain.clone()).or_insert_with(|| Polymer {
                    sequence: sequences.get(&chain).cloned().unwrap_or_default(),
                    ..Polymer::new(chain.clone())
                });
                polymer
                    .residues
                    .entry(key)
                    .or_insert_with(|| Residue {
                        name,
                        atoms: BTreeMap::new(),
                    })
                    .atoms
                    .insert(id, atom);
            }
            Partition::NonPolymer | Partition::Water => {
                let target = match partition {
                    Partition::Water => &mut model.water,
                    _ => &mut model.non_polymer,
                };
                target
                    .entry(key)
                    .or_insert_with(|| Ligand {
                        name,
                        internal_id: chain.clone(),
                        polymer: chain,
                        atoms: BTreeMap::new(),
                    })
                    .atoms
                    .insert(id, atom);
            }
        }
    }
    Ok(model)
}
