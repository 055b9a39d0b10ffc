//! MMTF raw dict → canonical data dictionary.

use std::collections::{BTreeMap, HashSet};

use crate::error::NormalizeError;
use crate::format::Format;
use crate::options::ReadOptions;
use crate::types::{
    classify_residue, residue_id, Assembly, Atom, DataDict, Date, Ligand, Model, Partition,
    Polymer, Residue, Transformation,
};

use super::envelope::{BinaryDict, Value};

const FORMAT: Format = Format::Binary;

/// Map an MMTF raw dict onto the canonical schema.
///
/// The reference year is unused: MMTF dates are always four-digit ISO dates.
pub fn normalize(dict: &BinaryDict, _options: &ReadOptions) -> Result<DataDict, NormalizeError> {
    let mut data = DataDict::default();

    data.description.code = string(dict, "structureId");
    data.description.title = string(dict, "title");
    data.description.deposition_date = dict
        .field("depositionDate")
        .and_then(Value::as_str)
        .and_then(Date::parse_iso);

    data.experiment.technique = dict
        .field("experimentalMethods")
        .and_then(Value::to_strings)
        .and_then(|methods| methods.into_iter().next());

    data.quality.resolution = number(dict, "resolution");
    data.quality.rvalue = number(dict, "rWork");
    data.quality.rfree = number(dict, "rFree");

    let chain_ids = strings(dict, "chainIdList");
    data.geometry.assemblies = assemblies(dict, &chain_ids)?;
    data.models = models(dict, &chain_ids)?;
    Ok(data)
}

fn string(dict: &BinaryDict, key: &str) -> Option<String> {
    dict.field(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn number(dict: &BinaryDict, key: &str) -> Option<f64> {
    dict.field(key).and_then(Value::as_f64)
}

fn strings(dict: &BinaryDict, key: &str) -> Vec<String> {
    dict.field(key).and_then(Value::to_strings).unwrap_or_default()
}

fn ints(dict: &BinaryDict, key: &str) -> Vec<i64> {
    dict.field(key).and_then(Value::to_ints).unwrap_or_default()
}

fn floats(dict: &BinaryDict, key: &str) -> Vec<f64> {
    dict.field(key).and_then(Value::to_floats).unwrap_or_default()
}

fn index(i: i64) -> usize {
    usize::try_from(i).unwrap_or(usize::MAX)
}

fn at<'a, T>(list: &'a [T], i: usize, kind: &'static str) -> Result<&'a T, NormalizeError> {
    list.get(i).ok_or_else(|| NormalizeError::dangling(FORMAT, kind, i))
}

// ---------------------------------------------------------------------------
// Assemblies
// ---------------------------------------------------------------------------

fn assemblies(dict: &BinaryDict, chain_ids: &[String]) -> Result<Vec<Assembly>, NormalizeError> {
    let Some(list) = dict.field("bioAssemblyList").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    let mut result = Vec::with_capacity(list.len());
    for (position, entry) in list.iter().enumerate() {
        let id = entry
            .get("name")
            .and_then(|n| match n {
                Value::Str(s) => s.trim().parse().ok(),
                other => other.as_i64(),
            })
            .unwrap_or(position as i64 + 1);
        let mut assembly = Assembly::new(id);
        let transforms = entry
            .get("transformList")
            .and_then(Value::as_array)
            .unwrap_or_default();
        for transform in transforms {
            let chains = transform
                .get("chainIndexList")
                .and_then(Value::to_ints)
                .unwrap_or_default()
                .into_iter()
                .map(|i| at(chain_ids, index(i), "chain index").cloned())
                .collect::<Result<Vec<_>, _>>()?;
            let m = transform
                .get("matrix")
                .and_then(Value::to_floats)
                .unwrap_or_default();
            let transformation = if m.len() >= 12 {
                Transformation::new(
                    chains,
                    [
                        [m[0], m[1], m[2]],
                        [m[4], m[5], m[6]],
                        [m[8], m[9], m[10]],
                    ],
                    [m[3], m[7], m[11]],
                )
            } else {
                Transformation::identity(chains)
            };
            assembly.transformations.push(transformation);
        }
        result.push(assembly);
    }
    Ok(result)
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// One entry of `groupList`: the atoms a residue type is made of.
struct GroupType {
    name: String,
    atom_names: Vec<String>,
    elements: Vec<String>,
    charges: Vec<i64>,
}

impl GroupType {
    fn from_value(v: &Value) -> Self {
        let list = |key: &str| v.get(key).and_then(Value::to_strings).unwrap_or_default();
        Self {
            name: v
                .get("groupName")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            atom_names: list("atomNameList"),
            elements: list("elementList"),
            charges: v
                .get("formalChargeList")
                .and_then(Value::to_ints)
                .unwrap_or_default(),
        }
    }
}

/// Chain type and declared sequence from `entityList`.
struct Entity {
    chains: Vec<usize>,
    partition: Partition,
    sequence: String,
}

fn entities(dict: &BinaryDict) -> Vec<Entity> {
    let Some(list) = dict.field("entityList").and_then(Value::as_array) else {
        return Vec::new();
    };
    list.iter()
        .map(|e| Entity {
            chains: e
                .get("chainIndexList")
                .and_then(Value::to_ints)
                .unwrap_or_default()
                .into_iter()
                .map(index)
                .collect(),
            partition: e
                .get("type")
                .and_then(Value::as_str)
                .map(Partition::from_entity_type)
                .unwrap_or(Partition::NonPolymer),
            sequence: e
                .get("sequence")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
        .collect()
}

/// Per-atom columns, consumed in order across the whole structure.
struct AtomColumns {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
    bvalue: Vec<f64>,
    occupancy: Vec<f64>,
    alt_loc: Vec<String>,
    ids: Vec<i64>,
}

impl AtomColumns {
    fn from_dict(dict: &BinaryDict) -> Self {
        Self {
            x: floats(dict, "xCoordList"),
            y: floats(dict, "yCoordList"),
            z: floats(dict, "zCoordList"),
            bvalue: floats(dict, "bFactorList"),
            occupancy: floats(dict, "occupancyList"),
            alt_loc: strings(dict, "altLocList"),
            ids: ints(dict, "atomIdList"),
        }
    }

    /// The atom at position `i`. Coordinates are required; the other
    /// columns fall back to defaults when the list is absent.
    fn atom(&self, i: usize, group: &GroupType, slot: usize) -> Result<(i64, Atom), NormalizeError> {
        let id = if self.ids.is_empty() {
            i as i64 + 1
        } else {
            *at(&self.ids, i, "atom")?
        };
        let alt_loc = self
            .alt_loc
            .get(i)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(String::from);
        let atom = Atom {
            element: group.elements.get(slot).cloned().unwrap_or_default(),
            name: group.atom_names.get(slot).cloned().unwrap_or_default(),
            x: *at(&self.x, i, "atom")?,
            y: *at(&self.y, i, "atom")?,
            z: *at(&self.z, i, "atom")?,
            bvalue: self.bvalue.get(i).copied().unwrap_or(0.0),
            charge: group.charges.get(slot).copied().unwrap_or(0) as f64,
            occupancy: self.occupancy.get(i).copied().unwrap_or(1.0),
            alt_loc,
            anisotropy: [0.0; 6],
        };
        Ok((id, atom))
    }
}

fn models(dict: &BinaryDict, chain_ids: &[String]) -> Result<Vec<Model>, NormalizeError> {
    let chain_names = strings(dict, "chainNameList");
    let chains_per_model = ints(dict, "chainsPerModel");
    let groups_per_chain = ints(dict, "groupsPerChain");
    let group_types = ints(dict, "groupTypeList");
    let group_numbers = ints(dict, "groupIdList");
    let insertion_codes = strings(dict, "insCodeList");
    let group_list: Vec<GroupType> = dict
        .field("groupList")
        .and_then(Value::as_array)
        .unwrap_or_default()
        .iter()
        .map(GroupType::from_value)
        .collect();
    let entities = entities(dict);
    let columns = AtomColumns::from_dict(dict);

    let mut chain_index = 0usize;
    let mut group_index = 0usize;
    let mut atom_index = 0usize;
    let mut models = Vec::with_capacity(chains_per_model.len());

    for (model_number, &chain_count) in chains_per_model.iter().enumerate() {
        let mut model = Model::default();
        let mut seen_ids = HashSet::new();

        for _ in 0..index(chain_count) {
            let internal_id = at(chain_ids, chain_index, "chain")?.clone();
            let chain_name = chain_names
                .get(chain_index)
                .cloned()
                .unwrap_or_else(|| internal_id.clone());
            let entity = entities.iter().find(|e| e.chains.contains(&chain_index));
            let group_count = index(*at(&groups_per_chain, chain_index, "chain")?);

            for _ in 0..group_count {
                let group_type = index(*at(&group_types, group_index, "group")?);
                let group = at(&group_list, group_type, "group type")?;
                let number = at(&group_numbers, group_index, "group")?.to_string();
                let insertion = insertion_codes
                    .get(group_index)
                    .map(String::as_str)
                    .unwrap_or_default();
                let id = residue_id(&chain_name, &number, insertion);

                let mut atoms = BTreeMap::new();
                for slot in 0..group.atom_names.len() {
                    let (atom_id, atom) = columns.atom(atom_index, group, slot)?;
                    if !seen_ids.insert(atom_id) {
                        return Err(NormalizeError::DuplicateAtomId {
                            format: FORMAT,
                            model: model_number + 1,
                            id: atom_id,
                        });
                    }
                    atoms.insert(atom_id, atom);
                    atom_index += 1;
                }

                let partition = entity
                    .map(|e| e.partition)
                    .unwrap_or_else(|| classify_residue(&group.name));
                match partition {
                    Partition::Polymer => {
                        let polymer = model
                            .polymer
                            .entry(chain_name.clone())
                            .or_insert_with(|| Polymer {
                                sequence: entity.map(|e| e.sequence.clone()).unwrap_or_default(),
                                ..Polymer::new(internal_id.clone())
                            });
                        polymer.residues.insert(
                            id,
                            Residue {
                                name: group.name.clone(),
                                atoms,
                            },
                        );
                    }
                    Partition::NonPolymer | Partition::Water => {
                        let ligand = Ligand {
                            name: group.name.clone(),
                            internal_id: internal_id.clone(),
                            polymer: chain_name.clone(),
                            atoms,
                        };
                        let target = match partition {
                            Partition::Water => &mut model.water,
                            _ => &mut model.non_polymer,
                        };
                        target.insert(id, ligand);
                    }
                }
                group_index += 1;
            }
            chain_index += 1;
        }
        models.push(model);
    }
    Ok(models)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmtf::envelope::Value as V;

    fn s(v: &str) -> V {
        V::Str(v.to_string())
    }

    fn map(pairs: Vec<(&str, V)>) -> V {
        V::Map(pairs.into_iter().map(|(k, v)| (s(k), v)).collect())
    }

    fn strs(v: &[&str]) -> V {
        V::Strings(v.iter().map(|x| x.to_string()).collect())
    }

    fn group(name: &str, atoms: &[&str], elements: &[&str]) -> V {
        map(vec![
            ("groupName", s(name)),
            ("atomNameList", V::Array(atoms.iter().map(|a| s(a)).collect())),
            ("elementList", V::Array(elements.iter().map(|e| s(e)).collect())),
            (
                "formalChargeList",
                V::Array(atoms.iter().map(|_| V::Int(0)).collect()),
            ),
        ])
    }

    /// Chain A: MET (2 atoms) + ligand XMP; chain B: one water; one model.
    fn fixture() -> BinaryDict {
        let entries = vec![
            ("structureId", s("1ABC")),
            ("title", s("A SMALL STRUCTURE")),
            ("depositionDate", s("2002-05-06")),
            ("experimentalMethods", V::Array(vec![s("X-RAY DIFFRACTION")])),
            ("resolution", V::Float(1.9)),
            ("rWork", V::Float(0.193)),
            ("rFree", V::Nil),
            ("chainIdList", strs(&["A", "B", "C"])),
            ("chainNameList", strs(&["A", "A", "A"])),
            ("chainsPerModel", V::Array(vec![V::Uint(3)])),
            ("groupsPerChain", V::Ints(vec![1, 1, 1])),
            ("groupTypeList", V::Ints(vec![0, 1, 2])),
            ("groupIdList", V::Ints(vec![1, 5000, 3001])),
            ("insCodeList", strs(&["", "", ""])),
            (
                "groupList",
                V::Array(vec![
                    group("MET", &["N", "CA"], &["N", "C"]),
                    group("XMP", &["P"], &["P"]),
                    group("HOH", &["O"], &["O"]),
                ]),
            ),
            ("xCoordList", V::Floats(vec![1.0, 2.0, 3.0, 4.0])),
            ("yCoordList", V::Floats(vec![5.0, 6.0, 7.0, 8.0])),
            ("zCoordList", V::Floats(vec![9.0, 10.0, 11.0, 12.0])),
            ("bFactorList", V::Floats(vec![10.5, 11.0, 12.0, 13.0])),
            ("occupancyList", V::Floats(vec![1.0, 0.5, 1.0, 1.0])),
            ("altLocList", strs(&["", "A", "", ""])),
            ("atomIdList", V::Ints(vec![1, 2, 3, 4])),
            (
                "entityList",
                V::Array(vec![
                    map(vec![
                        ("chainIndexList", V::Array(vec![V::Uint(0)])),
                        ("type", s("polymer")),
                        ("sequence", s("MKV")),
                    ]),
                    map(vec![
                        ("chainIndexList", V::Array(vec![V::Uint(1)])),
                        ("type", s("non-polymer")),
                    ]),
                    map(vec![
                        ("chainIndexList", V::Array(vec![V::Uint(2)])),
                        ("type", s("water")),
                    ]),
                ]),
            ),
        ];
        BinaryDict {
            entries: entries.into_iter().map(|(k, v)| (s(k), v)).collect(),
        }
    }

    fn set(dict: &mut BinaryDict, key: &str, value: V) {
        match dict.entries.iter_mut().find(|(k, _)| k.as_str() == Some(key)) {
            Some(entry) => entry.1 = value,
            None => dict.entries.push((s(key), value)),
        }
    }

    #[test]
    fn metadata() {
        let data = normalize(&fixture(), &ReadOptions::new()).unwrap();
        assert_eq!(data.description.code.as_deref(), Some("1ABC"));
        assert_eq!(
            data.description.deposition_date,
            Date::from_ymd_opt(2002, 5, 6)
        );
        assert_eq!(data.description.classification, None);
        assert!(data.description.keywords.is_empty());
        assert_eq!(data.experiment.technique.as_deref(), Some("X-RAY DIFFRACTION"));
        assert_eq!(data.experiment.source_organism, None);
        assert_eq!(data.quality.resolution, Some(1.9));
        assert_eq!(data.quality.rvalue, Some(0.193));
        assert_eq!(data.quality.rfree, None);
        // No bioAssemblyList: nothing synthesized
        assert!(data.geometry.assemblies.is_empty());
    }

    #[test]
    fn partitions_and_atoms() {
        let data = normalize(&fixture(), &ReadOptions::new()).unwrap();
        assert_eq!(data.models.len(), 1);
        let model = &data.models[0];

        let chain = &model.polymer["A"];
        assert_eq!(chain.internal_id, "A");
        assert_eq!(chain.sequence, "MKV");
        let met = &chain.residues["A.1"];
        assert_eq!(met.name, "MET");
        assert_eq!(met.atoms[&2].name, "CA");
        assert_eq!(met.atoms[&2].element, "C");
        assert_eq!(met.atoms[&2].occupancy, 0.5);
        assert_eq!(met.atoms[&2].alt_loc.as_deref(), Some("A"));
        assert_eq!(met.atoms[&1].alt_loc, None);
        assert_eq!((met.atoms[&1].x, met.atoms[&1].y, met.atoms[&1].z), (1.0, 5.0, 9.0));

        let ligand = &model.non_polymer["A.5000"];
        assert_eq!(ligand.name, "XMP");
        assert_eq!(ligand.internal_id, "B");
        assert_eq!(ligand.polymer, "A");
        assert_eq!(ligand.atoms[&3].bvalue, 12.0);

        let water = &model.water["A.3001"];
        assert_eq!(water.internal_id, "C");
        assert_eq!(model.atom_count(), 4);
        assert_eq!(model.residue_count(), 1);
    }

    #[test]
    fn assemblies_from_transform_list() {
        let mut dict = fixture();
        let matrix: Vec<V> = [
            0.0, -1.0, 0.0, 10.0, //
            1.0, 0.0, 0.0, 20.0, //
            0.0, 0.0, 1.0, 30.0, //
            0.0, 0.0, 0.0, 1.0,
        ]
        .iter()
        .map(|&f| V::Float(f))
        .collect();
        set(
            &mut dict,
            "bioAssemblyList",
            V::Array(vec![map(vec![
                ("name", s("1")),
                (
                    "transformList",
                    V::Array(vec![map(vec![
                        ("chainIndexList", V::Array(vec![V::Uint(0), V::Uint(1), V::Uint(0)])),
                        ("matrix", V::Array(matrix)),
                    ])]),
                ),
            ])]),
        );
        let data = normalize(&dict, &ReadOptions::new()).unwrap();
        let assembly = &data.geometry.assemblies[0];
        assert_eq!(assembly.id, 1);
        assert_eq!(assembly.software, None);
        let t = &assembly.transformations[0];
        assert_eq!(t.chains, ["A", "B"]);
        assert_eq!(t.matrix, [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
        assert_eq!(t.vector, [10.0, 20.0, 30.0]);
    }

    #[test]
    fn multiple_models() {
        let mut dict = fixture();
        set(&mut dict, "chainIdList", strs(&["A", "A"]));
        set(&mut dict, "chainNameList", strs(&["A", "A"]));
        set(&mut dict, "chainsPerModel", V::Ints(vec![1, 1]));
        set(&mut dict, "groupsPerChain", V::Ints(vec![1, 1]));
        set(&mut dict, "groupTypeList", V::Ints(vec![0, 0]));
        set(&mut dict, "groupIdList", V::Ints(vec![1, 1]));
        set(&mut dict, "insCodeList", strs(&["", ""]));
        set(&mut dict, "entityList", V::Nil);
        // Same atom ids in both models are fine
        set(&mut dict, "atomIdList", V::Ints(vec![1, 2, 1, 2]));
        let data = normalize(&dict, &ReadOptions::new()).unwrap();
        assert_eq!(data.models.len(), 2);
        // No entity list: MET is recognised by name
        assert_eq!(data.models[1].polymer["A"].residues["A.1"].atoms[&1].x, 3.0);
        assert_eq!(data.models[1].polymer["A"].sequence, "");
    }

    #[test]
    fn integrity_errors() {
        let mut dict = fixture();
        set(&mut dict, "groupTypeList", V::Ints(vec![0, 1, 9]));
        let err = normalize(&dict, &ReadOptions::new()).unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::DanglingReference { kind: "group type", .. }
        ));
        assert!(err.is_integrity_error());

        let mut dict = fixture();
        set(&mut dict, "xCoordList", V::Floats(vec![1.0, 2.0]));
        assert!(matches!(
            normalize(&dict, &ReadOptions::new()),
            Err(NormalizeError::DanglingReference { kind: "atom", .. })
        ));

        let mut dict = fixture();
        set(&mut dict, "atomIdList", V::Ints(vec![1, 2, 2, 4]));
        assert!(matches!(
            normalize(&dict, &ReadOptions::new()),
            Err(NormalizeError::DuplicateAtomId { model: 1, id: 2, .. })
        ));

        let mut dict = fixture();
        set(&mut dict, "chainsPerModel", V::Ints(vec![4]));
        assert!(matches!(
            normalize(&dict, &ReadOptions::new()),
            Err(NormalizeError::DanglingReference { kind: "chain", .. })
        ));
    }

    #[test]
    fn empty_dict() {
        let data = normalize(&BinaryDict::default(), &ReadOptions::new()).unwrap();
        assert_eq!(data, DataDict::default());
    }
}
