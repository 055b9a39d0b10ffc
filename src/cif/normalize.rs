//! mmCIF raw dict → canonical data dictionary.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::NormalizeError;
use crate::format::Format;
use crate::ops::Operator;
use crate::options::ReadOptions;
use crate::types::{
    classify_residue, residue_id, sequence_from_names, Assembly, Atom, DataDict, Date, Ligand,
    Model, Partition, Polymer, Residue,
};

use super::dom::{CifDict, Row, Value};

const FORMAT: Format = Format::Columnar;

/// Map an mmCIF raw dict onto the canonical schema.
pub fn normalize(dict: &CifDict, _options: &ReadOptions) -> Result<DataDict, NormalizeError> {
    let mut data = DataDict::default();

    let d = &mut data.description;
    d.code = text(dict, "entry", "id");
    d.title = text(dict, "struct", "title");
    d.deposition_date = text(dict, "pdbx_database_status", "recvd_initial_deposition_date")
        .and_then(|s| Date::parse_iso(&s));
    d.classification = text(dict, "struct_keywords", "pdbx_keywords");
    d.keywords = text(dict, "struct_keywords", "text")
        .map(|s| split_list(&s))
        .unwrap_or_default();
    d.authors = column_text(dict, "audit_author", "name");

    let e = &mut data.experiment;
    e.technique = text(dict, "exptl", "method");
    e.source_organism = first_text(
        dict,
        &[
            ("entity_src_gen", "pdbx_gene_src_scientific_name"),
            ("entity_src_nat", "pdbx_organism_scientific"),
            ("pdbx_entity_src_syn", "organism_scientific"),
        ],
    );
    e.expression_system = first_text(
        dict,
        &[("entity_src_gen", "pdbx_host_org_scientific_name")],
    );

    let q = &mut data.quality;
    q.resolution = number(dict, "refine", "ls_d_res_high")
        .or_else(|| number(dict, "em_3d_reconstruction", "resolution"));
    q.rvalue = number(dict, "refine", "ls_R_factor_R_work")
        .or_else(|| number(dict, "refine", "ls_R_factor_obs"));
    q.rfree = number(dict, "refine", "ls_R_factor_R_free");

    data.models = models(dict)?;
    data.geometry.assemblies = assemblies(dict)?;
    if data.geometry.assemblies.is_empty() {
        let implicit = Assembly::implicit(data.models.first());
        data.geometry.assemblies.push(implicit);
    }
    Ok(data)
}

// ---------------------------------------------------------------------------
// Value helpers
// ---------------------------------------------------------------------------

fn present(v: &Value) -> Option<String> {
    v.as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Multi-line text fields read as one line with single spaces.
fn one_line(s: String) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First-row text of a field; `.`, `?` and blank values are absent.
fn text(dict: &CifDict, category: &str, field: &str) -> Option<String> {
    dict.value(category, field).and_then(present).map(one_line)
}

fn number(dict: &CifDict, category: &str, field: &str) -> Option<f64> {
    dict.value(category, field).and_then(Value::as_f64)
}

/// Every present value of a column, in row order.
fn column_text(dict: &CifDict, category: &str, field: &str) -> Vec<String> {
    dict.category(category)
        .and_then(|c| c.column(field))
        .map(|col| col.filter_map(present).map(one_line).collect())
        .unwrap_or_default()
}

/// The first present value among several candidate columns.
fn first_text(dict: &CifDict, candidates: &[(&str, &str)]) -> Option<String> {
    candidates
        .iter()
        .find_map(|&(category, field)| column_text(dict, category, field).into_iter().next())
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

fn row_text(row: &Row<'_>, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|f| row.get(f).and_then(present))
}

fn required_f64(row: &Row<'_>, field: &str) -> Result<f64, NormalizeError> {
    let value = row.get(field);
    value.and_then(Value::as_f64).ok_or_else(|| {
        NormalizeError::invalid_number(
            FORMAT,
            format!("atom_site.{field}"),
            value.and_then(Value::as_str).unwrap_or("?"),
        )
    })
}

// ---------------------------------------------------------------------------
// Assemblies
// ---------------------------------------------------------------------------

fn operators(dict: &CifDict) -> HashMap<String, Operator> {
    let Some(list) = dict.category("pdbx_struct_oper_list") else {
        return HashMap::new();
    };
    list.rows()
        .filter_map(|row| {
            let id = row.get("id").and_then(present)?;
            let mut matrix = [[0.0; 3]; 3];
            let mut vector = [0.0; 3];
            for i in 0..3 {
                for j in 0..3 {
                    let default = if i == j { 1.0 } else { 0.0 };
                    matrix[i][j] = row
                        .f64(&format!("matrix[{}][{}]", i + 1, j + 1))
                        .unwrap_or(default);
                }
                vector[i] = row.f64(&format!("vector[{}]", i + 1)).unwrap_or(0.0);
            }
            Some((id, Operator::from_rows(matrix, vector)))
        })
        .collect()
}

/// Expand an `oper_expression` such as `1`, `1,2`, `1-60` or
/// `(1-60)(61-88)` into operator products. Each product lists operators
/// left to right; the rightmost is applied first.
fn expand_expression(
    expression: &str,
    operators: &HashMap<String, Operator>,
) -> Result<Vec<Operator>, NormalizeError> {
    let expression: String = expression.chars().filter(|c| !c.is_whitespace()).collect();
    let groups: Vec<&str> = if expression.contains('(') {
        expression
            .split(|c: char| c == '(' || c == ')')
            .filter(|g| !g.is_empty())
            .collect()
    } else {
        vec![expression.as_str()]
    };

    let mut products: Vec<Vec<&Operator>> = vec![Vec::new()];
    for group in groups {
        let members = resolve_group(group, operators)?;
        products = products
            .iter()
            .flat_map(|outer| {
                members.iter().map(move |&inner| {
                    let mut product = outer.clone();
                    product.push(inner);
                    product
                })
            })
            .collect();
    }
    Ok(products
        .iter()
        .map(|product| Operator::compose(product.iter().copied()))
        .collect())
}

fn resolve_group<'a>(
    group: &str,
    operators: &'a HashMap<String, Operator>,
) -> Result<Vec<&'a Operator>, NormalizeError> {
    let lookup = |id: &str| {
        operators
            .get(id)
            .ok_or_else(|| NormalizeError::dangling(FORMAT, "operator", id))
    };
    let mut members = Vec::new();
    for item in group.split(',').filter(|i| !i.is_empty()) {
        let range = item
            .split_once('-')
            .and_then(|(a, b)| Some((a.parse::<i64>().ok()?, b.parse::<i64>().ok()?)));
        match range {
            // Every id in the range must exist, so the expansion is bounded
            // by the operator list.
            Some((start, end)) => {
                for id in start..=end {
                    members.push(lookup(&id.to_string())?);
                }
            }
            None => members.push(lookup(item)?),
        }
    }
    Ok(members)
}

fn assemblies(dict: &CifDict) -> Result<Vec<Assembly>, NormalizeError> {
    let Some(declared) = dict.category("pdbx_struct_assembly") else {
        return Ok(Vec::new());
    };
    let operators = operators(dict);
    let mut result = Vec::with_capacity(declared.nrows());

    for (position, row) in declared.rows().enumerate() {
        let key = row.get("id").and_then(present).unwrap_or_default();
        let mut assembly = Assembly::new(key.parse().unwrap_or(position as i64 + 1));
        assembly.software = row.get("method_details").and_then(present);

        if let Some(props) = dict.category("pdbx_struct_assembly_prop") {
            for prop in props.rows().filter(|p| p.str("biol_id") == Some(key.as_str())) {
                let value = prop.f64("value");
                match prop.str("type").map(str::trim) {
                    Some("MORE") => assembly.delta_energy = value,
                    Some("ABSA (A^2)") => assembly.buried_surface_area = value,
                    Some("SSA (A^2)") => assembly.surface_area = value,
                    _ => {}
                }
            }
        }

        if let Some(gens) = dict.category("pdbx_struct_assembly_gen") {
            for generator in gens.rows().filter(|g| g.str("assembly_id") == Some(key.as_str())) {
                let chains = generator
                    .str("asym_id_list")
                    .map(split_list)
                    .unwrap_or_default();
                let expression = generator.str("oper_expression").unwrap_or_default();
                for op in expand_expression(expression, &operators)? {
                    assembly
                        .transformations
                        .push(op.to_transformation(chains.iter().cloned()));
                }
            }
        }
        result.push(assembly);
    }
    Ok(result)
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// Entity id → partition, from the `entity` table.
fn entity_types(dict: &CifDict) -> Option<HashMap<String, Partition>> {
    let entity = dict.category("entity")?;
    Some(
        entity
            .rows()
            .filter_map(|row| {
                let id = row.get("id").and_then(present)?;
                let kind = row.str("type").unwrap_or_default();
                Some((id, Partition::from_entity_type(kind)))
            })
            .collect(),
    )
}

/// Entity id → declared one-letter sequence.
fn entity_sequences(dict: &CifDict) -> HashMap<String, String> {
    let mut names: BTreeMap<String, Vec<String>> = BTreeMap::new();
    if let Some(seq) = dict.category("entity_poly_seq") {
        for row in seq.rows() {
            let entity = row_text(&row, &["entity_id"]);
            let monomer = row_text(&row, &["mon_id"]);
            if let (Some(entity), Some(monomer)) = (entity, monomer) {
                names.entry(entity).or_default().push(monomer);
            }
        }
    }
    let mut sequences: HashMap<String, String> = names
        .into_iter()
        .map(|(entity, monomers)| {
            let seq = sequence_from_names(monomers.iter().map(String::as_str));
            (entity, seq)
        })
        .collect();

    if let Some(poly) = dict.category("entity_poly") {
        for row in poly.rows() {
            let Some(entity) = row_text(&row, &["entity_id"]) else {
                continue;
            };
            if let Some(code) = row_text(&row, &["pdbx_seq_one_letter_code_can"]) {
                sequences
                    .entry(entity)
                    .or_insert_with(|| code.chars().filter(|c| !c.is_whitespace()).collect());
            }
        }
    }
    sequences
}

/// Atom id → U11, U22, U33, U12, U13, U23.
fn anisotropy(dict: &CifDict) -> HashMap<i64, [f64; 6]> {
    const FIELDS: [&str; 6] = ["U[1][1]", "U[2][2]", "U[3][3]", "U[1][2]", "U[1][3]", "U[2][3]"];
    let Some(aniso) = dict.category("atom_site_anisotrop") else {
        return HashMap::new();
    };
    aniso
        .rows()
        .filter_map(|row| {
            let id = row.get("id")?.as_i64()?;
            let mut u = [0.0; 6];
            for (slot, field) in u.iter_mut().zip(FIELDS) {
                *slot = row.f64(field).unwrap_or(0.0);
            }
            Some((id, u))
        })
        .collect()
}

fn models(dict: &CifDict) -> Result<Vec<Model>, NormalizeError> {
    let Some(atom_site) = dict.category("atom_site") else {
        return Ok(vec![Model::default()]);
    };
    let entity_types = entity_types(dict);
    let sequences = entity_sequences(dict);
    let anisotropy = anisotropy(dict);

    let mut models = Vec::new();
    let mut model = Model::default();
    let mut seen_ids = HashSet::new();
    let mut current_model_num: Option<String> = None;

    for row in atom_site.rows() {
        let model_num = row.get("pdbx_PDB_model_num").and_then(present);
        if current_model_num.is_some() && model_num != current_model_num {
            models.push(std::mem::take(&mut model));
            seen_ids.clear();
        }
        current_model_num = model_num;

        let id_value = row.get("id");
        let id = id_value.and_then(Value::as_i64).ok_or_else(|| {
            NormalizeError::invalid_number(
                FORMAT,
                "atom_site.id",
                id_value.and_then(Value::as_str).unwrap_or("?"),
            )
        })?;
        if !seen_ids.insert(id) {
            return Err(NormalizeError::DuplicateAtomId {
                format: FORMAT,
                model: models.len() + 1,
                id,
            });
        }

        let atom = Atom {
            element: row_text(&row, &["type_symbol"]).unwrap_or_default(),
            name: row_text(&row, &["label_atom_id", "auth_atom_id"]).unwrap_or_default(),
            x: required_f64(&row, "Cartn_x")?,
            y: required_f64(&row, "Cartn_y")?,
            z: required_f64(&row, "Cartn_z")?,
            bvalue: row.f64("B_iso_or_equiv").unwrap_or(0.0),
            charge: row.f64("pdbx_formal_charge").unwrap_or(0.0),
            occupancy: row.f64("occupancy").unwrap_or(1.0),
            alt_loc: row_text(&row, &["label_alt_id"]),
            anisotropy: anisotropy.get(&id).copied().unwrap_or([0.0; 6]),
        };

        let internal_id = row_text(&row, &["label_asym_id"]).unwrap_or_default();
        let chain = row_text(&row, &["auth_asym_id"]).unwrap_or_else(|| internal_id.clone());
        let number = row_text(&row, &["auth_seq_id", "label_seq_id"]).unwrap_or_default();
        let insertion = row_text(&row, &["pdbx_PDB_ins_code"]).unwrap_or_default();
        let name = row_text(&row, &["auth_comp_id", "label_comp_id"]).unwrap_or_default();
        let entity = row_text(&row, &["label_entity_id"]);

        let partition = match (&entity_types, &entity) {
            (Some(types), Some(entity)) => *types
                .get(entity)
                .ok_or_else(|| NormalizeError::dangling(FORMAT, "entity", entity))?,
            _ => classify_residue(&name),
        };

        let key = residue_id(&chain, &number, &insertion);
        match partition {
            Partition::Polymer => {
                let polymer = model.polymer.entry(chain).or_insert_with(|| Polymer {
                    sequence: entity
                        .as_ref()
                        .and_then(|e| sequences.get(e))
                        .cloned()
                        .unwrap_or_default(),
                    ..Polymer::new(internal_id)
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
                        internal_id,
                        polymer: chain,
                        atoms: BTreeMap::new(),
                    })
                    .atoms
                    .insert(id, atom);
            }
        }
    }
    models.push(model);
    Ok(models)
}
