//! The same small structure written as PDB, mmCIF and MMTF must normalize to
//! the same data.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use molfile_conv::{DataDict, Date, Model, ReadOptions};

const PDB: &str = "\
HEADER    TRANSFERASE                             06-MAY-02   1ABC
TITLE     A TWO RESIDUE PEPTIDE
EXPDTA    X-RAY DIFFRACTION
REMARK   2
REMARK   2 RESOLUTION.    1.90 ANGSTROMS.
SEQRES   1 A    2  MET VAL
ATOM      1  N   MET A   1       3.696  33.898  63.219  1.00 21.50           N
ATOM      2  CA  MET A   1       3.198  33.218  61.983  1.00 19.76           C
ATOM      3  N   VAL A   2       4.000  32.000  60.500  1.00 18.00           N
TER       4      VAL A   2
HETATM    4  O   HOH A 101      10.100  -5.250   7.000  1.00 30.00           O
END
";

const CIF: &str = "\
data_1ABC
_entry.id 1ABC
_struct.title 'A TWO RESIDUE PEPTIDE'
_struct_keywords.pdbx_keywords TRANSFERASE
_pdbx_database_status.recvd_initial_deposition_date 2002-05-06
_exptl.method 'X-RAY DIFFRACTION'
_refine.ls_d_res_high 1.90
loop_
_entity.id
_entity.type
1 polymer
2 water
loop_
_entity_poly_seq.entity_id
_entity_poly_seq.num
_entity_poly_seq.mon_id
1 1 MET
1 2 VAL
loop_
_atom_site.group_PDB
_atom_site.id
_atom_site.type_symbol
_atom_site.label_atom_id
_atom_site.label_alt_id
_atom_site.label_comp_id
_atom_site.label_asym_id
_atom_site.label_entity_id
_atom_site.label_seq_id
_atom_site.pdbx_PDB_ins_code
_atom_site.Cartn_x
_atom_site.Cartn_y
_atom_site.Cartn_z
_atom_site.occupancy
_atom_site.B_iso_or_equiv
_atom_site.auth_seq_id
_atom_site.auth_comp_id
_atom_site.auth_asym_id
_atom_site.pdbx_PDB_model_num
ATOM   1 N N  . MET A 1 1 ? 3.696  33.898 63.219 1.00 21.50 1   MET A 1
ATOM   2 C CA . MET A 1 1 ? 3.198  33.218 61.983 1.00 19.76 1   MET A 1
ATOM   3 N N  . VAL A 1 2 ? 4.000  32.000 60.500 1.00 18.00 2   VAL A 1
HETATM 4 O O  . HOH B 2 . ? 10.100 -5.250 7.000  1.00 30.00 101 HOH A 1
";

// ---------------------------------------------------------------------------
// MMTF fixture
// ---------------------------------------------------------------------------

/// A MessagePack map written one key at a time.
#[derive(Default)]
struct Envelope {
    body: Vec<u8>,
    len: u32,
}

impl Envelope {
    fn key(&mut self, key: &str) -> &mut Vec<u8> {
        self.len += 1;
        rmp::encode::write_str(&mut self.body, key).unwrap();
        &mut self.body
    }

    fn finish(self) -> Vec<u8> {
        let mut out = Vec::new();
        rmp::encode::write_map_len(&mut out, self.len).unwrap();
        out.extend(self.body);
        out
    }
}

fn codec_header(codec: i32, length: usize, param: i32) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend(codec.to_be_bytes());
    out.extend((length as i32).to_be_bytes());
    out.extend(param.to_be_bytes());
    out
}

/// Codec 4: plain big-endian `i32`.
fn int_array(values: &[i32]) -> Vec<u8> {
    let mut out = codec_header(4, values.len(), 0);
    for v in values {
        out.extend(v.to_be_bytes());
    }
    out
}

/// Codec 5: fixed-width strings, NUL padded.
fn string_array(values: &[&str], width: usize) -> Vec<u8> {
    let mut out = codec_header(5, values.len(), width as i32);
    for v in values {
        let mut bytes = v.as_bytes().to_vec();
        bytes.resize(width, 0);
        out.extend(bytes);
    }
    out
}

/// Codec 6: run-length encoded character codes.
fn char_array(pairs: &[(char, i32)], length: usize) -> Vec<u8> {
    let mut out = codec_header(6, length, 0);
    for &(c, n) in pairs {
        let code = if c == '\0' { 0 } else { c as i32 };
        out.extend(code.to_be_bytes());
        out.extend(n.to_be_bytes());
    }
    out
}

/// Codec 8: run-length encoded deltas.
fn run_delta_array(pairs: &[(i32, i32)], length: usize) -> Vec<u8> {
    let mut out = codec_header(8, length, 0);
    for &(v, n) in pairs {
        out.extend(v.to_be_bytes());
        out.extend(n.to_be_bytes());
    }
    out
}

/// Codec 10: scaled integers, delta encoded, packed into `i16` by
/// recursive indexing.
fn packed_float_array(values: &[f64], divisor: i32) -> Vec<u8> {
    let mut out = codec_header(10, values.len(), divisor);
    let mut previous = 0i32;
    for v in values {
        let scaled = (v * f64::from(divisor)).round() as i32;
        let mut delta = scaled - previous;
        previous = scaled;
        while delta >= i16::MAX as i32 {
            out.extend(i16::MAX.to_be_bytes());
            delta -= i16::MAX as i32;
        }
        while delta <= i16::MIN as i32 {
            out.extend(i16::MIN.to_be_bytes());
            delta -= i16::MIN as i32;
        }
        out.extend((delta as i16).to_be_bytes());
    }
    out
}

fn group(buf: &mut Vec<u8>, name: &str, atoms: &[(&str, &str)]) {
    rmp::encode::write_map_len(buf, 4).unwrap();
    rmp::encode::write_str(buf, "groupName").unwrap();
    rmp::encode::write_str(buf, name).unwrap();
    rmp::encode::write_str(buf, "atomNameList").unwrap();
    rmp::encode::write_array_len(buf, atoms.len() as u32).unwrap();
    for (atom, _) in atoms {
        rmp::encode::write_str(buf, atom).unwrap();
    }
    rmp::encode::write_str(buf, "elementList").unwrap();
    rmp::encode::write_array_len(buf, atoms.len() as u32).unwrap();
    for (_, element) in atoms {
        rmp::encode::write_str(buf, element).unwrap();
    }
    rmp::encode::write_str(buf, "formalChargeList").unwrap();
    rmp::encode::write_array_len(buf, atoms.len() as u32).unwrap();
    for _ in atoms {
        rmp::encode::write_uint(buf, 0).unwrap();
    }
}

fn entity(buf: &mut Vec<u8>, chain: u64, kind: &str, sequence: &str) {
    rmp::encode::write_map_len(buf, 3).unwrap();
    rmp::encode::write_str(buf, "chainIndexList").unwrap();
    rmp::encode::write_array_len(buf, 1).unwrap();
    rmp::encode::write_uint(buf, chain).unwrap();
    rmp::encode::write_str(buf, "type").unwrap();
    rmp::encode::write_str(buf, kind).unwrap();
    rmp::encode::write_str(buf, "sequence").unwrap();
    rmp::encode::write_str(buf, sequence).unwrap();
}

fn mmtf() -> Vec<u8> {
    use rmp::encode::{write_array_len, write_bin, write_f32, write_str, write_uint};

    let mut env = Envelope::default();
    write_str(env.key("mmtfVersion"), "1.0.0").unwrap();
    write_str(env.key("structureId"), "1ABC").unwrap();
    write_str(env.key("title"), "A TWO RESIDUE PEPTIDE").unwrap();
    write_str(env.key("depositionDate"), "2002-05-06").unwrap();
    let methods = env.key("experimentalMethods");
    write_array_len(methods, 1).unwrap();
    write_str(methods, "X-RAY DIFFRACTION").unwrap();
    write_f32(env.key("resolution"), 1.9).unwrap();

    let assemblies = env.key("bioAssemblyList");
    write_array_len(assemblies, 1).unwrap();
    rmp::encode::write_map_len(assemblies, 2).unwrap();
    write_str(assemblies, "name").unwrap();
    write_str(assemblies, "1").unwrap();
    write_str(assemblies, "transformList").unwrap();
    write_array_len(assemblies, 1).unwrap();
    rmp::encode::write_map_len(assemblies, 2).unwrap();
    write_str(assemblies, "chainIndexList").unwrap();
    write_array_len(assemblies, 2).unwrap();
    write_uint(assemblies, 0).unwrap();
    write_uint(assemblies, 1).unwrap();
    write_str(assemblies, "matrix").unwrap();
    write_array_len(assemblies, 16).unwrap();
    for i in 0..16 {
        let v = if i % 5 == 0 { 1.0 } else { 0.0 };
        write_f32(assemblies, v).unwrap();
    }

    let entities = env.key("entityList");
    write_array_len(entities, 2).unwrap();
    entity(entities, 0, "polymer", "MV");
    entity(entities, 1, "water", "");

    let groups = env.key("groupList");
    write_array_len(groups, 3).unwrap();
    group(groups, "MET", &[("N", "N"), ("CA", "C")]);
    group(groups, "VAL", &[("N", "N")]);
    group(groups, "HOH", &[("O", "O")]);

    let chains = env.key("chainsPerModel");
    write_array_len(chains, 1).unwrap();
    write_uint(chains, 2).unwrap();

    write_bin(env.key("chainIdList"), &string_array(&["A", "B"], 4)).unwrap();
    write_bin(env.key("chainNameList"), &string_array(&["A", "A"], 4)).unwrap();
    write_bin(env.key("groupsPerChain"), &int_array(&[2, 1])).unwrap();
    write_bin(env.key("groupTypeList"), &int_array(&[0, 1, 2])).unwrap();
    write_bin(env.key("groupIdList"), &run_delta_array(&[(1, 2), (99, 1)], 3)).unwrap();
    write_bin(env.key("insCodeList"), &char_array(&[('\0', 3)], 3)).unwrap();
    write_bin(env.key("atomIdList"), &run_delta_array(&[(1, 4)], 4)).unwrap();
    write_bin(env.key("altLocList"), &char_array(&[('\0', 4)], 4)).unwrap();
    let xs = [3.696, 3.198, 4.0, 10.1];
    let ys = [33.898, 33.218, 32.0, -5.25];
    let zs = [63.219, 61.983, 60.5, 7.0];
    write_bin(env.key("xCoordList"), &packed_float_array(&xs, 1000)).unwrap();
    write_bin(env.key("yCoordList"), &packed_float_array(&ys, 1000)).unwrap();
    write_bin(env.key("zCoordList"), &packed_float_array(&zs, 1000)).unwrap();
    let bs = [21.5, 19.76, 18.0, 30.0];
    write_bin(env.key("bFactorList"), &packed_float_array(&bs, 100)).unwrap();
    env.finish()
}

fn all_formats() -> [(&'static str, DataDict); 3] {
    let options = ReadOptions::new();
    [
        ("PDB", options.read_fixed(PDB.lines()).unwrap()),
        ("mmCIF", options.read_columnar(CIF).unwrap()),
        ("MMTF", options.read_binary(&mmtf()).unwrap()),
    ]
}

fn first_model(data: &DataDict) -> &Model {
    &data.models[0]
}

#[test]
fn same_metadata() {
    for (format, data) in all_formats() {
        let d = &data.description;
        assert_eq!(d.code.as_deref(), Some("1ABC"), "{format}");
        assert_eq!(d.title.as_deref(), Some("A TWO RESIDUE PEPTIDE"), "{format}");
        assert_eq!(d.deposition_date, Date::from_ymd_opt(2002, 5, 6), "{format}");
        assert_eq!(
            data.experiment.technique.as_deref(),
            Some("X-RAY DIFFRACTION"),
            "{format}"
        );
        assert_eq!(data.quality.resolution, Some(1.9), "{format}");
        assert_eq!(data.quality.rfree, None, "{format}");
    }
}

#[test]
fn same_atoms() {
    let [(_, reference), rest @ ..] = all_formats();
    let expected = first_model(&reference);
    assert_eq!(expected.atom_count(), 4);
    for (format, data) in rest {
        assert_eq!(data.models.len(), 1, "{format}");
        let model = first_model(&data);

        let chain = &model.polymer["A"];
        let expected_chain = &expected.polymer["A"];
        assert_eq!(chain.internal_id, "A", "{format}");
        assert_eq!(chain.sequence, "MV", "{format}");
        assert_eq!(chain.sequence, expected_chain.sequence, "{format}");
        assert_eq!(
            chain.residues.keys().collect::<Vec<_>>(),
            vec!["A.1", "A.2"],
            "{format}"
        );
        assert_eq!(chain.residues, expected_chain.residues, "{format}");

        let water = &model.water["A.101"];
        assert_eq!(water.name, "HOH", "{format}");
        assert_eq!(water.polymer, "A", "{format}");
        assert_eq!(water.atoms, expected.water["A.101"].atoms, "{format}");
        assert!(model.non_polymer.is_empty(), "{format}");
    }
}

#[test]
fn same_default_assembly_chains() {
    let [(_, pdb), (_, cif), (_, binary)] = all_formats();
    // PDB has no internal chain ids, so every chain is "A".
    assert_eq!(pdb.geometry.assemblies[0].transformations[0].chains, vec!["A"]);
    let implicit = &cif.geometry.assemblies[0];
    let declared = &binary.geometry.assemblies[0];
    assert_eq!(implicit.id, declared.id);
    assert_eq!(implicit.transformations, declared.transformations);
    assert_eq!(declared.transformations[0].chains, vec!["A", "B"]);
}

#[test]
fn gzipped_mmtf_reads_the_same() {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&mmtf()).unwrap();
    let gzipped = encoder.finish().unwrap();
    let options = ReadOptions::new();
    assert_eq!(
        options.read_binary(&gzipped).unwrap(),
        options.read_binary(&mmtf()).unwrap()
    );
}

#[cfg(feature = "serde")]
#[test]
fn serialized_keys() {
    let options = ReadOptions::new();
    let data = options.read_columnar(CIF).unwrap();
    let json = serde_json::to_value(&data).unwrap();
    assert_eq!(json["description"]["deposition_date"], "2002-05-06");
    assert_eq!(json["quality"]["resolution"], 1.9);
    assert!(json["quality"]["rfree"].is_null());
    let model = &json["models"][0];
    assert!(model["non-polymer"].is_object());
    assert_eq!(model["water"]["A.101"]["name"], "HOH");
    assert_eq!(model["polymer"]["A"]["residues"]["A.1"]["atoms"]["1"]["x"], 3.696);
}
