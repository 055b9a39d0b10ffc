//! PDB raw dict: fixed-format lines bucketed by record type.

use std::collections::BTreeMap;

use crate::error::ParseWarning;

/// Record keywords defined by the PDB format (v3.3). Anything else is ignored.
const KNOWN_RECORDS: &[&str] = &[
    "HEADER", "OBSLTE", "TITLE", "SPLIT", "CAVEAT", "COMPND", "SOURCE", "KEYWDS", "EXPDTA",
    "NUMMDL", "MDLTYP", "AUTHOR", "REVDAT", "SPRSDE", "JRNL", "REMARK", "DBREF", "DBREF1",
    "DBREF2", "SEQADV", "SEQRES", "MODRES", "HET", "HETNAM", "HETSYN", "FORMUL", "HELIX",
    "SHEET", "SSBOND", "LINK", "CISPEP", "SITE", "CRYST1", "ORIGX1", "ORIGX2", "ORIGX3",
    "SCALE1", "SCALE2", "SCALE3", "MTRIX1", "MTRIX2", "MTRIX3", "MODEL", "ATOM", "ANISOU",
    "TER", "HETATM", "ENDMDL", "CONECT", "MASTER", "END",
];

/// Records that belong to a model rather than to the file header.
const MODEL_RECORDS: &[&str] = &["ATOM", "HETATM", "ANISOU", "TER"];

/// Decoded PDB lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdbDict {
    /// Header and footer records: keyword → lines in file order.
    pub records: BTreeMap<String, Vec<String>>,
    /// `REMARK` lines keyed by remark number.
    pub remarks: BTreeMap<String, Vec<String>>,
    /// Coordinate lines (`ATOM`, `HETATM`, `ANISOU`, `TER`) per model.
    /// Always holds at least one model.
    pub models: Vec<Vec<String>>,
    /// Recoverable problems met while decoding.
    pub warnings: Vec<ParseWarning>,
}

impl PdbDict {
    /// Lines of a record type, empty when the file has none.
    pub fn record(&self, keyword: &str) -> &[String] {
        self.records.get(keyword).map(Vec::as_slice).unwrap_or_default()
    }

    /// Lines of one remark number, empty when absent.
    pub fn remark(&self, number: &str) -> &[String] {
        self.remarks.get(number).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Columns `start..end` (0-based, half open) of a line, or as much of them
/// as the line holds.
pub fn field(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    if start >= end {
        return "";
    }
    line.get(start..end).unwrap_or_default()
}

/// The record keyword: the first six columns without trailing blanks.
pub fn keyword(line: &str) -> &str {
    field(line, 0, 6).trim_end()
}

/// Bucket PDB lines by record type and nest coordinate records by model.
///
/// Items may be single lines or whole blocks of text; blocks are split on
/// line breaks.
pub fn decode_fixed_text<I, S>(lines: I) -> PdbDict
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut dict = PdbDict::default();
    let mut in_model = false;

    for chunk in lines {
        for line in chunk.as_ref().lines() {
            let kw = keyword(line);
            if !KNOWN_RECORDS.contains(&kw) {
                continue;
            }
            match kw {
                "MODEL" => {
                    if in_model {
                        dict.warnings
                            .push(ParseWarning::UnterminatedModel(dict.models.len()));
                    }
                    dict.models.push(Vec::new());
                    in_model = true;
                }
                "ENDMDL" => in_model = false,
                kw if MODEL_RECORDS.contains(&kw) => {
                    // Lines outside an open model join the latest one.
                    match dict.models.last_mut() {
                        Some(model) => model.push(line.to_string()),
                        None => dict.models.push(vec![line.to_string()]),
                    }
                }
                "REMARK" => {
                    let number = field(line, 7, 10).trim().to_string();
                    dict.remarks.entry(number).or_default().push(line.to_string());
                }
                kw => {
                    dict.records
                        .entry(kw.to_string())
                        .or_default()
                        .push(line.to_string());
                }
            }
        }
    }

    if in_model {
        dict.warnings
            .push(ParseWarning::UnterminatedModel(dict.models.len()));
    }
    if dict.models.is_empty() {
        dict.models.push(Vec::new());
    }
    dict
}
