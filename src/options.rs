//! Read configuration.

use crate::cif::decode_columnar_text;
use crate::error::Error;
use crate::format::RawDict;
use crate::mmtf::decode_binary;
use crate::pdb::decode_fixed_text;
use crate::types::date::current_year;
use crate::types::DataDict;

/// How recoverable decoding problems are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrictnessLevel {
    /// The first warning aborts the read with [`Error::Strict`].
    Strict,
    /// Warnings stay on the raw dict and the read carries on.
    #[default]
    Loose,
}

/// Options for reading and normalizing structure files.
///
/// ```
/// use molfile_conv::{ReadOptions, StrictnessLevel};
///
/// let data = ReadOptions::new()
///     .set_level(StrictnessLevel::Loose)
///     .set_reference_year(2020)
///     .read_fixed(["HEADER    LYASE                                   06-MAY-02   1LOL"])
///     .unwrap();
/// assert_eq!(data.description.code.as_deref(), Some("1LOL"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    level: StrictnessLevel,
    reference_year: i32,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            level: StrictnessLevel::default(),
            reference_year: current_year(),
        }
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_level(&mut self, level: StrictnessLevel) -> &mut Self {
        self.level = level;
        self
    }

    /// Year used to place two-digit years: `yy` later than this year's last
    /// two digits belongs to the previous century.
    pub fn set_reference_year(&mut self, year: i32) -> &mut Self {
        self.reference_year = year;
        self
    }

    pub fn level(&self) -> StrictnessLevel {
        self.level
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    /// Decode and normalize an MMTF buffer (plain or gzipped).
    pub fn read_binary(&self, bytes: &[u8]) -> Result<DataDict, Error> {
        self.finish(decode_binary(bytes)?.into())
    }

    /// Decode and normalize mmCIF text.
    pub fn read_columnar(&self, text: &str) -> Result<DataDict, Error> {
        self.finish(decode_columnar_text(text)?.into())
    }

    /// Decode and normalize PDB lines.
    pub fn read_fixed<I, S>(&self, lines: I) -> Result<DataDict, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.finish(decode_fixed_text(lines).into())
    }

    fn finish(&self, raw: RawDict) -> Result<DataDict, Error> {
        if self.level == StrictnessLevel::Strict {
            if let Some(warning) = raw.warnings().first() {
                return Err(Error::Strict(warning.clone()));
            }
        }
        Ok(crate::normalize_with(&raw, self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseWarning;

    const RAGGED: &str = "data_TEST\nloop_\n_exptl.entry_id\n_exptl.method\n1ABC 'X-RAY DIFFRACTION' 2ABC\n";

    #[test]
    fn defaults() {
        let opts = ReadOptions::new();
        assert_eq!(opts.level(), StrictnessLevel::Loose);
        assert_eq!(opts.reference_year(), current_year());
    }

    #[test]
    fn loose_keeps_going() {
        let data = ReadOptions::new().read_columnar(RAGGED).unwrap();
        assert_eq!(data.experiment.technique.as_deref(), Some("X-RAY DIFFRACTION"));
    }

    #[test]
    fn strict_rejects_warnings() {
        let err = ReadOptions::new()
            .set_level(StrictnessLevel::Strict)
            .read_columnar(RAGGED)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Strict(ParseWarning::RaggedLoop { columns: 2, values: 3, .. })
        ));

        let err = ReadOptions::new()
            .set_level(StrictnessLevel::Strict)
            .read_fixed(["MODEL        1", "ATOM      1  N   MET A   1      27.340  24.430   2.614  1.00  9.67           N"])
            .unwrap_err();
        assert!(matches!(err, Error::Strict(ParseWarning::UnterminatedModel(1))));
    }

    #[test]
    fn reference_year_drives_date_pivot() {
        let header = ["HEADER    LYASE                                   06-MAY-25   9ZZZ"];
        let data = ReadOptions::new()
            .set_reference_year(2020)
            .read_fixed(header)
            .unwrap();
        assert_eq!(data.description.deposition_date.map(|d| d.year()), Some(1925));
        let data = ReadOptions::new()
            .set_reference_year(2030)
            .read_fixed(header)
            .unwrap();
        assert_eq!(data.description.deposition_date.map(|d| d.year()), Some(2025));
    }

    #[test]
    fn format_errors_surface() {
        assert!(matches!(
            ReadOptions::new().read_binary(&[0x90]),
            Err(Error::Mmtf(_))
        ));
        assert!(matches!(
            ReadOptions::new().read_columnar("data_X\n_entry.id 'open"),
            Err(Error::Cif(_))
        ));
    }
}
