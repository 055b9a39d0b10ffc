//! MMTF binary array codecs.
//!
//! Every binary payload starts with a 12-byte big-endian header:
//! codec (`i32`), declared element count (`i32`), codec parameter (`i32`).
//! The rest is the encoded data. Composite codecs apply their steps in the
//! order listed on [`decode_array`].
//!
//! Reference: https://github.com/rcsb/mmtf/blob/master/spec.md#codecs

use super::error::MmtfError;

/// Size of the codec header that precedes every encoded array.
pub const HEADER_LEN: usize = 12;

/// A decoded array.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Ints(Vec<i32>),
    Floats(Vec<f64>),
    Strings(Vec<String>),
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            ArrayData::Ints(v) => v.len(),
            ArrayData::Floats(v) => v.len(),
            ArrayData::Strings(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parsed codec header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayHeader {
    pub codec: i32,
    pub length: usize,
    pub param: i32,
}

impl ArrayHeader {
    pub fn parse(payload: &[u8]) -> Result<Self, MmtfError> {
        if payload.len() < HEADER_LEN {
            return Err(MmtfError::Truncated {
                offset: 0,
                needed: HEADER_LEN,
                available: payload.len(),
            });
        }
        let codec = be_i32(&payload[0..4]);
        let length = be_i32(&payload[4..8]);
        let param = be_i32(&payload[8..12]);
        let length = usize::try_from(length)
            .map_err(|_| MmtfError::invalid(codec, format!("negative length {length}")))?;
        Ok(Self {
            codec,
            length,
            param,
        })
    }
}

/// Decode one binary payload (header + data).
///
/// | codec | steps |
/// |---|---|
/// | 1 | `f32` |
/// | 2 | `i8` |
/// | 3 | `i16` |
/// | 4 | `i32` |
/// | 5 | fixed-width strings, `param` bytes each |
/// | 6 | run-length → characters |
/// | 7 | run-length |
/// | 8 | run-length → delta |
/// | 9 | run-length → divide by `param` |
/// | 10 | `i16` recursive index → delta → divide by `param` |
/// | 11 | `i16` → divide by `param` |
/// | 12 | `i16` recursive index → divide by `param` |
/// | 13 | `i8` recursive index → divide by `param` |
/// | 14 | `i16` recursive index |
/// | 15 | `i8` recursive index |
pub fn decode_array(payload: &[u8]) -> Result<ArrayData, MmtfError> {
    let header = ArrayHeader::parse(payload)?;
    let data = &payload[HEADER_LEN..];
    let ArrayHeader {
        codec,
        length,
        param,
    } = header;

    let decoded = match codec {
        1 => ArrayData::Floats(read_f32(data, codec)?),
        2 => ArrayData::Ints(read_i8(data)),
        3 => ArrayData::Ints(read_i16(data, codec)?),
        4 => ArrayData::Ints(read_i32(data, codec)?),
        5 => ArrayData::Strings(read_strings(data, length, param)?),
        6 => {
            let codes = run_length_decode(&read_i32(data, codec)?, length)?;
            ArrayData::Strings(
                codes
                    .into_iter()
                    .map(|c| char_from_code(c, codec))
                    .collect::<Result<_, _>>()?,
            )
        }
        7 => ArrayData::Ints(run_length_decode(&read_i32(data, codec)?, length)?),
        8 => ArrayData::Ints(delta_decode(&run_length_decode(
            &read_i32(data, codec)?,
            length,
        )?)),
        9 => ArrayData::Floats(divide(
            &run_length_decode(&read_i32(data, codec)?, length)?,
            param,
            codec,
        )?),
        10 => ArrayData::Floats(divide(
            &delta_decode(&recursive_index_decode(&read_i16(data, codec)?, I16_RANGE)),
            param,
            codec,
        )?),
        11 => ArrayData::Floats(divide(&read_i16(data, codec)?, param, codec)?),
        12 => ArrayData::Floats(divide(
            &recursive_index_decode(&read_i16(data, codec)?, I16_RANGE),
            param,
            codec,
        )?),
        13 => ArrayData::Floats(divide(
            &recursive_index_decode(&read_i8(data), I8_RANGE),
            param,
            codec,
        )?),
        14 => ArrayData::Ints(recursive_index_decode(&read_i16(data, codec)?, I16_RANGE)),
        15 => ArrayData::Ints(recursive_index_decode(&read_i8(data), I8_RANGE)),
        other => return Err(MmtfError::UnknownCodec(other)),
    };

    if decoded.len() != length {
        return Err(MmtfError::LengthMismatch {
            codec,
            declared: length,
            decoded: decoded.len(),
        });
    }
    Ok(decoded)
}

// ---------------------------------------------------------------------------
// Codec steps
// ---------------------------------------------------------------------------

/// Expand `(value, count)` pairs. The expansion may not exceed `limit`
/// elements, so a corrupt count fails before it allocates.
pub fn run_length_decode(pairs: &[i32], limit: usize) -> Result<Vec<i32>, MmtfError> {
    if pairs.len() % 2 != 0 {
        return Err(MmtfError::InvalidRunLength(format!(
            "odd number of values ({})",
            pairs.len()
        )));
    }
    let mut result = Vec::new();
    for pair in pairs.chunks_exact(2) {
        let (value, count) = (pair[0], pair[1]);
        let count = usize::try_from(count)
            .map_err(|_| MmtfError::InvalidRunLength(format!("negative count {count}")))?;
        if result.len() + count > limit {
            return Err(MmtfError::InvalidRunLength(format!(
                "expansion exceeds {limit} elements"
            )));
        }
        result.extend(std::iter::repeat(value).take(count));
    }
    Ok(result)
}

/// Cumulative sum of successive differences. Exact inverse of delta encoding,
/// including across `i32` overflow.
pub fn delta_decode(deltas: &[i32]) -> Vec<i32> {
    let mut acc = 0i32;
    deltas
        .iter()
        .map(|&d| {
            acc = acc.wrapping_add(d);
            acc
        })
        .collect()
}

const I16_RANGE: (i32, i32) = (i16::MIN as i32, i16::MAX as i32);
const I8_RANGE: (i32, i32) = (i8::MIN as i32, i8::MAX as i32);

/// Values equal to either bound of the packed type continue into the next
/// element; anything else terminates the current value. An unterminated
/// trailing run is dropped.
pub fn recursive_index_decode(packed: &[i32], (min, max): (i32, i32)) -> Vec<i32> {
    let mut result = Vec::with_capacity(packed.len());
    let mut acc = 0i32;
    for &v in packed {
        acc = acc.wrapping_add(v);
        if v != min && v != max {
            result.push(acc);
            acc = 0;
        }
    }
    result
}

fn divide(values: &[i32], divisor: i32, codec: i32) -> Result<Vec<f64>, MmtfError> {
    if divisor == 0 {
        return Err(MmtfError::invalid(codec, "zero divisor"));
    }
    let divisor = f64::from(divisor);
    Ok(values.iter().map(|&v| f64::from(v) / divisor).collect())
}

fn char_from_code(code: i32, codec: i32) -> Result<String, MmtfError> {
    if code == 0 {
        return Ok(String::new());
    }
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .map(String::from)
        .ok_or_else(|| MmtfError::invalid(codec, format!("invalid character code {code}")))
}

// ---------------------------------------------------------------------------
// Raw big-endian readers
// ---------------------------------------------------------------------------

fn be_i32(b: &[u8]) -> i32 {
    i32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

fn whole_elements(data: &[u8], size: usize, codec: i32) -> Result<(), MmtfError> {
    if data.len() % size != 0 {
        return Err(MmtfError::invalid(
            codec,
            format!("{} bytes is not a whole number of {size}-byte elements", data.len()),
        ));
    }
    Ok(())
}

fn read_i8(data: &[u8]) -> Vec<i32> {
    data.iter().map(|&b| b as i8 as i32).collect()
}

fn read_i16(data: &[u8], codec: i32) -> Result<Vec<i32>, MmtfError> {
    whole_elements(data, 2, codec)?;
    Ok(data
        .chunks_exact(2)
        .map(|c| i16::from_be_bytes([c[0], c[1]]) as i32)
        .collect())
}

fn read_i32(data: &[u8], codec: i32) -> Result<Vec<i32>, MmtfError> {
    whole_elements(data, 4, codec)?;
    Ok(data.chunks_exact(4).map(be_i32).collect())
}

fn read_f32(data: &[u8], codec: i32) -> Result<Vec<f64>, MmtfError> {
    whole_elements(data, 4, codec)?;
    Ok(data
        .chunks_exact(4)
        .map(|c| widen_f32(f32::from_be_bytes([c[0], c[1], c[2], c[3]])))
        .collect())
}

fn read_strings(data: &[u8], count: usize, width: i32) -> Result<Vec<String>, MmtfError> {
    let width = usize::try_from(width)
        .ok()
        .filter(|&w| w > 0)
        .ok_or_else(|| MmtfError::invalid(5, format!("invalid string width {width}")))?;
    let needed = count
        .checked_mul(width)
        .ok_or_else(|| MmtfError::invalid(5, "string array size overflows"))?;
    if data.len() < needed {
        return Err(MmtfError::Truncated {
            offset: HEADER_LEN,
            needed,
            available: data.len(),
        });
    }
    data[..needed]
        .chunks_exact(width)
        .enumerate()
        .map(|(i, chunk)| {
            let bytes: Vec<u8> = chunk.iter().copied().filter(|&b| b != 0).collect();
            String::from_utf8(bytes).map_err(|_| MmtfError::InvalidUtf8(HEADER_LEN + i * width))
        })
        .collect()
}

/// Widen an `f32` through its shortest decimal form, so `1.9f32` becomes
/// `1.9` rather than `1.899999976158142`.
pub(crate) fn widen_f32(v: f32) -> f64 {
    v.to_string().parse().unwrap_or(f64::from(v))
}
