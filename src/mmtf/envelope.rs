//! MessagePack envelope decoding.
//!
//! The envelope is a single map. Binary payloads inside it are codec-encoded
//! arrays and are decoded on the way in, so the resulting tree holds plain
//! integer, float and string sequences.

use std::io::Read;

use rmp::Marker;

use super::codec::{self, ArrayData};
use super::error::MmtfError;

/// Nesting limit for arrays and maps. Real envelopes nest three or four deep.
const MAX_DEPTH: usize = 64;

/// Decode an MMTF envelope (optionally gzipped) into its raw dict.
pub fn decode_binary(bytes: &[u8]) -> Result<BinaryDict, MmtfError> {
    let data = decompress_if_gzip(bytes)?;
    let mut cursor = Cursor::new(&data);
    match read_value(&mut cursor, 0)? {
        Value::Map(entries) => Ok(BinaryDict { entries }),
        _ => Err(MmtfError::RootNotMap),
    }
}

// ---------------------------------------------------------------------------
// Gzip detection & decompression
// ---------------------------------------------------------------------------

fn decompress_if_gzip(bytes: &[u8]) -> Result<Vec<u8>, MmtfError> {
    if bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b {
        let mut decoder = flate2::read::GzDecoder::new(bytes);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    } else {
        Ok(bytes.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Value tree
// ---------------------------------------------------------------------------

/// A decoded envelope value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(String),
    Array(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Ints(Vec<i32>),
    Floats(Vec<f64>),
    Strings(Vec<String>),
}

impl From<ArrayData> for Value {
    fn from(data: ArrayData) -> Self {
        match data {
            ArrayData::Ints(v) => Value::Ints(v),
            ArrayData::Floats(v) => Value::Floats(v),
            ArrayData::Strings(v) => Value::Strings(v),
        }
    }
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Uint(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::Uint(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Look up a string key in a map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(pairs) => lookup(pairs, key),
            _ => None,
        }
    }

    /// Integers from either a decoded codec array or a plain msgpack array.
    pub fn to_ints(&self) -> Option<Vec<i64>> {
        match self {
            Value::Ints(v) => Some(v.iter().map(|&i| i64::from(i)).collect()),
            Value::Array(a) => a.iter().map(Value::as_i64).collect(),
            _ => None,
        }
    }

    /// Floats from a codec array or a plain msgpack array of numbers.
    pub fn to_floats(&self) -> Option<Vec<f64>> {
        match self {
            Value::Floats(v) => Some(v.clone()),
            Value::Ints(v) => Some(v.iter().map(|&i| f64::from(i)).collect()),
            Value::Array(a) => a.iter().map(Value::as_f64).collect(),
            _ => None,
        }
    }

    /// Strings from a codec array or a plain msgpack array of strings.
    pub fn to_strings(&self) -> Option<Vec<String>> {
        match self {
            Value::Strings(v) => Some(v.clone()),
            Value::Array(a) => a.iter().map(|v| v.as_str().map(String::from)).collect(),
            _ => None,
        }
    }
}

fn lookup<'a>(pairs: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    pairs
        .iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v)
}

/// The root map of an MMTF envelope, in source key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BinaryDict {
    pub entries: Vec<(Value, Value)>,
}

impl BinaryDict {
    pub fn get(&self, key: &str) -> Option<&Value> {
        lookup(&self.entries, key)
    }

    /// Like [`get`](Self::get), but treats an explicit nil as absent.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.get(key).filter(|v| !v.is_nil())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// MessagePack decoder
// ---------------------------------------------------------------------------

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], MmtfError> {
        if self.remaining() < n {
            return Err(MmtfError::Truncated {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N], MmtfError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, MmtfError> {
        Ok(self.read_bytes::<1>()?[0])
    }

    fn len16(&mut self) -> Result<usize, MmtfError> {
        Ok(u16::from_be_bytes(self.read_bytes()?) as usize)
    }

    fn len32(&mut self) -> Result<usize, MmtfError> {
        Ok(u32::from_be_bytes(self.read_bytes()?) as usize)
    }
}

fn read_value(cur: &mut Cursor<'_>, depth: usize) -> Result<Value, MmtfError> {
    let byte = cur.u8()?;
    match Marker::from_u8(byte) {
        Marker::Null => Ok(Value::Nil),
        Marker::True => Ok(Value::Bool(true)),
        Marker::False => Ok(Value::Bool(false)),

        Marker::FixPos(v) => Ok(Value::Uint(v as u64)),
        Marker::FixNeg(v) => Ok(Value::Int(v as i64)),

        Marker::U8 => Ok(Value::Uint(cur.u8()? as u64)),
        Marker::U16 => Ok(Value::Uint(u16::from_be_bytes(cur.read_bytes()?) as u64)),
        Marker::U32 => Ok(Value::Uint(u32::from_be_bytes(cur.read_bytes()?) as u64)),
        Marker::U64 => Ok(Value::Uint(u64::from_be_bytes(cur.read_bytes()?))),
        Marker::I8 => Ok(Value::Int(cur.u8()? as i8 as i64)),
        Marker::I16 => Ok(Value::Int(i16::from_be_bytes(cur.read_bytes()?) as i64)),
        Marker::I32 => Ok(Value::Int(i32::from_be_bytes(cur.read_bytes()?) as i64)),
        Marker::I64 => Ok(Value::Int(i64::from_be_bytes(cur.read_bytes()?))),
        Marker::F32 => Ok(Value::Float(codec::widen_f32(f32::from_be_bytes(
            cur.read_bytes()?,
        )))),
        Marker::F64 => Ok(Value::Float(f64::from_be_bytes(cur.read_bytes()?))),

        Marker::FixStr(len) => read_string(cur, len as usize),
        Marker::Str8 => {
            let len = cur.u8()? as usize;
            read_string(cur, len)
        }
        Marker::Str16 => {
            let len = cur.len16()?;
            read_string(cur, len)
        }
        Marker::Str32 => {
            let len = cur.len32()?;
            read_string(cur, len)
        }

        Marker::Bin8 => {
            let len = cur.u8()? as usize;
            read_bin(cur, len)
        }
        Marker::Bin16 => {
            let len = cur.len16()?;
            read_bin(cur, len)
        }
        Marker::Bin32 => {
            let len = cur.len32()?;
            read_bin(cur, len)
        }

        Marker::FixArray(len) => read_array(cur, len as usize, depth),
        Marker::Array16 => {
            let len = cur.len16()?;
            read_array(cur, len, depth)
        }
        Marker::Array32 => {
            let len = cur.len32()?;
            read_array(cur, len, depth)
        }

        Marker::FixMap(len) => read_map(cur, len as usize, depth),
        Marker::Map16 => {
            let len = cur.len16()?;
            read_map(cur, len, depth)
        }
        Marker::Map32 => {
            let len = cur.len32()?;
            read_map(cur, len, depth)
        }

        _ => Err(MmtfError::UnsupportedMarker(byte)),
    }
}

fn read_string(cur: &mut Cursor<'_>, len: usize) -> Result<Value, MmtfError> {
    let start = cur.pos;
    let bytes = cur.take(len)?;
    let s = std::str::from_utf8(bytes).map_err(|_| MmtfError::InvalidUtf8(start))?;
    Ok(Value::Str(s.to_owned()))
}

fn read_bin(cur: &mut Cursor<'_>, len: usize) -> Result<Value, MmtfError> {
    let payload = cur.take(len)?;
    Ok(codec::decode_array(payload)?.into())
}

fn read_array(cur: &mut Cursor<'_>, len: usize, depth: usize) -> Result<Value, MmtfError> {
    if depth >= MAX_DEPTH {
        return Err(MmtfError::DepthLimit(MAX_DEPTH));
    }
    // Every element takes at least one byte.
    let mut arr = Vec::with_capacity(len.min(cur.remaining()));
    for _ in 0..len {
        arr.push(read_value(cur, depth + 1)?);
    }
    Ok(Value::Array(arr))
}

fn read_map(cur: &mut Cursor<'_>, len: usize, depth: usize) -> Result<Value, MmtfError> {
    if depth >= MAX_DEPTH {
        return Err(MmtfError::DepthLimit(MAX_DEPTH));
    }
    let mut pairs = Vec::with_capacity(len.min(cur.remaining() / 2));
    for _ in 0..len {
        let k = read_value(cur, depth + 1)?;
        let v = read_value(cur, depth + 1)?;
        pairs.push((k, v));
    }
    Ok(Value::Map(pairs))
}
