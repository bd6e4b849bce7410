//! Recursive key/value metadata and its binary codec.
//!
//! Properties travel inside MST streams attached to meshes, nodes and
//! instances. The payload is fully untrusted, so the decoder enforces hard
//! ceilings on entry counts and lengths before allocating anything; a
//! malformed tag or oversized length is an explicit error, never an
//! unbounded allocation.

use std::io::{Read, Write};
use std::ops::{Deref, DerefMut};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use hashbrown::HashMap;

use crate::error::{Error, Result};

const TYPE_STRING: u32 = 0;
const TYPE_INT: u32 = 1;
const TYPE_FLOAT: u32 = 2;
const TYPE_BOOL: u32 = 3;
const TYPE_ARRAY: u32 = 4;
const TYPE_MAP: u32 = 5;

/// Decode ceiling: entries per map.
const MAX_ENTRIES: u32 = 1000;
/// Decode ceiling: key length in bytes.
const MAX_KEY_LEN: u32 = 100;
/// Decode ceiling: string payloads and array element counts.
const MAX_PAYLOAD_LEN: u32 = 100_000;

/// One dynamically-typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<Value>),
    Map(Properties),
}

impl Value {
    fn tag(&self) -> u32 {
        match self {
            Value::String(_) => TYPE_STRING,
            Value::Int(_) => TYPE_INT,
            Value::Float(_) => TYPE_FLOAT,
            Value::Bool(_) => TYPE_BOOL,
            Value::Array(_) => TYPE_ARRAY,
            Value::Map(_) => TYPE_MAP,
        }
    }

    fn encode_payload<W: Write>(&self, w: &mut W) -> Result<()> {
        match self {
            Value::String(s) => {
                w.write_u32::<LittleEndian>(s.len() as u32)?;
                w.write_all(s.as_bytes())?;
            }
            Value::Int(v) => w.write_i64::<LittleEndian>(*v)?,
            Value::Float(v) => w.write_f64::<LittleEndian>(*v)?,
            Value::Bool(v) => w.write_u8(u8::from(*v))?,
            Value::Array(items) => {
                w.write_u32::<LittleEndian>(items.len() as u32)?;
                for item in items {
                    w.write_u32::<LittleEndian>(item.tag())?;
                    item.encode_payload(w)?;
                }
            }
            Value::Map(props) => props.encode(w)?,
        }
        Ok(())
    }

    fn decode_payload<R: Read>(r: &mut R, tag: u32) -> Result<Value> {
        match tag {
            TYPE_STRING => {
                let len = r.read_u32::<LittleEndian>()?;
                if len > MAX_PAYLOAD_LEN {
                    return Err(Error::MalformedProperties("string length over ceiling"));
                }
                let mut bytes = vec![0u8; len as usize];
                r.read_exact(&mut bytes)?;
                let s = String::from_utf8(bytes)
                    .map_err(|_| Error::MalformedProperties("string is not valid utf-8"))?;
                Ok(Value::String(s))
            }
            TYPE_INT => Ok(Value::Int(r.read_i64::<LittleEndian>()?)),
            TYPE_FLOAT => Ok(Value::Float(r.read_f64::<LittleEndian>()?)),
            TYPE_BOOL => Ok(Value::Bool(r.read_u8()? == 1)),
            TYPE_ARRAY => {
                let len = r.read_u32::<LittleEndian>()?;
                if len > MAX_PAYLOAD_LEN {
                    return Err(Error::MalformedProperties("array length over ceiling"));
                }
                let mut items = Vec::new();
                for _ in 0..len {
                    let item_tag = r.read_u32::<LittleEndian>()?;
                    items.push(Value::decode_payload(r, item_tag)?);
                }
                Ok(Value::Array(items))
            }
            TYPE_MAP => Ok(Value::Map(Properties::decode(r)?)),
            _ => Err(Error::MalformedProperties("unknown value type tag")),
        }
    }
}

/// String-keyed property map; values may nest to arbitrary depth.
///
/// Key order is not preserved across a round-trip, the key set and every
/// value are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(HashMap<String, Value>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize: u32 entry count, then per entry key length + key bytes,
    /// u32 type tag and the tag-specific payload.
    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32::<LittleEndian>(self.0.len() as u32)?;
        for (key, value) in &self.0 {
            w.write_u32::<LittleEndian>(key.len() as u32)?;
            w.write_all(key.as_bytes())?;
            w.write_u32::<LittleEndian>(value.tag())?;
            value.encode_payload(w)?;
        }
        Ok(())
    }

    /// Encode an optional map; absent encodes as a bare zero count.
    pub fn encode_opt<W: Write>(props: Option<&Properties>, w: &mut W) -> Result<()> {
        match props {
            Some(p) => p.encode(w),
            None => Ok(w.write_u32::<LittleEndian>(0)?),
        }
    }

    pub fn decode<R: Read>(r: &mut R) -> Result<Properties> {
        let count = r.read_u32::<LittleEndian>()?;
        if count > MAX_ENTRIES {
            return Err(Error::MalformedProperties("entry count over ceiling"));
        }

        let mut props = HashMap::with_capacity(count as usize);
        for _ in 0..count {
            let key_len = r.read_u32::<LittleEndian>()?;
            if key_len > MAX_KEY_LEN {
                return Err(Error::MalformedProperties("key length over ceiling"));
            }
            let mut key_bytes = vec![0u8; key_len as usize];
            r.read_exact(&mut key_bytes)?;
            let key = String::from_utf8(key_bytes)
                .map_err(|_| Error::MalformedProperties("key is not valid utf-8"))?;

            let tag = r.read_u32::<LittleEndian>()?;
            let value = Value::decode_payload(r, tag)?;
            props.insert(key, value);
        }
        Ok(Properties(props))
    }

    /// Decode an optional map; a bare zero count reads back as `None`.
    pub fn decode_opt<R: Read>(r: &mut R) -> Result<Option<Properties>> {
        let props = Properties::decode(r)?;
        Ok(if props.is_empty() { None } else { Some(props) })
    }
}

impl Deref for Properties {
    type Target = HashMap<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Properties {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl FromIterator<(String, Value)> for Properties {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Properties(iter.into_iter().collect())
    }
}
