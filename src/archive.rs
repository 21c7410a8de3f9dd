//! The bit-exact serialization archive (SPEC_FULL.md §6): little-endian primitives, a
//! length-prefixed string/byte encoding, and an FNV-variant polymorphic type hash
//! resolved against an `ArchiveEntry` registry. Used by the topology JSON bridge and by
//! `Packet`/message objects crossing the cross-process wire protocol (`topology::bridge`).
//!
//! The hash is deliberately the multiply-then-xor FNV-1 variant the donor framework
//! documents (`h = (h*0xf4243) XOR byte`), not the more common xor-then-multiply FNV-1a
//! — reproducing it exactly matters because two peers exchanging this archive over the
//! wire must agree on type tags without a shared compile-time class table.

use std::collections::HashMap;
use std::sync::OnceLock;

use dashmap::DashMap;

use crate::dtype::DType;
use crate::error::{PothosError, Result};
use crate::label::Label;

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME_VARIANT: u64 = 0x0000_0000_000f_4243;

/// `h = ((h * 0xf4243) XOR byte)` folded over every byte of `class_id`, starting from
/// the standard 64-bit FNV offset basis. SPEC_FULL.md §6 names this exact formula for
/// resolving a polymorphic archive tag against the `ArchiveEntry` registry.
pub fn fnv_variant_hash(class_id: &str) -> u64 {
    let mut h = FNV_OFFSET_BASIS;
    for byte in class_id.as_bytes() {
        h = h.wrapping_mul(FNV_PRIME_VARIANT) ^ (*byte as u64);
    }
    h
}

/// Registry resolving a polymorphic archive tag back to the class id string it was
/// computed from, so a decoder can report *what* failed to resolve rather than just the
/// opaque hash. Writers only ever need the hash (`fnv_variant_hash`); this map exists
/// for diagnostics and for `ArchiveValue::class_id()` round-tripping through unknown tags.
fn class_registry() -> &'static DashMap<u64, &'static str> {
    static REGISTRY: OnceLock<DashMap<u64, &'static str>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let map = DashMap::new();
        for id in ArchiveValue::BUILTIN_CLASS_IDS {
            map.insert(fnv_variant_hash(id), *id);
        }
        map
    })
}

/// Register an `ArchiveEntry`'s class id so hash collisions/unknowns can be reported by
/// name. Block authors extending the archive with custom payload types call this once
/// at startup (mirrors the donor framework's managed-class registration idiom,
/// SPEC_FULL.md §9, "Global mutable state").
pub fn register_class_id(class_id: &'static str) {
    class_registry().insert(fnv_variant_hash(class_id), class_id);
}

pub fn lookup_class_id(hash: u64) -> Option<&'static str> {
    class_registry().get(&hash).map(|r| *r)
}

/// A writer for the bit-exact archive format: LE `i32`/`i64`, length-prefixed UTF-8
/// strings and byte blobs.
#[derive(Default)]
pub struct ArchiveWriter {
    buf: Vec<u8>,
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_string(&mut self, s: &str) {
        self.write_i32(s.len() as i32);
        self.buf.extend_from_slice(s.as_bytes());
    }

    pub fn write_bytes(&mut self, b: &[u8]) {
        self.write_i32(b.len() as i32);
        self.buf.extend_from_slice(b);
    }

    /// Write the polymorphic tag for `class_id`, ahead of that type's own fields.
    pub fn write_tag(&mut self, class_id: &str) {
        self.write_u64(fnv_variant_hash(class_id));
    }
}

/// A cursor-based reader matching `ArchiveWriter`'s encoding. Every read fails with
/// `PothosError::Configuration` on truncated input rather than panicking — archive
/// payloads routinely arrive from an untrusted peer over `topology::bridge`.
pub struct ArchiveReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ArchiveReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.buf.len() {
            return Err(PothosError::configuration("archive: truncated input"));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_i32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| PothosError::configuration("archive: invalid utf-8 string"))
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_i32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    pub fn read_tag(&mut self) -> Result<u64> {
        self.read_u64()
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

/// The archive's notion of "any supported Object" (SPEC_FULL.md §8's round-trip
/// property): primitive numerics, strings, buffers, labels, packets, and lists of the
/// same. A `Buffer` here is just its dtype name and raw bytes, not a live
/// `BufferChunk` — crossing the wire always implies a copy.
#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveValue {
    I32(i32),
    I64(i64),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    Buffer { dtype: String, bytes: Vec<u8> },
    Label { id: String, index: u64, width: u64, data: Box<ArchiveValue> },
    Packet { payload: Box<ArchiveValue>, metadata: Vec<(String, ArchiveValue)>, labels: Vec<ArchiveValue> },
    List(Vec<ArchiveValue>),
}

impl ArchiveValue {
    const BUILTIN_CLASS_IDS: &'static [&'static str] =
        &["i32", "i64", "f64", "string", "bytes", "buffer", "label", "packet", "list"];

    fn class_id(&self) -> &'static str {
        match self {
            ArchiveValue::I32(_) => "i32",
            ArchiveValue::I64(_) => "i64",
            ArchiveValue::F64(_) => "f64",
            ArchiveValue::Str(_) => "string",
            ArchiveValue::Bytes(_) => "bytes",
            ArchiveValue::Buffer { .. } => "buffer",
            ArchiveValue::Label { .. } => "label",
            ArchiveValue::Packet { .. } => "packet",
            ArchiveValue::List(_) => "list",
        }
    }

    pub fn write(&self, w: &mut ArchiveWriter) {
        w.write_tag(self.class_id());
        match self {
            ArchiveValue::I32(v) => w.write_i32(*v),
            ArchiveValue::I64(v) => w.write_i64(*v),
            ArchiveValue::F64(v) => w.write_f64(*v),
            ArchiveValue::Str(s) => w.write_string(s),
            ArchiveValue::Bytes(b) => w.write_bytes(b),
            ArchiveValue::Buffer { dtype, bytes } => {
                w.write_string(dtype);
                w.write_bytes(bytes);
            }
            ArchiveValue::Label { id, index, width, data } => {
                w.write_string(id);
                w.write_u64(*index);
                w.write_u64(*width);
                data.write(w);
            }
            ArchiveValue::Packet { payload, metadata, labels } => {
                payload.write(w);
                w.write_i32(metadata.len() as i32);
                for (k, v) in metadata {
                    w.write_string(k);
                    v.write(w);
                }
                w.write_i32(labels.len() as i32);
                for l in labels {
                    l.write(w);
                }
            }
            ArchiveValue::List(items) => {
                w.write_i32(items.len() as i32);
                for item in items {
                    item.write(w);
                }
            }
        }
    }

    pub fn read(r: &mut ArchiveReader<'_>) -> Result<ArchiveValue> {
        let tag = r.read_tag()?;
        let class_id = lookup_class_id(tag)
            .ok_or_else(|| PothosError::configuration(format!("archive: unknown polymorphic tag {tag:#x}")))?;
        Ok(match class_id {
            "i32" => ArchiveValue::I32(r.read_i32()?),
            "i64" => ArchiveValue::I64(r.read_i64()?),
            "f64" => ArchiveValue::F64(r.read_f64()?),
            "string" => ArchiveValue::Str(r.read_string()?),
            "bytes" => ArchiveValue::Bytes(r.read_bytes()?),
            "buffer" => ArchiveValue::Buffer { dtype: r.read_string()?, bytes: r.read_bytes()? },
            "label" => {
                let id = r.read_string()?;
                let index = r.read_u64()?;
                let width = r.read_u64()?;
                let data = Box::new(ArchiveValue::read(r)?);
                ArchiveValue::Label { id, index, width, data }
            }
            "packet" => {
                let payload = Box::new(ArchiveValue::read(r)?);
                let meta_len = r.read_i32()? as usize;
                let mut metadata = Vec::with_capacity(meta_len);
                for _ in 0..meta_len {
                    let k = r.read_string()?;
                    let v = ArchiveValue::read(r)?;
                    metadata.push((k, v));
                }
                let label_len = r.read_i32()? as usize;
                let mut labels = Vec::with_capacity(label_len);
                for _ in 0..label_len {
                    labels.push(ArchiveValue::read(r)?);
                }
                ArchiveValue::Packet { payload, metadata, labels }
            }
            "list" => {
                let len = r.read_i32()? as usize;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(ArchiveValue::read(r)?);
                }
                ArchiveValue::List(items)
            }
            other => return Err(PothosError::configuration(format!("archive: unhandled class id '{other}'"))),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ArchiveWriter::new();
        self.write(&mut w);
        w.into_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<ArchiveValue> {
        let mut r = ArchiveReader::new(bytes);
        ArchiveValue::read(&mut r)
    }

    pub fn label_from(label: &Label, data: ArchiveValue) -> ArchiveValue {
        ArchiveValue::Label {
            id: label.id().to_string(),
            index: label.index() as u64,
            width: label.width() as u64,
            data: Box::new(data),
        }
    }

    pub fn buffer_from(dtype: &DType, bytes: &[u8]) -> ArchiveValue {
        ArchiveValue::Buffer { dtype: dtype.name().to_string(), bytes: bytes.to_vec() }
    }
}

/// A loosely-typed companion for `HashMap`-shaped packet metadata, kept here rather than
/// on `ArchiveValue::Packet` directly so callers can build metadata incrementally.
pub type PacketMetadata = HashMap<String, ArchiveValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_and_order_sensitive() {
        assert_eq!(fnv_variant_hash("label"), fnv_variant_hash("label"));
        assert_ne!(fnv_variant_hash("label"), fnv_variant_hash("belal"));
    }

    #[test]
    fn round_trips_primitives() {
        for v in [ArchiveValue::I32(-7), ArchiveValue::I64(1 << 40), ArchiveValue::F64(3.5), ArchiveValue::Str("hi".into())]
        {
            let bytes = v.to_bytes();
            assert_eq!(ArchiveValue::from_bytes(&bytes).unwrap(), v);
        }
    }

    #[test]
    fn round_trips_buffer_label_and_packet() {
        let buf = ArchiveValue::Buffer { dtype: "int32".into(), bytes: vec![1, 2, 3, 4] };
        assert_eq!(ArchiveValue::from_bytes(&buf.to_bytes()).unwrap(), buf);

        let label = ArchiveValue::Label { id: "lbl0".into(), index: 3, width: 1, data: Box::new(ArchiveValue::I32(42)) };
        assert_eq!(ArchiveValue::from_bytes(&label.to_bytes()).unwrap(), label);

        let packet = ArchiveValue::Packet {
            payload: Box::new(buf.clone()),
            metadata: vec![("k".to_string(), ArchiveValue::Str("v".into()))],
            labels: vec![label.clone()],
        };
        assert_eq!(ArchiveValue::from_bytes(&packet.to_bytes()).unwrap(), packet);
    }

    #[test]
    fn round_trips_list() {
        let list = ArchiveValue::List(vec![ArchiveValue::I32(1), ArchiveValue::Str("x".into())]);
        assert_eq!(ArchiveValue::from_bytes(&list.to_bytes()).unwrap(), list);
    }

    #[test]
    fn unknown_tag_is_reported_not_panicked() {
        let mut w = ArchiveWriter::new();
        w.write_u64(0xdead_beef_dead_beef);
        let err = ArchiveValue::from_bytes(&w.into_bytes()).unwrap_err();
        assert!(matches!(err, PothosError::Configuration { .. }));
    }
}
