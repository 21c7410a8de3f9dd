//! Element type descriptors and the conversion-kernel registry.
//!
//! `DType` is deliberately thin — a name, an element size, and a shape — so that ports,
//! buffers, and labels can all key off a cheap `Clone + Eq` value. Conversion between
//! dtypes is not built into `DType` itself; it is a registered kernel looked up by
//! `(src, dst)` name pair, mirroring the way the donor framework keeps "what a
//! conversion does" out of the type that merely describes a layout.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use parking_lot::RwLock;

/// Describes the element layout of a buffer: a canonical name, the size in bytes of one
/// element, and a shape (element count per "sample" — almost always 1, but complex/vector
/// types may use more).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct DType {
    name: String,
    elem_size: usize,
    shape: Vec<usize>,
}

impl DType {
    pub fn new(name: impl Into<String>, elem_size: usize) -> Self {
        Self { name: name.into(), elem_size, shape: vec![1] }
    }

    pub fn with_shape(name: impl Into<String>, elem_size: usize, shape: Vec<usize>) -> Self {
        Self { name: name.into(), elem_size, shape }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes of a single element, i.e. the stride `BufferChunk::elements()` divides by.
    pub fn size(&self) -> usize {
        self.elem_size
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// `true` for dtypes whose canonical name carries the `complex_` semantic marker used
    /// by conversion kernels to decide "take real part by default".
    pub fn is_complex(&self) -> bool {
        self.name.starts_with("complex_")
    }

    pub fn uint8() -> Self {
        Self::new("uint8", 1)
    }

    pub fn int32() -> Self {
        Self::new("int32", 4)
    }

    pub fn float32() -> Self {
        Self::new("float32", 4)
    }

    pub fn complex_float32() -> Self {
        Self::new("complex_float32", 8)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A conversion kernel: given the raw bytes of `count` source elements, write the
/// converted bytes for `count` destination elements into `out`. The core does not
/// legislate saturate-vs-truncate policy for narrowing integer conversions; that is a
/// property of the registered kernel.
pub type ConvertFn = fn(src: &[u8], count: usize, out: &mut Vec<u8>);

#[derive(Default)]
struct ConversionRegistry {
    kernels: RwLock<HashMap<(String, String), ConvertFn>>,
}

fn registry() -> &'static ConversionRegistry {
    static REGISTRY: OnceLock<ConversionRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let reg = ConversionRegistry::default();
        register_builtin_kernels(&reg);
        reg
    })
}

fn register_builtin_kernels(reg: &ConversionRegistry) {
    reg.kernels.write().insert(
        (DType::complex_float32().name().to_string(), DType::float32().name().to_string()),
        complex_float32_to_float32 as ConvertFn,
    );
    reg.kernels.write().insert(
        (DType::float32().name().to_string(), DType::complex_float32().name().to_string()),
        float32_to_complex_float32 as ConvertFn,
    );
}

fn complex_float32_to_float32(src: &[u8], count: usize, out: &mut Vec<u8>) {
    out.clear();
    out.reserve(count * 4);
    for i in 0..count {
        let base = i * 8;
        out.extend_from_slice(&src[base..base + 4]); // real part only
    }
}

fn float32_to_complex_float32(src: &[u8], count: usize, out: &mut Vec<u8>) {
    out.clear();
    out.reserve(count * 8);
    for i in 0..count {
        let base = i * 4;
        out.extend_from_slice(&src[base..base + 4]);
        out.extend_from_slice(&[0u8; 4]); // imaginary part zeroed
    }
}

/// Register a conversion kernel for `(src, dst)`. Intended for block authors wiring up
/// custom dtypes; the core only ships the complex<->real kernels above.
pub fn register_conversion(src: DType, dst: DType, f: ConvertFn) {
    registry().kernels.write().insert((src.name().to_string(), dst.name().to_string()), f);
}

pub fn lookup_conversion(src: &DType, dst: &DType) -> Option<ConvertFn> {
    registry().kernels.read().get(&(src.name().to_string(), dst.name().to_string())).copied()
}

/// Two dtypes are "compatible" for a connection when they are equal, or when a
/// conversion kernel exists in either direction (the flattening step inserts the
/// conversion as an explicit block; see `topology`).
pub fn compatible(a: &DType, b: &DType) -> bool {
    a == b || lookup_conversion(a, b).is_some()
}
