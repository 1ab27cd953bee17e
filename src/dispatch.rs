//! Runtime CPU capability probe and kernel dispatch.
//!
//! The probe runs once per process and yields a bitmask of instruction-set
//! tiers. [`resolve`] intersects that mask with a caller-supplied allowance
//! and walks the tiers in descending order of power, returning the first
//! kernel registered for the requested `(metric, datatype)` cell. Cells a
//! tier does not provide simply fall through to the next tier; combinations
//! nothing provides resolve to `None`.
//!
//! The numeric values of [`MetricKind`] codes, [`Datatype`] ordinals, and
//! [`Capability`] bits are part of the stable interface and must not
//! change. Aliases (`inner` for `dot`, `tanimoto` for `jaccard`, ...) share
//! one code.
//!
//! For debugging, the opt-in environment variable `SIMDIST_DISABLE` (read
//! once, comma-separated tier names) masks tiers out of every resolution,
//! e.g. `SIMDIST_DISABLE=skylake,ice`. The serial tier cannot be disabled.

use core::ffi::c_void;
use std::sync::OnceLock;

/// Instruction-set tiers. Bit values are ABI-stable.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Portable scalar fallback, always present
    Serial = 1,
    /// Arm NEON, 128-bit lanes
    Neon = 1 << 10,
    /// Arm SVE, runtime-discovered vector length
    Sve = 1 << 11,
    /// Arm SVE2
    Sve2 = 1 << 12,
    /// x86 AVX2 with FMA and F16C
    Haswell = 1 << 20,
    /// x86 AVX-512 foundation
    Skylake = 1 << 21,
    /// x86 AVX-512 with VNNI, IFMA, BITALG, VBMI2, VPOPCNTDQ
    Ice = 1 << 22,
    /// x86 AVX-512 with FP16
    Sapphire = 1 << 23,
}

/// Mask accepting any capability.
pub const CAP_ANY: u32 = 0x7FFF_FFFF;

impl Capability {
    /// All tiers, in descending order of power.
    pub const DESCENDING: [Capability; 8] = [
        Capability::Sapphire,
        Capability::Ice,
        Capability::Skylake,
        Capability::Haswell,
        Capability::Sve2,
        Capability::Sve,
        Capability::Neon,
        Capability::Serial,
    ];

    /// The tier's bit in a capability mask.
    #[inline]
    pub const fn bit(self) -> u32 {
        self as u32
    }

    /// Human-readable tier name.
    pub const fn name(self) -> &'static str {
        match self {
            Capability::Serial => "serial",
            Capability::Neon => "neon",
            Capability::Sve => "sve",
            Capability::Sve2 => "sve2",
            Capability::Haswell => "haswell",
            Capability::Skylake => "skylake",
            Capability::Ice => "ice",
            Capability::Sapphire => "sapphire",
        }
    }

    /// Parse a tier name as used by `SIMDIST_DISABLE`.
    pub fn from_name(name: &str) -> Option<Capability> {
        Capability::DESCENDING
            .into_iter()
            .find(|cap| cap.name() == name)
    }
}

/// Metric kinds. Codes are the stable single-character tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Unconjugated inner product (alias: `inner`)
    Dot,
    /// Complex inner product with the first operand conjugated
    VDot,
    /// Cosine distance (aliases: `cosine`, `angular`)
    Cos,
    /// Squared Euclidean distance (alias: `sqeuclidean`)
    L2sq,
    /// Bit-level disagreement count (alias: `manhattan`)
    Hamming,
    /// Bitset dissimilarity (alias: `tanimoto`)
    Jaccard,
    /// Kullback-Leibler divergence (alias: `kullback_leibler`)
    Kl,
    /// Jensen-Shannon divergence (alias: `jensen_shannon`)
    Js,
}

impl MetricKind {
    /// Every metric kind, in code order.
    pub const ALL: [MetricKind; 8] = [
        MetricKind::Dot,
        MetricKind::VDot,
        MetricKind::Cos,
        MetricKind::L2sq,
        MetricKind::Hamming,
        MetricKind::Jaccard,
        MetricKind::Kl,
        MetricKind::Js,
    ];

    /// The stable single-character code.
    #[inline]
    pub const fn code(self) -> u8 {
        match self {
            MetricKind::Dot => b'i',
            MetricKind::VDot => b'v',
            MetricKind::Cos => b'c',
            MetricKind::L2sq => b'e',
            MetricKind::Hamming => b'h',
            MetricKind::Jaccard => b'j',
            MetricKind::Kl => b'k',
            MetricKind::Js => b's',
        }
    }

    /// Decode a metric code.
    pub const fn from_code(code: u8) -> Option<MetricKind> {
        match code {
            b'i' => Some(MetricKind::Dot),
            b'v' => Some(MetricKind::VDot),
            b'c' => Some(MetricKind::Cos),
            b'e' => Some(MetricKind::L2sq),
            b'h' => Some(MetricKind::Hamming),
            b'j' => Some(MetricKind::Jaccard),
            b'k' => Some(MetricKind::Kl),
            b's' => Some(MetricKind::Js),
            _ => None,
        }
    }

    /// Parse a metric name or one of its aliases.
    pub fn from_name(name: &str) -> Option<MetricKind> {
        match name {
            "dot" | "inner" => Some(MetricKind::Dot),
            "vdot" => Some(MetricKind::VDot),
            "cos" | "cosine" | "angular" => Some(MetricKind::Cos),
            "l2sq" | "sqeuclidean" => Some(MetricKind::L2sq),
            "hamming" | "manhattan" => Some(MetricKind::Hamming),
            "jaccard" | "tanimoto" => Some(MetricKind::Jaccard),
            "kl" | "kullback_leibler" => Some(MetricKind::Kl),
            "js" | "jensen_shannon" => Some(MetricKind::Js),
            _ => None,
        }
    }

    /// Output slots a resolved kernel writes: two for complex products,
    /// one otherwise.
    #[inline]
    pub const fn result_slots(self, datatype: Datatype) -> usize {
        match (self, datatype.is_complex()) {
            (MetricKind::Dot | MetricKind::VDot, true) => 2,
            _ => 1,
        }
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        match self {
            MetricKind::Dot => 0,
            MetricKind::VDot => 1,
            MetricKind::Cos => 2,
            MetricKind::L2sq => 3,
            MetricKind::Hamming => 4,
            MetricKind::Jaccard => 5,
            MetricKind::Kl => 6,
            MetricKind::Js => 7,
        }
    }
}

/// Scalar types of the kernel matrix. Ordinals are ABI-stable.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Datatype {
    /// Double-precision floating point
    F64 = 1,
    /// Single-precision floating point
    F32 = 2,
    /// Half-precision floating point, packed as 16-bit words
    F16 = 3,
    /// Signed 8-bit integer
    I8 = 4,
    /// 8 logical bits packed into one byte; `n` counts bytes
    B8 = 5,
    /// Complex double precision, interleaved re/im
    F64c = 6,
    /// Complex single precision, interleaved re/im
    F32c = 7,
    /// Complex half precision, interleaved re/im
    F16c = 8,
}

impl Datatype {
    /// Every datatype, in ordinal order.
    pub const ALL: [Datatype; 8] = [
        Datatype::F64,
        Datatype::F32,
        Datatype::F16,
        Datatype::I8,
        Datatype::B8,
        Datatype::F64c,
        Datatype::F32c,
        Datatype::F16c,
    ];

    /// The stable numeric ordinal.
    #[inline]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Decode an ordinal.
    pub const fn from_ordinal(ordinal: u8) -> Option<Datatype> {
        match ordinal {
            1 => Some(Datatype::F64),
            2 => Some(Datatype::F32),
            3 => Some(Datatype::F16),
            4 => Some(Datatype::I8),
            5 => Some(Datatype::B8),
            6 => Some(Datatype::F64c),
            7 => Some(Datatype::F32c),
            8 => Some(Datatype::F16c),
            _ => None,
        }
    }

    /// Size in bytes of one underlying scalar word.
    #[inline]
    pub const fn scalar_size(self) -> usize {
        match self {
            Datatype::F64 | Datatype::F64c => 8,
            Datatype::F32 | Datatype::F32c => 4,
            Datatype::F16 | Datatype::F16c => 2,
            Datatype::I8 | Datatype::B8 => 1,
        }
    }

    /// Scalar words per logical element: two for complex types.
    #[inline]
    pub const fn words_per_element(self) -> usize {
        if self.is_complex() {
            2
        } else {
            1
        }
    }

    #[inline]
    pub const fn is_complex(self) -> bool {
        matches!(self, Datatype::F64c | Datatype::F32c | Datatype::F16c)
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.ordinal() as usize - 1
    }
}

/// Type-punned kernel pointer: two input buffers, a logical element count,
/// and an output slot (two slots for complex products).
pub type MetricFn = unsafe fn(*const c_void, *const c_void, usize, *mut f64);

/// A kernel bound to a `(metric, datatype)` cell, plus the tier it came
/// from. Resolve once per cell and reuse.
#[derive(Debug, Clone, Copy)]
pub struct Resolved {
    pub func: MetricFn,
    pub capability: Capability,
    pub metric: MetricKind,
    pub datatype: Datatype,
}

impl Resolved {
    /// Output slots this kernel writes at `out`.
    #[inline]
    pub fn result_slots(&self) -> usize {
        self.metric.result_slots(self.datatype)
    }

    /// Invoke the kernel.
    ///
    /// # Safety
    ///
    /// `a` and `b` must each address `n` valid logical elements of the
    /// resolved datatype (`2n` scalar words for complex types, `n` bytes
    /// for `b8`), and `out` must have room for [`Self::result_slots`]
    /// values.
    #[inline]
    pub unsafe fn call(&self, a: *const c_void, b: *const c_void, n: usize, out: *mut f64) {
        unsafe { (self.func)(a, b, n, out) }
    }
}

// ============================================================================
// Capability probe
// ============================================================================

fn detect() -> u32 {
    let mut caps = Capability::Serial.bit();

    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2")
            && is_x86_feature_detected!("fma")
            && is_x86_feature_detected!("f16c")
        {
            caps |= Capability::Haswell.bit();
        }
        if is_x86_feature_detected!("avx512f") {
            caps |= Capability::Skylake.bit();
        }
        if is_x86_feature_detected!("avx512vnni")
            && is_x86_feature_detected!("avx512ifma")
            && is_x86_feature_detected!("avx512bitalg")
            && is_x86_feature_detected!("avx512vbmi2")
            && is_x86_feature_detected!("avx512vpopcntdq")
            && is_x86_feature_detected!("avx512bw")
            && is_x86_feature_detected!("avx512vl")
        {
            caps |= Capability::Ice.bit();
        }
        // AVX-512 FP16 lives in cpuid leaf 7, EDX bit 23
        let leaf7 = unsafe { core::arch::x86_64::__cpuid_count(7, 0) };
        if leaf7.edx & (1 << 23) != 0 {
            caps |= Capability::Sapphire.bit();
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        caps |= Capability::Neon.bit();
        if std::arch::is_aarch64_feature_detected!("sve") {
            caps |= Capability::Sve.bit();
        }
        if std::arch::is_aarch64_feature_detected!("sve2") {
            caps |= Capability::Sve2.bit();
        }
    }

    caps
}

/// Bitmask of instruction-set tiers the host CPU supports.
///
/// Detected once on first call and cached process-wide; safe for
/// unsynchronized concurrent use.
pub fn capabilities() -> u32 {
    static CAPABILITIES: OnceLock<u32> = OnceLock::new();
    *CAPABILITIES.get_or_init(|| {
        let caps = detect();
        tracing::debug!(tiers = %tier_names(caps).join(","), "detected CPU capabilities");
        caps
    })
}

/// Names of the tiers set in `mask`, most powerful first.
pub fn tier_names(mask: u32) -> Vec<&'static str> {
    Capability::DESCENDING
        .into_iter()
        .filter(|cap| mask & cap.bit() != 0)
        .map(Capability::name)
        .collect()
}

/// Human-readable capability report.
pub fn dispatch_info() -> String {
    format!(
        "simdist tiers: {}",
        tier_names(capabilities() & !disabled_mask()).join(" > ")
    )
}

fn disabled_mask() -> u32 {
    static DISABLED: OnceLock<u32> = OnceLock::new();
    *DISABLED.get_or_init(|| {
        let Ok(raw) = std::env::var("SIMDIST_DISABLE") else {
            return 0;
        };
        let mut mask = 0u32;
        for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match Capability::from_name(name) {
                Some(Capability::Serial) => {
                    tracing::warn!("the serial tier cannot be disabled");
                }
                Some(cap) => mask |= cap.bit(),
                None => {
                    tracing::warn!(tier = name, "unknown tier name in SIMDIST_DISABLE");
                }
            }
        }
        mask
    })
}

// ============================================================================
// Type-punned kernel adapters
// ============================================================================

macro_rules! punned_real {
    ($name:ident, $ty:ty, $kernel:expr) => {
        pub(crate) unsafe fn $name(a: *const c_void, b: *const c_void, n: usize, out: *mut f64) {
            let a = core::slice::from_raw_parts(a.cast::<$ty>(), n);
            let b = core::slice::from_raw_parts(b.cast::<$ty>(), n);
            *out = $kernel(a, b);
        }
    };
}

macro_rules! punned_complex {
    ($name:ident, $ty:ty, $kernel:expr) => {
        pub(crate) unsafe fn $name(a: *const c_void, b: *const c_void, n: usize, out: *mut f64) {
            let a = core::slice::from_raw_parts(a.cast::<$ty>(), n * 2);
            let b = core::slice::from_raw_parts(b.cast::<$ty>(), n * 2);
            let (re, im) = $kernel(a, b);
            *out = re;
            *out.add(1) = im;
        }
    };
}

#[allow(unsafe_op_in_unsafe_fn)]
mod punned {
    use crate::kernels::{binary, dot, probability, spatial};
    use core::ffi::c_void;

    punned_real!(dot_f64_serial, f64, dot::dot_f64_serial);
    punned_real!(dot_f32_serial, f32, dot::dot_f32_serial);
    punned_real!(dot_f16_serial, u16, dot::dot_f16_serial);
    punned_real!(dot_i8_serial, i8, dot::dot_i8_serial);
    punned_real!(cos_f64_serial, f64, spatial::cos_f64_serial);
    punned_real!(cos_f32_serial, f32, spatial::cos_f32_serial);
    punned_real!(cos_f16_serial, u16, spatial::cos_f16_serial);
    punned_real!(cos_i8_serial, i8, spatial::cos_i8_serial);
    punned_real!(l2sq_f64_serial, f64, spatial::l2sq_f64_serial);
    punned_real!(l2sq_f32_serial, f32, spatial::l2sq_f32_serial);
    punned_real!(l2sq_f16_serial, u16, spatial::l2sq_f16_serial);
    punned_real!(l2sq_i8_serial, i8, spatial::l2sq_i8_serial);
    punned_real!(hamming_b8_serial, u8, binary::hamming_b8_serial);
    punned_real!(jaccard_b8_serial, u8, binary::jaccard_b8_serial);
    punned_real!(kl_f64_serial, f64, probability::kl_f64_serial);
    punned_real!(kl_f32_serial, f32, probability::kl_f32_serial);
    punned_real!(kl_f16_serial, u16, probability::kl_f16_serial);
    punned_real!(js_f64_serial, f64, probability::js_f64_serial);
    punned_real!(js_f32_serial, f32, probability::js_f32_serial);
    punned_real!(js_f16_serial, u16, probability::js_f16_serial);
    punned_complex!(dot_f64c_serial, f64, dot::dot_f64c_serial);
    punned_complex!(dot_f32c_serial, f32, dot::dot_f32c_serial);
    punned_complex!(dot_f16c_serial, u16, dot::dot_f16c_serial);
    punned_complex!(vdot_f64c_serial, f64, dot::vdot_f64c_serial);
    punned_complex!(vdot_f32c_serial, f32, dot::vdot_f32c_serial);
    punned_complex!(vdot_f16c_serial, u16, dot::vdot_f16c_serial);

    #[cfg(target_arch = "x86_64")]
    pub(crate) mod x86 {
        use crate::kernels::{binary, dot, probability, spatial};
        use core::ffi::c_void;

        punned_real!(dot_f32_haswell, f32, dot::dot_f32_haswell);
        punned_real!(dot_f16_haswell, u16, dot::dot_f16_haswell);
        punned_real!(dot_i8_haswell, i8, dot::dot_i8_haswell);
        punned_real!(cos_f32_haswell, f32, spatial::cos_f32_haswell);
        punned_real!(cos_f16_haswell, u16, spatial::cos_f16_haswell);
        punned_real!(cos_i8_haswell, i8, spatial::cos_i8_haswell);
        punned_real!(l2sq_f32_haswell, f32, spatial::l2sq_f32_haswell);
        punned_real!(l2sq_f16_haswell, u16, spatial::l2sq_f16_haswell);
        punned_real!(l2sq_i8_haswell, i8, spatial::l2sq_i8_haswell);
        punned_real!(hamming_b8_haswell, u8, binary::hamming_b8_haswell);
        punned_real!(jaccard_b8_haswell, u8, binary::jaccard_b8_haswell);
        punned_real!(kl_f32_haswell, f32, probability::kl_f32_haswell);
        punned_real!(kl_f16_haswell, u16, probability::kl_f16_haswell);
        punned_real!(js_f32_haswell, f32, probability::js_f32_haswell);
        punned_real!(js_f16_haswell, u16, probability::js_f16_haswell);
        punned_complex!(dot_f32c_haswell, f32, dot::dot_f32c_haswell);
        punned_complex!(dot_f16c_haswell, u16, dot::dot_f16c_haswell);
        punned_complex!(vdot_f32c_haswell, f32, dot::vdot_f32c_haswell);
        punned_complex!(vdot_f16c_haswell, u16, dot::vdot_f16c_haswell);

        punned_real!(dot_f64_skylake, f64, dot::dot_f64_skylake);
        punned_real!(dot_f32_skylake, f32, dot::dot_f32_skylake);
        punned_real!(cos_f64_skylake, f64, spatial::cos_f64_skylake);
        punned_real!(cos_f32_skylake, f32, spatial::cos_f32_skylake);
        punned_real!(l2sq_f64_skylake, f64, spatial::l2sq_f64_skylake);
        punned_real!(l2sq_f32_skylake, f32, spatial::l2sq_f32_skylake);
        punned_real!(kl_f32_skylake, f32, probability::kl_f32_skylake);
        punned_real!(js_f32_skylake, f32, probability::js_f32_skylake);
        punned_complex!(dot_f64c_skylake, f64, dot::dot_f64c_skylake);
        punned_complex!(dot_f32c_skylake, f32, dot::dot_f32c_skylake);
        punned_complex!(vdot_f64c_skylake, f64, dot::vdot_f64c_skylake);
        punned_complex!(vdot_f32c_skylake, f32, dot::vdot_f32c_skylake);

        punned_real!(dot_i8_ice, i8, dot::dot_i8_ice);
        punned_real!(cos_i8_ice, i8, spatial::cos_i8_ice);
        punned_real!(l2sq_i8_ice, i8, spatial::l2sq_i8_ice);
        punned_real!(hamming_b8_ice, u8, binary::hamming_b8_ice);
        punned_real!(jaccard_b8_ice, u8, binary::jaccard_b8_ice);
    }

    #[cfg(target_arch = "aarch64")]
    pub(crate) mod arm {
        use crate::kernels::{binary, dot, probability, spatial};
        use core::ffi::c_void;

        punned_real!(dot_f32_neon, f32, dot::dot_f32_neon);
        punned_real!(dot_i8_neon, i8, dot::dot_i8_neon);
        punned_real!(cos_f32_neon, f32, spatial::cos_f32_neon);
        punned_real!(cos_i8_neon, i8, spatial::cos_i8_neon);
        punned_real!(l2sq_f32_neon, f32, spatial::l2sq_f32_neon);
        punned_real!(l2sq_i8_neon, i8, spatial::l2sq_i8_neon);
        punned_real!(hamming_b8_neon, u8, binary::hamming_b8_neon);
        punned_real!(jaccard_b8_neon, u8, binary::jaccard_b8_neon);
        punned_real!(kl_f32_neon, f32, probability::kl_f32_neon);
        punned_real!(js_f32_neon, f32, probability::js_f32_neon);
        punned_complex!(dot_f32c_neon, f32, dot::dot_f32c_neon);
        punned_complex!(vdot_f32c_neon, f32, dot::vdot_f32c_neon);
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Bind `(metric, datatype)` to the most powerful viable kernel.
///
/// `viable = capabilities() & allowed`, minus any tiers disabled through
/// `SIMDIST_DISABLE`. Walks sapphire > ice > skylake > haswell > sve > neon
/// > serial; within the first viable tier holding the cell, that kernel
/// wins. Returns `None` for combinations no tier provides (e.g. `jaccard`
/// over `f32`). Pure and allocation-free; resolve once per cell and reuse.
pub fn resolve(metric: MetricKind, datatype: Datatype, allowed: u32) -> Option<Resolved> {
    let viable = capabilities() & allowed & !disabled_mask();
    let pick = |func: MetricFn, capability: Capability| {
        Some(Resolved {
            func,
            capability,
            metric,
            datatype,
        })
    };
    use Capability as Cap;
    use MetricKind::*;

    match datatype {
        Datatype::F64 => {
            #[cfg(target_arch = "x86_64")]
            if viable & Cap::Skylake.bit() != 0 {
                match metric {
                    Dot => return pick(punned::x86::dot_f64_skylake, Cap::Skylake),
                    Cos => return pick(punned::x86::cos_f64_skylake, Cap::Skylake),
                    L2sq => return pick(punned::x86::l2sq_f64_skylake, Cap::Skylake),
                    _ => {}
                }
            }
            if viable & Cap::Serial.bit() != 0 {
                match metric {
                    Dot => return pick(punned::dot_f64_serial, Cap::Serial),
                    Cos => return pick(punned::cos_f64_serial, Cap::Serial),
                    L2sq => return pick(punned::l2sq_f64_serial, Cap::Serial),
                    Kl => return pick(punned::kl_f64_serial, Cap::Serial),
                    Js => return pick(punned::js_f64_serial, Cap::Serial),
                    _ => {}
                }
            }
            None
        }

        Datatype::F32 => {
            #[cfg(target_arch = "x86_64")]
            {
                if viable & Cap::Skylake.bit() != 0 {
                    match metric {
                        Dot => return pick(punned::x86::dot_f32_skylake, Cap::Skylake),
                        Cos => return pick(punned::x86::cos_f32_skylake, Cap::Skylake),
                        L2sq => return pick(punned::x86::l2sq_f32_skylake, Cap::Skylake),
                        Kl => return pick(punned::x86::kl_f32_skylake, Cap::Skylake),
                        Js => return pick(punned::x86::js_f32_skylake, Cap::Skylake),
                        _ => {}
                    }
                }
                if viable & Cap::Haswell.bit() != 0 {
                    match metric {
                        Dot => return pick(punned::x86::dot_f32_haswell, Cap::Haswell),
                        Cos => return pick(punned::x86::cos_f32_haswell, Cap::Haswell),
                        L2sq => return pick(punned::x86::l2sq_f32_haswell, Cap::Haswell),
                        Kl => return pick(punned::x86::kl_f32_haswell, Cap::Haswell),
                        Js => return pick(punned::x86::js_f32_haswell, Cap::Haswell),
                        _ => {}
                    }
                }
            }
            #[cfg(target_arch = "aarch64")]
            if viable & Cap::Neon.bit() != 0 {
                match metric {
                    Dot => return pick(punned::arm::dot_f32_neon, Cap::Neon),
                    Cos => return pick(punned::arm::cos_f32_neon, Cap::Neon),
                    L2sq => return pick(punned::arm::l2sq_f32_neon, Cap::Neon),
                    Kl => return pick(punned::arm::kl_f32_neon, Cap::Neon),
                    Js => return pick(punned::arm::js_f32_neon, Cap::Neon),
                    _ => {}
                }
            }
            if viable & Cap::Serial.bit() != 0 {
                match metric {
                    Dot => return pick(punned::dot_f32_serial, Cap::Serial),
                    Cos => return pick(punned::cos_f32_serial, Cap::Serial),
                    L2sq => return pick(punned::l2sq_f32_serial, Cap::Serial),
                    Kl => return pick(punned::kl_f32_serial, Cap::Serial),
                    Js => return pick(punned::js_f32_serial, Cap::Serial),
                    _ => {}
                }
            }
            None
        }

        Datatype::F16 => {
            #[cfg(target_arch = "x86_64")]
            if viable & Cap::Haswell.bit() != 0 {
                match metric {
                    Dot => return pick(punned::x86::dot_f16_haswell, Cap::Haswell),
                    Cos => return pick(punned::x86::cos_f16_haswell, Cap::Haswell),
                    L2sq => return pick(punned::x86::l2sq_f16_haswell, Cap::Haswell),
                    Kl => return pick(punned::x86::kl_f16_haswell, Cap::Haswell),
                    Js => return pick(punned::x86::js_f16_haswell, Cap::Haswell),
                    _ => {}
                }
            }
            if viable & Cap::Serial.bit() != 0 {
                match metric {
                    Dot => return pick(punned::dot_f16_serial, Cap::Serial),
                    Cos => return pick(punned::cos_f16_serial, Cap::Serial),
                    L2sq => return pick(punned::l2sq_f16_serial, Cap::Serial),
                    Kl => return pick(punned::kl_f16_serial, Cap::Serial),
                    Js => return pick(punned::js_f16_serial, Cap::Serial),
                    _ => {}
                }
            }
            None
        }

        Datatype::I8 => {
            #[cfg(target_arch = "x86_64")]
            {
                if viable & Cap::Ice.bit() != 0 {
                    match metric {
                        Dot => return pick(punned::x86::dot_i8_ice, Cap::Ice),
                        Cos => return pick(punned::x86::cos_i8_ice, Cap::Ice),
                        L2sq => return pick(punned::x86::l2sq_i8_ice, Cap::Ice),
                        _ => {}
                    }
                }
                if viable & Cap::Haswell.bit() != 0 {
                    match metric {
                        Dot => return pick(punned::x86::dot_i8_haswell, Cap::Haswell),
                        Cos => return pick(punned::x86::cos_i8_haswell, Cap::Haswell),
                        L2sq => return pick(punned::x86::l2sq_i8_haswell, Cap::Haswell),
                        _ => {}
                    }
                }
            }
            #[cfg(target_arch = "aarch64")]
            if viable & Cap::Neon.bit() != 0 {
                match metric {
                    Dot => return pick(punned::arm::dot_i8_neon, Cap::Neon),
                    Cos => return pick(punned::arm::cos_i8_neon, Cap::Neon),
                    L2sq => return pick(punned::arm::l2sq_i8_neon, Cap::Neon),
                    _ => {}
                }
            }
            if viable & Cap::Serial.bit() != 0 {
                match metric {
                    Dot => return pick(punned::dot_i8_serial, Cap::Serial),
                    Cos => return pick(punned::cos_i8_serial, Cap::Serial),
                    L2sq => return pick(punned::l2sq_i8_serial, Cap::Serial),
                    _ => {}
                }
            }
            None
        }

        Datatype::B8 => {
            #[cfg(target_arch = "x86_64")]
            {
                if viable & Cap::Ice.bit() != 0 {
                    match metric {
                        Hamming => return pick(punned::x86::hamming_b8_ice, Cap::Ice),
                        Jaccard => return pick(punned::x86::jaccard_b8_ice, Cap::Ice),
                        _ => {}
                    }
                }
                if viable & Cap::Haswell.bit() != 0 {
                    match metric {
                        Hamming => return pick(punned::x86::hamming_b8_haswell, Cap::Haswell),
                        Jaccard => return pick(punned::x86::jaccard_b8_haswell, Cap::Haswell),
                        _ => {}
                    }
                }
            }
            #[cfg(target_arch = "aarch64")]
            if viable & Cap::Neon.bit() != 0 {
                match metric {
                    Hamming => return pick(punned::arm::hamming_b8_neon, Cap::Neon),
                    Jaccard => return pick(punned::arm::jaccard_b8_neon, Cap::Neon),
                    _ => {}
                }
            }
            if viable & Cap::Serial.bit() != 0 {
                match metric {
                    Hamming => return pick(punned::hamming_b8_serial, Cap::Serial),
                    Jaccard => return pick(punned::jaccard_b8_serial, Cap::Serial),
                    _ => {}
                }
            }
            None
        }

        Datatype::F64c => {
            #[cfg(target_arch = "x86_64")]
            if viable & Cap::Skylake.bit() != 0 {
                match metric {
                    Dot => return pick(punned::x86::dot_f64c_skylake, Cap::Skylake),
                    VDot => return pick(punned::x86::vdot_f64c_skylake, Cap::Skylake),
                    _ => {}
                }
            }
            if viable & Cap::Serial.bit() != 0 {
                match metric {
                    Dot => return pick(punned::dot_f64c_serial, Cap::Serial),
                    VDot => return pick(punned::vdot_f64c_serial, Cap::Serial),
                    _ => {}
                }
            }
            None
        }

        Datatype::F32c => {
            #[cfg(target_arch = "x86_64")]
            {
                if viable & Cap::Skylake.bit() != 0 {
                    match metric {
                        Dot => return pick(punned::x86::dot_f32c_skylake, Cap::Skylake),
                        VDot => return pick(punned::x86::vdot_f32c_skylake, Cap::Skylake),
                        _ => {}
                    }
                }
                if viable & Cap::Haswell.bit() != 0 {
                    match metric {
                        Dot => return pick(punned::x86::dot_f32c_haswell, Cap::Haswell),
                        VDot => return pick(punned::x86::vdot_f32c_haswell, Cap::Haswell),
                        _ => {}
                    }
                }
            }
            #[cfg(target_arch = "aarch64")]
            if viable & Cap::Neon.bit() != 0 {
                match metric {
                    Dot => return pick(punned::arm::dot_f32c_neon, Cap::Neon),
                    VDot => return pick(punned::arm::vdot_f32c_neon, Cap::Neon),
                    _ => {}
                }
            }
            if viable & Cap::Serial.bit() != 0 {
                match metric {
                    Dot => return pick(punned::dot_f32c_serial, Cap::Serial),
                    VDot => return pick(punned::vdot_f32c_serial, Cap::Serial),
                    _ => {}
                }
            }
            None
        }

        Datatype::F16c => {
            #[cfg(target_arch = "x86_64")]
            if viable & Cap::Haswell.bit() != 0 {
                match metric {
                    Dot => return pick(punned::x86::dot_f16c_haswell, Cap::Haswell),
                    VDot => return pick(punned::x86::vdot_f16c_haswell, Cap::Haswell),
                    _ => {}
                }
            }
            if viable & Cap::Serial.bit() != 0 {
                match metric {
                    Dot => return pick(punned::dot_f16c_serial, Cap::Serial),
                    VDot => return pick(punned::vdot_f16c_serial, Cap::Serial),
                    _ => {}
                }
            }
            None
        }
    }
}

/// Process-wide resolve-once cache backing the typed trait surface.
pub(crate) fn resolve_cached(metric: MetricKind, datatype: Datatype) -> Option<Resolved> {
    const CELL: OnceLock<Option<Resolved>> = OnceLock::new();
    const ROW: [OnceLock<Option<Resolved>>; 8] = [CELL; 8];
    static CACHE: [[OnceLock<Option<Resolved>>; 8]; 8] = [ROW; 8];
    *CACHE[metric.index()][datatype.index()].get_or_init(|| resolve(metric, datatype, CAP_ANY))
}
