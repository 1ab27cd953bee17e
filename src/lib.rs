//! SIMD-accelerated similarity and distance kernels with runtime CPU
//! dispatch.
//!
//! `simdist` computes pairwise similarity, distance, and divergence values
//! over numerical vectors, picking the best micro-kernel for the host CPU
//! at run time. It targets callers that evaluate millions of kernels per
//! second: vector indices, nearest-neighbor scans, database UDFs.
//!
//! # Architecture
//!
//! - A kernel matrix indexed by `(metric, dtype, tier)` lives in
//!   `kernels/`; every cell has a portable serial implementation, plus
//!   AVX2/AVX-512 tiers on x86_64 and a NEON tier on aarch64.
//! - [`capabilities`] probes the host CPU once and caches the tier
//!   bitmask; [`resolve`] binds a `(metric, dtype)` request to a concrete
//!   kernel pointer, honoring a caller-supplied tier allowance.
//! - [`batch`] applies a resolved kernel across row collections, with an
//!   optional scoped worker pool.
//!
//! # Typed surface
//!
//! For ordinary use, the per-metric traits dispatch through a process-wide
//! resolve-once cache:
//!
//! ```
//! use simdist::SpatialSimilarity;
//!
//! let d = f32::sqeuclidean(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0])?;
//! assert!((d - 27.0).abs() < 1e-6);
//! # Ok::<(), simdist::Error>(())
//! ```
//!
//! # Raw dispatch
//!
//! Hot paths resolve once and reuse the returned pointer:
//!
//! ```
//! use simdist::{resolve, Datatype, MetricKind, CAP_ANY};
//!
//! let kernel = resolve(MetricKind::Cos, Datatype::F32, CAP_ANY)
//!     .expect("cosine over f32 always resolves");
//! let (a, b) = ([1.0f32, 0.0], [0.0f32, 1.0]);
//! let mut out = 0.0f64;
//! unsafe { kernel.call(a.as_ptr().cast(), b.as_ptr().cast(), 2, &mut out) };
//! assert_eq!(out, 1.0);
//! ```
//!
//! Kernels never allocate, never panic, and define every numerical edge
//! case (zero norms, empty unions, zero probabilities) as a finite value
//! or `+∞`. Shape problems surface as [`Error`] before any kernel runs.

pub mod batch;
mod dispatch;
mod error;
mod kernels;
mod scalars;

pub use dispatch::{
    capabilities, dispatch_info, resolve, tier_names, Capability, Datatype, MetricFn, MetricKind,
    Resolved, CAP_ANY,
};
pub use error::{Error, Result};
pub use half::f16;
pub use scalars::{f32_to_f16, rsqrt};

use dispatch::resolve_cached;

fn invoke_real<T>(metric: MetricKind, datatype: Datatype, a: &[T], b: &[T]) -> Result<f64> {
    if a.is_empty() {
        return Err(Error::EmptyInput);
    }
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    let kernel =
        resolve_cached(metric, datatype).ok_or(Error::UnsupportedCombination { metric, datatype })?;
    let mut out = 0.0f64;
    unsafe { kernel.call(a.as_ptr().cast(), b.as_ptr().cast(), a.len(), &mut out) };
    Ok(out)
}

fn invoke_complex<T>(metric: MetricKind, datatype: Datatype, a: &[T], b: &[T]) -> Result<(f64, f64)> {
    if a.is_empty() {
        return Err(Error::EmptyInput);
    }
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    if a.len() % 2 != 0 {
        return Err(Error::OddComplexLength(a.len()));
    }
    let kernel =
        resolve_cached(metric, datatype).ok_or(Error::UnsupportedCombination { metric, datatype })?;
    let mut out = [0.0f64; 2];
    unsafe {
        kernel.call(
            a.as_ptr().cast(),
            b.as_ptr().cast(),
            a.len() / 2,
            out.as_mut_ptr(),
        )
    };
    Ok((out[0], out[1]))
}

/// Inner product, cosine distance, and squared Euclidean distance.
pub trait SpatialSimilarity: Sized {
    /// Unconjugated inner product.
    fn dot(a: &[Self], b: &[Self]) -> Result<f64>;
    /// `1 - cos(a, b)`; `1` when either vector has zero norm.
    fn cosine(a: &[Self], b: &[Self]) -> Result<f64>;
    /// Sum of squared element differences.
    fn sqeuclidean(a: &[Self], b: &[Self]) -> Result<f64>;
}

/// Hamming and Jaccard distances over packed bitsets (`n` counts bytes).
pub trait BinarySimilarity: Sized {
    /// Number of differing bits.
    fn hamming(a: &[Self], b: &[Self]) -> Result<f64>;
    /// `1 - |a AND b| / |a OR b|`; `0` when both sets are empty.
    fn jaccard(a: &[Self], b: &[Self]) -> Result<f64>;
}

/// Divergences between discrete probability distributions.
pub trait ProbabilitySimilarity: Sized {
    /// `Σ aᵢ ln(aᵢ/bᵢ)`; `+∞` when `b` has a zero under a positive `a`.
    fn kullback_leibler(a: &[Self], b: &[Self]) -> Result<f64>;
    /// Symmetrized divergence against the midpoint distribution.
    fn jensen_shannon(a: &[Self], b: &[Self]) -> Result<f64>;
}

/// Complex inner products over interleaved re/im slices of even length.
pub trait ComplexProducts: Sized {
    /// Complex inner product, no conjugation.
    fn dot(a: &[Self], b: &[Self]) -> Result<(f64, f64)>;
    /// Complex inner product with the first operand conjugated.
    fn vdot(a: &[Self], b: &[Self]) -> Result<(f64, f64)>;
}

macro_rules! impl_spatial {
    ($ty:ty, $datatype:expr) => {
        impl SpatialSimilarity for $ty {
            fn dot(a: &[Self], b: &[Self]) -> Result<f64> {
                invoke_real(MetricKind::Dot, $datatype, a, b)
            }
            fn cosine(a: &[Self], b: &[Self]) -> Result<f64> {
                invoke_real(MetricKind::Cos, $datatype, a, b)
            }
            fn sqeuclidean(a: &[Self], b: &[Self]) -> Result<f64> {
                invoke_real(MetricKind::L2sq, $datatype, a, b)
            }
        }
    };
}

impl_spatial!(f64, Datatype::F64);
impl_spatial!(f32, Datatype::F32);
impl_spatial!(f16, Datatype::F16);
impl_spatial!(i8, Datatype::I8);

impl BinarySimilarity for u8 {
    fn hamming(a: &[Self], b: &[Self]) -> Result<f64> {
        invoke_real(MetricKind::Hamming, Datatype::B8, a, b)
    }
    fn jaccard(a: &[Self], b: &[Self]) -> Result<f64> {
        invoke_real(MetricKind::Jaccard, Datatype::B8, a, b)
    }
}

macro_rules! impl_probability {
    ($ty:ty, $datatype:expr) => {
        impl ProbabilitySimilarity for $ty {
            fn kullback_leibler(a: &[Self], b: &[Self]) -> Result<f64> {
                invoke_real(MetricKind::Kl, $datatype, a, b)
            }
            fn jensen_shannon(a: &[Self], b: &[Self]) -> Result<f64> {
                invoke_real(MetricKind::Js, $datatype, a, b)
            }
        }
    };
}

impl_probability!(f64, Datatype::F64);
impl_probability!(f32, Datatype::F32);
impl_probability!(f16, Datatype::F16);

macro_rules! impl_complex {
    ($ty:ty, $datatype:expr) => {
        impl ComplexProducts for $ty {
            fn dot(a: &[Self], b: &[Self]) -> Result<(f64, f64)> {
                invoke_complex(MetricKind::Dot, $datatype, a, b)
            }
            fn vdot(a: &[Self], b: &[Self]) -> Result<(f64, f64)> {
                invoke_complex(MetricKind::VDot, $datatype, a, b)
            }
        }
    };
}

impl_complex!(f64, Datatype::F64c);
impl_complex!(f32, Datatype::F32c);
impl_complex!(f16, Datatype::F16c);
