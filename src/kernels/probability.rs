//! Probability divergences: Kullback-Leibler and Jensen-Shannon.
//!
//! `kl(a, b) = Σ aᵢ·ln(aᵢ/bᵢ)` with exact zero-lane semantics: a zero on
//! the left contributes nothing, a zero on the right under a positive left
//! lane makes the whole divergence `+∞`. `js` evaluates both inputs against
//! their midpoint and can never produce `+∞`.
//!
//! The SIMD tiers use a cephes-style vectorized natural log: clamp to the
//! smallest positive normal, split the word into exponent and mantissa,
//! renormalize the mantissa into `[√½, √2)`, run a degree-8 polynomial, and
//! recombine with a split ln 2. Lanes whose left operand is not positive
//! are blended out of the accumulator before they can poison it, and the
//! right-side zero condition is tracked as a comparison mask, so the
//! polynomial's behavior on garbage lanes never reaches the result.

use crate::scalars::f16_to_f32;

const LN2_HI: f32 = 0.693_359_375;
const LN2_LO: f32 = -2.121_944_4e-4;
const SQRT_HALF: f32 = std::f32::consts::FRAC_1_SQRT_2;

const LOG_P0: f32 = 7.037_683_6e-2;
const LOG_P1: f32 = -1.151_461_03e-1;
const LOG_P2: f32 = 1.167_699_87e-1;
const LOG_P3: f32 = -1.242_014_08e-1;
const LOG_P4: f32 = 1.424_932_28e-1;
const LOG_P5: f32 = -1.666_805_77e-1;
const LOG_P6: f32 = 2.000_071_48e-1;
const LOG_P7: f32 = -2.499_999_4e-1;
const LOG_P8: f32 = 3.333_333_12e-1;

// ============================================================================
// Serial
// ============================================================================

pub(crate) fn kl_f64_serial(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let mut sum = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        if x <= 0.0 {
            continue;
        }
        if y <= 0.0 {
            return f64::INFINITY;
        }
        sum += x * (x / y).ln();
    }
    sum
}

pub(crate) fn kl_f32_serial(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let mut sum = 0.0f32;
    for (&x, &y) in a.iter().zip(b.iter()) {
        if x <= 0.0 {
            continue;
        }
        if y <= 0.0 {
            return f64::INFINITY;
        }
        sum += x * (x / y).ln();
    }
    sum as f64
}

pub(crate) fn kl_f16_serial(a: &[u16], b: &[u16]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let mut sum = 0.0f32;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f16_to_f32(x), f16_to_f32(y));
        if x <= 0.0 {
            continue;
        }
        if y <= 0.0 {
            return f64::INFINITY;
        }
        sum += x * (x / y).ln();
    }
    sum as f64
}

pub(crate) fn js_f64_serial(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let mut sum = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let m = 0.5 * (x + y);
        if x > 0.0 {
            sum += x * (x / m).ln();
        }
        if y > 0.0 {
            sum += y * (y / m).ln();
        }
    }
    0.5 * sum
}

pub(crate) fn js_f32_serial(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let mut sum = 0.0f32;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let m = 0.5 * (x + y);
        if x > 0.0 {
            sum += x * (x / m).ln();
        }
        if y > 0.0 {
            sum += y * (y / m).ln();
        }
    }
    0.5 * sum as f64
}

pub(crate) fn js_f16_serial(a: &[u16], b: &[u16]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let mut sum = 0.0f32;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f16_to_f32(x), f16_to_f32(y));
        let m = 0.5 * (x + y);
        if x > 0.0 {
            sum += x * (x / m).ln();
        }
        if y > 0.0 {
            sum += y * (y / m).ln();
        }
    }
    0.5 * sum as f64
}

// ============================================================================
// x86_64: haswell (AVX2 + FMA)
// ============================================================================

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma")]
unsafe fn ln256_ps(x: core::arch::x86_64::__m256) -> core::arch::x86_64::__m256 {
    use core::arch::x86_64::*;

    unsafe {
        let one = _mm256_set1_ps(1.0);
        let x = _mm256_max_ps(x, _mm256_set1_ps(f32::MIN_POSITIVE));

        let xi = _mm256_castps_si256(x);
        let exp = _mm256_sub_epi32(_mm256_srli_epi32::<23>(xi), _mm256_set1_epi32(0x7f));
        let mut e = _mm256_add_ps(_mm256_cvtepi32_ps(exp), one);

        // Mantissa renormalized into [0.5, 1), then shifted to [sqrt(1/2), sqrt(2))
        let mant = _mm256_or_si256(
            _mm256_and_si256(xi, _mm256_set1_epi32(0x007f_ffff)),
            _mm256_castps_si256(_mm256_set1_ps(0.5)),
        );
        let mut x = _mm256_castsi256_ps(mant);

        let below = _mm256_cmp_ps::<_CMP_LT_OQ>(x, _mm256_set1_ps(SQRT_HALF));
        let tmp = _mm256_and_ps(x, below);
        x = _mm256_sub_ps(x, one);
        e = _mm256_sub_ps(e, _mm256_and_ps(one, below));
        x = _mm256_add_ps(x, tmp);

        let z = _mm256_mul_ps(x, x);
        let mut y = _mm256_set1_ps(LOG_P0);
        y = _mm256_fmadd_ps(y, x, _mm256_set1_ps(LOG_P1));
        y = _mm256_fmadd_ps(y, x, _mm256_set1_ps(LOG_P2));
        y = _mm256_fmadd_ps(y, x, _mm256_set1_ps(LOG_P3));
        y = _mm256_fmadd_ps(y, x, _mm256_set1_ps(LOG_P4));
        y = _mm256_fmadd_ps(y, x, _mm256_set1_ps(LOG_P5));
        y = _mm256_fmadd_ps(y, x, _mm256_set1_ps(LOG_P6));
        y = _mm256_fmadd_ps(y, x, _mm256_set1_ps(LOG_P7));
        y = _mm256_fmadd_ps(y, x, _mm256_set1_ps(LOG_P8));
        y = _mm256_mul_ps(_mm256_mul_ps(y, x), z);

        y = _mm256_fmadd_ps(e, _mm256_set1_ps(LN2_LO), y);
        y = _mm256_fmadd_ps(_mm256_set1_ps(-0.5), z, y);
        x = _mm256_add_ps(x, y);
        _mm256_fmadd_ps(e, _mm256_set1_ps(LN2_HI), x)
    }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma")]
pub(crate) unsafe fn kl_f32_haswell(a: &[f32], b: &[f32]) -> f64 {
    use core::arch::x86_64::*;

    unsafe {
        let n = a.len();
        let aligned = (n / 8) * 8;
        let zero = _mm256_setzero_ps();
        let mut acc = zero;
        let mut bad = zero;
        let mut i = 0;

        while i < aligned {
            let va = _mm256_loadu_ps(a.as_ptr().add(i));
            let vb = _mm256_loadu_ps(b.as_ptr().add(i));
            let a_pos = _mm256_cmp_ps::<_CMP_GT_OQ>(va, zero);
            let b_zero = _mm256_cmp_ps::<_CMP_LE_OQ>(vb, zero);
            bad = _mm256_or_ps(bad, _mm256_and_ps(a_pos, b_zero));

            let term = _mm256_mul_ps(va, ln256_ps(_mm256_div_ps(va, vb)));
            acc = _mm256_add_ps(acc, _mm256_and_ps(term, a_pos));
            i += 8;
        }

        if _mm256_movemask_ps(bad) != 0 {
            return f64::INFINITY;
        }
        let mut sum = super::x86::hsum256_ps(acc);
        while i < n {
            let (x, y) = (a[i], b[i]);
            if x > 0.0 {
                if y <= 0.0 {
                    return f64::INFINITY;
                }
                sum += x * (x / y).ln();
            }
            i += 1;
        }
        sum as f64
    }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma")]
pub(crate) unsafe fn js_f32_haswell(a: &[f32], b: &[f32]) -> f64 {
    use core::arch::x86_64::*;

    unsafe {
        let n = a.len();
        let aligned = (n / 8) * 8;
        let zero = _mm256_setzero_ps();
        let half = _mm256_set1_ps(0.5);
        let mut acc = zero;
        let mut i = 0;

        while i < aligned {
            let va = _mm256_loadu_ps(a.as_ptr().add(i));
            let vb = _mm256_loadu_ps(b.as_ptr().add(i));
            let vm = _mm256_mul_ps(half, _mm256_add_ps(va, vb));

            let a_pos = _mm256_cmp_ps::<_CMP_GT_OQ>(va, zero);
            let b_pos = _mm256_cmp_ps::<_CMP_GT_OQ>(vb, zero);

            let term_a = _mm256_mul_ps(va, ln256_ps(_mm256_div_ps(va, vm)));
            let term_b = _mm256_mul_ps(vb, ln256_ps(_mm256_div_ps(vb, vm)));
            acc = _mm256_add_ps(acc, _mm256_and_ps(term_a, a_pos));
            acc = _mm256_add_ps(acc, _mm256_and_ps(term_b, b_pos));
            i += 8;
        }

        let mut sum = super::x86::hsum256_ps(acc);
        while i < n {
            let (x, y) = (a[i], b[i]);
            let m = 0.5 * (x + y);
            if x > 0.0 {
                sum += x * (x / m).ln();
            }
            if y > 0.0 {
                sum += y * (y / m).ln();
            }
            i += 1;
        }
        0.5 * sum as f64
    }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma,f16c")]
pub(crate) unsafe fn kl_f16_haswell(a: &[u16], b: &[u16]) -> f64 {
    use core::arch::x86_64::*;

    unsafe {
        let n = a.len();
        let aligned = (n / 8) * 8;
        let zero = _mm256_setzero_ps();
        let mut acc = zero;
        let mut bad = zero;
        let mut i = 0;

        while i < aligned {
            let va = _mm256_cvtph_ps(_mm_loadu_si128(a.as_ptr().add(i) as *const __m128i));
            let vb = _mm256_cvtph_ps(_mm_loadu_si128(b.as_ptr().add(i) as *const __m128i));
            let a_pos = _mm256_cmp_ps::<_CMP_GT_OQ>(va, zero);
            let b_zero = _mm256_cmp_ps::<_CMP_LE_OQ>(vb, zero);
            bad = _mm256_or_ps(bad, _mm256_and_ps(a_pos, b_zero));

            let term = _mm256_mul_ps(va, ln256_ps(_mm256_div_ps(va, vb)));
            acc = _mm256_add_ps(acc, _mm256_and_ps(term, a_pos));
            i += 8;
        }

        if _mm256_movemask_ps(bad) != 0 {
            return f64::INFINITY;
        }
        let mut sum = super::x86::hsum256_ps(acc);
        while i < n {
            let (x, y) = (f16_to_f32(a[i]), f16_to_f32(b[i]));
            if x > 0.0 {
                if y <= 0.0 {
                    return f64::INFINITY;
                }
                sum += x * (x / y).ln();
            }
            i += 1;
        }
        sum as f64
    }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma,f16c")]
pub(crate) unsafe fn js_f16_haswell(a: &[u16], b: &[u16]) -> f64 {
    use core::arch::x86_64::*;

    unsafe {
        let n = a.len();
        let aligned = (n / 8) * 8;
        let zero = _mm256_setzero_ps();
        let half = _mm256_set1_ps(0.5);
        let mut acc = zero;
        let mut i = 0;

        while i < aligned {
            let va = _mm256_cvtph_ps(_mm_loadu_si128(a.as_ptr().add(i) as *const __m128i));
            let vb = _mm256_cvtph_ps(_mm_loadu_si128(b.as_ptr().add(i) as *const __m128i));
            let vm = _mm256_mul_ps(half, _mm256_add_ps(va, vb));

            let a_pos = _mm256_cmp_ps::<_CMP_GT_OQ>(va, zero);
            let b_pos = _mm256_cmp_ps::<_CMP_GT_OQ>(vb, zero);

            let term_a = _mm256_mul_ps(va, ln256_ps(_mm256_div_ps(va, vm)));
            let term_b = _mm256_mul_ps(vb, ln256_ps(_mm256_div_ps(vb, vm)));
            acc = _mm256_add_ps(acc, _mm256_and_ps(term_a, a_pos));
            acc = _mm256_add_ps(acc, _mm256_and_ps(term_b, b_pos));
            i += 8;
        }

        let mut sum = super::x86::hsum256_ps(acc);
        while i < n {
            let (x, y) = (f16_to_f32(a[i]), f16_to_f32(b[i]));
            let m = 0.5 * (x + y);
            if x > 0.0 {
                sum += x * (x / m).ln();
            }
            if y > 0.0 {
                sum += y * (y / m).ln();
            }
            i += 1;
        }
        0.5 * sum as f64
    }
}

// ============================================================================
// x86_64: skylake (AVX-512F)
// ============================================================================

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx512f")]
unsafe fn ln512_ps(x: core::arch::x86_64::__m512) -> core::arch::x86_64::__m512 {
    use core::arch::x86_64::*;

    unsafe {
        let one = _mm512_set1_ps(1.0);
        let x = _mm512_max_ps(x, _mm512_set1_ps(f32::MIN_POSITIVE));

        let xi = _mm512_castps_si512(x);
        let exp = _mm512_sub_epi32(_mm512_srli_epi32::<23>(xi), _mm512_set1_epi32(0x7f));
        let mut e = _mm512_add_ps(_mm512_cvtepi32_ps(exp), one);

        let mant = _mm512_or_si512(
            _mm512_and_si512(xi, _mm512_set1_epi32(0x007f_ffff)),
            _mm512_castps_si512(_mm512_set1_ps(0.5)),
        );
        let mut x = _mm512_castsi512_ps(mant);

        let below = _mm512_cmp_ps_mask::<_CMP_LT_OQ>(x, _mm512_set1_ps(SQRT_HALF));
        let tmp = _mm512_maskz_mov_ps(below, x);
        x = _mm512_sub_ps(x, one);
        e = _mm512_mask_sub_ps(e, below, e, one);
        x = _mm512_add_ps(x, tmp);

        let z = _mm512_mul_ps(x, x);
        let mut y = _mm512_set1_ps(LOG_P0);
        y = _mm512_fmadd_ps(y, x, _mm512_set1_ps(LOG_P1));
        y = _mm512_fmadd_ps(y, x, _mm512_set1_ps(LOG_P2));
        y = _mm512_fmadd_ps(y, x, _mm512_set1_ps(LOG_P3));
        y = _mm512_fmadd_ps(y, x, _mm512_set1_ps(LOG_P4));
        y = _mm512_fmadd_ps(y, x, _mm512_set1_ps(LOG_P5));
        y = _mm512_fmadd_ps(y, x, _mm512_set1_ps(LOG_P6));
        y = _mm512_fmadd_ps(y, x, _mm512_set1_ps(LOG_P7));
        y = _mm512_fmadd_ps(y, x, _mm512_set1_ps(LOG_P8));
        y = _mm512_mul_ps(_mm512_mul_ps(y, x), z);

        y = _mm512_fmadd_ps(e, _mm512_set1_ps(LN2_LO), y);
        y = _mm512_fmadd_ps(_mm512_set1_ps(-0.5), z, y);
        x = _mm512_add_ps(x, y);
        _mm512_fmadd_ps(e, _mm512_set1_ps(LN2_HI), x)
    }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn kl_f32_skylake(a: &[f32], b: &[f32]) -> f64 {
    use core::arch::x86_64::*;

    unsafe {
        let n = a.len();
        let zero = _mm512_setzero_ps();
        let mut acc = zero;
        let mut bad: __mmask16 = 0;
        let mut i = 0;

        while i + 16 <= n {
            let va = _mm512_loadu_ps(a.as_ptr().add(i));
            let vb = _mm512_loadu_ps(b.as_ptr().add(i));
            let a_pos = _mm512_cmp_ps_mask::<_CMP_GT_OQ>(va, zero);
            let b_zero = _mm512_cmp_ps_mask::<_CMP_LE_OQ>(vb, zero);
            bad |= a_pos & b_zero;

            let term = _mm512_mul_ps(va, ln512_ps(_mm512_div_ps(va, vb)));
            acc = _mm512_add_ps(acc, _mm512_maskz_mov_ps(a_pos, term));
            i += 16;
        }

        let rem = n - i;
        if rem > 0 {
            let mask = ((1u32 << rem) - 1) as __mmask16;
            let va = _mm512_maskz_loadu_ps(mask, a.as_ptr().add(i));
            let vb = _mm512_maskz_loadu_ps(mask, b.as_ptr().add(i));
            let a_pos = _mm512_cmp_ps_mask::<_CMP_GT_OQ>(va, zero);
            let b_zero = _mm512_cmp_ps_mask::<_CMP_LE_OQ>(vb, zero);
            bad |= a_pos & b_zero;

            let term = _mm512_mul_ps(va, ln512_ps(_mm512_div_ps(va, vb)));
            acc = _mm512_add_ps(acc, _mm512_maskz_mov_ps(a_pos, term));
        }

        if bad != 0 {
            return f64::INFINITY;
        }
        _mm512_reduce_add_ps(acc) as f64
    }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn js_f32_skylake(a: &[f32], b: &[f32]) -> f64 {
    use core::arch::x86_64::*;

    unsafe {
        let n = a.len();
        let zero = _mm512_setzero_ps();
        let half = _mm512_set1_ps(0.5);
        let mut acc = zero;
        let mut i = 0;

        while i + 16 <= n {
            let va = _mm512_loadu_ps(a.as_ptr().add(i));
            let vb = _mm512_loadu_ps(b.as_ptr().add(i));
            let vm = _mm512_mul_ps(half, _mm512_add_ps(va, vb));

            let a_pos = _mm512_cmp_ps_mask::<_CMP_GT_OQ>(va, zero);
            let b_pos = _mm512_cmp_ps_mask::<_CMP_GT_OQ>(vb, zero);

            let term_a = _mm512_mul_ps(va, ln512_ps(_mm512_div_ps(va, vm)));
            let term_b = _mm512_mul_ps(vb, ln512_ps(_mm512_div_ps(vb, vm)));
            acc = _mm512_add_ps(acc, _mm512_maskz_mov_ps(a_pos, term_a));
            acc = _mm512_add_ps(acc, _mm512_maskz_mov_ps(b_pos, term_b));
            i += 16;
        }

        let rem = n - i;
        if rem > 0 {
            let mask = ((1u32 << rem) - 1) as __mmask16;
            let va = _mm512_maskz_loadu_ps(mask, a.as_ptr().add(i));
            let vb = _mm512_maskz_loadu_ps(mask, b.as_ptr().add(i));
            let vm = _mm512_mul_ps(half, _mm512_add_ps(va, vb));

            let a_pos = _mm512_cmp_ps_mask::<_CMP_GT_OQ>(va, zero);
            let b_pos = _mm512_cmp_ps_mask::<_CMP_GT_OQ>(vb, zero);

            let term_a = _mm512_mul_ps(va, ln512_ps(_mm512_div_ps(va, vm)));
            let term_b = _mm512_mul_ps(vb, ln512_ps(_mm512_div_ps(vb, vm)));
            acc = _mm512_add_ps(acc, _mm512_maskz_mov_ps(a_pos, term_a));
            acc = _mm512_add_ps(acc, _mm512_maskz_mov_ps(b_pos, term_b));
        }

        0.5 * _mm512_reduce_add_ps(acc) as f64
    }
}

// ============================================================================
// aarch64: NEON
// ============================================================================

#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
unsafe fn ln_f32x4(x: core::arch::aarch64::float32x4_t) -> core::arch::aarch64::float32x4_t {
    use core::arch::aarch64::*;

    unsafe {
        let one = vdupq_n_f32(1.0);
        let x = vmaxq_f32(x, vdupq_n_f32(f32::MIN_POSITIVE));

        let xi = vreinterpretq_u32_f32(x);
        let exp = vsubq_s32(
            vreinterpretq_s32_u32(vshrq_n_u32::<23>(xi)),
            vdupq_n_s32(0x7f),
        );
        let mut e = vaddq_f32(vcvtq_f32_s32(exp), one);

        let mant = vorrq_u32(
            vandq_u32(xi, vdupq_n_u32(0x007f_ffff)),
            vreinterpretq_u32_f32(vdupq_n_f32(0.5)),
        );
        let mut x = vreinterpretq_f32_u32(mant);

        let below = vcltq_f32(x, vdupq_n_f32(SQRT_HALF));
        let tmp = vreinterpretq_f32_u32(vandq_u32(vreinterpretq_u32_f32(x), below));
        x = vsubq_f32(x, one);
        e = vsubq_f32(
            e,
            vreinterpretq_f32_u32(vandq_u32(vreinterpretq_u32_f32(one), below)),
        );
        x = vaddq_f32(x, tmp);

        let z = vmulq_f32(x, x);
        let mut y = vdupq_n_f32(LOG_P0);
        y = vfmaq_f32(vdupq_n_f32(LOG_P1), y, x);
        y = vfmaq_f32(vdupq_n_f32(LOG_P2), y, x);
        y = vfmaq_f32(vdupq_n_f32(LOG_P3), y, x);
        y = vfmaq_f32(vdupq_n_f32(LOG_P4), y, x);
        y = vfmaq_f32(vdupq_n_f32(LOG_P5), y, x);
        y = vfmaq_f32(vdupq_n_f32(LOG_P6), y, x);
        y = vfmaq_f32(vdupq_n_f32(LOG_P7), y, x);
        y = vfmaq_f32(vdupq_n_f32(LOG_P8), y, x);
        y = vmulq_f32(vmulq_f32(y, x), z);

        y = vfmaq_f32(y, e, vdupq_n_f32(LN2_LO));
        y = vfmaq_f32(y, z, vdupq_n_f32(-0.5));
        x = vaddq_f32(x, y);
        vfmaq_f32(x, e, vdupq_n_f32(LN2_HI))
    }
}

#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
pub(crate) unsafe fn kl_f32_neon(a: &[f32], b: &[f32]) -> f64 {
    use core::arch::aarch64::*;

    unsafe {
        let n = a.len();
        let aligned = (n / 4) * 4;
        let zero = vdupq_n_f32(0.0);
        let mut acc = zero;
        let mut bad = vdupq_n_u32(0);
        let mut i = 0;

        while i < aligned {
            let va = vld1q_f32(a.as_ptr().add(i));
            let vb = vld1q_f32(b.as_ptr().add(i));
            let a_pos = vcgtq_f32(va, zero);
            let b_zero = vcleq_f32(vb, zero);
            bad = vorrq_u32(bad, vandq_u32(a_pos, b_zero));

            let term = vmulq_f32(va, ln_f32x4(vdivq_f32(va, vb)));
            let masked = vreinterpretq_f32_u32(vandq_u32(vreinterpretq_u32_f32(term), a_pos));
            acc = vaddq_f32(acc, masked);
            i += 4;
        }

        if vmaxvq_u32(bad) != 0 {
            return f64::INFINITY;
        }
        let mut sum = vaddvq_f32(acc);
        while i < n {
            let (x, y) = (a[i], b[i]);
            if x > 0.0 {
                if y <= 0.0 {
                    return f64::INFINITY;
                }
                sum += x * (x / y).ln();
            }
            i += 1;
        }
        sum as f64
    }
}

#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
pub(crate) unsafe fn js_f32_neon(a: &[f32], b: &[f32]) -> f64 {
    use core::arch::aarch64::*;

    unsafe {
        let n = a.len();
        let aligned = (n / 4) * 4;
        let zero = vdupq_n_f32(0.0);
        let half = vdupq_n_f32(0.5);
        let mut acc = zero;
        let mut i = 0;

        while i < aligned {
            let va = vld1q_f32(a.as_ptr().add(i));
            let vb = vld1q_f32(b.as_ptr().add(i));
            let vm = vmulq_f32(half, vaddq_f32(va, vb));

            let a_pos = vcgtq_f32(va, zero);
            let b_pos = vcgtq_f32(vb, zero);

            let term_a = vmulq_f32(va, ln_f32x4(vdivq_f32(va, vm)));
            let term_b = vmulq_f32(vb, ln_f32x4(vdivq_f32(vb, vm)));
            acc = vaddq_f32(
                acc,
                vreinterpretq_f32_u32(vandq_u32(vreinterpretq_u32_f32(term_a), a_pos)),
            );
            acc = vaddq_f32(
                acc,
                vreinterpretq_f32_u32(vandq_u32(vreinterpretq_u32_f32(term_b), b_pos)),
            );
            i += 4;
        }

        let mut sum = vaddvq_f32(acc);
        while i < n {
            let (x, y) = (a[i], b[i]);
            let m = 0.5 * (x + y);
            if x > 0.0 {
                sum += x * (x / m).ln();
            }
            if y > 0.0 {
                sum += y * (y / m).ln();
            }
            i += 1;
        }
        0.5 * sum as f64
    }
}
