//! Batch driver: apply a resolved kernel across row collections.
//!
//! Three shapes on top of the single-pair call:
//!
//! - [`pairwise`] with one single-row side broadcasts that row against
//!   every row of the other side.
//! - [`pairwise`] with equal row counts computes one distance per row pair.
//! - [`cdist`] computes the full `(R1, R2)` cross matrix.
//!
//! Rows are described by a [`Rows`] view: a borrowed buffer plus row count,
//! row length, and an element stride, so rows need not be contiguous. All
//! shape validation happens here, before any kernel runs.
//!
//! A thread count of `1` runs on the calling thread, `0` uses the hardware
//! concurrency, and any other positive count spawns that many scoped
//! workers. Work splits by output row; every worker writes a disjoint
//! chunk of the output, and the scope join publishes the writes to the
//! caller. The pool lives only for the duration of the call.

use crate::dispatch::Resolved;
use crate::error::{Error, Result};
use std::num::NonZeroUsize;

/// Borrowed view of a row matrix.
///
/// `dim` counts scalar elements per row as stored, so a complex row of
/// logical length `n` has `dim = 2n`. `stride` is the element distance
/// between consecutive row starts and must be at least `dim`.
#[derive(Debug, Clone, Copy)]
pub struct Rows<'a, T> {
    data: &'a [T],
    count: usize,
    dim: usize,
    stride: usize,
}

impl<'a, T> Rows<'a, T> {
    /// View over densely packed rows.
    pub fn new(data: &'a [T], count: usize, dim: usize) -> Result<Self> {
        Self::with_stride(data, count, dim, dim)
    }

    /// View over strided rows (`stride >= dim`, in elements).
    pub fn with_stride(data: &'a [T], count: usize, dim: usize, stride: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::EmptyInput);
        }
        if stride < dim {
            return Err(Error::InvalidStride { stride, dim });
        }
        let needed = if count == 0 {
            0
        } else {
            (count - 1) * stride + dim
        };
        if data.len() < needed {
            return Err(Error::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Rows {
            data,
            count,
            dim,
            stride,
        })
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn row(&self, index: usize) -> &'a [T] {
        let start = index * self.stride;
        &self.data[start..start + self.dim]
    }
}

/// Check kernel/operand compatibility and return the logical element count
/// passed to the kernel.
fn validate<T>(kernel: &Resolved, a: &Rows<'_, T>, b: &Rows<'_, T>) -> Result<usize> {
    let expected = kernel.datatype.scalar_size();
    let got = std::mem::size_of::<T>();
    if expected != got {
        return Err(Error::ElementWidthMismatch {
            datatype: kernel.datatype,
            expected,
            got,
        });
    }
    if a.dim != b.dim {
        return Err(Error::DimensionMismatch {
            expected: a.dim,
            got: b.dim,
        });
    }
    let words = kernel.datatype.words_per_element();
    if a.dim % words != 0 {
        return Err(Error::OddComplexLength(a.dim));
    }
    Ok(a.dim / words)
}

/// Broadcast or paired distances.
///
/// With equal row counts, computes `out[r] = k(a[r], b[r])`. If either
/// side has exactly one row, that row is broadcast against the other side.
/// `out` holds one slot per pair, or two for complex products.
pub fn pairwise<T: Sync>(
    kernel: &Resolved,
    a: &Rows<'_, T>,
    b: &Rows<'_, T>,
    out: &mut [f64],
    threads: usize,
) -> Result<()> {
    let n = validate(kernel, a, b)?;
    let pairs = if a.count == b.count {
        a.count
    } else if a.count == 1 {
        b.count
    } else if b.count == 1 {
        a.count
    } else {
        return Err(Error::RowCountMismatch {
            left: a.count,
            right: b.count,
        });
    };
    let slots = kernel.result_slots();
    let expected = pairs * slots;
    if out.len() != expected {
        return Err(Error::OutputLengthMismatch {
            expected,
            got: out.len(),
        });
    }

    run_rows(pairs, slots, threads, out, |r, chunk| {
        let row_a = a.row(if a.count == 1 { 0 } else { r });
        let row_b = b.row(if b.count == 1 { 0 } else { r });
        unsafe {
            kernel.call(
                row_a.as_ptr().cast(),
                row_b.as_ptr().cast(),
                n,
                chunk.as_mut_ptr(),
            );
        }
    });
    Ok(())
}

/// All-pairs distances: `out[i * b.count + j] = k(a[i], b[j])`.
///
/// `out` is the flattened `(a.count, b.count)` matrix, with two slots per
/// cell for complex products.
pub fn cdist<T: Sync>(
    kernel: &Resolved,
    a: &Rows<'_, T>,
    b: &Rows<'_, T>,
    out: &mut [f64],
    threads: usize,
) -> Result<()> {
    let n = validate(kernel, a, b)?;
    let slots = kernel.result_slots();
    let expected = a.count * b.count * slots;
    if out.len() != expected {
        return Err(Error::OutputLengthMismatch {
            expected,
            got: out.len(),
        });
    }

    run_rows(a.count, b.count * slots, threads, out, |i, chunk| {
        let row_a = a.row(i);
        for j in 0..b.count {
            let row_b = b.row(j);
            unsafe {
                kernel.call(
                    row_a.as_ptr().cast(),
                    row_b.as_ptr().cast(),
                    n,
                    chunk[j * slots..].as_mut_ptr(),
                );
            }
        }
    });
    Ok(())
}

fn effective_workers(threads: usize, outer: usize) -> usize {
    let requested = if threads == 0 {
        std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    } else {
        threads
    };
    requested.min(outer)
}

/// Split `out` into per-row chunks and run `task` over them, serially or
/// on a scoped worker pool.
fn run_rows<F>(outer: usize, chunk_len: usize, threads: usize, out: &mut [f64], task: F)
where
    F: Fn(usize, &mut [f64]) + Sync,
{
    if outer == 0 || out.is_empty() {
        return;
    }

    let workers = effective_workers(threads, outer);
    if workers <= 1 {
        for (i, chunk) in out.chunks_mut(chunk_len).enumerate() {
            task(i, chunk);
        }
        return;
    }

    let rows_per_worker = outer.div_ceil(workers);
    tracing::trace!(workers, rows = outer, "splitting batch across worker pool");
    std::thread::scope(|scope| {
        for (w, block) in out.chunks_mut(rows_per_worker * chunk_len).enumerate() {
            let task = &task;
            let first = w * rows_per_worker;
            scope.spawn(move || {
                for (k, chunk) in block.chunks_mut(chunk_len).enumerate() {
                    task(first + k, chunk);
                }
            });
        }
    });
}
