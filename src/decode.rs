//! Erasure decoding for matrix and bitmatrix codes
//!
//! ## Algorithm
//!
//! 1. Normalise the erasure list and validate every buffer before anything
//!    is written.
//! 2. When more than one data device is lost (or one is lost and the all-ones
//!    first coding row can't be used) build the decoding matrix: the k x k
//!    rows of the distribution matrix belonging to the first k survivors,
//!    inverted.
//! 3. Rebuild erased data devices from the decoding matrix rows.
//! 4. With `row_k_ones` set and coding device 0 intact, the last erased data
//!    device is instead rebuilt from coding row 0: the XOR of every other data
//!    device and coding device 0.
//! 5. Re-encode erased coding devices from the now-complete data.
//!
//! Device indices run `0..k` for data and `k..k+m` for coding.

use crate::bitmatrix::BitMatrix;
use crate::encode::{check_stripes, run_rows, Coefficients};
use crate::error::{ErasureError, Result};
use crate::invert::{invert_bitmatrix, invert_matrix};
use crate::matrix::Matrix;
use log::{debug, trace};
use smallvec::SmallVec;

type Ids = SmallVec<[usize; 16]>;

/// Inverse of the survivor rows plus the survivors feeding it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodingMatrix {
    /// k x k inverse; row i rebuilds data device i
    pub inverse: Matrix,
    /// The k surviving device ids, ascending
    pub dm_ids: Vec<usize>,
}

/// Bitmatrix form of [`DecodingMatrix`], (k*w) x (k*w)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodingBitmatrix {
    pub inverse: BitMatrix,
    pub dm_ids: Vec<usize>,
}

/// Erased flags for all `k + m` devices
///
/// Duplicates are ignored. More than `m` distinct erasures is unrecoverable.
pub fn erasures_to_erased(k: usize, m: usize, erasures: &[usize]) -> Result<Vec<bool>> {
    let n = k + m;
    let mut erased = vec![false; n];
    let mut count = 0;
    for &e in erasures {
        if e >= n {
            return Err(ErasureError::invalid(format!(
                "erasure index {} out of range for {} devices",
                e, n
            )));
        }
        if !erased[e] {
            erased[e] = true;
            count += 1;
        }
    }
    if count > m {
        return Err(ErasureError::Unrecoverable(format!(
            "{} devices erased but only {} coding devices",
            count, m
        )));
    }
    Ok(erased)
}

/// Convert a `-1`-terminated erasure list to explicit indices
pub fn erasures_from_terminated(list: &[i32]) -> Result<Vec<usize>> {
    let end = list
        .iter()
        .position(|&e| e == -1)
        .ok_or_else(|| ErasureError::invalid("erasure list is not terminated by -1"))?;
    list[..end]
        .iter()
        .map(|&e| {
            usize::try_from(e)
                .map_err(|_| ErasureError::invalid(format!("negative erasure index {}", e)))
        })
        .collect()
}

/// First `k` non-erased device ids
fn survivor_ids(k: usize, erased: &[bool]) -> Result<Vec<usize>> {
    let ids: Vec<usize> = (0..erased.len()).filter(|&i| !erased[i]).take(k).collect();
    if ids.len() < k {
        return Err(ErasureError::Unrecoverable(format!(
            "only {} of {} required devices survive",
            ids.len(),
            k
        )));
    }
    Ok(ids)
}

fn check_erased_len(erased: &[bool], n: usize) -> Result<()> {
    if erased.len() != n {
        return Err(ErasureError::invalid(format!(
            "erased vector has {} entries, expected {}",
            erased.len(),
            n
        )));
    }
    Ok(())
}

/// Invert the rows of `[I; matrix]` that belong to the first k survivors
pub fn make_decoding_matrix(matrix: &Matrix, erased: &[bool]) -> Result<DecodingMatrix> {
    let (k, m) = (matrix.cols(), matrix.rows());
    check_erased_len(erased, k + m)?;
    let dm_ids = survivor_ids(k, erased)?;

    let mut survivors = Matrix::zeroed(k, k, matrix.w())?;
    for (i, &id) in dm_ids.iter().enumerate() {
        if id < k {
            survivors.set(i, id, 1);
        } else {
            survivors.row_mut(i).copy_from_slice(matrix.row(id - k));
        }
    }

    let inverse = invert_matrix(&survivors)?;
    trace!("decoding matrix built from devices {:?}", dm_ids);
    Ok(DecodingMatrix { inverse, dm_ids })
}

/// Bitmatrix form of [`make_decoding_matrix`]
pub fn make_decoding_bitmatrix(bitmatrix: &BitMatrix, erased: &[bool]) -> Result<DecodingBitmatrix> {
    let w = bitmatrix.w() as usize;
    let (k, m) = (bitmatrix.cols() / w, bitmatrix.rows() / w);
    check_erased_len(erased, k + m)?;
    let dm_ids = survivor_ids(k, erased)?;

    let mut survivors = BitMatrix::zeroed(k * w, k * w, bitmatrix.w())?;
    for (i, &id) in dm_ids.iter().enumerate() {
        for l in 0..w {
            if id < k {
                survivors.set(i * w + l, id * w + l, true);
            } else {
                let src = bitmatrix.row((id - k) * w + l);
                for (c, &bit) in src.iter().enumerate() {
                    survivors.set(i * w + l, c, bit);
                }
            }
        }
    }

    let inverse = invert_bitmatrix(&survivors)?;
    trace!("decoding bitmatrix built from devices {:?}", dm_ids);
    Ok(DecodingBitmatrix { inverse, dm_ids })
}

/// Split devices into read-only sources and the writable targets
fn split_devices<'a>(
    devices: &'a mut [&mut [u8]],
    targets: &[usize],
) -> (Vec<Option<&'a [u8]>>, Vec<(usize, &'a mut [u8])>) {
    let mut sources = Vec::with_capacity(devices.len());
    let mut writable = Vec::with_capacity(targets.len());
    for (id, dev) in devices.iter_mut().enumerate() {
        if targets.contains(&id) {
            writable.push((id, &mut **dev));
            sources.push(None);
        } else {
            sources.push(Some(&**dev));
        }
    }
    (sources, writable)
}

fn pick_sources<'a>(sources: &[Option<&'a [u8]>], ids: &[usize]) -> Result<Vec<&'a [u8]>> {
    ids.iter()
        .map(|&id| {
            sources[id].ok_or_else(|| {
                ErasureError::Unrecoverable(format!("device {} is needed but erased", id))
            })
        })
        .collect()
}

enum Decoding {
    Field(DecodingMatrix),
    Bits(DecodingBitmatrix, usize),
}

impl Decoding {
    fn coefficients(&self) -> Coefficients<'_> {
        match self {
            Decoding::Field(d) => Coefficients::Field(&d.inverse),
            Decoding::Bits(d, packetsize) => Coefficients::Bits {
                bitmatrix: &d.inverse,
                packetsize: *packetsize,
            },
        }
    }

    fn dm_ids(&self) -> &[usize] {
        match self {
            Decoding::Field(d) => &d.dm_ids,
            Decoding::Bits(d, _) => &d.dm_ids,
        }
    }
}

/// Shared decode driver for both generator forms
fn decode_devices(
    generator: Coefficients<'_>,
    k: usize,
    row_k_ones: bool,
    erased: &[bool],
    devices: &mut [&mut [u8]],
    parallel: bool,
) -> Result<()> {
    let erased_data: Ids = (0..k).filter(|&i| erased[i]).collect();
    let erased_coding: Ids = (k..erased.len()).filter(|&i| erased[i]).collect();
    let coding0_lost = erased.get(k).copied().unwrap_or(true);
    let use_parity_row = row_k_ones && !coding0_lost;

    let lastdrive = match erased_data.last() {
        Some(&last) if use_parity_row => last,
        _ => k,
    };

    let needs_decoding = erased_data.len() > 1 || (!erased_data.is_empty() && !use_parity_row);
    debug!(
        "decode: data erased {:?}, coding erased {:?}, parity row {}, decoding matrix {}",
        erased_data, erased_coding, use_parity_row, needs_decoding
    );

    let decoding = if needs_decoding {
        let built = match generator {
            Coefficients::Field(matrix) => make_decoding_matrix(matrix, erased).map(Decoding::Field),
            Coefficients::Bits {
                bitmatrix,
                packetsize,
            } => make_decoding_bitmatrix(bitmatrix, erased).map(|d| Decoding::Bits(d, packetsize)),
        };
        Some(built.map_err(|e| match e {
            ErasureError::NotInvertible => {
                ErasureError::Unrecoverable("surviving rows are not invertible".to_string())
            }
            other => other,
        })?)
    } else {
        None
    };

    // Erased data below lastdrive, straight from the decoding matrix
    if let Some(decoding) = &decoding {
        let targets: Ids = erased_data.iter().copied().filter(|&i| i < lastdrive).collect();
        if !targets.is_empty() {
            let (sources, writable) = split_devices(devices, &targets);
            let inputs = pick_sources(&sources, decoding.dm_ids())?;
            run_rows(decoding.coefficients(), &inputs, writable, parallel)?;
        }
    }

    // lastdrive from coding row 0
    if lastdrive < k {
        let ids: Ids = (0..k).map(|i| if i < lastdrive { i } else { i + 1 }).collect();
        let (sources, writable) = split_devices(devices, &[lastdrive]);
        let inputs = pick_sources(&sources, &ids)?;
        let jobs = writable.into_iter().map(|(_, dest)| (0, dest)).collect();
        run_rows(generator, &inputs, jobs, false)?;
    }

    // Erased coding devices, re-encoded
    if !erased_coding.is_empty() {
        let (sources, writable) = split_devices(devices, &erased_coding);
        let data_ids: Ids = (0..k).collect();
        let inputs = pick_sources(&sources, &data_ids)?;
        let jobs = writable.into_iter().map(|(id, dest)| (id - k, dest)).collect();
        run_rows(generator, &inputs, jobs, parallel)?;
    }

    Ok(())
}

/// Borrow data then coding buffers as one device list, checking lengths
fn collect_devices<'a, D, C>(data: &'a mut [D], coding: &'a mut [C]) -> Result<(Vec<&'a mut [u8]>, usize)>
where
    D: AsMut<[u8]>,
    C: AsMut<[u8]>,
{
    let devices: Vec<&mut [u8]> = data
        .iter_mut()
        .map(AsMut::as_mut)
        .chain(coding.iter_mut().map(AsMut::as_mut))
        .collect();
    let size = devices
        .first()
        .map(|d| d.len())
        .ok_or_else(|| ErasureError::invalid("k must be positive"))?;
    if devices.iter().any(|d| d.len() != size) {
        return Err(ErasureError::invalid("all buffers must have the same length"));
    }
    Ok((devices, size))
}

fn check_device_counts(k: usize, m: usize, data: usize, coding: usize) -> Result<()> {
    if k == 0 || data != k || coding != m {
        return Err(ErasureError::invalid(format!(
            "code expects {} data and {} coding buffers, got {} and {}",
            k, m, data, coding
        )));
    }
    Ok(())
}

/// Rebuild erased devices of a field-matrix code in place
///
/// `row_k_ones` asserts that coding row 0 is all ones; it is never checked.
/// Returns `Unrecoverable` when more than m devices are erased or the
/// surviving rows are singular; nothing is written in either case.
pub fn matrix_decode<D, C>(
    matrix: &Matrix,
    row_k_ones: bool,
    erasures: &[usize],
    data: &mut [D],
    coding: &mut [C],
) -> Result<()>
where
    D: AsMut<[u8]>,
    C: AsMut<[u8]>,
{
    matrix_decode_with(matrix, row_k_ones, erasures, data, coding, false)
}

pub(crate) fn matrix_decode_with<D, C>(
    matrix: &Matrix,
    row_k_ones: bool,
    erasures: &[usize],
    data: &mut [D],
    coding: &mut [C],
    parallel: bool,
) -> Result<()>
where
    D: AsMut<[u8]>,
    C: AsMut<[u8]>,
{
    let (k, m) = (matrix.cols(), matrix.rows());
    check_device_counts(k, m, data.len(), coding.len())?;
    let word = matrix.field().region_word_bytes()?;
    let erased = erasures_to_erased(k, m, erasures)?;
    let (mut devices, size) = collect_devices(data, coding)?;
    if size % word != 0 {
        return Err(ErasureError::invalid(format!(
            "buffer length {} is not a multiple of {} bytes",
            size, word
        )));
    }
    if !erased.contains(&true) {
        return Ok(());
    }
    decode_devices(
        Coefficients::Field(matrix),
        k,
        row_k_ones,
        &erased,
        &mut devices,
        parallel,
    )
}

/// Rebuild erased devices of a bitmatrix code in place
pub fn bitmatrix_decode<D, C>(
    bitmatrix: &BitMatrix,
    row_k_ones: bool,
    erasures: &[usize],
    data: &mut [D],
    coding: &mut [C],
    packetsize: usize,
) -> Result<()>
where
    D: AsMut<[u8]>,
    C: AsMut<[u8]>,
{
    bitmatrix_decode_with(bitmatrix, row_k_ones, erasures, data, coding, packetsize, false)
}

pub(crate) fn bitmatrix_decode_with<D, C>(
    bitmatrix: &BitMatrix,
    row_k_ones: bool,
    erasures: &[usize],
    data: &mut [D],
    coding: &mut [C],
    packetsize: usize,
    parallel: bool,
) -> Result<()>
where
    D: AsMut<[u8]>,
    C: AsMut<[u8]>,
{
    let w = bitmatrix.w() as usize;
    if bitmatrix.rows() % w != 0 || bitmatrix.cols() % w != 0 {
        return Err(ErasureError::invalid(format!(
            "{}x{} bitmatrix is not made of {}x{} blocks",
            bitmatrix.rows(),
            bitmatrix.cols(),
            w,
            w
        )));
    }
    let (k, m) = (bitmatrix.cols() / w, bitmatrix.rows() / w);
    check_device_counts(k, m, data.len(), coding.len())?;
    let erased = erasures_to_erased(k, m, erasures)?;
    let (mut devices, size) = collect_devices(data, coding)?;
    check_stripes(size, w, packetsize)?;
    if !erased.contains(&true) {
        return Ok(());
    }
    decode_devices(
        Coefficients::Bits {
            bitmatrix,
            packetsize,
        },
        k,
        row_k_ones,
        &erased,
        &mut devices,
        parallel,
    )
}
