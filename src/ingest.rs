//! Sparse matrix ingestion
//!
//! Reads a sparse matrix from disk into a coordinate list of nonzero
//! (row, column) positions. Supported encodings:
//! - CSV triplets: first record holds the dimensions `m,n`, every further
//!   record a nonzero `i,j` (any extra columns, e.g. values, are ignored)
//! - MatrixMarket coordinate files (`.mtx`)
//! - scipy-style sparse archives (`.npz`) in COO, CSR, CSC, BSR or DIA layout
//!
//! DOT files (`.dot`, `.gv`) are recognized as a [`FileFormat`] but carry a
//! laid-out graph rather than a matrix; the session loads them directly.

use crate::error::{Result, VisError};
use csv::ReaderBuilder;
use npyz::npz::NpzArchive;
use npyz::sparse::Sparse;
use num_complex::Complex;
use sprs::io::{read_matrix_market, IoError};
use sprs::num_kinds::Pattern;
use sprs::TriMatI;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Input file encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Csv,
    Mtx,
    Npz,
    Dot,
    Gv,
}

impl FileFormat {
    pub const ALL: [FileFormat; 5] = [
        FileFormat::Csv,
        FileFormat::Mtx,
        FileFormat::Npz,
        FileFormat::Dot,
        FileFormat::Gv,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Mtx => "mtx",
            FileFormat::Npz => "npz",
            FileFormat::Dot => "dot",
            FileFormat::Gv => "gv",
        }
    }

    /// True for formats that hold a sparse matrix (as opposed to a laid-out graph)
    pub fn is_matrix(&self) -> bool {
        matches!(self, FileFormat::Csv | FileFormat::Mtx | FileFormat::Npz)
    }

    /// Infer the format from a file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| VisError::unsupported(path.display().to_string()))?;
        ext.parse()
    }
}

impl FromStr for FileFormat {
    type Err = VisError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().trim_start_matches('.').to_ascii_lowercase();
        FileFormat::ALL
            .into_iter()
            .find(|f| f.extension() == lower)
            .ok_or_else(|| VisError::unsupported(s))
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Choose the format for a file: an explicit hint wins, otherwise the extension decides.
pub fn resolve_format(path: &Path, hint: Option<&str>) -> Result<FileFormat> {
    match hint {
        Some(hint) => hint.parse(),
        None => FileFormat::from_path(path),
    }
}

/// Nonzero positions of an m x n sparse matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinateList {
    pub m: usize,
    pub n: usize,
    pub entries: Vec<(usize, usize)>,
}

impl CoordinateList {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Smallest index over both axes, if any entry exists
    pub fn min_index(&self) -> Option<usize> {
        self.entries.iter().map(|&(i, j)| i.min(j)).min()
    }

    fn check_bounds(&self, source: &Path) -> Result<()> {
        if let Some(&(i, j)) = self
            .entries
            .iter()
            .find(|&&(i, j)| i >= self.m || j >= self.n)
        {
            return Err(VisError::MalformedInput(format!(
                "{}: entry ({i}, {j}) lies outside the declared {}x{} matrix",
                source.display(),
                self.m,
                self.n
            )));
        }
        Ok(())
    }
}

/// Read the nonzero pattern of a matrix file.
pub fn read_coordinates(path: &Path, format: FileFormat) -> Result<CoordinateList> {
    let coords = match format {
        FileFormat::Csv => read_csv(path)?,
        FileFormat::Mtx => read_mtx(path)?,
        FileFormat::Npz => read_npz(path)?,
        FileFormat::Dot | FileFormat::Gv => {
            return Err(VisError::UnsupportedFormat {
                format: format!("{format} (not a matrix format)"),
            })
        }
    };
    debug!(
        path = %path.display(),
        format = %format,
        m = coords.m,
        n = coords.n,
        entries = coords.len(),
        "read coordinate list"
    );
    Ok(coords)
}

fn csv_error(path: &Path, err: csv::Error) -> VisError {
    if err.is_io_error() {
        match err.into_kind() {
            csv::ErrorKind::Io(io) => VisError::Io(io),
            other => VisError::MalformedInput(format!("{}: {other:?}", path.display())),
        }
    } else {
        VisError::MalformedInput(format!("{}: {err}", path.display()))
    }
}

fn parse_index(path: &Path, line: u64, field: Option<&str>) -> Result<usize> {
    let field = field.ok_or_else(|| {
        VisError::MalformedInput(format!(
            "{}:{line}: expected at least two comma-separated fields",
            path.display()
        ))
    })?;
    field.parse::<usize>().map_err(|_| {
        VisError::MalformedInput(format!(
            "{}:{line}: `{field}` is not a non-negative integer",
            path.display()
        ))
    })
}

/// Read a CSV triplet file.
///
/// If the smallest row or column index in the file is 1 the whole file is
/// taken to be 1-based and every index on both axes is shifted down by one.
pub fn read_csv(path: &Path) -> Result<CoordinateList> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    let mut dims: Option<(usize, usize)> = None;
    let mut entries = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| csv_error(path, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        let i = parse_index(path, line, record.get(0))?;
        let j = parse_index(path, line, record.get(1))?;
        if dims.is_none() {
            dims = Some((i, j));
        } else {
            entries.push((i, j));
        }
    }

    let (m, n) = dims.ok_or_else(|| {
        VisError::MalformedInput(format!(
            "{}: missing dimension record `m,n`",
            path.display()
        ))
    })?;
    let mut coords = CoordinateList { m, n, entries };
    apply_one_based_correction(&mut coords);
    coords.check_bounds(path)?;
    Ok(coords)
}

/// Shift every index down by one when the global minimum index is 1.
/// Returns true if the correction was applied.
pub fn apply_one_based_correction(coords: &mut CoordinateList) -> bool {
    if coords.min_index() != Some(1) {
        return false;
    }
    for (i, j) in coords.entries.iter_mut() {
        *i -= 1;
        *j -= 1;
    }
    info!(
        entries = coords.len(),
        "minimum index is 1; treating coordinates as 1-based"
    );
    true
}

fn coordinates_of<N>(tri: &TriMatI<N, usize>) -> CoordinateList {
    CoordinateList {
        m: tri.rows(),
        n: tri.cols(),
        entries: tri
            .row_inds()
            .iter()
            .copied()
            .zip(tri.col_inds().iter().copied())
            .collect(),
    }
}

fn mtx_error(path: &Path, err: IoError) -> VisError {
    match err {
        IoError::Io(io) => VisError::Io(io),
        other => VisError::MalformedInput(format!("{}: {other}", path.display())),
    }
}

/// Read a MatrixMarket file. Real, integer and pattern value types are tried in turn.
pub fn read_mtx(path: &Path) -> Result<CoordinateList> {
    match read_matrix_market::<f64, usize, _>(path) {
        Ok(tri) => return Ok(coordinates_of(&tri)),
        Err(IoError::Io(io)) => return Err(VisError::Io(io)),
        Err(_) => {}
    }
    if let Ok(tri) = read_matrix_market::<i64, usize, _>(path) {
        return Ok(coordinates_of(&tri));
    }
    read_matrix_market::<Pattern, usize, _>(path)
        .map(|tri| coordinates_of(&tri))
        .map_err(|e| mtx_error(path, e))
}

fn load_sparse<T: npyz::Deserialize>(path: &Path) -> std::io::Result<Sparse<T>> {
    let mut npz = NpzArchive::open(path)?;
    Sparse::from_npz(&mut npz)
}

/// Read a compressed sparse archive in any scipy layout.
///
/// Only the sparsity pattern is kept, so every numeric data type is
/// accepted; each is tried in turn until one matches the archive.
pub fn read_npz(path: &Path) -> Result<CoordinateList> {
    if !path.is_file() {
        return Err(VisError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} not found", path.display()),
        )));
    }

    macro_rules! try_dtypes {
        ($($t:ty),+ $(,)?) => {
            $(
                if let Ok(matrix) = load_sparse::<$t>(path) {
                    return coordinates_from_sparse(path, matrix);
                }
            )+
        };
    }
    try_dtypes!(
        f64,
        f32,
        i64,
        i32,
        i16,
        i8,
        u64,
        u32,
        u16,
        u8,
        Complex<f64>,
        Complex<f32>,
    );

    let matrix = load_sparse::<bool>(path).map_err(|e| {
        VisError::MalformedInput(format!(
            "{}: not a readable sparse matrix archive: {e}",
            path.display()
        ))
    })?;
    coordinates_from_sparse(path, matrix)
}

fn bad_pointer(path: &Path) -> VisError {
    VisError::MalformedInput(format!(
        "{}: index pointer array is inconsistent with the index array",
        path.display()
    ))
}

/// Expand a compressed index: for each outer index `o`, the inner indices
/// `indices[indptr[o]..indptr[o + 1]]`.
fn expand_compressed(
    path: &Path,
    indptr: &[usize],
    indices: &[usize],
) -> Result<Vec<(usize, usize)>> {
    let mut pairs = Vec::with_capacity(indices.len());
    for outer in 0..indptr.len().saturating_sub(1) {
        let (start, end) = (indptr[outer], indptr[outer + 1]);
        let inner = indices.get(start..end).ok_or_else(|| bad_pointer(path))?;
        pairs.extend(inner.iter().map(|&i| (outer, i)));
    }
    Ok(pairs)
}

fn as_usizes<I: Copy + TryInto<usize>>(values: &[I]) -> Option<Vec<usize>> {
    values.iter().map(|&v| v.try_into().ok()).collect()
}

fn coordinates_from_sparse<T: PartialEq + Default>(
    path: &Path,
    matrix: Sparse<T>,
) -> Result<CoordinateList> {
    let negative = || {
        VisError::MalformedInput(format!("{}: negative index in sparse archive", path.display()))
    };

    let coords = match matrix {
        Sparse::Coo(coo) => {
            let rows = as_usizes(&coo.row).ok_or_else(negative)?;
            let cols = as_usizes(&coo.col).ok_or_else(negative)?;
            CoordinateList {
                m: coo.shape[0] as usize,
                n: coo.shape[1] as usize,
                entries: rows.into_iter().zip(cols).collect(),
            }
        }
        // CSR: outer index is the row
        Sparse::Csr(csr) => {
            let indptr = as_usizes(&csr.indptr).ok_or_else(negative)?;
            let indices = as_usizes(&csr.indices).ok_or_else(negative)?;
            CoordinateList {
                m: csr.shape[0] as usize,
                n: csr.shape[1] as usize,
                entries: expand_compressed(path, &indptr, &indices)?,
            }
        }
        // CSC: outer index is the column
        Sparse::Csc(csc) => {
            let indptr = as_usizes(&csc.indptr).ok_or_else(negative)?;
            let indices = as_usizes(&csc.indices).ok_or_else(negative)?;
            CoordinateList {
                m: csc.shape[0] as usize,
                n: csc.shape[1] as usize,
                entries: expand_compressed(path, &indptr, &indices)?
                    .into_iter()
                    .map(|(col, row)| (row, col))
                    .collect(),
            }
        }
        // BSR: CSR over blocks, every stored block contributes r x c entries
        Sparse::Bsr(bsr) => {
            let (r, c) = (bsr.blocksize[0] as usize, bsr.blocksize[1] as usize);
            let indptr = as_usizes(&bsr.indptr).ok_or_else(negative)?;
            let indices = as_usizes(&bsr.indices).ok_or_else(negative)?;
            let blocks = expand_compressed(path, &indptr, &indices)?;
            let mut entries = Vec::with_capacity(blocks.len() * r * c);
            for (block_row, block_col) in blocks {
                for i in 0..r {
                    for j in 0..c {
                        entries.push((block_row * r + i, block_col * c + j));
                    }
                }
            }
            CoordinateList {
                m: bsr.shape[0] as usize,
                n: bsr.shape[1] as usize,
                entries,
            }
        }
        // DIA: data[k][j] sits at row j - offsets[k], column j; zeros are padding
        Sparse::Dia(dia) => {
            let (m, n) = (dia.shape[0] as usize, dia.shape[1] as usize);
            let diagonals = dia.offsets.len();
            let width = if diagonals == 0 { 0 } else { dia.data.len() / diagonals };
            let zero = T::default();
            let mut entries = Vec::new();
            for (k, &offset) in dia.offsets.iter().enumerate() {
                let offset = offset as i64;
                for j in 0..width.min(n) {
                    let row = j as i64 - offset;
                    if row < 0 || row >= m as i64 || dia.data[k * width + j] == zero {
                        continue;
                    }
                    entries.push((row as usize, j));
                }
            }
            entries.sort_unstable();
            CoordinateList { m, n, entries }
        }
        #[allow(unreachable_patterns)]
        _ => {
            return Err(VisError::MalformedInput(format!(
                "{}: unsupported sparse storage layout",
                path.display()
            )))
        }
    };
    coords.check_bounds(path)?;
    Ok(coords)
}
