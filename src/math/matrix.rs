use rand::Rng;

use crate::activation::activation::ActivationFunction;
use crate::arena::Arena;
use crate::error::Result;

/// Backing cells of a [`Matrix`]: a block carved from an [`Arena`], or an
/// ordinary heap buffer when no arena was supplied.
#[derive(Debug)]
enum Storage<'a> {
    Arena(&'a mut [f64]),
    Heap(Vec<f64>),
}

impl<'a> Storage<'a> {
    fn alloc(arena: Option<&'a Arena>, len: usize) -> Result<Storage<'a>> {
        match arena {
            Some(arena) => Ok(Storage::Arena(arena.allocate(len)?)),
            None => Ok(Storage::Heap(vec![0.0; len])),
        }
    }

    fn as_slice(&self) -> &[f64] {
        match self {
            Storage::Arena(cells) => &cells[..],
            Storage::Heap(cells) => &cells[..],
        }
    }

    fn as_mut_slice(&mut self) -> &mut [f64] {
        match self {
            Storage::Arena(cells) => &mut cells[..],
            Storage::Heap(cells) => &mut cells[..],
        }
    }
}

/// Dense row-major matrix owning its cells.
///
/// The lifetime ties arena-backed storage to its [`Arena`]; heap-backed
/// matrices can be any lifetime, including `'static`.
#[derive(Debug)]
pub struct Matrix<'a> {
    rows: usize,
    cols: usize,
    storage: Storage<'a>,
}

/// Read-only, non-owning view over a contiguous run of matrix rows.
#[derive(Debug, Clone, Copy)]
pub struct MatrixView<'m> {
    rows: usize,
    cols: usize,
    data: &'m [f64],
}

/// Read-only, non-owning view of a single row (or part of one).
#[derive(Debug, Clone, Copy)]
pub struct Row<'m> {
    data: &'m [f64],
}

impl<'a> Matrix<'a> {
    /// Allocates a zeroed `rows x cols` matrix from `arena`, or from the heap if `None`.
    pub fn alloc(arena: Option<&'a Arena>, rows: usize, cols: usize) -> Result<Matrix<'a>> {
        let storage = Storage::alloc(arena, rows.saturating_mul(cols))?;
        Ok(Matrix { rows, cols, storage })
    }

    /// Builds a matrix from equally sized rows.
    ///
    /// # Panics
    /// Panics if the rows are ragged.
    pub fn from_rows<R: AsRef<[f64]>>(arena: Option<&'a Arena>, rows: &[R]) -> Result<Matrix<'a>> {
        let cols = rows.first().map_or(0, |row| row.as_ref().len());
        let mut res = Matrix::alloc(arena, rows.len(), cols)?;
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            assert_eq!(row.len(), cols, "row {i} has {} columns, expected {cols}", row.len());
            res.row_mut(i).copy_from_slice(row);
        }
        Ok(res)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn as_slice(&self) -> &[f64] {
        self.storage.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        self.storage.as_mut_slice()
    }

    pub fn view(&self) -> MatrixView<'_> {
        MatrixView {
            rows: self.rows,
            cols: self.cols,
            data: self.storage.as_slice(),
        }
    }

    pub fn at(&self, i: usize, j: usize) -> f64 {
        self.view().at(i, j)
    }

    pub fn at_mut(&mut self, i: usize, j: usize) -> &mut f64 {
        assert!(
            i < self.rows && j < self.cols,
            "index ({i}, {j}) out of bounds for {}x{} matrix",
            self.rows,
            self.cols
        );
        let cols = self.cols;
        &mut self.as_mut_slice()[i * cols + j]
    }

    pub fn row(&self, i: usize) -> Row<'_> {
        self.view().row(i)
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        assert!(i < self.rows, "row {i} out of bounds for {} rows", self.rows);
        let cols = self.cols;
        &mut self.as_mut_slice()[i * cols..(i + 1) * cols]
    }

    pub fn fill(&mut self, value: f64) {
        self.as_mut_slice().fill(value);
    }

    /// Sets every cell to an independent uniform draw from `[low, high)`.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R, low: f64, high: f64) {
        for cell in self.as_mut_slice() {
            *cell = low + (high - low) * rng.gen::<f64>();
        }
    }

    /// `self = a * b`, one accumulator per cell.
    pub fn multiply(&mut self, a: MatrixView<'_>, b: MatrixView<'_>) {
        if a.cols != b.rows || self.rows != a.rows || self.cols != b.cols {
            panic!(
                "Matrices are of incorrect sizes: {}x{} = {}x{} * {}x{}",
                self.rows, self.cols, a.rows, a.cols, b.rows, b.cols
            )
        }

        let cols = self.cols;
        let dst = self.as_mut_slice();
        for i in 0..a.rows {
            for j in 0..b.cols {
                let mut sum = 0.0;

                for k in 0..a.cols {
                    sum += a.data[i * a.cols + k] * b.data[k * b.cols + j];
                }

                dst[i * cols + j] = sum;
            }
        }
    }

    /// `self += a`, element by element.
    pub fn add(&mut self, a: MatrixView<'_>) {
        self.assert_same_shape(a, "add");
        for (cell, x) in self.as_mut_slice().iter_mut().zip(a.data) {
            *cell += x;
        }
    }

    pub fn apply(&mut self, activation: ActivationFunction) {
        for cell in self.as_mut_slice() {
            *cell = activation.function(*cell);
        }
    }

    pub fn copy_from(&mut self, src: MatrixView<'_>) {
        self.assert_same_shape(src, "copy");
        self.as_mut_slice().copy_from_slice(src.data);
    }

    /// Fisher-Yates shuffle of whole rows, in place.
    pub fn shuffle_rows<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let (rows, cols) = (self.rows, self.cols);
        let data = self.as_mut_slice();
        for i in 0..rows {
            let j = rng.gen_range(i..rows);
            if i != j {
                let (head, tail) = data.split_at_mut(j * cols);
                head[i * cols..(i + 1) * cols].swap_with_slice(&mut tail[..cols]);
            }
        }
    }

    fn assert_same_shape(&self, other: MatrixView<'_>, op: &str) {
        if self.rows != other.rows || self.cols != other.cols {
            panic!(
                "Matrices are of incorrect sizes for {op}: {}x{} vs {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )
        }
    }
}

impl<'m> MatrixView<'m> {
    /// # Panics
    /// Panics if `data` does not hold exactly `rows * cols` cells.
    pub fn new(rows: usize, cols: usize, data: &'m [f64]) -> MatrixView<'m> {
        assert_eq!(data.len(), rows * cols, "view data does not match {rows}x{cols}");
        MatrixView { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn as_slice(&self) -> &'m [f64] {
        self.data
    }

    pub fn at(&self, i: usize, j: usize) -> f64 {
        assert!(
            i < self.rows && j < self.cols,
            "index ({i}, {j}) out of bounds for {}x{} matrix",
            self.rows,
            self.cols
        );
        self.data[i * self.cols + j]
    }

    pub fn row(&self, i: usize) -> Row<'m> {
        assert!(i < self.rows, "row {i} out of bounds for {} rows", self.rows);
        Row {
            data: &self.data[i * self.cols..(i + 1) * self.cols],
        }
    }

    /// Rows `[begin, end)` as a sub-table sharing the same cells.
    pub fn slice_rows(&self, begin: usize, end: usize) -> MatrixView<'m> {
        assert!(
            begin <= end && end <= self.rows,
            "row range {begin}..{end} out of bounds for {} rows",
            self.rows
        );
        MatrixView {
            rows: end - begin,
            cols: self.cols,
            data: &self.data[begin * self.cols..end * self.cols],
        }
    }
}

impl<'m> Row<'m> {
    pub fn cols(&self) -> usize {
        self.data.len()
    }

    pub fn as_slice(&self) -> &'m [f64] {
        self.data
    }

    pub fn at(&self, j: usize) -> f64 {
        assert!(j < self.data.len(), "column {j} out of bounds for {} columns", self.data.len());
        self.data[j]
    }

    /// `width` columns starting at `offset`.
    pub fn slice(&self, offset: usize, width: usize) -> Row<'m> {
        assert!(
            offset <= self.data.len() && width <= self.data.len() - offset,
            "row slice {offset}+{width} out of bounds for {} columns",
            self.data.len()
        );
        Row {
            data: &self.data[offset..offset + width],
        }
    }

    /// The row as a `1 x cols` matrix view.
    pub fn as_matrix(&self) -> MatrixView<'m> {
        MatrixView {
            rows: 1,
            cols: self.data.len(),
            data: self.data,
        }
    }
}

impl<'m> From<&'m [f64]> for Row<'m> {
    fn from(data: &'m [f64]) -> Self {
        Row { data }
    }
}
