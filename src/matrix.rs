use std::num::NonZeroUsize;

use crate::error::{FeaturizerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Index {
    pub row: usize,
    pub col: usize,
}
impl Index {
    pub(crate) fn to_1(self, cols: NonZeroUsize) -> usize {
        self.row * cols.get() + self.col
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub rows: NonZeroUsize,
    pub cols: NonZeroUsize,
}
impl Size {
    pub fn volume(&self) -> usize {
        self.rows.get() * self.cols.get()
    }
}

/// Row-major grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    size: Size,
    data: Vec<T>,
}
impl<T> Matrix<T> {
    /// # Error
    ///
    /// Return [`FeaturizerError::InvalidArgument`] if `data` does not hold exactly `size.volume()` cells.
    pub fn new(size: Size, data: Vec<T>) -> Result<Self> {
        if data.len() != size.volume() {
            return Err(FeaturizerError::invalid_argument(format!(
                "{} cells for a {}x{} matrix",
                data.len(),
                size.rows,
                size.cols
            )));
        }
        Ok(Self { size, data })
    }
    pub fn from_fn(size: Size, mut cell: impl FnMut(Index) -> T) -> Self {
        let mut data = Vec::with_capacity(size.volume());
        for row in 0..size.rows.get() {
            for col in 0..size.cols.get() {
                data.push(cell(Index { row, col }));
            }
        }
        Self { size, data }
    }

    pub fn size(&self) -> Size {
        self.size
    }
    pub fn rows(&self) -> usize {
        self.size.rows.get()
    }
    pub fn cols(&self) -> usize {
        self.size.cols.get()
    }

    /// # Panic
    ///
    /// If `index` is out of range.
    pub fn cell(&self, index: Index) -> &T {
        let index = self.index_2_to_1(index);
        &self.data[index]
    }
    pub fn row(&self, row: usize) -> &[T] {
        let start = self.index_2_to_1(Index { row, col: 0 });
        &self.data[start..start + self.cols()]
    }
    pub fn column(&self, col: usize) -> impl Iterator<Item = &T> + '_ {
        (0..self.rows()).map(move |row| self.cell(Index { row, col }))
    }

    pub fn into_buffer(self) -> Vec<T> {
        self.data
    }

    fn index_2_to_1(&self, index: Index) -> usize {
        if self.size.cols.get() <= index.col {
            panic!("col out of range");
        }
        if self.size.rows.get() <= index.row {
            panic!("row out of range");
        }
        index.to_1(self.size.cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(rows: usize, cols: usize) -> Size {
        Size {
            rows: NonZeroUsize::new(rows).unwrap(),
            cols: NonZeroUsize::new(cols).unwrap(),
        }
    }

    #[test]
    fn test_layout() {
        let matrix = Matrix::new(size(2, 3), vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(matrix.row(1), [4, 5, 6]);
        assert_eq!(matrix.column(2).copied().collect::<Vec<_>>(), [3, 6]);
        assert_eq!(*matrix.cell(Index { row: 0, col: 1 }), 2);
        assert_eq!(matrix.into_buffer(), [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_from_fn() {
        let matrix = Matrix::from_fn(size(2, 2), |i| i.row * 10 + i.col);
        assert_eq!(matrix.into_buffer(), [0, 1, 10, 11]);
    }

    #[test]
    fn test_wrong_volume() {
        assert!(Matrix::new(size(2, 2), vec![1, 2, 3]).is_err());
    }

    #[test]
    #[should_panic]
    fn test_out_of_range() {
        let matrix = Matrix::new(size(1, 1), vec![0]).unwrap();
        matrix.cell(Index { row: 1, col: 0 });
    }
}
