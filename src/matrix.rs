//! Dense matrix storage in either C or Fortran order.

use serde::Serialize;

/// Memory layout of [`Matrix::data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DataOrder {
    /// Rows are contiguous (C order)
    #[default]
    RowMajor,
    /// Columns are contiguous (Fortran order)
    ColumnMajor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    order: DataOrder,
    data: Vec<T>,
}

impl<T: Clone> Matrix<T> {
    /// Build from rows, storing in `order`. Returns the index of the first row
    /// whose length differs from the first one on mismatch.
    pub fn from_rows(rows: Vec<Vec<T>>, order: DataOrder) -> Result<Self, usize> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().position(|r| r.len() != cols) {
            return Err(bad);
        }
        let n_rows = rows.len();
        let data = match order {
            DataOrder::RowMajor => rows.into_iter().flatten().collect(),
            DataOrder::ColumnMajor => (0..cols)
                .flat_map(|c| rows.iter().map(move |r| r[c].clone()))
                .collect(),
        };
        Ok(Self {
            rows: n_rows,
            cols,
            order,
            data,
        })
    }
}

impl<T> Matrix<T> {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn order(&self) -> DataOrder {
        self.order
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Raw storage in [`order`](Self::order).
    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let index = match self.order {
            DataOrder::RowMajor => row * self.cols + col,
            DataOrder::ColumnMajor => col * self.rows + row,
        };
        self.data.get(index)
    }

    /// Row `row` in column order, regardless of storage.
    pub fn row(&self, row: usize) -> impl Iterator<Item = &T> + '_ {
        (0..self.cols).filter_map(move |c| self.get(row, c))
    }
}

impl Matrix<f64> {
    /// `self * v`. `v` must have `cols` entries.
    pub fn mul_vec(&self, v: &[f64]) -> Vec<f64> {
        (0..self.rows)
            .map(|r| self.row(r).zip(v).map(|(a, b)| a * b).sum())
            .collect()
    }

    pub fn column_means(&self) -> Vec<f64> {
        if self.rows == 0 {
            return vec![0.0; self.cols];
        }
        (0..self.cols)
            .map(|c| {
                let sum: f64 = (0..self.rows).filter_map(|r| self.get(r, c)).sum();
                sum / self.rows as f64
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Vec<i32>> {
        vec![vec![1, 2, 3], vec![4, 5, 6]]
    }

    #[test]
    fn test_row_major_layout() {
        let m = Matrix::from_rows(rows(), DataOrder::RowMajor).unwrap();
        assert_eq!(m.data(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(m.get(1, 0), Some(&4));
    }

    #[test]
    fn test_column_major_layout() {
        let m = Matrix::from_rows(rows(), DataOrder::ColumnMajor).unwrap();
        assert_eq!(m.data(), &[1, 4, 2, 5, 3, 6]);
        assert_eq!(m.get(1, 0), Some(&4));
        assert_eq!(m.get(0, 2), Some(&3));
        assert_eq!(m.row(1).copied().collect::<Vec<_>>(), vec![4, 5, 6]);
    }

    #[test]
    fn test_out_of_bounds() {
        let m = Matrix::from_rows(rows(), DataOrder::RowMajor).unwrap();
        assert_eq!(m.get(2, 0), None);
        assert_eq!(m.get(0, 3), None);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = Matrix::from_rows(vec![vec![1, 2], vec![3]], DataOrder::RowMajor).unwrap_err();
        assert_eq!(err, 1);
    }

    #[test]
    fn test_empty() {
        let m: Matrix<f64> = Matrix::from_rows(vec![], DataOrder::RowMajor).unwrap();
        assert!(m.is_empty());
        assert!(m.is_square());
        assert!(m.column_means().is_empty());
    }

    #[test]
    fn test_mul_vec_and_means() {
        let m = Matrix::from_rows(
            vec![vec![1.0, 2.0], vec![3.0, 4.0]],
            DataOrder::ColumnMajor,
        )
        .unwrap();
        assert_eq!(m.mul_vec(&[1.0, 1.0]), vec![3.0, 7.0]);
        assert_eq!(m.column_means(), vec![2.0, 3.0]);
    }
}
