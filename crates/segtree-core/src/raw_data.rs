// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::SegError;

/// Memory layout of the backing buffer.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MemoryLayout {
    /// Row-major: sample `t` occupies `values[t*d..(t+1)*d]`.
    #[default]
    CContiguous,
    /// Column-major: feature `j` occupies `values[j*n..(j+1)*n]`.
    FContiguous,
}

/// Zero-copy view over an ordered `n x d` matrix of finite observations.
///
/// Rows are samples in time order, columns are features. The view is validated
/// once at construction and then shared read-only for the whole run.
#[derive(Clone, Copy, Debug)]
pub struct RawData<'a> {
    values: &'a [f64],
    n: usize,
    d: usize,
    layout: MemoryLayout,
}

impl<'a> RawData<'a> {
    /// Constructs a validated view.
    pub fn new(
        values: &'a [f64],
        n: usize,
        d: usize,
        layout: MemoryLayout,
    ) -> Result<Self, SegError> {
        if n < 2 {
            return Err(SegError::invalid_input(format!("n must be >= 2, got {n}")));
        }
        if d == 0 {
            return Err(SegError::invalid_input("d must be >= 1"));
        }

        let expected_len = n
            .checked_mul(d)
            .ok_or_else(|| SegError::invalid_input("n*d overflow while validating shape"))?;
        if values.len() != expected_len {
            return Err(SegError::invalid_input(format!(
                "value length mismatch: got {}, expected {expected_len} (n={n}, d={d})",
                values.len()
            )));
        }

        if let Some(idx) = values.iter().position(|value| !value.is_finite()) {
            let (row, col) = match layout {
                MemoryLayout::CContiguous => (idx / d, idx % d),
                MemoryLayout::FContiguous => (idx % n, idx / n),
            };
            return Err(SegError::invalid_input(format!(
                "non-finite value at row {row}, column {col}"
            )));
        }

        Ok(Self {
            values,
            n,
            d,
            layout,
        })
    }

    /// Convenience constructor for row-major data.
    pub fn from_rows(values: &'a [f64], n: usize, d: usize) -> Result<Self, SegError> {
        Self::new(values, n, d, MemoryLayout::CContiguous)
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn d(&self) -> usize {
        self.d
    }

    pub fn layout(&self) -> MemoryLayout {
        self.layout
    }

    #[inline]
    pub fn value(&self, row: usize, col: usize) -> f64 {
        match self.layout {
            MemoryLayout::CContiguous => self.values[row * self.d + col],
            MemoryLayout::FContiguous => self.values[col * self.n + row],
        }
    }

    /// Copies rows `[start, stop)` into a row-major buffer of `(stop-start)*d` values.
    pub fn materialize_rows(&self, start: usize, stop: usize) -> Vec<f64> {
        debug_assert!(start <= stop && stop <= self.n);
        if self.layout == MemoryLayout::CContiguous {
            return self.values[start * self.d..stop * self.d].to_vec();
        }

        let mut out = Vec::with_capacity((stop - start) * self.d);
        for row in start..stop {
            for col in 0..self.d {
                out.push(self.value(row, col));
            }
        }
        out
    }

    /// Builds an owned row-major copy holding the rows named by `order`, in that order.
    pub fn gather_rows(&self, order: &[usize]) -> OwnedData {
        let mut values = Vec::with_capacity(order.len() * self.d);
        for &row in order {
            for col in 0..self.d {
                values.push(self.value(row, col));
            }
        }
        OwnedData {
            values,
            n: order.len(),
            d: self.d,
        }
    }
}

/// Owned row-major matrix, used for reshuffled copies of a node's rows.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedData {
    values: Vec<f64>,
    n: usize,
    d: usize,
}

impl OwnedData {
    /// Validates and takes ownership of a row-major buffer.
    pub fn new(values: Vec<f64>, n: usize, d: usize) -> Result<Self, SegError> {
        RawData::from_rows(&values, n, d)?;
        Ok(Self { values, n, d })
    }

    /// Builds a matrix from equally sized rows.
    pub fn from_row_vecs(rows: &[Vec<f64>]) -> Result<Self, SegError> {
        let d = rows.first().map_or(0, Vec::len);
        if let Some(idx) = rows.iter().position(|row| row.len() != d) {
            return Err(SegError::invalid_input(format!(
                "ragged rows: row {idx} has {} values, expected {d}",
                rows[idx].len()
            )));
        }
        Self::new(rows.concat(), rows.len(), d)
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn d(&self) -> usize {
        self.d
    }

    pub fn view(&self) -> RawData<'_> {
        RawData {
            values: &self.values,
            n: self.n,
            d: self.d,
            layout: MemoryLayout::CContiguous,
        }
    }
}
