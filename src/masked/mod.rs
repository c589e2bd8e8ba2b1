// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Arrays of values paired with a validity array of the same shape.
//!
//! Every arithmetic operation propagates validity: if any operand is invalid,
//! or the result isn't finite (e.g. a division by zero), the result is
//! invalid. Invalid values are never "hidden" by a sentinel; anything wanting
//! plain numbers must explicitly call [`Masked::filled`].


use std::ops::{Add, Div, Mul, Sub};

use ndarray::{prelude::*, Zip};

/// Values with an accompanying validity array. `valid[i]` is `true` when
/// `data[i]` may be used.
#[derive(Debug, Clone, PartialEq)]
pub struct Masked<D: Dimension> {
    pub(crate) data: Array<f64, D>,
    pub(crate) valid: Array<bool, D>,
}

/// A single spectrum.
pub type MaskedSpectrum = Masked<Ix1>;

/// Many spectra; rows are spectra, columns are channels.
pub type MaskedSpectra = Masked<Ix2>;

impl<D: Dimension> Masked<D> {
    /// Pair values with a validity array. Any value that isn't finite is
    /// marked invalid.
    ///
    /// # Panics
    ///
    /// Panics if the shapes of `data` and `valid` differ.
    pub fn new(data: Array<f64, D>, mut valid: Array<bool, D>) -> Masked<D> {
        assert_eq!(
            data.shape(),
            valid.shape(),
            "values and validity must have the same shape"
        );
        Zip::from(&mut valid)
            .and(&data)
            .for_each(|v, d| *v &= d.is_finite());
        Masked { data, valid }
    }

    /// All finite values are valid.
    pub fn from_data(data: Array<f64, D>) -> Masked<D> {
        let valid = data.mapv(f64::is_finite);
        Masked { data, valid }
    }

    pub fn data(&self) -> &Array<f64, D> {
        &self.data
    }

    pub fn valid(&self) -> &Array<bool, D> {
        &self.valid
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn num_valid(&self) -> usize {
        self.valid.iter().filter(|v| **v).count()
    }

    /// Get the values with every invalid element replaced by `fill`.
    pub fn filled(&self, fill: f64) -> Array<f64, D> {
        let mut out = self.data.clone();
        Zip::from(&mut out)
            .and(&self.valid)
            .for_each(|o, &v| {
                if !v {
                    *o = fill
                }
            });
        out
    }

    /// Apply a function to every value. Validity is carried over, and results
    /// that aren't finite are invalidated.
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Masked<D> {
        let data = self.data.mapv(f);
        Masked::new(data, self.valid.clone())
    }

    /// Combine two arrays element-by-element.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    pub fn zip_with<F: Fn(f64, f64) -> f64>(&self, other: &Masked<D>, f: F) -> Masked<D> {
        assert_eq!(
            self.shape(),
            other.shape(),
            "cannot combine masked arrays of different shapes"
        );
        let mut data = self.data.clone();
        let mut valid = self.valid.clone();
        Zip::from(&mut data)
            .and(&mut valid)
            .and(&other.data)
            .and(&other.valid)
            .for_each(|d, v, &o, &ov| {
                *d = f(*d, o);
                *v = *v && ov && d.is_finite();
            });
        Masked { data, valid }
    }

    /// Get the mean of all valid elements. `None` if there are none.
    pub fn mean(&self) -> Option<f64> {
        let (sum, count) = self
            .data
            .iter()
            .zip(self.valid.iter())
            .filter(|(_, v)| **v)
            .fold((0.0, 0_usize), |(s, c), (d, _)| (s + d, c + 1));
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }
}

impl MaskedSpectrum {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl MaskedSpectra {
    pub fn num_rows(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn num_chans(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn row(&self, i_row: usize) -> MaskedSpectrum {
        Masked {
            data: self.data.row(i_row).to_owned(),
            valid: self.valid.row(i_row).to_owned(),
        }
    }

    /// Overwrite a row.
    pub fn assign_row(&mut self, i_row: usize, spectrum: &MaskedSpectrum) {
        self.data.row_mut(i_row).assign(&spectrum.data);
        self.valid.row_mut(i_row).assign(&spectrum.valid);
    }

    /// Build a new set of spectra from the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> MaskedSpectra {
        Masked {
            data: self.data.select(Axis(0), rows),
            valid: self.valid.select(Axis(0), rows),
        }
    }

    /// Channel-wise mean over the given rows. Only valid elements contribute;
    /// a channel with no valid elements is invalid in the result.
    pub fn mean_over_rows(&self, rows: &[usize]) -> MaskedSpectrum {
        let num_chans = self.num_chans();
        let mut sum = Array1::<f64>::zeros(num_chans);
        let mut count = Array1::<usize>::zeros(num_chans);
        for &i_row in rows {
            Zip::from(&mut sum)
                .and(&mut count)
                .and(self.data.row(i_row))
                .and(self.valid.row(i_row))
                .for_each(|s, c, &d, &v| {
                    if v {
                        *s += d;
                        *c += 1;
                    }
                });
        }
        let data = Zip::from(&sum)
            .and(&count)
            .map_collect(|&s, &c| if c == 0 { f64::NAN } else { s / c as f64 });
        let valid = count.mapv(|c| c > 0);
        Masked::new(data, valid)
    }
}

macro_rules! impl_masked_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl<D: Dimension> $trait<&Masked<D>> for &Masked<D> {
            type Output = Masked<D>;

            fn $method(self, rhs: &Masked<D>) -> Masked<D> {
                self.zip_with(rhs, |a, b| a $op b)
            }
        }

        impl<D: Dimension> $trait<f64> for &Masked<D> {
            type Output = Masked<D>;

            fn $method(self, rhs: f64) -> Masked<D> {
                self.map(|a| a $op rhs)
            }
        }
    };
}

impl_masked_op!(Add, add, +);
impl_masked_op!(Sub, sub, -);
impl_masked_op!(Mul, mul, *);
impl_masked_op!(Div, div, /);
