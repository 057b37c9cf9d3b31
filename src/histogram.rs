//! Weighted histograms
//!
//! Bins keep the sum of weights and the sum of squared weights, so
//! statistical errors survive scaling and division.
use std::{fmt, io::Write, str::FromStr};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Equidistant binning of the interval `[min, max)`
#[derive(Copy, Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Binning {
    nbins: usize,
    min: f64,
    max: f64,
}

/// Where a value ends up
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Location {
    Underflow,
    Bin(usize),
    Overflow,
}

impl Binning {
    pub fn new(nbins: usize, min: f64, max: f64) -> Result<Self> {
        // also rejects NaN bounds
        if nbins == 0 || !(min < max) {
            return Err(Error::InvalidBinning(format!("{nbins},{min},{max}")));
        }
        Ok(Self { nbins, min, max })
    }

    /// Binning with fixed bounds, which must satisfy `min < max`
    pub(crate) const fn uniform(nbins: usize, min: f64, max: f64) -> Self {
        assert!(nbins > 0, "Binning needs at least one bin");
        Self { nbins, min, max }
    }

    pub fn nbins(&self) -> usize {
        self.nbins
    }

    /// Lower edge of the first bin
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper edge of the last bin
    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn width(&self) -> f64 {
        (self.max - self.min) / self.nbins as f64
    }

    /// Lower and upper edge of bin `i`
    pub fn edges(&self, i: usize) -> (f64, f64) {
        let w = self.width();
        (self.min + i as f64 * w, self.min + (i + 1) as f64 * w)
    }

    pub fn locate(&self, x: f64) -> Location {
        if x < self.min {
            Location::Underflow
        } else if x >= self.max || x.is_nan() {
            Location::Overflow
        } else {
            let i = ((x - self.min) / self.width()) as usize;
            // rounding can push values just below `max` into bin `nbins`
            Location::Bin(i.min(self.nbins - 1))
        }
    }
}

impl FromStr for Binning {
    type Err = Error;

    /// Parse `nbins,min,max`
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidBinning(s.to_owned());
        let Some((nbins, min, max)) = s.split(',').map(str::trim).collect_tuple() else {
            return Err(invalid());
        };
        let nbins = nbins.parse().map_err(|_| invalid())?;
        let min = min.parse().map_err(|_| invalid())?;
        let max = max.parse().map_err(|_| invalid())?;
        Self::new(nbins, min, max).map_err(|_| invalid())
    }
}

impl TryFrom<String> for Binning {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Binning> for String {
    fn from(b: Binning) -> Self {
        b.to_string()
    }
}

impl fmt::Display for Binning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.nbins, self.min, self.max)
    }
}

/// One-dimensional histogram
#[derive(Clone, Debug, PartialEq)]
pub struct Hist1D {
    binning: Binning,
    sumw: Vec<f64>,
    sumw2: Vec<f64>,
    underflow: f64,
    overflow: f64,
    entries: u64,
}

impl Hist1D {
    pub fn new(binning: Binning) -> Self {
        Self {
            binning,
            sumw: vec![0.; binning.nbins],
            sumw2: vec![0.; binning.nbins],
            underflow: 0.,
            overflow: 0.,
            entries: 0,
        }
    }

    pub fn binning(&self) -> &Binning {
        &self.binning
    }

    pub fn fill(&mut self, x: f64) {
        self.fill_weighted(x, 1.)
    }

    pub fn fill_weighted(&mut self, x: f64, w: f64) {
        self.entries += 1;
        match self.binning.locate(x) {
            Location::Underflow => self.underflow += w,
            Location::Overflow => self.overflow += w,
            Location::Bin(i) => {
                self.sumw[i] += w;
                self.sumw2[i] += w * w;
            }
        }
    }

    /// Sum of weights in bin `i`
    pub fn value(&self, i: usize) -> f64 {
        self.sumw[i]
    }

    /// Statistical error of bin `i`
    pub fn error(&self, i: usize) -> f64 {
        self.sumw2[i].sqrt()
    }

    pub fn values(&self) -> &[f64] {
        &self.sumw
    }

    pub fn underflow(&self) -> f64 {
        self.underflow
    }

    pub fn overflow(&self) -> f64 {
        self.overflow
    }

    /// Number of fill calls
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Largest bin content, excluding under- and overflow
    pub fn max(&self) -> f64 {
        self.sumw.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Sum of bin contents, excluding under- and overflow
    pub fn integral(&self) -> f64 {
        self.sumw.iter().sum()
    }

    pub fn scale(&mut self, factor: f64) {
        for w in self.sumw.iter_mut() {
            *w *= factor;
        }
        for w2 in self.sumw2.iter_mut() {
            *w2 *= factor * factor;
        }
        self.underflow *= factor;
        self.overflow *= factor;
    }

    /// Bin-by-bin ratio `self / denom`
    ///
    /// Errors are propagated assuming uncorrelated histograms. Bins with
    /// a vanishing denominator are set to zero.
    pub fn divide(&self, denom: &Self) -> Result<Self> {
        if self.binning != denom.binning {
            return Err(Error::BinningMismatch);
        }
        let mut ratio = Self::new(self.binning);
        ratio.entries = self.entries;
        for i in 0..self.binning.nbins {
            let (a, b) = (self.sumw[i], denom.sumw[i]);
            if b == 0. {
                continue;
            }
            let (ea2, eb2) = (self.sumw2[i], denom.sumw2[i]);
            ratio.sumw[i] = a / b;
            ratio.sumw2[i] = (ea2 * b * b + eb2 * a * a) / (b * b * b * b);
        }
        Ok(ratio)
    }

    /// Add the contents of `other`
    ///
    /// # Panics
    ///
    /// Panics if the binnings differ.
    pub fn merge(&mut self, other: &Self) {
        assert_eq!(self.binning, other.binning, "Histogram binnings differ");
        for (w, ow) in self.sumw.iter_mut().zip(&other.sumw) {
            *w += ow;
        }
        for (w2, ow2) in self.sumw2.iter_mut().zip(&other.sumw2) {
            *w2 += ow2;
        }
        self.underflow += other.underflow;
        self.overflow += other.overflow;
        self.entries += other.entries;
    }

    /// Write one line `low high content error` per bin
    pub fn write_table(&self, mut out: impl Write) -> std::io::Result<()> {
        for i in 0..self.binning.nbins {
            let (low, high) = self.binning.edges(i);
            writeln!(out, "{low:e} {high:e} {:e} {:e}", self.value(i), self.error(i))?;
        }
        Ok(())
    }
}

/// Two-dimensional histogram
#[derive(Clone, Debug, PartialEq)]
pub struct Hist2D {
    x: Binning,
    y: Binning,
    // row-major, x index varies slowest
    sumw: Vec<f64>,
    sumw2: Vec<f64>,
    outside: f64,
    entries: u64,
}

impl Hist2D {
    pub fn new(x: Binning, y: Binning) -> Self {
        let n = x.nbins * y.nbins;
        Self {
            x,
            y,
            sumw: vec![0.; n],
            sumw2: vec![0.; n],
            outside: 0.,
            entries: 0,
        }
    }

    pub fn binning(&self) -> (&Binning, &Binning) {
        (&self.x, &self.y)
    }

    pub fn fill(&mut self, x: f64, y: f64) {
        self.fill_weighted(x, y, 1.)
    }

    pub fn fill_weighted(&mut self, x: f64, y: f64, w: f64) {
        self.entries += 1;
        match (self.x.locate(x), self.y.locate(y)) {
            (Location::Bin(ix), Location::Bin(iy)) => {
                let i = ix * self.y.nbins + iy;
                self.sumw[i] += w;
                self.sumw2[i] += w * w;
            }
            _ => self.outside += w,
        }
    }

    pub fn value(&self, ix: usize, iy: usize) -> f64 {
        self.sumw[ix * self.y.nbins + iy]
    }

    pub fn error(&self, ix: usize, iy: usize) -> f64 {
        self.sumw2[ix * self.y.nbins + iy].sqrt()
    }

    /// Sum of weights that did not end up in any bin
    pub fn outside(&self) -> f64 {
        self.outside
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn max(&self) -> f64 {
        self.sumw.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn integral(&self) -> f64 {
        self.sumw.iter().sum()
    }

    /// Add the contents of `other`
    ///
    /// # Panics
    ///
    /// Panics if the binnings differ.
    pub fn merge(&mut self, other: &Self) {
        assert_eq!(
            (self.x, self.y),
            (other.x, other.y),
            "Histogram binnings differ"
        );
        for (w, ow) in self.sumw.iter_mut().zip(&other.sumw) {
            *w += ow;
        }
        for (w2, ow2) in self.sumw2.iter_mut().zip(&other.sumw2) {
            *w2 += ow2;
        }
        self.outside += other.outside;
        self.entries += other.entries;
    }

    /// Write one line `xlow xhigh ylow yhigh content error` per bin
    pub fn write_table(&self, mut out: impl Write) -> std::io::Result<()> {
        for (ix, iy) in (0..self.x.nbins).cartesian_product(0..self.y.nbins) {
            let (xlow, xhigh) = self.x.edges(ix);
            let (ylow, yhigh) = self.y.edges(iy);
            writeln!(
                out,
                "{xlow:e} {xhigh:e} {ylow:e} {yhigh:e} {:e} {:e}",
                self.value(ix, iy),
                self.error(ix, iy)
            )?;
        }
        Ok(())
    }
}
