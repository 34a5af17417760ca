//! Columnar match-score dataset with the columns expected by the training
//! and plotting helpers.
//!
//! A well-formed dataset carries two continuous features `x` and `y` and the
//! two full-time score counts `ft_home` and `ft_away`, each score in
//! `0..=MAX_SCORE`. Validation happens where the frame is built, so every
//! consumer downstream can rely on the columns being present and in range.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use ndarray::{Array1, Array2, Axis};
use serde::Deserialize;

use crate::errors::{Result, ScoreGpError};
use crate::types::RegressionData;

/// Highest full-time score count a side can record.
pub const MAX_SCORE: u8 = 5;

/// Columns a CSV source must provide.
pub const REQUIRED_COLUMNS: [&str; 4] = ["x", "y", "ft_home", "ft_away"];

/// One match observation as it appears in a CSV source.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchRecord {
    pub x: f64,
    pub y: f64,
    pub ft_home: i64,
    pub ft_away: i64,
}

/// Which side of the fixture a score column refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

/// Columnar storage for match observations
#[derive(Debug, Clone)]
pub struct MatchData {
    x: Array1<f64>,
    y: Array1<f64>,
    ft_home: Array1<u8>,
    ft_away: Array1<u8>,
}

impl MatchData {
    /// Build a dataset from pre-validated columns.
    ///
    /// Columns must have a common length and scores must not exceed
    /// [`MAX_SCORE`].
    pub fn from_columns(
        x: Array1<f64>,
        y: Array1<f64>,
        ft_home: Array1<u8>,
        ft_away: Array1<u8>,
    ) -> Result<Self> {
        let n = x.len();
        if y.len() != n || ft_home.len() != n || ft_away.len() != n {
            return Err(ScoreGpError::InvalidValue(format!(
                "column lengths differ: x={}, y={}, ft_home={}, ft_away={}",
                n,
                y.len(),
                ft_home.len(),
                ft_away.len()
            )));
        }
        for (row, (&h, &a)) in ft_home.iter().zip(ft_away.iter()).enumerate() {
            if h > MAX_SCORE {
                return Err(ScoreGpError::ScoreOutOfRange {
                    row,
                    value: h as i64,
                });
            }
            if a > MAX_SCORE {
                return Err(ScoreGpError::ScoreOutOfRange {
                    row,
                    value: a as i64,
                });
            }
        }
        Ok(MatchData {
            x,
            y,
            ft_home,
            ft_away,
        })
    }

    /// Build a dataset from row records, checking score ranges.
    pub fn from_records(records: &[MatchRecord]) -> Result<Self> {
        let mut x = Vec::with_capacity(records.len());
        let mut y = Vec::with_capacity(records.len());
        let mut ft_home = Vec::with_capacity(records.len());
        let mut ft_away = Vec::with_capacity(records.len());
        for (row, r) in records.iter().enumerate() {
            for value in [r.ft_home, r.ft_away] {
                if value < 0 || value > MAX_SCORE as i64 {
                    return Err(ScoreGpError::ScoreOutOfRange { row, value });
                }
            }
            x.push(r.x);
            y.push(r.y);
            ft_home.push(r.ft_home as u8);
            ft_away.push(r.ft_away as u8);
        }
        Ok(MatchData {
            x: Array1::from_vec(x),
            y: Array1::from_vec(y),
            ft_home: Array1::from_vec(ft_home),
            ft_away: Array1::from_vec(ft_away),
        })
    }

    /// Read a dataset from any CSV source with a header row.
    ///
    /// The header is checked for [`REQUIRED_COLUMNS`]; the first missing
    /// column is reported by name.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers()?.clone();
        for col in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == col) {
                return Err(ScoreGpError::MissingColumn(col.to_string()));
            }
        }
        let records = rdr
            .deserialize::<MatchRecord>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Self::from_records(&records)
    }

    /// Read a dataset from a CSV file.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Whether the dataset holds no observations.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Continuous feature `x`.
    pub fn x(&self) -> &Array1<f64> {
        &self.x
    }

    /// Continuous feature `y`.
    pub fn y(&self) -> &Array1<f64> {
        &self.y
    }

    /// Full-time home score counts.
    pub fn ft_home(&self) -> &Array1<u8> {
        &self.ft_home
    }

    /// Full-time away score counts.
    pub fn ft_away(&self) -> &Array1<u8> {
        &self.ft_away
    }

    /// Scores of the given side.
    fn scores(&self, side: Side) -> &Array1<u8> {
        match side {
            Side::Home => &self.ft_home,
            Side::Away => &self.ft_away,
        }
    }

    /// Training data for the regression workflow: `(n, 2)` features
    /// `[x, y]` and `(n, 2)` targets `[ft_home, ft_away]` cast to f64.
    pub fn regression_data(&self) -> RegressionData {
        let n = self.len();
        let mut features = Array2::zeros((n, 2));
        features.index_axis_mut(Axis(1), 0).assign(&self.x);
        features.index_axis_mut(Axis(1), 1).assign(&self.y);
        let mut targets = Array2::zeros((n, 2));
        targets
            .index_axis_mut(Axis(1), 0)
            .assign(&self.ft_home.mapv(f64::from));
        targets
            .index_axis_mut(Axis(1), 1)
            .assign(&self.ft_away.mapv(f64::from));
        RegressionData::new(features, targets)
    }

    /// Value counts of one side's scores over `0..=MAX_SCORE`.
    pub fn score_counts(&self, side: Side) -> [usize; MAX_SCORE as usize + 1] {
        let mut counts = [0; MAX_SCORE as usize + 1];
        for &s in self.scores(side).iter() {
            counts[s as usize] += 1;
        }
        counts
    }

    /// Frequency of each `(ft_home, ft_away)` score pair.
    pub fn score_pair_counts(&self) -> BTreeMap<(u8, u8), usize> {
        let mut counts = BTreeMap::new();
        for (&h, &a) in self.ft_home.iter().zip(self.ft_away.iter()) {
            *counts.entry((h, a)).or_insert(0) += 1;
        }
        counts
    }
}
