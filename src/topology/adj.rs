//! Downward adjacency arrays.

use serde::{Deserialize, Serialize};

/// Downward adjacency from one dimension to the next lower one.
///
/// Entity `h` of the high dimension uses `ab2b[h * degree..(h + 1) * degree]`.
/// `codes`, when present, holds one orientation code per use.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adj {
    pub ab2b: Vec<usize>,
    pub codes: Option<Vec<i8>>,
}

impl Adj {
    pub fn new(ab2b: Vec<usize>) -> Self {
        Self { ab2b, codes: None }
    }

    pub fn with_codes(ab2b: Vec<usize>, codes: Vec<i8>) -> Self {
        Self {
            ab2b,
            codes: Some(codes),
        }
    }

    /// Uses of high entity `h`.
    pub fn uses(&self, h: usize, degree: usize) -> &[usize] {
        &self.ab2b[h * degree..(h + 1) * degree]
    }
}
