use ndarray::Array1;

use crate::error::InputError;

/// Face embedding produced by an upstream recognition model
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    vector: Array1<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Result<Self, InputError> {
        if values.is_empty() {
            return Err(InputError::EmptyEmbedding);
        }
        Ok(Self {
            vector: Array1::from(values),
        })
    }

    pub fn dim(&self) -> usize {
        self.vector.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        // Array1 built from a Vec is always contiguous
        self.vector.as_slice().unwrap_or_default()
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.vector.to_vec()
    }

    /// Euclidean distance to `other`.
    ///
    /// Both embeddings must have the same dimension; the matcher checks this
    /// before calling. Extra trailing components of the longer one are ignored.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.vector
            .iter()
            .zip(other.vector.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }
}

impl TryFrom<Vec<f32>> for Embedding {
    type Error = InputError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}
