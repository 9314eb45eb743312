/// Vector for one word or short phrase, plus whether the provider actually knew it.
///
/// An out-of-vocabulary word is represented by a zero vector with `valid == false`.
/// Cosine similarity against a zero vector is 0, so such words never cross a
/// similarity threshold on geometry alone.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub valid: bool,
}

impl Embedding {
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            valid: true,
        }
    }

    pub fn zero(dimension: usize) -> Self {
        Self {
            vector: vec![0.0; dimension],
            valid: false,
        }
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}
