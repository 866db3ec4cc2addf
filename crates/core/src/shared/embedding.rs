/// Fixed-length face identity vector produced by the embedding model.
///
/// Values are kept on the model's native output scale (no L2
/// normalization) so Euclidean distances are comparable against the
/// configured threshold.
#[derive(Clone, Debug, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Euclidean distance to another embedding of the same length.
    ///
    /// Lengths always agree for a fixed model; a mismatch is a programming
    /// error, caught in debug builds.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        debug_assert_eq!(
            self.values.len(),
            other.values.len(),
            "embeddings must have equal length"
        );
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn emb(values: &[f32]) -> Embedding {
        Embedding::new(values.to_vec())
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let a = emb(&[1.5, -2.0, 3.25, 0.0]);
        assert_relative_eq!(a.euclidean_distance(&a), 0.0);
    }

    #[test]
    fn test_distance_known_value() {
        // 3-4-5 triangle
        let a = emb(&[0.0, 0.0]);
        let b = emb(&[3.0, 4.0]);
        assert_relative_eq!(a.euclidean_distance(&b), 5.0);
    }

    #[rstest]
    #[case(&[1.0, 2.0, 3.0], &[4.0, 6.0, 3.0])]
    #[case(&[-1.0, 0.5], &[2.5, -0.5])]
    #[case(&[0.0], &[10.0])]
    fn test_distance_symmetric(#[case] a: &[f32], #[case] b: &[f32]) {
        let (a, b) = (emb(a), emb(b));
        assert_relative_eq!(a.euclidean_distance(&b), b.euclidean_distance(&a));
    }

    #[rstest]
    #[case(&[0.0, 0.0], &[1.0, 1.0], &[2.0, 0.0])]
    #[case(&[1.0, 2.0, 3.0], &[-4.0, 0.0, 2.0], &[7.0, 7.0, -1.0])]
    #[case(&[0.5, 0.5, 0.5, 0.5], &[1.5, 0.5, -0.5, 0.5], &[0.0, 0.0, 0.0, 0.0])]
    fn test_triangle_inequality(#[case] a: &[f32], #[case] b: &[f32], #[case] c: &[f32]) {
        let (a, b, c) = (emb(a), emb(b), emb(c));
        let direct = a.euclidean_distance(&c);
        let via_b = a.euclidean_distance(&b) + b.euclidean_distance(&c);
        assert!(
            direct <= via_b + 1e-6,
            "triangle inequality violated: {direct} > {via_b}"
        );
    }

    #[test]
    #[should_panic(expected = "embeddings must have equal length")]
    fn test_length_mismatch_panics_in_debug() {
        emb(&[1.0, 2.0]).euclidean_distance(&emb(&[1.0]));
    }
}
