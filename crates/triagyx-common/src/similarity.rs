//! Cosine similarity over feature embeddings.
//!
//! Scores are rescaled from [-1, 1] to [0, 1] so downstream consumers can
//! treat them as confidences. Zero-norm inputs are guarded with a small
//! epsilon rather than producing NaN.

const NORM_EPS: f32 = 1e-9;

/// Similarity between two feature embeddings, in [0, 1].
///
/// Identical embeddings score 1.0 and the function is symmetric. Vectors of
/// mismatched length are compared over their common prefix.
pub fn compute_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    let cosine = (dot / (norm_a * norm_b).max(NORM_EPS)).clamp(-1.0, 1.0);
    (cosine + 1.0) / 2.0
}

/// Pairwise similarity matrix over a set of embeddings.
/// Symmetric by construction; the diagonal is 1.0 for non-degenerate rows.
pub fn similarity_matrix(embeddings: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let n = embeddings.len();
    let mut matrix = vec![vec![0.0f32; n]; n];
    for i in 0..n {
        for j in i..n {
            let sim = compute_similarity(&embeddings[i], &embeddings[j]);
            matrix[i][j] = sim;
            matrix[j][i] = sim;
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_similarity_is_one() {
        let v = vec![0.3f32, -1.2, 4.5, 0.0, 2.2];
        let sim = compute_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6, "expected 1.0, got {}", sim);
    }

    #[test]
    fn test_symmetry() {
        let a = vec![1.0f32, 2.0, 3.0];
        let b = vec![-0.5f32, 0.25, 4.0];
        assert_eq!(compute_similarity(&a, &b), compute_similarity(&b, &a));
    }

    #[test]
    fn test_opposite_vectors_score_zero() {
        let a = vec![1.0f32, 0.0];
        let b = vec![-1.0f32, 0.0];
        let sim = compute_similarity(&a, &b);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn test_orthogonal_vectors_score_half() {
        let a = vec![1.0f32, 0.0];
        let b = vec![0.0f32, 1.0];
        let sim = compute_similarity(&a, &b);
        assert!((sim - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_does_not_nan() {
        let a = vec![0.0f32; 4];
        let b = vec![1.0f32; 4];
        let sim = compute_similarity(&a, &b);
        assert!(sim.is_finite());
    }

    #[test]
    fn test_matrix_is_symmetric_with_unit_diagonal() {
        let embeddings = vec![
            vec![1.0f32, 2.0, 3.0],
            vec![3.0f32, 2.0, 1.0],
            vec![0.0f32, 1.0, 0.0],
        ];
        let m = similarity_matrix(&embeddings);
        for i in 0..3 {
            assert!((m[i][i] - 1.0).abs() < 1e-6);
            for j in 0..3 {
                assert_eq!(m[i][j], m[j][i]);
            }
        }
    }
}
