/// In-place L2 normalization helper to keep allocations down during hot paths.
/// Zero vectors are left untouched.
pub(crate) fn l2_normalize_in_place(v: &mut [f32]) {
    let norm_sq: f32 = v.iter().map(|x| x * x).sum();
    if norm_sq > 0.0 {
        let inv_norm = norm_sq.sqrt().recip();
        for x in v.iter_mut() {
            *x *= inv_norm;
        }
    }
}

/// Cosine similarity clamped to `[0, 1]`.
///
/// Returns 0 when either vector is absent, the lengths differ, either
/// vector is empty or all zeros, or the result is not finite. Opposed
/// vectors clamp to 0 rather than going negative.
pub fn cosine_similarity(a: Option<&[f32]>, b: Option<&[f32]>) -> f32 {
    let (Some(a), Some(b)) = (a, b) else {
        return 0.0;
    };
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let cos = dot / (norm_a.sqrt() * norm_b.sqrt());
    if cos.is_finite() {
        cos.clamp(0.0, 1.0) as f32
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_normalize_simple_vector() {
        let mut v = vec![3.0f32, 4.0];
        l2_normalize_in_place(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn l2_normalize_zero_vector() {
        let mut v = vec![0.0f32, 0.0, 0.0];
        l2_normalize_in_place(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn l2_normalize_idempotent() {
        let mut v = vec![1.0f32, 2.0, 3.0];
        l2_normalize_in_place(&mut v);
        let first = v.clone();
        l2_normalize_in_place(&mut v);
        for (a, b) in v.iter().zip(&first) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn cosine_of_vector_with_itself_is_one() {
        let v = [0.3f32, -1.2, 4.0, 0.0, 2.5];
        assert!((cosine_similarity(Some(&v), Some(&v)) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_is_scale_invariant() {
        let a = [1.0f32, 2.0, 3.0];
        let b = [2.0f32, 4.0, 6.0];
        assert!((cosine_similarity(Some(&a), Some(&b)) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert_eq!(cosine_similarity(Some(&[1.0, 0.0]), Some(&[0.0, 1.0])), 0.0);
    }

    #[test]
    fn cosine_of_opposed_vectors_clamps_to_zero() {
        assert_eq!(cosine_similarity(Some(&[1.0, 1.0]), Some(&[-1.0, -1.0])), 0.0);
    }

    #[test]
    fn cosine_degenerate_inputs_are_zero() {
        let v = [1.0f32, 2.0];
        assert_eq!(cosine_similarity(None, Some(&v)), 0.0);
        assert_eq!(cosine_similarity(Some(&v), None), 0.0);
        assert_eq!(cosine_similarity(Some(&v), Some(&[1.0, 2.0, 3.0])), 0.0);
        assert_eq!(cosine_similarity(Some(&v), Some(&[0.0, 0.0])), 0.0);
        assert_eq!(cosine_similarity(Some(&[]), Some(&[])), 0.0);
        assert_eq!(cosine_similarity(Some(&[f32::NAN, 1.0]), Some(&v)), 0.0);
    }

    #[test]
    fn cosine_is_symmetric() {
        let a = [0.2f32, 0.9, 0.4];
        let b = [0.7f32, 0.1, 0.5];
        assert_eq!(
            cosine_similarity(Some(&a), Some(&b)),
            cosine_similarity(Some(&b), Some(&a))
        );
    }
}
