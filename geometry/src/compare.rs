//! Tolerance comparisons for vertex attributes
//!
//! Every comparison is a straight per-component `|a - b| < eps` check.
//! Nothing is normalized or angle-wrapped first, so two unit normals that
//! point the same way but differ in length compare unequal.

/// Compare two scalars within `eps`
#[inline]
pub fn same_scalar(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() < eps
}

/// Compare two fixed-size vectors component by component
#[inline]
pub fn same_vector<const N: usize>(a: &[f32; N], b: &[f32; N], eps: f32) -> bool {
    same_array(a, b, eps)
}

/// Compare two variable-length arrays by index
///
/// Lengths must match. Elements are matched by position, not as sets, so
/// `[0.5, 0.25]` and `[0.25, 0.5]` are different.
#[inline]
pub fn same_array(a: &[f32], b: &[f32], eps: f32) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| same_scalar(x, y, eps))
}
