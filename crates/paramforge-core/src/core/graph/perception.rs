use crate::core::models::element::covalent_radius;
use nalgebra::Point3;

// Pairs closer than this are treated as overlapping atoms, not bonds.
const MIN_BOND_DISTANCE: f64 = 0.4;

/// Infers covalent bonds from a geometry.
///
/// Atoms `i` and `j` are bonded when their distance is at most
/// `(r_i + r_j) * tolerance`, with `r` the covalent radius of each element.
/// Returns index pairs with `i < j` in ascending order.
pub fn perceive_bonds(
    atomic_numbers: &[u8],
    positions: &[Point3<f64>],
    tolerance: f64,
) -> Vec<(usize, usize)> {
    let n = atomic_numbers.len().min(positions.len());
    let mut bonds = Vec::new();
    for i in 0..n {
        let r_i = covalent_radius(atomic_numbers[i]);
        for j in (i + 1)..n {
            let threshold = (r_i + covalent_radius(atomic_numbers[j])) * tolerance;
            let dist_sq = nalgebra::distance_squared(&positions[i], &positions[j]);
            if dist_sq <= threshold * threshold && dist_sq > MIN_BOND_DISTANCE * MIN_BOND_DISTANCE {
                bonds.push((i, j));
            }
        }
    }
    bonds
}
