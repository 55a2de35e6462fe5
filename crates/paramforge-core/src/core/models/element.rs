use phf::{Map, phf_map};

#[rustfmt::skip]
static ATOMIC_NUMBERS: Map<&'static str, u8> = phf_map! {
    "H" => 1, "He" => 2,
    "Li" => 3, "Be" => 4, "B" => 5, "C" => 6, "N" => 7, "O" => 8, "F" => 9, "Ne" => 10,
    "Na" => 11, "Mg" => 12, "Al" => 13, "Si" => 14, "P" => 15, "S" => 16, "Cl" => 17, "Ar" => 18,
    "K" => 19, "Ca" => 20, "Mn" => 25, "Fe" => 26, "Co" => 27, "Ni" => 28, "Cu" => 29, "Zn" => 30,
    "Se" => 34, "Br" => 35, "I" => 53,
};

// Single-bond covalent radii in Angstrom (Cordero et al., 2008).
#[rustfmt::skip]
static COVALENT_RADII: Map<u8, f64> = phf_map! {
    1u8 => 0.31, 2u8 => 0.28,
    3u8 => 1.28, 4u8 => 0.96, 5u8 => 0.84, 6u8 => 0.76, 7u8 => 0.71, 8u8 => 0.66, 9u8 => 0.57, 10u8 => 0.58,
    11u8 => 1.66, 12u8 => 1.41, 13u8 => 1.21, 14u8 => 1.11, 15u8 => 1.07, 16u8 => 1.05, 17u8 => 1.02, 18u8 => 1.06,
    19u8 => 2.03, 20u8 => 1.76, 25u8 => 1.39, 26u8 => 1.32, 27u8 => 1.26, 28u8 => 1.24, 29u8 => 1.32, 30u8 => 1.22,
    34u8 => 1.20, 35u8 => 1.20, 53u8 => 1.39,
};

const FALLBACK_COVALENT_RADIUS: f64 = 1.50;

/// Looks up the atomic number for an element symbol.
///
/// The lookup is case-insensitive in the sense that `"CL"`, `"cl"` and `"Cl"`
/// all resolve to chlorine.
pub fn atomic_number(symbol: &str) -> Option<u8> {
    let trimmed = symbol.trim();
    let mut chars = trimmed.chars();
    let first = chars.next()?;
    let normalized: String = first
        .to_uppercase()
        .chain(chars.flat_map(|c| c.to_lowercase()))
        .collect();
    ATOMIC_NUMBERS.get(normalized.as_str()).copied()
}

pub fn covalent_radius(atomic_number: u8) -> f64 {
    COVALENT_RADII
        .get(&atomic_number)
        .copied()
        .unwrap_or(FALLBACK_COVALENT_RADIUS)
}
