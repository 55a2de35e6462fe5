use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Unknown array '{0}'")]
    UnknownArray(String),
    #[error("Required array '{0}' is missing")]
    MissingArray(String),
    #[error("Array '{name}' has shape {found:?}, expected {expected}")]
    ShapeMismatch {
        name: String,
        expected: String,
        found: Vec<usize>,
    },
    #[error("Array '{name}' must hold {expected} values")]
    WrongType { name: String, expected: &'static str },
    #[error("Array '{name}' declares {declared} elements but holds {actual}")]
    LengthMismatch {
        name: String,
        declared: usize,
        actual: usize,
    },
    #[error("Array '{name}' contains a missing value where one is required")]
    MissingValue { name: String },
    #[error("Array '{name}' is inconsistent: {detail}")]
    Inconsistent { name: String, detail: String },
}

/// A dense, row-major array with an explicit shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dtype", rename_all = "lowercase")]
pub enum NamedArray {
    Int { shape: Vec<usize>, data: Vec<u32> },
    /// `None` cells serialize as `null`.
    Float {
        shape: Vec<usize>,
        data: Vec<Option<f64>>,
    },
}

impl NamedArray {
    pub fn ints(shape: Vec<usize>, data: Vec<u32>) -> Self {
        Self::Int { shape, data }
    }

    pub fn floats(shape: Vec<usize>, data: Vec<Option<f64>>) -> Self {
        Self::Float { shape, data }
    }

    /// Float array without missing cells.
    pub fn dense(shape: Vec<usize>, data: impl IntoIterator<Item = f64>) -> Self {
        Self::Float {
            shape,
            data: data.into_iter().map(Some).collect(),
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Int { shape, .. } | Self::Float { shape, .. } => shape,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Int { data, .. } => data.len(),
            Self::Float { data, .. } => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_length(&self, name: &str) -> Result<(), SchemaError> {
        let declared: usize = self.shape().iter().product();
        if declared != self.len() {
            return Err(SchemaError::LengthMismatch {
                name: name.to_string(),
                declared,
                actual: self.len(),
            });
        }
        Ok(())
    }
}

/// Named arrays keyed by name, serialized as one JSON object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArrayMap(BTreeMap<String, NamedArray>);

impl ArrayMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, array: NamedArray) {
        self.0.insert(name.into(), array);
    }

    pub fn get(&self, name: &str) -> Option<&NamedArray> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rejects any array whose name is not in `allowed` and any array whose
    /// data length disagrees with its shape.
    pub fn validate(&self, allowed: &[&str]) -> Result<(), SchemaError> {
        for (name, array) in &self.0 {
            if !allowed.contains(&name.as_str()) {
                return Err(SchemaError::UnknownArray(name.clone()));
            }
            array.check_length(name)?;
        }
        Ok(())
    }

    /// Returns a copy holding only the arrays listed in `names`.
    pub fn subset(&self, names: &[&str]) -> ArrayMap {
        Self(
            self.0
                .iter()
                .filter(|(name, _)| names.contains(&name.as_str()))
                .map(|(name, array)| (name.clone(), array.clone()))
                .collect(),
        )
    }

    fn require(&self, name: &str) -> Result<&NamedArray, SchemaError> {
        self.0
            .get(name)
            .ok_or_else(|| SchemaError::MissingArray(name.to_string()))
    }

    /// Integer array whose trailing dimensions equal `inner` (for example
    /// `&[2]` for an `[n, 2]` bond list). Returns the leading dimension and
    /// the flat data.
    pub fn ints_with_inner(
        &self,
        name: &str,
        inner: &[usize],
    ) -> Result<(usize, &[u32]), SchemaError> {
        match self.require(name)? {
            NamedArray::Int { shape, data } => Ok((leading_dim(name, shape, inner)?, data)),
            NamedArray::Float { .. } => Err(SchemaError::WrongType {
                name: name.to_string(),
                expected: "integer",
            }),
        }
    }

    pub fn floats_with_inner(
        &self,
        name: &str,
        inner: &[usize],
    ) -> Result<(usize, &[Option<f64>]), SchemaError> {
        match self.require(name)? {
            NamedArray::Float { shape, data } => Ok((leading_dim(name, shape, inner)?, data)),
            NamedArray::Int { .. } => Err(SchemaError::WrongType {
                name: name.to_string(),
                expected: "float",
            }),
        }
    }

    /// Float array of shape `[n, ...]` whose trailing dimensions are not
    /// constrained. Returns the full shape and the data.
    pub fn floats(&self, name: &str) -> Result<(&[usize], &[Option<f64>]), SchemaError> {
        match self.require(name)? {
            NamedArray::Float { shape, data } => Ok((shape, data)),
            NamedArray::Int { .. } => Err(SchemaError::WrongType {
                name: name.to_string(),
                expected: "float",
            }),
        }
    }
}

fn leading_dim(name: &str, shape: &[usize], inner: &[usize]) -> Result<usize, SchemaError> {
    match shape.split_first() {
        Some((&n, rest)) if rest == inner => Ok(n),
        _ => {
            let mut dims = vec!["n".to_string()];
            dims.extend(inner.iter().map(ToString::to_string));
            Err(SchemaError::ShapeMismatch {
                name: name.to_string(),
                expected: format!("[{}]", dims.join(", ")),
                found: shape.to_vec(),
            })
        }
    }
}

/// Flattens a list of fixed-size tuples into a `[n, N]` integer array.
pub fn tuple_array<T, const N: usize>(tuples: &[[T; N]], to_int: impl Fn(&T) -> u32) -> NamedArray {
    NamedArray::ints(
        vec![tuples.len(), N],
        tuples.iter().flatten().map(to_int).collect(),
    )
}
