//! Symmetry operators used to build biological assemblies.
//!
//! An operator is a rotation followed by a translation. Operators are stored
//! row-major in the canonical dictionary but composed with glam's
//! column-major `DMat3`, so conversions go through a transpose.

use glam::{DMat3, DVec3};

use crate::types::data::{Transformation, IDENTITY};

/// A rigid-body operator `p -> rotation * p + translation`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Operator {
    pub rotation: DMat3,
    pub translation: DVec3,
}

impl Default for Operator {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Operator {
    pub const IDENTITY: Operator = Operator {
        rotation: DMat3::IDENTITY,
        translation: DVec3::ZERO,
    };

    /// Build from a row-major matrix and a translation vector.
    pub fn from_rows(matrix: [[f64; 3]; 3], vector: [f64; 3]) -> Self {
        Self {
            rotation: DMat3::from_cols_array_2d(&matrix).transpose(),
            translation: DVec3::from_array(vector),
        }
    }

    /// Row-major matrix.
    pub fn matrix(&self) -> [[f64; 3]; 3] {
        self.rotation.transpose().to_cols_array_2d()
    }

    pub fn vector(&self) -> [f64; 3] {
        self.translation.to_array()
    }

    /// `self ∘ inner`: apply `inner` first, then `self`.
    pub fn after(&self, inner: &Operator) -> Operator {
        Operator {
            rotation: self.rotation * inner.rotation,
            translation: self.rotation * inner.translation + self.translation,
        }
    }

    /// Compose a product term such as `(1)(2)(3)`: the rightmost operator is
    /// applied first.
    pub fn compose<'a>(operators: impl DoubleEndedIterator<Item = &'a Operator>) -> Operator {
        operators
            .rev()
            .fold(Operator::IDENTITY, |acc, op| op.after(&acc))
    }

    pub fn to_transformation<I, S>(&self, chains: I) -> Transformation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let matrix = if self.rotation == DMat3::IDENTITY {
            IDENTITY
        } else {
            self.matrix()
        };
        Transformation::new(chains, matrix, self.vector())
    }
}
