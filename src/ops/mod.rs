//! Geometric operations shared by the normalizers.

pub mod operator;

// Re-export commonly used items
pub use operator::Operator;
