//! Lightweight wrapper for array shapes and dimension bookkeeping.

use std::fmt;

/// Stores the logical dimensions of an array.
///
/// A rank-0 shape is valid and describes a single element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Constructs a new shape from the provided dimensions.
    pub fn new<D: Into<Vec<usize>>>(dims: D) -> Self {
        Shape { dims: dims.into() }
    }

    /// The shape of a 0-d array.
    pub fn scalar() -> Self {
        Shape { dims: Vec::new() }
    }

    /// Borrow the raw dimension slice for downstream calculations.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the rank (number of axes) of the shape.
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Computes the total number of elements implied by the shape.
    ///
    /// Returns `None` when the product overflows `usize`.
    pub fn checked_num_elements(&self) -> Option<usize> {
        self.dims
            .iter()
            .try_fold(1usize, |count, &dim| count.checked_mul(dim))
    }

    /// Computes the total number of elements, saturating on overflow.
    pub fn num_elements(&self) -> usize {
        self.checked_num_elements().unwrap_or(usize::MAX)
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape::new(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::new(dims.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Shape::new(dims.to_vec())
    }
}

impl From<usize> for Shape {
    fn from(dim: usize) -> Self {
        Shape::new(vec![dim])
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (index, dim) in self.dims.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{dim}")?;
        }
        if self.dims.len() == 1 {
            write!(f, ",")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_shape_has_one_element() {
        let shape = Shape::scalar();
        assert_eq!(shape.rank(), 0);
        assert_eq!(shape.num_elements(), 1);
    }

    #[test]
    fn overflowing_shape_reports_none() {
        let shape = Shape::new([usize::MAX, 2]);
        assert_eq!(shape.checked_num_elements(), None);
    }

    #[test]
    fn display_matches_tuple_notation() {
        assert_eq!(Shape::from(3).to_string(), "(3,)");
        assert_eq!(Shape::from([2, 0, 4]).to_string(), "(2, 0, 4)");
        assert_eq!(Shape::scalar().to_string(), "()");
    }
}
