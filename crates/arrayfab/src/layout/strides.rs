//! Stride arithmetic: standard layouts, contiguity detection, and keep-order strides.

use smallvec::SmallVec;

use super::order::ResolvedOrder;

/// Contiguity characteristics of a strided array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ContiguityFlags {
    pub c_contiguous: bool,
    pub f_contiguous: bool,
}

impl ContiguityFlags {
    /// Flags of an array that is neither row- nor column-major contiguous.
    pub const NONE: ContiguityFlags = ContiguityFlags {
        c_contiguous: false,
        f_contiguous: false,
    };

    /// Derives the flags from a shape, its byte strides, and the element size.
    ///
    /// Axes of extent one never break contiguity, and arrays with a zero-extent
    /// axis are contiguous in both orders.
    pub fn compute(dims: &[usize], strides: &[isize], itemsize: usize) -> Self {
        if dims.contains(&0) {
            return ContiguityFlags {
                c_contiguous: true,
                f_contiguous: true,
            };
        }
        ContiguityFlags {
            c_contiguous: is_packed(dims.iter().zip(strides).rev(), itemsize),
            f_contiguous: is_packed(dims.iter().zip(strides), itemsize),
        }
    }
}

fn is_packed<'a>(axes: impl Iterator<Item = (&'a usize, &'a isize)>, itemsize: usize) -> bool {
    let mut expected = itemsize as isize;
    for (&dim, &stride) in axes {
        if dim == 1 {
            continue;
        }
        if stride != expected {
            return false;
        }
        expected = match expected.checked_mul(dim as isize) {
            Some(next) => next,
            None => return false,
        };
    }
    true
}

/// Builds packed byte strides for `order` with overflow checking.
pub fn contiguous_strides_or_error<E, F>(
    dims: &[usize],
    itemsize: usize,
    order: ResolvedOrder,
    mut on_overflow: F,
) -> Result<Vec<isize>, E>
where
    F: FnMut() -> E,
{
    let mut strides = vec![0isize; dims.len()];
    let mut stride = isize::try_from(itemsize).map_err(|_| on_overflow())?;
    let axes: SmallVec<[usize; 8]> = match order {
        ResolvedOrder::RowMajor => (0..dims.len()).rev().collect(),
        ResolvedOrder::ColMajor => (0..dims.len()).collect(),
    };
    for axis in axes {
        strides[axis] = stride;
        let extent = isize::try_from(dims[axis]).map_err(|_| on_overflow())?;
        stride = stride.checked_mul(extent).ok_or_else(&mut on_overflow)?;
    }
    Ok(strides)
}

/// Computes strides for `target_dims` that reproduce the per-axis memory
/// ordering of a source array with `source_strides`.
///
/// Axes are ranked by ascending absolute stride; on ties the higher axis is
/// treated as faster-varying. Packed strides are then assigned in that rank
/// order starting from `itemsize`. Returns `None` on overflow.
pub fn keep_order_strides(
    source_dims: &[usize],
    source_strides: &[isize],
    itemsize: usize,
    target_dims: Option<&[usize]>,
) -> Option<Vec<isize>> {
    let dims = target_dims.unwrap_or(source_dims);
    let mut ranked: SmallVec<[(usize, usize); 8]> = source_strides
        .iter()
        .enumerate()
        .map(|(axis, stride)| (stride.unsigned_abs(), axis))
        .collect();
    ranked.sort_by(|lhs, rhs| lhs.0.cmp(&rhs.0).then(rhs.1.cmp(&lhs.1)));

    let mut strides = vec![0isize; source_strides.len()];
    let mut stride = isize::try_from(itemsize).ok()?;
    for (_, axis) in ranked {
        strides[axis] = stride;
        stride = stride.checked_mul(isize::try_from(*dims.get(axis)?).ok()?)?;
    }
    Some(strides)
}

/// Returns the `[low, high)` byte range addressed relative to the base offset,
/// or `None` when the shape holds no elements.
pub fn byte_bounds(dims: &[usize], strides: &[isize], itemsize: usize) -> Option<(isize, isize)> {
    if dims.contains(&0) {
        return None;
    }
    let mut low = 0isize;
    let mut high = itemsize as isize;
    for (&dim, &stride) in dims.iter().zip(strides) {
        let span = stride.saturating_mul(dim as isize - 1);
        if span < 0 {
            low = low.saturating_add(span);
        } else {
            high = high.saturating_add(span);
        }
    }
    Some((low, high))
}

/// Visits the byte offset of every element in logical row-major order.
pub fn for_each_offset<F>(dims: &[usize], strides: &[isize], base: isize, mut visit: F)
where
    F: FnMut(isize),
{
    if dims.contains(&0) {
        return;
    }
    let rank = dims.len();
    let mut index: SmallVec<[usize; 8]> = SmallVec::from_elem(0, rank);
    let mut offset = base;
    loop {
        visit(offset);
        let mut axis = rank;
        loop {
            if axis == 0 {
                return;
            }
            axis -= 1;
            index[axis] += 1;
            offset += strides[axis];
            if index[axis] < dims[axis] {
                break;
            }
            offset -= strides[axis] * dims[axis] as isize;
            index[axis] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strides(dims: &[usize], itemsize: usize, order: ResolvedOrder) -> Vec<isize> {
        contiguous_strides_or_error::<(), _>(dims, itemsize, order, || ())
            .unwrap_or_else(|_| panic!("unexpected overflow"))
    }

    #[test]
    fn contiguous_strides_match_order() {
        assert_eq!(strides(&[2, 3, 4], 4, ResolvedOrder::RowMajor), vec![48, 16, 4]);
        assert_eq!(strides(&[2, 3, 4], 4, ResolvedOrder::ColMajor), vec![4, 8, 24]);
        assert!(strides(&[], 8, ResolvedOrder::RowMajor).is_empty());
    }

    #[test]
    fn contiguous_strides_report_overflow() {
        let result =
            contiguous_strides_or_error(&[usize::MAX / 2, 4], 8, ResolvedOrder::RowMajor, || "overflow");
        assert_eq!(result, Err("overflow"));
    }

    #[test]
    fn contiguity_ignores_unit_axes() {
        let flags = ContiguityFlags::compute(&[3, 1, 4], &[16, 999, 4], 4);
        assert!(flags.c_contiguous);
        assert!(!flags.f_contiguous);

        let vector = ContiguityFlags::compute(&[5], &[8], 8);
        assert!(vector.c_contiguous && vector.f_contiguous);

        let scalar = ContiguityFlags::compute(&[], &[], 8);
        assert!(scalar.c_contiguous && scalar.f_contiguous);
    }

    #[test]
    fn permuted_view_is_not_contiguous() {
        // (2, 3, 4) row-major f32 viewed with axes (1, 0, 2).
        let flags = ContiguityFlags::compute(&[3, 2, 4], &[16, 48, 4], 4);
        assert_eq!(flags, ContiguityFlags::NONE);
    }

    #[test]
    fn keep_order_strides_follow_source_ranking() {
        let kept = keep_order_strides(&[3, 2, 4], &[16, 48, 4], 8, None);
        assert_eq!(kept, Some(vec![32, 96, 8]));

        let resized = keep_order_strides(&[3, 2, 4], &[16, 48, 4], 2, Some(&[5, 2, 3]));
        assert_eq!(resized, Some(vec![6, 30, 2]));
    }

    #[test]
    fn keep_order_ties_prefer_trailing_axis() {
        let kept = keep_order_strides(&[2, 2], &[0, 0], 4, None);
        assert_eq!(kept, Some(vec![8, 4]));
    }

    #[test]
    fn offsets_visit_row_major_order() {
        let mut seen = Vec::new();
        for_each_offset(&[2, 3], &[4, 8], 0, |offset| seen.push(offset));
        assert_eq!(seen, vec![0, 8, 16, 4, 12, 20]);

        let mut single = Vec::new();
        for_each_offset(&[], &[], 12, |offset| single.push(offset));
        assert_eq!(single, vec![12]);
    }

    #[test]
    fn byte_bounds_account_for_negative_strides() {
        assert_eq!(byte_bounds(&[3], &[-4], 4), Some((-8, 4)));
        assert_eq!(byte_bounds(&[2, 0], &[8, 4], 4), None);
    }
}
