// crates/stsim-stm/src/hash.rs

//! Stable 64-bit combine over stride histories, used to index SPC rows.
//!
//! Follows the boost `hash_combine` recipe: seed with the length, then fold
//! each element in with the golden-ratio constant and two shifts. The exact
//! function is arbitrary but must stay stable within one implementation;
//! profiles written by this crate depend on it only at synthesis time.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]

const GOLDEN_RATIO: u64 = 0x9e37_79b9;

/// Hash an ordered sequence of strides.
#[must_use]
pub fn combine<I>(values: I) -> u64
where
    I: IntoIterator<Item = i64>,
    I::IntoIter: ExactSizeIterator,
{
    let iter = values.into_iter();
    let mut result = iter.len() as u64;
    for v in iter {
        result ^= (v as u64)
            .wrapping_add(GOLDEN_RATIO)
            .wrapping_add(result << 6)
            .wrapping_add(result >> 2);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_stable_and_order_sensitive() {
        let a = combine([1i64, 2, 3]);
        assert_eq!(a, combine([1i64, 2, 3]));
        assert_ne!(a, combine([3i64, 2, 1]));
        assert_ne!(a, combine([1i64, 2]));
    }

    #[test]
    fn handles_negative_strides() {
        assert_ne!(combine([-64i64, 64]), combine([64i64, -64]));
    }
}
