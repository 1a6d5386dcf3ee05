//! Compact bitset representation of clades (leaf sets).
//!
//! # Overview
//! Every leaf of the pruned reference gets a bit position (see
//! [`LeafIndex`](crate::snapshot::LeafIndex)); a clade is then the bitset of
//! the leaves below a node, and two clades from different trees match exactly
//! when their bitsets are equal.
//!
//! # Example
//! For leaves [A, B, C, D] mapped to indices [0, 1, 2, 3]:
//! - Clade {A, C} → bitset `0b0101` (bits 0 and 2 set)
//! - Clade {B, C, D} → bitset `0b1110` (bits 1, 2, 3 set)

/// A compact bitset of leaf indices.
///
/// Bits are stored in `Vec<u64>` words, 64 leaves per word, so trees of any
/// size are supported.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Bitset(pub Vec<u64>);

impl Bitset {
    /// Creates a new bitset with all bits set to 0.
    ///
    /// # Example
    /// ```
    /// # use rust_python_subset_support::bitset::Bitset;
    /// // 100 leaves need 2 words (128 bits)
    /// let bs = Bitset::zeros(2);
    /// assert_eq!(bs.0.len(), 2);
    /// ```
    pub fn zeros(words: usize) -> Self {
        Bitset(vec![0u64; words])
    }

    /// Number of words needed for `num_leaves` bits.
    pub fn words_for(num_leaves: usize) -> usize {
        num_leaves.div_ceil(64)
    }

    /// Sets the bit at the given index to 1.
    ///
    /// # Example
    /// ```
    /// # use rust_python_subset_support::bitset::Bitset;
    /// let mut bs = Bitset::zeros(1);
    /// bs.set(0);
    /// bs.set(5);
    /// assert_eq!(bs.0[0], 0b00100001);
    /// ```
    #[inline]
    pub fn set(&mut self, idx: usize) {
        let word = idx >> 6; // idx / 64
        let bit = idx & 63; // idx % 64
        self.0[word] |= 1u64 << bit;
    }

    /// Bitwise OR with another bitset: `self` becomes `self ∪ other`.
    ///
    /// # Example
    /// ```
    /// # use rust_python_subset_support::bitset::Bitset;
    /// let mut left = Bitset::zeros(1);
    /// left.set(0);
    /// let mut right = Bitset::zeros(1);
    /// right.set(1);
    /// left.or_assign(&right);
    /// assert_eq!(left.0[0], 0b11);
    /// ```
    #[inline]
    pub fn or_assign(&mut self, other: &Bitset) {
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a |= *b;
        }
    }

    /// Number of leaves in the set.
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Indices of the set bits, ascending.
    ///
    /// ```
    /// # use rust_python_subset_support::bitset::Bitset;
    /// let mut bs = Bitset::zeros(2);
    /// bs.set(3);
    /// bs.set(70);
    /// assert_eq!(bs.ones().collect::<Vec<_>>(), vec![3, 70]);
    /// ```
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().enumerate().flat_map(|(w, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some((w << 6) + bit)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitset_basic() {
        let mut bs = Bitset::zeros(1);
        bs.set(0);
        bs.set(2);
        assert_eq!(bs.0[0], 0b0101);
        assert_eq!(bs.ones().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_words_for() {
        assert_eq!(Bitset::words_for(0), 0);
        assert_eq!(Bitset::words_for(1), 1);
        assert_eq!(Bitset::words_for(64), 1);
        assert_eq!(Bitset::words_for(65), 2);
    }

    /// ```text
    ///           root
    ///          /    \
    ///        node1   D
    ///        /   \
    ///       A    node2
    ///            /   \
    ///           B     C
    /// ```
    ///
    /// Leaf mapping: A=0, B=1, C=2, D=3
    ///
    /// Clades:
    /// - node2: {B, C} → `0b0110`
    /// - node1: {A, B, C} → `0b0111`
    #[test]
    fn test_mini_tree_clades() {
        let mut node2 = Bitset::zeros(1);
        node2.set(1);
        node2.set(2);
        assert_eq!(node2.0[0], 0b0110);
        assert_eq!(node2.count_ones(), 2);

        let mut node1 = Bitset::zeros(1);
        node1.set(0);
        node1.or_assign(&node2);
        assert_eq!(node1.0[0], 0b0111);
        assert_eq!(node1.ones().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_large_tree() {
        let mut bs = Bitset::zeros(2);
        bs.set(0);
        bs.set(63);
        bs.set(64);
        bs.set(127);

        assert_eq!(bs.count_ones(), 4);
        assert_eq!(bs.0[0], 1u64 | (1u64 << 63));
        assert_eq!(bs.0[1], 1u64 | (1u64 << 63));
        assert_eq!(bs.ones().collect::<Vec<_>>(), vec![0, 63, 64, 127]);
    }
}
