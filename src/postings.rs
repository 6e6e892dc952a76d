//! Posting-list algebra
//!
//! Posting lists are strictly ascending, duplicate-free lists of article
//! ids. Every operation here is a linear sort-merge and preserves that
//! invariant.

use std::cmp::Ordering;

/// 1-based article identifier, assigned in encounter order at index time.
pub type ArtId = u32;

/// Sorted, duplicate-free list of [`ArtId`].
pub type PostingList = Vec<ArtId>;

/// Intersection: articles present in both lists.
pub fn and_posting(p1: &[ArtId], p2: &[ArtId]) -> PostingList {
    let mut res = Vec::with_capacity(p1.len().min(p2.len()));
    let (mut i1, mut i2) = (0, 0);
    while i1 < p1.len() && i2 < p2.len() {
        match p1[i1].cmp(&p2[i2]) {
            Ordering::Equal => {
                res.push(p1[i1]);
                i1 += 1;
                i2 += 1;
            }
            Ordering::Less => i1 += 1,
            Ordering::Greater => i2 += 1,
        }
    }
    res
}

/// Union with duplicate suppression.
pub fn or_posting(p1: &[ArtId], p2: &[ArtId]) -> PostingList {
    let mut res = Vec::with_capacity(p1.len() + p2.len());
    let (mut i1, mut i2) = (0, 0);
    while i1 < p1.len() && i2 < p2.len() {
        match p1[i1].cmp(&p2[i2]) {
            Ordering::Equal => {
                res.push(p1[i1]);
                i1 += 1;
                i2 += 1;
            }
            Ordering::Less => {
                res.push(p1[i1]);
                i1 += 1;
            }
            Ordering::Greater => {
                res.push(p2[i2]);
                i2 += 1;
            }
        }
    }
    res.extend_from_slice(&p1[i1..]);
    res.extend_from_slice(&p2[i2..]);
    res
}

/// Difference: articles in `p1` that are not in `p2`.
pub fn minus_posting(p1: &[ArtId], p2: &[ArtId]) -> PostingList {
    let mut res = Vec::with_capacity(p1.len());
    let (mut i1, mut i2) = (0, 0);
    while i1 < p1.len() && i2 < p2.len() {
        match p1[i1].cmp(&p2[i2]) {
            Ordering::Equal => {
                i1 += 1;
                i2 += 1;
            }
            Ordering::Less => {
                res.push(p1[i1]);
                i1 += 1;
            }
            Ordering::Greater => i2 += 1,
        }
    }
    res.extend_from_slice(&p1[i1..]);
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascending_no_dups(p: &[ArtId]) -> bool {
        p.windows(2).all(|w| w[0] < w[1])
    }

    #[test]
    fn and_intersects() {
        assert_eq!(and_posting(&[1, 3, 5, 7], &[2, 3, 6, 7]), vec![3, 7]);
        assert_eq!(and_posting(&[], &[1, 2]), Vec::<ArtId>::new());
        assert_eq!(and_posting(&[1, 2], &[]), Vec::<ArtId>::new());
    }

    #[test]
    fn or_unions_without_duplicates() {
        assert_eq!(or_posting(&[1, 3, 5], &[2, 3, 6]), vec![1, 2, 3, 5, 6]);
        assert_eq!(or_posting(&[], &[1, 2]), vec![1, 2]);
        assert_eq!(or_posting(&[1, 2], &[]), vec![1, 2]);
    }

    #[test]
    fn minus_subtracts() {
        assert_eq!(minus_posting(&[1, 2, 3, 5], &[2, 5, 9]), vec![1, 3]);
        assert_eq!(minus_posting(&[1, 2], &[]), vec![1, 2]);
        assert_eq!(minus_posting(&[], &[1]), Vec::<ArtId>::new());
    }

    #[test]
    fn idempotence_and_annihilation() {
        let p = vec![2, 4, 8];
        assert_eq!(and_posting(&p, &p), p);
        assert_eq!(or_posting(&p, &p), p);
        assert_eq!(minus_posting(&p, &p), Vec::<ArtId>::new());
    }

    #[test]
    fn commutativity() {
        let p = vec![1, 4, 6];
        let q = vec![2, 4, 9];
        assert_eq!(and_posting(&p, &q), and_posting(&q, &p));
        assert_eq!(or_posting(&p, &q), or_posting(&q, &p));
    }

    #[test]
    fn outputs_stay_sorted_and_distinct() {
        let p = vec![1, 2, 3, 10, 20];
        let q = vec![2, 3, 4, 15, 20];
        for result in [
            and_posting(&p, &q),
            or_posting(&p, &q),
            minus_posting(&p, &q),
        ] {
            assert!(ascending_no_dups(&result));
        }
    }
}
