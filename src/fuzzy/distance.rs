// File: src/fuzzy/distance.rs

/// Optimal-string-alignment Damerau–Levenshtein distance with an upper bound.
/// Deletions, insertions, substitutions and adjacent transpositions all cost 1.
/// Returns `None` as soon as the distance is known to exceed `max_distance`.
pub fn damerau_levenshtein(a: &str, b: &str, max_distance: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    bounded_osa(&a, &b, max_distance)
}

pub fn bounded_osa(a: &[char], b: &[char], max_distance: usize) -> Option<usize> {
    if a.len().abs_diff(b.len()) > max_distance {
        return None;
    }
    if a.is_empty() || b.is_empty() {
        return Some(a.len().max(b.len()));
    }

    let n = b.len();
    let mut prev_prev = vec![0usize; n + 1];
    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        let mut row_min = i;
        for j in 1..=n {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut d = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                d = d.min(prev_prev[j - 2] + 1);
            }
            curr[j] = d;
            row_min = row_min.min(d);
        }
        // A transposition can only reach back one row past a row within bound,
        // so a whole row over the bound ends the search.
        if row_min > max_distance {
            return None;
        }
        std::mem::swap(&mut prev_prev, &mut prev);
        std::mem::swap(&mut prev, &mut curr);
    }

    let d = prev[n];
    (d <= max_distance).then_some(d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("teh", "the", 1)]
    #[case("the", "the", 0)]
    #[case("kitten", "sitting", 3)]
    #[case("", "abc", 3)]
    #[case("ca", "abc", 3)]
    #[case("receive", "recieve", 1)]
    #[case("café", "cafe", 1)]
    fn known_distances(#[case] a: &str, #[case] b: &str, #[case] expected: usize) {
        assert_eq!(damerau_levenshtein(a, b, 10), Some(expected));
        assert_eq!(damerau_levenshtein(b, a, 10), Some(expected));
    }

    #[rstest]
    #[case("kitten", "sitting", 2)]
    #[case("a", "abcd", 2)]
    #[case("abcdef", "badcfe", 2)]
    fn bound_cuts_off(#[case] a: &str, #[case] b: &str, #[case] max: usize) {
        assert_eq!(damerau_levenshtein(a, b, max), None);
    }
}
