// File: src/swipe/shape.rs

const MAX_CONSONANT_RUN: usize = 5;

fn is_vowel(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u' | 'y')
}

/// Rejects beam artifacts that cannot be real words: over-long strings, ASCII
/// words of three or more letters without a vowel, a character repeated three
/// times in a row, or more than five consonants in a row.
pub fn is_plausible(word: &str, max_len: usize) -> bool {
    let len = word.chars().count();
    if len == 0 || len > max_len {
        return false;
    }

    let mut run_char = None;
    let mut run_len = 0;
    for c in word.chars() {
        if Some(c) == run_char {
            run_len += 1;
            if run_len >= 3 {
                return false;
            }
        } else {
            run_char = Some(c);
            run_len = 1;
        }
    }

    if !word.is_ascii() {
        return true;
    }
    if len >= 3 && !word.chars().any(is_vowel) {
        return false;
    }
    let mut consonants = 0;
    for c in word.chars() {
        if c.is_ascii_alphabetic() && !is_vowel(c) {
            consonants += 1;
            if consonants > MAX_CONSONANT_RUN {
                return false;
            }
        } else {
            consonants = 0;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("the", true)]
    #[case("strengths", true)]
    #[case("by", true)]
    #[case("rhythm", true)]
    #[case("naïve", true)]
    #[case("rtt", false)]
    #[case("cooool", false)]
    #[case("xkcdqrstv", false)]
    #[case("", false)]
    fn plausibility(#[case] word: &str, #[case] expected: bool) {
        assert_eq!(is_plausible(word, 24), expected);
    }

    #[test]
    fn length_cap() {
        assert!(!is_plausible(&"ab".repeat(13), 24));
    }
}
