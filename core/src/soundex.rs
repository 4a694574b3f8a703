//! Four-character phonetic codes used to expand out-of-vocabulary query terms.
//!
//! The first letter is kept (uppercased) and each later letter contributes its
//! consonant group digit when that digit is non-zero and differs from the last
//! non-zero group seen. The first letter's own group seeds that comparison, and
//! vowels and `H`/`W`/`Y` neither emit nor reset it. So `Ashcraft` is `A261`
//! and `Pfister` is `P236`.

use crate::error::{Error, Result};

const CODE_LEN: usize = 4;

fn group(c: char) -> u8 {
    match c {
        'B' | 'F' | 'P' | 'V' => 1,
        'C' | 'G' | 'J' | 'K' | 'Q' | 'S' | 'X' | 'Z' => 2,
        'D' | 'T' => 3,
        'L' => 4,
        'M' | 'N' => 5,
        'R' => 6,
        _ => 0,
    }
}

/// Encode `term` into its phonetic code. Fails with `InvalidInput` when the
/// term is empty.
pub fn encode(term: &str) -> Result<String> {
    let mut letters = term.chars().flat_map(char::to_uppercase);
    let first = letters
        .next()
        .ok_or_else(|| Error::InvalidInput("cannot encode an empty term".into()))?;

    let mut code = String::with_capacity(CODE_LEN);
    code.push(first);
    let mut digits = 0;
    let mut prev = group(first);
    for c in letters {
        if digits == CODE_LEN - 1 {
            break;
        }
        let g = group(c);
        if g != 0 && g != prev {
            code.push(char::from(b'0' + g));
            digits += 1;
            prev = g;
        }
    }
    for _ in digits..CODE_LEN - 1 {
        code.push('0');
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_examples() {
        assert_eq!(encode("Robert").unwrap(), "R163");
        assert_eq!(encode("Rupert").unwrap(), "R163");
        assert_eq!(encode("Ashcraft").unwrap(), "A261");
        assert_eq!(encode("Tymczak").unwrap(), "T520");
    }

    #[test]
    fn first_letter_seeds_the_collapse() {
        assert_eq!(encode("Pfister").unwrap(), "P236");
        assert_eq!(encode("lloyd").unwrap(), "L300");
    }

    #[test]
    fn case_insensitive_and_padded() {
        assert_eq!(encode("lee").unwrap(), "L000");
        assert_eq!(encode("LEE").unwrap(), encode("lee").unwrap());
        assert_eq!(encode("a").unwrap(), "A000");
    }

    #[test]
    fn truncates_to_four() {
        assert_eq!(encode("washington").unwrap(), "W252");
    }

    #[test]
    fn empty_term_is_invalid() {
        assert!(matches!(encode(""), Err(Error::InvalidInput(_))));
    }
}
