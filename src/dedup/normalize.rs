//! Name normalization, entropy, and shingling for approximate matching.

use std::collections::HashSet;

use crate::utils::text::normalize_whitespace;

/// Shingle width in characters.
pub const SHINGLE_SIZE: usize = 3;

/// Exact-match normal form: lowercase, collapsed whitespace, trimmed.
pub fn normalize_exact(name: &str) -> String {
    normalize_whitespace(name).to_lowercase()
}

/// Fuzzy-match normal form: lowercase, keeping only alphanumerics and
/// apostrophes, with runs of everything else collapsed to single spaces.
pub fn normalize_fuzzy(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_space = false;
    for c in name.chars() {
        if c.is_alphanumeric() || c == '\'' {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            for lower in c.to_lowercase() {
                out.push(lower);
            }
        } else {
            pending_space = true;
        }
    }
    out
}

/// Shannon entropy (bits) over the character distribution of `s`.
///
/// Empty input yields 0.0.
pub fn name_entropy(s: &str) -> f64 {
    let chars: Vec<char> = s.chars().collect();
    if chars.is_empty() {
        return 0.0;
    }

    let mut counts: std::collections::HashMap<char, usize> = std::collections::HashMap::new();
    for &c in &chars {
        *counts.entry(c).or_insert(0) += 1;
    }

    let len = chars.len() as f64;
    counts
        .values()
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Character 3-gram shingles of `s` with spaces stripped.
///
/// Strings shorter than 2 characters after stripping yield the whole string
/// as a single shingle; the empty string yields no shingles.
pub fn shingles(s: &str) -> HashSet<String> {
    let stripped: Vec<char> = s.chars().filter(|c| !c.is_whitespace()).collect();

    if stripped.is_empty() {
        return HashSet::new();
    }
    if stripped.len() < 2 {
        return HashSet::from([stripped.iter().collect()]);
    }

    stripped
        .windows(SHINGLE_SIZE)
        .map(|w| w.iter().collect())
        .collect()
}
