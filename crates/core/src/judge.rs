//! Typed-answer judging with partial credit for near misses.

use crate::model::Verdict;

/// Lowercase, strip punctuation, collapse whitespace.
#[must_use]
pub fn normalize(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .flat_map(char::to_lowercase)
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Edit distance in characters.
#[must_use]
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn tolerance(len: usize) -> usize {
    match len {
        0 | 1 => 0,
        2..=4 => 1,
        _ => 2,
    }
}

/// Judge a typed answer against the expected one.
#[must_use]
pub fn judge_text(expected: &str, given: &str) -> Verdict {
    let expected = normalize(expected);
    let given = normalize(given);
    if given.is_empty() {
        return Verdict::Incorrect;
    }
    if expected == given {
        return Verdict::Correct;
    }

    let allowed = tolerance(expected.chars().count());
    if allowed > 0 && levenshtein(&expected, &given) <= allowed {
        Verdict::Partial
    } else {
        Verdict::Incorrect
    }
}
