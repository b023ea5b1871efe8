//! Suggestions for unknown names.
//!
//! Error messages are read by whoever (or whatever) wrote the program, so an
//! unknown name comes back with the closest known names and, for function
//! position, the full list of what is available.

/// Find similar names using Levenshtein distance, closest first.
pub fn find_similar_symbols<S: AsRef<str>>(target: &str, available: &[S]) -> Vec<String> {
    let mut candidates: Vec<(&str, usize)> = available
        .iter()
        .map(|s| (s.as_ref(), levenshtein_distance(target, s.as_ref())))
        .filter(|(_, dist)| *dist <= 3 && *dist < target.chars().count().max(2))
        .collect();

    candidates.sort_by_key(|(name, dist)| (*dist, *name));
    candidates.dedup_by_key(|(name, _)| *name);

    candidates
        .into_iter()
        .take(3)
        .map(|(s, _)| s.to_string())
        .collect()
}

/// Calculate Levenshtein distance between two strings
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    // single-row dynamic programming
    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0; b_chars.len() + 1];
    for (i, a_char) in a_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b_chars.len()]
}

/// " Did you mean `x`?" style suffix, or an empty string when nothing is close.
pub fn did_you_mean<S: AsRef<str>>(target: &str, available: &[S]) -> String {
    let suggestions = find_similar_symbols(target, available);
    match suggestions.len() {
        0 => String::new(),
        1 => format!(". Did you mean `{}`?", suggestions[0]),
        _ => format!(". Did you mean one of: {}?", suggestions.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("test", "test"), 0);
        assert_eq!(levenshtein_distance("test", "tests"), 1);
        assert_eq!(levenshtein_distance("map", "mpa"), 2);
        assert_eq!(levenshtein_distance("hello", "world"), 4);
        assert_eq!(levenshtein_distance("", "abc"), 3);
    }

    #[test]
    fn test_find_similar_symbols() {
        let symbols = ["map", "filter", "reduce", "mapv"];
        assert_eq!(find_similar_symbols("fiter", &symbols), vec!["filter"]);
        assert_eq!(find_similar_symbols("mpa", &symbols)[0], "map");
        assert!(find_similar_symbols("zzzzzz", &symbols).is_empty());
    }

    #[test]
    fn hint_text() {
        assert_eq!(did_you_mean("fiter", &["filter"]), ". Did you mean `filter`?");
        assert_eq!(did_you_mean("qqq", &["filter"]), "");
    }
}
