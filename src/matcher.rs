use tracing::debug;

/// Collapse case and whitespace so that comparisons ignore formatting.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Map a free-text answer onto the best-matching option among a
/// control's discrete options.
///
/// Tiers, in priority order: exact normalized equality, bidirectional
/// substring containment, then fuzzy similarity against `threshold`.
/// Within a tier the first option in document order wins. Returns the
/// index of the matched option, or `None` — a miss here is logged and
/// left to the caller; it never aborts a traversal on its own.
pub fn best_option(answer: &str, options: &[String], threshold: f64) -> Option<usize> {
    let answer = normalize(answer);
    if answer.is_empty() {
        return None;
    }

    let normalized: Vec<String> = options.iter().map(|o| normalize(o)).collect();

    if let Some(i) = normalized.iter().position(|o| *o == answer) {
        return Some(i);
    }

    if let Some(i) = normalized
        .iter()
        .position(|o| !o.is_empty() && (o.contains(&answer) || answer.contains(o.as_str())))
    {
        return Some(i);
    }

    for (i, option) in normalized.iter().enumerate() {
        let score = strsim::jaro_winkler(option, &answer);
        if score >= threshold {
            debug!(option = %options[i], score, "fuzzy option match");
            return Some(i);
        }
    }

    debug!(%answer, "no option matched");
    None
}
