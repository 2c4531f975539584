use std::collections::HashSet;

/// Generic qualifiers removed before comparing names. Removal is by substring,
/// in this order, each occurrence replaced with a space.
const STOP_TERMS: [&str; 14] = [
    "dr",
    "doctor",
    "clinic",
    "hospital",
    "center",
    "the",
    "in",
    "at",
    "and",
    "or",
    "gynaecologist",
    "gynecologist",
    "-",
    ".",
];

/// Share of target words that must appear in the candidate for a loose match.
/// Tuned value; changing it changes which listings count as the business.
pub const MIN_WORD_OVERLAP: f64 = 0.3;

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Lowercases, collapses whitespace and strips the stop terms.
pub fn normalize(name: &str) -> String {
    let mut out = collapse(&name.to_lowercase());
    for term in STOP_TERMS {
        out = out.replace(term, " ");
    }
    collapse(&out)
}

/// Whether `candidate` names the same business as `target`.
pub fn is_match(target: &str, candidate: &str) -> bool {
    let target = normalize(target);
    let candidate = normalize(candidate);

    if target == candidate {
        return true;
    }

    // An empty side is a substring of anything, so a name made only of
    // stop terms matches every listing.
    if candidate.contains(&target) || target.contains(&candidate) {
        return true;
    }

    let target_words = target.split(' ').collect::<HashSet<&str>>();
    let candidate_words = candidate.split(' ').collect::<HashSet<&str>>();

    if target_words.is_subset(&candidate_words) {
        return true;
    }

    let common = target_words.intersection(&candidate_words).count();
    common as f64 / target_words.len() as f64 >= MIN_WORD_OVERLAP
}

/// First variant in `targets` that matches `candidate`.
pub fn match_any<'a>(targets: &'a [String], candidate: &str) -> Option<&'a str> {
    targets
        .iter()
        .find(|t| is_match(t, candidate))
        .map(|t| t.as_str())
}
