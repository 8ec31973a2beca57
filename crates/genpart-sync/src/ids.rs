//! Id minting

use std::collections::HashSet;

/// Sanitize `base` and make it unique against `used`, recording the result
///
/// Runs of characters outside `[a-zA-Z0-9_-]` collapse to one `-`; leading
/// and trailing dashes are dropped; an empty result becomes `placeholder`.
/// Collisions get a `-1`, `-2`, ... suffix.
pub fn ensure_unique_id(base: &str, used: &mut HashSet<String>) -> String {
    let mut sanitized = String::with_capacity(base.len());
    let mut in_run = false;
    for ch in base.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
            sanitized.push(ch);
            in_run = false;
        } else if !in_run {
            sanitized.push('-');
            in_run = true;
        }
    }
    let sanitized = match sanitized.trim_matches('-') {
        "" => "placeholder",
        trimmed => trimmed,
    };

    let mut candidate = sanitized.to_string();
    let mut index = 1;
    while used.contains(&candidate) {
        candidate = format!("{sanitized}-{index}");
        index += 1;
    }
    used.insert(candidate.clone());
    candidate
}
