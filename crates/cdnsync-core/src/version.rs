//! Version parsing and ordering.

use semver::Version;
use std::cmp::Ordering;

/// Parse a version string as a semantic version.
///
/// Accepts a leading `v` and short forms such as `1.2` or `3`, which are
/// padded with zero components. Returns `None` for anything else.
pub fn parse(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let s = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    if let Ok(version) = Version::parse(s) {
        return Some(version);
    }

    // Pad the numeric core: "1.2-beta" -> "1.2.0-beta"
    let core_end = s.find(|c| c == '-' || c == '+').unwrap_or(s.len());
    let (core, rest) = s.split_at(core_end);
    let parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty()
        || parts.len() >= 3
        || parts
            .iter()
            .any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    let mut padded = parts.join(".");
    for _ in parts.len()..3 {
        padded.push_str(".0");
    }
    padded.push_str(rest);
    Version::parse(&padded).ok()
}

/// Sort version strings newest first.
///
/// Strings that do not parse as semantic versions are dropped without an
/// error, so the output can be shorter than the input. A release sorts ahead
/// of its own prereleases. Versions that compare equal (e.g. `1.0` and
/// `1.0.0`) are ordered by their original text, which keeps the result
/// deterministic and idempotent.
pub fn sort_descending(versions: &[String]) -> Vec<String> {
    let mut parsed: Vec<(Version, &String)> = versions
        .iter()
        .filter_map(|raw| parse(raw).map(|v| (v, raw)))
        .collect();

    parsed.sort_by(|(a, raw_a), (b, raw_b)| match b.cmp(a) {
        Ordering::Equal => raw_a.cmp(raw_b),
        other => other,
    });

    parsed.into_iter().map(|(_, raw)| raw.clone()).collect()
}
