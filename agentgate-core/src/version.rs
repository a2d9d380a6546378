// Copyright 2025 Agentgate Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Agent version identifiers.
//!
//! Versions are stored as text. Integer versions appear both bare (`"2"`) and
//! with a `v` prefix (`"v2"`); both spellings name the same logical version.

use std::cmp::Ordering;

/// Parse the integer behind `"N"` or `"vN"`.
///
/// Returns `None` for anything else (`"1.0.0"`, `"beta"`, `""`).
pub fn parse_numeric(version: &str) -> Option<u64> {
    let trimmed = version.trim();
    let digits = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Every spelling naming the same logical version, the given spelling first.
pub fn equivalent_spellings(version: &str) -> Vec<String> {
    let mut spellings = vec![version.to_string()];
    if let Some(n) = parse_numeric(version) {
        for candidate in [n.to_string(), format!("v{}", n)] {
            if !spellings.contains(&candidate) {
                spellings.push(candidate);
            }
        }
    }
    spellings
}

/// True when both strings name the same logical version.
pub fn same_version(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    matches!((parse_numeric(a), parse_numeric(b)), (Some(x), Some(y)) if x == y)
}

/// Allocate the version that follows every numeric version in `existing`.
///
/// Non-numeric versions do not take part in the maximum. The result keeps the
/// prefix style of `requested`: `"v2"` yields `"vN"`, `"2"` yields `"N"`.
pub fn next_version<'a>(requested: &str, existing: impl IntoIterator<Item = &'a str>) -> String {
    let max = existing.into_iter().filter_map(parse_numeric).max().unwrap_or(0);
    let next = max.saturating_add(1);

    let prefixed = requested.trim_start().starts_with(['v', 'V']);
    if prefixed {
        format!("v{}", next)
    } else {
        next.to_string()
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Component<'a> {
    Number(u64),
    Text(&'a str),
}

fn components(version: &str) -> Vec<Component<'_>> {
    let trimmed = version.trim();
    let body = match trimmed.strip_prefix(['v', 'V']) {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => trimmed,
    };

    body.split(['.', '-', '+'])
        .map(|part| match part.parse::<u64>() {
            Ok(n) if part.bytes().all(|b| b.is_ascii_digit()) => Component::Number(n),
            _ => Component::Text(part),
        })
        .collect()
}

/// Total order over version strings.
///
/// Dotted components compare numerically where both sides are integers
/// (`"v2" < "v10"`, `"1.2.0" < "1.10.0"`); ties fall back to the raw text so
/// distinct spellings never compare equal.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    components(a)
        .cmp(&components(b))
        .then_with(|| a.cmp(b))
}
