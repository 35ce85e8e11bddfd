//! Catalog-number parsing, range handling and compaction.
//!
//! Catalog numbers look like `PCCG-01965`: an alphanumeric prefix (optionally
//! ending in a dash), a zero-padded numeric body and an optional trailing
//! disc letter. Inputs may also be written as ranges (`PCCG-0001~3`), of which
//! only the first element is ever looked up.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

// ============================================================================
// Patterns
// ============================================================================

/// Canonical range separator. The other two glyphs are folded into it.
pub const RANGE_SEPARATOR: char = '~';

/// Fullwidth tilde (U+FF5E) and wave dash (U+301C), both seen in Japanese shop listings.
const RANGE_SEPARATOR_VARIANTS: [char; 2] = ['\u{FF5E}', '\u{301C}'];

/// `PREFIX` `-*` `START` `~` `END` `LETTER?`
///
/// The prefix is lazy so that the numeric body captures every trailing digit.
static RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9]+?)(-*)(\d+)~(\d+)([A-Za-z]?)$").unwrap()
});

/// `PREFIX-?` `DIGITS` `LETTER?`
///
/// The prefix is greedy: a dashless `ABC129` splits as `ABC12` + `9`.
static CATALOG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9]+-?)(\d+)([A-Za-z]?)$").unwrap()
});

// ============================================================================
// Ranges
// ============================================================================

/// A range-form catalog input such as `KICA-0001~0003`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogRange {
    /// Alphanumeric prefix including any dashes (`KICA-`).
    pub prefix: String,
    /// START digits exactly as written, leading zeros included.
    pub start: String,
    /// END digits as written. Informational only.
    pub end: String,
    /// Optional trailing disc letter (empty when absent).
    pub letter: String,
}

impl CatalogRange {
    /// The single catalog number that is actually looked up.
    pub fn first(&self) -> String {
        format!("{}{}{}", self.prefix, self.start, self.letter)
    }

    /// Every member of the range, each padded to the START width.
    ///
    /// END may be abbreviated to its trailing digits (`7853~5`). A range whose
    /// END is below START yields only its first member.
    pub fn members(&self) -> Vec<String> {
        let width = self.start.len();
        let end_full = if self.end.len() < width {
            format!("{}{}", &self.start[..width - self.end.len()], self.end)
        } else {
            self.end.clone()
        };

        let (Ok(start), Ok(end)) = (self.start.parse::<u64>(), end_full.parse::<u64>()) else {
            return vec![self.first()];
        };
        if end < start {
            return vec![self.first()];
        }

        (start..=end)
            .map(|n| format!("{}{:0width$}{}", self.prefix, n, self.letter, width = width))
            .collect()
    }
}

/// Fold every tilde variant into [`RANGE_SEPARATOR`].
pub fn unify_separators(input: &str) -> String {
    input.replace(RANGE_SEPARATOR_VARIANTS, "~")
}

/// Parse a range expression. Returns `None` unless the whole (trimmed) input matches.
pub fn parse_range(input: &str) -> Option<CatalogRange> {
    let unified = unify_separators(input.trim());
    let caps = RANGE_RE.captures(&unified)?;
    Some(CatalogRange {
        prefix: format!("{}{}", &caps[1], &caps[2]),
        start: caps[3].to_string(),
        end: caps[4].to_string(),
        letter: caps[5].to_string(),
    })
}

pub fn is_catalog_range(input: &str) -> bool {
    parse_range(input).is_some()
}

/// Reduce a range input to its first catalog number; anything else passes through.
///
/// END is never checked against START.
pub fn first_of_range(input: &str) -> String {
    match parse_range(input) {
        Some(range) => range.first(),
        None => input.to_string(),
    }
}

/// Expand one entry of a compacted list back into its members.
/// Entries that are not ranges come back as a single element.
pub fn expand(entry: &str) -> Vec<String> {
    match parse_range(entry) {
        Some(range) => range.members(),
        None => vec![entry.trim().to_string()],
    }
}

// ============================================================================
// Compaction
// ============================================================================

#[derive(Debug)]
struct ParsedCatalog {
    raw: String,
    num: u64,
}

/// Group key: identical prefix, numeric width and trailing letter.
type GroupKey = (String, usize, String);

/// Length in bytes of the longest common prefix (inputs are ASCII digits).
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.bytes().zip(b.bytes()).take_while(|(x, y)| x == y).count()
}

fn emit_run(key: &GroupKey, items: &[ParsedCatalog], start: u64, end: u64, out: &mut Vec<String>) {
    let (prefix, width, letter) = key;

    if start == end {
        // Single member: echo the raw string rather than re-formatting it
        if let Some(item) = items.iter().find(|item| item.num == start) {
            out.push(item.raw.clone());
        }
        return;
    }

    let s = format!("{:0width$}", start, width = *width);
    let e = format!("{:0width$}", end, width = *width);
    let k = common_prefix_len(&s, &e);
    out.push(format!(
        "{}{}{}{}{}{}",
        prefix,
        &s[..k],
        &s[k..],
        RANGE_SEPARATOR,
        &e[k..],
        letter
    ));
}

/// Compact a list of catalog numbers into ranged notation.
///
/// `["SVWC-7853", "SVWC-7854", "SVWC-7855"]` becomes `"SVWC-7853~5"`.
///
/// - only numerically contiguous members of the same (prefix, width, letter)
///   group are merged;
/// - groups are emitted in ascending key order;
/// - strings that do not parse are appended verbatim, in first-seen order;
/// - an empty list yields `None`.
pub fn compact<S: AsRef<str>>(catalog_numbers: &[S]) -> Option<String> {
    if catalog_numbers.is_empty() {
        return None;
    }

    let mut groups: BTreeMap<GroupKey, Vec<ParsedCatalog>> = BTreeMap::new();
    let mut leftovers: Vec<String> = Vec::new();

    for code in catalog_numbers {
        let code = code.as_ref().trim();
        let Some(caps) = CATALOG_RE.captures(code) else {
            leftovers.push(code.to_string());
            continue;
        };
        let digits = &caps[2];
        let Ok(num) = digits.parse::<u64>() else {
            leftovers.push(code.to_string());
            continue;
        };
        let key = (caps[1].to_string(), digits.len(), caps[3].to_string());
        groups.entry(key).or_default().push(ParsedCatalog {
            raw: code.to_string(),
            num,
        });
    }

    let mut chunks: Vec<String> = Vec::new();

    for (key, mut items) in groups {
        // Stable: equal numbers keep their input order
        items.sort_by_key(|item| item.num);

        let mut start = items[0].num;
        let mut prev = start;
        for item in &items[1..] {
            if prev.checked_add(1) != Some(item.num) {
                emit_run(&key, &items, start, prev, &mut chunks);
                start = item.num;
            }
            prev = item.num;
        }
        emit_run(&key, &items, start, prev, &mut chunks);
    }

    chunks.extend(leftovers);
    Some(chunks.join(", "))
}

// ============================================================================
// TESTS
// ============================================================================
