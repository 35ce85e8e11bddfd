//! Field normalization for release records.
//!
//! Pure functions from raw database values to the display fields of the
//! output record. The table-driven ones (formats, labels) hang off
//! [`Normalizer`], which borrows the immutable [`MappingTables`].

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;

use crate::config::MappingTables;
use crate::models::{ArtistCredit, CoverUrls};

// ============================================================================
// Constants
// ============================================================================

/// Format display for releases without any medium information
pub const UNKNOWN_FORMAT: &str = "Unknown";

/// Edition name used when the release has no comment ("standard edition")
pub const STANDARD_EDITION: &str = "通常盤";

/// Cover Art Archive image root; images are addressed by release MBID and image id
pub const COVER_ART_BASE: &str = "https://coverartarchive.org/release";

pub const DEFAULT_IMAGE_EXT: &str = "jpg";

// ============================================================================
// Patterns
// ============================================================================

/// Leading repeat count on a format token: "2Blu-ray", "2xBlu-ray"
static FORMAT_COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)x?(.*)$").unwrap());

/// Separators in an aggregated format string: "2CD+DVD", "CD, DVD"
static FORMAT_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[+,]").unwrap());

// ============================================================================
// Table-driven normalization
// ============================================================================

pub struct Normalizer<'a> {
    tables: &'a MappingTables,
}

impl<'a> Normalizer<'a> {
    pub fn new(tables: &'a MappingTables) -> Self {
        Self { tables }
    }

    /// Map one format token to its short name, keeping any repeat count.
    ///
    /// Unknown names fall back to a substring check: anything mentioning
    /// "blu"/"bd" is BD, "dvd" is DVD, everything else is left as is.
    pub fn map_format(&self, token: &str) -> String {
        let name = token.trim();
        let (count, core) = match FORMAT_COUNT.captures(name) {
            Some(caps) => (
                Some(caps.get(1).map_or("", |m| m.as_str())),
                caps.get(2).map_or("", |m| m.as_str()).trim(),
            ),
            None => (None, name),
        };

        let mapped = match self.tables.format_map.get(core).filter(|v| !v.is_empty()) {
            Some(short) => short.clone(),
            None => {
                let lower = core.to_lowercase();
                if lower.contains("blu") || lower.contains("bd") {
                    "BD".to_string()
                } else if lower.contains("dvd") {
                    "DVD".to_string()
                } else {
                    core.to_string()
                }
            }
        };

        match count {
            Some(count) => format!("{}{}", count, mapped),
            None => mapped,
        }
    }

    /// Display string for an aggregated format like "2Blu-ray+CD".
    ///
    /// Tokens are mapped one by one and duplicates collapse onto their first
    /// occurrence. Empty input gives [`UNKNOWN_FORMAT`].
    pub fn format_display(&self, raw: Option<&str>) -> String {
        let raw = raw.unwrap_or("");
        if raw.is_empty() {
            return UNKNOWN_FORMAT.to_string();
        }

        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut parts: Vec<String> = Vec::new();
        for token in FORMAT_SEPARATOR.split(raw).map(str::trim).filter(|t| !t.is_empty()) {
            let mapped = self.map_format(token);
            if seen.insert(mapped.clone()) {
                parts.push(mapped);
            }
        }
        parts.join("+")
    }

    /// Canonical label name. The first table entry whose key or alias list
    /// matches exactly wins; unknown labels pass through.
    pub fn canonical_label(&self, raw: &str) -> String {
        self.tables
            .label_alias
            .iter()
            .find(|(canonical, aliases)| *canonical == raw || aliases.iter().any(|a| a == raw))
            .map(|(canonical, _)| canonical.clone())
            .unwrap_or_else(|| raw.to_string())
    }
}

// ============================================================================
// Plain field helpers
// ============================================================================

/// Edition name from the release comment, defaulting to [`STANDARD_EDITION`].
pub fn edition_name(note: Option<&str>) -> String {
    match note.map(str::trim) {
        Some(note) if !note.is_empty() => note.to_string(),
        _ => STANDARD_EDITION.to_string(),
    }
}

/// `YYYY-MM-DD`, with month and day defaulting to 1. No year, no date.
pub fn normalize_date(year: Option<i32>, month: Option<u32>, day: Option<u32>) -> Option<String> {
    let year = year.filter(|y| *y != 0)?;
    let month = month.filter(|m| *m != 0).unwrap_or(1);
    let day = day.filter(|d| *d != 0).unwrap_or(1);
    Some(format!("{:04}-{:02}-{:02}", year, month, day))
}

/// Credited names glued together with their join phrases, e.g. "A feat. B".
pub fn artist_display(credits: &[ArtistCredit]) -> Option<String> {
    if credits.is_empty() {
        return None;
    }
    Some(
        credits
            .iter()
            .map(|a| format!("{}{}", a.display_name, a.join_phrase.as_deref().unwrap_or("")))
            .collect(),
    )
}

/// Milliseconds as `M:SS`. Sub-second remainders are truncated.
pub fn format_duration(ms: Option<i64>) -> Option<String> {
    let secs = ms?.div_euclid(1000);
    Some(format!("{}:{:02}", secs.div_euclid(60), secs.rem_euclid(60)))
}

/// File extension for a cover image: lowercase, no dot, `jpg` when unknown.
pub fn ext_from_suffix(suffix: Option<&str>) -> String {
    suffix
        .unwrap_or(DEFAULT_IMAGE_EXT)
        .trim_start_matches('.')
        .to_lowercase()
}

/// Full-size and thumbnail URLs for one archived image.
pub fn cover_urls(release_gid: &str, image_id: i64, ext: &str) -> CoverUrls {
    let base = format!("{}/{}/{}", COVER_ART_BASE, release_gid, image_id);
    CoverUrls {
        full: format!("{}.{}", base, ext),
        thumb_250: format!("{}-250.{}", base, ext),
        thumb_500: format!("{}-500.{}", base, ext),
        thumb_1200: format!("{}-1200.{}", base, ext),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FormatMappingTable, LabelAliasTable};

    fn tables() -> MappingTables {
        let mut format_map = FormatMappingTable::default();
        format_map.insert("Blu-ray".to_string(), "BD".to_string());
        format_map.insert("DVD-Video".to_string(), "DVD".to_string());
        format_map.insert("Blu-spec CD2".to_string(), "Blu-spec CD2".to_string());

        let mut label_alias = LabelAliasTable::new();
        label_alias.insert("Lantis".to_string(), vec!["ランティス".to_string()]);
        label_alias.insert("KING RECORDS".to_string(), vec!["King Records".to_string()]);
        label_alias.insert("Shared".to_string(), vec!["Lantis".to_string()]);

        MappingTables {
            label_alias,
            format_map,
        }
    }

    #[test]
    fn test_format_display_keeps_repeat_count() {
        let tables = tables();
        let n = Normalizer::new(&tables);
        assert_eq!(n.format_display(Some("2Blu-ray+CD")), "2BD+CD");
        assert_eq!(n.format_display(Some("2xBlu-ray")), "2BD");
    }

    #[test]
    fn test_format_display_heuristic_fallback() {
        let tables = tables();
        let n = Normalizer::new(&tables);
        assert_eq!(n.map_format("Blu-ray Disc Audio"), "BD");
        assert_eq!(n.map_format("HD DVD"), "DVD");
        assert_eq!(n.map_format("Vinyl"), "Vinyl");
        // Table wins over the substring heuristic
        assert_eq!(n.map_format("Blu-spec CD2"), "Blu-spec CD2");
    }

    #[test]
    fn test_format_display_dedupes_after_mapping() {
        let tables = tables();
        let n = Normalizer::new(&tables);
        assert_eq!(n.format_display(Some("CD+DVD-Video, DVD")), "CD+DVD");
        assert_eq!(n.format_display(Some("CD++CD")), "CD");
    }

    #[test]
    fn test_format_display_empty_is_unknown() {
        let tables = tables();
        let n = Normalizer::new(&tables);
        assert_eq!(n.format_display(None), UNKNOWN_FORMAT);
        assert_eq!(n.format_display(Some("")), UNKNOWN_FORMAT);
    }

    #[test]
    fn test_canonical_label() {
        let tables = tables();
        let n = Normalizer::new(&tables);
        assert_eq!(n.canonical_label("ランティス"), "Lantis");
        assert_eq!(n.canonical_label("King Records"), "KING RECORDS");
        // Canonical key matches before a later entry's alias
        assert_eq!(n.canonical_label("Lantis"), "Lantis");
        assert_eq!(n.canonical_label("Unknown Label"), "Unknown Label");
        assert_eq!(n.canonical_label(""), "");
    }

    #[test]
    fn test_edition_name() {
        assert_eq!(edition_name(Some("初回限定盤")), "初回限定盤");
        assert_eq!(edition_name(Some("  ")), STANDARD_EDITION);
        assert_eq!(edition_name(None), STANDARD_EDITION);
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date(Some(2019), Some(3), Some(27)).as_deref(), Some("2019-03-27"));
        assert_eq!(normalize_date(Some(2019), None, None).as_deref(), Some("2019-01-01"));
        assert_eq!(normalize_date(Some(987), Some(11), None).as_deref(), Some("0987-11-01"));
        assert_eq!(normalize_date(None, Some(3), Some(27)), None);
    }

    #[test]
    fn test_artist_display() {
        let credits = vec![
            ArtistCredit {
                position: 0,
                display_name: "澤野弘之".to_string(),
                join_phrase: Some(" feat. ".to_string()),
            },
            ArtistCredit {
                position: 1,
                display_name: "mpi".to_string(),
                join_phrase: None,
            },
        ];
        assert_eq!(artist_display(&credits).as_deref(), Some("澤野弘之 feat. mpi"));
        assert_eq!(artist_display(&[]), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Some(120_000)).as_deref(), Some("2:00"));
        assert_eq!(format_duration(Some(65_499)).as_deref(), Some("1:05"));
        assert_eq!(format_duration(Some(999)).as_deref(), Some("0:00"));
        assert_eq!(format_duration(Some(3_723_000)).as_deref(), Some("62:03"));
        assert_eq!(format_duration(None), None);
    }

    #[test]
    fn test_cover_urls() {
        assert_eq!(ext_from_suffix(Some(".PNG")), "png");
        assert_eq!(ext_from_suffix(None), "jpg");

        let urls = cover_urls("b1a9c0e9-d987-4042-ae91-78d6a3267d69", 12345, "jpg");
        let base = "https://coverartarchive.org/release/b1a9c0e9-d987-4042-ae91-78d6a3267d69/12345";
        assert_eq!(urls.full, format!("{base}.jpg"));
        assert_eq!(urls.thumb_250, format!("{base}-250.jpg"));
        assert_eq!(urls.thumb_500, format!("{base}-500.jpg"));
        assert_eq!(urls.thumb_1200, format!("{base}-1200.jpg"));
    }
}
