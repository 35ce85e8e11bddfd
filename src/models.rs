//! Core data models for catalog-number lookups.
//!
//! Raw rows coming out of the release source, the normalized output record
//! and the batch statistics all live here.

use serde::{Deserialize, Serialize};

// ============================================================================
// Source Rows
// ============================================================================

/// Earliest dated release event of a release. Month and day may be unknown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReleaseDate {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

/// One release row returned for a catalog-number query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReleaseCandidate {
    /// The catalog number on the label row that matched the query
    pub catalog_number: String,

    pub release_id: i64,
    pub release_gid: Option<String>,
    pub release_title: String,

    pub rg_id: i64,
    pub rg_gid: Option<String>,
    pub rg_title: Option<String>,

    pub label_id: Option<i64>,
    pub label_gid: Option<String>,
    pub label_name: Option<String>,

    pub barcode: Option<String>,
    pub status: Option<i64>,
    pub status_name: Option<String>,
    pub packaging: Option<i64>,
    pub packaging_name: Option<String>,

    /// Released in the target country (JP by default)
    pub is_target_country: bool,
    pub release_date: Option<ReleaseDate>,
    /// Release comment, used as the edition name
    pub edition_note: Option<String>,
    /// Aggregated medium formats, e.g. "2CD+DVD-Video"
    pub medium_formats: Option<String>,
    /// Every catalog number attached to the release
    pub catalog_numbers: Vec<String>,
}

/// One artist-credit entry, in credit position order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtistCredit {
    pub position: i64,
    pub display_name: String,
    pub join_phrase: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackRow {
    pub disc_no: i64,
    pub track_no: i64,
    /// Printed track number ("A1", "3"), informational
    pub track_label: Option<String>,
    pub title: String,
    pub length_ms: Option<i64>,
}

/// Best cover image for a release (front preferred).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoverArt {
    pub id: i64,
    pub mime_type: Option<String>,
    pub file_suffix: Option<String>,
    pub filesize: Option<i64>,
    pub is_front: bool,
}

/// Everything fetched for one catalog number after the best release was picked.
#[derive(Clone, Debug)]
pub struct LookupResult {
    pub best: ReleaseCandidate,
    pub artists: Vec<ArtistCredit>,
    pub tracks: Vec<TrackRow>,
    pub cover: Option<CoverArt>,
}

// ============================================================================
// Output Models
// ============================================================================

/// Canonical output document for one catalog number.
///
/// Field names and nesting are the on-disk format consumed by the sheet sync
/// and validated by the bundled schema. `country` is always null.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NormalizedRecord {
    pub source: SourceInfo,
    pub identifiers: Identifiers,
    pub title: TitleInfo,
    pub artist_credit: Vec<String>,
    pub artist_display: Option<String>,
    pub label: String,
    /// `YYYY-MM-DD`, or empty when no release date is known
    pub date: String,
    pub country: Option<String>,
    pub format: String,
    pub tracks: Vec<TrackInfo>,
    pub images: Images,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SourceInfo {
    pub site: String,
    pub collected_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Identifiers {
    pub catalog_number: String,
    pub catalog_numbers: Vec<String>,
    pub catalog_number_compact_db: Option<String>,
    /// The range expression exactly as the caller typed it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_number_compact_in: Option<String>,
    pub barcode: Option<String>,
    pub mbids: Mbids,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Mbids {
    pub release: Option<String>,
    pub release_group: Option<String>,
    pub label: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TitleInfo {
    pub product_name: String,
    pub edition_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrackInfo {
    pub disc: i64,
    pub no: i64,
    pub title: String,
    pub length: Option<String>,
    pub length_ms: Option<i64>,
}

/// Serializes as `{}` when no cover was requested or found.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Images {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<CoverImage>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CoverImage {
    pub id: i64,
    pub is_front: bool,
    pub mime: Option<String>,
    pub bytes: Option<i64>,
    pub urls: CoverUrls,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoverUrls {
    pub full: String,
    pub thumb_250: String,
    pub thumb_500: String,
    pub thumb_1200: String,
}

// ============================================================================
// Statistics
// ============================================================================

/// Per-run counters for batch lookups.
#[derive(Default, Debug, Clone, Serialize)]
pub struct BatchStats {
    pub total: usize,
    pub written: usize,
    pub not_found: usize,
    pub schema_rejected: usize,
    pub errors: usize,
    pub elapsed_seconds: f64,
}

impl BatchStats {
    /// Share of inputs that produced a record file, as a percentage
    pub fn hit_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * self.written as f64 / self.total as f64
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
