//! Assembly of the normalized output record.

use chrono::Utc;

use crate::catalog;
use crate::models::{
    CoverImage, Identifiers, Images, LookupResult, Mbids, NormalizedRecord, SourceInfo, TitleInfo,
    TrackInfo,
};
use crate::normalize::{self, Normalizer};

pub const SOURCE_SITE: &str = "musicbrainz";

/// Current UTC time, second precision, with a literal `Z`.
pub fn collected_at() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Build the output record for the selected release.
pub fn assemble(result: &LookupResult, normalizer: &Normalizer) -> NormalizedRecord {
    let best = &result.best;

    let images = Images {
        cover: result.cover.as_ref().map(|cover| {
            let ext = normalize::ext_from_suffix(cover.file_suffix.as_deref());
            CoverImage {
                id: cover.id,
                is_front: cover.is_front,
                mime: cover.mime_type.clone(),
                bytes: cover.filesize,
                urls: normalize::cover_urls(
                    best.release_gid.as_deref().unwrap_or_default(),
                    cover.id,
                    &ext,
                ),
            }
        }),
    };

    let date = best
        .release_date
        .and_then(|d| normalize::normalize_date(Some(d.year), d.month, d.day))
        .unwrap_or_default();

    NormalizedRecord {
        source: SourceInfo {
            site: SOURCE_SITE.to_string(),
            collected_at: collected_at(),
        },
        identifiers: Identifiers {
            catalog_number: best.catalog_number.clone(),
            catalog_numbers: best.catalog_numbers.clone(),
            catalog_number_compact_db: catalog::compact(&best.catalog_numbers),
            catalog_number_compact_in: None,
            barcode: best.barcode.clone(),
            mbids: Mbids {
                release: best.release_gid.clone(),
                release_group: best.rg_gid.clone(),
                label: best.label_gid.clone(),
            },
        },
        title: TitleInfo {
            product_name: best.release_title.clone(),
            edition_name: normalize::edition_name(best.edition_note.as_deref()),
        },
        artist_credit: result.artists.iter().map(|a| a.display_name.clone()).collect(),
        artist_display: normalize::artist_display(&result.artists),
        label: normalizer.canonical_label(best.label_name.as_deref().unwrap_or("")),
        date,
        // No release_country -> ISO code join yet
        country: None,
        format: normalizer.format_display(best.medium_formats.as_deref()),
        tracks: result
            .tracks
            .iter()
            .map(|t| TrackInfo {
                disc: t.disc_no,
                no: t.track_no,
                title: t.title.clone(),
                length: normalize::format_duration(t.length_ms),
                length_ms: t.length_ms,
            })
            .collect(),
        images,
    }
}

impl NormalizedRecord {
    /// Remember a range-form input exactly as typed. Other inputs are ignored.
    pub fn with_compact_input(mut self, raw_input: &str) -> Self {
        if catalog::is_catalog_range(raw_input) {
            self.identifiers.catalog_number_compact_in = Some(raw_input.to_string());
        }
        self
    }
}
