//! Release lookups against a MusicBrainz database.
//!
//! [`ReleaseSource`] is the seam between the lookup pipeline and storage.
//! [`SqliteReleaseSource`] reads a SQLite copy of the MusicBrainz tables
//! (`release_label`, `release`, `release_country`, `medium`, `track`,
//! `cover_art`, ...) with their upstream column names.

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;

use crate::error::Result;
use crate::models::{ArtistCredit, CoverArt, LookupResult, ReleaseCandidate, ReleaseDate, TrackRow};
use crate::scoring::select_best;

/// Country whose releases get the ranking bonus
pub const DEFAULT_TARGET_COUNTRY: &str = "JP";

// ============================================================================
// Source Trait
// ============================================================================

pub trait ReleaseSource {
    /// Every release carrying the catalog number, in query order.
    fn candidates(&self, catalog: &str) -> Result<Vec<ReleaseCandidate>>;

    /// Artist credit of a release, ordered by credit position.
    fn artist_credits(&self, release_id: i64) -> Result<Vec<ArtistCredit>>;

    /// Track list ordered by disc, then track position.
    fn tracks(&self, release_id: i64) -> Result<Vec<TrackRow>>;

    /// One cover image: front first, then archive ordering.
    fn front_cover(&self, release_id: i64) -> Result<Option<CoverArt>>;

    /// Fetch candidates, pick the best release and load its details.
    ///
    /// `Ok(None)` when nothing carries the catalog number.
    fn lookup(&self, catalog: &str, with_cover: bool) -> Result<Option<LookupResult>> {
        let Some(best) = select_best(self.candidates(catalog)?) else {
            return Ok(None);
        };

        let artists = self.artist_credits(best.release_id)?;
        let tracks = self.tracks(best.release_id)?;
        let cover = if with_cover {
            self.front_cover(best.release_id)?
        } else {
            None
        };

        Ok(Some(LookupResult {
            best,
            artists,
            tracks,
            cover,
        }))
    }
}

// ============================================================================
// SQLite Source
// ============================================================================

const SQL_CANDIDATES: &str = "
SELECT
  rl.catalog_number,
  r.id, r.gid, r.name,
  rg.id, rg.gid, rg.name,
  l.id, l.gid, l.name,
  r.barcode,
  r.status, rs.name,
  r.packaging, rp.name,
  r.comment,
  EXISTS (
    SELECT 1
    FROM release_country rc
    JOIN iso_3166_1 i1 ON i1.area = rc.country
    WHERE rc.release = r.id AND i1.code = ?2
  ) AS is_target_country
FROM release_label rl
JOIN release r        ON r.id = rl.release
JOIN release_group rg ON rg.id = r.release_group
JOIN label l          ON l.id = rl.label
LEFT JOIN release_status    rs ON rs.id = r.status
LEFT JOIN release_packaging rp ON rp.id = r.packaging
WHERE rl.catalog_number LIKE ?1
ORDER BY rl.id";

/// Earliest dated release event; unknown month/day sort after known ones
const SQL_EARLIEST_DATE: &str = "
SELECT date_year, date_month, date_day
FROM release_country
WHERE release = ?1 AND date_year IS NOT NULL
ORDER BY date_year ASC,
         date_month IS NULL, date_month ASC,
         date_day IS NULL, date_day ASC
LIMIT 1";

const SQL_MEDIUM_FORMATS: &str = "
SELECT COALESCE(mf.name, 'Unknown') AS fmt, COUNT(*) AS cnt
FROM medium m
LEFT JOIN medium_format mf ON mf.id = m.format
WHERE m.release = ?1
GROUP BY fmt
ORDER BY fmt";

const SQL_CATALOG_NUMBERS: &str = "
SELECT DISTINCT catalog_number
FROM release_label
WHERE release = ?1 AND catalog_number IS NOT NULL
ORDER BY catalog_number";

const SQL_ARTIST: &str = "
SELECT acn.position, acn.join_phrase, COALESCE(acn.name, a.name) AS display_name
FROM release r
JOIN artist_credit ac       ON ac.id = r.artist_credit
JOIN artist_credit_name acn ON acn.artist_credit = ac.id
LEFT JOIN artist a          ON a.id = acn.artist
WHERE r.id = ?1
ORDER BY acn.position";

const SQL_TRACKS: &str = "
SELECT m.position, t.position, t.number, COALESCE(t.name, rec.name), rec.length
FROM medium m
JOIN track t ON t.medium = m.id
LEFT JOIN recording rec ON rec.id = t.recording
WHERE m.release = ?1
ORDER BY m.position, t.position";

const SQL_COVER_ONE: &str = "
SELECT
  ca.id,
  ca.mime_type,
  it.suffix,
  ca.filesize,
  EXISTS (
    SELECT 1
    FROM cover_art_type cat
    JOIN art_type at ON at.id = cat.type_id
    WHERE cat.id = ca.id AND at.name = 'Front'
  ) AS is_front
FROM cover_art ca
LEFT JOIN image_type it ON it.mime_type = ca.mime_type
WHERE ca.release = ?1
ORDER BY is_front DESC, ca.ordering ASC
LIMIT 1";

pub struct SqliteReleaseSource {
    conn: Connection,
    target_country: String,
}

impl SqliteReleaseSource {
    /// Open a database file read-only.
    pub fn open(path: &Path, target_country: &str) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self::from_connection(conn, target_country))
    }

    pub fn from_connection(conn: Connection, target_country: &str) -> Self {
        Self {
            conn,
            target_country: target_country.to_string(),
        }
    }

    fn earliest_date(&self, release_id: i64) -> Result<Option<ReleaseDate>> {
        let date = self
            .conn
            .query_row(SQL_EARLIEST_DATE, params![release_id], |row| {
                let month: Option<i64> = row.get(1)?;
                let day: Option<i64> = row.get(2)?;
                Ok(ReleaseDate {
                    year: row.get(0)?,
                    month: month.and_then(|m| u32::try_from(m).ok()),
                    day: day.and_then(|d| u32::try_from(d).ok()),
                })
            })
            .optional()?;
        Ok(date)
    }

    /// Formats as "<count><name>" joined by '+', e.g. "2CD+DVD-Video".
    fn medium_formats(&self, release_id: i64) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare_cached(SQL_MEDIUM_FORMATS)?;
        let parts = stmt
            .query_map(params![release_id], |row| {
                let fmt: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok(if count > 1 { format!("{}{}", count, fmt) } else { fmt })
            })?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(if parts.is_empty() {
            None
        } else {
            Some(parts.join("+"))
        })
    }

    fn catalog_numbers(&self, release_id: i64) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(SQL_CATALOG_NUMBERS)?;
        let numbers = stmt
            .query_map(params![release_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(numbers)
    }
}

impl ReleaseSource for SqliteReleaseSource {
    fn candidates(&self, catalog: &str) -> Result<Vec<ReleaseCandidate>> {
        let mut stmt = self.conn.prepare_cached(SQL_CANDIDATES)?;
        let mut candidates = stmt
            .query_map(params![catalog, self.target_country], |row| {
                Ok(ReleaseCandidate {
                    catalog_number: row.get(0)?,
                    release_id: row.get(1)?,
                    release_gid: row.get(2)?,
                    release_title: row.get(3)?,
                    rg_id: row.get(4)?,
                    rg_gid: row.get(5)?,
                    rg_title: row.get(6)?,
                    label_id: row.get(7)?,
                    label_gid: row.get(8)?,
                    label_name: row.get(9)?,
                    barcode: row.get(10)?,
                    status: row.get(11)?,
                    status_name: row.get(12)?,
                    packaging: row.get(13)?,
                    packaging_name: row.get(14)?,
                    edition_note: row.get(15)?,
                    is_target_country: row.get(16)?,
                    ..Default::default()
                })
            })?
            .collect::<rusqlite::Result<Vec<ReleaseCandidate>>>()?;

        for candidate in &mut candidates {
            candidate.release_date = self.earliest_date(candidate.release_id)?;
            candidate.medium_formats = self.medium_formats(candidate.release_id)?;
            candidate.catalog_numbers = self.catalog_numbers(candidate.release_id)?;
        }

        Ok(candidates)
    }

    fn artist_credits(&self, release_id: i64) -> Result<Vec<ArtistCredit>> {
        let mut stmt = self.conn.prepare_cached(SQL_ARTIST)?;
        let credits = stmt
            .query_map(params![release_id], |row| {
                let name: Option<String> = row.get(2)?;
                Ok(ArtistCredit {
                    position: row.get(0)?,
                    join_phrase: row.get(1)?,
                    display_name: name.unwrap_or_default(),
                })
            })?
            .collect::<rusqlite::Result<Vec<ArtistCredit>>>()?;
        Ok(credits)
    }

    fn tracks(&self, release_id: i64) -> Result<Vec<TrackRow>> {
        let mut stmt = self.conn.prepare_cached(SQL_TRACKS)?;
        let tracks = stmt
            .query_map(params![release_id], |row| {
                let title: Option<String> = row.get(3)?;
                Ok(TrackRow {
                    disc_no: row.get(0)?,
                    track_no: row.get(1)?,
                    track_label: row.get(2)?,
                    title: title.unwrap_or_default(),
                    length_ms: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<TrackRow>>>()?;
        Ok(tracks)
    }

    fn front_cover(&self, release_id: i64) -> Result<Option<CoverArt>> {
        let cover = self
            .conn
            .query_row(SQL_COVER_ONE, params![release_id], |row| {
                Ok(CoverArt {
                    id: row.get(0)?,
                    mime_type: row.get(1)?,
                    file_suffix: row.get(2)?,
                    filesize: row.get(3)?,
                    is_front: row.get(4)?,
                })
            })
            .optional()?;
        Ok(cover)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal slice of the MusicBrainz schema used by the queries above.
    pub(crate) const FIXTURE_SCHEMA: &str = "
        CREATE TABLE area (id INTEGER PRIMARY KEY, name TEXT);
        CREATE TABLE iso_3166_1 (area INTEGER, code TEXT);
        CREATE TABLE label (id INTEGER PRIMARY KEY, gid TEXT, name TEXT);
        CREATE TABLE release_group (id INTEGER PRIMARY KEY, gid TEXT, name TEXT);
        CREATE TABLE release_status (id INTEGER PRIMARY KEY, name TEXT);
        CREATE TABLE release_packaging (id INTEGER PRIMARY KEY, name TEXT);
        CREATE TABLE artist (id INTEGER PRIMARY KEY, name TEXT);
        CREATE TABLE artist_credit (id INTEGER PRIMARY KEY, name TEXT);
        CREATE TABLE artist_credit_name (artist_credit INTEGER, position INTEGER, artist INTEGER, name TEXT, join_phrase TEXT);
        CREATE TABLE release (
            id INTEGER PRIMARY KEY, gid TEXT, name TEXT, artist_credit INTEGER,
            release_group INTEGER, status INTEGER, packaging INTEGER, barcode TEXT, comment TEXT
        );
        CREATE TABLE release_label (id INTEGER PRIMARY KEY, release INTEGER, label INTEGER, catalog_number TEXT);
        CREATE TABLE release_country (release INTEGER, country INTEGER, date_year INTEGER, date_month INTEGER, date_day INTEGER);
        CREATE TABLE medium_format (id INTEGER PRIMARY KEY, name TEXT);
        CREATE TABLE medium (id INTEGER PRIMARY KEY, release INTEGER, position INTEGER, format INTEGER);
        CREATE TABLE recording (id INTEGER PRIMARY KEY, name TEXT, length INTEGER);
        CREATE TABLE track (id INTEGER PRIMARY KEY, medium INTEGER, position INTEGER, number TEXT, name TEXT, recording INTEGER);
        CREATE TABLE image_type (mime_type TEXT, suffix TEXT);
        CREATE TABLE art_type (id INTEGER PRIMARY KEY, name TEXT);
        CREATE TABLE cover_art (id INTEGER PRIMARY KEY, release INTEGER, mime_type TEXT, filesize INTEGER, ordering INTEGER);
        CREATE TABLE cover_art_type (id INTEGER, type_id INTEGER);

        INSERT INTO area VALUES (107, 'Japan'), (222, 'United States');
        INSERT INTO iso_3166_1 VALUES (107, 'JP'), (222, 'US');
        INSERT INTO label VALUES (1, 'label-gid-1', 'ランティス');
        INSERT INTO release_group VALUES (1, 'rg-gid-1', 'Sound Horizon Best');
        INSERT INTO release_status VALUES (1, 'Official'), (3, 'Bootleg');
        INSERT INTO release_packaging VALUES (1, 'Jewel Case');
        INSERT INTO artist VALUES (1, 'Revo'), (2, 'Sound Horizon');
        INSERT INTO artist_credit VALUES (1, 'Revo & Sound Horizon');
        INSERT INTO artist_credit_name VALUES (1, 1, 2, NULL, NULL), (1, 0, 1, 'Revo', ' & ');

        -- 10: US reissue, 11: JP original, 12: undated bootleg
        INSERT INTO release VALUES (10, 'rel-gid-10', 'Best (US)', 1, 1, 1, 1, '0000000000010', NULL);
        INSERT INTO release VALUES (11, 'rel-gid-11', 'Best', 1, 1, 1, 1, '4988000000011', '初回限定盤');
        INSERT INTO release VALUES (12, 'rel-gid-12', 'Best (bootleg)', 1, 1, 3, NULL, NULL, NULL);

        INSERT INTO release_label VALUES (1, 10, 1, 'PCCG-01965');
        INSERT INTO release_label VALUES (2, 11, 1, 'pccg-01965');
        INSERT INTO release_label VALUES (3, 11, 1, 'PCCG-01966');
        INSERT INTO release_label VALUES (4, 11, 1, 'PCCG-01967');
        INSERT INTO release_label VALUES (5, 12, 1, 'PCCG-01965');

        INSERT INTO release_country VALUES (10, 222, 2001, 5, NULL);
        INSERT INTO release_country VALUES (11, 107, 2001, NULL, NULL);
        INSERT INTO release_country VALUES (11, 222, 2001, 3, 14);

        INSERT INTO medium_format VALUES (1, 'CD'), (2, 'DVD-Video');
        INSERT INTO medium VALUES (100, 11, 1, 1), (101, 11, 2, 1), (102, 11, 3, 2), (103, 10, 1, NULL);
        INSERT INTO recording VALUES (1, 'Prologue', 120000), (2, 'Recording Name', NULL);
        INSERT INTO track VALUES (1, 101, 1, '1', 'Disc Two Opener', 1);
        INSERT INTO track VALUES (2, 100, 2, '2', NULL, 2);
        INSERT INTO track VALUES (3, 100, 1, '1', 'Prologue', 1);

        INSERT INTO image_type VALUES ('image/jpeg', 'jpg'), ('image/png', 'png');
        INSERT INTO art_type VALUES (1, 'Front'), (2, 'Back');
        INSERT INTO cover_art VALUES (500, 11, 'image/png', 2048, 1);
        INSERT INTO cover_art VALUES (501, 11, 'image/jpeg', 4096, 2);
        INSERT INTO cover_art_type VALUES (500, 2), (501, 1);
    ";

    pub(crate) fn fixture_source() -> SqliteReleaseSource {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(FIXTURE_SCHEMA).unwrap();
        SqliteReleaseSource::from_connection(conn, DEFAULT_TARGET_COUNTRY)
    }

    #[test]
    fn test_candidates_are_case_insensitive_and_enriched() {
        let source = fixture_source();
        let candidates = source.candidates("PCCG-01965").unwrap();
        let ids: Vec<i64> = candidates.iter().map(|c| c.release_id).collect();
        assert_eq!(ids, vec![10, 11, 12]);

        let jp = &candidates[1];
        assert_eq!(jp.catalog_number, "pccg-01965");
        assert!(jp.is_target_country);
        assert_eq!(jp.status_name.as_deref(), Some("Official"));
        assert_eq!(jp.packaging_name.as_deref(), Some("Jewel Case"));
        assert_eq!(jp.edition_note.as_deref(), Some("初回限定盤"));
        assert_eq!(
            jp.release_date,
            Some(ReleaseDate {
                year: 2001,
                month: Some(3),
                day: Some(14)
            })
        );
        assert_eq!(jp.medium_formats.as_deref(), Some("2CD+DVD-Video"));
        assert_eq!(
            jp.catalog_numbers,
            vec!["PCCG-01966", "PCCG-01967", "pccg-01965"]
        );

        assert!(!candidates[0].is_target_country);
        assert_eq!(candidates[0].medium_formats.as_deref(), Some("Unknown"));
        assert_eq!(candidates[2].release_date, None);
        assert_eq!(candidates[2].medium_formats, None);
    }

    #[test]
    fn test_lookup_picks_jp_release_with_details() {
        let source = fixture_source();
        let result = source.lookup("PCCG-01965", true).unwrap().unwrap();

        assert_eq!(result.best.release_id, 11);

        let names: Vec<&str> = result.artists.iter().map(|a| a.display_name.as_str()).collect();
        assert_eq!(names, vec!["Revo", "Sound Horizon"]);
        assert_eq!(result.artists[0].join_phrase.as_deref(), Some(" & "));

        let order: Vec<(i64, i64)> = result.tracks.iter().map(|t| (t.disc_no, t.track_no)).collect();
        assert_eq!(order, vec![(1, 1), (1, 2), (2, 1)]);
        assert_eq!(result.tracks[1].title, "Recording Name");
        assert_eq!(result.tracks[1].length_ms, None);

        let cover = result.cover.unwrap();
        assert_eq!(cover.id, 501);
        assert!(cover.is_front);
        assert_eq!(cover.file_suffix.as_deref(), Some("jpg"));
    }

    #[test]
    fn test_lookup_without_cover() {
        let source = fixture_source();
        let result = source.lookup("PCCG-01965", false).unwrap().unwrap();
        assert!(result.cover.is_none());
    }

    #[test]
    fn test_lookup_not_found() {
        let source = fixture_source();
        assert!(source.lookup("NOPE-0001", true).unwrap().is_none());
    }

    #[test]
    fn test_target_country_is_configurable() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(FIXTURE_SCHEMA).unwrap();
        let source = SqliteReleaseSource::from_connection(conn, "US");
        let candidates = source.candidates("PCCG-01965").unwrap();
        assert!(candidates[0].is_target_country);
        assert!(candidates[1].is_target_country);
        assert!(!candidates[2].is_target_country);
    }
}
