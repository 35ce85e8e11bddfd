//! Release ranking.
//!
//! A catalog number can be attached to several releases (reissues, other
//! territories, bootlegs). Each candidate gets an integer score and the
//! highest one wins:
//! - released in the target country
//! - official status
//! - earlier release year

use crate::models::ReleaseCandidate;

/// MusicBrainz `release_status.id` for "Official"
pub const OFFICIAL_STATUS_ID: i64 = 1;

pub const TARGET_COUNTRY_BONUS: i64 = 10;
pub const OFFICIAL_BONUS: i64 = 5;

/// Year against which release dates are scored; earlier is better.
const YEAR_CEILING: i64 = 3000;

/// Score a candidate (higher is better).
///
/// A 1990 release scores 1010 from its date alone; undated releases get no date bonus.
pub fn rank_release(candidate: &ReleaseCandidate) -> i64 {
    let mut score = 0;

    if candidate.is_target_country {
        score += TARGET_COUNTRY_BONUS;
    }

    if candidate.status == Some(OFFICIAL_STATUS_ID) {
        score += OFFICIAL_BONUS;
    }

    if let Some(date) = candidate.release_date {
        score += (YEAR_CEILING - i64::from(date.year)).max(0);
    }

    score
}

/// Pick the best candidate.
///
/// Candidates are stable-sorted by score, descending, so equal scores keep
/// their query order and the first one wins. `None` for an empty set.
pub fn select_best(mut candidates: Vec<ReleaseCandidate>) -> Option<ReleaseCandidate> {
    // sort_by_key is stable
    candidates.sort_by_key(|c| std::cmp::Reverse(rank_release(c)));
    candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReleaseDate;

    fn candidate(id: i64, jp: bool, status: Option<i64>, year: Option<i32>) -> ReleaseCandidate {
        ReleaseCandidate {
            catalog_number: "PCCG-01965".to_string(),
            release_id: id,
            release_title: format!("Release {}", id),
            is_target_country: jp,
            status,
            release_date: year.map(|year| ReleaseDate {
                year,
                month: None,
                day: None,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_rank_release_components() {
        let jp = candidate(1, true, Some(OFFICIAL_STATUS_ID), Some(1990));
        let foreign = candidate(2, false, Some(OFFICIAL_STATUS_ID), Some(1990));
        let undated = candidate(3, false, Some(OFFICIAL_STATUS_ID), None);

        assert_eq!(rank_release(&jp), 1025);
        assert_eq!(rank_release(&foreign), 1015);
        assert_eq!(rank_release(&undated), 5);
    }

    #[test]
    fn test_rank_release_year_bonus_floor() {
        assert_eq!(rank_release(&candidate(1, false, None, Some(2999))), 1);
        assert_eq!(rank_release(&candidate(1, false, None, Some(3000))), 0);
        assert_eq!(rank_release(&candidate(1, false, None, Some(3500))), 0);
        // Bootleg status earns nothing
        assert_eq!(rank_release(&candidate(1, false, Some(3), None)), 0);
    }

    #[test]
    fn test_select_best_prefers_higher_score() {
        let picked = select_best(vec![
            candidate(1, false, Some(OFFICIAL_STATUS_ID), None),
            candidate(2, false, Some(OFFICIAL_STATUS_ID), Some(1990)),
            candidate(3, true, Some(OFFICIAL_STATUS_ID), Some(1990)),
        ])
        .unwrap();
        assert_eq!(picked.release_id, 3);
    }

    #[test]
    fn test_select_best_ties_keep_query_order() {
        let picked = select_best(vec![
            candidate(7, true, None, Some(2005)),
            candidate(4, true, None, Some(2005)),
            candidate(9, true, None, Some(2005)),
        ])
        .unwrap();
        assert_eq!(picked.release_id, 7);
    }

    #[test]
    fn test_select_best_empty() {
        assert!(select_best(Vec::new()).is_none());
    }

    #[test]
    fn test_select_best_is_idempotent() {
        let sets = vec![
            vec![
                candidate(1, false, None, Some(2010)),
                candidate(2, true, Some(OFFICIAL_STATUS_ID), Some(2011)),
            ],
            vec![candidate(5, false, None, None)],
            vec![
                candidate(8, true, None, None),
                candidate(6, true, None, None),
            ],
        ];
        for set in sets {
            let best = select_best(set).unwrap();
            let again = select_best(vec![best.clone()]).unwrap();
            assert_eq!(best, again);
        }
    }
}
