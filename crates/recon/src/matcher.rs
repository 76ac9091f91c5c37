//! Multi-pass matching orchestrator.
//!
//! Passes run strictly in sequence over leftovers; a record claimed by an
//! earlier pass is never a candidate again. Pass 1 scans pairwise
//! (worst-case O(n·m), pruned hard by the service+direction prefilter);
//! passes 2 and 4 bucket both sides first, so candidate work is bounded by
//! bucket size instead of the whole opposite collection.
//!
//! Passes 1–2 compare the strict normalized tuples. The three relaxed
//! passes bucket and classify on [`NormalizedTrip::relaxed`] views, which
//! is what lets "026" meet "26" late without loosening the exact passes.

use std::collections::BTreeMap;

use crate::claim::ClaimTracker;
use crate::classify::{classify, Agreement};
use crate::config::ToleranceConfig;
use crate::model::{MatchPass, NormalizedTrip};

/// One matched pair, by input index, with its classification evidence.
#[derive(Debug, Clone)]
pub struct PairHit {
    pub avl: usize,
    pub roster: usize,
    pub agreement: Agreement,
    pub minute_delta: Option<i64>,
    pub pass: MatchPass,
}

/// Run all matching passes. Orphan emission is the caller's job: anything
/// left unclaimed in `claims` afterwards has no counterpart.
pub fn run_passes(
    avl: &[NormalizedTrip],
    roster: &[NormalizedTrip],
    tolerance: &ToleranceConfig,
    claims: &mut ClaimTracker,
) -> Vec<PairHit> {
    let mut hits = Vec::new();

    // An empty side short-circuits the whole run: zero comparisons,
    // everything on the other side orphans.
    if avl.is_empty() || roster.is_empty() {
        return hits;
    }

    pass_exact_first_fit(avl, roster, claims, &mut hits);
    pass_nearest_time(avl, roster, BucketKey::LineServiceDirection, None, MatchPass::KeyedNearestTime, claims, &mut hits);

    let avl_relaxed: Vec<NormalizedTrip> = avl.iter().map(NormalizedTrip::relaxed).collect();
    let roster_relaxed: Vec<NormalizedTrip> = roster.iter().map(NormalizedTrip::relaxed).collect();

    pass_nearest_time(
        &avl_relaxed,
        &roster_relaxed,
        BucketKey::LineService,
        Some(tolerance.window_line_service_min),
        MatchPass::RelaxedLineService,
        claims,
        &mut hits,
    );
    pass_nearest_time(
        &avl_relaxed,
        &roster_relaxed,
        BucketKey::LineDirection,
        Some(tolerance.window_line_direction_min),
        MatchPass::RelaxedLineDirection,
        claims,
        &mut hits,
    );
    pass_nearest_time(
        &avl_relaxed,
        &roster_relaxed,
        BucketKey::LineOnly,
        Some(tolerance.window_line_min),
        MatchPass::RelaxedLine,
        claims,
        &mut hits,
    );

    hits
}

fn minute_delta(a: &NormalizedTrip, b: &NormalizedTrip) -> Option<i64> {
    Some((a.minutes()? - b.minutes()?).unsigned_abs() as i64)
}

/// Pass 1: per AVL record, first unclaimed roster record with equal service
/// and direction whose full classification is ALL_EQUAL. Greedy and
/// order-dependent on purpose.
fn pass_exact_first_fit(
    avl: &[NormalizedTrip],
    roster: &[NormalizedTrip],
    claims: &mut ClaimTracker,
    hits: &mut Vec<PairHit>,
) {
    for (i, a) in avl.iter().enumerate() {
        if claims.avl_claimed(i) {
            continue;
        }
        for (j, b) in roster.iter().enumerate() {
            if claims.roster_claimed(j) {
                continue;
            }
            if a.service != b.service || a.direction != b.direction {
                continue;
            }
            if classify(a, b) == Agreement::AllEqual {
                claims.claim(i, j);
                hits.push(PairHit {
                    avl: i,
                    roster: j,
                    agreement: Agreement::AllEqual,
                    minute_delta: minute_delta(a, b),
                    pass: MatchPass::ExactFirstFit,
                });
                break;
            }
        }
    }
}

/// Composite key shape for the bucketed passes.
#[derive(Debug, Clone, Copy)]
enum BucketKey {
    LineServiceDirection,
    LineService,
    LineDirection,
    LineOnly,
}

impl BucketKey {
    fn of(self, t: &NormalizedTrip) -> (String, String, String) {
        match self {
            Self::LineServiceDirection => {
                (t.line.clone(), t.service.clone(), t.direction.clone())
            }
            Self::LineService => (t.line.clone(), t.service.clone(), String::new()),
            Self::LineDirection => (t.line.clone(), t.direction.clone(), String::new()),
            Self::LineOnly => (t.line.clone(), String::new(), String::new()),
        }
    }
}

/// Bucketed nearest-time pass (pass 2 and the three relaxed sub-passes).
///
/// Both sides are grouped by `key`; within each bucket, comparable pairs are
/// taken nearest-first, so a contended roster record goes to the closest AVL
/// record rather than to whichever happens to iterate first. Ties break on
/// encounter order. `window_min` of None means any finite difference
/// qualifies; unparseable clocks are incomparable and never candidates.
fn pass_nearest_time(
    avl: &[NormalizedTrip],
    roster: &[NormalizedTrip],
    key: BucketKey,
    window_min: Option<i64>,
    pass: MatchPass,
    claims: &mut ClaimTracker,
    hits: &mut Vec<PairHit>,
) {
    // BTreeMap keeps bucket processing order deterministic.
    let mut buckets: BTreeMap<(String, String, String), (Vec<usize>, Vec<usize>)> =
        BTreeMap::new();
    for (i, a) in avl.iter().enumerate() {
        if !claims.avl_claimed(i) && a.minutes().is_some() {
            buckets.entry(key.of(a)).or_default().0.push(i);
        }
    }
    for (j, b) in roster.iter().enumerate() {
        if !claims.roster_claimed(j) && b.minutes().is_some() {
            buckets.entry(key.of(b)).or_default().1.push(j);
        }
    }

    for (_, (avl_idxs, roster_idxs)) in buckets {
        if avl_idxs.is_empty() || roster_idxs.is_empty() {
            continue;
        }

        let mut edges: Vec<(i64, usize, usize)> = Vec::new();
        for &i in &avl_idxs {
            for &j in &roster_idxs {
                // minutes() is Some for every bucketed record
                let Some(delta) = minute_delta(&avl[i], &roster[j]) else {
                    continue;
                };
                if window_min.is_some_and(|w| delta > w) {
                    continue;
                }
                edges.push((delta, i, j));
            }
        }
        edges.sort_unstable();

        for (delta, i, j) in edges {
            if claims.avl_claimed(i) || claims.roster_claimed(j) {
                continue;
            }
            claims.claim(i, j);
            hits.push(PairHit {
                avl: i,
                roster: j,
                agreement: classify(&avl[i], &roster[j]),
                minute_delta: Some(delta),
                pass,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip(line: &str, direction: &str, service: &str, time: &str) -> NormalizedTrip {
        NormalizedTrip {
            line: line.into(),
            direction: direction.into(),
            service: service.into(),
            time: time.into(),
        }
    }

    fn run(avl: &[NormalizedTrip], roster: &[NormalizedTrip]) -> (Vec<PairHit>, ClaimTracker) {
        let mut claims = ClaimTracker::new(avl.len(), roster.len());
        let hits = run_passes(avl, roster, &ToleranceConfig::default(), &mut claims);
        (hits, claims)
    }

    #[test]
    fn exact_pass_wins_over_closer_lower_agreement() {
        let avl = vec![trip("67", "IDA", "3", "15:40")];
        let roster = vec![
            // Equal time but wrong direction: must not steal the match.
            trip("67", "VOLTA", "3", "15:40"),
            trip("67", "IDA", "3", "15:40"),
        ];
        let (hits, _) = run(&avl, &roster);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].pass, MatchPass::ExactFirstFit);
        assert_eq!(hits[0].roster, 1);
        assert_eq!(hits[0].agreement, Agreement::AllEqual);
    }

    #[test]
    fn keyed_pass_gives_contended_record_to_nearest() {
        // Two AVL records, one roster record in the same strict bucket:
        // the 5-minute-away AVL record wins even though it iterates second.
        let avl = vec![
            trip("100", "IDA", "1", "10:40"), // 40 min away
            trip("100", "IDA", "1", "10:05"), // 5 min away
        ];
        let roster = vec![trip("100", "IDA", "1", "10:00")];
        let (hits, claims) = run(&avl, &roster);

        let keyed: Vec<_> = hits
            .iter()
            .filter(|h| h.pass == MatchPass::KeyedNearestTime)
            .collect();
        assert_eq!(keyed.len(), 1);
        assert_eq!(keyed[0].avl, 1);
        assert_eq!(keyed[0].minute_delta, Some(5));
        // The 40-minute record has no remaining candidate anywhere.
        assert!(!claims.avl_claimed(0));
    }

    #[test]
    fn keyed_pass_has_no_window() {
        let avl = vec![trip("100", "IDA", "1", "04:00")];
        let roster = vec![trip("100", "IDA", "1", "23:00")];
        let (hits, _) = run(&avl, &roster);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].pass, MatchPass::KeyedNearestTime);
        assert_eq!(hits[0].minute_delta, Some(19 * 60));
    }

    #[test]
    fn keyed_pass_breaks_ties_by_encounter_order() {
        let avl = vec![trip("100", "IDA", "1", "10:00")];
        let roster = vec![
            trip("100", "IDA", "1", "10:10"),
            trip("100", "IDA", "1", "09:50"),
        ];
        let (hits, _) = run(&avl, &roster);
        assert_eq!(hits[0].roster, 0);
    }

    #[test]
    fn relaxed_passes_match_zero_padded_lines() {
        // Strict line "0067" vs "67" keeps passes 1-2 out; 4a pairs them and
        // classifies on the relaxed view.
        let avl = vec![trip("67", "IDA", "3", "15:40")];
        let roster = vec![trip("0067", "IDA", "03", "15:42")];
        let (hits, _) = run(&avl, &roster);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].pass, MatchPass::RelaxedLineService);
        assert_eq!(hits[0].agreement, Agreement::TimeOnlyDiffers);
        assert_eq!(hits[0].minute_delta, Some(2));
    }

    #[test]
    fn strict_passes_do_not_equate_zero_padded_lines() {
        // Same everything except the padded line, equal times: pass 1 cannot
        // take it (line differs strictly), pass 2 buckets differ, 4a pairs it.
        let avl = vec![trip("26", "IDA", "3", "10:00")];
        let roster = vec![trip("026", "IDA", "3", "10:00")];
        let (hits, _) = run(&avl, &roster);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].pass, MatchPass::RelaxedLineService);
        assert_eq!(hits[0].agreement, Agreement::AllEqual);
    }

    #[test]
    fn relaxed_windows_widen_per_pass() {
        let tolerance = ToleranceConfig::default();

        // Same line+service, 150 min apart: outside 4a's 120-minute window,
        // direction differs so 4b's bucket never forms; 4c takes it.
        let avl = vec![trip("10", "IDA", "5", "08:00")];
        let roster = vec![trip("10", "VOLTA", "5", "10:30")];
        let mut claims = ClaimTracker::new(1, 1);
        let hits = run_passes(&avl, &roster, &tolerance, &mut claims);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].pass, MatchPass::RelaxedLine);

        // 250 min apart: outside every window.
        let roster = vec![trip("10", "VOLTA", "5", "12:10")];
        let mut claims = ClaimTracker::new(1, 1);
        let hits = run_passes(&avl, &roster, &tolerance, &mut claims);
        assert!(hits.is_empty());
    }

    #[test]
    fn unparseable_clock_is_never_a_nearest_candidate() {
        let avl = vec![trip("10", "IDA", "5", "08:00")];
        let roster = vec![
            trip("10", "IDA", "5", "soon"), // incomparable, must be skipped
            trip("10", "IDA", "5", "09:00"),
        ];
        let (hits, _) = run(&avl, &roster);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].roster, 1);
    }

    #[test]
    fn empty_side_short_circuits() {
        let avl = vec![trip("10", "IDA", "5", "08:00")];
        let mut claims = ClaimTracker::new(1, 0);
        let hits = run_passes(&avl, &[], &ToleranceConfig::default(), &mut claims);
        assert!(hits.is_empty());
        assert!(!claims.avl_claimed(0));
    }

    #[test]
    fn identical_unparseable_clocks_still_pair_exactly() {
        // Equal strings satisfy ALL_EQUAL even when no delta can be computed.
        let avl = vec![trip("10", "IDA", "5", "")];
        let roster = vec![trip("10", "IDA", "5", "")];
        let (hits, _) = run(&avl, &roster);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].pass, MatchPass::ExactFirstFit);
        assert_eq!(hits[0].minute_delta, None);
    }

    #[test]
    fn claimed_records_never_rematch() {
        // One AVL record exact-matches roster 0; the second AVL record with
        // the same tuple must take roster 1, not re-claim roster 0.
        let avl = vec![
            trip("10", "IDA", "5", "08:00"),
            trip("10", "IDA", "5", "08:00"),
        ];
        let roster = vec![
            trip("10", "IDA", "5", "08:00"),
            trip("10", "IDA", "5", "08:30"),
        ];
        let (hits, claims) = run(&avl, &roster);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].roster, 0);
        assert_eq!(hits[1].roster, 1);
        assert_eq!(claims.unclaimed_avl().count(), 0);
        assert_eq!(claims.unclaimed_roster().count(), 0);
    }
}
