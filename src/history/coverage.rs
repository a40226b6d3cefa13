use chrono::{DateTime, Duration, Utc};

use crate::models::SyncRecord;

/// Half-open time range a caller wants covered. `None` bounds are open ends:
/// no `after` means "from the beginning of history", no `before` means "up to
/// the present".
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestedRange {
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
}

impl RequestedRange {
    pub fn until(before: DateTime<Utc>) -> Self {
        Self {
            after: None,
            before: Some(before),
        }
    }

    pub fn between(after: DateTime<Utc>, before: DateTime<Utc>) -> Self {
        Self {
            after: Some(after),
            before: Some(before),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageReason {
    /// No usable record at all.
    Missing,
    /// Record exists but its last refresh is older than the TTL.
    Stale,
    /// Fresh, but the request reaches earlier than the covered range.
    PartialOlder,
    /// Fresh, but the request reaches later than the covered range.
    PartialNewer,
    /// Fully covered; nothing to fetch.
    Covered,
}

impl CoverageReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageReason::Missing => "missing",
            CoverageReason::Stale => "stale",
            CoverageReason::PartialOlder => "partial_older",
            CoverageReason::PartialNewer => "partial_newer",
            CoverageReason::Covered => "none",
        }
    }
}

impl std::fmt::Display for CoverageReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What to do about a coverage gap: the reason, and the bounds of the fetch
/// that would close it. Both bounds `None` with a non-`Covered` reason means
/// an unbounded backfill.
#[derive(Debug, Clone, Copy)]
pub struct CoverageDecision {
    pub reason: CoverageReason,
    pub fetch_after: Option<DateTime<Utc>>,
    pub fetch_before: Option<DateTime<Utc>>,
}

impl CoverageDecision {
    pub fn needs_fetch(&self) -> bool {
        self.reason != CoverageReason::Covered
    }

    fn covered() -> Self {
        Self {
            reason: CoverageReason::Covered,
            fetch_after: None,
            fetch_before: None,
        }
    }
}

/// Decide whether cached history satisfies `requested`, and if not, what to
/// fetch. Pure function of its arguments — `now` is injected, never read from
/// the clock — so identical inputs always produce the identical decision.
///
/// Rules, first match wins:
/// 1. no record, or never refreshed -> `Missing`, fetch the requested range;
/// 2. refreshed longer than `ttl` ago -> `Stale`, refresh forward from the
///    last covered point;
/// 3. covered bounds unknown -> `Missing`;
/// 4. request reaches earlier than `synced_from` and history is not known
///    complete -> `PartialOlder`, fetch the older gap;
/// 5. request reaches later than `synced_to` -> `PartialNewer`, fetch the
///    newer gap;
/// 6. otherwise `Covered`.
pub fn check_coverage(
    record: Option<&SyncRecord>,
    requested: RequestedRange,
    ttl: Duration,
    now: DateTime<Utc>,
) -> CoverageDecision {
    let Some(record) = record else {
        return missing(requested);
    };
    let Some(synced_at) = record.synced_at else {
        return missing(requested);
    };

    if now - synced_at >= ttl {
        return CoverageDecision {
            reason: CoverageReason::Stale,
            fetch_after: record.synced_to.or(requested.after),
            fetch_before: requested.before,
        };
    }

    let (Some(synced_from), Some(synced_to)) = (record.synced_from, record.synced_to) else {
        return missing(requested);
    };

    let reaches_older = match requested.after {
        Some(after) => after < synced_from,
        // An open lower bound wants everything that ever happened.
        None => true,
    };
    if reaches_older && !record.has_complete_history {
        return CoverageDecision {
            reason: CoverageReason::PartialOlder,
            fetch_after: requested.after,
            fetch_before: Some(synced_from),
        };
    }

    // An open upper bound is satisfied by any fresh record; only an explicit
    // bound past the covered range forces a forward fetch.
    if let Some(before) = requested.before {
        if before > synced_to {
            return CoverageDecision {
                reason: CoverageReason::PartialNewer,
                fetch_after: Some(synced_to),
                fetch_before: Some(before),
            };
        }
    }

    CoverageDecision::covered()
}

fn missing(requested: RequestedRange) -> CoverageDecision {
    CoverageDecision {
        reason: CoverageReason::Missing,
        fetch_after: requested.after,
        fetch_before: requested.before,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(offset_mins: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + offset_mins * 60, 0).unwrap()
    }

    fn record(
        from_mins: i64,
        to_mins: i64,
        synced_at_mins: i64,
        complete: bool,
    ) -> SyncRecord {
        SyncRecord {
            scope: "market:m1".into(),
            synced_from: Some(at(from_mins)),
            synced_to: Some(at(to_mins)),
            synced_at: Some(at(synced_at_mins)),
            has_complete_history: complete,
        }
    }

    fn ttl() -> Duration {
        Duration::minutes(30)
    }

    #[test]
    fn test_no_record_is_missing() {
        let requested = RequestedRange::between(at(-600), at(0));
        let decision = check_coverage(None, requested, ttl(), at(0));
        assert_eq!(decision.reason, CoverageReason::Missing);
        assert!(decision.needs_fetch());
        assert_eq!(decision.fetch_after, Some(at(-600)));
        assert_eq!(decision.fetch_before, Some(at(0)));
    }

    #[test]
    fn test_never_refreshed_record_is_missing() {
        let rec = SyncRecord {
            scope: "market:m1".into(),
            synced_from: Some(at(-600)),
            synced_to: Some(at(-10)),
            synced_at: None,
            has_complete_history: false,
        };
        let decision = check_coverage(Some(&rec), RequestedRange::until(at(0)), ttl(), at(0));
        assert_eq!(decision.reason, CoverageReason::Missing);
    }

    #[test]
    fn test_unknown_bounds_are_missing() {
        let rec = SyncRecord {
            scope: "market:m1".into(),
            synced_from: None,
            synced_to: None,
            synced_at: Some(at(-5)),
            has_complete_history: false,
        };
        let decision = check_coverage(Some(&rec), RequestedRange::until(at(0)), ttl(), at(0));
        assert_eq!(decision.reason, CoverageReason::Missing);
    }

    #[test]
    fn test_stale_refreshes_forward_from_synced_to() {
        let rec = record(-600, -40, -45, true);
        let requested = RequestedRange::until(at(0));
        let decision = check_coverage(Some(&rec), requested, ttl(), at(0));
        assert_eq!(decision.reason, CoverageReason::Stale);
        assert_eq!(decision.fetch_after, Some(at(-40)));
        assert_eq!(decision.fetch_before, Some(at(0)));
    }

    #[test]
    fn test_staleness_boundary_is_inclusive() {
        // Exactly ttl old counts as stale; one second fresher does not.
        let rec = record(-600, -31, -30, true);
        let decision = check_coverage(Some(&rec), RequestedRange::default(), ttl(), at(0));
        assert_eq!(decision.reason, CoverageReason::Stale);

        let rec = record(-600, -31, -29, true);
        let decision = check_coverage(Some(&rec), RequestedRange::default(), ttl(), at(0));
        assert_eq!(decision.reason, CoverageReason::Covered);
    }

    #[test]
    fn test_staleness_beats_partial_checks() {
        // Record is both stale and short of the requested range; stale wins.
        let rec = record(-300, -60, -90, false);
        let requested = RequestedRange::between(at(-600), at(0));
        let decision = check_coverage(Some(&rec), requested, ttl(), at(0));
        assert_eq!(decision.reason, CoverageReason::Stale);
    }

    #[test]
    fn test_partial_older_fetches_the_early_gap() {
        let rec = record(-300, -5, -5, false);
        let requested = RequestedRange::between(at(-600), at(-10));
        let decision = check_coverage(Some(&rec), requested, ttl(), at(0));
        assert_eq!(decision.reason, CoverageReason::PartialOlder);
        assert_eq!(decision.fetch_after, Some(at(-600)));
        assert_eq!(decision.fetch_before, Some(at(-300)));
    }

    #[test]
    fn test_open_lower_bound_needs_complete_history() {
        let rec = record(-300, -5, -5, false);
        let decision = check_coverage(Some(&rec), RequestedRange::until(at(-10)), ttl(), at(0));
        assert_eq!(decision.reason, CoverageReason::PartialOlder);
        assert_eq!(decision.fetch_after, None, "backfill from genesis");
        assert_eq!(decision.fetch_before, Some(at(-300)));
    }

    #[test]
    fn test_complete_history_makes_lower_bound_irrelevant() {
        let rec = record(-300, -5, -5, true);
        let decision = check_coverage(Some(&rec), RequestedRange::until(at(-10)), ttl(), at(0));
        assert_eq!(decision.reason, CoverageReason::Covered);
        assert!(!decision.needs_fetch());
    }

    #[test]
    fn test_partial_newer_fetches_the_late_gap() {
        let rec = record(-600, -120, -5, true);
        let requested = RequestedRange::between(at(-500), at(-10));
        let decision = check_coverage(Some(&rec), requested, ttl(), at(0));
        assert_eq!(decision.reason, CoverageReason::PartialNewer);
        assert_eq!(decision.fetch_after, Some(at(-120)));
        assert_eq!(decision.fetch_before, Some(at(-10)));
    }

    #[test]
    fn test_contained_range_is_covered() {
        let rec = record(-600, -10, -5, false);
        let requested = RequestedRange::between(at(-500), at(-60));
        let decision = check_coverage(Some(&rec), requested, ttl(), at(0));
        assert_eq!(decision.reason, CoverageReason::Covered);
        assert_eq!(decision.fetch_after, None);
        assert_eq!(decision.fetch_before, None);
    }

    #[test]
    fn test_decision_total_over_input_space() {
        // Every combination of record shape and range shape produces exactly
        // one reason, without panicking.
        let records = [
            None,
            Some(record(-600, -10, -5, false)),
            Some(record(-600, -10, -5, true)),
            Some(record(-600, -10, -120, false)),
            Some(SyncRecord {
                scope: "wallet:0xabc".into(),
                synced_from: None,
                synced_to: None,
                synced_at: Some(at(-1)),
                has_complete_history: false,
            }),
        ];
        let ranges = [
            RequestedRange::default(),
            RequestedRange::until(at(0)),
            RequestedRange::between(at(-900), at(0)),
            RequestedRange::between(at(-500), at(-60)),
        ];
        for rec in &records {
            for range in &ranges {
                let decision = check_coverage(rec.as_ref(), *range, ttl(), at(0));
                let _ = decision.reason.as_str();
            }
        }
    }
}
