//! As-of snapshot engine.
//!
//! For every distinct report timestamp `T` the engine answers: "which status
//! did each clinic last report at or before `T`, and how many clinics hold
//! each status?"
//!
//! Two implementations produce identical output:
//!
//! - `sweep`: one pass over the time-ordered reports, keeping the latest
//!   report per clinic and the running counts. Only clinics reporting at
//!   exactly `T` are touched.
//! - `brute_force`: the definition itself, recomputed for every `T`. Each
//!   timestamp is independent (read-only over the reports), so the work is
//!   spread over rayon's pool.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use rayon::prelude::*;
use tracing::debug;

use crate::domain::{BedStatus, EngineKind, Report, SnapshotCounts, StatusCategory, TimePoint};

/// Latest report per clinic as of one instant.
#[derive(Debug, Clone)]
pub struct StatusSnapshot<'a> {
    pub as_of: NaiveDateTime,
    latest: HashMap<&'a str, &'a Report>,
}

impl<'a> StatusSnapshot<'a> {
    /// The report that defines `clinic_id`'s state, if it has reported yet.
    pub fn latest(&self, clinic_id: &str) -> Option<&'a Report> {
        self.latest.get(clinic_id).copied()
    }

    pub fn status_of(&self, clinic_id: &str, category: StatusCategory) -> Option<BedStatus> {
        self.latest(clinic_id).map(|r| r.statuses.get(category))
    }

    /// Number of clinics that have reported by `as_of`.
    pub fn clinic_count(&self) -> usize {
        self.latest.len()
    }

    pub fn tally(&self) -> SnapshotCounts {
        let mut counts = SnapshotCounts::default();
        for report in self.latest.values() {
            counts.add(&report.statuses);
        }
        counts
    }
}

/// Sorted distinct report timestamps.
pub fn distinct_times(reports: &[Report]) -> Vec<NaiveDateTime> {
    let mut times: Vec<NaiveDateTime> = reports.iter().map(|r| r.report_timestamp).collect();
    times.sort_unstable();
    times.dedup();
    times
}

/// Reconstruct the as-of state at `t` from scratch.
///
/// Among a clinic's reports with `report_timestamp <= t`, the one with the
/// latest timestamp wins; on equal timestamps, the one later in `reports`.
pub fn snapshot_at(reports: &[Report], t: NaiveDateTime) -> StatusSnapshot<'_> {
    let mut latest: HashMap<&str, &Report> = HashMap::new();
    for report in reports.iter().filter(|r| r.report_timestamp <= t) {
        latest
            .entry(report.clinic_id.as_str())
            .and_modify(|current| {
                if report.report_timestamp >= current.report_timestamp {
                    *current = report;
                }
            })
            .or_insert(report);
    }
    StatusSnapshot { as_of: t, latest }
}

/// Run the selected engine.
pub fn compute(reports: &[Report], engine: EngineKind) -> Vec<TimePoint> {
    let points = match engine {
        EngineKind::Incremental => sweep(reports),
        EngineKind::BruteForce => brute_force(reports),
    };
    debug!(?engine, timestamps = points.len(), "computed as-of snapshots");
    points
}

/// Incremental as-of sweep.
///
/// `reports` must be sorted by `report_timestamp` (the deduplicator's output
/// order); within a timestamp, later entries override earlier ones.
pub fn sweep(reports: &[Report]) -> Vec<TimePoint> {
    debug_assert!(
        reports.windows(2).all(|w| w[0].report_timestamp <= w[1].report_timestamp),
        "sweep requires time-ordered reports"
    );

    let mut latest: HashMap<&str, &Report> = HashMap::new();
    let mut counts = SnapshotCounts::default();
    let mut points = Vec::new();

    for group in reports.chunk_by(|a, b| a.report_timestamp == b.report_timestamp) {
        for report in group {
            if let Some(previous) = latest.insert(report.clinic_id.as_str(), report) {
                counts.remove(&previous.statuses);
            }
            counts.add(&report.statuses);
        }
        points.push(TimePoint {
            time: group[0].report_timestamp,
            clinics: latest.len(),
            counts,
        });
    }

    points
}

/// Brute-force as-of computation, one rayon task per distinct timestamp.
pub fn brute_force(reports: &[Report]) -> Vec<TimePoint> {
    distinct_times(reports)
        .into_par_iter()
        .map(|t| {
            let snapshot = snapshot_at(reports, t);
            TimePoint {
                time: snapshot.as_of,
                clinics: snapshot.clinic_count(),
                counts: snapshot.tally(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use proptest::prelude::*;

    use super::*;
    use crate::domain::{CategoryCounts, CategoryStatuses};

    fn t(n: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 4, 1)
            .unwrap()
            .and_hms_opt(n, 0, 0)
            .unwrap()
    }

    fn report(id: &str, hour: u32, status: BedStatus) -> Report {
        Report {
            clinic_id: id.to_string(),
            report_timestamp: t(hour),
            statuses: CategoryStatuses::uniform(status),
            case_count: 0,
            details: None,
        }
    }

    fn low_care(point: &TimePoint) -> [usize; 4] {
        point.counts.category(StatusCategory::LowCare).as_array()
    }

    #[test]
    fn three_clinic_scenario() {
        // C is on the roster but never reports.
        let reports = vec![
            report("A", 1, BedStatus::Available),
            report("B", 2, BedStatus::Occupied),
            report("A", 3, BedStatus::Limited),
        ];

        let points = sweep(&reports);
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].time, t(1));
        assert_eq!(low_care(&points[0]), [1, 0, 0, 0]);
        assert_eq!(low_care(&points[1]), [1, 0, 1, 0]);
        assert_eq!(low_care(&points[2]), [0, 1, 1, 0]);
        assert!(points.iter().all(|p| p.clinics <= 2));

        assert_eq!(brute_force(&reports), points);
        assert!(snapshot_at(&reports, t(3)).latest("C").is_none());
    }

    #[test]
    fn same_timestamp_last_wins() {
        let reports = vec![
            report("A", 1, BedStatus::Available),
            report("A", 1, BedStatus::Occupied),
        ];
        let points = sweep(&reports);
        assert_eq!(points.len(), 1);
        assert_eq!(low_care(&points[0]), [0, 0, 1, 0]);
        assert_eq!(
            snapshot_at(&reports, t(1)).status_of("A", StatusCategory::LowCare),
            Some(BedStatus::Occupied)
        );
        assert_eq!(brute_force(&reports), points);
    }

    #[test]
    fn unknown_is_counted_as_its_own_bucket() {
        let reports = vec![
            report("A", 1, BedStatus::Unknown),
            report("B", 1, BedStatus::Available),
        ];
        let points = sweep(&reports);
        assert_eq!(points[0].counts.category(StatusCategory::Ecmo), &CategoryCounts::from([1, 0, 0, 1]));
    }

    #[test]
    fn decommissioned_clinic_still_counts() {
        // "Gone" never appears in later snapshots but stays the latest reporter for itself.
        let reports = vec![
            report("Gone", 1, BedStatus::Limited),
            report("A", 2, BedStatus::Available),
        ];
        let points = sweep(&reports);
        assert_eq!(points[1].clinics, 2);
        assert_eq!(low_care(&points[1]), [1, 1, 0, 0]);
    }

    #[test]
    fn snapshot_knows_its_instant() {
        let reports = vec![
            report("A", 1, BedStatus::Available),
            report("B", 4, BedStatus::Occupied),
        ];
        let snapshot = snapshot_at(&reports, t(2));
        assert_eq!(snapshot.as_of, t(2));
        assert_eq!(snapshot.clinic_count(), 1);
        assert_eq!(snapshot_at(&reports, t(0)).clinic_count(), 0);
        assert_eq!(brute_force(&reports)[1].time, t(4));
    }

    #[test]
    fn empty_input_has_no_points() {
        assert!(sweep(&[]).is_empty());
        assert!(brute_force(&[]).is_empty());
        assert!(distinct_times(&[]).is_empty());
    }

    fn arb_reports() -> impl Strategy<Value = Vec<Report>> {
        prop::collection::vec((0usize..5, 0u32..8, 0usize..4, 0usize..4, 0usize..4), 0..50).prop_map(|rows| {
            let mut reports: Vec<Report> = rows
                .into_iter()
                .map(|(clinic, hour, lo, hi, ecmo)| Report {
                    clinic_id: format!("K{clinic}"),
                    report_timestamp: t(hour),
                    statuses: CategoryStatuses::new(BedStatus::ALL[lo], BedStatus::ALL[hi], BedStatus::ALL[ecmo]),
                    case_count: 0,
                    details: None,
                })
                .collect();
            reports.sort_by_key(|r| r.report_timestamp);
            reports
        })
    }

    proptest! {
        #[test]
        fn sweep_matches_brute_force(reports in arb_reports()) {
            prop_assert_eq!(sweep(&reports), brute_force(&reports));
        }

        #[test]
        fn snapshot_matches_latest_report_definition(reports in arb_reports()) {
            for time in distinct_times(&reports) {
                let snapshot = snapshot_at(&reports, time);
                for clinic in 0..5 {
                    let id = format!("K{clinic}");
                    // Last element among the maxima in sequence order.
                    let expected = reports
                        .iter()
                        .filter(|r| r.clinic_id == id && r.report_timestamp <= time)
                        .fold(None::<&Report>, |best, r| match best {
                            Some(b) if b.report_timestamp > r.report_timestamp => Some(b),
                            _ => Some(r),
                        });
                    prop_assert_eq!(snapshot.latest(&id), expected);
                }
            }
        }

        #[test]
        fn counts_are_conserved(reports in arb_reports()) {
            for point in sweep(&reports) {
                let reporting = reports
                    .iter()
                    .filter(|r| r.report_timestamp <= point.time)
                    .map(|r| r.clinic_id.as_str())
                    .collect::<std::collections::HashSet<_>>()
                    .len();
                prop_assert_eq!(point.clinics, reporting);
                for category in StatusCategory::ALL {
                    prop_assert_eq!(point.counts.category(category).total(), reporting);
                }
            }
        }
    }
}
