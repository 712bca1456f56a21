//! Series assembly for stacked-area rendering.

use chrono::NaiveDateTime;

use crate::domain::{BedStatus, StatusCategory, TimePoint};

/// Count sequences of one category, one layer per status in `BedStatus::ALL` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySeries {
    pub category: StatusCategory,
    pub layers: [Vec<usize>; 4],
}

impl CategorySeries {
    fn with_capacity(category: StatusCategory, n: usize) -> Self {
        Self {
            category,
            layers: std::array::from_fn(|_| Vec::with_capacity(n)),
        }
    }

    pub fn layer(&self, status: BedStatus) -> &[usize] {
        &self.layers[status.index()]
    }

    /// Cumulative layers: `stacked()[k][i]` is the sum of layers `0..=k` at index `i`.
    ///
    /// The last layer is the total number of clinics in the snapshot.
    pub fn stacked(&self) -> [Vec<usize>; 4] {
        let mut out: [Vec<usize>; 4] = self.layers.clone();
        for k in 1..out.len() {
            let (below, rest) = out.split_at_mut(k);
            for (acc, base) in rest[0].iter_mut().zip(&below[k - 1]) {
                *acc += base;
            }
        }
        out
    }

    /// Counts for every status at index `i`.
    pub fn at(&self, i: usize) -> Option<[usize; 4]> {
        if i >= self.layers[0].len() {
            return None;
        }
        Some(std::array::from_fn(|k| self.layers[k][i]))
    }
}

/// The final, index-aligned time series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSeries {
    pub times: Vec<NaiveDateTime>,
    /// Clinics known at each time.
    pub clinics: Vec<usize>,
    pub categories: [CategorySeries; 3],
}

impl StatusSeries {
    pub fn category(&self, category: StatusCategory) -> &CategorySeries {
        &self.categories[category.index()]
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Largest number of clinics at any time (upper bound for stacked charts).
    pub fn max_clinics(&self) -> usize {
        self.clinics.iter().copied().max().unwrap_or(0)
    }
}

/// Turn as-of points into parallel, zero-filled count sequences.
pub fn assemble(points: &[TimePoint]) -> StatusSeries {
    let n = points.len();
    let mut categories = StatusCategory::ALL.map(|c| CategorySeries::with_capacity(c, n));
    let mut times = Vec::with_capacity(n);
    let mut clinics = Vec::with_capacity(n);

    for point in points {
        times.push(point.time);
        clinics.push(point.clinics);
        for series in categories.iter_mut() {
            let counts = point.counts.category(series.category);
            for status in BedStatus::ALL {
                series.layers[status.index()].push(counts.get(status));
            }
        }
    }

    StatusSeries {
        times,
        clinics,
        categories,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{CategoryStatuses, Report};
    use crate::timeline::asof::sweep;

    fn report(id: &str, hour: u32, statuses: CategoryStatuses) -> Report {
        Report {
            clinic_id: id.to_string(),
            report_timestamp: NaiveDate::from_ymd_opt(2020, 4, 1)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            statuses,
            case_count: 0,
            details: None,
        }
    }

    #[test]
    fn zero_fills_missing_statuses() {
        let reports = vec![
            report("A", 1, CategoryStatuses::uniform(BedStatus::Available)),
            report("B", 2, CategoryStatuses::new(BedStatus::Occupied, BedStatus::Limited, BedStatus::Unknown)),
        ];
        let series = assemble(&sweep(&reports));

        assert_eq!(series.len(), 2);
        let low = series.category(StatusCategory::LowCare);
        assert_eq!(low.layer(BedStatus::Available), &[1, 1]);
        assert_eq!(low.layer(BedStatus::Limited), &[0, 0]);
        assert_eq!(low.layer(BedStatus::Occupied), &[0, 1]);
        assert_eq!(low.layer(BedStatus::Unknown), &[0, 0]);

        let ecmo = series.category(StatusCategory::Ecmo);
        assert_eq!(ecmo.at(1), Some([1, 0, 0, 1]));
        assert_eq!(ecmo.at(2), None);
    }

    #[test]
    fn layers_align_with_times_in_fixed_order() {
        let reports = vec![report("A", 1, CategoryStatuses::uniform(BedStatus::Limited))];
        let series = assemble(&sweep(&reports));
        for (i, category) in StatusCategory::ALL.iter().enumerate() {
            assert_eq!(series.categories[i].category, *category);
            for layer in &series.categories[i].layers {
                assert_eq!(layer.len(), series.times.len());
            }
        }
    }

    #[test]
    fn stacked_top_equals_clinic_count() {
        let reports = vec![
            report("A", 1, CategoryStatuses::uniform(BedStatus::Available)),
            report("B", 1, CategoryStatuses::uniform(BedStatus::Limited)),
            report("C", 2, CategoryStatuses::uniform(BedStatus::Unknown)),
        ];
        let series = assemble(&sweep(&reports));
        let stacked = series.category(StatusCategory::HighCare).stacked();
        assert_eq!(stacked[0], vec![1, 1]);
        assert_eq!(stacked[1], vec![2, 2]);
        assert_eq!(stacked[3], series.clinics);
        assert_eq!(series.max_clinics(), 3);
    }

    #[test]
    fn empty_points_give_empty_series() {
        let series = assemble(&[]);
        assert!(series.is_empty());
        assert_eq!(series.max_clinics(), 0);
    }
}
