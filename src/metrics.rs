use std::collections::{HashMap, HashSet};

use chrono::Datelike;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    CollaborationStatus, Company, MonthlyPerformance, OfficerMetrics, OfficerScore,
    PerformanceOverview, Placement, PlacementOfficer, PlacementProgress, RoleView, ScoreBand,
};
use crate::view::percentage;

pub const TOP_OFFICERS: usize = 5;

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Optional restrictions on which placements count. `month` is zero based
/// and only applies together with `year`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsFilter {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub officer_id: Option<Uuid>,
}

impl MetricsFilter {
    pub fn matches(&self, placement: &Placement) -> bool {
        let date = placement.placement_date;
        let in_period = match (self.month, self.year) {
            (Some(month), Some(year)) => date.month0() == month && date.year() == year,
            (None, Some(year)) => date.year() == year,
            _ => true,
        };
        let by_officer = match self.officer_id {
            Some(officer_id) => placement.placement_officer_id == Some(officer_id),
            None => true,
        };
        in_period && by_officer
    }
}

/// Tunable weights behind the performance score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub per_completed_placement: u32,
    pub per_company: u32,
    pub days_factor: f64,
    pub cap: u32,
    /// Time efficiency used when no placement carries a start date.
    pub missing_time_score: u32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            per_completed_placement: 25,
            per_company: 20,
            days_factor: 2.0,
            cap: 100,
            missing_time_score: 0,
        }
    }
}

pub fn filter_placements<'a>(
    placements: &'a [Placement],
    filter: &MetricsFilter,
) -> Vec<&'a Placement> {
    placements
        .iter()
        .filter(|placement| filter.matches(placement))
        .collect()
}

/// One metrics record per officer, in the order `officers` is given.
///
/// Placements pointing at an officer we do not know are left out of every
/// record.
pub fn aggregate(
    placements: &[Placement],
    officers: &[PlacementOfficer],
    filter: &MetricsFilter,
) -> Vec<OfficerMetrics> {
    let mut by_officer: HashMap<Uuid, Vec<&Placement>> = officers
        .iter()
        .map(|officer| (officer.id, Vec::new()))
        .collect();
    let mut orphaned = 0usize;

    for placement in filter_placements(placements, filter) {
        match placement
            .placement_officer_id
            .and_then(|id| by_officer.get_mut(&id))
        {
            Some(list) => list.push(placement),
            None => orphaned += 1,
        }
    }

    if orphaned > 0 {
        debug!(orphaned, "skipped placements without a known officer");
    }

    officers
        .iter()
        .map(|officer| {
            let list = by_officer
                .get(&officer.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            officer_metrics(officer, list)
        })
        .collect()
}

fn officer_metrics(officer: &PlacementOfficer, placements: &[&Placement]) -> OfficerMetrics {
    let total_placements = placements.len();
    let completed_placements = placements
        .iter()
        .filter(|p| p.status == PlacementProgress::Completed)
        .count();
    let in_progress_placements = placements
        .iter()
        .filter(|p| p.status == PlacementProgress::InProgress)
        .count();
    let companies: HashSet<Uuid> = placements.iter().filter_map(|p| p.company_id).collect();
    let last_placement_date = placements.iter().map(|p| p.placement_date).max();

    OfficerMetrics {
        id: officer.id,
        name: officer.name.clone(),
        total_placements,
        completed_placements,
        in_progress_placements,
        companies_collaborated: companies.len(),
        average_placement_days: average_placement_days(placements),
        placement_success_rate: percentage(completed_placements, total_placements),
        last_placement_date,
    }
}

/// Mean days from `started_on` to `placement_date` over the placements that
/// carry a start date. Start dates after the placement date are ignored.
pub fn average_placement_days(placements: &[&Placement]) -> Option<f64> {
    let spans: Vec<i64> = placements
        .iter()
        .filter_map(|p| {
            p.started_on
                .map(|started| (p.placement_date - started).num_days())
        })
        .filter(|days| *days >= 0)
        .collect();

    if spans.is_empty() {
        return None;
    }
    Some(spans.iter().sum::<i64>() as f64 / spans.len() as f64)
}

pub fn score(metrics: &OfficerMetrics, weights: &ScoreWeights) -> OfficerScore {
    let placement_score = capped(
        metrics.completed_placements,
        weights.per_completed_placement,
        weights.cap,
    );
    let company_engagement_score =
        capped(metrics.companies_collaborated, weights.per_company, weights.cap);
    let time_efficiency_score = match metrics.average_placement_days {
        Some(days) => (weights.cap as f64 - days * weights.days_factor)
            .max(0.0)
            .floor() as u32,
        None => weights.missing_time_score,
    };
    let overall_score = (placement_score + company_engagement_score + time_efficiency_score) / 3;

    OfficerScore {
        id: metrics.id,
        name: metrics.name.clone(),
        placement_score,
        company_engagement_score,
        time_efficiency_score,
        overall_score,
        band: ScoreBand::for_score(overall_score),
    }
}

pub fn score_all(metrics: &[OfficerMetrics], weights: &ScoreWeights) -> Vec<OfficerScore> {
    metrics.iter().map(|m| score(m, weights)).collect()
}

fn capped(count: usize, weight: u32, cap: u32) -> u32 {
    u32::try_from(count)
        .unwrap_or(u32::MAX)
        .saturating_mul(weight)
        .min(cap)
}

pub fn overview(metrics: &[OfficerMetrics], companies: &[Company]) -> PerformanceOverview {
    let average_success_rate = if metrics.is_empty() {
        0
    } else {
        let sum: u32 = metrics.iter().map(|m| m.placement_success_rate).sum();
        (sum as f64 / metrics.len() as f64).round() as u32
    };

    PerformanceOverview {
        total_placements: metrics.iter().map(|m| m.total_placements).sum(),
        completed_placements: metrics.iter().map(|m| m.completed_placements).sum(),
        active_companies: companies
            .iter()
            .filter(|c| c.collaboration_status == CollaborationStatus::Active)
            .count(),
        average_success_rate,
    }
}

/// Officers with the most completed placements, ties kept in input order.
pub fn top_officers(metrics: &[OfficerMetrics], limit: usize) -> Vec<OfficerMetrics> {
    let mut sorted = metrics.to_vec();
    sorted.sort_by(|a, b| b.completed_placements.cmp(&a.completed_placements));
    sorted.truncate(limit);
    sorted
}

/// Per-month counts for `year`, or just `month` when one is selected.
pub fn monthly_breakdown(
    placements: &[Placement],
    year: i32,
    month: Option<u32>,
    officer_id: Option<Uuid>,
) -> Vec<MonthlyPerformance> {
    let in_year: Vec<&Placement> = placements
        .iter()
        .filter(|p| p.placement_date.year() == year)
        .filter(|p| officer_id.is_none() || p.placement_officer_id == officer_id)
        .collect();

    let months: Vec<u32> = match month {
        Some(month) if month < 12 => vec![month],
        Some(_) => Vec::new(),
        None => (0..12).collect(),
    };

    months
        .into_iter()
        .map(|month| {
            let in_month: Vec<&&Placement> = in_year
                .iter()
                .filter(|p| p.placement_date.month0() == month)
                .collect();
            let companies: HashSet<Uuid> = in_month.iter().filter_map(|p| p.company_id).collect();
            MonthlyPerformance {
                month,
                label: MONTH_LABELS[month as usize],
                placements: in_month.len(),
                completions: in_month
                    .iter()
                    .filter(|p| p.status == PlacementProgress::Completed)
                    .count(),
                companies: companies.len(),
            }
        })
        .collect()
}

/// Placements whose officer is one of `officers`, the same set `aggregate`
/// counts from.
pub fn attributed_placements(
    placements: &[Placement],
    officers: &[PlacementOfficer],
) -> Vec<Placement> {
    let known: HashSet<Uuid> = officers.iter().map(|officer| officer.id).collect();
    placements
        .iter()
        .filter(|p| p.placement_officer_id.is_some_and(|id| known.contains(&id)))
        .cloned()
        .collect()
}

/// Everything the performance page shows, computed from one scoped view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformancePage {
    pub filter_label: String,
    pub overview: PerformanceOverview,
    pub metrics: Vec<OfficerMetrics>,
    pub scores: Vec<OfficerScore>,
    pub top: Vec<OfficerMetrics>,
    pub monthly: Vec<MonthlyPerformance>,
}

pub fn performance_page(
    view: &RoleView,
    filter: &MetricsFilter,
    weights: &ScoreWeights,
) -> PerformancePage {
    let metrics = aggregate(&view.placements, &view.placement_officers, filter);
    let monthly = match filter.year {
        Some(year) => monthly_breakdown(
            &attributed_placements(&view.placements, &view.placement_officers),
            year,
            filter.month,
            filter.officer_id,
        ),
        None => Vec::new(),
    };

    PerformancePage {
        filter_label: filter.label(),
        overview: overview(&metrics, &view.companies),
        scores: score_all(&metrics, weights),
        top: top_officers(&metrics, TOP_OFFICERS),
        monthly,
        metrics,
    }
}

impl MetricsFilter {
    pub fn label(&self) -> String {
        let period = match (self.month, self.year) {
            (Some(month), Some(year)) if month < 12 => {
                format!("{} {year}", MONTH_LABELS[month as usize])
            }
            (_, Some(year)) => year.to_string(),
            _ => "all time".to_string(),
        };
        match self.officer_id {
            Some(officer_id) => format!("{period}, officer {officer_id}"),
            None => period,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DashboardStats;
    use chrono::NaiveDate;

    fn officer(name: &str) -> PlacementOfficer {
        PlacementOfficer {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@techinstitute.edu", name.to_lowercase()),
            phone: None,
            school_id: None,
        }
    }

    fn placement(
        officer: Option<Uuid>,
        company: Uuid,
        date: NaiveDate,
        status: PlacementProgress,
    ) -> Placement {
        Placement {
            id: Uuid::new_v4(),
            student_id: Some(Uuid::new_v4()),
            student_name: None,
            company_id: Some(company),
            company_name: None,
            placement_officer_id: officer,
            placement_officer_name: None,
            placement_date: date,
            started_on: None,
            status,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_filter_keeps_only_that_month() {
        let emily = officer("Emily");
        let company = Uuid::new_v4();
        let placements = vec![
            placement(Some(emily.id), company, date(2023, 6, 12), PlacementProgress::Completed),
            placement(Some(emily.id), company, date(2023, 7, 3), PlacementProgress::Completed),
        ];
        let filter = MetricsFilter {
            month: Some(5),
            year: Some(2023),
            officer_id: None,
        };

        let metrics = aggregate(&placements, &[emily], &filter);
        assert_eq!(metrics[0].total_placements, 1);
        assert_eq!(metrics[0].last_placement_date, Some(date(2023, 6, 12)));
    }

    #[test]
    fn year_filter_and_officer_filter_compose() {
        let emily = officer("Emily");
        let robert = officer("Robert");
        let company = Uuid::new_v4();
        let placements = vec![
            placement(Some(emily.id), company, date(2023, 6, 12), PlacementProgress::Completed),
            placement(Some(emily.id), company, date(2024, 1, 9), PlacementProgress::Completed),
            placement(Some(robert.id), company, date(2023, 8, 1), PlacementProgress::InProgress),
        ];
        let filter = MetricsFilter {
            month: None,
            year: Some(2023),
            officer_id: Some(robert.id),
        };

        let metrics = aggregate(&placements, &[emily, robert], &filter);
        assert_eq!(metrics[0].total_placements, 0);
        assert_eq!(metrics[0].last_placement_date, None);
        assert_eq!(metrics[0].placement_success_rate, 0);
        assert_eq!(metrics[1].total_placements, 1);
        assert_eq!(metrics[1].in_progress_placements, 1);
    }

    #[test]
    fn month_without_year_does_not_restrict() {
        let filter = MetricsFilter {
            month: Some(0),
            year: None,
            officer_id: None,
        };
        let p = placement(None, Uuid::new_v4(), date(2022, 9, 1), PlacementProgress::Completed);
        assert!(filter.matches(&p));
    }

    #[test]
    fn orphaned_placements_are_skipped() {
        let emily = officer("Emily");
        let company = Uuid::new_v4();
        let placements = vec![
            placement(Some(emily.id), company, date(2023, 6, 1), PlacementProgress::Completed),
            placement(Some(Uuid::new_v4()), company, date(2023, 6, 2), PlacementProgress::Completed),
            placement(None, company, date(2023, 6, 3), PlacementProgress::Completed),
        ];

        let metrics = aggregate(&placements, &[emily], &MetricsFilter::default());
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].total_placements, 1);
    }

    #[test]
    fn counts_stay_within_totals() {
        let emily = officer("Emily");
        let companies: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let statuses = [
            PlacementProgress::Completed,
            PlacementProgress::InProgress,
            PlacementProgress::Other("withdrawn".to_string()),
        ];
        let placements: Vec<Placement> = (0..17)
            .map(|i| {
                placement(
                    Some(emily.id),
                    companies[i % companies.len()],
                    date(2023, 1 + (i % 12) as u32, 1),
                    statuses[i % statuses.len()].clone(),
                )
            })
            .collect();

        let metrics = aggregate(&placements, &[emily], &MetricsFilter::default());
        let m = &metrics[0];
        assert_eq!(m.total_placements, 17);
        assert!(m.completed_placements + m.in_progress_placements <= m.total_placements);
        assert_eq!(m.completed_placements, 6);
        assert_eq!(m.in_progress_placements, 6);
        assert!(m.companies_collaborated <= m.total_placements);
        assert_eq!(m.companies_collaborated, 3);
        assert_eq!(m.placement_success_rate, 35);
    }

    #[test]
    fn average_days_uses_start_dates_only() {
        let emily = officer("Emily");
        let company = Uuid::new_v4();
        let mut first = placement(Some(emily.id), company, date(2023, 6, 21), PlacementProgress::Completed);
        first.started_on = Some(date(2023, 6, 1));
        let mut second = placement(Some(emily.id), company, date(2023, 6, 11), PlacementProgress::Completed);
        second.started_on = Some(date(2023, 6, 1));
        let third = placement(Some(emily.id), company, date(2023, 6, 30), PlacementProgress::Completed);

        let metrics = aggregate(&[first, second, third], &[emily], &MetricsFilter::default());
        assert_eq!(metrics[0].average_placement_days, Some(15.0));

        let none = aggregate(&[], &[officer("Robert")], &MetricsFilter::default());
        assert_eq!(none[0].average_placement_days, None);
    }

    fn metrics_with(completed: usize, companies: usize, days: Option<f64>) -> OfficerMetrics {
        OfficerMetrics {
            id: Uuid::new_v4(),
            name: "Emily Chen".to_string(),
            total_placements: completed,
            completed_placements: completed,
            in_progress_placements: 0,
            companies_collaborated: companies,
            average_placement_days: days,
            placement_success_rate: 100,
            last_placement_date: None,
        }
    }

    #[test]
    fn overall_score_averages_capped_components() {
        let scored = score(&metrics_with(4, 5, Some(10.0)), &ScoreWeights::default());
        assert_eq!(scored.placement_score, 100);
        assert_eq!(scored.company_engagement_score, 100);
        assert_eq!(scored.time_efficiency_score, 80);
        assert_eq!(scored.overall_score, 93);
        assert_eq!(scored.band, ScoreBand::Strong);
    }

    #[test]
    fn missing_timing_uses_configured_score() {
        let weights = ScoreWeights::default();
        let scored = score(&metrics_with(1, 1, None), &weights);
        assert_eq!(scored.placement_score, 25);
        assert_eq!(scored.company_engagement_score, 20);
        assert_eq!(scored.time_efficiency_score, 0);
        assert_eq!(scored.overall_score, 15);
        assert_eq!(scored.band, ScoreBand::Weak);

        let lenient = ScoreWeights {
            missing_time_score: 100,
            ..weights
        };
        assert_eq!(score(&metrics_with(1, 1, None), &lenient).overall_score, 48);
    }

    #[test]
    fn slow_placements_floor_at_zero() {
        let scored = score(&metrics_with(2, 2, Some(75.0)), &ScoreWeights::default());
        assert_eq!(scored.time_efficiency_score, 0);
        assert_eq!(scored.overall_score, 30);
    }

    #[test]
    fn overview_averages_success_rates() {
        let mut a = metrics_with(3, 1, None);
        a.total_placements = 4;
        a.placement_success_rate = 75;
        let mut b = metrics_with(0, 0, None);
        b.placement_success_rate = 0;
        let summary = overview(&[a, b], &[]);
        assert_eq!(summary.total_placements, 4);
        assert_eq!(summary.completed_placements, 3);
        assert_eq!(summary.average_success_rate, 38);
        assert_eq!(overview(&[], &[]).average_success_rate, 0);
    }

    #[test]
    fn top_officers_rank_by_completed() {
        let ranked = top_officers(
            &[
                metrics_with(1, 1, None),
                metrics_with(4, 1, None),
                metrics_with(2, 1, None),
            ],
            2,
        );
        let completed: Vec<usize> = ranked.iter().map(|m| m.completed_placements).collect();
        assert_eq!(completed, vec![4, 2]);
    }

    #[test]
    fn monthly_breakdown_covers_year_or_selected_month() {
        let emily = officer("Emily");
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let placements = vec![
            placement(Some(emily.id), a, date(2023, 6, 2), PlacementProgress::Completed),
            placement(Some(emily.id), b, date(2023, 6, 9), PlacementProgress::InProgress),
            placement(Some(emily.id), a, date(2023, 7, 1), PlacementProgress::Completed),
            placement(Some(emily.id), a, date(2022, 6, 1), PlacementProgress::Completed),
        ];

        let year = monthly_breakdown(&placements, 2023, None, None);
        assert_eq!(year.len(), 12);
        assert_eq!(year[5].label, "Jun");
        assert_eq!(year[5].placements, 2);
        assert_eq!(year[5].completions, 1);
        assert_eq!(year[5].companies, 2);
        assert_eq!(year[6].placements, 1);

        let june = monthly_breakdown(&placements, 2023, Some(5), Some(emily.id));
        assert_eq!(june.len(), 1);
        assert_eq!(june[0].placements, 2);

        assert!(monthly_breakdown(&placements, 2023, None, Some(Uuid::new_v4()))
            .iter()
            .all(|m| m.placements == 0));
    }

    #[test]
    fn monthly_rows_agree_with_officer_totals() {
        let emily = officer("Emily");
        let outsider = officer("Robert");
        let company = Uuid::new_v4();
        let placements = vec![
            placement(Some(emily.id), company, date(2023, 6, 2), PlacementProgress::Completed),
            // Reached through the student's school, brokered by another school's officer.
            placement(Some(outsider.id), company, date(2023, 6, 9), PlacementProgress::Completed),
        ];
        let view = RoleView {
            schools: Vec::new(),
            students: Vec::new(),
            companies: Vec::new(),
            placements,
            users: Vec::new(),
            placement_officers: vec![emily],
            stats: DashboardStats {
                total_students: 0,
                placed_students: 0,
                active_companies: 0,
                placement_rate: 0,
                recent_placements: Vec::new(),
            },
        };
        let filter = MetricsFilter {
            month: None,
            year: Some(2023),
            officer_id: None,
        };

        let page = performance_page(&view, &filter, &ScoreWeights::default());
        let monthly_total: usize = page.monthly.iter().map(|m| m.placements).sum();
        let monthly_completed: usize = page.monthly.iter().map(|m| m.completions).sum();
        assert_eq!(page.overview.total_placements, 1);
        assert_eq!(monthly_total, page.overview.total_placements);
        assert_eq!(monthly_completed, page.overview.completed_placements);
    }

    #[test]
    fn filter_labels_read_naturally() {
        let june = MetricsFilter {
            month: Some(5),
            year: Some(2023),
            officer_id: None,
        };
        assert_eq!(june.label(), "Jun 2023");
        assert_eq!(MetricsFilter::default().label(), "all time");
    }
}
