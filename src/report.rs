//! Report enumeration over metric, grouping dimension and time scope.

use crate::aggregate::{self, GroupKey, GroupLabel, MetricKind, MetricValue};
use crate::bucket::{self, HOURS, MONTHS, TimeScope};
use crate::model::{EventLog, StreamEvent, YearSpan};
use crate::rank::{self, DEFAULT_TOP_N, RankedResult};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, info};

/// Stable name of one report: `<metric>/<group>/<scope>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReportId {
    pub metric: MetricKind,
    pub group: GroupKey,
    pub scope: TimeScope,
}

impl ReportId {
    pub fn new(metric: MetricKind, group: GroupKey, scope: TimeScope) -> Self {
        Self {
            metric,
            group,
            scope,
        }
    }

    pub fn is_ranked(self) -> bool {
        self.group != GroupKey::None
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.metric.label(),
            self.group.label(),
            self.scope
        )
    }
}

impl Serialize for ReportId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportValue {
    Total(MetricValue),
    Ranked(RankedResult),
}

impl ReportValue {
    pub fn as_total(&self) -> Option<MetricValue> {
        match self {
            Self::Total(value) => Some(*value),
            Self::Ranked(_) => None,
        }
    }

    pub fn as_ranked(&self) -> Option<&RankedResult> {
        match self {
            Self::Total(_) => None,
            Self::Ranked(ranked) => Some(ranked),
        }
    }
}

pub type Reports = BTreeMap<ReportId, ReportValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportBuilder {
    top_n: usize,
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_N)
    }
}

impl ReportBuilder {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    /// Builds every report for `log`. An empty log yields no reports.
    pub fn build(&self, log: &EventLog) -> Reports {
        let Ok(span) = log.year_span() else {
            debug!("empty streaming history, no reports to build");
            return Reports::new();
        };

        let mut reports = Reports::new();
        for scope in time_scopes(span) {
            let scoped: Vec<&StreamEvent> = log.in_scope(scope).collect();
            let id = ReportId::new(MetricKind::TotalDuration, GroupKey::None, scope);
            reports.insert(id, self.evaluate(&scoped, id));
        }
        let time_reports = reports.len();

        for scope in dimension_scopes(log, span) {
            let scoped: Vec<&StreamEvent> = log.in_scope(scope).collect();
            for metric in MetricKind::ALL {
                for group in GroupKey::DIMENSIONS {
                    let id = ReportId::new(metric, group, scope);
                    reports.insert(id, self.evaluate(&scoped, id));
                }
            }
        }

        info!(
            events = log.len(),
            first_year = span.first,
            last_year = span.last,
            time_reports,
            dimension_reports = reports.len() - time_reports,
            "built reports"
        );
        reports
    }

    /// Computes a single report on demand.
    pub fn report(&self, log: &EventLog, id: ReportId) -> ReportValue {
        let scoped: Vec<&StreamEvent> = log.in_scope(id.scope).collect();
        self.evaluate(&scoped, id)
    }

    fn evaluate(&self, scoped: &[&StreamEvent], id: ReportId) -> ReportValue {
        let grouped = aggregate::aggregate(scoped.iter().copied(), id.group, id.metric);
        if id.is_ranked() {
            return ReportValue::Ranked(rank::top_n(grouped, self.top_n));
        }
        let total = grouped
            .get(&GroupLabel::Total)
            .copied()
            .unwrap_or_else(|| id.metric.zero());
        ReportValue::Total(total)
    }
}

/// Scopes of the ungrouped duration reports. Every month and hour is listed,
/// with or without data.
fn time_scopes(span: YearSpan) -> Vec<TimeScope> {
    let mut scopes: Vec<TimeScope> = span.years().map(TimeScope::PerYear).collect();
    for year in span.years() {
        scopes.extend(MONTHS.map(|month| TimeScope::PerYearMonth(year, month)));
    }
    scopes.extend(HOURS.map(TimeScope::PerHourOfDay));
    for year in span.years() {
        scopes.extend(HOURS.map(|hour| TimeScope::PerHourOfDayPerYear { year, hour }));
    }
    scopes
}

/// Scopes of the ranked reports: all time, each year, and only the months
/// that actually have streams.
fn dimension_scopes(log: &EventLog, span: YearSpan) -> Vec<TimeScope> {
    let active_months: BTreeSet<(i32, u8)> = log
        .events()
        .iter()
        .map(|event| bucket::year_month_of(event.timestamp))
        .collect();

    let mut scopes = vec![TimeScope::AllTime];
    scopes.extend(span.years().map(TimeScope::PerYear));
    scopes.extend(
        active_months
            .into_iter()
            .map(|(year, month)| TimeScope::PerYearMonth(year, month)),
    );
    scopes
}
