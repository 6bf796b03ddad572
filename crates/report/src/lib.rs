use std::fmt;

use chrono::{Local, TimeZone};
use core_model::{CalendarMoment, HistorySource, TimeError, VisitQuery};
use tracing::{debug, info, warn};

pub const DEFAULT_LIMIT: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("history store unavailable")]
    StoreUnavailable(#[source] anyhow::Error),
    #[error(transparent)]
    Time(#[from] TimeError),
}

/// Default row limit and the message templates of a report.
///
/// Templates use `{time}` for a full calendar rendering and `{count}` for a
/// number of visits.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub default_limit: u32,
    pub never_visited: String,
    pub visited_once: String,
    pub visited_many: String,
    pub bounded_summary: String,
    pub unbounded_summary: String,
    pub more_hint: String,
    pub visit_separator: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            never_visited: "You have never visited that web page.".to_string(),
            visited_once: "You have visited that web page once at {time}.".to_string(),
            visited_many: "You have visited that web page {count} times. Your first visit was on {time}."
                .to_string(),
            bounded_summary: "Your last {count} visits:".to_string(),
            unbounded_summary: "All {count} visits:".to_string(),
            more_hint: "If you want to see more visits, use the --max option.".to_string(),
            visit_separator: " | ".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLimit {
    /// `None` means every visit is listed.
    pub row_limit: Option<u32>,
    pub used_default: bool,
}

impl ResolvedLimit {
    pub fn summary_template<'a>(&self, config: &'a ReportConfig) -> &'a str {
        match self.row_limit {
            Some(_) => &config.bounded_summary,
            None => &config.unbounded_summary,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LimitPolicy {
    default_limit: u32,
}

impl LimitPolicy {
    pub fn new(default_limit: u32) -> Self {
        Self { default_limit }
    }

    pub fn resolve(&self, max_visits: Option<i64>) -> Result<ResolvedLimit, ReportError> {
        match max_visits {
            None => Ok(ResolvedLimit {
                row_limit: Some(self.default_limit),
                used_default: true,
            }),
            Some(n) if n < 0 => Err(ReportError::InvalidArgument(
                "maximum number of entries to display must be a positive number".to_string(),
            )),
            Some(0) => Ok(ResolvedLimit {
                row_limit: None,
                used_default: false,
            }),
            Some(n) => Ok(ResolvedLimit {
                row_limit: Some(u32::try_from(n).unwrap_or(u32::MAX)),
                used_default: false,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    NotFound,
    SingleVisit,
    MultipleVisits { total: i64, shown: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub outcome: ReportOutcome,
    pub summary: Option<String>,
    pub lines: Vec<String>,
}

impl fmt::Display for RenderedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(summary) = &self.summary {
            writeln!(f, "{summary}")?;
        }
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

pub struct ReportGenerator<Tz: TimeZone = Local> {
    config: ReportConfig,
    policy: LimitPolicy,
    tz: Tz,
}

impl ReportGenerator<Local> {
    pub fn new(config: ReportConfig) -> Self {
        Self::with_timezone(config, Local)
    }
}

impl<Tz: TimeZone> ReportGenerator<Tz> {
    pub fn with_timezone(config: ReportConfig, tz: Tz) -> Self {
        let policy = LimitPolicy::new(config.default_limit);
        Self { config, policy, tz }
    }

    /// Builds the report for `query`.
    ///
    /// `open` is only called once the limit option has been accepted; the
    /// store it returns is dropped before this function returns.
    pub fn generate<S, F>(&self, query: &VisitQuery, open: F) -> Result<RenderedReport, ReportError>
    where
        S: HistorySource,
        F: FnOnce() -> anyhow::Result<S>,
    {
        let limit = self.policy.resolve(query.max_visits)?;
        debug!(?limit, "limit resolved");

        let store = open().map_err(ReportError::StoreUnavailable)?;

        let item = store
            .find_item(&query.url)
            .map_err(ReportError::StoreUnavailable)?;
        let item = match item {
            Some(item) if item.visit_count > 0 => item,
            Some(item) => {
                warn!(id = item.id, visit_count = item.visit_count, "history item without visits");
                return Ok(self.not_found());
            }
            None => {
                info!(url = %query.url, "url not in history");
                return Ok(self.not_found());
            }
        };
        info!(id = item.id, visit_count = item.visit_count, "history item found");

        let first = store
            .first_visit(item.id)
            .map_err(ReportError::StoreUnavailable)?
            .ok_or_else(|| {
                ReportError::StoreUnavailable(anyhow::anyhow!(
                    "history item {} counts {} visits but none are recorded",
                    item.id,
                    item.visit_count
                ))
            })?;
        let first_time = self.calendar(first.timestamp)?.full();

        if item.visit_count == 1 {
            return Ok(RenderedReport {
                outcome: ReportOutcome::SingleVisit,
                summary: Some(fill(&self.config.visited_once, &[("time", first_time.as_str())])),
                lines: Vec::new(),
            });
        }

        let visits = store
            .recent_visits(item.id, limit.row_limit)
            .map_err(ReportError::StoreUnavailable)?;
        debug!(fetched = visits.len(), "visits fetched");

        let total = item.visit_count.to_string();
        let summary = fill(
            &self.config.visited_many,
            &[("count", total.as_str()), ("time", first_time.as_str())],
        );
        let mut lines = Vec::with_capacity(visits.len() + 3);
        lines.push(String::new());
        let shown = visits.len().to_string();
        lines.push(fill(
            limit.summary_template(&self.config),
            &[("count", shown.as_str())],
        ));
        if limit.used_default {
            lines.push(self.config.more_hint.clone());
        }
        for visit in &visits {
            let moment = self.calendar(visit.timestamp)?;
            lines.push(format!(
                "{}{}{}",
                moment.tabbed(),
                self.config.visit_separator,
                visit.title
            ));
        }

        Ok(RenderedReport {
            outcome: ReportOutcome::MultipleVisits {
                total: item.visit_count,
                shown: visits.len(),
            },
            summary: Some(summary),
            lines,
        })
    }

    fn calendar(&self, offset: i64) -> Result<CalendarMoment, TimeError> {
        CalendarMoment::from_store_offset_in(offset, &self.tz)
    }

    fn not_found(&self) -> RenderedReport {
        RenderedReport {
            outcome: ReportOutcome::NotFound,
            summary: Some(self.config.never_visited.clone()),
            lines: Vec::new(),
        }
    }
}

fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in values {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}
