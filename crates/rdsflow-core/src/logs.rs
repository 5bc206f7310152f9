//! Time-windowed retrieval of error and slow-query logs

use crate::error::{CoreError, Result};
use crate::resolver::{ResolvePolicy, ResourceResolver};
use chrono::{DateTime, Months, Utc};
use rdsflow_cloud::{ErrorLogEntry, LogPage, LogQuery, RdsProvider, SlowLogEntry};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest page the provider serves
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Multi-page retrieval gives up after this many requests
pub const MAX_PAGES: u32 = 1000;

/// Timestamp grammar of the log endpoints
pub const PROVIDER_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S+0000";

/// Half-open interval `[start, end)` that bounds a log query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl LogWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// One calendar month back from `now`
    pub fn last_month(now: DateTime<Utc>) -> Self {
        Self::trailing(now, Months::new(1))
    }

    /// `period` calendar months back from `now`
    ///
    /// Days that do not exist in the earlier month clamp to its last day,
    /// so March 31 goes back to the end of February.
    pub fn trailing(now: DateTime<Utc>, period: Months) -> Self {
        let start = now
            .checked_sub_months(period)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end: now }
    }

    pub fn start_date(&self) -> String {
        self.start.format(PROVIDER_TIME_FORMAT).to_string()
    }

    pub fn end_date(&self) -> String {
        self.end.format(PROVIDER_TIME_FORMAT).to_string()
    }

    fn query(&self, page: u32, limit: u32) -> LogQuery {
        LogQuery {
            start_date: self.start_date(),
            end_date: self.end_date(),
            page,
            limit,
        }
    }
}

/// How far to follow the provider's paging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Pagination {
    /// Request page after page until every record is collected
    #[default]
    MultiPage,
    /// One request for the first page; anything beyond it is not fetched
    SinglePage,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown pagination '{0}' (expected 'multi' or 'single')")]
pub struct UnknownPagination(String);

impl FromStr for Pagination {
    type Err = UnknownPagination;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "multi" | "multi-page" => Ok(Pagination::MultiPage),
            "single" | "single-page" => Ok(Pagination::SinglePage),
            _ => Err(UnknownPagination(s.to_string())),
        }
    }
}

impl fmt::Display for Pagination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pagination::MultiPage => write!(f, "multi"),
            Pagination::SinglePage => write!(f, "single"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Error,
    Slow,
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogKind::Error => write!(f, "error log"),
            LogKind::Slow => write!(f, "slow log"),
        }
    }
}

/// Entries of one log kind, in provider order
#[derive(Debug, Clone, PartialEq)]
pub enum LogEntries {
    Error(Vec<ErrorLogEntry>),
    Slow(Vec<SlowLogEntry>),
}

impl LogEntries {
    pub fn kind(&self) -> LogKind {
        match self {
            LogEntries::Error(_) => LogKind::Error,
            LogEntries::Slow(_) => LogKind::Slow,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            LogEntries::Error(entries) => entries.len(),
            LogEntries::Slow(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// JSON array, two-space indented
    pub fn to_pretty_json(&self) -> Result<String> {
        let json = match self {
            LogEntries::Error(entries) => serde_json::to_string_pretty(entries),
            LogEntries::Slow(entries) => serde_json::to_string_pretty(entries),
        };
        json.map_err(|e| CoreError::Extraction(e.to_string()))
    }
}

trait PageSource {
    type Entry;

    async fn page(
        &self,
        provider: &dyn RdsProvider,
        instance_id: &str,
        query: &LogQuery,
    ) -> rdsflow_cloud::Result<LogPage<Self::Entry>>;
}

struct ErrorLogSource;

impl PageSource for ErrorLogSource {
    type Entry = ErrorLogEntry;

    async fn page(
        &self,
        provider: &dyn RdsProvider,
        instance_id: &str,
        query: &LogQuery,
    ) -> rdsflow_cloud::Result<LogPage<ErrorLogEntry>> {
        provider.list_error_logs(instance_id, query).await
    }
}

struct SlowLogSource;

impl PageSource for SlowLogSource {
    type Entry = SlowLogEntry;

    async fn page(
        &self,
        provider: &dyn RdsProvider,
        instance_id: &str,
        query: &LogQuery,
    ) -> rdsflow_cloud::Result<LogPage<SlowLogEntry>> {
        provider.list_slow_logs(instance_id, query).await
    }
}

/// Fetches log entries for one instance
pub struct LogFetcher<'a> {
    provider: &'a dyn RdsProvider,
    pagination: Pagination,
    page_size: u32,
    resolve_policy: ResolvePolicy,
}

impl<'a> LogFetcher<'a> {
    pub fn new(provider: &'a dyn RdsProvider) -> Self {
        Self {
            provider,
            pagination: Pagination::default(),
            page_size: DEFAULT_PAGE_SIZE,
            resolve_policy: ResolvePolicy::default(),
        }
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn with_resolve_policy(mut self, policy: ResolvePolicy) -> Self {
        self.resolve_policy = policy;
        self
    }

    /// Records per request, between 1 and [`DEFAULT_PAGE_SIZE`]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, DEFAULT_PAGE_SIZE);
        self
    }

    pub async fn fetch_error_logs(
        &self,
        instance_id: &str,
        window: &LogWindow,
    ) -> Result<Vec<ErrorLogEntry>> {
        self.collect(&ErrorLogSource, LogKind::Error, instance_id, window)
            .await
    }

    pub async fn fetch_slow_logs(
        &self,
        instance_id: &str,
        window: &LogWindow,
    ) -> Result<Vec<SlowLogEntry>> {
        self.collect(&SlowLogSource, LogKind::Slow, instance_id, window)
            .await
    }

    /// Resolve the instance named `name`, then fetch its `kind` log
    #[tracing::instrument(skip(self, window), fields(pagination = %self.pagination))]
    pub async fn fetch_for_instance(
        &self,
        name: &str,
        kind: LogKind,
        window: &LogWindow,
    ) -> Result<LogEntries> {
        let instance = ResourceResolver::new(self.provider)
            .with_policy(self.resolve_policy)
            .resolve_instance_by_name(name)
            .await?;

        Ok(match kind {
            LogKind::Error => LogEntries::Error(self.fetch_error_logs(&instance.id, window).await?),
            LogKind::Slow => LogEntries::Slow(self.fetch_slow_logs(&instance.id, window).await?),
        })
    }

    async fn collect<S: PageSource>(
        &self,
        source: &S,
        kind: LogKind,
        instance_id: &str,
        window: &LogWindow,
    ) -> Result<Vec<S::Entry>> {
        tracing::debug!(
            start = %window.start_date(),
            end = %window.end_date(),
            "Fetching {} of {}",
            kind,
            instance_id
        );

        if self.pagination == Pagination::SinglePage {
            let page = source
                .page(self.provider, instance_id, &window.query(1, self.page_size))
                .await?;
            if (page.entries.len() as u32) < page.total_record {
                tracing::debug!(
                    "{} has {} records, returning the first {}",
                    kind,
                    page.total_record,
                    page.entries.len()
                );
            }
            return Ok(page.entries);
        }

        let mut entries = Vec::new();
        for page_number in 1..=MAX_PAGES {
            let page = source
                .page(
                    self.provider,
                    instance_id,
                    &window.query(page_number, self.page_size),
                )
                .await?;

            let received = page.entries.len();
            entries.extend(page.entries);
            tracing::debug!(
                page = page_number,
                received,
                collected = entries.len(),
                total = page.total_record,
                "{} page",
                kind
            );

            if received == 0 || entries.len() as u32 >= page.total_record {
                return Ok(entries);
            }
        }

        Err(CoreError::Extraction(format!(
            "{} listing for {} did not end after {} pages",
            kind, instance_id, MAX_PAGES
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_format() {
        let now = Utc.with_ymd_and_hms(2024, 2, 15, 10, 30, 0).unwrap();
        let window = LogWindow::last_month(now);
        assert_eq!(window.start_date(), "2024-01-15T10:30:00+0000");
        assert_eq!(window.end_date(), "2024-02-15T10:30:00+0000");
    }

    #[test]
    fn test_window_drops_subseconds() {
        let now = Utc.with_ymd_and_hms(2024, 2, 15, 10, 30, 0).unwrap()
            + chrono::Duration::milliseconds(750);
        assert_eq!(
            LogWindow::last_month(now).end_date(),
            "2024-02-15T10:30:00+0000"
        );
    }

    #[test]
    fn test_window_clamps_to_month_end() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
        assert_eq!(
            LogWindow::last_month(now).start_date(),
            "2024-02-29T12:00:00+0000"
        );

        let now = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        assert_eq!(
            LogWindow::last_month(now).start_date(),
            "2023-12-10T00:00:00+0000"
        );
    }

    #[test]
    fn test_pagination_parse() {
        assert_eq!("multi".parse::<Pagination>(), Ok(Pagination::MultiPage));
        assert_eq!("Single".parse::<Pagination>(), Ok(Pagination::SinglePage));
        assert!("all".parse::<Pagination>().is_err());
        assert_eq!(Pagination::default().to_string(), "multi");
    }

    #[test]
    fn test_page_size_is_clamped() {
        let provider = rdsflow_cloud::mock::MockProvider::new();
        assert_eq!(LogFetcher::new(&provider).with_page_size(500).page_size, 100);
        assert_eq!(LogFetcher::new(&provider).with_page_size(0).page_size, 1);
    }
}
