use chrono::{Months, Utc};
use rdsflow_config::CloudSettings;
use rdsflow_core::{CoreError, LogFetcher, LogKind, LogWindow, Pagination, ResolvePolicy};

pub struct LogsRequest {
    pub name: Option<String>,
    pub errorlog: bool,
    pub slowlog: bool,
    pub pagination: Pagination,
    pub window_months: u32,
    pub page_size: u32,
    pub resolve_policy: ResolvePolicy,
}

impl LogsRequest {
    /// Requested kinds, error log first
    fn kinds(&self) -> Vec<LogKind> {
        let mut kinds = Vec::new();
        if self.errorlog {
            kinds.push(LogKind::Error);
        }
        if self.slowlog {
            kinds.push(LogKind::Slow);
        }
        kinds
    }
}

pub async fn handle(settings: &CloudSettings, request: LogsRequest) -> anyhow::Result<()> {
    let name = request
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .ok_or(CoreError::MissingInput {
            name: "RDS_NAME",
            example: "mydb",
        })?;

    let provider = super::connect(settings).await?;
    let window = LogWindow::trailing(Utc::now(), Months::new(request.window_months));
    let fetcher = LogFetcher::new(&provider)
        .with_pagination(request.pagination)
        .with_page_size(request.page_size)
        .with_resolve_policy(request.resolve_policy);

    for kind in request.kinds() {
        let entries = fetcher.fetch_for_instance(name, kind, &window).await?;
        tracing::info!("{} entries in the {}", entries.len(), kind);
        println!("{}", entries.to_pretty_json()?);
    }

    Ok(())
}
