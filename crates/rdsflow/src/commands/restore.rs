use crate::progress::OperationProgress;
use rdsflow_config::CloudSettings;
use rdsflow_core::{ProvisionOptions, Provisioner, RestoreRequest, RestoreTarget};

pub async fn handle(
    settings: &CloudSettings,
    name: Option<String>,
    restore_time: Option<String>,
    target: Option<String>,
    options: ProvisionOptions,
) -> anyhow::Result<()> {
    // Input is checked before any network traffic
    let target = target.map(RestoreTarget::Instance).unwrap_or_default();
    let request = RestoreRequest::parse(restore_time.as_deref(), name.as_deref(), target)?;

    let provider = super::connect(settings).await?;

    let progress = OperationProgress::new(format!("Restoring {}", request.instance_name));
    let result = Provisioner::new(&provider)
        .with_options(options)
        .with_observer(&progress)
        .restore(&request)
        .await;

    match result {
        Ok(report) => {
            progress.finish_success(&report.job_id);
            println!("done {}", report.instance_id);
            Ok(())
        }
        Err(e) => {
            progress.finish_error();
            Err(e.into())
        }
    }
}
