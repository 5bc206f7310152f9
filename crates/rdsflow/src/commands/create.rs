use crate::progress::OperationProgress;
use rdsflow_config::{CloudSettings, InstanceSpec};
use rdsflow_core::{ProvisionOptions, Provisioner};
use std::path::PathBuf;

pub async fn handle(
    settings: &CloudSettings,
    config: Option<PathBuf>,
    options: ProvisionOptions,
) -> anyhow::Result<()> {
    let path = rdsflow_config::find_instance_file(config.as_deref())?;
    tracing::debug!(path = %path.display(), "Loading instance document");
    let spec = InstanceSpec::load(&path)?;

    let provider = super::connect(settings).await?;

    let progress = OperationProgress::new(format!("Creating {}", spec.name));
    let result = Provisioner::new(&provider)
        .with_options(options)
        .with_observer(&progress)
        .create(&spec)
        .await;

    match result {
        Ok(report) => {
            progress.finish_success(&report.instance.id);
            println!("{}", report.address);
            Ok(())
        }
        Err(e) => {
            progress.finish_error();
            Err(e.into())
        }
    }
}
