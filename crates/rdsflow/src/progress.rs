use indicatif::{ProgressBar, ProgressStyle};
use rdsflow_cloud::JobStatus;
use rdsflow_core::{ProvisionObserver, ProvisionPhase};
use std::time::Duration;

/// Spinner on stderr that follows a create or restore operation
pub struct OperationProgress {
    progress_bar: ProgressBar,
    label: String,
}

impl OperationProgress {
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        let pb = ProgressBar::new_spinner();
        if let Ok(style) =
            ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(120));
        pb.set_message(format!("{}...", label));

        Self {
            progress_bar: pb,
            label,
        }
    }

    pub fn finish_success(&self, detail: &str) {
        self.progress_bar
            .finish_with_message(format!("{} ✓ {}", self.label, detail));
    }

    pub fn finish_error(&self) {
        self.progress_bar
            .abandon_with_message(format!("{} failed", self.label));
    }
}

impl ProvisionObserver for OperationProgress {
    fn on_phase(&self, phase: ProvisionPhase) {
        self.progress_bar
            .set_message(format!("{}: {}", self.label, phase));
    }

    fn on_job_status(&self, job_id: &str, status: &JobStatus, elapsed: Duration) {
        self.progress_bar.set_message(format!(
            "{}: job {} {} ({}s)",
            self.label,
            job_id,
            status,
            elapsed.as_secs()
        ));
    }
}
