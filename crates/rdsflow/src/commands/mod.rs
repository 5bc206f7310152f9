pub mod create;
pub mod logs;
pub mod restore;

use rdsflow_cloud_otc::{Credentials, OtcProvider};
use rdsflow_config::CloudSettings;

/// Log in with the resolved settings
pub async fn connect(settings: &CloudSettings) -> anyhow::Result<OtcProvider> {
    let credentials = Credentials {
        auth_url: settings.auth_url.clone(),
        user_domain_name: settings.user_domain_name.clone().unwrap_or_default(),
        username: settings.username.clone().unwrap_or_default(),
        password: settings
            .password
            .as_ref()
            .map(|p| p.expose().to_string())
            .unwrap_or_default(),
        project_name: settings.project_name.clone(),
        region: settings.region.clone(),
    };

    let provider = OtcProvider::connect(&credentials).await?;
    Ok(provider)
}
