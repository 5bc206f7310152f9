//! Keystone v3 password authentication
//!
//! Exchanges user credentials for a project-scoped token and reads the
//! service catalog that comes with it.

use crate::error::{OtcError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Credentials and scope for a Keystone v3 password login
#[derive(Clone)]
pub struct Credentials {
    /// Identity endpoint, e.g. `https://iam.eu-de.otc.t-systems.com:443/v3`
    pub auth_url: String,
    pub user_domain_name: String,
    pub username: String,
    pub password: String,
    pub project_name: String,
    pub region: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_url", &self.auth_url)
            .field("user_domain_name", &self.user_domain_name)
            .field("username", &self.username)
            .field("project_name", &self.project_name)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    fn check(&self) -> Result<()> {
        if self.username.is_empty() {
            return Err(OtcError::MissingCredential("OS_USERNAME"));
        }
        if self.password.is_empty() {
            return Err(OtcError::MissingCredential("OS_PASSWORD"));
        }
        if self.user_domain_name.is_empty() {
            return Err(OtcError::MissingCredential("OS_USER_DOMAIN_NAME"));
        }
        Ok(())
    }
}

/// An authenticated, project-scoped session
#[derive(Clone)]
pub struct Session {
    pub token: String,
    pub project_id: String,
    catalog: Vec<CatalogEntry>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("project_id", &self.project_id)
            .field("services", &self.catalog.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Public endpoint URL of `service_type` in `region`, with any project
    /// placeholder substituted and without a trailing slash
    pub fn endpoint(&self, service_type: &str, region: &str) -> Option<String> {
        let entry = self.catalog.iter().find(|e| e.service_type == service_type)?;
        let endpoint = entry
            .endpoints
            .iter()
            .filter(|e| e.interface == "public")
            .find(|e| e.serves(region))?;

        let mut url = endpoint.url.trim_end_matches('/').to_string();
        for placeholder in [
            "$(tenant_id)s",
            "%(tenant_id)s",
            "$(project_id)s",
            "%(project_id)s",
        ] {
            url = url.replace(placeholder, &self.project_id);
        }
        Some(url)
    }
}

/// Log in with `credentials` and return a session
pub async fn authenticate(http: &reqwest::Client, credentials: &Credentials) -> Result<Session> {
    credentials.check()?;

    let url = format!("{}/auth/tokens", credentials.auth_url.trim_end_matches('/'));
    let body = AuthRequest::password(credentials);

    tracing::debug!("POST {} (user {})", url, credentials.username);
    let response = http.post(&url).json(&body).send().await?;
    let status = response.status();

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(OtcError::AuthenticationFailed(format!(
            "HTTP {}: {}",
            status.as_u16(),
            crate::client::error_message(&text)
        )));
    }

    let token = response
        .headers()
        .get("X-Subject-Token")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| {
            OtcError::AuthenticationFailed("response carries no X-Subject-Token".to_string())
        })?;

    let text = response.text().await?;
    let parsed: TokenResponse = serde_json::from_str(&text).map_err(|e| OtcError::Decode {
        url: url.clone(),
        message: e.to_string(),
    })?;

    let project_id = parsed
        .token
        .project
        .map(|p| p.id)
        .ok_or_else(|| OtcError::AuthenticationFailed("token is not project scoped".to_string()))?;

    tracing::debug!(
        "Authenticated against project {} ({} catalog entries)",
        project_id,
        parsed.token.catalog.len()
    );

    Ok(Session {
        token,
        project_id,
        catalog: parsed.token.catalog,
    })
}

// ============ API Types ============

#[derive(Debug, Serialize)]
struct AuthRequest<'a> {
    auth: AuthBody<'a>,
}

#[derive(Debug, Serialize)]
struct AuthBody<'a> {
    identity: Identity<'a>,
    scope: Scope<'a>,
}

#[derive(Debug, Serialize)]
struct Identity<'a> {
    methods: [&'static str; 1],
    password: PasswordMethod<'a>,
}

#[derive(Debug, Serialize)]
struct PasswordMethod<'a> {
    user: User<'a>,
}

#[derive(Serialize)]
struct User<'a> {
    name: &'a str,
    password: &'a str,
    domain: Named<'a>,
}

impl fmt::Debug for User<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User").field("name", &self.name).finish()
    }
}

#[derive(Debug, Serialize)]
struct Scope<'a> {
    project: ScopedProject<'a>,
}

#[derive(Debug, Serialize)]
struct ScopedProject<'a> {
    name: &'a str,
    domain: Named<'a>,
}

#[derive(Debug, Serialize)]
struct Named<'a> {
    name: &'a str,
}

impl<'a> AuthRequest<'a> {
    fn password(c: &'a Credentials) -> Self {
        Self {
            auth: AuthBody {
                identity: Identity {
                    methods: ["password"],
                    password: PasswordMethod {
                        user: User {
                            name: &c.username,
                            password: &c.password,
                            domain: Named {
                                name: &c.user_domain_name,
                            },
                        },
                    },
                },
                scope: Scope {
                    project: ScopedProject {
                        name: &c.project_name,
                        domain: Named {
                            name: &c.user_domain_name,
                        },
                    },
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: TokenBody,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    project: Option<ProjectRef>,
    #[serde(default)]
    catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct ProjectRef {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogEndpoint {
    #[serde(default)]
    interface: String,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    region_id: Option<String>,
    url: String,
}

impl CatalogEndpoint {
    fn serves(&self, region: &str) -> bool {
        match (&self.region_id, &self.region) {
            (None, None) => true,
            (id, name) => {
                id.as_deref() == Some(region) || name.as_deref() == Some(region)
            }
        }
    }
}
