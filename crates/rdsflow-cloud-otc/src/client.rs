//! Token-authenticated JSON-over-HTTP client

use crate::error::{OtcError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Thin wrapper around `reqwest::Client` that attaches the session token and
/// turns non-2xx responses into [`OtcError::Api`]
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    token: String,
}

impl ApiClient {
    pub fn new(http: reqwest::Client, token: impl Into<String>) -> Self {
        Self {
            http,
            token: token.into(),
        }
    }

    /// GET `url` with `query` and decode the JSON body
    pub async fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        tracing::debug!("GET {} {:?}", url, query);
        let request = self
            .http
            .get(url)
            .query(query)
            .header("X-Auth-Token", &self.token)
            .header("X-Language", "en-us");
        self.send(url, request).await
    }

    /// POST `body` as JSON to `url` and decode the JSON response
    pub async fn post<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!("POST {}", url);
        let request = self
            .http
            .post(url)
            .json(body)
            .header("X-Auth-Token", &self.token)
            .header("X-Language", "en-us");
        self.send(url, request).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        tracing::debug!(status = status.as_u16(), body = %text, "response from {}", url);

        if !status.is_success() {
            return Err(OtcError::Api {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        serde_json::from_str(&text).map_err(|e| OtcError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

/// Best-effort human-readable message from an error response body
///
/// Understands the RDS (`error_msg`), Keystone (`error.message`) and
/// Neutron (`NeutronError.message`) shapes and falls back to the raw body.
pub fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        let trimmed = body.trim();
        return if trimmed.is_empty() {
            "empty response body".to_string()
        } else {
            trimmed.to_string()
        };
    };

    let candidates = [
        value.get("error_msg"),
        value.get("error").and_then(|e| e.get("message")),
        value.get("NeutronError").and_then(|e| e.get("message")),
        value.get("message"),
    ];

    let message = candidates
        .into_iter()
        .flatten()
        .find_map(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string());

    match value.get("error_code").and_then(Value::as_str) {
        Some(code) => format!("{} ({})", message, code),
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(
            error_message(r#"{"error_code":"DBS.200001","error_msg":"Invalid parameter."}"#),
            "Invalid parameter. (DBS.200001)"
        );
        assert_eq!(
            error_message(r#"{"error":{"code":401,"message":"Unauthorized"}}"#),
            "Unauthorized"
        );
        assert_eq!(
            error_message(r#"{"NeutronError":{"message":"Bad filter","type":"HTTPBadRequest"}}"#),
            "Bad filter"
        );
        assert_eq!(error_message("upstream timed out"), "upstream timed out");
        assert_eq!(error_message(""), "empty response body");
    }
}
