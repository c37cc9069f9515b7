//! HTTP client for a running EasyFind server, used by the CLI.

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Outcome of a remote login
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteLogin {
    Ok(LoggedIn),
    Refused { reason: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedIn {
    pub token: String,
    pub user_id: u64,
    pub name: String,
    pub role: String,
    pub redirect: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
}

pub struct RemoteClient {
    base_url: String,
    http: Client,
}

impl RemoteClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn login(&self, email: &str, password: &str, role: &str) -> Result<RemoteLogin> {
        tracing::debug!(url = %self.base_url, "remote login");
        let resp = self
            .http
            .post(self.url("/login"))
            .json(&json!({ "email": email, "password": password, "role": role }))
            .send()
            .map_err(|e| anyhow!("Failed to reach {}: {}", self.base_url, e))?;

        match resp.status() {
            s if s.is_success() => Ok(RemoteLogin::Ok(resp.json()?)),
            StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST => {
                let body: ErrorBody = resp.json()?;
                Ok(RemoteLogin::Refused {
                    reason: body.error,
                    message: body.message,
                })
            }
            s => Err(anyhow!("Unexpected status from /login: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalized() {
        let client = RemoteClient::new("http://localhost:6000/").unwrap();
        assert_eq!(client.url("/login"), "http://localhost:6000/login");
    }

    #[test]
    fn test_logged_in_deserialize() {
        let json = r#"{"token":"t","userId":3,"name":"Dr. Rohit Mehta","role":"provider","redirect":"/provider/dashboard"}"#;
        let logged: LoggedIn = serde_json::from_str(json).unwrap();
        assert_eq!(logged.user_id, 3);
        assert_eq!(logged.redirect, "/provider/dashboard");
    }
}
