//! Linode v4 API client — the production [`CloudProvider`] adapter.
//!
//! Requests are plain blocking HTTP; every call the session makes is already
//! a synchronization point, so there is nothing to overlap.

use anyhow::Result;
use serde_json::{Value, json};

use crate::application::ports::{CloudProvider, CreateSpec};
use crate::domain::{ImageStatus, InstanceStatus, ProviderError, VmHandle};

/// Production API endpoint.
const DEFAULT_API_URL: &str = "https://api.linode.com/v4";

/// Environment override for the API base URL (used by tests).
const API_URL_ENV: &str = "LINODE_API_URL";

/// HTTP client for the Linode v4 API.
pub struct LinodeClient {
    base_url: String,
    token: String,
}

impl LinodeClient {
    /// Create a client for the production API, honoring the `LINODE_API_URL`
    /// override.
    #[must_use]
    pub fn new(token: String) -> Self {
        let base_url = std::env::var(API_URL_ENV).unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::with_base_url(token, base_url)
    }

    /// Create a client against an explicit base URL (used in tests).
    #[must_use]
    pub fn with_base_url(token: String, base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Send one request and parse the response body as JSON. An empty body
    /// (DELETE returns one) parses as `Value::Null`.
    fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ProviderError> {
        let url = format!("{}{path}", self.base_url);
        let req = ureq::request(method, &url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Content-Type", "application/json");

        let result = match body {
            Some(v) => req.send_string(&v.to_string()),
            None => req.call(),
        };

        match result {
            Ok(resp) => {
                let text = resp
                    .into_string()
                    .map_err(|e| ProviderError::Transport(e.to_string()))?;
                if text.trim().is_empty() {
                    return Ok(Value::Null);
                }
                serde_json::from_str(&text)
                    .map_err(|e| ProviderError::Malformed(format!("invalid JSON body: {e}")))
            }
            Err(ureq::Error::Status(code, resp)) => Err(ProviderError::Api {
                status: code,
                reason: api_reason(resp),
            }),
            Err(e) => Err(ProviderError::Transport(e.to_string())),
        }
    }
}

impl CloudProvider for LinodeClient {
    async fn create_instance(&self, spec: &CreateSpec<'_>) -> Result<VmHandle> {
        let body = json!({
            "label": spec.label,
            "type": spec.instance_type,
            "region": spec.region,
            "image": spec.image,
            "root_pass": spec.root_password,
            "booted": true,
        });
        let resp = self.request("POST", "/linode/instances", Some(&body))?;
        let id = resp["id"].as_u64().ok_or_else(|| {
            ProviderError::Malformed("instance create response has no id".to_string())
        })?;
        Ok(VmHandle {
            id,
            status: InstanceStatus::parse(resp["status"].as_str().unwrap_or_default()),
            ip: first_ipv4(&resp),
            root_password: spec.root_password.to_string(),
        })
    }

    async fn instance_status(&self, id: u64) -> Result<(InstanceStatus, Option<String>)> {
        let resp = self.request("GET", &format!("/linode/instances/{id}"), None)?;
        let status = InstanceStatus::parse(resp["status"].as_str().unwrap_or_default());
        Ok((status, first_ipv4(&resp)))
    }

    async fn delete_instance(&self, id: u64) -> Result<()> {
        self.request("DELETE", &format!("/linode/instances/{id}"), None)?;
        Ok(())
    }

    async fn snapshot_disk(&self, id: u64, label: &str) -> Result<String> {
        let disks = self.request("GET", &format!("/linode/instances/{id}/disks"), None)?;
        let disk_id = disks["data"]
            .as_array()
            .and_then(|d| d.first())
            .and_then(|d| d["id"].as_u64())
            .ok_or_else(|| ProviderError::Malformed(format!("instance {id} has no disks")))?;
        let body = json!({ "disk_id": disk_id, "label": label });
        let resp = self.request("POST", "/images", Some(&body))?;
        let image_id = resp["id"].as_str().ok_or_else(|| {
            ProviderError::Malformed("image create response has no id".to_string())
        })?;
        Ok(image_id.to_string())
    }

    async fn image_status(&self, image_id: &str) -> Result<ImageStatus> {
        let resp = self.request("GET", &format!("/images/{image_id}"), None)?;
        Ok(ImageStatus::parse(resp["status"].as_str().unwrap_or_default()))
    }
}

/// First public IPv4 address in an instance body, if any.
fn first_ipv4(body: &Value) -> Option<String> {
    body["ipv4"]
        .as_array()
        .and_then(|a| a.first())
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Extract human-readable reasons from a Linode error body
/// (`{"errors": [{"reason": "..."}]}`), falling back to the HTTP status.
fn api_reason(resp: ureq::Response) -> String {
    let fallback = format!("HTTP {}", resp.status());
    let Ok(text) = resp.into_string() else {
        return fallback;
    };
    let Ok(body) = serde_json::from_str::<Value>(&text) else {
        return fallback;
    };
    let reasons: Vec<&str> = body["errors"]
        .as_array()
        .map(|errs| {
            errs.iter()
                .filter_map(|e| e["reason"].as_str())
                .collect()
        })
        .unwrap_or_default();
    if reasons.is_empty() {
        fallback
    } else {
        reasons.join("; ")
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
