use std::fmt;
use std::path::Path;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::{WrapError, WrapResult};

const TOKEN_HEADER: &str = "X-Ephemeral-Token-Authorization";

// vm.json carries appId as a number; a quoted id is accepted too
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AppId {
    Number(u64),
    Text(String),
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppId::Number(id) => write!(f, "{id}"),
            AppId::Text(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VmIdentity {
    app_id: AppId,
}

#[derive(Debug, Deserialize)]
pub struct Application {
    pub(crate) name: String,
    pub(crate) deployment: Option<Deployment>,
}

impl Application {
    /// VMs of the published deployment; empty if the application was never published.
    pub fn vms(&self) -> &[Vm] {
        self.deployment
            .as_ref()
            .map(|d| d.vms.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub struct Deployment {
    #[serde(default)]
    pub(crate) vms: Vec<Vm>,
}

#[derive(Debug, Deserialize)]
pub struct Vm {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
}

/// Read the application id of the VM we are running on.
pub async fn read_vm_identity(path: &Path) -> WrapResult<AppId> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| WrapError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let identity: VmIdentity = serde_json::from_str(&raw).map_err(|source| WrapError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(identity.app_id)
}

/// Fetch the application from the platform API.
///
/// Returns `Ok(None)` when the API answers with anything but `200 OK`.
#[instrument(skip(config))]
pub async fn fetch_application(config: &Config, app_id: &AppId) -> WrapResult<Option<Application>> {
    let full_url = format!(
        "{}/applications/{}",
        config.api_url.trim_end_matches('/'),
        app_id
    );

    let mut request_header = HeaderMap::new();
    request_header.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    request_header.insert(ACCEPT, HeaderValue::from_static("application/json"));
    let mut token =
        HeaderValue::from_str(&config.token).map_err(|_| WrapError::InvalidToken)?;
    token.set_sensitive(true);
    request_header.insert(TOKEN_HEADER, token);

    debug!("Requesting application from Ravello: {}", full_url);
    let client = reqwest::Client::new();
    let response = client.get(full_url).headers(request_header).send().await?;

    if response.status() != StatusCode::OK {
        debug!(status = %response.status(), "application lookup failed");
        return Ok(None);
    }

    let app = response.json::<Application>().await?;
    debug!("Application {} has {} VMs", app.name, app.vms().len());

    Ok(Some(app))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::io::Write;

    fn config(api_url: String) -> Config {
        Config {
            api_url,
            token: "eph-token-123".to_string(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn identity_accepts_numeric_app_id() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"appId": 91947131, "vmId": 42}}"#).unwrap();

        let app_id = read_vm_identity(file.path()).await.unwrap();
        assert_eq!(app_id, AppId::Number(91947131));
        assert_eq!(app_id.to_string(), "91947131");
    }

    #[tokio::test]
    async fn identity_accepts_string_app_id() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"appId": "91947131"}}"#).unwrap();

        let app_id = read_vm_identity(file.path()).await.unwrap();
        assert_eq!(app_id.to_string(), "91947131");
    }

    #[tokio::test]
    async fn identity_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vm.json");

        let err = read_vm_identity(&path).await.unwrap_err();
        assert!(matches!(err, WrapError::Io { .. }));
        assert!(err.to_string().contains("vm.json"), "error was: {err}");
    }

    #[tokio::test]
    async fn identity_without_app_id_is_json_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"vmId": 42}}"#).unwrap();

        let err = read_vm_identity(file.path()).await.unwrap_err();
        assert!(matches!(err, WrapError::Json { .. }));
    }

    #[tokio::test]
    async fn fetch_sends_token_header() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v1/applications/12345")
                    .header("X-Ephemeral-Token-Authorization", "eph-token-123")
                    .header("Accept", "application/json")
                    .header("Content-Type", "application/json");
                then.status(200).json_body(json!({
                    "id": 12345,
                    "name": "ocp-lab",
                    "deployment": {
                        "vms": [
                            {"name": "master", "description": "ipmiaddr:10.0.0.5\nipmipw:secret"},
                            {"name": "bastion"}
                        ]
                    }
                }));
            })
            .await;

        let config = config(server.url("/api/v1"));
        let app = fetch_application(&config, &AppId::Number(12345))
            .await
            .unwrap()
            .unwrap();

        mock.assert_hits_async(1).await;
        assert_eq!(app.name, "ocp-lab");
        assert_eq!(app.vms().len(), 2);
        assert_eq!(app.vms()[1].description, None);
    }

    #[tokio::test]
    async fn fetch_non_ok_status_is_none() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/applications/999");
                then.status(404);
            })
            .await;

        let config = config(server.base_url());
        let app = fetch_application(&config, &AppId::Number(999)).await.unwrap();

        mock.assert_hits_async(1).await;
        assert!(app.is_none());
    }

    #[tokio::test]
    async fn fetch_malformed_body_is_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/applications/7");
                then.status(200).body("not json");
            })
            .await;

        let config = config(server.base_url());
        let err = fetch_application(&config, &AppId::Number(7))
            .await
            .unwrap_err();
        assert!(matches!(err, WrapError::Http(_)));
    }

    #[tokio::test]
    async fn fetch_rejects_unprintable_token() {
        let config = Config {
            token: "bad\ntoken".to_string(),
            ..config("http://127.0.0.1:9".to_string())
        };
        let err = fetch_application(&config, &AppId::Number(1))
            .await
            .unwrap_err();
        assert!(matches!(err, WrapError::InvalidToken));
    }
}
