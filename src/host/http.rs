use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::HostSettings;
use crate::dao::models::{ExternalDeployStatus, SessionStamp};
use crate::host::{DeployResult, GameHost, HostError, HostResult};

/// HTTP client for the external resource host's REST API.
#[derive(Clone)]
pub struct HttpGameHost {
    client: Client,
    base_url: Arc<str>,
    api_key: Option<Arc<str>>,
}

impl HttpGameHost {
    /// Build a client from the configured host settings.
    pub fn new(settings: &HostSettings) -> HostResult<Self> {
        let client = Client::builder().build().map_err(HostError::ClientBuilder)?;
        Ok(Self {
            client,
            base_url: Arc::<str>::from(settings.base_url.trim_end_matches('/')),
            api_key: settings.api_key.as_deref().map(Arc::<str>::from),
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("x-api-key", key.as_ref()),
            None => builder,
        }
    }
}

#[derive(Serialize)]
struct DeployRequestBody {
    game_id: Uuid,
    team_id: Uuid,
}

#[derive(Deserialize)]
struct DeployResponseBody {
    status: ExternalDeployStatus,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Serialize)]
struct StartGameBody {
    team_ids: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    session_begin: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    session_end: OffsetDateTime,
}

impl GameHost for HttpGameHost {
    fn deploy(
        &self,
        game_id: Uuid,
        team_id: Uuid,
    ) -> BoxFuture<'static, HostResult<DeployResult>> {
        let this = self.clone();
        Box::pin(async move {
            let response = this
                .request(Method::POST, "deployments")
                .json(&DeployRequestBody { game_id, team_id })
                .send()
                .await
                .map_err(|source| HostError::Request {
                    operation: "deploy",
                    source,
                })?;

            if !response.status().is_success() {
                return Err(HostError::Status {
                    operation: "deploy",
                    status: response.status(),
                });
            }

            let body: DeployResponseBody =
                response.json().await.map_err(|source| HostError::Request {
                    operation: "deploy",
                    source,
                })?;

            if body.status == ExternalDeployStatus::Failed {
                return Err(HostError::DeployFailed {
                    team_id,
                    message: body.message.unwrap_or_else(|| "unspecified".into()),
                });
            }

            Ok(DeployResult {
                team_id,
                status: body.status,
            })
        })
    }

    fn start_game(
        &self,
        game_id: Uuid,
        team_ids: Vec<Uuid>,
        window: SessionStamp,
    ) -> BoxFuture<'static, HostResult<()>> {
        let this = self.clone();
        Box::pin(async move {
            let response = this
                .request(Method::PUT, &format!("games/{game_id}/start"))
                .json(&StartGameBody {
                    team_ids,
                    session_begin: window.begin,
                    session_end: window.end,
                })
                .send()
                .await
                .map_err(|source| HostError::Request {
                    operation: "start",
                    source,
                })?;

            match response.status() {
                status if status.is_success() => Ok(()),
                status => Err(HostError::Status {
                    operation: "start",
                    status,
                }),
            }
        })
    }

    fn ping(&self) -> BoxFuture<'static, HostResult<()>> {
        let this = self.clone();
        Box::pin(async move {
            let response =
                this.request(Method::GET, "ping")
                    .send()
                    .await
                    .map_err(|source| HostError::Request {
                        operation: "ping",
                        source,
                    })?;

            match response.status() {
                StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
                status => Err(HostError::Status {
                    operation: "ping",
                    status,
                }),
            }
        })
    }
}
