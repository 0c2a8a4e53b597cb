//! Interface to the external resource host that provisions per-team
//! workspaces. Treated as an opaque, slow, fallible collaborator.

pub mod http;

use futures::future::BoxFuture;
use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::{ExternalDeployStatus, SessionStamp};

pub use self::http::HttpGameHost;

/// Result alias for host operations.
pub type HostResult<T> = Result<T, HostError>;

/// Error raised while talking to the external resource host.
#[derive(Debug, Error)]
pub enum HostError {
    /// The HTTP client could not be built.
    #[error("failed to build host client")]
    ClientBuilder(#[source] reqwest::Error),
    /// The request could not be sent or the response not read.
    #[error("host request failed: {operation}")]
    Request {
        /// Operation being attempted (deploy, start, ping).
        operation: &'static str,
        /// Underlying transport failure.
        #[source]
        source: reqwest::Error,
    },
    /// The host answered with a non-success status.
    #[error("host rejected {operation} with status {status}")]
    Status {
        /// Operation being attempted.
        operation: &'static str,
        /// HTTP status returned.
        status: reqwest::StatusCode,
    },
    /// The host reported a failed deployment for one team.
    #[error("deployment failed for team {team_id}: {message}")]
    DeployFailed {
        /// Team whose resources could not be provisioned.
        team_id: Uuid,
        /// Host-supplied failure detail.
        message: String,
    },
}

/// Outcome of a single per-team deployment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployResult {
    /// Team whose resources were deployed.
    pub team_id: Uuid,
    /// Status reported by the host once the request returned.
    pub status: ExternalDeployStatus,
}

/// Operations offered by the external resource host.
pub trait GameHost: Send + Sync {
    /// Provision (or re-provision) the resources backing one team's session.
    fn deploy(
        &self,
        game_id: Uuid,
        team_id: Uuid,
    ) -> BoxFuture<'static, HostResult<DeployResult>>;
    /// Tell the host that the listed teams' sessions are live for `window`.
    fn start_game(
        &self,
        game_id: Uuid,
        team_ids: Vec<Uuid>,
        window: SessionStamp,
    ) -> BoxFuture<'static, HostResult<()>>;
    /// Cheap connectivity probe used by the host supervisor.
    fn ping(&self) -> BoxFuture<'static, HostResult<()>>;
}
