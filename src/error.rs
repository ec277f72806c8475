use crate::config::ConfigError;
use crate::gateway::signer::SigningError;
use crate::gateway::GatewayError;
use crate::http::HttpError;
use crate::mapper::MapperError;
use crate::profile::ProfileError;
use thiserror::Error;

/// Central error type for the opensearch-cli application
#[derive(Debug, Error)]
pub enum AppError {
    /// Config file could not be read or written
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Profile lookup or maintenance failed
    #[error(transparent)]
    Profile(#[from] ProfileError),
    /// Request could not be built, signed, sent or was answered with an error
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// `curl` arguments did not validate
    #[error(transparent)]
    Mapper(#[from] MapperError),
    /// HTTP transport could not be created
    #[error(transparent)]
    Http(#[from] HttpError),
    /// Neither a profile nor `OPENSEARCH_ENDPOINT` names a cluster
    #[error("no profile found to connect to a cluster")]
    NoProfile,
    /// An interactive answer could not be read
    #[error("failed to read input: {0}")]
    Input(#[from] std::io::Error),
    /// Interrupted by the user
    #[error("interrupted")]
    Interrupted,
}

impl AppError {
    /// Provides a helpful suggestion for how to fix the error
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            AppError::NoProfile => Some(
                "Run 'opensearch-cli profile create' to add a profile, or set OPENSEARCH_ENDPOINT",
            ),
            AppError::Profile(ProfileError::NotFound(_)) => {
                Some("Run 'opensearch-cli profile list' to see available profiles")
            }
            AppError::Profile(ProfileError::InvalidEndpoint(_))
            | AppError::Gateway(GatewayError::InvalidEndpoint(_)) => {
                Some("Endpoints must include the protocol, e.g. https://localhost:9200")
            }
            AppError::Mapper(MapperError::InvalidHeader(_)) => {
                Some("Example: --headers 'content-type: application/json; x-opaque-id: cli'")
            }
            AppError::Mapper(MapperError::InvalidData(_)) => {
                Some("Example: --data '{\"query\":{\"match_all\":{}}}' or --data @query.json")
            }
            AppError::Gateway(GatewayError::Signing(SigningError::MissingRegion)) => {
                Some("Example: export AWS_REGION=us-east-1")
            }
            AppError::Gateway(GatewayError::Transport(HttpError::Network(_))) => Some(
                "Check that the cluster is reachable, or raise OPENSEARCH_TIMEOUT / OPENSEARCH_MAX_RETRY",
            ),
            _ => None,
        }
    }
}
