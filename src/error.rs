use crate::catalog::CatalogError;
use crate::config::ConfigError;

/// Errors surfaced while handling DNS requests.
#[derive(Debug, thiserror::Error)]
pub enum HickoryError {
    #[error("Received a response as a request message")]
    ResponseAsRequest,
}

/// Errors which prevent the resolver service from starting.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("initial zone fetch failed: {0}")]
    Seed(#[source] CatalogError),
}
