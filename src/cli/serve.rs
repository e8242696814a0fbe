//! Serve CLI command.

use crate::Result;
use crate::services::ServiceContainer;

/// Runs the HTTP surface on `port`.
///
/// # Errors
///
/// Returns an error if the server fails to start.
#[cfg(feature = "http")]
pub async fn serve(container: &ServiceContainer, port: u16) -> Result<()> {
    crate::http::serve(container, port).await
}

/// Runs the HTTP surface (feature not enabled).
///
/// # Errors
///
/// Always fails: the binary was built without the `http` feature.
#[cfg(not(feature = "http"))]
#[allow(clippy::unused_async)]
pub async fn serve(_container: &ServiceContainer, _port: u16) -> Result<()> {
    Err(crate::Error::InvalidInput(
        "metaport was built without the http feature".to_string(),
    ))
}
