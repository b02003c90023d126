use crate::core::error::Result;
use crate::core::types::{TableRequest, TableResponse};
use async_trait::async_trait;

/// Abstraction for the HTTP round trip of a batch request.
///
/// Implementations own signing, retries and the connection; the codec only
/// builds the request and reads the response.
#[async_trait]
pub trait TableTransport: Send + Sync {
    /// Send a request and return the complete response.
    async fn send(&self, request: TableRequest) -> Result<TableResponse>;
}
