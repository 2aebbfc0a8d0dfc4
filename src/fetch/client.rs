use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes prepared requests; lets tests and alternative transports stand in
/// for the default client when inputs are remote.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
