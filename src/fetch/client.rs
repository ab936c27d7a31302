use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes the HTTP requests used to download a visit export.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
