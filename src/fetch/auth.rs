use super::client::HttpClient;
use crate::error::SourceError;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that sends a credential header with every request.
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    value: HeaderValue,
}

impl<C> ApiKey<C> {
    /// Uses `Authorization: Bearer <token>`.
    ///
    /// The token is validated up front so requests cannot fail on a bad
    /// header later.
    pub fn bearer(inner: C, token: &str) -> Result<Self, SourceError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| SourceError::InvalidToken)?;
        value.set_sensitive(true);

        Ok(Self {
            inner,
            header_name: AUTHORIZATION,
            value,
        })
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(self.header_name.clone(), self.value.clone());
        self.inner.execute(req).await
    }
}
