use crate::geocode::client::HttpClient;
use async_trait::async_trait;

/// An [`HttpClient`] wrapper that appends a credential as a URL query parameter.
///
/// The reverse-geocoding service authenticates with `ak=<key>`; see
/// [`UrlParam::ak`]. An empty key is not sent.
pub struct UrlParam<C> {
    pub inner: C,
    pub param_name: String,
    pub key: String,
}

impl<C> UrlParam<C> {
    pub fn ak(inner: C, key: impl Into<String>) -> Self {
        Self {
            inner,
            param_name: "ak".to_string(),
            key: key.into(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for UrlParam<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        if !self.key.is_empty() {
            req.url_mut()
                .query_pairs_mut()
                .append_pair(&self.param_name, &self.key);
        }
        self.inner.execute(req).await
    }
}
