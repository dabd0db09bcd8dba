//! Reverse-geocoding over HTTP.
//!
//! Request shape: `GET <base>?output=json&location=<lat>,<lon>` (the `ak`
//! credential is added by [`super::auth::UrlParam`]). The service answers
//! with a JSON body whose `result.formatted_address` is the address and
//! whose `status` is `0` on success.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::ReverseGeocoder;
use super::client::HttpClient;
use super::retry::{DEFAULT_ATTEMPTS, DEFAULT_BACKOFF, with_retry};
use crate::error::LookupError;

#[derive(Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    status: i64,
    #[serde(default)]
    message: Option<String>,
    result: Option<ReverseResult>,
}

#[derive(Deserialize)]
struct ReverseResult {
    formatted_address: Option<String>,
}

pub struct HttpGeocoder<C> {
    client: C,
    base_url: String,
    attempts: u32,
    backoff: Duration,
}

impl<C: HttpClient> HttpGeocoder<C> {
    pub fn new(client: C, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            attempts: DEFAULT_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    fn request(&self, lat: f64, lon: f64) -> Result<reqwest::Request, LookupError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| LookupError::Response(format!("invalid geocoder URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("output", "json")
            .append_pair("location", &format!("{lat},{lon}"));
        Ok(reqwest::Request::new(reqwest::Method::GET, url))
    }

    async fn lookup_once(&self, lat: f64, lon: f64) -> Result<String, LookupError> {
        let resp = self.client.execute(self.request(lat, lon)?).await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let body = resp.text().await?;
        parse_response(&body)
    }
}

#[async_trait]
impl<C: HttpClient> ReverseGeocoder for HttpGeocoder<C> {
    #[tracing::instrument(skip(self))]
    async fn lookup(&self, lat: f64, lon: f64) -> Result<String, LookupError> {
        let address = with_retry(self.attempts, self.backoff, || self.lookup_once(lat, lon)).await?;
        debug!(%address, "Reverse geocoded");
        Ok(address)
    }
}

/// Extracts `result.formatted_address` from a response body.
pub fn parse_response(body: &str) -> Result<String, LookupError> {
    let parsed: ReverseResponse = serde_json::from_str(body)
        .map_err(|e| LookupError::Response(format!("not valid JSON: {e}")))?;

    if parsed.status != 0 {
        return Err(LookupError::Response(format!(
            "service status {}: {}",
            parsed.status,
            parsed.message.as_deref().unwrap_or("no message")
        )));
    }

    parsed
        .result
        .and_then(|r| r.formatted_address)
        .ok_or_else(|| LookupError::Response("missing result.formatted_address".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::BasicClient;
    use crate::geocode::auth::UrlParam;
    use crate::geocode::stub::ScriptedClient;

    const BASE: &str = "http://api.example.com/reverse_geocoding/v3/";
    const OK_BODY: &str = r#"{"status":0,"result":{"formatted_address":"湖北省武汉市江汉区"}}"#;

    #[test]
    fn test_parses_formatted_address() {
        let body = r#"{"status":0,"result":{"formatted_address":"湖北省武汉市江汉区解放大道","location":{"lng":114.3,"lat":30.6}}}"#;
        assert_eq!(parse_response(body).unwrap(), "湖北省武汉市江汉区解放大道");
    }

    #[test]
    fn test_missing_address_is_error() {
        let body = r#"{"status":0,"result":{}}"#;
        assert!(matches!(parse_response(body), Err(LookupError::Response(_))));
    }

    #[test]
    fn test_service_status_is_error() {
        let body = r#"{"status":240,"message":"APP 服务被禁用"}"#;
        match parse_response(body) {
            Err(LookupError::Response(msg)) => assert!(msg.contains("240")),
            other => panic!("expected response error, got {other:?}"),
        }
    }

    #[test]
    fn test_garbage_body_is_error() {
        assert!(parse_response("<html>").is_err());
    }

    #[test]
    fn test_request_shape() {
        let client = BasicClient::with_timeout(Duration::from_secs(1)).unwrap();
        let geocoder = HttpGeocoder::new(client, "http://api.example.com/reverse_geocoding/v3/");
        let req = geocoder.request(30.6, 114.3).unwrap();

        assert_eq!(*req.method(), reqwest::Method::GET);
        assert_eq!(
            req.url().as_str(),
            "http://api.example.com/reverse_geocoding/v3/?output=json&location=30.6%2C114.3"
        );
    }

    #[tokio::test]
    async fn test_lookup_sends_credential_and_parses_address() {
        let client = UrlParam::ak(ScriptedClient::new([(200, OK_BODY)]), "KEY");
        let geocoder = HttpGeocoder::new(client, BASE);

        let address = geocoder.lookup(30.6, 114.3).await.unwrap();

        assert_eq!(address, "湖北省武汉市江汉区");
        assert_eq!(
            geocoder.client.inner.urls(),
            vec![format!("{BASE}?output=json&location=30.6%2C114.3&ak=KEY")]
        );
    }

    #[tokio::test]
    async fn test_non_success_status_is_status_error() {
        let geocoder = HttpGeocoder::new(ScriptedClient::new([(404, "")]), BASE);

        let result = geocoder.lookup(30.6, 114.3).await;

        assert!(matches!(result, Err(LookupError::Status(404))));
        assert_eq!(geocoder.client.urls().len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_service_is_retried() {
        let geocoder = HttpGeocoder::new(ScriptedClient::new([(503, ""), (200, OK_BODY)]), BASE);

        let address = geocoder.lookup(30.6, 114.3).await.unwrap();

        assert_eq!(address, "湖北省武汉市江汉区");
        assert_eq!(geocoder.client.urls().len(), 2);
    }

    #[tokio::test]
    async fn test_single_attempt_reports_first_failure() {
        let geocoder =
            HttpGeocoder::new(ScriptedClient::new([(503, ""), (200, OK_BODY)]), BASE).with_attempts(1);

        let result = geocoder.lookup(30.6, 114.3).await;

        assert!(matches!(result, Err(LookupError::Status(503))));
        assert_eq!(geocoder.client.urls().len(), 1);
    }
}
