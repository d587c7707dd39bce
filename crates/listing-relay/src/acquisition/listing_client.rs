//! Vendor listing API client.

use super::http_client::HttpClient;
use crate::error::{RelayError, Result};
use crate::resolution::url_resolver::ResolvedKey;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Raw listing object as returned by the vendor.
pub type ListingRecord = Map<String, Value>;

/// Anything that can look up a listing by its resolved key.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_listing(&self, key: &ResolvedKey) -> Result<ListingRecord>;
}

/// `GET {api_url}?mlsid=&address=&domain=` with bearer auth.
#[derive(Debug, Clone)]
pub struct ListingClient {
    client: HttpClient,
    api_url: String,
    token: String,
}

impl ListingClient {
    pub fn new(client: HttpClient, api_url: &str, token: &str) -> Self {
        Self {
            client,
            api_url: api_url.to_string(),
            token: token.to_string(),
        }
    }
}

#[async_trait]
impl ListingSource for ListingClient {
    async fn fetch_listing(&self, key: &ResolvedKey) -> Result<ListingRecord> {
        let query = [
            ("mlsid", key.mls_id.as_str()),
            ("address", key.address.as_str()),
            ("domain", key.domain.as_str()),
        ];
        let resp = self
            .client
            .get_authorized(&self.api_url, &self.token, &query)
            .await?;

        if !resp.is_success() {
            return Err(RelayError::network(
                &self.api_url,
                format!("status {}: {}", resp.status, resp.text()),
            ));
        }

        parse_listing_body(&resp.body, key)
    }
}

/// Pull the `listing` object out of a vendor response body.
pub fn parse_listing_body(body: &[u8], key: &ResolvedKey) -> Result<ListingRecord> {
    let mut doc: Value = serde_json::from_slice(body)
        .map_err(|e| RelayError::Parse(format!("listing response: {e}")))?;

    let listing = doc.get_mut("listing").map(Value::take).unwrap_or(Value::Null);
    if !is_truthy(&listing) {
        return Err(RelayError::NotFound(format!(
            "mlsid={} address={} domain={}",
            key.mls_id, key.address, key.domain
        )));
    }

    match listing {
        Value::Object(map) => Ok(map),
        other => Err(RelayError::Parse(format!(
            "listing is not an object: {other}"
        ))),
    }
}

/// Loose truthiness: null, false, zero and empty containers are falsy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn key() -> ResolvedKey {
        ResolvedKey {
            domain: "www.example.com".into(),
            mls_id: "H6255197".into(),
            address: "253 Merrick Avenue".into(),
        }
    }

    #[test]
    fn test_parse_listing_body() {
        let body = br#"{"listing": {"status": "sold", "photos": []}}"#;
        let listing = parse_listing_body(body, &key()).unwrap();
        assert_eq!(listing.get("status").unwrap(), "sold");
    }

    #[test]
    fn test_falsy_listing_is_not_found() {
        for body in [
            r#"{}"#,
            r#"{"listing": null}"#,
            r#"{"listing": false}"#,
            r#"{"listing": {}}"#,
            r#"{"listing": []}"#,
        ] {
            let err = parse_listing_body(body.as_bytes(), &key()).unwrap_err();
            assert!(matches!(err, RelayError::NotFound(_)), "{body}");
        }
    }

    #[test]
    fn test_bad_json_and_non_object_listing_are_parse_errors() {
        let err = parse_listing_body(b"<html>", &key()).unwrap_err();
        assert!(matches!(err, RelayError::Parse(_)));

        let err = parse_listing_body(br#"{"listing": "yes"}"#, &key()).unwrap_err();
        assert!(matches!(err, RelayError::Parse(_)));
    }

    #[tokio::test]
    async fn test_fetch_listing_sends_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/listing"))
            .and(header("authorization", "Bearer secret"))
            .and(query_param("mlsid", "H6255197"))
            .and(query_param("address", "253 Merrick Avenue"))
            .and(query_param("domain", "www.example.com"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"listing": {"price": 1}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ListingClient::new(
            HttpClient::new(Duration::from_secs(5)).unwrap(),
            &format!("{}/listing", server.uri()),
            "secret",
        );
        let listing = client.fetch_listing(&key()).await.unwrap();
        assert_eq!(listing.get("price").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_non_success_status_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = ListingClient::new(
            HttpClient::new(Duration::from_secs(5)).unwrap(),
            &server.uri(),
            "bad",
        );
        let err = client.fetch_listing(&key()).await.unwrap_err();
        assert!(matches!(err, RelayError::Network { .. }));
    }
}
