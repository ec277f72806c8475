//! Cluster-level operations: the generic `curl` passthrough and distinct
//! field values.

use super::{default_headers, Gateway, GatewayError};
use crate::http::{HttpBackend, HttpError};
use crate::mapper::CurlRequest;
use ::http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

const SEARCH: &str = "_search";

#[derive(Debug, Serialize)]
struct DistinctValuesQuery<'a> {
    size: u32,
    aggs: Aggregations<'a>,
}

#[derive(Debug, Serialize)]
struct Aggregations<'a> {
    items: TermsAggregation<'a>,
}

#[derive(Debug, Serialize)]
struct TermsAggregation<'a> {
    terms: Terms<'a>,
}

#[derive(Debug, Serialize)]
struct Terms<'a> {
    field: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    aggregations: AggregationResults,
}

#[derive(Debug, Deserialize)]
struct AggregationResults {
    items: Buckets,
}

#[derive(Debug, Deserialize)]
struct Buckets {
    buckets: Vec<Bucket>,
}

#[derive(Debug, Deserialize)]
struct Bucket {
    key: Value,
}

/// Gateway for requests that are not tied to a plugin
pub struct PlatformGateway<B: HttpBackend + Send + Sync> {
    gateway: Gateway<B>,
}

impl<B: HttpBackend + Send + Sync> PlatformGateway<B> {
    pub fn new(gateway: Gateway<B>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Gateway<B> {
        &self.gateway
    }

    /// Endpoint with its path and query replaced
    fn url(&self, path: &str, query: &str) -> Url {
        let mut url = self.gateway.endpoint().clone();
        url.set_path(path);
        url.set_query((!query.is_empty()).then_some(query));
        url
    }

    /// Sends a mapped `curl` request and returns the raw response body.
    pub async fn curl(&self, request: CurlRequest) -> Result<Vec<u8>, GatewayError> {
        let url = self.url(&request.path, &request.query_params);
        let mut headers = default_headers();
        headers.extend(request.headers);
        debug!(method = %request.action, url = %url, "curl");
        let http_request =
            self.gateway
                .build_raw_request(request.action, request.data, url.as_str(), &headers)?;
        self.gateway.execute(http_request).await
    }

    /// Distinct values of `field` across `index`, from a terms aggregation.
    pub async fn distinct_values(&self, index: &str, field: &str) -> Result<Vec<Value>, GatewayError> {
        let url = self.url(&format!("{index}/{SEARCH}"), "");
        let query = DistinctValuesQuery {
            size: 0,
            aggs: Aggregations {
                items: TermsAggregation {
                    terms: Terms { field },
                },
            },
        };
        let request =
            self.gateway
                .build_request(Method::GET, Some(&query), url.as_str(), &default_headers())?;
        let body = self.gateway.execute(request).await?;
        let response: SearchResponse = serde_json::from_slice(&body)
            .map_err(|e| HttpError::Parse(format!("unexpected search response: {e}")))?;
        Ok(response
            .aggregations
            .items
            .buckets
            .into_iter()
            .map(|bucket| bucket.key)
            .collect())
    }
}
