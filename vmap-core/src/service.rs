//! Feature-service wire format: request parameters for the `query` and
//! `queryTopFeatures` endpoints and decoding of their JSON responses.
//!
//! The HTTP client itself ([`FeatureServiceClient`]) is only built with the
//! `api` feature; everything else is plain data shaping and is usable (and
//! tested) without it.

use crate::error::QueryError;
use crate::query::{StatisticsQuery, TopFeaturesQuery};
use crate::stats_record::StatsRecord;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use vmap_utils::dates::{date_to_epoch_millis, end_of_day_epoch_millis, epoch_millis_to_date};

#[cfg(feature = "api")]
use crate::traits::FeatureSource;
#[cfg(feature = "api")]
use async_trait::async_trait;
#[cfg(feature = "api")]
use log::{debug, info};
#[cfg(feature = "api")]
use reqwest::Client;

/// WHO vaccination layer the map was built around.
pub const DEFAULT_SERVICE_URL: &str =
    "https://services3.arcgis.com/1FS0hEOLnjHnov75/arcgis/rest/services/WHO_Vaccination_StoryMap/FeatureServer/0";

/// Week-ending date field of the vaccination layer.
pub const DEFAULT_DATE_FIELD: &str = "WeekEndDate";

/// Where the dataset lives and how to reach it.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub url: String,
    pub date_field: String,
    pub timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVICE_URL.to_string(),
            date_field: DEFAULT_DATE_FIELD.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeatureSetResponse {
    #[serde(default)]
    features: Vec<Feature>,
    error: Option<ServiceErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    attributes: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Decode a feature set body into the attribute maps of its features.
///
/// Services report failures inside a 200 response as `{"error": {...}}`;
/// those become [`QueryError::Service`].
pub fn decode_feature_set(body: &str) -> Result<Vec<Map<String, Value>>, QueryError> {
    let response: FeatureSetResponse =
        serde_json::from_str(body).map_err(|e| QueryError::Decode(e.to_string()))?;
    if let Some(error) = response.error {
        return Err(QueryError::Service {
            code: error.code,
            message: error.message,
        });
    }
    Ok(response
        .features
        .into_iter()
        .map(|feature| feature.attributes)
        .collect())
}

/// Decode a `queryTopFeatures` response into the values of `date_field`.
///
/// Dates arrive as epoch milliseconds; `YYYY-MM-DD` strings are accepted too.
pub fn decode_top_dates(body: &str, date_field: &str) -> Result<Vec<NaiveDate>, QueryError> {
    decode_feature_set(body)?
        .iter()
        .map(|attributes| match attributes.get(date_field) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .and_then(epoch_millis_to_date)
                .ok_or_else(|| QueryError::Decode(format!("bad {} value {}", date_field, n))),
            Some(Value::String(s)) => vmap_utils::dates::parse_date(s)
                .map_err(|e| QueryError::Decode(format!("bad {} value {}: {}", date_field, s, e))),
            other => Err(QueryError::Decode(format!(
                "missing {} attribute (got {:?})",
                date_field, other
            ))),
        })
        .collect()
}

/// Decode an `outStatistics` response. Non-numeric attributes are ignored;
/// nulls are kept as absent values.
pub fn decode_statistics(body: &str) -> Result<Vec<StatsRecord>, QueryError> {
    Ok(decode_feature_set(body)?
        .into_iter()
        .map(|attributes| {
            attributes
                .into_iter()
                .filter_map(|(name, value)| match value {
                    Value::Number(n) => Some((name, n.as_f64())),
                    Value::Null => Some((name, None)),
                    _ => None,
                })
                .collect::<StatsRecord>()
        })
        .collect())
}

/// Query-string parameters for `queryTopFeatures`.
pub fn top_features_params(query: &TopFeaturesQuery) -> Vec<(&'static str, String)> {
    let order_by = query.order_by_clause();
    let top_filter = json!({
        "groupByFields": query.date_field,
        "topCount": query.top_count,
        "orderByFields": order_by,
    });
    vec![
        ("where", "1=1".to_string()),
        ("topFilter", top_filter.to_string()),
        ("outFields", query.date_field.clone()),
        ("orderByFields", order_by),
        ("returnGeometry", "false".to_string()),
        ("f", "json".to_string()),
    ]
}

/// Query-string parameters for an `outStatistics` query on `query`'s filter.
pub fn statistics_params(query: &StatisticsQuery) -> Vec<(&'static str, String)> {
    let window = query.filter.time_window;
    let out_statistics = serde_json::to_string(&query.statistics).unwrap_or_default();
    vec![
        ("where", "1=1".to_string()),
        ("outStatistics", out_statistics),
        ("geometry", query.filter.geometry.to_esri_json().to_string()),
        ("geometryType", "esriGeometryEnvelope".to_string()),
        ("spatialRel", "esriSpatialRelIntersects".to_string()),
        ("inSR", crate::geometry::WGS84_WKID.to_string()),
        (
            "time",
            format!(
                "{},{}",
                date_to_epoch_millis(&window.start()),
                end_of_day_epoch_millis(&window.end())
            ),
        ),
        ("returnGeometry", "false".to_string()),
        ("f", "json".to_string()),
    ]
}

/// HTTP client for a feature-service layer.
#[cfg(feature = "api")]
#[derive(Debug, Clone)]
pub struct FeatureServiceClient {
    client: Client,
    config: ServiceConfig,
}

#[cfg(feature = "api")]
impl FeatureServiceClient {
    pub fn new(config: ServiceConfig) -> Result<Self, QueryError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| QueryError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Failures are returned, not logged above `debug!`; the caller decides
    /// how loudly to report them.
    async fn get(&self, endpoint: &str, params: &[(&'static str, String)]) -> Result<String, QueryError> {
        let url = format!("{}/{}", self.config.url.trim_end_matches('/'), endpoint);
        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| {
                debug!("[VMAP] service: request to {} failed: {}", endpoint, e);
                QueryError::Transport(e.to_string())
            })?;
        if !response.status().is_success() {
            debug!(
                "[VMAP] service: bad response status for {}: {}",
                endpoint,
                response.status()
            );
            return Err(QueryError::Transport(format!(
                "HTTP {} from {}",
                response.status(),
                endpoint
            )));
        }
        response
            .text()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))
    }
}

#[cfg(feature = "api")]
#[async_trait]
impl FeatureSource for FeatureServiceClient {
    async fn query_top_features(
        &self,
        query: &TopFeaturesQuery,
    ) -> Result<Vec<NaiveDate>, QueryError> {
        let body = self.get("queryTopFeatures", &top_features_params(query)).await?;
        let dates = decode_top_dates(&body, &query.date_field)?;
        info!(
            "[VMAP] service: queryTopFeatures ({}) returned {} dates",
            query.order_by_clause(),
            dates.len()
        );
        Ok(dates)
    }

    async fn query_statistics(
        &self,
        query: &StatisticsQuery,
    ) -> Result<Vec<StatsRecord>, QueryError> {
        let body = self.get("query", &statistics_params(query)).await?;
        let records = decode_statistics(&body)?;
        info!(
            "[VMAP] service: query ({}) returned {} rows",
            query,
            records.len()
        );
        Ok(records)
    }
}
