//! DMI MetObs observation API client.

use std::time::Duration;

use serde_json::Value;
use tracing::instrument;

use dmi_core::config::DEFAULT_API_URL;
use dmi_core::MetObsConfig;

use crate::error::MetObsError;
use crate::types::{Observation, ObservationParameter, Station};

const USER_AGENT: &str = concat!("dmi-bridge/", env!("CARGO_PKG_VERSION"));

/// String field of an upstream row; numbers are accepted and rendered.
fn text_field(row: &Value, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Microsecond timestamp of an upstream row, tolerating float encodings.
fn timestamp_field(row: &Value, key: &str) -> Option<i64> {
    let field = row.get(key)?;
    field
        .as_i64()
        .or_else(|| field.as_f64().map(|micros| micros as i64))
}

pub struct MetObsClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for MetObsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetObsClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl MetObsClient {
    /// Client for the public DMI gateway, without a request timeout.
    pub fn new(api_key: &str) -> Result<Self, MetObsError> {
        Self::build(api_key, DEFAULT_API_URL, None)
    }

    /// Client against another gateway (mirrors, test servers).
    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self, MetObsError> {
        Self::build(api_key, base_url, None)
    }

    pub fn from_config(config: &MetObsConfig) -> Result<Self, MetObsError> {
        Self::build(
            &config.api_key,
            &config.api_url,
            config.request_timeout_secs.map(Duration::from_secs),
        )
    }

    fn build(api_key: &str, base_url: &str, timeout: Option<Duration>) -> Result<Self, MetObsError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn observation_url(&self) -> String {
        format!("{}/observation", self.base_url)
    }

    /// Fetch the latest observation of `parameter` at `station`.
    ///
    /// A single attempt: no retry, no backoff.
    #[instrument(skip(self, station), fields(station = %station.api_id()), level = "debug")]
    pub async fn fetch_latest(
        &self,
        parameter: ObservationParameter,
        station: &Station,
    ) -> Result<Observation, MetObsError> {
        let station_id = station.api_id();

        let response = self
            .client
            .get(self.observation_url())
            .query(&[
                ("latest", ""),
                ("parameterId", parameter.as_str()),
                ("stationId", station_id.as_str()),
                ("api-key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MetObsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let rows: Vec<Value> = serde_json::from_str(&body)
            .map_err(|e| MetObsError::Parse(format!("JSON parse error: {}", e)))?;

        tracing::debug!("Received {} observation rows", rows.len());

        // Only the first row is read; the rest may hold anything.
        let first = rows.first().ok_or(MetObsError::MissingValue)?;
        let value = match first.get("value") {
            None | Some(Value::Null) => return Err(MetObsError::MissingValue),
            Some(v) => v
                .as_f64()
                .ok_or_else(|| MetObsError::Parse(format!("Non-numeric value: {}", v)))?,
        };

        let echoed = first
            .get("parameterId")
            .and_then(Value::as_str)
            .map(str::parse::<ObservationParameter>);
        let parameter_id = match echoed {
            Some(Ok(echoed)) if echoed != parameter => {
                tracing::warn!("Requested '{}' but API answered with '{}'", parameter, echoed);
                echoed
            }
            Some(Ok(echoed)) => echoed,
            Some(Err(e)) => {
                tracing::warn!("{}", e);
                parameter
            }
            None => parameter,
        };

        Ok(Observation {
            id: text_field(first, "_id").unwrap_or_default(),
            parameter_id,
            station_id: text_field(first, "stationId").unwrap_or(station_id),
            time_created: timestamp_field(first, "timeCreated"),
            time_observed: timestamp_field(first, "timeObserved"),
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn aarhus() -> Station {
        Station::new(6074, "Aarhus")
    }

    #[tokio::test]
    async fn test_fetch_latest_builds_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/observation"))
            .and(query_param("latest", ""))
            .and(query_param("parameterId", "humidity"))
            .and(query_param("stationId", "06074"))
            .and(query_param("api-key", "test_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "_id": "a",
                    "parameterId": "humidity",
                    "stationId": "06074",
                    "timeCreated": 0,
                    "timeObserved": 0,
                    "value": 88
                }
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = MetObsClient::with_base_url("test_key", &mock_server.uri()).unwrap();
        let obs = client
            .fetch_latest(ObservationParameter::Humidity, &aarhus())
            .await
            .unwrap();

        assert_eq!(obs.id, "a");
        assert_eq!(obs.parameter_id, ObservationParameter::Humidity);
        assert_eq!(obs.station_id, "06074");
        assert_eq!(obs.value, 88.0);
    }

    #[tokio::test]
    async fn test_only_first_row_is_used() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/observation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "value": 7.2 },
                { "value": 9.9 }
            ])))
            .mount(&mock_server)
            .await;

        let client = MetObsClient::with_base_url("k", &mock_server.uri()).unwrap();
        let obs = client
            .fetch_latest(ObservationParameter::TempDry, &aarhus())
            .await
            .unwrap();

        assert_eq!(obs.value, 7.2);
        assert_eq!(obs.parameter_id, ObservationParameter::TempDry);
        assert_eq!(obs.station_id, "06074");
    }

    #[tokio::test]
    async fn test_unused_rows_and_loose_fields_are_tolerated() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "value": 7.2, "stationId": 6074, "timeCreated": 1.6e15 },
                { "value": "n/a", "stationId": null }
            ])))
            .mount(&mock_server)
            .await;

        let client = MetObsClient::with_base_url("k", &mock_server.uri()).unwrap();
        let obs = client
            .fetch_latest(ObservationParameter::TempDry, &aarhus())
            .await
            .unwrap();

        assert_eq!(obs.value, 7.2);
        assert_eq!(obs.station_id, "6074");
        assert_eq!(obs.time_created, Some(1_600_000_000_000_000));
        assert_eq!(obs.time_observed, None);
    }

    #[tokio::test]
    async fn test_empty_array_is_missing_value() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&mock_server)
            .await;

        let client = MetObsClient::with_base_url("k", &mock_server.uri()).unwrap();
        let result = client
            .fetch_latest(ObservationParameter::TempDry, &aarhus())
            .await;

        assert!(matches!(result, Err(MetObsError::MissingValue)));
    }

    #[tokio::test]
    async fn test_row_without_value_is_missing_value() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([{ "_id": "x" }])),
            )
            .mount(&mock_server)
            .await;

        let client = MetObsClient::with_base_url("k", &mock_server.uri()).unwrap();
        let result = client
            .fetch_latest(ObservationParameter::TempDry, &aarhus())
            .await;

        assert!(matches!(result, Err(MetObsError::MissingValue)));
    }

    #[tokio::test]
    async fn test_error_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("invalid api-key"))
            .mount(&mock_server)
            .await;

        let client = MetObsClient::with_base_url("bad", &mock_server.uri()).unwrap();
        let result = client
            .fetch_latest(ObservationParameter::Humidity, &aarhus())
            .await;

        assert!(matches!(
            result,
            Err(MetObsError::Api { status: 403, ref message }) if message == "invalid api-key"
        ));
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "type": "FeatureCollection"
            })))
            .mount(&mock_server)
            .await;

        let client = MetObsClient::with_base_url("k", &mock_server.uri()).unwrap();
        let result = client
            .fetch_latest(ObservationParameter::Humidity, &aarhus())
            .await;

        assert!(matches!(result, Err(MetObsError::Parse(_))));
    }

    #[test]
    fn test_observation_url_trims_trailing_slash() {
        let client = MetObsClient::with_base_url("k", "http://localhost:1234/metObs/v1/").unwrap();
        assert_eq!(
            client.observation_url(),
            "http://localhost:1234/metObs/v1/observation"
        );
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = MetObsClient::new("super-secret").unwrap();
        assert!(!format!("{:?}", client).contains("super-secret"));
    }
}
