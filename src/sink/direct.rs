//! Direct seeding over the network, one upsert call per batch

use crate::config::ConnectionConfig;
use crate::error::{ConfigError, SinkError, UpsertError};
use crate::schema::UPDATED_AT;
use crate::sink::{Failure, RowSink, SinkInput, SinkReport};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Something that can upsert rows into a table
pub trait UpsertClient {
    /// Upsert `rows` into `table`, merging rows whose `conflict_key`
    /// already exists
    fn upsert(
        &self,
        table: &str,
        conflict_key: &str,
        rows: &[Map<String, Value>],
    ) -> Result<(), UpsertError>;
}

/// PostgREST (Supabase REST) upsert client
pub struct RestClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl RestClient {
    pub fn new(config: &ConnectionConfig) -> Result<Self, UpsertError> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(&config.service_key)?);
        headers.insert(
            AUTHORIZATION,
            header_value(&format!("Bearer {}", config.service_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "prefer",
            HeaderValue::from_static("resolution=merge-duplicates,return=minimal"),
        );

        let client = reqwest::blocking::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(RestClient {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, table: &str, conflict_key: &str) -> String {
        format!(
            "{}/rest/v1/{}?on_conflict={}",
            self.base_url, table, conflict_key
        )
    }
}

impl UpsertClient for RestClient {
    fn upsert(
        &self,
        table: &str,
        conflict_key: &str,
        rows: &[Map<String, Value>],
    ) -> Result<(), UpsertError> {
        let resp = self
            .client
            .post(self.endpoint(table, conflict_key))
            .json(rows)
            .send()?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().unwrap_or_default();
        Err(UpsertError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

fn header_value(value: &str) -> Result<HeaderValue, UpsertError> {
    HeaderValue::from_str(value)
        .map_err(|_| UpsertError::Other("credential is not a valid header value".to_string()))
}

/// Sends rows in fixed-size batches, strictly one after another.
///
/// A failed batch is recorded against each of its rows and the run moves
/// on; batches are never retried.
pub struct DirectSink<C: UpsertClient> {
    client: C,
    batch_size: usize,
}

impl<C: UpsertClient> DirectSink<C> {
    pub fn new(client: C, batch_size: usize) -> Result<Self, ConfigError> {
        if batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        Ok(DirectSink { client, batch_size })
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: UpsertClient> RowSink for DirectSink<C> {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn consume(&mut self, input: &SinkInput<'_>) -> Result<SinkReport, SinkError> {
        let table = &input.schema.table;
        let conflict_key = &input.schema.conflict_key;
        let batches = input.rows.len().div_ceil(self.batch_size);
        let mut report = SinkReport::default();

        // Stands in for the `updated_at = NOW()` of the SQL path
        let stamp = input
            .schema
            .touch_updated_at
            .then(|| Value::String(input.context.generated_at_rfc3339()));

        for (idx, batch) in input.rows.chunks(self.batch_size).enumerate() {
            let payload: Vec<Map<String, Value>> = batch
                .iter()
                .map(|row| {
                    let mut obj = row.to_json();
                    if let Some(stamp) = &stamp {
                        obj.insert(UPDATED_AT.to_string(), stamp.clone());
                    }
                    obj
                })
                .collect();

            match self.client.upsert(table, conflict_key, &payload) {
                Ok(()) => {
                    report.written += batch.len();
                    info!(batch = idx + 1, of = batches, rows = batch.len(), "upserted batch");
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!(batch = idx + 1, of = batches, error = %message, "batch failed");
                    report.failures.extend(batch.iter().map(|row| Failure {
                        key: row.key.clone(),
                        message: message.clone(),
                    }));
                }
            }
        }

        Ok(report)
    }
}
