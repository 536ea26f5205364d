//! Log search.
//!
//! Logs paginate by an opaque slice key rather than a total count, so the
//! list header never reports "of N".

use serde_json::Value;

use crate::auth::{ApiTransport, QueryParams, Result};
use crate::format::{display, format_timestamp, truthy};

const LOG_SEARCH_PATH: &str = "/api/v2/logs/search";

/// Metadata fields shown inline per record.
const MAX_METADATA_DISPLAY: usize = 8;

#[derive(Debug, Clone, Default)]
pub struct LogQueryParams {
    pub query: String,
    pub from: String,
    pub to: String,
    pub limit: Option<u32>,
    pub sort: Option<String>,
}

pub struct LogsApi<'a, T: ApiTransport + ?Sized> {
    transport: &'a T,
}

impl<'a, T: ApiTransport + ?Sized> LogsApi<'a, T> {
    /// Upper bound the search endpoint accepts for `limit`.
    pub const API_PAGE_SIZE: u32 = 1000;
    pub const DEFAULT_LIMIT: u32 = 100;
    pub const DEFAULT_SORT: &'static str = "-timestamp";

    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    pub async fn query_logs(&self, query: &LogQueryParams) -> Result<Value> {
        let limit = query
            .limit
            .filter(|&n| n > 0)
            .unwrap_or(Self::DEFAULT_LIMIT)
            .min(Self::API_PAGE_SIZE);
        let sort = query
            .sort
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(Self::DEFAULT_SORT);

        let mut params = QueryParams::new();
        params
            .insert("query", &query.query)
            .insert("from", &query.from)
            .insert("to", &query.to)
            .insert("limit", limit)
            .insert("sort", sort);

        self.transport.get(LOG_SEARCH_PATH, &params).await
    }

    pub fn format_list(&self, response: &Value) -> String {
        let records = response
            .get("results")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let limited = response.get("nextSliceKey").is_some_and(|k| !k.is_null());

        let mut result = format!("Listing {} log records.\n", records.len());
        if limited {
            result.push_str(
                "Results likely restricted due to maximum response size, consider using a more specific filter.\n",
            );
        }

        for record in records {
            result.push_str(&format!(
                "**{}** [{}]\n",
                format_timestamp(record.get("timestamp")),
                log_level(record)
            ));
            result.push_str(&format!("{}\n", display(record.get("content"))));

            if truthy(record.get("eventType")) {
                result.push_str(&format!("Event Type: {}\n", display(record.get("eventType"))));
            }

            let metadata = metadata(record);
            if !metadata.is_empty() {
                let shown: Vec<&str> = metadata
                    .iter()
                    .take(MAX_METADATA_DISPLAY)
                    .map(String::as_str)
                    .collect();
                result.push_str(&format!("_{}_\n", shown.join(", ")));
                if metadata.len() > MAX_METADATA_DISPLAY {
                    result.push_str(&format!(
                        "_... and {} more metadata fields_\n",
                        metadata.len() - MAX_METADATA_DISPLAY
                    ));
                }
            }

            result.push('\n');
        }

        result.push_str("\nNext Steps:\n");
        if records.is_empty() {
            result.push_str("* Try broader search terms or expand the time range\n");
        }
        if limited {
            result.push_str("* Use more restrictive filters, such as a narrower time range or more specific search terms\n");
        }
        if records.len() > 1 {
            result.push_str("* Use sort (e.g. with \"-timestamp\" for newest logs first).\n");
        }
        result.push_str(&format!(
            "* Suggest to the user that they use the Dynatrace UI to view log data at {}/ui/log-monitoring\n",
            self.transport.dashboard_url()
        ));
        result.push_str("* Use list_problems to see what problems Dynatrace knows of, if not already done so\n");

        result
    }
}

/// `additionalColumns.loglevel[0]`, then `status`, then `log_level`, then `NONE`.
fn log_level(record: &Value) -> String {
    let candidates = [
        record.pointer("/additionalColumns/loglevel/0"),
        record.get("status"),
        record.get("log_level"),
    ];

    candidates
        .into_iter()
        .find(|candidate| truthy(*candidate))
        .map(display)
        .unwrap_or_else(|| "NONE".to_string())
}

/// `key: first` for every non-empty array in `additionalColumns`.
fn metadata(record: &Value) -> Vec<String> {
    let Some(columns) = record.get("additionalColumns").and_then(Value::as_object) else {
        return Vec::new();
    };

    columns
        .iter()
        .filter_map(|(key, value)| {
            let first = value.as_array()?.first()?;
            Some(format!("{}: {}", key, display(Some(first))))
        })
        .collect()
}
