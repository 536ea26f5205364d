use serde_json::Value;

use crate::auth::{ApiTransport, QueryParams, Result};
use crate::capabilities::{detail_block, ListEnvelope, MAX_NESTED_DISPLAY};
use crate::format::{capped_join, compact_json, display, truthy};

const METRICS_PATH: &str = "/api/v2/metrics";
const METRICS_QUERY_PATH: &str = "/api/v2/metrics/query";

/// Datapoints rendered per series.
const MAX_DATA_POINTS: usize = 50;

/// Filters for the metric catalogue.
#[derive(Debug, Clone, Default)]
pub struct MetricListParams {
    pub entity_selector: Option<String>,
    pub metadata_selector: Option<String>,
    pub text: Option<String>,
    pub fields: Option<String>,
    pub page_size: Option<u32>,
    pub next_page_key: Option<String>,
    pub written_since: Option<String>,
}

/// A datapoint query. `resolution` defaults to `Inf` (one value per series).
#[derive(Debug, Clone, Default)]
pub struct MetricQueryParams {
    pub metric_selector: String,
    pub resolution: Option<String>,
    pub from: String,
    pub to: String,
    pub entity_selector: Option<String>,
}

pub struct MetricsApi<'a, T: ApiTransport + ?Sized> {
    transport: &'a T,
}

impl<'a, T: ApiTransport + ?Sized> MetricsApi<'a, T> {
    pub const API_PAGE_SIZE: u32 = 500;
    pub const DEFAULT_RESOLUTION: &'static str = "Inf";

    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    pub async fn list_available_metrics(&self, query: &MetricListParams) -> Result<Value> {
        let mut params = QueryParams::new();
        params
            .insert(
                "pageSize",
                query
                    .page_size
                    .filter(|&n| n > 0)
                    .unwrap_or(Self::API_PAGE_SIZE),
            )
            .insert_opt("entitySelector", query.entity_selector.as_deref())
            .insert_opt("metadataSelector", query.metadata_selector.as_deref())
            .insert_opt("text", query.text.as_deref())
            .insert_opt("fields", query.fields.as_deref())
            .insert_opt("writtenSince", query.written_since.as_deref())
            .insert_opt("nextPageKey", query.next_page_key.as_deref());

        self.transport.get(METRICS_PATH, &params).await
    }

    pub async fn get_metric_details(&self, metric_id: &str) -> Result<Value> {
        let path = format!("{}/{}", METRICS_PATH, urlencoding::encode(metric_id));
        self.transport.get(&path, &QueryParams::new()).await
    }

    pub async fn query_metrics(&self, query: &MetricQueryParams) -> Result<Value> {
        let resolution = query
            .resolution
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(Self::DEFAULT_RESOLUTION);

        let mut params = QueryParams::new();
        params
            .insert("metricSelector", &query.metric_selector)
            .insert("resolution", resolution)
            .insert("from", &query.from)
            .insert("to", &query.to)
            .insert_opt("entitySelector", query.entity_selector.as_deref());

        self.transport.get(METRICS_QUERY_PATH, &params).await
    }

    pub fn format_metric_list(&self, response: &Value) -> String {
        let envelope = ListEnvelope::from_response(response, "metrics");
        let limited = envelope.is_limited();

        let mut result = envelope.header("metrics");
        if limited {
            result.push_str(
                "Not showing all matching metrics. Consider using more specific filters to get complete results.\n",
            );
        }

        for metric in envelope.items {
            result.push_str(&format!("metricId: {}\n", display(metric.get("metricId"))));
            for key in ["displayName", "description", "unit"] {
                if truthy(metric.get(key)) {
                    result.push_str(&format!("  {}: {}\n", key, display(metric.get(key))));
                }
            }

            if let Some(aggregations) = non_empty_array(metric.get("aggregationTypes")) {
                let labels: Vec<String> = aggregations.iter().map(|a| display(Some(a))).collect();
                result.push_str(&format!("  aggregationTypes: {}\n", labels.join(", ")));
            }

            if let Some(dimensions) = non_empty_array(metric.get("dimensionDefinitions")) {
                let names = dimensions.iter().map(|d| display(d.get("name")));
                result.push_str(&format!(
                    "  dimensions: {}\n",
                    capped_join(names, MAX_NESTED_DISPLAY)
                ));
            }

            result.push('\n');
        }

        let base = self.transport.dashboard_url();
        result.push_str("\nNext Steps:\n");
        if envelope.shown() == 0 {
            result.push_str("* Verify that the filters were correct, and search again with different filters\n");
        }
        if limited {
            result.push_str(
                "* To filter the list of metrics, use list_available_metrics tool with sorting and with specific filters (e.g. entitySelector and searchText).\n",
            );
        }
        result.push_str("* Use get_metric_details tool for detailed information of a particular metric.\n");
        result.push_str("* Suggest to the user that they use the Dynatrace UI to:\n");
        result.push_str(&format!("   * Browse the list of metrics at {}/ui/metrics\n", base));
        result.push_str(&format!("   * View metric data at {}/ui/data-explorer\n", base));

        result
    }

    pub fn format_metric_details(&self, response: &Value) -> String {
        let guidance = format!(
            "* Suggest to the user that they use the Dynatrace UI to view metric data at {}/ui/data-explorer\n",
            self.transport.dashboard_url()
        );
        detail_block("Details of metric in the following json.", response, &guidance)
    }

    pub fn format_metric_data(&self, response: &Value) -> String {
        let results = non_empty_array(response.get("result")).unwrap_or(&[]);
        let has_data = results
            .first()
            .and_then(|first| non_empty_array(first.get("data")))
            .is_some();

        let mut result = String::from("Listing data series");
        if has_data {
            result.push_str(", each with timestamped datapoints of the form timestamp: value, timestamp: value, ...\n");
        } else {
            result.push_str(" (no datapoints found)\n");
        }

        if truthy(response.get("resolution")) {
            result.push_str(&format!("resolution: {}\n", display(response.get("resolution"))));
        }

        for metric in results {
            let series = metric
                .get("data")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            result.push_str(&format!("Listing {} data series\n", series.len()));
            result.push_str(&format!("metricId: {}\n", display(metric.get("metricId"))));

            for entry in series {
                result.push_str(&format_series(entry));
                result.push('\n');
            }
        }

        result.push_str("\nNext Steps:\n");
        if has_data {
            result.push_str(
                "* Use query_metrics_data with more specific filters, such as a narrower time range with to and from, and an entitySelector\n",
            );
        } else {
            result.push_str("* Verify that the filters were correct, and search again with different filters\n");
        }
        result.push_str(&format!(
            "* Suggest to the user that they use the Dynatrace UI to view metric data at {}/ui/data-explorer\n",
            self.transport.dashboard_url()
        ));

        result
    }
}

fn non_empty_array(value: Option<&Value>) -> Option<&[Value]> {
    value
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
        .map(Vec::as_slice)
}

/// One data series: dimensions, then up to [`MAX_DATA_POINTS`] `ts: value` pairs.
fn format_series(entry: &Value) -> String {
    let mut out = String::new();

    if truthy(entry.get("dimensionMap")) {
        out.push_str(&format!("  dimensionData: {}\n", compact_json(&entry["dimensionMap"])));
    }
    if truthy(entry.get("dimensions")) {
        out.push_str(&format!("  dimensions: {}\n", compact_json(&entry["dimensions"])));
    }

    let timestamps = entry
        .get("timestamps")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    let values = entry
        .get("values")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    if timestamps.is_empty() {
        out.push_str("  No datapoints\n");
        return out;
    }

    let datapoints = timestamps
        .iter()
        .zip(values)
        .map(|(ts, value)| format!("{}: {}", display(Some(ts)), display(Some(value))));
    out.push_str(&format!(
        "  timestamped datapoints: {}\n",
        capped_join(datapoints, MAX_DATA_POINTS)
    ));
    out
}
