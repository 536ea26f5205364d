use serde_json::Value;

use crate::auth::{ApiTransport, QueryParams, Result};
use crate::capabilities::{detail_block, ListEnvelope, MAX_NESTED_DISPLAY};
use crate::format::{display, management_zones, truthy};

const SLO_PATH: &str = "/api/v2/slo";

/// Timeframe sent when a custom window is given without an explicit timeframe.
const GLOBAL_TIMEFRAME: &str = "GTF";

/// Filters for `/api/v2/slo`. Boolean flags are only sent when set.
#[derive(Debug, Clone, Default)]
pub struct SloQueryParams {
    pub slo_selector: Option<String>,
    pub time_frame: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub demo: bool,
    pub page_size: Option<u32>,
    pub evaluate: bool,
    pub sort: Option<String>,
    pub enabled_slos: Option<String>,
    pub show_global_slos: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GetSloParams {
    pub id: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub time_frame: Option<String>,
}

pub struct SloApi<'a, T: ApiTransport + ?Sized> {
    transport: &'a T,
}

impl<'a, T: ApiTransport + ?Sized> SloApi<'a, T> {
    pub const API_PAGE_SIZE: u32 = 200;

    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    pub async fn list_slos(&self, query: &SloQueryParams) -> Result<Value> {
        let mut params = QueryParams::new();
        params
            .insert(
                "pageSize",
                query
                    .page_size
                    .filter(|&n| n > 0)
                    .unwrap_or(Self::API_PAGE_SIZE),
            )
            .insert_opt("sloSelector", query.slo_selector.as_deref())
            .insert_opt("timeFrame", query.time_frame.as_deref())
            .insert_opt("from", query.from.as_deref())
            .insert_opt("to", query.to.as_deref())
            .insert_flag("demo", query.demo)
            .insert_flag("evaluate", query.evaluate)
            .insert_opt("enabledSlos", query.enabled_slos.as_deref())
            .insert_flag("showGlobalSlos", query.show_global_slos)
            .insert_opt("sort", query.sort.as_deref());

        self.transport.get(SLO_PATH, &params).await
    }

    /// Fetch one SLO. A `from`/`to` window without a timeframe implies `GTF`.
    pub async fn get_slo_details(&self, query: &GetSloParams) -> Result<Value> {
        let mut params = QueryParams::new();
        params
            .insert_opt("from", query.from.as_deref())
            .insert_opt("to", query.to.as_deref())
            .insert_opt("timeFrame", query.time_frame.as_deref());

        if !params.contains_key("timeFrame") && (params.contains_key("from") || params.contains_key("to")) {
            params.insert("timeFrame", GLOBAL_TIMEFRAME);
        }

        let path = format!("{}/{}", SLO_PATH, urlencoding::encode(&query.id));
        self.transport.get(&path, &params).await
    }

    pub fn format_list(&self, response: &Value) -> String {
        let envelope = ListEnvelope::from_response(response, "slo");
        let limited = envelope.is_limited();

        let mut result = envelope.header("SLOs");
        if limited {
            result.push_str(
                "Not showing all matching SLOs. Consider using more specific filters (sloSelector) to get complete results.\n",
            );
        }

        for slo in envelope.items {
            result.push_str(&format!("id: {}\n", display(slo.get("id"))));
            result.push_str(&format!("  name: {}\n", display(slo.get("name"))));
            if truthy(slo.get("description")) {
                result.push_str(&format!("  description: {}\n", display(slo.get("description"))));
            }
            for key in ["status", "target", "warning", "enabled"] {
                result.push_str(&format!("  {}: {}\n", key, display(slo.get(key))));
            }
            if truthy(slo.get("timeframe")) {
                result.push_str(&format!("  timeframe: {}\n", display(slo.get("timeframe"))));
            }
            if let Some(pct) = evaluated(slo.get("evaluatedPercentage")) {
                result.push_str(&format!("  evaluatedPercentage: {}%\n", display(Some(pct))));
            }
            if let Some(budget) = evaluated(slo.get("errorBudget")) {
                result.push_str(&format!("  error budget: {}%\n", display(Some(budget))));
            }
            if let Some(zones) = management_zones(slo.get("managementZones"), MAX_NESTED_DISPLAY) {
                result.push_str(&format!("  management zones: {}\n", zones));
            }
            result.push('\n');
        }

        let shown = envelope.shown();
        result.push_str("\nNext Steps:\n");
        if shown == 0 {
            result.push_str(
                "* Verify that the filters such as sloSelector were correct, and search again with different filters.\n",
            );
        }
        if limited {
            result.push_str("* Use more restrictive filters, such as a more specific sloSelector and status.\n");
        }
        if shown > 1 {
            result.push_str("* Use sort (e.g. with \"+name\" for ascending alphabetical order).\n");
        }
        result.push_str("* If the user is interested in a specific SLO, use the get_slo_details tool. Use the SLO id for this.\n");
        result.push_str(&format!(
            "* Suggest to the user that they view the SLOs in the Dynatrace UI at {}/ui/slo\n",
            self.transport.dashboard_url()
        ));

        result
    }

    pub fn format_details(&self, response: &Value) -> String {
        let guidance = format!(
            "* Suggest to the user that they view the SLO in the Dynatrace UI at {}/ui/slo/<id>, using the SLO id in the URL\n",
            self.transport.dashboard_url()
        );
        detail_block("Details of SLO in the following json.", response, &guidance)
    }
}

/// An evaluation figure, unless absent or `-1` (not evaluated).
fn evaluated(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null() && v.as_f64() != Some(-1.0))
}
