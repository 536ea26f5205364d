use serde_json::Value;

use crate::auth::{ApiTransport, QueryParams, Result};
use crate::capabilities::{detail_block, ListEnvelope, MAX_NESTED_DISPLAY};
use crate::format::{display, format_timestamp, is_set_time, key_values, management_zones, truthy};

const EVENTS_PATH: &str = "/api/v2/events";

/// Filters for `/api/v2/events`. The time window is required.
#[derive(Debug, Clone, Default)]
pub struct EventQueryParams {
    pub from: String,
    pub to: String,
    pub event_type: Option<String>,
    pub entity_selector: Option<String>,
    pub page_size: Option<u32>,
}

pub struct EventsApi<'a, T: ApiTransport + ?Sized> {
    transport: &'a T,
}

impl<'a, T: ApiTransport + ?Sized> EventsApi<'a, T> {
    pub const API_PAGE_SIZE: u32 = 100;

    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    pub async fn query_events(&self, query: &EventQueryParams) -> Result<Value> {
        let mut params = QueryParams::new();
        params
            .insert("from", &query.from)
            .insert("to", &query.to)
            .insert(
                "pageSize",
                query
                    .page_size
                    .filter(|&n| n > 0)
                    .unwrap_or(Self::API_PAGE_SIZE),
            )
            .insert_opt("eventType", query.event_type.as_deref())
            .insert_opt("entitySelector", query.entity_selector.as_deref());

        self.transport.get(EVENTS_PATH, &params).await
    }

    pub async fn get_event_details(&self, event_id: &str) -> Result<Value> {
        let path = format!("{}/{}", EVENTS_PATH, urlencoding::encode(event_id));
        self.transport.get(&path, &QueryParams::new()).await
    }

    pub fn format_list(&self, response: &Value) -> String {
        let envelope = ListEnvelope::from_response(response, "events");
        let limited = envelope.is_limited();

        let mut result = envelope.header("events");
        if limited {
            result.push_str(
                "Not showing all matching events. Consider using more specific filters (eventType, entitySelector) to get complete results.\n",
            );
        }

        for event in envelope.items {
            result.push_str(&format!("eventId: {}\n", display(event.get("eventId"))));
            result.push_str(&format!("  eventType: {}\n", display(event.get("eventType"))));
            result.push_str(&format!("  status: {}\n", display(event.get("status"))));
            result.push_str(&format!("  title: {}\n", display(event.get("title"))));

            if truthy(event.get("description")) {
                result.push_str(&format!("  {}\n", display(event.get("description"))));
            }
            if is_set_time(event.get("startTime")) {
                result.push_str(&format!("  startTime: {}\n", format_timestamp(event.get("startTime"))));
            }
            if is_set_time(event.get("endTime")) {
                result.push_str(&format!("  endTime: {}\n", format_timestamp(event.get("endTime"))));
            }
            if truthy(event.get("severityLevel")) {
                result.push_str(&format!("  severityLevel: {}\n", display(event.get("severityLevel"))));
            }
            if truthy(event.get("impactLevel")) {
                result.push_str(&format!("  impactLevel: {}\n", display(event.get("impactLevel"))));
            }
            if let Some(props) = key_values(event.get("properties"), MAX_NESTED_DISPLAY) {
                result.push_str(&format!("  Properties: {}\n", props));
            }
            if let Some(zones) = management_zones(event.get("managementZones"), MAX_NESTED_DISPLAY) {
                result.push_str(&format!("  Management Zones: {}\n", zones));
            }

            result.push('\n');
        }

        let shown = envelope.shown();
        result.push_str("\nNext Steps:\n");
        if shown == 0 {
            result.push_str(
                "* Try broader search terms or expand the time range; if using an entitySelector, check with discover_entities which entities that matches.\n",
            );
        }
        if limited {
            result.push_str("* Use more restrictive filters, such as a narrower time range or more specific search terms.\n");
        }
        if shown > 0 {
            result.push_str(
                "* If the user is interested in a specific event, use the get_event_details tool. Use the event id for this.\n",
            );
        }
        result.push_str(&format!(
            "* Suggest to the user that they use the Dynatrace UI to view events at {}/ by navigating to the relevant entity\n",
            self.transport.dashboard_url()
        ));
        result.push_str("* Use list_problems to see what problems Dynatrace knows of, if not already done so.\n");

        result
    }

    pub fn format_details(&self, response: &Value) -> String {
        let guidance = format!(
            "* Suggest to the user that they explore this further in the Dynatrace UI at {}/\n\
             * Use list_problems to see what problems Dynatrace knows of, if not already done so.\n",
            self.transport.dashboard_url()
        );
        detail_block("Event details in the following json:", response, &guidance)
    }
}
