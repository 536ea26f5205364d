use serde_json::Value;

use crate::auth::{ApiTransport, QueryParams, Result};
use crate::capabilities::{detail_block, ListEnvelope};
use crate::format::{display, format_timestamp, is_set_time, truthy};

const PROBLEMS_PATH: &str = "/api/v2/problems";

/// Filters for `/api/v2/problems`. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct ProblemQueryParams {
    pub from: Option<String>,
    pub to: Option<String>,
    pub status: Option<String>,
    pub impact_level: Option<String>,
    pub entity_selector: Option<String>,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
}

pub struct ProblemsApi<'a, T: ApiTransport + ?Sized> {
    transport: &'a T,
}

impl<'a, T: ApiTransport + ?Sized> ProblemsApi<'a, T> {
    pub const API_PAGE_SIZE: u32 = 50;

    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    pub async fn list_problems(&self, query: &ProblemQueryParams) -> Result<Value> {
        let mut params = QueryParams::new();
        params
            .insert(
                "pageSize",
                query
                    .page_size
                    .filter(|&n| n > 0)
                    .unwrap_or(Self::API_PAGE_SIZE),
            )
            .insert_opt("from", query.from.as_deref())
            .insert_opt("to", query.to.as_deref())
            .insert_opt("status", query.status.as_deref())
            .insert_opt("impactLevel", query.impact_level.as_deref())
            .insert_opt("entitySelector", query.entity_selector.as_deref())
            .insert_opt("sort", query.sort.as_deref());

        self.transport.get(PROBLEMS_PATH, &params).await
    }

    pub async fn get_problem_details(&self, problem_id: &str) -> Result<Value> {
        let path = format!("{}/{}", PROBLEMS_PATH, urlencoding::encode(problem_id));
        self.transport.get(&path, &QueryParams::new()).await
    }

    pub fn format_list(&self, response: &Value) -> String {
        let envelope = ListEnvelope::from_response(response, "problems");
        let limited = envelope.is_limited();

        let mut result = envelope.header("problems");
        if limited {
            result.push_str(
                "Not showing all matching problems. Consider using more specific filters (status, impactLevel, entitySelector) to get complete results.\n",
            );
        }

        for problem in envelope.items {
            result.push_str(&format!("problemId: {}\n", display(problem.get("problemId"))));
            for key in ["displayId", "title", "status", "severityLevel", "impactLevel"] {
                result.push_str(&format!("  {}: {}\n", key, display(problem.get(key))));
            }
            if truthy(problem.get("startTime")) {
                result.push_str(&format!("  startTime: {}\n", format_timestamp(problem.get("startTime"))));
            }
            if is_set_time(problem.get("endTime")) {
                result.push_str(&format!("  endTime: {}\n", format_timestamp(problem.get("endTime"))));
            }
            result.push('\n');
        }

        let shown = envelope.shown();
        result.push_str("\nNext Steps:\n");
        if shown == 0 {
            result.push_str(
                "* Verify that the filters such as entitySelector and time range were correct, and search again with different filters.\n",
            );
        }
        if limited {
            result.push_str("* Use more restrictive filters, such as a more specific entitySelector.\n");
        }
        if shown > 1 {
            result.push_str("* Use sort (e.g. with \"+status\" for open problems first).\n");
        }
        result.push_str(&format!(
            "* Suggest to the user that they view the problems in the Dynatrace UI at {}/ui/problems\n",
            self.transport.dashboard_url()
        ));
        result.push_str(
            "* If the user is interested in a specific problem, use the get_problem_details tool. Use the problemId (UUID) for detailed analysis.\n",
        );

        result
    }

    pub fn format_details(&self, response: &Value) -> String {
        let guidance = format!(
            "* If the affectedEntities is not empty, suggest to the user that they could investigate those entities further. For example with:\n\
             \x20  * list_events tool, using the affected entity's entityId in the entitySelector.\n\
             \x20  * query_logs tool, for a narrow time range of the problem, searching for logs about that entity.\n\
             * Suggest to the user that they view the problem in the Dynatrace UI {}/#problems/problemdetails;pid=<problemId>, using the problemId in the URL\n",
            self.transport.dashboard_url()
        );
        detail_block("Details of problem in the following json.", response, &guidance)
    }
}
