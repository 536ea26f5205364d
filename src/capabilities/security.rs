//! Third-party and code-level vulnerabilities.

use serde_json::Value;

use crate::auth::{ApiTransport, QueryParams, Result};
use crate::capabilities::{detail_block, ListEnvelope, MAX_NESTED_DISPLAY};
use crate::format::{capped_join, display, format_timestamp, truthy};

const SECURITY_PROBLEMS_PATH: &str = "/api/v2/securityProblems";

#[derive(Debug, Clone, Default)]
pub struct SecurityProblemQueryParams {
    pub risk_level: Option<String>,
    /// Translated into a `securityProblemSelector` clause.
    pub status: Option<String>,
    pub entity_selector: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
}

pub struct SecurityApi<'a, T: ApiTransport + ?Sized> {
    transport: &'a T,
}

impl<'a, T: ApiTransport + ?Sized> SecurityApi<'a, T> {
    pub const API_PAGE_SIZE: u32 = 200;

    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    pub async fn list_security_problems(&self, query: &SecurityProblemQueryParams) -> Result<Value> {
        let selector = query
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|status| format!("status(\"{}\")", status));

        let mut params = QueryParams::new();
        params
            .insert(
                "pageSize",
                query
                    .page_size
                    .filter(|&n| n > 0)
                    .unwrap_or(Self::API_PAGE_SIZE),
            )
            .insert_opt("riskLevel", query.risk_level.as_deref())
            .insert_opt("securityProblemSelector", selector)
            .insert_opt("entitySelector", query.entity_selector.as_deref())
            .insert_opt("from", query.from.as_deref())
            .insert_opt("to", query.to.as_deref())
            .insert_opt("sort", query.sort.as_deref());

        self.transport.get(SECURITY_PROBLEMS_PATH, &params).await
    }

    pub async fn get_security_problem_details(&self, problem_id: &str) -> Result<Value> {
        let path = format!("{}/{}", SECURITY_PROBLEMS_PATH, urlencoding::encode(problem_id));
        self.transport.get(&path, &QueryParams::new()).await
    }

    pub fn format_list(&self, response: &Value) -> String {
        let envelope = ListEnvelope::from_response(response, "securityProblems");
        let limited = envelope.is_limited();

        let mut result = envelope.header("security vulnerabilities in the following json");
        if limited {
            result.push_str(
                "Not showing all matching vulnerabilities. Consider using more specific filters (status, riskLevel, entitySelector) to get complete results.\n",
            );
        }

        for problem in envelope.items {
            result.push_str(&format!(
                "securityProblemId: {}\n",
                display(problem.get("securityProblemId"))
            ));
            for key in ["displayId", "title", "status", "vulnerabilityType", "technology"] {
                result.push_str(&format!("  {}: {}\n", key, display(problem.get(key))));
            }

            if let Some(risk) = problem.get("riskAssessment").filter(|r| truthy(Some(r))) {
                result.push_str(&format!(
                    "  riskLevel: {}; riskScore: {}; exposure: {}\n",
                    display(risk.get("riskLevel")),
                    display(risk.get("riskScore")),
                    display(risk.get("exposure"))
                ));
            }

            if let Some(cves) = problem
                .get("cveIds")
                .and_then(Value::as_array)
                .filter(|c| !c.is_empty())
            {
                let labels = cves.iter().map(|c| display(Some(c)));
                result.push_str(&format!("  cveIds: {}\n", capped_join(labels, MAX_NESTED_DISPLAY)));
            }

            if truthy(problem.get("firstSeenTimestamp")) {
                result.push_str(&format!(
                    "  firstSeen: {}\n",
                    format_timestamp(problem.get("firstSeenTimestamp"))
                ));
            }

            result.push('\n');
        }

        let shown = envelope.shown();
        let base = self.transport.dashboard_url();
        result.push_str("\nNext Steps:\n");
        if shown == 0 {
            result.push_str(
                "* Verify that the filters such as entitySelector, status and time range were correct, and search again with different filters.\n",
            );
        }
        if limited {
            result.push_str("* Use more restrictive filters, such as a more specific entitySelector and status.\n");
        }
        if shown > 1 {
            result.push_str("* Use sort (e.g. with \"-riskAssessment.riskScore\" for highest risk score first).\n");
        }
        result.push_str(
            "* If the user is interested in a specific vulnerability, use the get_security_problem_details tool. Use the securityProblemId for this.\n",
        );
        result.push_str(&format!(
            "* Suggest to the user that they view the security vulnerabilities in the Dynatrace UI at {base}/ui/security/overview for an overview, or {base}/ui/security/vulnerabilities for a list of third-party vulnerabilities\n",
        ));

        result
    }

    pub fn format_details(&self, response: &Value) -> String {
        let guidance = format!(
            "* If there are affectedEntities, suggest to the user that they could get further information about those entities with get_entity_details tool, using the entityId.\n\
             * Suggest to the user that they view the security vulnerability in the Dynatrace UI {}/ui/security/vulnerabilities/<securityProblemId>, using the securityProblemId in the URL\n",
            self.transport.dashboard_url()
        );
        detail_block("Details of security problem in the following json.", response, &guidance)
    }
}
