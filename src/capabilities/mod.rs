//! Capability modules: one per API area.
//!
//! # Data Flow
//! ```text
//! typed params (required fields + optional filters)
//!     → QueryParams (defaults applied, absent optionals skipped)
//!     → ApiTransport::get(endpoint, params)
//!     → serde_json::Value (raw response, returned as-is)
//!     → format_* (display text with "Next Steps" guidance)
//! ```
//!
//! # Design Decisions
//! - Modules borrow the transport; they own no state besides that reference
//! - Responses stay `serde_json::Value`: upstream records are sparse and
//!   loosely typed, and formatters must render whatever arrives
//! - Formatters render every item they are given; only nested lists are capped

pub mod entities;
pub mod events;
pub mod logs;
pub mod metrics;
pub mod problems;
pub mod security;
pub mod slo;

use serde_json::Value;

use crate::format::compact_json;

pub use entities::EntitiesApi;
pub use events::EventsApi;
pub use logs::LogsApi;
pub use metrics::MetricsApi;
pub use problems::ProblemsApi;
pub use security::SecurityApi;
pub use slo::SloApi;

/// Display cap for nested lists (tags, CVEs, dimensions, zones, properties).
pub const MAX_NESTED_DISPLAY: usize = 11;

/// `totalCount` of a list envelope.
///
/// Absent, zero, negative or non-numeric counts are `Unknown`; an unknown
/// total never marks a page as limited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalCount {
    Known(u64),
    Unknown,
}

impl TotalCount {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_u64) {
            Some(n) if n > 0 => TotalCount::Known(n),
            _ => TotalCount::Unknown,
        }
    }
}

/// Borrowed view over a list response: `{ <items>: [...], totalCount? }`.
#[derive(Debug, Clone, Copy)]
pub struct ListEnvelope<'a> {
    pub items: &'a [Value],
    pub total_count: TotalCount,
}

impl<'a> ListEnvelope<'a> {
    pub fn from_response(response: &'a Value, items_key: &str) -> Self {
        let items = response
            .get(items_key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        Self {
            items,
            total_count: TotalCount::from_value(response.get("totalCount")),
        }
    }

    pub fn shown(&self) -> usize {
        self.items.len()
    }

    /// True when the API reports more matches than were returned.
    pub fn is_limited(&self) -> bool {
        match self.total_count {
            TotalCount::Known(total) => total > self.shown() as u64,
            TotalCount::Unknown => false,
        }
    }

    /// `Listing <shown>[ of <total>] <label>.\n`
    pub fn header(&self, label: &str) -> String {
        match self.total_count {
            TotalCount::Known(total) => {
                format!("Listing {} of {} {}.\n", self.shown(), total, label)
            }
            TotalCount::Unknown => format!("Listing {} {}.\n", self.shown(), label),
        }
    }
}

/// `<intro>\n<compact json>\nNext Steps:\n<guidance>`
pub(crate) fn detail_block(intro: &str, response: &Value, guidance: &str) -> String {
    format!(
        "{}\n{}\nNext Steps:\n{}",
        intro,
        compact_json(response),
        guidance
    )
}
