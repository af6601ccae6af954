use serde::{Deserialize, Serialize};
use tracing::Span;

/// Identifies who a product lookup is made for.
///
/// Passed explicitly into every client and aggregator call; its fields are attached to the
/// log lines emitted while serving the call. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub store_number: Option<u32>,
    pub order_number: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store_number(mut self, store_number: u32) -> Self {
        self.store_number = Some(store_number);
        self
    }

    pub fn with_order_number(mut self, order_number: impl Into<String>) -> Self {
        self.order_number = Some(order_number.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Records the context onto a span declared with the four context fields as `Empty`.
    pub(crate) fn record_on(&self, span: &Span) {
        if let Some(store_number) = self.store_number {
            span.record("store_number", store_number);
        }
        if let Some(order_number) = &self.order_number {
            span.record("order_number", order_number.as_str());
        }
        if let Some(user_id) = &self.user_id {
            span.record("user_id", user_id.as_str());
        }
        if let Some(session_id) = &self.session_id {
            span.record("session_id", session_id.as_str());
        }
    }
}
