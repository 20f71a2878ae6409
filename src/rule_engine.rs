use std::sync::Arc;

use derive_more::{From, Into};
use serde::{Deserialize, Serialize};

use crate::ReevaluationInterceptor;

/// An opaque rule handle.
///
/// Rule content belongs to the host rule engine; the messaging core only moves rules around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, From, Into)]
#[serde(transparent)]
pub struct Rule(serde_json::Value);

impl Rule {
    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }
}

/// The host rule engine.
pub trait RuleEngine {
    /// Replace every rule owned by the messaging extension with `rules`.
    fn replace_rules(&self, rules: Vec<Rule>);

    /// Install `interceptor` as the single re-evaluation interceptor. The last registration wins.
    fn set_reevaluation_interceptor(&self, interceptor: Arc<dyn ReevaluationInterceptor + Send + Sync>);
}
