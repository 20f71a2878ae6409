//! Propositions received from the decisioning service.
//!
//! Only the envelope is modeled. Item content stays opaque JSON, except for ruleset items whose
//! rules are handed over to the rule engine as-is.
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Rule;

/// Schema of proposition items carrying rules for the rule engine.
pub const RULESET_SCHEMA: &str = "urn:personalization:ruleset-item";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposition {
    pub id: String,
    /// The surface this proposition was requested for.
    pub scope: String,
    #[serde(default)]
    pub scope_details: Value,
    #[serde(default)]
    pub items: Vec<PropositionItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropositionItem {
    pub id: String,
    pub schema: String,
    #[serde(default)]
    pub data: Value,
}

impl PropositionItem {
    /// Rules carried by a ruleset item. Empty for any other schema.
    pub fn rules(&self) -> Vec<Rule> {
        if self.schema != RULESET_SCHEMA {
            return Vec::new();
        }
        match self.data.get("rules") {
            Some(Value::Array(rules)) => rules.iter().cloned().map(Rule::from).collect(),
            _ => {
                log::warn!(target: "messaging",
                           item_id:display = self.id;
                           "ruleset item has no rules array");
                Vec::new()
            }
        }
    }
}

/// All propositions loaded by the latest successful refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Propositions {
    pub propositions: Vec<Proposition>,
}

impl Propositions {
    /// Rules from every ruleset item, in proposition order.
    pub fn rules(&self) -> Vec<Rule> {
        self.propositions
            .iter()
            .flat_map(|proposition| proposition.items.iter())
            .flat_map(PropositionItem::rules)
            .collect()
    }

    /// Propositions requested for `surface`.
    pub fn for_surface<'a>(&'a self, surface: &'a str) -> impl Iterator<Item = &'a Proposition> {
        self.propositions
            .iter()
            .filter(move |proposition| proposition.scope == surface)
    }
}

/// `PropositionStore` provides a thread-safe storage for the currently loaded propositions.
///
/// Propositions are replaced completely on every successful refresh. Readers get a snapshot that is
/// not affected by later writes.
#[derive(Default)]
pub struct PropositionStore {
    propositions: RwLock<Option<Arc<Propositions>>>,
}

impl PropositionStore {
    pub fn new() -> Self {
        PropositionStore::default()
    }

    /// Get currently loaded propositions. Returns `None` if no refresh has succeeded yet.
    pub fn get_propositions(&self) -> Option<Arc<Propositions>> {
        let propositions = self
            .propositions
            .read()
            .expect("thread holding propositions lock should not panic");

        propositions.clone()
    }

    /// Replace loaded propositions.
    pub fn set_propositions(&self, propositions: Arc<Propositions>) {
        let mut slot = self
            .propositions
            .write()
            .expect("thread holding propositions lock should not panic");

        *slot = Some(propositions);
    }
}
