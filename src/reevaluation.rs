//! Refresh-then-reevaluate interception of rule engine re-evaluation triggers.
use std::sync::Arc;

use crate::{Event, RefreshCoalescer, Rule};

/// A single-shot callback that lets the rule engine proceed with re-evaluation.
pub type Continuation = Box<dyn FnOnce() + Send + 'static>;

/// Hook called by the rule engine before it re-evaluates rules against an event.
///
/// The interceptor owns `continuation` and decides whether (and when) re-evaluation proceeds.
pub trait ReevaluationInterceptor {
    fn on_reevaluation_triggered(
        &self,
        event: &Event,
        reevaluable_rules: &[Rule],
        continuation: Continuation,
    );
}

impl<T: Fn(&Event, &[Rule], Continuation)> ReevaluationInterceptor for T {
    fn on_reevaluation_triggered(
        &self,
        event: &Event,
        reevaluable_rules: &[Rule],
        continuation: Continuation,
    ) {
        self(event, reevaluable_rules, continuation);
    }
}

/// What to do with the continuation once the triggered refresh has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReevaluationPolicy {
    /// Re-evaluate only if propositions were refreshed successfully.
    #[default]
    OnSuccess,
    /// Re-evaluate after every refresh, with whatever rules are loaded.
    Always,
}

impl ReevaluationPolicy {
    fn should_continue(self, success: bool) -> bool {
        match self {
            ReevaluationPolicy::OnSuccess => success,
            ReevaluationPolicy::Always => true,
        }
    }
}

/// Forces a propositions refresh before any re-evaluation, so freshly loaded rules are considered
/// for the pending event.
///
/// Every trigger requests a refresh through the shared [`RefreshCoalescer`]; concurrent triggers
/// end up waiting on the same refresh cycle.
pub struct PropositionsReevaluationInterceptor {
    coalescer: Arc<RefreshCoalescer>,
    policy: ReevaluationPolicy,
}

impl PropositionsReevaluationInterceptor {
    pub fn new(
        coalescer: Arc<RefreshCoalescer>,
        policy: ReevaluationPolicy,
    ) -> PropositionsReevaluationInterceptor {
        PropositionsReevaluationInterceptor { coalescer, policy }
    }

    pub fn policy(&self) -> ReevaluationPolicy {
        self.policy
    }
}

impl ReevaluationInterceptor for PropositionsReevaluationInterceptor {
    fn on_reevaluation_triggered(
        &self,
        event: &Event,
        reevaluable_rules: &[Rule],
        continuation: Continuation,
    ) {
        log::debug!(target: "messaging",
                    event_id:display = event.id,
                    rules = reevaluable_rules.len();
                    "re-evaluation triggered, refreshing propositions first");

        let policy = self.policy;
        let event_id = event.id.clone();
        self.coalescer.refresh_with(move |success| {
            if policy.should_continue(success) {
                log::trace!(target: "messaging",
                            event_id:display = event_id,
                            success;
                            "proceeding with re-evaluation");
                continuation();
            } else {
                log::debug!(target: "messaging",
                            event_id:display = event_id;
                            "propositions refresh failed, skipping re-evaluation");
            }
        });
    }
}
