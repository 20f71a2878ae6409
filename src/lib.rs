//! Proposition refresh coalescing and rule re-evaluation for in-app messaging.
//!
//! # Overview
//!
//! In-app messages are driven by rules delivered as "propositions" by a remote decisioning
//! service. Many independent triggers (app launch, manual refresh, rule re-evaluation) may ask for
//! fresh propositions at about the same time. The crate makes sure only one refresh is in flight
//! at any time and that everybody who asked for it learns the same outcome.
//!
//! [`RefreshCoalescer`] is the single-flight core. [`refresh`](RefreshCoalescer::refresh) starts
//! a refresh cycle or joins the one in progress, and
//! [`handle_refresh_complete`](RefreshCoalescer::handle_refresh_complete) ends the cycle and
//! notifies every waiter, in the order they were queued.
//!
//! [`PropositionsReevaluationInterceptor`] is installed into the host [`RuleEngine`]. Whenever the
//! rule engine wants to re-evaluate rules against an event, the interceptor refreshes propositions
//! first and only then lets re-evaluation proceed (see [`ReevaluationPolicy`]).
//!
//! [`MessagingExtension`] ties everything together. It is created from a [`MessagingConfig`] and
//! the host collaborators ([`EventBus`] and [`RuleEngine`]), services refresh requests, and loads
//! rules from received propositions.
//!
//! # Error Handling
//!
//! A failed refresh is a normal outcome and is reported as `false` to refresh waiters. Errors
//! represented by the [`Error`] enum are limited to configuration and waiting on refresh handles.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate with the `messaging`
//! target. Consider integrating a `log`-compatible logger implementation for better visibility
//! into refresh cycles.

#![warn(rustdoc::missing_crate_level_docs)]

mod config;
mod error;
pub mod event;
mod event_bus;
mod extension;
pub mod propositions;
mod reevaluation;
mod refresh_coalescer;
mod rule_engine;

#[cfg(test)]
mod test_utils;

pub use config::MessagingConfig;
pub use error::{Error, Result};
pub use event::Event;
pub use event_bus::EventBus;
pub use extension::MessagingExtension;
pub use reevaluation::{
    Continuation, PropositionsReevaluationInterceptor, ReevaluationInterceptor, ReevaluationPolicy,
};
pub use refresh_coalescer::{Completion, RefreshCoalescer, RefreshOutcome};
pub use rule_engine::{Rule, RuleEngine};
