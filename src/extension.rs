use std::sync::{Arc, Mutex, MutexGuard};

use serde::Deserialize;

use crate::{
    event::data_key,
    propositions::{Proposition, PropositionStore, Propositions},
    Event, EventBus, MessagingConfig, PropositionsReevaluationInterceptor, ReevaluationPolicy,
    RefreshCoalescer, Result, RuleEngine,
};

/// A propositions fetch that has been requested and not completed yet.
struct InFlightFetch {
    request_event_id: String,
    propositions: Vec<Proposition>,
    failed: bool,
}

/// The messaging extension.
///
/// Owns the [`RefreshCoalescer`] and services its refresh requests: it asks the decisioning service
/// for propositions through the event bus, collects them from response events, loads their rules
/// into the rule engine and finally completes the refresh cycle.
///
/// The host is expected to forward every event it receives to [`MessagingExtension::handle_event`].
pub struct MessagingExtension {
    surfaces: Vec<String>,
    reevaluation_policy: ReevaluationPolicy,
    event_bus: Arc<dyn EventBus + Send + Sync>,
    rule_engine: Arc<dyn RuleEngine + Send + Sync>,
    coalescer: Arc<RefreshCoalescer>,
    store: PropositionStore,
    in_flight: Mutex<Option<InFlightFetch>>,
}

impl MessagingExtension {
    /// Create a new extension. Use [`MessagingConfig::to_extension`] instead.
    pub(crate) fn new(
        config: MessagingConfig,
        event_bus: Arc<dyn EventBus + Send + Sync>,
        rule_engine: Arc<dyn RuleEngine + Send + Sync>,
    ) -> Result<Arc<MessagingExtension>> {
        let surfaces = config.surfaces()?;
        let coalescer = Arc::new(RefreshCoalescer::new(event_bus.clone()));

        Ok(Arc::new(MessagingExtension {
            surfaces,
            reevaluation_policy: config.reevaluation_policy,
            event_bus,
            rule_engine,
            coalescer,
            store: PropositionStore::new(),
            in_flight: Mutex::new(None),
        }))
    }

    /// Register the re-evaluation interceptor with the rule engine.
    pub fn start(&self) {
        let interceptor = PropositionsReevaluationInterceptor::new(
            self.coalescer.clone(),
            self.reevaluation_policy,
        );
        self.rule_engine
            .set_reevaluation_interceptor(Arc::new(interceptor));

        log::debug!(target: "messaging",
                    surfaces:serde = self.surfaces;
                    "messaging extension started");
    }

    /// Request a refresh of in-app message propositions.
    pub fn refresh_in_app_messages(&self) {
        self.coalescer.refresh(None);
    }

    /// Request a refresh of in-app message propositions and call `f` with its outcome.
    pub fn refresh_in_app_messages_with(&self, f: impl FnOnce(bool) + Send + 'static) {
        self.coalescer.refresh_with(f);
    }

    /// The coalescer shared by this extension and its interceptor.
    pub fn coalescer(&self) -> &Arc<RefreshCoalescer> {
        &self.coalescer
    }

    /// Surfaces propositions are requested for.
    pub fn surfaces(&self) -> &[String] {
        &self.surfaces
    }

    /// Propositions loaded by the latest successful refresh.
    pub fn propositions(&self) -> Option<Arc<Propositions>> {
        self.store.get_propositions()
    }

    /// Handle an event from the host event bus. Events the extension has no interest in are
    /// ignored.
    pub fn handle_event(&self, event: &Event) {
        if event.is_refresh_messages_request() {
            self.fetch_propositions();
        } else if event.is_personalization_decisions() {
            self.handle_decisions(event);
        } else if event.is_error_response() {
            self.handle_error_response(event);
        } else if event.is_request_complete() {
            self.handle_request_complete(event);
        }
    }

    fn fetch_propositions(&self) {
        let request = Event::personalization_request(&self.surfaces);
        {
            let mut in_flight = self.lock_in_flight();
            if let Some(fetch) = &*in_flight {
                log::debug!(target: "messaging",
                            request_event_id:display = fetch.request_event_id;
                            "propositions fetch already in flight");
                return;
            }
            *in_flight = Some(InFlightFetch {
                request_event_id: request.id.clone(),
                propositions: Vec::new(),
                failed: false,
            });
        }

        log::debug!(target: "messaging",
                    request_event_id:display = request.id;
                    "fetching propositions");
        self.event_bus.dispatch(request);
    }

    fn handle_decisions(&self, event: &Event) {
        let decoded = self.decode_propositions(event);

        let mut in_flight = self.lock_in_flight();
        let Some(fetch) = current_fetch(&mut in_flight, event) else {
            log::trace!(target: "messaging",
                        event_id:display = event.id;
                        "ignoring decisions for a request that is not in flight");
            return;
        };

        match decoded {
            Ok(propositions) => fetch.propositions.extend(propositions),
            Err(err) => {
                log::warn!(target: "messaging",
                           event_id:display = event.id;
                           "failed to decode propositions: {:?}", err);
                fetch.failed = true;
            }
        }
    }

    fn handle_error_response(&self, event: &Event) {
        let mut in_flight = self.lock_in_flight();
        if let Some(fetch) = current_fetch(&mut in_flight, event) {
            log::warn!(target: "messaging",
                       request_event_id:display = fetch.request_event_id,
                       error:serde = event.data;
                       "decisioning service returned an error");
            fetch.failed = true;
        }
    }

    fn handle_request_complete(&self, event: &Event) {
        let fetch = {
            let mut in_flight = self.lock_in_flight();
            if current_fetch(&mut in_flight, event).is_none() {
                return;
            }
            in_flight.take()
        };
        let Some(fetch) = fetch else {
            return;
        };

        let success = !fetch.failed;
        if success {
            let propositions = Arc::new(Propositions {
                propositions: fetch.propositions,
            });
            let rules = propositions.rules();
            log::debug!(target: "messaging",
                        propositions = propositions.propositions.len(),
                        rules = rules.len();
                        "loading propositions");
            self.store.set_propositions(propositions);
            self.rule_engine.replace_rules(rules);
        } else {
            log::debug!(target: "messaging", "propositions fetch failed, keeping previous rules");
        }

        // Rules must be loaded before waiters proceed with re-evaluation.
        self.coalescer.handle_refresh_complete(success);
    }

    /// Decode propositions from a decisions response, dropping those for surfaces that were not
    /// requested.
    fn decode_propositions(&self, event: &Event) -> Result<Vec<Proposition>> {
        let Some(payload) = event.data.get(data_key::PAYLOAD) else {
            return Ok(Vec::new());
        };

        let mut propositions = Vec::<Proposition>::deserialize(payload)?;
        propositions.retain(|proposition| {
            let requested = self.surfaces.contains(&proposition.scope);
            if !requested {
                log::debug!(target: "messaging",
                            scope:display = proposition.scope;
                            "ignoring proposition for a surface that was not requested");
            }
            requested
        });
        Ok(propositions)
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<InFlightFetch>> {
        self.in_flight
            .lock()
            .expect("thread holding in-flight fetch lock should not panic")
    }
}

/// Returns the in-flight fetch if `event` responds to it.
fn current_fetch<'a>(
    in_flight: &'a mut Option<InFlightFetch>,
    event: &Event,
) -> Option<&'a mut InFlightFetch> {
    let request_event_id = event.request_event_id()?;
    in_flight
        .as_mut()
        .filter(|fetch| fetch.request_event_id == request_event_id)
}
