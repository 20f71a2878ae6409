//! Fakes of the host collaborators shared by tests.
use std::sync::{Arc, Mutex, Weak};

use serde_json::{Map, Value};

use crate::{
    event::{data_key, event_source, event_type},
    Event, EventBus, MessagingExtension, ReevaluationInterceptor, Rule, RuleEngine,
};

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// An event bus that only records dispatched events.
#[derive(Default)]
pub(crate) struct RecordingEventBus {
    events: Mutex<Vec<Event>>,
}

impl RecordingEventBus {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn refresh_requests(&self) -> usize {
        count(&self.events.lock().unwrap(), Event::is_refresh_messages_request)
    }
}

impl EventBus for RecordingEventBus {
    fn dispatch(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

/// An event bus that records events and synchronously delivers them to registered extensions.
///
/// Extensions are held weakly; dropped ones are skipped.
#[derive(Default)]
pub(crate) struct SynchronousEventHub {
    events: Mutex<Vec<Event>>,
    listeners: Mutex<Vec<Weak<MessagingExtension>>>,
}

impl SynchronousEventHub {
    pub fn register(&self, extension: &Arc<MessagingExtension>) {
        self.listeners.lock().unwrap().push(Arc::downgrade(extension));
    }

    pub fn refresh_requests(&self) -> usize {
        count(&self.events.lock().unwrap(), Event::is_refresh_messages_request)
    }

    pub fn personalization_requests(&self) -> usize {
        count(&self.events.lock().unwrap(), is_personalization_request)
    }

    pub fn last_personalization_request(&self) -> Option<Event> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|event| is_personalization_request(event))
            .cloned()
    }
}

impl EventBus for SynchronousEventHub {
    fn dispatch(&self, event: Event) {
        self.events.lock().unwrap().push(event.clone());

        // Listeners may dispatch again while handling the event, so no lock is held here.
        let listeners: Vec<_> = self
            .listeners
            .lock()
            .unwrap()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        for listener in listeners {
            listener.handle_event(&event);
        }
    }
}

/// A rule engine that records rule replacements and the installed interceptor.
#[derive(Default)]
pub(crate) struct RecordingRuleEngine {
    rules: Mutex<Vec<Vec<Rule>>>,
    interceptor: Mutex<Option<Arc<dyn ReevaluationInterceptor + Send + Sync>>>,
}

impl RecordingRuleEngine {
    /// Rules from the latest replacement.
    pub fn rules(&self) -> Vec<Rule> {
        self.rules.lock().unwrap().last().cloned().unwrap_or_default()
    }

    pub fn replacements(&self) -> usize {
        self.rules.lock().unwrap().len()
    }

    pub fn interceptor(&self) -> Option<Arc<dyn ReevaluationInterceptor + Send + Sync>> {
        self.interceptor.lock().unwrap().clone()
    }
}

impl RuleEngine for RecordingRuleEngine {
    fn replace_rules(&self, rules: Vec<Rule>) {
        self.rules.lock().unwrap().push(rules);
    }

    fn set_reevaluation_interceptor(
        &self,
        interceptor: Arc<dyn ReevaluationInterceptor + Send + Sync>,
    ) {
        *self.interceptor.lock().unwrap() = Some(interceptor);
    }
}

/// A decisions response to `request` carrying `payload`.
pub(crate) fn decisions_response(request: &Event, payload: Value) -> Event {
    let mut data = Map::new();
    data.insert(data_key::PAYLOAD.to_owned(), payload);
    data.insert(
        data_key::REQUEST_EVENT_ID.to_owned(),
        Value::String(request.id.clone()),
    );
    Event::new(
        "decisions",
        event_type::EDGE,
        event_source::PERSONALIZATION_DECISIONS,
        data,
    )
}

/// An error response to `request`.
pub(crate) fn error_response(request: &Event) -> Event {
    let mut data = Map::new();
    data.insert("status".to_owned(), Value::from(503));
    data.insert(
        data_key::REQUEST_EVENT_ID.to_owned(),
        Value::String(request.id.clone()),
    );
    Event::new(
        "error response",
        event_type::EDGE,
        event_source::ERROR_RESPONSE_CONTENT,
        data,
    )
}

/// The event signaling that every response to `request` has been delivered.
pub(crate) fn request_complete(request: &Event) -> Event {
    Event::new(
        "request complete",
        event_type::EDGE,
        event_source::CONTENT_COMPLETE,
        Map::new(),
    )
    .in_response_to(request)
}

fn is_personalization_request(event: &Event) -> bool {
    event.event_type == event_type::EDGE && event.source == event_source::REQUEST_CONTENT
}

fn count(events: &[Event], predicate: impl Fn(&Event) -> bool) -> usize {
    events.iter().filter(|event| predicate(event)).count()
}
