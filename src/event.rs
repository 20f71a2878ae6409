//! Events exchanged with the host event bus.
use chrono::{DateTime, Utc};
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event types understood by the messaging core.
pub mod event_type {
    pub const MESSAGING: &str = "messaging";
    pub const EDGE: &str = "edge";
}

/// Event sources understood by the messaging core.
pub mod event_source {
    pub const REQUEST_CONTENT: &str = "requestContent";
    pub const PERSONALIZATION_DECISIONS: &str = "personalization:decisions";
    pub const ERROR_RESPONSE_CONTENT: &str = "errorResponseContent";
    pub const CONTENT_COMPLETE: &str = "contentComplete";
}

/// Keys used in event data.
pub mod data_key {
    /// Boolean marker on a refresh request.
    pub const REFRESH_MESSAGES: &str = "refreshmessages";
    /// Surfaces a personalization request asks propositions for.
    pub const SURFACES: &str = "surfaces";
    /// Propositions carried by a decisions response.
    pub const PAYLOAD: &str = "payload";
    /// Id of the request event a response belongs to.
    pub const REQUEST_EVENT_ID: &str = "requestEventId";
}

/// An event as seen on the host event bus.
///
/// The core only looks at `event_type`, `source` and a few well-known `data` keys. Everything else
/// is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub name: String,
    pub event_type: String,
    pub source: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
    /// Id of the event this one was created in response to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Event {
    /// Create a new event with a random id and the current timestamp.
    pub fn new(
        name: impl Into<String>,
        event_type: impl Into<String>,
        source: impl Into<String>,
        data: Map<String, Value>,
    ) -> Event {
        Event {
            id: new_event_id(),
            name: name.into(),
            event_type: event_type.into(),
            source: source.into(),
            data,
            timestamp: Utc::now(),
            parent_id: None,
        }
    }

    /// Mark this event as a response to `parent`.
    pub fn in_response_to(mut self, parent: &Event) -> Event {
        self.parent_id = Some(parent.id.clone());
        self
    }

    /// The event dispatched when a new refresh cycle starts.
    pub fn refresh_messages_request() -> Event {
        let mut data = Map::new();
        data.insert(data_key::REFRESH_MESSAGES.to_owned(), Value::Bool(true));
        Event::new(
            "Refresh in-app messages",
            event_type::MESSAGING,
            event_source::REQUEST_CONTENT,
            data,
        )
    }

    /// A request to the decisioning service for propositions on `surfaces`.
    pub fn personalization_request(surfaces: &[String]) -> Event {
        let mut data = Map::new();
        data.insert(
            data_key::SURFACES.to_owned(),
            Value::Array(surfaces.iter().cloned().map(Value::String).collect()),
        );
        Event::new(
            "Retrieve message definitions",
            event_type::EDGE,
            event_source::REQUEST_CONTENT,
            data,
        )
    }

    pub fn is_refresh_messages_request(&self) -> bool {
        self.event_type == event_type::MESSAGING
            && self.source == event_source::REQUEST_CONTENT
            && self.bool_data(data_key::REFRESH_MESSAGES) == Some(true)
    }

    pub fn is_personalization_decisions(&self) -> bool {
        self.event_type == event_type::EDGE && self.source == event_source::PERSONALIZATION_DECISIONS
    }

    pub fn is_error_response(&self) -> bool {
        self.event_type == event_type::EDGE && self.source == event_source::ERROR_RESPONSE_CONTENT
    }

    pub fn is_request_complete(&self) -> bool {
        self.event_type == event_type::EDGE && self.source == event_source::CONTENT_COMPLETE
    }

    /// Id of the request this event responds to.
    ///
    /// Response events carry it in `data`; completion events are chained through `parent_id`.
    pub fn request_event_id(&self) -> Option<&str> {
        self.data
            .get(data_key::REQUEST_EVENT_ID)
            .and_then(Value::as_str)
            .or(self.parent_id.as_deref())
    }

    fn bool_data(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(Value::as_bool)
    }
}

fn new_event_id() -> String {
    format!("{:032x}", thread_rng().gen::<u128>())
}
