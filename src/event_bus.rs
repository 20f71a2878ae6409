use crate::Event;

/// The host event bus, as seen by the messaging core.
///
/// Dispatch is fire-and-forget. Implementations may deliver synchronously, including re-entering
/// the messaging core from inside `dispatch`.
pub trait EventBus {
    fn dispatch(&self, event: Event);
}

impl<T: Fn(Event)> EventBus for T {
    fn dispatch(&self, event: Event) {
        self(event);
    }
}
