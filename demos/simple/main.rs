use std::sync::{Arc, Mutex};

use inapp_messaging::{
    Continuation, Event, MessagingConfig, ReevaluationInterceptor, Rule, RuleEngine,
};

/// Prints rule replacements and keeps the installed interceptor.
#[derive(Default)]
struct PrintingRuleEngine {
    interceptor: Mutex<Option<Arc<dyn ReevaluationInterceptor + Send + Sync>>>,
}

impl RuleEngine for PrintingRuleEngine {
    fn replace_rules(&self, rules: Vec<Rule>) {
        println!("Loaded {} rules", rules.len());
    }

    fn set_reevaluation_interceptor(
        &self,
        interceptor: Arc<dyn ReevaluationInterceptor + Send + Sync>,
    ) {
        *self.interceptor.lock().unwrap() = Some(interceptor);
    }
}

pub fn main() {
    env_logger::init();

    // Collect dispatched events; a real host would route them to other extensions.
    let dispatched = Arc::new(Mutex::new(Vec::<Event>::new()));
    let event_bus = {
        let dispatched = dispatched.clone();
        Arc::new(move |event: Event| dispatched.lock().unwrap().push(event))
    };
    let rule_engine = Arc::new(PrintingRuleEngine::default());

    let extension = MessagingConfig::from_app_id("com.example.app")
        .to_extension(event_bus, rule_engine.clone())
        .unwrap();
    extension.start();

    // Rule engine asks for re-evaluation; a refresh is started first.
    let continuation: Continuation = Box::new(|| println!("Re-evaluating rules"));
    let interceptor = rule_engine.interceptor.lock().unwrap().clone().unwrap();
    interceptor.on_reevaluation_triggered(&Event::refresh_messages_request(), &[], continuation);

    // A manual refresh joins the refresh in flight.
    let outcome = extension.coalescer().refresh_outcome();

    // Deliver the refresh request to the extension, which asks for propositions.
    let refresh_request = dispatched.lock().unwrap()[0].clone();
    extension.handle_event(&refresh_request);
    let propositions_request = dispatched.lock().unwrap()[1].clone();

    // Pretend the decisioning service answered with no propositions.
    let complete = Event::new(
        "request complete",
        inapp_messaging::event::event_type::EDGE,
        inapp_messaging::event::event_source::CONTENT_COMPLETE,
        Default::default(),
    )
    .in_response_to(&propositions_request);
    extension.handle_event(&complete);

    println!("Refresh succeeded: {:?}", outcome.wait());
}
