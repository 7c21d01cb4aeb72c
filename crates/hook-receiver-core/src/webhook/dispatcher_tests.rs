use super::*;
use std::sync::Mutex;

/// Handler that records its invocations into a shared log.
struct RecordingHandler {
    label: &'static str,
    order: i32,
    receiver: Option<&'static str>,
    response: Option<DispatchResponse>,
    fail: bool,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingHandler {
    fn new(label: &'static str, order: i32, log: &Arc<Mutex<Vec<&'static str>>>) -> Self {
        Self {
            label,
            order,
            receiver: None,
            response: None,
            fail: false,
            log: Arc::clone(log),
        }
    }

    fn for_receiver(mut self, receiver: &'static str) -> Self {
        self.receiver = Some(receiver);
        self
    }

    fn responding(mut self, response: DispatchResponse) -> Self {
        self.response = Some(response);
        self
    }

    fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl WebhookHandler for RecordingHandler {
    fn receiver(&self) -> Option<&str> {
        self.receiver
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn name(&self) -> &str {
        self.label
    }

    async fn handle(
        &self,
        _context: &HandlerContext,
    ) -> Result<Option<DispatchResponse>, HandlerError> {
        self.log.lock().unwrap().push(self.label);
        if self.fail {
            return Err("handler exploded".into());
        }
        Ok(self.response.clone())
    }
}

fn context(receiver: &str) -> HandlerContext {
    HandlerContext::new(
        ReceiverName::new(receiver).unwrap(),
        RouteId::new("abc"),
        Discriminators::single("subscribe").unwrap(),
        NormalizedEvent::from_pairs([("type", "subscribe")]),
    )
}

#[tokio::test]
async fn test_empty_registry_returns_ok() {
    let registry = HandlerRegistry::new();
    assert!(registry.is_empty());

    let response = registry.dispatch(context("mailchimp")).await.unwrap();
    assert_eq!(response, DispatchResponse::ok());
}

#[tokio::test]
async fn test_handlers_run_in_ascending_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = HandlerRegistry::new();
    registry
        .register(Arc::new(RecordingHandler::new("late", 90, &log)))
        .register(Arc::new(RecordingHandler::new("early", 10, &log)))
        .register(Arc::new(RecordingHandler::new("middle-a", 50, &log)))
        .register(Arc::new(RecordingHandler::new("middle-b", 50, &log)));

    registry.dispatch(context("mailchimp")).await.unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["early", "middle-a", "middle-b", "late"]
    );
}

#[tokio::test]
async fn test_first_response_wins_and_later_handlers_still_run() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = HandlerRegistry::new();
    registry
        .register(Arc::new(
            RecordingHandler::new("first", 1, &log)
                .responding(DispatchResponse::ok().with_body("text/plain", "first")),
        ))
        .register(Arc::new(
            RecordingHandler::new("second", 2, &log)
                .responding(DispatchResponse::with_status(202)),
        ));

    let response = registry.dispatch(context("mailchimp")).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body.as_deref(), Some("first"));
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_receiver_filter_skips_other_receivers() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = HandlerRegistry::new();
    registry
        .register(Arc::new(
            RecordingHandler::new("chimp", 1, &log).for_receiver("MailChimp"),
        ))
        .register(Arc::new(
            RecordingHandler::new("other", 2, &log).for_receiver("stripe"),
        ))
        .register(Arc::new(RecordingHandler::new("any", 3, &log)));

    registry.dispatch(context("mailchimp")).await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["chimp", "any"]);
}

#[tokio::test]
async fn test_handler_failure_stops_dispatch() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = HandlerRegistry::new();
    registry
        .register(Arc::new(RecordingHandler::new("broken", 1, &log).failing()))
        .register(Arc::new(RecordingHandler::new("after", 2, &log)));

    let result = registry.dispatch(context("mailchimp")).await;

    match result {
        Err(DispatchError::HandlerFailed { handler, .. }) => assert_eq!(handler, "broken"),
        other => panic!("expected HandlerFailed, got {other:?}"),
    }
    assert_eq!(*log.lock().unwrap(), vec!["broken"]);
}

#[tokio::test]
async fn test_logging_handler_never_proposes_a_response() {
    let result = LoggingHandler.handle(&context("mailchimp")).await.unwrap();
    assert!(result.is_none());
    assert_eq!(LoggingHandler.order(), 0);
}

#[test]
fn test_registry_debug_lists_handler_names() {
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(LoggingHandler));

    assert!(format!("{:?}", registry).contains("logging"));
}
