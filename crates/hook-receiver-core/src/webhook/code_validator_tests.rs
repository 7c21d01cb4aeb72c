use super::*;
use crate::secret_store::{MockSecretStore, ReceiverSecret, SecretStoreError};
use crate::webhook::{HttpMethod, Scheme};

const SECRET: &str = "0123456789abcdef0123456789abcdef";

fn receiver() -> ReceiverName {
    ReceiverName::new("mailchimp").unwrap()
}

fn request_with_query(query: Option<&str>) -> WebhookRequest {
    WebhookRequest::new(HttpMethod::Post, Scheme::Https, query.map(str::to_string))
}

fn store_with_secret() -> MockSecretStore {
    let mut store = MockSecretStore::new();
    store
        .expect_get_secret()
        .returning(|_, _| Ok(Some(ReceiverSecret::new(SECRET).unwrap())));
    store
}

#[tokio::test]
async fn test_matching_code_is_accepted() {
    let validator = CodeValidator::new(Arc::new(store_with_secret()));
    let request = request_with_query(Some(&format!("code={SECRET}")));

    let result = validator
        .verify(&request, &receiver(), &RouteId::new("abc"))
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_wrong_code_is_rejected() {
    let validator = CodeValidator::new(Arc::new(store_with_secret()));
    let request = request_with_query(Some("code=0123456789abcdef0123456789abcdeX"));

    let result = validator
        .verify(&request, &receiver(), &RouteId::new("abc"))
        .await;
    assert!(matches!(result, Err(ReceiverError::InvalidCode { .. })));
}

#[tokio::test]
async fn test_prefix_of_secret_is_rejected() {
    let validator = CodeValidator::new(Arc::new(store_with_secret()));
    let request = request_with_query(Some("code=0123456789abcdef"));

    let result = validator
        .verify(&request, &receiver(), &RouteId::new("abc"))
        .await;
    assert!(matches!(result, Err(ReceiverError::InvalidCode { .. })));
}

#[tokio::test]
async fn test_missing_or_empty_code_is_rejected() {
    let validator = CodeValidator::new(Arc::new(store_with_secret()));

    for query in [None, Some("other=1"), Some("code="), Some("code")] {
        let result = validator
            .verify(&request_with_query(query), &receiver(), &RouteId::new("abc"))
            .await;
        assert!(
            matches!(result, Err(ReceiverError::MissingCode { parameter: "code" })),
            "query {query:?} should be a missing code"
        );
    }
}

/// An unconfigured route is a server fault even when no code was sent.
#[tokio::test]
async fn test_missing_config_takes_precedence() {
    let mut store = MockSecretStore::new();
    store
        .expect_get_secret()
        .withf(|receiver, route_id| receiver.as_str() == "mailchimp" && route_id.as_str() == "abc")
        .times(2)
        .returning(|_, _| Ok(None));
    let validator = CodeValidator::new(Arc::new(store));

    for query in [None, Some("code=anything")] {
        let result = validator
            .verify(&request_with_query(query), &receiver(), &RouteId::new("abc"))
            .await;
        match result {
            Err(error @ ReceiverError::MissingConfig { .. }) => {
                assert_eq!(error.status_code(), 500);
            }
            other => panic!("expected MissingConfig, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_store_failure_is_propagated() {
    let mut store = MockSecretStore::new();
    store.expect_get_secret().returning(|_, _| {
        Err(SecretStoreError::Unavailable {
            message: "vault offline".to_string(),
        })
    });
    let validator = CodeValidator::new(Arc::new(store));

    let result = validator
        .verify(
            &request_with_query(Some("code=x")),
            &receiver(),
            &RouteId::default_route(),
        )
        .await;
    assert!(matches!(result, Err(ReceiverError::SecretStore(_))));
}

#[test]
fn test_constant_time_eq() {
    assert!(constant_time_eq(b"abc", b"abc"));
    assert!(!constant_time_eq(b"abc", b"abd"));
    assert!(!constant_time_eq(b"abc", b"abcd"));
    assert!(constant_time_eq(b"", b""));
}
