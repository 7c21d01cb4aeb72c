use super::*;

#[test]
fn test_discriminators_reject_empty_input() {
    assert!(Discriminators::new(vec![]).is_none());
    assert!(Discriminators::new(vec!["a".into(), "".into()]).is_none());
    assert!(Discriminators::single("").is_none());
}

#[test]
fn test_discriminators_accessors() {
    let discriminators = Discriminators::new(vec!["subscribe".into(), "extra".into()]).unwrap();

    assert_eq!(discriminators.first(), "subscribe");
    assert!(discriminators.contains("extra"));
    assert!(!discriminators.contains("cleaned"));
    assert_eq!(discriminators.iter().count(), 2);
    assert_eq!(discriminators.to_string(), "subscribe,extra");
}

#[test]
fn test_route_uses_field_value() {
    let router = FieldEventRouter::new("type");
    let event = NormalizedEvent::from_pairs([("type", "unsubscribe"), ("data[id]", "8a25ff1d98")]);

    let discriminators = router.route(&event).unwrap();
    assert_eq!(discriminators.as_slice(), &["unsubscribe".to_string()]);
}

#[test]
fn test_route_uses_last_repeated_value() {
    let router = FieldEventRouter::new("type");
    let event = NormalizedEvent::from_pairs([("type", "subscribe"), ("type", "profile")]);

    assert_eq!(router.route(&event).unwrap().first(), "profile");
}

#[test]
fn test_missing_or_empty_field_names_the_field() {
    let router = FieldEventRouter::new("type");

    for event in [
        NormalizedEvent::from_pairs([("data[id]", "1")]),
        NormalizedEvent::from_pairs([("type", "")]),
    ] {
        match router.route(&event) {
            Err(ReceiverError::MissingDiscriminator { field }) => assert_eq!(field, "type"),
            other => panic!("expected MissingDiscriminator, got {other:?}"),
        }
    }
}
