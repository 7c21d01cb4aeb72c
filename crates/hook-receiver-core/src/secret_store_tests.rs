//! Tests for the secret store module.

use super::*;

const SECRET_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const SECRET_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

fn mailchimp() -> ReceiverName {
    ReceiverName::new("mailchimp").unwrap()
}

mod receiver_secret_tests {
    use super::*;

    #[test]
    fn test_secret_within_range_is_accepted() {
        let secret = ReceiverSecret::new("x".repeat(32)).unwrap();
        assert_eq!(secret.len(), 32);
        assert!(!secret.is_empty());

        assert!(ReceiverSecret::new("x".repeat(128)).is_ok());
    }

    #[test]
    fn test_secret_outside_range_is_rejected() {
        assert_eq!(
            ReceiverSecret::new("x".repeat(31)).unwrap_err(),
            SecretConfigError::InvalidLength { actual: 31 }
        );
        assert_eq!(
            ReceiverSecret::new("x".repeat(129)).unwrap_err(),
            SecretConfigError::InvalidLength { actual: 129 }
        );
    }

    /// Length is measured in characters, not bytes.
    #[test]
    fn test_secret_length_counts_characters() {
        let secret = ReceiverSecret::new("é".repeat(32)).unwrap();
        assert_eq!(secret.len(), 32);
        assert_eq!(secret.expose_bytes().len(), 64);
    }

    #[test]
    fn test_debug_output_is_redacted() {
        let secret = ReceiverSecret::new(SECRET_A).unwrap();
        let debug = format!("{:?}", secret);

        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains(SECRET_A));
    }
}

mod snapshot_tests {
    use super::*;

    #[test]
    fn test_single_secret_binds_default_route() {
        let mut snapshot = SecretSnapshot::new();
        let added = snapshot.add_setting(&mailchimp(), SECRET_A).unwrap();

        assert_eq!(added, 1);
        assert_eq!(
            snapshot.route_ids(&mailchimp()),
            vec![RouteId::default_route()]
        );
    }

    #[test]
    fn test_routed_setting_binds_each_id() {
        let mut snapshot = SecretSnapshot::new();
        let setting = format!("news={SECRET_A}, Promo = {SECRET_B}");
        let added = snapshot.add_setting(&mailchimp(), &setting).unwrap();

        assert_eq!(added, 2);
        assert_eq!(
            snapshot.route_ids(&mailchimp()),
            vec![RouteId::new("news"), RouteId::new("promo")]
        );
    }

    #[test]
    fn test_mixed_setting_with_default_entry() {
        let mut snapshot = SecretSnapshot::new();
        let setting = format!("{SECRET_A},,news={SECRET_B},");
        snapshot.add_setting(&mailchimp(), &setting).unwrap();

        assert_eq!(
            snapshot.route_ids(&mailchimp()),
            vec![RouteId::default_route(), RouteId::new("news")]
        );
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_empty_setting_is_rejected() {
        let mut snapshot = SecretSnapshot::new();
        let result = snapshot.add_setting(&mailchimp(), " , ");

        assert!(matches!(
            result,
            Err(SecretConfigError::EmptySetting { .. })
        ));
    }

    #[test]
    fn test_short_secret_in_setting_is_rejected_without_echoing_it() {
        let mut snapshot = SecretSnapshot::new();
        let result = snapshot.add_setting(&mailchimp(), "news=tooshort");

        let error = result.unwrap_err();
        assert!(matches!(error, SecretConfigError::InvalidEntry { .. }));
        assert!(!error.to_string().contains("tooshort"));
    }

    #[test]
    fn test_entry_with_empty_route_id_is_rejected() {
        let mut snapshot = SecretSnapshot::new();
        let result = snapshot.add_setting(&mailchimp(), &format!(" ={SECRET_A}"));

        assert!(matches!(
            result,
            Err(SecretConfigError::InvalidEntry { .. })
        ));
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_duplicate_route_is_rejected() {
        let mut snapshot = SecretSnapshot::new();
        let setting = format!("news={SECRET_A},NEWS={SECRET_B}");
        let result = snapshot.add_setting(&mailchimp(), &setting);

        assert_eq!(
            result.unwrap_err(),
            SecretConfigError::DuplicateRoute {
                receiver: "mailchimp".to_string(),
                route_id: "news".to_string(),
            }
        );
    }

    #[test]
    fn test_debug_lists_routes_but_not_secrets() {
        let mut snapshot = SecretSnapshot::new();
        snapshot
            .add_setting(&mailchimp(), &format!("news={SECRET_A}"))
            .unwrap();

        let debug = format!("{:?}", snapshot);
        assert!(debug.contains("mailchimp/news"));
        assert!(!debug.contains(SECRET_A));
    }

    #[tokio::test]
    async fn test_lookup_returns_configured_secret() {
        let mut snapshot = SecretSnapshot::new();
        snapshot
            .add_setting(&mailchimp(), &format!("news={SECRET_A}"))
            .unwrap();

        let found = snapshot
            .get_secret(&mailchimp(), &RouteId::new("NEWS"))
            .await
            .unwrap()
            .expect("secret should be configured");
        assert_eq!(found.expose_bytes(), SECRET_A.as_bytes());

        let missing = snapshot
            .get_secret(&ReceiverName::new("other").unwrap(), &RouteId::new("news"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
