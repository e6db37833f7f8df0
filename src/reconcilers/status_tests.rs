// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `status.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{
        Condition, ExternalDNS, ExternalDNSProvider, ExternalDNSSource, ExternalDNSSpec,
        ExternalDNSStatus, ProviderType,
    };
    use crate::reconcilers::status::{
        conditions_equal, create_condition, find_condition, update_condition_in_memory,
        ExternalDNSStatusUpdater, CONDITION_AVAILABLE, CONDITION_DEGRADED,
    };

    const STATUS_TRUE: &str = "True";
    const STATUS_FALSE: &str = "False";

    fn extdns(status: Option<ExternalDNSStatus>) -> ExternalDNS {
        let mut extdns = ExternalDNS::new(
            "sample",
            ExternalDNSSpec {
                provider: ExternalDNSProvider {
                    r#type: ProviderType::Aws,
                    credentials: None,
                    infoblox: None,
                },
                source: ExternalDNSSource::default(),
                zones: vec!["Z1".to_string()],
                domains: Vec::new(),
            },
        );
        extdns.metadata.generation = Some(2);
        extdns.status = status;
        extdns
    }

    #[test]
    fn test_create_condition_basic() {
        let condition = create_condition(CONDITION_AVAILABLE, STATUS_TRUE, "OperandReady", "ok");

        assert_eq!(condition.r#type, CONDITION_AVAILABLE);
        assert_eq!(condition.status, STATUS_TRUE);
        assert_eq!(condition.reason, Some("OperandReady".to_string()));
        assert_eq!(condition.message, Some("ok".to_string()));
        assert!(condition.last_transition_time.is_some());
    }

    #[test]
    fn test_find_condition() {
        let conditions = vec![
            create_condition(CONDITION_AVAILABLE, STATUS_TRUE, "OperandReady", ""),
            create_condition(CONDITION_DEGRADED, STATUS_FALSE, "ReconcileSucceeded", ""),
        ];

        let degraded = find_condition(&conditions, CONDITION_DEGRADED).unwrap();
        assert_eq!(degraded.status, STATUS_FALSE);
        assert!(find_condition(&conditions, "Progressing").is_none());
    }

    #[test]
    fn test_update_preserves_transition_time_when_status_unchanged() {
        let mut conditions = vec![Condition {
            r#type: CONDITION_AVAILABLE.to_string(),
            status: STATUS_TRUE.to_string(),
            reason: Some("OperandReady".to_string()),
            message: Some("old".to_string()),
            last_transition_time: Some("2025-01-01T00:00:00+00:00".to_string()),
        }];

        update_condition_in_memory(
            &mut conditions,
            CONDITION_AVAILABLE,
            STATUS_TRUE,
            "OperandReady",
            "new",
        );

        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].message.as_deref(), Some("new"));
        assert_eq!(
            conditions[0].last_transition_time.as_deref(),
            Some("2025-01-01T00:00:00+00:00")
        );
    }

    #[test]
    fn test_update_resets_transition_time_on_flip() {
        let mut conditions = vec![Condition {
            r#type: CONDITION_AVAILABLE.to_string(),
            status: STATUS_TRUE.to_string(),
            reason: None,
            message: None,
            last_transition_time: Some("2025-01-01T00:00:00+00:00".to_string()),
        }];

        update_condition_in_memory(
            &mut conditions,
            CONDITION_AVAILABLE,
            STATUS_FALSE,
            "InvalidSpec",
            "bad",
        );

        assert_ne!(
            conditions[0].last_transition_time.as_deref(),
            Some("2025-01-01T00:00:00+00:00")
        );
    }

    #[test]
    fn test_conditions_equal_ignores_timestamps() {
        let a = vec![create_condition(CONDITION_AVAILABLE, STATUS_TRUE, "OperandReady", "")];
        let mut b = a.clone();
        b[0].last_transition_time = Some("2020-01-01T00:00:00+00:00".to_string());
        assert!(conditions_equal(&a, &b));

        b[0].status = STATUS_FALSE.to_string();
        assert!(!conditions_equal(&a, &b));
        assert!(!conditions_equal(&a, &[]));
    }

    #[test]
    fn test_first_status_is_a_change() {
        let mut updater = ExternalDNSStatusUpdater::new(&extdns(None));
        updater.set_available("configured");
        assert!(updater.has_changes());
    }

    #[test]
    fn test_same_status_is_not_a_change() {
        let mut first = ExternalDNSStatusUpdater::new(&extdns(None));
        first.set_available("configured");
        first.set_observed_generation(Some(2));
        first.set_zones(&["Z1".to_string()]);

        let written = first.status().clone();
        let mut second = ExternalDNSStatusUpdater::new(&extdns(Some(written)));
        second.set_available("configured");
        second.set_observed_generation(Some(2));
        second.set_zones(&["Z1".to_string()]);

        assert!(!second.has_changes());
    }

    #[test]
    fn test_degraded_then_available() {
        let mut updater = ExternalDNSStatusUpdater::new(&extdns(None));
        updater.set_degraded("InvalidSpec", "missing credentials");

        let conditions = &updater.status().conditions;
        assert_eq!(
            find_condition(conditions, CONDITION_DEGRADED).unwrap().status,
            STATUS_TRUE
        );
        assert_eq!(
            find_condition(conditions, CONDITION_AVAILABLE).unwrap().status,
            STATUS_FALSE
        );

        let mut recovered = ExternalDNSStatusUpdater::new(&extdns(Some(updater.status().clone())));
        recovered.set_available("configured");
        assert!(recovered.has_changes());
        assert_eq!(
            find_condition(&recovered.status().conditions, CONDITION_DEGRADED)
                .unwrap()
                .status,
            STATUS_FALSE
        );
    }
}
