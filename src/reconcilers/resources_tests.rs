// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `resources.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use k8s_openapi::api::core::v1::ServiceAccount;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn service_account(name: Option<&str>) -> ServiceAccount {
        ServiceAccount {
            metadata: ObjectMeta {
                name: name.map(ToString::to_string),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_resource_name() {
        let sa = service_account(Some("external-dns-sample"));
        assert_eq!(resource_name(&sa).unwrap(), "external-dns-sample");
    }

    #[test]
    fn test_resource_without_name_is_rejected() {
        assert!(resource_name(&service_account(None)).is_err());
        assert!(resource_name(&service_account(Some(""))).is_err());
    }

    #[tokio::test]
    #[ignore] // Requires Kubernetes cluster
    async fn test_create_then_apply() {
        let client = kube::Client::try_default().await.unwrap();
        let sa = service_account(Some("create-or-apply-test"));

        let first = create_or_apply(&client, "default", &sa, "external-dns-operator")
            .await
            .unwrap();
        let second = create_or_apply(&client, "default", &sa, "external-dns-operator")
            .await
            .unwrap();

        assert_eq!(first, ApplyOutcome::Created);
        assert_eq!(second, ApplyOutcome::Applied);
    }
}
