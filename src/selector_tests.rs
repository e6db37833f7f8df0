// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `selector.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::crd::{
        ExternalDNSProvider, ExternalDNSSource, ExternalDNSSpec, ProviderType, SecretReference,
    };
    use clap::Parser;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn config() -> OperatorConfig {
        OperatorConfig::try_parse_from([
            "external-dns-operator",
            "--operator-namespace",
            "external-dns-operator",
            "--operand-namespace",
            "external-dns",
        ])
        .unwrap()
    }

    fn extdns(name: &str, secret: Option<&str>) -> Arc<ExternalDNS> {
        Arc::new(ExternalDNS::new(
            name,
            ExternalDNSSpec {
                provider: ExternalDNSProvider {
                    r#type: ProviderType::Aws,
                    credentials: secret.map(|s| SecretReference {
                        name: s.to_string(),
                    }),
                    infoblox: None,
                },
                source: ExternalDNSSource::default(),
                zones: Vec::new(),
                domains: Vec::new(),
            },
        ))
    }

    fn secret(namespace: &str, name: &str) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn names(refs: &[ObjectRef<ExternalDNS>]) -> Vec<String> {
        let mut names: Vec<String> = refs.iter().map(|r| r.name.clone()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_source_secret_maps_to_all_referencing_resources() {
        let resources = vec![
            extdns("a", Some("aws-creds")),
            extdns("b", Some("aws-creds")),
            extdns("c", Some("other-creds")),
            extdns("d", None),
        ];

        let refs = externaldns_for_secret(
            resources,
            &config(),
            &secret("external-dns-operator", "aws-creds"),
        );
        assert_eq!(names(&refs), vec!["a", "b"]);
    }

    #[test]
    fn test_same_name_in_other_namespace_is_ignored() {
        let refs = externaldns_for_secret(
            vec![extdns("a", Some("aws-creds"))],
            &config(),
            &secret("default", "aws-creds"),
        );
        assert!(refs.is_empty());
    }

    #[test]
    fn test_mirrored_copy_maps_back_by_name() {
        let refs = externaldns_for_secret(
            Vec::new(),
            &config(),
            &secret("external-dns", "external-dns-credentials-sample"),
        );
        assert_eq!(names(&refs), vec!["sample"]);
        assert!(refs[0].namespace.is_none());
    }

    #[test]
    fn test_unrelated_operand_secret_is_ignored() {
        let refs = externaldns_for_secret(
            vec![extdns("a", Some("aws-creds"))],
            &config(),
            &secret("external-dns", "aws-creds"),
        );
        assert!(refs.is_empty());
    }

    #[test]
    fn test_secret_without_namespace_is_ignored() {
        let mut unnamespaced = secret("external-dns-operator", "aws-creds");
        unnamespaced.metadata.namespace = None;

        let refs =
            externaldns_for_secret(vec![extdns("a", Some("aws-creds"))], &config(), &unnamespaced);
        assert!(refs.is_empty());
    }

    #[test]
    fn test_shared_namespace_maps_both_ways() {
        let mut shared = config();
        shared.operand_namespace = shared.operator_namespace.clone();

        let refs = externaldns_for_secret(
            vec![extdns("sample", Some("external-dns-credentials-sample"))],
            &shared,
            &secret("external-dns-operator", "external-dns-credentials-sample"),
        );
        assert_eq!(names(&refs), vec!["sample"]);
    }
}
