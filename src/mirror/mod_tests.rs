// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the mirror registry and routing

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::errors::ConfigError;

    const OPERATOR_NS: &str = "external-dns-operator";
    const OPERAND_NS: &str = "external-dns";

    fn trusted_ca() -> MirrorSpec {
        MirrorSpec {
            kind: MirrorKind::ConfigMap,
            source: ObjectKey::new(OPERATOR_NS, "trusted-ca"),
            target: ObjectKey::new(OPERAND_NS, "external-dns-trusted-ca-bundle"),
            projection: Projection::identity(),
            owner: None,
        }
    }

    fn registry() -> MirrorRegistry {
        let mut registry = MirrorRegistry::default();
        registry.register(trusted_ca()).unwrap();
        registry
    }

    #[test]
    fn test_object_key_display() {
        assert_eq!(ObjectKey::new("ns", "name").to_string(), "ns/name");
    }

    #[test]
    fn test_target_name_rule_fixed() {
        let rule = TargetNameRule::Fixed("bundle".to_string());
        assert_eq!(rule.resolve("anything"), "bundle");
    }

    #[test]
    fn test_from_config_resolves_target_name() {
        let config = MirrorConfig {
            source_namespace: OPERATOR_NS.to_string(),
            target_namespace: OPERAND_NS.to_string(),
            source_name: "creds".to_string(),
            target_name: TargetNameRule::Fixed("copy-creds".to_string()),
        };
        let spec = MirrorSpec::from_config(MirrorKind::Secret, &config, Projection::identity());

        assert_eq!(spec.source, ObjectKey::new(OPERATOR_NS, "creds"));
        assert_eq!(spec.target, ObjectKey::new(OPERAND_NS, "copy-creds"));
        assert!(spec.owner.is_none());
    }

    #[test]
    fn test_route_source_side_exact_match() {
        let registry = registry();
        let source = ObjectKey::new(OPERATOR_NS, "trusted-ca");

        assert_eq!(
            registry.route(MirrorKind::ConfigMap, Side::Source, &source),
            Some(source)
        );
    }

    #[test]
    fn test_route_target_side_maps_to_source() {
        let registry = registry();

        assert_eq!(
            registry.route(
                MirrorKind::ConfigMap,
                Side::Target,
                &ObjectKey::new(OPERAND_NS, "external-dns-trusted-ca-bundle"),
            ),
            Some(ObjectKey::new(OPERATOR_NS, "trusted-ca"))
        );
    }

    #[test]
    fn test_route_rejects_unrelated_objects() {
        let registry = registry();

        // Same name, wrong namespace.
        assert_eq!(
            registry.route(
                MirrorKind::ConfigMap,
                Side::Source,
                &ObjectKey::new("default", "trusted-ca"),
            ),
            None
        );
        // Right namespace, wrong name.
        assert_eq!(
            registry.route(
                MirrorKind::ConfigMap,
                Side::Target,
                &ObjectKey::new(OPERAND_NS, "some-other-configmap"),
            ),
            None
        );
        // Source identity observed on the target stream.
        assert_eq!(
            registry.route(
                MirrorKind::ConfigMap,
                Side::Target,
                &ObjectKey::new(OPERATOR_NS, "trusted-ca"),
            ),
            None
        );
    }

    #[test]
    fn test_route_is_kind_scoped() {
        let registry = registry();
        assert_eq!(
            registry.route(
                MirrorKind::Secret,
                Side::Source,
                &ObjectKey::new(OPERATOR_NS, "trusted-ca"),
            ),
            None
        );
    }

    #[test]
    fn test_register_rejects_duplicate_source() {
        let mut registry = registry();
        let mut dup = trusted_ca();
        dup.target = ObjectKey::new(OPERAND_NS, "another-target");

        assert!(matches!(
            registry.register(dup),
            Err(ConfigError::DuplicateSource { .. })
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_rejects_duplicate_target() {
        let mut registry = registry();
        let mut dup = trusted_ca();
        dup.source = ObjectKey::new(OPERATOR_NS, "another-source");

        let err = registry.register(dup).unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateTarget {
                target: ObjectKey::new(OPERAND_NS, "external-dns-trusted-ca-bundle"),
                existing: ObjectKey::new(OPERATOR_NS, "trusted-ca"),
            }
        );
    }

    #[test]
    fn test_same_identity_allowed_for_different_kinds() {
        let mut registry = registry();
        let mut secret = trusted_ca();
        secret.kind = MirrorKind::Secret;

        registry.register(secret).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.mirrors_of(MirrorKind::Secret).count(), 1);
    }

    #[test]
    fn test_register_rejects_self_mirror() {
        let mut registry = MirrorRegistry::default();
        let mut spec = trusted_ca();
        spec.target = spec.source.clone();

        assert!(matches!(
            registry.register(spec),
            Err(ConfigError::SelfMirror { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_rejects_empty_names() {
        let mut registry = MirrorRegistry::default();
        let mut spec = trusted_ca();
        spec.source.name = String::new();

        assert_eq!(
            registry.register(spec),
            Err(ConfigError::EmptyValue {
                field: "mirror source"
            })
        );
    }

    #[test]
    fn test_get_by_source() {
        let registry = registry();
        let spec = registry
            .get(
                MirrorKind::ConfigMap,
                &ObjectKey::new(OPERATOR_NS, "trusted-ca"),
            )
            .unwrap();
        assert_eq!(spec.target.name, "external-dns-trusted-ca-bundle");
        assert!(registry
            .get(MirrorKind::ConfigMap, &spec.target)
            .is_none());
    }

    #[test]
    fn test_namespaces_per_side() {
        let mut registry = registry();
        let mut second = trusted_ca();
        second.source = ObjectKey::new("openshift-config", "user-ca");
        second.target = ObjectKey::new(OPERAND_NS, "user-ca-copy");
        registry.register(second).unwrap();

        let sources = registry.namespaces(MirrorKind::ConfigMap, Side::Source);
        let targets = registry.namespaces(MirrorKind::ConfigMap, Side::Target);

        assert_eq!(
            sources.into_iter().collect::<Vec<_>>(),
            vec![OPERATOR_NS.to_string(), "openshift-config".to_string()]
        );
        assert_eq!(
            targets.into_iter().collect::<Vec<_>>(),
            vec![OPERAND_NS.to_string()]
        );
        assert!(registry
            .namespaces(MirrorKind::Secret, Side::Source)
            .is_empty());
    }
}
