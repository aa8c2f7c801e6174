//! Stakeholder construction, records and ingestion flows.

use serde_json::json;
use trustmesh_core::{
    apply_payload, refresh_all, EvaluationError, Stakeholder, StakeholderRecord,
    StakeholderRegistry, StaticFeed, TrustEvaluator,
};
use trustmesh_model::AttributeKind;
use trustmesh_types::{Did, StakeholderKind, TrustCalcMode};

fn record(did: &str, kind: u8, name: &str) -> StakeholderRecord {
    serde_json::from_value(json!({"did": did, "type": kind, "name": name})).unwrap()
}

#[test]
fn test_records_load_into_registry() {
    let mut provider = record("did:example:123", 0, "Provider_A");
    provider.compliance = Some(1.0);
    provider.reputation = Some(0.6);
    let mut capacity = record("did:example:456", 1, "Capacity_A");
    capacity.provider = Some(Did::new("did:example:123"));
    capacity.location_lat = Some(46.05);
    capacity.location_lon = Some(14.47);

    let registry = StakeholderRegistry::from_records([&provider, &capacity]).unwrap();
    assert_eq!(registry.len(), 2);
    assert_eq!(
        registry.by_kind(StakeholderKind::ResourceCapacity).count(),
        1
    );
    assert_eq!(registry.records(), vec![provider, capacity]);
}

#[test]
fn test_unknown_kind_codes_rejected() {
    for code in [3u8, 4] {
        let row = record("did:example:999", code, "Mystery");
        assert!(matches!(
            Stakeholder::from_record(&row),
            Err(EvaluationError::UnknownStakeholderKind(_))
        ));
    }
    let orphan = record("did:example:998", 1, "Orphan");
    assert!(matches!(
        StakeholderRegistry::from_records([&orphan]),
        Err(EvaluationError::InvalidRecord(_))
    ));
}

#[test]
fn test_payload_then_evaluate() {
    let mut capacity_row = record("did:example:456", 1, "Capacity_A");
    capacity_row.provider = Some(Did::new("did:example:123"));
    let mut capacity = Stakeholder::from_record(&capacity_row).unwrap();

    apply_payload(
        &mut capacity,
        &json!({
            "performanceMetrics": {"availability": [0.99, 0.98], "latency": [40.0, 60.0]},
            "reputation": {"trust": 0.9},
            "directTrust": {"trust": 0.9}
        }),
    )
    .unwrap();
    assert_eq!(capacity.performance().unwrap().pending_count(), 4);

    let mut provider_row = record("did:example:123", 0, "Provider_A");
    provider_row.compliance = Some(1.0);
    provider_row.historical_behavior = Some(0.7);
    provider_row.reputation = Some(0.6);
    provider_row.direct_trust = Some(0.9);
    let mut provider = Stakeholder::from_record(&provider_row).unwrap();

    let mut evaluator = TrustEvaluator::with_mode(TrustCalcMode::Deterministic);
    evaluator.evaluate(&mut provider).unwrap();
    assert!(evaluator.evaluate(&mut capacity).unwrap() > 0.5);
    assert_eq!(capacity.performance().unwrap().pending_count(), 0);
}

#[tokio::test]
async fn test_refresh_all_from_static_feed() {
    let mut registry = StakeholderRegistry::new();
    let mut provider = record("did:example:123", 0, "Provider_A");
    provider.compliance = Some(0.2);
    registry
        .register(Stakeholder::from_record(&provider).unwrap())
        .unwrap();

    let feed = StaticFeed::new().with_payload(
        "did:example:123",
        json!({"compliance": {"trust": 0.95}, "reputation": {"trust": 0.7}}),
    );
    let results = refresh_all(&feed, &mut registry).await;
    assert_eq!(results, vec![(Did::new("did:example:123"), Ok(2))]);

    let provider = registry.get(&Did::new("did:example:123")).unwrap();
    assert_eq!(
        provider
            .attribute(AttributeKind::Compliance)
            .unwrap()
            .signal_value(),
        Some(0.95)
    );
}
