//! Evaluation flows across providers, resources and applications.

use trustmesh_core::{
    ApplicationProvider, ResourceCapacity, ResourceProvider, Stakeholder, StakeholderRegistry,
    TrustEvaluator,
};
use trustmesh_model::{AttributeKind, TrustConfig};
use trustmesh_types::{Coordinates, Did, StakeholderKind, StakeholderRef, TrustCalcMode};

fn provider_a() -> Stakeholder {
    Stakeholder::from(ResourceProvider::new("Provider_A", "did:example:123"))
        .with_signals([
            (AttributeKind::Compliance, 1.0),
            (AttributeKind::HistoricalBehavior, 0.7),
            (AttributeKind::Reputation, 0.6),
            (AttributeKind::DirectTrust, 0.9),
        ])
        .unwrap()
}

fn capacity_a() -> Stakeholder {
    capacity("Capacity_A", "did:example:456")
}

fn capacity(name: &str, did: &str) -> Stakeholder {
    let mut capacity = Stakeholder::from(ResourceCapacity::new(name, did, "did:example:123"))
    .with_signals([
        (AttributeKind::HistoricalBehavior, 0.8),
        (AttributeKind::ContextualFit, 0.7),
        (AttributeKind::ThirdPartyValidation, 0.6),
        (AttributeKind::Reputation, 0.65),
        (AttributeKind::DirectTrust, 0.8),
    ])
    .unwrap();
    capacity.set_location(Coordinates::new(46.05, 14.47)).unwrap();
    capacity
        .record_observations("throughput", [800.0, 700.0])
        .unwrap();
    capacity.record_observations("bandwidth", [700.0, 700.0]).unwrap();
    capacity
}

fn app(name: &str, did: &str, compliance: f64, reputation: f64, direct_trust: f64) -> Stakeholder {
    let mut app = Stakeholder::from(ApplicationProvider::new(name, did))
        .with_signals([
            (AttributeKind::Compliance, compliance),
            (AttributeKind::Reputation, reputation),
            (AttributeKind::DirectTrust, direct_trust),
        ])
        .unwrap();
    app.set_location(Coordinates::new(46.05, 14.47)).unwrap();
    app
}

#[test]
fn test_provider_scenario() {
    let mut evaluator = TrustEvaluator::default();
    let mut provider = provider_a();

    let trust = evaluator.compute_trust(&mut provider).unwrap();
    // weights 1.2, 0.1, 0.5, 0.5
    let expected = (1.2 * 1.0 + 0.1 * 0.7 + 0.5 * 0.6 + 0.5 * 0.9) / 2.3;
    assert!((trust - expected).abs() < 1e-12);
    assert!((trust - 0.8783).abs() < 1e-4);

    assert!(evaluator.trust_evaluation(&provider));
    assert_eq!(
        evaluator.trusted_stakeholders(),
        vec![StakeholderRef::new("Provider_A", Did::new("did:example:123"))]
    );
}

#[test]
fn test_invalid_identity_forces_zero() {
    let evaluator = TrustEvaluator::default();
    let mut provider = Stakeholder::from(ResourceProvider::new("Provider_B", "example:123"))
        .with_signals([
            (AttributeKind::Compliance, 1.0),
            (AttributeKind::HistoricalBehavior, 1.0),
            (AttributeKind::Reputation, 1.0),
            (AttributeKind::DirectTrust, 1.0),
        ])
        .unwrap();
    assert_eq!(evaluator.compute_trust(&mut provider).unwrap(), 0.0);
    assert_eq!(provider.trust(), 0.0);
}

#[test]
fn test_capacity_leaving_region_keeps_buffers() {
    let mut evaluator = TrustEvaluator::default();
    let mut provider = provider_a();
    let mut capacity = capacity_a();
    evaluator.evaluate(&mut provider).unwrap();
    assert!(evaluator.evaluate(&mut capacity).unwrap() > 0.5);
    assert!(evaluator.is_trusted(&capacity));

    capacity.record_observations("throughput", [900.0, 950.0]).unwrap();
    capacity.record_observations("bandwidth", [800.0, 850.0]).unwrap();
    capacity.set_location(Coordinates::new(0.0, 0.0)).unwrap();

    assert_eq!(evaluator.evaluate(&mut capacity).unwrap(), 0.0);
    assert_eq!(capacity.trust(), 0.0);
    assert_eq!(capacity.performance().unwrap().pending_count(), 4);
    assert!(!evaluator.is_trusted(&capacity));
    assert!(evaluator.is_trusted(&provider));
}

#[test]
fn test_capacity_invalid_identity_keeps_buffers() {
    let mut evaluator = TrustEvaluator::default();
    let mut provider = provider_a();
    evaluator.evaluate(&mut provider).unwrap();

    let mut capacity = capacity("Capacity_B", "example:456");
    assert_eq!(evaluator.compute_trust(&mut capacity).unwrap(), 0.0);
    assert_eq!(capacity.trust(), 0.0);
    assert_eq!(capacity.performance().unwrap().pending_count(), 4);
}

#[test]
fn test_app_invalid_identity_forces_zero() {
    let mut evaluator = TrustEvaluator::default();
    let mut app_y = app("AppProvider_Y", "example:789", 1.0, 1.0, 1.0);
    assert_eq!(evaluator.evaluate(&mut app_y).unwrap(), 0.0);
    assert!(!evaluator.is_trusted(&app_y));
}

#[test]
fn test_app_leaving_region_drops_out_of_trusted_set() {
    let mut evaluator = TrustEvaluator::default();
    let mut app_x = app("AppProvider_X", "did:example:789", 1.0, 0.65, 0.85);

    assert!(evaluator.evaluate(&mut app_x).unwrap() > 0.5);
    assert!(evaluator.is_trusted(&app_x));

    app_x.set_location(Coordinates::new(0.0, 0.0)).unwrap();
    assert_eq!(evaluator.evaluate(&mut app_x).unwrap(), 0.0);
    assert!(!evaluator.is_trusted(&app_x));
    assert!(evaluator.trusted_stakeholders().is_empty());
}

#[test]
fn test_low_signals_not_trusted() {
    let mut evaluator = TrustEvaluator::default();
    let mut app_h = app("AppProvider_H", "did:example:326", 0.1, 0.4, 0.3);
    let trust = evaluator.evaluate(&mut app_h).unwrap();
    assert!((trust - (0.7 * 0.1 + 0.7 * 0.4 + 0.7 * 0.3) / 2.1).abs() < 1e-12);
    assert!(!evaluator.is_trusted(&app_h));
}

#[test]
fn test_capacity_needs_evaluated_provider() {
    let mut evaluator = TrustEvaluator::default();
    let mut provider = provider_a();
    let mut capacity = capacity_a();

    // provider computed but never passed to trust_evaluation
    evaluator.compute_trust(&mut provider).unwrap();
    assert_eq!(evaluator.compute_trust(&mut capacity).unwrap(), 0.0);

    evaluator.trust_evaluation(&provider);
    let trust = evaluator.evaluate(&mut capacity).unwrap();
    assert!(trust > 0.5);
    assert!(evaluator.is_trusted(&capacity));
}

#[test]
fn test_provider_losing_trust_gates_capacity() {
    let mut evaluator = TrustEvaluator::with_mode(TrustCalcMode::Probabilistic);
    let mut provider = provider_a();
    let mut capacity = capacity_a();
    evaluator.evaluate(&mut provider).unwrap();
    evaluator.evaluate(&mut capacity).unwrap();
    assert_eq!(evaluator.trusted_set().len(), 2);

    provider.set_signal(AttributeKind::Compliance, Some(0.0)).unwrap();
    provider.set_signal(AttributeKind::Reputation, Some(0.0)).unwrap();
    provider.set_signal(AttributeKind::DirectTrust, Some(0.0)).unwrap();
    assert!(evaluator.evaluate(&mut provider).unwrap() < 0.5);
    assert_eq!(evaluator.evaluate(&mut capacity).unwrap(), 0.0);
    assert!(evaluator.trusted_stakeholders().is_empty());
}

#[test]
fn test_idempotent_membership() {
    let mut evaluator = TrustEvaluator::default();
    let mut provider = provider_a();
    evaluator.compute_trust(&mut provider).unwrap();
    evaluator.trust_evaluation(&provider);
    evaluator.trust_evaluation(&provider);
    assert_eq!(evaluator.trusted_set().len(), 1);
    assert_eq!(evaluator.trusted_set().version(), 1);

    provider.set_signal(AttributeKind::Compliance, Some(0.0)).unwrap();
    provider.set_signal(AttributeKind::Reputation, Some(0.0)).unwrap();
    evaluator.compute_trust(&mut provider).unwrap();
    assert!(!evaluator.trust_evaluation(&provider));
    assert!(evaluator.trusted_set().is_empty());
    assert_eq!(evaluator.trusted_set().version(), 2);
}

#[test]
fn test_probabilistic_performance_reacts_to_drop() {
    let mut evaluator = TrustEvaluator::with_mode(TrustCalcMode::Probabilistic);
    let mut provider = provider_a();
    let mut capacity = capacity_a();
    evaluator.evaluate(&mut provider).unwrap();
    let before = evaluator.evaluate(&mut capacity).unwrap();

    capacity.record_observations("throughput", [500.0, 500.0]).unwrap();
    capacity.record_observations("bandwidth", [300.0, 300.0]).unwrap();
    let after = evaluator.evaluate(&mut capacity).unwrap();
    assert!(after < before);
}

#[test]
fn test_deterministic_mode_requires_fresh_observations() {
    let mut evaluator = TrustEvaluator::with_mode(TrustCalcMode::Deterministic);
    let mut provider = provider_a();
    let mut capacity = capacity_a();
    evaluator.evaluate(&mut provider).unwrap();
    let first = evaluator.evaluate(&mut capacity).unwrap();

    assert!(evaluator.evaluate(&mut capacity).is_err());
    assert_eq!(capacity.trust(), first);
}

#[test]
fn test_registry_evaluates_providers_first() {
    let mut registry = StakeholderRegistry::new();
    // registered out of dependency order
    registry.register(app("AppProvider_X", "did:example:789", 1.0, 0.65, 0.85)).unwrap();
    registry.register(capacity_a()).unwrap();
    registry.register(provider_a()).unwrap();

    let mut evaluator = TrustEvaluator::default();
    let report = evaluator.evaluate_registry(&mut registry);

    let order: Vec<StakeholderKind> = report.outcomes.iter().map(|o| o.kind).collect();
    assert_eq!(
        order,
        vec![
            StakeholderKind::ResourceProvider,
            StakeholderKind::ResourceCapacity,
            StakeholderKind::ApplicationProvider,
        ]
    );
    assert_eq!(report.failures().count(), 0);
    assert_eq!(report.trusted.len(), 3);
    let capacity = report.outcome(&Did::new("did:example:456")).unwrap();
    assert!(capacity.trusted);
    assert!(*capacity.trust.as_ref().unwrap() > 0.5);
}

#[test]
fn test_config_threshold_applies() {
    let config = TrustConfig::default().with_threshold(0.9);
    let mut evaluator = TrustEvaluator::new(config);
    let mut provider = provider_a();
    evaluator.evaluate(&mut provider).unwrap();
    assert!(!evaluator.is_trusted(&provider));
}
