use anyhow::Result;
use serde_json::json;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use trustmesh_core::{
    refresh, ApplicationProvider, ResourceCapacity, ResourceProvider, Stakeholder, StaticFeed,
    TrustEvaluator,
};
use trustmesh_model::{AttributeKind, TrustConfig};
use trustmesh_types::{Coordinates, Did, TrustCalcMode};

fn report(title: &str, evaluator: &TrustEvaluator, stakeholders: &[Stakeholder]) {
    info!("{}", title);
    for s in stakeholders {
        info!("  {}: {:.4}", s.name(), s.trust());
    }
    let trusted: Vec<String> = evaluator
        .trusted_stakeholders()
        .iter()
        .map(ToString::to_string)
        .collect();
    info!("  trusted: [{}]", trusted.join(", "));
}

/// Evaluate every stakeholder in the given order
fn evaluate_all(evaluator: &mut TrustEvaluator, stakeholders: &mut [Stakeholder]) {
    for s in stakeholders.iter_mut() {
        if let Err(err) = evaluator.evaluate(s) {
            info!("  {} not re-evaluated: {}", s.name(), err);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("Starting TrustMesh demo...");

    let mode = match std::env::args().nth(1) {
        Some(raw) => raw.parse::<TrustCalcMode>()?,
        None => TrustCalcMode::Probabilistic,
    };
    let mut evaluator = TrustEvaluator::new(TrustConfig::default().with_mode(mode));
    info!("Evaluation mode: {}", evaluator.mode());

    // 1. A provider that will be trusted
    let provider = Stakeholder::from(ResourceProvider::new("Provider_A", "did:example:123"))
        .with_signals([
            (AttributeKind::Compliance, 1.0),
            (AttributeKind::HistoricalBehavior, 0.7),
            (AttributeKind::Reputation, 0.6),
            (AttributeKind::DirectTrust, 0.9),
        ])?;

    // 2. One of its resources, populated from the metrics aggregator
    let feed = StaticFeed::new().with_payload(
        "did:example:456",
        json!({
            "performanceMetrics": {"throughput": [800.0, 700.0], "bandwidth": [700.0, 700.0]},
            "location": {"lat": 46.05, "lon": 14.47},
            "historicalBehavior": {"trust": 0.8},
            "contextualFit": {"trust": 0.7},
            "thirdPartyValidation": {"trust": 0.6},
            "reputation": {"trust": 0.65},
            "directTrust": {"trust": 0.8}
        }),
    );
    let mut capacity: Stakeholder =
        ResourceCapacity::new("Capacity_A", "did:example:456", "did:example:123").into();
    let applied = refresh(&feed, &mut capacity).await?;
    info!("Applied {} aggregator fields to {}", applied, capacity.name());

    // 3. Two application providers, only one of them trustworthy
    let mut app_x = Stakeholder::from(ApplicationProvider::new("AppProvider_X", "did:example:789"))
        .with_signals([
            (AttributeKind::Compliance, 1.0),
            (AttributeKind::Reputation, 0.65),
            (AttributeKind::DirectTrust, 0.85),
        ])?;
    app_x.set_location(Coordinates::new(46.05, 14.47))?;
    let mut app_h = Stakeholder::from(ApplicationProvider::new("AppProvider_H", "did:example:326"))
        .with_signals([
            (AttributeKind::Compliance, 0.1),
            (AttributeKind::Reputation, 0.4),
            (AttributeKind::DirectTrust, 0.3),
        ])?;
    app_h.set_location(Coordinates::new(46.05, 14.47))?;

    let mut stakeholders = vec![provider, capacity, app_x, app_h];
    evaluate_all(&mut evaluator, &mut stakeholders);
    report("Initial trust scores:", &evaluator, &stakeholders);

    // 4. The resource reports worse performance
    let capacity_did = Did::new("did:example:456");
    if let Some(capacity) = stakeholders.iter_mut().find(|s| s.did() == &capacity_did) {
        capacity.record_observations("throughput", [500.0, 500.0])?;
        capacity.record_observations("bandwidth", [300.0, 300.0])?;
    }
    evaluate_all(&mut evaluator, &mut stakeholders);
    report("After the performance drop:", &evaluator, &stakeholders);

    // 5. The provider loses compliance, and with it the resource
    stakeholders[0].set_signal(AttributeKind::Compliance, Some(0.0))?;
    evaluate_all(&mut evaluator, &mut stakeholders);
    report("After provider compliance drops to 0:", &evaluator, &stakeholders);

    // 6. The trusted application moves out of the eligibility region
    stakeholders[2].set_location(Coordinates::new(0.0, 0.0))?;
    evaluate_all(&mut evaluator, &mut stakeholders);
    report("After AppProvider_X leaves the region:", &evaluator, &stakeholders);

    info!("Demo completed successfully!");
    Ok(())
}
