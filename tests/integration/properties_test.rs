//! Agent Properties Integration Tests

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::Level;
use tracing_subscriber::prelude::*;

use dotnet_workflow::services::properties::{AgentPropertiesProvider, AgentProperty, PropertiesAggregator};
use dotnet_workflow::{AppError, AppResult};

use crate::common::CaptureLayer;

struct Provider {
    name: &'static str,
    delay_ms: u64,
    properties: Vec<AgentProperty>,
}

#[async_trait]
impl AgentPropertiesProvider for Provider {
    fn description(&self) -> String {
        self.name.to_string()
    }

    async fn properties(&self) -> AppResult<Vec<AgentProperty>> {
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        Ok(self.properties.clone())
    }
}

struct Broken;

#[async_trait]
impl AgentPropertiesProvider for Broken {
    fn description(&self) -> String {
        "broken".to_string()
    }

    async fn properties(&self) -> AppResult<Vec<AgentProperty>> {
        Err(AppError::not_found("tool is missing"))
    }
}

fn provider(name: &'static str, delay_ms: u64, properties: &[(&str, &str)]) -> Arc<dyn AgentPropertiesProvider> {
    Arc::new(Provider {
        name,
        delay_ms,
        properties: properties.iter().map(|(n, v)| AgentProperty::new(*n, *v)).collect(),
    })
}

#[tokio::test]
async fn test_collision_keeps_one_value_and_warns_once() {
    let (layer, capture) = CaptureLayer::new();
    let subscriber = tracing_subscriber::registry().with(layer);
    let _guard = tracing::subscriber::set_default(subscriber);

    let aggregator = PropertiesAggregator::new(vec![
        provider("first", 0, &[("DotNetCLI", "8.0.100"), ("DotNetCLI_Path", "/usr/bin/dotnet")]),
        provider("second", 20, &[("DotNetCLI", "9.0.100")]),
        Arc::new(Broken),
    ]);
    let properties = aggregator.aggregate().await;

    assert_eq!(properties.len(), 2);
    assert!(["8.0.100", "9.0.100"].contains(&properties["DotNetCLI"].as_str()));
    assert_eq!(properties["DotNetCLI_Path"], "/usr/bin/dotnet");

    let warnings = capture.messages_at(Level::WARN);
    assert_eq!(warnings.len(), 1, "warnings: {:?}", warnings);
    assert!(warnings[0].contains("Update DotNetCLI="));
    assert!(warnings[0].contains("Previous value was"));

    let debug = capture.messages_at(Level::DEBUG);
    assert!(debug.iter().any(|m| m.contains("broken") && m.contains("tool is missing")));
}

#[tokio::test]
async fn test_bounded_pool_still_completes_every_provider() {
    let providers: Vec<Arc<dyn AgentPropertiesProvider>> = (0..8)
        .map(|i| {
            Arc::new(Provider {
                name: "numbered",
                delay_ms: 5,
                properties: vec![AgentProperty::new(format!("p{}", i), i.to_string())],
            }) as Arc<dyn AgentPropertiesProvider>
        })
        .collect();

    let properties = PropertiesAggregator::new(providers).with_max_parallel(2).aggregate().await;
    assert_eq!(properties.len(), 8);
    assert_eq!(properties["p7"], "7");
}
