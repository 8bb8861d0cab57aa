//! Agent Properties
//!
//! Capability detection for the agent. Every registered provider is queried
//! concurrently on a bounded pool; results are merged into one map under a
//! single lock. A failing or panicking provider is logged and skipped, it
//! never affects its siblings.
//!
//! When two providers report the same name the value committed last wins.
//! Completion order is not defined, so neither is the winner.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::instrument::WithSubscriber;

use dotnet_workflow_core::{CommandLine, CommandLineArgument, TargetType};
use dotnet_workflow_tools::{ToolResolver, VersionParser};

use crate::services::executor::CommandLineExecutor;
use crate::utils::error::AppResult;

pub const DOTNET_CLI_PROPERTY: &str = "DotNetCLI";
pub const DOTNET_CLI_PATH_PROPERTY: &str = "DotNetCLI_Path";
pub const MONO_PROPERTY: &str = "Mono";
pub const MONO_VERSION_PROPERTY: &str = "MonoVersion";

const DEFAULT_MAX_PARALLEL: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentProperty {
    pub name: String,
    pub value: String,
}

impl AgentProperty {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[async_trait]
pub trait AgentPropertiesProvider: Send + Sync {
    fn description(&self) -> String;

    async fn properties(&self) -> AppResult<Vec<AgentProperty>>;
}

// ============================================================================
// Aggregator
// ============================================================================

pub struct PropertiesAggregator {
    providers: Vec<Arc<dyn AgentPropertiesProvider>>,
    max_parallel: usize,
}

impl PropertiesAggregator {
    pub fn new(providers: Vec<Arc<dyn AgentPropertiesProvider>>) -> Self {
        Self {
            providers,
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    /// Query every provider and wait for all of them to finish or fail.
    pub async fn aggregate(&self) -> BTreeMap<String, String> {
        tracing::info!("[PropertiesAggregator] Fetching agent properties");
        let properties = Arc::new(Mutex::new(BTreeMap::new()));
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut tasks = JoinSet::new();

        for provider in &self.providers {
            let provider = provider.clone();
            let properties = properties.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(
                async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return;
                    };
                    fetch(provider.as_ref(), &properties).await;
                }
                .with_current_subscriber(),
            );
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::debug!("[PropertiesAggregator] Provider task failed: {}", e);
            }
        }

        let properties = properties.lock().unwrap_or_else(|e| e.into_inner());
        properties.clone()
    }
}

async fn fetch(provider: &dyn AgentPropertiesProvider, properties: &Mutex<BTreeMap<String, String>>) {
    let description = provider.description();
    tracing::debug!("[PropertiesAggregator] Fetching agent properties for {}", description);

    let fetched = match provider.properties().await {
        Ok(fetched) => fetched,
        Err(e) => {
            tracing::debug!(
                "[PropertiesAggregator] Error while fetching the agent properties for {}: {}",
                description,
                e
            );
            return;
        }
    };

    for property in fetched {
        let mut properties = properties.lock().unwrap_or_else(|e| e.into_inner());
        match properties.insert(property.name.clone(), property.value.clone()) {
            Some(previous) => tracing::warn!(
                "[PropertiesAggregator] Update {}=\"{}\". Previous value was \"{}\".",
                property.name,
                property.value,
                previous
            ),
            None => tracing::info!("[PropertiesAggregator] {}=\"{}\".", property.name, property.value),
        }
    }
}

// ============================================================================
// Providers
// ============================================================================

fn version_probe(executable: impl Into<PathBuf>) -> CommandLine {
    CommandLine::new(TargetType::Tool, executable, ".")
        .with_arguments(vec![CommandLineArgument::mandatory("--version")])
}

/// Reports the `dotnet` CLI version and location.
pub struct DotnetPropertiesProvider {
    tool_resolver: Arc<dyn ToolResolver>,
    executor: Arc<dyn CommandLineExecutor>,
    version_parser: Arc<dyn VersionParser>,
}

impl DotnetPropertiesProvider {
    pub fn new(
        tool_resolver: Arc<dyn ToolResolver>,
        executor: Arc<dyn CommandLineExecutor>,
        version_parser: Arc<dyn VersionParser>,
    ) -> Self {
        Self {
            tool_resolver,
            executor,
            version_parser,
        }
    }
}

#[async_trait]
impl AgentPropertiesProvider for DotnetPropertiesProvider {
    fn description(&self) -> String {
        ".NET CLI".to_string()
    }

    async fn properties(&self) -> AppResult<Vec<AgentProperty>> {
        let executable = self.tool_resolver.executable().path;
        let Some(result) = self.executor.try_execute(&version_probe(executable.clone())).await else {
            tracing::debug!("[DotnetPropertiesProvider] .NET CLI not found");
            return Ok(Vec::new());
        };

        let version = self.version_parser.parse(&result.standard_output);
        if result.exit_code != 0 || version.is_empty() {
            tracing::debug!("[DotnetPropertiesProvider] .NET CLI not found");
            return Ok(Vec::new());
        }

        Ok(vec![
            AgentProperty::new(DOTNET_CLI_PROPERTY, version.to_string()),
            AgentProperty::new(DOTNET_CLI_PATH_PROPERTY, executable.to_string_lossy()),
        ])
    }
}

/// Reports the Mono runtime location and version.
pub struct MonoPropertiesProvider {
    executable: PathBuf,
    executor: Arc<dyn CommandLineExecutor>,
    version_parser: Arc<dyn VersionParser>,
}

impl MonoPropertiesProvider {
    pub fn new(executor: Arc<dyn CommandLineExecutor>, version_parser: Arc<dyn VersionParser>) -> Self {
        Self {
            executable: PathBuf::from("mono"),
            executor,
            version_parser,
        }
    }

    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }
}

#[async_trait]
impl AgentPropertiesProvider for MonoPropertiesProvider {
    fn description(&self) -> String {
        "Mono".to_string()
    }

    async fn properties(&self) -> AppResult<Vec<AgentProperty>> {
        tracing::debug!("[MonoPropertiesProvider] Locating Mono");
        let result = self.executor.try_execute(&version_probe(self.executable.clone())).await;
        let version = result
            .map(|r| self.version_parser.parse(&r.standard_output))
            .unwrap_or_default();

        if version.is_empty() {
            tracing::debug!("[MonoPropertiesProvider] Mono not found");
            return Ok(Vec::new());
        }

        tracing::info!(
            "[MonoPropertiesProvider] Found Mono {} at {}",
            version,
            self.executable.display()
        );
        Ok(vec![
            AgentProperty::new(MONO_PROPERTY, self.executable.to_string_lossy()),
            AgentProperty::new(MONO_VERSION_PROPERTY, version.to_string()),
        ])
    }
}
