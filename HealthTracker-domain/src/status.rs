//! Service status checks
//! Reports whether storage and the completion API are usable.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::error;

use health_tracker_data::repository::StorageStatus;

use crate::clients::Summarizer;

/// Overall service status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStatus {
    /// All components are healthy
    Healthy,
    /// Some components are degraded but the system is functional
    Degraded,
    /// System is not functioning properly
    Unhealthy,
}

/// Status of one component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// A component with its status and optional details
#[derive(Debug, Clone, PartialEq)]
pub struct HealthComponent {
    pub status: ComponentStatus,
    pub details: Option<String>,
}

/// Status of the whole service
#[derive(Debug, Clone, PartialEq)]
pub struct SystemHealth {
    pub status: SystemStatus,
    /// Component name to status, sorted by name
    pub components: BTreeMap<String, HealthComponent>,
}

impl SystemHealth {
    /// Derive the overall status from the worst component
    pub fn from_components(components: BTreeMap<String, HealthComponent>) -> Self {
        let worst = components
            .values()
            .map(|component| component.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy);

        let status = match worst {
            ComponentStatus::Healthy => SystemStatus::Healthy,
            ComponentStatus::Degraded => SystemStatus::Degraded,
            ComponentStatus::Unhealthy => SystemStatus::Unhealthy,
        };

        Self { status, components }
    }
}

/// Trait for status services
#[async_trait]
pub trait StatusServiceTrait: Send + Sync {
    /// Check every component and report the overall status
    async fn get_system_health(&self) -> SystemHealth;
}

/// Status service over the storage backend and the summarizer
pub struct StatusService {
    storage: Arc<dyn StorageStatus>,
    summarizer: Arc<dyn Summarizer>,
}

impl StatusService {
    pub fn new(storage: Arc<dyn StorageStatus>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self { storage, summarizer }
    }

    async fn check_database(&self) -> HealthComponent {
        match self.storage.check().await {
            Ok(details) => HealthComponent {
                status: ComponentStatus::Healthy,
                details: Some(details),
            },
            Err(e) => {
                error!("{} storage check failed: {}", self.storage.backend(), e);
                HealthComponent {
                    status: ComponentStatus::Unhealthy,
                    details: Some(format!("{} storage unavailable: {}", self.storage.backend(), e)),
                }
            }
        }
    }

    fn check_completion_api(&self) -> HealthComponent {
        if self.summarizer.is_configured() {
            HealthComponent {
                status: ComponentStatus::Healthy,
                details: None,
            }
        } else {
            HealthComponent {
                status: ComponentStatus::Degraded,
                details: Some("No API key configured; summaries use the fallback text".to_string()),
            }
        }
    }
}

#[async_trait]
impl StatusServiceTrait for StatusService {
    async fn get_system_health(&self) -> SystemHealth {
        let mut components = BTreeMap::new();
        components.insert("database".to_string(), self.check_database().await);
        components.insert("completion_api".to_string(), self.check_completion_api());
        SystemHealth::from_components(components)
    }
}
