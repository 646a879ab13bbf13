//! Windows service state check
//!
//! Polls a host's service manager for the state of each configured service
//! and reports a `windows_service.state` service check per service.

use crate::config::{ConfigError, InstanceConfig};
use crate::driver::{AgentCheck, CheckError};
use crate::models::CheckStatus;
use crate::store::MetricSink;
use anyhow::{Context, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub const SERVICE_CHECK_NAME: &str = "windows_service.state";

/// Run states reported by the service manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceState {
    Stopped,
    StartPending,
    StopPending,
    Running,
    ContinuePending,
    PausePending,
    Paused,
    Unknown,
}

/// State label -> reported status
const STATE_TO_STATUS: [(ServiceState, &str, CheckStatus); 8] = [
    (ServiceState::Stopped, "Stopped", CheckStatus::Critical),
    (ServiceState::StartPending, "Start Pending", CheckStatus::Warning),
    (ServiceState::StopPending, "Stop Pending", CheckStatus::Warning),
    (ServiceState::Running, "Running", CheckStatus::Ok),
    (ServiceState::ContinuePending, "Continue Pending", CheckStatus::Warning),
    (ServiceState::PausePending, "Pause Pending", CheckStatus::Warning),
    (ServiceState::Paused, "Paused", CheckStatus::Warning),
    (ServiceState::Unknown, "Unknown", CheckStatus::Unknown),
];

impl ServiceState {
    /// Parse a service manager label; anything unrecognized is `Unknown`
    pub fn from_label(label: &str) -> Self {
        STATE_TO_STATUS
            .iter()
            .find(|(_, l, _)| *l == label)
            .map(|(state, _, _)| *state)
            .unwrap_or(ServiceState::Unknown)
    }

    pub fn label(&self) -> &'static str {
        STATE_TO_STATUS
            .iter()
            .find(|(state, _, _)| state == self)
            .map(|(_, label, _)| *label)
            .unwrap_or("Unknown")
    }

    pub fn status(&self) -> CheckStatus {
        STATE_TO_STATUS
            .iter()
            .find(|(state, _, _)| state == self)
            .map(|(_, _, status)| *status)
            .unwrap_or(CheckStatus::Unknown)
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Status for a raw state label, never failing
pub fn status_for_state(label: &str) -> CheckStatus {
    ServiceState::from_label(label).status()
}

fn default_host() -> String {
    ".".to_string()
}

/// One monitored host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowsServiceInstance {
    /// Host to query, `.` for the local machine
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub services: Vec<String>,
}

impl InstanceConfig for WindowsServiceInstance {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.services.is_empty() {
            return Err(ConfigError::NoServices);
        }
        Ok(())
    }
}

/// Connection identity; connections are reused per target
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ConnectionTarget {
    pub host: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionTarget")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl From<&WindowsServiceInstance> for ConnectionTarget {
    fn from(instance: &WindowsServiceInstance) -> Self {
        Self {
            host: instance.host.clone(),
            username: instance.username.clone(),
            password: instance.password.clone(),
        }
    }
}

/// A service as reported by the service manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub name: String,
    pub state: String,
}

/// Opens connections to a host's service manager
#[async_trait]
pub trait ServiceManager: Send + Sync {
    async fn connect(&self, target: &ConnectionTarget) -> Result<Arc<dyn ServiceConnection>>;
}

/// An open service manager connection
#[async_trait]
pub trait ServiceConnection: Send + Sync {
    /// Every service whose name matches `name`
    async fn query_services(&self, name: &str) -> Result<Vec<ServiceRecord>>;
}

/// Service check over a [`ServiceManager`]
pub struct WindowsServiceCheck<M: ServiceManager> {
    manager: M,
    connections: DashMap<ConnectionTarget, Arc<dyn ServiceConnection>>,
}

impl<M: ServiceManager> WindowsServiceCheck<M> {
    pub fn new(manager: M) -> Self {
        Self {
            manager,
            connections: DashMap::new(),
        }
    }

    /// Number of cached connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    async fn connection(&self, target: ConnectionTarget) -> Result<Arc<dyn ServiceConnection>> {
        if let Some(conn) = self.connections.get(&target) {
            return Ok(Arc::clone(conn.value()));
        }
        let conn = self
            .manager
            .connect(&target)
            .await
            .with_context(|| format!("Failed to connect to service manager on {}", target.host))?;
        info!(host = %target.host, "Connected to service manager");
        self.connections.insert(target, Arc::clone(&conn));
        Ok(conn)
    }
}

#[async_trait]
impl<M: ServiceManager> AgentCheck for WindowsServiceCheck<M> {
    type Instance = WindowsServiceInstance;

    fn name(&self) -> &str {
        "windows_service"
    }

    async fn check(
        &self,
        instance: &WindowsServiceInstance,
        sink: &dyn MetricSink,
    ) -> Result<(), CheckError> {
        if instance.services.is_empty() {
            return Err(ConfigError::NoServices.into());
        }

        let conn = self
            .connection(ConnectionTarget::from(instance))
            .await
            .map_err(|e| CheckError::backend("connecting", e))?;

        for service in &instance.services {
            let results = conn
                .query_services(service)
                .await
                .map_err(|e| CheckError::backend(format!("querying service {}", service), e))?;

            match results.as_slice() {
                [] => sink.warning(format!("No services found matching {}", service)),
                [record] => {
                    let status = status_for_state(&record.state);
                    let mut tags = vec![format!("service:{}", record.name)];
                    tags.extend(instance.tags.iter().cloned());
                    debug!(
                        service = %record.name,
                        state = %record.state,
                        status = %status,
                        "Service state"
                    );
                    sink.emit_service_check(SERVICE_CHECK_NAME, status, &tags, None)?;
                }
                _ => sink.warning(format!("Multiple services found matching {}", service)),
            }
        }

        Ok(())
    }
}

/// In-memory service manager keyed by host
///
/// Service names match case-insensitively, like the real service manager.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticServiceManager {
    pub hosts: HashMap<String, Vec<ServiceRecord>>,
}

impl StaticServiceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(
        mut self,
        host: impl Into<String>,
        name: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        self.hosts.entry(host.into()).or_default().push(ServiceRecord {
            name: name.into(),
            state: state.into(),
        });
        self
    }

    /// Load a `{"hosts": {"<host>": [{"name": .., "state": ..}]}}` snapshot
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read service snapshot {}", path.display()))?;
        serde_json::from_str(&content).context("Failed to parse service snapshot")
    }
}

struct StaticConnection {
    services: Vec<ServiceRecord>,
}

#[async_trait]
impl ServiceConnection for StaticConnection {
    async fn query_services(&self, name: &str) -> Result<Vec<ServiceRecord>> {
        Ok(self
            .services
            .iter()
            .filter(|s| s.name.eq_ignore_ascii_case(name))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ServiceManager for StaticServiceManager {
    async fn connect(&self, target: &ConnectionTarget) -> Result<Arc<dyn ServiceConnection>> {
        let services = self
            .hosts
            .get(&target.host)
            .cloned()
            .with_context(|| format!("host {} is unreachable", target.host))?;
        Ok(Arc::new(StaticConnection { services }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertion::{evaluate_scenario, Expectation};
    use crate::config::CheckConfig;
    use crate::driver::CheckDriver;
    use crate::store::ObservationStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_state_table() {
        assert_eq!(status_for_state("Running"), CheckStatus::Ok);
        assert_eq!(status_for_state("Stopped"), CheckStatus::Critical);
        for pending in [
            "Start Pending",
            "Stop Pending",
            "Continue Pending",
            "Pause Pending",
            "Paused",
        ] {
            assert_eq!(status_for_state(pending), CheckStatus::Warning, "{}", pending);
        }
        assert_eq!(status_for_state("Unknown"), CheckStatus::Unknown);
    }

    #[test]
    fn test_unmapped_state_is_unknown() {
        assert_eq!(status_for_state("Bogus"), CheckStatus::Unknown);
        assert_eq!(status_for_state(""), CheckStatus::Unknown);
        assert_eq!(status_for_state("running"), CheckStatus::Unknown);
        assert_eq!(ServiceState::from_label("Bogus"), ServiceState::Unknown);
    }

    #[test]
    fn test_labels_round_trip() {
        for (state, label, _) in STATE_TO_STATUS {
            assert_eq!(ServiceState::from_label(label), state);
            assert_eq!(state.to_string(), label);
        }
    }

    #[test]
    fn test_instance_requires_services() {
        let err = CheckConfig::<WindowsServiceInstance>::from_value(json!({
            "instances": [{ "host": "." }]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("no services defined"));
    }

    #[test]
    fn test_connection_target_hides_password() {
        let target = ConnectionTarget {
            host: "win-01".into(),
            username: Some("admin".into()),
            password: Some("hunter2".into()),
        };
        let debug = format!("{:?}", target);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("win-01"));
    }

    fn manager() -> StaticServiceManager {
        StaticServiceManager::new()
            .with_service(".", "Dhcp", "Running")
            .with_service(".", "EventLog", "Stopped")
            .with_service(".", "Spooler", "Paused")
            .with_service(".", "Wuauserv", "Bogus")
            .with_service(".", "Netlogon", "Running")
            .with_service(".", "NETLOGON", "Stopped")
    }

    fn instance(services: &[&str]) -> WindowsServiceInstance {
        WindowsServiceInstance {
            host: ".".into(),
            username: None,
            password: None,
            tags: vec!["env:testing".into()],
            services: services.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_reports_one_service_check_per_service() {
        let check = WindowsServiceCheck::new(manager());
        let store = ObservationStore::new();

        assert_ok!(
            check
                .check(&instance(&["Dhcp", "EventLog", "Spooler", "Wuauserv"]), &store)
                .await
        );

        let report = evaluate_scenario(
            &[
                Expectation::service_check(SERVICE_CHECK_NAME)
                    .with_tags(["service:Dhcp", "env:testing"])
                    .with_status(CheckStatus::Ok)
                    .exactly(1),
                Expectation::service_check(SERVICE_CHECK_NAME)
                    .with_tags(["service:EventLog"])
                    .with_status(CheckStatus::Critical)
                    .exactly(1),
                Expectation::service_check(SERVICE_CHECK_NAME)
                    .with_tags(["service:Spooler"])
                    .with_status(CheckStatus::Warning)
                    .exactly(1),
                Expectation::service_check(SERVICE_CHECK_NAME)
                    .with_tags(["service:Wuauserv"])
                    .with_status(CheckStatus::Unknown)
                    .exactly(1),
                Expectation::service_check(SERVICE_CHECK_NAME).exactly(4),
            ],
            &store,
        );
        assert!(report.is_success(), "{:?}", report.into_result().err());
        assert!(store.warnings().is_empty());
    }

    #[tokio::test]
    async fn test_missing_and_ambiguous_services_warn_and_continue() {
        let check = WindowsServiceCheck::new(manager());
        let store = ObservationStore::new();

        assert_ok!(
            check
                .check(&instance(&["NoSuchService", "Netlogon", "Dhcp"]), &store)
                .await
        );

        assert_eq!(
            store.warnings(),
            vec![
                "No services found matching NoSuchService".to_string(),
                "Multiple services found matching Netlogon".to_string(),
            ]
        );
        let checks = store.query_by_name(SERVICE_CHECK_NAME);
        assert_eq!(checks.len(), 1);
        assert!(checks[0].tags.contains("service:Dhcp"));
    }

    #[tokio::test]
    async fn test_empty_services_is_fatal() {
        let check = WindowsServiceCheck::new(manager());
        let store = ObservationStore::new();

        let err = assert_err!(check.check(&instance(&[]), &store).await);
        assert!(matches!(err, CheckError::Config(ConfigError::NoServices)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_backend_error() {
        let check = WindowsServiceCheck::new(manager());
        let store = ObservationStore::new();
        let mut remote = instance(&["Dhcp"]);
        remote.host = "win-02".into();

        let err = assert_err!(check.check(&remote, &store).await);
        assert!(matches!(err, CheckError::Backend { .. }));
        assert!(format!("{:#}", anyhow::Error::new(err)).contains("win-02"));
    }

    struct CountingManager {
        inner: StaticServiceManager,
        connects: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ServiceManager for CountingManager {
        async fn connect(&self, target: &ConnectionTarget) -> Result<Arc<dyn ServiceConnection>> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            self.inner.connect(target).await
        }
    }

    #[tokio::test]
    async fn test_connections_are_reused_across_runs() {
        let connects = Arc::new(AtomicUsize::new(0));
        let check = WindowsServiceCheck::new(CountingManager {
            inner: manager(),
            connects: Arc::clone(&connects),
        });
        let mut driver = CheckDriver::new(check);
        let config = CheckConfig::new(vec![instance(&["Dhcp"])]).unwrap();

        driver.run_twice(&config).await.unwrap();

        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(driver.check().connection_count(), 1);
        assert_eq!(driver.store().query_by_name(SERVICE_CHECK_NAME).len(), 2);
    }

    #[test]
    fn test_snapshot_file_loading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("services.json");
        std::fs::write(
            &path,
            r#"{"hosts": {".": [{"name": "Dhcp", "state": "Start Pending"}]}}"#,
        )
        .unwrap();

        let manager = StaticServiceManager::from_file(&path).unwrap();
        assert_eq!(manager.hosts["."][0].state, "Start Pending");

        assert!(StaticServiceManager::from_file(&dir.path().join("missing.json")).is_err());
    }
}
