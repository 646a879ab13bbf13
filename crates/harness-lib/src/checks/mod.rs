//! Checks exercised by the harness
//!
//! - `windows_service`: service manager state polling
//! - `container`: container runtime metrics with include/exclude filtering

pub mod container;
pub mod windows_service;

pub use container::{
    ContainerCheck, ContainerInstance, ContainerRuntime, ContainerStats, ContainerSummary,
    ImageSummary, StaticContainerRuntime,
};
pub use windows_service::{
    status_for_state, ConnectionTarget, ServiceConnection, ServiceManager, ServiceRecord,
    ServiceState, StaticServiceManager, WindowsServiceCheck, WindowsServiceInstance,
};
