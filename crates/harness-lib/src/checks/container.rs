//! Container metrics check
//!
//! Reports container counts, per-container memory gauges and counter rates,
//! and image statistics from a [`ContainerRuntime`]. Containers can be
//! filtered out with include/exclude patterns over their image tags.

use crate::config::{ConfigError, InstanceConfig};
use crate::driver::{AgentCheck, CheckError};
use crate::filter::FilterSet;
use crate::models::TagSet;
use crate::store::MetricSink;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

pub mod tag_names {
    pub const CONTAINER_NAME: &str = "container_name";
    pub const CONTAINER_COMMAND: &str = "container_command";
    pub const DOCKER_IMAGE: &str = "docker_image";
    pub const IMAGE_NAME: &str = "image_name";
    pub const IMAGE_TAG: &str = "image_tag";

    pub const ALL: [&str; 5] = [
        CONTAINER_NAME,
        CONTAINER_COMMAND,
        DOCKER_IMAGE,
        IMAGE_NAME,
        IMAGE_TAG,
    ];

    /// Tags the include/exclude filters are evaluated against
    pub const FILTERED: [&str; 3] = [DOCKER_IMAGE, IMAGE_NAME, IMAGE_TAG];
}

const URL_SCHEMES: [&str; 4] = ["unix", "tcp", "http", "https"];

fn default_url() -> String {
    "unix://var/run/docker.sock".to_string()
}

fn default_performance_tags() -> Vec<String> {
    vec![
        tag_names::CONTAINER_NAME.to_string(),
        tag_names::DOCKER_IMAGE.to_string(),
        tag_names::IMAGE_NAME.to_string(),
        tag_names::IMAGE_TAG.to_string(),
    ]
}

fn default_container_tags() -> Vec<String> {
    vec![
        tag_names::DOCKER_IMAGE.to_string(),
        tag_names::IMAGE_NAME.to_string(),
        tag_names::IMAGE_TAG.to_string(),
    ]
}

fn default_true() -> bool {
    true
}

/// One container runtime endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInstance {
    #[serde(default = "default_url")]
    pub url: String,
    /// Appended to every emitted metric
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Tag names attached to per-container metrics
    #[serde(default = "default_performance_tags")]
    pub performance_tags: Vec<String>,
    /// Tag names attached to container counts
    #[serde(default = "default_container_tags")]
    pub container_tags: Vec<String>,
    #[serde(default = "default_true")]
    pub collect_image_stats: bool,
}

impl Default for ContainerInstance {
    fn default() -> Self {
        Self {
            url: default_url(),
            tags: Vec::new(),
            include: Vec::new(),
            exclude: Vec::new(),
            performance_tags: default_performance_tags(),
            container_tags: default_container_tags(),
            collect_image_stats: true,
        }
    }
}

impl ContainerInstance {
    pub fn filters(&self) -> Result<FilterSet, ConfigError> {
        Ok(FilterSet::new(&self.include, &self.exclude)?)
    }
}

fn validate_tag_names(option: &'static str, names: &[String]) -> Result<(), ConfigError> {
    match names.iter().find(|n| !tag_names::ALL.contains(&n.as_str())) {
        Some(name) => Err(ConfigError::UnknownTagName {
            option,
            name: name.clone(),
        }),
        None => Ok(()),
    }
}

impl InstanceConfig for ContainerInstance {
    fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.url).map_err(|e| ConfigError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        if !URL_SCHEMES.contains(&url.scheme()) {
            return Err(ConfigError::InvalidUrl {
                url: self.url.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        validate_tag_names("performance_tags", &self.performance_tags)?;
        validate_tag_names("container_tags", &self.container_tags)?;
        self.filters()?;
        Ok(())
    }
}

/// A container as listed by the runtime, running or not
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub id: String,
    #[serde(default)]
    pub names: Vec<String>,
    pub image: String,
    #[serde(default)]
    pub command: String,
    pub running: bool,
}

impl ContainerSummary {
    fn name(&self) -> Option<&str> {
        self.names.first().map(|n| n.trim_start_matches('/'))
    }
}

/// An image as listed by the runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSummary {
    pub id: String,
    #[serde(default)]
    pub repo_tags: Vec<String>,
    pub size: u64,
    pub virtual_size: u64,
}

/// Point-in-time resource counters for one container
///
/// Memory values are gauges; cpu ticks, io bytes and network bytes are
/// monotonic counters that are reported as per-second rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerStats {
    #[serde(default = "chrono::Utc::now")]
    pub timestamp: DateTime<Utc>,
    pub cpu_user: u64,
    pub cpu_system: u64,
    pub mem_cache: u64,
    pub mem_rss: u64,
    pub io_read_bytes: u64,
    pub io_write_bytes: u64,
    pub net_rx_bytes: u64,
    pub net_tx_bytes: u64,
}

/// Access to a container runtime
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// All containers, including stopped ones
    async fn containers(&self) -> Result<Vec<ContainerSummary>>;

    /// Top-level images, or every image including intermediate layers
    async fn images(&self, all: bool) -> Result<Vec<ImageSummary>>;

    async fn stats(&self, container_id: &str) -> Result<ContainerStats>;
}

#[async_trait]
impl<T: ContainerRuntime + ?Sized> ContainerRuntime for std::sync::Arc<T> {
    async fn containers(&self) -> Result<Vec<ContainerSummary>> {
        (**self).containers().await
    }

    async fn images(&self, all: bool) -> Result<Vec<ImageSummary>> {
        (**self).images(all).await
    }

    async fn stats(&self, container_id: &str) -> Result<ContainerStats> {
        (**self).stats(container_id).await
    }
}

/// Split `name[:tag]`, leaving registry ports alone
fn split_image(image: &str) -> (&str, Option<&str>) {
    match image.rsplit_once(':') {
        Some((name, tag)) if !tag.contains('/') => (name, Some(tag)),
        _ => (image, None),
    }
}

fn container_tag_values(container: &ContainerSummary, tag_name: &str) -> Vec<String> {
    let (image_name, image_tag) = split_image(&container.image);
    match tag_name {
        tag_names::DOCKER_IMAGE => vec![container.image.clone()],
        tag_names::IMAGE_NAME => vec![image_name.to_string()],
        tag_names::IMAGE_TAG => image_tag.map(str::to_string).into_iter().collect(),
        tag_names::CONTAINER_NAME => container.name().map(str::to_string).into_iter().collect(),
        tag_names::CONTAINER_COMMAND => {
            if container.command.is_empty() {
                Vec::new()
            } else {
                vec![container.command.clone()]
            }
        }
        _ => Vec::new(),
    }
}

fn container_tags(container: &ContainerSummary, names: &[impl AsRef<str>]) -> Vec<String> {
    names
        .iter()
        .flat_map(|name| {
            let name: &str = name.as_ref();
            container_tag_values(container, name)
                .into_iter()
                .map(move |value| format!("{}:{}", name, value))
        })
        .collect()
}

fn image_tags(image: &ImageSummary) -> TagSet {
    let mut tags = TagSet::new();
    for repo_tag in &image.repo_tags {
        let (name, tag) = split_image(repo_tag);
        tags.insert(format!("{}:{}", tag_names::IMAGE_NAME, name));
        if let Some(tag) = tag {
            tags.insert(format!("{}:{}", tag_names::IMAGE_TAG, tag));
        }
    }
    tags
}

fn with_custom(tags: impl IntoIterator<Item = String>, custom: &[String]) -> Vec<String> {
    let mut tags: Vec<String> = tags.into_iter().collect();
    tags.extend(custom.iter().cloned());
    tags
}

#[derive(Debug, Clone, Copy)]
struct CounterSample {
    value: u64,
    at: DateTime<Utc>,
}

type RateKey = (String, String, &'static str);

/// Container metrics check over a [`ContainerRuntime`]
pub struct ContainerCheck<R: ContainerRuntime> {
    runtime: R,
    /// Previous counter samples, keyed by (url, container id, metric)
    previous: DashMap<RateKey, CounterSample>,
}

impl<R: ContainerRuntime> ContainerCheck<R> {
    pub fn new(runtime: R) -> Self {
        Self {
            runtime,
            previous: DashMap::new(),
        }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Per-second rate against the previous sample, if there is a usable one
    fn rate(&self, key: RateKey, value: u64, at: DateTime<Utc>) -> Option<f64> {
        let previous = self.previous.insert(key, CounterSample { value, at })?;
        let elapsed = (at - previous.at).num_microseconds()? as f64 / 1_000_000.0;
        if elapsed <= 0.0 || value < previous.value {
            return None;
        }
        Some((value - previous.value) as f64 / elapsed)
    }

    /// Drop rate samples of containers the runtime no longer lists
    fn forget_missing(&self, url: &str, containers: &[ContainerSummary]) {
        self.previous.retain(|(key_url, id, _), _| {
            key_url != url || containers.iter().any(|c| &c.id == id)
        });
    }

    fn report_container_counts(
        &self,
        instance: &ContainerInstance,
        containers: &[ContainerSummary],
        sink: &dyn MetricSink,
    ) -> Result<(), CheckError> {
        // tags -> (running, total)
        let mut counts: BTreeMap<TagSet, (u64, u64)> = BTreeMap::new();
        for container in containers {
            let tags: TagSet = container_tags(container, &instance.container_tags)
                .into_iter()
                .collect();
            let entry = counts.entry(tags).or_default();
            entry.1 += 1;
            if container.running {
                entry.0 += 1;
            }
        }

        for (tags, (running, _)) in &counts {
            if *running > 0 {
                let tags = with_custom(tags.iter().map(str::to_string), &instance.tags);
                sink.gauge("docker.containers.running", *running as f64, &tags)?;
            }
        }
        for (tags, (running, total)) in &counts {
            let tags = with_custom(tags.iter().map(str::to_string), &instance.tags);
            sink.gauge("docker.containers.stopped", (total - running) as f64, &tags)?;
        }
        Ok(())
    }

    async fn report_performance(
        &self,
        instance: &ContainerInstance,
        container: &ContainerSummary,
        sink: &dyn MetricSink,
    ) -> Result<(), CheckError> {
        let stats = self
            .runtime
            .stats(&container.id)
            .await
            .map_err(|e| CheckError::backend(format!("reading stats for {}", container.id), e))?;
        let tags = with_custom(
            container_tags(container, &instance.performance_tags),
            &instance.tags,
        );

        sink.gauge("docker.mem.cache", stats.mem_cache as f64, &tags)?;
        sink.gauge("docker.mem.rss", stats.mem_rss as f64, &tags)?;

        let counters: [(&'static str, u64); 6] = [
            ("docker.cpu.user", stats.cpu_user),
            ("docker.cpu.system", stats.cpu_system),
            ("docker.io.read_bytes", stats.io_read_bytes),
            ("docker.io.write_bytes", stats.io_write_bytes),
            ("docker.net.bytes_rcvd", stats.net_rx_bytes),
            ("docker.net.bytes_sent", stats.net_tx_bytes),
        ];
        for (metric, value) in counters {
            let key = (instance.url.clone(), container.id.clone(), metric);
            match self.rate(key, value, stats.timestamp) {
                Some(rate) => sink.rate(metric, rate, &tags)?,
                None => debug!(container = %container.id, metric, "Rate primed"),
            }
        }
        Ok(())
    }

    async fn report_images(
        &self,
        instance: &ContainerInstance,
        sink: &dyn MetricSink,
    ) -> Result<(), CheckError> {
        let images = self
            .runtime
            .images(false)
            .await
            .map_err(|e| CheckError::backend("listing images", e))?;
        let all_images = self
            .runtime
            .images(true)
            .await
            .map_err(|e| CheckError::backend("listing all images", e))?;

        sink.gauge("docker.images.available", images.len() as f64, &instance.tags)?;
        sink.gauge(
            "docker.images.intermediate",
            all_images.len().saturating_sub(images.len()) as f64,
            &instance.tags,
        )?;

        for image in &images {
            let tags = with_custom(image_tags(image).iter().map(str::to_string), &instance.tags);
            sink.gauge("docker.image.size", image.size as f64, &tags)?;
            sink.gauge("docker.image.virtual_size", image.virtual_size as f64, &tags)?;
        }
        Ok(())
    }
}

#[async_trait]
impl<R: ContainerRuntime> AgentCheck for ContainerCheck<R> {
    type Instance = ContainerInstance;

    fn name(&self) -> &str {
        "docker_daemon"
    }

    async fn check(
        &self,
        instance: &ContainerInstance,
        sink: &dyn MetricSink,
    ) -> Result<(), CheckError> {
        let filters = instance.filters()?;
        let containers = self
            .runtime
            .containers()
            .await
            .map_err(|e| CheckError::backend(format!("listing containers on {}", instance.url), e))?;

        // Counts cover every container, filtered or not
        self.report_container_counts(instance, &containers, sink)?;

        for container in containers.iter().filter(|c| c.running) {
            let candidate = container_tags(container, &tag_names::FILTERED);
            if !filters.is_included(&candidate) {
                debug!(container = %container.id, image = %container.image, "Container excluded");
                continue;
            }
            self.report_performance(instance, container, sink).await?;
        }
        self.forget_missing(&instance.url, &containers);

        if instance.collect_image_stats {
            self.report_images(instance, sink).await?;
        }
        Ok(())
    }
}

/// In-memory runtime loaded from a JSON snapshot
///
/// Stats are restamped with the current time on every read, strictly
/// increasing so back-to-back runs still yield rates.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StaticContainerRuntime {
    #[serde(default)]
    pub containers: Vec<ContainerSummary>,
    #[serde(default)]
    pub images: Vec<ImageSummary>,
    #[serde(default)]
    pub intermediate_images: Vec<ImageSummary>,
    #[serde(default)]
    pub stats: HashMap<String, ContainerStats>,
    /// Microsecond timestamp of the latest stats read
    #[serde(skip)]
    last_read_micros: AtomicI64,
}

impl StaticContainerRuntime {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read runtime snapshot {}", path.display()))?;
        serde_json::from_str(&content).context("Failed to parse runtime snapshot")
    }

    fn next_timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now().timestamp_micros();
        let stamped = match self
            .last_read_micros
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
        {
            Ok(last) | Err(last) => now.max(last + 1),
        };
        DateTime::from_timestamp_micros(stamped).unwrap_or_else(Utc::now)
    }
}

#[async_trait]
impl ContainerRuntime for StaticContainerRuntime {
    async fn containers(&self) -> Result<Vec<ContainerSummary>> {
        Ok(self.containers.clone())
    }

    async fn images(&self, all: bool) -> Result<Vec<ImageSummary>> {
        let mut images = self.images.clone();
        if all {
            images.extend(self.intermediate_images.iter().cloned());
        }
        Ok(images)
    }

    async fn stats(&self, container_id: &str) -> Result<ContainerStats> {
        let mut stats = self
            .stats
            .get(container_id)
            .cloned()
            .with_context(|| format!("no stats for container {}", container_id))?;
        stats.timestamp = self.next_timestamp();
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertion::{assert_expectation, Expectation};
    use crate::config::CheckConfig;
    use crate::driver::CheckDriver;
    use crate::store::ObservationStore;
    use serde_json::json;

    fn container(id: &str, name: &str, image: &str, running: bool) -> ContainerSummary {
        ContainerSummary {
            id: id.to_string(),
            names: vec![format!("/{}", name)],
            image: image.to_string(),
            command: "/entrypoint.sh".to_string(),
            running,
        }
    }

    #[test]
    fn test_split_image() {
        assert_eq!(split_image("nginx"), ("nginx", None));
        assert_eq!(split_image("redis:latest"), ("redis", Some("latest")));
        assert_eq!(
            split_image("localhost:5000/app:1.0"),
            ("localhost:5000/app", Some("1.0"))
        );
        assert_eq!(split_image("localhost:5000/app"), ("localhost:5000/app", None));
    }

    #[test]
    fn test_container_tags_follow_requested_names() {
        let c = container("1", "test-new-redis-latest", "redis:latest", true);
        let tags = container_tags(&c, &default_performance_tags());
        assert_eq!(
            tags,
            vec![
                "container_name:test-new-redis-latest",
                "docker_image:redis:latest",
                "image_name:redis",
                "image_tag:latest",
            ]
        );

        let tags = container_tags(&c, &["container_command"]);
        assert_eq!(tags, vec!["container_command:/entrypoint.sh"]);
    }

    #[test]
    fn test_image_tags_cover_every_repo_tag() {
        let image = ImageSummary {
            id: "sha256:1".into(),
            repo_tags: vec!["nginx:1.7".into(), "nginx:1.7.12".into()],
            size: 1,
            virtual_size: 2,
        };
        let expected: TagSet = ["image_name:nginx", "image_tag:1.7", "image_tag:1.7.12"]
            .into_iter()
            .collect();
        assert_eq!(image_tags(&image), expected);

        let dangling = ImageSummary {
            repo_tags: vec!["<none>:<none>".into()],
            ..image
        };
        let expected: TagSet = ["image_name:<none>", "image_tag:<none>"].into_iter().collect();
        assert_eq!(image_tags(&dangling), expected);
    }

    #[test]
    fn test_instance_defaults_and_validation() {
        let config = CheckConfig::<ContainerInstance>::from_value(json!({
            "init_config": {},
            "instances": [{ "url": "unix://var/run/docker.sock" }]
        }))
        .unwrap();
        assert_eq!(config.instances[0], ContainerInstance::default());

        let bad_scheme = CheckConfig::<ContainerInstance>::from_value(json!({
            "instances": [{ "url": "ftp://docker" }]
        }));
        assert!(bad_scheme.unwrap_err().to_string().contains("unsupported scheme"));

        let bad_tag = CheckConfig::<ContainerInstance>::from_value(json!({
            "instances": [{ "performance_tags": ["pod_name"] }]
        }));
        assert!(bad_tag.unwrap_err().to_string().contains("pod_name"));

        let bad_pattern = CheckConfig::<ContainerInstance>::from_value(json!({
            "instances": [{ "exclude": ["docker_image:(nginx"] }]
        }));
        assert!(bad_pattern.is_err());
    }

    #[tokio::test]
    async fn test_counts_include_excluded_containers() {
        let runtime = StaticContainerRuntime {
            containers: vec![
                container("1", "web", "nginx", true),
                container("2", "old-web", "nginx", false),
                container("3", "cache", "redis:latest", true),
            ],
            stats: HashMap::new(),
            ..Default::default()
        };
        let check = ContainerCheck::new(runtime);
        let store = ObservationStore::new();
        let instance = ContainerInstance {
            exclude: vec![".*".into()],
            collect_image_stats: false,
            ..Default::default()
        };

        check.check(&instance, &store).await.unwrap();

        let running = store.query_by_name("docker.containers.running");
        assert_eq!(running.len(), 2);
        let stopped = store.query_by_name("docker.containers.stopped");
        assert_eq!(stopped.len(), 2);
        let nginx_stopped = stopped
            .iter()
            .find(|o| o.tags.contains("image_name:nginx"))
            .unwrap();
        assert_eq!(nginx_stopped.value, 1.0);
        assert!(store.query_by_name("docker.mem.rss").is_empty());
    }

    #[test]
    fn test_rates_need_a_previous_sample() {
        let check = ContainerCheck::new(StaticContainerRuntime::default());
        let t0 = Utc::now();
        let key = || ("u".to_string(), "c".to_string(), "docker.cpu.user");

        assert_eq!(check.rate(key(), 100, t0), None);
        let rate = check.rate(key(), 300, t0 + chrono::Duration::seconds(2));
        assert_eq!(rate, Some(100.0));
        // counter reset re-primes
        assert_eq!(check.rate(key(), 10, t0 + chrono::Duration::seconds(4)), None);
        // no time elapsed
        assert_eq!(check.rate(key(), 20, t0 + chrono::Duration::seconds(4)), None);
    }

    #[tokio::test]
    async fn test_missing_stats_is_a_backend_error() {
        let runtime = StaticContainerRuntime {
            containers: vec![container("1", "web", "nginx", true)],
            ..Default::default()
        };
        let check = ContainerCheck::new(runtime);
        let store = ObservationStore::new();

        let err = check
            .check(&ContainerInstance::default(), &store)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Backend { .. }));
    }

    fn stats() -> ContainerStats {
        ContainerStats {
            timestamp: Utc::now(),
            cpu_user: 1000,
            cpu_system: 400,
            mem_cache: 4096,
            mem_rss: 8192,
            io_read_bytes: 512,
            io_write_bytes: 256,
            net_rx_bytes: 2048,
            net_tx_bytes: 1024,
        }
    }

    #[test]
    fn test_sub_millisecond_rates() {
        let check = ContainerCheck::new(StaticContainerRuntime::default());
        let t0 = Utc::now();
        let key = || ("u".to_string(), "c".to_string(), "docker.io.read_bytes");

        assert_eq!(check.rate(key(), 100, t0), None);
        let rate = check
            .rate(key(), 150, t0 + chrono::Duration::microseconds(500))
            .unwrap();
        assert!((rate - 100_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_snapshot_timestamps_strictly_increase() {
        let runtime = StaticContainerRuntime::default();
        let first = runtime.next_timestamp();
        let second = runtime.next_timestamp();
        let third = runtime.next_timestamp();
        assert!(first < second && second < third);
    }

    #[tokio::test]
    async fn test_snapshot_runtime_yields_rates_on_repeated_run() {
        let runtime = StaticContainerRuntime {
            containers: vec![container("1", "web", "nginx", true)],
            stats: HashMap::from([("1".to_string(), stats())]),
            ..Default::default()
        };
        let mut driver = CheckDriver::new(ContainerCheck::new(runtime));
        let config = CheckConfig::new(vec![ContainerInstance {
            collect_image_stats: false,
            ..Default::default()
        }])
        .unwrap();

        driver.run_twice(&config).await.unwrap();

        for metric in [
            "docker.cpu.user",
            "docker.cpu.system",
            "docker.io.read_bytes",
            "docker.io.write_bytes",
            "docker.net.bytes_rcvd",
            "docker.net.bytes_sent",
        ] {
            let outcome = assert_expectation(
                &Expectation::metric(metric)
                    .with_tags(["container_name:web"])
                    .exactly(1),
                driver.store(),
            );
            assert!(outcome.ok, "{}", outcome);
        }
    }

    #[tokio::test]
    async fn test_samples_of_vanished_containers_are_dropped() {
        let runtime = StaticContainerRuntime {
            containers: vec![container("1", "web", "nginx", true)],
            stats: HashMap::from([("1".to_string(), stats())]),
            ..Default::default()
        };
        let check = ContainerCheck::new(runtime);
        let instance = ContainerInstance {
            collect_image_stats: false,
            ..Default::default()
        };
        let sample = CounterSample {
            value: 1,
            at: Utc::now(),
        };
        check
            .previous
            .insert((instance.url.clone(), "gone".to_string(), "docker.cpu.user"), sample);
        check
            .previous
            .insert(("tcp://other:2375".to_string(), "gone".to_string(), "docker.cpu.user"), sample);

        check.check(&instance, &ObservationStore::new()).await.unwrap();

        assert!(!check
            .previous
            .contains_key(&(instance.url.clone(), "gone".to_string(), "docker.cpu.user")));
        // other endpoints keep their samples
        assert!(check
            .previous
            .contains_key(&("tcp://other:2375".to_string(), "gone".to_string(), "docker.cpu.user")));
        assert_eq!(check.previous.len(), 7);
    }
}
