//! Typed check configuration
//!
//! Check configuration arrives as loosely structured data (`init_config` plus
//! a list of `instances`). It is deserialized into typed instance structs and
//! validated once here, so checks never see unchecked keys.

use crate::filter::FilterError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no instances configured")]
    NoInstances,

    #[error("malformed check configuration: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("instance {index}: {source}")]
    Instance {
        index: usize,
        #[source]
        source: Box<ConfigError>,
    },

    #[error("no services defined in windows_service configuration")]
    NoServices,

    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unknown tag name '{name}' in {option}")]
    UnknownTagName { option: &'static str, name: String },

    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Per-instance configuration validated at the boundary
pub trait InstanceConfig: DeserializeOwned + Send + Sync {
    fn validate(&self) -> Result<(), ConfigError>;
}

/// A check's full configuration: one entry per monitored instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig<I> {
    pub instances: Vec<I>,
}

impl<I: InstanceConfig> CheckConfig<I> {
    /// Wrap already-typed instances, validating each one
    pub fn new(instances: Vec<I>) -> Result<Self, ConfigError> {
        let config = Self { instances };
        config.validate()?;
        Ok(config)
    }

    /// Parse `{"init_config": {...}, "instances": [...]}` style data
    ///
    /// `init_config` is accepted and ignored.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.instances.is_empty() {
            return Err(ConfigError::NoInstances);
        }
        for (index, instance) in self.instances.iter().enumerate() {
            instance.validate().map_err(|source| ConfigError::Instance {
                index,
                source: Box::new(source),
            })?;
        }
        Ok(())
    }
}
