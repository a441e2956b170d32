//! Devices and the context that owns them.

use std::fmt;
use std::sync::Arc;

use kiln_bif::Target;
use tracing::warn;

use crate::backend::Backend;
use crate::cache::BuildCache;
use crate::config::BuildConfig;

/// Identifies a device within its context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device#{}", self.0)
    }
}

/// A compute device programs can be built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: DeviceId,
    /// Chip name passed to the backend as the target.
    pub name: String,
    pub target: Target,
}

impl Device {
    #[must_use]
    pub fn new(id: u32, name: impl Into<String>, target: Target) -> Self {
        Self {
            id: DeviceId(id),
            name: name.into(),
            target,
        }
    }
}

/// The devices, backend and configuration programs are built against.
pub struct Context {
    devices: Vec<Device>,
    backend: Arc<dyn Backend>,
    config: BuildConfig,
    cache: Option<BuildCache>,
}

impl Context {
    /// A context with the default configuration and no disk cache.
    pub fn new(devices: Vec<Device>, backend: Arc<dyn Backend>) -> Self {
        Self::with_config(devices, backend, BuildConfig::default())
    }

    /// A context using `config`. A cache directory that can't be opened is
    /// logged and builds proceed uncached.
    pub fn with_config(devices: Vec<Device>, backend: Arc<dyn Backend>, config: BuildConfig) -> Self {
        let cache = config.cache_dir.as_ref().and_then(|dir| {
            BuildCache::new(dir, backend.version())
                .map_err(|e| warn!(error = %e, "build cache disabled"))
                .ok()
        });
        Self {
            devices,
            backend,
            config,
            cache,
        }
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.iter().find(|device| device.id == id)
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&BuildCache> {
        self.cache.as_ref()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("devices", &self.devices)
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
