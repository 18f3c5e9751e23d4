//! Process-wide plugin registry.
//!
//! Backends are registered up front as named constructors tagged with the
//! interface string they implement. The first request for a capability binds
//! exactly one candidate whose interface string equals the required one, and
//! the instance is shared for the rest of the process.

mod builtin;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::engine::{PlaybackEngine, PLAYBACK_ENGINE_INTERFACE};
use crate::tags::{TagReader, TAG_READER_INTERFACE};
use crate::waveform::{WaveformBuilder, WAVEFORM_BUILDER_INTERFACE};
use crate::{CoreError, Result};

pub use self::builtin::{CLOCK_ENGINE, SYMPHONIA_WAVEFORM};

/// Category of pluggable backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityType {
    PlaybackEngine,
    WaveformBuilder,
    TagReader,
}

impl CapabilityType {
    pub const ALL: [CapabilityType; 3] = [
        CapabilityType::PlaybackEngine,
        CapabilityType::WaveformBuilder,
        CapabilityType::TagReader,
    ];

    /// Interface string a candidate must report verbatim to be bound.
    pub fn interface(self) -> &'static str {
        match self {
            CapabilityType::PlaybackEngine => PLAYBACK_ENGINE_INTERFACE,
            CapabilityType::WaveformBuilder => WAVEFORM_BUILDER_INTERFACE,
            CapabilityType::TagReader => TAG_READER_INTERFACE,
        }
    }
}

impl fmt::Display for CapabilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CapabilityType::PlaybackEngine => "playback engine",
            CapabilityType::WaveformBuilder => "waveform builder",
            CapabilityType::TagReader => "tag reader",
        };
        f.write_str(name)
    }
}

/// A constructed backend, shared for the lifetime of the registry.
#[derive(Clone)]
pub enum PluginInstance {
    PlaybackEngine(Arc<dyn PlaybackEngine>),
    WaveformBuilder(Arc<dyn WaveformBuilder>),
    TagReader(Arc<dyn TagReader>),
}

impl PluginInstance {
    pub fn capability(&self) -> CapabilityType {
        match self {
            PluginInstance::PlaybackEngine(_) => CapabilityType::PlaybackEngine,
            PluginInstance::WaveformBuilder(_) => CapabilityType::WaveformBuilder,
            PluginInstance::TagReader(_) => CapabilityType::TagReader,
        }
    }
}

impl fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PluginInstance")
            .field(&self.capability())
            .finish()
    }
}

type Constructor = Box<dyn Fn() -> Result<PluginInstance> + Send + Sync>;

/// A registered candidate implementation.
pub struct PluginDescriptor {
    name: String,
    capability: CapabilityType,
    interface: String,
    constructor: Constructor,
}

impl PluginDescriptor {
    pub fn new<F>(
        name: impl Into<String>,
        capability: CapabilityType,
        interface: impl Into<String>,
        constructor: F,
    ) -> Self
    where
        F: Fn() -> Result<PluginInstance> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            capability,
            interface: interface.into(),
            constructor: Box::new(constructor),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capability(&self) -> CapabilityType {
        self.capability
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Exact string comparison against the capability's required interface.
    pub fn is_compatible(&self) -> bool {
        self.interface == self.capability.interface()
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("name", &self.name)
            .field("capability", &self.capability)
            .field("interface", &self.interface)
            .finish_non_exhaustive()
    }
}

/// Why a candidate was skipped while binding a capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    InterfaceMismatch { found: String },
    ConstructionFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub plugin: String,
    pub reason: RejectReason,
}

#[derive(Default)]
pub struct PluginRegistry {
    descriptors: Vec<PluginDescriptor>,
    preferred: HashMap<CapabilityType, String>,
    bound: Mutex<HashMap<CapabilityType, PluginInstance>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: PluginDescriptor) {
        tracing::debug!(
            plugin = descriptor.name(),
            capability = %descriptor.capability(),
            interface = descriptor.interface(),
            "plugin registered"
        );
        self.descriptors.push(descriptor);
    }

    /// Tries the candidate called `name` first when binding `capability`.
    pub fn prefer(&mut self, capability: CapabilityType, name: impl Into<String>) {
        self.preferred.insert(capability, name.into());
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.descriptors.iter()
    }

    pub fn is_bound(&self, capability: CapabilityType) -> Result<bool> {
        Ok(self.lock_bound()?.contains_key(&capability))
    }

    /// Binds `capability` on first use and returns the shared instance.
    ///
    /// Candidates with a different interface string, or whose constructor
    /// fails, are skipped. When none is left the error lists every rejection.
    /// Constructors run without the registry lock held, so one may resolve
    /// other capabilities; if two callers race, the first binding wins.
    pub fn resolve(&self, capability: CapabilityType) -> Result<PluginInstance> {
        if let Some(instance) = self.lock_bound()?.get(&capability) {
            return Ok(instance.clone());
        }

        let required = capability.interface();
        let mut rejected = Vec::new();
        for descriptor in self.candidates(capability) {
            let reason = if !descriptor.is_compatible() {
                RejectReason::InterfaceMismatch {
                    found: descriptor.interface().to_string(),
                }
            } else {
                match (descriptor.constructor)() {
                    Ok(instance) if instance.capability() == capability => {
                        let bound = self
                            .lock_bound()?
                            .entry(capability)
                            .or_insert_with(|| {
                                tracing::info!(plugin = descriptor.name(), %capability, "plugin bound");
                                instance
                            })
                            .clone();
                        return Ok(bound);
                    }
                    Ok(instance) => RejectReason::ConstructionFailed(format!(
                        "constructor produced a {} instance",
                        instance.capability()
                    )),
                    Err(err) => RejectReason::ConstructionFailed(err.to_string()),
                }
            };
            tracing::warn!(plugin = descriptor.name(), %capability, ?reason, "plugin rejected");
            rejected.push(Rejection {
                plugin: descriptor.name().to_string(),
                reason,
            });
        }

        tracing::error!(%capability, required, "no compatible plugin");
        Err(CoreError::Configuration {
            capability,
            required,
            rejected,
        })
    }

    pub fn playback_engine(&self) -> Result<Arc<dyn PlaybackEngine>> {
        match self.resolve(CapabilityType::PlaybackEngine)? {
            PluginInstance::PlaybackEngine(engine) => Ok(engine),
            other => Err(mismatched(other)),
        }
    }

    pub fn waveform_builder(&self) -> Result<Arc<dyn WaveformBuilder>> {
        match self.resolve(CapabilityType::WaveformBuilder)? {
            PluginInstance::WaveformBuilder(builder) => Ok(builder),
            other => Err(mismatched(other)),
        }
    }

    pub fn tag_reader(&self) -> Result<Arc<dyn TagReader>> {
        match self.resolve(CapabilityType::TagReader)? {
            PluginInstance::TagReader(reader) => Ok(reader),
            other => Err(mismatched(other)),
        }
    }

    /// Candidates for `capability`, the preferred one first, then in
    /// registration order.
    fn candidates(&self, capability: CapabilityType) -> Vec<&PluginDescriptor> {
        let preferred = self.preferred.get(&capability);
        let mut candidates: Vec<_> = self
            .descriptors
            .iter()
            .filter(|descriptor| descriptor.capability() == capability)
            .collect();
        candidates.sort_by_key(|descriptor| Some(&descriptor.name) != preferred);
        candidates
    }

    fn lock_bound(&self) -> Result<MutexGuard<'_, HashMap<CapabilityType, PluginInstance>>> {
        self.bound
            .lock()
            .map_err(|_| CoreError::Poisoned("plugin registry"))
    }
}

fn mismatched(instance: PluginInstance) -> CoreError {
    CoreError::msg(format!(
        "registry bound a {} where another capability was expected",
        instance.capability()
    ))
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("descriptors", &self.descriptors)
            .field("preferred", &self.preferred)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{OnceLock, Weak};
    use std::time::Duration;

    use super::*;
    use crate::config::WaveformConfig;
    use crate::engine::ClockEngine;
    use crate::waveform::SymphoniaWaveformBuilder;

    fn engine_descriptor(name: &str, interface: &str, built: Arc<AtomicUsize>) -> PluginDescriptor {
        PluginDescriptor::new(name, CapabilityType::PlaybackEngine, interface, move || {
            built.fetch_add(1, Ordering::SeqCst);
            let engine = ClockEngine::new(Duration::from_millis(50))?;
            Ok(PluginInstance::PlaybackEngine(Arc::new(engine)))
        })
    }

    #[test]
    fn binds_only_the_exact_interface() {
        let stale = Arc::new(AtomicUsize::new(0));
        let current = Arc::new(AtomicUsize::new(0));
        let mut registry = PluginRegistry::new();
        registry.register(engine_descriptor(
            "legacy",
            "Wavedeck/PlaybackEngine/0.6",
            Arc::clone(&stale),
        ));
        registry.register(engine_descriptor(
            "current",
            PLAYBACK_ENGINE_INTERFACE,
            Arc::clone(&current),
        ));

        registry.playback_engine().unwrap();
        assert_eq!(stale.load(Ordering::SeqCst), 0);
        assert_eq!(current.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn no_match_is_a_configuration_error() {
        let mut registry = PluginRegistry::new();
        registry.register(engine_descriptor(
            "legacy",
            "Wavedeck/PlaybackEngine/0.6",
            Arc::new(AtomicUsize::new(0)),
        ));
        registry.register(engine_descriptor(
            "padded",
            "Wavedeck/PlaybackEngine/0.7 ",
            Arc::new(AtomicUsize::new(0)),
        ));

        match registry.playback_engine() {
            Err(CoreError::Configuration {
                capability,
                required,
                rejected,
            }) => {
                assert_eq!(capability, CapabilityType::PlaybackEngine);
                assert_eq!(required, PLAYBACK_ENGINE_INTERFACE);
                assert_eq!(rejected.len(), 2);
                assert_eq!(
                    rejected[0].reason,
                    RejectReason::InterfaceMismatch {
                        found: "Wavedeck/PlaybackEngine/0.6".into()
                    }
                );
            }
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("a mismatched plugin was bound"),
        }
        assert!(!registry.is_bound(CapabilityType::PlaybackEngine).unwrap());
        assert!(matches!(
            registry.tag_reader(),
            Err(CoreError::Configuration { rejected, .. }) if rejected.is_empty()
        ));
    }

    #[test]
    fn binding_is_lazy_and_shared() {
        let built = Arc::new(AtomicUsize::new(0));
        let mut registry = PluginRegistry::new();
        registry.register(engine_descriptor(
            "clock",
            PLAYBACK_ENGINE_INTERFACE,
            Arc::clone(&built),
        ));
        assert_eq!(built.load(Ordering::SeqCst), 0);

        let first = registry.playback_engine().unwrap();
        let second = registry.playback_engine().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(registry.is_bound(CapabilityType::PlaybackEngine).unwrap());
    }

    #[test]
    fn constructors_may_resolve_other_capabilities() {
        let handle: Arc<OnceLock<Weak<PluginRegistry>>> = Arc::new(OnceLock::new());
        let slot = Arc::clone(&handle);
        let mut registry = PluginRegistry::new();
        registry.register(engine_descriptor(
            "clock",
            PLAYBACK_ENGINE_INTERFACE,
            Arc::new(AtomicUsize::new(0)),
        ));
        registry.register(PluginDescriptor::new(
            "engine-aware",
            CapabilityType::WaveformBuilder,
            WAVEFORM_BUILDER_INTERFACE,
            move || {
                let registry = slot
                    .get()
                    .and_then(Weak::upgrade)
                    .ok_or_else(|| CoreError::msg("registry gone"))?;
                registry.playback_engine()?;
                let builder = SymphoniaWaveformBuilder::new(WaveformConfig::default());
                Ok(PluginInstance::WaveformBuilder(Arc::new(builder)))
            },
        ));
        let registry = Arc::new(registry);
        handle.set(Arc::downgrade(&registry)).unwrap();

        let (tx, rx) = std::sync::mpsc::channel();
        let resolver = Arc::clone(&registry);
        std::thread::spawn(move || {
            tx.send(resolver.waveform_builder().is_ok()).unwrap();
        });
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(true));
        assert!(registry.is_bound(CapabilityType::PlaybackEngine).unwrap());
    }

    #[test]
    fn failing_constructors_fall_through() {
        let mut registry = PluginRegistry::new();
        registry.register(PluginDescriptor::new(
            "broken",
            CapabilityType::WaveformBuilder,
            WAVEFORM_BUILDER_INTERFACE,
            || Err(CoreError::msg("no decoder available")),
        ));
        registry.register(PluginDescriptor::new(
            "confused",
            CapabilityType::WaveformBuilder,
            WAVEFORM_BUILDER_INTERFACE,
            || {
                let engine = ClockEngine::new(Duration::from_millis(50))?;
                Ok(PluginInstance::PlaybackEngine(Arc::new(engine)))
            },
        ));
        registry.register(PluginDescriptor::new(
            "symphonia",
            CapabilityType::WaveformBuilder,
            WAVEFORM_BUILDER_INTERFACE,
            || {
                let builder = SymphoniaWaveformBuilder::new(WaveformConfig::default());
                Ok(PluginInstance::WaveformBuilder(Arc::new(builder)))
            },
        ));

        assert!(registry.waveform_builder().is_ok());
    }

    #[test]
    fn preferences_reorder_candidates() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut registry = PluginRegistry::new();
        registry.register(engine_descriptor("a", PLAYBACK_ENGINE_INTERFACE, Arc::clone(&first)));
        registry.register(engine_descriptor("b", PLAYBACK_ENGINE_INTERFACE, Arc::clone(&second)));
        registry.prefer(CapabilityType::PlaybackEngine, "b");

        registry.playback_engine().unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn interfaces_are_distinct() {
        let interfaces: Vec<_> = CapabilityType::ALL.iter().map(|c| c.interface()).collect();
        assert_eq!(
            interfaces,
            [
                "Wavedeck/PlaybackEngine/0.7",
                "Wavedeck/WaveformBuilder/0.7",
                "Wavedeck/TagReader/0.7"
            ]
        );
    }
}
