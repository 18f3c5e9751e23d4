use std::sync::Arc;

use super::{CapabilityType, PluginDescriptor, PluginInstance, PluginRegistry};
use crate::config::CoreConfig;
use crate::engine::{ClockEngine, PLAYBACK_ENGINE_INTERFACE};
use crate::waveform::{SymphoniaWaveformBuilder, WAVEFORM_BUILDER_INTERFACE};

/// Name of the built-in clock-driven playback backend.
pub const CLOCK_ENGINE: &str = "clock";
/// Name of the built-in symphonia waveform backend.
pub const SYMPHONIA_WAVEFORM: &str = "symphonia";

impl PluginRegistry {
    /// Registry pre-populated with the bundled backends and the configured
    /// preferences.
    pub fn with_builtins(config: &CoreConfig) -> Self {
        let mut registry = Self::new();

        let engine = config.engine.clone();
        registry.register(PluginDescriptor::new(
            CLOCK_ENGINE,
            CapabilityType::PlaybackEngine,
            PLAYBACK_ENGINE_INTERFACE,
            move || {
                let engine = ClockEngine::new(engine.tick_interval())?;
                Ok(PluginInstance::PlaybackEngine(Arc::new(engine)))
            },
        ));

        let waveform = config.waveform.clone();
        registry.register(PluginDescriptor::new(
            SYMPHONIA_WAVEFORM,
            CapabilityType::WaveformBuilder,
            WAVEFORM_BUILDER_INTERFACE,
            move || {
                let builder = SymphoniaWaveformBuilder::new(waveform.clone());
                Ok(PluginInstance::WaveformBuilder(Arc::new(builder)))
            },
        ));

        let preferences = [
            (CapabilityType::PlaybackEngine, &config.plugins.playback_engine),
            (CapabilityType::WaveformBuilder, &config.plugins.waveform_builder),
            (CapabilityType::TagReader, &config.plugins.tag_reader),
        ];
        for (capability, name) in preferences {
            if let Some(name) = name {
                registry.prefer(capability, name.clone());
            }
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreError;

    #[test]
    fn builtins_cover_engine_and_waveform() {
        let registry = PluginRegistry::with_builtins(&CoreConfig::default());
        let names: Vec<_> = registry.descriptors().map(|d| d.name().to_string()).collect();
        assert_eq!(names, [CLOCK_ENGINE, SYMPHONIA_WAVEFORM]);
        assert!(registry.descriptors().all(|d| d.is_compatible()));

        assert!(registry.playback_engine().is_ok());
        assert!(registry.waveform_builder().is_ok());
        assert!(matches!(
            registry.tag_reader(),
            Err(CoreError::Configuration { .. })
        ));
    }
}
