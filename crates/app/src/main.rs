use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wavedeck_core::render::Size;
use wavedeck_core::scan::{self, ExtensionFilter};
use wavedeck_core::{
    Bitmap, CapabilityType, CoreConfig, CoreError, EngineEvent, JsonSettings, PlayerSession,
    PluginRegistry, Result, SettingsProvider,
};

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };
    let settings = match &cli.settings {
        Some(path) => JsonSettings::load(path)?,
        None => JsonSettings::new(),
    };

    match cli.command {
        Commands::Play { file } => run_play(&config, settings, &file),
        Commands::Waveform {
            file,
            output,
            width,
            height,
            position,
        } => run_waveform(
            &config,
            settings,
            &file,
            &output,
            Size::new(width, height),
            position,
        ),
        Commands::Scan { paths } => run_scan(&settings, &paths),
        Commands::Plugins => run_plugins(&config),
    }
}

fn run_play(config: &CoreConfig, settings: JsonSettings, file: &Path) -> Result<()> {
    tracing::info!(file = %file.display(), "starting playback");

    let registry = PluginRegistry::with_builtins(config);
    let mut session = PlayerSession::from_registry(&registry, Arc::new(settings), config)?;
    session.open(file);
    session.engine().play();

    loop {
        for event in session.pump() {
            match event {
                EngineEvent::StateChanged(state) => tracing::info!(?state, "state changed"),
                EngineEvent::Tick(elapsed_ms) => tracing::debug!(elapsed_ms, "tick"),
                EngineEvent::Finished => {
                    tracing::info!("playback finished");
                    return Ok(());
                }
                EngineEvent::Failed(failure) => {
                    return Err(CoreError::msg(failure.to_string()));
                }
                _ => {}
            }
        }
        session.heartbeat(Instant::now());
        thread::sleep(config.heartbeat.interval());
    }
}

fn run_waveform(
    config: &CoreConfig,
    settings: JsonSettings,
    file: &Path,
    output: &Path,
    size: Size,
    position: f64,
) -> Result<()> {
    tracing::info!(file = %file.display(), output = %output.display(), "rendering waveform");

    let registry = PluginRegistry::with_builtins(config);
    let builder = registry.waveform_builder()?;
    let mut session = PlayerSession::from_registry(&registry, Arc::new(settings), config)?;
    session.view_mut().resize(size);
    if !session.view_mut().draw_file(file) {
        return Err(CoreError::msg(format!("no such file `{}`", file.display())));
    }

    while !builder.status().is_finished() {
        session.view_mut().heartbeat();
        thread::sleep(Duration::from_millis(10));
    }
    session.view_mut().heartbeat();
    tracing::info!(status = ?builder.status(), peaks = builder.peaks().committed(), "build settled");

    session.view_mut().set_value(position);
    let mut frame = Bitmap::new(size.width, size.height);
    session.view().paint(&mut frame);
    std::fs::write(output, frame.to_ppm())?;
    Ok(())
}

fn run_scan(settings: &dyn SettingsProvider, paths: &[PathBuf]) -> Result<()> {
    let filter = ExtensionFilter::from_settings(settings);
    tracing::info!(accepts_all = filter.accepts_all(), "scanning {} path(s)", paths.len());
    for file in scan::expand_drop(paths, &filter) {
        println!("{}", file.display());
    }
    Ok(())
}

fn run_plugins(config: &CoreConfig) -> Result<()> {
    let registry = PluginRegistry::with_builtins(config);
    for descriptor in registry.descriptors() {
        println!(
            "{:<12} {:<18} {}",
            descriptor.name(),
            descriptor.capability().to_string(),
            descriptor.interface()
        );
    }
    for capability in CapabilityType::ALL {
        match registry.resolve(capability) {
            Ok(_) => println!("{capability}: bound"),
            Err(err) => println!("{capability}: {err}"),
        }
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio player core with a cached waveform seek bar", long_about = None)]
struct Cli {
    /// JSON configuration file for the core.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Flat JSON settings file (e.g. the `FileFilters` allow-list).
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a file against the clock engine until it finishes.
    Play {
        /// Media file to play.
        file: PathBuf,
    },
    /// Decode a file and write its seek-bar rendering as a PPM image.
    Waveform {
        /// Media file to decode.
        file: PathBuf,
        /// Output path for the PPM image.
        output: PathBuf,
        #[arg(long, default_value_t = 800)]
        width: u32,
        #[arg(long, default_value_t = 120)]
        height: u32,
        /// Progress cursor position in `[0, 1]`.
        #[arg(long, default_value_t = 0.0)]
        position: f64,
    },
    /// Expand files and directories through the allow-list.
    Scan {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List registered plugins and try to bind every capability.
    Plugins,
}
