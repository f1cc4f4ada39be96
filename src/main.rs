use anyhow::{Context, Result};
use billy::actuator::SimulatedDriver;
use billy::collaborators::{BenchVoice, Collaborators, ProcessCapture, ProcessPlayback};
use billy::config::{AudioMode, RigConfig};
use billy::interaction::RigEvent;
use billy::rig::Rig;
use billy::sensor::StdinButton;
use billy::utils::SystemClock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Driver commands kept for inspection; the bench binary runs indefinitely
const HISTORY_LIMIT: usize = 256;

fn collaborators(config: &RigConfig, voice: BenchVoice) -> Result<Collaborators> {
    let audio = &config.audio;
    let fallback = config.phrases.fallback_response.clone();
    let collaborators = match audio.mode {
        AudioMode::Bench => Collaborators::guarded(Arc::new(voice), fallback),
        AudioMode::Process => {
            let voice = Arc::new(voice.with_tone(audio.sample_rate));
            Collaborators {
                capture: Arc::new(ProcessCapture::new(
                    audio.record_command.clone(),
                    audio.scratch_dir.clone(),
                )),
                playback: Arc::new(ProcessPlayback::new(
                    audio.play_command.clone(),
                    audio.scratch_dir.clone(),
                )),
                ..Collaborators::guarded(voice, fallback)
            }
        }
        #[cfg(feature = "audio-io")]
        AudioMode::Device => {
            use billy::collaborators::{DeviceCapture, DevicePlayback};
            let voice = Arc::new(voice.with_tone(audio.sample_rate));
            Collaborators {
                capture: Arc::new(DeviceCapture::new()),
                playback: Arc::new(DevicePlayback::new()),
                ..Collaborators::guarded(voice, fallback)
            }
        }
        #[cfg(not(feature = "audio-io"))]
        AudioMode::Device => anyhow::bail!("device audio needs the audio-io feature"),
    };
    Ok(collaborators)
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "billy=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Billy");

    let config = match std::env::args().nth(1) {
        Some(path) => RigConfig::load(&path).with_context(|| format!("loading {}", path))?,
        None => RigConfig::load_default()?,
    };
    config.validate()?;

    let clock = SystemClock::shared();
    // Hold each simulated press long enough for at least two polls
    let button = Arc::new(StdinButton::spawn(config.poll_interval() * 2)?);
    let voice = BenchVoice::new(Arc::clone(&clock));

    let rig = Rig::builder()
        .with_config(config.clone())
        .with_driver(Arc::new(
            SimulatedDriver::new().verbose().with_history_limit(HISTORY_LIMIT),
        ))
        .with_input(button.clone())
        .with_collaborators(collaborators(&config, voice)?)
        .with_clock(clock)
        .build()?;

    let handle = rig.start()?;
    info!("Press Enter to poke the fish, Ctrl-D to quit");

    loop {
        match handle.orchestrator().recv_event_timeout(Duration::from_millis(100)) {
            Some(RigEvent::InteractionFinished(report)) => {
                if let Some(error) = &report.error {
                    warn!("Interaction {} ended early: {}", report.id, error);
                }
            }
            Some(RigEvent::ActivationDropped(activation)) => {
                info!("Still busy, ignored press #{}", activation.sequence);
            }
            _ => {}
        }
        if button.is_closed() && !handle.orchestrator().is_busy() {
            break;
        }
    }

    let snapshot = handle.orchestrator().state().snapshot();
    info!(
        "Done: {} completed, {} aborted, {} crashed, {} ignored presses",
        snapshot.completed, snapshot.aborted, snapshot.crashed, snapshot.dropped_activations
    );
    handle.shutdown()?;
    Ok(())
}
