//! Runners for the record, stream and devices commands

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::time::{interval, sleep_until, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::application::ports::ConfigStore;
use crate::application::{AmplitudeEvent, AudioKit, AudioKitSettings};
use crate::domain::config::{AppConfig, InputSource};
use crate::domain::stream::SampleFrame;
use crate::infrastructure::capture::{available_hosts, list_input_devices};
use crate::infrastructure::{create_input, probe_flac, FlacSinkFactory, XdgConfigStore};

use super::args::{RecordOptions, StreamOptions};
use super::presenter::{format_elapsed, Presenter};
use super::signals::ShutdownSignal;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Progress refresh and stop-condition poll interval while recording
const RECORD_POLL: Duration = Duration::from_millis(100);

/// Wire the configured input and the FLAC sink into a kit
pub fn build_kit(config: &AppConfig) -> AudioKit {
    AudioKit::new(
        create_input(config),
        Arc::new(FlacSinkFactory::new()),
        AudioKitSettings::from_config(config),
    )
}

/// Run a blocking kit call off the async runtime
async fn on_kit<T, F>(kit: &Arc<AudioKit>, call: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce(&AudioKit) -> T + Send + 'static,
{
    let kit = Arc::clone(kit);
    tokio::task::spawn_blocking(move || call(&kit))
        .await
        .map_err(|e| format!("audio task failed: {}", e))
}

/// Record to a FLAC file until the duration elapses or Ctrl-C
pub async fn run_record(config: &AppConfig, options: RecordOptions) -> ExitCode {
    let mut presenter = Presenter::new();
    let shutdown = ShutdownSignal::new();
    shutdown.setup();

    let kit = Arc::new(build_kit(config));
    kit.on_recording_error(Arc::new(|e| error!("Recording fault: {}", e.report())));

    if let Err(e) = kit.configure(options.path.clone()) {
        presenter.error(&e.report());
        return ExitCode::from(EXIT_ERROR);
    }

    match on_kit(&kit, |k| k.start()).await {
        Ok(Ok(status)) => debug!("Recording started: {:?}", status),
        Ok(Err(e)) => {
            presenter.error(&e.report());
            return ExitCode::from(EXIT_ERROR);
        }
        Err(e) => {
            presenter.error(&e);
            return ExitCode::from(EXIT_ERROR);
        }
    }

    let limit = options.duration.map(|d| d.as_std());
    let limit_ms = limit.map(|l| l.as_millis() as u64);
    let started = Instant::now();
    presenter.start_spinner("Recording...");

    let mut ticker = interval(RECORD_POLL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.wait() => {
                info!("Stopping on Ctrl-C");
                break;
            }
        }
        let elapsed = started.elapsed();
        presenter.update_recording_progress(elapsed.as_millis() as u64, limit_ms);
        if limit.is_some_and(|l| elapsed >= l) {
            break;
        }
        if !kit.is_recording() {
            debug!("Recorder stopped on its own");
            break;
        }
    }

    presenter.update_spinner("Finalizing...");
    let status = match on_kit(&kit, |k| k.stop()).await {
        Ok(Some(status)) => status,
        Ok(None) => {
            presenter.spinner_fail("Recorder lost its configuration");
            return ExitCode::from(EXIT_ERROR);
        }
        Err(e) => {
            presenter.spinner_fail(&e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if let Some(ref fault) = status.error {
        presenter.spinner_fail(fault);
        print_json(&presenter, &status);
        return ExitCode::from(EXIT_ERROR);
    }

    presenter.spinner_success(&format!(
        "Saved {} ({})",
        status.file_path.display(),
        format_elapsed(status.duration_millis)
    ));
    print_json(&presenter, &status);
    describe_file(&presenter, &status.file_path);

    ExitCode::from(EXIT_SUCCESS)
}

fn describe_file(presenter: &Presenter, path: &Path) {
    match probe_flac(path) {
        Ok(info) => presenter.info(&format!(
            "FLAC {} Hz, {} ch, {}-bit, {} samples ({:.2}s)",
            info.sample_rate,
            info.channels,
            info.bits_per_sample,
            info.total_samples,
            info.duration().as_secs_f64()
        )),
        Err(e) => presenter.warn(&e.to_string()),
    }
}

fn print_json<T: Serialize>(presenter: &Presenter, value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => presenter.output(&json),
        Err(e) => presenter.error(&format!("Failed to serialize output: {}", e)),
    }
}

/// One amplitude frame as printed by `stream --json`
#[derive(Debug, Serialize)]
struct FrameLine {
    sequence: u64,
    samples: usize,
    peak: f32,
    rms: f32,
}

impl From<&SampleFrame> for FrameLine {
    fn from(frame: &SampleFrame) -> Self {
        Self {
            sequence: frame.sequence(),
            samples: frame.len(),
            peak: frame.peak(),
            rms: frame.rms(),
        }
    }
}

/// Print amplitude frames until the duration elapses, Ctrl-C, or the device fails
pub async fn run_stream(config: &AppConfig, options: StreamOptions) -> ExitCode {
    let presenter = Presenter::new();
    let shutdown = ShutdownSignal::new();
    shutdown.setup();

    let kit = Arc::new(build_kit(config));
    let mut stream = match on_kit(&kit, |k| k.subscribe_to_amplitudes()).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            presenter.error(&e.report());
            return ExitCode::from(EXIT_ERROR);
        }
        Err(e) => {
            presenter.error(&e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    // A far deadline stands in for "no limit"
    let deadline = tokio::time::Instant::now()
        + options
            .duration
            .map(|d| d.as_std())
            .unwrap_or(Duration::from_secs(60 * 60 * 24 * 365));
    let mut code = EXIT_SUCCESS;
    let mut frames = 0u64;

    loop {
        tokio::select! {
            event = stream.recv() => match event {
                Some(AmplitudeEvent::Frame(frame)) => {
                    frames += 1;
                    if options.json {
                        print_json(&presenter, &FrameLine::from(&frame));
                    } else {
                        presenter.meter(frame.peak(), frame.rms());
                    }
                }
                Some(AmplitudeEvent::Error(e)) => {
                    if !options.json {
                        presenter.finish_meter();
                    }
                    presenter.error(&e.report());
                    code = EXIT_ERROR;
                }
                None => break,
            },
            _ = sleep_until(deadline) => break,
            _ = shutdown.wait() => break,
        }
    }

    if !options.json && code == EXIT_SUCCESS {
        presenter.finish_meter();
    }
    let dropped = stream.dropped_frames();
    drop(stream);
    if let Err(e) = on_kit(&kit, |k| k.unsubscribe()).await {
        presenter.warn(&e);
    }

    debug!("Delivered {} frames", frames);
    if dropped > 0 {
        presenter.warn(&format!("{} frames dropped by a slow consumer", dropped));
    }
    ExitCode::from(code)
}

/// List audio hosts and their input devices
pub fn run_devices(config: &AppConfig) -> ExitCode {
    let presenter = Presenter::new();

    if config.source_or_default() == InputSource::Sine {
        presenter.key_value("sine", "synthetic 440 Hz tone (default)");
        return ExitCode::from(EXIT_SUCCESS);
    }

    let hosts: Vec<&str> = match config.host.as_deref() {
        Some(host) => vec![host],
        None => available_hosts(),
    };
    let mut code = EXIT_SUCCESS;
    for host in hosts {
        match list_input_devices(Some(host)) {
            Ok(devices) if devices.is_empty() => presenter.key_value(host, "(no input devices)"),
            Ok(devices) => {
                for device in devices {
                    let marker = if device.is_default { " (default)" } else { "" };
                    presenter.key_value(host, &format!("{}{}", device.name, marker));
                }
            }
            Err(e) => {
                presenter.error(&format!("{}: {}", host, e));
                code = EXIT_ERROR;
            }
        }
    }
    ExitCode::from(code)
}

/// Load and merge configuration: defaults < file < CLI.
///
/// A broken config file is reported and skipped.
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    match store.load_merged(cli_config.clone()).await {
        Ok(config) => config,
        Err(e) => {
            Presenter::new().warn(&format!("{} (using defaults)", e));
            AppConfig::defaults().merge(cli_config)
        }
    }
}
