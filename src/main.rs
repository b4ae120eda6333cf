use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use crossterm::terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use huegrid::audio::{self, AudioHandle};
use huegrid::config::{self, AppConfig};
use huegrid::loader::SampleBank;
use huegrid::middle::Controller;
use huegrid::params::ParameterSnapshot;
use huegrid::publish::Published;
use huegrid::sequencer::{Grid, GridSequencer, SequencerStatus, TransportCommand};
use huegrid::tui;
use huegrid::vision::{ColorDetectionPipeline, HueDetectionState, ImageDirCamera, NullCamera};

const LOG_FILE: &str = "huegrid.log";

#[derive(Parser, Debug)]
#[command(name = "huegrid", about = "Step-sequencer grid with a camera-driven color voice")]
struct Cli {
    /// Project directory holding .huegrid/config.json (defaults to cwd)
    project_dir: Option<PathBuf>,

    /// Directory of images to play back as the camera
    #[arg(long)]
    camera: Option<PathBuf>,

    /// Directory of WAV samples
    #[arg(long)]
    samples: Option<PathBuf>,

    /// Start with hue detection off
    #[arg(long)]
    no_hue: bool,

    /// Log file (the terminal belongs to the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(path: &Path) -> anyhow::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    // set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let project_dir = cli
        .project_dir
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
    init_logging(&cli.log_file.clone().unwrap_or_else(|| project_dir.join(LOG_FILE)))?;
    log::info!("huegrid starting in {}", project_dir.display());

    let mut cfg = config::load_config(&project_dir);
    if !config::config_file_path(&project_dir).exists() {
        // leave an editable copy of the defaults behind
        if let Err(e) = config::save_config(&project_dir, &cfg) {
            log::warn!("could not write default config: {e:#}");
        }
    }
    if cli.camera.is_some() {
        cfg.camera_dir = cli.camera.clone();
    }
    if cli.samples.is_some() {
        cfg.samples_dir = cli.samples.clone();
    }
    if cli.no_hue {
        cfg.params.hue_detection_enabled = false;
    }

    // shared snapshots, one writer each
    let params = Published::new(cfg.params.clone());
    let grid = Published::<Grid>::default();
    let detection = Published::<HueDetectionState>::default();
    let bank = Published::new(SampleBank::new());
    let status = Published::<SequencerStatus>::default();

    let audio = audio::start_audio(params.clone(), detection.clone(), bank.clone())
        .context("starting audio output")?;

    // decode at the device rate so playback never resamples in the callback
    let samples_dir = cfg.samples_dir.clone().unwrap_or_else(|| project_dir.clone());
    match SampleBank::load_dir(&samples_dir, audio.sample_rate()) {
        Ok(loaded) => bank.publish(loaded),
        Err(e) => log::warn!("no samples loaded from {}: {e:#}", samples_dir.display()),
    }
    if params.load().sample.is_none() {
        let first = bank.load().names().first().cloned();
        if let Some(name) = first {
            params.update(|p| p.sample = Some(name));
        }
    }

    let stop_camera = Arc::new(AtomicBool::new(false));
    let camera_thread = spawn_camera(&cfg, params.clone(), detection.clone(), stop_camera.clone())?;

    let (transport_tx, transport_rx) = crossbeam_channel::bounded::<TransportCommand>(64);
    let sequencer = GridSequencer::new(audio.commands(), grid.clone(), params.clone(), bank.clone(), status.clone());
    let sequencer_thread = sequencer.spawn(transport_rx)?;

    let controller = Controller::new(grid, params, bank, status, detection, transport_tx.clone());

    let result = {
        terminal::enable_raw_mode()?;
        let _guard = RawModeGuard; // auto drops when out of scope
        run_ui(&controller, &audio)
    };

    shutdown(&transport_tx, sequencer_thread, &stop_camera, camera_thread);
    drop(audio);
    log::info!("huegrid stopped");
    result
}

fn spawn_camera(
    cfg: &AppConfig,
    params: Published<ParameterSnapshot>,
    detection: Published<HueDetectionState>,
    stop: Arc<AtomicBool>,
) -> anyhow::Result<JoinHandle<()>> {
    let settings = cfg.detection_settings();
    let camera = match &cfg.camera_dir {
        Some(dir) => match ImageDirCamera::open(dir, cfg.camera_fps) {
            Ok(cam) => Some(cam),
            Err(e) => {
                log::warn!("{e}; running without a camera");
                None
            }
        },
        None => None,
    };
    let handle = match camera {
        Some(cam) => ColorDetectionPipeline::new(cam, settings, params, detection).spawn(stop)?,
        None => ColorDetectionPipeline::new(NullCamera, settings, params, detection).spawn(stop)?,
    };
    Ok(handle)
}

fn run_ui(controller: &Controller, audio: &AudioHandle) -> anyhow::Result<()> {
    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = std::time::Duration::from_millis(16); // ~60fps
    let blink_start = Instant::now();
    let mut tui_state = tui::mode::TuiState::default();

    loop {
        let blink_on = (blink_start.elapsed().as_millis() / 250) % 2 == 0;
        let ds = controller.display_state();

        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds, &tui_state, blink_on);
        })?;

        for event in tui::input::poll_input(tick_rate, &mut tui_state, &ds)? {
            if !controller.handle_input(event) {
                return Ok(());
            }
        }

        // audio faults are fatal: stop stepping, report, leave
        if let Some(fault) = audio.poll_fault() {
            log::error!("{fault}");
            controller.stop();
            return Err(fault).context("audio output failed");
        }
    }
}

fn shutdown(
    transport: &crossbeam_channel::Sender<TransportCommand>,
    sequencer: JoinHandle<()>,
    stop_camera: &AtomicBool,
    camera: JoinHandle<()>,
) {
    let _ = transport.send(TransportCommand::Shutdown);
    stop_camera.store(true, Ordering::Relaxed);
    if sequencer.join().is_err() {
        log::error!("sequencer thread panicked");
    }
    if camera.join().is_err() {
        log::error!("camera thread panicked");
    }
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
