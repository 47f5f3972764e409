use std::path::PathBuf;

use clap::{Parser, Subcommand};
use smoothpage_core::{
    device, AppConfig, LifecycleController, LifecycleStage, MemorySessionStore, PageDescriptor,
    PageSignal, RecordingAnimator, Rect,
};
use tracing_subscriber::EnvFilter;

const FRAME_MS: u64 = 16;
const PROGRESS_STEP_MS: u64 = 100;
const PROGRESS_STEP: f64 = 20.0;

fn main() -> smoothpage_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Profile { width } => run_profile(&config, width),
        Commands::Simulate {
            page,
            width,
            height,
            stall_at,
            scroll,
            frames,
        } => run_simulate(config, page.as_ref(), Rect::viewport(width, height), stall_at, scroll, frames),
    }
}

fn run_profile(config: &AppConfig, width: u32) -> smoothpage_core::Result<()> {
    let profile = device::resolve(width, &config.devices);
    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}

fn run_simulate(
    config: AppConfig,
    page: Option<&PathBuf>,
    viewport: Rect,
    stall_at: Option<f64>,
    scroll: f64,
    frames: u32,
) -> smoothpage_core::Result<()> {
    let page = match page {
        Some(path) => PageDescriptor::load(path)?,
        None => PageDescriptor::demo(),
    };
    tracing::info!(page = %page.name, width = viewport.width, height = viewport.height, "starting simulation");

    let mut controller = LifecycleController::new(
        config,
        &page,
        viewport,
        RecordingAnimator::new(),
        MemorySessionStore::new(),
    );
    controller.scroll_bus_mut().on("counter", |event| {
        tracing::info!(?event, "counter marker crossed");
        Ok(())
    });

    let ceiling = stall_at.unwrap_or(100.0).clamp(0.0, 100.0);
    let mut progress = 0.0;
    let mut now = 0;
    while controller.stage() == LifecycleStage::Loading {
        now += PROGRESS_STEP_MS;
        if progress < ceiling {
            progress = (progress + PROGRESS_STEP).min(ceiling);
            controller.handle(PageSignal::Progress(progress));
        }
        controller.advance_to(now);
    }
    tracing::info!(at_ms = now, progress, "loading finished");

    controller.handle(PageSignal::Load);
    while controller.stage() != LifecycleStage::AnimationsBound {
        now = controller
            .next_timer_ms()
            .map_or(now + FRAME_MS, |due| due.max(now));
        controller.advance_to(now);
    }
    tracing::info!(
        at_ms = now,
        triggers = controller.adapter().map_or(0, |adapter| adapter.live_triggers()),
        engine_builds = controller.context().engine_builds,
        "animations bound"
    );

    controller.handle(PageSignal::Input { delta: scroll });
    let mut fired = 0;
    for _ in 0..frames {
        now += FRAME_MS;
        let report = controller.frame(now);
        fired += report.triggers.len();
        for failure in report.failures {
            tracing::warn!(error = %failure, "frame reported a failure");
        }
    }

    let state = controller.engine().map(|engine| engine.snapshot());
    tracing::info!(
        at_ms = now,
        scroll_top = controller.scroll_top(),
        settled = controller.engine().map_or(true, |engine| engine.is_settled()),
        trigger_events = fired,
        animations = controller.animator().requests().len(),
        "simulation finished"
    );
    println!("{}", serde_json::to_string_pretty(&state)?);

    controller.handle(PageSignal::BeforeUnload);
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
#[command(author, version, about = "Smoothed page scrolling simulator", long_about = None)]
struct Cli {
    /// JSON configuration file; defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the device profile resolved for a viewport width.
    Profile {
        #[arg(short, long)]
        width: u32,
    },
    /// Drive a scripted page session through loading, binding and scrolling.
    Simulate {
        /// Page descriptor JSON; the built-in demo page when omitted.
        #[arg(short, long)]
        page: Option<PathBuf>,
        #[arg(long, default_value_t = 1440.0)]
        width: f64,
        #[arg(long, default_value_t = 800.0)]
        height: f64,
        /// Stop loading progress at this percentage to exercise the fallback deadline.
        #[arg(long)]
        stall_at: Option<f64>,
        /// Raw input delta applied once animations are bound.
        #[arg(long, default_value_t = 1200.0)]
        scroll: f64,
        #[arg(long, default_value_t = 240)]
        frames: u32,
    },
}
