//! Citrine - headless emulator front-end
//!
//! Drives one emulation session through a scripted host lifecycle, the way
//! a windowing host would, and reports what the engine was asked to do.

use anyhow::Context;
use clap::Parser;
use ct_core::{logging, Config};
use ct_session::{
    EmulationMenu, HostEvent, MenuAction, NullEngine, PerfOverlay, PlayTimeTracker, Session,
    TargetHandle,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "citrine", version, about = "Headless emulation session host")]
struct Args {
    /// Game to run
    content: Option<PathBuf>,

    /// Path handed over by a file association, used when no game is given
    #[arg(long)]
    launch_path: Option<PathBuf>,

    /// How long to keep the session running
    #[arg(long, default_value_t = 2)]
    seconds: u64,

    /// Configuration file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("loading configuration")?;

    logging::init(&config.debug);
    tracing::info!("Starting citrine");

    let engine = Arc::new(NullEngine::new());
    let session = Session::open(
        &config,
        engine.clone(),
        args.content.as_deref(),
        args.launch_path.as_deref(),
    )?;

    let play_time = PlayTimeTracker::new();
    play_time.attach(session.hooks());
    session
        .hooks()
        .add_pause_resume_hook(|event| tracing::info!("Session {:?}", event));
    session
        .hooks()
        .add_shutdown_hook(|_| tracing::info!("Session shut down"));

    let overlay = PerfOverlay::new(config.perf_overlay.clone(), engine.clone());
    let mut menu = EmulationMenu::new(session.clone());
    let slice = Duration::from_secs(args.seconds) / 2;

    // Foreground with a fresh render target
    session.dispatch(HostEvent::HostResume { recreated: false });
    session.dispatch(HostEvent::TargetAvailable(TargetHandle::new(1)));
    session.dispatch(HostEvent::TargetResized {
        handle: TargetHandle::new(1),
        width: 400,
        height: 480,
    });
    overlay.start();
    thread::sleep(slice);

    // Pause from the menu and back
    menu.apply(MenuAction::TogglePause);
    menu.apply(MenuAction::TogglePause);

    // Configuration change: the view and its target are rebuilt
    session.dispatch(HostEvent::HostPause);
    session.dispatch(HostEvent::TargetLost);
    session.dispatch(HostEvent::HostResume { recreated: true });
    session.dispatch(HostEvent::TargetAvailable(TargetHandle::new(2)));
    session.dispatch(HostEvent::TargetResized {
        handle: TargetHandle::new(2),
        width: 800,
        height: 480,
    });
    thread::sleep(slice);

    if let Some(text) = overlay.text() {
        println!("{}", text);
    }
    overlay.stop();

    let state = session.state();
    session.dispatch(HostEvent::HostDestroy);

    println!("content:     {}", session.content_path().display());
    println!("last state:  {:?}", state);
    println!("final state: {:?}", session.state());
    println!("frames:      {}", engine.frames());
    println!("engine calls: {}", engine.calls().len());
    println!("play time:   {:.2}s", play_time.total().as_secs_f64());

    Ok(())
}
