// tearoom-3d: a walkable, lit tea room

mod camera;
mod config;
mod error;
mod geometry;
mod input;
mod lights;
mod logging;
mod math;
mod model;
mod obj;
mod panel;
mod postprocess;
mod renderer;
mod scene;
mod shader;
mod state;
mod texture;
mod time;
mod uniforms;

use anyhow::Context;
use clap::Parser;
use winit::event_loop::EventLoop;

use crate::config::Cli;
use crate::state::ProgramState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log.as_deref());
    let config = cli.into_config();

    let mut state = ProgramState::new();
    if config.load_state {
        match state.load(&config.state_file) {
            Ok(true) => log::info!("restored state from {}", config.state_file.display()),
            Ok(false) => log::info!("no state file at {}, using defaults", config.state_file.display()),
            Err(e) => log::warn!("ignoring state file: {e}"),
        }
    }
    state.restrict_to(&config.features);

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let renderer = renderer::Renderer::new(&event_loop, &config)
        .await
        .context("failed to start the viewer")?;
    let run = renderer.run(event_loop, &mut state);

    // the state is worth keeping even if the loop ended in an error
    if config.save_state {
        match state.save(&config.state_file) {
            Ok(()) => log::info!("saved state to {}", config.state_file.display()),
            Err(e) => log::error!("failed to save state: {e}"),
        }
    }

    run.context("viewer stopped")?;
    Ok(())
}
