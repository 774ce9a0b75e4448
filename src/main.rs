use std::error::Error;
use std::path::PathBuf;

use clap::Parser;

mod app;
mod camera;
mod entity;
mod input;
mod world;

#[derive(Parser, Debug)]
#[command(name = "talus", about = "Chunked heightfield terrain playground")]
struct Args {
    /// TOML config path; built-in defaults apply when the file is absent.
    #[arg(long, default_value = "talus.toml")]
    config: PathBuf,
    /// Terrain seed override.
    #[arg(long)]
    seed: Option<i32>,
    /// Draw-radius override; the generate radius grows to keep its halo.
    #[arg(long)]
    draw_radius: Option<i32>,
    /// Mesh and collider tessellation override (cells per chunk side).
    #[arg(long)]
    quality: Option<usize>,
    /// Run N fixed ticks without a window, then exit.
    #[arg(long)]
    headless_ticks: Option<u32>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if let Err(e) = run(args) {
        log::error!("fatal: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let mut cfg = if args.config.exists() {
        talus_world::Config::load_from_path(&args.config)?
    } else {
        log::warn!(
            "config {} not found, using defaults",
            args.config.display()
        );
        talus_world::Config::default()
    };
    if let Some(seed) = args.seed {
        cfg.terrain.seed = seed;
    }
    if let Some(r) = args.draw_radius {
        cfg.stream.draw_radius = r;
        cfg.stream.generate_radius = cfg.stream.generate_radius.max(2 * r);
    }
    if let Some(q) = args.quality {
        cfg.terrain.mesh_quality = q;
        cfg.terrain.collider_quality = q;
    }
    cfg.validate()?;

    match args.headless_ticks {
        Some(ticks) => app::run_headless(cfg, ticks),
        None => app::run(cfg),
    }
}
