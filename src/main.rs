use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use anyhow::Context;
use clap::{Parser, Subcommand};
use fetch_tiles::map::{Tile, Tileset};
use fetch_tiles::{diff, file_manager, AssetManager, Config, Validator};

/// Config read when --config is not given, if it exists.
const DEFAULT_CONFIG: &str = "fetch_tiles.yaml";

/// Loads, validates and queries Tiled tilesets.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Raises log verbosity. Repeat for more.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validates tilesets and reports every issue found
    Check {
        #[arg(required = true)]
        files: Vec<String>,
        /// Opens referenced images to compare their size with the declared one
        #[arg(long)]
        check_images: bool,
        /// Fails on warnings too
        #[arg(long)]
        deny_warnings: bool,
    },
    /// Prints the descriptor of one tile
    Show {
        file: String,
        id: u32,
    },
    /// Lists tiles whose type lies within a prefix, like "ground" or "npc_librarian"
    Find {
        file: String,
        prefix: String,
    },
    /// Prints the tile table as YAML
    Dump {
        file: String,
    },
    /// Compares two exports of a tileset
    Diff {
        before: String,
        after: String,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);
    #[cfg(feature = "profile")]
    let _profile_guard = init_profiling();
    match run(args) {
        Ok(code) => code,
        Err(err) => {
            log::error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        },
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Records tracing spans to a chrome trace file until the guard drops.
#[cfg(feature = "profile")]
fn init_profiling() -> tracing_chrome::FlushGuard {
    use tracing_subscriber::prelude::*;
    let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new().build();
    let subscriber = tracing_subscriber::registry().with(chrome_layer);
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        log::warn!("Profiling disabled: {err}");
    }
    guard
}

fn run(args: Args) -> anyhow::Result<ExitCode> {
    let config = load_config(args.config.as_deref())?;
    let mut manager = file_manager(config.path_prefix.as_deref());
    match args.command {
        Command::Check { files, check_images, deny_warnings } => {
            let mut validation = config.validation;
            validation.check_images |= check_images;
            validation.deny_warnings |= deny_warnings;
            Ok(check(&mut manager, &files, Validator::new(validation)))
        },
        Command::Show { file, id } => {
            let tileset = load(&mut manager, &file)?;
            show(&tileset, id)?;
            Ok(ExitCode::SUCCESS)
        },
        Command::Find { file, prefix } => {
            let tileset = load(&mut manager, &file)?;
            for tile in tileset.tiles_within(&prefix) {
                println!("{}", summary(&tileset, tile));
            }
            Ok(ExitCode::SUCCESS)
        },
        Command::Dump { file } => {
            let tileset = load(&mut manager, &file)?;
            print!("{}", serde_yaml::to_string(&*tileset)?);
            Ok(ExitCode::SUCCESS)
        },
        Command::Diff { before, after } => {
            let before = load(&mut manager, &before)?;
            let after = load(&mut manager, &after)?;
            let diff = diff::diff(&before, &after);
            if diff.is_empty() {
                println!("No differences");
            }
            else {
                print!("{diff}");
            }
            Ok(ExitCode::SUCCESS)
        },
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None if Path::new(DEFAULT_CONFIG).exists() => {
            log::info!("Using config '{DEFAULT_CONFIG}'");
            Config::load(DEFAULT_CONFIG)
        },
        None => Ok(Config::default()),
    }
}

fn load(manager: &mut AssetManager, path: &str) -> anyhow::Result<Arc<Tileset>> {
    manager
        .load::<Tileset, _>(path)
        .with_context(|| format!("Could not load '{path}'"))
}

fn check(manager: &mut AssetManager, files: &[String], validator: Validator) -> ExitCode {
    let deny_warnings = validator.config().deny_warnings;
    let mut failed = 0;
    for (file, result) in files.iter().zip(manager.load_all::<Tileset, _>(files)) {
        let tileset = match result {
            Ok(tileset) => tileset,
            Err(err) => {
                println!("{file}: error: {err}");
                failed += 1;
                continue;
            },
        };
        let report = validator.validate(&tileset);
        for issue in &report.issues {
            println!("{file}: {issue}");
        }
        let errors = report.errors().count();
        let warnings = report.warnings().count();
        println!("{file}: {} tiles described, {errors} errors, {warnings} warnings", tileset.len());
        if report.fails(deny_warnings) {
            failed += 1;
        }
    }
    if failed > 0 {
        println!("{failed} of {} tilesets failed", files.len());
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn show(tileset: &Tileset, id: u32) -> anyhow::Result<()> {
    if tileset.is_atlas() && !tileset.contains_id(id) {
        anyhow::bail!("Tile {id} is outside of the {} tiles of '{}'", tileset.tile_count, tileset.name);
    }
    match tileset.get(id) {
        Some(tile) => {
            println!("{}", summary(tileset, tile));
            for property in tile.properties.iter() {
                println!("    {} = {}", property.name, property.value);
            }
        },
        None => println!("tile {id} has no metadata"),
    }
    Ok(())
}

/// One line description of a tile: id, position, region, type.
fn summary(tileset: &Tileset, tile: &Tile) -> String {
    let mut line = format!("tile {}", tile.id);
    if let Some(pos) = tileset.grid_pos(tile.id) {
        line.push_str(&format!(" (column {}, row {})", pos.column, pos.row));
    }
    if let Some(region) = tileset.region(tile.id) {
        line.push_str(&format!(" at {},{} {}x{}", region.origin.x, region.origin.y, region.size.x, region.size.y));
    }
    if let Some(image) = &tile.image {
        line.push_str(&format!(" image {}", image.source));
    }
    match &tile.tile_type {
        Some(tile_type) => line.push_str(&format!(" type {tile_type}")),
        None => line.push_str(" untyped"),
    }
    line
}
