//! Binary entrypoint for the Octane CLI.
//!
//! Commands:
//! - `init` - write a starter `octane.toml`
//! - `check` - load and validate the configuration, then print a summary
//! - `demo [--turns <n>]` - build a small world and advance it turn by turn
//!
//! See the library crate docs for module-level details: `octane::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use serde_json::json;

use octane::config::Config;
use octane::world::{ObjectRecipe, ObjectStore, StartPhase, TurnDriver};

#[derive(Parser)]
#[command(name = "octane")]
#[command(about = "Runtime world model for an interactive-fiction engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "octane.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Validate the configuration file
    Check,
    /// Build a demo world and advance it
    Demo {
        /// Number of turns to advance (overrides the config)
        #[arg(short, long)]
        turns: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            init_logging(&None, cli.verbose);
            Config::create_default(&cli.config).await?;
            info!("Wrote default configuration to {}", cli.config);
        }
        Commands::Check => {
            let config = Config::load(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            println!("Configuration OK: {}", cli.config);
            println!("  arena capacity: {}", config.store.initial_capacity);
            println!("  trace lifecycle: {}", config.store.trace_lifecycle);
            println!("  log level: {}", config.logging.level);
        }
        Commands::Demo { turns } => {
            let config = Config::load(&cli.config).await.unwrap_or_default();
            init_logging(&Some(config.clone()), cli.verbose);
            info!("Starting Octane demo v{}", env!("CARGO_PKG_VERSION"));
            let turns = turns.unwrap_or(config.demo.turns);
            run_demo(config, turns)?;
        }
    }
    Ok(())
}

fn run_demo(config: Config, turns: u32) -> Result<()> {
    let mut store = ObjectStore::bootstrap(config.store)?;
    let root = store.root_holder()?;

    store.define_object_recipe(
        "room",
        ObjectRecipe::new().on_awake(|store, id, args| {
            let name = args["name"].as_str().unwrap_or("Somewhere");
            store.object_mut(id)?.set("name", name)
        }),
    )?;
    store.define_object_recipe(
        "candle",
        ObjectRecipe::new()
            .on_start(|store, id, phase| {
                if phase == StartPhase::Initial {
                    store.object_mut(id)?.set("burn", 2.0)?;
                }
                Ok(())
            })
            .on_update(|store, id| {
                let mut candle = store.object_mut(id)?;
                let left = candle.get_number("burn").unwrap_or(0.0) - 1.0;
                if left <= 0.0 {
                    info!("The candle {} gutters out", id);
                    candle.destroy()
                } else {
                    candle.set("burn", left)
                }
            }),
    )?;
    store.define_object_recipe(
        "echo",
        ObjectRecipe::new().on_awake(|store, id, _| store.object_mut(id)?.mark_transient()),
    )?;

    let hall = store.create_octane_object("room", json!({ "name": "Hall" }))?;
    store.object_mut(root)?.add(hall)?;
    let candle = store.create_octane_object("candle", json!({}))?;
    store.object_mut(hall)?.add(candle)?;
    store.object_mut(hall)?.set("light", candle)?;
    let echo = store.create_octane_object("echo", json!({}))?;

    store.run_starts(StartPhase::Initial)?;
    store.begin_game();
    store.run_starts(StartPhase::WithTurnStep)?;

    let mut driver = TurnDriver::new(&mut store);
    for turn in 1..=turns {
        let stats = driver.advance()?;
        let light = driver.store().object_mut(hall)?.get("light");
        println!(
            "turn {}: intact {}, swept {}, hall.light = {:?}",
            turn,
            driver.store().intact_count(),
            stats.swept,
            light
        );
    }

    let retained = store.transient(echo).is_some();
    println!("echo retained in transient set: {}", retained);
    anyhow::ensure!(retained, "transient {} was lost by the sweep", echo);
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let level = match (verbosity, config) {
        (0, Some(cfg)) => cfg.logging.level_filter(),
        (0, None) => log::LevelFilter::Info,
        (1, _) => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Echo to the console only when attached to a terminal
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
