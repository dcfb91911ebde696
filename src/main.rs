use std::error::Error;
use std::sync::{Arc, Mutex};

use clap::Parser;
use crossbeam_channel::bounded;
use reeflicht::lighting::Lighting;
use reeflicht::olaoutput::OlaOutput;
use reeflicht::outputsink::{LogSink, SharedSink};
use reeflicht::scheduler::LightingScheduler;
use reeflicht::settings::Settings;
use reeflicht::store::{ConfigStore, JsonFileStore, MemoryStore};

#[derive(Parser)]
struct Cli {
    /// The settings file to read
    #[arg(short, long, value_name = "FILE", default_value = "/etc/reeflicht.toml")]
    config: std::path::PathBuf,

    /// Only log channel writes instead of driving the fixture
    #[arg(long)]
    dry_run: bool,
}

fn create_sink(args: &Cli, settings: &Settings) -> Result<SharedSink, Box<dyn Error>> {
    if args.dry_run {
        return Ok(Arc::new(Mutex::new(LogSink)));
    }

    if let Some(ola) = &settings.ola {
        log::info!("Sending DMX universe {} to OLA at {}", ola.universe, ola.address);
        let output = OlaOutput::new(ola.address, ola.universe)?;
        return Ok(Arc::new(Mutex::new(output)));
    }

    log::warn!("No output configured, channel writes are only logged");
    Ok(Arc::new(Mutex::new(LogSink)))
}

fn run_until_interrupted<S: ConfigStore>(
    store: S,
    sink: SharedSink,
    settings: &Settings,
) -> Result<(), Box<dyn Error>> {
    let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.try_send(());
    })?;

    let scheduler = LightingScheduler::new(settings.intensity_channel, settings.spectrum_channel);
    let mut lighting = Lighting::new(store, sink, scheduler);
    lighting.start()?;
    log::info!(
        "Lighting running in {} mode",
        if lighting.config().cycle.enabled {
            "cycle"
        } else {
            "fixed"
        }
    );

    let _ = shutdown_rx.recv();
    log::info!("Shutting down");
    lighting.shutdown();
    Ok(())
}

fn run(args: &Cli) -> Result<(), Box<dyn Error>> {
    let settings = Settings::load(&args.config)?;
    let sink = create_sink(args, &settings)?;

    match &settings.state_file {
        Some(path) => {
            let store = JsonFileStore::new(path);
            log::info!("Keeping lighting state in {}", store.path().display());
            run_until_interrupted(store, sink, &settings)
        }
        None => {
            log::warn!("No state file configured, lighting state is lost on exit");
            run_until_interrupted(MemoryStore::new(), sink, &settings)
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Cli::parse();

    if let Err(err) = run(&args) {
        log::error!("{err}");
        std::process::exit(1);
    }
}
