use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use trellis_wm::actor::menu_bar::Menu;
use trellis_wm::actor::reactor::{self, Event, FrameError, FrameSink, Reactor};
use trellis_wm::common::config::{Config, config_file};
use trellis_wm::common::log;
use trellis_wm::model::window::WindowId;
use trellis_wm::sys::geometry::Rect;

#[derive(Parser)]
struct Cli {
    /// Configuration file to use instead of ~/.trellis.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Check the configuration, print any issues, and exit.
    #[arg(long)]
    validate: bool,

    /// Newline-delimited JSON events to process. Reads stdin when omitted.
    events: Option<PathBuf>,
}

/// Prints every frame the reactor applies as `frame <pid:idx> x y w h`.
struct StdoutSink(io::Stdout);

impl FrameSink for StdoutSink {
    fn apply_frame(&mut self, wid: WindowId, frame: Rect) -> Result<(), FrameError> {
        writeln!(
            self.0.lock(),
            "frame {wid} {} {} {} {}",
            frame.min_x(),
            frame.min_y(),
            frame.width(),
            frame.height()
        )
        .map_err(|e| FrameError::Rejected { wid, reason: e.to_string() })
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            Config::read(&path).with_context(|| format!("reading config {}", path.display()))
        }
        None if config_file().exists() => Config::read(&config_file())
            .with_context(|| format!("reading config {}", config_file().display())),
        None => Ok(Config::default()),
    }
}

fn feed_events(input: Box<dyn BufRead + Send>, events_tx: reactor::Sender) {
    for (line_no, line) in input.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(%e, "could not read event input");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match serde_json::from_str::<Event>(line) {
            Ok(event) => events_tx.send(event),
            Err(e) => warn!(line = line_no + 1, %e, "skipping malformed event"),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let opt: Cli = Parser::parse();

    log::init_logging();
    install_panic_hook();

    let mut config = load_config(opt.config)?;

    if opt.validate {
        let issues = config.validate();
        if issues.is_empty() {
            println!("config ok");
            return Ok(());
        }
        for issue in &issues {
            println!("{issue}");
        }
        std::process::exit(1);
    }

    for issue in config.validate() {
        warn!("config: {issue}");
    }
    let fixed = config.auto_fix_values();
    if fixed > 0 {
        info!(fixed, "repaired config values");
    }

    let input: Box<dyn BufRead + Send> = match &opt.events {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening events {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let (events_tx, status, reactor) = Reactor::spawn(config, StdoutSink(io::stdout()))?;
    let menu = Menu::subscribed(&status, io::stdout());
    drop(status);

    let feeder = std::thread::Builder::new()
        .name("input".to_string())
        .spawn(move || feed_events(input, events_tx))?;

    let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build()?;
    runtime.block_on(menu.run());

    if feeder.join().is_err() || reactor.join().is_err() {
        anyhow::bail!("worker thread panicked");
    }
    Ok(())
}

#[cfg(panic = "unwind")]
fn install_panic_hook() {
    // A broken invariant on the reactor thread must take the process down.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        original_hook(info);
        std::process::abort();
    }));
}

#[cfg(not(panic = "unwind"))]
fn install_panic_hook() {}
