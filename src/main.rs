//! Entry point for the **hyperflow** daemon.
//!
//! Spawns the event source, the config watcher and the control socket on
//! background threads and processes their messages on the main thread.

use clap::Parser;
use hyperflow::config::{self, Config};
use hyperflow::daemon::{Daemon, DaemonMessage};
use hyperflow::dispatch::ShellLauncher;
use hyperflow::hyprland::events::HyprlandEventSource;
use hyperflow::ipc::listener::ControlListener;
use hyperflow::rules::{self, store::RuleStore, watcher::ConfigWatcher};
use hyperflow::shutdown::Shutdown;
use hyperflow::signals::SignalListener;
use hyperflow::source::Reconnecting;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "hyperflow", version, about = "Rule-driven automation daemon for Hyprland")]
struct Args {
    /// Settings file (defaults to $XDG_CONFIG_HOME/hyperflow/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Rule document, overriding the settings file
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Do not open the control socket
    #[arg(long)]
    no_control_socket: bool,
}

/// Load settings from `--config` or the default location, falling back
/// to compiled-in defaults.  An explicit `--config` that fails is fatal.
fn load_config(explicit: Option<&Path>) -> Result<Config, config::ConfigError> {
    if let Some(path) = explicit {
        let cfg = Config::load(path)?;
        info!("loaded config from {}", path.display());
        return Ok(cfg);
    }
    let path = config::config_dir().join("config.json");
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            Ok(cfg)
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Ok(Config::default())
        }
    }
}

/// Removes the PID file when dropped.
struct PidFile(PathBuf);

impl PidFile {
    fn create(path: PathBuf) -> std::io::Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&path, std::process::id().to_string())?;
        Ok(Self(path))
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = match load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    if let Some(rules) = args.rules {
        config.rules_path = Some(rules);
    }

    run_daemon(config, !args.no_control_socket);
}

fn run_daemon(config: Config, control_socket: bool) {
    let rules_path = config.rules_path();
    match rules::write_default_if_missing(&rules_path) {
        Ok(true) => info!("created default rules at {}", rules_path.display()),
        Ok(false) => {}
        Err(e) => warn!("{}", e),
    }

    let _pid_file = match PidFile::create(config::pid_file_path()) {
        Ok(pid) => Some(pid),
        Err(e) => {
            warn!("could not write pid file: {}", e);
            None
        }
    };

    let shutdown = Shutdown::new();
    let (tx, rx) = mpsc::channel::<DaemonMessage>();

    let signal_handle = match SignalListener::new(&rules_path, shutdown.clone()) {
        Ok(mut listener) => {
            let handle = listener.handle();
            let tx = tx.clone();
            spawn_named("hyperflow-signals", move || listener.run(tx));
            Some(handle)
        }
        Err(e) => {
            error!("failed to install signal handlers: {}", e);
            None
        }
    };

    let store = RuleStore::open(&rules_path);
    spawn_sources(&config, &rules_path, control_socket, &shutdown, tx);

    let mut daemon = Daemon::new(store, ShellLauncher::default());
    daemon.run(rx);

    shutdown.trigger();
    if let Some(handle) = signal_handle {
        handle.close();
    }
    if control_socket {
        let _ = std::fs::remove_file(config.control_socket());
    }
    info!("hyperflow stopped");
}

fn spawn_sources(
    config: &Config,
    rules_path: &Path,
    control_socket: bool,
    shutdown: &Shutdown,
    tx: mpsc::Sender<DaemonMessage>,
) {
    {
        let tx = tx.clone();
        let mut source = Reconnecting::new(
            HyprlandEventSource::new(config.event_socket.clone(), shutdown.clone()),
            config.reconnect_backoff(),
            shutdown.clone(),
        );
        spawn_named("hyperflow-events", move || source.run(tx));
    }

    {
        let tx = tx.clone();
        let mut watcher = ConfigWatcher::new(rules_path, config.poll_interval(), shutdown.clone());
        spawn_named("hyperflow-watcher", move || watcher.run(tx));
    }

    if control_socket {
        let tx = tx.clone();
        let mut listener =
            ControlListener::new(config.control_socket(), rules_path, shutdown.clone());
        spawn_named("hyperflow-control", move || {
            if let Err(e) = listener.run(tx) {
                error!("control socket error: {}", e);
            }
        });
    }

    drop(tx);
}

fn spawn_named<F>(name: &str, f: F)
where
    F: FnOnce() + Send + 'static,
{
    if let Err(e) = std::thread::Builder::new().name(name.into()).spawn(f) {
        error!("failed to spawn {}: {}", name, e);
    }
}
