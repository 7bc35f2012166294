use anyhow::{Context, Result as AnyhowResult};
use clap::Parser;
use crossterm::event::{poll as event_poll, read as event_read, Event as CrosstermEvent};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use serde_json::{json, Map, Value};
use sercom::app::App;
use sercom::config::Config;
use sercom::config_io::{ConfigResolver, DirectoryContext};
use sercom::input::key::Key;
use sercom::model::history::History;
use sercom::services::terminal_modes::{self, TerminalModes};
use sercom::services::termination::TerminationSignal;
use sercom::services::{log_dirs, serial, tracing_setup};
use sercom::view::interface::Interface;
use sercom::view::SERIAL_PANE;
use std::io::{self, stdout, IsTerminal, Read};
use std::path::PathBuf;
use std::time::Duration;

/// Interval of the key poll, bounding how fast serial output shows up
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A split-screen serial line terminal
#[derive(Parser, Debug)]
#[command(name = "sercom")]
#[command(about = "Send commands to a serial device and watch what it answers", long_about = None)]
#[command(version)]
struct Args {
    /// Files whose lines are sent before the first key press
    #[arg(value_name = "FILES")]
    files: Vec<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Serial device
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baudrate: Option<u32>,

    /// Outbound rate limit in bytes per second, 0 to disable
    #[arg(long)]
    ratelimit: Option<u32>,

    /// Completion project
    #[arg(long)]
    project: Option<String>,

    /// Do not load or save the command history
    #[arg(long)]
    no_history: bool,

    /// Disable colors
    #[arg(long)]
    no_colors: bool,

    /// Path to log file (default: XDG state directory)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// More verbose logging, repeat for debug
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

impl Args {
    /// Command line settings as a configuration layer
    fn overrides(&self) -> Value {
        let mut layer = Map::new();
        if let Some(port) = &self.port {
            layer.insert("port".to_string(), json!(port));
        }
        if let Some(baudrate) = self.baudrate {
            layer.insert("baudrate".to_string(), json!(baudrate));
        }
        if let Some(ratelimit) = self.ratelimit {
            layer.insert("ratelimit".to_string(), json!(ratelimit));
        }
        if let Some(project) = &self.project {
            layer.insert("project".to_string(), json!(project));
        }
        if self.no_history {
            layer.insert("history_save".to_string(), json!(false));
        }
        if self.no_colors {
            layer.insert("colors".to_string(), json!(false));
        }
        Value::Object(layer)
    }

    fn log_level<'a>(&self, config: &'a Config) -> &'a str {
        match self.verbose {
            0 => &config.logging.level,
            1 => "info",
            _ => "debug",
        }
    }
}

/// Read the preloaded input: the given files, then stdin when it is piped.
///
/// Must run before the terminal is set up, since stdin is replaced by the
/// controlling TTY afterwards.
fn read_input(files: &[PathBuf]) -> AnyhowResult<String> {
    let mut input = String::new();
    for file in files {
        let content = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read input file {}", file.display()))?;
        input.push_str(&content);
    }

    if !io::stdin().is_terminal() {
        io::stdin()
            .read_to_string(&mut input)
            .context("Failed to read stdin")?;
        reopen_stdin_from_tty().context("Failed to reopen the terminal as stdin")?;
        tracing::info!("Reopened stdin from /dev/tty for terminal input");
    }
    Ok(input)
}

/// Reopen stdin from /dev/tty after reading piped content, so key input
/// keeps working
#[cfg(unix)]
fn reopen_stdin_from_tty() -> AnyhowResult<()> {
    use std::fs::File;
    use std::os::unix::io::AsRawFd;

    let tty = File::open("/dev/tty")?;

    // SAFETY: both descriptors are valid for the duration of the call
    let result = unsafe { libc::dup2(tty.as_raw_fd(), libc::STDIN_FILENO) };
    if result == -1 {
        anyhow::bail!(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
fn reopen_stdin_from_tty() -> AnyhowResult<()> {
    anyhow::bail!(io::Error::new(
        io::ErrorKind::Unsupported,
        "Reading from stdin is not supported on this platform",
    ))
}

fn run_event_loop(
    app: &mut App,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
) -> AnyhowResult<()> {
    loop {
        app.process_async_messages()?;
        if app.should_quit() {
            break;
        }

        terminal.draw(|frame| app.render(frame))?;

        if !event_poll(POLL_INTERVAL)? {
            continue;
        }
        match event_read()? {
            CrosstermEvent::Key(key_event) => {
                if let Some(key) = Key::from_event(&key_event) {
                    app.handle_key(key);
                }
            }
            CrosstermEvent::Resize(width, height) => {
                tracing::debug!("Terminal resized to {}x{}, layout kept", width, height);
            }
            _ => {}
        }
    }
    Ok(())
}

fn main() -> AnyhowResult<()> {
    let args = Args::parse();

    let dir_context = DirectoryContext::from_system().context("Failed to locate directories")?;
    let resolver = ConfigResolver::new(dir_context, args.config.clone());
    let config = resolver
        .resolve(args.overrides())
        .context("Failed to load configuration")?;

    if args.dump_config {
        let json = serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
        println!("{}", json);
        return Ok(());
    }

    let log_file = args
        .log_file
        .clone()
        .or_else(|| config.logging.file.clone())
        .unwrap_or_else(log_dirs::main_log_path);
    let status_log = tracing_setup::init_global(&log_file, args.log_level(&config));
    tracing::info!("sercom starting, logging to {}", log_file.display());

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        terminal_modes::emergency_cleanup();
        original_hook(panic);
    }));

    let input = read_input(&args.files)?;
    let completion = resolver
        .load_completion(&config.project)
        .context("Failed to load completion")?;

    let mut history = History::new();
    let history_error = history.load(config.history_save, None).err();

    let mut terminal_modes = TerminalModes::enable().context("Failed to set up terminal")?;
    let mut terminal =
        Terminal::new(CrosstermBackend::new(stdout())).context("Failed to create terminal")?;
    let size = terminal.size().context("Failed to get terminal size")?;
    let layouts = config
        .interface_parse(size.width, size.height)
        .context("Failed to lay out the interface")?;
    let interface = Interface::new(layouts, config.colors);

    let serial_writer = interface
        .pane(SERIAL_PANE)
        .map(|pane| pane.writer())
        .context("No serial pane in the interface")?;
    let termination = TerminationSignal::new();
    let (transport, worker) = serial::spawn(config.serial.clone(), serial_writer, termination.clone())
        .context("Failed to start the serial worker")?;

    let mut app = App::new(interface, history, completion, transport, termination)
        .context("Failed to create application")?;
    app.attach_worker(worker);
    if let Some(handle) = status_log {
        app.attach_status_log(handle);
    }
    if let Some(e) = history_error {
        app.set_status_message(format!("Failed to load history: {e}"));
    }
    app.preload(&input);

    let result = run_event_loop(&mut app, &mut terminal);

    app.shutdown();
    terminal_modes.undo();
    tracing::info!("sercom exiting");

    result.context("Event loop returned an error")
}
