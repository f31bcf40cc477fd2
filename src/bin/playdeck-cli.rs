use clap::{Parser, Subcommand};
use crossterm::event::{self, Event as TermEvent, KeyEvent};
use crossterm::terminal;
use playdeck::config::{DEFAULT_BASE_URL, DEFAULT_VOLUME};
use playdeck::keys::{self, Command, KeyAction, UiAction};
use playdeck::player::Event;
use playdeck::{BackendClient, HttpBackend, PlayerConfig, PlayerController, TerminalRenderer, Track};
use std::io::Stdout;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "rodio-output")]
type Sink = playdeck::RodioSink;
#[cfg(not(feature = "rodio-output"))]
type Sink = playdeck::SilentSink;

type Player = PlayerController<HttpBackend, Sink, TerminalRenderer<Stdout>>;

const HELP: &str = "space play/pause | ctrl+←/→ prev/next | / search | j/k select | enter play \
| s shuffle | r repeat | l like | h/f/L views | +/- volume | m mute | ←/→ seek | q quit";

#[derive(Parser)]
#[command(name = "playdeck-cli")]
#[command(about = "CLI for Playdeck - terminal music player", long_about = None)]
struct Cli {
    /// Backend base URL (can also be set via PLAYDECK_BASE_URL env var)
    #[arg(long, env = "PLAYDECK_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// JSON file with the home library (an array of tracks)
    #[arg(short, long)]
    library: Option<PathBuf>,

    /// Initial volume (0-100)
    #[arg(long, default_value_t = DEFAULT_VOLUME, value_parser = clap::value_parser!(u8).range(0..=100))]
    volume: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive player
    Play,
    /// Search for tracks
    Search {
        /// Search query
        query: String,
    },
    /// List liked songs
    Liked,
    /// Like a track by backend id
    Like {
        /// Track id
        id: String,
    },
    /// Remove a track from the liked songs
    Unlike {
        /// Track id (or title for tracks without one)
        id: String,
    },
    /// Check that the backend is running
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = PlayerConfig::with_base_url(&cli.base_url)?;
    config.initial_volume = cli.volume;
    let backend = HttpBackend::new(config.clone())?;

    match &cli.command {
        Commands::Play => {
            let library = match &cli.library {
                Some(path) => load_library(path)?,
                None => Vec::new(),
            };
            run_interactive(backend, config, library).await?;
        }
        Commands::Search { query } => {
            println!("Searching for '{}'...", query);
            print_tracks(&backend.search(query).await?);
        }
        Commands::Liked => {
            let liked = backend.liked().await?;
            if liked.is_empty() {
                println!("No liked songs yet");
            }
            print_tracks(&liked);
        }
        Commands::Like { id } => {
            let track = backend.track(id).await?;
            let update = backend.add_liked(&track).await?;
            println!("♥ Liked: {}", track.display());
            println!("   {} liked songs", update.liked.len());
        }
        Commands::Unlike { id } => {
            let update = backend.remove_liked(id).await?;
            println!("Removed {} from liked songs", id);
            println!("   {} liked songs", update.liked.len());
        }
        Commands::Health => {
            let health = backend.health().await?;
            let mark = if health.is_ok() { "✅" } else { "❌" };
            println!("{} {} ({})", mark, health.message, health.status);
        }
    }

    Ok(())
}

fn load_library(path: &Path) -> Result<Vec<Track>, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn print_tracks(tracks: &[Track]) {
    for (i, track) in tracks.iter().enumerate() {
        println!(
            "{}. {} (ID: {})",
            i + 1,
            track.display(),
            track.id.as_deref().unwrap_or("?")
        );
    }
}

#[cfg(feature = "rodio-output")]
fn open_sink() -> playdeck::error::Result<Sink> {
    playdeck::RodioSink::new()
}

#[cfg(not(feature = "rodio-output"))]
fn open_sink() -> playdeck::error::Result<Sink> {
    Ok(playdeck::SilentSink::new())
}

async fn run_interactive(
    backend: HttpBackend,
    config: PlayerConfig,
    library: Vec<Track>,
) -> Result<(), Box<dyn std::error::Error>> {
    let sink = open_sink()?;
    let renderer = TerminalRenderer::new(std::io::stdout());
    let mut player = PlayerController::new(backend, sink, renderer, config).with_library(library);

    terminal::enable_raw_mode()?;
    event_loop(&mut player).await;
    terminal::disable_raw_mode()?;
    println!();
    Ok(())
}

/// Blocking crossterm reads on a plain thread, forwarded into the runtime.
fn spawn_key_reader() -> mpsc::UnboundedReceiver<KeyEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || loop {
        match event::read() {
            Ok(TermEvent::Key(key)) => {
                if tx.send(key).is_err() {
                    break;
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Terminal input failed: {}", e);
                break;
            }
        }
    });
    rx
}

enum Input {
    Key(KeyEvent),
    Player(Event),
}

/// Front-end state the controller does not own.
#[derive(Default)]
struct Ui {
    /// Search input text while it has focus.
    input: Option<String>,
    /// Selected row in the current view.
    selected: usize,
}

async fn event_loop(player: &mut Player) {
    let mut keys_rx = spawn_key_reader();
    let mut ui = Ui::default();

    player.init().await;
    player.renderer_mut().notice(HELP);

    loop {
        let input = tokio::select! {
            Some(key) = keys_rx.recv() => Input::Key(key),
            Some(event) = player.next_event() => Input::Player(event),
            else => break,
        };

        match input {
            Input::Player(event) => player.handle(event).await,
            Input::Key(key) => {
                let Some(action) = keys::action_for(&key, ui.input.is_some()) else {
                    continue;
                };
                match action {
                    KeyAction::Ui(UiAction::Quit) => break,
                    KeyAction::Ui(action) => ui.apply(action, player).await,
                    KeyAction::Player(command) => {
                        if matches!(command, Command::ShowView(_)) {
                            ui.selected = 0;
                        }
                        player.dispatch(command).await;
                    }
                }
            }
        }
    }

    player.pause();
}

impl Ui {
    async fn apply(&mut self, action: UiAction, player: &mut Player) {
        match action {
            UiAction::FocusSearch => {
                self.input = Some(String::new());
                player.renderer_mut().notice("Search: ");
            }
            UiAction::InputChar(c) => {
                if let Some(query) = self.input.as_mut() {
                    query.push(c);
                    player.on_search_input(query);
                    player.renderer_mut().notice(&format!("Search: {}", query));
                }
            }
            UiAction::InputBackspace => {
                if let Some(query) = self.input.as_mut() {
                    query.pop();
                    player.on_search_input(query);
                    player.renderer_mut().notice(&format!("Search: {}", query));
                }
            }
            UiAction::InputSubmit => {
                if let Some(query) = self.input.take() {
                    self.selected = 0;
                    player.submit_search(&query);
                }
            }
            UiAction::InputCancel => {
                self.input = None;
            }
            UiAction::SelectNext | UiAction::SelectPrevious => {
                let len = player.current_list().len();
                if len == 0 {
                    return;
                }
                self.selected = match action {
                    UiAction::SelectNext => (self.selected + 1) % len,
                    _ => (self.selected + len - 1) % len,
                };
                let line = format!(
                    "> {}. {}",
                    self.selected + 1,
                    player.current_list()[self.selected].display()
                );
                player.renderer_mut().notice(&line);
            }
            UiAction::PlaySelected => {
                let view = player.view();
                player.play(Some((self.selected, view))).await;
            }
            UiAction::Quit => {}
        }
    }
}
