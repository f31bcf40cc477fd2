//! # Playdeck
//!
//! A music player client for a small REST backend that searches tracks,
//! streams audio and keeps a liked-songs list.
//!
//! ## Quick Start
//!
//! The core is [`PlayerController`], which ties a [`BackendClient`], an
//! [`AudioSink`] and a [`Renderer`] together:
//!
//! ```rust,no_run
//! use playdeck::{HttpBackend, PlayerConfig, PlayerController, SilentSink, TerminalRenderer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PlayerConfig::with_base_url("http://localhost:5000")?;
//!     let backend = HttpBackend::new(config.clone())?;
//!     let renderer = TerminalRenderer::new(std::io::stdout());
//!     let mut player = PlayerController::new(backend, SilentSink::new(), renderer, config);
//!
//!     // Fetch liked songs and load the first library track
//!     player.init().await;
//!
//!     // Search and play the first hit
//!     player.submit_search("nina simone");
//!     player.settle().await;
//!     let outcome = player.play(Some((0, player.view()))).await;
//!     println!("{:?}", outcome);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Three track lists**: library, search results and liked songs
//! - **Transport**: play/pause, next/previous, shuffle, repeat, seek, volume
//! - **Debounced search** with stale responses discarded
//! - **Playback retry** through the backend stream endpoint
//! - **Keyboard bindings** for the terminal front-end
//!
//! ## Seams
//!
//! - [`BackendClient`] - backend REST API ([`HttpBackend`] over reqwest)
//! - [`AudioSink`] - audio output ([`SilentSink`], or `RodioSink` with the
//!   `rodio-output` feature)
//! - [`Renderer`] - presentation ([`TerminalRenderer`])

pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod keys;
pub mod models;
pub mod player;
pub mod render;

// Main interface
pub use player::{PlayOutcome, PlayerController, View};

// Seams
pub use api::{BackendClient, HttpBackend};
#[cfg(feature = "rodio-output")]
pub use audio::RodioSink;
pub use audio::{AudioEvent, AudioSink, SilentSink};
pub use render::{Renderer, TerminalRenderer};

pub use config::PlayerConfig;
pub use error::PlayerError;
pub use models::Track;
