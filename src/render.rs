//! Rendering seam.
//!
//! The controller pushes state into a [`Renderer`] and never reads it back.
//! [`TerminalRenderer`] is the line-oriented implementation the CLI uses.

use std::collections::HashSet;
use std::io::Write;

use crossterm::{
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};
use tracing::warn;

use crate::models::Track;
use crate::player::{EmptyState, PlayOutcome, PlaybackState, PlaybackStatus, Progress, View};

/// Receives everything the user should see.
pub trait Renderer {
    /// The visible region switched to `view`.
    fn show_view(&mut self, view: View);

    /// `tracks` is now the content of `view`.
    fn render_tracks(&mut self, view: View, tracks: &[Track]);

    /// `view` has nothing to show, for the given reason.
    fn render_empty(&mut self, view: View, state: EmptyState);

    /// The now-playing panel; `None` shows the placeholder.
    fn show_now_playing(&mut self, track: Option<&Track>, liked: bool);

    fn show_progress(&mut self, progress: Progress);

    fn show_status(&mut self, status: PlaybackStatus);

    /// Highlight cards whose identity key equals `key`.
    fn highlight(&mut self, key: Option<&str>);

    /// The liked list changed; refresh like marks everywhere.
    fn show_likes(&mut self, liked: &[Track]);

    /// Result of a play request that the user should hear about.
    fn report_playback(&mut self, outcome: &PlayOutcome);
}

/// Format seconds as `m:ss`. Non-finite or negative input shows `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Renderer writing plain lines to a terminal in raw mode.
///
/// Progress is kept on a single live line that other output scrolls past.
pub struct TerminalRenderer<W: Write> {
    out: W,
    highlight: Option<String>,
    liked: HashSet<String>,
    live_line: Option<String>,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            highlight: None,
            liked: HashSet::new(),
            live_line: None,
        }
    }

    /// Print a one-off line above the live line.
    pub fn notice(&mut self, text: &str) {
        self.lines(&[text.to_string()]);
    }

    /// Consume the renderer, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn marks(&self, track: &Track) -> (&'static str, &'static str) {
        let playing = if self.highlight.as_deref() == Some(track.key()) {
            "▶"
        } else {
            " "
        };
        let liked = if self.liked.contains(track.key()) {
            "♥"
        } else {
            " "
        };
        (playing, liked)
    }

    fn lines(&mut self, lines: &[String]) {
        let result = (|| -> std::io::Result<()> {
            queue!(self.out, Print("\r"), Clear(ClearType::CurrentLine))?;
            for line in lines {
                queue!(self.out, Print(line), Print("\r\n"))?;
            }
            if let Some(live) = &self.live_line {
                queue!(self.out, Print(live))?;
            }
            self.out.flush()
        })();
        if let Err(e) = result {
            warn!("Terminal write failed: {}", e);
        }
    }

    fn live(&mut self, text: String) {
        let result = (|| -> std::io::Result<()> {
            queue!(
                self.out,
                Print("\r"),
                Clear(ClearType::CurrentLine),
                Print(&text)
            )?;
            self.out.flush()
        })();
        if let Err(e) = result {
            warn!("Terminal write failed: {}", e);
        }
        self.live_line = Some(text);
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn show_view(&mut self, view: View) {
        self.notice(&format!("── {} ──", view));
    }

    fn render_tracks(&mut self, view: View, tracks: &[Track]) {
        let mut lines = vec![format!("── {} ({} tracks) ──", view, tracks.len())];
        for (i, track) in tracks.iter().enumerate() {
            let (playing, liked) = self.marks(track);
            lines.push(format!(
                "{:>3}. {}{} {}  {}",
                i + 1,
                playing,
                liked,
                track.display(),
                format_time(track.duration_secs())
            ));
        }
        self.lines(&lines);
    }

    fn render_empty(&mut self, view: View, state: EmptyState) {
        self.notice(&format!("── {} ── {}", view, state.message()));
    }

    fn show_now_playing(&mut self, track: Option<&Track>, liked: bool) {
        match track {
            Some(track) => {
                let heart = if liked { " ♥" } else { "" };
                self.notice(&format!("Now playing: {}{}", track.display(), heart));
            }
            None => self.notice(EmptyState::NothingLoaded.message()),
        }
    }

    fn show_progress(&mut self, progress: Progress) {
        let filled = (progress.percent() / 5.0).round() as usize;
        let bar: String = (0..20).map(|i| if i < filled { '█' } else { '░' }).collect();
        self.live(format!(
            "{} {} {}",
            format_time(progress.position),
            bar,
            format_time(progress.duration)
        ));
    }

    fn show_status(&mut self, status: PlaybackStatus) {
        let state = match status.playback {
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Stopped => "stopped",
        };
        self.notice(&format!(
            "[{}] shuffle:{} repeat:{} volume:{}",
            state,
            if status.shuffle { "on" } else { "off" },
            if status.repeat { "on" } else { "off" },
            status.volume
        ));
    }

    fn highlight(&mut self, key: Option<&str>) {
        self.highlight = key.map(str::to_string);
    }

    fn show_likes(&mut self, liked: &[Track]) {
        self.liked = liked.iter().map(|t| t.key().to_string()).collect();
    }

    fn report_playback(&mut self, outcome: &PlayOutcome) {
        match outcome {
            PlayOutcome::Retrying { .. } => self.notice("Playback failed, retrying with stream URL..."),
            PlayOutcome::Failed(failure) => self.notice(&format!("Unable to play: {}", failure)),
            PlayOutcome::Started | PlayOutcome::Ignored => {}
        }
    }
}
