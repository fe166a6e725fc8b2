//! Text sinks the orchestrator writes its three panels to.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// One independently updated panel
pub trait Surface {
    /// Show a transient status while a stage is running
    fn pending(&mut self, status: &str);

    /// Show the panel's final text
    fn show(&mut self, text: &str);
}

/// Renders a panel on the terminal: a spinner while pending, then the text
pub struct TerminalSurface {
    title: String,
    spinner: Option<ProgressBar>,
}

impl TerminalSurface {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            spinner: None,
        }
    }
}

impl Surface for TerminalSurface {
    fn pending(&mut self, status: &str) {
        let message = format!("{}: {}", self.title, status);
        match &self.spinner {
            Some(pb) => pb.set_message(message),
            None => self.spinner = Some(create_spinner(message)),
        }
    }

    fn show(&mut self, text: &str) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
        println!("{}", self.title);
        println!("{}", "=".repeat(self.title.chars().count()));
        println!("{text}");
        println!();
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.abandon();
        }
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
    pb.set_style(style);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Keeps every update in memory; useful for embedding and for tests
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemorySurface {
    pub history: Vec<SurfaceUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceUpdate {
    Pending(String),
    Shown(String),
}

impl MemorySurface {
    /// Text of the most recent update, pending or final
    pub fn current(&self) -> Option<&str> {
        self.history.last().map(|update| match update {
            SurfaceUpdate::Pending(s) | SurfaceUpdate::Shown(s) => s.as_str(),
        })
    }

    /// True once the last update is final text
    pub fn is_settled(&self) -> bool {
        matches!(self.history.last(), Some(SurfaceUpdate::Shown(_)))
    }
}

impl Surface for MemorySurface {
    fn pending(&mut self, status: &str) {
        self.history.push(SurfaceUpdate::Pending(status.to_string()));
    }

    fn show(&mut self, text: &str) {
        self.history.push(SurfaceUpdate::Shown(text.to_string()));
    }
}
