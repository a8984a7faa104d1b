//! Console status surface.
//!
//! Renders the standby status line to stdout, one line per change. The real
//! appliance points this trait at a framebuffer or small panel; the console
//! backend keeps headless and development runs observable.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use super::StatusSurface;

pub struct ConsoleSurface {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    text: String,
    progress_visible: bool,
}

impl ConsoleSurface {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    fn render(state: &State) {
        if state.progress_visible {
            println!("[standby] {} ...", state.text);
        } else {
            println!("[standby] {}", state.text);
        }
    }
}

impl Default for ConsoleSurface {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusSurface for ConsoleSurface {
    async fn set_status_text(&self, text: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.text = text.to_string();
        Self::render(&state);
        Ok(())
    }

    async fn set_progress_visible(&self, visible: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.progress_visible != visible {
            state.progress_visible = visible;
            Self::render(&state);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = State::default();
        println!("[standby]");
        Ok(())
    }
}
