//! Typed state container for the recordings console.
//!
//! The latest successful List response is the only source of truth for
//! the recording set; it is replaced wholesale on every refresh and never
//! patched locally.

use std::collections::HashMap;

use crate::recording::Recording;

/// Progress of the list fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Error(String),
}

/// Per-recording interaction mode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ItemMode {
    #[default]
    Normal,
    /// Rename dialog open with the name typed so far.
    RenamePending { draft: String },
    /// Delete confirmation shown; nothing is sent until confirmed.
    DeleteConfirmPending,
}

/// Player dialog state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Playback {
    #[default]
    Closed,
    /// A fresh link has been requested for `key`.
    Requesting { key: String },
    /// `url` is bound to the player. Dropped when the player closes.
    Playing { recording: Recording, url: String },
}

#[derive(Debug, Clone, Default)]
pub struct ConsoleState {
    load: LoadState,
    recordings: Vec<Recording>,
    modes: HashMap<String, ItemMode>,
    playback: Playback,
    banner: Option<String>,
}

impl ConsoleState {
    pub fn load(&self) -> &LoadState {
        &self.load
    }

    pub fn recordings(&self) -> &[Recording] {
        &self.recordings
    }

    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    /// User-facing error message from the last failed action, if any.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn find(&self, key: &str) -> Option<&Recording> {
        self.recordings.iter().find(|r| r.key == key)
    }

    pub fn mode(&self, key: &str) -> &ItemMode {
        const NORMAL: &ItemMode = &ItemMode::Normal;
        self.modes.get(key).unwrap_or(NORMAL)
    }

    pub(crate) fn set_mode(&mut self, key: &str, mode: ItemMode) {
        if mode == ItemMode::Normal {
            self.modes.remove(key);
        } else {
            self.modes.insert(key.to_string(), mode);
        }
    }

    pub(crate) fn begin_loading(&mut self) {
        self.load = LoadState::Loading;
    }

    /// Install a fresh snapshot. Modes for keys that disappeared are dropped.
    pub(crate) fn apply_list(&mut self, recordings: Vec<Recording>) {
        self.modes
            .retain(|key, _| recordings.iter().any(|r| &r.key == key));
        self.recordings = recordings;
        self.load = LoadState::Loaded;
    }

    /// Record a failed fetch. The previous snapshot is discarded rather
    /// than shown as if current.
    pub(crate) fn apply_list_error(&mut self, message: String) {
        self.recordings.clear();
        self.modes.clear();
        self.load = LoadState::Error(message);
    }

    pub(crate) fn set_playback(&mut self, playback: Playback) {
        self.playback = playback;
    }

    pub(crate) fn set_banner(&mut self, message: impl Into<String>) {
        self.banner = Some(message.into());
    }

    pub(crate) fn clear_banner(&mut self) {
        self.banner = None;
    }
}
