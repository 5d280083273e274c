//! Recordings console: list, play, rename and delete through the gateway.
//!
//! [`Console`] turns user events into gateway calls and folds the results
//! into a [`ConsoleState`].  Mutations never patch the list locally; every
//! successful delete or rename is followed by a full refresh.

pub mod client;
pub mod render;
pub mod state;

use std::path::Path;

use tracing::{error, info};

use self::client::GatewayApi;
use self::state::{ConsoleState, ItemMode, Playback};

/// Event driver over a [`GatewayApi`].
pub struct Console<C> {
    client: C,
    state: ConsoleState,
}

impl<C: GatewayApi> Console<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            state: ConsoleState::default(),
        }
    }

    pub fn state(&self) -> &ConsoleState {
        &self.state
    }

    /// Initial load.
    pub async fn mount(&mut self) {
        self.refresh().await;
    }

    /// Replace the snapshot with a fresh List. A failure leaves no list.
    pub async fn refresh(&mut self) {
        self.state.begin_loading();
        match self.client.list().await {
            Ok(recordings) => {
                info!("Loaded {} recordings", recordings.len());
                self.state.apply_list(recordings);
            }
            Err(e) => {
                error!("Error fetching recordings: {e}");
                self.state.apply_list_error(e.to_string());
            }
        }
    }

    /// Open the rename dialog with the display name as the draft.
    pub fn begin_rename(&mut self, key: &str) {
        let Some(recording) = self.state.find(key) else {
            return;
        };
        let draft = recording.display_name();
        self.state.set_mode(key, ItemMode::RenamePending { draft });
    }

    pub fn edit_rename(&mut self, key: &str, draft: &str) {
        if matches!(self.state.mode(key), ItemMode::RenamePending { .. }) {
            self.state.set_mode(
                key,
                ItemMode::RenamePending {
                    draft: draft.to_string(),
                },
            );
        }
    }

    pub fn cancel_rename(&mut self, key: &str) {
        if matches!(self.state.mode(key), ItemMode::RenamePending { .. }) {
            self.state.set_mode(key, ItemMode::Normal);
        }
    }

    /// Commit the pending rename. An empty draft keeps the dialog open; an
    /// untouched draft closes it without a request.
    pub async fn confirm_rename(&mut self, key: &str) {
        let draft = match self.state.mode(key) {
            ItemMode::RenamePending { draft } => draft.clone(),
            _ => return,
        };
        let untouched = self
            .state
            .find(key)
            .is_some_and(|recording| recording.display_name() == draft);
        let draft = draft.trim();
        if draft.is_empty() {
            return;
        }

        self.state.set_mode(key, ItemMode::Normal);
        if untouched {
            return;
        }
        let new_key = resolve_new_key(key, draft);
        if new_key == key {
            return;
        }

        match self.client.rename(key, &new_key).await {
            Ok(ack) => {
                info!("{}", ack.message);
                self.refresh().await;
            }
            Err(e) => {
                error!("Error renaming {} to {}: {e}", key, new_key);
                self.state
                    .set_banner(format!("Could not rename {key} to {new_key}: {e}"));
                // A failed rename may have left both keys behind.
                self.refresh().await;
            }
        }
    }

    /// Ask for confirmation before deleting `key`.
    pub fn request_delete(&mut self, key: &str) {
        if self.state.find(key).is_some() {
            self.state.set_mode(key, ItemMode::DeleteConfirmPending);
        }
    }

    pub fn cancel_delete(&mut self, key: &str) {
        if self.state.mode(key) == &ItemMode::DeleteConfirmPending {
            self.state.set_mode(key, ItemMode::Normal);
        }
    }

    /// Issue the delete. Only valid after [`Console::request_delete`].
    pub async fn confirm_delete(&mut self, key: &str) {
        if self.state.mode(key) != &ItemMode::DeleteConfirmPending {
            return;
        }
        self.state.set_mode(key, ItemMode::Normal);

        match self.client.delete(key).await {
            Ok(ack) => {
                info!("{}", ack.message);
                self.refresh().await;
            }
            Err(e) => {
                error!("Error deleting {}: {e}", key);
                self.state.set_banner(format!("Could not delete {key}: {e}"));
            }
        }
    }

    /// Request a fresh link for `key` and bind it to the player.
    pub async fn play(&mut self, key: &str) {
        let Some(recording) = self.state.find(key).cloned() else {
            return;
        };
        self.state.set_playback(Playback::Requesting {
            key: key.to_string(),
        });

        match self.client.presigned_url(key).await {
            Ok(url) => self.state.set_playback(Playback::Playing { recording, url }),
            Err(e) => {
                error!("Error fetching presigned URL for {}: {e}", key);
                self.state.set_playback(Playback::Closed);
                self.state.set_banner(format!("Could not play {key}: {e}"));
            }
        }
    }

    /// Stop playback and drop the link.
    pub fn close_player(&mut self) {
        self.state.set_playback(Playback::Closed);
    }

    pub fn dismiss_banner(&mut self) {
        self.state.clear_banner();
    }
}

/// Key a rename draft resolves to. The old key's extension is appended
/// unless the draft already ends with it.
fn resolve_new_key(old_key: &str, draft: &str) -> String {
    match Path::new(old_key).extension().and_then(|e| e.to_str()) {
        Some(ext) if !draft.ends_with(&format!(".{ext}")) => format!("{draft}.{ext}"),
        _ => draft.to_string(),
    }
}
