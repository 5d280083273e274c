//! Plain-text rendering of a console snapshot.

use std::fmt::Write;

use super::state::{ConsoleState, ItemMode, LoadState, Playback};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Render the whole console: header, list body, player, banner.
pub fn render(state: &ConsoleState) -> String {
    let mut out = String::from("Recordings\n");

    match state.load() {
        LoadState::Idle | LoadState::Loading => out.push_str("  Loading...\n"),
        LoadState::Error(message) => {
            let _ = writeln!(out, "  Could not load recordings: {message}");
            out.push_str("  Use `refresh` to try again.\n");
        }
        LoadState::Loaded if state.recordings().is_empty() => {
            out.push_str("  No recordings.\n");
        }
        LoadState::Loaded => {
            for (i, recording) in state.recordings().iter().enumerate() {
                let _ = writeln!(out, "{:>3}. {}", i + 1, recording.display_name());
                let _ = writeln!(
                    out,
                    "     Last modified: {}",
                    recording.last_modified.format(DATE_FORMAT)
                );
                let _ = writeln!(out, "     Size: {} MB", recording.size_mb());
                match state.mode(&recording.key) {
                    ItemMode::Normal => {}
                    ItemMode::RenamePending { draft } => {
                        let _ = writeln!(out, "     Rename to: {draft}");
                    }
                    ItemMode::DeleteConfirmPending => {
                        out.push_str("     Are you sure? This action cannot be undone.\n");
                        out.push_str("     This will permanently delete the recording.\n");
                    }
                }
            }
        }
    }

    match state.playback() {
        Playback::Closed => {}
        Playback::Requesting { key } => {
            let _ = writeln!(out, "\nPreparing {key}...");
        }
        Playback::Playing { recording, url } => {
            let _ = writeln!(
                out,
                "\nNow playing: {} (Last modified: {})\n  {}",
                recording.display_name(),
                recording.last_modified.format(DATE_FORMAT),
                url
            );
        }
    }

    if let Some(banner) = state.banner() {
        let _ = writeln!(out, "\n! {banner}");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::Recording;
    use chrono::{TimeZone, Utc};

    fn take1() -> Recording {
        Recording::new(
            "take1.wav",
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            2_097_152,
        )
    }

    #[test]
    fn test_render_loading() {
        let state = ConsoleState::default();
        assert!(render(&state).contains("Loading..."));
    }

    #[test]
    fn test_render_empty() {
        let mut state = ConsoleState::default();
        state.apply_list(vec![]);
        assert!(render(&state).contains("No recordings."));
    }

    #[test]
    fn test_render_item() {
        let mut state = ConsoleState::default();
        state.apply_list(vec![take1()]);
        let out = render(&state);
        assert!(out.contains("  1. take1\n"));
        assert!(out.contains("Last modified: 2024-01-01"));
        assert!(out.contains("Size: 2.00 MB"));
    }

    #[test]
    fn test_render_pending_modes() {
        let mut state = ConsoleState::default();
        state.apply_list(vec![take1()]);
        state.set_mode(
            "take1.wav",
            ItemMode::RenamePending {
                draft: "take2".into(),
            },
        );
        assert!(render(&state).contains("Rename to: take2"));

        state.set_mode("take1.wav", ItemMode::DeleteConfirmPending);
        assert!(render(&state).contains("Are you sure?"));
    }

    #[test]
    fn test_render_player_and_banner() {
        let mut state = ConsoleState::default();
        state.apply_list(vec![take1()]);
        state.set_playback(Playback::Playing {
            recording: take1(),
            url: "https://example.test/take1.wav?sig".into(),
        });
        state.set_banner("Could not delete take1.wav");
        let out = render(&state);
        assert!(out.contains("Now playing: take1 (Last modified: 2024-01-01)"));
        assert!(out.contains("https://example.test/take1.wav?sig"));
        assert!(out.contains("! Could not delete take1.wav"));
    }

    #[test]
    fn test_render_error() {
        let mut state = ConsoleState::default();
        state.apply_list_error("gateway returned 500: Failed to fetch recordings.".into());
        let out = render(&state);
        assert!(out.contains("Could not load recordings: gateway returned 500"));
    }
}
