//! Guide overlay navigation.
//!
//! While the guide is visible, input actions move a cursor over the
//! playlist instead of controlling playback.

use crate::models::action::Action;
use crate::models::playlist::PlaylistItem;

/// What the orchestrator should do after the guide handled an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideOutcome {
    /// The cursor moved; redraw the guide.
    Redraw,
    /// The guide was closed without a selection.
    Hidden,
    /// Jump playback to this playlist index.
    Jump(usize),
    /// Shut the appliance down.
    Shutdown,
    /// The action has no meaning in the guide.
    Ignored,
}

/// Cursor state of the guide overlay.
#[derive(Debug, Clone)]
pub struct Guide {
    visible: bool,
    selection: usize,
    page_size: usize,
}

impl Guide {
    pub fn new(page_size: usize) -> Self {
        Self {
            visible: false,
            selection: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn selection(&self) -> usize {
        self.selection
    }

    /// Show the guide with the cursor on the currently playing item.
    pub fn open(&mut self, current: usize) {
        self.visible = true;
        self.selection = current;
    }

    pub fn close(&mut self) {
        self.visible = false;
    }

    /// Route an action while the guide is visible.
    pub fn handle(&mut self, action: Action, playlist_len: usize) -> GuideOutcome {
        if !self.visible {
            return GuideOutcome::Ignored;
        }

        match action {
            Action::Up | Action::Previous => {
                self.selection = self.selection.saturating_sub(1);
                GuideOutcome::Redraw
            }
            Action::Down | Action::Next => {
                if self.selection + 1 < playlist_len {
                    self.selection += 1;
                }
                GuideOutcome::Redraw
            }
            Action::Select => {
                self.visible = false;
                if self.selection < playlist_len {
                    GuideOutcome::Jump(self.selection)
                } else {
                    GuideOutcome::Hidden
                }
            }
            Action::ShowGuide => {
                self.visible = false;
                GuideOutcome::Hidden
            }
            Action::Shutdown => GuideOutcome::Shutdown,
            _ => GuideOutcome::Ignored,
        }
    }

    /// Text of the current guide page.
    pub fn render(&self, playlist: &[PlaylistItem]) -> String {
        let page = self.selection / self.page_size;
        let start = page * self.page_size;
        let end = (start + self.page_size).min(playlist.len());

        let mut text = String::from("--- Guide ---\n\n");
        for (offset, item) in playlist[start.min(end)..end].iter().enumerate() {
            let prefix = if start + offset == self.selection { "> " } else { "  " };
            text.push_str(prefix);
            text.push_str(&item.guide_label());
            text.push('\n');
        }
        text.push_str(&format!(
            "\n--- Item {} of {} ---",
            self.selection + 1,
            playlist.len()
        ));
        text
    }
}
