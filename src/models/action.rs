//! Input actions consumed by the playback orchestrator.

use std::str::FromStr;

/// An already-classified user input action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    TogglePause,
    Next,
    Previous,
    VolumeUp,
    VolumeDown,
    Restart,
    MarkSeen,
    ToggleMute,
    ShowGuide,
    Shutdown,
    Up,
    Down,
    Select,
}

impl Action {
    /// Every action, in declaration order.
    pub const ALL: [Action; 13] = [
        Action::TogglePause,
        Action::Next,
        Action::Previous,
        Action::VolumeUp,
        Action::VolumeDown,
        Action::Restart,
        Action::MarkSeen,
        Action::ToggleMute,
        Action::ShowGuide,
        Action::Shutdown,
        Action::Up,
        Action::Down,
        Action::Select,
    ];

    /// Canonical symbolic name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::TogglePause => "toggle_pause",
            Action::Next => "next",
            Action::Previous => "previous",
            Action::VolumeUp => "volume_up",
            Action::VolumeDown => "volume_down",
            Action::Restart => "restart",
            Action::MarkSeen => "mark_seen",
            Action::ToggleMute => "toggle_mute",
            Action::ShowGuide => "show_guide",
            Action::Shutdown => "shutdown",
            Action::Up => "up",
            Action::Down => "down",
            Action::Select => "select",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Action {
    type Err = crate::Error;

    /// Parse a symbolic action name or a single-key shortcut.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        // A lone space is the pause key, so only strip line endings first.
        let raw = input.trim_end_matches(['\r', '\n']);
        if raw == " " {
            return Ok(Action::TogglePause);
        }

        let key = raw.trim().to_lowercase();
        if let Some(action) = Action::ALL.iter().find(|a| a.as_str() == key) {
            return Ok(*action);
        }

        let action = match key.as_str() {
            "" | "enter" => Action::Select,
            "space" => Action::TogglePause,
            "n" | "right" => Action::Next,
            "p" | "left" => Action::Previous,
            "+" | "=" => Action::VolumeUp,
            "-" => Action::VolumeDown,
            "r" | "backspace" => Action::Restart,
            "s" => Action::MarkSeen,
            "m" => Action::ToggleMute,
            "g" | "i" => Action::ShowGuide,
            "q" | "esc" | "\u{1b}" => Action::Shutdown,
            "k" => Action::Up,
            "j" => Action::Down,
            _ => return Err(crate::Error::UnknownAction(key)),
        };
        Ok(action)
    }
}
