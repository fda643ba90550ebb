use serde::{Deserialize, Serialize};

/// What happens when the queue runs out or a track ends.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop at the end of the queue.
    #[default]
    #[serde(alias = "no-loop", alias = "no_loop", alias = "off")]
    None,
    /// Restart the current track when it ends.
    #[serde(alias = "repeat-one", alias = "loop-one", alias = "loop_one", alias = "track")]
    One,
    /// Wrap around to the start of the queue.
    #[serde(
        alias = "loop-all",
        alias = "loop_all",
        alias = "loop-around",
        alias = "playlist"
    )]
    All,
}

impl RepeatMode {
    /// `None -> All -> One -> None`.
    pub fn cycle(self) -> Self {
        match self {
            Self::None => Self::All,
            Self::All => Self::One,
            Self::One => Self::None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::None => "No repeat",
            Self::One => "Repeat one",
            Self::All => "Repeat all",
        }
    }
}
