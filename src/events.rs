use std::str::FromStr;

use anyhow::{Result, bail};

/// Pointer and keyboard input delivered to an interaction-policy slideshow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    /// Pointer entered the portrait: preview the next frame.
    PointerEnter,
    /// Pointer left: revert the preview.
    PointerLeave,
    /// Click, Enter or Space: commit the advance.
    Activate,
}

impl FromStr for Interaction {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        Ok(match raw.trim().to_ascii_lowercase().as_str() {
            "enter" | "hover" | "pointer-enter" => Self::PointerEnter,
            "leave" | "pointer-leave" => Self::PointerLeave,
            "click" | "enter-key" | "space" | "activate" => Self::Activate,
            other => bail!("unknown interaction {other:?}"),
        })
    }
}

/// Commands the host loop accepts from its input task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    Hero(Interaction),
    Shutdown,
}
