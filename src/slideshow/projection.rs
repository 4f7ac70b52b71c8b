use std::time::Duration;

use super::{Policy, SlideshowState};
use crate::images::{ImageRef, ImageSet};

/// Ease duration the host should use for interaction-driven crossfades.
pub const INTERACTION_FADE: Duration = Duration::from_millis(650);

/// How the host should animate toward the target overlay opacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Linear opacity transition whose completion the scheduler commits itself.
    Timed(Duration),
    /// Eased animation that may be retargeted before it finishes.
    Continuous(Duration),
}

impl Transition {
    #[must_use]
    pub fn duration(&self) -> Duration {
        match *self {
            Self::Timed(d) | Self::Continuous(d) => d,
        }
    }
}

/// Two stacked image layers for the host view to paint.
#[derive(Debug, Clone, PartialEq)]
pub struct Layers {
    pub base: ImageRef,
    pub overlay: ImageRef,
    /// Target opacity of `overlay`, either 0.0 or 1.0.
    pub overlay_opacity: f32,
    pub transition: Transition,
}

impl Layers {
    /// Swap any layer whose image failed to load for `fallback`.
    #[must_use]
    pub fn with_fallback(mut self, failed: impl Fn(&ImageRef) -> bool, fallback: &ImageRef) -> Self {
        if failed(&self.base) {
            self.base = fallback.clone();
        }
        if failed(&self.overlay) {
            self.overlay = fallback.clone();
        }
        self
    }

    #[must_use]
    pub fn overlay_visible(&self) -> bool {
        self.overlay_opacity > 0.0
    }
}

/// Map scheduler state to paintable layers. Returns `None` for an empty set.
pub fn project(policy: &Policy, state: &SlideshowState, images: &ImageSet) -> Option<Layers> {
    let base = images.get(state.current_index)?;
    let layers = match policy {
        Policy::Autoplay(timing) => Layers {
            base: base.clone(),
            overlay: images.get(state.next_index).unwrap_or(base).clone(),
            overlay_opacity: if state.is_fading { 1.0 } else { 0.0 },
            transition: Transition::Timed(timing.fade()),
        },
        Policy::Interaction => {
            let previewing = matches!(
                state.shown_override,
                Some(shown) if shown != state.current_index
            );
            Layers {
                base: base.clone(),
                overlay: images.get(state.shown_index()).unwrap_or(base).clone(),
                overlay_opacity: if previewing { 1.0 } else { 0.0 },
                transition: Transition::Continuous(INTERACTION_FADE),
            }
        }
    };
    Some(layers)
}

/// One marker per frame, `true` for the committed current frame.
pub fn indicators(state: &SlideshowState, len: usize) -> Vec<bool> {
    (0..len).map(|i| i == state.current_index).collect()
}
