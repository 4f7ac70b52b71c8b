/// Index bookkeeping shared by both slideshow policies.
///
/// Transition methods are pure and report whether anything changed, so the
/// scheduler only publishes real transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlideshowState {
    /// Frame fully opaque underneath.
    pub current_index: usize,
    /// Frame faded in on top while `is_fading`; the precomputed successor otherwise.
    pub next_index: usize,
    /// True only inside an autoplay fade window.
    pub is_fading: bool,
    /// Uncommitted hover preview (interaction policy only).
    pub shown_override: Option<usize>,
}

/// Index following `index` in a set of `len` frames, wrapping at the end.
fn successor(index: usize, len: usize) -> usize {
    if len == 0 { 0 } else { (index + 1) % len }
}

impl SlideshowState {
    pub fn initial(len: usize) -> Self {
        Self {
            current_index: 0,
            next_index: if len > 1 { 1 } else { 0 },
            is_fading: false,
            shown_override: None,
        }
    }

    /// Frame the viewer should end up seeing once animations settle.
    #[must_use]
    pub fn shown_index(&self) -> usize {
        self.shown_override.unwrap_or(self.current_index)
    }

    pub(crate) fn begin_fade(&mut self, len: usize) -> bool {
        if len <= 1 || self.is_fading {
            return false;
        }
        self.next_index = successor(self.current_index, len);
        self.is_fading = true;
        true
    }

    pub(crate) fn finish_fade(&mut self) -> bool {
        if !self.is_fading {
            return false;
        }
        self.current_index = self.next_index;
        self.is_fading = false;
        true
    }

    /// Drop an in-flight fade without committing it.
    pub(crate) fn abandon_fade(&mut self) -> bool {
        if !self.is_fading {
            return false;
        }
        self.next_index = self.current_index;
        self.is_fading = false;
        true
    }

    pub(crate) fn preview_next(&mut self, len: usize) -> bool {
        if len <= 1 {
            return false;
        }
        let target = successor(self.current_index, len);
        if self.shown_override == Some(target) {
            return false;
        }
        self.shown_override = Some(target);
        true
    }

    pub(crate) fn cancel_preview(&mut self) -> bool {
        self.shown_override.take().is_some()
    }

    pub(crate) fn commit(&mut self, len: usize) -> bool {
        if len <= 1 {
            return false;
        }
        self.current_index = successor(self.current_index, len);
        self.next_index = successor(self.current_index, len);
        self.shown_override = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successor_wraps() {
        assert_eq!(successor(0, 3), 1);
        assert_eq!(successor(2, 3), 0);
        assert_eq!(successor(0, 1), 0);
        assert_eq!(successor(0, 0), 0);
    }

    #[test]
    fn initial_next_index_is_clamped() {
        assert_eq!(SlideshowState::initial(0).next_index, 0);
        assert_eq!(SlideshowState::initial(1).next_index, 0);
        assert_eq!(SlideshowState::initial(4).next_index, 1);
    }

    #[test]
    fn fade_cycle_commits_next() {
        let mut s = SlideshowState::initial(3);
        s.current_index = 2;
        assert!(s.begin_fade(3));
        assert_eq!((s.next_index, s.is_fading), (0, true));
        assert!(!s.begin_fade(3), "second fade must wait for the first");
        assert!(s.finish_fade());
        assert_eq!((s.current_index, s.next_index, s.is_fading), (0, 0, false));
        assert!(!s.finish_fade());
    }

    #[test]
    fn abandoned_fade_keeps_current() {
        let mut s = SlideshowState::initial(2);
        s.begin_fade(2);
        assert!(s.abandon_fade());
        assert_eq!((s.current_index, s.next_index, s.is_fading), (0, 0, false));
    }

    #[test]
    fn singleton_never_transitions() {
        let mut s = SlideshowState::initial(1);
        assert!(!s.begin_fade(1));
        assert!(!s.preview_next(1));
        assert!(!s.commit(1));
        assert_eq!(s, SlideshowState::initial(1));
    }

    #[test]
    fn repeated_preview_reports_no_change() {
        let mut s = SlideshowState::initial(3);
        assert!(s.preview_next(3));
        assert!(!s.preview_next(3));
        assert!(s.cancel_preview());
        assert!(!s.cancel_preview());
    }
}
