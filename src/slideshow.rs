//! Crossfade slideshow scheduler.
//!
//! One engine serves both call sites of the portfolio page:
//!
//! - [`Policy::Autoplay`] (project cards) advances on a repeating timer. Each
//!   tick starts a fade toward the next frame and a one-shot timer commits it.
//! - [`Policy::Interaction`] (hero portrait) never arms timers. Pointer-enter
//!   previews the next frame, pointer-leave reverts, activation commits.
//!
//! State lives behind `Rc<RefCell<_>>`. Timer callbacks only hold weak
//! references plus the generation they were armed in, and bail out once the
//! slideshow is stopped, restarted, or dropped. Every change is published as a
//! [`Snapshot`] on a watch channel after the mutation completes, so observers
//! never see a half-applied transition.

mod projection;
mod state;

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::clock::{ManualClock, Timer, TimerHandle};
use crate::events::Interaction;
use crate::images::ImageSet;

pub use projection::{INTERACTION_FADE, Layers, Transition, indicators, project};
pub use state::SlideshowState;

/// Interval and fade length for the autoplay policy.
///
/// The fade always ends strictly before the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoplayTiming {
    interval: Duration,
    fade: Duration,
}

impl AutoplayTiming {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(3500);
    pub const DEFAULT_FADE: Duration = Duration::from_millis(650);
    const MIN_INTERVAL: Duration = Duration::from_millis(1);

    /// Build a timing profile, clamping values that would overlap fades.
    pub fn new(interval: Duration, fade: Duration) -> Self {
        let interval = interval.max(Self::MIN_INTERVAL);
        let fade = if fade >= interval {
            let clamped = interval - Self::MIN_INTERVAL;
            warn!(
                interval_ms = interval.as_millis() as u64,
                fade_ms = fade.as_millis() as u64,
                clamped_ms = clamped.as_millis() as u64,
                "fade must be shorter than interval; clamping"
            );
            clamped
        } else {
            fade
        };
        Self { interval, fade }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub fn fade(&self) -> Duration {
        self.fade
    }
}

impl Default for AutoplayTiming {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            fade: Self::DEFAULT_FADE,
        }
    }
}

/// What drives transitions for a slideshow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Autoplay(AutoplayTiming),
    Interaction,
}

/// Everything an observer needs to paint one slideshow.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub images: ImageSet,
    pub policy: Policy,
    pub state: SlideshowState,
}

impl Snapshot {
    #[must_use]
    pub fn layers(&self) -> Option<Layers> {
        project(&self.policy, &self.state, &self.images)
    }
}

struct Core {
    label: String,
    images: ImageSet,
    policy: Policy,
    state: SlideshowState,
    timer: Rc<dyn Timer>,
    // Bumped on every stop; callbacks armed under an older value are stale.
    generation: u64,
    started: bool,
    ticker: Option<TimerHandle>,
    fade: Option<TimerHandle>,
    publish: watch::Sender<Snapshot>,
}

impl Core {
    fn accepts(&self, generation: u64) -> bool {
        self.started && self.generation == generation
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            images: self.images.clone(),
            policy: self.policy,
            state: self.state,
        }
    }

    fn publish(&self) {
        self.publish.send_replace(self.snapshot());
    }

    fn halt(&mut self) {
        self.started = false;
        self.generation = self.generation.wrapping_add(1);
        self.ticker = None;
        self.fade = None;
        if self.state.abandon_fade() {
            debug!(slideshow = %self.label, "abandoned in-flight fade");
            self.publish();
        }
    }
}

/// A live slideshow instance.
///
/// Pair every [`Slideshow::create`] with [`Slideshow::dispose`] (or a drop);
/// that is the only path that guarantees all timers are cancelled.
pub struct Slideshow {
    core: Rc<RefCell<Core>>,
}

impl Slideshow {
    pub fn create(images: ImageSet, policy: Policy, timer: Rc<dyn Timer>) -> Self {
        let state = SlideshowState::initial(images.len());
        let snapshot = Snapshot {
            images: images.clone(),
            policy,
            state,
        };
        let (publish, _) = watch::channel(snapshot);
        Self {
            core: Rc::new(RefCell::new(Core {
                label: String::from("slideshow"),
                images,
                policy,
                state,
                timer,
                generation: 0,
                started: false,
                ticker: None,
                fade: None,
                publish,
            })),
        }
    }

    /// Interaction-policy slideshow. It never arms timers, so no clock is needed.
    pub fn interactive(images: ImageSet) -> Self {
        Self::create(images, Policy::Interaction, Rc::new(ManualClock::new()))
    }

    /// Name used in log fields.
    #[must_use]
    pub fn with_label(self, label: impl Into<String>) -> Self {
        self.core.borrow_mut().label = label.into();
        self
    }

    /// Arm the autoplay ticker. No-op for static sets, the interaction
    /// policy, or a slideshow that is already running.
    pub fn start(&mut self) {
        let mut core = self.core.borrow_mut();
        core.started = true;
        let Policy::Autoplay(timing) = core.policy else {
            return;
        };
        if core.ticker.is_some() {
            return;
        }
        if core.images.is_static() {
            trace!(slideshow = %core.label, images = core.images.len(), "static set; no timers");
            return;
        }
        let weak = Rc::downgrade(&self.core);
        let generation = core.generation;
        let ticker = core
            .timer
            .every(timing.interval(), Box::new(move || on_tick(&weak, generation)));
        core.ticker = Some(ticker);
        debug!(
            slideshow = %core.label,
            images = core.images.len(),
            interval_ms = timing.interval().as_millis() as u64,
            fade_ms = timing.fade().as_millis() as u64,
            "autoplay started"
        );
    }

    /// Cancel the ticker and any pending fade completion. Idempotent.
    pub fn stop(&mut self) {
        let mut core = self.core.borrow_mut();
        if core.started {
            debug!(slideshow = %core.label, "slideshow stopped");
        }
        core.halt();
    }

    /// Tear the instance down for good.
    pub fn dispose(mut self) {
        self.stop();
    }

    /// Swap in a new image set. A set with a new identity resets the
    /// slideshow to its first frame and restarts it if it was running.
    pub fn replace_images(&mut self, images: ImageSet) {
        let restart = {
            let mut core = self.core.borrow_mut();
            if core.images.same_identity(&images) {
                return;
            }
            let restart = core.started;
            core.halt();
            core.state = SlideshowState::initial(images.len());
            core.images = images;
            debug!(slideshow = %core.label, images = core.images.len(), "image set replaced");
            core.publish();
            restart
        };
        if restart {
            self.start();
        }
    }

    /// Show the next frame without committing to it.
    pub fn preview_next(&mut self) -> bool {
        self.interact("preview", |state, len| state.preview_next(len))
    }

    /// Revert an uncommitted preview.
    pub fn cancel_preview(&mut self) -> bool {
        self.interact("cancel-preview", |state, _| state.cancel_preview())
    }

    /// Advance permanently to the next frame.
    pub fn commit(&mut self) -> bool {
        self.interact("commit", SlideshowState::commit)
    }

    /// Route a pointer or activation event. Returns whether state changed.
    pub fn handle(&mut self, interaction: Interaction) -> bool {
        match interaction {
            Interaction::PointerEnter => self.preview_next(),
            Interaction::PointerLeave => self.cancel_preview(),
            Interaction::Activate => self.commit(),
        }
    }

    fn interact(
        &mut self,
        what: &'static str,
        apply: impl FnOnce(&mut SlideshowState, usize) -> bool,
    ) -> bool {
        let mut core = self.core.borrow_mut();
        if core.policy != Policy::Interaction {
            trace!(slideshow = %core.label, what, "autoplay slideshow ignores interactions");
            return false;
        }
        let len = core.images.len();
        if !apply(&mut core.state, len) {
            return false;
        }
        debug!(
            slideshow = %core.label,
            what,
            current = core.state.current_index,
            shown = core.state.shown_index(),
            "interaction applied"
        );
        core.publish();
        true
    }

    #[must_use]
    pub fn state(&self) -> SlideshowState {
        self.core.borrow().state
    }

    #[must_use]
    pub fn images(&self) -> ImageSet {
        self.core.borrow().images.clone()
    }

    /// Whether the autoplay ticker is armed.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.core.borrow().ticker.is_some()
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.core.borrow().snapshot()
    }

    #[must_use]
    pub fn layers(&self) -> Option<Layers> {
        self.snapshot().layers()
    }

    /// Receive a snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.core.borrow().publish.subscribe()
    }
}

impl Drop for Slideshow {
    fn drop(&mut self) {
        if let Ok(mut core) = self.core.try_borrow_mut() {
            core.halt();
        }
    }
}

fn on_tick(core: &Weak<RefCell<Core>>, generation: u64) {
    let Some(shared) = core.upgrade() else {
        return;
    };
    let mut guard = shared.borrow_mut();
    if !guard.accepts(generation) {
        return;
    }
    let Policy::Autoplay(timing) = guard.policy else {
        return;
    };
    let len = guard.images.len();
    if !guard.state.begin_fade(len) {
        debug!(slideshow = %guard.label, "tick skipped; fade still in flight");
        return;
    }
    let weak = core.clone();
    let fade = guard.timer.after(
        timing.fade(),
        Box::new(move || on_fade_complete(&weak, generation)),
    );
    guard.fade = Some(fade);
    trace!(
        slideshow = %guard.label,
        current = guard.state.current_index,
        next = guard.state.next_index,
        "fade started"
    );
    guard.publish();
}

fn on_fade_complete(core: &Weak<RefCell<Core>>, generation: u64) {
    let Some(shared) = core.upgrade() else {
        return;
    };
    let mut guard = shared.borrow_mut();
    if !guard.accepts(generation) || !guard.state.finish_fade() {
        return;
    }
    guard.fade = None;
    trace!(
        slideshow = %guard.label,
        current = guard.state.current_index,
        "fade committed"
    );
    guard.publish();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn autoplay(names: &[&str], clock: &ManualClock) -> Slideshow {
        Slideshow::create(
            names.iter().copied().collect(),
            Policy::Autoplay(AutoplayTiming::new(ms(100), ms(30))),
            Rc::new(clock.clone()),
        )
    }

    #[test]
    fn timing_clamps_overlapping_fade() {
        let t = AutoplayTiming::new(ms(500), ms(900));
        assert_eq!(t.fade(), ms(499));
        let t = AutoplayTiming::new(Duration::ZERO, Duration::ZERO);
        assert_eq!(t.interval(), ms(1));
        assert_eq!(t.fade(), Duration::ZERO);
    }

    #[test]
    fn start_is_idempotent() {
        let clock = ManualClock::new();
        let mut show = autoplay(&["a", "b"], &clock);
        show.start();
        show.start();
        assert_eq!(clock.timers_created(), 1);
        assert!(show.is_running());
    }

    #[test]
    fn stop_mid_fade_abandons_it() {
        let clock = ManualClock::new();
        let mut show = autoplay(&["a", "b", "c"], &clock);
        show.start();
        clock.advance(ms(110));
        assert!(show.state().is_fading);
        show.stop();
        assert_eq!(show.state().current_index, 0);
        assert!(!show.state().is_fading);
        clock.advance(ms(1000));
        assert_eq!(show.state().current_index, 0);
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn dropping_cancels_timers() {
        let clock = ManualClock::new();
        let mut show = autoplay(&["a", "b"], &clock);
        show.start();
        assert_eq!(clock.pending(), 1);
        drop(show);
        assert_eq!(clock.pending(), 0);
        clock.advance(ms(1000));
    }

    #[test]
    fn autoplay_ignores_interactions() {
        let clock = ManualClock::new();
        let mut show = autoplay(&["a", "b"], &clock);
        assert!(!show.handle(Interaction::Activate));
        assert_eq!(show.state(), SlideshowState::initial(2));
    }

    #[test]
    fn subscribers_see_each_transition() {
        let clock = ManualClock::new();
        let mut show = autoplay(&["a", "b"], &clock);
        let mut rx = show.subscribe();
        show.start();
        clock.advance(ms(100));
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().state.is_fading);
        clock.advance(ms(30));
        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.state.current_index, 1);
        assert_eq!(snap.layers().unwrap().overlay_opacity, 0.0);
    }
}
