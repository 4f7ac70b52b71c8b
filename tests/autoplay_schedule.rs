use std::rc::Rc;
use std::time::Duration;

use portfolio_slideshow::clock::ManualClock;
use portfolio_slideshow::images::ImageSet;
use portfolio_slideshow::slideshow::{AutoplayTiming, Policy, Slideshow, SlideshowState};

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn card(names: &[&str], clock: &ManualClock, interval: u64, fade: u64) -> Slideshow {
    Slideshow::create(
        names.iter().copied().collect(),
        Policy::Autoplay(AutoplayTiming::new(ms(interval), ms(fade))),
        Rc::new(clock.clone()),
    )
}

#[test]
fn three_frame_card_follows_reference_timeline() {
    let clock = ManualClock::new();
    let mut show = card(&["A", "B", "C"], &clock, 3500, 650);
    show.start();

    let s = show.state();
    assert_eq!((s.current_index, s.is_fading), (0, false));

    clock.advance_to(ms(3500));
    let s = show.state();
    assert_eq!((s.current_index, s.next_index, s.is_fading), (0, 1, true));
    let layers = show.layers().expect("layers");
    assert_eq!(layers.base.as_str(), "A");
    assert_eq!(layers.overlay.as_str(), "B");
    assert_eq!(layers.overlay_opacity, 1.0);

    clock.advance_to(ms(4149));
    assert!(show.state().is_fading, "fade must last the full fade duration");

    clock.advance_to(ms(4150));
    let s = show.state();
    assert_eq!((s.current_index, s.is_fading), (1, false));
    assert_eq!(show.layers().expect("layers").overlay_opacity, 0.0);

    clock.advance_to(ms(7000));
    let s = show.state();
    assert_eq!((s.current_index, s.next_index, s.is_fading), (1, 2, true));

    clock.advance_to(ms(7650));
    assert_eq!(show.state().current_index, 2);

    clock.advance_to(ms(10_500 + 650));
    assert_eq!(show.state().current_index, 0, "wraps back to the first frame");
}

#[test]
fn current_index_cycles_without_skips() {
    for n in 2..=5usize {
        let names: Vec<String> = (0..n).map(|i| format!("img-{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let clock = ManualClock::new();
        let mut show = card(&refs, &clock, 100, 40);
        show.start();

        let mut seen = vec![show.state().current_index];
        for tick in 1..=(3 * n as u64) {
            clock.advance_to(ms(tick * 100 + 40));
            seen.push(show.state().current_index);
        }
        let expected: Vec<usize> = (0..seen.len()).map(|i| i % n).collect();
        assert_eq!(seen, expected, "n = {n}");
    }
}

#[test]
fn exactly_one_fade_window_per_interval() {
    let clock = ManualClock::new();
    let mut show = card(&["a", "b", "c", "d"], &clock, 200, 70);
    let mut rx = show.subscribe();
    show.start();

    let mut flips = Vec::new();
    let mut last = show.state().is_fading;
    for step in 1..=2000u64 {
        clock.advance_to(ms(step));
        if rx.has_changed().unwrap() {
            let fading = rx.borrow_and_update().state.is_fading;
            assert_ne!(fading, last, "each publish must flip the fade flag");
            flips.push((step, fading));
            last = fading;
        }
    }
    // Ticks at 200, 400, ... 2000; the final fade is still in flight.
    assert_eq!(flips.len(), 19);
    for pair in flips.chunks(2) {
        let (start, on) = pair[0];
        assert!(on);
        assert_eq!(start % 200, 0);
        if let Some(&(end, off)) = pair.get(1) {
            assert!(!off);
            assert_eq!(end - start, 70);
        }
    }
}

#[test]
fn singleton_and_empty_sets_never_arm_timers() {
    for names in [&[][..], &["only"][..]] {
        let clock = ManualClock::new();
        let mut show = card(names, &clock, 100, 50);
        show.start();
        assert_eq!(clock.timers_created(), 0);
        assert!(!show.is_running());
        clock.advance(ms(10_000));
        assert!(!show.state().is_fading);
        assert_eq!(show.state(), SlideshowState::initial(names.len()));
    }
}

#[test]
fn singleton_projection_is_static() {
    let clock = ManualClock::new();
    let mut show = card(&["X"], &clock, 3500, 650);
    show.start();
    for _ in 0..3 {
        let layers = show.layers().expect("layers");
        assert_eq!(layers.base.as_str(), "X");
        assert_eq!(layers.overlay.as_str(), "X");
        assert_eq!(layers.overlay_opacity, 0.0);
        clock.advance(ms(5000));
    }
    assert!(show.layers().is_some());
    let empty = card(&[], &clock, 3500, 650);
    assert!(empty.layers().is_none());
}

#[test]
fn no_mutation_after_stop_even_when_timers_were_due() {
    let clock = ManualClock::new();
    let mut show = card(&["a", "b", "c"], &clock, 1000, 300);
    let mut rx = show.subscribe();
    show.start();
    clock.advance_to(ms(2100));
    let frozen = show.state();
    assert!(frozen.is_fading);

    show.stop();
    show.stop();
    let after_stop = show.state();
    let _ = rx.borrow_and_update();

    clock.advance(ms(60_000));
    assert_eq!(show.state(), after_stop);
    assert_eq!(after_stop.current_index, frozen.current_index);
    assert!(!rx.has_changed().unwrap(), "nothing may publish after stop");
    assert_eq!(clock.pending(), 0);
}

#[test]
fn dispose_cancels_pending_fade() {
    let clock = ManualClock::new();
    let mut show = card(&["a", "b"], &clock, 1000, 300);
    let rx = show.subscribe();
    show.start();
    clock.advance_to(ms(1000));
    show.dispose();
    clock.advance(ms(10_000));
    assert_eq!(clock.pending(), 0);
    assert!(rx.has_changed().is_err(), "sender is gone once disposed");
}

#[test]
fn restart_resumes_from_live_index() {
    let clock = ManualClock::new();
    let mut show = card(&["a", "b", "c"], &clock, 100, 30);
    show.start();
    clock.advance_to(ms(130));
    assert_eq!(show.state().current_index, 1);
    show.stop();
    clock.advance(ms(500));
    show.start();
    clock.advance(ms(130));
    assert_eq!(show.state().current_index, 2);
}

#[test]
fn replacing_the_set_resets_and_drops_stale_fade() {
    let clock = ManualClock::new();
    let mut show = card(&["a", "b", "c"], &clock, 100, 30);
    show.start();
    clock.advance_to(ms(230));
    assert_eq!(show.state().current_index, 2);
    clock.advance_to(ms(300));
    assert!(show.state().is_fading);

    let next: ImageSet = ["x", "y"].into_iter().collect();
    show.replace_images(next.clone());
    assert_eq!(show.state(), SlideshowState::initial(2));
    assert!(show.is_running());

    // The old fade was due at 330; it must not touch the new set.
    clock.advance_to(ms(399));
    assert_eq!(show.state(), SlideshowState::initial(2));

    clock.advance_to(ms(430));
    assert_eq!(show.state().current_index, 1);
    assert_eq!(show.layers().expect("layers").base.as_str(), "y");

    let before = clock.timers_created();
    show.replace_images(next);
    assert_eq!(clock.timers_created(), before, "same identity is a no-op");
}

#[test]
fn replacing_a_stopped_set_does_not_start_it() {
    let clock = ManualClock::new();
    let mut show = card(&["a"], &clock, 100, 30);
    show.replace_images(["x", "y"].into_iter().collect());
    assert!(!show.is_running());
    assert_eq!(clock.timers_created(), 0);
}

#[test]
fn starting_a_singleton_then_growing_it_begins_autoplay() {
    let clock = ManualClock::new();
    let mut show = card(&["a"], &clock, 100, 30);
    show.start();
    assert!(!show.is_running());
    show.replace_images(["x", "y"].into_iter().collect());
    assert!(show.is_running());
    clock.advance(ms(130));
    assert_eq!(show.state().current_index, 1);
}
