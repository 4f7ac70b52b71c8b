//! The slideshows of one portfolio page, built from [`Configuration`].

use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info};

use crate::clock::{ManualClock, Timer};
use crate::config::Configuration;
use crate::events::Interaction;
use crate::images::{ImageRef, ImageSet};
use crate::preload::{PreloadCoordinator, Preloader};
use crate::slideshow::{Layers, Policy, Slideshow, SlideshowState};

/// One mounted slideshow plus the preload coordinator for its image set.
pub struct PageSlideshow {
    pub label: String,
    pub slideshow: Slideshow,
    pub fallback: Option<ImageRef>,
    preload: Option<PreloadCoordinator>,
}

impl PageSlideshow {
    fn new(
        label: &str,
        slideshow: Slideshow,
        fallback: Option<ImageRef>,
        preloader: Option<&Rc<dyn Preloader>>,
    ) -> Self {
        Self {
            label: label.to_owned(),
            slideshow: slideshow.with_label(label),
            fallback,
            preload: preloader.map(|p| PreloadCoordinator::new(Rc::clone(p))),
        }
    }

    /// Warm the current images and start ticking.
    pub fn mount(&mut self) {
        if let Some(preload) = self.preload.as_mut() {
            preload.observe(&self.slideshow.images());
        }
        self.slideshow.start();
    }

    pub fn unmount(&mut self) {
        self.slideshow.stop();
    }

    /// Swap the image set (e.g. a different project is shown in this card).
    pub fn replace_images(&mut self, images: ImageSet) {
        if let Some(preload) = self.preload.as_mut() {
            preload.observe(&images);
        }
        self.slideshow.replace_images(images);
    }
}

/// Hero portrait plus every project card.
pub struct Page {
    pub hero: Option<PageSlideshow>,
    pub projects: Vec<PageSlideshow>,
}

impl Page {
    pub fn build(
        cfg: &Configuration,
        timer: Rc<dyn Timer>,
        preloader: Option<Rc<dyn Preloader>>,
    ) -> Self {
        let hero = cfg.hero.as_ref().map(|hero| {
            PageSlideshow::new(
                "hero",
                Slideshow::create(hero.image_set(), Policy::Interaction, Rc::clone(&timer)),
                hero.fallback.clone(),
                preloader.as_ref(),
            )
        });
        let projects = cfg
            .projects
            .iter()
            .map(|project| {
                PageSlideshow::new(
                    project.label(),
                    Slideshow::create(
                        project.image_set(),
                        Policy::Autoplay(project.timing()),
                        Rc::clone(&timer),
                    ),
                    None,
                    preloader.as_ref(),
                )
            })
            .collect();
        Self { hero, projects }
    }

    pub fn entries(&self) -> impl Iterator<Item = &PageSlideshow> {
        self.hero.iter().chain(self.projects.iter())
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut PageSlideshow> {
        self.hero.iter_mut().chain(self.projects.iter_mut())
    }

    pub fn mount(&mut self) {
        for entry in self.entries_mut() {
            entry.mount();
        }
        info!(
            hero = self.hero.is_some(),
            projects = self.projects.len(),
            "page mounted"
        );
    }

    pub fn unmount(&mut self) {
        for entry in self.entries_mut() {
            entry.unmount();
        }
        debug!("page unmounted");
    }

    /// Deliver an interaction to the hero portrait.
    pub fn handle_hero(&mut self, interaction: Interaction) -> bool {
        match self.hero.as_mut() {
            Some(hero) => hero.slideshow.handle(interaction),
            None => {
                debug!(?interaction, "no hero configured; ignoring");
                false
            }
        }
    }
}

/// One observed transition in a simulated timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub at: Duration,
    pub slideshow: String,
    pub state: SlideshowState,
    pub layers: Option<Layers>,
}

/// Replay every project card on a manual clock up to `horizon` and collect
/// each published transition in time order. Nothing is preloaded.
pub fn simulate(cfg: &Configuration, horizon: Duration) -> Vec<TimelineEntry> {
    let clock = ManualClock::new();
    let mut page = Page::build(cfg, Rc::new(clock.clone()), None);
    let mut watchers: Vec<_> = page
        .projects
        .iter()
        .map(|entry| (entry.label.clone(), entry.slideshow.subscribe()))
        .collect();
    page.mount();

    let mut timeline = Vec::new();
    while let Some(due) = clock.next_deadline().filter(|due| *due <= horizon) {
        clock.advance_to(due);
        for (label, rx) in &mut watchers {
            if !rx.has_changed().unwrap_or(false) {
                continue;
            }
            let snapshot = rx.borrow_and_update().clone();
            timeline.push(TimelineEntry {
                at: due,
                slideshow: label.clone(),
                state: snapshot.state,
                layers: snapshot.layers(),
            });
        }
    }
    page.unmount();
    timeline
}
