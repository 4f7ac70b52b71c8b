//! Preload coordination.
//!
//! A slideshow must never crossfade into a frame the host has not fetched
//! yet. The [`PreloadCoordinator`] asks a [`Preloader`] to warm every image
//! of a set once per set identity; the preloader decides how. Results that
//! the host cares about (ready or failed) land in a shared [`PreloadCache`].

use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::images::{ImageRef, ImageSet};

/// Fire-and-forget image warmup. Implementations must not block.
pub trait Preloader {
    fn preload(&self, image: &ImageRef);
}

/// Issues preloads for each distinct image set it observes.
pub struct PreloadCoordinator {
    preloader: Rc<dyn Preloader>,
    observed: Option<ImageSet>,
    issued: usize,
}

impl PreloadCoordinator {
    pub fn new(preloader: Rc<dyn Preloader>) -> Self {
        Self {
            preloader,
            observed: None,
            issued: 0,
        }
    }

    /// Preload every image of `images` unless this exact set was the last one
    /// observed. Returns whether any preloads were issued.
    pub fn observe(&mut self, images: &ImageSet) -> bool {
        if self
            .observed
            .as_ref()
            .is_some_and(|seen| seen.same_identity(images))
        {
            return false;
        }
        let mut seen = HashSet::with_capacity(images.len());
        for image in images.iter().filter(|image| seen.insert(*image)) {
            self.preloader.preload(image);
            self.issued += 1;
        }
        debug!(images = images.len(), unique = seen.len(), "preloads issued");
        self.observed = Some(images.clone());
        !seen.is_empty()
    }

    /// Total preload calls made so far.
    #[must_use]
    pub fn issued(&self) -> usize {
        self.issued
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreloadStatus {
    Pending,
    Ready { bytes: usize, width: u32, height: u32 },
    Failed(String),
}

/// Thread-safe record of preload outcomes keyed by image.
#[derive(Debug, Default)]
pub struct PreloadCache {
    entries: Mutex<HashMap<ImageRef, PreloadStatus>>,
}

impl PreloadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `image` for loading. Returns false if it is already pending,
    /// ready, or failed; failed loads are not retried.
    pub fn mark_pending(&self, image: &ImageRef) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(image) {
            return false;
        }
        entries.insert(image.clone(), PreloadStatus::Pending);
        true
    }

    pub fn record(&self, image: ImageRef, status: PreloadStatus) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(image, status);
    }

    #[must_use]
    pub fn status(&self, image: &ImageRef) -> Option<PreloadStatus> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(image)
            .cloned()
    }

    #[must_use]
    pub fn is_ready(&self, image: &ImageRef) -> bool {
        matches!(self.status(image), Some(PreloadStatus::Ready { .. }))
    }

    #[must_use]
    pub fn has_failed(&self, image: &ImageRef) -> bool {
        matches!(self.status(image), Some(PreloadStatus::Failed(_)))
    }
}
