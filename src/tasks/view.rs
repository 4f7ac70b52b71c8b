use std::sync::Arc;

use anyhow::Result;
use tokio::select;
use tokio::sync::watch::Receiver;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::images::ImageRef;
use crate::preload::PreloadCache;
use crate::slideshow::{Layers, Snapshot, indicators};

/// Headless stand-in for the page view: paints each published snapshot by
/// logging the layers a browser would stack.
pub struct View {
    pub label: String,
    pub cache: Option<Arc<PreloadCache>>,
    pub fallback: Option<ImageRef>,
}

impl View {
    /// Layers to paint for `snapshot`, with failed images swapped for the
    /// fallback when both a cache and a fallback are configured.
    #[must_use]
    pub fn frame(&self, snapshot: &Snapshot) -> Option<Layers> {
        let layers = snapshot.layers()?;
        Some(match (self.cache.as_ref(), self.fallback.as_ref()) {
            (Some(cache), Some(fallback)) => {
                layers.with_fallback(|img| cache.has_failed(img), fallback)
            }
            _ => layers,
        })
    }

    fn paint(&self, snapshot: &Snapshot) {
        let Some(layers) = self.frame(snapshot) else {
            info!(slideshow = %self.label, "no preview image");
            return;
        };
        let shown = if layers.overlay_visible() {
            &layers.overlay
        } else {
            &layers.base
        };
        let warm = self.cache.as_ref().map(|cache| cache.is_ready(shown));
        let dots: String = indicators(&snapshot.state, snapshot.images.len())
            .into_iter()
            .map(|current| if current { '●' } else { '○' })
            .collect();
        info!(
            slideshow = %self.label,
            base = %layers.base,
            overlay = %layers.overlay,
            opacity = layers.overlay_opacity,
            transition_ms = layers.transition.duration().as_millis() as u64,
            ?warm,
            %dots,
            "paint"
        );
    }
}

/// Paint the current snapshot, then again after every change until cancelled
/// or the slideshow goes away.
pub async fn run(view: View, mut snapshots: Receiver<Snapshot>, cancel: CancellationToken) -> Result<()> {
    view.paint(&snapshots.borrow_and_update());
    loop {
        select! {
            _ = cancel.cancelled() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                view.paint(&snapshot);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::ImageSet;
    use crate::preload::PreloadStatus;
    use crate::slideshow::Slideshow;

    fn portrait_view(cache: Arc<PreloadCache>) -> View {
        View {
            label: "hero".into(),
            cache: Some(cache),
            fallback: Some(ImageRef::from("fallback.jpg")),
        }
    }

    #[test]
    fn failed_images_paint_as_fallback() {
        let cache = Arc::new(PreloadCache::new());
        cache.record(ImageRef::from("p.jpg"), PreloadStatus::Failed("404".into()));
        cache.record(
            ImageRef::from("q.jpg"),
            PreloadStatus::Ready { bytes: 10, width: 1, height: 1 },
        );
        let view = portrait_view(cache);
        let mut hero = Slideshow::interactive(["p.jpg", "q.jpg"].into_iter().collect());

        let layers = view.frame(&hero.snapshot()).expect("layers");
        assert_eq!(layers.base.as_str(), "fallback.jpg");

        hero.preview_next();
        let layers = view.frame(&hero.snapshot()).expect("layers");
        assert_eq!(layers.base.as_str(), "fallback.jpg");
        assert_eq!(layers.overlay.as_str(), "q.jpg");
    }

    #[test]
    fn without_fallback_failed_images_are_painted_as_is() {
        let cache = Arc::new(PreloadCache::new());
        cache.record(ImageRef::from("p.jpg"), PreloadStatus::Failed("404".into()));
        let view = View {
            fallback: None,
            ..portrait_view(cache)
        };
        let hero = Slideshow::interactive(["p.jpg", "q.jpg"].into_iter().collect());
        assert_eq!(view.frame(&hero.snapshot()).expect("layers").base.as_str(), "p.jpg");
        assert!(view.frame(&Slideshow::interactive(ImageSet::empty()).snapshot()).is_none());
    }

    #[tokio::test]
    async fn run_ends_when_the_slideshow_goes_away() {
        let view = portrait_view(Arc::new(PreloadCache::new()));
        let hero = Slideshow::interactive(["p.jpg", "q.jpg"].into_iter().collect());
        let snapshots = hero.subscribe();
        hero.dispose();
        run(view, snapshots, CancellationToken::new()).await.unwrap();
    }

    #[tokio::test]
    async fn run_ends_on_cancel() {
        let view = portrait_view(Arc::new(PreloadCache::new()));
        let hero = Slideshow::interactive(["p.jpg", "q.jpg"].into_iter().collect());
        let cancel = CancellationToken::new();
        cancel.cancel();
        run(view, hero.subscribe(), cancel).await.unwrap();
    }
}
