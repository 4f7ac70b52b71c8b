use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::runtime::Handle;
use tokio::select;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::PreloadSettings;
use crate::error::PreloadError;
use crate::images::ImageRef;
use crate::preload::{PreloadCache, PreloadStatus, Preloader};

/// Live preloader: fetches remote images over HTTP, reads local ones from
/// disk, and decodes the bytes off-thread to prove they are images.
///
/// - At most `max-concurrent` loads run at once.
/// - Each load is bounded by `timeout`.
/// - Outcomes are recorded in the shared [`PreloadCache`]; failures are
///   logged and never retried.
#[derive(Clone)]
pub struct FetchPreloader {
    client: reqwest::Client,
    cache: Arc<PreloadCache>,
    permits: Arc<Semaphore>,
    timeout: Duration,
    cancel: CancellationToken,
}

impl FetchPreloader {
    pub fn new(
        settings: &PreloadSettings,
        cache: Arc<PreloadCache>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client for preloading")?;
        Ok(Self {
            client,
            cache,
            permits: Arc::new(Semaphore::new(settings.max_concurrent.max(1))),
            timeout: settings.timeout,
            cancel,
        })
    }

    async fn load(&self, image: &ImageRef) -> Result<PreloadStatus, PreloadError> {
        let _permit = select! {
            biased;
            _ = self.cancel.cancelled() => return Err(PreloadError::Cancelled),
            permit = self.permits.clone().acquire_owned() => {
                permit.map_err(|_| PreloadError::Cancelled)?
            }
        };
        let work = async {
            let bytes = fetch_bytes(&self.client, image).await?;
            decode_dimensions(bytes).await
        };
        select! {
            biased;
            _ = self.cancel.cancelled() => Err(PreloadError::Cancelled),
            res = tokio::time::timeout(self.timeout, work) => {
                res.map_err(|_| PreloadError::TimedOut(self.timeout))?
            }
        }
    }
}

impl Preloader for FetchPreloader {
    fn preload(&self, image: &ImageRef) {
        if !self.cache.mark_pending(image) {
            return;
        }
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                let err = PreloadError::NoRuntime;
                warn!(%image, error = %err, "preload skipped");
                self.cache.record(image.clone(), PreloadStatus::Failed(err.to_string()));
                return;
            }
        };
        let this = self.clone();
        let image = image.clone();
        runtime.spawn(async move {
            let status = match this.load(&image).await {
                Ok(status) => {
                    debug!(%image, ?status, "preloaded");
                    status
                }
                Err(PreloadError::Cancelled) => {
                    debug!(%image, "preload cancelled");
                    PreloadStatus::Failed(PreloadError::Cancelled.to_string())
                }
                Err(err) => {
                    warn!(%image, error = %err, "preload failed; first reveal may flash");
                    PreloadStatus::Failed(err.to_string())
                }
            };
            this.cache.record(image, status);
        });
    }
}

async fn fetch_bytes(client: &reqwest::Client, image: &ImageRef) -> Result<Vec<u8>, PreloadError> {
    if !image.is_remote() {
        return Ok(tokio::fs::read(image.as_str()).await?);
    }
    let response = client.get(image.as_str()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(PreloadError::Status(status.as_u16()));
    }
    Ok(response.bytes().await?.to_vec())
}

async fn decode_dimensions(bytes: Vec<u8>) -> Result<PreloadStatus, PreloadError> {
    let len = bytes.len();
    let img = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes)).await??;
    Ok(PreloadStatus::Ready {
        bytes: len,
        width: img.width(),
        height: img.height(),
    })
}
