use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use tracing::warn;

use crate::images::{ImageRef, ImageSet};
use crate::slideshow::AutoplayTiming;

/// Top-level configuration describing the slideshows of a portfolio page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Background image warmup.
    pub preload: PreloadSettings,
    /// Hover/click portrait at the top of the page.
    pub hero: Option<HeroConfig>,
    /// Auto-advancing preview cards, one per showcased project.
    pub projects: Vec<ProjectConfig>,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml_str(&s)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(mut self) -> Result<Self> {
        self.preload.validate()?;
        let mut ids = HashSet::new();
        for project in &mut self.projects {
            project.validate()?;
            ensure!(
                ids.insert(project.id.clone()),
                "projects contains duplicate id {:?}",
                project.id
            );
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PreloadSettings {
    /// Disable to skip warming images entirely.
    pub enabled: bool,
    /// Maximum number of fetches/decodes in flight at once.
    pub max_concurrent: usize,
    /// Per-image deadline covering fetch and decode.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl PreloadSettings {
    const fn default_max_concurrent() -> usize {
        4
    }

    const fn default_timeout() -> Duration {
        Duration::from_secs(10)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.max_concurrent > 0,
            "preload.max-concurrent must be greater than zero"
        );
        ensure!(
            self.timeout > Duration::ZERO,
            "preload.timeout must be positive"
        );
        Ok(())
    }
}

impl Default for PreloadSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_concurrent: Self::default_max_concurrent(),
            timeout: Self::default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct HeroConfig {
    pub images: Vec<ImageRef>,
    /// Shown in place of any portrait that fails to load.
    #[serde(default)]
    pub fallback: Option<ImageRef>,
}

impl HeroConfig {
    pub fn image_set(&self) -> ImageSet {
        ImageSet::new(self.images.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ProjectConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    /// Time between advances.
    #[serde(default = "ProjectConfig::default_interval", with = "humantime_serde")]
    pub interval: Duration,
    /// Crossfade length; must end before the next advance.
    #[serde(default = "ProjectConfig::default_fade", with = "humantime_serde")]
    pub fade: Duration,
}

impl ProjectConfig {
    const fn default_interval() -> Duration {
        AutoplayTiming::DEFAULT_INTERVAL
    }

    const fn default_fade() -> Duration {
        AutoplayTiming::DEFAULT_FADE
    }

    pub fn image_set(&self) -> ImageSet {
        ImageSet::new(self.images.clone())
    }

    pub fn timing(&self) -> AutoplayTiming {
        AutoplayTiming::new(self.interval, self.fade)
    }

    /// Label for logs: the display name when set, else the id.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    fn validate(&mut self) -> Result<()> {
        ensure!(
            !self.id.trim().is_empty(),
            "projects entries must set a non-empty id"
        );
        ensure!(
            self.interval > Duration::ZERO,
            "projects.{}.interval must be positive",
            self.id
        );
        if self.fade >= self.interval {
            let clamped = self.interval - Duration::from_millis(1).min(self.interval);
            warn!(
                project = %self.id,
                interval = %humantime::format_duration(self.interval),
                fade = %humantime::format_duration(self.fade),
                "fade must end before the next advance; clamping"
            );
            self.fade = clamped;
        }
        Ok(())
    }
}
