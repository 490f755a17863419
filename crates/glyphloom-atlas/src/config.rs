// Atlas configuration: texture extents, pre-seeded range and device scale.
// Stored as JSON in the platform config dir, e.g. ~/.config/glyphloom/atlas.json
// on Linux, ~/Library/Application Support/glyphloom/atlas.json on macOS.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::Result;

pub const DEFAULT_TEXTURE_WIDTH: u32 = 2048;
pub const DEFAULT_MAX_TEXTURE_HEIGHT: u32 = 8192;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtlasConfig {
    /// Fixed atlas width in pixels. Atlases only ever grow in height.
    #[serde(default = "default_texture_width")]
    pub texture_width: u32,
    /// Growth past this height is an overflow error.
    #[serde(default = "default_max_texture_height")]
    pub max_texture_height: u32,
    /// First and last code point packed when an atlas is created.
    #[serde(default = "default_preseed_first")]
    pub preseed_first: char,
    #[serde(default = "default_preseed_last")]
    pub preseed_last: char,
    /// Pixel density of the rendering surface.
    #[serde(default = "default_device_scale")]
    pub device_scale: f32,
}

fn default_texture_width() -> u32 {
    DEFAULT_TEXTURE_WIDTH
}

fn default_max_texture_height() -> u32 {
    DEFAULT_MAX_TEXTURE_HEIGHT
}

fn default_preseed_first() -> char {
    ' '
}

fn default_preseed_last() -> char {
    '~'
}

fn default_device_scale() -> f32 {
    1.0
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            texture_width: default_texture_width(),
            max_texture_height: default_max_texture_height(),
            preseed_first: default_preseed_first(),
            preseed_last: default_preseed_last(),
            device_scale: default_device_scale(),
        }
    }
}

impl AtlasConfig {
    /// Same config with a different device scale.
    pub fn with_device_scale(mut self, scale: f32) -> Self {
        self.device_scale = scale;
        self.normalized()
    }

    /// Replace values that would make packing impossible.
    pub fn normalized(mut self) -> Self {
        if !self.device_scale.is_finite() || self.device_scale <= 0.0 {
            log::warn!("Invalid device scale {}, using 1.0", self.device_scale);
            self.device_scale = 1.0;
        }
        if self.texture_width == 0 {
            self.texture_width = DEFAULT_TEXTURE_WIDTH;
        }
        if self.max_texture_height == 0 {
            self.max_texture_height = DEFAULT_MAX_TEXTURE_HEIGHT;
        }
        self
    }

    /// Code points packed into every new atlas. Empty when the range is reversed.
    pub fn preseed(&self) -> impl Iterator<Item = char> {
        self.preseed_first..=self.preseed_last
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        Ok(config.normalized())
    }

    /// Load from the platform config dir, falling back to defaults.
    pub fn load_or_default() -> Self {
        let path = match config_path() {
            Some(p) => p,
            None => return Self::default(),
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

pub fn config_path() -> Option<PathBuf> {
    let config_dir = dirs::config_dir()?;
    Some(config_dir.join("glyphloom").join("atlas.json"))
}
