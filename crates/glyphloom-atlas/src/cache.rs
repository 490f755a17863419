// Atlas registry: at most one atlas per font descriptor, kept for the registry's lifetime.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{AtlasConfig, FontAtlas, FontDescriptor, FontLoader, Result};

pub type SharedAtlas = Arc<Mutex<FontAtlas>>;

pub struct AtlasCache {
    loader: Box<dyn FontLoader + Send + Sync>,
    config: AtlasConfig,
    atlases: Mutex<HashMap<FontDescriptor, SharedAtlas>>,
    next_id: AtomicU64,
}

impl AtlasCache {
    pub fn new(loader: impl FontLoader + Send + Sync + 'static, config: AtlasConfig) -> Self {
        Self {
            loader: Box::new(loader),
            config: config.normalized(),
            atlases: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Return the atlas for `descriptor`, loading the font and pre-seeding a new
    /// atlas on first use. Load failures propagate; nothing is cached for them.
    ///
    /// The registry lock is held across the load and pre-seed, so concurrent
    /// first requests for one descriptor load it once. Lookups of cached
    /// descriptors wait for any load in progress.
    pub fn get_or_create(&self, descriptor: &FontDescriptor) -> Result<SharedAtlas> {
        let mut atlases = self.atlases.lock();
        if let Some(atlas) = atlases.get(descriptor) {
            return Ok(Arc::clone(atlas));
        }

        let rasterizer = self.loader.load(descriptor, self.config.device_scale)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let atlas = Arc::new(Mutex::new(FontAtlas::new(
            id,
            descriptor.clone(),
            rasterizer,
            &self.config,
        )?));
        atlases.insert(descriptor.clone(), Arc::clone(&atlas));
        Ok(atlas)
    }

    pub fn get(&self, descriptor: &FontDescriptor) -> Option<SharedAtlas> {
        self.atlases.lock().get(descriptor).cloned()
    }

    pub fn descriptors(&self) -> Vec<FontDescriptor> {
        self.atlases.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.atlases.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.atlases.lock().is_empty()
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    pub fn device_scale(&self) -> f32 {
        self.config.device_scale
    }
}
