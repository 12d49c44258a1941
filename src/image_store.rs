//! Storage for decoded uploads, so that they can be re-quantized with different settings without
//! being uploaded again.

use std::{collections::VecDeque, sync::Arc};

use dashmap::DashMap;
use image::RgbImage;
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::debug;

use crate::common::generate_image_id;

const ID_LEN: usize = 16;

#[derive(Clone, Deserialize)]
pub struct ImageStoreConfig {
    /// How many decoded images are kept around. Once exceeded, the oldest uploads are dropped.
    pub max_images: usize,
}

pub struct ImageStore {
    config: ImageStoreConfig,
    images: DashMap<String, Arc<RgbImage>>,
    /// Image IDs, oldest first.
    order: Mutex<VecDeque<String>>,
}

impl ImageStore {
    pub fn new(config: ImageStoreConfig) -> Self {
        Self {
            config,
            images: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
        }
    }

    /// Stores an image and returns its ID.
    pub fn insert(&self, image: RgbImage) -> String {
        let id = generate_image_id(ID_LEN);
        self.images.insert(id.clone(), Arc::new(image));

        let mut order = self.order.lock();
        order.push_back(id.clone());
        while order.len() > self.config.max_images.max(1) {
            if let Some(evicted) = order.pop_front() {
                self.images.remove(&evicted);
                debug!(id = %evicted, "evicted stored image");
            }
        }

        id
    }

    pub fn get(&self, id: &str) -> Option<Arc<RgbImage>> {
        self.images.get(id).map(|image| Arc::clone(&image))
    }

    /// Removes an image. Returns whether it was present.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.images.remove(id).is_some();
        if removed {
            self.order.lock().retain(|stored| stored != id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }
}
