//! # Streaming Manager
//!
//! Decides which chunks are resident: every chunk within `horizontal_radius` along x
//! and z and `vertical_radius` along y of the chunk the controller stands in. The
//! resident set is an axis-aligned box and is only recomputed when the controller
//! crosses into a different chunk.

use cgmath::Vector3;
use log::info;

use super::voxels::chunk::ChunkKey;

/// Tracks the streaming center and answers residency queries.
#[derive(Clone, Debug)]
pub struct StreamingManager {
    horizontal_radius: i32,
    vertical_radius: i32,
    center: Option<ChunkKey>,
}

impl StreamingManager {
    pub fn new(horizontal_radius: i32, vertical_radius: i32) -> Self {
        StreamingManager {
            horizontal_radius,
            vertical_radius,
            center: None,
        }
    }

    /// The chunk the resident box is centered on, if streaming has started.
    pub fn center(&self) -> Option<ChunkKey> {
        self.center
    }

    /// Whether `key` lies inside the box around `center`.
    pub fn in_range(&self, center: ChunkKey, key: ChunkKey) -> bool {
        let d = key.0 - center.0;
        d.x.abs() <= self.horizontal_radius
            && d.y.abs() <= self.vertical_radius
            && d.z.abs() <= self.horizontal_radius
    }

    /// Whether `key` is currently resident. Before the first `recenter` every chunk is.
    pub fn is_resident(&self, key: ChunkKey) -> bool {
        self.center.map_or(true, |center| self.in_range(center, key))
    }

    /// Every chunk in the box around `center`, nearest first.
    pub fn resident_set_around(&self, center: ChunkKey) -> Vec<ChunkKey> {
        let (h, v) = (self.horizontal_radius, self.vertical_radius);
        let mut keys = Vec::with_capacity(((2 * h + 1) * (2 * h + 1) * (2 * v + 1)) as usize);
        for i in -h..=h {
            for j in -v..=v {
                for k in -h..=h {
                    keys.push(center.offset(Vector3::new(i, j, k)));
                }
            }
        }
        keys.sort_by_key(|key| {
            let d = key.0 - center.0;
            d.x * d.x + d.y * d.y + d.z * d.z
        });
        keys
    }

    /// The current resident set; empty before the first `recenter`.
    pub fn resident_set(&self) -> Vec<ChunkKey> {
        self.center
            .map(|center| self.resident_set_around(center))
            .unwrap_or_default()
    }

    /// Forgets the center, so the next `recenter` always reports a resident set.
    pub fn clear_center(&mut self) {
        self.center = None;
    }

    /// Moves the box to `center`.
    ///
    /// # Returns
    /// The new resident set, or `None` when the center did not change.
    pub fn recenter(&mut self, center: ChunkKey) -> Option<Vec<ChunkKey>> {
        if self.center == Some(center) {
            return None;
        }
        info!("Streaming center moved to {}", center);
        self.center = Some(center);
        Some(self.resident_set_around(center))
    }
}
