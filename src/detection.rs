//! Per-frame vehicle detections handed over by the detector collaborator.

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// Vehicle category reported by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleClass {
    #[default]
    Car,
    Motorcycle,
    Bus,
    Truck,
}

impl VehicleClass {
    /// Map a COCO class id to a vehicle category, `None` for non-vehicles.
    pub fn from_coco(class_id: usize) -> Option<Self> {
        match class_id {
            2 => Some(Self::Car),
            3 => Some(Self::Motorcycle),
            5 => Some(Self::Bus),
            7 => Some(Self::Truck),
            _ => None,
        }
    }
}

/// A single detector hit. Immutable and only meaningful for the frame it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Bounding box in pixel space
    pub bbox: Rect,
    /// Detector confidence in [0, 1]
    pub score: f32,
    pub class: VehicleClass,
}

impl Detection {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Self {
        Self::from_rect(Rect::from_tlbr(x1, y1, x2, y2), score)
    }

    pub fn from_rect(bbox: Rect, score: f32) -> Self {
        Self {
            bbox,
            score,
            class: VehicleClass::default(),
        }
    }

    pub fn with_class(mut self, class: VehicleClass) -> Self {
        self.class = class;
        self
    }
}
