//! Builder for turning raw detector output into [`Detection`]s.

use crate::detection::{Detection, VehicleClass};

#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
    class: VehicleClass,
}

impl DetectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Box as (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.x1 = x1;
        self.y1 = y1;
        self.x2 = x2;
        self.y2 = y2;
        self
    }

    /// Box as (centre x, centre y, width, height), the usual YOLO head layout.
    pub fn xywh(self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.tlbr(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }

    /// Box as (left, top, width, height).
    pub fn tlwh(self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.tlbr(x, y, x + w, y + h)
    }

    pub fn score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    pub fn class(mut self, class: VehicleClass) -> Self {
        self.class = class;
        self
    }

    /// Set the class from a COCO id. Returns `None` for non-vehicle classes so
    /// callers can drop those detections with `?` or `filter_map`.
    pub fn coco_class(self, class_id: usize) -> Option<Self> {
        VehicleClass::from_coco(class_id).map(|class| self.class(class))
    }

    pub fn build(self) -> Detection {
        Detection::new(self.x1, self.y1, self.x2, self.y2, self.score).with_class(self.class)
    }
}
