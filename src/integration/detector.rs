//! Trait for vehicle detection backends.

use crate::detection::Detection;
use crate::frame::Frame;

/// Vehicle detector run once per frame.
///
/// Confidence and class filtering happen inside the implementation. A frame
/// with no vehicles yields `Ok(vec![])`; `Err` is reserved for real faults and
/// causes the frame to be skipped.
///
/// # Example
///
/// ```ignore
/// use checkpoint_reid::integration::Detector;
/// use checkpoint_reid::{Detection, Frame};
///
/// struct MyDetector { /* model handle */ }
///
/// impl Detector for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Self::Error> {
///         Ok(vec![])
///     }
/// }
/// ```
pub trait Detector {
    type Error: std::error::Error;

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Self::Error>;
}
