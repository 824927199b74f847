//! Hand landmark definitions and per-frame hand state
//!
//! Landmark ids follow the 21-point hand skeleton produced by the
//! detector: 0 is the wrist, 4 the thumb tip, 8 the index fingertip.

/// Number of landmarks in a complete hand
pub const LANDMARK_COUNT: usize = 21;

/// Landmark ids used by the control pipeline
pub mod ids {
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_PIP: usize = 14;
    pub const RING_TIP: usize = 16;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_TIP: usize = 20;
}

/// A single tracked point in image pixel coordinates
///
/// `y` grows downward, so a smaller `y` is higher in the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LandmarkPoint {
    pub id: usize,
    pub x: i32,
    pub y: i32,
}

impl LandmarkPoint {
    pub fn new(id: usize, x: i32, y: i32) -> Self {
        Self { id, x, y }
    }

    /// Euclidean pixel distance to another point
    pub fn distance_to(&self, other: &LandmarkPoint) -> f64 {
        let dx = f64::from(other.x - self.x);
        let dy = f64::from(other.y - self.y);
        dx.hypot(dy)
    }
}

/// Landmarks of one detected hand, ordered by id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hand {
    points: Vec<LandmarkPoint>,
}

impl Hand {
    /// Build a hand from `(x, y)` pairs; ids are the positions
    pub fn from_xy(coords: &[(i32, i32)]) -> Self {
        let points = coords
            .iter()
            .enumerate()
            .map(|(id, &(x, y))| LandmarkPoint::new(id, x, y))
            .collect();
        Self { points }
    }

    pub fn is_complete(&self) -> bool {
        self.points.len() >= LANDMARK_COUNT
    }

    pub fn point(&self, id: usize) -> Option<&LandmarkPoint> {
        self.points.get(id).filter(|p| p.id == id)
    }

    /// Distance between thumb tip and index fingertip, if both were detected
    pub fn pinch_distance(&self) -> Option<f64> {
        let thumb = self.point(ids::THUMB_TIP)?;
        let index = self.point(ids::INDEX_TIP)?;
        Some(thumb.distance_to(index))
    }
}

/// What the detector saw in one frame
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HandState {
    /// No hand in view
    #[default]
    Absent,
    /// One hand with its landmarks
    Present(Hand),
}

impl HandState {
    /// Classify raw detector output; an empty set means no hand
    pub fn from_xy(coords: &[(i32, i32)]) -> Self {
        if coords.is_empty() {
            HandState::Absent
        } else {
            HandState::Present(Hand::from_xy(coords))
        }
    }

    /// The hand, if it carries enough landmarks to measure a pinch
    ///
    /// Both pipelines treat a hand without thumb and index tips as absent.
    pub fn trackable(&self) -> Option<(&Hand, f64)> {
        match self {
            HandState::Absent => None,
            HandState::Present(hand) => hand.pinch_distance().map(|d| (hand, d)),
        }
    }
}
