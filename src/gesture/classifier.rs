//! Finger extension counting

use crate::hand::{ids, Hand};

/// (fingertip, second joint) pairs for index, middle, ring and pinky
const FINGERS: [(usize, usize); 4] = [
    (ids::INDEX_TIP, ids::INDEX_PIP),
    (ids::MIDDLE_TIP, ids::MIDDLE_PIP),
    (ids::RING_TIP, ids::RING_PIP),
    (ids::PINKY_TIP, ids::PINKY_PIP),
];

/// Count extended non-thumb fingers (0..=4)
///
/// A finger is up when its tip sits above its second joint in the image.
/// Incomplete hands count as zero, the same as a closed fist.
pub fn fingers_up(hand: &Hand) -> u8 {
    if !hand.is_complete() {
        return 0;
    }

    FINGERS
        .iter()
        .filter(|&&(tip, pip)| match (hand.point(tip), hand.point(pip)) {
            (Some(tip), Some(pip)) => tip.y < pip.y,
            _ => false,
        })
        .count() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::LANDMARK_COUNT;

    /// Synthetic hand with the first `up` fingers extended
    fn hand_with_fingers_up(up: usize) -> Hand {
        let mut coords = vec![(200, 300); LANDMARK_COUNT];
        for (i, &(tip, pip)) in FINGERS.iter().enumerate() {
            coords[pip] = (200, 250);
            coords[tip] = if i < up { (200, 180) } else { (200, 280) };
        }
        Hand::from_xy(&coords)
    }

    #[test]
    fn test_counts_cover_full_range() {
        for up in 0..=4 {
            assert_eq!(fingers_up(&hand_with_fingers_up(up)), up as u8);
        }
    }

    #[test]
    fn test_alternating_fingers() {
        let mut coords = vec![(0, 300); LANDMARK_COUNT];
        for (i, &(tip, pip)) in FINGERS.iter().enumerate() {
            coords[pip] = (0, 250);
            coords[tip] = if i % 2 == 0 { (0, 100) } else { (0, 290) };
        }
        assert_eq!(fingers_up(&Hand::from_xy(&coords)), 2);
    }

    #[test]
    fn test_level_tip_is_not_up() {
        let mut coords = vec![(0, 0); LANDMARK_COUNT];
        for &(tip, pip) in FINGERS.iter() {
            coords[pip] = (0, 250);
            coords[tip] = (0, 250);
        }
        assert_eq!(fingers_up(&Hand::from_xy(&coords)), 0);
    }

    #[test]
    fn test_thumb_is_ignored() {
        let mut hand_coords = vec![(0, 300); LANDMARK_COUNT];
        hand_coords[ids::THUMB_TIP] = (0, 0);
        for &(tip, pip) in FINGERS.iter() {
            hand_coords[pip] = (0, 250);
            hand_coords[tip] = (0, 280);
        }
        assert_eq!(fingers_up(&Hand::from_xy(&hand_coords)), 0);
    }

    #[test]
    fn test_partial_hand_counts_zero() {
        let coords = vec![(0, 0); LANDMARK_COUNT - 1];
        assert_eq!(fingers_up(&Hand::from_xy(&coords)), 0);
    }
}
