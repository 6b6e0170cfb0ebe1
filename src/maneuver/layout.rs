//! Sensor roles for one maneuver variant.
//!
//! The four variants (perpendicular/parallel × left/right) share one state
//! machine; only the physical sensor behind each role changes. "Target"
//! is the side the space lies on, "opposite" the other one.

use crate::core::sensor::SensorId;
use crate::core::types::{Side, SpaceKind};

/// Physical sensor behind each control role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorLayout {
    pub kind: SpaceKind,
    pub side: Side,
    /// Side-looking sensor at the front of the target side
    pub side_front: SensorId,
    /// First side-looking rear sensor on the target side
    pub side_rear: SensorId,
    /// Second side-looking rear sensor on the target side
    pub side_rear2: SensorId,
    /// Side-looking front sensor on the opposite side
    pub opposite_front: SensorId,
    /// First side-looking rear sensor on the opposite side
    pub opposite_rear: SensorId,
    /// Front corner ultrasonic on the target side
    pub front_corner: SensorId,
    /// Rear corner ultrasonic on the target side
    pub rear_corner: SensorId,
    /// Rear centre ultrasonic on the target side
    pub rear_centre: SensorId,
    /// Both front centre ultrasonics
    pub front_centres: [SensorId; 2],
    /// Both rear centre ultrasonics
    pub rear_centres: [SensorId; 2],
}

impl SensorLayout {
    pub fn new(kind: SpaceKind, side: Side) -> Self {
        let (side_front, side_rear, side_rear2) = side_apa(side);
        let (opposite_front, opposite_rear, _) = side_apa(side.opposite());

        let (front_corner, rear_corner, rear_centre) = match side {
            Side::Left => (SensorId::UpaFl, SensorId::UpaBl, SensorId::UpaBcl),
            Side::Right => (SensorId::UpaFr, SensorId::UpaBr, SensorId::UpaBcr),
        };

        Self {
            kind,
            side,
            side_front,
            side_rear,
            side_rear2,
            opposite_front,
            opposite_rear,
            front_corner,
            rear_corner,
            rear_centre,
            front_centres: [SensorId::UpaFcl, SensorId::UpaFcr],
            rear_centres: [SensorId::UpaBcl, SensorId::UpaBcr],
        }
    }

    /// Sensors guarded while driving forward in the correction phase
    pub fn forward_guard(&self) -> Vec<SensorId> {
        match self.kind {
            SpaceKind::Perpendicular => vec![self.side_front, self.opposite_front],
            SpaceKind::Parallel => vec![self.side_front, self.front_corner],
        }
    }

    /// Sensors guarded while reversing in the correction phase
    pub fn reverse_guard(&self) -> Vec<SensorId> {
        match self.kind {
            SpaceKind::Perpendicular => Vec::new(),
            SpaceKind::Parallel => vec![self.side_rear, self.rear_corner],
        }
    }
}

/// Front, rear and second rear side-looking sensors of one side
fn side_apa(side: Side) -> (SensorId, SensorId, SensorId) {
    match side {
        Side::Left => (SensorId::ApaLf, SensorId::ApaLb, SensorId::ApaLb2),
        Side::Right => (SensorId::ApaRf, SensorId::ApaRb, SensorId::ApaRb2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_right_layout() {
        let l = SensorLayout::new(SpaceKind::Perpendicular, Side::Right);
        assert_eq!(l.side_front, SensorId::ApaRf);
        assert_eq!(l.side_rear, SensorId::ApaRb);
        assert_eq!(l.side_rear2, SensorId::ApaRb2);
        assert_eq!(l.opposite_front, SensorId::ApaLf);
        assert_eq!(l.opposite_rear, SensorId::ApaLb);
        assert_eq!(l.rear_corner, SensorId::UpaBr);
        assert_eq!(l.rear_centre, SensorId::UpaBcr);
    }

    #[test]
    fn test_layouts_are_mirrored() {
        for kind in [SpaceKind::Perpendicular, SpaceKind::Parallel] {
            let l = SensorLayout::new(kind, Side::Left);
            let r = SensorLayout::new(kind, Side::Right);
            assert_eq!(l.side_front, r.opposite_front);
            assert_eq!(l.opposite_front, r.side_front);
            assert_eq!(l.side_rear, r.opposite_rear);
            assert_eq!(l.front_centres, r.front_centres);
        }
    }

    #[test]
    fn test_guards_by_kind() {
        let perp = SensorLayout::new(SpaceKind::Perpendicular, Side::Left);
        assert!(perp.reverse_guard().is_empty());
        let par = SensorLayout::new(SpaceKind::Parallel, Side::Left);
        assert_eq!(par.reverse_guard(), vec![SensorId::ApaLb, SensorId::UpaBl]);
    }
}
