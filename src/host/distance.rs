//! Coarse inter-room distance

use ahash::AHashMap;

use crate::core::types::RoomName;

/// Room-to-room distance used for spawn allocation ranking
///
/// This is a coarse metric (rooms, not tiles); fine-grained path cost is the
/// travel subsystem's business.
pub trait DistanceService {
    fn room_distance(&self, from: &RoomName, to: &RoomName) -> u32;
}

/// Linear room distance: `max(|dx|, |dy|)` on the room grid
///
/// Rooms without map coordinates are unreachable (`u32::MAX`) unless an
/// explicit override pairs them.
#[derive(Debug, Clone, Default)]
pub struct LinearDistance {
    overrides: AHashMap<(RoomName, RoomName), u32>,
}

impl LinearDistance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the distance between two rooms (symmetric)
    pub fn set(&mut self, a: impl Into<RoomName>, b: impl Into<RoomName>, distance: u32) {
        let (a, b) = (a.into(), b.into());
        self.overrides.insert((b.clone(), a.clone()), distance);
        self.overrides.insert((a, b), distance);
    }
}

impl DistanceService for LinearDistance {
    fn room_distance(&self, from: &RoomName, to: &RoomName) -> u32 {
        if from == to {
            return 0;
        }
        if let Some(d) = self.overrides.get(&(from.clone(), to.clone())) {
            return *d;
        }
        match (from.coords(), to.coords()) {
            (Some((x1, y1)), Some((x2, y2))) => {
                x1.abs_diff(x2).max(y1.abs_diff(y2))
            }
            _ => u32::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_distance() {
        let d = LinearDistance::new();
        assert_eq!(d.room_distance(&"E1N1".into(), &"E4N2".into()), 3);
        assert_eq!(d.room_distance(&"W0N0".into(), &"E0N0".into()), 1);
        assert_eq!(d.room_distance(&"E5S5".into(), &"E5S5".into()), 0);
    }

    #[test]
    fn test_extreme_coordinates_do_not_overflow() {
        let d = LinearDistance::new();
        let east: RoomName = "E2147483647N0".into();
        let west: RoomName = "W2147483647N0".into();
        assert_eq!(d.room_distance(&east, &west), u32::MAX);
        assert_eq!(d.room_distance(&west, &east), u32::MAX);
    }

    #[test]
    fn test_override_is_symmetric() {
        let mut d = LinearDistance::new();
        d.set("home", "outpost", 4);
        assert_eq!(d.room_distance(&"home".into(), &"outpost".into()), 4);
        assert_eq!(d.room_distance(&"outpost".into(), &"home".into()), 4);
        assert_eq!(d.room_distance(&"home".into(), &"E1N1".into()), u32::MAX);
    }
}
