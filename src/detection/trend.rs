//! Three-way edge classification of consecutive range readings.

/// Direction of change between two consecutive readings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    /// Range increased by more than the threshold (entering a gap)
    Rising,
    /// Range decreased by more than the threshold (reaching an obstacle)
    Falling,
    /// Change within the threshold
    Stable,
}

impl Trend {
    /// Classify the change from `front` (older) to `back` (newer).
    #[inline]
    pub fn classify(front: f32, back: f32, range_diff: f32) -> Trend {
        if back - front > range_diff {
            Trend::Rising
        } else if front - back > range_diff {
            Trend::Falling
        } else {
            Trend::Stable
        }
    }

    /// Trend of the same pair read in the opposite order
    pub fn reversed(self) -> Trend {
        match self {
            Trend::Rising => Trend::Falling,
            Trend::Falling => Trend::Rising,
            Trend::Stable => Trend::Stable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(Trend::classify(50.0, 60.0, 5.0), Trend::Rising);
        assert_eq!(Trend::classify(50.0, 40.0, 5.0), Trend::Falling);
        assert_eq!(Trend::classify(50.0, 54.0, 5.0), Trend::Stable);
        // Exactly the threshold is still stable
        assert_eq!(Trend::classify(50.0, 55.0, 5.0), Trend::Stable);
        assert_eq!(Trend::classify(55.0, 50.0, 5.0), Trend::Stable);
    }

    #[test]
    fn test_antisymmetry() {
        let samples = [0.0_f32, 3.0, 12.5, 20.0, 47.0, 50.0, 99.0, 250.0];
        for &a in &samples {
            for &b in &samples {
                let forward = Trend::classify(a, b, 5.0);
                let backward = Trend::classify(b, a, 5.0);
                assert_eq!(forward.reversed(), backward, "a={} b={}", a, b);
            }
        }
    }
}
