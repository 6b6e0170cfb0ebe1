//! Parking space detection from side-looking range sensors.

pub mod candidates;
pub mod detector;
pub mod search;
pub mod stop_timer;
pub mod trend;

pub use candidates::CandidateBuffer;
pub use detector::{DetectorConfig, SpaceDetector};
pub use search::SpaceSearch;
pub use stop_timer::StopTimer;
pub use trend::Trend;
