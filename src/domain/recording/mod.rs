//! Recording value objects and lifecycle

pub mod clock;
pub mod duration;
pub mod state;
pub mod status;

pub use clock::RecordingClock;
pub use duration::Duration;
pub use state::{InvalidStateTransition, RecorderLifecycle, RecorderState};
pub use status::RecordingStatus;
