pub mod anchor;
pub mod kalman;
pub mod retention;
pub mod session;
pub mod smooth;

pub use anchor::{resolve_anchor, Anchor, Orientation};
pub use kalman::StaticGainFilter;
pub use retention::{AttachmentState, TrackingPhase};
pub use session::{FrameInput, FrameOutput, TrackingSession};
pub use smooth::{filter_valid, smooth_keypoints, KeypointSmoother};
