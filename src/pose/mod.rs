pub mod detector;
pub mod keypoint;
pub mod normalize;
pub mod quality;

pub use detector::{DetectionClock, PoseDetector, RecordedFrame, ReplayDetector};
pub use keypoint::{Keypoint, KeypointIndex, PoseFrame};
pub use normalize::{normalize_landmarks, RawLandmark};
pub use quality::{evaluate_pose_quality, PoseGate, PoseQuality, QualityIssue, MIN_VALID_KEYPOINTS};
