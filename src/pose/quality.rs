use std::fmt;

use super::keypoint::{find_keypoint, Keypoint, KeypointIndex};
use crate::config::GateConfig;
use crate::device::DeviceProfile;
use crate::tracker::anchor::SHOULDER_MIN_SCORE;
use crate::tracker::smooth::filter_valid;

/// 有効キーポイントの最小数
pub const MIN_VALID_KEYPOINTS: usize = 10;

/// ゲートで弾かれた理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityIssue {
    InsufficientKeypoints,
    ShouldersNotDetected,
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientKeypoints => {
                write!(f, "Not enough keypoints detected. Please adjust your position.")
            }
            Self::ShouldersNotDetected => {
                write!(f, "Shoulders not detected clearly. Please face the camera.")
            }
        }
    }
}

/// ゲートの判定結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseQuality {
    pub is_valid: bool,
    /// 有効キーポイントの割合
    pub confidence: f32,
    pub issue: Option<QualityIssue>,
}

impl PoseQuality {
    fn rejected(confidence: f32, issue: QualityIssue) -> Self {
        Self {
            is_valid: false,
            confidence,
            issue: Some(issue),
        }
    }
}

/// 品質ゲート
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseGate {
    pub min_valid_keypoints: usize,
    pub shoulder_min_score: f32,
}

impl Default for PoseGate {
    fn default() -> Self {
        Self {
            min_valid_keypoints: MIN_VALID_KEYPOINTS,
            shoulder_min_score: SHOULDER_MIN_SCORE,
        }
    }
}

impl PoseGate {
    pub fn from_config(config: &GateConfig) -> Self {
        Self {
            min_valid_keypoints: config.min_valid_keypoints,
            shoulder_min_score: config.shoulder_min_score,
        }
    }

    /// フレームが装着計算に使えるかを判定
    ///
    /// 1. デバイス既定の閾値で有効数を数え、最小数未満なら不可
    /// 2. 左右の肩 (11/12) が欠けているか閾値未満なら不可
    pub fn evaluate(&self, keypoints: &[Keypoint], profile: &DeviceProfile) -> PoseQuality {
        let valid_count = filter_valid(keypoints, None, profile).len();
        let confidence = if keypoints.is_empty() {
            0.0
        } else {
            valid_count as f32 / keypoints.len() as f32
        };

        if valid_count < self.min_valid_keypoints {
            return PoseQuality::rejected(confidence, QualityIssue::InsufficientKeypoints);
        }

        let shoulder_ok = |index: KeypointIndex| {
            find_keypoint(keypoints, index as usize)
                .map(|kp| kp.is_valid(self.shoulder_min_score))
                .unwrap_or(false)
        };
        if !shoulder_ok(KeypointIndex::LeftShoulder) || !shoulder_ok(KeypointIndex::RightShoulder) {
            return PoseQuality::rejected(confidence, QualityIssue::ShouldersNotDetected);
        }

        PoseQuality {
            is_valid: true,
            confidence,
            issue: None,
        }
    }
}

/// 既定のゲートで判定
pub fn evaluate_pose_quality(keypoints: &[Keypoint], profile: &DeviceProfile) -> PoseQuality {
    PoseGate::default().evaluate(keypoints, profile)
}
