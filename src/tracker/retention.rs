use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use super::anchor::{Anchor, Orientation};
use crate::config::RetentionConfig;
use crate::fusion::FusedPose;

/// 追跡状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingPhase {
    /// まだ一度も有効な姿勢がない
    #[default]
    NoPose,
    Tracking,
    /// 検出が途切れたが保持時間内
    Retained,
    /// 保持時間切れ
    Lost,
}

impl fmt::Display for TrackingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoPose => "no-pose",
            Self::Tracking => "tracking",
            Self::Retained => "retained",
            Self::Lost => "lost",
        };
        f.write_str(s)
    }
}

/// 最後に受理した姿勢
#[derive(Debug, Clone)]
pub struct ValidPose {
    pub pose: FusedPose,
    pub anchor: Anchor,
    pub orientation: Orientation,
}

/// 最後の有効姿勢と検出時刻をセッション単位で保持する
#[derive(Debug, Clone)]
pub struct AttachmentState {
    window: Duration,
    phase: TrackingPhase,
    last_valid: Option<ValidPose>,
    last_detected: Option<Instant>,
}

impl AttachmentState {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            phase: TrackingPhase::NoPose,
            last_valid: None,
            last_detected: None,
        }
    }

    pub fn from_config(config: &RetentionConfig) -> Self {
        Self::new(Duration::from_millis(config.window_ms))
    }

    /// 有効フレームを受理
    pub fn accept(&mut self, pose: FusedPose, anchor: Anchor, orientation: Orientation, now: Instant) -> TrackingPhase {
        self.last_valid = Some(ValidPose {
            pose,
            anchor,
            orientation,
        });
        self.last_detected = Some(now);
        self.transition(TrackingPhase::Tracking)
    }

    /// 検出なし・品質不足のフレーム
    pub fn reject(&mut self, now: Instant) -> TrackingPhase {
        let next = match (&self.last_valid, self.last_detected) {
            (Some(_), Some(detected)) if now.saturating_duration_since(detected) <= self.window => {
                TrackingPhase::Retained
            }
            (Some(_), _) => TrackingPhase::Lost,
            (None, _) => TrackingPhase::NoPose,
        };
        self.transition(next)
    }

    fn transition(&mut self, next: TrackingPhase) -> TrackingPhase {
        if next != self.phase {
            info!("tracking: {} -> {}", self.phase, next);
            self.phase = next;
        }
        next
    }

    pub fn phase(&self) -> TrackingPhase {
        self.phase
    }

    pub fn last_valid(&self) -> Option<&ValidPose> {
        self.last_valid.as_ref()
    }

    pub fn last_detected(&self) -> Option<Instant> {
        self.last_detected
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// 装着表示すべきか（Lost / NoPose では隠す）
    pub fn is_visible(&self) -> bool {
        matches!(self.phase, TrackingPhase::Tracking | TrackingPhase::Retained)
    }

    pub fn reset(&mut self) {
        self.phase = TrackingPhase::NoPose;
        self.last_valid = None;
        self.last_detected = None;
    }
}
