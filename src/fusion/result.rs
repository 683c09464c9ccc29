use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::pose::Keypoint;

/// 推定サービスが返す深度・スケール
///
/// `scale_factor` と `average_depth_cm` が両方数値のときだけ作る。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthEstimate {
    pub scale_factor: f64,
    pub average_depth_cm: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_x_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_y_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

#[derive(Debug, Error)]
pub enum FusionError {
    #[error("fusion request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("fusion service returned HTTP {0}")]
    Status(u16),
    #[error("fusion request timed out")]
    Timeout,
    #[error("malformed fusion response: {0}")]
    Malformed(String),
    #[error("fusion task ended without a result")]
    Cancelled,
}

/// 1回の問い合わせ結果
#[derive(Debug)]
pub enum FusionResult {
    /// 必須の数値が揃っている
    Complete(DepthEstimate),
    /// 深度のないオブジェクト
    Partial,
    Failed(FusionError),
}

impl FusionResult {
    /// 応答を分類
    pub fn classify(reply: Result<Value, FusionError>) -> Self {
        let body = match reply {
            Ok(body) => body,
            Err(e) => return Self::Failed(e),
        };
        let obj = match body.as_object() {
            Some(obj) => obj,
            None => return Self::Failed(FusionError::Malformed(format!("expected object, got {body}"))),
        };

        let number = |key: &str| obj.get(key).and_then(Value::as_f64);
        match (number("scale_factor"), number("average_depth_cm")) {
            (Some(scale_factor), Some(average_depth_cm)) => Self::Complete(DepthEstimate {
                scale_factor,
                average_depth_cm,
                center_x_m: number("center_x_m"),
                center_y_m: number("center_y_m"),
                reference: obj.get("reference").and_then(Value::as_str).map(str::to_string),
            }),
            _ => Self::Partial,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}

/// 現フレームのキーポイントと最新の深度推定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedPose {
    pub keypoints: Vec<Keypoint>,
    #[serde(flatten)]
    pub depth: Option<DepthEstimate>,
}

impl FusedPose {
    pub fn keypoints_only(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints, depth: None }
    }

    pub fn with_depth(keypoints: Vec<Keypoint>, depth: DepthEstimate) -> Self {
        Self {
            keypoints,
            depth: Some(depth),
        }
    }

    pub fn is_depth_complete(&self) -> bool {
        self.depth.is_some()
    }

    pub fn scale_factor(&self) -> Option<f64> {
        self.depth.as_ref().map(|d| d.scale_factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_complete_response() {
        let r = FusionResult::classify(Ok(json!({
            "scale_factor": 1.05,
            "average_depth_cm": 182.5,
            "center_x_m": 0.01,
            "reference": "shoulder",
        })));
        match r {
            FusionResult::Complete(d) => {
                assert_eq!(d.scale_factor, 1.05);
                assert_eq!(d.average_depth_cm, 182.5);
                assert_eq!(d.center_x_m, Some(0.01));
                assert_eq!(d.center_y_m, None);
                assert_eq!(d.reference.as_deref(), Some("shoulder"));
            }
            other => panic!("expected Complete, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_depth_is_partial() {
        let r = FusionResult::classify(Ok(json!({ "scale_factor": 0.85 })));
        assert!(matches!(r, FusionResult::Partial));
    }

    #[test]
    fn test_non_numeric_is_partial() {
        let r = FusionResult::classify(Ok(json!({
            "scale_factor": "0.85",
            "average_depth_cm": 150,
        })));
        assert!(matches!(r, FusionResult::Partial));
    }

    #[test]
    fn test_non_object_is_failed() {
        let r = FusionResult::classify(Ok(json!([1, 2, 3])));
        assert!(matches!(r, FusionResult::Failed(FusionError::Malformed(_))));
    }

    #[test]
    fn test_error_is_failed() {
        let r = FusionResult::classify(Err(FusionError::Status(502)));
        assert!(matches!(r, FusionResult::Failed(FusionError::Status(502))));
        assert!(!r.is_complete());
    }

    #[test]
    fn test_fused_pose_serializes_flat() {
        let pose = FusedPose::with_depth(
            vec![],
            DepthEstimate {
                scale_factor: 1.0,
                average_depth_cm: 120.0,
                center_x_m: None,
                center_y_m: None,
                reference: None,
            },
        );
        let v = serde_json::to_value(&pose).unwrap();
        assert_eq!(v["scale_factor"], json!(1.0));
        assert_eq!(v["average_depth_cm"], json!(120.0));
        assert!(pose.is_depth_complete());
        assert!(!FusedPose::keypoints_only(vec![]).is_depth_complete());
    }
}
