use serde::{Deserialize, Serialize};

use super::keypoint::Keypoint;

/// 検出器の生出力 (x, y は 0.0〜1.0 の正規化座標)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawLandmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f32>,
}

impl RawLandmark {
    pub fn new(x: f32, y: f32, z: f32, visibility: Option<f32>) -> Self {
        Self { x, y, z, visibility }
    }
}

/// 正規化座標をフレームのピクセル座標に変換
///
/// visibility がなければ信頼度 1.0 とみなす。
pub fn normalize_landmarks(raw: &[RawLandmark], width: f32, height: f32) -> Vec<Keypoint> {
    raw.iter()
        .enumerate()
        .map(|(index, lm)| Keypoint {
            index,
            x: lm.x * width,
            y: lm.y * height,
            z: lm.z,
            score: lm.visibility.unwrap_or(1.0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_pixel_space() {
        let raw = [RawLandmark::new(0.5, 0.25, -0.1, Some(0.8))];
        let kps = normalize_landmarks(&raw, 640.0, 480.0);
        assert_eq!(kps.len(), 1);
        assert_eq!(kps[0].index, 0);
        assert_eq!(kps[0].x, 320.0);
        assert_eq!(kps[0].y, 120.0);
        assert_eq!(kps[0].z, -0.1);
        assert_eq!(kps[0].score, 0.8);
    }

    #[test]
    fn test_missing_visibility_is_full_confidence() {
        let raw = [
            RawLandmark::new(0.0, 0.0, 0.0, Some(0.2)),
            RawLandmark::new(1.0, 1.0, 0.0, None),
        ];
        let kps = normalize_landmarks(&raw, 100.0, 100.0);
        assert_eq!(kps[1].index, 1);
        assert_eq!(kps[1].score, 1.0);
    }

    #[test]
    fn test_deserialize_without_visibility() {
        let lm: RawLandmark = serde_json::from_str(r#"{"x":0.1,"y":0.2,"z":0.3}"#).unwrap();
        assert_eq!(lm.visibility, None);
        assert!((lm.z - 0.3).abs() < 1e-6);
    }
}
