use serde::{Deserialize, Serialize};

/// 33 ランドマーク体系のインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum KeypointIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl KeypointIndex {
    pub const COUNT: usize = 33;

    const ALL: [KeypointIndex; Self::COUNT] = [
        Self::Nose,
        Self::LeftEyeInner,
        Self::LeftEye,
        Self::LeftEyeOuter,
        Self::RightEyeInner,
        Self::RightEye,
        Self::RightEyeOuter,
        Self::LeftEar,
        Self::RightEar,
        Self::MouthLeft,
        Self::MouthRight,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftPinky,
        Self::RightPinky,
        Self::LeftIndex,
        Self::RightIndex,
        Self::LeftThumb,
        Self::RightThumb,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
        Self::LeftHeel,
        Self::RightHeel,
        Self::LeftFootIndex,
        Self::RightFootIndex,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// 単一キーポイント
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    /// ランドマーク番号 (フィルタ後も元の番号を保持)
    pub index: usize,
    /// X座標（ピクセル）
    pub x: f32,
    /// Y座標（ピクセル）
    pub y: f32,
    /// 検出器相対の奥行き（単位なし）
    pub z: f32,
    /// 信頼度スコア (0.0〜1.0)
    pub score: f32,
}

impl Keypoint {
    pub fn new(index: usize, x: f32, y: f32, z: f32, score: f32) -> Self {
        Self { index, x, y, z, score }
    }

    /// 信頼度が閾値以上か
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.score >= threshold
    }

    /// 描画用の整数ピクセル座標
    pub fn to_pixel(&self) -> (i32, i32) {
        (self.x as i32, self.y as i32)
    }
}

/// 1回の検出結果
///
/// 並びは検出器の出力順。フィルタ後は番号が飛ぶことがあるので
/// 位置ではなく `Keypoint::index` で引く。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    pub keypoints: Vec<Keypoint>,
}

impl PoseFrame {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    /// 番号でキーポイントを取得
    pub fn get(&self, index: KeypointIndex) -> Option<&Keypoint> {
        find_keypoint(&self.keypoints, index as usize)
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// 全キーポイントの平均信頼度
    pub fn average_score(&self) -> f32 {
        if self.keypoints.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.keypoints.iter().map(|k| k.score).sum();
        sum / self.keypoints.len() as f32
    }
}

/// 番号で検索する。密な配列なら位置で当たるので先に試す。
pub fn find_keypoint(keypoints: &[Keypoint], index: usize) -> Option<&Keypoint> {
    match keypoints.get(index) {
        Some(kp) if kp.index == index => Some(kp),
        _ => keypoints.iter().find(|kp| kp.index == index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypoint_index_from_index() {
        assert_eq!(KeypointIndex::from_index(0), Some(KeypointIndex::Nose));
        assert_eq!(KeypointIndex::from_index(11), Some(KeypointIndex::LeftShoulder));
        assert_eq!(KeypointIndex::from_index(24), Some(KeypointIndex::RightHip));
        assert_eq!(KeypointIndex::from_index(32), Some(KeypointIndex::RightFootIndex));
        assert_eq!(KeypointIndex::from_index(33), None);
    }

    #[test]
    fn test_keypoint_is_valid() {
        let kp = Keypoint::new(0, 10.0, 20.0, 0.0, 0.7);
        assert!(kp.is_valid(0.5));
        assert!(kp.is_valid(0.7));
        assert!(!kp.is_valid(0.8));
    }

    #[test]
    fn test_get_sparse_frame() {
        // フィルタ後の疎な並び
        let frame = PoseFrame::new(vec![
            Keypoint::new(0, 1.0, 1.0, 0.0, 0.9),
            Keypoint::new(11, 100.0, 200.0, 0.0, 0.9),
            Keypoint::new(12, 300.0, 200.0, 0.0, 0.8),
        ]);
        let right = frame.get(KeypointIndex::RightShoulder).unwrap();
        assert_eq!(right.x, 300.0);
        assert!(frame.get(KeypointIndex::LeftHip).is_none());
    }

    #[test]
    fn test_average_score() {
        let frame = PoseFrame::new(vec![
            Keypoint::new(0, 0.0, 0.0, 0.0, 0.4),
            Keypoint::new(1, 0.0, 0.0, 0.0, 0.6),
        ]);
        assert!((frame.average_score() - 0.5).abs() < 1e-6);
        assert_eq!(PoseFrame::default().average_score(), 0.0);
    }
}
