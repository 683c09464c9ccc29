use crate::pose::KeypointIndex;

/// デバッグ表示する骨格の接続 (開始, 終了)
pub const SKELETON_CONNECTIONS: [(KeypointIndex, KeypointIndex); 8] = [
    // 肩
    (KeypointIndex::LeftShoulder, KeypointIndex::RightShoulder),
    // 胴体
    (KeypointIndex::LeftShoulder, KeypointIndex::LeftHip),
    (KeypointIndex::RightShoulder, KeypointIndex::RightHip),
    (KeypointIndex::LeftHip, KeypointIndex::RightHip),
    // 腕
    (KeypointIndex::LeftShoulder, KeypointIndex::LeftElbow),
    (KeypointIndex::LeftElbow, KeypointIndex::LeftWrist),
    (KeypointIndex::RightShoulder, KeypointIndex::RightElbow),
    (KeypointIndex::RightElbow, KeypointIndex::RightWrist),
];

/// 描画する最小信頼度
pub const DRAW_MIN_SCORE: f32 = 0.5;

/// キーポイントの色 (RGB)
pub const KEYPOINT_COLOR: u32 = 0x00FF00; // 緑

/// 骨格線の色 (RGB)
pub const SKELETON_COLOR: u32 = 0xFFFF00; // 黄色

/// 装着点の色 (RGB)
pub const ANCHOR_COLOR: u32 = 0xFF00FF; // マゼンタ

/// 保持中・ロスト時の装着点の色 (RGB)
pub const STALE_ANCHOR_COLOR: u32 = 0xFF0000; // 赤

/// 肩の奥行きゲージの色 (RGB)
pub const DEPTH_NEAR_COLOR: u32 = 0x00FFFF; // 手前: シアン
pub const DEPTH_FAR_COLOR: u32 = 0xFF8000; // 奥: オレンジ
