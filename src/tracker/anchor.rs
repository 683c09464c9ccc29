use crate::device::DeviceProfile;
use crate::pose::{Keypoint, KeypointIndex, PoseFrame};

/// 肩の信頼度閾値
pub const SHOULDER_MIN_SCORE: f32 = 0.3;
/// 鼻がこれ未満なら顔が見えていない
const NOSE_HIDDEN_SCORE: f32 = 0.3;
/// 肩平均がこれより上なら体は見えている
const SHOULDER_VISIBLE_SCORE: f32 = 0.5;

/// 衣服の装着点（胸）
///
/// 肩中点をデバイス別オフセットだけ下にずらしたもの。フレームごとに作り直す。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub score: f32,
    pub left: Keypoint,
    pub right: Keypoint,
}

impl Anchor {
    /// 肩幅（ピクセル）
    pub fn shoulder_width(&self) -> f32 {
        (self.left.x - self.right.x).abs()
    }
}

/// 向きの手掛かり
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Orientation {
    /// 肩線の傾き（ラジアン）
    pub roll: f32,
    /// 肩z差によるyaw
    pub yaw: f32,
    /// 左肩が右肩より右にある（後ろ向きで左右が入れ替わる）
    pub facing_back: bool,
    /// 顔が見えず肩だけ見えている
    pub head_turned: bool,
}

impl Orientation {
    /// フレームから向きを推定（肩が欠けていればデフォルト）
    pub fn resolve(frame: &PoseFrame, profile: &DeviceProfile) -> Self {
        let left = frame.get(KeypointIndex::LeftShoulder);
        let right = frame.get(KeypointIndex::RightShoulder);
        let nose = frame.get(KeypointIndex::Nose);

        let (left, right) = match (left, right) {
            (Some(l), Some(r)) => (l, r),
            _ => return Self::default(),
        };
        let (roll, yaw) = body_rotation(left, right, profile);

        Self {
            roll,
            yaw,
            facing_back: left.x > right.x,
            head_turned: is_back_facing(left, right, nose),
        }
    }
}

fn shoulders_visible(left: &Keypoint, right: &Keypoint) -> bool {
    left.is_valid(SHOULDER_MIN_SCORE) && right.is_valid(SHOULDER_MIN_SCORE)
}

/// 左右の肩から胸の装着点を計算
pub fn resolve_anchor(
    left: Option<&Keypoint>,
    right: Option<&Keypoint>,
    profile: &DeviceProfile,
) -> Option<Anchor> {
    let (left, right) = (left?, right?);
    if !shoulders_visible(left, right) {
        return None;
    }

    Some(Anchor {
        x: (left.x + right.x) / 2.0,
        y: (left.y + right.y) / 2.0 + profile.chest_offset,
        z: (left.z + right.z) / 2.0,
        score: (left.score + right.score) / 2.0,
        left: *left,
        right: *right,
    })
}

/// フレームから直接装着点を計算
pub fn resolve_frame_anchor(frame: &PoseFrame, profile: &DeviceProfile) -> Option<Anchor> {
    resolve_anchor(
        frame.get(KeypointIndex::LeftShoulder),
        frame.get(KeypointIndex::RightShoulder),
        profile,
    )
}

/// 肩幅（ピクセル）。どちらかが欠けているか信頼度不足なら 0
pub fn shoulder_width(left: Option<&Keypoint>, right: Option<&Keypoint>) -> f32 {
    match (left, right) {
        (Some(l), Some(r)) if shoulders_visible(l, r) => (l.x - r.x).abs(),
        _ => 0.0,
    }
}

/// (roll, yaw)
///
/// roll: 肩線の傾き
/// yaw: 肩の奥行き差 × デバイス倍率
pub fn body_rotation(left: &Keypoint, right: &Keypoint, profile: &DeviceProfile) -> (f32, f32) {
    let roll = f32::atan2(right.y - left.y, right.x - left.x);
    let yaw = (left.z - right.z) * profile.yaw_multiplier;
    (roll, yaw)
}

/// 後頭部が見えている状態の判定
pub fn is_back_facing(left: &Keypoint, right: &Keypoint, nose: Option<&Keypoint>) -> bool {
    let nose = match nose {
        Some(n) => n,
        None => return false,
    };
    let shoulder_avg = (left.score + right.score) / 2.0;
    nose.score < NOSE_HIDDEN_SCORE && shoulder_avg > SHOULDER_VISIBLE_SCORE
}
