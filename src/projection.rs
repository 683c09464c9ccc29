use std::f32::consts::FRAC_PI_2;

use nalgebra::{Perspective3, Point3, UnitQuaternion, Vector3};
use serde::Serialize;

use crate::config::ProjectionConfig;
use crate::device::{DeviceProfile, Viewport};
use crate::tracker::anchor::{Anchor, Orientation};

const MIN_NEAR: f32 = 0.01;
const MIN_DEPTH_RANGE: f32 = 1e-3;

/// 衣服モデルの位置・オイラー角 (XYZ, ラジアン)・一様スケール
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttachmentTransform {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: f32,
}

impl AttachmentTransform {
    pub fn quaternion(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::from_euler_angles(self.rotation[0], self.rotation[1], self.rotation[2])
    }
}

/// `(0, 0, distance)` から -Z 方向を向く透視カメラ
#[derive(Debug, Clone)]
pub struct CameraRig {
    projection: Perspective3<f32>,
    position: Point3<f32>,
}

impl CameraRig {
    pub fn new(profile: &DeviceProfile, near: f32, far: f32) -> Self {
        // near == far は透視行列が作れない
        let near = if near > 0.0 { near } else { MIN_NEAR };
        let far = if far - near > MIN_DEPTH_RANGE { far } else { near + MIN_DEPTH_RANGE };
        Self {
            projection: Perspective3::new(
                profile.viewport.aspect(),
                profile.fov_deg.to_radians(),
                near,
                far,
            ),
            position: Point3::new(0.0, 0.0, profile.camera_distance),
        }
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn projection(&self) -> &Perspective3<f32> {
        &self.projection
    }

    /// 画面ピクセルをワールド空間の単位方向ベクトルへ逆投影
    pub fn ray(&self, x: f32, y: f32, viewport: Viewport) -> Vector3<f32> {
        let w = viewport.width.max(1.0);
        let h = viewport.height.max(1.0);
        let ndc = Point3::new((x / w) * 2.0 - 1.0, -(y / h) * 2.0 + 1.0, 0.5);
        // カメラは回転なしなので位置を足せばワールド座標
        let world = self.projection.unproject_point(&ndc) + self.position.coords;
        (world - self.position).normalize()
    }
}

/// 画面幅に対する肩幅の比率（`[min, max]` に制限）
pub fn responsive_scale(shoulder_width: f32, screen_width: f32, profile: &DeviceProfile, config: &ProjectionConfig) -> f32 {
    let denom = screen_width * profile.base_scale_factor;
    if denom <= 0.0 {
        return config.min_scale;
    }
    (shoulder_width / denom).clamp(config.min_scale, config.max_scale)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// 衣服の変換をフレームごとの目標へ平滑化する
///
/// 装着点がないか顔が後ろを向いているときは最後の変換を保持。
#[derive(Debug, Clone)]
pub struct ScreenProjector {
    config: ProjectionConfig,
    viewport: Viewport,
    rig: CameraRig,
    position: Vector3<f32>,
    rotation: Vector3<f32>,
    current: Option<AttachmentTransform>,
}

impl ScreenProjector {
    pub fn new(config: ProjectionConfig, profile: &DeviceProfile) -> Self {
        let rig = CameraRig::new(profile, config.near, config.far);
        Self {
            config,
            viewport: profile.viewport,
            rig,
            position: Vector3::zeros(),
            rotation: Vector3::zeros(),
            current: None,
        }
    }

    /// 画面サイズが変わったらカメラを作り直す（平滑化状態は維持）
    pub fn set_profile(&mut self, profile: &DeviceProfile) {
        if profile.viewport != self.viewport {
            self.viewport = profile.viewport;
            self.rig = CameraRig::new(profile, self.config.near, self.config.far);
        }
    }

    pub fn rig(&self) -> &CameraRig {
        &self.rig
    }

    /// 装着点へ平滑化を進め、描画する変換を返す
    pub fn update(
        &mut self,
        anchor: Option<&Anchor>,
        orientation: &Orientation,
        profile: &DeviceProfile,
    ) -> Option<AttachmentTransform> {
        self.set_profile(profile);

        let anchor = match anchor {
            Some(a) if !orientation.head_turned => a,
            _ => return self.current,
        };
        let cfg = &self.config;

        let dir = self.rig.ray(anchor.x, anchor.y, self.viewport);
        let depth = cfg.base_depth + anchor.z * cfg.depth_multiplier;
        let mut target = self.rig.position().coords + dir * depth;
        target.x = -target.x;

        if (self.position - target).norm() > cfg.deadband {
            self.position = self.position.lerp(&target, cfg.position_lerp);
        }

        let yaw = (anchor.right.z - anchor.left.z) * cfg.rotation_yaw_gain;
        let target_yaw = if orientation.facing_back {
            yaw - FRAC_PI_2
        } else {
            yaw + FRAC_PI_2
        };
        let target_rot = Vector3::new(0.0, target_yaw, 0.0);
        for i in 0..3 {
            self.rotation[i] = lerp(self.rotation[i], target_rot[i], cfg.rotation_lerp);
        }

        let responsive = responsive_scale(anchor.shoulder_width(), self.viewport.width, profile, cfg);
        let boost = if orientation.facing_back { 1.0 } else { cfg.front_boost };

        let transform = AttachmentTransform {
            position: [self.position.x, self.position.y, self.position.z],
            rotation: [self.rotation.x, self.rotation.y, self.rotation.z],
            scale: responsive * cfg.model_scale * boost,
        };
        self.current = Some(transform);
        self.current
    }

    /// 進めずに最後の変換を返す
    pub fn hold(&self) -> Option<AttachmentTransform> {
        self.current
    }

    pub fn reset(&mut self) {
        self.position = Vector3::zeros();
        self.rotation = Vector3::zeros();
        self.current = None;
    }
}
