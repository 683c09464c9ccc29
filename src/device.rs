/// 画面サイズ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// アスペクト比 (幅・高さのどちらかが0以下なら1.0)
    pub fn aspect(&self) -> f32 {
        if self.width > 0.0 && self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

/// 画面幅によるデバイス区分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    /// 幅 480px 以下
    Small,
    /// 幅 768px 以下
    Mobile,
    Desktop,
}

impl DeviceClass {
    pub const SMALL_MAX_WIDTH: f32 = 480.0;
    pub const MOBILE_MAX_WIDTH: f32 = 768.0;

    pub fn from_width(width: f32) -> Self {
        if width <= Self::SMALL_MAX_WIDTH {
            Self::Small
        } else if width <= Self::MOBILE_MAX_WIDTH {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }

    /// Small も Mobile 扱い
    pub fn is_mobile(&self) -> bool {
        !matches!(self, Self::Desktop)
    }
}

/// デバイス区分ごとの閾値・係数
///
/// リサイズや画面回転のたびに `from_viewport` で作り直す。
/// 分岐はここに集約し、各処理にはこの値を引数で渡す。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceProfile {
    pub class: DeviceClass,
    pub viewport: Viewport,
    /// キーポイント採用の信頼度閾値
    pub confidence_threshold: f32,
    /// EMA係数 (大きいほど新しいサンプル寄り)
    pub smoothing_alpha: f32,
    /// 肩中点から胸までの下方向オフセット（ピクセル）
    pub chest_offset: f32,
    /// 肩z差からyawへの倍率
    pub yaw_multiplier: f32,
    /// スケール計算の基準係数
    pub base_scale_factor: f32,
    /// 垂直画角（度）
    pub fov_deg: f32,
    /// カメラのz位置
    pub camera_distance: f32,
}

impl DeviceProfile {
    pub fn from_viewport(viewport: Viewport) -> Self {
        let class = DeviceClass::from_width(viewport.width);
        let (smoothing_alpha, chest_offset, base_scale_factor, fov_deg, camera_distance) =
            match class {
                DeviceClass::Small => (0.5, 35.0, 0.5, 65.0, 4.0),
                DeviceClass::Mobile => (0.55, 40.0, 0.55, 60.0, 3.5),
                DeviceClass::Desktop => (0.6, 45.0, 0.6, 55.0, 3.0),
            };
        let (confidence_threshold, yaw_multiplier) = if class.is_mobile() {
            (0.4, 1.0)
        } else {
            (0.3, 1.2)
        };

        Self {
            class,
            viewport,
            confidence_threshold,
            smoothing_alpha,
            chest_offset,
            yaw_multiplier,
            base_scale_factor,
            fov_deg,
            camera_distance,
        }
    }
}
