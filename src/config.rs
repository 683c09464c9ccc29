use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::pose::MIN_VALID_KEYPOINTS;
use crate::tracker::anchor::SHOULDER_MIN_SCORE;
use crate::tracker::kalman::{DEFAULT_MEASUREMENT_NOISE, DEFAULT_PROCESS_NOISE};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub projection: ProjectionConfig,
    #[serde(default)]
    pub garment: GarmentConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilterConfig {
    /// EMA係数（省略時はデバイス既定値）
    #[serde(default)]
    pub alpha: Option<f32>,
    /// 固定ゲインフィルタを追加で掛けるか
    #[serde(default)]
    pub static_gain: bool,
    #[serde(default = "default_process_noise")]
    pub process_noise: f32,
    #[serde(default = "default_measurement_noise")]
    pub measurement_noise: f32,
}

fn default_process_noise() -> f32 { DEFAULT_PROCESS_NOISE }
fn default_measurement_noise() -> f32 { DEFAULT_MEASUREMENT_NOISE }

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            alpha: None,
            static_gain: false,
            process_noise: default_process_noise(),
            measurement_noise: default_measurement_noise(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GateConfig {
    /// 有効キーポイントの最小数
    #[serde(default = "default_min_valid_keypoints")]
    pub min_valid_keypoints: usize,
    /// 肩の信頼度閾値
    #[serde(default = "default_shoulder_min_score")]
    pub shoulder_min_score: f32,
}

fn default_min_valid_keypoints() -> usize { MIN_VALID_KEYPOINTS }
fn default_shoulder_min_score() -> f32 { SHOULDER_MIN_SCORE }

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_valid_keypoints: default_min_valid_keypoints(),
            shoulder_min_score: default_shoulder_min_score(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FusionConfig {
    #[serde(default = "default_fusion_enabled")]
    pub enabled: bool,
    /// 深度推定サービスのURL（未設定なら無効）
    #[serde(default)]
    pub url: Option<String>,
    /// Bearerトークン
    #[serde(default)]
    pub token: Option<String>,
    /// 送信間隔（ミリ秒）
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: Option<u64>,
}

fn default_fusion_enabled() -> bool { true }
fn default_min_interval_ms() -> u64 { 1000 }
fn default_timeout_ms() -> Option<u64> { Some(3000) }

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            enabled: default_fusion_enabled(),
            url: None,
            token: None,
            min_interval_ms: default_min_interval_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetentionConfig {
    /// 検出が途切れてから最後の姿勢を保持する時間（ミリ秒）
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

fn default_window_ms() -> u64 { 2000 }

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProjectionConfig {
    /// 基準奥行き（ワールド単位）
    #[serde(default = "default_base_depth")]
    pub base_depth: f32,
    /// 胸のzに掛ける倍率
    #[serde(default = "default_depth_multiplier")]
    pub depth_multiplier: f32,
    #[serde(default = "default_position_lerp")]
    pub position_lerp: f32,
    /// これ以下の移動は無視
    #[serde(default = "default_deadband")]
    pub deadband: f32,
    #[serde(default = "default_rotation_lerp")]
    pub rotation_lerp: f32,
    #[serde(default = "default_rotation_yaw_gain")]
    pub rotation_yaw_gain: f32,
    /// モデル自体のスケール
    #[serde(default = "default_model_scale")]
    pub model_scale: f32,
    /// 正面向き時の拡大率
    #[serde(default = "default_front_boost")]
    pub front_boost: f32,
    #[serde(default = "default_min_scale")]
    pub min_scale: f32,
    #[serde(default = "default_max_scale")]
    pub max_scale: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
}

fn default_base_depth() -> f32 { 1.6 }
fn default_depth_multiplier() -> f32 { -2.0 }
fn default_position_lerp() -> f32 { 0.2 }
fn default_deadband() -> f32 { 0.005 }
fn default_rotation_lerp() -> f32 { 0.15 }
fn default_rotation_yaw_gain() -> f32 { 1.2 }
fn default_model_scale() -> f32 { 1.55 }
fn default_front_boost() -> f32 { 1.7 }
fn default_min_scale() -> f32 { 0.25 }
fn default_max_scale() -> f32 { 1.5 }
fn default_near() -> f32 { 0.1 }
fn default_far() -> f32 { 1000.0 }

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            base_depth: default_base_depth(),
            depth_multiplier: default_depth_multiplier(),
            position_lerp: default_position_lerp(),
            deadband: default_deadband(),
            rotation_lerp: default_rotation_lerp(),
            rotation_yaw_gain: default_rotation_yaw_gain(),
            model_scale: default_model_scale(),
            front_boost: default_front_boost(),
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
            near: default_near(),
            far: default_far(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GarmentConfig {
    /// 選択中の衣服ID
    #[serde(default = "default_selected")]
    pub selected: String,
    /// モデルのディレクトリ
    #[serde(default = "default_model_dir")]
    pub model_dir: String,
    /// ID → モデルパス（空なら既定のカタログ）
    #[serde(default)]
    pub catalog: BTreeMap<String, String>,
}

fn default_selected() -> String { "busy_bees_cream".to_string() }
fn default_model_dir() -> String { "models".to_string() }

impl Default for GarmentConfig {
    fn default() -> Self {
        Self {
            selected: default_selected(),
            model_dir: default_model_dir(),
            catalog: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// 読めなければ警告を出して既定値
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{}: {:#}, using defaults", path.display(), e);
                Self::default()
            }
        }
    }
}
