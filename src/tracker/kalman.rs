//! 固定ゲイン補正
//!
//! `K = q / (q + r)` の固定ゲインで推定値に寄せるだけ。共分散を持つ
//! カルマンフィルタではなく、ゲインは変化しない。

use crate::config::FilterConfig;
use crate::pose::keypoint::{find_keypoint, Keypoint};

pub const DEFAULT_PROCESS_NOISE: f32 = 0.01;
pub const DEFAULT_MEASUREMENT_NOISE: f32 = 0.1;

/// x/y/z に `estimate + K * (measurement - estimate)`
///
/// 推定値がなければ観測値をそのまま返す。推定値にない番号は素通し。
pub fn apply_static_gain(
    measurements: &[Keypoint],
    estimates: Option<&[Keypoint]>,
    process_noise: f32,
    measurement_noise: f32,
) -> Vec<Keypoint> {
    let estimates = match estimates {
        Some(e) => e,
        None => return measurements.to_vec(),
    };
    let k = gain(process_noise, measurement_noise);

    measurements
        .iter()
        .map(|m| match find_keypoint(estimates, m.index) {
            Some(e) => Keypoint {
                x: e.x + k * (m.x - e.x),
                y: e.y + k * (m.y - e.y),
                z: e.z + k * (m.z - e.z),
                ..*m
            },
            None => *m,
        })
        .collect()
}

fn gain(process_noise: f32, measurement_noise: f32) -> f32 {
    let denom = process_noise + measurement_noise;
    if denom > 0.0 {
        process_noise / denom
    } else {
        1.0
    }
}

/// フレーム間で推定値を保持する
pub struct StaticGainFilter {
    process_noise: f32,
    measurement_noise: f32,
    estimate: Option<Vec<Keypoint>>,
}

impl StaticGainFilter {
    pub fn new(process_noise: f32, measurement_noise: f32) -> Self {
        Self {
            process_noise,
            measurement_noise,
            estimate: None,
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.process_noise, config.measurement_noise)
    }

    pub fn gain(&self) -> f32 {
        gain(self.process_noise, self.measurement_noise)
    }

    pub fn apply(&mut self, measurements: &[Keypoint]) -> Vec<Keypoint> {
        let out = apply_static_gain(
            measurements,
            self.estimate.as_deref(),
            self.process_noise,
            self.measurement_noise,
        );
        self.estimate = Some(out.clone());
        out
    }

    pub fn reset(&mut self) {
        self.estimate = None;
    }
}

impl Default for StaticGainFilter {
    fn default() -> Self {
        Self::new(DEFAULT_PROCESS_NOISE, DEFAULT_MEASUREMENT_NOISE)
    }
}
