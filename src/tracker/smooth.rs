use crate::config::FilterConfig;
use crate::device::DeviceProfile;
use crate::pose::keypoint::{find_keypoint, Keypoint};

/// 信頼度が閾値以上のキーポイントだけを残す（順序は保持）
///
/// 閾値省略時はデバイス既定値。
pub fn filter_valid(keypoints: &[Keypoint], threshold: Option<f32>, profile: &DeviceProfile) -> Vec<Keypoint> {
    let threshold = threshold.unwrap_or(profile.confidence_threshold);
    keypoints
        .iter()
        .filter(|kp| kp.is_valid(threshold))
        .copied()
        .collect()
}

/// 成分ごとのEMA
///
/// x/y/z のみ平滑化し score はそのまま。前フレームに同じ番号がなければ素通し。
pub fn smooth_keypoints(
    prev: Option<&[Keypoint]>,
    current: &[Keypoint],
    alpha: Option<f32>,
    profile: &DeviceProfile,
) -> Vec<Keypoint> {
    let prev = match prev {
        Some(prev) => prev,
        None => return current.to_vec(),
    };
    let a = alpha.unwrap_or(profile.smoothing_alpha);

    current
        .iter()
        .map(|kp| match find_keypoint(prev, kp.index) {
            Some(p) => Keypoint {
                x: a * kp.x + (1.0 - a) * p.x,
                y: a * kp.y + (1.0 - a) * p.y,
                z: a * kp.z + (1.0 - a) * p.z,
                ..*kp
            },
            None => *kp,
        })
        .collect()
}

/// フレーム間で前回の平滑化結果を保持するスムーザー
pub struct KeypointSmoother {
    /// None ならデバイス既定値
    alpha: Option<f32>,
    prev: Option<Vec<Keypoint>>,
}

impl KeypointSmoother {
    pub fn new(alpha: Option<f32>) -> Self {
        Self { alpha, prev: None }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.alpha)
    }

    pub fn apply(&mut self, current: &[Keypoint], profile: &DeviceProfile) -> Vec<Keypoint> {
        let result = smooth_keypoints(self.prev.as_deref(), current, self.alpha, profile);
        self.prev = Some(result.clone());
        result
    }

    pub fn reset(&mut self) {
        self.prev = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Viewport;

    fn approx_eq_f32(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    fn desktop() -> DeviceProfile {
        DeviceProfile::from_viewport(Viewport::new(1280.0, 720.0))
    }

    fn mobile() -> DeviceProfile {
        DeviceProfile::from_viewport(Viewport::new(600.0, 900.0))
    }

    #[test]
    fn test_filter_valid_default_threshold() {
        let kps = vec![
            Keypoint::new(0, 0.0, 0.0, 0.0, 0.35),
            Keypoint::new(1, 0.0, 0.0, 0.0, 0.2),
            Keypoint::new(2, 0.0, 0.0, 0.0, 0.9),
        ];
        // デスクトップは 0.3、モバイルは 0.4
        let d: Vec<usize> = filter_valid(&kps, None, &desktop()).iter().map(|k| k.index).collect();
        let m: Vec<usize> = filter_valid(&kps, None, &mobile()).iter().map(|k| k.index).collect();
        assert_eq!(d, vec![0, 2]);
        assert_eq!(m, vec![2]);
    }

    #[test]
    fn test_filter_valid_explicit_threshold() {
        let kps = vec![
            Keypoint::new(0, 0.0, 0.0, 0.0, 0.5),
            Keypoint::new(1, 0.0, 0.0, 0.0, 0.49),
        ];
        let out = filter_valid(&kps, Some(0.5), &desktop());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].index, 0);
    }

    #[test]
    fn test_first_frame_passthrough() {
        let cur = vec![Keypoint::new(0, 10.0, 20.0, 0.1, 0.9)];
        assert_eq!(smooth_keypoints(None, &cur, None, &desktop()), cur);
    }

    #[test]
    fn test_position_smoothing() {
        let prev = vec![Keypoint::new(0, 0.0, 0.0, 0.0, 0.9)];
        let cur = vec![Keypoint::new(0, 2.0, 4.0, 6.0, 0.5)];
        let out = smooth_keypoints(Some(&prev), &cur, Some(0.5), &desktop());
        assert!(approx_eq_f32(out[0].x, 1.0, 1e-6));
        assert!(approx_eq_f32(out[0].y, 2.0, 1e-6));
        assert!(approx_eq_f32(out[0].z, 3.0, 1e-6));
        // score は平滑化しない
        assert_eq!(out[0].score, 0.5);
    }

    #[test]
    fn test_default_alpha_by_device() {
        let prev = vec![Keypoint::new(0, 0.0, 0.0, 0.0, 0.9)];
        let cur = vec![Keypoint::new(0, 10.0, 0.0, 0.0, 0.9)];
        let out = smooth_keypoints(Some(&prev), &cur, None, &desktop());
        assert!(approx_eq_f32(out[0].x, 6.0, 1e-5));
        let small = DeviceProfile::from_viewport(Viewport::new(400.0, 800.0));
        let out = smooth_keypoints(Some(&prev), &cur, None, &small);
        assert!(approx_eq_f32(out[0].x, 5.0, 1e-5));
    }

    #[test]
    fn test_new_index_passes_through() {
        let prev = vec![Keypoint::new(0, 0.0, 0.0, 0.0, 0.9)];
        let cur = vec![
            Keypoint::new(0, 10.0, 10.0, 0.0, 0.9),
            Keypoint::new(5, 50.0, 60.0, 0.2, 0.9),
        ];
        let out = smooth_keypoints(Some(&prev), &cur, Some(0.5), &desktop());
        assert_eq!(out[1], cur[1]);
    }

    #[test]
    fn test_stationary_signal_is_fixed_point() {
        let k = vec![
            Keypoint::new(0, 123.4, 56.7, -0.3, 0.8),
            Keypoint::new(11, 300.0, 200.0, 0.05, 0.9),
        ];
        for &alpha in &[0.0, 0.1, 0.5, 0.55, 0.6, 0.99, 1.0] {
            let mut out = k.clone();
            for _ in 0..20 {
                out = smooth_keypoints(Some(&k), &out, Some(alpha), &desktop());
            }
            for (a, b) in out.iter().zip(k.iter()) {
                assert!(approx_eq_f32(a.x, b.x, 1e-3), "alpha={}", alpha);
                assert!(approx_eq_f32(a.y, b.y, 1e-3), "alpha={}", alpha);
                assert!(approx_eq_f32(a.z, b.z, 1e-5), "alpha={}", alpha);
            }
        }
    }

    #[test]
    fn test_smoother_keeps_state_and_resets() {
        let mut s = KeypointSmoother::new(Some(0.5));
        let p = desktop();
        s.apply(&[Keypoint::new(0, 0.0, 0.0, 0.0, 0.9)], &p);
        let out = s.apply(&[Keypoint::new(0, 4.0, 0.0, 0.0, 0.9)], &p);
        assert!(approx_eq_f32(out[0].x, 2.0, 1e-6));
        let out = s.apply(&[Keypoint::new(0, 4.0, 0.0, 0.0, 0.9)], &p);
        assert!(approx_eq_f32(out[0].x, 3.0, 1e-6));

        s.reset();
        let out = s.apply(&[Keypoint::new(0, 8.0, 0.0, 0.0, 0.9)], &p);
        assert_eq!(out[0].x, 8.0);
    }
}
