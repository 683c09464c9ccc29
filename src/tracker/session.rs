use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use super::anchor::{resolve_frame_anchor, Orientation};
use super::kalman::StaticGainFilter;
use super::retention::{AttachmentState, TrackingPhase};
use super::smooth::KeypointSmoother;
use crate::config::Config;
use crate::device::{DeviceProfile, Viewport};
use crate::fusion::{DepthFusionClient, FusedPose};
use crate::garment::{GarmentCatalog, ShirtSize};
use crate::pose::{normalize_landmarks, PoseFrame, PoseGate, PoseQuality, RawLandmark};
use crate::projection::{AttachmentTransform, ScreenProjector};

/// 1フレーム分の入力
#[derive(Debug, Clone)]
pub struct FrameInput {
    /// 検出器の出力（検出なしは None）
    pub landmarks: Option<Vec<RawLandmark>>,
    /// 入力映像のサイズ
    pub frame_size: Viewport,
    /// 描画先のサイズ
    pub viewport: Viewport,
    pub now: Instant,
}

/// 1フレーム分の出力
#[derive(Debug, Clone, Serialize)]
pub struct FrameOutput {
    pub phase: TrackingPhase,
    /// 描画に使う変換（まだ一度も装着していなければ None）
    pub transform: Option<AttachmentTransform>,
    pub visible: bool,
    pub pose: Option<FusedPose>,
    #[serde(skip)]
    pub quality: Option<PoseQuality>,
    pub garment: String,
    pub size: Option<ShirtSize>,
}

/// 検出結果から衣服の装着変換までをフレームごとに進めるセッション
///
/// 状態はすべてここに閉じており、`advance` だけが更新する。
pub struct TrackingSession {
    profile: DeviceProfile,
    smoother: KeypointSmoother,
    static_gain: Option<StaticGainFilter>,
    gate: PoseGate,
    fusion: DepthFusionClient,
    retention: AttachmentState,
    projector: ScreenProjector,
    catalog: GarmentCatalog,
}

impl TrackingSession {
    pub fn new(config: &Config, viewport: Viewport) -> Result<Self> {
        let fusion = DepthFusionClient::from_config(&config.fusion)?;
        Self::with_fusion(config, viewport, fusion)
    }

    /// 深度推定クライアントを差し替えて構築
    pub fn with_fusion(config: &Config, viewport: Viewport, fusion: DepthFusionClient) -> Result<Self> {
        let profile = DeviceProfile::from_viewport(viewport);
        Ok(Self {
            profile,
            smoother: KeypointSmoother::from_config(&config.filter),
            static_gain: config
                .filter
                .static_gain
                .then(|| StaticGainFilter::from_config(&config.filter)),
            gate: PoseGate::from_config(&config.gate),
            fusion,
            retention: AttachmentState::from_config(&config.retention),
            projector: ScreenProjector::new(config.projection.clone(), &profile),
            catalog: GarmentCatalog::from_config(&config.garment)?,
        })
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn phase(&self) -> TrackingPhase {
        self.retention.phase()
    }

    pub fn fusion(&self) -> &DepthFusionClient {
        &self.fusion
    }

    pub fn fusion_mut(&mut self) -> &mut DepthFusionClient {
        &mut self.fusion
    }

    pub fn catalog(&self) -> &GarmentCatalog {
        &self.catalog
    }

    pub fn select_garment(&mut self, id: &str) -> Result<()> {
        self.catalog.select(id)
    }

    /// 1フレーム進める。失敗しても前回の装着を返すだけでエラーにはしない
    pub fn advance(&mut self, input: FrameInput) -> FrameOutput {
        if input.viewport != self.profile.viewport {
            self.profile = DeviceProfile::from_viewport(input.viewport);
            self.projector.set_profile(&self.profile);
            debug!(
                width = input.viewport.width,
                height = input.viewport.height,
                class = ?self.profile.class,
                "device profile updated"
            );
        }
        self.fusion.poll_pending();

        let landmarks = match input.landmarks {
            Some(l) if !l.is_empty() => l,
            _ => return self.rejected(None, None, input.now),
        };

        let raw = normalize_landmarks(&landmarks, input.frame_size.width, input.frame_size.height);
        let mut keypoints = self.smoother.apply(&raw, &self.profile);
        if let Some(filter) = self.static_gain.as_mut() {
            keypoints = filter.apply(&keypoints);
        }

        let quality = self.gate.evaluate(&keypoints, &self.profile);
        if !quality.is_valid {
            let current = self.fusion.emit(&keypoints);
            return self.rejected(Some(current), Some(quality), input.now);
        }

        let frame = PoseFrame::new(keypoints);
        let anchor = match resolve_frame_anchor(&frame, &self.profile) {
            Some(anchor) => anchor,
            None => {
                let current = self.fusion.emit(&frame.keypoints);
                return self.rejected(Some(current), Some(quality), input.now);
            }
        };
        let orientation = Orientation::resolve(&frame, &self.profile);

        let pose = self.fusion.maybe_send_for_fusion(&frame.keypoints, input.now);
        let transform = self.projector.update(Some(&anchor), &orientation, &self.profile);
        let phase = self.retention.accept(pose.clone(), anchor, orientation, input.now);

        self.output(phase, transform, Some(pose), Some(quality))
    }

    /// ゲート不通過・検出なしのフレーム
    fn rejected(&mut self, current: Option<FusedPose>, quality: Option<PoseQuality>, now: Instant) -> FrameOutput {
        let phase = self.retention.reject(now);
        let pose = match phase {
            TrackingPhase::Retained => self.retention.last_valid().map(|v| v.pose.clone()),
            _ => current,
        };
        // 装着は進めず、最後の変換を保持
        let transform = self.projector.hold();
        self.output(phase, transform, pose, quality)
    }

    fn output(
        &self,
        phase: TrackingPhase,
        transform: Option<AttachmentTransform>,
        pose: Option<FusedPose>,
        quality: Option<PoseQuality>,
    ) -> FrameOutput {
        let size = pose
            .as_ref()
            .and_then(FusedPose::scale_factor)
            .map(ShirtSize::from_scale_factor);
        FrameOutput {
            phase,
            visible: transform.is_some() && self.retention.is_visible(),
            transform,
            pose,
            quality,
            garment: self.catalog.selected().to_string(),
            size,
        }
    }

    /// 実行中の深度推定を中断して状態を初期化
    pub fn reset(&mut self) {
        self.fusion.reset();
        self.smoother.reset();
        if let Some(filter) = self.static_gain.as_mut() {
            filter.reset();
        }
        self.retention.reset();
        self.projector.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::{DepthService, FusionError};
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct FixedService {
        calls: AtomicUsize,
    }

    impl DepthService for FixedService {
        fn fuse(&self, _keypoints: Vec<crate::pose::Keypoint>) -> BoxFuture<'static, Result<Value, FusionError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(json!({ "scale_factor": 0.95, "average_depth_cm": 180.0 })) }.boxed()
        }
    }

    fn viewport() -> Viewport {
        Viewport::new(1000.0, 800.0)
    }

    /// 肩が (100,200) / (300,200) に来る33点
    fn landmarks(score: f32) -> Vec<RawLandmark> {
        (0..33)
            .map(|i| match i {
                11 => RawLandmark::new(0.1, 0.25, 0.0, Some(0.9)),
                12 => RawLandmark::new(0.3, 0.25, 0.0, Some(0.9)),
                _ => RawLandmark::new(0.2, 0.5, 0.0, Some(score)),
            })
            .collect()
    }

    fn input(landmarks: Option<Vec<RawLandmark>>, now: Instant) -> FrameInput {
        FrameInput {
            landmarks,
            frame_size: viewport(),
            viewport: viewport(),
            now,
        }
    }

    fn session() -> TrackingSession {
        TrackingSession::with_fusion(&Config::default(), viewport(), DepthFusionClient::disabled()).unwrap()
    }

    #[test]
    fn test_no_pose_before_first_detection() {
        let mut s = session();
        let out = s.advance(input(None, Instant::now()));
        assert_eq!(out.phase, TrackingPhase::NoPose);
        assert!(out.transform.is_none());
        assert!(!out.visible);
        assert!(out.pose.is_none());
        assert_eq!(out.garment, "busy_bees_cream");
    }

    #[test]
    fn test_valid_frame_tracks() {
        let mut s = session();
        let out = s.advance(input(Some(landmarks(0.9)), Instant::now()));
        assert_eq!(out.phase, TrackingPhase::Tracking);
        assert!(out.visible);
        let t = out.transform.unwrap();
        assert!((t.scale - 0.3333 * 1.55 * 1.7).abs() < 1e-3);
        assert!(out.quality.unwrap().is_valid);
        assert!(out.size.is_none());
    }

    #[test]
    fn test_retained_output_equals_last_valid() {
        let t0 = Instant::now();
        let mut s = session();
        let valid = s.advance(input(Some(landmarks(0.9)), t0));

        for ms in [16u64, 500, 1999] {
            let out = s.advance(input(None, t0 + Duration::from_millis(ms)));
            assert_eq!(out.phase, TrackingPhase::Retained);
            assert_eq!(out.transform, valid.transform);
            assert_eq!(out.pose, valid.pose);
            assert!(out.visible);
        }
    }

    #[test]
    fn test_low_quality_frame_is_retained() {
        let t0 = Instant::now();
        let mut s = session();
        let valid = s.advance(input(Some(landmarks(0.9)), t0));
        let out = s.advance(input(Some(landmarks(0.1)), t0 + Duration::from_millis(100)));
        assert_eq!(out.phase, TrackingPhase::Retained);
        assert_eq!(out.transform, valid.transform);
        assert!(!out.quality.unwrap().is_valid);
    }

    #[test]
    fn test_lost_hides_frozen_transform() {
        let t0 = Instant::now();
        let mut s = session();
        let valid = s.advance(input(Some(landmarks(0.9)), t0));
        let out = s.advance(input(None, t0 + Duration::from_millis(2500)));
        assert_eq!(out.phase, TrackingPhase::Lost);
        assert_eq!(out.transform, valid.transform);
        assert!(!out.visible);

        let out = s.advance(input(Some(landmarks(0.9)), t0 + Duration::from_millis(2600)));
        assert_eq!(out.phase, TrackingPhase::Tracking);
        assert!(out.visible);
    }

    #[test]
    fn test_viewport_change_updates_profile() {
        let mut s = session();
        let mut frame = input(Some(landmarks(0.9)), Instant::now());
        frame.viewport = Viewport::new(400.0, 700.0);
        s.advance(frame);
        assert_eq!(s.profile().class, crate::device::DeviceClass::Small);
    }

    #[tokio::test]
    async fn test_fusion_depth_reaches_output() {
        let service = Arc::new(FixedService {
            calls: AtomicUsize::new(0),
        });
        let dyn_service: Arc<dyn DepthService> = service.clone();
        let client = DepthFusionClient::new(Some(dyn_service), Duration::from_millis(1000));
        let mut s = TrackingSession::with_fusion(&Config::default(), viewport(), client).unwrap();

        let t0 = Instant::now();
        let out = s.advance(input(Some(landmarks(0.9)), t0));
        assert!(out.pose.unwrap().depth.is_none());
        s.fusion_mut().flush().await;

        let out = s.advance(input(Some(landmarks(0.9)), t0 + Duration::from_millis(33)));
        let pose = out.pose.unwrap();
        assert!(pose.is_depth_complete());
        assert_eq!(out.size, Some(ShirtSize::M));
        // 1秒以内は再送しない
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_width_viewport() {
        let t0 = Instant::now();
        let mut s = session();
        s.advance(input(Some(landmarks(0.9)), t0));

        // 最小化などで幅0が来ても落ちない
        let mut frame = input(Some(landmarks(0.9)), t0 + Duration::from_millis(16));
        frame.viewport = Viewport::new(0.0, 720.0);
        let out = s.advance(frame);
        assert_eq!(out.phase, TrackingPhase::Tracking);
        let t = out.transform.unwrap();
        assert!(t.position.iter().all(|v| v.is_finite()));
        assert!(t.scale.is_finite());

        let out = s.advance(input(Some(landmarks(0.9)), t0 + Duration::from_millis(33)));
        assert_eq!(s.profile().viewport, viewport());
        assert!(out.visible);
    }

    #[test]
    fn test_head_turned_keeps_tracking_and_holds_transform() {
        let t0 = Instant::now();
        let mut s = session();
        let first = s.advance(input(Some(landmarks(0.9)), t0));

        // 鼻が見えず肩は見えている
        let mut turned = landmarks(0.9);
        turned[0] = RawLandmark::new(0.2, 0.5, 0.0, Some(0.1));
        for ms in [16u64, 33, 50] {
            let out = s.advance(input(Some(turned.clone()), t0 + Duration::from_millis(ms)));
            assert_eq!(out.phase, TrackingPhase::Tracking);
            assert_eq!(out.transform, first.transform);
            assert!(out.visible);
        }

        let out = s.advance(input(Some(landmarks(0.9)), t0 + Duration::from_millis(66)));
        assert_ne!(out.transform, first.transform);
    }

    #[tokio::test]
    async fn test_reset_drops_previous_depth() {
        let service = Arc::new(FixedService {
            calls: AtomicUsize::new(0),
        });
        let dyn_service: Arc<dyn DepthService> = service.clone();
        let client = DepthFusionClient::new(Some(dyn_service), Duration::from_millis(1000));
        let mut s = TrackingSession::with_fusion(&Config::default(), viewport(), client).unwrap();

        let t0 = Instant::now();
        s.advance(input(Some(landmarks(0.9)), t0));
        s.fusion_mut().flush().await;
        assert!(s.fusion().last_depth().is_some());

        s.reset();
        let out = s.advance(input(Some(landmarks(0.9)), t0 + Duration::from_millis(50)));
        assert!(!out.pose.unwrap().is_depth_complete());
        assert_eq!(out.size, None);
        // 送信間隔も初期化されている
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_reset() {
        let mut s = session();
        s.advance(input(Some(landmarks(0.9)), Instant::now()));
        s.reset();
        assert_eq!(s.phase(), TrackingPhase::NoPose);
        assert!(s.advance(input(None, Instant::now())).transform.is_none());
    }
}
