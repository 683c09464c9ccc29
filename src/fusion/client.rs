//! 深度推定サービスのクライアント
//!
//! フレーム処理はネットワークを待たない。リクエストは tokio タスクで実行し、
//! 結果は後のフレームで oneshot から受け取る。破棄時は実行中のリクエストを中断する。

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::limiter::RateLimiter;
use super::result::{DepthEstimate, FusedPose, FusionError, FusionResult};
use crate::config::FusionConfig;
use crate::pose::Keypoint;

/// 深度・スケールの推定サービス
pub trait DepthService: Send + Sync {
    fn fuse(&self, keypoints: Vec<Keypoint>) -> BoxFuture<'static, Result<Value, FusionError>>;
}

/// 送信形式のキーポイント（`name` はランドマーク番号）
#[derive(Debug, Serialize)]
struct WireKeypoint {
    name: String,
    x: f32,
    y: f32,
    z: f32,
    score: f32,
}

#[derive(Debug, Serialize)]
struct FuseRequest {
    keypoints: Vec<WireKeypoint>,
}

impl FuseRequest {
    fn new(keypoints: &[Keypoint]) -> Self {
        Self {
            keypoints: keypoints
                .iter()
                .map(|kp| WireKeypoint {
                    name: kp.index.to_string(),
                    x: kp.x,
                    y: kp.y,
                    z: kp.z,
                    score: kp.score,
                })
                .collect(),
        }
    }
}

/// HTTP + JSON の推定エンドポイント
pub struct HttpDepthService {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    timeout: Option<Duration>,
}

impl HttpDepthService {
    pub fn new(url: &str, token: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.to_string(),
            token,
            timeout,
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> FusionError {
    if e.is_timeout() {
        FusionError::Timeout
    } else if e.is_decode() {
        FusionError::Malformed(e.to_string())
    } else {
        FusionError::Transport(e)
    }
}

impl DepthService for HttpDepthService {
    fn fuse(&self, keypoints: Vec<Keypoint>) -> BoxFuture<'static, Result<Value, FusionError>> {
        let mut request = self.client.post(&self.url).json(&FuseRequest::new(&keypoints));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        async move {
            let response = request.send().await.map_err(map_reqwest_error)?;
            let status = response.status();
            if !status.is_success() {
                return Err(FusionError::Status(status.as_u16()));
            }
            response.json::<Value>().await.map_err(map_reqwest_error)
        }
        .boxed()
    }
}

struct Pending {
    rx: oneshot::Receiver<FusionResult>,
    task: JoinHandle<()>,
}

/// 最新の深度推定を毎フレームのキーポイントに合成する
///
/// サービスへの問い合わせは `min_interval` に1回まで。
pub struct DepthFusionClient {
    service: Option<Arc<dyn DepthService>>,
    limiter: RateLimiter,
    pending: Option<Pending>,
    last_complete: Option<DepthEstimate>,
    requests_sent: u64,
}

impl DepthFusionClient {
    pub fn new(service: Option<Arc<dyn DepthService>>, min_interval: Duration) -> Self {
        Self {
            service,
            limiter: RateLimiter::new(min_interval),
            pending: None,
            last_complete: None,
            requests_sent: 0,
        }
    }

    /// サービスなし（キーポイントのみ）
    pub fn disabled() -> Self {
        Self::new(None, Duration::from_millis(1000))
    }

    pub fn from_config(config: &FusionConfig) -> Result<Self> {
        let min_interval = Duration::from_millis(config.min_interval_ms);
        let url = match (&config.url, config.enabled) {
            (Some(url), true) => url,
            _ => return Ok(Self::new(None, min_interval)),
        };
        let timeout = config.timeout_ms.map(Duration::from_millis);
        let service: Arc<dyn DepthService> =
            Arc::new(HttpDepthService::new(url, config.token.clone(), timeout)?);
        Ok(Self::new(Some(service), min_interval))
    }

    pub fn is_enabled(&self) -> bool {
        self.service.is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn last_depth(&self) -> Option<&DepthEstimate> {
        self.last_complete.as_ref()
    }

    pub fn requests_sent(&self) -> u64 {
        self.requests_sent
    }

    /// 毎フレーム呼ぶ
    ///
    /// 完了した応答を取り込み、間隔が空いていて実行中のものがなければ送信する。
    /// 戻り値は現在のキーポイントと最新の深度推定の合成。
    pub fn maybe_send_for_fusion(&mut self, keypoints: &[Keypoint], now: Instant) -> FusedPose {
        self.poll_pending();
        if self.service.is_some() && self.pending.is_none() && self.limiter.try_acquire(now) {
            self.dispatch(keypoints);
        }
        self.emit(keypoints)
    }

    /// 送信せずに合成だけ
    pub fn emit(&self, keypoints: &[Keypoint]) -> FusedPose {
        match &self.last_complete {
            Some(depth) => FusedPose::with_depth(keypoints.to_vec(), depth.clone()),
            None => FusedPose::keypoints_only(keypoints.to_vec()),
        }
    }

    /// 完了した応答をブロックせずに取り込む
    pub fn poll_pending(&mut self) {
        let result = match self.pending.as_mut() {
            Some(pending) => match pending.rx.try_recv() {
                Ok(result) => result,
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Closed) => FusionResult::Failed(FusionError::Cancelled),
            },
            None => return,
        };
        self.pending = None;
        self.apply(result);
    }

    /// 実行中のリクエストを待つ
    pub async fn flush(&mut self) {
        if let Some(pending) = self.pending.take() {
            let result = pending
                .rx
                .await
                .unwrap_or_else(|_| FusionResult::Failed(FusionError::Cancelled));
            self.apply(result);
        }
    }

    /// 実行中のリクエストを中断（結果は反映しない）
    pub fn shutdown(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.task.abort();
            debug!("fusion request aborted on shutdown");
        }
    }

    /// 中断に加えて深度推定と送信間隔も初期化
    pub fn reset(&mut self) {
        self.shutdown();
        self.last_complete = None;
        self.limiter.reset();
    }

    fn dispatch(&mut self, keypoints: &[Keypoint]) {
        let service = match &self.service {
            Some(service) => Arc::clone(service),
            None => return,
        };
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("no async runtime; skipping fusion request");
                return;
            }
        };

        let (tx, rx) = oneshot::channel();
        let request = service.fuse(keypoints.to_vec());
        let task = handle.spawn(async move {
            let result = FusionResult::classify(request.await);
            // 受信側が破棄済みなら結果は捨てる
            let _ = tx.send(result);
        });

        self.requests_sent += 1;
        debug!(count = self.requests_sent, keypoints = keypoints.len(), "fusion request dispatched");
        self.pending = Some(Pending { rx, task });
    }

    fn apply(&mut self, result: FusionResult) {
        match result {
            FusionResult::Complete(depth) => {
                debug!(
                    scale_factor = depth.scale_factor,
                    average_depth_cm = depth.average_depth_cm,
                    "depth estimate updated"
                );
                self.last_complete = Some(depth);
            }
            FusionResult::Partial => {
                warn!("fusion response without depth fields; keeping previous estimate");
            }
            FusionResult::Failed(e) => {
                warn!(error = %e, "fusion failed; keeping previous estimate");
            }
        }
    }
}

impl Drop for DepthFusionClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}
