use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::normalize::RawLandmark;

/// 姿勢推定器の境界
///
/// モデル本体は外部。1フレームにつき 0 人または 1 人分のランドマークを返す。
/// `timestamp_ms` は厳密に増加していなければならない（[`DetectionClock`] を使う）。
pub trait PoseDetector {
    type Frame;

    fn detect(&mut self, frame: &Self::Frame, timestamp_ms: f64) -> Result<Option<Vec<RawLandmark>>>;
}

/// 検出器に渡すタイムスタンプを単調増加にする
#[derive(Debug, Default)]
pub struct DetectionClock {
    last: Option<f64>,
}

impl DetectionClock {
    pub fn new() -> Self {
        Self { last: None }
    }

    /// 時計が進んでいなければ前回 + 1ms を返す
    pub fn next(&mut self, now_ms: f64) -> f64 {
        let ts = match self.last {
            Some(last) if now_ms <= last => last + 1.0,
            _ => now_ms,
        };
        self.last = Some(ts);
        ts
    }
}

/// 記録済みフレーム (JSON Lines 1行分)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedFrame {
    /// 記録開始からの経過時間（ミリ秒）
    pub t_ms: f64,
    /// 未検出フレームは空
    #[serde(default)]
    pub landmarks: Vec<RawLandmark>,
}

/// JSON Lines を読み込む。空行は無視。
pub fn load_recording<P: AsRef<Path>>(path: P) -> Result<Vec<RecordedFrame>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_recording(&content)
}

pub fn parse_recording(content: &str) -> Result<Vec<RecordedFrame>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("invalid frame at line {}", i + 1))
        })
        .collect()
}

/// 記録を再生する検出器
///
/// フレームそのものが記録なので、ランドマークをそのまま返す。
pub struct ReplayDetector;

impl PoseDetector for ReplayDetector {
    type Frame = RecordedFrame;

    fn detect(&mut self, frame: &RecordedFrame, _timestamp_ms: f64) -> Result<Option<Vec<RawLandmark>>> {
        if frame.landmarks.is_empty() {
            Ok(None)
        } else {
            Ok(Some(frame.landmarks.clone()))
        }
    }
}
