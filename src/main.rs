use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;

use garment_overlay::config::Config;
use garment_overlay::device::Viewport;
use garment_overlay::garment::display_name;
use garment_overlay::logging;
use garment_overlay::pose::detector::load_recording;
use garment_overlay::pose::{DetectionClock, PoseDetector, ReplayDetector};
use garment_overlay::tracker::{FrameInput, FrameOutput, TrackingSession};

/// 記録済みの姿勢推定結果を再生し、フレームごとの装着結果を出力する
#[derive(Parser, Debug)]
#[command(version = env!("GIT_VERSION"))]
struct Args {
    /// JSON Lines の記録ファイル
    #[arg(long)]
    input: PathBuf,
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
    /// 深度推定サービスのURL（設定ファイルより優先）
    #[arg(long)]
    fuse_url: Option<String>,
    /// 衣服ID
    #[arg(long)]
    garment: Option<String>,
    #[arg(long, default_value_t = 1280.0)]
    width: f32,
    #[arg(long, default_value_t = 720.0)]
    height: f32,
    /// 記録の時刻どおりに待ちながら再生
    #[arg(long)]
    realtime: bool,
    /// フレームごとの出力を JSON にする
    #[arg(long)]
    json: bool,
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init("overlay", args.log_level)?;
    info!("Garment Overlay ({})", env!("GIT_VERSION"));

    let mut config = Config::load_or_default(&args.config);
    if let Some(url) = &args.fuse_url {
        config.fusion.url = Some(url.clone());
    }
    if let Some(garment) = &args.garment {
        config.garment.selected = garment.clone();
    }

    let frames = load_recording(&args.input)?;
    info!("{} frames from {}", frames.len(), args.input.display());

    let viewport = Viewport::new(args.width, args.height);
    let mut session = TrackingSession::new(&config, viewport)?;
    info!(
        "garment: {} ({}), device: {:?}, fusion: {}",
        display_name(session.catalog().selected()),
        session
            .catalog()
            .selected_model()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        session.profile().class,
        if session.fusion().is_enabled() { "on" } else { "off" }
    );

    let mut detector = ReplayDetector;
    let mut clock = DetectionClock::new();
    let start = Instant::now();
    let mut visible_frames = 0usize;

    for frame in &frames {
        let offset = Duration::from_secs_f64(frame.t_ms.max(0.0) / 1000.0);
        let now = start + offset;
        if args.realtime {
            tokio::time::sleep_until(now.into()).await;
        } else if session.fusion().is_pending() {
            // 記録の時刻は実時間より速く進むので、応答を待ってから次のフレームへ
            // （HTTPタイムアウトで上限あり）
            session.fusion_mut().flush().await;
        }

        let timestamp = clock.next(frame.t_ms);
        let landmarks = match detector.detect(frame, timestamp) {
            Ok(l) => l,
            Err(e) => {
                warn!("detect failed at {:.1}ms: {:#}", frame.t_ms, e);
                None
            }
        };

        let output = session.advance(FrameInput {
            landmarks,
            frame_size: viewport,
            viewport,
            now,
        });
        if output.visible {
            visible_frames += 1;
        }

        if args.json {
            println!("{}", serde_json::to_string(&output)?);
        } else {
            println!("{}", format_line(frame.t_ms, &output));
        }
    }

    session.fusion_mut().flush().await;
    info!(
        "done: {} frames, {} visible, {} fusion requests, final phase {}",
        frames.len(),
        visible_frames,
        session.fusion().requests_sent(),
        session.phase()
    );
    Ok(())
}

fn format_line(t_ms: f64, output: &FrameOutput) -> String {
    let mut line = format!("{:>9.1}ms {:<8}", t_ms, output.phase.to_string());
    match (&output.transform, output.visible) {
        (Some(t), true) => line.push_str(&format!(
            " pos=({:+.3}, {:+.3}, {:+.3}) yaw={:+.3} scale={:.3}",
            t.position[0], t.position[1], t.position[2], t.rotation[1], t.scale
        )),
        (Some(_), false) => line.push_str(" hidden"),
        (None, _) => line.push_str(" -"),
    }
    if let Some(q) = output.quality.as_ref().and_then(|q| q.issue) {
        line.push_str(&format!(" [{}]", q));
    }
    if let Some(size) = output.size {
        line.push_str(&format!(" size={}", size.label()));
    }
    line
}
