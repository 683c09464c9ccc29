use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;

use garment_overlay::config::Config;
use garment_overlay::device::Viewport;
use garment_overlay::garment::display_name;
use garment_overlay::logging;
use garment_overlay::pose::detector::load_recording;
use garment_overlay::pose::{DetectionClock, KeypointIndex, PoseDetector, PoseFrame, ReplayDetector};
use garment_overlay::render::skeleton::{ANCHOR_COLOR, STALE_ANCHOR_COLOR};
use garment_overlay::render::{Key, MinifbRenderer};
use garment_overlay::tracker::{resolve_anchor, FrameInput, TrackingPhase, TrackingSession};

/// 記録を再生しながら骨格と装着点を表示する
#[derive(Parser, Debug)]
#[command(version = env!("GIT_VERSION"))]
struct Args {
    #[arg(long)]
    input: PathBuf,
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
    #[arg(long, default_value_t = 960)]
    width: usize,
    #[arg(long, default_value_t = 720)]
    height: usize,
    /// 最後まで再生したら先頭に戻る
    #[arg(long)]
    repeat: bool,
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init("viewer", args.log_level)?;
    info!("Overlay Viewer ({})", env!("GIT_VERSION"));
    info!("ESC: exit, G: next garment");

    let config = Config::load_or_default(&args.config);
    let frames = load_recording(&args.input)?;
    let viewport = Viewport::new(args.width as f32, args.height as f32);
    let mut session = TrackingSession::new(&config, viewport)?;
    let garments: Vec<String> = session.catalog().ids().map(str::to_string).collect();

    let mut renderer = MinifbRenderer::new("Overlay Viewer", args.width, args.height)?;
    let mut detector = ReplayDetector;
    let mut clock = DetectionClock::new();

    'outer: loop {
        let start = Instant::now();
        for frame in &frames {
            if !renderer.is_open() {
                break 'outer;
            }
            let now = start + Duration::from_secs_f64(frame.t_ms.max(0.0) / 1000.0);
            tokio::time::sleep_until(now.into()).await;

            if renderer.is_key_pressed(Key::G) && !garments.is_empty() {
                let pos = garments
                    .iter()
                    .position(|g| g == session.catalog().selected())
                    .unwrap_or(0);
                let next = &garments[(pos + 1) % garments.len()];
                session.select_garment(next)?;
                info!("garment: {}", display_name(next));
            }

            let timestamp = clock.next(start.elapsed().as_secs_f64() * 1000.0);
            let landmarks = detector.detect(frame, timestamp)?;
            let output = session.advance(FrameInput {
                landmarks,
                frame_size: viewport,
                viewport,
                now,
            });

            let canvas = renderer.canvas();
            canvas.clear(0x202020);
            if let Some(pose) = &output.pose {
                canvas.draw_pose(&pose.keypoints);

                let pose_frame = PoseFrame::new(pose.keypoints.clone());
                let anchor = resolve_anchor(
                    pose_frame.get(KeypointIndex::LeftShoulder),
                    pose_frame.get(KeypointIndex::RightShoulder),
                    session.profile(),
                );
                if let Some(anchor) = anchor {
                    let color = if output.phase == TrackingPhase::Tracking {
                        ANCHOR_COLOR
                    } else {
                        STALE_ANCHOR_COLOR
                    };
                    canvas.draw_anchor(anchor.x, anchor.y, color);
                }
            }

            let size = output.size.map(|s| s.label()).unwrap_or_else(|| "-".to_string());
            renderer.set_title(&format!(
                "Overlay Viewer - {} - {} - {}",
                display_name(&output.garment),
                output.phase,
                size
            ));
            renderer.update()?;
        }
        if !args.repeat {
            break;
        }
    }

    info!("Shutting down...");
    Ok(())
}
