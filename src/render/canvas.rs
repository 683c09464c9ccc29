use crate::pose::keypoint::{find_keypoint, Keypoint};
use crate::pose::KeypointIndex;
use crate::render::skeleton::{
    DEPTH_FAR_COLOR, DEPTH_NEAR_COLOR, DRAW_MIN_SCORE, KEYPOINT_COLOR, SKELETON_COLOR, SKELETON_CONNECTIONS,
};

/// 骨格線の太さ（ピクセル）
const LINE_WIDTH: i32 = 3;
/// キーポイントの半径
const POINT_RADIUS: i32 = 5;
/// z 1.0 あたりのゲージ長（ピクセル）
const DEPTH_GAUGE_SCALE: f32 = 100.0;
const DEPTH_GAUGE_MAX: i32 = 60;

/// 0RGB のピクセルバッファ
pub struct Canvas {
    buffer: Vec<u32>,
    width: usize,
    height: usize,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            buffer: vec![0u32; width * height],
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn buffer(&self) -> &[u32] {
        &self.buffer
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x < self.width && y < self.height {
            Some(self.buffer[y * self.width + x])
        } else {
            None
        }
    }

    pub fn clear(&mut self, color: u32) {
        self.buffer.fill(color);
    }

    /// 姿勢を描画
    ///
    /// 信頼度 0.5 以上の点と、両端がそれを満たす骨格線。肩には奥行きゲージを添える。
    pub fn draw_pose(&mut self, keypoints: &[Keypoint]) {
        for (start_idx, end_idx) in SKELETON_CONNECTIONS.iter() {
            let start = find_keypoint(keypoints, *start_idx as usize);
            let end = find_keypoint(keypoints, *end_idx as usize);

            if let (Some(start), Some(end)) = (start, end) {
                if start.is_valid(DRAW_MIN_SCORE) && end.is_valid(DRAW_MIN_SCORE) {
                    let (x1, y1) = start.to_pixel();
                    let (x2, y2) = end.to_pixel();
                    self.draw_line(x1, y1, x2, y2, LINE_WIDTH, SKELETON_COLOR);
                }
            }
        }

        for kp in keypoints.iter().filter(|kp| kp.is_valid(DRAW_MIN_SCORE)) {
            let (px, py) = kp.to_pixel();
            self.fill_circle(px, py, POINT_RADIUS, KEYPOINT_COLOR);

            let shoulder = kp.index == KeypointIndex::LeftShoulder as usize
                || kp.index == KeypointIndex::RightShoulder as usize;
            if shoulder {
                self.draw_depth_gauge(px, py, kp.z);
            }
        }
    }

    /// 点の右上に z の大きさを横棒で表示（手前はシアン、奥はオレンジ）
    pub fn draw_depth_gauge(&mut self, x: i32, y: i32, z: f32) {
        let len = ((z.abs() * DEPTH_GAUGE_SCALE).round() as i32).min(DEPTH_GAUGE_MAX);
        if len <= 0 {
            return;
        }
        let color = if z < 0.0 { DEPTH_NEAR_COLOR } else { DEPTH_FAR_COLOR };
        self.fill_rect(x + 8, y - 9, len, 3, color);
    }

    /// 装着点を十字で描画
    pub fn draw_anchor(&mut self, x: f32, y: f32, color: u32) {
        let (cx, cy) = (x.round() as i32, y.round() as i32);
        self.draw_line(cx - 8, cy, cx + 8, cy, 1, color);
        self.draw_line(cx, cy - 8, cx, cy + 8, 1, color);
        self.fill_circle(cx, cy, 2, color);
    }

    /// 太さ付きの線（長い方の軸で等間隔に正方形のブラシを置く）
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, width: i32, color: u32) {
        let width = width.max(1);
        let half = (width - 1) / 2;
        let steps = (x1 - x0).abs().max((y1 - y0).abs());
        if steps == 0 {
            self.fill_rect(x0 - half, y0 - half, width, width, color);
            return;
        }

        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let x = x0 as f32 + (x1 - x0) as f32 * t;
            let y = y0 as f32 + (y1 - y0) as f32 * t;
            self.fill_rect(x.round() as i32 - half, y.round() as i32 - half, width, width, color);
        }
    }

    /// 塗りつぶし円（行ごとに横幅を求めて埋める）
    pub fn fill_circle(&mut self, cx: i32, cy: i32, radius: i32, color: u32) {
        let r2 = radius * radius;
        for dy in -radius..=radius {
            let half = ((r2 - dy * dy) as f32).sqrt() as i32;
            self.fill_span(cy + dy, cx - half, cx + half, color);
        }
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: u32) {
        for row in y..y + h {
            self.fill_span(row, x, x + w - 1, color);
        }
    }

    /// 1行の [x0, x1] を塗る（画面外は切り詰め）
    fn fill_span(&mut self, y: i32, x0: i32, x1: i32, color: u32) {
        if y < 0 || y >= self.height as i32 || self.width == 0 {
            return;
        }
        let x0 = x0.max(0);
        let x1 = x1.min(self.width as i32 - 1);
        if x0 > x1 {
            return;
        }
        let row = y as usize * self.width;
        self.buffer[row + x0 as usize..=row + x1 as usize].fill(color);
    }
}
