use std::fmt::Write as _;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::AppError;

/// 默认图表尺寸，与原始渲染保持一致
pub const DEFAULT_WIDTH: u32 = 150;
pub const DEFAULT_HEIGHT: u32 = 40;

const STROKE_COLOR: &str = "rgb(49,56,96)";
const STROKE_WIDTH: u32 = 3;

/// 抽象：数值序列 -> 编码后的图片字符串
pub trait ChartRenderer: Send + Sync {
    fn render(&self, series: &[i64], width: u32, height: u32) -> Result<String, AppError>;
}

/// 具体实现：无坐标轴、无图例的平滑 SVG 折线，base64 data URL 输出
pub struct SvgSparklineRenderer;

impl SvgSparklineRenderer {
    pub fn new() -> Self {
        Self
    }

    fn points(series: &[i64], width: f64, height: f64) -> Vec<(f64, f64)> {
        let n = series.len();
        if n == 0 {
            return vec![(0.0, height / 2.0), (width, height / 2.0)];
        }
        if n == 1 {
            return vec![(0.0, height / 2.0), (width, height / 2.0)];
        }

        let min = *series.iter().min().unwrap() as f64;
        let max = *series.iter().max().unwrap() as f64;
        let pad = STROKE_WIDTH as f64 / 2.0;
        let usable = height - 2.0 * pad;
        let step = width / (n as f64 - 1.0);

        series
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let x = i as f64 * step;
                let y = if max > min {
                    pad + usable - (v as f64 - min) / (max - min) * usable
                } else {
                    height / 2.0
                };
                (x, y)
            })
            .collect()
    }

    /// 过中点的二次贝塞尔平滑路径
    fn smooth_path(points: &[(f64, f64)]) -> String {
        let mut path = String::new();
        let _ = write!(path, "M{:.1},{:.1}", points[0].0, points[0].1);
        for i in 1..points.len() {
            let (px, py) = points[i - 1];
            let (cx, cy) = points[i];
            let mx = (px + cx) / 2.0;
            let my = (py + cy) / 2.0;
            let _ = write!(path, " Q{:.1},{:.1} {:.1},{:.1}", px, py, mx, my);
        }
        let last = points[points.len() - 1];
        let _ = write!(path, " L{:.1},{:.1}", last.0, last.1);
        path
    }
}

impl Default for SvgSparklineRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartRenderer for SvgSparklineRenderer {
    fn render(&self, series: &[i64], width: u32, height: u32) -> Result<String, AppError> {
        if width == 0 || height == 0 {
            return Err(AppError::MalformedInput(format!(
                "invalid chart size: {}x{}",
                width, height
            )));
        }

        let w = width as f64;
        let h = height as f64;
        let points = Self::points(series, w, h);
        let line = Self::smooth_path(&points);
        // 闭合到底边做渐变填充
        let fill = format!("{} L{:.1},{:.1} L0.0,{:.1} Z", line, w, h, h);

        let svg = format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
                r#"<defs><linearGradient id="g" x1="0" y1="0" x2="0" y2="1">"#,
                r#"<stop offset="0" stop-color="{color}" stop-opacity="1"/>"#,
                r#"<stop offset="1" stop-color="{color}" stop-opacity="0.7"/>"#,
                r#"</linearGradient></defs>"#,
                r#"<path d="{fill}" fill="url(#g)" stroke="none"/>"#,
                r#"<path d="{line}" fill="none" stroke="{color}" stroke-width="{sw}"/>"#,
                r#"</svg>"#
            ),
            w = width,
            h = height,
            color = STROKE_COLOR,
            fill = fill,
            line = line,
            sw = STROKE_WIDTH,
        );

        Ok(format!(
            "data:image/svg+xml;base64,{}",
            STANDARD.encode(svg.as_bytes())
        ))
    }
}
