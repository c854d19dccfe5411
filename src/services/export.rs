//! Export service: render the diagram to a fixed-size PNG.
//!
//! DESIGN
//! ======
//! The diagram is first written out as SVG in its own coordinate space
//! (node boxes, arrowed edges, edge labels), cropped to the content bounds.
//! resvg then rasterizes it onto a white 1524x798 canvas, scaled to fit and
//! centered. Small diagrams are not blown up past 2x.
//!
//! Rasterizing is CPU-bound; [`export_png`] runs it on the blocking pool.

use std::sync::{Arc, OnceLock};

use resvg::tiny_skia;
use resvg::usvg;

use crate::diagram::{Diagram, Node};

pub const EXPORT_WIDTH: u32 = 1524;
pub const EXPORT_HEIGHT: u32 = 798;
pub const EXPORT_FILENAME: &str = "flowchart.png";

pub const NODE_WIDTH: f64 = 150.0;
pub const NODE_HEIGHT: f64 = 40.0;
const PADDING: f64 = 20.0;
const MAX_SCALE: f32 = 2.0;

const DEFAULT_FILL: &str = "#ffffff";
const STROKE: &str = "#1a192b";
const EDGE_STROKE: &str = "#b1b1b7";
const FONT: &str = "Arial, Helvetica, sans-serif";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to parse generated SVG: {0}")]
    SvgParse(String),
    #[error("failed to allocate export pixmap")]
    PixmapAlloc,
    #[error("failed to encode PNG")]
    PngEncode,
    #[error("export task failed: {0}")]
    Join(String),
}

impl crate::error::ErrorCode for ExportError {
    fn error_code(&self) -> &'static str {
        "E_EXPORT_FAILED"
    }
}

// =============================================================================
// SVG
// =============================================================================

/// Content bounds in diagram space.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

fn bounds(nodes: &[Node]) -> Option<Bounds> {
    let first = nodes.first()?;
    let init = Bounds {
        min_x: first.position.x,
        min_y: first.position.y,
        max_x: first.position.x + NODE_WIDTH,
        max_y: first.position.y + NODE_HEIGHT,
    };
    Some(nodes.iter().fold(init, |b, n| Bounds {
        min_x: b.min_x.min(n.position.x),
        min_y: b.min_y.min(n.position.y),
        max_x: b.max_x.max(n.position.x + NODE_WIDTH),
        max_y: b.max_y.max(n.position.y + NODE_HEIGHT),
    }))
}

/// Render the diagram as a standalone SVG document. Returns `None` for an
/// empty diagram.
#[must_use]
pub fn render_svg(diagram: &Diagram) -> Option<String> {
    let b = bounds(&diagram.nodes)?;
    let width = b.max_x - b.min_x + 2.0 * PADDING;
    let height = b.max_y - b.min_y + 2.0 * PADDING;
    // Shift so the padded content starts at the origin.
    let dx = PADDING - b.min_x;
    let dy = PADDING - b.min_y;

    let mut svg = format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"##
    );
    svg.push_str(&format!(
        r##"<defs><marker id="arrow" viewBox="0 0 10 10" refX="10" refY="5" markerWidth="10" markerHeight="10" markerUnits="userSpaceOnUse" orient="auto"><path d="M0,0 L10,5 L0,10 z" fill="{EDGE_STROKE}"/></marker></defs>"##
    ));

    for edge in &diagram.edges {
        let (Some(source), Some(target)) = (diagram.node(&edge.source), diagram.node(&edge.target)) else {
            continue;
        };
        let x1 = source.position.x + dx + NODE_WIDTH / 2.0;
        let y1 = source.position.y + dy + NODE_HEIGHT;
        let x2 = target.position.x + dx + NODE_WIDTH / 2.0;
        let y2 = target.position.y + dy;
        svg.push_str(&format!(
            r##"<line x1="{x1}" y1="{y1}" x2="{x2}" y2="{y2}" stroke="{EDGE_STROKE}" stroke-width="1.5" marker-end="url(#arrow)"/>"##
        ));
        if let Some(label) = &edge.label {
            let mx = f64::midpoint(x1, x2);
            let my = f64::midpoint(y1, y2);
            let w = label_width(label);
            svg.push_str(&format!(
                r##"<rect x="{}" y="{}" width="{w}" height="16" fill="#ffffff"/><text x="{mx}" y="{my}" font-family="{FONT}" font-size="10" text-anchor="middle" dominant-baseline="central" fill="{STROKE}">{}</text>"##,
                mx - w / 2.0,
                my - 8.0,
                escape_xml(label),
            ));
        }
    }

    for node in &diagram.nodes {
        let x = node.position.x + dx;
        let y = node.position.y + dy;
        let fill = node
            .color()
            .filter(|c| is_safe_color(c))
            .unwrap_or(DEFAULT_FILL);
        svg.push_str(&format!(
            r##"<rect x="{x}" y="{y}" width="{NODE_WIDTH}" height="{NODE_HEIGHT}" rx="3" fill="{fill}" stroke="{STROKE}"/><text x="{}" y="{}" font-family="{FONT}" font-size="12" text-anchor="middle" dominant-baseline="central" fill="{STROKE}">{}</text>"##,
            x + NODE_WIDTH / 2.0,
            y + NODE_HEIGHT / 2.0,
            escape_xml(node.label()),
        ));
    }

    svg.push_str("</svg>");
    Some(svg)
}

#[allow(clippy::cast_precision_loss)]
fn label_width(label: &str) -> f64 {
    label.chars().count() as f64 * 6.0 + 8.0
}

/// Hex colors and plain color names; anything else could break the markup.
fn is_safe_color(color: &str) -> bool {
    if let Some(hex) = color.strip_prefix('#') {
        matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit())
    } else {
        !color.is_empty() && color.chars().all(|c| c.is_ascii_alphabetic())
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

// =============================================================================
// PNG
// =============================================================================

fn fontdb() -> Arc<usvg::fontdb::Database> {
    static DB: OnceLock<Arc<usvg::fontdb::Database>> = OnceLock::new();
    DB.get_or_init(|| {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        Arc::new(db)
    })
    .clone()
}

/// Scale and offset that fit `(w, h)` inside the export canvas, centered.
fn fit(w: f32, h: f32) -> (f32, f32, f32) {
    #[allow(clippy::cast_precision_loss)]
    let (cw, ch) = (EXPORT_WIDTH as f32, EXPORT_HEIGHT as f32);
    let scale = (cw / w).min(ch / h).min(MAX_SCALE);
    let tx = (cw - w * scale) / 2.0;
    let ty = (ch - h * scale) / 2.0;
    (scale, tx, ty)
}

/// Rasterize the diagram to PNG bytes. An empty diagram yields a blank
/// white image.
///
/// # Errors
///
/// Returns an [`ExportError`] if the SVG doesn't parse, the canvas can't be
/// allocated, or PNG encoding fails.
pub fn render_png(diagram: &Diagram) -> Result<Vec<u8>, ExportError> {
    let mut pixmap = tiny_skia::Pixmap::new(EXPORT_WIDTH, EXPORT_HEIGHT).ok_or(ExportError::PixmapAlloc)?;
    pixmap.fill(tiny_skia::Color::WHITE);

    if let Some(svg) = render_svg(diagram) {
        let mut options = usvg::Options::default();
        options.fontdb = fontdb();
        options.font_family = "Arial".to_string();
        let tree = usvg::Tree::from_str(&svg, &options).map_err(|e| ExportError::SvgParse(e.to_string()))?;

        let size = tree.size();
        let (scale, tx, ty) = fit(size.width(), size.height());
        let transform = tiny_skia::Transform::from_row(scale, 0.0, 0.0, scale, tx, ty);
        resvg::render(&tree, transform, &mut pixmap.as_mut());
    }

    pixmap.encode_png().map_err(|_| ExportError::PngEncode)
}

/// [`render_png`] on the blocking pool.
///
/// # Errors
///
/// Returns the render error, or `Join` if the blocking task panicked.
pub async fn export_png(diagram: Diagram) -> Result<Vec<u8>, ExportError> {
    tokio::task::spawn_blocking(move || render_png(&diagram))
        .await
        .map_err(|e| ExportError::Join(e.to_string()))?
}

#[cfg(test)]
#[path = "export_test.rs"]
mod tests;
