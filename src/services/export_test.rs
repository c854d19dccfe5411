use super::*;
use crate::diagram::PALETTE_GREEN;
use crate::flowchart::Position;

fn diamond() -> Diagram {
    let mut diagram = Diagram::default();
    diagram.insert_node("Start", Position::new(200.0, 100.0));
    diagram.insert_node("A", Position::new(50.0, 200.0));
    diagram.insert_node("B", Position::new(350.0, 200.0));
    diagram.insert_node("End", Position::new(200.0, 300.0));
    diagram.connect("Start", "A", "yes").unwrap();
    diagram.connect("Start", "B", "no").unwrap();
    diagram.connect("A", "End", "").unwrap();
    diagram.connect("B", "End", "").unwrap();
    diagram.update_node_color("End", PALETTE_GREEN).unwrap();
    diagram
}

fn decode(png: &[u8]) -> tiny_skia::Pixmap {
    tiny_skia::Pixmap::decode_png(png).unwrap()
}

// =============================================================================
// SVG
// =============================================================================

#[test]
fn empty_diagram_has_no_svg() {
    assert!(render_svg(&Diagram::default()).is_none());
}

#[test]
fn svg_is_cropped_to_padded_bounds() {
    let svg = render_svg(&diamond()).unwrap();
    // x: 50..500, y: 100..340, plus 20 padding each side.
    assert!(svg.contains(r#"viewBox="0 0 490 280""#));
    // Leftmost node lands at the padding.
    assert!(svg.contains(r#"<rect x="20" y="120""#));
}

#[test]
fn svg_draws_every_node_edge_and_label() {
    let svg = render_svg(&diamond()).unwrap();
    assert_eq!(svg.matches("<line ").count(), 4);
    assert_eq!(svg.matches("marker-end=\"url(#arrow)\"").count(), 4);
    assert!(svg.contains(">yes</text>"));
    assert!(svg.contains(">no</text>"));
    assert!(svg.contains(">Start</text>"));
    assert!(svg.contains(&format!("fill=\"{PALETTE_GREEN}\"")));
}

#[test]
fn svg_escapes_markup_in_labels() {
    let mut diagram = Diagram::default();
    diagram.insert_node("a<b & \"c\"", Position::new(0.0, 0.0));
    let svg = render_svg(&diagram).unwrap();
    assert!(svg.contains("a&lt;b &amp; &quot;c&quot;"));
    assert!(!svg.contains("a<b"));
}

#[test]
fn unsafe_colors_fall_back_to_white() {
    let mut diagram = Diagram::default();
    diagram.insert_node("X", Position::new(0.0, 0.0));
    diagram
        .update_node_color("X", "red\" onload=\"x")
        .unwrap();
    let svg = render_svg(&diagram).unwrap();
    assert!(!svg.contains("onload"));
    assert!(svg.contains(&format!("fill=\"{DEFAULT_FILL}\"")));
}

#[test]
fn color_check_accepts_hex_and_names() {
    assert!(is_safe_color("#A8D5BA"));
    assert!(is_safe_color("#fff"));
    assert!(is_safe_color("lightblue"));
    assert!(!is_safe_color("#12345"));
    assert!(!is_safe_color("rgb(1,2,3)"));
}

// =============================================================================
// FIT
// =============================================================================

#[test]
fn small_content_is_capped_at_double_size_and_centered() {
    let (scale, tx, ty) = fit(100.0, 100.0);
    assert!((scale - 2.0).abs() < f32::EPSILON);
    assert!((tx - 662.0).abs() < 1e-3);
    assert!((ty - 299.0).abs() < 1e-3);
}

#[test]
fn wide_content_fits_width() {
    let (scale, tx, _) = fit(3048.0, 100.0);
    assert!((scale - 0.5).abs() < f32::EPSILON);
    assert!(tx.abs() < 1e-3);
}

// =============================================================================
// PNG
// =============================================================================

#[test]
fn png_has_fixed_dimensions() {
    let pixmap = decode(&render_png(&diamond()).unwrap());
    assert_eq!((pixmap.width(), pixmap.height()), (EXPORT_WIDTH, EXPORT_HEIGHT));
}

#[test]
fn empty_diagram_exports_blank_white_image() {
    let pixmap = decode(&render_png(&Diagram::default()).unwrap());
    assert_eq!((pixmap.width(), pixmap.height()), (EXPORT_WIDTH, EXPORT_HEIGHT));
    assert!(
        pixmap
            .pixels()
            .iter()
            .all(|p| (p.red(), p.green(), p.blue(), p.alpha()) == (255, 255, 255, 255))
    );
}

#[test]
fn png_contains_drawn_content() {
    let pixmap = decode(&render_png(&diamond()).unwrap());
    assert!(pixmap.pixels().iter().any(|p| p.red() < 200));
}

#[tokio::test]
async fn export_runs_off_the_async_runtime() {
    let png = export_png(diamond()).await.unwrap();
    assert!(png.starts_with(b"\x89PNG"));
}
