//! Category label overlay on the preview frame.

use doorwatch_core::Category;
use opencv::core::{Mat, Point, Scalar};
use opencv::imgproc;
use std::time::Duration;

/// Thief labels toggle visibility every half period to signal alert status.
const BLINK_HALF_PERIOD: Duration = Duration::from_millis(500);

const FONT_SCALE: f64 = 1.0;
const FONT_THICKNESS: i32 = 2;

/// How a category's label is rendered: text, BGR color, and anchor point.
struct OverlayStyle {
    text: String,
    color: Scalar,
    origin: Point,
}

/// Per-category rendering table (BGR channel order, OpenCV convention).
fn style(category: Category) -> OverlayStyle {
    match category {
        Category::Thief => OverlayStyle {
            text: format!("Visitor: {category}"),
            color: Scalar::new(0.0, 0.0, 255.0, 0.0),
            origin: Point::new(10, 30),
        },
        Category::Friend => OverlayStyle {
            text: format!("Visitor: {category}"),
            color: Scalar::new(0.0, 255.0, 0.0, 0.0),
            origin: Point::new(10, 30),
        },
        Category::Delivery => OverlayStyle {
            text: format!("Visitor: {category}"),
            color: Scalar::new(255.0, 255.0, 0.0, 0.0),
            origin: Point::new(10, 30),
        },
        Category::NoPerson => OverlayStyle {
            text: "No person detected".to_string(),
            color: Scalar::new(255.0, 255.0, 255.0, 0.0),
            origin: Point::new(10, 30),
        },
    }
}

/// True during the visible half of the blink cycle.
fn blink_on(elapsed: Duration) -> bool {
    let period = 2 * BLINK_HALF_PERIOD.as_millis();
    elapsed.as_millis() % period < BLINK_HALF_PERIOD.as_millis()
}

/// Whether the label is drawn this tick. Only the thief label blinks.
fn label_visible(category: Category, elapsed: Duration) -> bool {
    match category {
        Category::Thief => blink_on(elapsed),
        Category::Friend | Category::Delivery | Category::NoPerson => true,
    }
}

/// Draw the category label onto the BGR preview frame.
///
/// `elapsed` is the time since the run started; it drives the blink phase.
pub fn draw_label(frame: &mut Mat, category: Category, elapsed: Duration) -> opencv::Result<()> {
    if !label_visible(category, elapsed) {
        return Ok(());
    }

    let style = style(category);
    imgproc::put_text(
        frame,
        &style.text,
        style.origin,
        imgproc::FONT_HERSHEY_SIMPLEX,
        FONT_SCALE,
        style.color,
        FONT_THICKNESS,
        imgproc::LINE_8,
        false,
    )
}
