//! Drag-and-drop gestures
//!
//! Some browser drag implementations only register a drag when the pointer
//! moves right after the button goes down. Every gesture built here therefore
//! nudges the pointer by (-1, -1) and back by (1, 1) immediately after the
//! press, before travelling to the drop point.

use crate::error::Result;
use crate::webdriver::{match_single_or_fail, WebDriver};
use mftf_core::{ElementHandle, Locator, Point, PointerOp};
use tracing::{debug, info};

/// Corrective jitter played right after pressing
pub const JITTER: [(i64, i64); 2] = [(-1, -1), (1, 1)];

/// Build the pointer gesture for dragging `source` onto `target`
///
/// With either offset given (the other counting as zero), the drop point is
/// the target's top-left plus the offset, reached by a relative move from the
/// source's top-left, and the button is released wherever the pointer ends up.
/// With no offsets the pointer moves onto the target and releases over it.
///
/// Coordinates are truncated toward zero.
pub fn compute_drag_sequence(
    source: &ElementHandle,
    source_position: Point,
    target: &ElementHandle,
    target_position: Point,
    x_offset: Option<f64>,
    y_offset: Option<f64>,
) -> Vec<PointerOp> {
    let jitter = JITTER.iter().map(|&(dx, dy)| PointerOp::move_by(dx, dy));

    if x_offset.is_none() && y_offset.is_none() {
        let mut ops = vec![PointerOp::ClickAndHold(source.clone())];
        ops.extend(jitter);
        ops.push(PointerOp::MoveToElement(target.clone()));
        ops.push(PointerOp::Release(Some(target.clone())));
        return ops;
    }

    let (travel_x, travel_y) = travel_vector(
        source_position,
        target_position,
        x_offset.unwrap_or(0.0),
        y_offset.unwrap_or(0.0),
    );

    let mut ops = vec![
        PointerOp::MoveToElement(source.clone()),
        PointerOp::ClickAndHold(source.clone()),
    ];
    ops.extend(jitter);
    ops.push(PointerOp::move_by(travel_x, travel_y));
    ops.push(PointerOp::Release(None));
    ops
}

/// Relative move from the source's top-left to the target's top-left plus offset
pub fn travel_vector(source: Point, target: Point, x_offset: f64, y_offset: f64) -> (i64, i64) {
    let drop_x = (target.x + x_offset).trunc();
    let drop_y = (target.y + y_offset).trunc();
    ((drop_x - source.x) as i64, (drop_y - source.y) as i64)
}

/// Drag the element matching `source` onto the one matching `target`
///
/// Both locators must match exactly one element; this is checked before any
/// pointer action is sent.
///
/// # Example
/// ```no_run
/// use mftf_browser::browser::BrowserSession;
/// use mftf_browser::drag::drag_and_drop;
/// use mftf_core::Locator;
///
/// #[tokio::main]
/// async fn main() {
///     let session = BrowserSession::launch().await.unwrap();
///     session.navigate("http://magento.local/admin/catalog/category/").await.unwrap();
///
///     drag_and_drop(
///         &session,
///         &Locator::xpath("//li[@data-id='4']/a"),
///         &Locator::xpath("//li[@data-id='2']/a"),
///         None,
///         None,
///     )
///     .await
///     .unwrap();
/// }
/// ```
pub async fn drag_and_drop(
    driver: &dyn WebDriver,
    source: &Locator,
    target: &Locator,
    x_offset: Option<f64>,
    y_offset: Option<f64>,
) -> Result<Vec<PointerOp>> {
    let source_handle = match_single_or_fail(driver, source).await?;
    let target_handle = match_single_or_fail(driver, target).await?;

    let source_position = driver.position(&source_handle).await?;
    let target_position = driver.position(&target_handle).await?;

    let ops = compute_drag_sequence(
        &source_handle,
        source_position,
        &target_handle,
        target_position,
        x_offset,
        y_offset,
    );

    debug!("Drag gesture: {:?}", ops);
    driver.perform(&ops).await?;

    info!("Dragged {} onto {}", source, target);
    Ok(ops)
}
