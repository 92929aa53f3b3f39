//! Order lifecycle rules
//!
//! The transition table is the single authority on what an order may do
//! next. Execution reports are applied through [`apply_execution`], which
//! couples the table with fill accounting: filled quantity only grows, the
//! average price is the weighted mean over all fills, and a fill that
//! completes the order forces `Filled` even while a cancel is pending.

use rust_decimal::Decimal;
use tracing::warn;

use crate::error::{EngineError, Result};

use super::types::{ExecKind, ExecutionReport, OrderRecord, OrderState};

/// Whether `from -> to` is a legal order state transition.
pub fn can_transition(from: OrderState, to: OrderState) -> bool {
    use OrderState::*;
    match (from, to) {
        (New, PendingNew) => true,
        (PendingNew, Acknowledged) => true,
        // A venue can reject before we ever see an ack
        (PendingNew, Rejected) => true,
        (Acknowledged, PartiallyFilled) => true,
        (Acknowledged, Filled) => true,
        (Acknowledged, PendingCancel) => true,
        (Acknowledged, Rejected) => true,
        // Additional fills keep the state; the table allows the re-entry
        (PartiallyFilled, PartiallyFilled) => true,
        (PartiallyFilled, Filled) => true,
        (PartiallyFilled, PendingCancel) => true,
        (PendingCancel, Canceled) => true,
        // Fills race the cancel; a completing fill wins
        (PendingCancel, Filled) => true,
        // Cancel rejected: the order returns to its live state
        (PendingCancel, Acknowledged) => true,
        (PendingCancel, PartiallyFilled) => true,
        _ => false,
    }
}

/// Move an order to `to`, or fail with `InvalidTransition`.
pub fn transition(record: &mut OrderRecord, to: OrderState) -> Result<()> {
    if !can_transition(record.state, to) {
        return Err(EngineError::InvalidTransition {
            order_id: record.id,
            from: record.state,
            to,
        });
    }
    record.state = to;
    record.updated_at = std::time::SystemTime::now();
    Ok(())
}

/// Apply one execution report to an order record.
pub fn apply_execution(record: &mut OrderRecord, exec: &ExecutionReport) -> Result<()> {
    // The first report carrying the venue's OrderID pins it to the record
    if !record.state.is_terminal() && record.venue_order_id.is_none() {
        record.venue_order_id = exec.venue_order_id.clone();
    }
    match exec.kind {
        ExecKind::Ack => transition(record, OrderState::Acknowledged),
        ExecKind::Fill => apply_fill(record, exec.last_qty, exec.last_px),
        ExecKind::Canceled => transition(record, OrderState::Canceled),
        ExecKind::Rejected => {
            record.reject_reason = exec.text.clone();
            transition(record, OrderState::Rejected)
        }
        ExecKind::CancelRejected => {
            // The cancel failed; the order is still live at the venue
            let live = if record.filled_qty > Decimal::ZERO {
                OrderState::PartiallyFilled
            } else {
                OrderState::Acknowledged
            };
            transition(record, live)
        }
    }
}

/// Record a fill: grow the filled quantity, recompute the weighted average
/// price, and advance the state. Completing the order quantity forces
/// `Filled` regardless of a pending cancel.
pub fn apply_fill(record: &mut OrderRecord, qty: Decimal, px: Decimal) -> Result<()> {
    if record.state.is_terminal() {
        return Err(EngineError::InvalidTransition {
            order_id: record.id,
            from: record.state,
            to: OrderState::PartiallyFilled,
        });
    }
    if qty <= Decimal::ZERO {
        warn!(order_id = %record.id, %qty, "ignoring non-positive fill quantity");
        return Ok(());
    }

    let prev_filled = record.filled_qty;
    let new_filled = prev_filled + qty;
    record.avg_fill_price = (record.avg_fill_price * prev_filled + px * qty) / new_filled;
    record.filled_qty = new_filled;

    if new_filled >= record.quantity {
        // Bypasses the table: a completing fill is legal from any live
        // state, including PendingCancel
        record.state = OrderState::Filled;
        record.updated_at = std::time::SystemTime::now();
        Ok(())
    } else if record.state == OrderState::PendingCancel {
        // Partial fill while the cancel is pending: stay in PendingCancel
        record.updated_at = std::time::SystemTime::now();
        Ok(())
    } else {
        transition(record, OrderState::PartiallyFilled)
    }
}
