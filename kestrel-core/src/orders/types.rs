//! Order domain types

use std::fmt;
use std::time::SystemTime;

use rust_decimal::Decimal;

use crate::codec::fields::{exec_type_values, side_values, tags};
use crate::codec::FixMessage;

/// Engine-assigned order identifier. Maps 1:1 to the ClOrdID on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderId(pub u64);

impl OrderId {
    /// The ClOrdID string stamped on outbound messages.
    pub fn cl_ord_id(&self) -> String {
        format!("ORD-{}", self.0)
    }

    /// Parse a ClOrdID produced by [`cl_ord_id`](Self::cl_ord_id).
    pub fn from_cl_ord_id(s: &str) -> Option<Self> {
        s.strip_prefix("ORD-").and_then(|n| n.parse().ok()).map(OrderId)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ORD-{}", self.0)
    }
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// FIX Side(54) value.
    pub fn fix_value(&self) -> &'static str {
        match self {
            Side::Buy => side_values::BUY,
            Side::Sell => side_values::SELL,
        }
    }

    pub fn from_fix(value: &str) -> Option<Self> {
        match value {
            side_values::BUY => Some(Side::Buy),
            side_values::SELL => Some(Side::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Lifecycle state of an order. Transitions are validated by
/// `lifecycle::can_transition`; terminal states accept none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderState {
    /// Client intent, not yet sent.
    New,
    /// Sent to the venue, awaiting acknowledgment.
    PendingNew,
    /// Venue accepted.
    Acknowledged,
    /// Some quantity filled, remainder live.
    PartiallyFilled,
    /// Fully filled. Terminal.
    Filled,
    /// Cancel requested, awaiting venue confirmation.
    PendingCancel,
    /// Canceled at the venue. Terminal.
    Canceled,
    /// Rejected by the venue. Terminal.
    Rejected,
}

impl OrderState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderState::Filled | OrderState::Canceled | OrderState::Rejected
        )
    }

    /// States in which a cancel request may be issued.
    #[inline]
    pub fn is_cancelable(&self) -> bool {
        matches!(
            self,
            OrderState::Acknowledged | OrderState::PartiallyFilled
        )
    }
}

/// Out-of-band condition attached to an order without disturbing its
/// lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderCondition {
    /// No acknowledgment arrived within the configured timeout. The order
    /// may still be live at the venue; the caller decides.
    AckTimeout,
    /// The owning venue reached FailedPermanently while the order was
    /// pending.
    VenueUnavailable,
}

/// One order as the engine tracks it.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub id: OrderId,
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    pub state: OrderState,
    /// Venue the order was routed to. All later messages for this order
    /// go to the same venue.
    pub venue: String,
    /// Venue-assigned OrderID(37); absent until the venue first reports it.
    pub venue_order_id: Option<String>,
    pub filled_qty: Decimal,
    /// Weighted mean price over all fills; zero until the first fill.
    pub avg_fill_price: Decimal,
    pub condition: Option<OrderCondition>,
    /// Venue's reject text, when rejected.
    pub reject_reason: Option<String>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl OrderRecord {
    /// Fresh record in `New`, not yet routed.
    pub fn new(
        id: OrderId,
        symbol: impl Into<String>,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        venue: impl Into<String>,
    ) -> Self {
        let now = SystemTime::now();
        Self {
            id,
            symbol: symbol.into(),
            side,
            quantity,
            price,
            state: OrderState::New,
            venue: venue.into(),
            venue_order_id: None,
            filled_qty: Decimal::ZERO,
            avg_fill_price: Decimal::ZERO,
            condition: None,
            reject_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Unfilled remainder.
    pub fn leaves_qty(&self) -> Decimal {
        self.quantity - self.filled_qty
    }
}

/// What an inbound ExecutionReport means for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecKind {
    /// Venue accepted the order.
    Ack,
    /// A fill, partial or final.
    Fill,
    /// Venue confirmed the cancel.
    Canceled,
    /// Venue rejected the order.
    Rejected,
    /// Venue rejected the cancel; the order remains live.
    CancelRejected,
}

/// Normalized execution report, decoded from the wire form.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub order_id: OrderId,
    pub venue: String,
    /// Venue-assigned OrderID(37), when the report carries one.
    pub venue_order_id: Option<String>,
    pub kind: ExecKind,
    /// Quantity of this fill, for [`ExecKind::Fill`].
    pub last_qty: Decimal,
    /// Price of this fill, for [`ExecKind::Fill`].
    pub last_px: Decimal,
    /// Venue's cumulative filled quantity, when reported.
    pub cum_qty: Option<Decimal>,
    pub text: Option<String>,
}

impl ExecutionReport {
    /// Decode a FIX ExecutionReport (35=8). Returns `None` when the
    /// ClOrdID is absent, not ours, or the ExecType is one we do not
    /// model (e.g. order status, replace).
    pub fn from_fix(msg: &FixMessage, venue: &str) -> Option<Self> {
        // Reports for a cancel carry the cancel's own ClOrdID; the live
        // order's id is then in OrigClOrdID
        let order_id = msg
            .get(tags::CL_ORD_ID)
            .and_then(OrderId::from_cl_ord_id)
            .or_else(|| msg.get(tags::ORIG_CL_ORD_ID).and_then(OrderId::from_cl_ord_id))?;
        let exec_type = msg.get(tags::EXEC_TYPE)?;
        let kind = match exec_type {
            exec_type_values::NEW => ExecKind::Ack,
            exec_type_values::TRADE => ExecKind::Fill,
            exec_type_values::CANCELED => ExecKind::Canceled,
            exec_type_values::REJECTED => ExecKind::Rejected,
            _ => return None,
        };
        Some(Self {
            order_id,
            venue: venue.to_string(),
            venue_order_id: msg.get(tags::ORDER_ID).map(str::to_string),
            kind,
            last_qty: msg.get_parsed(tags::LAST_QTY).unwrap_or(Decimal::ZERO),
            last_px: msg.get_parsed(tags::LAST_PX).unwrap_or(Decimal::ZERO),
            cum_qty: msg.get_parsed(tags::CUM_QTY),
            text: msg.get(tags::TEXT).map(str::to_string),
        })
    }

    /// Decode a FIX OrderCancelReject (35=9). The order stays live.
    pub fn from_cancel_reject(msg: &FixMessage, venue: &str) -> Option<Self> {
        // OrigClOrdID carries the live order's id
        let order_id = msg
            .get(tags::ORIG_CL_ORD_ID)
            .or_else(|| msg.get(tags::CL_ORD_ID))
            .and_then(OrderId::from_cl_ord_id)?;
        Some(Self {
            order_id,
            venue: venue.to_string(),
            venue_order_id: msg.get(tags::ORDER_ID).map(str::to_string),
            kind: ExecKind::CancelRejected,
            last_qty: Decimal::ZERO,
            last_px: Decimal::ZERO,
            cum_qty: None,
            text: msg.get(tags::TEXT).map(str::to_string),
        })
    }
}
