//! Structured FIX message representation
//!
//! A [`FixMessage`] is the message type (tag 35) plus an ordered list of
//! body fields. The standard header fields (34/49/56/52) are ordinary
//! entries in that list, stamped by the session just before encoding, so
//! the encoder can reproduce the exact byte layout on round trip.

use super::fields::{msg_type, tags};
use chrono::Utc;
use rust_decimal::Decimal;

/// One FIX field: tag number and raw string value.
pub type FixField = (u32, String);

/// A decoded or to-be-encoded FIX message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixMessage {
    /// MsgType (35) value.
    pub msg_type: String,
    /// Ordered body fields, excluding 8/9/35/10.
    pub fields: Vec<FixField>,
}

impl FixMessage {
    /// Create an empty message of the given type.
    pub fn new(msg_type: impl Into<String>) -> Self {
        Self {
            msg_type: msg_type.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field, preserving insertion order.
    pub fn push(&mut self, tag: u32, value: impl Into<String>) {
        self.fields.push((tag, value.into()));
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, tag: u32, value: impl Into<String>) -> Self {
        self.push(tag, value);
        self
    }

    /// First value for `tag`, if present.
    pub fn get(&self, tag: u32) -> Option<&str> {
        self.fields
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, v)| v.as_str())
    }

    /// Value for `tag` parsed as `T`.
    pub fn get_parsed<T: std::str::FromStr>(&self, tag: u32) -> Option<T> {
        self.get(tag).and_then(|v| v.parse().ok())
    }

    /// MsgSeqNum (34), if stamped.
    pub fn seq_num(&self) -> Option<u64> {
        self.get_parsed(tags::MSG_SEQ_NUM)
    }

    /// True for session-level (admin) message types.
    pub fn is_admin(&self) -> bool {
        matches!(
            self.msg_type.as_str(),
            msg_type::HEARTBEAT
                | msg_type::TEST_REQUEST
                | msg_type::RESEND_REQUEST
                | msg_type::REJECT
                | msg_type::SEQUENCE_RESET
                | msg_type::LOGOUT
                | msg_type::LOGON
        )
    }

    /// Stamp the standard header at the front of the field list:
    /// MsgSeqNum, SenderCompID, TargetCompID, SendingTime. Called by the
    /// session exactly once, immediately before encoding.
    pub fn stamp_header(&mut self, seq_num: u64, sender: &str, target: &str) {
        let header = [
            (tags::MSG_SEQ_NUM, seq_num.to_string()),
            (tags::SENDER_COMP_ID, sender.to_string()),
            (tags::TARGET_COMP_ID, target.to_string()),
            (tags::SENDING_TIME, fix_timestamp_now()),
        ];
        self.fields.splice(0..0, header);
    }
}

/// Current UTC time in FIX UTCTimestamp format (millisecond precision).
pub fn fix_timestamp_now() -> String {
    Utc::now().format("%Y%m%d-%H:%M:%S%.3f").to_string()
}

// ---------------------------------------------------------------------------
// Session-level message constructors
// ---------------------------------------------------------------------------

/// Logon (35=A). Always requests a sequence reset to 1, so both sides of a
/// fresh logical session agree on the starting point.
pub fn logon(
    heartbeat_secs: u64,
    username: Option<&str>,
    password: Option<&str>,
) -> FixMessage {
    let mut msg = FixMessage::new(msg_type::LOGON)
        .with(tags::ENCRYPT_METHOD, "0")
        .with(tags::HEART_BT_INT, heartbeat_secs.to_string())
        .with(tags::RESET_SEQ_NUM_FLAG, "Y");
    if let Some(user) = username {
        msg.push(tags::USERNAME, user);
    }
    if let Some(pass) = password {
        msg.push(tags::PASSWORD, pass);
    }
    msg
}

/// Heartbeat (35=0); echoes the TestReqID when answering a TestRequest.
pub fn heartbeat(test_req_id: Option<&str>) -> FixMessage {
    let mut msg = FixMessage::new(msg_type::HEARTBEAT);
    if let Some(id) = test_req_id {
        msg.push(tags::TEST_REQ_ID, id);
    }
    msg
}

/// TestRequest (35=1).
pub fn test_request(test_req_id: &str) -> FixMessage {
    FixMessage::new(msg_type::TEST_REQUEST).with(tags::TEST_REQ_ID, test_req_id)
}

/// ResendRequest (35=2) for the inclusive sequence range.
pub fn resend_request(begin_seq: u64, end_seq: u64) -> FixMessage {
    FixMessage::new(msg_type::RESEND_REQUEST)
        .with(tags::BEGIN_SEQ_NO, begin_seq.to_string())
        .with(tags::END_SEQ_NO, end_seq.to_string())
}

/// SequenceReset-GapFill (35=4, 123=Y) advancing the peer to `new_seq`.
pub fn sequence_reset_gap_fill(new_seq: u64) -> FixMessage {
    FixMessage::new(msg_type::SEQUENCE_RESET)
        .with(tags::GAP_FILL_FLAG, "Y")
        .with(tags::NEW_SEQ_NO, new_seq.to_string())
}

/// Logout (35=5).
pub fn logout(text: Option<&str>) -> FixMessage {
    let mut msg = FixMessage::new(msg_type::LOGOUT);
    if let Some(t) = text {
        msg.push(tags::TEXT, t);
    }
    msg
}

// ---------------------------------------------------------------------------
// Application-level message constructors
// ---------------------------------------------------------------------------

/// NewOrderSingle (35=D) for a limit order.
pub fn new_order_single(
    cl_ord_id: &str,
    symbol: &str,
    side: &str,
    quantity: Decimal,
    price: Decimal,
) -> FixMessage {
    FixMessage::new(msg_type::NEW_ORDER_SINGLE)
        .with(tags::CL_ORD_ID, cl_ord_id)
        .with(tags::SYMBOL, symbol)
        .with(tags::SIDE, side)
        .with(tags::TRANSACT_TIME, fix_timestamp_now())
        .with(tags::ORDER_QTY, quantity.to_string())
        .with(tags::ORD_TYPE, super::fields::ord_type_values::LIMIT)
        .with(tags::PRICE, price.to_string())
        .with(tags::TIME_IN_FORCE, super::fields::time_in_force_values::DAY)
}

/// OrderCancelRequest (35=F).
pub fn order_cancel_request(
    cl_ord_id: &str,
    orig_cl_ord_id: &str,
    symbol: &str,
    side: &str,
) -> FixMessage {
    FixMessage::new(msg_type::ORDER_CANCEL_REQUEST)
        .with(tags::CL_ORD_ID, cl_ord_id)
        .with(tags::ORIG_CL_ORD_ID, orig_cl_ord_id)
        .with(tags::SYMBOL, symbol)
        .with(tags::SIDE, side)
        .with(tags::TRANSACT_TIME, fix_timestamp_now())
}

/// OrderCancelReplaceRequest (35=G).
pub fn order_cancel_replace(
    cl_ord_id: &str,
    orig_cl_ord_id: &str,
    symbol: &str,
    side: &str,
    quantity: Decimal,
    price: Decimal,
) -> FixMessage {
    FixMessage::new(msg_type::ORDER_CANCEL_REPLACE)
        .with(tags::CL_ORD_ID, cl_ord_id)
        .with(tags::ORIG_CL_ORD_ID, orig_cl_ord_id)
        .with(tags::SYMBOL, symbol)
        .with(tags::SIDE, side)
        .with(tags::TRANSACT_TIME, fix_timestamp_now())
        .with(tags::ORDER_QTY, quantity.to_string())
        .with(tags::ORD_TYPE, super::fields::ord_type_values::LIMIT)
        .with(tags::PRICE, price.to_string())
}

/// MarketDataRequest (35=V) subscribing (or unsubscribing) top of book
/// plus trades for one symbol.
pub fn market_data_request(md_req_id: &str, symbol: &str, subscribe: bool) -> FixMessage {
    use super::fields::md_entry_type_values as md;
    // SubscriptionRequestType: 1 = snapshot+updates, 2 = unsubscribe
    let sub_type = if subscribe { "1" } else { "2" };
    FixMessage::new(msg_type::MARKET_DATA_REQUEST)
        .with(tags::MD_REQ_ID, md_req_id)
        .with(tags::SUBSCRIPTION_REQUEST_TYPE, sub_type)
        .with(tags::MARKET_DEPTH, "1")
        .with(tags::NO_MD_ENTRY_TYPES, "3")
        .with(tags::MD_ENTRY_TYPE, md::BID)
        .with(tags::MD_ENTRY_TYPE, md::OFFER)
        .with(tags::MD_ENTRY_TYPE, md::TRADE)
        .with(tags::NO_RELATED_SYM, "1")
        .with(tags::SYMBOL, symbol)
}
