//! FIX 4.4 field tag and value constants
//!
//! Only the tags this engine actually reads or writes. Reference:
//! <https://www.fixtrading.org/standards/fix-4-4/>

/// FIX message type values (tag 35).
pub mod msg_type {
    /// Heartbeat.
    pub const HEARTBEAT: &str = "0";
    /// TestRequest.
    pub const TEST_REQUEST: &str = "1";
    /// ResendRequest.
    pub const RESEND_REQUEST: &str = "2";
    /// Session-level Reject.
    pub const REJECT: &str = "3";
    /// SequenceReset (also GapFill).
    pub const SEQUENCE_RESET: &str = "4";
    /// Logout.
    pub const LOGOUT: &str = "5";
    /// ExecutionReport.
    pub const EXECUTION_REPORT: &str = "8";
    /// OrderCancelReject.
    pub const ORDER_CANCEL_REJECT: &str = "9";
    /// Logon.
    pub const LOGON: &str = "A";
    /// NewOrderSingle.
    pub const NEW_ORDER_SINGLE: &str = "D";
    /// OrderCancelRequest.
    pub const ORDER_CANCEL_REQUEST: &str = "F";
    /// OrderCancelReplaceRequest.
    pub const ORDER_CANCEL_REPLACE: &str = "G";
    /// MarketDataRequest.
    pub const MARKET_DATA_REQUEST: &str = "V";
    /// MarketDataSnapshotFullRefresh.
    pub const MARKET_DATA_SNAPSHOT: &str = "W";
    /// MarketDataIncrementalRefresh.
    pub const MARKET_DATA_INCREMENTAL: &str = "X";
}

/// FIX field tag constants.
pub mod tags {
    /// AvgPx (6) - Average fill price.
    pub const AVG_PX: u32 = 6;
    /// BeginSeqNo (7) - First sequence of a resend range.
    pub const BEGIN_SEQ_NO: u32 = 7;
    /// BeginString (8) - Protocol version.
    pub const BEGIN_STRING: u32 = 8;
    /// BodyLength (9).
    pub const BODY_LENGTH: u32 = 9;
    /// CheckSum (10).
    pub const CHECK_SUM: u32 = 10;
    /// ClOrdID (11) - Client order identifier.
    pub const CL_ORD_ID: u32 = 11;
    /// CumQty (14) - Cumulative filled quantity.
    pub const CUM_QTY: u32 = 14;
    /// EndSeqNo (16) - Last sequence of a resend range (0 = infinity).
    pub const END_SEQ_NO: u32 = 16;
    /// ExecID (17) - Execution identifier.
    pub const EXEC_ID: u32 = 17;
    /// GapFillFlag (123).
    pub const GAP_FILL_FLAG: u32 = 123;
    /// LastPx (31) - Price of this fill.
    pub const LAST_PX: u32 = 31;
    /// LastQty (32) - Quantity of this fill.
    pub const LAST_QTY: u32 = 32;
    /// MsgSeqNum (34).
    pub const MSG_SEQ_NUM: u32 = 34;
    /// MsgType (35).
    pub const MSG_TYPE: u32 = 35;
    /// NewSeqNo (36) - Target of a SequenceReset.
    pub const NEW_SEQ_NO: u32 = 36;
    /// OrderID (37) - Venue-assigned order identifier.
    pub const ORDER_ID: u32 = 37;
    /// OrderQty (38).
    pub const ORDER_QTY: u32 = 38;
    /// OrdStatus (39).
    pub const ORD_STATUS: u32 = 39;
    /// OrdType (40).
    pub const ORD_TYPE: u32 = 40;
    /// OrigClOrdID (41) - ClOrdID of the order being canceled/replaced.
    pub const ORIG_CL_ORD_ID: u32 = 41;
    /// Price (44).
    pub const PRICE: u32 = 44;
    /// RefSeqNum (45) - Sequence number of the rejected message.
    pub const REF_SEQ_NUM: u32 = 45;
    /// SenderCompID (49).
    pub const SENDER_COMP_ID: u32 = 49;
    /// SendingTime (52).
    pub const SENDING_TIME: u32 = 52;
    /// Side (54).
    pub const SIDE: u32 = 54;
    /// Symbol (55).
    pub const SYMBOL: u32 = 55;
    /// TargetCompID (56).
    pub const TARGET_COMP_ID: u32 = 56;
    /// Text (58).
    pub const TEXT: u32 = 58;
    /// TimeInForce (59).
    pub const TIME_IN_FORCE: u32 = 59;
    /// TransactTime (60).
    pub const TRANSACT_TIME: u32 = 60;
    /// EncryptMethod (98) - Always 0 (none).
    pub const ENCRYPT_METHOD: u32 = 98;
    /// CxlRejReason (102).
    pub const CXL_REJ_REASON: u32 = 102;
    /// HeartBtInt (108).
    pub const HEART_BT_INT: u32 = 108;
    /// TestReqID (112).
    pub const TEST_REQ_ID: u32 = 112;
    /// MDReqID (262) - Market data request identifier.
    pub const MD_REQ_ID: u32 = 262;
    /// SubscriptionRequestType (263).
    pub const SUBSCRIPTION_REQUEST_TYPE: u32 = 263;
    /// MarketDepth (264).
    pub const MARKET_DEPTH: u32 = 264;
    /// NoMDEntryTypes (267).
    pub const NO_MD_ENTRY_TYPES: u32 = 267;
    /// NoMDEntries (268).
    pub const NO_MD_ENTRIES: u32 = 268;
    /// MDEntryType (269).
    pub const MD_ENTRY_TYPE: u32 = 269;
    /// MDEntryPx (270).
    pub const MD_ENTRY_PX: u32 = 270;
    /// MDEntrySize (271).
    pub const MD_ENTRY_SIZE: u32 = 271;
    /// NoRelatedSym (146).
    pub const NO_RELATED_SYM: u32 = 146;
    /// ExecType (150).
    pub const EXEC_TYPE: u32 = 150;
    /// LeavesQty (151).
    pub const LEAVES_QTY: u32 = 151;
    /// ResetSeqNumFlag (141).
    pub const RESET_SEQ_NUM_FLAG: u32 = 141;
    /// Username (553).
    pub const USERNAME: u32 = 553;
    /// Password (554).
    pub const PASSWORD: u32 = 554;
}

/// Side values (tag 54).
pub mod side_values {
    /// Buy side.
    pub const BUY: &str = "1";
    /// Sell side.
    pub const SELL: &str = "2";
}

/// OrdType values (tag 40).
pub mod ord_type_values {
    /// Market order.
    pub const MARKET: &str = "1";
    /// Limit order.
    pub const LIMIT: &str = "2";
}

/// TimeInForce values (tag 59).
pub mod time_in_force_values {
    /// Day order.
    pub const DAY: &str = "0";
    /// Immediate or Cancel.
    pub const IOC: &str = "3";
}

/// ExecType values (tag 150).
pub mod exec_type_values {
    /// Order accepted.
    pub const NEW: &str = "0";
    /// Order canceled.
    pub const CANCELED: &str = "4";
    /// Order replaced.
    pub const REPLACED: &str = "5";
    /// Cancel pending at the venue.
    pub const PENDING_CANCEL: &str = "6";
    /// Order rejected.
    pub const REJECTED: &str = "8";
    /// Fill or partial fill.
    pub const TRADE: &str = "F";
}

/// OrdStatus values (tag 39).
pub mod ord_status_values {
    /// Accepted, no fills.
    pub const NEW: &str = "0";
    /// Partially filled.
    pub const PARTIALLY_FILLED: &str = "1";
    /// Fully filled.
    pub const FILLED: &str = "2";
    /// Canceled.
    pub const CANCELED: &str = "4";
    /// Pending cancel.
    pub const PENDING_CANCEL: &str = "6";
    /// Rejected.
    pub const REJECTED: &str = "8";
}

/// MDEntryType values (tag 269).
pub mod md_entry_type_values {
    /// Bid.
    pub const BID: &str = "0";
    /// Offer.
    pub const OFFER: &str = "1";
    /// Trade.
    pub const TRADE: &str = "2";
}
