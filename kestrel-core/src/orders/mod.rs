//! Order state machine and shared order table

pub mod lifecycle;
pub mod table;
pub mod types;

pub use table::OrderTable;
pub use types::{
    ExecKind, ExecutionReport, OrderCondition, OrderId, OrderRecord, OrderState, Side,
};
