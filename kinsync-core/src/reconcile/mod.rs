//! Reconciliation of parsed feed records against imported events.

mod event_op;
mod plan;

pub use event_op::{EventOp, OpKind};
pub use plan::{ReconcilePlan, apply_plan, reconcile};
