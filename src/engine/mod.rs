//! 冲突引擎：依赖评估、移动事务、级联推演

pub mod cascade;
pub mod evaluator;
pub mod transaction;

pub use cascade::{simulate, CascadePlan, CascadeShift};
pub use evaluator::{has_blocking, ConflictKind, DependencyEvaluator, ScheduleConflict, Severity};
pub use transaction::{move_milestone, what_if, MoveResult};
