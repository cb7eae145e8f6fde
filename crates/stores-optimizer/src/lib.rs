//! # Stores Optimizer
//!
//! 裁切計劃優化模組（三種確定性策略、候選計劃排名）

pub mod packer;
pub mod plan;
pub mod planner;

// Re-export 主要類型
pub use plan::{CuttingPlan, PlanStrategy, PlannedBar, PlannedCut};
pub use planner::CuttingPlanner;
