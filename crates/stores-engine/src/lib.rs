//! # Stores Engine
//!
//! 倉儲發料引擎：料件登錄簿、FIFO 分配、切割需求展開、
//! 發料草稿管理與領料帳

pub mod allocator;
pub mod draft_manager;
pub mod grouping;
pub mod ledger;
pub mod registry;

// Re-export 主要類型
pub use allocator::{AllocationLine, AllocationResult, FifoAllocator};
pub use draft_manager::{
    BarAssignmentRequest, CutRequest, DraftSaveRequest, IssueDraftManager,
    RequisitionIssueResult, SavedDraft,
};
pub use grouping::material_groups;
pub use ledger::RequisitionLedger;
pub use registry::PieceRegistry;
