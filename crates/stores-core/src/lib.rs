//! # Stores Core
//!
//! 倉儲發料核心資料模型與類型定義

pub mod draft;
pub mod issue;
pub mod material;
pub mod piece;
pub mod requisition;

// Re-export 主要類型
pub use draft::{BarAssignment, Cut, DraftStatus, IssueWindowDraft};
pub use issue::{MaterialIssue, MaterialUsageHistory};
pub use material::{Material, MaterialCatalog, MaterialSpec, PieceFilter};
pub use piece::{AllocationHolder, ConsumeOutcome, MaterialPiece, PieceStatus};
pub use requisition::{
    CutRequirement, ItemStatus, LineItemRef, MaterialGroup, MaterialRequisition,
    MaterialRequisitionItem, RequisitionStatus,
};

/// 倉儲發料錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum StoresError {
    #[error("庫存不足：物料 {material_id} 需求 {required_mm}mm，可用 {available_mm}mm")]
    InsufficientStock {
        material_id: uuid::Uuid,
        required_mm: rust_decimal::Decimal,
        available_mm: rust_decimal::Decimal,
    },

    #[error("料件已被其他單據佔用: {piece_ids:?}")]
    PieceUnavailable { piece_ids: Vec<uuid::Uuid> },

    #[error("料件狀態衝突: {0}")]
    Conflict(String),

    #[error("無效的狀態轉換：{from} → {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("無效的切割長度: {0}")]
    InvalidCutLength(String),

    #[error("找不到料件: {0}")]
    PieceNotFound(uuid::Uuid),

    #[error("找不到發料草稿: {0}")]
    DraftNotFound(uuid::Uuid),

    #[error("找不到領料單: {0}")]
    RequisitionNotFound(uuid::Uuid),

    #[error("找不到領料明細: {0}")]
    RequisitionItemNotFound(uuid::Uuid),

    #[error("找不到物料主檔: {0}")]
    MaterialNotFound(uuid::Uuid),

    #[error("其他錯誤: {0}")]
    Other(String),
}

impl StoresError {
    /// 建立狀態轉換錯誤（以 Debug 表示法記錄前後狀態）
    pub fn invalid_transition<F: std::fmt::Debug, T: std::fmt::Debug>(from: F, to: T) -> Self {
        Self::InvalidStateTransition {
            from: format!("{from:?}"),
            to: format!("{to:?}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoresError>;
