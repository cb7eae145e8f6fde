//! 發料草稿模型（裁切計劃的持久化形式）

use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 發料草稿狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DraftStatus {
    /// 草稿（可編輯、可刪除）
    Draft,
    /// 已確認（鎖定、待執行）
    Finalized,
    /// 已發料（終態）
    Issued,
}

/// 切割行：從某支料件切出的一段長度，回溯至領料明細
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cut {
    /// 切割行ID
    pub id: Uuid,

    /// 切割順序（同一支料件內）
    pub sequence: u32,

    /// 切割長度（mm）
    pub length_mm: Decimal,

    /// 來源領料明細ID
    pub requisition_item_id: Uuid,

    /// 工單號（追溯用）
    pub job_card_no: Option<String>,
}

impl Cut {
    /// 創建新的切割行
    pub fn new(sequence: u32, length_mm: Decimal, requisition_item_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            sequence,
            length_mm,
            requisition_item_id,
            job_card_no: None,
        }
    }

    /// 建構器模式：設置工單號
    pub fn with_job_card_no(mut self, job_card_no: String) -> Self {
        self.job_card_no = Some(job_card_no);
        self
    }
}

/// 用料分配行：一支實體料件與其承載的有序切割行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarAssignment {
    /// 分配行ID
    pub id: Uuid,

    /// 料件順序（草稿內）
    pub sequence: u32,

    /// 料件ID
    pub piece_id: Uuid,

    /// 料件編號
    pub piece_no: String,

    /// 有序切割行
    pub cuts: Vec<Cut>,
}

impl BarAssignment {
    /// 創建新的用料分配行
    pub fn new(sequence: u32, piece_id: Uuid, piece_no: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            sequence,
            piece_id,
            piece_no,
            cuts: Vec::new(),
        }
    }

    /// 建構器模式：設置切割行
    pub fn with_cuts(mut self, cuts: Vec<Cut>) -> Self {
        self.cuts = cuts;
        self
    }

    /// 添加切割行
    pub fn add_cut(&mut self, cut: Cut) {
        self.cuts.push(cut);
    }

    /// 該支料件的總切割長度（mm）
    pub fn total_cut_length_mm(&self) -> Decimal {
        self.cuts.iter().map(|c| c.length_mm).sum()
    }
}

/// 發料草稿：可跨多張領料單的已保存裁切計劃
///
/// 草稿保存即預留其引用的全部料件；
/// 刪除（僅限 Draft 狀態）時釋放預留。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueWindowDraft {
    /// 草稿ID
    pub id: Uuid,

    /// 草稿編號
    pub draft_no: String,

    /// 涵蓋的領料單
    pub requisition_ids: Vec<Uuid>,

    /// 有序用料分配行
    pub bars: Vec<BarAssignment>,

    /// 草稿狀態
    pub status: DraftStatus,

    /// 建立時間
    pub created_at: NaiveDateTime,

    /// 確認時間
    pub finalized_at: Option<NaiveDateTime>,

    /// 發料時間
    pub issued_at: Option<NaiveDateTime>,
}

impl IssueWindowDraft {
    /// 創建新的發料草稿
    pub fn new(draft_no: String, requisition_ids: Vec<Uuid>, bars: Vec<BarAssignment>) -> Self {
        Self {
            id: Uuid::new_v4(),
            draft_no,
            requisition_ids,
            bars,
            status: DraftStatus::Draft,
            created_at: Utc::now().naive_utc(),
            finalized_at: None,
            issued_at: None,
        }
    }

    /// 草稿引用的全部料件ID（依分配行順序）
    pub fn piece_ids(&self) -> Vec<Uuid> {
        self.bars.iter().map(|b| b.piece_id).collect()
    }

    /// 草稿總切割長度（mm）
    pub fn total_cut_length_mm(&self) -> Decimal {
        self.bars.iter().map(|b| b.total_cut_length_mm()).sum()
    }
}
