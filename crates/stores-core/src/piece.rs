//! 實體料件模型與狀態機

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::material::MaterialSpec;
use crate::{Result, StoresError};

/// 料件狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PieceStatus {
    /// 可用（在庫、未被佔用）
    Available,
    /// 已分配（被領料單或發料草稿預留）
    Allocated,
    /// 已發料（整支發出、未經切割）
    Issued,
    /// 部分消耗（切割後餘料達可用門檻，回到可用池）
    PartiallyConsumed,
    /// 已消耗（完全用罄）
    Consumed,
    /// 廢料（餘料低於可用門檻，終態）
    Scrap,
}

impl PieceStatus {
    /// 檢查是否為終態（不再參與任何分配）
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Issued | Self::Consumed | Self::Scrap)
    }
}

/// 分配持有者：料件被誰預留
///
/// 領料單（自動分配）與發料草稿（裁切計劃）互斥持有，
/// 以 sum type 表達「恰好其一」而非兩個可空外鍵。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationHolder {
    /// 領料單持有
    Requisition(Uuid),
    /// 發料草稿持有
    Draft(Uuid),
}

/// 消耗結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeOutcome {
    /// 剩餘長度（mm）
    pub remainder_mm: Decimal,

    /// 餘料是否成為廢料
    pub became_scrap: bool,
}

/// 實體料件：一支有唯一編號的棒材/管材/板材段
///
/// 料件是唯一的共享可變資源；狀態與長度只能經由本模型的
/// 轉換方法變更，每次變更遞增 `version` 供樂觀併發檢查。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialPiece {
    /// 料件ID
    pub id: Uuid,

    /// 料件編號（人工可讀、唯一）
    pub piece_no: String,

    /// 物料規格
    pub spec: MaterialSpec,

    /// 入庫原始長度（mm）
    pub original_length_mm: Decimal,

    /// 目前長度（mm）
    pub current_length_mm: Decimal,

    /// 料件狀態
    pub status: PieceStatus,

    /// 倉庫/儲位
    pub warehouse_id: Option<String>,

    /// 收貨單參照（GRN）
    pub grn_ref: Option<String>,

    /// 分配持有者
    pub allocation: Option<AllocationHolder>,

    /// 發料參照（發料單號）
    pub issue_ref: Option<String>,

    /// 累計廢料長度（mm）
    pub scrap_length_mm: Decimal,

    /// 報廢原因
    pub scrap_reason: Option<String>,

    /// 收貨日期（FIFO 排序鍵）
    pub receipt_date: NaiveDate,

    /// 樂觀鎖版本號（每次變更遞增）
    pub version: u64,
}

impl MaterialPiece {
    /// 創建新料件（收貨時建立，目前長度 = 原始長度）
    pub fn new(
        piece_no: String,
        spec: MaterialSpec,
        length_mm: Decimal,
        receipt_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            piece_no,
            spec,
            original_length_mm: length_mm,
            current_length_mm: length_mm,
            status: PieceStatus::Available,
            warehouse_id: None,
            grn_ref: None,
            allocation: None,
            issue_ref: None,
            scrap_length_mm: Decimal::ZERO,
            scrap_reason: None,
            receipt_date,
            version: 1,
        }
    }

    /// 建構器模式：設置倉庫
    pub fn with_warehouse_id(mut self, warehouse_id: String) -> Self {
        self.warehouse_id = Some(warehouse_id);
        self
    }

    /// 建構器模式：設置收貨單參照
    pub fn with_grn_ref(mut self, grn_ref: String) -> Self {
        self.grn_ref = Some(grn_ref);
        self
    }

    /// 檢查是否可被預留
    ///
    /// 可用或部分消耗（餘料回池）且未被任何單據持有。
    pub fn is_reservable(&self) -> bool {
        matches!(
            self.status,
            PieceStatus::Available | PieceStatus::PartiallyConsumed
        ) && self.allocation.is_none()
    }

    /// 已切出的累計長度（mm）
    pub fn consumed_length_mm(&self) -> Decimal {
        self.original_length_mm - self.current_length_mm
    }

    /// 預留料件
    ///
    /// 僅允許可預留狀態；否則回傳 `Conflict`。
    pub fn reserve(&mut self, holder: AllocationHolder) -> Result<()> {
        if !self.is_reservable() {
            return Err(StoresError::Conflict(format!(
                "料件 {} 無法預留：狀態 {:?}，持有者 {:?}",
                self.piece_no, self.status, self.allocation
            )));
        }
        self.allocation = Some(holder);
        self.status = PieceStatus::Allocated;
        self.version += 1;
        Ok(())
    }

    /// 釋放預留（冪等）
    ///
    /// 已是未持有狀態時為安全 no-op（回傳 false）；
    /// 被其他單據持有時回傳 `Conflict`。
    /// 釋放後依是否已被切割回到 Available 或 PartiallyConsumed。
    pub fn release(&mut self, holder: AllocationHolder) -> Result<bool> {
        match self.allocation {
            None => Ok(false),
            Some(current) if current == holder => {
                self.allocation = None;
                self.status = if self.current_length_mm < self.original_length_mm {
                    PieceStatus::PartiallyConsumed
                } else {
                    PieceStatus::Available
                };
                self.version += 1;
                Ok(true)
            }
            Some(current) => Err(StoresError::Conflict(format!(
                "料件 {} 由 {:?} 持有，{:?} 無法釋放",
                self.piece_no, current, holder
            ))),
        }
    }

    /// 消耗料件（切割）
    ///
    /// 僅允許已分配狀態，與長度扣減為同一原子變更。
    /// 餘料 ≥ `min_scrap_length_mm` 時料件轉為部分消耗並回到可用池；
    /// 否則整支結案：餘料 > 0 記為廢料，餘料 = 0 為已消耗。
    /// `issued_whole` 表示整支未經切割直接發出（狀態記為已發料）。
    pub fn consume(
        &mut self,
        length_used_mm: Decimal,
        min_scrap_length_mm: Decimal,
        issued_whole: bool,
    ) -> Result<ConsumeOutcome> {
        let outcomes = self.consume_cuts(&[length_used_mm], min_scrap_length_mm, issued_whole)?;
        Ok(outcomes[0])
    }

    /// 依序消耗多刀（同一支料件、同一次發料）
    ///
    /// 整支料件的狀態轉換只在最後一刀發生；中間每刀僅扣減長度，
    /// 回傳每刀的剩餘長度供用料履歷記錄。任一驗證失敗即整批拒絕，
    /// 不留下切到一半的料件。
    pub fn consume_cuts(
        &mut self,
        lengths_mm: &[Decimal],
        min_scrap_length_mm: Decimal,
        issued_whole: bool,
    ) -> Result<Vec<ConsumeOutcome>> {
        if self.status != PieceStatus::Allocated {
            return Err(StoresError::Conflict(format!(
                "料件 {} 狀態 {:?}，無法消耗",
                self.piece_no, self.status
            )));
        }
        if lengths_mm.is_empty() {
            return Err(StoresError::InvalidCutLength(
                "切割清單不可為空".to_string(),
            ));
        }
        for &length in lengths_mm {
            if length <= Decimal::ZERO {
                return Err(StoresError::InvalidCutLength(format!(
                    "切割長度必須為正值，得到 {length}mm"
                )));
            }
        }
        let total: Decimal = lengths_mm.iter().copied().sum();
        if total > self.current_length_mm {
            return Err(StoresError::InvalidCutLength(format!(
                "料件 {} 目前長度 {}mm，無法切出合計 {}mm",
                self.piece_no, self.current_length_mm, total
            )));
        }

        let mut remaining = self.current_length_mm;
        let mut outcomes = Vec::with_capacity(lengths_mm.len());
        for &length in lengths_mm {
            remaining -= length;
            outcomes.push(ConsumeOutcome {
                remainder_mm: remaining,
                became_scrap: false,
            });
        }

        // 最終狀態由最後一刀之後的餘料決定
        self.current_length_mm = remaining;
        if remaining > Decimal::ZERO && remaining >= min_scrap_length_mm {
            self.status = PieceStatus::PartiallyConsumed;
            self.allocation = None;
        } else if remaining > Decimal::ZERO {
            self.status = PieceStatus::Scrap;
            self.scrap_length_mm += remaining;
            self.scrap_reason = Some(format!(
                "餘料 {remaining}mm 低於最小可用長度 {min_scrap_length_mm}mm"
            ));
            if let Some(last) = outcomes.last_mut() {
                last.became_scrap = true;
            }
        } else {
            self.status = if issued_whole {
                PieceStatus::Issued
            } else {
                PieceStatus::Consumed
            };
        }
        self.version += 1;

        Ok(outcomes)
    }

    /// 標記發料參照（發料執行時由草稿管理器呼叫）
    pub fn set_issue_ref(&mut self, issue_no: String) {
        self.issue_ref = Some(issue_no);
        self.version += 1;
    }
}
