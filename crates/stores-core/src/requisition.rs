//! 領料單模型

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 領料單狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequisitionStatus {
    /// 待審核
    Pending,
    /// 已核准
    Approved,
    /// 已分配（由分配/發料流程寫入）
    Allocated,
    /// 已發料（由發料流程寫入）
    Issued,
    /// 已駁回
    Rejected,
}

impl RequisitionStatus {
    /// 檢查是否允許人工調整至目標狀態
    ///
    /// 人工調整僅限 Pending/Approved/Rejected 之間；
    /// Allocated/Issued 只能由分配與發料事件寫入。
    pub fn can_manually_set(self, to: RequisitionStatus) -> bool {
        use RequisitionStatus::*;
        matches!(
            (self, to),
            (Pending, Approved) | (Pending, Rejected) | (Approved, Rejected)
        )
    }
}

/// 領料明細狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    /// 待處理
    Pending,
    /// 已分配
    Allocated,
    /// 已發料
    Issued,
    /// 已駁回
    Rejected,
}

/// 明細標的：原物料或子件
///
/// 以 sum type 表達「恰好其一」，切割發料僅處理原物料行。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineItemRef {
    /// 原物料
    Material { material_id: Uuid },
    /// 子件/半成品（不經切割發料）
    ChildPart { part_id: Uuid },
}

impl LineItemRef {
    /// 檢查是否為原物料行
    pub fn is_material(&self) -> bool {
        matches!(self, Self::Material { .. })
    }

    /// 取得原物料ID（子件行回傳 None）
    pub fn material_id(&self) -> Option<Uuid> {
        match self {
            Self::Material { material_id } => Some(*material_id),
            Self::ChildPart { .. } => None,
        }
    }
}

/// 領料明細
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialRequisitionItem {
    /// 明細ID
    pub id: Uuid,

    /// 明細標的
    pub line: LineItemRef,

    /// 單支所需長度（mm）
    pub unit_length_mm: Decimal,

    /// 所需支數
    pub quantity: u32,

    /// 已分配長度（mm）
    pub allocated_mm: Decimal,

    /// 已發料長度（mm）
    pub issued_mm: Decimal,

    /// 明細狀態
    pub status: ItemStatus,
}

impl MaterialRequisitionItem {
    /// 創建新的領料明細
    pub fn new(line: LineItemRef, unit_length_mm: Decimal, quantity: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            line,
            unit_length_mm,
            quantity,
            allocated_mm: Decimal::ZERO,
            issued_mm: Decimal::ZERO,
            status: ItemStatus::Pending,
        }
    }

    /// 總需求長度（mm）= 單支長度 × 支數
    pub fn total_required_mm(&self) -> Decimal {
        self.unit_length_mm * Decimal::from(self.quantity)
    }

    /// 檢查是否已足額分配
    pub fn is_fully_allocated(&self) -> bool {
        self.allocated_mm >= self.total_required_mm()
    }

    /// 檢查是否已足額發料
    pub fn is_fully_issued(&self) -> bool {
        self.issued_mm >= self.total_required_mm()
    }

    /// 記錄分配（由分配流程呼叫）
    pub fn post_allocation(&mut self, length_mm: Decimal) {
        self.allocated_mm += length_mm;
        if self.is_fully_allocated() {
            self.status = ItemStatus::Allocated;
        }
    }

    /// 記錄發料（由發料流程呼叫）
    pub fn post_issue(&mut self, length_mm: Decimal) {
        self.issued_mm += length_mm;
        if self.is_fully_issued() {
            self.status = ItemStatus::Issued;
        }
    }
}

/// 領料單：工單對物料的領用需求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialRequisition {
    /// 領料單ID
    pub id: Uuid,

    /// 領料單號
    pub requisition_no: String,

    /// 工單號
    pub job_card_no: Option<String>,

    /// 優先級（1-10，10最高）
    pub priority: u8,

    /// 需求日期
    pub due_date: NaiveDate,

    /// 領料單狀態
    pub status: RequisitionStatus,

    /// 領料明細
    pub items: Vec<MaterialRequisitionItem>,
}

impl MaterialRequisition {
    /// 創建新的領料單（初始為待審核）
    pub fn new(requisition_no: String, due_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            requisition_no,
            job_card_no: None,
            priority: 5,
            due_date,
            status: RequisitionStatus::Pending,
            items: Vec::new(),
        }
    }

    /// 建構器模式：設置工單號
    pub fn with_job_card_no(mut self, job_card_no: String) -> Self {
        self.job_card_no = Some(job_card_no);
        self
    }

    /// 建構器模式：設置優先級
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.min(10);
        self
    }

    /// 建構器模式：設置明細
    pub fn with_items(mut self, items: Vec<MaterialRequisitionItem>) -> Self {
        self.items = items;
        self
    }

    /// 添加明細
    pub fn add_item(&mut self, item: MaterialRequisitionItem) {
        self.items.push(item);
    }

    /// 依ID查詢明細
    pub fn item(&self, item_id: Uuid) -> Option<&MaterialRequisitionItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    /// 依ID查詢明細（可變）
    pub fn item_mut(&mut self, item_id: Uuid) -> Option<&mut MaterialRequisitionItem> {
        self.items.iter_mut().find(|i| i.id == item_id)
    }

    /// 原物料明細（發料視窗只處理這些行）
    pub fn material_items(&self) -> impl Iterator<Item = &MaterialRequisitionItem> {
        self.items.iter().filter(|i| i.line.is_material())
    }

    /// 彙總明細狀態到單頭
    ///
    /// 全部原物料明細已發料 → Issued；全部已分配以上 → Allocated。
    pub fn rollup_status(&mut self) {
        let material_items: Vec<_> = self
            .items
            .iter()
            .filter(|i| i.line.is_material() && i.status != ItemStatus::Rejected)
            .collect();
        if material_items.is_empty() {
            return;
        }

        if material_items.iter().all(|i| i.status == ItemStatus::Issued) {
            self.status = RequisitionStatus::Issued;
        } else if material_items
            .iter()
            .all(|i| matches!(i.status, ItemStatus::Allocated | ItemStatus::Issued))
        {
            self.status = RequisitionStatus::Allocated;
        }
    }
}

/// 切割需求：展開後的單一刀需求（數量 N × 長度 L → N 筆）
///
/// 由領料明細展開而來，保留回溯資訊供裁切計劃與發料草稿使用。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutRequirement {
    /// 來源領料明細ID
    pub requisition_item_id: Uuid,

    /// 來源領料單號
    pub requisition_no: String,

    /// 工單號（追溯用）
    pub job_card_no: Option<String>,

    /// 所需長度（mm）
    pub length_mm: Decimal,
}

/// 物料分組：同規格物料的全部切割需求
///
/// 切割只能在相同規格的料件上進行，最佳化以分組為單位執行。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialGroup {
    /// 物料規格
    pub spec: crate::material::MaterialSpec,

    /// 展開後的切割需求
    pub cuts: Vec<CutRequirement>,
}

impl MaterialGroup {
    /// 分組總需求長度（mm）
    pub fn total_required_mm(&self) -> Decimal {
        self.cuts.iter().map(|c| c.length_mm).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_quantities() {
        let material_id = Uuid::new_v4();
        let mut item = MaterialRequisitionItem::new(
            LineItemRef::Material { material_id },
            Decimal::from(2000),
            3,
        );

        assert_eq!(item.total_required_mm(), Decimal::from(6000));
        assert!(!item.is_fully_allocated());

        item.post_allocation(Decimal::from(6000));
        assert!(item.is_fully_allocated());
        assert_eq!(item.status, ItemStatus::Allocated);

        item.post_issue(Decimal::from(4000));
        assert_eq!(item.status, ItemStatus::Allocated); // 未足額

        item.post_issue(Decimal::from(2000));
        assert_eq!(item.status, ItemStatus::Issued);
    }

    #[test]
    fn test_line_item_ref() {
        let material_id = Uuid::new_v4();
        let material_line = LineItemRef::Material { material_id };
        let part_line = LineItemRef::ChildPart {
            part_id: Uuid::new_v4(),
        };

        assert!(material_line.is_material());
        assert_eq!(material_line.material_id(), Some(material_id));
        assert!(!part_line.is_material());
        assert_eq!(part_line.material_id(), None);
    }

    #[test]
    fn test_manual_status_rules() {
        use RequisitionStatus::*;

        assert!(Pending.can_manually_set(Approved));
        assert!(Pending.can_manually_set(Rejected));
        assert!(Approved.can_manually_set(Rejected));
        // Allocated/Issued 只能由事件寫入
        assert!(!Approved.can_manually_set(Allocated));
        assert!(!Allocated.can_manually_set(Issued));
        assert!(!Issued.can_manually_set(Pending));
    }

    #[test]
    fn test_rollup_status() {
        let material_id = Uuid::new_v4();
        let mut requisition = MaterialRequisition::new(
            "MR-2026-001".to_string(),
            NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
        )
        .with_job_card_no("JC-1001".to_string())
        .with_items(vec![
            MaterialRequisitionItem::new(
                LineItemRef::Material { material_id },
                Decimal::from(1500),
                2,
            ),
            // 子件行不影響彙總
            MaterialRequisitionItem::new(
                LineItemRef::ChildPart {
                    part_id: Uuid::new_v4(),
                },
                Decimal::ZERO,
                1,
            ),
        ]);
        requisition.status = RequisitionStatus::Approved;

        requisition.items[0].post_allocation(Decimal::from(3000));
        requisition.rollup_status();
        assert_eq!(requisition.status, RequisitionStatus::Allocated);

        requisition.items[0].post_issue(Decimal::from(3000));
        requisition.rollup_status();
        assert_eq!(requisition.status, RequisitionStatus::Issued);
    }
}
