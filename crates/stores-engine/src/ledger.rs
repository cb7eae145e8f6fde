//! 領料帳：領料單與明細的狀態總帳
//!
//! Allocated/Issued 只能由分配與發料事件寫入；
//! 人工調整僅限 Pending/Approved/Rejected 之間。

use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

use stores_core::{
    AllocationHolder, MaterialRequisition, RequisitionStatus, Result, StoresError,
};

use crate::registry::PieceRegistry;

/// 領料帳
pub struct RequisitionLedger {
    requisitions: HashMap<Uuid, MaterialRequisition>,
}

impl RequisitionLedger {
    /// 創建空帳
    pub fn new() -> Self {
        Self {
            requisitions: HashMap::new(),
        }
    }

    /// 登錄領料單
    pub fn add(&mut self, requisition: MaterialRequisition) -> Uuid {
        let id = requisition.id;
        tracing::debug!(
            "登錄領料單 {}：{} 行明細",
            requisition.requisition_no,
            requisition.items.len()
        );
        self.requisitions.insert(id, requisition);
        id
    }

    /// 查詢領料單
    pub fn get(&self, requisition_id: Uuid) -> Option<&MaterialRequisition> {
        self.requisitions.get(&requisition_id)
    }

    /// 全部領料單
    pub fn requisitions(&self) -> impl Iterator<Item = &MaterialRequisition> {
        self.requisitions.values()
    }

    /// 人工調整狀態（僅限 Pending/Approved/Rejected 之間）
    pub fn set_status(&mut self, requisition_id: Uuid, to: RequisitionStatus) -> Result<()> {
        let requisition = self
            .requisitions
            .get_mut(&requisition_id)
            .ok_or(StoresError::RequisitionNotFound(requisition_id))?;
        if !requisition.status.can_manually_set(to) {
            return Err(StoresError::invalid_transition(requisition.status, to));
        }
        tracing::info!(
            "領料單 {} 狀態 {:?} → {:?}",
            requisition.requisition_no,
            requisition.status,
            to
        );
        requisition.status = to;
        Ok(())
    }

    /// 核准領料單
    pub fn approve(&mut self, requisition_id: Uuid) -> Result<()> {
        self.set_status(requisition_id, RequisitionStatus::Approved)
    }

    /// 駁回領料單
    pub fn reject(&mut self, requisition_id: Uuid) -> Result<()> {
        self.set_status(requisition_id, RequisitionStatus::Rejected)
    }

    /// 檢查明細是否存在
    pub fn contains_item(&self, item_id: Uuid) -> bool {
        self.requisitions
            .values()
            .any(|r| r.item(item_id).is_some())
    }

    /// 記錄分配事件（分配器為唯一呼叫端）
    pub fn post_allocation(&mut self, item_id: Uuid, length_mm: Decimal) -> Result<()> {
        let requisition = self
            .requisitions
            .values_mut()
            .find(|r| r.item(item_id).is_some())
            .ok_or(StoresError::RequisitionItemNotFound(item_id))?;
        if let Some(item) = requisition.item_mut(item_id) {
            item.post_allocation(length_mm);
        }
        requisition.rollup_status();
        Ok(())
    }

    /// 記錄發料事件（發料草稿管理器為唯一呼叫端）
    pub fn post_issue(&mut self, item_id: Uuid, length_mm: Decimal) -> Result<()> {
        let requisition = self
            .requisitions
            .values_mut()
            .find(|r| r.item(item_id).is_some())
            .ok_or(StoresError::RequisitionItemNotFound(item_id))?;
        if let Some(item) = requisition.item_mut(item_id) {
            item.post_issue(length_mm);
        }
        requisition.rollup_status();
        Ok(())
    }

    /// 解除分配：釋放領料單名下全部料件並重置未發料明細
    ///
    /// 回傳釋放的料件支數。
    pub fn deallocate(
        &mut self,
        requisition_id: Uuid,
        registry: &mut PieceRegistry,
    ) -> Result<usize> {
        let requisition = self
            .requisitions
            .get_mut(&requisition_id)
            .ok_or(StoresError::RequisitionNotFound(requisition_id))?;

        let released = registry.release_holder(AllocationHolder::Requisition(requisition_id));

        for item in &mut requisition.items {
            if item.status == stores_core::ItemStatus::Allocated {
                item.allocated_mm = Decimal::ZERO;
                item.status = stores_core::ItemStatus::Pending;
            }
        }
        if requisition.status == RequisitionStatus::Allocated {
            requisition.status = RequisitionStatus::Approved;
        }

        tracing::info!(
            "解除分配：領料單 {} 釋放 {} 支料件",
            requisition.requisition_no,
            released
        );
        Ok(released)
    }
}

impl Default for RequisitionLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use stores_core::{LineItemRef, MaterialRequisitionItem};

    fn test_requisition(material_id: Uuid) -> MaterialRequisition {
        MaterialRequisition::new(
            "MR-2026-001".to_string(),
            NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
        )
        .with_items(vec![MaterialRequisitionItem::new(
            LineItemRef::Material { material_id },
            Decimal::from(2000),
            2,
        )])
    }

    #[test]
    fn test_manual_transitions() {
        let mut ledger = RequisitionLedger::new();
        let requisition_id = ledger.add(test_requisition(Uuid::new_v4()));

        ledger.approve(requisition_id).unwrap();
        assert_eq!(
            ledger.get(requisition_id).unwrap().status,
            RequisitionStatus::Approved
        );

        // Approved → Allocated 不允許人工寫入
        assert!(ledger
            .set_status(requisition_id, RequisitionStatus::Allocated)
            .is_err());

        ledger.reject(requisition_id).unwrap();
        // Rejected 之後不可再核准
        assert!(ledger.approve(requisition_id).is_err());
    }

    #[test]
    fn test_event_driven_rollup() {
        let mut ledger = RequisitionLedger::new();
        let requisition = test_requisition(Uuid::new_v4());
        let item_id = requisition.items[0].id;
        let requisition_id = ledger.add(requisition);
        ledger.approve(requisition_id).unwrap();

        ledger.post_allocation(item_id, Decimal::from(4000)).unwrap();
        assert_eq!(
            ledger.get(requisition_id).unwrap().status,
            RequisitionStatus::Allocated
        );

        ledger.post_issue(item_id, Decimal::from(4000)).unwrap();
        assert_eq!(
            ledger.get(requisition_id).unwrap().status,
            RequisitionStatus::Issued
        );

        // 不存在的明細
        assert!(ledger
            .post_issue(Uuid::new_v4(), Decimal::from(100))
            .is_err());
    }

    #[test]
    fn test_deallocate_releases_pieces_and_resets_items() {
        let mut ledger = RequisitionLedger::new();
        let mut registry = PieceRegistry::new();
        let material = stores_core::Material::new(
            "RM-001".to_string(),
            "鋼棒".to_string(),
            "S45C".to_string(),
            Decimal::from(32),
        );

        registry.receive_pieces(
            &material,
            "GRN-001",
            "WH-01",
            &[Decimal::from(6000)],
            NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
        );

        let requisition = test_requisition(material.id);
        let item_id = requisition.items[0].id;
        let requisition_id = ledger.add(requisition);
        ledger.approve(requisition_id).unwrap();

        crate::allocator::FifoAllocator::allocate(
            &mut registry,
            &stores_core::PieceFilter::new(material.id),
            Decimal::from(4000),
            requisition_id,
        )
        .unwrap();
        ledger.post_allocation(item_id, Decimal::from(4000)).unwrap();
        assert_eq!(
            ledger.get(requisition_id).unwrap().status,
            RequisitionStatus::Allocated
        );

        let released = ledger.deallocate(requisition_id, &mut registry).unwrap();
        assert_eq!(released, 1);
        let requisition = ledger.get(requisition_id).unwrap();
        assert_eq!(requisition.status, RequisitionStatus::Approved);
        assert_eq!(requisition.items[0].allocated_mm, Decimal::ZERO);
        assert_eq!(
            registry
                .get_available(&stores_core::PieceFilter::new(material.id))
                .len(),
            1
        );
    }
}
