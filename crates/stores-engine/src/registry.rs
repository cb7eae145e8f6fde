//! 料件登錄簿：實體料件狀態的唯一擁有者

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

use stores_core::{
    AllocationHolder, ConsumeOutcome, Material, MaterialPiece, PieceFilter, Result, StoresError,
};

/// 料件登錄簿
///
/// 所有預留/釋放/消耗操作都經由此處，并以料件版本號做樂觀併發檢查：
/// 「檢查可用、再預留」對單一料件是原子的，不存在檢查與動作之間的空窗。
/// 料件一經切割永不實體刪除（稽核軌跡）。
pub struct PieceRegistry {
    pieces: HashMap<Uuid, MaterialPiece>,
}

impl PieceRegistry {
    /// 創建空的登錄簿
    pub fn new() -> Self {
        Self {
            pieces: HashMap::new(),
        }
    }

    /// 登錄單支料件（收貨入庫）
    pub fn add_piece(&mut self, piece: MaterialPiece) -> Uuid {
        let id = piece.id;
        tracing::debug!("登錄料件 {}：{}mm", piece.piece_no, piece.current_length_mm);
        self.pieces.insert(id, piece);
        id
    }

    /// 批次收貨：同一張收貨單的多支料件，依序編號
    pub fn receive_pieces(
        &mut self,
        material: &Material,
        grn_ref: &str,
        warehouse_id: &str,
        lengths_mm: &[Decimal],
        receipt_date: NaiveDate,
    ) -> Vec<Uuid> {
        let mut ids = Vec::with_capacity(lengths_mm.len());
        for (index, &length) in lengths_mm.iter().enumerate() {
            let piece = MaterialPiece::new(
                format!("{}-{:03}", grn_ref, index + 1),
                material.spec(),
                length,
                receipt_date,
            )
            .with_grn_ref(grn_ref.to_string())
            .with_warehouse_id(warehouse_id.to_string());
            ids.push(self.add_piece(piece));
        }
        tracing::info!(
            "收貨 {}：物料 {} 共 {} 支",
            grn_ref,
            material.code,
            ids.len()
        );
        ids
    }

    /// 查詢單支料件
    pub fn get(&self, piece_id: Uuid) -> Option<&MaterialPiece> {
        self.pieces.get(&piece_id)
    }

    /// 全部料件（稽核/盤點用）
    pub fn pieces(&self) -> impl Iterator<Item = &MaterialPiece> {
        self.pieces.values()
    }

    /// 料件總數
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    /// 是否為空
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// 查詢可用料件快照
    ///
    /// 回傳可預留料件（可用或餘料回池）的複本，
    /// 依收貨日期升冪、再依料件編號升冪排序（確定性 FIFO 順序）。
    pub fn get_available(&self, filter: &PieceFilter) -> Vec<MaterialPiece> {
        let mut available: Vec<MaterialPiece> = self
            .pieces
            .values()
            .filter(|p| p.is_reservable() && filter.matches(&p.spec))
            .cloned()
            .collect();
        available.sort_by(|a, b| {
            a.receipt_date
                .cmp(&b.receipt_date)
                .then_with(|| a.piece_no.cmp(&b.piece_no))
        });
        available
    }

    /// 可用總長度（mm）
    pub fn available_length_mm(&self, filter: &PieceFilter) -> Decimal {
        self.get_available(filter)
            .iter()
            .map(|p| p.current_length_mm)
            .sum()
    }

    /// 預留料件（compare-and-swap）
    ///
    /// `expected_version` 來自呼叫端的快照；版本不符表示料件已被
    /// 併發變更，回傳 `Conflict` 讓呼叫端重新規劃。
    pub fn reserve(
        &mut self,
        piece_id: Uuid,
        holder: AllocationHolder,
        expected_version: u64,
    ) -> Result<()> {
        let piece = self
            .pieces
            .get_mut(&piece_id)
            .ok_or(StoresError::PieceNotFound(piece_id))?;
        if piece.version != expected_version {
            return Err(StoresError::Conflict(format!(
                "料件 {} 版本已變更（快照 {}，目前 {}）",
                piece.piece_no, expected_version, piece.version
            )));
        }
        piece.reserve(holder)?;
        tracing::debug!("預留料件 {} 給 {:?}", piece.piece_no, holder);
        Ok(())
    }

    /// 釋放料件（冪等）
    ///
    /// 料件已是未持有狀態時為安全 no-op。
    pub fn release(&mut self, piece_id: Uuid, holder: AllocationHolder) -> Result<bool> {
        let piece = self
            .pieces
            .get_mut(&piece_id)
            .ok_or(StoresError::PieceNotFound(piece_id))?;
        let released = piece.release(holder)?;
        if released {
            tracing::debug!("釋放料件 {}（{:?}）", piece.piece_no, holder);
        }
        Ok(released)
    }

    /// 釋放某持有者名下的全部料件，回傳釋放支數
    pub fn release_holder(&mut self, holder: AllocationHolder) -> usize {
        let mut count = 0;
        for piece in self.pieces.values_mut() {
            if piece.allocation == Some(holder) {
                // 持有者相符，release 不會失敗
                if piece.release(holder).unwrap_or(false) {
                    count += 1;
                }
            }
        }
        tracing::debug!("釋放 {:?} 名下料件 {} 支", holder, count);
        count
    }

    /// 消耗料件（單刀切割）
    pub fn consume(
        &mut self,
        piece_id: Uuid,
        length_used_mm: Decimal,
        min_scrap_length_mm: Decimal,
        issued_whole: bool,
    ) -> Result<ConsumeOutcome> {
        let piece = self
            .pieces
            .get_mut(&piece_id)
            .ok_or(StoresError::PieceNotFound(piece_id))?;
        let outcome = piece.consume(length_used_mm, min_scrap_length_mm, issued_whole)?;
        tracing::debug!(
            "消耗料件 {}：切 {}mm，餘 {}mm{}",
            piece.piece_no,
            length_used_mm,
            outcome.remainder_mm,
            if outcome.became_scrap { "（廢料）" } else { "" }
        );
        Ok(outcome)
    }

    /// 消耗料件（同一支多刀，與長度扣減同屬一次原子變更）
    pub fn consume_bar(
        &mut self,
        piece_id: Uuid,
        lengths_mm: &[Decimal],
        min_scrap_length_mm: Decimal,
        issued_whole: bool,
    ) -> Result<Vec<ConsumeOutcome>> {
        let piece = self
            .pieces
            .get_mut(&piece_id)
            .ok_or(StoresError::PieceNotFound(piece_id))?;
        let outcomes = piece.consume_cuts(lengths_mm, min_scrap_length_mm, issued_whole)?;
        tracing::debug!(
            "消耗料件 {}：{} 刀，末狀態 {:?}",
            piece.piece_no,
            lengths_mm.len(),
            piece.status
        );
        Ok(outcomes)
    }

    /// 標記發料參照
    pub fn stamp_issue_ref(&mut self, piece_id: Uuid, issue_no: &str) -> Result<()> {
        let piece = self
            .pieces
            .get_mut(&piece_id)
            .ok_or(StoresError::PieceNotFound(piece_id))?;
        piece.set_issue_ref(issue_no.to_string());
        Ok(())
    }

    /// 調撥：移動料件至其他倉庫，不改變狀態，回傳移動支數
    pub fn relocate(
        &mut self,
        piece_ids: &[Uuid],
        to_warehouse_id: &str,
        relocated_by: &str,
    ) -> usize {
        let mut count = 0;
        for piece_id in piece_ids {
            if let Some(piece) = self.pieces.get_mut(piece_id) {
                piece.warehouse_id = Some(to_warehouse_id.to_string());
                piece.version += 1;
                count += 1;
            }
        }
        tracing::info!(
            "調撥 {} 支料件至 {}（經手人 {}）",
            count,
            to_warehouse_id,
            relocated_by
        );
        count
    }
}

impl Default for PieceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_material() -> Material {
        Material::new(
            "RM-S45C-32".to_string(),
            "中碳鋼棒".to_string(),
            "S45C".to_string(),
            Decimal::from(32),
        )
        .with_min_scrap_length(Decimal::from(300))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_receive_and_query() {
        let mut registry = PieceRegistry::new();
        let material = test_material();

        registry.receive_pieces(
            &material,
            "GRN-001",
            "WH-01",
            &[Decimal::from(6000), Decimal::from(4000)],
            date(2026, 8, 1),
        );

        let filter = PieceFilter::new(material.id);
        let available = registry.get_available(&filter);
        assert_eq!(available.len(), 2);
        assert_eq!(available[0].piece_no, "GRN-001-001");
        assert_eq!(registry.available_length_mm(&filter), Decimal::from(10000));
    }

    #[test]
    fn test_fifo_order_by_receipt_date() {
        let mut registry = PieceRegistry::new();
        let material = test_material();

        // 後收的先登錄，驗證排序不受登錄順序影響
        registry.receive_pieces(
            &material,
            "GRN-B",
            "WH-01",
            &[Decimal::from(6000)],
            date(2026, 8, 10),
        );
        registry.receive_pieces(
            &material,
            "GRN-A",
            "WH-01",
            &[Decimal::from(6000)],
            date(2026, 8, 1),
        );

        let available = registry.get_available(&PieceFilter::new(material.id));
        assert_eq!(available[0].grn_ref.as_deref(), Some("GRN-A"));
        assert_eq!(available[1].grn_ref.as_deref(), Some("GRN-B"));
    }

    #[test]
    fn test_reserve_version_conflict() {
        let mut registry = PieceRegistry::new();
        let material = test_material();
        let ids = registry.receive_pieces(
            &material,
            "GRN-001",
            "WH-01",
            &[Decimal::from(6000)],
            date(2026, 8, 1),
        );
        let piece_id = ids[0];

        let snapshot = registry.get_available(&PieceFilter::new(material.id));
        let snapshot_version = snapshot[0].version;

        // 第一位規劃者預留成功
        let draft_a = AllocationHolder::Draft(Uuid::new_v4());
        registry.reserve(piece_id, draft_a, snapshot_version).unwrap();

        // 第二位規劃者持相同快照版本，CAS 失敗
        let draft_b = AllocationHolder::Draft(Uuid::new_v4());
        let err = registry.reserve(piece_id, draft_b, snapshot_version);
        assert!(matches!(err, Err(StoresError::Conflict(_))));

        // 預留中的料件不再出現在可用清單
        assert!(registry.get_available(&PieceFilter::new(material.id)).is_empty());
    }

    #[test]
    fn test_release_holder() {
        let mut registry = PieceRegistry::new();
        let material = test_material();
        let ids = registry.receive_pieces(
            &material,
            "GRN-001",
            "WH-01",
            &[Decimal::from(6000), Decimal::from(4000), Decimal::from(3000)],
            date(2026, 8, 1),
        );

        let draft = AllocationHolder::Draft(Uuid::new_v4());
        for &id in &ids[..2] {
            let version = registry.get(id).unwrap().version;
            registry.reserve(id, draft, version).unwrap();
        }

        assert_eq!(registry.release_holder(draft), 2);
        // 再次釋放：名下已無料件
        assert_eq!(registry.release_holder(draft), 0);
        assert_eq!(
            registry.get_available(&PieceFilter::new(material.id)).len(),
            3
        );
    }

    #[test]
    fn test_relocate_keeps_status() {
        let mut registry = PieceRegistry::new();
        let material = test_material();
        let ids = registry.receive_pieces(
            &material,
            "GRN-001",
            "WH-01",
            &[Decimal::from(6000), Decimal::from(4000)],
            date(2026, 8, 1),
        );

        let draft = AllocationHolder::Draft(Uuid::new_v4());
        let version = registry.get(ids[0]).unwrap().version;
        registry.reserve(ids[0], draft, version).unwrap();

        // 含一個不存在的ID，計數只算實際移動者
        let moved = registry.relocate(
            &[ids[0], ids[1], Uuid::new_v4()],
            "WH-02",
            "王五",
        );
        assert_eq!(moved, 2);
        let piece = registry.get(ids[0]).unwrap();
        assert_eq!(piece.warehouse_id.as_deref(), Some("WH-02"));
        assert_eq!(piece.status, stores_core::PieceStatus::Allocated);
    }
}
