//! FIFO 自動分配器
//!
//! 依收貨日期先進先出挑選料件滿足長度需求。先進先出是庫存輪轉的
//! 業務政策而非成本最佳化目標，因此只做單次貪婪掃描、不做任何最佳化。

use rust_decimal::Decimal;
use uuid::Uuid;

use stores_core::{AllocationHolder, MaterialPiece, PieceFilter, Result, StoresError};

use crate::registry::PieceRegistry;

/// 分配行：一支料件與從其取用的長度
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationLine {
    /// 料件ID
    pub piece_id: Uuid,

    /// 料件編號
    pub piece_no: String,

    /// 取用長度（mm）
    pub length_taken_mm: Decimal,
}

/// 分配結果
#[derive(Debug, Clone)]
pub struct AllocationResult {
    /// 領料單ID
    pub requisition_id: Uuid,

    /// 分配行（依 FIFO 順序）
    pub lines: Vec<AllocationLine>,

    /// 分配總長度（mm）
    pub total_mm: Decimal,
}

/// FIFO 分配器
pub struct FifoAllocator;

impl FifoAllocator {
    /// 純預覽：在快照上規劃分配鏈，不改變任何狀態
    ///
    /// 依序整支取用，鏈上最後一支可部分取用。
    /// 回傳（分配行, 已覆蓋長度）；覆蓋不足時由呼叫端判斷。
    pub fn plan_allocation(
        available: &[MaterialPiece],
        required_length_mm: Decimal,
    ) -> (Vec<AllocationLine>, Decimal) {
        let mut lines = Vec::new();
        let mut covered = Decimal::ZERO;

        for piece in available {
            if covered >= required_length_mm {
                break;
            }
            let take = (required_length_mm - covered).min(piece.current_length_mm);
            lines.push(AllocationLine {
                piece_id: piece.id,
                piece_no: piece.piece_no.clone(),
                length_taken_mm: take,
            });
            covered += take;
        }

        (lines, covered)
    }

    /// 分配：挑選並立即預留，全有或全無
    ///
    /// 規劃與預留在同一呼叫內完成，料件不會出現「看似可用、
    /// 實已內定」的空窗。庫存不足時不做任何預留，
    /// 回傳 `InsufficientStock` 與缺口資訊。
    pub fn allocate(
        registry: &mut PieceRegistry,
        filter: &PieceFilter,
        required_length_mm: Decimal,
        requisition_id: Uuid,
    ) -> Result<AllocationResult> {
        let available = registry.get_available(filter);
        let (lines, covered) = Self::plan_allocation(&available, required_length_mm);

        if covered < required_length_mm {
            tracing::info!(
                "FIFO 分配失敗：物料 {} 需求 {}mm，可用 {}mm",
                filter.material_id,
                required_length_mm,
                covered
            );
            return Err(StoresError::InsufficientStock {
                material_id: filter.material_id,
                required_mm: required_length_mm,
                available_mm: available.iter().map(|p| p.current_length_mm).sum(),
            });
        }

        let holder = AllocationHolder::Requisition(requisition_id);
        let versions: Vec<u64> = available
            .iter()
            .take(lines.len())
            .map(|p| p.version)
            .collect();

        // 逐支以快照版本預留；任一失敗即回退已預留者，不留半套狀態
        let mut reserved: Vec<Uuid> = Vec::with_capacity(lines.len());
        for (line, &version) in lines.iter().zip(versions.iter()) {
            if let Err(error) = registry.reserve(line.piece_id, holder, version) {
                for &piece_id in &reserved {
                    // 回退自己剛建立的預留，持有者必相符
                    let _ = registry.release(piece_id, holder);
                }
                return Err(error);
            }
            reserved.push(line.piece_id);
        }

        tracing::info!(
            "FIFO 分配完成：領料單 {} 取 {} 支共 {}mm",
            requisition_id,
            lines.len(),
            covered
        );

        Ok(AllocationResult {
            requisition_id,
            lines,
            total_mm: covered,
        })
    }
}
