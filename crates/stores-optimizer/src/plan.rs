//! 裁切計劃模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stores_core::CutRequirement;

/// 裁切策略
///
/// 三種確定性啟發式，共用同一套 first-fit-decreasing 裝填流程，
/// 只在料件與切割的排序上不同。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanStrategy {
    /// 最少廢料：跨已開封與未開封料件做 best-fit
    MinimizeScrap,
    /// 最少用料支數：優先填滿已開封料件，開新料時依原始長度取最長者
    MinimizeBarCount,
    /// 先進先出：嚴格依收貨日期取料，維持庫存輪轉
    FifoFirst,
}

impl PlanStrategy {
    /// 全部策略（固定順序，用於確定性排名）
    pub const ALL: [PlanStrategy; 3] = [
        PlanStrategy::MinimizeScrap,
        PlanStrategy::MinimizeBarCount,
        PlanStrategy::FifoFirst,
    ];

    /// 策略名稱
    pub fn label(self) -> &'static str {
        match self {
            Self::MinimizeScrap => "最少廢料",
            Self::MinimizeBarCount => "最少用料支數",
            Self::FifoFirst => "先進先出",
        }
    }

    /// 排名用索引（其他條件相同時依此決定順序）
    pub fn rank(self) -> u8 {
        match self {
            Self::MinimizeScrap => 0,
            Self::MinimizeBarCount => 1,
            Self::FifoFirst => 2,
        }
    }
}

/// 計劃中的一刀
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedCut {
    /// 切割順序（同一支料件內）
    pub sequence: u32,

    /// 切割長度（mm）
    pub length_mm: Decimal,

    /// 來源領料明細ID
    pub requisition_item_id: Uuid,

    /// 來源領料單號
    pub requisition_no: String,

    /// 工單號（追溯用）
    pub job_card_no: Option<String>,
}

impl PlannedCut {
    /// 由切割需求建立
    pub fn from_requirement(sequence: u32, requirement: &CutRequirement) -> Self {
        Self {
            sequence,
            length_mm: requirement.length_mm,
            requisition_item_id: requirement.requisition_item_id,
            requisition_no: requirement.requisition_no.clone(),
            job_card_no: requirement.job_card_no.clone(),
        }
    }
}

/// 計劃中的一支料件與其承載的切割
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedBar {
    /// 料件順序（計劃內）
    pub sequence: u32,

    /// 料件ID
    pub piece_id: Uuid,

    /// 料件編號
    pub piece_no: String,

    /// 快照時的可用長度（mm）
    pub available_length_mm: Decimal,

    /// 有序切割
    pub cuts: Vec<PlannedCut>,

    /// 總切割長度（mm）
    pub used_length_mm: Decimal,

    /// 剩餘長度（mm）
    pub remaining_length_mm: Decimal,

    /// 剩餘是否將成為廢料（0 < 剩餘 < 最小可用長度）
    pub will_be_scrap: bool,
}

/// 裁切計劃：一組切割需求對料件的完整指派
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuttingPlan {
    /// 產生此計劃的策略
    pub strategy: PlanStrategy,

    /// 有序用料
    pub bars: Vec<PlannedBar>,

    /// 用料支數
    pub total_bars: usize,

    /// 總切割長度（mm）
    pub total_cut_length_mm: Decimal,

    /// 預計廢料總長度（mm）
    pub total_scrap_length_mm: Decimal,

    /// 是否涵蓋全部切割需求
    pub is_complete: bool,

    /// 無法指派的切割需求（不足料時回報，不默默丟棄）
    pub unassigned: Vec<CutRequirement>,
}

impl CuttingPlan {
    /// 已開封料件的利用率（百分比）
    pub fn utilisation_pct(&self) -> Decimal {
        let offered: Decimal = self.bars.iter().map(|b| b.available_length_mm).sum();
        if offered.is_zero() {
            return Decimal::ZERO;
        }
        self.total_cut_length_mm * Decimal::from(100) / offered
    }

    /// 指派摘要：(料件, 切割長度序列)，用於計劃去重
    pub fn assignment_signature(&self) -> Vec<(Uuid, Vec<Decimal>)> {
        self.bars
            .iter()
            .map(|b| (b.piece_id, b.cuts.iter().map(|c| c.length_mm).collect()))
            .collect()
    }
}
