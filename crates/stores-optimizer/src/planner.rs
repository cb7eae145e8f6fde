//! 裁切計劃建議：三策略並行求解、確定性排名

use rayon::prelude::*;
use rust_decimal::Decimal;
use tracing::{debug, info};

use stores_core::{CutRequirement, MaterialPiece};

use crate::packer::pack;
use crate::plan::{CuttingPlan, PlanStrategy};

/// 裁切計劃建議器
///
/// 對同一份料件快照以全部策略求解，依
/// （完整性、廢料、用料支數、策略序）排名後回傳最多三個
/// 互異的候選計劃。輸入相同則輸出逐位元相同。
pub struct CuttingPlanner {
    /// 最小可用長度（mm）：切割後低於此值的餘料視為廢料
    min_scrap_length_mm: Decimal,

    /// 回傳的候選計劃上限
    max_suggestions: usize,
}

impl CuttingPlanner {
    /// 創建建議器
    pub fn new(min_scrap_length_mm: Decimal) -> Self {
        Self {
            min_scrap_length_mm,
            max_suggestions: 3,
        }
    }

    /// 設置候選計劃上限
    pub fn with_max_suggestions(mut self, max_suggestions: usize) -> Self {
        self.max_suggestions = max_suggestions;
        self
    }

    /// 對料件快照產生候選裁切計劃
    ///
    /// 快照應只含可預留的料件；此處不檢查料件狀態，
    /// 預留與一致性由上層在存檔時驗證。
    pub fn suggest(
        &self,
        cuts: &[CutRequirement],
        pieces: &[MaterialPiece],
    ) -> Vec<CuttingPlan> {
        info!(
            "裁切計劃求解：{} 刀切割需求、{} 支候選料件",
            cuts.len(),
            pieces.len()
        );

        // 三策略獨立求解，彼此不共享狀態
        let mut plans: Vec<CuttingPlan> = PlanStrategy::ALL
            .par_iter()
            .map(|&strategy| pack(strategy, cuts, pieces, self.min_scrap_length_mm))
            .collect();

        // 排名：完整計劃優先，其次廢料最少、用料最少，最後依策略序
        plans.sort_by(|a, b| {
            b.is_complete
                .cmp(&a.is_complete)
                .then_with(|| a.total_scrap_length_mm.cmp(&b.total_scrap_length_mm))
                .then_with(|| a.total_bars.cmp(&b.total_bars))
                .then_with(|| a.strategy.rank().cmp(&b.strategy.rank()))
        });

        // 指派完全相同的計劃只保留排名最前者
        let mut seen = Vec::new();
        plans.retain(|plan| {
            let signature = plan.assignment_signature();
            if seen.contains(&signature) {
                false
            } else {
                seen.push(signature);
                true
            }
        });
        plans.truncate(self.max_suggestions);

        for plan in &plans {
            debug!(
                "候選計劃 [{}]：{} 支料件、廢料 {}mm、完整={}",
                plan.strategy.label(),
                plan.total_bars,
                plan.total_scrap_length_mm,
                plan.is_complete
            );
        }
        plans
    }
}
