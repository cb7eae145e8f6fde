//! 發料草稿管理器
//!
//! 將選定的裁切計劃保存為草稿並預留料件；支援確認（鎖定）、
//! 發料（執行切割、寫入用料履歷、更新領料單）與刪除（釋放預留）。

use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

use stores_core::{
    AllocationHolder, BarAssignment, Cut, DraftStatus, IssueWindowDraft, MaterialCatalog,
    MaterialIssue, MaterialUsageHistory, Result, StoresError,
};

use crate::ledger::RequisitionLedger;
use crate::registry::PieceRegistry;

/// 草稿保存請求
#[derive(Debug, Clone)]
pub struct DraftSaveRequest {
    /// 編輯既有草稿時帶入其ID；新建時為 None
    pub draft_id: Option<Uuid>,

    /// 涵蓋的領料單
    pub requisition_ids: Vec<Uuid>,

    /// 用料分配行（依發料順序）
    pub bars: Vec<BarAssignmentRequest>,
}

/// 用料分配行請求
#[derive(Debug, Clone)]
pub struct BarAssignmentRequest {
    /// 料件ID
    pub piece_id: Uuid,

    /// 有序切割行
    pub cuts: Vec<CutRequest>,
}

/// 切割行請求
#[derive(Debug, Clone)]
pub struct CutRequest {
    /// 切割長度（mm）
    pub length_mm: Decimal,

    /// 來源領料明細ID
    pub requisition_item_id: Uuid,

    /// 工單號（追溯用）
    pub job_card_no: Option<String>,
}

/// 保存結果
#[derive(Debug, Clone)]
pub struct SavedDraft {
    /// 草稿ID
    pub draft_id: Uuid,

    /// 草稿編號
    pub draft_no: String,
}

/// 單張領料單的發料結果
#[derive(Debug, Clone)]
pub struct RequisitionIssueResult {
    /// 領料單ID
    pub requisition_id: Uuid,

    /// 領料單號
    pub requisition_no: String,

    /// 是否成功
    pub success: bool,

    /// 結果說明
    pub message: String,
}

/// 發料草稿管理器
pub struct IssueDraftManager {
    drafts: HashMap<Uuid, IssueWindowDraft>,
    issues: Vec<MaterialIssue>,
    draft_seq: u64,
    issue_seq: u64,
}

impl IssueDraftManager {
    /// 創建新的管理器
    pub fn new() -> Self {
        Self {
            drafts: HashMap::new(),
            issues: Vec::new(),
            draft_seq: 0,
            issue_seq: 0,
        }
    }

    /// 查詢草稿
    pub fn draft(&self, draft_id: Uuid) -> Option<&IssueWindowDraft> {
        self.drafts.get(&draft_id)
    }

    /// 草稿狀態清單（依草稿編號排序）
    pub fn drafts(&self) -> Vec<&IssueWindowDraft> {
        self.by_status(DraftStatus::Draft)
    }

    /// 已確認草稿清單
    pub fn finalized_drafts(&self) -> Vec<&IssueWindowDraft> {
        self.by_status(DraftStatus::Finalized)
    }

    fn by_status(&self, status: DraftStatus) -> Vec<&IssueWindowDraft> {
        let mut drafts: Vec<&IssueWindowDraft> = self
            .drafts
            .values()
            .filter(|d| d.status == status)
            .collect();
        drafts.sort_by(|a, b| a.draft_no.cmp(&b.draft_no));
        drafts
    }

    /// 發料紀錄清單
    pub fn issues(&self) -> &[MaterialIssue] {
        &self.issues
    }

    /// 保存草稿：驗證、預留、持久化，整體成功或整體拒絕
    ///
    /// 引用的每支料件必須可預留（或在編輯情境下已由同一草稿持有）。
    /// 任何料件被併發佔用時，整筆保存被拒絕並回傳 `PieceUnavailable`
    /// 列出衝突料件，讓呼叫端重新規劃。
    pub fn save_draft(
        &mut self,
        request: DraftSaveRequest,
        registry: &mut PieceRegistry,
    ) -> Result<SavedDraft> {
        // 編輯情境：草稿必須存在且仍為 Draft 狀態
        let (draft_id, previously_held): (Uuid, Vec<Uuid>) = match request.draft_id {
            Some(id) => {
                let existing = self
                    .drafts
                    .get(&id)
                    .ok_or(StoresError::DraftNotFound(id))?;
                if existing.status != DraftStatus::Draft {
                    return Err(StoresError::invalid_transition(
                        existing.status,
                        DraftStatus::Draft,
                    ));
                }
                (id, existing.piece_ids())
            }
            None => (Uuid::new_v4(), Vec::new()),
        };
        let holder = AllocationHolder::Draft(draft_id);

        // 結構驗證：每支料件至少一刀、長度皆為正值
        // （發料時的切割執行以此為前提）
        Self::validate_bar_shapes(&request.bars)?;

        // 驗證：收集全部衝突後一次回報
        let mut conflicts: Vec<Uuid> = Vec::new();
        let mut seen: Vec<Uuid> = Vec::new();
        let mut snapshot_versions: Vec<Option<u64>> = Vec::with_capacity(request.bars.len());
        for bar in &request.bars {
            if seen.contains(&bar.piece_id) {
                // 同一草稿內重複引用同一支料件
                conflicts.push(bar.piece_id);
                snapshot_versions.push(None);
                continue;
            }
            seen.push(bar.piece_id);

            match registry.get(bar.piece_id) {
                None => return Err(StoresError::PieceNotFound(bar.piece_id)),
                Some(piece) if piece.is_reservable() => {
                    snapshot_versions.push(Some(piece.version));
                }
                Some(piece) if piece.allocation == Some(holder) => {
                    // 編輯情境：已由本草稿持有
                    snapshot_versions.push(None);
                }
                Some(_) => {
                    conflicts.push(bar.piece_id);
                    snapshot_versions.push(None);
                }
            }
        }
        if !conflicts.is_empty() {
            tracing::info!("保存草稿被拒：{} 支料件衝突", conflicts.len());
            return Err(StoresError::PieceUnavailable {
                piece_ids: conflicts,
            });
        }

        // 預留新引用的料件；任一失敗即回退，不留半套預留
        let mut newly_reserved: Vec<Uuid> = Vec::new();
        for (bar, version) in request.bars.iter().zip(snapshot_versions.iter()) {
            if let Some(version) = version {
                if let Err(error) = registry.reserve(bar.piece_id, holder, *version) {
                    for &piece_id in &newly_reserved {
                        let _ = registry.release(piece_id, holder);
                    }
                    if let StoresError::Conflict(_) = error {
                        return Err(StoresError::PieceUnavailable {
                            piece_ids: vec![bar.piece_id],
                        });
                    }
                    return Err(error);
                }
                newly_reserved.push(bar.piece_id);
            }
        }

        // 編輯情境：釋放新版本不再引用的料件
        let retained: Vec<Uuid> = request.bars.iter().map(|b| b.piece_id).collect();
        for piece_id in previously_held {
            if !retained.contains(&piece_id) {
                registry.release(piece_id, holder)?;
            }
        }

        // 組裝並持久化草稿
        let draft_no = match self.drafts.get(&draft_id) {
            Some(existing) => existing.draft_no.clone(),
            None => {
                self.draft_seq += 1;
                format!("IW-{:05}", self.draft_seq)
            }
        };
        let bars = Self::build_bars(&request.bars, registry);
        let mut draft = IssueWindowDraft::new(draft_no.clone(), request.requisition_ids, bars);
        draft.id = draft_id;
        self.drafts.insert(draft_id, draft);

        tracing::info!("保存草稿 {}：{} 支料件", draft_no, retained.len());
        Ok(SavedDraft { draft_id, draft_no })
    }

    fn validate_bar_shapes(bars: &[BarAssignmentRequest]) -> Result<()> {
        for bar in bars {
            if bar.cuts.is_empty() {
                return Err(StoresError::InvalidCutLength(format!(
                    "料件 {} 的分配行沒有任何切割",
                    bar.piece_id
                )));
            }
            for cut in &bar.cuts {
                if cut.length_mm <= Decimal::ZERO {
                    return Err(StoresError::InvalidCutLength(format!(
                        "切割長度必須為正值，得到 {}mm",
                        cut.length_mm
                    )));
                }
            }
        }
        Ok(())
    }

    fn build_bars(bars: &[BarAssignmentRequest], registry: &PieceRegistry) -> Vec<BarAssignment> {
        bars.iter()
            .enumerate()
            .map(|(bar_index, bar)| {
                let piece_no = registry
                    .get(bar.piece_id)
                    .map(|p| p.piece_no.clone())
                    .unwrap_or_default();
                let cuts = bar
                    .cuts
                    .iter()
                    .enumerate()
                    .map(|(cut_index, cut)| {
                        let mut row = Cut::new(
                            cut_index as u32 + 1,
                            cut.length_mm,
                            cut.requisition_item_id,
                        );
                        if let Some(job_card_no) = &cut.job_card_no {
                            row = row.with_job_card_no(job_card_no.clone());
                        }
                        row
                    })
                    .collect();
                BarAssignment::new(bar_index as u32 + 1, bar.piece_id, piece_no).with_cuts(cuts)
            })
            .collect()
    }

    /// 確認草稿：Draft → Finalized，純流程閘門，料件狀態不變
    pub fn finalize_draft(&mut self, draft_id: Uuid) -> Result<()> {
        let draft = self
            .drafts
            .get_mut(&draft_id)
            .ok_or(StoresError::DraftNotFound(draft_id))?;
        if draft.status != DraftStatus::Draft {
            return Err(StoresError::invalid_transition(
                draft.status,
                DraftStatus::Finalized,
            ));
        }
        draft.status = DraftStatus::Finalized;
        draft.finalized_at = Some(chrono::Utc::now().naive_utc());
        tracing::info!("確認草稿 {}", draft.draft_no);
        Ok(())
    }

    /// 執行發料：切割料件、寫入用料履歷、更新領料單
    ///
    /// 允許 Draft 直接發料（跳過確認）。先完整驗證再套用：
    /// 任一驗證失敗即整筆中止，不會留下切到一半的料件或
    /// 未結清的領料狀態。
    pub fn issue_draft(
        &mut self,
        draft_id: Uuid,
        issued_by: &str,
        received_by: &str,
        registry: &mut PieceRegistry,
        ledger: &mut RequisitionLedger,
        catalog: &MaterialCatalog,
    ) -> Result<Vec<RequisitionIssueResult>> {
        let draft = self
            .drafts
            .get(&draft_id)
            .ok_or(StoresError::DraftNotFound(draft_id))?;
        if draft.status == DraftStatus::Issued {
            return Err(StoresError::invalid_transition(
                draft.status,
                DraftStatus::Issued,
            ));
        }

        // 驗證階段：不做任何變更。套用階段逐支切割，因此這裡必須
        // 排除所有會讓切割失敗的輸入，前面的料件才不會被白切。
        let holder = AllocationHolder::Draft(draft_id);
        let mut unavailable: Vec<Uuid> = Vec::new();
        let mut min_scrap_by_piece: HashMap<Uuid, Decimal> = HashMap::new();
        for bar in &draft.bars {
            let piece = registry
                .get(bar.piece_id)
                .ok_or(StoresError::PieceNotFound(bar.piece_id))?;
            if piece.allocation != Some(holder) {
                unavailable.push(bar.piece_id);
                continue;
            }
            if bar.cuts.is_empty() {
                return Err(StoresError::InvalidCutLength(format!(
                    "料件 {} 的分配行沒有任何切割",
                    piece.piece_no
                )));
            }
            for cut in &bar.cuts {
                if cut.length_mm <= Decimal::ZERO {
                    return Err(StoresError::InvalidCutLength(format!(
                        "切割長度必須為正值，得到 {}mm",
                        cut.length_mm
                    )));
                }
            }
            let total = bar.total_cut_length_mm();
            if total > piece.current_length_mm {
                return Err(StoresError::InvalidCutLength(format!(
                    "料件 {} 目前長度 {}mm，草稿要求 {}mm",
                    piece.piece_no, piece.current_length_mm, total
                )));
            }
            let min_scrap = catalog.min_scrap_length(piece.spec.material_id)?;
            min_scrap_by_piece.insert(bar.piece_id, min_scrap);

            for cut in &bar.cuts {
                if !ledger.contains_item(cut.requisition_item_id) {
                    return Err(StoresError::RequisitionItemNotFound(
                        cut.requisition_item_id,
                    ));
                }
            }
        }
        if !unavailable.is_empty() {
            return Err(StoresError::PieceUnavailable {
                piece_ids: unavailable,
            });
        }
        let bars = draft.bars.clone();
        let requisition_ids = draft.requisition_ids.clone();

        // 套用階段：驗證已保證不會中途失敗
        self.issue_seq += 1;
        let issue_no = format!("MI-{:05}", self.issue_seq);
        let mut issue = MaterialIssue::new(
            issue_no.clone(),
            draft_id,
            issued_by.to_string(),
            received_by.to_string(),
        );
        let mut issued_per_item: Vec<(Uuid, Decimal)> = Vec::new();
        for bar in &bars {
            let piece = registry
                .get(bar.piece_id)
                .ok_or(StoresError::PieceNotFound(bar.piece_id))?;
            let piece_no = piece.piece_no.clone();
            let issued_whole =
                bar.cuts.len() == 1 && bar.cuts[0].length_mm == piece.current_length_mm;
            let lengths: Vec<Decimal> = bar.cuts.iter().map(|c| c.length_mm).collect();
            let min_scrap = min_scrap_by_piece
                .get(&bar.piece_id)
                .copied()
                .unwrap_or(Decimal::ZERO);

            registry.stamp_issue_ref(bar.piece_id, &issue_no)?;
            let outcomes = registry.consume_bar(bar.piece_id, &lengths, min_scrap, issued_whole)?;

            for (cut, outcome) in bar.cuts.iter().zip(outcomes.iter()) {
                issue.add_usage(MaterialUsageHistory::new(
                    bar.piece_id,
                    piece_no.clone(),
                    cut.requisition_item_id,
                    cut.length_mm,
                    outcome.remainder_mm,
                    if outcome.became_scrap {
                        outcome.remainder_mm
                    } else {
                        Decimal::ZERO
                    },
                ));
                issued_per_item.push((cut.requisition_item_id, cut.length_mm));
            }
        }

        // 更新領料帳並彙整各單結果
        for (item_id, length_mm) in &issued_per_item {
            ledger.post_issue(*item_id, *length_mm)?;
        }
        let results = Self::per_requisition_results(&bars, &requisition_ids, ledger);

        self.issues.push(issue);
        let draft = self
            .drafts
            .get_mut(&draft_id)
            .ok_or(StoresError::DraftNotFound(draft_id))?;
        draft.status = DraftStatus::Issued;
        draft.issued_at = Some(chrono::Utc::now().naive_utc());
        tracing::info!(
            "發料完成：草稿 {} → 發料單 {}，{} 支料件",
            draft.draft_no,
            issue_no,
            bars.len()
        );
        Ok(results)
    }

    fn per_requisition_results(
        bars: &[BarAssignment],
        requisition_ids: &[Uuid],
        ledger: &RequisitionLedger,
    ) -> Vec<RequisitionIssueResult> {
        requisition_ids
            .iter()
            .map(|&requisition_id| match ledger.get(requisition_id) {
                Some(requisition) => {
                    let issued: Decimal = bars
                        .iter()
                        .flat_map(|b| b.cuts.iter())
                        .filter(|c| requisition.item(c.requisition_item_id).is_some())
                        .map(|c| c.length_mm)
                        .sum();
                    RequisitionIssueResult {
                        requisition_id,
                        requisition_no: requisition.requisition_no.clone(),
                        success: true,
                        message: format!("發料完成：共 {issued}mm"),
                    }
                }
                None => RequisitionIssueResult {
                    requisition_id,
                    requisition_no: String::new(),
                    success: false,
                    message: "找不到領料單".to_string(),
                },
            })
            .collect()
    }

    /// 刪除草稿：僅限 Draft 狀態，釋放全部預留
    pub fn delete_draft(&mut self, draft_id: Uuid, registry: &mut PieceRegistry) -> Result<bool> {
        let draft = self
            .drafts
            .get(&draft_id)
            .ok_or(StoresError::DraftNotFound(draft_id))?;
        if draft.status != DraftStatus::Draft {
            return Err(StoresError::Conflict(format!(
                "草稿 {} 狀態 {:?}，無法刪除",
                draft.draft_no, draft.status
            )));
        }

        let released = registry.release_holder(AllocationHolder::Draft(draft_id));
        let draft_no = draft.draft_no.clone();
        self.drafts.remove(&draft_id);
        tracing::info!("刪除草稿 {}：釋放 {} 支料件", draft_no, released);
        Ok(true)
    }
}

impl Default for IssueDraftManager {
    fn default() -> Self {
        Self::new()
    }
}
