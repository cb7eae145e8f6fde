//! 切割需求展開：領料明細 → 單刀需求，依物料規格分組

use uuid::Uuid;

use stores_core::{CutRequirement, MaterialCatalog, MaterialGroup, Result, StoresError};

use crate::ledger::RequisitionLedger;

/// 將多張領料單展開為物料分組
///
/// 每行原物料明細展開為「支數 × 單支長度」筆切割需求
/// （數量 N、長度 L → N 筆長度 L），依物料規格分組；
/// 子件行不參與切割發料，直接略過。
/// 分組與需求順序由輸入順序決定（確定性輸出）。
pub fn material_groups(
    requisition_ids: &[Uuid],
    ledger: &RequisitionLedger,
    catalog: &MaterialCatalog,
) -> Result<Vec<MaterialGroup>> {
    let mut groups: Vec<MaterialGroup> = Vec::new();

    for &requisition_id in requisition_ids {
        let requisition = ledger
            .get(requisition_id)
            .ok_or(StoresError::RequisitionNotFound(requisition_id))?;

        for item in requisition.material_items() {
            let material_id = match item.line.material_id() {
                Some(id) => id,
                None => continue,
            };
            let material = catalog
                .get(material_id)
                .ok_or(StoresError::MaterialNotFound(material_id))?;
            let spec = material.spec();

            let index = match groups.iter().position(|g| g.spec == spec) {
                Some(index) => index,
                None => {
                    groups.push(MaterialGroup {
                        spec,
                        cuts: Vec::new(),
                    });
                    groups.len() - 1
                }
            };
            let group = &mut groups[index];

            for _ in 0..item.quantity {
                group.cuts.push(CutRequirement {
                    requisition_item_id: item.id,
                    requisition_no: requisition.requisition_no.clone(),
                    job_card_no: requisition.job_card_no.clone(),
                    length_mm: item.unit_length_mm,
                });
            }
        }
    }

    tracing::debug!(
        "切割需求展開：{} 張領料單 → {} 個物料分組",
        requisition_ids.len(),
        groups.len()
    );
    Ok(groups)
}
