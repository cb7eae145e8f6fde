//! 倉儲發料完整範例
//!
//! 展示從收貨入庫到切割發料的完整流程

use chrono::NaiveDate;
use rust_decimal::Decimal;
use stores_core::*;
use stores_engine::{
    material_groups, BarAssignmentRequest, CutRequest, DraftSaveRequest, IssueDraftManager,
    PieceRegistry, RequisitionLedger,
};
use stores_optimizer::{CuttingPlan, CuttingPlanner};

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("===== Stores Issue Window Example =====\n");

    // 步驟 1: 建立物料主檔
    println!("[1] Create Material Catalog");
    let mut catalog = MaterialCatalog::new();
    let material = Material::new(
        "RM-S45C-32".to_string(),
        "中碳鋼棒".to_string(),
        "S45C".to_string(),
        Decimal::from(32),
    )
    .with_min_scrap_length(Decimal::from(300));
    catalog.add(material.clone());
    println!("    {}: S45C Ø32, min usable remnant 300mm\n", material.code);

    // 步驟 2: 收貨入庫
    println!("[2] Receive Pieces");
    let mut registry = PieceRegistry::new();
    registry.receive_pieces(
        &material,
        "GRN-001",
        "WH-01",
        &[Decimal::from(6000), Decimal::from(6000)],
        NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
    );
    registry.receive_pieces(
        &material,
        "GRN-002",
        "WH-01",
        &[Decimal::from(4000)],
        NaiveDate::from_ymd_opt(2026, 8, 15).unwrap(),
    );
    let filter = PieceFilter::new(material.id);
    println!(
        "    In stock: {} pieces, {}mm total\n",
        registry.get_available(&filter).len(),
        registry.available_length_mm(&filter)
    );

    // 步驟 3: 領料單核准
    println!("[3] Approve Material Requisition");
    let mut ledger = RequisitionLedger::new();
    let requisition = MaterialRequisition::new(
        "MR-001".to_string(),
        NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
    )
    .with_job_card_no("JC-100".to_string())
    .with_items(vec![
        MaterialRequisitionItem::new(
            LineItemRef::Material {
                material_id: material.id,
            },
            Decimal::from(2000),
            3,
        ),
        MaterialRequisitionItem::new(
            LineItemRef::Material {
                material_id: material.id,
            },
            Decimal::from(2500),
            1,
        ),
    ]);
    let requisition_id = ledger.add(requisition);
    ledger.approve(requisition_id)?;
    println!("    MR-001: 3 x 2000mm + 1 x 2500mm (Job Card JC-100)\n");

    // 步驟 4: 展開切割需求
    println!("[4] Expand Cut Requirements");
    let groups = material_groups(&[requisition_id], &ledger, &catalog)?;
    for group in &groups {
        println!(
            "    {} Ø{}: {} cuts, {}mm total",
            group.spec.grade,
            group.spec.diameter_mm,
            group.cuts.len(),
            group.total_required_mm()
        );
    }
    println!();

    // 步驟 5: 裁切計劃建議
    println!("[5] Suggest Cutting Plans");
    let available = registry.get_available(&filter);
    let planner = CuttingPlanner::new(Decimal::from(300));
    let plans = planner.suggest(&groups[0].cuts, &available);
    for (index, plan) in plans.iter().enumerate() {
        println!(
            "    Plan {} [{}]: {} bars, scrap {}mm, utilisation {:.1}%",
            index + 1,
            plan.strategy.label(),
            plan.total_bars,
            plan.total_scrap_length_mm,
            plan.utilisation_pct()
        );
        for bar in &plan.bars {
            let cuts: Vec<String> = bar.cuts.iter().map(|c| c.length_mm.to_string()).collect();
            println!(
                "      - {} ({}mm): [{}] -> remaining {}mm",
                bar.piece_no,
                bar.available_length_mm,
                cuts.join(", "),
                bar.remaining_length_mm
            );
        }
    }
    println!();

    // 步驟 6: 保存草稿（選第一個計劃），料件隨即被預留
    println!("[6] Save Issue Draft");
    let chosen = &plans[0];
    let mut manager = IssueDraftManager::new();
    let saved = manager.save_draft(request_from_plan(chosen, requisition_id), &mut registry)?;
    println!(
        "    Draft {}: {} pieces reserved\n",
        saved.draft_no,
        chosen.total_bars
    );

    // 步驟 7: 確認草稿
    println!("[7] Finalize Draft");
    manager.finalize_draft(saved.draft_id)?;
    println!("    Draft {} finalized\n", saved.draft_no);

    // 步驟 8: 執行發料
    println!("[8] Issue Materials");
    let results = manager.issue_draft(
        saved.draft_id,
        "張三",
        "李四",
        &mut registry,
        &mut ledger,
        &catalog,
    )?;
    for result in &results {
        println!("    {}: {}", result.requisition_no, result.message);
    }
    let issue = &manager.issues()[0];
    println!(
        "    Issue {}: {}mm issued, {}mm scrapped, {} usage records\n",
        issue.issue_no,
        issue.total_issued_mm(),
        issue.total_scrap_mm(),
        issue.usage.len()
    );

    // 步驟 9: 發料後庫存
    println!("[9] Stock After Issue");
    for piece in registry.pieces() {
        println!(
            "    {} [{:?}]: {}mm",
            piece.piece_no, piece.status, piece.current_length_mm
        );
    }

    println!("\n===== Issue Window Complete =====");
    Ok(())
}

/// 將選定的裁切計劃轉成草稿保存請求
fn request_from_plan(plan: &CuttingPlan, requisition_id: uuid::Uuid) -> DraftSaveRequest {
    DraftSaveRequest {
        draft_id: None,
        requisition_ids: vec![requisition_id],
        bars: plan
            .bars
            .iter()
            .map(|bar| BarAssignmentRequest {
                piece_id: bar.piece_id,
                cuts: bar
                    .cuts
                    .iter()
                    .map(|cut| CutRequest {
                        length_mm: cut.length_mm,
                        requisition_item_id: cut.requisition_item_id,
                        job_card_no: cut.job_card_no.clone(),
                    })
                    .collect(),
            })
            .collect(),
    }
}
