//! 裝填流程：三種策略共用的 first-fit-decreasing 核心
//!
//! 純計算，不觸碰任何狀態；相同輸入必得到逐位元相同的輸出
//! （現場切割指示需可重現）。

use rust_decimal::Decimal;

use stores_core::{CutRequirement, MaterialPiece};

use crate::plan::{CuttingPlan, PlanStrategy, PlannedBar, PlannedCut};

/// 計劃中已開封的料件
struct OpenBar {
    piece_index: usize,
    remaining_mm: Decimal,
    cuts: Vec<PlannedCut>,
}

/// 本刀的落點：已開封料件或新開封一支
enum Slot {
    Open(usize),
    New(usize),
}

/// 依策略將切割需求裝填到料件快照上
pub fn pack(
    strategy: PlanStrategy,
    cuts: &[CutRequirement],
    pieces: &[MaterialPiece],
    min_scrap_length_mm: Decimal,
) -> CuttingPlan {
    // first-fit-decreasing：切割一律由長到短，平手依輸入序
    let mut cut_order: Vec<usize> = (0..cuts.len()).collect();
    cut_order.sort_by(|&a, &b| {
        cuts[b]
            .length_mm
            .cmp(&cuts[a].length_mm)
            .then_with(|| a.cmp(&b))
    });

    // 未開封料件的候選順序由策略決定
    let mut unopened: Vec<usize> = (0..pieces.len()).collect();
    match strategy {
        // 選擇靠 best-fit，排序只作為平手時的確定性順序
        PlanStrategy::MinimizeScrap => {
            unopened.sort_by(|&a, &b| pieces[a].piece_no.cmp(&pieces[b].piece_no));
        }
        // 原始長度長者先開封，讓大刀吃大料
        PlanStrategy::MinimizeBarCount => {
            unopened.sort_by(|&a, &b| {
                pieces[b]
                    .original_length_mm
                    .cmp(&pieces[a].original_length_mm)
                    .then_with(|| pieces[a].piece_no.cmp(&pieces[b].piece_no))
            });
        }
        // 嚴格依收貨日期，不論長短
        PlanStrategy::FifoFirst => {
            unopened.sort_by(|&a, &b| {
                pieces[a]
                    .receipt_date
                    .cmp(&pieces[b].receipt_date)
                    .then_with(|| pieces[a].piece_no.cmp(&pieces[b].piece_no))
            });
        }
    }

    let mut open: Vec<OpenBar> = Vec::new();
    let mut unassigned: Vec<CutRequirement> = Vec::new();

    for &cut_index in &cut_order {
        let length = cuts[cut_index].length_mm;
        let slot = choose_slot(strategy, length, &open, &unopened, pieces);

        match slot {
            Some(Slot::Open(bar_index)) => {
                let bar = &mut open[bar_index];
                bar.remaining_mm -= length;
                let sequence = bar.cuts.len() as u32 + 1;
                bar.cuts
                    .push(PlannedCut::from_requirement(sequence, &cuts[cut_index]));
            }
            Some(Slot::New(unopened_position)) => {
                let piece_index = unopened.remove(unopened_position);
                open.push(OpenBar {
                    piece_index,
                    remaining_mm: pieces[piece_index].current_length_mm - length,
                    cuts: vec![PlannedCut::from_requirement(1, &cuts[cut_index])],
                });
            }
            None => unassigned.push(cuts[cut_index].clone()),
        }
    }

    finalize(strategy, open, unassigned, pieces, min_scrap_length_mm)
}

/// 為一刀挑選落點；無處可放時回傳 None
fn choose_slot(
    strategy: PlanStrategy,
    length: Decimal,
    open: &[OpenBar],
    unopened: &[usize],
    pieces: &[MaterialPiece],
) -> Option<Slot> {
    match strategy {
        PlanStrategy::MinimizeScrap => {
            // best-fit：切完後剩餘最小者勝；平手時已開封優先，再比料件編號
            let mut best: Option<(Decimal, u8, &str, Slot)> = None;
            for (bar_index, bar) in open.iter().enumerate() {
                if bar.remaining_mm >= length {
                    let key = (
                        bar.remaining_mm - length,
                        0u8,
                        pieces[bar.piece_index].piece_no.as_str(),
                    );
                    if best
                        .as_ref()
                        .map(|(a, b, c, _)| (key.0, key.1, key.2) < (*a, *b, *c))
                        .unwrap_or(true)
                    {
                        best = Some((key.0, key.1, key.2, Slot::Open(bar_index)));
                    }
                }
            }
            for (position, &piece_index) in unopened.iter().enumerate() {
                let current = pieces[piece_index].current_length_mm;
                if current >= length {
                    let key = (current - length, 1u8, pieces[piece_index].piece_no.as_str());
                    if best
                        .as_ref()
                        .map(|(a, b, c, _)| (key.0, key.1, key.2) < (*a, *b, *c))
                        .unwrap_or(true)
                    {
                        best = Some((key.0, key.1, key.2, Slot::New(position)));
                    }
                }
            }
            best.map(|(_, _, _, slot)| slot)
        }
        PlanStrategy::MinimizeBarCount => {
            // 先在已開封料件中 best-fit；無處可放才開新料（清單已依長度遞減）
            let mut best: Option<(Decimal, &str, usize)> = None;
            for (bar_index, bar) in open.iter().enumerate() {
                if bar.remaining_mm >= length {
                    let key = (
                        bar.remaining_mm - length,
                        pieces[bar.piece_index].piece_no.as_str(),
                    );
                    if best
                        .as_ref()
                        .map(|(a, b, _)| (key.0, key.1) < (*a, *b))
                        .unwrap_or(true)
                    {
                        best = Some((key.0, key.1, bar_index));
                    }
                }
            }
            if let Some((_, _, bar_index)) = best {
                return Some(Slot::Open(bar_index));
            }
            unopened
                .iter()
                .position(|&piece_index| pieces[piece_index].current_length_mm >= length)
                .map(Slot::New)
        }
        PlanStrategy::FifoFirst => {
            // first-fit：已開封料件依開封順序（即收貨順序）取首個放得下者
            for (bar_index, bar) in open.iter().enumerate() {
                if bar.remaining_mm >= length {
                    return Some(Slot::Open(bar_index));
                }
            }
            unopened
                .iter()
                .position(|&piece_index| pieces[piece_index].current_length_mm >= length)
                .map(Slot::New)
        }
    }
}

fn finalize(
    strategy: PlanStrategy,
    open: Vec<OpenBar>,
    unassigned: Vec<CutRequirement>,
    pieces: &[MaterialPiece],
    min_scrap_length_mm: Decimal,
) -> CuttingPlan {
    let mut total_cut = Decimal::ZERO;
    let mut total_scrap = Decimal::ZERO;

    let bars: Vec<PlannedBar> = open
        .into_iter()
        .enumerate()
        .map(|(index, bar)| {
            let piece = &pieces[bar.piece_index];
            let used: Decimal = bar.cuts.iter().map(|c| c.length_mm).sum();
            let remaining = bar.remaining_mm;
            let will_be_scrap =
                remaining > Decimal::ZERO && remaining < min_scrap_length_mm;
            total_cut += used;
            if will_be_scrap {
                total_scrap += remaining;
            }
            PlannedBar {
                sequence: index as u32 + 1,
                piece_id: piece.id,
                piece_no: piece.piece_no.clone(),
                available_length_mm: piece.current_length_mm,
                cuts: bar.cuts,
                used_length_mm: used,
                remaining_length_mm: remaining,
                will_be_scrap,
            }
        })
        .collect();

    CuttingPlan {
        strategy,
        total_bars: bars.len(),
        total_cut_length_mm: total_cut,
        total_scrap_length_mm: total_scrap,
        is_complete: unassigned.is_empty(),
        unassigned,
        bars,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use stores_core::MaterialSpec;
    use uuid::Uuid;

    fn spec() -> MaterialSpec {
        MaterialSpec {
            material_id: Uuid::new_v4(),
            grade: "S45C".to_string(),
            diameter_mm: Decimal::from(32),
        }
    }

    fn piece(no: &str, length: i64, spec: &MaterialSpec, day: u32) -> MaterialPiece {
        MaterialPiece::new(
            no.to_string(),
            spec.clone(),
            Decimal::from(length),
            NaiveDate::from_ymd_opt(2026, 8, day).unwrap(),
        )
    }

    fn cut(length: i64) -> CutRequirement {
        CutRequirement {
            requisition_item_id: Uuid::new_v4(),
            requisition_no: "MR-001".to_string(),
            job_card_no: None,
            length_mm: Decimal::from(length),
        }
    }

    #[test]
    fn test_minimize_scrap_packs_single_bar() {
        // P1 6000mm；切 [2000, 2500, 1000] → 全上 P1，餘 500 ≥ 門檻 300 → 非廢料
        let spec = spec();
        let pieces = vec![piece("P-001", 6000, &spec, 1)];
        let cuts = vec![cut(2000), cut(2500), cut(1000)];

        let plan = pack(
            PlanStrategy::MinimizeScrap,
            &cuts,
            &pieces,
            Decimal::from(300),
        );

        assert!(plan.is_complete);
        assert_eq!(plan.total_bars, 1);
        assert_eq!(plan.bars[0].used_length_mm, Decimal::from(5500));
        assert_eq!(plan.bars[0].remaining_length_mm, Decimal::from(500));
        assert!(!plan.bars[0].will_be_scrap);
        assert_eq!(plan.total_scrap_length_mm, Decimal::ZERO);
        // 切割由長到短
        assert_eq!(plan.bars[0].cuts[0].length_mm, Decimal::from(2500));
        assert_eq!(plan.bars[0].cuts[1].length_mm, Decimal::from(2000));
        assert_eq!(plan.bars[0].cuts[2].length_mm, Decimal::from(1000));
    }

    #[test]
    fn test_minimize_bar_count_never_overpacks() {
        // P1 = P2 = 3000mm；切 [2900, 2900] → 必須各開一支
        let spec = spec();
        let pieces = vec![piece("P-001", 3000, &spec, 1), piece("P-002", 3000, &spec, 1)];
        let cuts = vec![cut(2900), cut(2900)];

        let plan = pack(
            PlanStrategy::MinimizeBarCount,
            &cuts,
            &pieces,
            Decimal::from(300),
        );

        assert!(plan.is_complete);
        assert_eq!(plan.total_bars, 2);
        assert_eq!(plan.bars[0].cuts.len(), 1);
        assert_eq!(plan.bars[1].cuts.len(), 1);
    }

    #[test]
    fn test_fifo_prefers_oldest_regardless_of_fit() {
        // 舊料 3000（8/1）、新料 2100（8/10）；切 [2000]
        // best-fit 會選 2100（餘 100），FIFO 必須選最舊的 3000
        let spec = spec();
        let pieces = vec![
            piece("P-OLD", 3000, &spec, 1),
            piece("P-NEW", 2100, &spec, 10),
        ];
        let cuts = vec![cut(2000)];

        let fifo = pack(PlanStrategy::FifoFirst, &cuts, &pieces, Decimal::from(300));
        assert_eq!(fifo.bars[0].piece_no, "P-OLD");

        let best_fit = pack(
            PlanStrategy::MinimizeScrap,
            &cuts,
            &pieces,
            Decimal::from(300),
        );
        assert_eq!(best_fit.bars[0].piece_no, "P-NEW");
        // 餘 100 < 300 → 預計廢料
        assert!(best_fit.bars[0].will_be_scrap);
        assert_eq!(best_fit.total_scrap_length_mm, Decimal::from(100));
    }

    #[test]
    fn test_incomplete_plan_reports_unassigned() {
        // 只有一支 3000；切 [5000, 2000] → 2000 可行，5000 無處可放
        let spec = spec();
        let pieces = vec![piece("P-001", 3000, &spec, 1)];
        let cuts = vec![cut(5000), cut(2000)];

        let plan = pack(
            PlanStrategy::MinimizeScrap,
            &cuts,
            &pieces,
            Decimal::from(300),
        );

        assert!(!plan.is_complete);
        assert_eq!(plan.unassigned.len(), 1);
        assert_eq!(plan.unassigned[0].length_mm, Decimal::from(5000));
        // 可行子集仍然回報
        assert_eq!(plan.total_bars, 1);
        assert_eq!(plan.bars[0].cuts[0].length_mm, Decimal::from(2000));
    }

    #[test]
    fn test_tie_break_prefers_lower_piece_no() {
        // 兩支等長料件，登錄順序顛倒；平手時取編號較小者
        let spec = spec();
        let pieces = vec![piece("P-002", 3000, &spec, 1), piece("P-001", 3000, &spec, 1)];
        let cuts = vec![cut(1000)];

        for strategy in PlanStrategy::ALL {
            let plan = pack(strategy, &cuts, &pieces, Decimal::from(300));
            assert_eq!(plan.bars[0].piece_no, "P-001", "策略 {strategy:?}");
        }
    }

    #[test]
    fn test_minimize_bar_count_opens_by_original_length() {
        // 餘料（原始 6000、現長 3000）與整支新料 4000：
        // 開封順序依原始長度，餘料應先被開封
        let spec = spec();
        let mut remnant = piece("P-REM", 6000, &spec, 1);
        remnant.current_length_mm = Decimal::from(3000);
        let fresh = piece("P-NEW", 4000, &spec, 1);
        let pieces = vec![fresh, remnant];
        let cuts = vec![cut(2500)];

        let plan = pack(
            PlanStrategy::MinimizeBarCount,
            &cuts,
            &pieces,
            Decimal::from(300),
        );

        assert_eq!(plan.bars[0].piece_no, "P-REM");
        assert_eq!(plan.bars[0].available_length_mm, Decimal::from(3000));
    }

    #[rstest::rstest]
    #[case(5600, Decimal::from(400), false)] // 餘 400 > 門檻
    #[case(5700, Decimal::from(300), false)] // 餘 300 = 門檻，仍可用
    #[case(5701, Decimal::from(299), true)] // 餘 299 < 門檻 → 廢料
    #[case(6000, Decimal::ZERO, false)] // 切罄無餘料
    fn test_scrap_boundary(
        #[case] cut_length: i64,
        #[case] expected_remaining: Decimal,
        #[case] expected_scrap: bool,
    ) {
        let spec = spec();
        let pieces = vec![piece("P-001", 6000, &spec, 1)];
        let cuts = vec![cut(cut_length)];

        let plan = pack(
            PlanStrategy::MinimizeScrap,
            &cuts,
            &pieces,
            Decimal::from(300),
        );

        assert_eq!(plan.bars[0].remaining_length_mm, expected_remaining);
        assert_eq!(plan.bars[0].will_be_scrap, expected_scrap);
    }

    #[test]
    fn test_reuses_open_bar_before_new() {
        // P1 6000、P2 6000；切 [3000, 2500] → 最少廢料應續用已開封的 P1
        let spec = spec();
        let pieces = vec![piece("P-001", 6000, &spec, 1), piece("P-002", 6000, &spec, 1)];
        let cuts = vec![cut(3000), cut(2500)];

        let plan = pack(
            PlanStrategy::MinimizeScrap,
            &cuts,
            &pieces,
            Decimal::from(300),
        );

        assert_eq!(plan.total_bars, 1);
        assert_eq!(plan.bars[0].cuts.len(), 2);
    }
}
