//! 發料紀錄模型（不可變的實際發料事件）

use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 用料履歷：每一刀（料件 × 切割行）一筆
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialUsageHistory {
    /// 履歷ID
    pub id: Uuid,

    /// 料件ID
    pub piece_id: Uuid,

    /// 料件編號
    pub piece_no: String,

    /// 來源領料明細ID
    pub requisition_item_id: Uuid,

    /// 使用長度（mm）
    pub length_used_mm: Decimal,

    /// 此刀之後的剩餘長度（mm）
    pub remainder_mm: Decimal,

    /// 此刀產生的廢料長度（mm，非廢料為 0）
    pub scrap_mm: Decimal,
}

impl MaterialUsageHistory {
    /// 創建新的用料履歷
    pub fn new(
        piece_id: Uuid,
        piece_no: String,
        requisition_item_id: Uuid,
        length_used_mm: Decimal,
        remainder_mm: Decimal,
        scrap_mm: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            piece_id,
            piece_no,
            requisition_item_id,
            length_used_mm,
            remainder_mm,
            scrap_mm,
        }
    }
}

/// 發料單頭：草稿執行發料時產生，一經建立不再變更
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialIssue {
    /// 發料單ID
    pub id: Uuid,

    /// 發料單號
    pub issue_no: String,

    /// 來源草稿ID
    pub draft_id: Uuid,

    /// 發料人
    pub issued_by: String,

    /// 領料人
    pub received_by: String,

    /// 發料時間
    pub issued_at: NaiveDateTime,

    /// 用料履歷
    pub usage: Vec<MaterialUsageHistory>,
}

impl MaterialIssue {
    /// 創建新的發料單頭
    pub fn new(issue_no: String, draft_id: Uuid, issued_by: String, received_by: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            issue_no,
            draft_id,
            issued_by,
            received_by,
            issued_at: Utc::now().naive_utc(),
            usage: Vec::new(),
        }
    }

    /// 添加用料履歷
    pub fn add_usage(&mut self, usage: MaterialUsageHistory) {
        self.usage.push(usage);
    }

    /// 發料總長度（mm）
    pub fn total_issued_mm(&self) -> Decimal {
        self.usage.iter().map(|u| u.length_used_mm).sum()
    }

    /// 產生的廢料總長度（mm）
    pub fn total_scrap_mm(&self) -> Decimal {
        self.usage.iter().map(|u| u.scrap_mm).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_totals() {
        let mut issue = MaterialIssue::new(
            "MI-00001".to_string(),
            Uuid::new_v4(),
            "張三".to_string(),
            "李四".to_string(),
        );

        let piece_id = Uuid::new_v4();
        let item_id = Uuid::new_v4();
        issue.add_usage(MaterialUsageHistory::new(
            piece_id,
            "P-0001".to_string(),
            item_id,
            Decimal::from(2000),
            Decimal::from(4000),
            Decimal::ZERO,
        ));
        issue.add_usage(MaterialUsageHistory::new(
            piece_id,
            "P-0001".to_string(),
            item_id,
            Decimal::from(3800),
            Decimal::from(200),
            Decimal::from(200),
        ));

        assert_eq!(issue.total_issued_mm(), Decimal::from(5800));
        assert_eq!(issue.total_scrap_mm(), Decimal::from(200));
        assert_eq!(issue.usage.len(), 2);
    }
}
