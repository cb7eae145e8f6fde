//! 原物料主檔模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 原物料主檔（棒材/管材/板材）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    /// 物料ID
    pub id: Uuid,

    /// 物料編號
    pub code: String,

    /// 物料名稱
    pub name: String,

    /// 材質等級（如 S45C、SUS304）
    pub grade: String,

    /// 直徑/斷面規格（mm）
    pub diameter_mm: Decimal,

    /// 最小可用餘料長度（mm）：切割後餘料低於此值即視為廢料
    pub min_scrap_length_mm: Decimal,
}

impl Material {
    /// 創建新的物料主檔
    pub fn new(code: String, name: String, grade: String, diameter_mm: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            code,
            name,
            grade,
            diameter_mm,
            min_scrap_length_mm: Decimal::ZERO,
        }
    }

    /// 建構器模式：設置最小可用餘料長度
    pub fn with_min_scrap_length(mut self, length_mm: Decimal) -> Self {
        self.min_scrap_length_mm = length_mm;
        self
    }

    /// 取得物料規格（用於料件比對）
    pub fn spec(&self) -> MaterialSpec {
        MaterialSpec {
            material_id: self.id,
            grade: self.grade.clone(),
            diameter_mm: self.diameter_mm,
        }
    }
}

/// 物料規格：材質等級 + 斷面規格
///
/// 切割只能在相同規格的料件上進行，規格是料件與切割需求的比對鍵。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialSpec {
    /// 物料ID
    pub material_id: Uuid,

    /// 材質等級
    pub grade: String,

    /// 直徑/斷面規格（mm）
    pub diameter_mm: Decimal,
}

/// 料件查詢條件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieceFilter {
    /// 物料ID
    pub material_id: Uuid,

    /// 材質等級（可選過濾）
    pub grade: Option<String>,

    /// 直徑規格（可選過濾）
    pub diameter_mm: Option<Decimal>,
}

impl PieceFilter {
    /// 創建新的查詢條件
    pub fn new(material_id: Uuid) -> Self {
        Self {
            material_id,
            grade: None,
            diameter_mm: None,
        }
    }

    /// 建構器模式：設置材質等級過濾
    pub fn with_grade(mut self, grade: String) -> Self {
        self.grade = Some(grade);
        self
    }

    /// 建構器模式：設置直徑過濾
    pub fn with_diameter(mut self, diameter_mm: Decimal) -> Self {
        self.diameter_mm = Some(diameter_mm);
        self
    }

    /// 檢查規格是否符合查詢條件
    pub fn matches(&self, spec: &MaterialSpec) -> bool {
        if spec.material_id != self.material_id {
            return false;
        }
        if let Some(grade) = &self.grade {
            if &spec.grade != grade {
                return false;
            }
        }
        if let Some(diameter) = self.diameter_mm {
            if spec.diameter_mm != diameter {
                return false;
            }
        }
        true
    }
}

/// 物料主檔目錄
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialCatalog {
    materials: HashMap<Uuid, Material>,
}

impl MaterialCatalog {
    /// 創建空目錄
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入物料主檔
    pub fn add(&mut self, material: Material) {
        self.materials.insert(material.id, material);
    }

    /// 查詢物料主檔
    pub fn get(&self, material_id: Uuid) -> Option<&Material> {
        self.materials.get(&material_id)
    }

    /// 取得最小可用餘料長度
    pub fn min_scrap_length(&self, material_id: Uuid) -> crate::Result<Decimal> {
        self.materials
            .get(&material_id)
            .map(|m| m.min_scrap_length_mm)
            .ok_or(crate::StoresError::MaterialNotFound(material_id))
    }

    /// 物料主檔數量
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// 是否為空目錄
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_material() {
        let material = Material::new(
            "RM-S45C-32".to_string(),
            "中碳鋼棒".to_string(),
            "S45C".to_string(),
            Decimal::from(32),
        )
        .with_min_scrap_length(Decimal::from(300));

        assert_eq!(material.code, "RM-S45C-32");
        assert_eq!(material.min_scrap_length_mm, Decimal::from(300));
        assert_eq!(material.spec().material_id, material.id);
    }

    #[test]
    fn test_piece_filter_matches() {
        let material = Material::new(
            "RM-SUS304-25".to_string(),
            "不鏽鋼棒".to_string(),
            "SUS304".to_string(),
            Decimal::from(25),
        );
        let spec = material.spec();

        // 只比對物料ID
        assert!(PieceFilter::new(material.id).matches(&spec));

        // 材質等級不符
        assert!(!PieceFilter::new(material.id)
            .with_grade("S45C".to_string())
            .matches(&spec));

        // 直徑相符
        assert!(PieceFilter::new(material.id)
            .with_diameter(Decimal::from(25))
            .matches(&spec));

        // 不同物料
        assert!(!PieceFilter::new(Uuid::new_v4()).matches(&spec));
    }

    #[test]
    fn test_catalog_min_scrap_length() {
        let mut catalog = MaterialCatalog::new();
        let material = Material::new(
            "RM-001".to_string(),
            "鋼管".to_string(),
            "STKM13A".to_string(),
            Decimal::from(48),
        )
        .with_min_scrap_length(Decimal::from(250));
        let id = material.id;
        catalog.add(material);

        assert_eq!(catalog.min_scrap_length(id).unwrap(), Decimal::from(250));
        assert!(catalog.min_scrap_length(Uuid::new_v4()).is_err());
    }
}
