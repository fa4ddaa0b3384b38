// ==========================================
// 仓库履约分配系统 - 仓库校验规则
// ==========================================
// 职责: 仓库与地点数据上的纯断言函数
// 红线: 无状态、无副作用、无 I/O 操作
// 输出: 第一个被违反的规则 (EngineError)
// ==========================================

use crate::domain::location::Location;
use crate::domain::warehouse::{CheckedWarehouse, Warehouse, WarehouseDraft};
use crate::engine::error::{ConflictKind, EngineError, EngineResult};

// ==========================================
// WarehouseValidationRules - 纯函数工具类
// ==========================================
pub struct WarehouseValidationRules;

impl WarehouseValidationRules {
    /// 形状校验
    ///
    /// # 规则
    /// 字段优先级: business_unit_code → location → capacity → stock,
    /// 只报告第一个不合格字段
    ///
    /// # 返回
    /// - Ok(CheckedWarehouse): 去除首尾空白后的合法输入
    /// - Err(InvalidInput)
    pub fn validate_shape(draft: &WarehouseDraft) -> EngineResult<CheckedWarehouse> {
        let code = non_blank(draft.business_unit_code.as_deref()).ok_or_else(|| {
            EngineError::invalid_input("businessUnitCode", "Business unit code must be provided.")
        })?;

        let location_id = non_blank(draft.location_id.as_deref())
            .ok_or_else(|| EngineError::invalid_input("location", "Location must be provided."))?;

        let capacity = match draft.capacity {
            Some(c) if c > 0 => in_range("capacity", "Capacity", c)?,
            _ => return Err(EngineError::invalid_input("capacity", "Capacity must be > 0.")),
        };

        let stock = match draft.stock {
            Some(s) if s >= 0 => in_range("stock", "Stock", s)?,
            _ => return Err(EngineError::invalid_input("stock", "Stock must be >= 0.")),
        };

        Ok(CheckedWarehouse {
            business_unit_code: code.to_string(),
            location_id: location_id.to_string(),
            capacity,
            stock,
            created_at: draft.created_at,
        })
    }

    /// 容量不得超过地点上限
    pub fn validate_capacity_against_location(
        warehouse: &CheckedWarehouse,
        location: &Location,
    ) -> EngineResult<()> {
        if warehouse.capacity > location.max_capacity {
            return Err(EngineError::conflict(
                ConflictKind::CapacityExceeded,
                format!(
                    "Capacity exceeds max capacity for location. max={}, requested={}",
                    location.max_capacity, warehouse.capacity
                ),
            ));
        }
        Ok(())
    }

    /// 库存不得超过容量
    pub fn validate_stock_within_capacity(warehouse: &CheckedWarehouse) -> EngineResult<()> {
        if warehouse.stock > warehouse.capacity {
            return Err(EngineError::conflict(
                ConflictKind::StockExceedsCapacity,
                "Stock cannot exceed capacity.",
            ));
        }
        Ok(())
    }

    /// 新容量必须能容纳当前库存
    pub fn validate_replacement_accommodates_stock(
        replacement: &CheckedWarehouse,
        current: &Warehouse,
    ) -> EngineResult<()> {
        if replacement.capacity < current.stock {
            return Err(EngineError::conflict(
                ConflictKind::CapacityBelowCurrentStock,
                format!(
                    "New capacity cannot accommodate existing stock. existingStock={}, newCapacity={}",
                    current.stock, replacement.capacity
                ),
            ));
        }
        Ok(())
    }

    /// 新库存必须等于当前库存 (MustMatchCurrent 策略)
    pub fn validate_stock_matches_current(
        replacement: &CheckedWarehouse,
        current: &Warehouse,
    ) -> EngineResult<()> {
        if replacement.stock != current.stock {
            return Err(EngineError::conflict(
                ConflictKind::StockMismatch,
                format!(
                    "Stock of the new warehouse must match the existing stock. existingStock={}, newStock={}",
                    current.stock, replacement.stock
                ),
            ));
        }
        Ok(())
    }

    /// 地点活跃仓库数上限
    ///
    /// active_count 为地点现有活跃仓库数 (替换时已排除被替换的记录)
    pub fn validate_location_count_ceiling(active_count: u32, location: &Location) -> EngineResult<()> {
        if active_count >= location.max_warehouse_count {
            return Err(EngineError::conflict(
                ConflictKind::LocationFull,
                format!(
                    "Maximum number of warehouses reached for location: {}",
                    location.identifier
                ),
            ));
        }
        Ok(())
    }

    pub fn validate_not_already_archived(warehouse: &Warehouse) -> EngineResult<()> {
        if !warehouse.is_active() {
            return Err(EngineError::conflict(
                ConflictKind::AlreadyArchived,
                "Warehouse already archived.",
            ));
        }
        Ok(())
    }

    /// 同一代码不得已有活跃仓库
    pub fn validate_code_not_active_elsewhere(existing: Option<&Warehouse>) -> EngineResult<()> {
        match existing {
            Some(w) if w.is_active() => Err(EngineError::conflict(
                ConflictKind::DuplicateActiveCode,
                format!("Business unit code already exists: {}", w.business_unit_code),
            )),
            _ => Ok(()),
        }
    }

    /// 已归档代码不得复用 (Forbid 策略)
    pub fn validate_code_never_archived(code: &str, history: &[Warehouse]) -> EngineResult<()> {
        if history.iter().any(|w| !w.is_active()) {
            return Err(EngineError::conflict(
                ConflictKind::ArchivedCodeReused,
                format!("Business unit code was used by an archived warehouse: {}", code),
            ));
        }
        Ok(())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn in_range(field: &str, label: &str, value: i64) -> EngineResult<u32> {
    u32::try_from(value).map_err(|_| {
        EngineError::invalid_input(field, format!("{} is out of range: {}", label, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::ErrorKind;
    use chrono::NaiveDate;

    fn location(max_count: u32, max_capacity: u32) -> Location {
        Location::new("ZWOLLE-002", max_count, max_capacity)
    }

    fn checked(capacity: u32, stock: u32) -> CheckedWarehouse {
        CheckedWarehouse {
            business_unit_code: "MWH.001".to_string(),
            location_id: "ZWOLLE-002".to_string(),
            capacity,
            stock,
            created_at: None,
        }
    }

    fn stored(stock: u32, archived: bool) -> Warehouse {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        Warehouse {
            id: Some(1),
            business_unit_code: "MWH.001".to_string(),
            location_id: "ZWOLLE-002".to_string(),
            capacity: 40,
            stock,
            created_at: ts,
            archived_at: if archived { Some(ts) } else { None },
        }
    }

    fn invalid_field(err: EngineError) -> String {
        match err {
            EngineError::InvalidInput { field, .. } => field,
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    // ==========================================
    // 形状校验
    // ==========================================

    #[test]
    fn test_shape_accepts_valid_draft() {
        let draft = WarehouseDraft::new("  MWH.001 ", "ZWOLLE-002", 30, 10);
        let checked = WarehouseValidationRules::validate_shape(&draft).unwrap();
        assert_eq!(checked.business_unit_code, "MWH.001");
        assert_eq!(checked.capacity, 30);
        assert_eq!(checked.stock, 10);
    }

    #[test]
    fn test_shape_reports_first_violated_field() {
        // 全部缺失时报告 code
        let err = WarehouseValidationRules::validate_shape(&WarehouseDraft::default()).unwrap_err();
        assert_eq!(invalid_field(err), "businessUnitCode");

        let draft = WarehouseDraft {
            business_unit_code: Some("MWH.001".to_string()),
            location_id: Some("   ".to_string()),
            capacity: Some(0),
            stock: Some(-1),
            created_at: None,
        };
        let err = WarehouseValidationRules::validate_shape(&draft).unwrap_err();
        assert_eq!(invalid_field(err), "location");

        let draft = WarehouseDraft::new("MWH.001", "ZWOLLE-002", 0, -1);
        let err = WarehouseValidationRules::validate_shape(&draft).unwrap_err();
        assert_eq!(err.to_string(), "Capacity must be > 0.");

        let draft = WarehouseDraft::new("MWH.001", "ZWOLLE-002", 10, -1);
        let err = WarehouseValidationRules::validate_shape(&draft).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.to_string(), "Stock must be >= 0.");
    }

    #[test]
    fn test_shape_rejects_values_beyond_u32() {
        let draft = WarehouseDraft::new("MWH.001", "ZWOLLE-002", 5_000_000_000, 0);
        let err = WarehouseValidationRules::validate_shape(&draft).unwrap_err();
        assert_eq!(err.to_string(), "Capacity is out of range: 5000000000");
        assert_eq!(invalid_field(err), "capacity");

        let draft = WarehouseDraft::new("MWH.001", "ZWOLLE-002", 10, i64::MAX);
        let err = WarehouseValidationRules::validate_shape(&draft).unwrap_err();
        assert_eq!(invalid_field(err), "stock");
    }

    #[test]
    fn test_shape_zero_stock_is_valid() {
        let draft = WarehouseDraft::new("MWH.001", "ZWOLLE-002", 10, 0);
        assert!(WarehouseValidationRules::validate_shape(&draft).is_ok());
    }

    // ==========================================
    // 容量与库存
    // ==========================================

    #[test]
    fn test_capacity_against_location() {
        let loc = location(2, 50);
        assert!(WarehouseValidationRules::validate_capacity_against_location(&checked(50, 0), &loc).is_ok());

        let err =
            WarehouseValidationRules::validate_capacity_against_location(&checked(51, 0), &loc).unwrap_err();
        assert!(err.is_conflict(ConflictKind::CapacityExceeded));
        assert_eq!(
            err.to_string(),
            "Capacity exceeds max capacity for location. max=50, requested=51"
        );
    }

    #[test]
    fn test_stock_within_capacity() {
        assert!(WarehouseValidationRules::validate_stock_within_capacity(&checked(10, 10)).is_ok());
        let err = WarehouseValidationRules::validate_stock_within_capacity(&checked(10, 11)).unwrap_err();
        assert!(err.is_conflict(ConflictKind::StockExceedsCapacity));
    }

    #[test]
    fn test_replacement_accommodates_stock() {
        let current = stored(20, false);
        assert!(WarehouseValidationRules::validate_replacement_accommodates_stock(&checked(20, 5), &current).is_ok());
        let err = WarehouseValidationRules::validate_replacement_accommodates_stock(&checked(19, 5), &current)
            .unwrap_err();
        assert!(err.is_conflict(ConflictKind::CapacityBelowCurrentStock));
    }

    #[test]
    fn test_stock_matches_current() {
        let current = stored(20, false);
        assert!(WarehouseValidationRules::validate_stock_matches_current(&checked(30, 20), &current).is_ok());
        let err = WarehouseValidationRules::validate_stock_matches_current(&checked(30, 21), &current).unwrap_err();
        assert!(err.is_conflict(ConflictKind::StockMismatch));
    }

    // ==========================================
    // 数量与状态
    // ==========================================

    #[test]
    fn test_location_count_ceiling() {
        let loc = location(2, 50);
        assert!(WarehouseValidationRules::validate_location_count_ceiling(1, &loc).is_ok());
        let err = WarehouseValidationRules::validate_location_count_ceiling(2, &loc).unwrap_err();
        assert!(err.is_conflict(ConflictKind::LocationFull));
        assert_eq!(
            err.to_string(),
            "Maximum number of warehouses reached for location: ZWOLLE-002"
        );
    }

    #[test]
    fn test_archive_state_checks() {
        assert!(WarehouseValidationRules::validate_not_already_archived(&stored(0, false)).is_ok());
        let err = WarehouseValidationRules::validate_not_already_archived(&stored(0, true)).unwrap_err();
        assert!(err.is_conflict(ConflictKind::AlreadyArchived));
    }

    #[test]
    fn test_duplicate_and_reuse_checks() {
        let active = stored(0, false);
        let archived = stored(0, true);

        assert!(WarehouseValidationRules::validate_code_not_active_elsewhere(None).is_ok());
        assert!(WarehouseValidationRules::validate_code_not_active_elsewhere(Some(&archived)).is_ok());
        let err = WarehouseValidationRules::validate_code_not_active_elsewhere(Some(&active)).unwrap_err();
        assert!(err.is_conflict(ConflictKind::DuplicateActiveCode));

        assert!(WarehouseValidationRules::validate_code_never_archived("MWH.001", &[]).is_ok());
        let err = WarehouseValidationRules::validate_code_never_archived("MWH.001", &[archived]).unwrap_err();
        assert!(err.is_conflict(ConflictKind::ArchivedCodeReused));
    }
}
