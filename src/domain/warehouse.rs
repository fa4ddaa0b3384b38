// ==========================================
// 仓库履约分配系统 - 仓库领域模型
// ==========================================
// 不变量: archived_at 为空 <=> 仓库处于活跃状态
// 同一业务单元代码同一时刻至多一个活跃仓库,可有多条历史归档记录
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// WarehouseStatus - 仓库状态
// ==========================================
// Active -> Archived 为终态迁移,每条物理记录只发生一次
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarehouseStatus {
    Active,   // 活跃
    Archived, // 已归档
}

impl fmt::Display for WarehouseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarehouseStatus::Active => write!(f, "ACTIVE"),
            WarehouseStatus::Archived => write!(f, "ARCHIVED"),
        }
    }
}

// ==========================================
// Warehouse - 仓库记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: Option<i64>,                   // 物理行ID (持久化后分配)
    pub business_unit_code: String,        // 业务单元代码
    pub location_id: String,               // 所属地点
    pub capacity: u32,                     // 容量 (> 0)
    pub stock: u32,                        // 库存 (<= capacity)
    pub created_at: NaiveDateTime,         // 创建时间
    pub archived_at: Option<NaiveDateTime>, // 归档时间 (None = 活跃)
}

impl Warehouse {
    pub fn is_active(&self) -> bool {
        self.archived_at.is_none()
    }

    pub fn status(&self) -> WarehouseStatus {
        if self.is_active() {
            WarehouseStatus::Active
        } else {
            WarehouseStatus::Archived
        }
    }

    /// 返回归档后的副本
    ///
    /// 已归档记录原样返回 None,由调用方决定如何报告
    pub fn archived(&self, at: NaiveDateTime) -> Option<Warehouse> {
        if !self.is_active() {
            return None;
        }
        Some(Warehouse {
            archived_at: Some(at),
            ..self.clone()
        })
    }
}

// ==========================================
// WarehouseDraft - 未校验的仓库输入
// ==========================================
// 用途: 创建/替换请求的原始形态,字段均可缺失
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseDraft {
    pub business_unit_code: Option<String>,
    pub location_id: Option<String>,
    pub capacity: Option<i64>,
    pub stock: Option<i64>,
    pub created_at: Option<NaiveDateTime>,
}

impl WarehouseDraft {
    pub fn new(code: &str, location_id: &str, capacity: i64, stock: i64) -> Self {
        Self {
            business_unit_code: Some(code.to_string()),
            location_id: Some(location_id.to_string()),
            capacity: Some(capacity),
            stock: Some(stock),
            created_at: None,
        }
    }
}

// ==========================================
// CheckedWarehouse - 形状校验通过的仓库
// ==========================================
// 由 WarehouseValidationRules::validate_shape 产出
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedWarehouse {
    pub business_unit_code: String,
    pub location_id: String,
    pub capacity: u32,
    pub stock: u32,
    pub created_at: Option<NaiveDateTime>,
}

impl CheckedWarehouse {
    /// 转换为待持久化的活跃仓库
    ///
    /// created_at 缺省时取 now,archived_at 强制置空
    pub fn into_active(self, now: NaiveDateTime) -> Warehouse {
        Warehouse {
            id: None,
            business_unit_code: self.business_unit_code,
            location_id: self.location_id,
            capacity: self.capacity,
            stock: self.stock,
            created_at: self.created_at.unwrap_or(now),
            archived_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_archived_copy_only_from_active() {
        let checked = CheckedWarehouse {
            business_unit_code: "MWH.001".to_string(),
            location_id: "ZWOLLE-001".to_string(),
            capacity: 40,
            stock: 10,
            created_at: None,
        };
        let active = checked.into_active(ts(8));
        assert_eq!(active.status(), WarehouseStatus::Active);
        assert_eq!(active.created_at, ts(8));

        let archived = active.archived(ts(9)).unwrap();
        assert_eq!(archived.status(), WarehouseStatus::Archived);
        assert_eq!(archived.archived_at, Some(ts(9)));

        // 已归档记录不能再次归档
        assert!(archived.archived(ts(10)).is_none());
    }

    #[test]
    fn test_into_active_keeps_supplied_created_at() {
        let checked = CheckedWarehouse {
            business_unit_code: "MWH.002".to_string(),
            location_id: "AMSTERDAM-001".to_string(),
            capacity: 50,
            stock: 0,
            created_at: Some(ts(1)),
        };
        let w = checked.into_active(ts(12));
        assert_eq!(w.created_at, ts(1));
        assert!(w.archived_at.is_none());
        assert!(w.id.is_none());
    }
}
