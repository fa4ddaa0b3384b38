// ==========================================
// 仓库履约分配系统 - 履约分配领域模型
// ==========================================
// 履约分配: (产品, 仓库, 门店) 三元组,三元组唯一
// 只由 FulfilmentAllocationService 创建,不更新
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// FulfilmentAssignment - 已持久化的履约分配
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfilmentAssignment {
    pub fulfilment_id: String,     // 分配ID (UUID)
    pub product_id: i64,           // 产品ID
    pub warehouse_id: i64,         // 仓库物理行ID
    pub store_id: i64,             // 门店ID
    pub created_at: NaiveDateTime, // 创建时间
}

// ==========================================
// NewFulfilment - 待写入的履约分配
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NewFulfilment {
    pub product_id: i64,
    pub warehouse_id: i64,
    pub store_id: i64,
}

impl NewFulfilment {
    pub fn new(product_id: i64, warehouse_id: i64, store_id: i64) -> Self {
        Self {
            product_id,
            warehouse_id,
            store_id,
        }
    }
}

// ==========================================
// FulfilmentField - 可去重统计的字段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FulfilmentField {
    Product,
    Warehouse,
    Store,
}

impl FulfilmentField {
    /// 对应的数据库列名
    pub fn column(&self) -> &'static str {
        match self {
            FulfilmentField::Product => "product_id",
            FulfilmentField::Warehouse => "warehouse_id",
            FulfilmentField::Store => "store_id",
        }
    }

    pub fn value_of(&self, assignment: &FulfilmentAssignment) -> i64 {
        match self {
            FulfilmentField::Product => assignment.product_id,
            FulfilmentField::Warehouse => assignment.warehouse_id,
            FulfilmentField::Store => assignment.store_id,
        }
    }
}

// ==========================================
// FulfilmentFilter - 等值谓词
// ==========================================
// 未设置的字段不参与过滤
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FulfilmentFilter {
    pub product_id: Option<i64>,
    pub warehouse_id: Option<i64>,
    pub store_id: Option<i64>,
}

impl FulfilmentFilter {
    pub fn product(mut self, product_id: i64) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn warehouse(mut self, warehouse_id: i64) -> Self {
        self.warehouse_id = Some(warehouse_id);
        self
    }

    pub fn store(mut self, store_id: i64) -> Self {
        self.store_id = Some(store_id);
        self
    }

    /// 内存判定,供非 SQL 实现复用
    pub fn matches(&self, assignment: &FulfilmentAssignment) -> bool {
        self.product_id.map_or(true, |id| id == assignment.product_id)
            && self.warehouse_id.map_or(true, |id| id == assignment.warehouse_id)
            && self.store_id.map_or(true, |id| id == assignment.store_id)
    }

    /// 生成 WHERE 子句 (不含 WHERE 关键字) 与参数
    ///
    /// 无条件时返回 "1 = 1"
    pub fn to_sql(&self) -> (String, Vec<i64>) {
        let mut clauses = Vec::new();
        let mut args = Vec::new();
        let fields = [
            (FulfilmentField::Product, self.product_id),
            (FulfilmentField::Warehouse, self.warehouse_id),
            (FulfilmentField::Store, self.store_id),
        ];
        for (field, value) in fields {
            if let Some(v) = value {
                args.push(v);
                clauses.push(format!("{} = ?{}", field.column(), args.len()));
            }
        }
        if clauses.is_empty() {
            ("1 = 1".to_string(), args)
        } else {
            (clauses.join(" AND "), args)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn assignment(product_id: i64, warehouse_id: i64, store_id: i64) -> FulfilmentAssignment {
        FulfilmentAssignment {
            fulfilment_id: "F1".to_string(),
            product_id,
            warehouse_id,
            store_id,
            created_at: NaiveDate::from_ymd_opt(2026, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_filter_matches() {
        let a = assignment(1, 2, 3);
        assert!(FulfilmentFilter::default().matches(&a));
        assert!(FulfilmentFilter::default().store(3).product(1).matches(&a));
        assert!(!FulfilmentFilter::default().store(3).warehouse(9).matches(&a));
    }

    #[test]
    fn test_filter_to_sql() {
        let (sql, args) = FulfilmentFilter::default().product(7).store(9).to_sql();
        assert_eq!(sql, "product_id = ?1 AND store_id = ?2");
        assert_eq!(args, vec![7, 9]);

        let (sql, args) = FulfilmentFilter::default().to_sql();
        assert_eq!(sql, "1 = 1");
        assert!(args.is_empty());
    }
}
