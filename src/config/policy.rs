// ==========================================
// 仓库履约分配系统 - 规则策略
// ==========================================
// 职责: 可配置的规则分支与阈值
// 存储: config_kv 表 (由 ConfigManager 加载)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 已归档代码复用策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArchivedCodeReuse {
    Allow,  // 允许新仓库复用已归档代码
    Forbid, // 已归档代码不可再用于新建
}

impl ArchivedCodeReuse {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ALLOW" => Some(ArchivedCodeReuse::Allow),
            "FORBID" => Some(ArchivedCodeReuse::Forbid),
            _ => None,
        }
    }
}

impl fmt::Display for ArchivedCodeReuse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchivedCodeReuse::Allow => write!(f, "ALLOW"),
            ArchivedCodeReuse::Forbid => write!(f, "FORBID"),
        }
    }
}

// ==========================================
// 替换时的库存策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplaceStockPolicy {
    FitWithinCapacity, // 新库存不超过新容量即可
    MustMatchCurrent,  // 新库存必须等于当前库存
}

impl ReplaceStockPolicy {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "FIT_WITHIN_CAPACITY" => Some(ReplaceStockPolicy::FitWithinCapacity),
            "MUST_MATCH_CURRENT" => Some(ReplaceStockPolicy::MustMatchCurrent),
            _ => None,
        }
    }
}

impl fmt::Display for ReplaceStockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplaceStockPolicy::FitWithinCapacity => write!(f, "FIT_WITHIN_CAPACITY"),
            ReplaceStockPolicy::MustMatchCurrent => write!(f, "MUST_MATCH_CURRENT"),
        }
    }
}

// ==========================================
// 归档不存在代码时的处理
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissingArchivePolicy {
    Reject, // 返回 NotFound
    Ignore, // 静默返回 None
}

impl MissingArchivePolicy {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "REJECT" => Some(MissingArchivePolicy::Reject),
            "IGNORE" => Some(MissingArchivePolicy::Ignore),
            _ => None,
        }
    }
}

impl fmt::Display for MissingArchivePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingArchivePolicy::Reject => write!(f, "REJECT"),
            MissingArchivePolicy::Ignore => write!(f, "IGNORE"),
        }
    }
}

// ==========================================
// EnginePolicy - 引擎策略集合
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnginePolicy {
    pub archived_code_reuse: ArchivedCodeReuse,
    pub replace_stock_policy: ReplaceStockPolicy,
    pub missing_archive_policy: MissingArchivePolicy,

    // ===== 履约分配阈值 =====
    pub max_warehouses_per_product_per_store: u32, // 单门店单产品最多仓库数
    pub max_warehouses_per_store: u32,             // 单门店最多不同仓库数
    pub max_products_per_warehouse: Option<u32>,   // 单仓库最多产品种类 (None = 不检查)
}

/// 启用单仓产品种类限制时的常用阈值
pub const DEFAULT_WAREHOUSE_PRODUCT_LIMIT: u32 = 5;

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            archived_code_reuse: ArchivedCodeReuse::Allow,
            replace_stock_policy: ReplaceStockPolicy::FitWithinCapacity,
            missing_archive_policy: MissingArchivePolicy::Reject,
            max_warehouses_per_product_per_store: 2,
            max_warehouses_per_store: 3,
            max_products_per_warehouse: None,
        }
    }
}

impl EnginePolicy {
    /// 开启单仓产品种类限制
    pub fn with_warehouse_product_limit(mut self, limit: u32) -> Self {
        self.max_products_per_warehouse = Some(limit);
        self
    }
}
