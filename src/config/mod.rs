// ==========================================
// 仓库履约分配系统 - 配置层
// ==========================================
// 职责: 规则策略管理,支持按键覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod policy;

// 重导出核心配置类型
pub use config_manager::{config_keys, ConfigManager};
pub use policy::{
    ArchivedCodeReuse, EnginePolicy, MissingArchivePolicy, ReplaceStockPolicy,
    DEFAULT_WAREHOUSE_PRODUCT_LIMIT,
};
