// ==========================================
// 仓库履约分配系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 仓库生命周期与履约分配的规则引擎
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与参考数据
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 规则策略
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 对外门面
pub mod api;

// 应用层 - 组件装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域实体
pub use domain::{
    FulfilmentAssignment, Location, LocationDirectory, LocationResolver, NewFulfilment, Warehouse,
    WarehouseDraft, WarehouseStatus,
};

// 引擎
pub use engine::{
    ConflictKind, EngineError, EngineResult, ErrorKind, FulfilmentAllocationService,
    WarehouseLifecycleEngine, WarehouseValidationRules,
};

// 配置
pub use config::{ConfigManager, EnginePolicy};

// API
pub use api::{FulfilmentApi, WarehouseApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "仓库履约分配系统";
