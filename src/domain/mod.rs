// ==========================================
// 仓库履约分配系统 - 领域模型层
// ==========================================
// 职责: 定义仓库、地点、履约分配等领域实体
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod fulfilment;
pub mod location;
pub mod warehouse;

// 重导出核心类型
pub use fulfilment::{FulfilmentAssignment, FulfilmentField, FulfilmentFilter, NewFulfilment};
pub use location::{Location, LocationDirectory, LocationResolver};
pub use warehouse::{CheckedWarehouse, Warehouse, WarehouseDraft, WarehouseStatus};
