// ==========================================
// 仓库履约分配系统 - API 层
// ==========================================
// 职责: 对外门面,请求/响应 DTO 与引擎调用
// ==========================================

pub mod fulfilment_api;
pub mod warehouse_api;

// 重导出核心类型
pub use fulfilment_api::{FulfilmentApi, FulfilmentInfo, FulfilmentRequest};
pub use warehouse_api::{LocationInfo, WarehouseApi, WarehouseInfo, WarehouseRequest};
