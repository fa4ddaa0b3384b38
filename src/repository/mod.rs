// ==========================================
// 仓库履约分配系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问端口与 SQLite 实现,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod catalog_repo;
pub mod error;
pub mod fulfilment_repo;
pub mod warehouse_repo;

// 重导出核心仓储
pub use catalog_repo::{CatalogRepository, CatalogRepositoryImpl};
pub use error::{RepositoryError, RepositoryResult};
pub use fulfilment_repo::{FulfilmentRepository, FulfilmentRepositoryImpl};
pub use warehouse_repo::{WarehouseRepository, WarehouseRepositoryImpl};
