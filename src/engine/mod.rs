// ==========================================
// 仓库履约分配系统 - 引擎层
// ==========================================
// 职责: 仓库生命周期与履约分配的规则引擎
// 红线: Engine 不拼 SQL, 所有拒绝必须带可读原因
// ==========================================

pub mod error;
pub mod fulfilment;
pub mod lifecycle;
pub mod locks;
pub mod rules;

// 重导出核心引擎
pub use error::{ConflictKind, EngineError, EngineResult, ErrorKind};
pub use fulfilment::FulfilmentAllocationService;
pub use lifecycle::WarehouseLifecycleEngine;
pub use locks::{AggregateLocks, LockKey};
pub use rules::WarehouseValidationRules;
