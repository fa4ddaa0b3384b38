// ==========================================
// 仓库履约分配系统 - 履约分配准入服务
// ==========================================
// 职责: 新增 (产品, 仓库, 门店) 分配前的基数规则校验
// 规则顺序:
//   1. 单门店单产品仓库数上限
//   2. 单门店不同仓库数上限 (已在用的仓库不受限)
//   3. 单仓库产品种类上限 (可选)
// 并发: 门店键 + 仓库键 加锁后 统计-写入
// ==========================================

use crate::config::policy::EnginePolicy;
use crate::domain::fulfilment::{FulfilmentAssignment, FulfilmentField, FulfilmentFilter, NewFulfilment};
use crate::engine::error::{ConflictKind, EngineError, EngineResult};
use crate::engine::locks::{AggregateLocks, LockKey};
use crate::repository::fulfilment_repo::FulfilmentRepository;
use std::sync::Arc;
use tracing::instrument;

pub struct FulfilmentAllocationService {
    repo: Arc<dyn FulfilmentRepository>,
    locks: Arc<AggregateLocks>,
    policy: EnginePolicy,
}

impl FulfilmentAllocationService {
    pub fn new(
        repo: Arc<dyn FulfilmentRepository>,
        locks: Arc<AggregateLocks>,
        policy: EnginePolicy,
    ) -> Self {
        Self { repo, locks, policy }
    }

    /// 新增履约分配
    ///
    /// 产品/仓库/门店的存在性由调用方保证 (见 FulfilmentApi)
    #[instrument(skip(self))]
    pub fn add_fulfilment(
        &self,
        product_id: i64,
        warehouse_id: i64,
        store_id: i64,
    ) -> EngineResult<FulfilmentAssignment> {
        let request = NewFulfilment::new(product_id, warehouse_id, store_id);
        let keys = [LockKey::Store(store_id), LockKey::Warehouse(warehouse_id)];

        let result = self.locks.with_locked(&keys, || self.add_locked(&request));
        match result {
            Ok(assignment) => {
                tracing::info!(
                    "履约分配已创建: id={}, product={}, warehouse={}, store={}",
                    assignment.fulfilment_id,
                    product_id,
                    warehouse_id,
                    store_id
                );
                Ok(assignment)
            }
            Err(e) => {
                tracing::warn!(
                    "履约分配被拒绝: product={}, warehouse={}, store={}, kind={}, {}",
                    product_id,
                    warehouse_id,
                    store_id,
                    e.conflict_kind().map_or_else(|| e.kind().to_string(), |k| k.to_string()),
                    e
                );
                Err(e)
            }
        }
    }

    fn add_locked(&self, request: &NewFulfilment) -> EngineResult<FulfilmentAssignment> {
        self.check_product_store_limit(request)?;
        self.check_store_warehouse_limit(request)?;
        self.check_warehouse_product_limit(request)?;

        let triple = FulfilmentFilter::default()
            .product(request.product_id)
            .warehouse(request.warehouse_id)
            .store(request.store_id);
        if self.repo.count_where(&triple)? > 0 {
            return Err(EngineError::conflict(
                ConflictKind::DuplicateAssignment,
                format!(
                    "Fulfilment already exists for productId={}, warehouseId={}, storeId={}",
                    request.product_id, request.warehouse_id, request.store_id
                ),
            ));
        }

        Ok(self.repo.create(request)?)
    }

    // ===== 规则 1 =====
    fn check_product_store_limit(&self, request: &NewFulfilment) -> EngineResult<()> {
        let limit = u64::from(self.policy.max_warehouses_per_product_per_store);
        let filter = FulfilmentFilter::default()
            .product(request.product_id)
            .store(request.store_id);

        if self.repo.count_where(&filter)? >= limit {
            return Err(EngineError::conflict(
                ConflictKind::ProductWarehouseLimitExceeded,
                format!(
                    "A product can only be fulfilled by a maximum of {} warehouses per store.",
                    limit
                ),
            ));
        }
        Ok(())
    }

    // ===== 规则 2 =====
    fn check_store_warehouse_limit(&self, request: &NewFulfilment) -> EngineResult<()> {
        let limit = u64::from(self.policy.max_warehouses_per_store);
        let store = FulfilmentFilter::default().store(request.store_id);

        let distinct = self.repo.count_distinct_where(&store, FulfilmentField::Warehouse)?;
        if distinct < limit {
            return Ok(());
        }

        let already_serving = self
            .repo
            .count_where(&store.warehouse(request.warehouse_id))?
            > 0;
        if already_serving {
            return Ok(());
        }

        Err(EngineError::conflict(
            ConflictKind::StoreWarehouseLimitExceeded,
            format!(
                "A store can be fulfilled by a maximum of {} different warehouses.",
                limit
            ),
        ))
    }

    // ===== 规则 3 (可选) =====
    fn check_warehouse_product_limit(&self, request: &NewFulfilment) -> EngineResult<()> {
        let limit = match self.policy.max_products_per_warehouse {
            Some(limit) => u64::from(limit),
            None => return Ok(()),
        };
        let warehouse = FulfilmentFilter::default().warehouse(request.warehouse_id);

        let distinct = self.repo.count_distinct_where(&warehouse, FulfilmentField::Product)?;
        if distinct < limit {
            return Ok(());
        }

        let already_stored = self
            .repo
            .count_where(&warehouse.product(request.product_id))?
            > 0;
        if already_stored {
            return Ok(());
        }

        Err(EngineError::conflict(
            ConflictKind::WarehouseProductLimitExceeded,
            format!(
                "A warehouse can store a maximum of {} types of products.",
                limit
            ),
        ))
    }

    /// 门店的全部履约分配
    pub fn list_for_store(&self, store_id: i64) -> EngineResult<Vec<FulfilmentAssignment>> {
        Ok(self
            .repo
            .list_where(&FulfilmentFilter::default().store(store_id))?)
    }
}
