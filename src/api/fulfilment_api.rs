// ==========================================
// 仓库履约分配系统 - 履约分配 API
// ==========================================
// 职责: 请求实体存在性检查 + 调用准入服务
// 存在性: 产品、门店来自 CatalogRepository,仓库来自 WarehouseRepository
//         已归档仓库仍视为存在
// ==========================================

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::format_ts;
use crate::domain::fulfilment::FulfilmentAssignment;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::fulfilment::FulfilmentAllocationService;
use crate::repository::catalog_repo::CatalogRepository;
use crate::repository::warehouse_repo::WarehouseRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfilmentRequest {
    pub product_id: i64,
    pub warehouse_id: i64,
    pub store_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfilmentInfo {
    pub id: String,
    pub product_id: i64,
    pub warehouse_id: i64,
    pub store_id: i64,
    pub created_at: String,
}

impl From<FulfilmentAssignment> for FulfilmentInfo {
    fn from(a: FulfilmentAssignment) -> Self {
        Self {
            created_at: format_ts(&a.created_at),
            id: a.fulfilment_id,
            product_id: a.product_id,
            warehouse_id: a.warehouse_id,
            store_id: a.store_id,
        }
    }
}

pub struct FulfilmentApi {
    catalog: Arc<dyn CatalogRepository>,
    warehouses: Arc<dyn WarehouseRepository>,
    service: Arc<FulfilmentAllocationService>,
}

impl FulfilmentApi {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        warehouses: Arc<dyn WarehouseRepository>,
        service: Arc<FulfilmentAllocationService>,
    ) -> Self {
        Self {
            catalog,
            warehouses,
            service,
        }
    }

    /// 新增履约分配
    ///
    /// # 检查顺序
    /// 产品 → 门店 → 仓库 存在,然后执行准入规则
    pub fn add_fulfilment(&self, request: FulfilmentRequest) -> EngineResult<FulfilmentInfo> {
        if !self.catalog.product_exists(request.product_id)? {
            return Err(missing("Product", request.product_id));
        }
        self.ensure_store(request.store_id)?;
        if self.warehouses.find_by_id(request.warehouse_id)?.is_none() {
            return Err(missing("Warehouse", request.warehouse_id));
        }

        self.service
            .add_fulfilment(request.product_id, request.warehouse_id, request.store_id)
            .map(FulfilmentInfo::from)
    }

    pub fn list_store_fulfilments(&self, store_id: i64) -> EngineResult<Vec<FulfilmentInfo>> {
        self.ensure_store(store_id)?;
        Ok(self
            .service
            .list_for_store(store_id)?
            .into_iter()
            .map(FulfilmentInfo::from)
            .collect())
    }

    fn ensure_store(&self, store_id: i64) -> EngineResult<()> {
        if !self.catalog.store_exists(store_id)? {
            return Err(missing("Store", store_id));
        }
        Ok(())
    }
}

fn missing(entity: &str, id: i64) -> EngineError {
    EngineError::not_found(entity, id, format!("{} with id {} not found.", entity, id))
}
