// ==========================================
// 仓库履约分配系统 - 仓库 API
// ==========================================
// 职责: 仓库新建/替换/归档/查询的对外门面,负责 DTO 转换
// 说明: 规则全部在 WarehouseLifecycleEngine 中执行
// ==========================================

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::db::format_ts;
use crate::domain::location::{Location, LocationDirectory};
use crate::domain::warehouse::{Warehouse, WarehouseDraft};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::lifecycle::WarehouseLifecycleEngine;

// ==========================================
// WarehouseRequest - 新建/替换请求
// ==========================================
/// 字段均可缺失,缺失字段由形状校验报告
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseRequest {
    pub business_unit_code: Option<String>,
    pub location: Option<String>,
    pub capacity: Option<i64>,
    pub stock: Option<i64>,
}

impl WarehouseRequest {
    pub fn new(code: &str, location: &str, capacity: i64, stock: i64) -> Self {
        Self {
            business_unit_code: Some(code.to_string()),
            location: Some(location.to_string()),
            capacity: Some(capacity),
            stock: Some(stock),
        }
    }

    fn into_draft(self) -> WarehouseDraft {
        WarehouseDraft {
            business_unit_code: self.business_unit_code,
            location_id: self.location,
            capacity: self.capacity,
            stock: self.stock,
            created_at: None,
        }
    }
}

// ==========================================
// WarehouseInfo - 仓库响应
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseInfo {
    pub id: Option<i64>,
    pub business_unit_code: String,
    pub location: String,
    pub capacity: u32,
    pub stock: u32,
    pub status: String,
    pub created_at: String,
    pub archived_at: Option<String>,
}

impl From<Warehouse> for WarehouseInfo {
    fn from(w: Warehouse) -> Self {
        Self {
            id: w.id,
            status: w.status().to_string(),
            created_at: format_ts(&w.created_at),
            archived_at: w.archived_at.as_ref().map(format_ts),
            business_unit_code: w.business_unit_code,
            location: w.location_id,
            capacity: w.capacity,
            stock: w.stock,
        }
    }
}

// ==========================================
// LocationInfo - 地点响应
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInfo {
    pub identifier: String,
    pub max_number_of_warehouses: u32,
    pub max_capacity: u32,
}

impl From<&Location> for LocationInfo {
    fn from(loc: &Location) -> Self {
        Self {
            identifier: loc.identifier.clone(),
            max_number_of_warehouses: loc.max_warehouse_count,
            max_capacity: loc.max_capacity,
        }
    }
}

// ==========================================
// WarehouseApi
// ==========================================
pub struct WarehouseApi {
    engine: Arc<WarehouseLifecycleEngine>,
    locations: Arc<LocationDirectory>,
}

impl WarehouseApi {
    pub fn new(engine: Arc<WarehouseLifecycleEngine>, locations: Arc<LocationDirectory>) -> Self {
        Self { engine, locations }
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 全部活跃仓库
    pub fn list_active_warehouses(&self) -> EngineResult<Vec<WarehouseInfo>> {
        let warehouses = self.engine.list_active()?;
        debug!("查询活跃仓库: count={}", warehouses.len());
        Ok(warehouses.into_iter().map(WarehouseInfo::from).collect())
    }

    /// 按行ID查询 (含已归档)
    pub fn get_warehouse(&self, id: i64) -> EngineResult<WarehouseInfo> {
        self.engine
            .get_by_id(id)?
            .map(WarehouseInfo::from)
            .ok_or_else(|| EngineError::not_found("Warehouse", id, format!("Warehouse not found: id={}", id)))
    }

    /// 按业务代码查询活跃仓库
    pub fn get_active_warehouse(&self, code: &str) -> EngineResult<WarehouseInfo> {
        self.engine
            .get_active_by_code(code)?
            .map(WarehouseInfo::from)
            .ok_or_else(|| {
                EngineError::not_found(
                    "Warehouse",
                    code,
                    format!("Active warehouse not found for businessUnitCode={}", code),
                )
            })
    }

    /// 业务代码的历史记录,新记录在前
    pub fn warehouse_history(&self, code: &str) -> EngineResult<Vec<WarehouseInfo>> {
        Ok(self
            .engine
            .history(code)?
            .into_iter()
            .map(WarehouseInfo::from)
            .collect())
    }

    pub fn list_locations(&self) -> Vec<LocationInfo> {
        self.locations.all().into_iter().map(LocationInfo::from).collect()
    }

    // ==========================================
    // 写入接口
    // ==========================================

    pub fn create_warehouse(&self, request: WarehouseRequest) -> EngineResult<WarehouseInfo> {
        self.engine
            .create(&request.into_draft())
            .map(WarehouseInfo::from)
    }

    /// 替换业务代码的活跃仓库
    ///
    /// 路径中的代码优先于请求体中的代码
    pub fn replace_warehouse(&self, code: &str, request: WarehouseRequest) -> EngineResult<WarehouseInfo> {
        let mut draft = request.into_draft();
        if !code.trim().is_empty() {
            draft.business_unit_code = Some(code.to_string());
        }
        self.engine.replace(&draft).map(WarehouseInfo::from)
    }

    /// 按业务代码归档,策略为 Ignore 且代码不存在时返回 None
    pub fn archive_warehouse(&self, code: &str) -> EngineResult<Option<WarehouseInfo>> {
        Ok(self.engine.archive(code)?.map(WarehouseInfo::from))
    }

    pub fn archive_warehouse_by_id(&self, id: i64) -> EngineResult<WarehouseInfo> {
        self.engine.archive_by_id(id).map(WarehouseInfo::from)
    }
}
