// ==========================================
// 仓库履约分配系统 - 仓库生命周期引擎
// ==========================================
// 职责: 编排仓库 新建 / 替换 / 归档
// 状态机: 每个业务代码 Active -> Archived (终态),
//         替换 = Active(v1) -> Archived(v1) + Active(v2),整体提交或整体不提交
// 并发: 检查-写入 序列在聚合键锁内执行
// 红线: Engine 不拼 SQL,规则失败返回第一个违反项
// ==========================================

use crate::config::policy::{
    ArchivedCodeReuse, EnginePolicy, MissingArchivePolicy, ReplaceStockPolicy,
};
use crate::domain::location::{Location, LocationResolver};
use crate::domain::warehouse::{CheckedWarehouse, Warehouse, WarehouseDraft};
use crate::engine::error::{ConflictKind, EngineError, EngineResult};
use crate::engine::locks::{AggregateLocks, LockKey};
use crate::engine::rules::WarehouseValidationRules;
use crate::repository::error::RepositoryError;
use crate::repository::warehouse_repo::WarehouseRepository;
use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// WarehouseLifecycleEngine
// ==========================================
pub struct WarehouseLifecycleEngine {
    repo: Arc<dyn WarehouseRepository>,
    locations: Arc<dyn LocationResolver>,
    locks: Arc<AggregateLocks>,
    policy: EnginePolicy,
}

impl WarehouseLifecycleEngine {
    pub fn new(
        repo: Arc<dyn WarehouseRepository>,
        locations: Arc<dyn LocationResolver>,
        locks: Arc<AggregateLocks>,
        policy: EnginePolicy,
    ) -> Self {
        Self {
            repo,
            locations,
            locks,
            policy,
        }
    }

    pub fn policy(&self) -> &EnginePolicy {
        &self.policy
    }

    // ==========================================
    // 新建
    // ==========================================

    /// 新建仓库
    ///
    /// # 规则顺序
    /// 1. 形状校验
    /// 2. 地点存在
    /// 3. 代码无活跃仓库 (Forbid 策略下还要求从未归档)
    /// 4. 地点活跃仓库数未满
    /// 5. 容量不超过地点上限
    /// 6. 库存不超过容量
    #[instrument(skip(self, draft), fields(code = ?draft.business_unit_code, location = ?draft.location_id))]
    pub fn create(&self, draft: &WarehouseDraft) -> EngineResult<Warehouse> {
        let checked = WarehouseValidationRules::validate_shape(draft).map_err(|e| rejected("create", e))?;
        let location = self
            .resolve_location(&checked.location_id)
            .map_err(|e| rejected("create", e))?;
        let keys = [
            LockKey::Location(location.identifier.clone()),
            LockKey::Code(checked.business_unit_code.clone()),
        ];

        let result = self.locks.with_locked(&keys, || self.create_locked(checked, &location));
        match result {
            Ok(created) => {
                tracing::info!(
                    "仓库已创建: code={}, location={}, id={:?}",
                    created.business_unit_code,
                    created.location_id,
                    created.id
                );
                Ok(created)
            }
            Err(e) => Err(rejected("create", e)),
        }
    }

    fn create_locked(&self, checked: CheckedWarehouse, location: &Location) -> EngineResult<Warehouse> {
        let existing = self.repo.find_active_by_code(&checked.business_unit_code)?;
        WarehouseValidationRules::validate_code_not_active_elsewhere(existing.as_ref())?;

        if self.policy.archived_code_reuse == ArchivedCodeReuse::Forbid {
            let history = self.repo.find_history_by_code(&checked.business_unit_code)?;
            WarehouseValidationRules::validate_code_never_archived(&checked.business_unit_code, &history)?;
        }

        let active_count = self.repo.count_active_at_location(&location.identifier, None)?;
        WarehouseValidationRules::validate_location_count_ceiling(active_count, location)?;

        WarehouseValidationRules::validate_capacity_against_location(&checked, location)?;
        WarehouseValidationRules::validate_stock_within_capacity(&checked)?;

        let warehouse = checked.into_active(now());
        Ok(self.repo.create(&warehouse)?)
    }

    // ==========================================
    // 替换
    // ==========================================

    /// 替换业务代码当前的活跃仓库
    ///
    /// # 规则顺序
    /// 1. 形状校验
    /// 2. 代码存在活跃仓库
    /// 3. 目标地点存在
    /// 4. 容量不超过地点上限、库存不超过容量
    /// 5. 新容量能容纳当前库存 (MustMatchCurrent 策略下库存须相等)
    /// 6. 目标地点活跃仓库数 (不含被替换记录) 未满
    ///
    /// 归档与新建在一次仓储调用中提交;
    /// 仓储只完成一半时返回 ReplaceIncomplete
    #[instrument(skip(self, draft), fields(code = ?draft.business_unit_code, location = ?draft.location_id))]
    pub fn replace(&self, draft: &WarehouseDraft) -> EngineResult<Warehouse> {
        let checked = WarehouseValidationRules::validate_shape(draft).map_err(|e| rejected("replace", e))?;
        // 未知地点不加地点锁,错误在活跃记录检查之后报告
        let target = self.locations.resolve(&checked.location_id);
        let mut keys = vec![LockKey::Code(checked.business_unit_code.clone())];
        if let Some(location) = &target {
            keys.push(LockKey::Location(location.identifier.clone()));
        }

        let result = self.locks.with_locked(&keys, || self.replace_locked(checked, target));
        match result {
            Ok(created) => {
                tracing::info!(
                    "仓库已替换: code={}, location={}, new_id={:?}",
                    created.business_unit_code,
                    created.location_id,
                    created.id
                );
                Ok(created)
            }
            Err(e) => Err(rejected("replace", e)),
        }
    }

    fn replace_locked(&self, checked: CheckedWarehouse, target: Option<Location>) -> EngineResult<Warehouse> {
        let code = checked.business_unit_code.clone();

        let current = self
            .repo
            .find_active_by_code(&code)?
            .ok_or_else(|| active_not_found(&code))?;

        let location = target.ok_or_else(|| unknown_location(&checked.location_id))?;
        WarehouseValidationRules::validate_capacity_against_location(&checked, &location)?;
        WarehouseValidationRules::validate_stock_within_capacity(&checked)?;
        WarehouseValidationRules::validate_replacement_accommodates_stock(&checked, &current)?;
        if self.policy.replace_stock_policy == ReplaceStockPolicy::MustMatchCurrent {
            WarehouseValidationRules::validate_stock_matches_current(&checked, &current)?;
        }

        let active_count = self
            .repo
            .count_active_at_location(&location.identifier, Some(&code))?;
        WarehouseValidationRules::validate_location_count_ceiling(active_count, &location)?;

        let at = now();
        let archived = current.archived(at).ok_or_else(|| {
            EngineError::conflict(ConflictKind::AlreadyArchived, "Warehouse already archived.")
        })?;
        let replacement = CheckedWarehouse {
            created_at: None,
            ..checked
        }
        .into_active(at);

        self.repo
            .replace_active(&archived, &replacement)
            .map_err(|e| match e {
                RepositoryError::PartialWrite { message } => {
                    tracing::error!("替换未完成, 业务代码可能没有活跃仓库: code={}, {}", code, message);
                    EngineError::ReplaceIncomplete {
                        code: code.clone(),
                        message,
                    }
                }
                other => EngineError::from(other),
            })
    }

    // ==========================================
    // 归档
    // ==========================================

    /// 按业务代码归档活跃仓库
    ///
    /// # 返回
    /// - Ok(Some(Warehouse)): 归档后的记录
    /// - Ok(None): 代码不存在且策略为 Ignore
    ///
    /// 代码仅有已归档记录时返回 AlreadyArchived,重复归档不会静默成功
    #[instrument(skip(self))]
    pub fn archive(&self, code: &str) -> EngineResult<Option<Warehouse>> {
        let code = require_code(code).map_err(|e| rejected("archive", e))?;

        let result = self
            .locks
            .with_locked(&[LockKey::Code(code.to_string())], || self.archive_locked(code));
        match result {
            Ok(Some(archived)) => {
                tracing::info!("仓库已归档: code={}, id={:?}", archived.business_unit_code, archived.id);
                Ok(Some(archived))
            }
            Ok(None) => {
                tracing::info!("归档目标不存在, 按策略忽略: code={}", code);
                Ok(None)
            }
            Err(e) => Err(rejected("archive", e)),
        }
    }

    fn archive_locked(&self, code: &str) -> EngineResult<Option<Warehouse>> {
        if let Some(archived) = self.repo.archive_by_code(code, now())? {
            return Ok(Some(archived));
        }

        // 无活跃记录: 区分 已归档 与 不存在
        let history = self.repo.find_history_by_code(code)?;
        if let Some(latest) = history.first() {
            WarehouseValidationRules::validate_not_already_archived(latest)?;
        }
        match self.policy.missing_archive_policy {
            MissingArchivePolicy::Ignore => Ok(None),
            MissingArchivePolicy::Reject => Err(EngineError::not_found(
                "Warehouse",
                code,
                format!("Warehouse not found for businessUnitCode={}", code),
            )),
        }
    }

    /// 归档调用方持有的仓库记录
    ///
    /// 记录自身已归档时直接返回 AlreadyArchived;
    /// 否则以仓储中的最新状态为准再判断一次
    #[instrument(skip(self, warehouse), fields(code = %warehouse.business_unit_code, id = ?warehouse.id))]
    pub fn archive_record(&self, warehouse: &Warehouse) -> EngineResult<Warehouse> {
        let result = require_code(&warehouse.business_unit_code).and_then(|code| {
            WarehouseValidationRules::validate_not_already_archived(warehouse)?;
            self.locks.with_locked(&[LockKey::Code(code.to_string())], || {
                self.archive_record_locked(code, warehouse.id)
            })
        });

        match result {
            Ok(archived) => {
                tracing::info!("仓库已归档: code={}, id={:?}", archived.business_unit_code, archived.id);
                Ok(archived)
            }
            Err(e) => Err(rejected("archive", e)),
        }
    }

    fn archive_record_locked(&self, code: &str, id: Option<i64>) -> EngineResult<Warehouse> {
        let stored = match id {
            Some(id) => self.repo.find_by_id(id)?,
            None => self.repo.find_active_by_code(code)?,
        };
        let stored = stored.ok_or_else(|| {
            EngineError::not_found(
                "Warehouse",
                id.map_or_else(|| code.to_string(), |id| id.to_string()),
                format!("Warehouse not found for businessUnitCode={}", code),
            )
        })?;
        WarehouseValidationRules::validate_not_already_archived(&stored)?;

        let archived = stored.archived(now()).ok_or_else(|| {
            EngineError::conflict(ConflictKind::AlreadyArchived, "Warehouse already archived.")
        })?;
        self.repo.update(&archived)?;
        Ok(archived)
    }

    /// 按物理行ID归档
    pub fn archive_by_id(&self, id: i64) -> EngineResult<Warehouse> {
        let warehouse = self.get_by_id(id)?.ok_or_else(|| {
            EngineError::not_found("Warehouse", id, format!("Warehouse not found: id={}", id))
        })?;
        self.archive_record(&warehouse)
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn list_active(&self) -> EngineResult<Vec<Warehouse>> {
        Ok(self.repo.list_active()?)
    }

    pub fn get_by_id(&self, id: i64) -> EngineResult<Option<Warehouse>> {
        Ok(self.repo.find_by_id(id)?)
    }

    pub fn get_active_by_code(&self, code: &str) -> EngineResult<Option<Warehouse>> {
        Ok(self.repo.find_active_by_code(code.trim())?)
    }

    /// 代码的全部记录 (活跃 + 已归档),新记录在前
    pub fn history(&self, code: &str) -> EngineResult<Vec<Warehouse>> {
        Ok(self.repo.find_history_by_code(code.trim())?)
    }

    fn resolve_location(&self, identifier: &str) -> EngineResult<Location> {
        self.locations
            .resolve(identifier)
            .ok_or_else(|| unknown_location(identifier))
    }
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn require_code(code: &str) -> EngineResult<&str> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return Err(EngineError::invalid_input(
            "businessUnitCode",
            "Warehouse businessUnitCode must be provided.",
        ));
    }
    Ok(trimmed)
}

fn unknown_location(identifier: &str) -> EngineError {
    EngineError::not_found("Location", identifier, format!("Invalid location: {}", identifier))
}

fn active_not_found(code: &str) -> EngineError {
    EngineError::not_found(
        "Warehouse",
        code,
        format!("Active warehouse not found for businessUnitCode={}", code),
    )
}

fn rejected(operation: &str, err: EngineError) -> EngineError {
    match err.conflict_kind() {
        Some(kind) => tracing::warn!("仓库{}被拒绝: rule={}, {}", operation, kind, err),
        None => tracing::warn!("仓库{}失败: kind={}, {}", operation, err.kind(), err),
    }
    err
}
