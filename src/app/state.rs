// ==========================================
// 仓库履约分配系统 - 应用状态
// ==========================================
// 职责: 组装共享连接、仓储、引擎与 API 实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{FulfilmentApi, WarehouseApi};
use crate::config::config_manager::ConfigManager;
use crate::config::policy::EnginePolicy;
use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::location::LocationDirectory;
use crate::engine::{AggregateLocks, FulfilmentAllocationService, WarehouseLifecycleEngine};
use crate::repository::{
    catalog_repo::CatalogRepositoryImpl, fulfilment_repo::FulfilmentRepositoryImpl,
    warehouse_repo::WarehouseRepositoryImpl,
};

/// 应用状态
///
/// 所有组件共享同一个 SQLite 连接与同一张聚合锁表
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 启动时加载的策略
    pub policy: EnginePolicy,

    /// 地点目录
    pub locations: Arc<LocationDirectory>,

    /// 仓库 API
    pub warehouse_api: Arc<WarehouseApi>,

    /// 履约分配 API
    pub fulfilment_api: Arc<FulfilmentApi>,

    /// 生命周期引擎
    pub lifecycle_engine: Arc<WarehouseLifecycleEngine>,

    /// 履约分配服务
    pub allocation_service: Arc<FulfilmentAllocationService>,

    /// 产品/门店登记 (初始化与测试用)
    pub catalog_repo: Arc<CatalogRepositoryImpl>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// 打开数据库、建表,并从 config_kv 加载策略
    pub fn new(db_path: String) -> Result<Self, String> {
        Self::with_locations(db_path, LocationDirectory::standard())
    }

    /// 使用自定义地点目录创建
    pub fn with_locations(db_path: String, locations: LocationDirectory) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let policy = config_manager
            .load_policy()
            .map_err(|e| format!("加载引擎策略失败: {}", e))?;

        // ==========================================
        // Repository层
        // ==========================================
        let warehouse_repo = Arc::new(WarehouseRepositoryImpl::new(conn.clone()));
        let fulfilment_repo = Arc::new(FulfilmentRepositoryImpl::new(conn.clone()));
        let catalog_repo = Arc::new(CatalogRepositoryImpl::new(conn));

        // ==========================================
        // Engine层
        // ==========================================
        let locations = Arc::new(locations);
        let locks = Arc::new(AggregateLocks::new());

        let lifecycle_engine = Arc::new(WarehouseLifecycleEngine::new(
            warehouse_repo.clone(),
            locations.clone(),
            locks.clone(),
            policy.clone(),
        ));
        let allocation_service = Arc::new(FulfilmentAllocationService::new(
            fulfilment_repo,
            locks,
            policy.clone(),
        ));

        // ==========================================
        // API层
        // ==========================================
        let warehouse_api = Arc::new(WarehouseApi::new(lifecycle_engine.clone(), locations.clone()));
        let fulfilment_api = Arc::new(FulfilmentApi::new(
            catalog_repo.clone(),
            warehouse_repo,
            allocation_service.clone(),
        ));

        tracing::info!(
            "AppState初始化完成: locations={}, policy={:?}",
            locations.len(),
            policy
        );

        Ok(Self {
            db_path,
            policy,
            locations,
            warehouse_api,
            fulfilment_api,
            lifecycle_engine,
            allocation_service,
            catalog_repo,
            config_manager,
        })
    }
}

/// 默认数据库路径
///
/// 优先使用 FULFILMENT_ALLOCATION_DB_PATH,否则放在用户数据目录下
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("FULFILMENT_ALLOCATION_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./fulfilment_allocation.db");

    if let Some(data_dir) = dirs::data_dir() {
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("fulfilment-allocation-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("fulfilment-allocation");
        }

        // 目录创建失败时由打开数据库报告
        std::fs::create_dir_all(&path).ok();
        path = path.join("fulfilment_allocation.db");
    }

    path.to_string_lossy().to_string()
}
