// ==========================================
// 仓库履约分配系统 - 配置管理器
// ==========================================
// 职责: 规则策略加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::policy::{
    ArchivedCodeReuse, EnginePolicy, MissingArchivePolicy, ReplaceStockPolicy,
};
use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入 global scope 配置（存在则覆盖）
    pub fn set_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
            ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value,
                updated_at = datetime('now')
            "#,
            params![key, value],
        )?;

        Ok(())
    }

    /// 删除 global scope 配置
    pub fn remove_value(&self, key: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "DELETE FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
        )?;
        Ok(())
    }

    /// 读取并解析配置,缺失或无法解析时回退默认值
    fn get_parsed<T, F>(&self, key: &str, default: T, parse: F) -> Result<T, Box<dyn Error>>
    where
        T: std::fmt::Debug,
        F: Fn(&str) -> Option<T>,
    {
        match self.get_value(key)? {
            None => Ok(default),
            Some(raw) => match parse(&raw) {
                Some(v) => Ok(v),
                None => {
                    tracing::warn!("配置值无法解析, 使用默认值: key={}, value={}, default={:?}", key, raw, default);
                    Ok(default)
                }
            },
        }
    }

    /// 加载引擎策略
    pub fn load_policy(&self) -> Result<EnginePolicy, Box<dyn Error>> {
        let defaults = EnginePolicy::default();

        let archived_code_reuse = self.get_parsed(
            config_keys::ARCHIVED_CODE_REUSE,
            defaults.archived_code_reuse,
            ArchivedCodeReuse::from_str,
        )?;
        let replace_stock_policy = self.get_parsed(
            config_keys::REPLACE_STOCK_POLICY,
            defaults.replace_stock_policy,
            ReplaceStockPolicy::from_str,
        )?;
        let missing_archive_policy = self.get_parsed(
            config_keys::MISSING_ARCHIVE_POLICY,
            defaults.missing_archive_policy,
            MissingArchivePolicy::from_str,
        )?;
        let max_warehouses_per_product_per_store = self.get_parsed(
            config_keys::MAX_WAREHOUSES_PER_PRODUCT_PER_STORE,
            defaults.max_warehouses_per_product_per_store,
            parse_positive,
        )?;
        let max_warehouses_per_store = self.get_parsed(
            config_keys::MAX_WAREHOUSES_PER_STORE,
            defaults.max_warehouses_per_store,
            parse_positive,
        )?;
        // 空值或 "off" 表示关闭该规则
        let max_products_per_warehouse = self.get_parsed(
            config_keys::MAX_PRODUCTS_PER_WAREHOUSE,
            defaults.max_products_per_warehouse,
            |raw| match raw.trim().to_ascii_lowercase().as_str() {
                "" | "off" | "none" => Some(None),
                other => parse_positive(other).map(Some),
            },
        )?;

        let policy = EnginePolicy {
            archived_code_reuse,
            replace_stock_policy,
            missing_archive_policy,
            max_warehouses_per_product_per_store,
            max_warehouses_per_store,
            max_products_per_warehouse,
        };
        tracing::debug!("引擎策略已加载: {:?}", policy);
        Ok(policy)
    }
}

fn parse_positive(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|v| *v > 0)
}

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    // 仓库生命周期
    pub const ARCHIVED_CODE_REUSE: &str = "allocation/archived_code_reuse";
    pub const REPLACE_STOCK_POLICY: &str = "allocation/replace_stock_policy";
    pub const MISSING_ARCHIVE_POLICY: &str = "allocation/missing_archive_policy";

    // 履约分配
    pub const MAX_WAREHOUSES_PER_PRODUCT_PER_STORE: &str =
        "allocation/max_warehouses_per_product_per_store";
    pub const MAX_WAREHOUSES_PER_STORE: &str = "allocation/max_warehouses_per_store";
    pub const MAX_PRODUCTS_PER_WAREHOUSE: &str = "allocation/max_products_per_warehouse";
}
