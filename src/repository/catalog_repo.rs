// ==========================================
// 仓库履约分配系统 - 产品/门店存在性查询
// ==========================================
// 说明: 产品与门店的增删改查属于外围系统,这里只保留
// 分配请求需要的存在性查询,以及初始化用的最小写入
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// CatalogRepository Trait
// ==========================================
pub trait CatalogRepository: Send + Sync {
    fn product_exists(&self, product_id: i64) -> RepositoryResult<bool>;

    fn store_exists(&self, store_id: i64) -> RepositoryResult<bool>;
}

// ==========================================
// CatalogRepositoryImpl - SQLite 实现
// ==========================================
pub struct CatalogRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl CatalogRepositoryImpl {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 登记产品,返回产品ID
    pub fn insert_product(&self, name: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute("INSERT INTO product (name) VALUES (?1)", params![name])?;
        Ok(conn.last_insert_rowid())
    }

    /// 登记门店,返回门店ID
    pub fn insert_store(&self, name: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute("INSERT INTO store (name) VALUES (?1)", params![name])?;
        Ok(conn.last_insert_rowid())
    }

    fn exists(&self, sql: &str, id: i64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(sql, params![id], |_row| Ok(true))
            .optional()?
            .unwrap_or(false);
        Ok(found)
    }
}

impl CatalogRepository for CatalogRepositoryImpl {
    fn product_exists(&self, product_id: i64) -> RepositoryResult<bool> {
        self.exists("SELECT 1 FROM product WHERE product_id = ?1", product_id)
    }

    fn store_exists(&self, store_id: i64) -> RepositoryResult<bool> {
        self.exists("SELECT 1 FROM store WHERE store_id = ?1", store_id)
    }
}
