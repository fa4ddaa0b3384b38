// ==========================================
// 仓库履约分配系统 - 履约分配数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑,只提供计数与写入
// ==========================================

use crate::db::{format_ts, parse_ts};
use crate::domain::fulfilment::{
    FulfilmentAssignment, FulfilmentField, FulfilmentFilter, NewFulfilment,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, params_from_iter, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// FulfilmentRepository Trait
// ==========================================
// 用途: 履约分配服务消费的持久化端口
// 实现者: FulfilmentRepositoryImpl（使用 rusqlite）
pub trait FulfilmentRepository: Send + Sync {
    /// 统计满足谓词的分配记录数
    fn count_where(&self, filter: &FulfilmentFilter) -> RepositoryResult<u64>;

    /// 统计满足谓词的记录中某字段的去重值个数
    fn count_distinct_where(
        &self,
        filter: &FulfilmentFilter,
        distinct: FulfilmentField,
    ) -> RepositoryResult<u64>;

    /// 写入新分配
    fn create(&self, assignment: &NewFulfilment) -> RepositoryResult<FulfilmentAssignment>;

    /// 查询满足谓词的分配记录（按创建顺序）
    fn list_where(&self, filter: &FulfilmentFilter) -> RepositoryResult<Vec<FulfilmentAssignment>>;
}

// ==========================================
// FulfilmentRepositoryImpl - SQLite 实现
// ==========================================

/// 履约分配仓储
/// 职责: 管理 fulfilment 表的写入与计数
pub struct FulfilmentRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl FulfilmentRepositoryImpl {
    /// 从已有连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<FulfilmentAssignment> {
        let created_at: String = row.get(4)?;
        Ok(FulfilmentAssignment {
            fulfilment_id: row.get(0)?,
            product_id: row.get(1)?,
            warehouse_id: row.get(2)?,
            store_id: row.get(3)?,
            created_at: parse_ts(4, &created_at)?,
        })
    }
}

impl FulfilmentRepository for FulfilmentRepositoryImpl {
    fn count_where(&self, filter: &FulfilmentFilter) -> RepositoryResult<u64> {
        let conn = self.get_conn()?;
        let (clause, args) = filter.to_sql();

        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM fulfilment WHERE {}", clause),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_distinct_where(
        &self,
        filter: &FulfilmentFilter,
        distinct: FulfilmentField,
    ) -> RepositoryResult<u64> {
        let conn = self.get_conn()?;
        let (clause, args) = filter.to_sql();

        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(DISTINCT {}) FROM fulfilment WHERE {}",
                distinct.column(),
                clause
            ),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn create(&self, assignment: &NewFulfilment) -> RepositoryResult<FulfilmentAssignment> {
        let conn = self.get_conn()?;
        let record = FulfilmentAssignment {
            fulfilment_id: uuid::Uuid::new_v4().to_string(),
            product_id: assignment.product_id,
            warehouse_id: assignment.warehouse_id,
            store_id: assignment.store_id,
            created_at: chrono::Local::now().naive_local(),
        };

        conn.execute(
            r#"
            INSERT INTO fulfilment (
                fulfilment_id, product_id, warehouse_id, store_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record.fulfilment_id,
                record.product_id,
                record.warehouse_id,
                record.store_id,
                format_ts(&record.created_at),
            ],
        )?;

        Ok(record)
    }

    fn list_where(&self, filter: &FulfilmentFilter) -> RepositoryResult<Vec<FulfilmentAssignment>> {
        let conn = self.get_conn()?;
        let (clause, args) = filter.to_sql();

        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT fulfilment_id, product_id, warehouse_id, store_id, created_at
            FROM fulfilment
            WHERE {}
            ORDER BY created_at, rowid
            "#,
            clause
        ))?;

        let rows = stmt
            .query_map(params_from_iter(args.iter()), Self::map_row)?
            .collect::<SqliteResult<Vec<FulfilmentAssignment>>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> FulfilmentRepositoryImpl {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO product (name) VALUES ('P1'), ('P2'), ('P3');
            INSERT INTO store (name) VALUES ('S1'), ('S2');
            INSERT INTO warehouse (business_unit_code, location_id, capacity, stock, created_at)
            VALUES ('W1', 'AMSTERDAM-001', 10, 0, '2026-01-01 00:00:00'),
                   ('W2', 'AMSTERDAM-001', 10, 0, '2026-01-01 00:00:00');
            "#,
        )
        .unwrap();
        FulfilmentRepositoryImpl::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_counts_by_predicate() {
        let repo = setup();
        repo.create(&NewFulfilment::new(1, 1, 1)).unwrap();
        repo.create(&NewFulfilment::new(1, 2, 1)).unwrap();
        repo.create(&NewFulfilment::new(2, 2, 1)).unwrap();
        repo.create(&NewFulfilment::new(3, 1, 2)).unwrap();

        let store1 = FulfilmentFilter::default().store(1);
        assert_eq!(repo.count_where(&store1).unwrap(), 3);
        assert_eq!(repo.count_where(&store1.product(1)).unwrap(), 2);
        assert_eq!(
            repo.count_distinct_where(&store1, FulfilmentField::Warehouse).unwrap(),
            2
        );
        assert_eq!(
            repo.count_distinct_where(
                &FulfilmentFilter::default().warehouse(1),
                FulfilmentField::Product
            )
            .unwrap(),
            2
        );
        assert_eq!(repo.list_where(&store1).unwrap().len(), 3);
    }

    #[test]
    fn test_duplicate_triple_rejected() {
        let repo = setup();
        repo.create(&NewFulfilment::new(1, 1, 1)).unwrap();
        let err = repo.create(&NewFulfilment::new(1, 1, 1)).unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
    }

    #[test]
    fn test_unknown_reference_rejected() {
        let repo = setup();
        let err = repo.create(&NewFulfilment::new(99, 1, 1)).unwrap_err();
        assert!(matches!(err, RepositoryError::ForeignKeyViolation(_)));
    }
}
