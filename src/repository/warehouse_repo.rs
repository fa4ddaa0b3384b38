// ==========================================
// 仓库履约分配系统 - 仓库数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: 读操作只反映已提交状态
// ==========================================

use crate::db::{format_ts, parse_ts};
use crate::domain::warehouse::Warehouse;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// WarehouseRepository Trait
// ==========================================
// 用途: 生命周期引擎消费的持久化端口
// 实现者: WarehouseRepositoryImpl（使用 rusqlite）
pub trait WarehouseRepository: Send + Sync {
    /// 查询全部活跃仓库
    fn list_active(&self) -> RepositoryResult<Vec<Warehouse>>;

    /// 按业务单元代码查询活跃仓库
    fn find_active_by_code(&self, code: &str) -> RepositoryResult<Option<Warehouse>>;

    /// 查询代码的全部历史记录（活跃 + 已归档,最新在前）
    fn find_history_by_code(&self, code: &str) -> RepositoryResult<Vec<Warehouse>>;

    /// 按物理行ID查询（含已归档）
    fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Warehouse>>;

    /// 统计地点上的活跃仓库数
    ///
    /// # 参数
    /// - location_id: 地点
    /// - excluding_code: 不计入统计的业务单元代码（替换场景）
    fn count_active_at_location(
        &self,
        location_id: &str,
        excluding_code: Option<&str>,
    ) -> RepositoryResult<u32> {
        let count = self
            .list_active()?
            .iter()
            .filter(|w| w.location_id == location_id)
            .filter(|w| excluding_code.map_or(true, |code| w.business_unit_code != code))
            .count();
        Ok(count as u32)
    }

    /// 新建仓库记录,返回带行ID的记录
    fn create(&self, warehouse: &Warehouse) -> RepositoryResult<Warehouse>;

    /// 按行ID更新仓库记录（用于持久化归档/字段变更）
    fn update(&self, warehouse: &Warehouse) -> RepositoryResult<()>;

    /// 归档代码对应的活跃仓库
    ///
    /// # 返回
    /// - Ok(Some(Warehouse)): 归档后的记录
    /// - Ok(None): 该代码无活跃仓库
    fn archive_by_code(&self, code: &str, at: NaiveDateTime) -> RepositoryResult<Option<Warehouse>>;

    /// 替换: 归档当前记录并创建新记录
    ///
    /// 默认实现按 update -> create 顺序执行,不具备原子性:
    /// create 失败时尝试恢复被归档的记录,恢复也失败则返回 PartialWrite。
    /// 支持事务的实现应覆盖此方法。
    fn replace_active(
        &self,
        archived: &Warehouse,
        replacement: &Warehouse,
    ) -> RepositoryResult<Warehouse> {
        self.update(archived)?;

        match self.create(replacement) {
            Ok(created) => Ok(created),
            Err(create_err) => {
                let restored = Warehouse {
                    archived_at: None,
                    ..archived.clone()
                };
                match self.update(&restored) {
                    Ok(()) => Err(create_err),
                    Err(restore_err) => Err(RepositoryError::PartialWrite {
                        message: format!(
                            "business_unit_code={} archived but replacement not created: create={}, restore={}",
                            archived.business_unit_code, create_err, restore_err
                        ),
                    }),
                }
            }
        }
    }
}

// ==========================================
// WarehouseRepositoryImpl - SQLite 实现
// ==========================================

const SELECT_WAREHOUSE: &str = r#"
    SELECT warehouse_id, business_unit_code, location_id, capacity, stock,
           created_at, archived_at
    FROM warehouse
"#;

/// 仓库仓储
/// 职责: 管理 warehouse 表的 CRUD 操作
pub struct WarehouseRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl WarehouseRepositoryImpl {
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

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Warehouse> {
        let created_at: String = row.get(5)?;
        let archived_at: Option<String> = row.get(6)?;
        Ok(Warehouse {
            id: Some(row.get(0)?),
            business_unit_code: row.get(1)?,
            location_id: row.get(2)?,
            capacity: row.get(3)?,
            stock: row.get(4)?,
            created_at: parse_ts(5, &created_at)?,
            archived_at: archived_at.map(|s| parse_ts(6, &s)).transpose()?,
        })
    }

    fn insert_row(conn: &Connection, warehouse: &Warehouse) -> RepositoryResult<Warehouse> {
        conn.execute(
            r#"
            INSERT INTO warehouse (
                business_unit_code, location_id, capacity, stock, created_at, archived_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                warehouse.business_unit_code,
                warehouse.location_id,
                warehouse.capacity,
                warehouse.stock,
                format_ts(&warehouse.created_at),
                warehouse.archived_at.as_ref().map(format_ts),
            ],
        )?;

        Ok(Warehouse {
            id: Some(conn.last_insert_rowid()),
            ..warehouse.clone()
        })
    }

    fn update_row(conn: &Connection, warehouse: &Warehouse) -> RepositoryResult<()> {
        let id = warehouse.id.ok_or_else(|| RepositoryError::FieldValueError {
            field: "warehouse_id".to_string(),
            message: format!("未持久化的仓库不能更新: {}", warehouse.business_unit_code),
        })?;

        let affected = conn.execute(
            r#"
            UPDATE warehouse
            SET location_id = ?1, capacity = ?2, stock = ?3, archived_at = ?4
            WHERE warehouse_id = ?5
            "#,
            params![
                warehouse.location_id,
                warehouse.capacity,
                warehouse.stock,
                warehouse.archived_at.as_ref().map(format_ts),
                id,
            ],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Warehouse".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

impl WarehouseRepository for WarehouseRepositoryImpl {
    fn list_active(&self) -> RepositoryResult<Vec<Warehouse>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE archived_at IS NULL ORDER BY warehouse_id",
            SELECT_WAREHOUSE
        ))?;

        let rows = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<Warehouse>>>()?;
        Ok(rows)
    }

    fn find_active_by_code(&self, code: &str) -> RepositoryResult<Option<Warehouse>> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                &format!(
                    "{} WHERE business_unit_code = ?1 AND archived_at IS NULL",
                    SELECT_WAREHOUSE
                ),
                params![code],
                Self::map_row,
            )
            .optional()?;
        Ok(found)
    }

    fn find_history_by_code(&self, code: &str) -> RepositoryResult<Vec<Warehouse>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE business_unit_code = ?1 ORDER BY warehouse_id DESC",
            SELECT_WAREHOUSE
        ))?;

        let rows = stmt
            .query_map(params![code], Self::map_row)?
            .collect::<SqliteResult<Vec<Warehouse>>>()?;
        Ok(rows)
    }

    fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Warehouse>> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                &format!("{} WHERE warehouse_id = ?1", SELECT_WAREHOUSE),
                params![id],
                Self::map_row,
            )
            .optional()?;
        Ok(found)
    }

    fn count_active_at_location(
        &self,
        location_id: &str,
        excluding_code: Option<&str>,
    ) -> RepositoryResult<u32> {
        let conn = self.get_conn()?;
        let count: u32 = match excluding_code {
            Some(code) => conn.query_row(
                r#"
                SELECT COUNT(*) FROM warehouse
                WHERE location_id = ?1 AND archived_at IS NULL AND business_unit_code <> ?2
                "#,
                params![location_id, code],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM warehouse WHERE location_id = ?1 AND archived_at IS NULL",
                params![location_id],
                |row| row.get(0),
            )?,
        };
        Ok(count)
    }

    fn create(&self, warehouse: &Warehouse) -> RepositoryResult<Warehouse> {
        let conn = self.get_conn()?;
        Self::insert_row(&conn, warehouse)
    }

    fn update(&self, warehouse: &Warehouse) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::update_row(&conn, warehouse)
    }

    fn archive_by_code(&self, code: &str, at: NaiveDateTime) -> RepositoryResult<Option<Warehouse>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let current = tx
            .query_row(
                &format!(
                    "{} WHERE business_unit_code = ?1 AND archived_at IS NULL",
                    SELECT_WAREHOUSE
                ),
                params![code],
                Self::map_row,
            )
            .optional()?;

        let archived = match current.and_then(|w| w.archived(at)) {
            Some(archived) => archived,
            None => return Ok(None),
        };

        Self::update_row(&tx, &archived)?;
        tx.commit()?;
        Ok(Some(archived))
    }

    /// 事务内完成归档与创建,任一步失败整体回滚
    fn replace_active(
        &self,
        archived: &Warehouse,
        replacement: &Warehouse,
    ) -> RepositoryResult<Warehouse> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        Self::update_row(&tx, archived)?;
        let created = Self::insert_row(&tx, replacement)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn setup() -> WarehouseRepositoryImpl {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        WarehouseRepositoryImpl::new(Arc::new(Mutex::new(conn)))
    }

    fn ts(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn warehouse(code: &str, location: &str) -> Warehouse {
        Warehouse {
            id: None,
            business_unit_code: code.to_string(),
            location_id: location.to_string(),
            capacity: 30,
            stock: 5,
            created_at: ts(8),
            archived_at: None,
        }
    }

    #[test]
    fn test_create_and_find_active() {
        let repo = setup();
        let created = repo.create(&warehouse("MWH.001", "ZWOLLE-001")).unwrap();
        assert!(created.id.is_some());

        let found = repo.find_active_by_code("MWH.001").unwrap().unwrap();
        assert_eq!(found, created);
        assert_eq!(repo.list_active().unwrap().len(), 1);
    }

    #[test]
    fn test_archive_by_code_excludes_from_active_count() {
        let repo = setup();
        repo.create(&warehouse("MWH.001", "ZWOLLE-002")).unwrap();
        repo.create(&warehouse("MWH.002", "ZWOLLE-002")).unwrap();
        assert_eq!(repo.count_active_at_location("ZWOLLE-002", None).unwrap(), 2);
        assert_eq!(
            repo.count_active_at_location("ZWOLLE-002", Some("MWH.001")).unwrap(),
            1
        );

        let archived = repo.archive_by_code("MWH.001", ts(9)).unwrap().unwrap();
        assert_eq!(archived.archived_at, Some(ts(9)));
        assert_eq!(repo.count_active_at_location("ZWOLLE-002", None).unwrap(), 1);
        assert!(repo.find_active_by_code("MWH.001").unwrap().is_none());

        // 再次归档: 无活跃记录
        assert!(repo.archive_by_code("MWH.001", ts(10)).unwrap().is_none());
    }

    #[test]
    fn test_second_active_row_for_code_is_rejected_by_index() {
        let repo = setup();
        repo.create(&warehouse("MWH.001", "AMSTERDAM-001")).unwrap();
        let err = repo
            .create(&warehouse("MWH.001", "AMSTERDAM-001"))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
    }

    #[test]
    fn test_replace_active_is_transactional() {
        let repo = setup();
        let current = repo.create(&warehouse("MWH.001", "AMSTERDAM-001")).unwrap();
        // 另一活跃记录占用替换目标代码,插入必然失败
        repo.create(&warehouse("MWH.009", "AMSTERDAM-001")).unwrap();

        let archived = current.archived(ts(9)).unwrap();
        let clash = warehouse("MWH.009", "AMSTERDAM-001");
        assert!(repo.replace_active(&archived, &clash).is_err());

        // 归档已回滚
        let still_active = repo.find_active_by_code("MWH.001").unwrap().unwrap();
        assert!(still_active.archived_at.is_none());
    }

    #[test]
    fn test_history_lists_all_rows_newest_first() {
        let repo = setup();
        let v1 = repo.create(&warehouse("MWH.001", "AMSTERDAM-001")).unwrap();
        let v2 = repo
            .replace_active(&v1.archived(ts(9)).unwrap(), &warehouse("MWH.001", "AMSTERDAM-001"))
            .unwrap();

        let history = repo.find_history_by_code("MWH.001").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, v2.id);
        assert!(history[0].is_active());
        assert!(!history[1].is_active());
    }

    #[test]
    fn test_update_requires_persisted_row() {
        let repo = setup();
        let err = repo.update(&warehouse("MWH.404", "ZWOLLE-001")).unwrap_err();
        assert!(matches!(err, RepositoryError::FieldValueError { .. }));

        let mut ghost = warehouse("MWH.404", "ZWOLLE-001");
        ghost.id = Some(999);
        let err = repo.update(&ghost).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }
}
