// ==========================================
// 仓库履约分配系统 - 引擎层错误类型
// ==========================================
// 职责: 定义规则引擎的失败分类,每次失败只返回一种错误
// 分类: InvalidInput / NotFound / Conflict / StorageFailure
// ==========================================

use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ==========================================
// ErrorKind - 对外错误分类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Conflict,
    StorageFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidInput => write!(f, "INVALID_INPUT"),
            ErrorKind::NotFound => write!(f, "NOT_FOUND"),
            ErrorKind::Conflict => write!(f, "CONFLICT"),
            ErrorKind::StorageFailure => write!(f, "STORAGE_FAILURE"),
        }
    }
}

// ==========================================
// ConflictKind - 被违反的不变量
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    // ===== 仓库生命周期 =====
    DuplicateActiveCode,
    LocationFull,
    CapacityExceeded,
    StockExceedsCapacity,
    CapacityBelowCurrentStock,
    AlreadyArchived,
    ArchivedCodeReused,
    StockMismatch,

    // ===== 履约分配 =====
    ProductWarehouseLimitExceeded,
    StoreWarehouseLimitExceeded,
    WarehouseProductLimitExceeded,
    DuplicateAssignment,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::DuplicateActiveCode => "DuplicateActiveCode",
            ConflictKind::LocationFull => "LocationFull",
            ConflictKind::CapacityExceeded => "CapacityExceeded",
            ConflictKind::StockExceedsCapacity => "StockExceedsCapacity",
            ConflictKind::CapacityBelowCurrentStock => "CapacityBelowCurrentStock",
            ConflictKind::AlreadyArchived => "AlreadyArchived",
            ConflictKind::ArchivedCodeReused => "ArchivedCodeReused",
            ConflictKind::StockMismatch => "StockMismatch",
            ConflictKind::ProductWarehouseLimitExceeded => "ProductWarehouseLimitExceeded",
            ConflictKind::StoreWarehouseLimitExceeded => "StoreWarehouseLimitExceeded",
            ConflictKind::WarehouseProductLimitExceeded => "WarehouseProductLimitExceeded",
            ConflictKind::DuplicateAssignment => "DuplicateAssignment",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// EngineError - 引擎层错误
// ==========================================
#[derive(Error, Debug)]
pub enum EngineError {
    /// 输入缺失或格式错误,按字段优先级只报告第一个
    #[error("{message}")]
    InvalidInput { field: String, message: String },

    #[error("{message}")]
    NotFound {
        entity: String,
        id: String,
        message: String,
    },

    #[error("{message}")]
    Conflict { kind: ConflictKind, message: String },

    #[error("存储失败: {0}")]
    StorageFailure(String),

    /// 替换只完成了一部分,业务代码可能没有活动仓库
    #[error("替换未完成 (businessUnitCode={code}): {message}")]
    ReplaceIncomplete { code: String, message: String },
}

impl EngineError {
    pub fn invalid_input(field: &str, message: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &str, id: impl ToString, message: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
            message: message.into(),
        }
    }

    pub fn conflict(kind: ConflictKind, message: impl Into<String>) -> Self {
        EngineError::Conflict {
            kind,
            message: message.into(),
        }
    }

    /// 对外错误分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidInput { .. } => ErrorKind::InvalidInput,
            EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::Conflict { .. } => ErrorKind::Conflict,
            EngineError::StorageFailure(_) | EngineError::ReplaceIncomplete { .. } => {
                ErrorKind::StorageFailure
            }
        }
    }

    /// 冲突类型 (非 Conflict 返回 None)
    pub fn conflict_kind(&self) -> Option<ConflictKind> {
        match self {
            EngineError::Conflict { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_conflict(&self, expected: ConflictKind) -> bool {
        self.conflict_kind() == Some(expected)
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
// 唯一约束在引擎之外的写入者绕过锁时才会触发,
// 这里统一归为 Conflict,具体类型由约束名判断
impl From<RepositoryError> for EngineError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UniqueConstraintViolation(msg) => {
                if msg.contains("fulfilment") {
                    EngineError::conflict(
                        ConflictKind::DuplicateAssignment,
                        format!("Fulfilment assignment already exists: {}", msg),
                    )
                } else {
                    EngineError::conflict(
                        ConflictKind::DuplicateActiveCode,
                        format!("Business unit code already exists: {}", msg),
                    )
                }
            }
            RepositoryError::NotFound { entity, id } => {
                let message = format!("{} not found: {}", entity, id);
                EngineError::NotFound {
                    entity,
                    id,
                    message,
                }
            }
            other => EngineError::StorageFailure(other.to_string()),
        }
    }
}

/// 引擎层 Result 类型
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            EngineError::invalid_input("capacity", "Capacity must be > 0.").kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            EngineError::not_found("Warehouse", "MWH.001", "missing").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            EngineError::conflict(ConflictKind::LocationFull, "full").kind(),
            ErrorKind::Conflict
        );
        let partial = EngineError::ReplaceIncomplete {
            code: "MWH.001".to_string(),
            message: "create failed".to_string(),
        };
        assert_eq!(partial.kind(), ErrorKind::StorageFailure);
        assert!(partial.conflict_kind().is_none());
    }

    #[test]
    fn test_message_is_display() {
        let err = EngineError::conflict(ConflictKind::StockExceedsCapacity, "Stock cannot exceed capacity.");
        assert_eq!(err.to_string(), "Stock cannot exceed capacity.");
        assert!(err.is_conflict(ConflictKind::StockExceedsCapacity));
    }

    #[test]
    fn test_from_repository_error() {
        let err: EngineError =
            RepositoryError::UniqueConstraintViolation("UNIQUE constraint failed: warehouse.business_unit_code".to_string())
                .into();
        assert!(err.is_conflict(ConflictKind::DuplicateActiveCode));

        let err: EngineError = RepositoryError::UniqueConstraintViolation(
            "UNIQUE constraint failed: fulfilment.product_id, fulfilment.warehouse_id, fulfilment.store_id"
                .to_string(),
        )
        .into();
        assert!(err.is_conflict(ConflictKind::DuplicateAssignment));

        let err: EngineError = RepositoryError::LockError("poisoned".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::StorageFailure);
    }
}
