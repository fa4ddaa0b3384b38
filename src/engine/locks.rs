// ==========================================
// 仓库履约分配系统 - 聚合键锁
// ==========================================
// 职责: 按聚合键 (地点/业务代码/门店/仓库) 串行化 检查-写入 序列
// 约束: 多键按字典序加锁并去重,避免死锁
// ==========================================

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

// ==========================================
// LockKey - 聚合键
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockKey {
    Location(String),
    Code(String),
    Store(i64),
    Warehouse(i64),
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKey::Location(id) => write!(f, "location:{}", id),
            LockKey::Code(code) => write!(f, "code:{}", code),
            LockKey::Store(id) => write!(f, "store:{}", id),
            LockKey::Warehouse(id) => write!(f, "warehouse:{}", id),
        }
    }
}

// ==========================================
// AggregateLocks - 键级互斥注册表
// ==========================================
#[derive(Default)]
pub struct AggregateLocks {
    registry: Mutex<HashMap<LockKey, Arc<Mutex<()>>>>,
}

impl AggregateLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, key: &LockKey) -> Arc<Mutex<()>> {
        // 注册表只存放句柄,中毒后内容仍然有效
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        registry
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// 持有全部键的锁执行 f
    pub fn with_locked<R, F>(&self, keys: &[LockKey], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let mut ordered: Vec<LockKey> = keys.to_vec();
        ordered.sort();
        ordered.dedup();

        let handles: Vec<Arc<Mutex<()>>> = ordered.iter().map(|k| self.handle(k)).collect();
        let mut guards = Vec::with_capacity(handles.len());
        for handle in &handles {
            guards.push(handle.lock().unwrap_or_else(|e| e.into_inner()));
        }
        tracing::trace!(
            "聚合锁已获取: {}",
            ordered.iter().map(|k| k.to_string()).collect::<Vec<_>>().join(",")
        );

        let result = f();
        drop(guards);
        drop(handles);
        self.release(&ordered);
        result
    }

    // 句柄只在注册表锁内克隆,计数为 1 时没有其他线程持有或等待
    fn release(&self, keys: &[LockKey]) {
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        for key in keys {
            if registry.get(key).is_some_and(|h| Arc::strong_count(h) == 1) {
                registry.remove(key);
            }
        }
    }

    /// 当前登记的键数量 (仅含正在使用的键)
    pub fn len(&self) -> usize {
        self.registry.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
