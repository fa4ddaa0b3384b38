// ==========================================
// 仓库履约分配系统 - 地点目录
// ==========================================
// 职责: 地点参考数据 (最大仓库数、单仓最大容量)
// 约束: 进程启动时构造一次,之后只读,以引用传递给使用方
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// Location - 地点
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub identifier: String,        // 地点标识
    pub max_warehouse_count: u32,  // 最大活跃仓库数
    pub max_capacity: u32,         // 单仓最大容量
}

impl Location {
    pub fn new(identifier: &str, max_warehouse_count: u32, max_capacity: u32) -> Self {
        Self {
            identifier: identifier.to_string(),
            max_warehouse_count,
            max_capacity,
        }
    }
}

// ==========================================
// Trait: LocationResolver
// ==========================================
// 用途: 生命周期引擎按标识解析地点,纯查询无副作用
pub trait LocationResolver: Send + Sync {
    /// 按标识解析地点,未知或空白标识返回 None
    fn resolve(&self, identifier: &str) -> Option<Location>;
}

// ==========================================
// LocationDirectory - 不可变地点目录
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct LocationDirectory {
    locations: HashMap<String, Location>,
}

impl LocationDirectory {
    /// 从地点列表构造目录,重复标识以后者为准
    pub fn from_locations<I>(locations: I) -> Self
    where
        I: IntoIterator<Item = Location>,
    {
        let locations = locations
            .into_iter()
            .map(|loc| (loc.identifier.clone(), loc))
            .collect();
        Self { locations }
    }

    /// 标准地点数据集
    pub fn standard() -> Self {
        Self::from_locations([
            Location::new("ZWOLLE-001", 1, 40),
            Location::new("ZWOLLE-002", 2, 50),
            Location::new("AMSTERDAM-001", 5, 100),
            Location::new("AMSTERDAM-002", 3, 75),
            Location::new("TILBURG-001", 1, 40),
            Location::new("HELMOND-001", 1, 45),
            Location::new("EINDHOVEN-001", 2, 70),
            Location::new("VETSBY-001", 1, 90),
        ])
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// 按标识排序的地点列表
    pub fn all(&self) -> Vec<&Location> {
        let mut all: Vec<&Location> = self.locations.values().collect();
        all.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        all
    }
}

impl LocationResolver for LocationDirectory {
    fn resolve(&self, identifier: &str) -> Option<Location> {
        let key = identifier.trim();
        if key.is_empty() {
            return None;
        }
        self.locations.get(key).cloned()
    }
}
