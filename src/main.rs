// ==========================================
// 仓库履约分配系统 - 命令行入口
// ==========================================
// 用法: fulfilment-allocation [db_path]
// 输出: 地点目录与活跃仓库概要 (JSON)
// ==========================================

use anyhow::{anyhow, Context};
use fulfilment_allocation::app::{get_default_db_path, AppState};
use fulfilment_allocation::{logging, APP_NAME, VERSION};

fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", APP_NAME);
    tracing::info!("系统版本: {}", VERSION);
    tracing::info!("==================================================");

    let db_path = std::env::args()
        .nth(1)
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    let locations = state.warehouse_api.list_locations();
    let warehouses = state
        .warehouse_api
        .list_active_warehouses()
        .context("查询活跃仓库失败")?;
    tracing::info!(
        "地点数={}, 活跃仓库数={}",
        locations.len(),
        warehouses.len()
    );

    let summary = serde_json::json!({
        "version": VERSION,
        "policy": state.policy,
        "locations": locations,
        "activeWarehouses": warehouses,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
