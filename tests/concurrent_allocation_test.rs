// ==========================================
// 并发控制测试
// ==========================================
// 职责: 验证并发请求不会使聚合计数越过上限
// ==========================================


#[cfg(test)]
mod concurrent_allocation_test {
    use fulfilment_allocation::api::{FulfilmentRequest, WarehouseRequest};
    use fulfilment_allocation::engine::{ConflictKind, EngineError};
    use std::sync::{Arc, Barrier};
    use std::thread;

    use crate::test_helpers::{create_test_state, seed_catalog};

    fn count_outcomes<T>(results: &[Result<T, EngineError>], kind: ConflictKind) -> (usize, usize) {
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(e) if e.is_conflict(kind)))
            .count();
        (ok, rejected)
    }

    // ==========================================
    // 测试1: 同一地点并发新建
    // ==========================================

    #[test]
    fn test_concurrent_create_respects_location_ceiling() {
        let (_tmp, state) = create_test_state();
        let api = state.warehouse_api.clone();

        // AMSTERDAM-001 最多 5 个活跃仓库
        let n = 12;
        let barrier = Arc::new(Barrier::new(n));
        let handles: Vec<_> = (0..n)
            .map(|i| {
                let api = api.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    api.create_warehouse(WarehouseRequest::new(
                        &format!("MWH.{:03}", i),
                        "AMSTERDAM-001",
                        50,
                        10,
                    ))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let (ok, rejected) = count_outcomes(&results, ConflictKind::LocationFull);
        assert_eq!(ok, 5);
        assert_eq!(rejected, n - 5);
        assert_eq!(api.list_active_warehouses().unwrap().len(), 5);
    }

    #[test]
    fn test_concurrent_create_below_ceiling_all_succeed() {
        let (_tmp, state) = create_test_state();
        let api = state.warehouse_api.clone();

        // 请求数不超过上限时全部成功
        let n = 3;
        let barrier = Arc::new(Barrier::new(n));
        let handles: Vec<_> = (0..n)
            .map(|i| {
                let api = api.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    api.create_warehouse(WarehouseRequest::new(
                        &format!("MWH.{:03}", i),
                        "AMSTERDAM-001",
                        50,
                        10,
                    ))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let (ok, rejected) = count_outcomes(&results, ConflictKind::LocationFull);
        assert_eq!(ok, n);
        assert_eq!(rejected, 0);
        assert_eq!(api.list_active_warehouses().unwrap().len(), n);
    }

    // ==========================================
    // 测试2: 同一代码并发新建
    // ==========================================

    #[test]
    fn test_concurrent_create_same_code() {
        let (_tmp, state) = create_test_state();
        let api = state.warehouse_api.clone();

        let n = 8;
        let barrier = Arc::new(Barrier::new(n));
        let locations = ["AMSTERDAM-001", "AMSTERDAM-002", "EINDHOVEN-001", "ZWOLLE-002"];
        let handles: Vec<_> = (0..n)
            .map(|i| {
                let api = api.clone();
                let barrier = barrier.clone();
                let location = locations[i % locations.len()];
                thread::spawn(move || {
                    barrier.wait();
                    api.create_warehouse(WarehouseRequest::new("MWH.SHARED", location, 40, 0))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let (ok, rejected) = count_outcomes(&results, ConflictKind::DuplicateActiveCode);
        assert_eq!(ok, 1);
        assert_eq!(rejected, n - 1);
    }

    // ==========================================
    // 测试3: 并发替换同一代码
    // ==========================================

    #[test]
    fn test_concurrent_replace_keeps_single_active_row() {
        let (_tmp, state) = create_test_state();
        let api = state.warehouse_api.clone();
        api.create_warehouse(WarehouseRequest::new("MWH.001", "AMSTERDAM-001", 50, 10))
            .unwrap();

        let n = 6;
        let barrier = Arc::new(Barrier::new(n));
        let handles: Vec<_> = (0..n)
            .map(|i| {
                let api = api.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    api.replace_warehouse(
                        "MWH.001",
                        WarehouseRequest::new("MWH.001", "AMSTERDAM-001", 50 + i as i64, 10),
                    )
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap().unwrap();
        }
        let history = api.warehouse_history("MWH.001").unwrap();
        assert_eq!(history.len(), n + 1);
        assert_eq!(history.iter().filter(|w| w.archived_at.is_none()).count(), 1);
    }

    // ==========================================
    // 测试4: 同一门店并发分配
    // ==========================================

    #[test]
    fn test_concurrent_fulfilment_respects_store_limit() {
        let (_tmp, state) = create_test_state();
        let (products, stores) = seed_catalog(&state, 8, 1);
        let warehouses: Vec<i64> = (1..=5)
            .map(|i| {
                state
                    .warehouse_api
                    .create_warehouse(WarehouseRequest::new(&format!("MWH.{:03}", i), "AMSTERDAM-001", 40, 0))
                    .unwrap()
                    .id
                    .unwrap()
            })
            .collect();
        let api = state.fulfilment_api.clone();
        let store = stores[0];

        // 每个请求使用不同产品与不同仓库,只有规则 2 会拒绝
        let n = warehouses.len();
        let barrier = Arc::new(Barrier::new(n));
        let handles: Vec<_> = (0..n)
            .map(|i| {
                let api = api.clone();
                let barrier = barrier.clone();
                let req = FulfilmentRequest {
                    product_id: products[i],
                    warehouse_id: warehouses[i],
                    store_id: store,
                };
                thread::spawn(move || {
                    barrier.wait();
                    api.add_fulfilment(req)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let (ok, rejected) = count_outcomes(&results, ConflictKind::StoreWarehouseLimitExceeded);
        assert_eq!(ok, 3);
        assert_eq!(rejected, n - 3);
        assert_eq!(api.list_store_fulfilments(store).unwrap().len(), 3);
    }

    // ==========================================
    // 测试5: 同一产品-门店并发分配
    // ==========================================

    #[test]
    fn test_concurrent_fulfilment_respects_product_limit() {
        let (_tmp, state) = create_test_state();
        let (products, stores) = seed_catalog(&state, 1, 1);
        let warehouses: Vec<i64> = (1..=3)
            .map(|i| {
                state
                    .warehouse_api
                    .create_warehouse(WarehouseRequest::new(&format!("MWH.{:03}", i), "AMSTERDAM-001", 40, 0))
                    .unwrap()
                    .id
                    .unwrap()
            })
            .collect();
        let api = state.fulfilment_api.clone();

        let barrier = Arc::new(Barrier::new(warehouses.len()));
        let handles: Vec<_> = warehouses
            .iter()
            .map(|&warehouse_id| {
                let api = api.clone();
                let barrier = barrier.clone();
                let req = FulfilmentRequest {
                    product_id: products[0],
                    warehouse_id,
                    store_id: stores[0],
                };
                thread::spawn(move || {
                    barrier.wait();
                    api.add_fulfilment(req)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let (ok, rejected) = count_outcomes(&results, ConflictKind::ProductWarehouseLimitExceeded);
        assert_eq!(ok, 2);
        assert_eq!(rejected, 1);
    }
}
