//! 订单持久化 (redb)
//!
//! # 表结构
//!
//! | 表 | 键 | 值 | 用途 |
//! |----|----|----|------|
//! | `orders` | 订单 id | JSON 序列化的 Order | 订单主表 |
//! | `branch_counters` | 作用域键 | u64 | 每分店最后已发单号 |
//! | `order_numbers` | (作用域键, 单号) | 订单 id | 单号唯一索引 |
//! | `client_requests` | clientRequestId | 订单 id | 幂等索引 |
//!
//! 无分店订单使用空字符串 `""` 作为计数器作用域, 与任何真实分店互不干扰.
//!
//! # 原子性
//!
//! 创建订单的全部写入 (取号、占号、主表、幂等索引) 在同一个写事务内完成,
//! 事务中途失败则整体回滚, 计数器不会留下烧掉的空号.
//! redb 写事务串行化, 因此并发创建天然拿到连续且不重复的单号.

use std::path::Path;
use std::sync::Arc;

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use shared::Order;
use thiserror::Error;

/// 订单主表: 订单 id -> JSON
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// 单号计数器: 作用域键 -> 最后已发单号
const BRANCH_COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("branch_counters");

/// 单号唯一索引: (作用域键, 单号) -> 订单 id
const ORDER_NUMBERS_TABLE: TableDefinition<(&str, u64), &str> =
    TableDefinition::new("order_numbers");

/// 幂等索引: clientRequestId -> 订单 id
const CLIENT_REQUESTS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("client_requests");

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order number {1} already taken in scope '{0}'")]
    NumberConflict(String, u64),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// 创建操作的结果
#[derive(Debug)]
pub enum CreateOutcome {
    /// 新订单已写入
    Created(Order),
    /// clientRequestId 命中, 返回既有订单, 本次没有任何写入
    Existing(Order),
}

/// redb-backed order store
///
/// `Database` 内部已做并发控制, clone 后可在多个任务间共享.
#[derive(Clone)]
pub struct OrderStore {
    db: Arc<Database>,
}

impl OrderStore {
    /// 打开 (或创建) 数据库文件并初始化表
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        Ok(store)
    }

    /// 内存数据库 (单元测试用)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        Ok(store)
    }

    /// 建表, 保证后续读事务不会因表不存在而失败
    fn init_tables(&self) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(BRANCH_COUNTERS_TABLE)?;
            let _ = write_txn.open_table(ORDER_NUMBERS_TABLE)?;
            let _ = write_txn.open_table(CLIENT_REQUESTS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// 创建订单: 幂等检查、取号、占号、写主表在一个写事务内
    ///
    /// 传入的 `order.order_number` 是占位值, 真实单号由本方法在事务内分配.
    /// clientRequestId 命中时返回 [`CreateOutcome::Existing`] 并放弃事务.
    pub fn create_order(&self, mut order: Order) -> StorageResult<CreateOutcome> {
        let txn = self.db.begin_write()?;

        // 幂等检查与占用同一事务, 关闭"查完再插"的竞态窗口
        if let Some(request_id) = order.client_request_id.as_deref() {
            let existing_id = {
                let requests = txn.open_table(CLIENT_REQUESTS_TABLE)?;
                requests.get(request_id)?.map(|g| g.value().to_string())
            };
            if let Some(existing_id) = existing_id {
                let existing = Self::load_in_txn(&txn, &existing_id)?;
                // 提前返回即放弃事务, 之前没有任何写入
                return Ok(CreateOutcome::Existing(existing));
            }
        }

        let scope = order.branch_id.clone().unwrap_or_default();

        // 读-增-写同事务, 计数器严格单调
        let number = {
            let mut counters = txn.open_table(BRANCH_COUNTERS_TABLE)?;
            let current = counters.get(scope.as_str())?.map(|g| g.value()).unwrap_or(0);
            let next = current + 1;
            counters.insert(scope.as_str(), next)?;
            next
        };

        // 唯一索引兜底: 号已被占说明存量数据异常, 回滚并报冲突
        {
            let mut numbers = txn.open_table(ORDER_NUMBERS_TABLE)?;
            let key = (scope.as_str(), number);
            if numbers.get(key)?.is_some() {
                return Err(StorageError::NumberConflict(scope, number));
            }
            numbers.insert(key, order.id.as_str())?;
        }

        order.order_number = number;

        {
            let mut orders = txn.open_table(ORDERS_TABLE)?;
            let value = serde_json::to_vec(&order)?;
            orders.insert(order.id.as_str(), value.as_slice())?;
        }

        if let Some(request_id) = order.client_request_id.as_deref() {
            let mut requests = txn.open_table(CLIENT_REQUESTS_TABLE)?;
            requests.insert(request_id, order.id.as_str())?;
        }

        txn.commit()?;
        Ok(CreateOutcome::Created(order))
    }

    /// 按 id 取订单
    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(raw) => Ok(Some(serde_json::from_slice(raw.value())?)),
            None => Ok(None),
        }
    }

    /// 读-改-写单个订单, 整体在一个写事务内
    ///
    /// 订单不存在返回 [`StorageError::OrderNotFound`], 事务放弃.
    pub fn update_order<F>(&self, order_id: &str, mutate: F) -> StorageResult<Order>
    where
        F: FnOnce(&mut Order),
    {
        let txn = self.db.begin_write()?;
        let updated = {
            let mut table = txn.open_table(ORDERS_TABLE)?;
            let mut order: Order = match table.get(order_id)? {
                Some(raw) => serde_json::from_slice(raw.value())?,
                None => return Err(StorageError::OrderNotFound(order_id.to_string())),
            };
            mutate(&mut order);
            let value = serde_json::to_vec(&order)?;
            table.insert(order_id, value.as_slice())?;
            order
        };
        txn.commit()?;
        Ok(updated)
    }

    /// 订单列表: 可选分店过滤, 创建时间倒序, 截断到 limit
    pub fn list_orders(
        &self,
        branch_filter: Option<&str>,
        limit: usize,
    ) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for entry in table.iter()? {
            let (_, raw) = entry?;
            let order: Order = serde_json::from_slice(raw.value())?;
            if let Some(branch) = branch_filter {
                if order.branch_id.as_deref() != Some(branch) {
                    continue;
                }
            }
            orders.push(order);
        }

        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders.truncate(limit);
        Ok(orders)
    }

    /// 主表订单数 (测试与诊断)
    pub fn count_orders(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        Ok(table.len()?)
    }

    /// 某作用域当前计数器值 (0 表示还没发过号)
    pub fn current_number(&self, scope: &str) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BRANCH_COUNTERS_TABLE)?;
        Ok(table.get(scope)?.map(|g| g.value()).unwrap_or(0))
    }

    fn load_in_txn(txn: &WriteTransaction, order_id: &str) -> StorageResult<Order> {
        let orders = txn.open_table(ORDERS_TABLE)?;
        match orders.get(order_id)? {
            Some(raw) => Ok(serde_json::from_slice(raw.value())?),
            None => Err(StorageError::OrderNotFound(order_id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use shared::{OrderItem, OrderStatus};

    fn sample_order(branch: Option<&str>, request_id: Option<&str>) -> Order {
        Order {
            id: uuid::Uuid::new_v4().to_string(),
            order_number: 0,
            branch_id: branch.map(str::to_string),
            client_request_id: request_id.map(str::to_string),
            status: OrderStatus::Pending,
            items: vec![OrderItem::new("Latte", 4.5, 2)],
            table: None,
            customer: None,
            customer_id: None,
            waiter: None,
            waiter_user_id: None,
            subtotal: 9.0,
            tax: 0.9,
            discount: 0.0,
            total: 9.9,
            payment_method: None,
            bank_type: None,
            created_at: Utc::now(),
            prepared_at: None,
            paid_at: None,
        }
    }

    fn created(outcome: CreateOutcome) -> Order {
        match outcome {
            CreateOutcome::Created(order) => order,
            CreateOutcome::Existing(order) => panic!("expected Created, got Existing {}", order.id),
        }
    }

    #[test]
    fn test_numbers_are_sequential_per_scope() {
        let store = OrderStore::open_in_memory().unwrap();

        let a1 = created(store.create_order(sample_order(Some("b1"), None)).unwrap());
        let a2 = created(store.create_order(sample_order(Some("b1"), None)).unwrap());
        let b1 = created(store.create_order(sample_order(Some("b2"), None)).unwrap());
        let u1 = created(store.create_order(sample_order(None, None)).unwrap());

        assert_eq!(a1.order_number, 1);
        assert_eq!(a2.order_number, 2);
        assert_eq!(b1.order_number, 1);
        assert_eq!(u1.order_number, 1);
        assert_eq!(store.current_number("b1").unwrap(), 2);
        assert_eq!(store.current_number("").unwrap(), 1);
    }

    #[test]
    fn test_concurrent_creates_get_unique_contiguous_numbers() {
        let store = OrderStore::open_in_memory().unwrap();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                created(store.create_order(sample_order(Some("b1"), None)).unwrap()).order_number
            }));
        }

        let mut numbers: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        numbers.sort_unstable();
        assert_eq!(numbers, (1..=8).collect::<Vec<u64>>());
    }

    #[test]
    fn test_duplicate_client_request_returns_existing() {
        let store = OrderStore::open_in_memory().unwrap();

        let first = created(store.create_order(sample_order(Some("b1"), Some("req-1"))).unwrap());
        let replay = store.create_order(sample_order(Some("b1"), Some("req-1"))).unwrap();

        match replay {
            CreateOutcome::Existing(order) => {
                assert_eq!(order.id, first.id);
                assert_eq!(order.order_number, first.order_number);
            }
            CreateOutcome::Created(order) => panic!("replay created a new order {}", order.id),
        }

        // 只存了一单, 计数器也没有被重放推进
        assert_eq!(store.count_orders().unwrap(), 1);
        assert_eq!(store.current_number("b1").unwrap(), 1);
    }

    #[test]
    fn test_same_request_id_different_scope_is_still_idempotent() {
        // 幂等键是全局的, 不按分店分桶
        let store = OrderStore::open_in_memory().unwrap();

        let first = created(store.create_order(sample_order(Some("b1"), Some("req-x"))).unwrap());
        let replay = store.create_order(sample_order(Some("b2"), Some("req-x"))).unwrap();

        match replay {
            CreateOutcome::Existing(order) => assert_eq!(order.id, first.id),
            CreateOutcome::Created(_) => panic!("idempotency key must be global"),
        }
    }

    #[test]
    fn test_get_order_roundtrip() {
        let store = OrderStore::open_in_memory().unwrap();
        let order = created(store.create_order(sample_order(Some("b1"), None)).unwrap());

        let loaded = store.get_order(&order.id).unwrap().unwrap();
        assert_eq!(loaded, order);

        assert!(store.get_order("missing").unwrap().is_none());
    }

    #[test]
    fn test_update_order_persists_mutation() {
        let store = OrderStore::open_in_memory().unwrap();
        let order = created(store.create_order(sample_order(Some("b1"), None)).unwrap());

        let updated = store
            .update_order(&order.id, |o| {
                o.status = OrderStatus::Accepted;
                o.table = Some("T5".to_string());
            })
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Accepted);

        let reloaded = store.get_order(&order.id).unwrap().unwrap();
        assert_eq!(reloaded.status, OrderStatus::Accepted);
        assert_eq!(reloaded.table.as_deref(), Some("T5"));
    }

    #[test]
    fn test_update_missing_order_errors() {
        let store = OrderStore::open_in_memory().unwrap();
        let result = store.update_order("missing", |o| o.status = OrderStatus::Paid);
        assert!(matches!(result, Err(StorageError::OrderNotFound(_))));
    }

    #[test]
    fn test_list_orders_filters_sorts_and_caps() {
        let store = OrderStore::open_in_memory().unwrap();
        let base = Utc::now();

        for i in 0..3 {
            let mut order = sample_order(Some("b1"), None);
            order.created_at = base + Duration::seconds(i);
            created(store.create_order(order).unwrap());
        }
        let mut other = sample_order(Some("b2"), None);
        other.created_at = base + Duration::seconds(10);
        created(store.create_order(other).unwrap());

        // 过滤 + 倒序
        let b1 = store.list_orders(Some("b1"), 500).unwrap();
        assert_eq!(b1.len(), 3);
        assert!(b1.windows(2).all(|w| w[0].created_at >= w[1].created_at));

        // 不过滤时包含所有分店
        let all = store.list_orders(None, 500).unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].branch_id.as_deref(), Some("b2"));

        // 截断
        let capped = store.list_orders(None, 2).unwrap();
        assert_eq!(capped.len(), 2);
    }

    #[test]
    fn test_unbranched_orders_share_their_own_scope() {
        let store = OrderStore::open_in_memory().unwrap();

        created(store.create_order(sample_order(Some("b1"), None)).unwrap());
        let u1 = created(store.create_order(sample_order(None, None)).unwrap());
        let u2 = created(store.create_order(sample_order(None, None)).unwrap());

        assert_eq!(u1.order_number, 1);
        assert_eq!(u2.order_number, 2);

        // 无分店过滤列表仍返回全部
        let all = store.list_orders(None, 500).unwrap();
        assert_eq!(all.len(), 3);
    }
}
