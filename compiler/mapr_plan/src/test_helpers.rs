//! Test helpers for planner and projection unit tests.
//!
//! `Fixture` bundles everything a `Planner` borrows, and `orders` registers
//! a small order/customer schema used across the tests. `MockScope` stands in
//! for the executor when a resolver or custom converter is called directly.

#![allow(clippy::unwrap_used, reason = "test fixtures panic on bad setup")]

use std::collections::HashMap;

use mapr_ir::{MapError, MapKind, MapResult, SharedInterner, TypeId, TypeTuple, Value};
use mapr_types::{Introspector, TypePool};

use crate::{MapScope, MapperConfig, MappingPlan, PairRegistry, Parameter, PendingTask, Planner, RuleSet};

pub struct Fixture {
    pub pool: TypePool,
    pub config: MapperConfig,
    pub pairs: PairRegistry,
    pub rules: RuleSet,
    pub introspector: Introspector,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(MapperConfig::default())
    }

    pub fn with_config(config: MapperConfig) -> Self {
        Self {
            pool: TypePool::new(SharedInterner::new()),
            introspector: Introspector::new(config.include_private_members),
            config,
            pairs: PairRegistry::new(),
            rules: RuleSet::builtin(),
        }
    }

    pub fn planner(&self) -> Planner<'_> {
        Planner::new(&self.pool, &self.config, &self.pairs, &self.rules, &self.introspector)
    }

    pub fn plan(&self, source: TypeId, dest: TypeId) -> MappingPlan {
        self.planner()
            .plan(TypeTuple::new(source, dest), MapKind::ConstructNew)
            .unwrap()
    }

    pub fn field(&self, ty: TypeId, name: &str) -> usize {
        self.pool.field_index(ty, name).unwrap()
    }
}

/// Ids of the order schema.
pub struct Orders {
    pub address: TypeId,
    pub customer: TypeId,
    pub line: TypeId,
    pub order: TypeId,
    pub line_dto: TypeId,
    pub order_dto: TypeId,
}

/// ```text
/// Address  { City: str, Street: str }
/// Customer { Name: str, Address: Address }
/// Line     { Sku: str, Qty: i32 }
/// Order    { Id: i32, Customer: Customer, Lines: List<Line>, GetTotal(): f64 }
/// LineDto  { Sku: str, Qty: i64 }
/// OrderDto { Id: i64, CustomerName: str, CustomerAddressCity: str,
///            Total: f64, Lines: [LineDto], Notes: str }
/// ```
pub fn orders(pool: &TypePool) -> Orders {
    let address = pool
        .record("Address")
        .field("City", TypeId::STR)
        .field("Street", TypeId::STR)
        .build()
        .unwrap();
    let customer = pool
        .record("Customer")
        .field("Name", TypeId::STR)
        .field("Address", address)
        .build()
        .unwrap();
    let line = pool
        .record("Line")
        .field("Sku", TypeId::STR)
        .field("Qty", TypeId::I32)
        .build()
        .unwrap();
    let order = pool
        .record("Order")
        .field("Id", TypeId::I32)
        .field("Customer", customer)
        .field("Lines", pool.list(line))
        .method("GetTotal", TypeId::F64, |_| Value::F64(150.0))
        .build()
        .unwrap();
    let line_dto = pool
        .record("LineDto")
        .field("Sku", TypeId::STR)
        .field("Qty", TypeId::I64)
        .build()
        .unwrap();
    let order_dto = pool
        .record("OrderDto")
        .field("Id", TypeId::I64)
        .field("CustomerName", TypeId::STR)
        .field("CustomerAddressCity", TypeId::STR)
        .field("Total", TypeId::F64)
        .field("Lines", pool.array(line_dto))
        .field("Notes", TypeId::STR)
        .build()
        .unwrap();
    Orders {
        address,
        customer,
        line,
        order,
        line_dto,
        order_dto,
    }
}

/// Build an `Order` instance with two lines.
pub fn sample_order(pool: &TypePool, ids: &Orders) -> Value {
    let address = pool.new_object(ids.address).unwrap();
    address.set(0, Value::from("Oslo"));
    address.set(1, Value::from("Storgata 1"));
    let customer = pool.new_object(ids.customer).unwrap();
    customer.set(0, Value::from("Ada"));
    customer.set(1, Value::Object(address));
    let lines = ["A-1", "B-2"]
        .iter()
        .enumerate()
        .map(|(i, sku)| {
            let line = pool.new_object(ids.line).unwrap();
            line.set(0, Value::from(*sku));
            line.set(1, Value::I32(i32::try_from(i).unwrap() + 1));
            Value::Object(line)
        })
        .collect();
    let order = pool.new_object(ids.order).unwrap();
    order.set(0, Value::I32(7));
    order.set(1, Value::Object(customer));
    order.set(2, Value::seq(pool.list(ids.line), lines));
    Value::Object(order)
}

/// Scope that answers parameters from a map and records enqueued tasks.
pub struct MockScope {
    pub parameters: HashMap<String, Parameter>,
    pub pending: Option<Vec<PendingTask>>,
}

impl MockScope {
    pub fn new() -> Self {
        Self {
            parameters: HashMap::new(),
            pending: None,
        }
    }
}

impl MapScope for MockScope {
    fn map_value(&mut self, value: &Value, _dest: TypeId) -> MapResult<Value> {
        Ok(value.clone())
    }

    fn parameter(&self, name: &str) -> Option<Parameter> {
        self.parameters.get(name).cloned()
    }

    fn enqueue(&mut self, task: PendingTask) -> MapResult<()> {
        match &mut self.pending {
            Some(pending) => {
                pending.push(task);
                Ok(())
            }
            None => Err(MapError::async_usage("mock")),
        }
    }
}
