//! Shared schemas and instance builders.

use mapr::{Mapper, ObjectRef, TypeId, Value};

pub struct Orders {
    pub address: TypeId,
    pub customer: TypeId,
    pub line: TypeId,
    pub order: TypeId,
    pub address_dto: TypeId,
    pub line_dto: TypeId,
    pub order_dto: TypeId,
}

/// ```text
/// Address  { City: str, Street: str }
/// Customer { Name: str, Address: Address }
/// Line     { Sku: str, Qty: i32 }
/// Order    { Id: i32, Customer: Customer, Lines: List<Line>, GetTotal(): f64 }
/// AddressDto { City: str }
/// LineDto  { Sku: str, Qty: i64 }
/// OrderDto { Id: i64, CustomerName: str, CustomerAddressCity: str,
///            Total: f64, Lines: [LineDto], Notes: str }
/// ```
///
/// `GetTotal` sums `Qty * 50` over the lines.
pub fn orders(mapper: &Mapper) -> Orders {
    let pool = mapper.pool();
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
        .method("GetTotal", TypeId::F64, |order| {
            let total: i32 = order
                .get(2)
                .as_seq()
                .map(|lines| {
                    lines
                        .iter()
                        .filter_map(|l| match l.as_object()?.get(1) {
                            Value::I32(qty) => Some(qty),
                            _ => None,
                        })
                        .sum()
                })
                .unwrap_or(0);
            Value::F64(f64::from(total) * 50.0)
        })
        .build()
        .unwrap();
    let address_dto = pool
        .record("AddressDto")
        .field("City", TypeId::STR)
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
        address_dto,
        line_dto,
        order_dto,
    }
}

pub fn address(mapper: &Mapper, ids: &Orders, city: &str) -> ObjectRef {
    let address = mapper.pool().new_object(ids.address).unwrap();
    set(mapper, &address, "City", Value::from(city));
    set(mapper, &address, "Street", Value::from("Storgata 1"));
    address
}

pub fn line(mapper: &Mapper, ids: &Orders, sku: &str, qty: i32) -> Value {
    let line = mapper.pool().new_object(ids.line).unwrap();
    set(mapper, &line, "Sku", Value::from(sku));
    set(mapper, &line, "Qty", Value::from(qty));
    Value::Object(line)
}

/// Order 7 for "Ada" in Oslo with the given `(sku, qty)` lines.
pub fn order(mapper: &Mapper, ids: &Orders, lines: &[(&str, i32)]) -> Value {
    let pool = mapper.pool();
    let customer = pool.new_object(ids.customer).unwrap();
    set(mapper, &customer, "Name", Value::from("Ada"));
    set(mapper, &customer, "Address", Value::Object(address(mapper, ids, "Oslo")));

    let lines = lines
        .iter()
        .map(|&(sku, qty)| line(mapper, ids, sku, qty))
        .collect();
    let order = pool.new_object(ids.order).unwrap();
    set(mapper, &order, "Id", Value::from(7));
    set(mapper, &order, "Customer", Value::Object(customer));
    set(mapper, &order, "Lines", Value::seq(pool.list(ids.line), lines));
    Value::Object(order)
}

pub fn set(mapper: &Mapper, obj: &ObjectRef, name: &str, value: Value) {
    let index = mapper.pool().field_index(obj.ty(), name).unwrap();
    assert!(obj.set(index, value));
}

/// Field `name` of the record held by `value`.
pub fn get(mapper: &Mapper, value: &Value, name: &str) -> Value {
    let obj = value.as_object().unwrap();
    let index = mapper.pool().field_index(obj.ty(), name).unwrap();
    obj.get(index)
}

/// `Node { Name: str, Next: Node }` and `NodeDto` of the same shape.
pub fn nodes(mapper: &Mapper) -> (TypeId, TypeId) {
    let pool = mapper.pool();
    let node = pool.record("Node");
    let node_id = node.id();
    let node = node
        .field("Name", TypeId::STR)
        .field("Next", node_id)
        .build()
        .unwrap();
    let dto = pool.record("NodeDto");
    let dto_id = dto.id();
    let dto = dto
        .field("Name", TypeId::STR)
        .field("Next", dto_id)
        .build()
        .unwrap();
    (node, dto)
}

pub fn node(mapper: &Mapper, ty: TypeId, name: &str) -> ObjectRef {
    let node = mapper.pool().new_object(ty).unwrap();
    set(mapper, &node, "Name", Value::from(name));
    node
}
