use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use mapr::{Expr, MapError, MappingContext, Mapper, ObjectRef, TypeId, Value};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use crate::common::{address, get, order, orders, set};

#[test]
fn map_from_renames_a_member() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    mapper
        .configure(ids.order, ids.order_dto)
        .map_from("Notes", "Customer.Address.Street")
        .register()
        .unwrap();

    let dto = mapper.map(&order(&mapper, &ids, &[]), ids.order_dto).unwrap();
    assert_eq!(get(&mapper, &dto, "Notes").as_str(), Some("Storgata 1"));
}

#[test]
fn ignored_members_keep_their_default() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    mapper
        .configure(ids.order, ids.order_dto)
        .ignore("CustomerName")
        .register()
        .unwrap();

    let dto = mapper.map(&order(&mapper, &ids, &[]), ids.order_dto).unwrap();
    assert!(get(&mapper, &dto, "CustomerName").is_null());
    assert_eq!(get(&mapper, &dto, "CustomerAddressCity").as_str(), Some("Oslo"));
}

#[test]
fn resolvers_read_context_parameters() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    mapper
        .configure(ids.order, ids.order_dto)
        .resolve_with("Notes", |_, scope| {
            let tenant = scope
                .parameter("tenant")
                .ok_or_else(|| MapError::hook("no tenant"))?;
            let tenant = tenant
                .downcast_ref::<String>()
                .ok_or_else(|| MapError::hook("tenant is not a string"))?;
            Ok(Value::from(format!("tenant {tenant}").as_str()))
        })
        .register()
        .unwrap();
    let source = order(&mapper, &ids, &[]);

    let mut cx = MappingContext::new().with_parameter("tenant", String::from("acme"));
    let dto = mapper.map_with(&source, ids.order_dto, &mut cx).unwrap();
    assert_eq!(get(&mapper, &dto, "Notes").as_str(), Some("tenant acme"));

    let err = mapper.map(&source, ids.order_dto).unwrap_err();
    assert_eq!(err, MapError::hook("no tenant"));
}

#[test]
fn resolver_values_are_converted_to_the_member_type() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    mapper
        .configure(ids.order, ids.order_dto)
        .resolve_expr("Notes", Expr::literal(42))
        .register()
        .unwrap();

    let dto = mapper.map(&order(&mapper, &ids, &[]), ids.order_dto).unwrap();
    assert_eq!(get(&mapper, &dto, "Notes").as_str(), Some("42"));
}

#[test]
fn conditions_skip_members() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    let id = mapper.pool().field_index(ids.order, "Id").unwrap();
    mapper
        .configure(ids.order, ids.order_dto)
        .condition("Id", move |src| src.get(id).as_i64() != Some(7))
        .register()
        .unwrap();

    let dto = mapper.map(&order(&mapper, &ids, &[]), ids.order_dto).unwrap();
    assert!(matches!(get(&mapper, &dto, "Id"), Value::I64(0)));
}

#[test]
fn expression_conditions_skip_members() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    let customer = Expr::path(mapper.pool(), ids.order, "Customer").unwrap();
    mapper
        .configure(ids.order, ids.order_dto)
        .condition_expr("CustomerName", customer.is_null())
        .register()
        .unwrap();

    let dto = mapper.map(&order(&mapper, &ids, &[]), ids.order_dto).unwrap();
    assert!(get(&mapper, &dto, "CustomerName").is_null());
}

#[test]
fn post_transform_rewrites_the_value() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    mapper
        .configure(ids.order, ids.order_dto)
        .post_transform("CustomerName", |v| {
            Ok(Value::from(v.as_str().unwrap_or_default().to_uppercase().as_str()))
        })
        .register()
        .unwrap();

    let dto = mapper.map(&order(&mapper, &ids, &[]), ids.order_dto).unwrap();
    assert_eq!(get(&mapper, &dto, "CustomerName").as_str(), Some("ADA"));
}

#[test]
fn type_override_changes_the_conversion() {
    let mapper = Mapper::new();
    let pool = mapper.pool();
    let reading = pool.record("Reading").field("Value", TypeId::F64).build().unwrap();
    let report = pool.record("Report").field("Value", TypeId::STR).build().unwrap();
    mapper
        .configure(reading, report)
        .type_override("Value", TypeId::I32)
        .register()
        .unwrap();
    let source = pool.new_object(reading).unwrap();
    set(&mapper, &source, "Value", Value::F64(2.75));

    let dto = mapper.map(&Value::Object(source), report).unwrap();
    // Converted as i32 (truncated), then stored as given.
    assert!(matches!(get(&mapper, &dto, "Value"), Value::I32(2)));
}

#[test]
fn factory_builds_the_destination() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    let dto_ty = ids.order_dto;
    let notes = mapper.pool().field_index(dto_ty, "Notes").unwrap();
    let fields = mapper.pool().record_def(dto_ty).unwrap().fields.len();
    mapper
        .configure(ids.order, ids.order_dto)
        .construct_with(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            let mut values = vec![Value::Null; fields];
            values[notes] = Value::from("from factory");
            Ok(ObjectRef::new(dto_ty, values))
        })
        .register()
        .unwrap();

    let dto = mapper.map(&order(&mapper, &ids, &[]), ids.order_dto).unwrap();
    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert_eq!(get(&mapper, &dto, "Notes").as_str(), Some("from factory"));
    assert_eq!(get(&mapper, &dto, "CustomerName").as_str(), Some("Ada"));
}

#[test]
fn factory_of_the_wrong_type_is_rejected() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    let address_dto = ids.address_dto;
    mapper
        .configure(ids.order, ids.order_dto)
        .construct_with(move |_, _| Ok(ObjectRef::new(address_dto, vec![Value::Null])))
        .register()
        .unwrap();

    let err = mapper
        .map(&order(&mapper, &ids, &[]), ids.order_dto)
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("factory returned AddressDto"));
}

#[test]
fn factory_missing_member_slots_is_rejected() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    let dto_ty = ids.order_dto;
    mapper
        .configure(ids.order, ids.order_dto)
        .construct_with(move |_, _| Ok(ObjectRef::new(dto_ty, Vec::new())))
        .register()
        .unwrap();

    let err = mapper
        .map(&order(&mapper, &ids, &[]), ids.order_dto)
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("has no slot"));
}

#[test]
fn hooks_run_around_member_binding() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    let log = Arc::new(Mutex::new(Vec::new()));
    let name = mapper.pool().field_index(ids.order_dto, "CustomerName").unwrap();
    let (before, after) = (Arc::clone(&log), Arc::clone(&log));
    mapper
        .configure(ids.order, ids.order_dto)
        .before_map(move |_, dest| {
            before.lock().push(format!("before {:?}", dest.get(name).as_str()));
            Ok(())
        })
        .after_map(move |_, dest| {
            after.lock().push(format!("after {:?}", dest.get(name).as_str()));
            Ok(())
        })
        .register()
        .unwrap();

    mapper.map(&order(&mapper, &ids, &[]), ids.order_dto).unwrap();
    assert_eq!(
        *log.lock(),
        vec!["before None".to_owned(), "after Some(\"Ada\")".to_owned()]
    );
}

#[test]
fn failing_hook_fails_the_mapping() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    mapper
        .configure(ids.order, ids.order_dto)
        .after_map(|_, _| Err(MapError::hook("rejected")))
        .register()
        .unwrap();

    let err = mapper.map(&order(&mapper, &ids, &[]), ids.order_dto).unwrap_err();
    assert_eq!(err, MapError::hook("rejected"));
}

#[test]
fn map_into_updates_bound_members_only() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    let existing = mapper.pool().new_object(ids.order_dto).unwrap();
    set(&mapper, &existing, "Notes", Value::from("keep me"));

    let same = mapper.map_into(&order(&mapper, &ids, &[]), &existing).unwrap();
    assert!(ObjectRef::ptr_eq(&same, &existing));
    let dto = Value::Object(existing);
    assert_eq!(get(&mapper, &dto, "Notes").as_str(), Some("keep me"));
    assert_eq!(get(&mapper, &dto, "CustomerName").as_str(), Some("Ada"));
}

#[test]
fn map_into_reuses_nested_instances() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    let pool = mapper.pool();
    let customer_dto = pool
        .record("CustomerDto")
        .field("Name", TypeId::STR)
        .field("Address", ids.address_dto)
        .build()
        .unwrap();
    let source = pool.new_object(ids.customer).unwrap();
    set(&mapper, &source, "Name", Value::from("Ada"));
    set(&mapper, &source, "Address", Value::Object(address(&mapper, &ids, "Bergen")));

    let nested = pool.new_object(ids.address_dto).unwrap();
    let existing = pool.new_object(customer_dto).unwrap();
    set(&mapper, &existing, "Address", Value::Object(nested.clone()));

    mapper.map_into(&Value::Object(source), &existing).unwrap();
    let address = get(&mapper, &Value::Object(existing), "Address");
    assert!(ObjectRef::ptr_eq(address.as_object().unwrap(), &nested));
    assert_eq!(get(&mapper, &address, "City").as_str(), Some("Bergen"));
}

#[test]
fn reconfiguring_a_pair_takes_effect() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    let source = order(&mapper, &ids, &[("A-1", 2)]);
    let before = mapper.map(&source, ids.order_dto).unwrap();
    let lines = get(&mapper, &before, "Lines");
    assert!(matches!(get(&mapper, lines.as_seq().unwrap().get(0).unwrap(), "Qty"), Value::I64(2)));

    mapper.configure(ids.line, ids.line_dto).ignore("Qty").register().unwrap();
    let after = mapper.map(&source, ids.order_dto).unwrap();
    let lines = get(&mapper, &after, "Lines");
    assert!(matches!(get(&mapper, lines.as_seq().unwrap().get(0).unwrap(), "Qty"), Value::I64(0)));
}

#[test]
fn conflicting_directives_are_rejected() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    let err = mapper
        .configure(ids.order, ids.order_dto)
        .ignore("Notes")
        .map_from("Notes", "Customer.Name")
        .register()
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("Notes"));
}
