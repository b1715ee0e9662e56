use mapr::{MapKind, Mapper, ObjectRef, TypeId, Value};
use pretty_assertions::assert_eq;

use crate::common::{get, order, orders, set};

#[test]
fn mapping_twice_yields_equal_results() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    let source = order(&mapper, &ids, &[("A-1", 1), ("B-2", 2)]);

    let first = mapper.map(&source, ids.order_dto).unwrap();
    let cached = mapper.cached_transforms();
    let second = mapper.map(&source, ids.order_dto).unwrap();

    assert!(first.deep_eq(&second));
    assert!(!ObjectRef::ptr_eq(first.as_object().unwrap(), second.as_object().unwrap()));
    assert_eq!(mapper.cached_transforms(), cached);
}

#[test]
fn flattens_paths_and_methods() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    let source = order(&mapper, &ids, &[("A-1", 1), ("B-2", 2)]);

    let dto = mapper.map(&source, ids.order_dto).unwrap();
    assert!(matches!(get(&mapper, &dto, "Id"), Value::I64(7)));
    assert_eq!(get(&mapper, &dto, "CustomerName").as_str(), Some("Ada"));
    assert_eq!(get(&mapper, &dto, "CustomerAddressCity").as_str(), Some("Oslo"));
    assert_eq!(get(&mapper, &dto, "Total").as_f64(), Some(150.0));
    // No source for Notes: left at its default.
    assert!(get(&mapper, &dto, "Notes").is_null());
}

#[test]
fn flattens_one_level_path() {
    let mapper = Mapper::new();
    let pool = mapper.pool();
    let address = pool.record("Address").field("City", TypeId::STR).build().unwrap();
    let person = pool.record("Person").field("Address", address).build().unwrap();
    let person_dto = pool.record("PersonDto").field("AddressCity", TypeId::STR).build().unwrap();

    let home = pool.new_object(address).unwrap();
    set(&mapper, &home, "City", Value::from("X"));
    let source = pool.new_object(person).unwrap();
    set(&mapper, &source, "Address", Value::Object(home));

    let dto = mapper.map(&Value::Object(source), person_dto).unwrap();
    assert_eq!(get(&mapper, &dto, "AddressCity").as_str(), Some("X"));
}

#[test]
fn null_intermediate_leaves_flattened_member_default() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    let source = order(&mapper, &ids, &[]);
    set(&mapper, source.as_object().unwrap(), "Customer", Value::Null);

    let dto = mapper.map(&source, ids.order_dto).unwrap();
    assert!(get(&mapper, &dto, "CustomerName").is_null());
    assert!(get(&mapper, &dto, "CustomerAddressCity").is_null());
}

#[test]
fn same_type_builds_a_copy_by_default() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    let source = order(&mapper, &ids, &[("A-1", 1)]);

    let copy = mapper.map(&source, ids.order).unwrap();
    assert!(copy.deep_eq(&source));
    assert!(!ObjectRef::ptr_eq(copy.as_object().unwrap(), source.as_object().unwrap()));
    // Nested records are copied too.
    let (a, b) = (get(&mapper, &copy, "Customer"), get(&mapper, &source, "Customer"));
    assert!(!ObjectRef::ptr_eq(a.as_object().unwrap(), b.as_object().unwrap()));
}

#[test]
fn same_type_passes_through_without_new_instances() {
    let mapper = Mapper::builder().new_instance_for_same_type(false).build();
    let ids = orders(&mapper);
    let source = order(&mapper, &ids, &[("A-1", 1)]);

    let same = mapper.map(&source, ids.order).unwrap();
    assert!(ObjectRef::ptr_eq(same.as_object().unwrap(), source.as_object().unwrap()));
}

#[test]
fn null_source_maps_to_null_or_default() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    assert!(mapper.map(&Value::Null, ids.order_dto).unwrap().is_null());
    assert!(matches!(mapper.map(&Value::Null, TypeId::I32).unwrap(), Value::I32(0)));
    let nullable = mapper.pool().nullable(TypeId::I32);
    assert!(mapper.map(&Value::Null, nullable).unwrap().is_null());
}

#[test]
fn scalars_convert_directly() {
    let mapper = Mapper::new();
    assert!(matches!(mapper.map(&Value::from(42), TypeId::I64).unwrap(), Value::I64(42)));
    assert_eq!(mapper.map(&Value::from(42), TypeId::STR).unwrap().as_str(), Some("42"));
    assert!(matches!(mapper.map(&Value::from("17"), TypeId::I32).unwrap(), Value::I32(17)));

    let err = mapper.map(&Value::from("seventeen"), TypeId::I32).unwrap_err();
    assert!(err.is_conversion());
}

#[test]
fn conversion_failure_aborts_the_whole_mapping() {
    let mapper = Mapper::new();
    let pool = mapper.pool();
    let raw = pool.record("Raw").field("Count", TypeId::STR).build().unwrap();
    let parsed = pool.record("Parsed").field("Count", TypeId::I32).build().unwrap();
    let source = pool.new_object(raw).unwrap();
    set(&mapper, &source, "Count", Value::from("many"));

    let err = mapper.map(&Value::Object(source), parsed).unwrap_err();
    assert!(err.is_conversion());
}

#[test]
fn unmapped_member_is_an_error_in_strict_mode() {
    let mapper = Mapper::builder().require_destination_member_source(true).build();
    let ids = orders(&mapper);
    let err = mapper
        .transform(ids.order, ids.order_dto, MapKind::ConstructNew)
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("Notes"));
}

#[test]
fn planning_errors_surface_before_execution() {
    let mapper = Mapper::new();
    let pool = mapper.pool();
    let point = pool
        .record("Point")
        .readonly_field("X", TypeId::I32)
        .readonly_field("Y", TypeId::I32)
        .constructor(&["X", "Y"])
        .build()
        .unwrap();
    let only_x = pool.record("OnlyX").field("X", TypeId::I32).build().unwrap();
    let source = pool.new_object(only_x).unwrap();

    let err = mapper.map(&Value::Object(source), point).unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("`Y`"));
}

#[test]
fn constructor_parameters_are_bound_by_name() {
    let mapper = Mapper::new();
    let pool = mapper.pool();
    let raw = pool
        .record("RawPoint")
        .field("x", TypeId::I64)
        .field("y", TypeId::I64)
        .build()
        .unwrap();
    let point = pool
        .record("Point")
        .readonly_field("X", TypeId::I32)
        .readonly_field("Y", TypeId::I32)
        .constructor(&["X", "Y"])
        .build()
        .unwrap();
    let source = pool.new_object(raw).unwrap();
    set(&mapper, &source, "x", Value::I64(3));
    set(&mapper, &source, "y", Value::I64(4));

    let built = mapper.map(&Value::Object(source), point).unwrap();
    assert!(matches!(get(&mapper, &built, "X"), Value::I32(3)));
    assert!(matches!(get(&mapper, &built, "Y"), Value::I32(4)));
}
