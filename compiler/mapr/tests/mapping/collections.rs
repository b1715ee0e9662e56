use mapr::{Mapper, ObjectRef, TypeId, Value};
use pretty_assertions::assert_eq;

use crate::common::{get, line, order, orders, set};

#[test]
fn adapts_each_element_in_order() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    let source = order(&mapper, &ids, &[("A-1", 1), ("B-2", 2), ("C-3", 3)]);

    let dto = mapper.map(&source, ids.order_dto).unwrap();
    let lines = get(&mapper, &dto, "Lines");
    let lines = lines.as_seq().unwrap();
    assert_eq!(lines.ty, mapper.pool().array(ids.line_dto));
    assert_eq!(lines.len(), 3);

    let skus: Vec<_> = lines
        .iter()
        .map(|l| get(&mapper, l, "Sku").as_str().map(str::to_owned))
        .collect();
    assert_eq!(
        skus,
        vec![Some("A-1".to_owned()), Some("B-2".to_owned()), Some("C-3".to_owned())]
    );
    let qty: Vec<_> = lines.iter().map(|l| get(&mapper, l, "Qty").as_i64()).collect();
    assert_eq!(qty, vec![Some(1), Some(2), Some(3)]);
    for l in lines.iter() {
        assert!(matches!(get(&mapper, l, "Qty"), Value::I64(_)));
    }

    let (a, b) = (lines.get(0).unwrap(), lines.get(1).unwrap());
    assert!(!ObjectRef::ptr_eq(a.as_object().unwrap(), b.as_object().unwrap()));
}

#[test]
fn null_collection_becomes_empty() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    let source = order(&mapper, &ids, &[]);
    set(&mapper, source.as_object().unwrap(), "Lines", Value::Null);

    let dto = mapper.map(&source, ids.order_dto).unwrap();
    let lines = get(&mapper, &dto, "Lines");
    assert_eq!(lines.as_seq().map(|s| s.len()), Some(0));
}

#[test]
fn null_collection_stays_null_when_allowed() {
    let mapper = Mapper::builder().allow_null_collections(true).build();
    let ids = orders(&mapper);
    let source = order(&mapper, &ids, &[]);
    set(&mapper, source.as_object().unwrap(), "Lines", Value::Null);

    let dto = mapper.map(&source, ids.order_dto).unwrap();
    assert!(get(&mapper, &dto, "Lines").is_null());
}

#[test]
fn null_elements_do_not_fail() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    let pool = mapper.pool();
    let source = Value::seq(
        pool.list(ids.line),
        vec![line(&mapper, &ids, "A-1", 1), Value::Null],
    );

    let mapped = mapper.map(&source, pool.array(ids.line_dto)).unwrap();
    let mapped = mapped.as_seq().unwrap();
    assert_eq!(mapped.len(), 2);
    assert!(mapped.get(1).unwrap().is_null());

    let numbers = Value::seq(pool.list(TypeId::I32), vec![Value::from(5), Value::Null]);
    let widened = mapper.map(&numbers, pool.list(TypeId::I64)).unwrap();
    let items: Vec<_> = widened.as_seq().unwrap().iter().map(Value::as_i64).collect();
    assert_eq!(items, vec![Some(5), Some(0)]);
}

#[test]
fn sets_keep_the_last_duplicate() {
    let mapper = Mapper::new();
    let pool = mapper.pool();
    let source = Value::seq(
        pool.list(TypeId::STR),
        vec![Value::from("1"), Value::from("2"), Value::from("01")],
    );

    let set = mapper.map(&source, pool.set(TypeId::I32)).unwrap();
    let set = set.as_seq().unwrap();
    assert_eq!(set.ty, pool.set(TypeId::I32));
    let items: Vec<_> = set.iter().map(Value::as_i64).collect();
    assert_eq!(items, vec![Some(1), Some(2)]);
}

#[test]
fn dictionaries_convert_keys_and_values() {
    let mapper = Mapper::new();
    let pool = mapper.pool();
    let from = pool.map(TypeId::STR, TypeId::I32);
    let to = pool.map(TypeId::STR, TypeId::I64);
    let source = Value::map(
        from,
        vec![
            (Value::from("a"), Value::from(1)),
            (Value::from("b"), Value::from(2)),
            (Value::from("a"), Value::from(3)),
        ],
    );

    let mapped = mapper.map(&source, to).unwrap();
    let mapped = mapped.as_map().unwrap();
    assert_eq!(mapped.len(), 2);
    assert!(matches!(mapped.get(&Value::from("a")), Some(Value::I64(3))));
    assert!(matches!(mapped.get(&Value::from("b")), Some(Value::I64(2))));
}

#[test]
fn immutable_lists_are_a_destination_shape() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    let pool = mapper.pool();
    let source = Value::seq(pool.list(ids.line), vec![line(&mapper, &ids, "A-1", 4)]);

    let frozen = pool.immutable_list(ids.line_dto);
    let mapped = mapper.map(&source, frozen).unwrap();
    let mapped = mapped.as_seq().unwrap();
    assert_eq!(mapped.ty, frozen);
    assert!(matches!(get(&mapper, mapped.get(0).unwrap(), "Qty"), Value::I64(4)));
}
