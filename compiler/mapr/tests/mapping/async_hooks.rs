use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mapr::{MapError, Mapper, TypeId, Value};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use crate::common::{get, order, orders, set};

fn people(mapper: &Mapper) -> (TypeId, TypeId) {
    let pool = mapper.pool();
    let person = pool.record("Person").field("Name", TypeId::STR).build().unwrap();
    let person_dto = pool.record("PersonDto").field("Name", TypeId::STR).build().unwrap();
    (person, person_dto)
}

fn person(mapper: &Mapper, ty: TypeId, name: &str) -> Value {
    let p = mapper.pool().new_object(ty).unwrap();
    set(mapper, &p, "Name", Value::from(name));
    Value::Object(p)
}

#[tokio::test]
async fn async_hook_effects_are_visible_after_the_call() {
    let mapper = Mapper::new();
    let (person_ty, dto_ty) = people(&mapper);
    let name = mapper.pool().field_index(dto_ty, "Name").unwrap();
    let seen_mid_flight = Arc::new(Mutex::new(None));
    let seen = Arc::clone(&seen_mid_flight);
    mapper
        .configure(person_ty, dto_ty)
        .after_map(move |_, dest| {
            *seen.lock() = dest.get(name).as_str().map(str::to_owned);
            Ok(())
        })
        .after_map_async(move |_, dest| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            dest.set(name, Value::from("bar"));
            Ok::<(), MapError>(())
        })
        .register()
        .unwrap();

    let dto = mapper
        .map_async(&person(&mapper, person_ty, "foo"), dto_ty)
        .await
        .unwrap();
    assert_eq!(seen_mid_flight.lock().as_deref(), Some("foo"));
    assert_eq!(get(&mapper, &dto, "Name").as_str(), Some("bar"));
}

#[test]
fn async_hook_through_sync_entry_point_fails() {
    let mapper = Mapper::new();
    let (person_ty, dto_ty) = people(&mapper);
    mapper
        .configure(person_ty, dto_ty)
        .after_map_async(|_, _| async { Ok::<(), MapError>(()) })
        .register()
        .unwrap();

    let err = mapper.map(&person(&mapper, person_ty, "foo"), dto_ty).unwrap_err();
    assert!(err.is_async_usage());
    assert!(err.to_string().contains("Person -> PersonDto"));
    assert!(err.to_string().contains("map_async"));
}

#[tokio::test]
async fn async_failure_fails_the_call() {
    let mapper = Mapper::new();
    let (person_ty, dto_ty) = people(&mapper);
    mapper
        .configure(person_ty, dto_ty)
        .after_map_async(|_, _| async { Err::<(), MapError>(MapError::hook("remote lookup failed")) })
        .register()
        .unwrap();

    let err = mapper
        .map_async(&person(&mapper, person_ty, "foo"), dto_ty)
        .await
        .unwrap_err();
    assert_eq!(err, MapError::hook("remote lookup failed"));
}

#[tokio::test]
async fn nested_async_hooks_all_complete() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    let done = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&done);
    mapper
        .configure(ids.line, ids.line_dto)
        .after_map_async(move |_, _| {
            let counter = Arc::clone(&counter);
            async move {
                tokio::task::yield_now().await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), MapError>(())
            }
        })
        .register()
        .unwrap();

    let source = order(&mapper, &ids, &[("A-1", 1), ("B-2", 2), ("C-3", 3)]);
    let dto = mapper.map_async(&source, ids.order_dto).await.unwrap();
    assert_eq!(done.load(Ordering::SeqCst), 3);
    assert_eq!(get(&mapper, &dto, "Lines").as_seq().map(|s| s.len()), Some(3));
}

#[tokio::test]
async fn mappings_without_async_hooks_work_through_map_async() {
    let mapper = Mapper::new();
    let (person_ty, dto_ty) = people(&mapper);
    let dto = mapper
        .map_async(&person(&mapper, person_ty, "foo"), dto_ty)
        .await
        .unwrap();
    assert_eq!(get(&mapper, &dto, "Name").as_str(), Some("foo"));
}
