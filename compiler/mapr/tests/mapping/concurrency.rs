use mapr::{MapKind, Mapper, MappingContext, Value};
use pretty_assertions::assert_eq;
use rayon::prelude::*;

use crate::common::{get, node, nodes, order, orders, set};

#[test]
fn concurrent_first_use_builds_consistent_transforms() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    let source = order(&mapper, &ids, &[("A-1", 1), ("B-2", 2), ("C-3", 3)]);

    let results: Vec<Value> = (0..64)
        .into_par_iter()
        .map(|_| mapper.map(&source, ids.order_dto).unwrap())
        .collect();

    let expected = mapper.map(&source, ids.order_dto).unwrap();
    assert!(results.iter().all(|r| r.deep_eq(&expected)));
    let plan = mapper
        .transform(ids.order, ids.order_dto, MapKind::ConstructNew)
        .unwrap();
    assert!(plan.plan().is_some());
}

#[test]
fn contexts_are_not_shared_between_calls() {
    let mapper = Mapper::builder().max_depth(2).build();
    let (node_ty, dto_ty) = nodes(&mapper);

    let truncations: Vec<usize> = (0..16)
        .into_par_iter()
        .map(|i| {
            let a = node(&mapper, node_ty, &format!("a{i}"));
            let b = node(&mapper, node_ty, &format!("b{i}"));
            set(&mapper, &a, "Next", Value::Object(b.clone()));
            set(&mapper, &b, "Next", Value::Object(a.clone()));

            let mut cx = MappingContext::new();
            let d = mapper.map_with(&Value::Object(a), dto_ty, &mut cx).unwrap();
            assert_eq!(
                get(&mapper, &d, "Name").as_str().map(str::to_owned),
                Some(format!("a{i}"))
            );
            cx.truncations().len()
        })
        .collect();

    assert!(truncations.iter().all(|&n| n == 1));
}

#[test]
fn reconfiguration_during_use_never_caches_stale_plans() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    let source = order(&mapper, &ids, &[("A-1", 1)]);

    rayon::scope(|s| {
        s.spawn(|_| {
            for _ in 0..32 {
                mapper.map(&source, ids.order_dto).unwrap();
            }
        });
        s.spawn(|_| {
            mapper
                .configure(ids.order, ids.order_dto)
                .map_from("Notes", "Customer.Name")
                .register()
                .unwrap();
        });
    });

    let dto = mapper.map(&source, ids.order_dto).unwrap();
    assert_eq!(get(&mapper, &dto, "Notes").as_str(), Some("Ada"));
}
