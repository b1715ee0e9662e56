use mapr::{Expr, MapKind, Mapper, Value};
use pretty_assertions::assert_eq;

use crate::common::{get, order, orders};

#[test]
fn projection_agrees_with_execution() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    let source = order(&mapper, &ids, &[("A-1", 1), ("B-2", 2)]);

    let expr = mapper.projection(ids.order, ids.order_dto).unwrap();
    let projected = expr.evaluate(mapper.pool(), &source).unwrap();
    let mapped = mapper.map(&source, ids.order_dto).unwrap();
    assert!(projected.deep_eq(&mapped));
    assert_eq!(get(&mapper, &projected, "Total").as_f64(), Some(150.0));
}

#[test]
fn projection_renders_as_a_single_expression() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    let rendered = mapper
        .projection(ids.order, ids.order_dto)
        .unwrap()
        .render(mapper.pool());
    assert!(rendered.contains("new OrderDto {"));
    assert!(rendered.contains("src.Customer.Address.City"));
    assert!(rendered.contains("src.GetTotal()"));
    assert!(rendered.contains("select("));
    assert!(!rendered.contains("Notes"));
}

#[test]
fn projection_is_cached_and_refreshed_on_reconfiguration() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    mapper.projection(ids.order, ids.order_dto).unwrap();
    let cached = mapper
        .transform(ids.order, ids.order_dto, MapKind::Projection)
        .unwrap();
    assert!(cached.projection().is_some());

    let street = Expr::path(mapper.pool(), ids.order, "Customer.Address.Street").unwrap();
    mapper
        .configure(ids.order, ids.order_dto)
        .resolve_expr("Notes", street)
        .register()
        .unwrap();
    let rendered = mapper
        .projection(ids.order, ids.order_dto)
        .unwrap()
        .render(mapper.pool());
    assert!(rendered.contains("Notes = (str) src.Customer.Address.Street"));
}

#[test]
fn closure_resolvers_cannot_be_projected() {
    let mapper = Mapper::new();
    let ids = orders(&mapper);
    mapper
        .configure(ids.order, ids.order_dto)
        .resolve_with("Notes", |_, _| Ok(Value::from("opaque")))
        .register()
        .unwrap();

    let err = mapper.projection(ids.order, ids.order_dto).unwrap_err();
    assert!(err.is_compilation());
    assert!(err.to_string().contains("Notes"));
    // Execution is unaffected.
    let dto = mapper.map(&order(&mapper, &ids, &[]), ids.order_dto).unwrap();
    assert_eq!(get(&mapper, &dto, "Notes").as_str(), Some("opaque"));
}
