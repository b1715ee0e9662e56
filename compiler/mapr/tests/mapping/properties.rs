use mapr::{Mapper, TypeId, Value};
use proptest::prelude::*;

use crate::common::{get, order, orders};

fn lines_strategy() -> impl Strategy<Value = Vec<(String, i32)>> {
    prop::collection::vec(("[A-Z]-[0-9]{1,3}", 0..1000_i32), 0..8)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn mapping_preserves_every_line(lines in lines_strategy()) {
        let mapper = Mapper::new();
        let ids = orders(&mapper);
        let borrowed: Vec<(&str, i32)> = lines.iter().map(|(s, q)| (s.as_str(), *q)).collect();
        let source = order(&mapper, &ids, &borrowed);

        let first = mapper.map(&source, ids.order_dto).unwrap();
        let second = mapper.map(&source, ids.order_dto).unwrap();
        prop_assert!(first.deep_eq(&second));

        let mapped = get(&mapper, &first, "Lines");
        let mapped = mapped.as_seq().unwrap();
        prop_assert_eq!(mapped.len(), lines.len());
        for (dto, (sku, qty)) in mapped.iter().zip(&lines) {
            let mapped_sku = get(&mapper, dto, "Sku");
            prop_assert_eq!(mapped_sku.as_str(), Some(sku.as_str()));
            prop_assert_eq!(get(&mapper, dto, "Qty").as_i64(), Some(i64::from(*qty)));
        }
        let total: i64 = lines.iter().map(|(_, q)| i64::from(*q) * 50).sum();
        #[allow(clippy::cast_precision_loss, reason = "totals stay far below 2^53")]
        let total = total as f64;
        prop_assert_eq!(get(&mapper, &first, "Total").as_f64(), Some(total));
    }

    #[test]
    fn widening_then_narrowing_is_lossless(n in any::<i32>()) {
        let mapper = Mapper::new();
        let wide = mapper.map(&Value::from(n), TypeId::I64).unwrap();
        let back = mapper.map(&wide, TypeId::I32).unwrap();
        prop_assert!(matches!(back, Value::I32(m) if m == n));
    }

    #[test]
    fn integers_survive_a_string_round_trip(n in any::<i64>()) {
        let mapper = Mapper::new();
        let text = mapper.map(&Value::from(n), TypeId::STR).unwrap();
        let back = mapper.map(&text, TypeId::I64).unwrap();
        prop_assert_eq!(back.as_i64(), Some(n));
    }
}
