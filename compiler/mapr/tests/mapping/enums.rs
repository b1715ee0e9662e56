use mapr::{Mapper, TypeId, Value};
use pretty_assertions::assert_eq;

use crate::common::{get, set};

struct Departments {
    dept: TypeId,
    employee: TypeId,
    employee_dto: TypeId,
}

/// `Dept` flags: Finance = 1, IT = 2, HR = 4. `Employee { Dept: Dept }`
/// maps to `EmployeeDto { Dept: str }` and back.
fn departments(mapper: &Mapper) -> Departments {
    let pool = mapper.pool();
    let dept = pool
        .enumeration("Dept")
        .flags()
        .member("None", 0)
        .member("Finance", 1)
        .member("IT", 2)
        .member("HR", 4)
        .build()
        .unwrap();
    let employee = pool.record("Employee").field("Dept", dept).build().unwrap();
    let employee_dto = pool
        .record("EmployeeDto")
        .field("Dept", TypeId::STR)
        .build()
        .unwrap();
    Departments {
        dept,
        employee,
        employee_dto,
    }
}

#[test]
fn flags_round_trip_through_strings() {
    let mapper = Mapper::new();
    let d = departments(&mapper);
    let source = mapper.pool().new_object(d.employee).unwrap();
    set(&mapper, &source, "Dept", Value::enum_value(d.dept, 1 | 2));

    let dto = mapper.map(&Value::Object(source), d.employee_dto).unwrap();
    assert_eq!(get(&mapper, &dto, "Dept").as_str(), Some("Finance, IT"));

    let back = mapper.map(&dto, d.employee).unwrap();
    assert!(matches!(
        get(&mapper, &back, "Dept"),
        Value::Enum { ty, bits: 3 } if ty == d.dept
    ));
}

#[test]
fn strings_parse_case_insensitively() {
    let mapper = Mapper::new();
    let d = departments(&mapper);
    let parsed = mapper.map(&Value::from("hr, finance"), d.dept).unwrap();
    assert_eq!(parsed.as_i64(), Some(5));

    let err = mapper.map(&Value::from("Legal"), d.dept).unwrap_err();
    assert!(err.is_conversion());
    assert!(err.to_string().contains("Legal"));
}

#[test]
fn enums_convert_to_integers_and_other_enums() {
    let mapper = Mapper::new();
    let d = departments(&mapper);
    let team = mapper
        .pool()
        .enumeration("Team")
        .flags()
        .member("IT", 16)
        .member("Finance", 32)
        .build()
        .unwrap();

    let it = Value::enum_value(d.dept, 2);
    assert!(matches!(mapper.map(&it, TypeId::I32).unwrap(), Value::I32(2)));
    let mapped = mapper.map(&it, team).unwrap();
    assert!(matches!(mapped, Value::Enum { ty, bits: 16 } if ty == team));

    let hr = Value::enum_value(d.dept, 4);
    assert!(mapper.map(&hr, team).unwrap_err().is_conversion());
}
