use sqlshape::contracts::EntryPoint;
use sqlshape::error::{Segment, ShapeError};
use sqlshape::predicate::{is_jdbc_url, Predicate};
use sqlshape::schemas;
use sqlshape::shape::{map_of, pred};
use sqlshape::value::{Capability, DeclaredResource, Value};

fn datasource() -> Value {
    Value::handle(DeclaredResource::new(
        "com.zaxxer.hikari.HikariDataSource",
        &[Capability::DataSource, Capability::Connectable, Capability::Sourceable],
    ))
}

fn postgres_spec() -> Value {
    Value::map([
        ("dbtype", Value::str("postgresql")),
        ("dbname", Value::str("fruit")),
        ("host", Value::str("localhost")),
        ("port", Value::Int(5432)),
        ("user", Value::str("fruit")),
        ("password", Value::str("secret")),
    ])
}

#[test]
fn each_descriptor_variant_is_tagged() {
    let cases = [
        (postgres_spec(), "db-spec"),
        (
            Value::map([("jdbcUrl", Value::str("jdbc:postgresql://localhost/fruit"))]),
            "jdbc-url",
        ),
        (Value::str("jdbc:sqlite:test.db"), "string"),
        (datasource(), "ds"),
    ];
    let shape = schemas::db_spec();
    for (value, label) in &cases {
        let conformed = shape
            .conform(value)
            .unwrap_or_else(|e| panic!("{} should conform: {}", label, e));
        assert_eq!(conformed.label(), Some(*label), "wrong variant for {}", value);
    }
}

#[test]
fn unmatched_descriptor_lists_every_variant() {
    let err = schemas::db_spec().conform(&Value::Int(42)).unwrap_err();
    match &err {
        ShapeError::AlternationExhausted { path, reasons } => {
            assert!(path.is_root());
            assert_eq!(reasons.len(), 4);
        }
        other => panic!("expected an exhausted alternation, got {:?}", other),
    }
    assert_eq!(err.labels(), vec!["db-spec", "jdbc-url", "string", "ds"]);
}

#[test]
fn urls_require_the_jdbc_prefix() {
    assert!(is_jdbc_url("jdbc:postgres://host/db"));
    assert!(is_jdbc_url("jdbc:sqlite:test.db"));
    assert!(!is_jdbc_url("postgres://host/db"));
    assert!(!is_jdbc_url("jdbc:sqlite"));
    assert!(!is_jdbc_url("jdbc:"));

    let shape = schemas::jdbc_url();
    assert!(shape.conform(&Value::str("jdbc:postgres://host/db")).is_ok());
    assert!(shape.conform(&Value::str("jdbc:sqlite:test.db")).is_ok());
    let err = shape.conform(&Value::str("postgres://host/db")).unwrap_err();
    assert!(matches!(err, ShapeError::Mismatch { .. }));
    // not a string at all
    assert!(shape.conform(&Value::kw("jdbc")).is_err());
}

#[test]
fn negative_port_is_located() {
    let spec = Value::map([
        ("dbtype", Value::str("postgresql")),
        ("dbname", Value::str("fruit")),
        ("port", Value::Int(-5)),
    ]);
    let violation = EntryPoint::GetDatasource.contract().check(&[spec]).unwrap_err();
    assert_eq!(violation.entry_point, EntryPoint::GetDatasource);
    assert_eq!(violation.arity, 1);
    assert_eq!(violation.error.path().argument(), Some(("spec", 0)));
    // connectable > db-spec > db-spec map
    let port = violation
        .error
        .reason("db-spec")
        .and_then(|e| e.reason("db-spec"))
        .expect("descriptor map reason");
    match port {
        ShapeError::Mismatch { path, expected, .. } => {
            assert_eq!(expected, "a positive integer");
            assert_eq!(path.segments().last(), Some(&Segment::Key { key: ":port".into() }));
        }
        other => panic!("expected a mismatch, got {:?}", other),
    }
}

#[test]
fn host_may_be_none() {
    let shape = schemas::db_spec_map();
    let spec = Value::map([
        ("dbtype", Value::str("h2:mem")),
        ("dbname", Value::str("scratch")),
        ("host", Value::kw("none")),
    ]);
    assert!(shape.conform(&spec).is_ok());
    let spec = Value::map([
        ("dbtype", Value::str("h2:mem")),
        ("dbname", Value::str("scratch")),
        ("host", Value::kw("localhost")),
    ]);
    assert!(shape.conform(&spec).is_err());
}

#[test]
fn extra_keys_are_allowed() {
    let spec = Value::map([
        ("dbtype", Value::str("mysql")),
        ("dbname", Value::str("fruit")),
        ("useSSL", Value::Bool(false)),
        ("dbname-separator", Value::str("/")),
    ]);
    let conformed = schemas::db_spec().conform(&spec).expect("descriptor");
    assert_eq!(conformed.label(), Some("db-spec"));
}

#[test]
fn connectable_handles() {
    let connection = Value::handle(DeclaredResource::new(
        "org.h2.jdbc.JdbcConnection",
        &[Capability::Connection, Capability::Connectable],
    ));
    let conformed = EntryPoint::GetConnection
        .contract()
        .check(std::slice::from_ref(&connection))
        .expect("connection is connectable");
    assert_eq!(conformed.part("spec").and_then(|c| c.label()), Some("connectable"));

    let sourceable = [Value::handle(DeclaredResource::new("my.Pool", &[Capability::Sourceable]))];
    let conformed = EntryPoint::GetConnection
        .contract()
        .check(&sourceable)
        .expect("sourceable");
    assert_eq!(conformed.part("spec").and_then(|c| c.label()), Some("sourceable"));

    let plain = Value::handle(DeclaredResource::new("java.lang.Object", &[]));
    let violation = EntryPoint::GetConnection.contract().check(&[plain]).unwrap_err();
    assert_eq!(violation.error.labels(), vec!["db-spec", "connectable", "sourceable"]);
}

#[test]
fn reports_mask_passwords() {
    let spec = Value::map([("dbtype", Value::str("postgresql")), ("password", Value::str("secret"))]);
    let violation = EntryPoint::GetDatasource.contract().check(&[spec]).unwrap_err();
    let report = violation.to_string();
    assert!(!report.contains("secret"), "password leaked: {}", report);
    assert!(report.contains("****"));
    let json = serde_json::to_string(&violation).expect("serializable");
    assert!(!json.contains("secret"));
}

#[test]
fn malformed_passwords_are_masked_too() {
    let cases = [
        (Value::vector([Value::str("hunter2")]), "hunter2", "vector"),
        (Value::Int(98765), "98765", "integer"),
    ];
    for (password, secret, kind) in cases {
        let spec = Value::map([
            ("dbtype", Value::str("postgresql")),
            ("dbname", Value::str("fruit")),
            ("password", password),
        ]);
        let args = [spec];
        let violation = EntryPoint::GetDatasource.contract().check(&args).unwrap_err();
        let report = violation.to_string();
        assert!(!report.contains(secret), "password leaked: {}", report);
        assert!(report.contains(&format!(":password: expected a string, got \"****\" ({})", kind)), "{}", report);
        let json = serde_json::to_string(&violation).expect("serializable");
        assert!(!json.contains(secret), "password leaked: {}", json);
    }
}

#[test]
fn qualified_password_keys_are_masked() {
    assert!(sqlshape::value::is_sensitive_key(":password"));
    assert!(sqlshape::value::is_sensitive_key(":db/password"));
    assert!(sqlshape::value::is_sensitive_key("password"));
    assert!(!sqlshape::value::is_sensitive_key(":user"));

    // free-form maps locate the failure by the full keyword
    let shape = map_of(pred(Predicate::Keyword), pred(Predicate::Str), 0);
    let opts = Value::Map(vec![(Value::kw(":db/password"), Value::Int(98765))]);
    match shape.conform(&opts) {
        Err(ShapeError::Mismatch { path, actual, .. }) => {
            assert_eq!(actual, "\"****\" (integer)");
            assert_eq!(path.segments(), &[Segment::Key { key: ":db/password".into() }]);
        }
        other => panic!("expected a mismatch, got {:?}", other),
    }
}

#[test]
fn pools_need_a_descriptor_map() {
    let class = Value::class("com.zaxxer.hikari.HikariDataSource");
    let contract = EntryPoint::ToPool.contract();
    assert!(contract.check(&[class.clone(), postgres_spec()]).is_ok());
    let url_map = Value::map([("jdbcUrl", Value::str("jdbc:h2:mem:test"))]);
    assert!(contract.check(&[class.clone(), url_map]).is_ok());
    // a bare url string is a descriptor, but not one a pool can be built from
    assert!(contract.check(&[class.clone(), Value::str("jdbc:h2:mem:test")]).is_err());
    assert!(contract.check(&[Value::str("HikariDataSource"), postgres_spec()]).is_err());

    let component = EntryPoint::Component.contract();
    let close = Value::function("close-pool", &[1]);
    assert!(component.check(&[class.clone(), postgres_spec()]).is_ok());
    assert!(component.check(&[class.clone(), postgres_spec(), close]).is_ok());
    assert!(component.check(&[class, postgres_spec(), Value::kw("close")]).is_err());
}
