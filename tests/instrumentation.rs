use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use sqlshape::contracts::EntryPoint;
use sqlshape::dispatch::Dispatcher;
use sqlshape::error::SqlshapeError;
use sqlshape::registry::ValidationRegistry;
use sqlshape::settings::Settings;
use sqlshape::value::Value;

fn bad_port_spec() -> Value {
    Value::map([
        ("dbtype", Value::str("postgresql")),
        ("dbname", Value::str("fruit")),
        ("port", Value::Int(-5432)),
    ])
}

fn good_spec() -> Value {
    Value::map([("dbtype", Value::str("h2:mem")), ("dbname", Value::str("scratch"))])
}

#[test]
fn inactive_registry_checks_nothing() {
    let registry = ValidationRegistry::new();
    assert!(!registry.is_active());
    assert!(registry.instrumented().is_empty());
    assert!(registry.activated_at().is_none());
    let args = [bad_port_spec()];
    let checked = registry
        .check(EntryPoint::GetDatasource, &args)
        .expect("nothing is checked");
    assert!(checked.is_none());
}

#[test]
fn instrument_is_idempotent() {
    let registry = ValidationRegistry::new();
    registry.instrument();
    let activated = registry.activated_at().expect("activation time");
    registry.instrument();
    assert!(registry.is_active());
    assert_eq!(registry.activated_at(), Some(activated));
    assert_eq!(registry.instrumented(), EntryPoint::ALL.to_vec());
    assert!(registry.check(EntryPoint::GetDatasource, &[bad_port_spec()]).is_err());
}

#[test]
fn unstrument_is_idempotent() {
    let registry = ValidationRegistry::new();
    registry.instrument();
    registry.unstrument();
    registry.unstrument();
    assert!(!registry.is_active());
    assert!(registry.activated_at().is_none());
    // a malformed call gets through once the contracts are detached
    let args = [bad_port_spec()];
    let checked = registry
        .check(EntryPoint::GetDatasource, &args)
        .expect("unchecked");
    assert!(checked.is_none());
}

#[test]
fn registries_are_independent() {
    let first = ValidationRegistry::new();
    let second = ValidationRegistry::new();
    first.instrument();
    assert!(first.is_active());
    assert!(!second.is_active());
}

#[test]
fn settings_can_start_instrumented() {
    let settings = Settings {
        instrument: true,
        ..Settings::default()
    };
    assert!(ValidationRegistry::from_settings(&settings).is_active());
    assert!(!ValidationRegistry::from_settings(&Settings::default()).is_active());
}

#[test]
fn dispatcher_forwards_arguments_unchanged() {
    let registry = Arc::new(ValidationRegistry::new());
    registry.instrument();
    let mut dispatcher = Dispatcher::new(Arc::clone(&registry));
    dispatcher.register(EntryPoint::GetDatasource, |args: &[Value]| args.to_vec());

    let args = vec![good_spec()];
    let forwarded = dispatcher
        .call(EntryPoint::GetDatasource, &args)
        .expect("conforming call");
    assert_eq!(forwarded, args);
}

#[test]
fn dispatcher_short_circuits_rejected_calls() {
    let registry = Arc::new(ValidationRegistry::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let mut dispatcher = Dispatcher::new(Arc::clone(&registry));
    let counter = Arc::clone(&calls);
    dispatcher.register(EntryPoint::GetDatasource, move |_: &[Value]| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    registry.instrument();
    match dispatcher.call(EntryPoint::GetDatasource, &[bad_port_spec()]) {
        Err(SqlshapeError::Violation(violation)) => {
            assert_eq!(violation.entry_point, EntryPoint::GetDatasource);
            assert_eq!(violation.arity, 1);
        }
        other => panic!("expected a violation, got {:?}", other),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // detached, the same call reaches the operation
    registry.unstrument();
    assert!(dispatcher.call(EntryPoint::GetDatasource, &[bad_port_spec()]).is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn dispatcher_without_operation() {
    let dispatcher: Dispatcher<()> = Dispatcher::new(Arc::new(ValidationRegistry::new()));
    match dispatcher.call(EntryPoint::Query, &[]) {
        Err(SqlshapeError::NotRegistered(entry_point)) => assert_eq!(entry_point, EntryPoint::Query),
        other => panic!("expected NotRegistered, got {:?}", other),
    }
}

#[test]
fn toggling_is_never_partial() {
    let registry = Arc::new(ValidationRegistry::new());
    let toggler = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for _ in 0..200 {
                registry.instrument();
                registry.unstrument();
            }
        })
    };
    let observers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..200 {
                    let count = registry.instrumented().len();
                    assert!(count == 0 || count == EntryPoint::ALL.len(), "saw {} entry points", count);
                }
            })
        })
        .collect();
    toggler.join().expect("toggler");
    for observer in observers {
        observer.join().expect("observer");
    }
    assert!(!registry.is_active());
}

#[test]
fn global_registry() {
    sqlshape::instrument();
    assert!(sqlshape::global().is_active());
    assert!(sqlshape::global()
        .check(EntryPoint::GetDatasource, &[bad_port_spec()])
        .is_err());
    sqlshape::unstrument();
    assert!(!sqlshape::global().is_active());
}

#[test]
fn entry_point_names() {
    for entry_point in EntryPoint::ALL {
        let name = entry_point.name();
        assert_eq!(name.parse::<EntryPoint>().expect("known name"), entry_point);
        assert_eq!(entry_point.to_string(), name);
    }
    assert_eq!(EntryPoint::ExecuteBatch.name(), "execute_batch");
    match "executeBatch".parse::<EntryPoint>() {
        Err(SqlshapeError::UnknownEntryPoint(name)) => assert_eq!(name, "executeBatch"),
        other => panic!("expected UnknownEntryPoint, got {:?}", other),
    }
    assert_eq!(EntryPoint::GetById.contract().forms(), vec!["with-id", "pk-name"]);
    assert!(EntryPoint::Query.contract().forms().is_empty());
}
