use std::sync::Arc;

use tempfile::TempDir;

use inspecta::form::{create_form, key_choices, update_form};
use inspecta::viz::{aggregate, map_points, Aggregation};
use inspecta::{
    Authenticator, Console, ConsoleError, CredentialStore, FormMode, RecordKey, Store,
    TableRegistry, Value,
};

const FIXTURE: &str = include_str!("fixtures/inspections.sql");

fn seeded_store(dir: &TempDir) -> Arc<Store> {
    let store = Store::open(&dir.path().join("inspections.db"))
        .expect("Failed to open database");
    store
        .lock()
        .unwrap()
        .execute_batch(FIXTURE)
        .expect("Failed to seed database");
    Arc::new(store)
}

fn open_console(dir: &TempDir) -> Console {
    Console::open(seeded_store(dir), TableRegistry::default())
        .expect("Failed to open console")
}

fn logged_in(dir: &TempDir) -> Console {
    let mut console = open_console(dir);
    console.sign_up("admin", "s3cret").unwrap();
    console.login("admin", "s3cret").unwrap();
    console
}

fn key(values: &[i64]) -> RecordKey {
    RecordKey(values.iter().map(|&v| Value::Integer(v)).collect())
}

#[test]
fn test_register_then_verify() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let auth = Authenticator::new(CredentialStore::init(store).unwrap());

    auth.register("ana", "correct horse").unwrap();
    assert!(auth.verify("ana", "correct horse").unwrap());
    assert!(!auth.verify("ana", "wrong horse").unwrap());
    assert!(!auth.verify("nobody", "correct horse").unwrap());
}

#[test]
fn test_duplicate_register_keeps_store_size() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let auth = Authenticator::new(CredentialStore::init(store).unwrap());

    auth.register("ana", "one").unwrap();
    let err = auth.register("ana", "two").unwrap_err();
    assert!(matches!(
        err,
        ConsoleError::AlreadyExists(name) if name == "ana"
    ));
    assert_eq!(auth.credentials().count().unwrap(), 1);
    assert!(auth.verify("ana", "one").unwrap());
}

#[test]
fn test_empty_credentials_rejected() {
    let dir = TempDir::new().unwrap();
    let console = open_console(&dir);

    assert!(matches!(
        console.sign_up("", "pw"),
        Err(ConsoleError::EmptyCredentials)
    ));
    assert!(matches!(
        console.sign_up("ana", ""),
        Err(ConsoleError::EmptyCredentials)
    ));
}

#[test]
fn test_users_persist_across_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let console = open_console(&dir);
        console.sign_up("ana", "pw").unwrap();
    }

    let store = Arc::new(Store::open(&dir.path().join("inspections.db")).unwrap());
    let mut console = Console::open(store, TableRegistry::default()).unwrap();
    console.login("ana", "pw").unwrap();
    assert_eq!(console.session().username(), Some("ana"));
}

#[test]
fn test_operations_require_login() {
    let dir = TempDir::new().unwrap();
    let mut console = open_console(&dir);

    assert!(matches!(
        console.load("employee"),
        Err(ConsoleError::NotAuthenticated)
    ));
    assert!(matches!(
        console.delete("employee", &key(&[1])),
        Err(ConsoleError::NotAuthenticated)
    ));

    assert!(matches!(
        console.login("ghost", "pw"),
        Err(ConsoleError::InvalidCredentials)
    ));
    assert!(!console.session().is_authenticated());

    console.sign_up("ana", "pw").unwrap();
    console.login("ana", "pw").unwrap();
    assert_eq!(console.load("employee").unwrap().row_count(), 3);

    console.logout();
    assert!(matches!(
        console.load("employee"),
        Err(ConsoleError::NotAuthenticated)
    ));
}

#[test]
fn test_forked_sessions_are_independent() {
    let dir = TempDir::new().unwrap();
    let console = logged_in(&dir);
    let other = console.fork();

    assert!(console.session().is_authenticated());
    assert!(!other.session().is_authenticated());
    assert!(matches!(
        other.load("employee"),
        Err(ConsoleError::NotAuthenticated)
    ));
}

#[test]
fn test_tables_listed_in_registry_order() {
    let dir = TempDir::new().unwrap();
    let console = open_console(&dir);

    assert_eq!(
        console.tables(),
        vec![
            "establishment",
            "employee",
            "inspection",
            "violation",
            "inspection_point",
        ]
    );
}

#[test]
fn test_unknown_table_rejected() {
    let dir = TempDir::new().unwrap();
    let console = logged_in(&dir);

    assert!(matches!(
        console.load("users"),
        Err(ConsoleError::UnknownTable(_))
    ));
}

#[test]
fn test_create_round_trip_coerces_values() {
    let dir = TempDir::new().unwrap();
    let console = logged_in(&dir);

    let table = console.load("employee").unwrap();
    let mut form = create_form(&table);
    assert!(form.field("employee_id").is_none());
    form.set("first_name", "Dee")
        .set("last_name", "Lopez")
        .set("title", "Sanitarian")
        .set("salary", "3")
        .set("supervisor", "");

    assert_eq!(console.submit(&form).unwrap(), 1);

    let table = console.load("employee").unwrap();
    assert_eq!(table.row_count(), 4);
    let row = table
        .iter()
        .find(|r| r.values[1] == Value::from("Dee"))
        .expect("inserted row");
    assert_eq!(row.values[4], Value::Integer(3));
    assert_eq!(row.values[5], Value::Null);
}

#[test]
fn test_create_rejects_bad_number() {
    let dir = TempDir::new().unwrap();
    let console = logged_in(&dir);

    let table = console.load("employee").unwrap();
    let mut form = create_form(&table);
    form.set("salary", "lots");

    assert!(matches!(
        console.submit(&form),
        Err(ConsoleError::InvalidValue { column, .. }) if column == "salary"
    ));
    assert_eq!(console.load("employee").unwrap().row_count(), 3);
}

#[test]
fn test_update_changes_only_selected_row() {
    let dir = TempDir::new().unwrap();
    let console = logged_in(&dir);

    let table = console.load("employee").unwrap();
    let mut form = update_form(&table, &key(&[2])).unwrap();
    assert!(form.field("employee_id").unwrap().read_only);
    assert_eq!(form.field("salary").unwrap().text, "72000");
    form.set("salary", "75000");

    assert_eq!(console.submit(&form).unwrap(), 1);

    let after = console.load("employee").unwrap();
    assert_eq!(
        after.find_by_key(&key(&[2])).unwrap().values[4],
        Value::Integer(75000)
    );
    for id in [1, 3] {
        assert_eq!(
            after.find_by_key(&key(&[id])).unwrap().values,
            table.find_by_key(&key(&[id])).unwrap().values
        );
    }
}

#[test]
fn test_update_absent_key_is_noop() {
    let dir = TempDir::new().unwrap();
    let console = logged_in(&dir);

    let table = console.load("employee").unwrap();
    let mut form = update_form(&table, &key(&[1])).unwrap();
    form.set("salary", "1");
    form.mode = FormMode::Update(key(&[99]));

    assert_eq!(console.submit(&form).unwrap(), 0);
    let employees = console.load("employee").unwrap();
    assert_eq!(employees.rows.len(), 3);
    assert_eq!(
        employees.find_by_key(&key(&[1])).unwrap().values[4],
        Value::Integer(80000)
    );
}

#[test]
fn test_update_form_requires_present_key() {
    let dir = TempDir::new().unwrap();
    let console = logged_in(&dir);

    let table = console.load("employee").unwrap();
    assert!(matches!(
        update_form(&table, &key(&[42])),
        Err(ConsoleError::KeyNotFound { .. })
    ));
}

#[test]
fn test_delete_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let console = logged_in(&dir);

    assert_eq!(console.delete("employee", &key(&[3])).unwrap(), 1);
    assert_eq!(console.delete("employee", &key(&[3])).unwrap(), 0);

    let table = console.load("employee").unwrap();
    assert_eq!(table.row_count(), 2);
    assert!(table.find_by_key(&key(&[3])).is_none());
}

#[test]
fn test_composite_key_update_and_delete() {
    let dir = TempDir::new().unwrap();
    let console = logged_in(&dir);

    let table = console.load("violation").unwrap();
    assert_eq!(table.schema.key, vec!["inspection_id", "point_id"]);
    assert_eq!(key_choices(&table).len(), 3);

    let mut form = update_form(&table, &key(&[100, 1])).unwrap();
    form.set("fine", "250");
    assert_eq!(console.submit(&form).unwrap(), 1);

    let after = console.load("violation").unwrap();
    assert_eq!(
        after.find_by_key(&key(&[100, 1])).unwrap().values[2],
        Value::Integer(250)
    );
    assert_eq!(
        after.find_by_key(&key(&[101, 1])).unwrap().values[2],
        Value::Integer(10)
    );

    assert_eq!(console.delete("violation", &key(&[100, 2])).unwrap(), 1);
    assert_eq!(console.load("violation").unwrap().row_count(), 2);

    assert!(matches!(
        console.delete("violation", &key(&[100])),
        Err(ConsoleError::KeyNotFound { .. })
    ));
}

#[test]
fn test_composite_key_create_keeps_key_fields() {
    let dir = TempDir::new().unwrap();
    let console = logged_in(&dir);

    let table = console.load("violation").unwrap();
    let mut form = create_form(&table);
    assert!(form.field("inspection_id").is_some());
    form.set("inspection_id", "101")
        .set("point_id", "3")
        .set("fine", "5");
    assert_eq!(console.submit(&form).unwrap(), 1);

    // Same composite key again violates the primary key.
    assert!(matches!(
        console.submit(&form),
        Err(ConsoleError::WriteFailed(_))
    ));
    assert_eq!(console.load("violation").unwrap().row_count(), 4);
}

#[test]
fn test_registry_mismatch_fails_fast() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    store
        .lock()
        .unwrap()
        .execute_batch("DROP TABLE violation")
        .unwrap();

    assert!(matches!(
        Console::open(store, TableRegistry::default()),
        Err(ConsoleError::RegistryMismatch(_))
    ));
}

#[test]
fn test_registry_rejects_wrong_declared_key() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let registry = TableRegistry::new(vec![inspecta::TableEntry::new(
        "violation",
        ["inspection_id"],
    )]);

    assert!(matches!(
        Console::open(store, registry),
        Err(ConsoleError::RegistryMismatch(_))
    ));
}

#[test]
fn test_schema_reload_picks_up_new_column() {
    let dir = TempDir::new().unwrap();
    let console = logged_in(&dir);

    assert_eq!(console.load("inspection").unwrap().column_count(), 7);
    console
        .store()
        .lock()
        .unwrap()
        .execute_batch("ALTER TABLE inspection ADD COLUMN notes TEXT")
        .unwrap();

    assert_eq!(console.load("inspection").unwrap().column_count(), 7);
    console.reload_schema().unwrap();
    assert_eq!(console.load("inspection").unwrap().column_count(), 8);
}

#[test]
fn test_bar_chart_aggregation() {
    let dir = TempDir::new().unwrap();
    let console = logged_in(&dir);
    let table = console.load("inspection_point").unwrap();

    let mean = aggregate(&table, "category", "fine", Aggregation::Mean).unwrap();
    assert_eq!(
        mean,
        vec![
            (Value::from("A"), Value::Real(15.0)),
            (Value::from("B"), Value::Real(5.0)),
        ]
    );

    let count = aggregate(&table, "category", "fine", Aggregation::Count).unwrap();
    assert_eq!(
        count,
        vec![
            (Value::from("A"), Value::Integer(2)),
            (Value::from("B"), Value::Integer(1)),
        ]
    );
}

#[test]
fn test_map_points_drop_nulls() {
    let dir = TempDir::new().unwrap();
    let console = logged_in(&dir);

    let establishments = console.load("establishment").unwrap();
    assert_eq!(map_points(&establishments).unwrap(), vec![(40.0, -73.0)]);

    let employees = console.load("employee").unwrap();
    assert!(matches!(
        map_points(&employees),
        Err(ConsoleError::MissingColumns(name)) if name == "employee"
    ));
}
