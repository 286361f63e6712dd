use std::cell::RefCell;

use sqlbind::prelude::*;

/// Records every statement it is asked to run.
#[derive(Default)]
struct FakeConnection {
    log: RefCell<Vec<(String, Vec<Value>)>>,
}

impl Executor for FakeConnection {
    type Output = usize;

    fn execute(&self, sql: &str, values: &[Value]) -> SqlbindResult<usize> {
        self.log.borrow_mut().push((sql.to_string(), values.to_vec()));
        Ok(self.log.borrow().len())
    }
}

#[test]
fn test_session_passes_rendered_statement() {
    let conn = FakeConnection::default();
    let session = Session::new(&conn, Dialect::Postgres).style(ParamStyle::Dollar);

    let ids = vec![1, 2, 3];
    let query = sql!("@DELETE FROM users WHERE {filter}", filter = field("id").is_in(ids.clone()))
        .unwrap();
    assert_eq!(session.execute(query).unwrap(), 1);

    let log = conn.log.borrow();
    assert_eq!(log[0].0, "DELETE FROM users WHERE id = ANY($1)");
    assert_eq!(log[0].1, vec![Value::from(ids)]);
}

#[test]
fn test_session_sql_does_not_execute() {
    let conn = FakeConnection::default();
    let session = Session::new(&conn, Dialect::Sqlite);

    let (sql, values) = session.sql(field("flag").is_in(Vec::<i64>::new())).unwrap();
    assert_eq!(sql, "0");
    assert!(values.is_empty());
    assert!(conn.log.borrow().is_empty());
}

#[test]
fn test_session_with_configured_renderer() {
    let config = Config::from_toml_str("dialect = \"sqlite\"\nsqlite_in_max_values = 2").unwrap();
    let conn = FakeConnection::default();
    let session = Session::with_renderer(&conn, config.renderer()).style(config.param_style);

    session.execute(field("id").is_in([1, 2, 3])).unwrap();
    assert_eq!(conn.log.borrow()[0], ("id IN (1,2,3)".to_string(), vec![]));
}
