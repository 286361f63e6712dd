use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use sqlbind::prelude::*;

fn fresh_users(registered: NaiveDate, enabled: Option<bool>) -> SqlbindResult<CheckedTemplate> {
    let filter = where_([
        Some(field("registered").gt(registered)),
        elide(enabled, |v| field("enabled").eq(v)),
    ]);
    sql!("@SELECT * FROM users {filter} ORDER BY registered", filter)
}

#[test]
fn test_fresh_users_with_all_filters() {
    let registered = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let query = fresh_users(registered, Some(true)).unwrap();

    assert_eq!(
        render(query).unwrap(),
        (
            "SELECT * FROM users WHERE registered > ? AND enabled = ? ORDER BY registered"
                .to_string(),
            vec![Value::from(registered), Value::Bool(true)]
        )
    );
}

#[test]
fn test_fresh_users_elides_missing_filter() {
    let registered = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let query = fresh_users(registered, None).unwrap();

    assert_eq!(
        render(query).unwrap(),
        (
            "SELECT * FROM users WHERE registered > ? ORDER BY registered".to_string(),
            vec![Value::from(registered)]
        )
    );
}

#[test]
fn test_fresh_users_per_dialect() {
    let registered = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let query: Query = fresh_users(registered, Some(false)).unwrap().into();

    let (sql, _) = PostgresRenderer.render(&query, ParamStyle::Dollar).unwrap();
    assert_eq!(
        sql,
        "SELECT * FROM users WHERE registered > $1 AND enabled = $2 ORDER BY registered"
    );

    let (sql, _) = SqliteRenderer::default()
        .render(&query, ParamStyle::Named)
        .unwrap();
    assert_eq!(
        sql,
        "SELECT * FROM users WHERE registered > :p1 AND enabled = :p2 ORDER BY registered"
    );
}

#[test]
fn test_unmarked_template_is_rejected() {
    let transformer = TemplateTransformer::default();
    let transformed = transformer.transform("SELECT * FROM users").unwrap();
    assert!(!transformed.is_template());

    let err = transformed.into_template().unwrap_err();
    assert!(err.to_string().contains("prefixed template"));
}

#[test]
fn test_scoped_transformer_from_config() {
    let config = Config::from_toml_str(
        r#"
        marker = "@"
        [scope]
        patterns = ["app.*.queries", "scripts.**"]
        "#,
    )
    .unwrap();
    let transformer = config.transformer().unwrap();

    let source = "@SELECT {x}";
    assert!(transformer.transform_in("app.users.queries", source).unwrap().is_template());
    assert!(transformer.transform_in("scripts", source).unwrap().is_template());
    assert!(!transformer.transform_in("app.users.models", source).unwrap().is_template());
}

#[test]
fn test_update_with_set_and_where() {
    let name: Option<&str> = Some("bob");
    let email: Option<&str> = None;
    let set = set_([
        elide(name, |v| field("name").to(v)),
        elide(email, |v| field("email").to(v)),
    ]);
    let filter = where_([field("id").eq(7)]);
    let query = sql!("@UPDATE users {set} {filter}", set, filter).unwrap();

    assert_eq!(
        render(query).unwrap(),
        (
            "UPDATE users SET name = ? WHERE id = ?".to_string(),
            vec![Value::from("bob"), Value::Int(7)]
        )
    );
}
