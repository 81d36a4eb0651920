//! Behavior of code-directive resolvers driven through a real schema.

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use graphql_code_directive::CodeDirective;
use graphql_code_directive::Context;
use graphql_code_directive::FieldCoordinate;
use graphql_code_directive::FieldSelection;
use graphql_code_directive::Schema;
use graphql_code_directive::error::ExecutionError;
use graphql_code_directive::json_ext::Object;
use graphql_code_directive::json_ext::Value;
use serde_json_bytes::json;

fn args(value: Value) -> Object {
    value.as_object().cloned().unwrap_or_default()
}

/// Parses `body` together with the default directive declaration and
/// installs resolvers for every annotated field.
fn code_schema(body: &str) -> Schema {
    let directive = CodeDirective::default();
    let sdl = format!("{}\n{}", directive.type_defs(), body);
    directive
        .transform(Schema::parse(sdl).expect("valid schema"))
        .expect("transform succeeds")
}

#[tokio::test]
async fn resolves_plain_values_from_args() {
    let schema = code_schema(
        r#"type Query { echo(x: String): String @code(source: "return args.x;") }"#,
    );
    let value = schema
        .resolve_field(
            &FieldCoordinate::new("Query", "echo"),
            Value::Null,
            args(json!({"x": "hello"})),
            Context::new(),
        )
        .await
        .unwrap();
    assert_eq!(value, json!("hello"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pending_values_resolve_without_blocking_siblings() {
    let context = Context::new();
    context.register_deferred_function("slow_value", |_args| {
        Box::pin(async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(json!("v"))
        })
    });
    let schema = Arc::new(code_schema(
        r#"type Query {
            slow: String @code(source: "return context.slow_value();")
            fast: String @code(source: "return \"quick\";")
        }"#,
    ));

    let started = Instant::now();
    let slow_schema = schema.clone();
    let slow_context = context.clone();
    let slow = tokio::spawn(async move {
        slow_schema
            .resolve_field(
                &FieldCoordinate::new("Query", "slow"),
                Value::Null,
                Object::default(),
                slow_context,
            )
            .await
    });

    let fast = schema
        .resolve_field(
            &FieldCoordinate::new("Query", "fast"),
            Value::Null,
            Object::default(),
            context,
        )
        .await
        .unwrap();
    assert_eq!(fast, json!("quick"));
    assert!(
        started.elapsed() < Duration::from_millis(400),
        "fast field waited on its slow sibling"
    );

    assert_eq!(slow.await.unwrap().unwrap(), json!("v"));
    assert!(started.elapsed() >= Duration::from_millis(500));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn thrown_errors_fail_only_their_field() {
    let schema = code_schema(
        r#"type Query {
            broken: String @code(source: "throw \"boom\";")
            healthy: Int @code(source: "return 7;")
        }"#,
    );
    let response = schema
        .resolve_set(
            "Query",
            Value::Null,
            Context::new(),
            vec![FieldSelection::new("broken"), FieldSelection::new("healthy")],
        )
        .await;

    assert_eq!(response.value("healthy"), Some(&json!(7)));
    assert_eq!(response.value("broken"), Some(&Value::Null));
    let error = response.error("broken").unwrap();
    assert_eq!(error.message, "boom");
    assert!(response.error("healthy").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn host_functions_resolve_like_direct_awaits() {
    async fn fetch() -> Value {
        json!({"answer": 42})
    }

    let context = Context::new();
    context.register_function("fetch", |_args| Box::pin(async { Ok(fetch().await) }));
    let schema = code_schema(
        r#"scalar JSON
        type Query { fetched: JSON @code(source: "return context.fetch();") }"#,
    );
    let via_script = schema
        .resolve_field(
            &FieldCoordinate::new("Query", "fetched"),
            Value::Null,
            Object::default(),
            context,
        )
        .await
        .unwrap();

    assert_eq!(via_script, fetch().await);
}

#[tokio::test]
async fn renamed_directives_coexist_without_interference() {
    let abc = CodeDirective::builder().directive_name("ABC").build();
    let xyz = CodeDirective::builder().directive_name("XYZ").build();
    let sdl = format!(
        "{}\n{}\ntype Query {{ a: Int @ABC(source: \"return 1;\") x: Int @XYZ(source: \"return 2;\") }}",
        abc.type_defs(),
        xyz.type_defs(),
    );
    let schema = Schema::parse(sdl).unwrap();
    let schema = xyz.transform(abc.transform(schema).unwrap()).unwrap();

    let response = schema
        .resolve_set(
            "Query",
            Value::Null,
            Context::new(),
            vec![FieldSelection::new("a"), FieldSelection::new("x")],
        )
        .await;
    assert_eq!(response.value("a"), Some(&json!(1)));
    assert_eq!(response.value("x"), Some(&json!(2)));
    assert!(response.errors.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_invocations_never_share_state() {
    let schema = Arc::new(code_schema(
        r#"type Query { echo(x: Int): Int @code(source: "return args.x;") }"#,
    ));
    let mut handles = Vec::new();
    for i in 0..16i64 {
        let schema = schema.clone();
        handles.push(tokio::spawn(async move {
            let value = schema
                .resolve_field(
                    &FieldCoordinate::new("Query", "echo"),
                    Value::Null,
                    args(json!({"x": i})),
                    Context::new(),
                )
                .await
                .unwrap();
            (i, value)
        }));
    }
    for handle in handles {
        let (i, value) = handle.await.unwrap();
        assert_eq!(value, json!(i));
    }
}

#[tokio::test]
async fn aliased_selections_of_one_field_stay_independent() {
    let schema = code_schema(
        r#"type Query { echo(x: Int): Int @code(source: "return args.x;") }"#,
    );
    let response = schema
        .resolve_set(
            "Query",
            Value::Null,
            Context::new(),
            vec![
                FieldSelection::new("echo")
                    .with_alias("first")
                    .with_args(args(json!({"x": 1}))),
                FieldSelection::new("echo")
                    .with_alias("second")
                    .with_args(args(json!({"x": 2}))),
            ],
        )
        .await;
    assert_eq!(response.value("first"), Some(&json!(1)));
    assert_eq!(response.value("second"), Some(&json!(2)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn a_deadline_bounds_the_wait_for_slow_scripts() {
    let context = Context::new();
    context.register_function("stall", |_args| {
        Box::pin(async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(Value::Null)
        })
    });
    let directive = CodeDirective::builder()
        .deadline(Duration::from_millis(50))
        .build();
    let sdl = format!(
        "{}\ntype Query {{ stuck: Int @code(source: \"context.stall(); return 1;\") }}",
        directive.type_defs(),
    );
    let schema = directive.transform(Schema::parse(sdl).unwrap()).unwrap();

    let started = Instant::now();
    let error = schema
        .resolve_field(
            &FieldCoordinate::new("Query", "stuck"),
            Value::Null,
            Object::default(),
            context,
        )
        .await
        .unwrap_err();
    assert!(matches!(error, ExecutionError::DeadlineExceeded { .. }));
    assert!(
        started.elapsed() < Duration::from_millis(400),
        "the deadline did not bound the wait"
    );
    assert_eq!(
        error.to_graphql_error(None).extensions.get("code"),
        Some(&json!("SCRIPT_DEADLINE_EXCEEDED")),
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_deferred_values_fail_the_field_with_their_message() {
    let context = Context::new();
    context.register_deferred_function("doomed", |_args| Box::pin(async { Err("nope".into()) }));
    let schema = code_schema(
        r#"type Query { d: Int @code(source: "return context.doomed();") }"#,
    );
    let error = schema
        .resolve_field(
            &FieldCoordinate::new("Query", "d"),
            Value::Null,
            Object::default(),
            context,
        )
        .await
        .unwrap_err();
    assert_eq!(error.to_string(), "nope");
}

#[tokio::test]
async fn plain_fields_co_resolve_with_annotated_siblings() {
    let schema = code_schema(
        r#"type Query {
            scripted: Int @code(source: "return 1;")
            plain: String
        }"#,
    );
    let response = schema
        .resolve_set(
            "Query",
            json!({"plain": "p"}),
            Context::new(),
            vec![FieldSelection::new("scripted"), FieldSelection::new("plain")],
        )
        .await;
    assert_eq!(response.value("scripted"), Some(&json!(1)));
    assert_eq!(response.value("plain"), Some(&json!("p")));
    assert!(response.errors.is_empty());
}

#[test_log::test(tokio::test)]
async fn scripts_log_through_tracing() {
    let schema = code_schema(
        r#"type Query {
            logged: Int @code(source: "log_info(\"hello from the script\"); print(\"printed\"); return 1;")
        }"#,
    );
    let value = schema
        .resolve_field(
            &FieldCoordinate::new("Query", "logged"),
            Value::Null,
            Object::default(),
            Context::new(),
        )
        .await
        .unwrap();
    assert_eq!(value, json!(1));
}
