use std::sync::Arc;

use http::Method;
use piperoute::dispatcher::{Conn, DispatchTable, Dispatcher, Pipe, Served};
use piperoute::middleware::{AuthPipe, MetricsPipe, PutPrivatePipe, TracingPipe};
use piperoute::router::{Registration, Router};
use serde_json::json;

use tracing_util::TestTracing;

fn pipe(p: impl Pipe + 'static) -> Arc<dyn Pipe> {
    Arc::new(p)
}

fn build(pipes: Vec<Arc<dyn Pipe>>) -> DispatchTable {
    let mut dispatcher = Dispatcher::new();
    dispatcher.add_pipeline("api", pipes);
    dispatcher.register_handler("Account", "show", |conn, _| {
        let user = conn.assigns.get("current_user").cloned().unwrap_or_default();
        Ok(conn.send(200, json!({ "user": user })))
    });
    dispatcher.register_handler("Account", "fail", |_conn, _| {
        Err(anyhow::anyhow!("database unavailable"))
    });
    let router = Router::build(vec![
        Registration::new("GET", "/account", "Account", "show").pipe_through("api"),
        Registration::new("GET", "/broken", "Account", "fail").pipe_through("api"),
    ])
    .unwrap();
    dispatcher.build_table(&router).unwrap()
}

fn serve(table: &DispatchTable, conn: Conn) -> Conn {
    match table.serve(conn).unwrap() {
        Served::Dispatched(conn) => conn,
        Served::NoMatch(conn) => panic!("no match for {}", conn.path),
    }
}

#[test]
fn test_auth_pipe_accepts_token() {
    let table = build(vec![pipe(AuthPipe::new("Bearer s3cret", "alice"))]);
    let conn =
        Conn::new(Method::GET, "h", "/account").with_header("Authorization", "Bearer s3cret");
    let conn = serve(&table, conn);
    assert_eq!(conn.status, Some(200));
    assert_eq!(conn.resp_body, Some(json!({ "user": "alice" })));
}

#[test]
fn test_auth_pipe_halts_without_token() {
    let table = build(vec![pipe(AuthPipe::new("Bearer s3cret", "alice"))]);
    for conn in [
        Conn::new(Method::GET, "h", "/account"),
        Conn::new(Method::GET, "h", "/account").with_header("authorization", "Bearer nope"),
    ] {
        let conn = serve(&table, conn);
        assert!(conn.halted);
        assert_eq!(conn.status, Some(401));
        assert!(conn.assigns.get("current_user").is_none());
    }
}

#[test]
fn test_metrics_pipe_counts_outcomes() {
    let metrics = Arc::new(MetricsPipe::new());
    let table = build(vec![
        Arc::clone(&metrics) as Arc<dyn Pipe>,
        pipe(AuthPipe::new("t", "bob")),
    ]);

    serve(&table, Conn::new(Method::GET, "h", "/account").with_header("authorization", "t"));
    serve(&table, Conn::new(Method::GET, "h", "/account"));
    assert!(table
        .serve(Conn::new(Method::GET, "h", "/broken").with_header("authorization", "t"))
        .is_err());

    assert_eq!(metrics.request_count(), 3);
    assert_eq!(metrics.halted_count(), 1);
    assert_eq!(metrics.failure_count(), 1);
}

#[test]
fn test_metrics_pipe_starts_empty() {
    let metrics = MetricsPipe::new();
    assert_eq!(metrics.request_count(), 0);
    assert_eq!(metrics.average_latency().as_nanos(), 0);
}

#[test]
fn test_tracing_pipe_wraps_inner_logs_in_request_span() {
    let capture = TestTracing::init();
    let table = build(vec![pipe(TracingPipe), pipe(AuthPipe::new("t", "carol"))]);

    let conn = Conn::new(Method::GET, "api.example.com", "/account");
    let request_id = conn.request_id.to_string();
    let conn = serve(&table, conn);
    assert_eq!(conn.status, Some(401));

    let output = capture.output();
    let halted_line = output
        .lines()
        .find(|l| l.contains("Unauthorized request halted"))
        .expect("auth pipe log line");
    assert!(halted_line.contains("\"name\":\"request\""));
    assert!(halted_line.contains(&request_id));
}

#[test]
fn test_put_private_pipe_feeds_later_pipes() {
    let table = build(vec![
        pipe(PutPrivatePipe::single("required_token", json!("t"))),
        pipe(AuthPipe::new("t", "dana")),
    ]);
    let conn = serve(
        &table,
        Conn::new(Method::GET, "h", "/account").with_header("authorization", "t"),
    );
    assert_eq!(conn.private["required_token"], json!("t"));
    assert_eq!(conn.resp_body, Some(json!({ "user": "dana" })));
}
