//! End-to-end pipelines built from JSON kernel configs

use qkernel_core::prelude::*;
use qkernel_exec::{build_join_kernel, build_kernel, ExecError, Pipeline};
use serde_json::json;

fn orders(ids: Vec<i64>, users: Vec<i32>, amounts: Vec<f64>) -> Table {
    Table::from_columns(vec![
        Column::from_vec("order_id", ids),
        Column::from_vec("user_id", users),
        Column::from_vec("amount", amounts),
    ])
    .unwrap()
}

fn user_dim() -> Table {
    Table::from_columns(vec![
        Column::from_vec("uid", vec![1i32, 2, 3]),
        Column::from_vec(
            "region",
            vec!["eu".to_string(), "us".into(), "eu".into()],
        ),
    ])
    .unwrap()
}

#[test]
fn test_join_then_aggregate_by_region() {
    let join = build_join_kernel(
        &json!({
            "leftKeys": ["user_id"],
            "rightKeys": ["uid"],
            "outputFields": ["order_id", "user_id", "amount", "uid", "region"],
            "joinType": "inner"
        }),
        user_dim(),
    )
    .unwrap();
    let agg = build_kernel(
        "agg",
        &json!({
            "groupBy": ["region"],
            "aggFuncs": [
                {"func": "SUM", "inputs": ["amount"], "outputs": ["revenue"]},
                {"func": "COUNT", "outputs": ["orders"]}
            ]
        }),
    )
    .unwrap();
    let mut pipeline = Pipeline::new().then(join).then(agg);

    let batches = vec![
        orders(vec![1, 2], vec![1, 2], vec![10.0, 5.0]),
        orders(vec![3, 4, 5], vec![3, 9, 1], vec![2.5, 100.0, 1.0]),
    ];
    let out = pipeline.run(batches).unwrap();
    assert_eq!(out.len(), 1);
    let t = &out[0];
    assert_eq!(
        t.values::<String>("region").unwrap(),
        &["eu".to_string(), "us".to_string()]
    );
    assert_eq!(t.values::<f64>("revenue").unwrap(), &[13.5, 5.0]);
    assert_eq!(t.values::<i64>("orders").unwrap(), &[3, 1]);
    assert!(pipeline.is_finished());
}

#[test]
fn test_left_join_keeps_unmatched_orders() {
    let join = build_join_kernel(
        &json!({
            "leftKeys": ["user_id"],
            "rightKeys": ["uid"],
            "outputFields": ["order_id", "user_id", "amount", "uid", "region"]
        }),
        user_dim(),
    )
    .unwrap();
    let mut pipeline = Pipeline::new().then(join);
    let out = pipeline
        .run(vec![orders(vec![7, 8], vec![9, 2], vec![1.0, 2.0])])
        .unwrap();
    // one table per input batch, plus the empty end-of-stream table
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].values::<i64>("order_id").unwrap(), &[8, 7]);
    assert_eq!(
        out[0].values::<String>("region").unwrap(),
        &["us".to_string(), String::new()]
    );
    assert_eq!(out[1].row_count(), 0);
    assert_eq!(out[1].column_count(), 5);
}

#[test]
fn test_top_spenders_with_offset() {
    let sort = build_kernel(
        "sort",
        &json!({
            "orderFields": ["amount", "order_id"],
            "directions": ["DESC", "ASC"],
            "limit": 2,
            "offset": 1
        }),
    )
    .unwrap();
    let mut pipeline = Pipeline::new().then(sort);
    let out = pipeline
        .run(vec![
            orders(vec![1, 2, 3], vec![0, 0, 0], vec![5.0, 9.0, 5.0]),
            orders(vec![4, 5], vec![0, 0], vec![7.0, 1.0]),
        ])
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].values::<i64>("order_id").unwrap(), &[4, 1]);
}

#[test]
fn test_limit_stops_the_stream() {
    let mut pipeline = Pipeline::new()
        .then(build_kernel("limit", &json!({"limit": 3})).unwrap());
    let first = pipeline
        .push(Some(orders(vec![1, 2], vec![0, 0], vec![0.0, 0.0])), false)
        .unwrap();
    assert_eq!(first.len(), 1);
    assert!(!first[0].eof);

    let second = pipeline
        .push(Some(orders(vec![3, 4], vec![0, 0], vec![0.0, 0.0])), false)
        .unwrap();
    assert!(second[0].eof);
    assert_eq!(second[0].table.values::<i64>("order_id").unwrap(), &[3]);
    assert!(pipeline.is_finished());
}

#[test]
fn test_registry_errors() {
    assert!(matches!(
        build_kernel("explode", &json!({})),
        Err(ExecError::Registry(_))
    ));
    assert!(build_join_kernel(&json!({"leftKeys": ["a"]}), user_dim()).is_err());
    assert!(matches!(
        build_kernel("sort", &json!({"orderFields": ["a"], "directions": ["UP"]})),
        Err(ExecError::Registry(_))
    ));
}

#[test]
fn test_failed_stage_poisons_pipeline() {
    let agg = build_kernel(
        "agg",
        &json!({
            "groupBy": ["user_id"],
            "aggFuncs": [{"func": "SUM", "inputs": ["missing"], "outputs": ["s"]}]
        }),
    )
    .unwrap();
    let mut pipeline = Pipeline::new().then(agg);
    let err = pipeline
        .run(vec![orders(vec![1], vec![1], vec![1.0])])
        .unwrap_err();
    assert!(matches!(err, ExecError::Operator(_)));
    assert!(matches!(
        pipeline.push(None, true),
        Err(ExecError::Invalid(_))
    ));
}

#[test]
fn test_kernel_defaults() {
    let d = KernelDefaults::default();
    assert_eq!(d.group_key_limit, 1_000_000);
    assert!(!d.stop_exceed_limit);
    assert!(d.arena_chunk_slots > 0);
}
