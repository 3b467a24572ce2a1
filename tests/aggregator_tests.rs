//! Group-by aggregation tests

use qkernel_core::prelude::*;
use qkernel_operators::agg::{AggFuncDesc, AggKernel, AggKernelConfig, Aggregator, AggregatorConfig};
use qkernel_operators::{Kernel, OpError};
use serde_json::json;

fn batch(keys: Vec<i32>, a: Vec<i32>) -> Table {
    Table::from_columns(vec![
        Column::from_vec("key", keys),
        Column::from_vec("a", a),
    ])
    .unwrap()
}

fn keys(t: &Table) -> Vec<GroupKey> {
    group_keys(t, &["key".to_string()]).unwrap()
}

fn sum_aggregator(config: AggregatorConfig, schema: &Table) -> Aggregator {
    let mut agg = Aggregator::new(config);
    agg.init(
        &[AggFuncDesc::new("SUM", &["a"], "sum")],
        &["key".to_string()],
        &[],
        schema,
    )
    .unwrap();
    agg
}

#[test]
fn test_sum_single_group() {
    let input = batch(vec![1, 1, 1], vec![3, 2, 4]);
    let mut agg = sum_aggregator(AggregatorConfig::default(), &input);
    agg.aggregate(&input, &keys(&input)).unwrap();

    let out = agg.get_table().unwrap().unwrap();
    assert_eq!(out.row_count(), 1);
    assert_eq!(out.values::<i32>("key").unwrap(), &[1]);
    assert_eq!(out.values::<i64>("sum").unwrap(), &[9]);
}

#[test]
fn test_float_sum_follows_row_order() {
    let sum_of = |a: Vec<f32>| {
        let input = Table::from_columns(vec![
            Column::from_vec("key", vec![1i32; a.len()]),
            Column::from_vec("a", a),
        ])
        .unwrap();
        let mut agg = sum_aggregator(AggregatorConfig::default(), &input);
        agg.aggregate(&input, &keys(&input)).unwrap();
        agg.get_table().unwrap().unwrap().values::<f32>("sum").unwrap()[0]
    };
    assert_eq!(sum_of(vec![1e8, 1.0, -1e8]), 0.0);
    assert_eq!(sum_of(vec![1e8, -1e8, 1.0]), 1.0);
}

#[test]
fn test_groups_span_batches_in_first_seen_order() {
    let first = batch(vec![7, 3, 7], vec![1, 10, 2]);
    let second = batch(vec![5, 3], vec![100, 20]);
    let mut agg = sum_aggregator(AggregatorConfig::default(), &first);
    agg.aggregate(&first, &keys(&first)).unwrap();
    agg.aggregate(&second, &keys(&second)).unwrap();

    let out = agg.get_table().unwrap().unwrap();
    assert_eq!(out.values::<i32>("key").unwrap(), &[7, 3, 5]);
    assert_eq!(out.values::<i64>("sum").unwrap(), &[3, 30, 100]);
    assert_eq!(agg.group_count(), 3);

    // Reading the result does not consume it.
    let again = agg.get_table().unwrap().unwrap();
    assert_eq!(again.values::<i64>("sum").unwrap(), &[3, 30, 100]);
}

#[test]
fn test_deleted_rows_are_skipped() {
    let mut input = batch(vec![1, 2, 1], vec![5, 6, 7]);
    input.mark_delete_row(2);
    let mut agg = sum_aggregator(AggregatorConfig::default(), &input);
    agg.aggregate(&input, &keys(&input)).unwrap();
    let out = agg.get_table().unwrap().unwrap();
    assert_eq!(out.values::<i64>("sum").unwrap(), &[5, 6]);
}

#[test]
fn test_every_builtin_function() {
    let input = Table::from_columns(vec![
        Column::from_vec("key", vec!["x".to_string(), "y".into(), "x".into(), "x".into()]),
        Column::from_vec("v", vec![2.0f64, 8.0, 4.0, 3.0]),
        Column::from_vec("n", vec![4u16, 1, 9, 2]),
    ])
    .unwrap();
    let descs = vec![
        AggFuncDesc::new("sum", &["n"], "sum_n"),
        AggFuncDesc::new("AVG", &["v"], "avg_v"),
        AggFuncDesc::new("COUNT", &[], "cnt"),
        AggFuncDesc::new("MIN", &["v"], "min_v"),
        AggFuncDesc::new("MAX", &["n"], "max_n"),
        AggFuncDesc::new("IDENTITY", &["n"], "first_n"),
    ];
    let mut agg = Aggregator::new(AggregatorConfig::default());
    agg.init(&descs, &["key".to_string()], &[], &input).unwrap();
    let k = group_keys(&input, &["key".to_string()]).unwrap();
    agg.aggregate(&input, &k).unwrap();

    let out = agg.get_table().unwrap().unwrap();
    let names: Vec<String> = out.fields().into_iter().map(|f| f.name).collect();
    assert_eq!(
        names,
        ["key", "sum_n", "avg_v", "cnt", "min_v", "max_n", "first_n"]
    );
    assert_eq!(out.values::<u64>("sum_n").unwrap(), &[15, 1]);
    assert_eq!(out.values::<f64>("avg_v").unwrap(), &[3.0, 8.0]);
    assert_eq!(out.values::<i64>("cnt").unwrap(), &[3, 1]);
    assert_eq!(out.values::<f64>("min_v").unwrap(), &[2.0, 8.0]);
    assert_eq!(out.values::<u16>("max_n").unwrap(), &[9, 1]);
    assert_eq!(out.values::<u16>("first_n").unwrap(), &[4, 1]);
}

#[test]
fn test_group_key_limit_drop_mode() {
    let input = batch(vec![1, 2, 3, 1, 3], vec![1, 1, 1, 1, 1]);
    let config = AggregatorConfig {
        group_key_limit: 2,
        stop_exceed_limit: false,
        ..AggregatorConfig::default()
    };
    let mut agg = sum_aggregator(config, &input);
    agg.aggregate(&input, &keys(&input)).unwrap();
    assert_eq!(agg.group_count(), 2);
    assert_eq!(agg.dropped_rows(), 2);
    let out = agg.get_table().unwrap().unwrap();
    assert_eq!(out.values::<i32>("key").unwrap(), &[1, 2]);
    assert_eq!(out.values::<i64>("sum").unwrap(), &[2, 1]);
}

#[test]
fn test_group_key_limit_stop_mode() {
    let input = batch(vec![1, 2, 3], vec![1, 1, 1]);
    let config = AggregatorConfig {
        group_key_limit: 2,
        stop_exceed_limit: true,
        ..AggregatorConfig::default()
    };
    let mut agg = sum_aggregator(config, &input);
    assert!(matches!(
        agg.aggregate(&input, &keys(&input)),
        Err(OpError::GroupKeyLimit { limit: 2 })
    ));
}

#[test]
fn test_memory_limit() {
    let rows = 64;
    let input = batch((0..rows).collect(), vec![1; rows as usize]);
    let config = AggregatorConfig {
        memory_limit: 256,
        arena_chunk_slots: 4,
        ..AggregatorConfig::default()
    };
    let mut agg = sum_aggregator(config, &input);
    let err = agg.aggregate(&input, &keys(&input)).unwrap_err();
    assert!(matches!(err, OpError::MemoryLimit { .. } | OpError::Mem(_)), "{err}");
    assert!(agg.allocated_bytes() <= 256);
}

#[test]
fn test_aggregate_before_init() {
    let input = batch(vec![1], vec![1]);
    let mut agg = Aggregator::new(AggregatorConfig::default());
    assert!(agg.get_table().unwrap().is_none());
    assert!(matches!(
        agg.aggregate(&input, &keys(&input)),
        Err(OpError::NotInitialized)
    ));
}

#[test]
fn test_reset_then_reinit() {
    let input = batch(vec![1, 2], vec![1, 2]);
    let mut agg = sum_aggregator(AggregatorConfig::default(), &input);
    agg.aggregate(&input, &keys(&input)).unwrap();
    agg.reset();
    assert_eq!(agg.group_count(), 0);
    assert_eq!(agg.allocated_bytes(), 0);
    assert!(agg.peak_bytes() > 0);

    agg.init(
        &[AggFuncDesc::new("COUNT", &[], "cnt")],
        &["key".to_string()],
        &[],
        &input,
    )
    .unwrap();
    agg.aggregate(&input, &keys(&input)).unwrap();
    let out = agg.get_table().unwrap().unwrap();
    assert_eq!(out.values::<i64>("cnt").unwrap(), &[1, 1]);
}

#[test]
fn test_kernel_from_json_config() {
    let config: AggKernelConfig = serde_json::from_value(json!({
        "groupBy": ["key"],
        "outputFields": [],
        "aggFuncs": [
            {"funcName": "SUM", "inputs": ["a"], "outputs": ["sum"], "filter": "keep"}
        ],
        "aggregator": {"groupKeyLimit": 10}
    }))
    .unwrap();
    let mut kernel = AggKernel::new(config);

    let input = Table::from_columns(vec![
        Column::from_vec("key", vec![1i32, 1, 2]),
        Column::from_vec("a", vec![10i32, 20, 30]),
        Column::from_vec("keep", vec![true, false, true]),
    ])
    .unwrap();
    assert!(kernel.compute(Some(input), false).unwrap().is_none());
    let out = kernel.compute(None, true).unwrap().unwrap();
    assert!(out.eof);
    assert_eq!(out.table.values::<i32>("key").unwrap(), &[1, 2]);
    assert_eq!(out.table.values::<i64>("sum").unwrap(), &[10, 30]);
    assert_eq!(kernel.aggregator().config().group_key_limit, 10);

    assert!(kernel.compute(None, true).is_err());
}
