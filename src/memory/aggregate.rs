//! Aggregate functions over one group of values
//!
//! Nulls are ignored. Over no values `count` is 0 and every other
//! aggregate is null.

use std::cmp::Ordering;

use crate::executor::{DataSourceError, DataSourceResult};
use crate::planner::AggregateFn;
use crate::schema::Value;

/// Computes `func` over the argument values of one group
pub(super) fn compute(func: AggregateFn, values: &[Value]) -> DataSourceResult<Value> {
    let present: Vec<&Value> = values.iter().filter(|v| !v.is_null()).collect();
    match func {
        AggregateFn::Count => Ok(Value::Int(present.len() as i64)),
        AggregateFn::Sum => sum(&present),
        AggregateFn::Avg => avg(&present),
        AggregateFn::Max => Ok(extreme(&present, Ordering::Greater)),
        AggregateFn::Min => Ok(extreme(&present, Ordering::Less)),
    }
}

/// Sum of ints stays an int; any decimal makes the sum decimal
fn sum(values: &[&Value]) -> DataSourceResult<Value> {
    if values.is_empty() {
        return Ok(Value::Null);
    }
    if values.iter().all(|v| matches!(v, Value::Int(_))) {
        let mut total: i64 = 0;
        for value in values.iter().filter_map(|v| v.as_i64()) {
            total = total
                .checked_add(value)
                .ok_or_else(|| DataSourceError::Evaluation("integer overflow in sum".into()))?;
        }
        return Ok(Value::Int(total));
    }
    Ok(Value::Decimal(numeric(values)?.iter().sum()))
}

fn avg(values: &[&Value]) -> DataSourceResult<Value> {
    if values.is_empty() {
        return Ok(Value::Null);
    }
    let numbers = numeric(values)?;
    Ok(Value::Decimal(numbers.iter().sum::<f64>() / numbers.len() as f64))
}

fn extreme(values: &[&Value], wanted: Ordering) -> Value {
    values
        .iter()
        .fold(None::<&Value>, |best, v| match best {
            Some(b) if v.sort_cmp(b) != wanted => Some(b),
            _ => Some(v),
        })
        .cloned()
        .unwrap_or(Value::Null)
}

fn numeric(values: &[&Value]) -> DataSourceResult<Vec<f64>> {
    values
        .iter()
        .map(|v| {
            v.as_f64().ok_or_else(|| {
                DataSourceError::Evaluation(format!("cannot aggregate {} value", v.type_name()))
            })
        })
        .collect()
}
