//! In-memory data source
//!
//! Tables are vectors of positional rows guarded by one `RwLock`. Reads
//! share the lock; bulk writes hold it exclusively, so a write is applied
//! to every matching row or to none.
//!
//! Read pipeline (strict order):
//! 1. Scan the source table
//! 2. Inner-join each relation
//! 3. Filter
//! 4. Group and aggregate, or evaluate per row
//! 5. Order
//! 6. Offset and limit

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::executor::{DataSource, DataSourceError, DataSourceResult, ResultRow};
use crate::planner::{PlanKind, QueryPlan, SortDirection};
use crate::schema::{FieldRef, Relation, SchemaCatalog, Value, ValueType};

use super::evaluator::{Evaluator, Scope};
use super::sorter::{RowSorter, SortableRow};

/// Rows of one entity, positionally aligned with its declared fields
pub(super) type Table = Vec<Vec<Value>>;

pub(super) type Tables = HashMap<String, Table>;

/// Reference data source evaluating plans by scanning rows in memory
pub struct MemoryDataSource {
    catalog: SchemaCatalog,
    tables: RwLock<Tables>,
}

impl MemoryDataSource {
    /// Creates an empty table for every entity of the catalog
    pub fn new(catalog: SchemaCatalog) -> Self {
        let tables = catalog
            .entity_names()
            .map(|name| (name.to_string(), Table::new()))
            .collect();
        Self {
            catalog,
            tables: RwLock::new(tables),
        }
    }

    /// Appends a row. Values follow the entity's field declaration order;
    /// ints are widened into decimal fields.
    pub fn insert(&self, entity: &str, values: Vec<Value>) -> DataSourceResult<()> {
        let def = self
            .catalog
            .entity(entity)
            .map_err(|e| DataSourceError::Unsupported(e.to_string()))?;
        if values.len() != def.fields().len() {
            return Err(DataSourceError::Constraint(format!(
                "{} expects {} values, got {}",
                entity,
                def.fields().len(),
                values.len()
            )));
        }
        let row = def
            .fields()
            .iter()
            .zip(values)
            .map(|(field, value)| coerce(field, value))
            .collect::<DataSourceResult<Vec<_>>>()?;

        let mut tables = self.write_tables()?;
        table_mut(&mut tables, entity)?.push(row);
        Ok(())
    }

    /// Snapshot of an entity's rows
    pub fn rows(&self, entity: &str) -> DataSourceResult<Vec<Vec<Value>>> {
        let tables = self.read_tables()?;
        Ok(table(&tables, entity)?.clone())
    }

    pub fn row_count(&self, entity: &str) -> DataSourceResult<usize> {
        let tables = self.read_tables()?;
        Ok(table(&tables, entity)?.len())
    }

    fn read_tables(&self) -> DataSourceResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| DataSourceError::Connection("table lock poisoned".into()))
    }

    fn write_tables(&self) -> DataSourceResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| DataSourceError::Connection("table lock poisoned".into()))
    }

    fn update(&self, plan: &QueryPlan) -> DataSourceResult<u64> {
        let mut tables = self.write_tables()?;

        // Every new value is computed from the pre-update row before any
        // row is written
        let changes = {
            let snapshot: &Tables = &tables;
            let evaluator = Evaluator::new(&self.catalog, snapshot, plan)?;
            let mut changes = Vec::new();
            for (index, row) in table(snapshot, plan.source())?.iter().enumerate() {
                if !selected(&evaluator, plan, row)? {
                    continue;
                }
                let mut assigned = Vec::with_capacity(plan.assignments().len());
                for assignment in plan.assignments() {
                    let position = evaluator.position(&assignment.field)?;
                    let value = evaluator.eval(&assignment.value, Scope::Row(row))?;
                    assigned.push((position, coerce(&assignment.field, value)?));
                }
                changes.push((index, assigned));
            }
            changes
        };

        let affected = changes.len() as u64;
        let rows = table_mut(&mut tables, plan.source())?;
        for (index, assigned) in changes {
            if let Some(row) = rows.get_mut(index) {
                for (position, value) in assigned {
                    if let Some(slot) = row.get_mut(position) {
                        *slot = value;
                    }
                }
            }
        }
        Ok(affected)
    }

    fn delete(&self, plan: &QueryPlan) -> DataSourceResult<u64> {
        let mut tables = self.write_tables()?;

        let keep = {
            let snapshot: &Tables = &tables;
            let evaluator = Evaluator::new(&self.catalog, snapshot, plan)?;
            table(snapshot, plan.source())?
                .iter()
                .map(|row| selected(&evaluator, plan, row).map(|hit| !hit))
                .collect::<DataSourceResult<Vec<bool>>>()?
        };

        let affected = keep.iter().filter(|k| !**k).count() as u64;
        let mut keep = keep.into_iter();
        table_mut(&mut tables, plan.source())?.retain(|_| keep.next().unwrap_or(true));
        Ok(affected)
    }
}

impl DataSource for MemoryDataSource {
    fn schema(&self) -> &SchemaCatalog {
        &self.catalog
    }

    fn fetch(&self, plan: &QueryPlan) -> DataSourceResult<Vec<ResultRow>> {
        if plan.kind() != PlanKind::Read {
            return Err(DataSourceError::Unsupported(format!(
                "{} plan passed to fetch",
                plan.kind().as_str()
            )));
        }
        let tables = self.read_tables()?;
        let rows = read(&self.catalog, &tables, plan)?;
        Ok(rows.into_iter().map(ResultRow::new).collect())
    }

    fn mutate(&self, plan: &QueryPlan) -> DataSourceResult<u64> {
        match plan.kind() {
            PlanKind::Update => self.update(plan),
            PlanKind::Delete => self.delete(plan),
            PlanKind::Read => Err(DataSourceError::Unsupported(
                "READ plan passed to mutate".into(),
            )),
        }
    }
}

/// Runs a read plan against locked tables
pub(super) fn read(
    catalog: &SchemaCatalog,
    tables: &Tables,
    plan: &QueryPlan,
) -> DataSourceResult<Vec<Vec<Value>>> {
    let evaluator = Evaluator::new(catalog, tables, plan)?;

    let mut rows = table(tables, plan.source())?.clone();
    for relation in plan.joins() {
        rows = inner_join(catalog, tables, &evaluator, rows, relation)?;
    }

    let mut kept = Vec::with_capacity(rows.len());
    for row in rows {
        if selected(&evaluator, plan, &row)? {
            kept.push(row);
        }
    }

    let columns = plan.selection().columns();
    let order_by = plan.order_by();
    let output_row = |scope: Scope<'_>| -> DataSourceResult<SortableRow> {
        Ok(SortableRow {
            keys: order_by
                .iter()
                .map(|o| evaluator.eval(&o.expr, scope))
                .collect::<DataSourceResult<_>>()?,
            values: columns
                .iter()
                .map(|c| evaluator.eval(c.expr(), scope))
                .collect::<DataSourceResult<_>>()?,
        })
    };

    let mut output = if plan.is_aggregated() {
        group(&evaluator, &kept, plan)?
            .iter()
            .map(|g| output_row(Scope::Group(g)))
            .collect::<DataSourceResult<Vec<_>>>()?
    } else {
        kept.iter()
            .map(|row| output_row(Scope::Row(row)))
            .collect::<DataSourceResult<Vec<_>>>()?
    };

    if !order_by.is_empty() {
        let directions: Vec<SortDirection> = order_by.iter().map(|o| o.direction).collect();
        RowSorter::sort(&mut output, &directions);
    }

    let offset = usize::try_from(plan.offset()).unwrap_or(usize::MAX);
    let limit = plan
        .limit()
        .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
    Ok(output
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|row| row.values)
        .collect())
}

fn selected(evaluator: &Evaluator<'_>, plan: &QueryPlan, row: &[Value]) -> DataSourceResult<bool> {
    match plan.filter() {
        Some(filter) => evaluator.matches(filter, row),
        None => Ok(true),
    }
}

/// Pairs each row with every target row whose key equals its foreign key.
/// Rows without a partner, or with a null key, are dropped.
fn inner_join(
    catalog: &SchemaCatalog,
    tables: &Tables,
    evaluator: &Evaluator<'_>,
    rows: Table,
    relation: &Relation,
) -> DataSourceResult<Table> {
    let foreign_key = evaluator.position(relation.foreign_key())?;
    let target = catalog
        .entity(relation.to_entity())
        .map_err(|e| DataSourceError::Unsupported(e.to_string()))?;
    let target_key = target.position(relation.target_key()).ok_or_else(|| {
        DataSourceError::Evaluation(format!("relation '{}' has no target key", relation))
    })?;
    let target_rows = table(tables, relation.to_entity())?;

    let mut joined = Vec::new();
    for row in rows {
        let Some(key) = row.get(foreign_key) else {
            continue;
        };
        for target_row in target_rows {
            if target_row.get(target_key).is_some_and(|k| key.sql_eq(k)) {
                let mut combined = row.clone();
                combined.extend_from_slice(target_row);
                joined.push(combined);
            }
        }
    }
    Ok(joined)
}

/// Splits rows into groups in order of first appearance.
///
/// Without grouping keys the whole input is one group, even when empty, so
/// `count(*)` over no rows yields a single row with 0.
fn group<'r>(
    evaluator: &Evaluator<'_>,
    rows: &'r [Vec<Value>],
    plan: &QueryPlan,
) -> DataSourceResult<Vec<Vec<&'r [Value]>>> {
    if plan.group_by().is_empty() {
        return Ok(vec![rows.iter().map(Vec::as_slice).collect()]);
    }

    let mut keys: Vec<Vec<Value>> = Vec::new();
    let mut groups: Vec<Vec<&'r [Value]>> = Vec::new();
    for row in rows {
        let key = plan
            .group_by()
            .iter()
            .map(|e| evaluator.eval(e, Scope::Row(row)))
            .collect::<DataSourceResult<Vec<_>>>()?;
        match keys.iter().position(|k| same_group(k, &key)) {
            Some(i) => groups[i].push(row.as_slice()),
            None => {
                keys.push(key);
                groups.push(vec![row.as_slice()]);
            }
        }
    }
    Ok(groups)
}

/// Group keys compare equal when every component sorts equal; nulls group
/// together
fn same_group(a: &[Value], b: &[Value]) -> bool {
    a.iter().zip(b).all(|(x, y)| x.sort_cmp(y).is_eq())
}

fn coerce(field: &FieldRef, value: Value) -> DataSourceResult<Value> {
    match (field.value_type(), value) {
        (_, Value::Null) => Ok(Value::Null),
        (ValueType::Decimal, Value::Int(i)) => Ok(Value::Decimal(i as f64)),
        (expected, value) if value.value_type() == Some(expected) => Ok(value),
        (_, value) => Err(DataSourceError::Constraint(format!(
            "cannot store {} value in {}",
            value.type_name(),
            field
        ))),
    }
}

fn table<'t>(tables: &'t Tables, entity: &str) -> DataSourceResult<&'t Table> {
    tables
        .get(entity)
        .ok_or_else(|| DataSourceError::Unsupported(format!("no table for entity '{}'", entity)))
}

fn table_mut<'t>(tables: &'t mut Tables, entity: &str) -> DataSourceResult<&'t mut Table> {
    tables
        .get_mut(entity)
        .ok_or_else(|| DataSourceError::Unsupported(format!("no table for entity '{}'", entity)))
}
