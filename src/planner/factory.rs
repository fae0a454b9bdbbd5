//! Query factory
//!
//! `QueryFactory` is the explicit entry point for plan construction. It holds
//! a borrowed schema catalog and nothing else mutable; builders it hands out
//! validate the frozen plan against that catalog in `build()`.
//!
//! Validation order is fixed:
//! 1. Source entity exists
//! 2. Joins start from an entity already in scope
//! 3. Every referenced field exists and is in scope
//! 4. Expressions type-check; sub-queries select exactly one column
//! 5. Aggregates appear only in selections and ordering
//! 6. Grouping covers every non-aggregated column
//! 7. Update assignments are non-empty and well-typed
//! 8. Checked constructor projections match their parameters

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::projection::{
    FieldTarget, Projection, ProjectionSpec, Projections, Projector, Tuple,
};
use crate::schema::{FieldRef, Relation, SchemaCatalog, SchemaError, ValueType};

use super::ast::Predicate;
use super::errors::{PlannerError, PlannerResult};
use super::explain::ExplainPlan;
use super::expr::{Column, Expr};
use super::plan::{Assignment, OrderSpec, PlanKind, QueryPlan, SortDirection};

/// Entry point for building query plans over one catalog
#[derive(Clone)]
pub struct QueryFactory<'a> {
    catalog: &'a SchemaCatalog,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl<'a> QueryFactory<'a> {
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        Self {
            catalog,
            metrics: None,
        }
    }

    /// Counts built and rejected plans in `metrics`
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn catalog(&self) -> &'a SchemaCatalog {
        self.catalog
    }

    /// Read plan mapped through `projection`
    pub fn select<T>(&self, projection: Projection<T>) -> SelectBuilder<'a, T> {
        SelectBuilder {
            draft: Draft::new(self),
            projection: Some(projection),
        }
    }

    /// Read plan selecting every field of `entity` as a tuple
    pub fn select_from(&self, entity: &str) -> SelectBuilder<'a, Tuple> {
        match self.catalog.entity(entity) {
            Ok(def) => self.select(Projections::tuple(def.fields())).from(entity),
            Err(e) => self.rejected(entity, e),
        }
    }

    /// Read plan materializing whole `entity` rows into `T`
    pub fn select_entity<T: FieldTarget>(&self, entity: &str) -> SelectBuilder<'a, T> {
        match self.catalog.entity(entity) {
            Ok(def) => self.select(Projections::fields::<T>(def.fields())).from(entity),
            Err(e) => self.rejected(entity, e),
        }
    }

    /// Bulk update of `entity`
    pub fn update(&self, entity: &str) -> UpdateBuilder<'a> {
        let mut draft = Draft::new(self);
        draft.source = Some(entity.to_string());
        UpdateBuilder { draft }
    }

    /// Bulk delete from `entity`
    pub fn delete(&self, entity: &str) -> DeleteBuilder<'a> {
        let mut draft = Draft::new(self);
        draft.source = Some(entity.to_string());
        DeleteBuilder { draft }
    }

    fn rejected<T>(&self, entity: &str, error: SchemaError) -> SelectBuilder<'a, T> {
        let mut draft = Draft::new(self);
        draft.source = Some(entity.to_string());
        draft.pending = Some(error.into());
        SelectBuilder {
            draft,
            projection: None,
        }
    }
}

impl fmt::Debug for QueryFactory<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryFactory").finish_non_exhaustive()
    }
}

/// Plan state shared by the three builders
struct Draft<'a> {
    catalog: &'a SchemaCatalog,
    metrics: Option<Arc<MetricsRegistry>>,
    source: Option<String>,
    joins: Vec<Relation>,
    filter: Option<Predicate>,
    group_by: Vec<Expr>,
    order_by: Vec<OrderSpec>,
    limit: Option<u64>,
    offset: u64,
    assignments: Vec<Assignment>,
    pending: Option<PlannerError>,
}

impl<'a> Draft<'a> {
    fn new(factory: &QueryFactory<'a>) -> Self {
        Self {
            catalog: factory.catalog,
            metrics: factory.metrics.clone(),
            source: None,
            joins: Vec::new(),
            filter: None,
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: 0,
            assignments: Vec::new(),
            pending: None,
        }
    }

    fn and_filter(&mut self, predicate: Predicate) {
        self.filter = Some(match self.filter.take() {
            Some(current) => current.and(predicate),
            None => predicate,
        });
    }

    /// Freezes the draft and runs validation, logging the outcome
    fn finish(
        self,
        kind: PlanKind,
        selection: ProjectionSpec,
        check_projection: impl FnOnce() -> PlannerResult<()>,
    ) -> PlannerResult<QueryPlan> {
        let catalog = self.catalog;
        let metrics = self.metrics.clone();
        let result = self.freeze(kind, selection).and_then(|plan| {
            Validator::new(catalog, &plan).validate()?;
            check_projection()?;
            Ok(plan)
        });

        match &result {
            Ok(plan) => {
                if let Some(metrics) = &metrics {
                    metrics.increment_plans_built();
                }
                let projection = plan.selection().to_string();
                log_event_with_fields(
                    Event::PlanBuilt,
                    &[
                        ("kind", plan.kind().as_str()),
                        ("source", plan.source()),
                        ("projection", projection.as_str()),
                    ],
                );
            }
            Err(e) => {
                if let Some(metrics) = &metrics {
                    metrics.increment_plans_rejected();
                }
                let reason = e.to_string();
                log_event_with_fields(
                    Event::PlanRejected,
                    &[
                        ("kind", kind.as_str()),
                        ("code", e.root_code()),
                        ("reason", reason.as_str()),
                    ],
                );
            }
        }
        result
    }

    fn freeze(self, kind: PlanKind, selection: ProjectionSpec) -> PlannerResult<QueryPlan> {
        if let Some(error) = self.pending {
            return Err(error);
        }
        let source = match self.source {
            Some(source) => source,
            // A read without `from` queries the entity of its first field
            None => selection
                .columns()
                .iter()
                .flat_map(|c| c.expr().fields())
                .map(|f| f.entity().to_string())
                .next()
                .ok_or_else(|| PlannerError::InvalidPlan("query has no source entity".into()))?,
        };
        Ok(QueryPlan {
            source,
            kind,
            selection,
            joins: self.joins,
            filter: self.filter,
            group_by: self.group_by,
            order_by: self.order_by,
            limit: self.limit,
            offset: self.offset,
            assignments: self.assignments,
        })
    }
}

/// Builder for read plans
pub struct SelectBuilder<'a, T> {
    draft: Draft<'a>,
    /// `None` when the builder was created for an unknown entity
    projection: Option<Projection<T>>,
}

impl<'a, T> SelectBuilder<'a, T> {
    /// Source entity
    pub fn from(mut self, entity: &str) -> Self {
        self.draft.source = Some(entity.to_string());
        self
    }

    /// Inner join along a relation of the source or of an already joined entity
    pub fn join(mut self, relation: &Relation) -> Self {
        self.draft.joins.push(relation.clone());
        self
    }

    /// ANDs `predicate` into the filter
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.draft.and_filter(predicate);
        self
    }

    /// ANDs every present predicate into the filter; absent ones are ignored
    pub fn filter_all(mut self, predicates: impl IntoIterator<Item = Option<Predicate>>) -> Self {
        for predicate in predicates.into_iter().flatten() {
            self.draft.and_filter(predicate);
        }
        self
    }

    pub fn group_by(mut self, keys: impl IntoIterator<Item = impl Into<Expr>>) -> Self {
        self.draft.group_by.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn order_by(mut self, expr: impl Into<Expr>, direction: SortDirection) -> Self {
        self.draft.order_by.push(OrderSpec {
            expr: expr.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.draft.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.draft.offset = offset;
        self
    }

    /// Validates and freezes the plan
    pub fn build(self) -> PlannerResult<Select<T>> {
        let Some(projection) = self.projection else {
            let selection = ProjectionSpec::empty();
            return Err(self
                .draft
                .finish(PlanKind::Read, selection, || Ok(()))
                .err()
                .unwrap_or_else(|| PlannerError::InvalidPlan("missing projection".into())));
        };
        let checked = projection.clone();
        let (selection, projector) = projection.into_parts();
        let plan = self.draft.finish(PlanKind::Read, selection, move || {
            checked.check_columns().map_err(PlannerError::from)
        })?;
        Ok(Select { plan, projector })
    }
}

/// Builder for bulk updates
pub struct UpdateBuilder<'a> {
    draft: Draft<'a>,
}

impl<'a> UpdateBuilder<'a> {
    /// Assigns `value` (a literal or an expression over the pre-update row)
    pub fn set(mut self, field: &FieldRef, value: impl Into<Expr>) -> Self {
        self.draft.assignments.push(Assignment {
            field: field.clone(),
            value: value.into(),
        });
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.draft.and_filter(predicate);
        self
    }

    pub fn filter_all(mut self, predicates: impl IntoIterator<Item = Option<Predicate>>) -> Self {
        for predicate in predicates.into_iter().flatten() {
            self.draft.and_filter(predicate);
        }
        self
    }

    pub fn build(self) -> PlannerResult<QueryPlan> {
        self.draft
            .finish(PlanKind::Update, ProjectionSpec::empty(), || Ok(()))
    }
}

/// Builder for bulk deletes
pub struct DeleteBuilder<'a> {
    draft: Draft<'a>,
}

impl<'a> DeleteBuilder<'a> {
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.draft.and_filter(predicate);
        self
    }

    pub fn filter_all(mut self, predicates: impl IntoIterator<Item = Option<Predicate>>) -> Self {
        for predicate in predicates.into_iter().flatten() {
            self.draft.and_filter(predicate);
        }
        self
    }

    pub fn build(self) -> PlannerResult<QueryPlan> {
        self.draft
            .finish(PlanKind::Delete, ProjectionSpec::empty(), || Ok(()))
    }
}

/// A validated read plan paired with its projector
pub struct Select<T> {
    plan: QueryPlan,
    projector: Projector<T>,
}

impl<T> Clone for Select<T> {
    fn clone(&self) -> Self {
        Self {
            plan: self.plan.clone(),
            projector: self.projector,
        }
    }
}

impl<T> fmt::Debug for Select<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Select").field("plan", &self.plan).finish()
    }
}

impl<T> Select<T> {
    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    pub fn projector(&self) -> Projector<T> {
        self.projector
    }

    /// Uses this single-column read as a scalar sub-query
    pub fn into_subquery(self) -> Expr {
        Expr::subquery(self.plan)
    }

    pub fn explain(&self) -> ExplainPlan {
        ExplainPlan::from_plan(&self.plan)
    }
}

/// Checks one frozen plan against the catalog
struct Validator<'p> {
    catalog: &'p SchemaCatalog,
    plan: &'p QueryPlan,
    scope: HashSet<&'p str>,
}

impl<'p> Validator<'p> {
    fn new(catalog: &'p SchemaCatalog, plan: &'p QueryPlan) -> Self {
        Self {
            catalog,
            plan,
            scope: HashSet::new(),
        }
    }

    fn validate(mut self) -> PlannerResult<()> {
        let plan = self.plan;
        self.catalog.entity(&plan.source)?;
        self.scope.insert(plan.source.as_str());

        self.check_joins()?;

        let columns = plan.selection.columns();
        let mut exprs: Vec<&Expr> = columns.iter().map(Column::expr).collect();
        exprs.extend(plan.group_by.iter());
        exprs.extend(plan.order_by.iter().map(|o| &o.expr));
        exprs.extend(plan.assignments.iter().map(|a| &a.value));
        let operand_exprs = plan.filter.as_ref().map(Predicate::operand_exprs).unwrap_or_default();
        exprs.extend(operand_exprs.iter().copied());

        for expr in &exprs {
            for field in expr.fields() {
                self.check_field(field)?;
            }
            for subquery in expr.subqueries() {
                check_subquery(subquery)?;
            }
            expr.check()?;
        }
        if let Some(filter) = &plan.filter {
            for field in filter.fields() {
                self.check_field(field)?;
            }
        }

        if operand_exprs.iter().any(|e| e.contains_aggregate()) {
            return Err(PlannerError::InvalidPlan(
                "aggregates are not allowed in a filter".into(),
            ));
        }
        if plan.group_by.iter().any(Expr::contains_aggregate) {
            return Err(PlannerError::InvalidPlan(
                "aggregates are not allowed in group by".into(),
            ));
        }
        if !plan.is_aggregated() && plan.order_by.iter().any(|o| o.expr.contains_aggregate()) {
            return Err(PlannerError::InvalidPlan(
                "aggregates in order by require an aggregated selection".into(),
            ));
        }

        self.check_grouping()?;

        match plan.kind {
            PlanKind::Update => self.check_assignments(),
            PlanKind::Read | PlanKind::Delete => Ok(()),
        }
    }

    fn check_joins(&mut self) -> PlannerResult<()> {
        let plan = self.plan;
        if plan.kind != PlanKind::Read && !plan.joins.is_empty() {
            return Err(PlannerError::invalid_join(
                plan.joins[0].to_string(),
                "bulk writes cannot join",
            ));
        }
        for relation in &plan.joins {
            if !self.scope.contains(relation.from_entity()) {
                return Err(PlannerError::invalid_join(
                    relation.to_string(),
                    format!("'{}' is not part of the query", relation.from_entity()),
                ));
            }
            let declared = self
                .catalog
                .relation(relation.from_entity(), relation.name())?;
            if declared != *relation {
                return Err(PlannerError::invalid_join(
                    relation.to_string(),
                    "does not match the catalog definition",
                ));
            }
            if !self.scope.insert(relation.to_entity()) {
                return Err(PlannerError::invalid_join(
                    relation.to_string(),
                    format!("'{}' is already joined", relation.to_entity()),
                ));
            }
        }
        Ok(())
    }

    fn check_field(&self, field: &FieldRef) -> PlannerResult<()> {
        self.catalog.validate_field(field)?;
        if !self.scope.contains(field.entity()) {
            return Err(PlannerError::not_in_scope(
                field.qualified_name(),
                &self.plan.source,
            ));
        }
        Ok(())
    }

    /// Every non-aggregated column or order key must be covered by group by
    fn check_grouping(&self) -> PlannerResult<()> {
        if !self.plan.is_aggregated() {
            return Ok(());
        }
        let keys = &self.plan.group_by;
        let key_fields: Vec<&FieldRef> = keys
            .iter()
            .filter_map(|k| match k {
                Expr::Field(f) => Some(f),
                _ => None,
            })
            .collect();
        let grouped = |expr: &Expr| {
            keys.contains(expr)
                || expr.bare_fields().iter().all(|f| key_fields.contains(f))
        };

        for column in self.plan.selection.columns() {
            if !grouped(column.expr()) {
                return Err(PlannerError::NotGrouped(column.expr().to_string()));
            }
        }
        for order in &self.plan.order_by {
            if !grouped(&order.expr) {
                return Err(PlannerError::NotGrouped(order.expr.to_string()));
            }
        }
        Ok(())
    }

    fn check_assignments(&self) -> PlannerResult<()> {
        if self.plan.assignments.is_empty() {
            return Err(PlannerError::EmptyUpdate(self.plan.source.clone()));
        }
        for assignment in &self.plan.assignments {
            let field = &assignment.field;
            if field.entity() != self.plan.source {
                return Err(PlannerError::not_in_scope(
                    field.qualified_name(),
                    &self.plan.source,
                ));
            }
            if assignment.value.contains_aggregate() {
                return Err(PlannerError::InvalidPlan(format!(
                    "aggregate assigned to '{}'",
                    field.qualified_name()
                )));
            }
            match assignment.value.value_type() {
                None => {}
                Some(t) if t == field.value_type() => {}
                Some(ValueType::Int) if field.value_type() == ValueType::Decimal => {}
                Some(t) => return Err(SchemaError::mismatch(field, t.type_name()).into()),
            }
        }
        Ok(())
    }
}

fn check_subquery(plan: &QueryPlan) -> PlannerResult<()> {
    if plan.kind != PlanKind::Read {
        return Err(PlannerError::InvalidSubquery(format!(
            "{} plan used as a value",
            plan.kind.as_str()
        )));
    }
    let columns = plan.selection.columns().len();
    if columns != 1 {
        return Err(PlannerError::InvalidSubquery(format!(
            "selects {} columns, expected exactly one",
            columns
        )));
    }
    Ok(())
}
