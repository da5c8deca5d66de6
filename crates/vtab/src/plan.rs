//! Index plans and the planner helper every table uses to build one.

use crate::constraint::{Constraint, Operator, OrderBy};
use crate::error::{Error, Result};
use crate::schema::TableDescriptor;
use serde::{Deserialize, Serialize};

/// Cost of resolving one item directly.
pub const POINT_COST: f64 = 1.0;
/// Cost of scanning a source from its beginning.
pub const SCAN_COST: f64 = 1_000_000.0;

/// How the planner uses one input constraint.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConstraintUsage {
    /// 1-based position of the constraint's value among the `filter` arguments.
    pub argv_index: Option<usize>,
    /// The cursor fully enforces the constraint; the engine need not re-check.
    pub omit: bool,
}

/// Column and operator behind one `filter` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgSlot {
    pub column: usize,
    pub op: Operator,
}

/// Ordering delegated to the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeOrder {
    pub column: usize,
    /// Source-specific field name, e.g. a GraphQL `OrderBy` field.
    pub field: String,
    pub desc: bool,
}

/// Result of planning one table reference. Immutable once handed to a cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexPlan {
    /// One entry per constraint given to the planner, in the same order.
    pub usage: Vec<ConstraintUsage>,
    /// Layout of the `filter` arguments, in argv order.
    pub arguments: Vec<ArgSlot>,
    pub access_path: i32,
    pub access_name: String,
    pub estimated_cost: f64,
    pub estimated_rows: i64,
    pub order_by_consumed: bool,
    pub native_order: Option<NativeOrder>,
}

impl Default for IndexPlan {
    fn default() -> Self {
        Self {
            usage: Vec::new(),
            arguments: Vec::new(),
            access_path: 0,
            access_name: "scan".into(),
            estimated_cost: SCAN_COST,
            estimated_rows: 1_000_000,
            order_by_consumed: false,
            native_order: None,
        }
    }
}

impl IndexPlan {
    /// True when the plan binds a value for `column` with operator `op`.
    pub fn binds(&self, column: usize, op: Operator) -> bool {
        self.arguments
            .iter()
            .any(|slot| slot.column == column && slot.op == op)
    }
}

/// Builds an [`IndexPlan`] for one table invocation.
///
/// ```ignore
/// let mut planner = Planner::new(descriptor, constraints);
/// planner.require_eq(OWNER)?;
/// planner.consume_arg(NAME)?;
/// planner.point_access("repository");
/// planner.order_by(order_by, |col| native_field(col));
/// let plan = planner.finish();
/// ```
pub struct Planner<'a> {
    table: &'a TableDescriptor,
    constraints: &'a [Constraint],
    plan: IndexPlan,
}

impl<'a> Planner<'a> {
    pub fn new(table: &'a TableDescriptor, constraints: &'a [Constraint]) -> Self {
        let plan = IndexPlan {
            usage: vec![ConstraintUsage::default(); constraints.len()],
            ..IndexPlan::default()
        };
        Self {
            table,
            constraints,
            plan,
        }
    }

    pub fn table(&self) -> &TableDescriptor {
        self.table
    }

    /// Consumes the first usable equality constraint on an optional lookup
    /// column, if any.
    ///
    /// Unusable constraints are skipped and left for the engine to check, so
    /// the table falls back to the access path it uses without the value.
    pub fn consume_eq(&mut self, column: usize) -> Option<&'a Constraint> {
        self.take_eq(column).ok().flatten()
    }

    /// Consumes the first usable equality constraint on an argument column.
    ///
    /// Returns [`Error::Unusable`] when equality constraints on the column
    /// exist but none is usable, so the engine can retry with another join
    /// order instead of treating the argument as absent.
    pub fn consume_arg(&mut self, column: usize) -> Result<Option<&'a Constraint>> {
        self.take_eq(column)
    }

    /// Like [`Planner::consume_arg`] but a missing constraint is a planning error.
    pub fn require_eq(&mut self, column: usize) -> Result<&'a Constraint> {
        self.consume_arg(column)?
            .ok_or_else(|| Error::MissingArgument(self.column_name(column)))
    }

    /// Consumes every usable equality constraint on a hidden column that has
    /// not already been consumed; table-valued function arguments must all
    /// reach the cursor.
    pub fn consume_hidden(&mut self) -> Result<()> {
        for column in 0..self.table.arity() {
            self.consume_arg(column)?;
        }
        Ok(())
    }

    fn take_eq(&mut self, column: usize) -> Result<Option<&'a Constraint>> {
        let mut saw_unusable = false;
        for (i, constraint) in self.constraints.iter().enumerate() {
            if constraint.column != column || constraint.op != Operator::Eq {
                continue;
            }
            if !constraint.usable {
                saw_unusable = true;
                continue;
            }
            if self.plan.usage[i].argv_index.is_none() {
                self.plan.arguments.push(ArgSlot {
                    column,
                    op: Operator::Eq,
                });
                self.plan.usage[i] = ConstraintUsage {
                    argv_index: Some(self.plan.arguments.len()),
                    omit: true,
                };
            }
            return Ok(Some(constraint));
        }
        if saw_unusable {
            Err(Error::Unusable(self.column_name(column)))
        } else {
            Ok(None)
        }
    }

    /// Switches the plan to a direct lookup of a single item.
    pub fn point_access(&mut self, access_path: i32, name: &str) {
        self.plan.access_path = access_path;
        self.plan.access_name = name.to_string();
        self.plan.estimated_cost = POINT_COST;
        self.plan.estimated_rows = 1;
    }

    /// Sets the scan access path with an explicit cost and row estimate.
    pub fn scan_access(&mut self, access_path: i32, name: &str, cost: f64, rows: i64) {
        self.plan.access_path = access_path;
        self.plan.access_name = name.to_string();
        self.plan.estimated_cost = cost;
        self.plan.estimated_rows = rows;
    }

    /// Claims a single-column ORDER BY when `native` maps the column to a
    /// source ordering field that supports the requested direction.
    pub fn order_by<F>(&mut self, order_by: &[OrderBy], native: F) -> Option<&NativeOrder>
    where
        F: Fn(usize) -> Option<String>,
    {
        let [term] = order_by else {
            return None;
        };
        let column = self.table.column(term.column)?;
        if !column.order.supports(term.desc) {
            return None;
        }
        let field = native(term.column)?;
        self.plan.order_by_consumed = true;
        self.plan.native_order = Some(NativeOrder {
            column: term.column,
            field,
            desc: term.desc,
        });
        self.plan.native_order.as_ref()
    }

    pub fn finish(self) -> IndexPlan {
        tracing::debug!(
            table = %self.table.name,
            access = %self.plan.access_name,
            cost = self.plan.estimated_cost,
            args = self.plan.arguments.len(),
            ordered = self.plan.order_by_consumed,
            "planned"
        );
        self.plan
    }

    fn column_name(&self, column: usize) -> String {
        self.table
            .column(column)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("#{}", column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDescriptor, OrderSupport};

    fn table() -> TableDescriptor {
        TableDescriptor::new(
            "github_stargazers",
            vec![
                ColumnDescriptor::text("owner").hidden(),
                ColumnDescriptor::text("reponame").hidden(),
                ColumnDescriptor::text("login"),
                ColumnDescriptor::timestamp("starred_at").order(OrderSupport::Both),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_consume_eq_assigns_argv_in_order() {
        let table = table();
        let constraints = vec![
            Constraint::new(1, Operator::Eq),
            Constraint::new(0, Operator::Eq),
        ];
        let mut planner = Planner::new(&table, &constraints);
        planner.require_eq(0).unwrap();
        planner.consume_arg(1).unwrap();
        let plan = planner.finish();

        assert_eq!(plan.usage[1].argv_index, Some(1));
        assert_eq!(plan.usage[0].argv_index, Some(2));
        assert!(plan.usage.iter().all(|u| u.omit));
        assert_eq!(
            plan.arguments,
            vec![
                ArgSlot { column: 0, op: Operator::Eq },
                ArgSlot { column: 1, op: Operator::Eq },
            ]
        );
    }

    #[test]
    fn test_missing_required_is_planning_error() {
        let table = table();
        let mut planner = Planner::new(&table, &[]);
        let err = planner.require_eq(0).unwrap_err();
        assert!(err.is_planning());
        assert_eq!(err.to_string(), "missing required argument: owner");
    }

    #[test]
    fn test_unusable_only_constraint() {
        let table = table();
        let constraints = vec![Constraint::new(0, Operator::Eq).unusable()];
        let mut planner = Planner::new(&table, &constraints);
        assert!(matches!(planner.require_eq(0), Err(Error::Unusable(_))));
    }

    #[test]
    fn test_unusable_optional_lookup_is_left_to_engine() {
        let table = table();
        let constraints = vec![
            Constraint::new(0, Operator::Eq),
            Constraint::new(2, Operator::Eq).unusable(),
        ];
        let mut planner = Planner::new(&table, &constraints);
        planner.consume_hidden().unwrap();
        assert!(planner.consume_eq(2).is_none());
        let plan = planner.finish();

        assert_eq!(plan.usage[1], ConstraintUsage::default());
        assert_eq!(plan.arguments, vec![ArgSlot { column: 0, op: Operator::Eq }]);
        assert_eq!(plan.access_name, "scan");
    }

    #[test]
    fn test_unusable_hidden_argument_rejects_join_order() {
        let table = table();
        let constraints = vec![Constraint::new(1, Operator::Eq).unusable()];
        let mut planner = Planner::new(&table, &constraints);
        assert!(matches!(planner.consume_hidden(), Err(Error::Unusable(name)) if name == "reponame"));
    }

    #[test]
    fn test_non_eq_constraints_ignored() {
        let table = table();
        let constraints = vec![Constraint::new(0, Operator::Gt)];
        let mut planner = Planner::new(&table, &constraints);
        assert!(planner.consume_eq(0).is_none());
        assert_eq!(planner.finish().usage[0], ConstraintUsage::default());
    }

    #[test]
    fn test_order_by_single_native_column() {
        let table = table();
        let mut planner = Planner::new(&table, &[]);
        let native = planner
            .order_by(&[OrderBy::desc(3)], |_| Some("STARRED_AT".into()))
            .cloned();
        assert_eq!(
            native,
            Some(NativeOrder {
                column: 3,
                field: "STARRED_AT".into(),
                desc: true
            })
        );
        assert!(planner.finish().order_by_consumed);
    }

    #[test]
    fn test_order_by_rejects_multi_column_and_unmapped() {
        let table = table();
        let mut planner = Planner::new(&table, &[]);
        assert!(planner
            .order_by(&[OrderBy::asc(3), OrderBy::asc(2)], |_| Some("X".into()))
            .is_none());
        assert!(planner.order_by(&[OrderBy::asc(2)], |_| Some("X".into())).is_none());
        assert!(!planner.finish().order_by_consumed);
    }

    #[test]
    fn test_point_access_cost() {
        let table = table();
        let mut planner = Planner::new(&table, &[]);
        planner.point_access(1, "lookup");
        let plan = planner.finish();
        assert_eq!(plan.estimated_cost, POINT_COST);
        assert_eq!(plan.estimated_rows, 1);
        assert!(plan.estimated_cost < IndexPlan::default().estimated_cost);
    }
}
