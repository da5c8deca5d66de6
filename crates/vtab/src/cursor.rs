//! The cursor protocol every adapter implements.

use crate::constraint::{Constraint, Operator, OrderBy};
use crate::error::{Error, Result};
use crate::plan::IndexPlan;
use crate::schema::TableDescriptor;
use crate::value::Value;

/// Values bound to a plan's argument slots at `filter` time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    bound: Vec<(usize, Operator, Value)>,
}

impl Args {
    /// Pairs `values` (argv order) with the plan's argument layout.
    pub fn bind(plan: &IndexPlan, values: Vec<Value>) -> Result<Self> {
        if values.len() != plan.arguments.len() {
            return Err(Error::invalid(
                "arguments",
                format!(
                    "plan expects {} values, got {}",
                    plan.arguments.len(),
                    values.len()
                ),
            ));
        }
        let bound = plan
            .arguments
            .iter()
            .zip(values)
            .map(|(slot, value)| (slot.column, slot.op, value))
            .collect();
        Ok(Self { bound })
    }

    /// Equality value for `column`; a SQL NULL argument counts as absent.
    pub fn get(&self, column: usize) -> Option<&Value> {
        self.bound
            .iter()
            .find(|(c, op, v)| *c == column && *op == Operator::Eq && !v.is_null())
            .map(|(_, _, v)| v)
    }

    /// Equality value bound for `column`, SQL NULL included. `None` only when
    /// the plan binds no value for the column.
    pub fn bound(&self, column: usize) -> Option<&Value> {
        self.bound
            .iter()
            .find(|(c, op, _)| *c == column && *op == Operator::Eq)
            .map(|(_, _, v)| v)
    }

    pub fn text(&self, column: usize) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    pub fn integer(&self, column: usize) -> Option<i64> {
        self.get(column).and_then(Value::as_i64)
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }
}

/// Stateful, forward-only row iterator.
///
/// The engine calls `filter` once per scan (possibly again on the same
/// cursor to restart it), then alternates `eof`/`column`/`next` until `eof`
/// reports true, and finally `close`. `column` is only valid while a row is
/// current; once end-of-data is observed it stays observed until the next
/// `filter`.
pub trait Cursor {
    fn filter(&mut self, plan: &IndexPlan, args: &Args) -> Result<()>;

    fn next(&mut self) -> Result<()>;

    fn eof(&self) -> bool;

    fn column(&self, index: usize) -> Result<Value>;

    /// Releases every resource the cursor owns. Must be idempotent.
    fn close(&mut self);
}

/// A table adapter: plans invocations and opens cursors.
pub trait TableModule: Send + Sync {
    fn descriptor(&self) -> &TableDescriptor;

    fn name(&self) -> &str {
        &self.descriptor().name
    }

    fn plan(&self, constraints: &[Constraint], order_by: &[OrderBy]) -> Result<IndexPlan>;

    fn open(&self) -> Result<Box<dyn Cursor>>;
}
