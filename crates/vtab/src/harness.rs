//! Drives a module through plan → open → filter → next → close without SQLite.
//!
//! Adapter tests use this to check cursor behavior directly; constraint
//! values must be known up front (see [`Constraint::eq`]).

use crate::constraint::{Constraint, OrderBy};
use crate::cursor::{Args, TableModule};
use crate::error::{Error, Result};
use crate::plan::IndexPlan;
use crate::value::Value;

/// Rows produced by one scan, with the plan that produced them.
#[derive(Debug, Clone)]
pub struct Scan {
    pub plan: IndexPlan,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Scan {
    /// All values of the named column, in row order.
    pub fn column(&self, name: &str) -> Vec<Value> {
        match self.columns.iter().position(|c| c == name) {
            Some(idx) => self.rows.iter().map(|r| r[idx].clone()).collect(),
            None => Vec::new(),
        }
    }

    /// Text values of the named column; non-text values are skipped.
    pub fn strings(&self, name: &str) -> Vec<String> {
        self.column(name)
            .into_iter()
            .filter_map(|v| match v {
                Value::Text(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Collects the argv values for `plan` from the constraints it consumed.
pub fn arguments(plan: &IndexPlan, constraints: &[Constraint]) -> Result<Vec<Value>> {
    (1..=plan.arguments.len())
        .map(|argv| {
            plan.usage
                .iter()
                .position(|u| u.argv_index == Some(argv))
                .and_then(|i| constraints.get(i))
                .and_then(|c| c.value.clone())
                .ok_or_else(|| Error::invalid("arguments", format!("no value for argument {}", argv)))
        })
        .collect()
}

/// Plans and fully drains one scan of `module`.
pub fn scan(module: &dyn TableModule, constraints: &[Constraint], order_by: &[OrderBy]) -> Result<Scan> {
    scan_limit(module, constraints, order_by, usize::MAX)
}

/// Like [`scan`] but stops after `limit` rows.
pub fn scan_limit(
    module: &dyn TableModule,
    constraints: &[Constraint],
    order_by: &[OrderBy],
    limit: usize,
) -> Result<Scan> {
    let plan = module.plan(constraints, order_by)?;
    let args = Args::bind(&plan, arguments(&plan, constraints)?)?;
    let width = module.descriptor().len();

    let mut cursor = module.open()?;
    let mut rows = Vec::new();
    let result = (|| {
        cursor.filter(&plan, &args)?;
        while !cursor.eof() && rows.len() < limit {
            let row = (0..width)
                .map(|i| cursor.column(i))
                .collect::<Result<Vec<_>>>()?;
            rows.push(row);
            cursor.next()?;
        }
        Ok::<(), Error>(())
    })();
    cursor.close();
    result?;

    Ok(Scan {
        plan,
        columns: module
            .descriptor()
            .columns
            .iter()
            .map(|c| c.name.clone())
            .collect(),
        rows,
    })
}
