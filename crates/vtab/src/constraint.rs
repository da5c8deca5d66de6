//! Predicate model handed to planners: constraints and requested ordering.

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Comparison operators a table can consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
        }
    }
}

/// One term of a WHERE clause (or a table-valued function argument).
///
/// `value` is only known when the caller has the literal at planning time;
/// SQLite supplies values later, at `filter`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub column: usize,
    pub op: Operator,
    pub usable: bool,
    pub value: Option<Value>,
}

impl Constraint {
    pub fn new(column: usize, op: Operator) -> Self {
        Self {
            column,
            op,
            usable: true,
            value: None,
        }
    }

    /// An equality constraint whose literal is known up front.
    pub fn eq(column: usize, value: impl Into<Value>) -> Self {
        Self {
            column,
            op: Operator::Eq,
            usable: true,
            value: Some(value.into()),
        }
    }

    pub fn unusable(mut self) -> Self {
        self.usable = false;
        self
    }
}

/// One ORDER BY term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub column: usize,
    pub desc: bool,
}

impl OrderBy {
    pub fn asc(column: usize) -> Self {
        Self { column, desc: false }
    }

    pub fn desc(column: usize) -> Self {
        Self { column, desc: true }
    }
}
