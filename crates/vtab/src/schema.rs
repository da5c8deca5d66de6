//! Column and table descriptors.

use crate::constraint::Operator;
use crate::error::{Error, Result};

/// Declared SQL type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    Boolean,
    Timestamp,
    Json,
}

impl ColumnType {
    /// Type name used in the `CREATE TABLE` declaration.
    pub fn sql_name(self) -> &'static str {
        match self {
            ColumnType::Text | ColumnType::Json => "TEXT",
            ColumnType::Integer | ColumnType::Boolean => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Timestamp => "DATETIME",
        }
    }
}

/// Orderings a table can produce natively for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderSupport {
    #[default]
    None,
    Asc,
    Desc,
    Both,
}

impl OrderSupport {
    pub fn supports(self, desc: bool) -> bool {
        match self {
            OrderSupport::None => false,
            OrderSupport::Asc => !desc,
            OrderSupport::Desc => desc,
            OrderSupport::Both => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub ty: ColumnType,
    /// Parameter-only column, not projected by `SELECT *`.
    pub hidden: bool,
    pub not_null: bool,
    pub filters: Vec<Operator>,
    pub order: OrderSupport,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            hidden: false,
            not_null: false,
            filters: Vec::new(),
            order: OrderSupport::None,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Integer)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Boolean)
    }

    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Timestamp)
    }

    pub fn json(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Json)
    }

    /// Hidden parameter column; hidden columns always accept equality.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        if !self.filters.contains(&Operator::Eq) {
            self.filters.push(Operator::Eq);
        }
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn filter(mut self, ops: &[Operator]) -> Self {
        for op in ops {
            if !self.filters.contains(op) {
                self.filters.push(*op);
            }
        }
        self
    }

    pub fn order(mut self, order: OrderSupport) -> Self {
        self.order = order;
        self
    }

    pub fn accepts(&self, op: Operator) -> bool {
        self.filters.contains(&op)
    }

    fn declaration(&self) -> String {
        let mut decl = format!("\"{}\" {}", self.name, self.ty.sql_name());
        if self.hidden {
            decl.push_str(" HIDDEN");
        }
        if self.not_null {
            decl.push_str(" NOT NULL");
        }
        decl
    }
}

/// Ordered column list of a table.
///
/// Hidden columns come first, in the order a table-valued function call
/// supplies its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    /// Builds a descriptor, rejecting duplicate names and hidden columns that
    /// follow a visible one.
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Result<Self> {
        let name = name.into();
        let mut seen_visible = false;
        for (i, column) in columns.iter().enumerate() {
            if column.hidden && seen_visible {
                return Err(Error::Descriptor {
                    table: name,
                    reason: format!("hidden column {} follows a visible column", column.name),
                });
            }
            seen_visible |= !column.hidden;
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(Error::Descriptor {
                    table: name,
                    reason: format!("duplicate column {}", column.name),
                });
            }
        }
        if !seen_visible {
            return Err(Error::Descriptor {
                table: name,
                reason: "no visible columns".into(),
            });
        }
        Ok(Self { name, columns })
    }

    pub fn column(&self, index: usize) -> Option<&ColumnDescriptor> {
        self.columns.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Number of leading hidden (argument) columns.
    pub fn arity(&self) -> usize {
        self.columns.iter().take_while(|c| c.hidden).count()
    }

    /// The `CREATE TABLE` statement handed to SQLite when the module connects.
    pub fn create_sql(&self) -> String {
        let cols: Vec<String> = self.columns.iter().map(ColumnDescriptor::declaration).collect();
        format!("CREATE TABLE x({})", cols.join(", "))
    }
}
