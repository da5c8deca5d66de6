//! SQLite binding: exposes any [`TableModule`] as an eponymous virtual table.
//!
//! Registered tables can be called as table-valued functions
//! (`SELECT * FROM commits('/path/to/repo')`) or constrained through their
//! hidden columns (`SELECT * FROM commits WHERE repository = '...'`).

use std::os::raw::c_int;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::ffi;
use rusqlite::types::Value as SqlValue;
use rusqlite::vtab::{
    eponymous_only_module, Context, IndexConstraintOp, IndexInfo, VTab, VTabConnection,
    VTabCursor, Values,
};
use rusqlite::Connection;

use crate::constraint::{Constraint, Operator, OrderBy};
use crate::cursor::{Args, Cursor, TableModule};
use crate::error::Error;
use crate::plan::IndexPlan;
use crate::value::Value;

/// Registers `module` on `conn` under its table name.
pub(crate) fn install(conn: &Connection, module: Arc<dyn TableModule>) -> rusqlite::Result<()> {
    let name = module.name().to_string();
    conn.create_module(&name, eponymous_only_module::<ModuleTable>(), Some(module))
}

fn operator(op: IndexConstraintOp) -> Option<Operator> {
    match op {
        IndexConstraintOp::SQLITE_INDEX_CONSTRAINT_EQ => Some(Operator::Eq),
        IndexConstraintOp::SQLITE_INDEX_CONSTRAINT_GT => Some(Operator::Gt),
        IndexConstraintOp::SQLITE_INDEX_CONSTRAINT_GE => Some(Operator::Ge),
        IndexConstraintOp::SQLITE_INDEX_CONSTRAINT_LT => Some(Operator::Lt),
        IndexConstraintOp::SQLITE_INDEX_CONSTRAINT_LE => Some(Operator::Le),
        _ => None,
    }
}

fn to_sqlite(err: Error) -> rusqlite::Error {
    match err {
        // Lets SQLite discard this join order and try another.
        Error::Unusable(_) => {
            rusqlite::Error::SqliteFailure(ffi::Error::new(ffi::SQLITE_CONSTRAINT), None)
        }
        Error::Sql(inner) => inner,
        other => rusqlite::Error::ModuleError(other.to_string()),
    }
}

#[repr(C)]
struct ModuleTable {
    /// Must be first.
    base: ffi::sqlite3_vtab,
    module: Arc<dyn TableModule>,
    /// Plans chosen by `best_index`, referenced from `filter` by `idx_num`.
    plans: Mutex<Vec<IndexPlan>>,
}

impl ModuleTable {
    fn intern(&self, plan: IndexPlan) -> c_int {
        let mut plans = self.plans.lock();
        let idx = match plans.iter().position(|p| *p == plan) {
            Some(idx) => idx,
            None => {
                plans.push(plan);
                plans.len() - 1
            }
        };
        idx as c_int
    }

    fn plan(&self, idx_num: c_int) -> rusqlite::Result<IndexPlan> {
        let plans = self.plans.lock();
        usize::try_from(idx_num)
            .ok()
            .and_then(|idx| plans.get(idx))
            .cloned()
            .ok_or_else(|| {
                rusqlite::Error::ModuleError(format!(
                    "{}: unknown plan {}",
                    self.module.name(),
                    idx_num
                ))
            })
    }
}

unsafe impl<'vtab> VTab<'vtab> for ModuleTable {
    type Aux = Arc<dyn TableModule>;
    type Cursor = ModuleCursor<'vtab>;

    fn connect(
        _db: &mut VTabConnection,
        aux: Option<&Self::Aux>,
        _args: &[&[u8]],
    ) -> rusqlite::Result<(String, Self)> {
        let module = aux
            .cloned()
            .ok_or_else(|| rusqlite::Error::ModuleError("table module missing".into()))?;
        let sql = module.descriptor().create_sql();
        Ok((
            sql,
            ModuleTable {
                base: ffi::sqlite3_vtab::default(),
                module,
                plans: Mutex::new(Vec::new()),
            },
        ))
    }

    fn best_index(&self, info: &mut IndexInfo) -> rusqlite::Result<()> {
        let descriptor = self.module.descriptor();

        // Positions (in SQLite's constraint array) of the constraints we expose.
        let mut positions = Vec::new();
        let mut constraints = Vec::new();
        for (pos, c) in info.constraints().enumerate() {
            let Ok(column) = usize::try_from(c.column()) else {
                continue;
            };
            let Some(op) = operator(c.operator()) else {
                continue;
            };
            let filterable = descriptor
                .column(column)
                .map(|col| col.accepts(op))
                .unwrap_or(false);
            if !filterable {
                continue;
            }
            positions.push(pos);
            constraints.push(Constraint {
                column,
                op,
                usable: c.is_usable(),
                value: None,
            });
        }

        let order_by: Vec<OrderBy> = info
            .order_bys()
            .map(|o| {
                usize::try_from(o.column()).map(|column| OrderBy {
                    column,
                    desc: o.is_order_by_desc(),
                })
            })
            .collect::<std::result::Result<_, _>>()
            .unwrap_or_default();

        let plan = self.module.plan(&constraints, &order_by).map_err(to_sqlite)?;

        for (usage, pos) in plan.usage.iter().zip(&positions) {
            if let Some(argv_index) = usage.argv_index {
                let mut constraint_usage = info.constraint_usage(*pos);
                constraint_usage.set_argv_index(argv_index as c_int);
                constraint_usage.set_omit(usage.omit);
            }
        }
        info.set_order_by_consumed(plan.order_by_consumed);
        info.set_estimated_cost(plan.estimated_cost);
        info.set_estimated_rows(plan.estimated_rows);
        let idx_num = self.intern(plan);
        info.set_idx_num(idx_num);
        Ok(())
    }

    fn open(&'vtab mut self) -> rusqlite::Result<ModuleCursor<'vtab>> {
        let cursor = self.module.open().map_err(to_sqlite)?;
        Ok(ModuleCursor {
            base: ffi::sqlite3_vtab_cursor::default(),
            table: self,
            cursor,
            rowid: 0,
        })
    }
}

#[repr(C)]
struct ModuleCursor<'vtab> {
    /// Must be first.
    base: ffi::sqlite3_vtab_cursor,
    table: &'vtab ModuleTable,
    cursor: Box<dyn Cursor>,
    rowid: i64,
}

unsafe impl VTabCursor for ModuleCursor<'_> {
    fn filter(
        &mut self,
        idx_num: c_int,
        _idx_str: Option<&str>,
        args: &Values<'_>,
    ) -> rusqlite::Result<()> {
        let plan = self.table.plan(idx_num)?;
        let values = (0..args.len())
            .map(|i| args.get::<SqlValue>(i).map(Value::from))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let args = Args::bind(&plan, values).map_err(to_sqlite)?;
        self.rowid = 0;
        self.cursor.filter(&plan, &args).map_err(to_sqlite)
    }

    fn next(&mut self) -> rusqlite::Result<()> {
        self.rowid += 1;
        self.cursor.next().map_err(to_sqlite)
    }

    fn eof(&self) -> bool {
        self.cursor.eof()
    }

    fn column(&self, ctx: &mut Context, i: c_int) -> rusqlite::Result<()> {
        let index = usize::try_from(i).map_err(|_| to_sqlite(Error::ColumnOutOfRange(0)))?;
        let value = self.cursor.column(index).map_err(to_sqlite)?;
        ctx.set_result(&SqlValue::from(value))
    }

    fn rowid(&self) -> rusqlite::Result<i64> {
        Ok(self.rowid)
    }
}

impl Drop for ModuleCursor<'_> {
    fn drop(&mut self) {
        self.cursor.close();
    }
}
