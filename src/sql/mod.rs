pub mod compiler;
pub mod dialect;
pub mod filter;
pub mod types;
pub mod value;

pub use compiler::{
    Assignment, CompiledQuery, Compiler, CountPlan, CountRequest, DeleteRequest, InsertRequest,
    OrderBy, SelectRequest, UpdateRequest,
};
pub use dialect::Dialect;
pub use filter::{ActiveFilter, ConcatOperator, Operator, SortDirection};
pub use types::{SqlExpr, SqlWriter};
pub use value::{Row, Value};
