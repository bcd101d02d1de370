use serde_json::{json, Map, Value as Json};

use super::drizzle::table_var;
use super::naming::{camel_case, js_string, literal_key, member};
use crate::error::CompileError;
use crate::sql::{ActiveFilter, Compiler, Dialect, Operator, SelectRequest, Value};

fn first_json(filter: &ActiveFilter) -> Json {
    filter
        .operands()
        .first()
        .map(Value::to_json)
        .unwrap_or(Json::Null)
}

fn array_json(filter: &ActiveFilter) -> Json {
    Json::Array(filter.operands().iter().map(Value::to_json).collect())
}

pub(super) fn sql(table: &str, filters: &[ActiveFilter], dialect: Dialect) -> Result<String, CompileError> {
    let request = SelectRequest {
        table: table.to_string(),
        filters: filters.to_vec(),
        ..Default::default()
    };
    let compiled = Compiler::inline(dialect).compile_select(&request)?;
    Ok(format!("{};", compiled.sql))
}

/// JS object literal in `JSON.stringify(v, null, 2)` layout with unquoted
/// keys where the key is a valid identifier.
fn js_object(value: &Json, indent: usize) -> String {
    let pad = "  ".repeat(indent + 1);
    let close = "  ".repeat(indent);
    match value {
        Json::Object(map) if !map.is_empty() => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}{}: {}", pad, literal_key(k), js_object(v, indent + 1)))
                .collect();
            format!("{{\n{}\n{}}}", entries.join(",\n"), close)
        }
        Json::Array(items) if !items.is_empty() => {
            let entries: Vec<String> = items
                .iter()
                .map(|v| format!("{}{}", pad, js_object(v, indent + 1)))
                .collect();
            format!("[\n{}\n{}]", entries.join(",\n"), close)
        }
        other => other.to_string(),
    }
}

fn prisma_clause(filter: &ActiveFilter) -> Json {
    let value = first_json(filter);
    match filter.operator {
        Operator::Eq => value,
        Operator::NotEq => json!({ "not": value }),
        Operator::Gt => json!({ "gt": value }),
        Operator::Gte => json!({ "gte": value }),
        Operator::Lt => json!({ "lt": value }),
        Operator::Lte => json!({ "lte": value }),
        Operator::Like => json!({ "contains": value }),
        Operator::NotLike => json!({ "not": { "contains": value } }),
        Operator::ILike => json!({ "contains": value, "mode": "insensitive" }),
        Operator::NotILike => json!({ "not": { "contains": value, "mode": "insensitive" } }),
        Operator::In => json!({ "in": array_json(filter) }),
        Operator::NotIn => json!({ "notIn": array_json(filter) }),
        Operator::IsNull => Json::Null,
        Operator::IsNotNull => json!({ "not": null }),
    }
}

pub(super) fn prisma(table: &str, filters: &[ActiveFilter]) -> String {
    let model = table_var(table);
    let mut clauses: Map<String, Json> = Map::new();

    for filter in filters {
        let key = camel_case(&filter.column);
        let clause = prisma_clause(filter);
        match (clauses.get_mut(&key), clause) {
            (Some(Json::Object(existing)), Json::Object(more)) => existing.extend(more),
            (_, clause) => {
                clauses.insert(key, clause);
            }
        }
    }

    if clauses.is_empty() {
        return format!("await prisma.{}.findMany()", model);
    }
    let where_obj = js_object(&Json::Object(clauses), 0).replace('\n', "\n  ");
    format!("await prisma.{}.findMany({{\n  where: {}\n}})", model, where_obj)
}

pub(super) fn drizzle(table: &str, filters: &[ActiveFilter]) -> String {
    let var = table_var(table);
    let conditions: Vec<String> = filters
        .iter()
        .map(|f| {
            let col = member(&var, &camel_case(&f.column));
            let val = first_json(f);
            match f.operator {
                Operator::Eq => format!("eq({}, {})", col, val),
                Operator::NotEq => format!("ne({}, {})", col, val),
                Operator::Gt => format!("gt({}, {})", col, val),
                Operator::Gte => format!("gte({}, {})", col, val),
                Operator::Lt => format!("lt({}, {})", col, val),
                Operator::Lte => format!("lte({}, {})", col, val),
                Operator::Like => format!("like({}, {})", col, val),
                Operator::NotLike => format!("notLike({}, {})", col, val),
                Operator::ILike => format!("ilike({}, {})", col, val),
                Operator::NotILike => format!("notIlike({}, {})", col, val),
                Operator::In => format!("inArray({}, {})", col, array_json(f)),
                Operator::NotIn => format!("notInArray({}, {})", col, array_json(f)),
                Operator::IsNull => format!("isNull({})", col),
                Operator::IsNotNull => format!("isNotNull({})", col),
            }
        })
        .collect();

    if conditions.is_empty() {
        return format!("await db.select().from({})", var);
    }
    format!(
        "await db.select()\n  .from({})\n  .where(and(\n    {}\n  ))",
        var,
        conditions.join(",\n    ")
    )
}

fn js_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) | Value::Int(_) => value.display(),
        Value::Float(f) if f.is_finite() => value.display(),
        Value::Float(_) => "null".to_string(),
        Value::Text(s) => js_string(s),
        Value::Date(_) | Value::DateTime(_) => js_string(&value.display()),
        Value::Json(j) => j.to_string(),
    }
}

pub(super) fn kysely(table: &str, filters: &[ActiveFilter]) -> String {
    let from = js_string(table);
    let conditions: Vec<String> = filters
        .iter()
        .map(|f| {
            let col = js_string(&f.column);
            match f.operator {
                Operator::IsNull => format!("{}, 'is', null", col),
                Operator::IsNotNull => format!("{}, 'is not', null", col),
                Operator::In | Operator::NotIn => {
                    let items: Vec<String> = f.operands().iter().map(js_value).collect();
                    format!(
                        "{}, {}, [{}]",
                        col,
                        js_string(&f.operator.symbol().to_lowercase()),
                        items.join(", ")
                    )
                }
                op => {
                    let value = f.operands().first().map(js_value).unwrap_or_else(|| "null".into());
                    format!("{}, {}, {}", col, js_string(&op.symbol().to_lowercase()), value)
                }
            }
        })
        .collect();

    if conditions.is_empty() {
        return format!("await db.selectFrom({}).selectAll().execute()", from);
    }
    let wheres: Vec<String> = conditions.iter().map(|c| format!("  .where({})", c)).collect();
    format!(
        "await db.selectFrom({})\n  .selectAll()\n{}\n  .execute()",
        from,
        wheres.join("\n")
    )
}
