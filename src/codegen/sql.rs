use super::types::map_type;
use super::{is_set_column, GeneratorFormat, GeneratorInput};
use crate::schema::{Column, EnumDef};
use crate::sql::Dialect;

/// ClickHouse `Enum8` stores Int8 ordinals.
const ENUM8_MAX_VALUES: usize = 127;

fn quoted_values(dialect: Dialect, values: &[String]) -> String {
    values
        .iter()
        .map(|v| dialect.quote_string(v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn enum_type(input: &GeneratorInput, column: &Column, matched: &EnumDef) -> String {
    let dialect = input.dialect;
    match dialect {
        Dialect::ClickHouse => {
            let prefix = if matched.values.len() > ENUM8_MAX_VALUES {
                "Enum16"
            } else {
                "Enum8"
            };
            let pairs: Vec<String> = matched
                .values
                .iter()
                .enumerate()
                .map(|(i, v)| format!("{} = {}", dialect.quote_string(v), i + 1))
                .collect();
            let ty = format!("{}({})", prefix, pairs.join(", "));
            if column.is_nullable {
                format!("Nullable({})", ty)
            } else {
                ty
            }
        }
        Dialect::MySql => {
            let keyword = if is_set_column(column, matched) { "SET" } else { "ENUM" };
            format!("{}({})", keyword, quoted_values(dialect, &matched.values))
        }
        Dialect::Postgres => dialect.quote_identifier(&matched.name),
        Dialect::MsSql => matched.name.clone(),
        Dialect::Sqlite => format!(
            "TEXT CHECK ({} IN ({}))",
            dialect.quote_identifier(&column.id),
            quoted_values(dialect, &matched.values)
        ),
    }
}

fn scalar_type(input: &GeneratorInput, column: &Column) -> String {
    let dialect = input.dialect;
    let mut ty = map_type(GeneratorFormat::Sql, dialect, &column.data_type);
    let lower = ty.to_ascii_lowercase();

    if let Some(len) = column.max_length.filter(|&l| l > 0 || l == -1) {
        let sized = (lower.contains("char") || lower.contains("binary"))
            && !lower.contains("text")
            && !lower.contains('(');
        if sized {
            if len == -1 {
                ty.push_str("(MAX)");
            } else {
                ty.push_str(&format!("({})", len));
            }
        }
    }

    if let Some(precision) = column.precision.filter(|&p| p > 0) {
        if (lower.contains("decimal") || lower.contains("numeric")) && !lower.contains('(') {
            match column.scale.filter(|&s| s > 0) {
                Some(scale) => ty.push_str(&format!("({}, {})", precision, scale)),
                None => ty.push_str(&format!("({})", precision)),
            }
        }
    }

    match dialect {
        Dialect::ClickHouse if column.is_nullable && !lower.starts_with("nullable(") => {
            format!("Nullable({})", ty)
        }
        Dialect::ClickHouse => ty,
        _ => ty.to_uppercase(),
    }
}

/// `CREATE TABLE` plus any enum types and secondary indexes it depends on.
pub(super) fn schema(input: &GeneratorInput) -> String {
    let dialect = input.dialect;
    let quote = |name: &str| dialect.quote_identifier(name);
    let table = quote(&input.table);

    let mut enum_types: Vec<&EnumDef> = Vec::new();
    let mut lines = Vec::new();
    let mut foreign_keys = Vec::new();
    let primary: Vec<String> = input
        .columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| quote(&c.id))
        .collect();
    let composite_key = primary.len() > 1;

    for column in &input.columns {
        let ty = match input.enum_for(column) {
            Some(matched) => {
                if dialect == Dialect::Postgres && !enum_types.iter().any(|e| e.name == matched.name) {
                    enum_types.push(matched);
                }
                enum_type(input, column, matched)
            }
            None => match &column.enum_ref {
                Some(name) if column.data_type.eq_ignore_ascii_case("enum") => name.clone(),
                _ => scalar_type(input, column),
            },
        };

        let mut parts = vec![quote(&column.id), ty];
        if !column.is_nullable {
            parts.push("NOT NULL".to_string());
        }

        let raw = column.data_type.to_ascii_lowercase();
        if column.primary_key {
            if dialect == Dialect::MySql && (raw.contains("int") || raw.contains("serial")) && !composite_key {
                parts.push("AUTO_INCREMENT".to_string());
            }
            if dialect == Dialect::MsSql && raw.contains("int") && !composite_key {
                parts.push("IDENTITY(1,1)".to_string());
            }
        }

        if column.primary_key && dialect != Dialect::ClickHouse && !composite_key {
            parts.push("PRIMARY KEY".to_string());
        } else if column.unique && !column.primary_key && dialect != Dialect::ClickHouse {
            parts.push("UNIQUE".to_string());
        }

        if let Some(fk) = column.foreign.as_ref().filter(|_| dialect != Dialect::ClickHouse) {
            let mut clause = format!(
                "FOREIGN KEY ({}) REFERENCES {}({})",
                quote(&column.id),
                quote(&fk.table),
                quote(&fk.column)
            );
            if let Some(action) = &fk.on_delete {
                clause.push_str(&format!(" ON DELETE {}", action));
            }
            if let Some(action) = &fk.on_update {
                clause.push_str(&format!(" ON UPDATE {}", action));
            }
            foreign_keys.push(clause);
        }

        lines.push(format!("  {}", parts.join(" ")));
    }

    if composite_key && dialect != Dialect::ClickHouse {
        lines.push(format!("  PRIMARY KEY ({})", primary.join(", ")));
    }
    lines.extend(foreign_keys.into_iter().map(|fk| format!("  {}", fk)));

    let mut out = String::new();
    for e in &enum_types {
        out.push_str(&format!(
            "CREATE TYPE {} AS ENUM ({});\n",
            quote(&e.name),
            quoted_values(dialect, &e.values)
        ));
    }
    if !enum_types.is_empty() {
        out.push('\n');
    }

    out.push_str(&format!("CREATE TABLE {} (\n{}\n)", table, lines.join(",\n")));
    if dialect == Dialect::ClickHouse {
        let order_by = match primary.len() {
            0 => "tuple()".to_string(),
            1 => primary[0].clone(),
            _ => format!("({})", primary.join(", ")),
        };
        out.push_str(&format!(" ENGINE = MergeTree() ORDER BY {}", order_by));
    }
    out.push(';');

    let indexes: Vec<String> = input
        .explicit_indexes()
        .iter()
        .map(|idx| {
            let cols: Vec<String> = idx.columns.iter().map(|c| quote(c)).collect();
            format!(
                "CREATE {}INDEX {} ON {} ({});",
                if idx.is_unique { "UNIQUE " } else { "" },
                quote(&idx.name),
                table,
                cols.join(", ")
            )
        })
        .collect();
    if !indexes.is_empty() {
        out.push_str("\n\n");
        out.push_str(&indexes.join("\n"));
    }

    out
}
