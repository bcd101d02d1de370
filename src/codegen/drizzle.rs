use std::collections::HashSet;

use super::naming::{camel_case, js_string, literal_key, member, pascal_case, relation_name};
use super::types::map_type;
use super::typescript::union_type;
use super::{is_set_column, GeneratorFormat, GeneratorInput};
use crate::schema::{Column, EnumDef};
use crate::sql::Dialect;

/// How a dialect's Drizzle core module declares enum columns.
enum EnumStyle {
    /// Named type declared once, then called per column (`pgEnum`).
    Declared(&'static str),
    /// Column builder taking the values inline (`mysqlEnum('col', [...])`).
    Inline(&'static str),
    /// `text('col', { enum: [...] })`.
    TextOption,
    /// No enum support; the column keeps its type and narrows it with `$type`.
    Typed,
}

struct Flavor {
    table_func: &'static str,
    import_path: &'static str,
    enums: EnumStyle,
}

fn flavor(dialect: Dialect) -> Flavor {
    match dialect {
        Dialect::Postgres => Flavor {
            table_func: "pgTable",
            import_path: "drizzle-orm/pg-core",
            enums: EnumStyle::Declared("pgEnum"),
        },
        Dialect::MySql => Flavor {
            table_func: "mysqlTable",
            import_path: "drizzle-orm/mysql-core",
            enums: EnumStyle::Inline("mysqlEnum"),
        },
        Dialect::MsSql => Flavor {
            table_func: "mssqlTable",
            import_path: "drizzle-orm/mssql-core",
            enums: EnumStyle::Typed,
        },
        Dialect::ClickHouse => Flavor {
            table_func: "clickhouseTable",
            import_path: "drizzle-orm/clickhouse-core",
            enums: EnumStyle::Inline("enum"),
        },
        Dialect::Sqlite => Flavor {
            table_func: "sqliteTable",
            import_path: "drizzle-orm/sqlite-core",
            enums: EnumStyle::TextOption,
        },
    }
}

/// Exported variable name of a table's Drizzle definition.
pub(super) fn table_var(table: &str) -> String {
    camel_case(&pascal_case(table))
}

fn value_list(def: &EnumDef) -> String {
    let values: Vec<String> = def.values.iter().map(|v| js_string(v)).collect();
    format!("[{}]", values.join(", "))
}

/// Ordered, de-duplicated list of names.
#[derive(Default)]
struct Names(Vec<String>);

impl Names {
    fn add(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.0.contains(&name) {
            self.0.push(name);
        }
    }
}

fn scalar_builder(column: &Column, type_func: &str) -> String {
    let mut options = String::new();
    match type_func {
        "varchar" | "char" | "nvarchar" => {
            if let Some(len) = column.max_length.filter(|&l| l > 0) {
                options = format!(", {{ length: {} }}", len);
            }
        }
        "decimal" => {
            if let Some(precision) = column.precision.filter(|&p| p > 0) {
                options = match column.scale.filter(|&s| s > 0) {
                    Some(scale) => format!(", {{ precision: {}, scale: {} }}", precision, scale),
                    None => format!(", {{ precision: {} }}", precision),
                };
            }
        }
        _ => {}
    }
    format!("{}({}{})", type_func, js_string(&column.id), options)
}

fn strip_id_suffix(id: &str) -> &str {
    id.strip_suffix("_id")
        .or_else(|| id.strip_suffix("Id"))
        .filter(|s| !s.is_empty())
        .unwrap_or(id)
}

pub(super) fn schema(input: &GeneratorInput) -> String {
    let dialect = input.dialect;
    let flavor = flavor(dialect);
    let var = table_var(&input.table);
    let links = dialect != Dialect::ClickHouse;

    let mut core_imports = Names::default();
    let mut table_imports = Names::default();
    let mut enum_decls = Names::default();
    let mut fields = Vec::new();

    for column in &input.columns {
        let type_func = map_type(GeneratorFormat::Drizzle, dialect, &column.data_type);

        let mut chain = match input.enum_for(column) {
            Some(matched) if !is_set_column(column, matched) => match flavor.enums {
                EnumStyle::Declared(func) => {
                    let enum_var = format!("{}Enum", camel_case(&matched.name));
                    core_imports.add(func);
                    enum_decls.add(format!(
                        "export const {} = {}({}, {});",
                        enum_var,
                        func,
                        js_string(&matched.name),
                        value_list(matched)
                    ));
                    format!("{}({})", enum_var, js_string(&column.id))
                }
                EnumStyle::Inline(func) => {
                    core_imports.add(func);
                    format!("{}({}, {})", func, js_string(&column.id), value_list(matched))
                }
                EnumStyle::TextOption => {
                    core_imports.add("text");
                    format!("text({}, {{ enum: {} }})", js_string(&column.id), value_list(matched))
                }
                EnumStyle::Typed => {
                    core_imports.add(type_func.as_str());
                    format!(
                        "{}.$type<{}>()",
                        scalar_builder(column, &type_func),
                        union_type(column, matched)
                    )
                }
            },
            Some(matched) => {
                core_imports.add(type_func.as_str());
                format!(
                    "{}.$type<{}>()",
                    scalar_builder(column, &type_func),
                    union_type(column, matched)
                )
            }
            None => {
                core_imports.add(type_func.as_str());
                scalar_builder(column, &type_func)
            }
        };

        if !column.is_nullable {
            chain.push_str(".notNull()");
        }
        if column.primary_key {
            chain.push_str(".primaryKey()");
        } else if column.unique {
            chain.push_str(".unique()");
        }
        if let Some(fk) = column.foreign.as_ref().filter(|_| links) {
            let ref_var = table_var(&fk.table);
            chain.push_str(&format!(
                ".references(() => {})",
                member(&ref_var, &camel_case(&fk.column))
            ));
            if fk.table != input.table {
                table_imports.add(format!("import {{ {} }} from {};", ref_var, js_string(&format!("./{}", fk.table))));
            }
        }

        fields.push(format!("  {}: {},", literal_key(&camel_case(&column.id)), chain));
    }

    let mut relations = Vec::new();
    if links {
        let mut used = HashSet::new();
        for column in &input.columns {
            if let Some(fk) = &column.foreign {
                let ref_var = table_var(&fk.table);
                let base = match strip_id_suffix(&column.id) {
                    stripped if stripped == column.id => fk.table.as_str(),
                    stripped => stripped,
                };
                let name = relation_name(&mut used, base, &column.id);
                relations.push(format!(
                    "  {}: one({}, {{\n    fields: [{}],\n    references: [{}],\n  }}),",
                    literal_key(&name),
                    ref_var,
                    member(&var, &camel_case(&column.id)),
                    member(&ref_var, &camel_case(&fk.column))
                ));
            }
            for reference in &column.references {
                let ref_var = table_var(&reference.table);
                let name = relation_name(&mut used, &reference.table, &reference.column);
                relations.push(format!("  {}: many({}),", literal_key(&name), ref_var));
                if reference.table != input.table {
                    table_imports.add(format!(
                        "import {{ {} }} from {};",
                        ref_var,
                        js_string(&format!("./{}", reference.table))
                    ));
                }
            }
        }
    }

    let index_lines: Vec<String> = input
        .explicit_indexes()
        .iter()
        .map(|idx| {
            let func = if idx.is_unique { "uniqueIndex" } else { "index" };
            core_imports.add(func);
            let cols: Vec<String> = idx
                .columns
                .iter()
                .map(|c| member("t", &camel_case(c)))
                .collect();
            format!("  {}({}).on({}),", func, js_string(&idx.name), cols.join(", "))
        })
        .collect();
    core_imports.add(flavor.table_func);

    let mut imports = Vec::new();
    if !relations.is_empty() {
        imports.push("import { relations } from 'drizzle-orm';".to_string());
    }
    imports.extend(table_imports.0);
    imports.push(format!(
        "import {{ {} }} from {};",
        core_imports.0.join(", "),
        js_string(flavor.import_path)
    ));

    let extra = if index_lines.is_empty() {
        String::new()
    } else {
        format!(", (t) => [\n{}\n]", index_lines.join("\n"))
    };
    let table_def = format!(
        "export const {} = {}({}, {{\n{}\n}}{});",
        var,
        flavor.table_func,
        js_string(&input.table),
        fields.join("\n"),
        extra
    );

    let mut definitions = Vec::new();
    if !enum_decls.0.is_empty() {
        definitions.push(enum_decls.0.join("\n"));
    }
    definitions.push(table_def);
    if !relations.is_empty() {
        definitions.push(format!(
            "export const {}Relations = relations({}, ({{ one, many }}) => ({{\n{}\n}}));",
            var,
            var,
            relations.join("\n")
        ));
    }

    format!("{}\n\n{}", imports.join("\n"), definitions.join("\n\n"))
}
