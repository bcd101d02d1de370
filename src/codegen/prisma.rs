use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::naming::{camel_case, claim, double_quoted, pascal_case, relation_name, sanitize};
use super::types::map_type;
use super::{is_set_column, GeneratorFormat, GeneratorInput};
use crate::schema::EnumDef;

static PRISMA_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]\w*$").expect("valid prisma identifier regex"));

struct Field {
    name: String,
    ty: String,
    attributes: Vec<String>,
}

fn enum_block(name: &str, def: &EnumDef) -> String {
    // Values that are already identifiers keep their names; mapped ones
    // must not land on them or on each other.
    let mut used: HashSet<String> = def
        .values
        .iter()
        .filter(|v| PRISMA_IDENT.is_match(v))
        .cloned()
        .collect();
    let values: Vec<String> = def
        .values
        .iter()
        .map(|v| {
            if PRISMA_IDENT.is_match(v) {
                return format!("  {}", v);
            }
            let mut ident = sanitize(v);
            // Enum members must start with a letter.
            if !ident.starts_with(|c: char| c.is_ascii_alphabetic()) {
                ident.insert_str(0, "value_");
            }
            format!("  {} @map({})", claim(&mut used, ident), double_quoted(v))
        })
        .collect();
    format!("enum {} {{\n{}\n}}", name, values.join("\n"))
}

pub(super) fn schema(input: &GeneratorInput) -> String {
    let table = &input.table;
    let mut enum_blocks: Vec<String> = Vec::new();
    let mut fields: Vec<Field> = Vec::new();
    let mut relations: Vec<Field> = Vec::new();
    let mut used: HashSet<String> = input.columns.iter().map(|c| camel_case(&c.id)).collect();

    for column in &input.columns {
        let field_name = camel_case(&column.id);
        let mut ty = map_type(GeneratorFormat::Prisma, input.dialect, &column.data_type);
        let mut list = false;

        if let Some(matched) = input.enum_for(column) {
            let enum_name = if matched.name.is_empty() {
                pascal_case(&format!("{}_{}", table, column.id))
            } else {
                pascal_case(&matched.name)
            };
            let block = enum_block(&enum_name, matched);
            if !enum_blocks.contains(&block) {
                enum_blocks.push(block);
            }
            list = is_set_column(column, matched);
            ty = enum_name;
        }

        let mut attributes = Vec::new();
        if column.primary_key {
            attributes.push("@id".to_string());
            if ty == "Int" {
                attributes.push("@default(autoincrement())".to_string());
            }
        } else if column.unique {
            attributes.push("@unique".to_string());
        }
        if ty == "String" {
            if let Some(len) = column.max_length.filter(|&l| l > 0) {
                attributes.push(format!("@db.VarChar({})", len));
            }
        }
        if ty == "Decimal" {
            if let Some(precision) = column.precision.filter(|&p| p > 0) {
                attributes.push(format!("@db.Decimal({}, {})", precision, column.scale.unwrap_or(0)));
            }
        }
        if field_name != column.id {
            attributes.push(format!("@map({})", double_quoted(&column.id)));
        }

        let suffix = if list {
            "[]"
        } else if column.is_nullable {
            "?"
        } else {
            ""
        };
        fields.push(Field {
            name: field_name.clone(),
            ty: format!("{}{}", ty, suffix),
            attributes,
        });

        if let Some(fk) = &column.foreign {
            let name = relation_name(&mut used, &fk.table, &column.id);
            relations.push(Field {
                name,
                ty: format!("{}{}", pascal_case(&fk.table), if column.is_nullable { "?" } else { "" }),
                attributes: vec![format!(
                    "@relation(fields: [{}], references: [{}])",
                    field_name,
                    camel_case(&fk.column)
                )],
            });
        }

        for reference in &column.references {
            let name = relation_name(&mut used, &reference.table, &reference.column);
            relations.push(Field {
                name,
                ty: format!("{}[]", pascal_case(&reference.table)),
                attributes: Vec::new(),
            });
        }
    }

    fields.extend(relations);
    let name_width = fields.iter().map(|f| f.name.len()).max().unwrap_or(0);
    let type_width = fields.iter().map(|f| f.ty.len()).max().unwrap_or(0);

    let mut body: Vec<String> = fields
        .iter()
        .map(|f| {
            let line = format!(
                "  {:<nw$} {:<tw$} {}",
                f.name,
                f.ty,
                f.attributes.join(" "),
                nw = name_width,
                tw = type_width
            );
            line.trim_end().to_string()
        })
        .collect();

    let indexes = input.explicit_indexes();
    if !indexes.is_empty() {
        body.push(String::new());
        for idx in indexes {
            let cols: Vec<String> = idx.columns.iter().map(|c| camel_case(c)).collect();
            body.push(format!(
                "  {}([{}], map: {})",
                if idx.is_unique { "@@unique" } else { "@@index" },
                cols.join(", "),
                double_quoted(&idx.name)
            ));
        }
    }

    let model = pascal_case(table);
    if &model != table {
        body.push(String::new());
        body.push(format!("  @@map({})", double_quoted(table)));
    }

    let mut out = format!("model {} {{\n{}\n}}", model, body.join("\n"));
    for block in enum_blocks {
        out.push_str("\n\n");
        out.push_str(&block);
    }
    out
}
