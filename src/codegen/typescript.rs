use super::naming::{js_string, literal_key, pascal_case};
use super::types::map_type;
use super::{is_set_column, GeneratorFormat, GeneratorInput};
use crate::schema::{Column, EnumDef};

/// `'a' | 'b'`, or `('a' | 'b')[]` for multi-valued enums.
pub(super) fn union_type(column: &Column, matched: &EnumDef) -> String {
    let union = matched
        .values
        .iter()
        .map(|v| js_string(v))
        .collect::<Vec<_>>()
        .join(" | ");
    if is_set_column(column, matched) {
        format!("({})[]", union)
    } else {
        union
    }
}

/// Column type as seen from TypeScript, shared with the Kysely emitter.
pub(super) fn column_type(input: &GeneratorInput, column: &Column) -> String {
    match input.enum_for(column) {
        Some(matched) => union_type(column, matched),
        None => map_type(GeneratorFormat::Ts, input.dialect, &column.data_type),
    }
}

pub(super) fn schema(input: &GeneratorInput) -> String {
    let fields: Vec<String> = input
        .columns
        .iter()
        .map(|c| {
            format!(
                "  {}{}: {};",
                literal_key(&c.id),
                if c.is_nullable { "?" } else { "" },
                column_type(input, c)
            )
        })
        .collect();

    format!(
        "export interface {} {{\n{}\n}}",
        pascal_case(&input.table),
        fields.join("\n")
    )
}
