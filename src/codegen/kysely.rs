use super::naming::{literal_key, pascal_case};
use super::typescript::column_type;
use super::GeneratorInput;

pub(super) fn schema(input: &GeneratorInput) -> String {
    let pascal = pascal_case(&input.table);
    let fields: Vec<String> = input
        .columns
        .iter()
        .map(|c| {
            let ts = column_type(input, c);
            let mut ty = if c.primary_key {
                format!("Generated<{}>", ts)
            } else {
                ts
            };
            if c.is_nullable {
                ty.push_str(" | null");
            }
            format!("  {}: {};", literal_key(&c.id), ty)
        })
        .collect();

    [
        "import { Generated } from 'kysely';".to_string(),
        String::new(),
        format!("export interface {}Table {{", pascal),
        fields.join("\n"),
        "}".to_string(),
        String::new(),
        "export interface Database {".to_string(),
        format!("  {}: {}Table;", literal_key(&input.table), pascal),
        "}".to_string(),
    ]
    .join("\n")
}
