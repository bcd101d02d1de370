use super::naming::{camel_case, js_string, literal_key, pascal_case};
use super::types::map_type;
use super::{is_set_column, GeneratorFormat, GeneratorInput};
use crate::schema::Column;

fn validator(input: &GeneratorInput, column: &Column) -> String {
    let mut t = match input.enum_for(column) {
        Some(matched) => {
            let values: Vec<String> = matched.values.iter().map(|v| js_string(v)).collect();
            let t = format!("z.enum([{}])", values.join(", "));
            if is_set_column(column, matched) {
                format!("{}.array()", t)
            } else {
                t
            }
        }
        None => {
            let mut t = map_type(GeneratorFormat::Zod, input.dialect, &column.data_type);
            if t == "z.string()" {
                if let Some(max) = column.max_length.filter(|&m| m > 0) {
                    t = format!("z.string().max({})", max);
                }
            } else if t == "z.number()" && column.data_type.to_ascii_lowercase().contains("int") {
                t = "z.int()".to_string();
            }
            t
        }
    };

    if column.is_nullable {
        t.push_str(".nullable()");
    }
    t
}

pub(super) fn schema(input: &GeneratorInput) -> String {
    let pascal = pascal_case(&input.table);
    let camel = camel_case(&pascal);
    let fields: Vec<String> = input
        .columns
        .iter()
        .map(|c| format!("  {}: {},", literal_key(&c.id), validator(input, c)))
        .collect();

    [
        "import * as z from 'zod';".to_string(),
        String::new(),
        format!("export const {}Schema = z.object({{", camel),
        fields.join("\n"),
        "});".to_string(),
        String::new(),
        format!("export type {} = z.infer<typeof {}Schema>;", pascal, camel),
    ]
    .join("\n")
}
