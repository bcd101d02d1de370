//! Identifier and literal helpers shared by the TypeScript-family emitters.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static BARE_SAFE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][\w$]*$").expect("valid identifier regex"));

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W").expect("valid non-word regex"));

/// Whether `name` can appear unquoted as a JS/TS object key or identifier.
pub fn is_bare_safe(name: &str) -> bool {
    BARE_SAFE.is_match(name)
}

/// `name` as an object key: bare when safe, otherwise a quoted string.
pub fn literal_key(name: &str) -> String {
    if is_bare_safe(name) {
        name.to_string()
    } else {
        js_string(name)
    }
}

/// Property access on `object`: `t.name` or `t['my-col']`.
pub fn member(object: &str, name: &str) -> String {
    if is_bare_safe(name) {
        format!("{}.{}", object, name)
    } else {
        format!("{}[{}]", object, js_string(name))
    }
}

/// Single-quoted JS string literal.
pub fn js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

/// Double-quoted literal, as used by Prisma `@map(...)` and `map:` arguments.
pub fn double_quoted(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Replace every non-word character with `_`.
pub fn sanitize(name: &str) -> String {
    NON_WORD.replace_all(name, "_").into_owned()
}

fn prefix_if_leading_digit(mut s: String) -> String {
    if s.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        s.insert(0, '_');
    }
    s
}

/// Split on non-alphanumerics and on case changes: `HTTPServer_id` gives
/// `HTTP`, `Server`, `id`.
fn words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    for part in name.split(|c: char| !c.is_alphanumeric()) {
        let chars: Vec<char> = part.chars().collect();
        let mut start = 0;
        for i in 1..chars.len() {
            let (prev, cur) = (chars[i - 1], chars[i]);
            let next_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            if cur.is_uppercase() && (prev.is_lowercase() || (prev.is_uppercase() && next_lower)) {
                words.push(chars[start..i].iter().collect());
                start = i;
            }
        }
        if start < chars.len() {
            words.push(chars[start..].iter().collect());
        }
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Type-style name: `user_accounts` -> `UserAccounts`. Never empty.
pub fn pascal_case(name: &str) -> String {
    let pascal: String = words(name).iter().map(|w| capitalize(w)).collect();
    if pascal.is_empty() {
        return "Table".to_string();
    }
    prefix_if_leading_digit(pascal)
}

/// Value-style name: `author_id` -> `authorId`. Falls back to `sanitize`
/// when the name has no alphanumeric content.
pub fn camel_case(name: &str) -> String {
    let camel: String = words(name)
        .iter()
        .enumerate()
        .map(|(i, w)| if i == 0 { w.to_lowercase() } else { capitalize(w) })
        .collect();
    if camel.is_empty() {
        return sanitize(name);
    }
    prefix_if_leading_digit(camel)
}

/// Record `candidate` in `used`, appending `2`, `3`, ... until it is free.
pub fn claim(used: &mut HashSet<String>, candidate: String) -> String {
    let mut name = candidate.clone();
    let mut n = 2;
    while used.contains(&name) {
        name = format!("{}{}", candidate, n);
        n += 1;
    }
    used.insert(name.clone());
    name
}

/// Relation field names must not collide with each other or with scalar
/// fields; a repeated name takes the source column as a suffix, then a
/// counter.
pub fn relation_name(used: &mut HashSet<String>, base: &str, source_column: &str) -> String {
    let name = camel_case(base);
    if used.insert(name.clone()) {
        return name;
    }
    claim(used, camel_case(&format!("{}_{}", base, source_column)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_safe() {
        assert!(is_bare_safe("user_id"));
        assert!(is_bare_safe("$meta"));
        assert!(!is_bare_safe("my-col"));
        assert!(!is_bare_safe("1st"));
        assert!(!is_bare_safe(""));
    }

    #[test]
    fn test_literal_key_and_member() {
        assert_eq!(literal_key("name"), "name");
        assert_eq!(literal_key("my-col"), "'my-col'");
        assert_eq!(member("t", "name"), "t.name");
        assert_eq!(member("t", "my col"), "t['my col']");
    }

    #[test]
    fn test_js_string_escapes() {
        assert_eq!(js_string("it's"), "'it\\'s'");
        assert_eq!(js_string("a\\b"), "'a\\\\b'");
        assert_eq!(js_string("x\ny"), "'x\\ny'");
    }

    #[test]
    fn test_double_quoted() {
        assert_eq!(double_quoted("in progress"), "\"in progress\"");
        assert_eq!(double_quoted("say \"hi\""), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn test_case_conversions() {
        assert_eq!(pascal_case("user_accounts"), "UserAccounts");
        assert_eq!(pascal_case("order-items"), "OrderItems");
        assert_eq!(pascal_case("2fa_codes"), "_2faCodes");
        assert_eq!(pascal_case("HTTPServer"), "HttpServer");
        assert_eq!(pascal_case("---"), "Table");
        assert_eq!(camel_case("author_id"), "authorId");
        assert_eq!(camel_case("createdAt"), "createdAt");
        assert_eq!(camel_case("id"), "id");
        assert_eq!(camel_case("UserID"), "userId");
        assert_eq!(sanitize("in progress!"), "in_progress_");
    }

    #[test]
    fn test_relation_names_never_collide() {
        let mut used: HashSet<String> = ["usersEditorId".to_string()].into_iter().collect();
        assert_eq!(relation_name(&mut used, "users", "author_id"), "users");
        assert_eq!(relation_name(&mut used, "users", "editor_id"), "usersEditorId2");
        assert_eq!(relation_name(&mut used, "users", "editor_id"), "usersEditorId3");
        assert_eq!(claim(&mut used, "posts".into()), "posts");
        assert_eq!(claim(&mut used, "posts".into()), "posts2");
    }
}
