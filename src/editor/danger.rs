use std::sync::LazyLock;

use regex::Regex;

/// Keywords that make a script ask for confirmation before it runs.
///
/// `INSERT` is additive and deliberately absent.
pub const DANGEROUS_KEYWORDS: [&str; 6] = ["DELETE", "UPDATE", "DROP", "RENAME", "TRUNCATE", "ALTER"];

static DANGEROUS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = DANGEROUS_KEYWORDS.join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).expect("valid dangerous keyword regex")
});

/// Whether `sql` contains a destructive keyword outside `--` comment lines.
///
/// This is a confirmation prompt, not a permission check.
pub fn is_dangerous(sql: &str) -> bool {
    sql.lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .any(|line| DANGEROUS_PATTERN.is_match(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_destructive_statements() {
        assert!(is_dangerous("DELETE FROM users"));
        assert!(is_dangerous("delete from users"));
        assert!(is_dangerous("SELECT * FROM users; DELETE FROM users"));
        assert!(is_dangerous("UPDATE users SET name = 'John'"));
        assert!(is_dangerous("DROP TABLE t"));
        assert!(is_dangerous("alter table t rename to u"));
        assert!(is_dangerous("TRUNCATE logs"));
    }

    #[test]
    fn test_whole_words_only() {
        assert!(!is_dangerous("SELECT * FROM users"));
        assert!(!is_dangerous("SELECT COUNT(*) FROM users"));
        assert!(!is_dangerous("UPDATED_AT > '2023-01-01'"));
        assert!(!is_dangerous("INSERTED_AT < '2023-01-01'"));
        assert!(!is_dangerous("CREATOR_ID = 1"));
        assert!(!is_dangerous("DROPDOWN = 'x'"));
    }

    #[test]
    fn test_insert_is_not_dangerous() {
        assert!(!is_dangerous("INSERT INTO users (name) VALUES ('a')"));
    }

    #[test]
    fn test_comment_lines_are_ignored() {
        assert!(!is_dangerous("-- DROP TABLE users\nSELECT 1"));
        assert!(!is_dangerous("   -- delete everything"));
        assert!(is_dangerous("-- cleanup\nDELETE FROM t"));
    }
}
