//! Grammar-free statement splitting for the SQL editor buffer.
//!
//! The scanner walks the buffer once, keeping state across lines: quoted
//! strings and identifiers, dollar-quoted bodies, block comments, and the
//! nesting of `BEGIN`/`CASE`/transaction blocks. A `;` ends a statement only
//! outside all of those. Statements that end on the same line are grouped so
//! that "run statement under cursor" can address them by line.

use serde::{Deserialize, Serialize};

/// One or more statements that came from a contiguous span of lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementGroup {
    /// 1-based, inclusive.
    pub start_line: usize,
    /// 1-based, inclusive.
    pub end_line: usize,
    pub statements: Vec<String>,
}

impl StatementGroup {
    pub fn contains_line(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }
}

/// The group covering a 1-based editor line, if any.
pub fn statement_at_line(groups: &[StatementGroup], line: usize) -> Option<&StatementGroup> {
    groups.iter().find(|g| g.contains_line(line))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    /// `BEGIN … END`, `BEGIN TRY … END TRY`, etc.
    Procedural,
    /// `CASE … END` (or `END CASE`).
    Case,
    /// `BEGIN;` / `START TRANSACTION` up to `COMMIT`, `ROLLBACK` or `END`.
    Transaction,
}

/// Words after `END` that terminate a construct which never opened a block.
const END_NON_CLOSERS: [&str; 5] = ["IF", "LOOP", "WHILE", "REPEAT", "FOR"];

/// Words after `BEGIN` that make it a transaction rather than a block.
const TRANSACTION_MARKERS: [&str; 6] = [
    "TRANSACTION",
    "WORK",
    "TRAN",
    "DEFERRED",
    "IMMEDIATE",
    "EXCLUSIVE",
];

/// Split an editor buffer into statement groups.
///
/// Never fails: unterminated strings, comments, dollar bodies and blocks are
/// folded into a final group.
pub fn segment(text: &str) -> Vec<StatementGroup> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut out = GroupBuilder::default();
    let mut blocks: Vec<Block> = Vec::new();
    let mut prev_word: Option<String> = None;
    let mut line = 1;
    let mut i = 0;

    while i < len {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match c {
            '\n' => {
                out.end_line();
                line += 1;
                i += 1;
            }
            '-' if next == Some('-') => {
                while i < len && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if next == Some('*') => {
                i += 2;
                loop {
                    if i >= len {
                        break;
                    }
                    if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        i += 2;
                        break;
                    }
                    if chars[i] == '\n' {
                        out.end_line();
                        line += 1;
                    }
                    i += 1;
                }
                out.soft_break();
            }
            '\'' | '"' | '`' => {
                out.push(c, line);
                i += 1;
                while i < len {
                    let ch = chars[i];
                    out.push_raw(ch, line);
                    if ch == '\n' {
                        line += 1;
                    }
                    i += 1;
                    if ch == c {
                        // Doubled quote is an escaped quote.
                        if chars.get(i) == Some(&c) {
                            out.push_raw(c, line);
                            i += 1;
                            continue;
                        }
                        break;
                    }
                }
            }
            '$' if i == 0 || !is_word_char(chars[i - 1]) => match dollar_tag(&chars, i) {
                Some(tag_len) => {
                    let tag: Vec<char> = chars[i..i + tag_len].to_vec();
                    for &ch in &tag {
                        out.push(ch, line);
                    }
                    i += tag_len;
                    let body_end = find_seq(&chars, i, &tag).map_or(len, |p| p + tag_len);
                    while i < body_end {
                        let ch = chars[i];
                        out.push_raw(ch, line);
                        if ch == '\n' {
                            line += 1;
                        }
                        i += 1;
                    }
                }
                None => {
                    out.push(c, line);
                    i += 1;
                }
            },
            ';' => {
                if blocks.is_empty() {
                    out.terminate(line);
                } else {
                    out.push(c, line);
                }
                i += 1;
            }
            c if is_word_char(c) && (i == 0 || !is_word_char(chars[i - 1])) => {
                let start = i;
                while i < len && is_word_char(chars[i]) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let upper = word.to_uppercase();
                let qualified = start > 0 && chars[start - 1] == '.';
                if !qualified {
                    track_block(&upper, prev_word.as_deref(), &chars, i, &mut blocks);
                }
                for ch in word.chars() {
                    out.push(ch, line);
                }
                prev_word = Some(upper);
            }
            c if c.is_whitespace() => {
                out.whitespace(c);
                i += 1;
            }
            _ => {
                out.push(c, line);
                i += 1;
            }
        }
    }

    out.finish()
}

/// Update the block stack for a keyword that ends right before `after`.
fn track_block(
    word: &str,
    prev_word: Option<&str>,
    chars: &[char],
    after: usize,
    blocks: &mut Vec<Block>,
) {
    match word {
        "BEGIN" => {
            let is_transaction = match lookahead(chars, after) {
                Lookahead::Char(';') | Lookahead::End => true,
                Lookahead::Word(w) => TRANSACTION_MARKERS.contains(&w.as_str()),
                Lookahead::Char(_) => false,
            };
            blocks.push(if is_transaction {
                Block::Transaction
            } else {
                Block::Procedural
            });
        }
        "START" => {
            if lookahead(chars, after) == Lookahead::Word("TRANSACTION".to_string()) {
                blocks.push(Block::Transaction);
            }
        }
        "CASE" if prev_word != Some("END") => blocks.push(Block::Case),
        "END" => {
            let skip = matches!(
                lookahead(chars, after),
                Lookahead::Word(ref w) if END_NON_CLOSERS.contains(&w.as_str())
            );
            if !skip {
                blocks.pop();
            }
        }
        "COMMIT" | "ROLLBACK" => {
            let savepoint = word == "ROLLBACK"
                && lookahead(chars, after) == Lookahead::Word("TO".to_string());
            if !savepoint && blocks.last() == Some(&Block::Transaction) {
                blocks.pop();
            }
        }
        _ => {}
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Lookahead {
    Word(String),
    Char(char),
    End,
}

/// The next token after `from`, skipping whitespace.
fn lookahead(chars: &[char], from: usize) -> Lookahead {
    let mut i = from;
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    match chars.get(i) {
        None => Lookahead::End,
        Some(&c) if is_word_char(c) => {
            let start = i;
            while i < chars.len() && is_word_char(chars[i]) {
                i += 1;
            }
            Lookahead::Word(chars[start..i].iter().collect::<String>().to_uppercase())
        }
        Some(&c) => Lookahead::Char(c),
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Length of a dollar-quote tag (`$$` or `$ident$`) starting at `at`.
fn dollar_tag(chars: &[char], at: usize) -> Option<usize> {
    match chars.get(at + 1) {
        Some('$') => Some(2),
        Some(&c) if c.is_ascii_alphabetic() || c == '_' => {
            let mut j = at + 2;
            while j < chars.len() && (chars[j].is_ascii_alphanumeric() || chars[j] == '_') {
                j += 1;
            }
            (chars.get(j) == Some(&'$')).then_some(j + 1 - at)
        }
        _ => None,
    }
}

fn find_seq(chars: &[char], from: usize, needle: &[char]) -> Option<usize> {
    if from >= chars.len() {
        return None;
    }
    chars[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Accumulates statement text and closes groups at line ends.
#[derive(Debug, Default)]
struct GroupBuilder {
    groups: Vec<StatementGroup>,
    statements: Vec<String>,
    current: String,
    pending_space: bool,
    start_line: Option<usize>,
    last_line: usize,
    /// The last significant character seen was a top-level `;`.
    terminated: bool,
}

impl GroupBuilder {
    /// Significant character outside any opaque region.
    fn push(&mut self, c: char, line: usize) {
        if self.pending_space && !self.current.is_empty() && !self.current.ends_with(' ') {
            self.current.push(' ');
        }
        self.pending_space = false;
        self.push_raw(c, line);
    }

    /// Character copied verbatim from a string or dollar body.
    fn push_raw(&mut self, c: char, line: usize) {
        self.current.push(c);
        if c != '\n' {
            self.start_line.get_or_insert(line);
            self.last_line = line;
        }
        self.terminated = false;
    }

    fn whitespace(&mut self, c: char) {
        if !self.current.is_empty() && !self.pending_space {
            self.current.push(c);
        }
    }

    /// Line break or removed comment: collapses to a single space.
    fn soft_break(&mut self) {
        let trimmed = self.current.trim_end().len();
        self.current.truncate(trimmed);
        self.pending_space = !self.current.is_empty();
    }

    fn terminate(&mut self, line: usize) {
        let stmt = self.current.trim();
        if !stmt.is_empty() {
            self.statements.push(stmt.to_string());
            self.last_line = line;
        }
        self.current.clear();
        self.pending_space = false;
        self.terminated = true;
    }

    fn end_line(&mut self) {
        self.soft_break();
        if self.terminated && !self.statements.is_empty() {
            self.flush();
        }
    }

    fn flush(&mut self) {
        let statements = std::mem::take(&mut self.statements);
        self.groups.push(StatementGroup {
            start_line: self.start_line.take().unwrap_or(self.last_line),
            end_line: self.last_line,
            statements,
        });
        self.terminated = false;
    }

    fn finish(mut self) -> Vec<StatementGroup> {
        let tail = self.current.trim().to_string();
        if !tail.is_empty() {
            self.statements.push(tail);
        }
        if !self.statements.is_empty() {
            self.flush();
        }
        self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(start: usize, end: usize, statements: &[&str]) -> StatementGroup {
        StatementGroup {
            start_line: start,
            end_line: end,
            statements: statements.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_single_statement() {
        assert_eq!(segment("SELECT 1;"), vec![group(1, 1, &["SELECT 1"])]);
        assert_eq!(
            segment("SELECT * FROM users"),
            vec![group(1, 1, &["SELECT * FROM users"])]
        );
    }

    #[test]
    fn test_statements_on_one_line_share_a_group() {
        assert_eq!(
            segment("SELECT 1; SELECT 2;"),
            vec![group(1, 1, &["SELECT 1", "SELECT 2"])]
        );
    }

    #[test]
    fn test_one_group_per_line() {
        assert_eq!(
            segment("SELECT * FROM users;\nSELECT * FROM posts;"),
            vec![
                group(1, 1, &["SELECT * FROM users"]),
                group(2, 2, &["SELECT * FROM posts"]),
            ]
        );
    }

    #[test]
    fn test_multi_line_statement() {
        let expected = vec![group(1, 3, &["SELECT * FROM users WHERE id = 1"])];
        assert_eq!(segment("SELECT *\nFROM users\nWHERE id = 1;"), expected);
        assert_eq!(segment("SELECT *\nFROM users\nWHERE id = 1"), expected);
    }

    #[test]
    fn test_multi_line_then_same_line() {
        assert_eq!(
            segment("SELECT *\nFROM users\nWHERE id = 1; SELECT * FROM posts;"),
            vec![group(
                1,
                3,
                &["SELECT * FROM users WHERE id = 1", "SELECT * FROM posts"]
            )]
        );
    }

    #[test]
    fn test_line_comments() {
        assert_eq!(
            segment("-- This is a comment\nSELECT * FROM users;\n-- Another comment\nSELECT * FROM posts;"),
            vec![
                group(2, 2, &["SELECT * FROM users"]),
                group(4, 4, &["SELECT * FROM posts"]),
            ]
        );
        assert_eq!(
            segment("SELECT * FROM users -- get all users\nWHERE id = 1;"),
            vec![group(1, 2, &["SELECT * FROM users WHERE id = 1"])]
        );
    }

    #[test]
    fn test_block_comments() {
        assert_eq!(
            segment("/* This is a\nmulti-line comment */\nSELECT * FROM users;\n/* Another comment */\nSELECT * FROM posts;"),
            vec![
                group(3, 3, &["SELECT * FROM users"]),
                group(5, 5, &["SELECT * FROM posts"]),
            ]
        );
        assert_eq!(
            segment("SELECT 1 /* ; */ + 1;"),
            vec![group(1, 1, &["SELECT 1 + 1"])]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(segment("").is_empty());
        assert!(segment("   \n  \n  ").is_empty());
        assert!(segment("-- Just a comment\n/* Another comment */").is_empty());
        assert!(segment(";;\n;").is_empty());
    }

    #[test]
    fn test_statement_per_line() {
        let sql = "INSERT INTO users (name, email) VALUES ('John', 'john@example.com');\nUPDATE users SET active = true WHERE id = 1;\nDELETE FROM users WHERE id = 2;";
        assert_eq!(
            segment(sql),
            vec![
                group(
                    1,
                    1,
                    &["INSERT INTO users (name, email) VALUES ('John', 'john@example.com')"]
                ),
                group(2, 2, &["UPDATE users SET active = true WHERE id = 1"]),
                group(3, 3, &["DELETE FROM users WHERE id = 2"]),
            ]
        );
    }

    #[test]
    fn test_semicolon_inside_string() {
        assert_eq!(
            segment("SELECT ';' AS semi, 'it''s;' AS q; SELECT \"a;b\" FROM t;"),
            vec![group(
                1,
                1,
                &["SELECT ';' AS semi, 'it''s;' AS q", "SELECT \"a;b\" FROM t"]
            )]
        );
    }

    #[test]
    fn test_dollar_quoted_function() {
        let sql = r#"CREATE OR REPLACE FUNCTION limpar_sessoes_expiradas () RETURNS void AS $$ BEGIN DELETE FROM public.sessions WHERE "expires" < NOW() - INTERVAL '1 day'; END; $$ LANGUAGE plpgsql;"#;
        assert_eq!(
            segment(sql),
            vec![group(1, 1, &[sql.trim_end_matches(';')])]
        );
    }

    #[test]
    fn test_multi_line_do_block() {
        let sql = "DO $$\nBEGIN\n  PERFORM 1;\n  RAISE NOTICE 'done';\nEND $$;";
        let groups = segment(sql);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].start_line, 1);
        assert_eq!(groups[0].end_line, 5);
        assert_eq!(groups[0].statements.len(), 1);
        let stmt = &groups[0].statements[0];
        assert!(stmt.contains("BEGIN"));
        assert!(stmt.contains("END"));
        assert!(stmt.contains("PERFORM 1;\n  RAISE"));
    }

    #[test]
    fn test_tagged_dollar_quote() {
        let sql = "CREATE FUNCTION f() RETURNS int AS $body$ SELECT 1; $body$ LANGUAGE sql; SELECT $1;";
        let groups = segment(sql);
        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0].statements,
            vec![
                "CREATE FUNCTION f() RETURNS int AS $body$ SELECT 1; $body$ LANGUAGE sql",
                "SELECT $1"
            ]
        );
    }

    #[test]
    fn test_begin_end_block() {
        let sql = "BEGIN\n        UPDATE users SET active = false WHERE id = 1;\n        INSERT INTO audit_log (user_id, action) VALUES (1, 'deactivate');\n      END;";
        assert_eq!(
            segment(sql),
            vec![group(
                1,
                4,
                &["BEGIN UPDATE users SET active = false WHERE id = 1; INSERT INTO audit_log (user_id, action) VALUES (1, 'deactivate'); END"]
            )]
        );
    }

    #[test]
    fn test_transaction_block_is_one_statement() {
        let sql = "BEGIN;
      ALTER TABLE feature_flag_users ADD COLUMN phone VARCHAR(255);
      UPDATE feature_flag_users ffu
      SET phone = u.phone
      FROM users u
      WHERE u.id = ffu.user_id;

      DO $$
      BEGIN
        IF EXISTS (SELECT 1 FROM feature_flag_users WHERE phone IS NULL) THEN
          RAISE EXCEPTION 'rows with phone = NULL exists, check user_id';
        END IF;
      END $$;

      ALTER TABLE feature_flag_users ALTER COLUMN phone SET NOT NULL;
    COMMIT;";
        let groups = segment(sql);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].start_line, 1);
        assert_eq!(groups[0].end_line, 16);
        assert_eq!(groups[0].statements.len(), 1);
        let stmt = &groups[0].statements[0];
        assert!(stmt.starts_with("BEGIN;"));
        assert!(stmt.ends_with("COMMIT"));
        assert!(stmt.contains("DO $$"));
        assert!(stmt.contains("END $$"));
    }

    #[test]
    fn test_rollback_to_savepoint_keeps_transaction_open() {
        let sql = "START TRANSACTION;\nSAVEPOINT a;\nROLLBACK TO a;\nCOMMIT;\nSELECT 1;";
        assert_eq!(
            segment(sql),
            vec![
                group(
                    1,
                    4,
                    &["START TRANSACTION; SAVEPOINT a; ROLLBACK TO a; COMMIT"]
                ),
                group(5, 5, &["SELECT 1"]),
            ]
        );
    }

    #[test]
    fn test_end_if_does_not_close_block() {
        let sql = "CREATE PROCEDURE p()\nBEGIN\n  IF x THEN\n    SELECT 1;\n  END IF;\nEND;\nSELECT 2;";
        let groups = segment(sql);
        assert_eq!(groups.len(), 2);
        assert_eq!((groups[0].start_line, groups[0].end_line), (1, 6));
        assert_eq!(groups[0].statements.len(), 1);
        assert_eq!(groups[1], group(7, 7, &["SELECT 2"]));
    }

    #[test]
    fn test_case_expression() {
        assert_eq!(
            segment("SELECT CASE WHEN a THEN 1 ELSE 0 END FROM t; SELECT 2;")[0]
                .statements
                .len(),
            2
        );
        let sql = "BEGIN\n  SELECT CASE WHEN x THEN 1 END;\n  SELECT 2;\nEND;";
        let groups = segment(sql);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].statements.len(), 1);
    }

    #[test]
    fn test_word_boundaries() {
        let groups = segment("SELECT beginning, backend, t.end FROM t; SELECT 2;");
        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0].statements,
            vec!["SELECT beginning, backend, t.end FROM t", "SELECT 2"]
        );
    }

    #[test]
    fn test_unterminated_constructs_fold_into_trailing_group() {
        let groups = segment("SELECT 1;\nSELECT 'abc;\nSELECT 2;");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].start_line, 2);
        assert_eq!(groups[1].end_line, 3);
        assert_eq!(groups[1].statements.len(), 1);

        let groups = segment("DO $$ BEGIN\nSELECT 1;");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].statements.len(), 1);

        let groups = segment("SELECT 1; /* never closed ;\nSELECT 2;");
        assert_eq!(groups, vec![group(1, 1, &["SELECT 1"])]);
    }

    #[test]
    fn test_trailing_group_ends_at_last_content_line() {
        let groups = segment("SELECT 1;\nSELECT 2\n\n-- done\n");
        assert_eq!(
            groups,
            vec![group(1, 1, &["SELECT 1"]), group(2, 2, &["SELECT 2"])]
        );
    }

    #[test]
    fn test_statement_count_matches_top_level_semicolons() {
        let cases = [
            ("SELECT 1; SELECT 2; SELECT 3", 3),
            ("SELECT ';';\nSELECT 2;", 2),
            ("BEGIN\n SELECT 1;\nEND;\nSELECT 2", 2),
            ("SELECT $$;$$;", 1),
        ];
        for (sql, expected) in cases {
            let count: usize = segment(sql).iter().map(|g| g.statements.len()).sum();
            assert_eq!(count, expected, "{}", sql);
        }
    }

    #[test]
    fn test_statement_at_line() {
        let groups = segment("SELECT 1;\n\nSELECT *\nFROM t;");
        assert_eq!(statement_at_line(&groups, 1), Some(&groups[0]));
        assert_eq!(statement_at_line(&groups, 2), None);
        assert_eq!(statement_at_line(&groups, 4), Some(&groups[1]));
        assert_eq!(groups[1].statements, vec!["SELECT * FROM t"]);
    }
}
