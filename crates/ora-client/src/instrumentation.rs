//! Statement classification and sanitization for logs and audit trails.
//!
//! Statements are never logged verbatim: literals are replaced with a
//! placeholder and the text is truncated. Oracle specifics handled here:
//!
//! - `'...'` and alternative-quoting `q'[...]'` are string literals
//! - `"..."` is a quoted identifier and kept as is
//! - `:1` / `:name` are bind placeholders and kept as is

/// Database system identifier used in structured log fields.
pub const DB_SYSTEM: &str = "oracle";

/// How statement text is prepared before it is logged.
#[derive(Debug, Clone)]
pub struct SanitizationConfig {
    /// Replace literals with the placeholder.
    pub enabled: bool,
    /// Longest statement text kept, in bytes.
    pub max_length: usize,
    /// Text substituted for each literal.
    pub placeholder: String,
}

impl Default for SanitizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_length: 2048,
            placeholder: "?".to_string(),
        }
    }
}

impl SanitizationConfig {
    /// Keep statements verbatim and untruncated.
    #[must_use]
    pub fn no_sanitization() -> Self {
        Self {
            enabled: false,
            max_length: usize::MAX,
            placeholder: String::new(),
        }
    }

    /// Apply this configuration to `sql`.
    #[must_use]
    pub fn sanitize(&self, sql: &str) -> String {
        if self.enabled {
            truncate_string(&sanitize_sql(sql, &self.placeholder), self.max_length)
        } else {
            truncate_string(sql, self.max_length)
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '#')
}

fn closing_delimiter(open: char) -> char {
    match open {
        '[' => ']',
        '{' => '}',
        '<' => '>',
        '(' => ')',
        other => other,
    }
}

/// Replace literal values with `placeholder`.
pub fn sanitize_sql(sql: &str, placeholder: &str) -> String {
    let mut chars = sql.chars().peekable();
    let mut out = String::with_capacity(sql.len());

    while let Some(c) = chars.next() {
        let after_word = out.ends_with(is_ident_char);

        // q'[...]' alternative quoting
        if (c == 'q' || c == 'Q') && !after_word && chars.peek() == Some(&'\'') {
            chars.next();
            let close = chars.next().map(closing_delimiter);
            while let Some(ch) = chars.next() {
                if Some(ch) == close && chars.peek() == Some(&'\'') {
                    chars.next();
                    break;
                }
            }
            out.push_str(placeholder);
            continue;
        }

        if c == '\'' {
            while let Some(ch) = chars.next() {
                if ch == '\'' {
                    if chars.peek() == Some(&'\'') {
                        chars.next();
                        continue;
                    }
                    break;
                }
            }
            out.push_str(placeholder);
            continue;
        }

        if c == '"' {
            out.push(c);
            for ch in chars.by_ref() {
                out.push(ch);
                if ch == '"' {
                    break;
                }
            }
            continue;
        }

        // Numbers that are not part of an identifier or a bind placeholder
        if c.is_ascii_digit() && !after_word && !out.ends_with(':') {
            while chars
                .peek()
                .is_some_and(|&ch| ch == '.' || ch.is_ascii_digit())
            {
                chars.next();
            }
            out.push_str(placeholder);
            continue;
        }

        out.push(c);
    }

    out
}

/// Truncate a string to at most `max_len` bytes, on a character boundary.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let budget = max_len.saturating_sub(3);
    let cut = s
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|&i| i <= budget)
        .last()
        .unwrap_or(0);
    format!("{}...", &s[..cut])
}

/// Classify a statement by its leading keyword.
#[must_use]
pub fn extract_operation(sql: &str) -> &'static str {
    let first = sql
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default()
        .to_uppercase();

    match first.as_str() {
        "SELECT" | "WITH" => "SELECT",
        "INSERT" => "INSERT",
        "UPDATE" => "UPDATE",
        "DELETE" => "DELETE",
        "MERGE" => "MERGE",
        "BEGIN" | "DECLARE" => "PLSQL",
        "CALL" | "EXEC" | "EXECUTE" => "CALL",
        "COMMIT" => "COMMIT",
        "ROLLBACK" => "ROLLBACK",
        "SAVEPOINT" => "SAVEPOINT",
        "CREATE" => "CREATE",
        "ALTER" => "ALTER",
        "DROP" => "DROP",
        "TRUNCATE" => "TRUNCATE",
        "GRANT" => "GRANT",
        "REVOKE" => "REVOKE",
        _ => "OTHER",
    }
}

/// Whether the operation may leave an open transaction behind.
#[must_use]
pub fn is_dml(operation: &str) -> bool {
    matches!(
        operation,
        "INSERT" | "UPDATE" | "DELETE" | "MERGE" | "PLSQL" | "CALL"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_keyword_classifies() {
        assert_eq!(extract_operation("SELECT * FROM orders"), "SELECT");
        assert_eq!(extract_operation("  select id from orders"), "SELECT");
        assert_eq!(extract_operation("WITH x AS (SELECT 1 FROM dual) SELECT * FROM x"), "SELECT");
        assert_eq!(extract_operation("INSERT INTO t VALUES (1)"), "INSERT");
        assert_eq!(extract_operation("merge into t using s on (1=1)"), "MERGE");
        assert_eq!(extract_operation("BEGIN dbms_stats.gather_schema_stats('HR'); END;"), "PLSQL");
        assert_eq!(extract_operation("TRUNCATE TABLE t"), "TRUNCATE");
        assert_eq!(extract_operation("CALL proc()"), "CALL");
        assert_eq!(extract_operation("EXPLAIN PLAN FOR SELECT 1 FROM dual"), "OTHER");
        assert_eq!(extract_operation(""), "OTHER");
    }

    #[test]
    fn test_sanitize_sql() {
        let placeholder = "?";

        assert_eq!(
            sanitize_sql("SELECT * FROM emp WHERE ename = 'KING'", placeholder),
            "SELECT * FROM emp WHERE ename = ?"
        );
        assert_eq!(
            sanitize_sql("SELECT * FROM emp WHERE ename = 'O''Brien'", placeholder),
            "SELECT * FROM emp WHERE ename = ?"
        );
        assert_eq!(
            sanitize_sql("SELECT * FROM emp WHERE empno = 7839 AND sal > 10.5", placeholder),
            "SELECT * FROM emp WHERE empno = ? AND sal > ?"
        );
        assert_eq!(
            sanitize_sql("SELECT q'[it's]' FROM dual", placeholder),
            "SELECT ? FROM dual"
        );
    }

    #[test]
    fn test_sanitize_keeps_binds_and_identifiers() {
        assert_eq!(
            sanitize_sql("SELECT \"Col1\" FROM t2 WHERE id = :1 AND x = :name", "?"),
            "SELECT \"Col1\" FROM t2 WHERE id = :1 AND x = :name"
        );
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        assert_eq!(truncate_string("DUAL", 10), "DUAL");
        assert_eq!(truncate_string("SELECT * FROM emp", 9), "SELECT...");
        assert_eq!(truncate_string("emp", 3), "emp");
        assert_eq!(truncate_string("ééééé", 6), "é...");
    }

    #[test]
    fn test_verbatim_config_keeps_literals() {
        let verbatim = SanitizationConfig::no_sanitization();
        let sql = "SELECT * FROM emp WHERE ename = 'KING'";
        assert_eq!(verbatim.sanitize(sql), sql);
        assert_eq!(
            SanitizationConfig::default().sanitize(sql),
            "SELECT * FROM emp WHERE ename = ?"
        );
    }
}
