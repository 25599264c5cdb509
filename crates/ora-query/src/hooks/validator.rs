use std::collections::HashSet;

use async_trait::async_trait;

use super::{ExecutionContext, ExecutionHook, HookRejection};

/// Counts bind placeholders (`:1`, `:name`) in a statement.
///
/// Returns `(distinct, total)`. String literals (including `q'[...]'`),
/// quoted identifiers, comments and the PL/SQL assignment operator `:=` are
/// skipped.
#[must_use]
pub fn count_bind_placeholders(sql: &str) -> (usize, usize) {
    let mut names = HashSet::new();
    let mut total = 0;
    let mut chars = sql.chars().peekable();
    let mut prev = ' ';

    while let Some(c) = chars.next() {
        match c {
            'q' | 'Q' if !is_word(prev) && chars.peek() == Some(&'\'') => {
                chars.next();
                let close = match chars.next() {
                    Some('[') => ']',
                    Some('{') => '}',
                    Some('<') => '>',
                    Some('(') => ')',
                    Some(other) => other,
                    None => break,
                };
                while let Some(ch) = chars.next() {
                    if ch == close && chars.peek() == Some(&'\'') {
                        chars.next();
                        break;
                    }
                }
            }
            '\'' => {
                while let Some(ch) = chars.next() {
                    if ch == '\'' {
                        if chars.peek() == Some(&'\'') {
                            chars.next();
                            continue;
                        }
                        break;
                    }
                }
            }
            '"' => {
                for ch in chars.by_ref() {
                    if ch == '"' {
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                for ch in chars.by_ref() {
                    if ch == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut star = false;
                for ch in chars.by_ref() {
                    if star && ch == '/' {
                        break;
                    }
                    star = ch == '*';
                }
            }
            ':' => {
                let mut name = String::new();
                while let Some(&ch) = chars.peek() {
                    if !is_word(ch) {
                        break;
                    }
                    name.push(ch.to_ascii_uppercase());
                    chars.next();
                }
                if !name.is_empty() {
                    total += 1;
                    names.insert(name);
                }
            }
            _ => {}
        }
        prev = c;
    }

    (names.len(), total)
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '#')
}

/// Rejects statements that are empty, too long, or whose bind count does not
/// match the parameters supplied.
///
/// A parameter count equal to either the number of distinct placeholders or
/// the number of placeholder occurrences is accepted.
#[derive(Debug, Clone)]
pub struct StatementValidator {
    max_length: usize,
    check_binds: bool,
}

impl StatementValidator {
    /// A validator with a 1 MiB length limit and bind checking enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_length: 1 << 20,
            check_binds: true,
        }
    }

    /// Set the maximum statement length in bytes.
    #[must_use]
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Enable or disable bind count checking.
    #[must_use]
    pub fn check_binds(mut self, enabled: bool) -> Self {
        self.check_binds = enabled;
        self
    }

    fn check(&self, sql: &str, params: usize) -> Result<(), String> {
        if sql.trim().is_empty() {
            return Err("statement is empty".into());
        }
        if sql.len() > self.max_length {
            return Err(format!(
                "statement is {} bytes, limit is {}",
                sql.len(),
                self.max_length
            ));
        }
        if self.check_binds {
            let (distinct, total) = count_bind_placeholders(sql);
            if params != distinct && params != total {
                return Err(format!(
                    "statement has {distinct} bind placeholders but {params} values were supplied"
                ));
            }
        }
        Ok(())
    }
}

impl Default for StatementValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionHook for StatementValidator {
    fn name(&self) -> &str {
        "statement-validator"
    }

    async fn before_execute(&self, ctx: &ExecutionContext<'_>) -> Result<(), HookRejection> {
        self.check(ctx.sql, ctx.params.len())
            .map_err(|reason| HookRejection::new(self.name(), reason))
    }
}
