/// Statement classification and INSERT decomposition.
///
/// This module decides, from SQL text alone, which execution context a
/// statement needs: the schema-update queue for DDL, a read-only snapshot for
/// queries, or a retryable transaction attempt for mutations. For INSERTs it
/// additionally decomposes the statement so that the common bulk case can go
/// through the single-RPC bulk-write call instead of per-row statement
/// execution.
///
/// Classification is a pure function of the statement's leading keyword; no
/// database round trip is involved.
use crate::error::{Error, Result};
use crate::params::Params;
use crate::value::{Row, Value};

/// Statement class, driving execution-context selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Schema change (CREATE / DROP / ALTER); runs through the asynchronous
    /// schema-update queue.
    Ddl,
    /// INSERT; candidate for the bulk-write fast path.
    Insert,
    /// Read-only statement; runs in a snapshot.
    NonUpdating,
    /// Any other mutating statement (UPDATE, DELETE, ...); runs inside a
    /// retryable transaction attempt.
    Updating,
}

/// Classify a SQL statement by its leading keyword.
pub fn classify(sql: &str) -> StatementKind {
    let keyword = sql
        .trim_start()
        .trim_start_matches('(')
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or("")
        .to_uppercase();

    match keyword.as_str() {
        "CREATE" | "DROP" | "ALTER" => StatementKind::Ddl,
        "INSERT" => StatementKind::Insert,
        "SELECT" | "WITH" => StatementKind::NonUpdating,
        _ => StatementKind::Updating,
    }
}

/// Append `WHERE 1=1` to UPDATE/DELETE statements that carry no WHERE
/// clause. The backend rejects unbounded mutations; the tautology makes the
/// caller's intent explicit on the wire.
pub fn ensure_where_clause(sql: &str) -> String {
    let trimmed = sql.trim().trim_end_matches(';').trim_end();
    let keyword = trimmed
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_uppercase();
    if keyword != "UPDATE" && keyword != "DELETE" {
        return trimmed.to_string();
    }
    if contains_keyword(trimmed, "WHERE") {
        return trimmed.to_string();
    }
    format!("{trimmed} WHERE 1=1")
}

/// Whether `keyword` appears as a standalone word outside string literals.
fn contains_keyword(sql: &str, keyword: &str) -> bool {
    let mut in_string = false;
    for word in sql.split_whitespace() {
        if in_string {
            if word.matches('\'').count() % 2 == 1 {
                in_string = false;
            }
            continue;
        }
        if word.eq_ignore_ascii_case(keyword) {
            return true;
        }
        if word.matches('\'').count() % 2 == 1 {
            in_string = true;
        }
    }
    false
}

/// Decomposition of an INSERT statement.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertPlan {
    /// Every value row is a literal tuple of uniform shape: the whole
    /// statement collapses into one bulk-write call.
    Homogeneous {
        table: String,
        columns: Vec<String>,
        rows: Vec<Row>,
    },
    /// Rows mix expressions, subqueries or uneven shapes: fall back to one
    /// single-row statement per value tuple. The bulk-write primitive only
    /// accepts literal value matrices, so this path keeps full SQL
    /// flexibility at the cost of per-row execution.
    Heterogeneous { statements: Vec<(String, Params)> },
}

/// One comma-separated item inside a VALUES row.
#[derive(Debug, Clone, PartialEq)]
enum ValueToken {
    Literal(Value),
    Placeholder,
    Expression(String),
}

/// Decompose an INSERT into the bulk path or the per-row fallback.
///
/// The bulk path applies when every VALUES row is a literal tuple matching
/// the column list, or when a single all-placeholder row is paired with a
/// positional argument list that chunks evenly into rows. Anything else -
/// expressions, subqueries, named arguments spanning rows - takes the
/// fallback.
pub fn parse_insert(sql: &str, params: &Params) -> Result<InsertPlan> {
    let Some(shape) = split_insert(sql)? else {
        // INSERT ... SELECT and other non-VALUES shapes: execute verbatim.
        return Ok(InsertPlan::Heterogeneous {
            statements: vec![(sql.to_string(), params.clone())],
        });
    };

    let column_count = shape.columns.len();
    let mut rows: Vec<Vec<ValueToken>> = Vec::with_capacity(shape.value_rows.len());
    for group in &shape.value_rows {
        let tokens = tokenize_row(group)?;
        if tokens.is_empty() {
            return Err(Error::Programming(format!(
                "empty VALUES row in statement: {sql}"
            )));
        }
        rows.push(tokens);
    }

    let all_literal = rows
        .iter()
        .all(|row| row.iter().all(|t| matches!(t, ValueToken::Literal(_))));
    let uniform = rows.iter().all(|row| row.len() == column_count);

    if all_literal && uniform {
        let matrix = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|t| match t {
                        ValueToken::Literal(v) => v,
                        _ => Value::Null,
                    })
                    .collect()
            })
            .collect();
        return Ok(InsertPlan::Homogeneous {
            table: shape.table,
            columns: shape.columns,
            rows: matrix,
        });
    }

    // Single all-placeholder row + flat positional args that chunk evenly:
    //   INSERT INTO T (a, b) VALUES (%s, %s)  with  [1, 2, 3, 4]
    // becomes rows [[1, 2], [3, 4]] for the bulk call.
    if rows.len() == 1
        && column_count > 0
        && rows[0].len() == column_count
        && rows[0].iter().all(|t| matches!(t, ValueToken::Placeholder))
    {
        if let Params::Positional(args) = params {
            if !args.is_empty() && args.len() % column_count == 0 {
                let matrix = args
                    .chunks(column_count)
                    .map(<[Value]>::to_vec)
                    .collect();
                return Ok(InsertPlan::Homogeneous {
                    table: shape.table,
                    columns: shape.columns,
                    rows: matrix,
                });
            }
        }
    }

    heterogeneous_plan(&shape, &rows, params)
}

/// Build the per-row fallback: one rewritten single-row INSERT per value
/// tuple, each carrying its own slice of the positional arguments.
fn heterogeneous_plan(
    shape: &InsertShape,
    rows: &[Vec<ValueToken>],
    params: &Params,
) -> Result<InsertPlan> {
    // Named arguments cannot be split across rows; hand the statement over
    // unchanged and let each placeholder resolve against the full map.
    if matches!(params, Params::Named(_)) {
        return Ok(InsertPlan::Heterogeneous {
            statements: vec![(shape.original.clone(), params.clone())],
        });
    }

    let positional: &[Value] = match params {
        Params::Positional(args) => args,
        _ => &[],
    };

    let columns_sql = if shape.columns.is_empty() {
        String::new()
    } else {
        format!(" ({})", shape.columns.join(", "))
    };

    let mut statements = Vec::with_capacity(rows.len());
    let mut consumed = 0usize;
    for (row, group) in rows.iter().zip(&shape.value_rows) {
        let needed = row
            .iter()
            .filter(|t| matches!(t, ValueToken::Placeholder))
            .count();
        if consumed + needed > positional.len() {
            return Err(Error::Programming(format!(
                "not enough arguments for statement: {}",
                shape.original
            )));
        }
        let row_params = positional[consumed..consumed + needed].to_vec();
        consumed += needed;

        let stmt = format!(
            "INSERT INTO {}{} VALUES ({})",
            shape.table, columns_sql, group
        );
        statements.push((stmt, Params::Positional(row_params)));
    }

    if consumed != positional.len() {
        return Err(Error::Programming(format!(
            "too many arguments for statement: {}",
            shape.original
        )));
    }

    Ok(InsertPlan::Heterogeneous { statements })
}

/// Structural pieces of `INSERT INTO table (cols) VALUES (...), (...)`.
struct InsertShape {
    original: String,
    table: String,
    columns: Vec<String>,
    /// Raw text of each parenthesized value group, parens stripped.
    value_rows: Vec<String>,
}

/// Split an INSERT into table, column list and raw value groups.
///
/// Returns `Ok(None)` for INSERT shapes without a VALUES clause
/// (e.g. INSERT ... SELECT), which are executed verbatim.
fn split_insert(sql: &str) -> Result<Option<InsertShape>> {
    let rest = sql.trim();
    let rest = strip_keyword(rest, "INSERT")
        .ok_or_else(|| Error::Programming(format!("malformed INSERT statement: {sql}")))?;
    let rest = strip_keyword(rest, "INTO").unwrap_or(rest);

    let rest = rest.trim_start();
    let table_end = rest
        .find(|c: char| c.is_whitespace() || c == '(')
        .unwrap_or(rest.len());
    let table = rest[..table_end].trim_matches('`').to_string();
    if table.is_empty() {
        return Err(Error::Programming(format!(
            "malformed INSERT statement: {sql}"
        )));
    }
    let mut rest = rest[table_end..].trim_start();

    let mut columns = Vec::new();
    if rest.starts_with('(') {
        let (inner, after) = take_group(rest)
            .ok_or_else(|| Error::Programming(format!("unbalanced parentheses: {sql}")))?;
        columns = inner
            .split(',')
            .map(|c| c.trim().trim_matches('`').to_string())
            .filter(|c| !c.is_empty())
            .collect();
        rest = after.trim_start();
    }

    let Some(rest) = strip_keyword(rest, "VALUES") else {
        return Ok(None);
    };

    let mut value_rows = Vec::new();
    let mut rest = rest.trim_start();
    loop {
        let (inner, after) = take_group(rest)
            .ok_or_else(|| Error::Programming(format!("unbalanced parentheses: {sql}")))?;
        value_rows.push(inner.to_string());
        rest = after.trim_start();
        if let Some(after_comma) = rest.strip_prefix(',') {
            rest = after_comma.trim_start();
        } else {
            break;
        }
    }

    if !rest.is_empty() && rest != ";" {
        // Trailing clauses (THEN RETURN, ON CONFLICT, ...) are beyond the
        // bulk-write call; execute verbatim.
        return Ok(None);
    }

    Ok(Some(InsertShape {
        original: sql.to_string(),
        table,
        columns,
        value_rows,
    }))
}

/// Strip a leading keyword (case-insensitive), returning the remainder.
fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let text = text.trim_start();
    // `get` rather than indexing: the boundary may fall inside a multi-byte
    // character in malformed input.
    if text.get(..keyword.len())?.eq_ignore_ascii_case(keyword) {
        let rest = &text[keyword.len()..];
        if rest.is_empty() || rest.starts_with(|c: char| c.is_whitespace() || c == '(') {
            return Some(rest);
        }
    }
    None
}

/// Take one balanced parenthesized group off the front of `text`, respecting
/// single-quoted strings. Returns the group's interior and the remainder.
fn take_group(text: &str) -> Option<(&str, &str)> {
    let mut chars = text.char_indices();
    let (_, first) = chars.next()?;
    if first != '(' {
        return None;
    }

    let mut depth = 1usize;
    let mut in_string = false;
    for (i, c) in chars {
        if in_string {
            if c == '\'' {
                in_string = false;
            }
            continue;
        }
        match c {
            '\'' => in_string = true,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&text[1..i], &text[i + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}

/// Split a VALUES group into tokens at top-level commas and categorize each
/// as literal, placeholder or expression.
fn tokenize_row(group: &str) -> Result<Vec<ValueToken>> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut start = 0usize;

    for (i, c) in group.char_indices() {
        if in_string {
            if c == '\'' {
                in_string = false;
            }
            continue;
        }
        match c {
            '\'' => in_string = true,
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    Error::Programming(format!("unbalanced parentheses in VALUES row: {group}"))
                })?;
            }
            ',' if depth == 0 => {
                tokens.push(categorize(&group[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }
    if in_string || depth != 0 {
        return Err(Error::Programming(format!(
            "unterminated token in VALUES row: {group}"
        )));
    }
    tokens.push(categorize(&group[start..]));
    Ok(tokens)
}

/// Categorize one VALUES item. Anything that is not a recognized literal or
/// a `%s` placeholder is an expression and forces the fallback path.
fn categorize(raw: &str) -> ValueToken {
    let token = raw.trim();
    if token == "%s" {
        return ValueToken::Placeholder;
    }
    match parse_literal(token) {
        Some(v) => ValueToken::Literal(v),
        None => ValueToken::Expression(token.to_string()),
    }
}

/// Parse a SQL literal: integer, float, single-quoted string (with ''
/// escapes), TRUE/FALSE or NULL.
fn parse_literal(token: &str) -> Option<Value> {
    if token.eq_ignore_ascii_case("null") {
        return Some(Value::Null);
    }
    if token.eq_ignore_ascii_case("true") {
        return Some(Value::Bool(true));
    }
    if token.eq_ignore_ascii_case("false") {
        return Some(Value::Bool(false));
    }
    if let Some(inner) = token
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
    {
        // A lone quote inside would have split the token upstream; only the
        // doubled-quote escape can appear here.
        return Some(Value::String(inner.replace("''", "'")));
    }
    if let Ok(n) = token.parse::<i64>() {
        return Some(Value::Int64(n));
    }
    if let Ok(f) = token.parse::<f64>() {
        // Reject forms like "1e" that f64::parse would not accept anyway and
        // bare words; parse::<f64> already handles this.
        return Some(Value::Float64(f));
    }
    None
}
