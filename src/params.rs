/// Parameter translation.
///
/// Callers hand the driver either printf-style positional placeholders
/// (`%s` plus a value sequence) or the target dialect's own named style
/// (`@name` plus a value map). The execution layer only speaks the named
/// binding protocol, so positional placeholders are rewritten to generated
/// `@a0..@aN` bindings here, preserving argument order. A parallel wire-type
/// map is derived from the bound values.
use std::collections::BTreeMap;
use std::time::Duration;

use crate::client::Statement;
use crate::error::{Error, Result};
use crate::value::{TypeCode, Value};

/// Arguments supplied with a statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Params {
    #[default]
    None,
    /// Values for printf-style `%s` placeholders, in order.
    Positional(Vec<Value>),
    /// Values for `@name` placeholders.
    Named(BTreeMap<String, Value>),
}

impl Params {
    pub fn is_empty(&self) -> bool {
        match self {
            Params::None => true,
            Params::Positional(v) => v.is_empty(),
            Params::Named(m) => m.is_empty(),
        }
    }
}

impl From<Vec<Value>> for Params {
    fn from(v: Vec<Value>) -> Self {
        Params::Positional(v)
    }
}

impl From<BTreeMap<String, Value>> for Params {
    fn from(m: BTreeMap<String, Value>) -> Self {
        Params::Named(m)
    }
}

/// Rewrite placeholder syntax into the backend's named-binding form.
///
/// Returns the rewritten SQL and the name → value map. Placeholder/argument
/// mismatches are programming errors.
pub fn translate(sql: &str, params: &Params) -> Result<(String, BTreeMap<String, Value>)> {
    let slots = count_placeholders(sql);

    match params {
        Params::None => {
            if slots > 0 {
                return Err(Error::Programming(format!(
                    "statement has {slots} placeholder(s) but no arguments were given: {sql}"
                )));
            }
            Ok((sql.to_string(), BTreeMap::new()))
        }
        Params::Named(map) => {
            if slots > 0 {
                return Err(Error::Programming(format!(
                    "positional placeholders cannot be bound from named arguments: {sql}"
                )));
            }
            Ok((sql.to_string(), map.clone()))
        }
        Params::Positional(args) => {
            if slots != args.len() {
                return Err(Error::Programming(format!(
                    "statement has {} placeholder(s) but {} argument(s) were given: {}",
                    slots,
                    args.len(),
                    sql
                )));
            }
            let mut out = String::with_capacity(sql.len());
            let mut map = BTreeMap::new();
            let mut index = 0usize;
            let mut rest = sql;
            while let Some(pos) = find_placeholder(rest) {
                out.push_str(&rest[..pos]);
                out.push_str(&format!("@a{index}"));
                map.insert(format!("a{index}"), args[index].clone());
                index += 1;
                rest = &rest[pos + 2..];
            }
            out.push_str(rest);
            Ok((out, map))
        }
    }
}

/// Derive the wire-type map for a translated parameter map.
///
/// NULL parameters are omitted: they bind untyped and the backend infers the
/// column type.
pub fn param_types(params: &BTreeMap<String, Value>) -> BTreeMap<String, TypeCode> {
    params
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(name, v)| (name.clone(), v.type_code()))
        .collect()
}

/// Translate and package a statement for the backend.
pub(crate) fn build_statement(
    sql: &str,
    params: &Params,
    timeout: Option<Duration>,
) -> Result<Statement> {
    let (sql, params) = translate(sql, params)?;
    let param_types = param_types(&params);
    Ok(Statement {
        sql,
        params,
        param_types,
        timeout,
    })
}

/// Number of `%s` placeholders outside string literals.
fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    let mut rest = sql;
    while let Some(pos) = find_placeholder(rest) {
        count += 1;
        rest = &rest[pos + 2..];
    }
    count
}

/// Byte offset of the next `%s` outside a single-quoted string, if any.
fn find_placeholder(sql: &str) -> Option<usize> {
    let bytes = sql.as_bytes();
    let mut in_string = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => in_string = !in_string,
            b'%' if !in_string && i + 1 < bytes.len() && bytes[i + 1] == b's' => {
                return Some(i);
            }
            _ => {}
        }
        i += 1;
    }
    None
}
