// src/types.rs
use std::fmt;
use std::str::FromStr;
use serde::{Serialize, Deserialize};
use crate::error::Error;

/// Catalog identifier of a table
pub type TableId = u32;

/// Column types the statistics layer keeps histograms for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Int,
    String,
}

/// A single field value as produced by a row scan
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    String(String),
}

impl Value {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Int(_) => ColumnType::Int,
            Value::String(_) => ColumnType::String,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::String(s) => write!(f, "'{}'", s),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Int => write!(f, "INT"),
            ColumnType::String => write!(f, "STRING"),
        }
    }
}

/// Comparison operator of a `column OP constant` predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEq,
    GreaterThan,
    GreaterThanOrEq,
    /// Estimated as `Equals`; no pattern matching happens here.
    Like,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Op::Equals => "=",
            Op::NotEquals => "<>",
            Op::LessThan => "<",
            Op::LessThanOrEq => "<=",
            Op::GreaterThan => ">",
            Op::GreaterThanOrEq => ">=",
            Op::Like => "LIKE",
        };
        write!(f, "{}", symbol)
    }
}

impl FromStr for Op {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "=" | "==" => Ok(Op::Equals),
            "<>" | "!=" => Ok(Op::NotEquals),
            "<" => Ok(Op::LessThan),
            "<=" => Ok(Op::LessThanOrEq),
            ">" => Ok(Op::GreaterThan),
            ">=" => Ok(Op::GreaterThanOrEq),
            "LIKE" => Ok(Op::Like),
            other => Err(Error::Type(format!("Unsupported comparison operator: {}", other))),
        }
    }
}
