//! Runtime value domain.
//!
//! A compact tagged value type; declared-type checking happened at
//! analysis time, so the runtime only distinguishes the kinds it needs
//! for operator dispatch. `Null` is the bottom value every fault
//! evaluates to.

use indexmap::IndexMap;
use mycelia_dsl::ast::{TypeKind, TypeRef};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Queue(VecDeque<Value>),
    Map(IndexMap<String, Value>),
    Record {
        tag: String,
        fields: IndexMap<String, Value>,
    },
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bytes(_) => "binary",
            Value::List(_) => "vec",
            Value::Queue(_) => "queue",
            Value::Map(_) => "map",
            Value::Record { .. } => "record",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Guard and condition truthiness.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Integer(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::List(v) => !v.is_empty(),
            Value::Queue(q) => !q.is_empty(),
            Value::Map(m) => !m.is_empty(),
            Value::Record { .. } => true,
        }
    }

    /// Zero value for a declared type; used for state fields without an
    /// initializer.
    pub fn default_for(ty: &TypeRef) -> Value {
        match &ty.kind {
            TypeKind::U32 | TypeKind::I64 => Value::Integer(0),
            TypeKind::F64 => Value::Float(0.0),
            TypeKind::Str => Value::Str(String::new()),
            TypeKind::Binary => Value::Bytes(Vec::new()),
            TypeKind::Boolean => Value::Bool(false),
            TypeKind::Vec(_) => Value::List(Vec::new()),
            TypeKind::Queue(_) => Value::Queue(VecDeque::new()),
            TypeKind::Map(_, _) => Value::Map(IndexMap::new()),
            TypeKind::Named(_) => Value::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bytes(b) => {
                write!(f, "<{} bytes>", b.len())
            }
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Queue(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Record { tag, fields } => {
                write!(f, "{} {{", tag)?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {}: {}", key, value)?;
                }
                write!(f, " }}")
            }
        }
    }
}
