//! # Schema Tree
//!
//! The parsed form of an Avro schema. Named types (record, enum, fixed)
//! appear in full at their defining occurrence; every other occurrence,
//! including self references and references to types that are not defined
//! yet, is a [`Schema::Ref`] resolved later through [`Names`](crate::Names).

use std::collections::HashSet;
use std::fmt;

use serde_json::{json, Map, Value};

use crate::name::Name;

/// One node of a parsed schema tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Record(RecordSchema),
    Enum(EnumSchema),
    Fixed(FixedSchema),
    Array(Box<Schema>),
    Map(Box<Schema>),
    Union(UnionSchema),
    /// A reference to a named type by fullname.
    Ref(Name),
}

/// The kind of a schema node, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SchemaKind {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Record,
    Enum,
    Fixed,
    Array,
    Map,
    Union,
}

impl SchemaKind {
    /// All primitive kinds, in the order Avro lists them.
    pub const PRIMITIVES: [SchemaKind; 8] = [
        SchemaKind::Null,
        SchemaKind::Boolean,
        SchemaKind::Int,
        SchemaKind::Long,
        SchemaKind::Float,
        SchemaKind::Double,
        SchemaKind::Bytes,
        SchemaKind::String,
    ];

    /// The Avro type keyword for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Bytes => "bytes",
            Self::String => "string",
            Self::Record => "record",
            Self::Enum => "enum",
            Self::Fixed => "fixed",
            Self::Array => "array",
            Self::Map => "map",
            Self::Union => "union",
        }
    }

    /// Look up a primitive kind by its type keyword.
    pub fn primitive(keyword: &str) -> Option<SchemaKind> {
        Self::PRIMITIVES.into_iter().find(|k| k.as_str() == keyword)
    }

    pub fn is_primitive(&self) -> bool {
        Self::PRIMITIVES.contains(self)
    }

    /// Record, enum, and fixed carry a fullname.
    pub fn is_named(&self) -> bool {
        matches!(self, Self::Record | Self::Enum | Self::Fixed)
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record type: an ordered list of named, typed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    pub name: Name,
    pub doc: Option<String>,
    pub aliases: Vec<String>,
    pub fields: Vec<RecordField>,
}

impl RecordSchema {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&RecordField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// One field of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    pub name: String,
    pub schema: Schema,
    /// Zero-based declaration order.
    pub position: usize,
    /// Default value in Avro JSON encoding, kept verbatim.
    pub default: Option<Value>,
    pub doc: Option<String>,
}

/// An enum type: an ordered list of symbols.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    pub name: Name,
    pub doc: Option<String>,
    pub symbols: Vec<String>,
}

/// A fixed-length byte array type.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    pub name: Name,
    pub size: usize,
}

/// An ordered list of branch schemas.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionSchema {
    branches: Vec<Schema>,
}

impl UnionSchema {
    /// Wrap already-checked branches. The parser enforces the Avro union
    /// rules before calling this.
    pub(crate) fn new(branches: Vec<Schema>) -> Self {
        Self { branches }
    }

    pub fn branches(&self) -> &[Schema] {
        &self.branches
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

impl Schema {
    /// The kind of this node, or `None` for an unresolved reference.
    pub fn kind(&self) -> Option<SchemaKind> {
        Some(match self {
            Schema::Null => SchemaKind::Null,
            Schema::Boolean => SchemaKind::Boolean,
            Schema::Int => SchemaKind::Int,
            Schema::Long => SchemaKind::Long,
            Schema::Float => SchemaKind::Float,
            Schema::Double => SchemaKind::Double,
            Schema::Bytes => SchemaKind::Bytes,
            Schema::String => SchemaKind::String,
            Schema::Record(_) => SchemaKind::Record,
            Schema::Enum(_) => SchemaKind::Enum,
            Schema::Fixed(_) => SchemaKind::Fixed,
            Schema::Array(_) => SchemaKind::Array,
            Schema::Map(_) => SchemaKind::Map,
            Schema::Union(_) => SchemaKind::Union,
            Schema::Ref(_) => return None,
        })
    }

    /// The primitive schema for a primitive kind.
    pub fn primitive(kind: SchemaKind) -> Option<Schema> {
        Some(match kind {
            SchemaKind::Null => Schema::Null,
            SchemaKind::Boolean => Schema::Boolean,
            SchemaKind::Int => Schema::Int,
            SchemaKind::Long => Schema::Long,
            SchemaKind::Float => Schema::Float,
            SchemaKind::Double => Schema::Double,
            SchemaKind::Bytes => Schema::Bytes,
            SchemaKind::String => Schema::String,
            _ => return None,
        })
    }

    /// The name of a named definition or of a reference.
    pub fn name(&self) -> Option<&Name> {
        match self {
            Schema::Record(r) => Some(&r.name),
            Schema::Enum(e) => Some(&e.name),
            Schema::Fixed(f) => Some(&f.name),
            Schema::Ref(name) => Some(name),
            _ => None,
        }
    }

    /// Fullname of a named definition or reference.
    pub fn fullname(&self) -> Option<String> {
        self.name().map(Name::fullname)
    }

    /// A short human-readable label: the fullname for named types, the type
    /// keyword for primitives, and `array<…>`/`map<…>`/`union<…>` for
    /// anonymous composites.
    pub fn label(&self) -> String {
        match self {
            Schema::Array(items) => format!("array<{}>", items.label()),
            Schema::Map(values) => format!("map<{}>", values.label()),
            Schema::Union(u) => {
                let parts: Vec<String> = u.branches().iter().map(Schema::label).collect();
                format!("union<{}>", parts.join(","))
            }
            other => match other.fullname() {
                Some(fullname) => fullname,
                None => other.kind().map(|k| k.as_str()).unwrap_or("?").to_string(),
            },
        }
    }

    /// Avro JSON form. Each named type is written in full at its first
    /// occurrence in the tree and by fullname afterwards.
    pub fn to_json(&self) -> Value {
        let mut seen = HashSet::new();
        self.write_json(&mut seen, true, true)
    }

    /// Avro JSON form with every nested named type written by fullname.
    ///
    /// This is the form fingerprinted for structural equality: a named type
    /// is identified by its own body, not by how its dependencies happen to
    /// be spelled (inline or by reference).
    pub fn to_shallow_json(&self) -> Value {
        let mut seen = HashSet::new();
        self.write_json(&mut seen, false, true)
    }

    fn write_json(&self, seen: &mut HashSet<String>, inline_nested: bool, top: bool) -> Value {
        match self {
            Schema::Null
            | Schema::Boolean
            | Schema::Int
            | Schema::Long
            | Schema::Float
            | Schema::Double
            | Schema::Bytes
            | Schema::String => {
                Value::String(self.kind().map(|k| k.as_str()).unwrap_or_default().to_string())
            }
            Schema::Ref(name) => Value::String(name.fullname()),
            Schema::Record(_) | Schema::Enum(_) | Schema::Fixed(_) => {
                let fullname = self.fullname().unwrap_or_default();
                let first = seen.insert(fullname.clone());
                if !first || (!inline_nested && !top) {
                    return Value::String(fullname);
                }
                self.write_named_body(seen, inline_nested)
            }
            Schema::Array(items) => {
                json!({"type": "array", "items": items.write_json(seen, inline_nested, false)})
            }
            Schema::Map(values) => {
                json!({"type": "map", "values": values.write_json(seen, inline_nested, false)})
            }
            Schema::Union(u) => Value::Array(
                u.branches()
                    .iter()
                    .map(|b| b.write_json(seen, inline_nested, false))
                    .collect(),
            ),
        }
    }

    fn write_named_body(&self, seen: &mut HashSet<String>, inline_nested: bool) -> Value {
        let mut obj = Map::new();
        match self {
            Schema::Record(r) => {
                obj.insert("type".into(), json!("record"));
                obj.insert("name".into(), json!(r.name.fullname()));
                let fields: Vec<Value> = r
                    .fields
                    .iter()
                    .map(|f| {
                        let mut field = Map::new();
                        field.insert("name".into(), json!(f.name));
                        field.insert("type".into(), f.schema.write_json(seen, inline_nested, false));
                        if let Some(default) = &f.default {
                            field.insert("default".into(), default.clone());
                        }
                        Value::Object(field)
                    })
                    .collect();
                obj.insert("fields".into(), Value::Array(fields));
            }
            Schema::Enum(e) => {
                obj.insert("type".into(), json!("enum"));
                obj.insert("name".into(), json!(e.name.fullname()));
                obj.insert("symbols".into(), json!(e.symbols));
            }
            Schema::Fixed(f) => {
                obj.insert("type".into(), json!("fixed"));
                obj.insert("name".into(), json!(f.name.fullname()));
                obj.insert("size".into(), json!(f.size));
            }
            _ => {}
        }
        Value::Object(obj)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
