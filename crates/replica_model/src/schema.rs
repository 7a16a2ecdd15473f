//! Statically declared entity schemas.
//!
//! A schema fixes, at startup, how one entity type's fields map onto
//! stored columns, which entity types it references, and how query
//! results are ordered by default. Embedded models are composed into
//! the owning schema with a column prefix.

use crate::error::{ModelError, ModelResult};
use crate::record::Record;
use crate::value::FieldKind;
use std::collections::HashMap;
use std::fmt;

/// Identifies one entity type handled by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityType(&'static str);

impl EntityType {
    /// Creates an entity type from its name.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Returns the type name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declares how one field of an entity maps onto a stored column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Model field name.
    pub name: String,
    /// Storage column name.
    pub column: String,
    /// Declared value kind.
    pub kind: FieldKind,
}

impl FieldDef {
    /// Creates a field whose column name equals its field name.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        Self {
            column: name.clone(),
            name,
            kind,
        }
    }

    /// Overrides the storage column name.
    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }
}

/// Static schema for one entity type.
///
/// Built once at startup; duplicate fields introduced by composition
/// are reported by [`EntitySchema::check`] before the engine starts.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    entity_type: EntityType,
    table: String,
    fields: Vec<FieldDef>,
    index: HashMap<String, usize>,
    duplicates: Vec<String>,
    belongs_to: Vec<EntityType>,
    default_order: Option<String>,
}

impl EntitySchema {
    /// Creates a schema for `entity_type`, stored in a table of the
    /// same name.
    #[must_use]
    pub fn new(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            table: entity_type.as_str().to_string(),
            fields: Vec::new(),
            index: HashMap::new(),
            duplicates: Vec::new(),
            belongs_to: Vec::new(),
            default_order: None,
        }
    }

    /// Overrides the storage table name.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Declares a field whose column name equals its field name.
    #[must_use]
    pub fn with_field(self, name: &str, kind: FieldKind) -> Self {
        self.with_field_def(FieldDef::new(name, kind))
    }

    /// Declares a field.
    #[must_use]
    pub fn with_field_def(mut self, def: FieldDef) -> Self {
        if self.index.contains_key(&def.name) {
            self.duplicates.push(def.name.clone());
        } else {
            self.index.insert(def.name.clone(), self.fields.len());
        }
        self.fields.push(def);
        self
    }

    /// Composes an embedded model's fields into this schema, prefixing
    /// field and column names (`address` + `city` → `address_city`).
    #[must_use]
    pub fn with_embedded(mut self, prefix: &str, embedded: &EntitySchema) -> Self {
        for def in &embedded.fields {
            let prefixed = FieldDef {
                name: format!("{prefix}_{}", def.name),
                column: format!("{prefix}_{}", def.column),
                kind: def.kind,
            };
            self = self.with_field_def(prefixed);
        }
        self
    }

    /// Declares a belongs-to reference to another entity type.
    ///
    /// The referenced type is synchronized before this one.
    #[must_use]
    pub fn with_belongs_to(mut self, target: EntityType) -> Self {
        self.belongs_to.push(target);
        self
    }

    /// Sets the field used to order query results by default.
    #[must_use]
    pub fn with_default_order(mut self, field: &str) -> Self {
        self.default_order = Some(field.to_string());
        self
    }

    /// The entity type this schema describes.
    #[must_use]
    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// The storage table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// All declared fields, in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Declared belongs-to references, in declaration order.
    #[must_use]
    pub fn belongs_to(&self) -> &[EntityType] {
        &self.belongs_to
    }

    /// The default ordering field, if any.
    #[must_use]
    pub fn default_order(&self) -> Option<&str> {
        self.default_order.as_deref()
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.index.get(name).map(|i| &self.fields[*i])
    }

    /// Verifies the schema is internally consistent.
    ///
    /// Fails if composition introduced a duplicate field, or if the
    /// default ordering field is not declared.
    pub fn check(&self) -> ModelResult<()> {
        if let Some(dup) = self.duplicates.first() {
            return Err(ModelError::DuplicateField {
                entity_type: self.entity_type.as_str().to_string(),
                field: dup.clone(),
            });
        }
        if let Some(order) = &self.default_order {
            if self.field(order).is_none() {
                return Err(ModelError::UnknownField {
                    entity_type: self.entity_type.as_str().to_string(),
                    field: order.clone(),
                });
            }
        }
        Ok(())
    }

    /// Validates a record's payload against this schema.
    ///
    /// Every payload field must be declared and carry a value of the
    /// declared kind; absent fields are allowed (sparse records).
    pub fn validate(&self, record: &Record) -> ModelResult<()> {
        for (name, value) in &record.fields {
            let def = self
                .field(name)
                .ok_or_else(|| ModelError::UnknownField {
                    entity_type: self.entity_type.as_str().to_string(),
                    field: name.clone(),
                })?;
            if !value.matches(def.kind) {
                return Err(ModelError::KindMismatch {
                    entity_type: self.entity_type.as_str().to_string(),
                    field: name.clone(),
                    expected: def.kind,
                });
            }
        }
        Ok(())
    }
}
