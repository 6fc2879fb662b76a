//! The read-only view of an entity the engine resolves property paths
//!  against. Hosts build one per entity set (or load it from JSON with the
//!  `serde` feature) and share it between requests.

use std::collections::BTreeMap;

use crate::{
    error::{Error, Result},
    expression::ExprType,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum SqlType {
    Text,
    Guid,
    Integer,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Time,
}

impl SqlType {
    pub fn expr_type(&self) -> ExprType {
        match self {
            SqlType::Text | SqlType::Guid => ExprType::String,
            SqlType::Integer | SqlType::Decimal => ExprType::Number,
            SqlType::Boolean => ExprType::Boolean,
            SqlType::Date => ExprType::Date,
            SqlType::DateTime => ExprType::DateTime,
            SqlType::Time => ExprType::Time,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropertyMetadata {
    pub column_name: String,
    pub sql_type: SqlType,
    #[cfg_attr(feature = "serde", serde(default = "default_nullable"))]
    pub nullable: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_length: Option<u32>,
}

#[cfg(feature = "serde")]
fn default_nullable() -> bool {
    true
}

impl PropertyMetadata {
    pub fn new(column_name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            column_name: column_name.into(),
            sql_type,
            nullable: true,
            max_length: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn max_length(mut self, len: u32) -> Self {
        self.max_length = Some(len);
        self
    }
}

/// A set of named properties: the entity itself, a complex type, or the
///  target of a navigation.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StructuredType {
    pub properties: BTreeMap<String, Property>,
}

impl StructuredType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(mut self, name: impl Into<String>, property: PropertyMetadata) -> Self {
        self.properties
            .insert(name.into(), Property::Primitive(property));
        self
    }

    /// Complex properties are flattened into the owning table; their
    ///  primitive members carry their own column names.
    pub fn with_complex(mut self, name: impl Into<String>, complex: StructuredType) -> Self {
        self.properties.insert(name.into(), Property::Complex(complex));
        self
    }

    /// Columns reached through a navigation are qualified with [qualifier],
    ///  the alias the host joins the related table under.
    pub fn with_navigation(
        mut self,
        name: impl Into<String>,
        qualifier: impl Into<String>,
        target: StructuredType,
    ) -> Self {
        self.properties.insert(
            name.into(),
            Property::Navigation(Navigation {
                qualifier: qualifier.into(),
                target,
            }),
        );
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "kind", rename_all = "lowercase")
)]
pub enum Property {
    Primitive(PropertyMetadata),
    Complex(StructuredType),
    Navigation(Navigation),
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Navigation {
    pub qualifier: String,
    pub target: StructuredType,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityMetadata {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub keys: Vec<String>,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub root: StructuredType,
}

/// A primitive property found by [EntityMetadata::resolve].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedProperty<'m> {
    /// Alias of the joined table, when the path crossed a navigation.
    pub qualifier: Option<&'m str>,
    pub metadata: &'m PropertyMetadata,
}

impl ResolvedProperty<'_> {
    pub fn expr_type(&self) -> ExprType {
        self.metadata.sql_type.expr_type()
    }

    /// The column as it appears in SQL. Only metadata contributes to this
    ///  text, never the request.
    pub fn column_sql(&self) -> String {
        match self.qualifier {
            Some(qualifier) => format!("{qualifier}.{}", self.metadata.column_name),
            None => self.metadata.column_name.clone(),
        }
    }
}

impl EntityMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: Vec::new(),
            root: StructuredType::new(),
        }
    }

    pub fn with_key(mut self, name: impl Into<String>) -> Self {
        self.keys.push(name.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, property: PropertyMetadata) -> Self {
        self.root = self.root.with_property(name, property);
        self
    }

    pub fn with_complex(mut self, name: impl Into<String>, complex: StructuredType) -> Self {
        self.root = self.root.with_complex(name, complex);
        self
    }

    pub fn with_navigation(
        mut self,
        name: impl Into<String>,
        qualifier: impl Into<String>,
        target: StructuredType,
    ) -> Self {
        self.root = self.root.with_navigation(name, qualifier, target);
        self
    }

    /// Top level property lookup (no paths).
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.root.properties.get(name)
    }

    /// Resolves a `/` separated path to a primitive property. Every segment
    ///  must exist; the error names the first one that doesn't.
    pub fn resolve(&self, path: &str) -> Result<ResolvedProperty<'_>> {
        let mut current = &self.root;
        let mut qualifier = None;
        let mut owner = self.name.as_str();
        let mut segments = path.split('/').peekable();

        while let Some(segment) = segments.next() {
            let is_last = segments.peek().is_none();
            let property = current.properties.get(segment).ok_or_else(|| {
                Error::validation(format!(
                    "property '{segment}' does not exist on '{owner}'"
                ))
            })?;
            match property {
                Property::Primitive(metadata) if is_last => {
                    return Ok(ResolvedProperty {
                        qualifier,
                        metadata,
                    });
                }
                Property::Primitive(_) => {
                    return Err(Error::validation(format!(
                        "property '{segment}' is not a complex or navigation property"
                    )));
                }
                Property::Complex(_) | Property::Navigation(_) if is_last => {
                    return Err(Error::validation(format!(
                        "property '{segment}' is structured and cannot be used as a value"
                    )));
                }
                Property::Complex(complex) => current = complex,
                Property::Navigation(navigation) => {
                    qualifier = Some(navigation.qualifier.as_str());
                    current = &navigation.target;
                }
            }
            owner = segment;
        }
        // split always yields at least one segment
        Err(Error::validation(format!("empty property path '{path}'")))
    }

    /// Checks the snapshot is usable: every key names a primitive property.
    pub fn validate(&self) -> Result<()> {
        for key in &self.keys {
            match self.property(key) {
                Some(Property::Primitive(_)) => {}
                Some(_) => {
                    return Err(Error::validation(format!(
                        "key '{key}' of '{}' is not a primitive property",
                        self.name
                    )));
                }
                None => {
                    return Err(Error::validation(format!(
                        "key '{key}' of '{}' does not exist",
                        self.name
                    )));
                }
            }
        }
        Ok(())
    }
}
