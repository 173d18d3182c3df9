//! The explicit schema shared by the builder, projector and materializer.
//!
//! A [`Schema`] enumerates the attributes every sample record carries, in the
//! order the projector returns them. Each [`AttributeSpec`] ties together the
//! upstream column name, the predicate used in the fact graph, the downstream
//! output column and the semantic [`Kind`] restored on materialization.
//! The schema also owns the ontology namespace and the null sentinel, so no
//! component relies on a module-level constant.

use bimap::BiMap;
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::datatype::DataType;
use crate::error::{BarometerError, Result};

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref NAMESPACE: Regex =
        Regex::new(r#"^[A-Za-z][A-Za-z0-9+.\-]*:[^\s<>"{}|\\^`]*$"#).unwrap();
}

pub const DEFAULT_NAMESPACE: &str = "http://www.purl.org/decide/LivestockHealthOnto#";
pub const DEFAULT_ENTITY_PREFIX: &str = "CattleSample";
pub const DEFAULT_NULL_SENTINEL: &str = "<NA>";

/// Semantic type an attribute is restored to by the materializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Text,
    Date,
}
impl Kind {
    pub fn data_type(&self) -> &'static str {
        match self {
            Kind::Text => <String as DataType>::DATA_TYPE,
            Kind::Date => <NaiveDate as DataType>::DATA_TYPE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AttributeSpec {
    column: String,
    predicate: String,
    output: String,
    #[serde(default = "text_kind")]
    kind: Kind,
}

fn text_kind() -> Kind {
    Kind::Text
}

impl AttributeSpec {
    pub fn new(column: &str, predicate: &str, output: &str, kind: Kind) -> Self {
        Self {
            column: column.to_owned(),
            predicate: predicate.to_owned(),
            output: output.to_owned(),
            kind,
        }
    }
    pub fn column(&self) -> &str {
        &self.column
    }
    pub fn predicate(&self) -> &str {
        &self.predicate
    }
    pub fn output(&self) -> &str {
        &self.output
    }
    pub fn kind(&self) -> Kind {
        self.kind
    }
}

/// The canonical ten attributes, listed in output column order.
pub fn canonical_attributes() -> Vec<AttributeSpec> {
    vec![
        AttributeSpec::new("lab_reference", "hasLabreference", "LabReference", Kind::Text),
        AttributeSpec::new("country", "hasCountry", "Country", Kind::Text),
        AttributeSpec::new("breed", "hasBreed", "Breed", Kind::Text),
        AttributeSpec::new("date", "hasDate", "Date", Kind::Date),
        AttributeSpec::new("province", "hasProvince", "Province", Kind::Text),
        AttributeSpec::new("farm_id", "hasFarmIdentification", "FarmIdentification", Kind::Text),
        AttributeSpec::new("diagnostic_test", "hasDiagnosticTest", "DiagnosticTest", Kind::Text),
        AttributeSpec::new("sample_type", "hasSampleType", "SampleType", Kind::Text),
        AttributeSpec::new("pathogen", "hasPathogen", "Pathogen", Kind::Text),
        AttributeSpec::new("result", "hasResult", "Result", Kind::Text),
    ]
}

#[derive(Debug, Clone)]
pub struct Schema {
    namespace: String,
    entity_prefix: String,
    null_sentinel: String,
    attributes: Vec<AttributeSpec>,
    // predicate name <-> position in `attributes`
    predicates: BiMap<String, usize>,
}

impl Schema {
    pub fn new(
        namespace: &str,
        entity_prefix: &str,
        null_sentinel: &str,
        attributes: Vec<AttributeSpec>,
    ) -> Result<Self> {
        if !NAMESPACE.is_match(namespace) {
            return Err(BarometerError::Config(format!("namespace {namespace:?} is not an IRI")));
        }
        if !IDENTIFIER.is_match(entity_prefix) {
            return Err(BarometerError::Config(format!(
                "entity prefix {entity_prefix:?} is not an identifier"
            )));
        }
        if null_sentinel.is_empty() {
            return Err(BarometerError::Config("null sentinel must not be empty".into()));
        }
        if attributes.is_empty() {
            return Err(BarometerError::Config("schema declares no attributes".into()));
        }
        let mut columns = std::collections::HashSet::new();
        let mut outputs = std::collections::HashSet::new();
        let mut predicates = BiMap::new();
        for (position, spec) in attributes.iter().enumerate() {
            for name in [spec.column(), spec.predicate(), spec.output()] {
                if !IDENTIFIER.is_match(name) {
                    return Err(BarometerError::Config(format!(
                        "attribute name {name:?} is not an identifier"
                    )));
                }
            }
            if !columns.insert(spec.column()) {
                return Err(BarometerError::Config(format!("duplicate column {}", spec.column())));
            }
            if !outputs.insert(spec.output()) {
                return Err(BarometerError::Config(format!(
                    "duplicate output column {}",
                    spec.output()
                )));
            }
            if predicates.insert_no_overwrite(spec.predicate().to_owned(), position).is_err() {
                return Err(BarometerError::Config(format!(
                    "duplicate predicate {}",
                    spec.predicate()
                )));
            }
        }
        Ok(Self {
            namespace: namespace.to_owned(),
            entity_prefix: entity_prefix.to_owned(),
            null_sentinel: null_sentinel.to_owned(),
            attributes,
            predicates,
        })
    }
    /// The ten-attribute schema every source pipeline conforms to.
    pub fn canonical() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_owned(),
            entity_prefix: DEFAULT_ENTITY_PREFIX.to_owned(),
            null_sentinel: DEFAULT_NULL_SENTINEL.to_owned(),
            predicates: canonical_attributes()
                .iter()
                .enumerate()
                .map(|(position, spec)| (spec.predicate().to_owned(), position))
                .collect(),
            attributes: canonical_attributes(),
        }
    }
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
    pub fn entity_prefix(&self) -> &str {
        &self.entity_prefix
    }
    pub fn null_sentinel(&self) -> &str {
        &self.null_sentinel
    }
    pub fn attributes(&self) -> &[AttributeSpec] {
        &self.attributes
    }
    pub fn attribute(&self, position: usize) -> Option<&AttributeSpec> {
        self.attributes.get(position)
    }
    /// Number of attributes, i.e. facts per entity.
    pub fn arity(&self) -> usize {
        self.attributes.len()
    }
    pub fn output_columns(&self) -> Vec<String> {
        self.attributes.iter().map(|a| a.output().to_owned()).collect()
    }
    pub fn position_of_predicate(&self, predicate: &str) -> Option<usize> {
        self.predicates.get_by_left(predicate).copied()
    }
    pub fn predicate_iri(&self, position: usize) -> Option<String> {
        self.predicates
            .get_by_right(&position)
            .map(|predicate| format!("{}{}", self.namespace, predicate))
    }
    /// Resolves a full predicate IRI back to the attribute position.
    pub fn position_of_predicate_iri(&self, iri: &str) -> Option<usize> {
        iri.strip_prefix(self.namespace.as_str())
            .and_then(|local| self.position_of_predicate(local))
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::canonical()
    }
}
