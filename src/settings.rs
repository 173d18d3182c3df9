//! Settings for the record graph, read with the `config` crate.
//!
//! Sources are layered: built-in defaults, then an optional settings file
//! (format chosen by extension), then `BAROMETER_*` environment variables,
//! e.g. `BAROMETER_NULL_SENTINEL` or `BAROMETER_MODE=streaming`.

use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::Result;
use crate::schema::{
    AttributeSpec, Schema, DEFAULT_ENTITY_PREFIX, DEFAULT_NAMESPACE, DEFAULT_NULL_SENTINEL,
};

/// Whether the pipeline keeps a full fact set or streams facts into the projector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionMode {
    #[default]
    Materialized,
    Streaming,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub namespace: String,
    pub entity_prefix: String,
    pub null_sentinel: String,
    pub mode: ProjectionMode,
    pub verify_round_trip: bool,
    // overrides the canonical attributes when present
    pub attributes: Option<Vec<AttributeSpec>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_owned(),
            entity_prefix: DEFAULT_ENTITY_PREFIX.to_owned(),
            null_sentinel: DEFAULT_NULL_SENTINEL.to_owned(),
            mode: ProjectionMode::default(),
            verify_round_trip: false,
            attributes: None,
        }
    }
}

impl Settings {
    /// Reads settings from `path` (if given) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings = builder
            .add_source(Environment::with_prefix("BAROMETER").try_parsing(true))
            .build()?
            .try_deserialize::<Settings>()?;
        settings.schema()?;
        Ok(settings)
    }
    /// Reads settings from a TOML document, ignoring the environment.
    pub fn from_toml(toml: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize::<Settings>()?;
        settings.schema()?;
        Ok(settings)
    }
    /// The validated schema these settings describe.
    pub fn schema(&self) -> Result<Schema> {
        let attributes = match &self.attributes {
            Some(attributes) => attributes.clone(),
            None => crate::schema::canonical_attributes(),
        };
        Schema::new(&self.namespace, &self.entity_prefix, &self.null_sentinel, attributes)
    }
}
