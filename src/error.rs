
use thiserror::Error;

use crate::construct::Entity;

#[derive(Error, Debug)]
pub enum BarometerError {
    #[error("Schema error: {message}")]
    Schema { message: String, missing: Vec<String> },
    #[error("Type coercion error: row {row}, {attribute}: cannot read {value:?} as {expected}")]
    TypeCoercion { row: usize, attribute: String, value: String, expected: &'static str },
    #[error("Conflicting fact: entity {entity} already holds a different value for {attribute}")]
    ConflictingFact { entity: Entity, attribute: String },
    #[error("Config error: {0}")]
    Config(String),
    #[error("Turtle error: {0}")]
    Turtle(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
}

impl BarometerError {
    pub fn missing_columns(missing: Vec<String>) -> Self {
        let message = format!("missing required column(s): {}", missing.join(", "));
        Self::Schema { message, missing }
    }
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }
}

pub type Result<T> = std::result::Result<T, BarometerError>;

// Helper conversions
impl From<config::ConfigError> for BarometerError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
impl From<rio_turtle::TurtleError> for BarometerError {
    fn from(e: rio_turtle::TurtleError) -> Self {
        Self::Turtle(e.to_string())
    }
}
