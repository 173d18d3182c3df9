//! Barometer – the canonical record graph behind the cattle respiratory
//! pathogen barometer.
//!
//! Every laboratory source is reshaped upstream into the same long-format
//! table (one row per sample and pathogen test). This crate funnels such a
//! table through a source-agnostic graph of facts and back out into the
//! canonical merge schema:
//! * A [`construct::Entity`] is an arena index for one sample record (a `u64`).
//! * A [`construct::Fact`] is an `(entity, attribute, value)` statement whose
//!   value is always a string.
//! * A [`construct::FactSet`] keeps the facts of one build call together with
//!   per-attribute presence bitmaps used to answer the projection.
//!
//! ## Modules
//! * [`schema`] – The explicit [`schema::Schema`]: attributes, namespace, null sentinel.
//! * [`construct`] – Entities, facts and the fact set.
//! * [`datatype`] – Input [`datatype::Value`]s, output [`datatype::Cell`]s and
//!   the [`datatype::DataType`] trait used to restore semantic types.
//! * [`builder`] – Table to facts, as a full fact set or a lazy stream.
//! * [`projector`] – The single fixed query: one record per complete entity.
//! * [`materializer`] – Records back into typed cells.
//! * [`table`] – Input and output tables, with order-independent fingerprints.
//! * [`pipeline`] – Per-source driver and report.
//! * [`persist`] – Turtle export, import and merge for semantic-graph tooling.
//! * [`settings`] – Settings read with the `config` crate.
//!
//! ## Quick Start
//! ```
//! use barometer::datatype::{Cell, Value};
//! use barometer::pipeline::Pipeline;
//! use barometer::schema::Schema;
//! use barometer::table::CanonicalTable;
//!
//! let columns = [
//!     "diagnostic_test", "country", "breed", "date", "province",
//!     "farm_id", "sample_type", "pathogen", "result", "lab_reference",
//! ];
//! let row: Vec<Value> = ["PCR", "Belgium", "Dairy", "2022-01-01", "Antwerp",
//!     "f00d", "BAL", "BRSV", "1", "3"].into_iter().map(Value::from).collect();
//! let table = CanonicalTable::from_rows(columns, vec![row]).unwrap();
//!
//! let output = Pipeline::with_schema("arsia", Schema::canonical()).run(&table).unwrap();
//! assert_eq!(output.table.len(), 1);
//! assert_eq!(output.table.get(0, "Country"), Some(&Cell::Text("Belgium".into())));
//! assert_eq!(output.report.facts, 10);
//! ```
//!
//! ## Guarantees
//! `materialize(project(build(t)))` holds the same multiset of rows as `t`.
//! Building fails on a missing column; projection silently drops (and counts)
//! entities lacking an attribute; materialization fails on unreadable dates.

pub mod builder;
pub mod construct;
pub mod datatype;
pub mod error;
pub mod materializer;
pub mod persist;
pub mod pipeline;
pub mod projector;
pub mod schema;
pub mod settings;
pub mod table;

pub use error::{BarometerError, Result};
