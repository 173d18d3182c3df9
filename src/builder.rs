//! The fact builder: canonical long-format table in, fact graph out.
//!
//! Every row becomes one entity carrying exactly one fact per schema attribute.
//! Missing cells are written as the schema's null sentinel rather than left
//! out, since the projector only returns entities that hold every attribute.

use std::sync::Arc;

use tracing::{debug, info};

use crate::construct::{Entity, Fact, FactSet, GENESIS};
use crate::datatype::Value;
use crate::error::{BarometerError, Result};
use crate::schema::Schema;
use crate::table::CanonicalTable;

pub struct FactBuilder<'s> {
    schema: &'s Schema,
}

impl<'s> FactBuilder<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    /// Column position in `table` for every schema attribute, in schema order.
    /// Any absent column is a schema error, even when the table has no rows.
    fn resolve(&self, table: &CanonicalTable) -> Result<Vec<usize>> {
        let mut positions = Vec::with_capacity(self.schema.arity());
        let mut missing = Vec::new();
        for spec in self.schema.attributes() {
            match table.column_index(spec.column()) {
                Some(position) => positions.push(position),
                None => missing.push(spec.column().to_owned()),
            }
        }
        if !missing.is_empty() {
            return Err(BarometerError::missing_columns(missing));
        }
        Ok(positions)
    }

    /// Builds the full fact set for `table`.
    pub fn build(&self, table: &CanonicalTable) -> Result<FactSet> {
        info!(rows = table.len(), "building fact graph");
        let mut facts = FactSet::for_schema(self.schema);
        for fact in self.stream(table)? {
            facts.keep_fact(&fact)?;
        }
        let expected = table.len() * self.schema.arity();
        if facts.len() != expected {
            return Err(BarometerError::Invariant(format!(
                "built {} facts from {} rows, expected {}",
                facts.len(),
                table.len(),
                expected
            )));
        }
        debug!(
            facts = facts.len(),
            entities = facts.entity_count(),
            distinct_values = facts.distinct_values(),
            "fact graph size"
        );
        info!("done building fact graph");
        Ok(facts)
    }

    /// Yields the facts for `table` lazily, entity by entity, without keeping
    /// a fact set. Facts of one entity are always contiguous.
    pub fn stream<'t>(&self, table: &'t CanonicalTable) -> Result<FactStream<'t>> {
        let positions = self.resolve(table)?;
        Ok(FactStream {
            table,
            positions,
            sentinel: Arc::from(self.schema.null_sentinel()),
            row: 0,
            attribute: 0,
        })
    }
}

pub struct FactStream<'t> {
    table: &'t CanonicalTable,
    positions: Vec<usize>,
    sentinel: Arc<str>,
    row: usize,
    attribute: usize,
}

impl FactStream<'_> {
    fn encode(&self, value: &Value) -> Arc<str> {
        match value.lexical() {
            Some(lexical) => Arc::from(lexical.as_ref()),
            None => Arc::clone(&self.sentinel),
        }
    }
}

impl Iterator for FactStream<'_> {
    type Item = Fact;

    fn next(&mut self) -> Option<Fact> {
        let row = self.table.rows().get(self.row)?;
        // one entity per row, numbered from genesis in row order
        let entity = GENESIS + self.row as Entity;
        let attribute = self.attribute;
        let value = self.encode(&row[self.positions[attribute]]);
        self.attribute += 1;
        if self.attribute == self.positions.len() {
            self.attribute = 0;
            self.row += 1;
        }
        Some(Fact::new(entity, attribute, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let arity = self.positions.len();
        let remaining = (self.table.len() - self.row) * arity - self.attribute;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FactStream<'_> {}
