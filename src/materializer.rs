//! The table materializer: projected string tuples back into typed cells.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::datatype::{Cell, DataType};
use crate::error::{BarometerError, Result};
use crate::projector::Projection;
use crate::schema::{Kind, Schema};
use crate::table::MaterializedTable;

pub struct TableMaterializer<'s> {
    schema: &'s Schema,
}

impl<'s> TableMaterializer<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    /// Restores semantic types: the null sentinel becomes [`Cell::Missing`],
    /// date attributes are parsed into calendar dates, all else stays text.
    /// An unreadable date is an error, never a default.
    pub fn materialize(&self, projection: &Projection) -> Result<MaterializedTable> {
        info!(records = projection.len(), "materializing table");
        let sentinel = self.schema.null_sentinel();
        let arity = self.schema.arity();
        let mut rows = Vec::with_capacity(projection.len());
        for (row, record) in projection.records().iter().enumerate() {
            if record.values().len() != arity {
                return Err(BarometerError::Invariant(format!(
                    "record {} carries {} values, expected {}",
                    row,
                    record.values().len(),
                    arity
                )));
            }
            let mut cells = Vec::with_capacity(arity);
            for (spec, value) in self.schema.attributes().iter().zip(record.values()) {
                let value: &str = value;
                let cell = if value == sentinel {
                    Cell::Missing
                } else {
                    match spec.kind() {
                        Kind::Text => Cell::Text(value.to_owned()),
                        Kind::Date => Cell::Date(NaiveDate::coerce(value).ok_or_else(|| {
                            BarometerError::TypeCoercion {
                                row,
                                attribute: spec.output().to_owned(),
                                value: value.to_owned(),
                                expected: spec.kind().data_type(),
                            }
                        })?),
                    }
                };
                cells.push(cell);
            }
            rows.push(cells);
        }
        debug!(rows = rows.len(), columns = arity, "materialized table size");
        info!("done materializing table");
        Ok(MaterializedTable::new(self.schema.output_columns(), rows))
    }
}
