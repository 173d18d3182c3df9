//! Per-source driver wiring builder, projector and materializer together.
//!
//! A source pipeline hands its canonical table to [`Pipeline::run`] and gets
//! back the materialized table plus a [`PipelineReport`]. Each run owns its
//! fact set; nothing is shared between runs.

use std::time::{Duration, Instant};

use tracing::{info, info_span, warn};

use crate::builder::FactBuilder;
use crate::error::{BarometerError, Result};
use crate::materializer::TableMaterializer;
use crate::projector::{Projection, RecordProjector};
use crate::schema::Schema;
use crate::settings::{ProjectionMode, Settings};
use crate::table::{CanonicalTable, MaterializedTable};

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub source: String,
    pub mode: ProjectionMode,
    pub input_rows: usize,
    pub facts: usize,
    pub records: usize,
    pub dropped: u64,
    pub elapsed: Duration,
    // None when verification was not requested
    pub verified: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub table: MaterializedTable,
    pub report: PipelineReport,
}

pub struct Pipeline {
    source: String,
    schema: Schema,
    mode: ProjectionMode,
    verify: bool,
}

impl Pipeline {
    pub fn new(source: &str, settings: &Settings) -> Result<Self> {
        Ok(Self {
            source: source.to_owned(),
            schema: settings.schema()?,
            mode: settings.mode,
            verify: settings.verify_round_trip,
        })
    }
    pub fn with_schema(source: &str, schema: Schema) -> Self {
        Self {
            source: source.to_owned(),
            schema,
            mode: ProjectionMode::default(),
            verify: false,
        }
    }
    pub fn mode(mut self, mode: ProjectionMode) -> Self {
        self.mode = mode;
        self
    }
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }
    pub fn source(&self) -> &str {
        &self.source
    }
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn run(&self, table: &CanonicalTable) -> Result<PipelineOutput> {
        let span = info_span!("pipeline", source = %self.source);
        let _entered = span.enter();
        let started = Instant::now();

        let builder = FactBuilder::new(&self.schema);
        let projector = RecordProjector::new(&self.schema);
        let (projection, facts): (Projection, usize) = match self.mode {
            ProjectionMode::Materialized => {
                let facts = builder.build(table)?;
                (projector.project(&facts), facts.len())
            }
            ProjectionMode::Streaming => {
                let stream = builder.stream(table)?;
                let facts = stream.len();
                (projector.project_stream(stream)?, facts)
            }
        };
        let materialized = TableMaterializer::new(&self.schema).materialize(&projection)?;

        let verified = if self.verify {
            let matches = table.fingerprint(&self.schema)? == materialized.fingerprint();
            if !matches {
                warn!("materialized rows differ from the input rows");
                return Err(BarometerError::Invariant(format!(
                    "round trip of source {} changed its rows",
                    self.source
                )));
            }
            Some(true)
        } else {
            None
        };

        let report = PipelineReport {
            source: self.source.clone(),
            mode: self.mode,
            input_rows: table.len(),
            facts,
            records: projection.len(),
            dropped: projection.dropped(),
            elapsed: started.elapsed(),
            verified,
        };
        info!(
            rows = report.input_rows,
            facts = report.facts,
            records = report.records,
            dropped = report.dropped,
            ms = report.elapsed.as_secs_f64() * 1000.0,
            "pipeline complete"
        );
        Ok(PipelineOutput {
            table: materialized,
            report,
        })
    }
}
