//! The record projector: one fixed query over the fact graph.
//!
//! "For every entity holding all attributes, return its values in output
//! order." Presence is resolved by intersecting the per-attribute entity
//! bitmaps, which gives the query its inner-join semantics. Entities missing
//! an attribute are dropped and counted, never raised.

use std::sync::Arc;

use roaring::RoaringTreemap;
use tracing::{debug, info, warn};

use crate::construct::{Entity, Fact, FactSet};
use crate::error::{BarometerError, Result};
use crate::schema::Schema;

/// One projected entity: its values in the schema's output order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    entity: Entity,
    values: Vec<Arc<str>>,
}
impl Record {
    pub fn entity(&self) -> Entity {
        self.entity
    }
    pub fn values(&self) -> &[Arc<str>] {
        &self.values
    }
    pub fn value(&self, position: usize) -> Option<&str> {
        self.values.get(position).map(|v| v.as_ref())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Projection {
    columns: Vec<String>,
    records: Vec<Record>,
    dropped: u64,
}
impl Projection {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
    /// Records sorted by entity id.
    pub fn records(&self) -> &[Record] {
        &self.records
    }
    pub fn len(&self) -> usize {
        self.records.len()
    }
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
    /// Entities left out because they lacked at least one attribute.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

pub struct RecordProjector<'s> {
    schema: &'s Schema,
}

impl<'s> RecordProjector<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    fn complete_entities(&self, facts: &FactSet) -> RoaringTreemap {
        let mut complete = facts.entities().clone();
        for attribute in 0..self.schema.arity() {
            match facts.entities_with(attribute) {
                Some(holders) => complete &= holders,
                None => return RoaringTreemap::new(),
            }
            if complete.is_empty() {
                break;
            }
        }
        complete
    }

    pub fn project(&self, facts: &FactSet) -> Projection {
        info!(facts = facts.len(), "projecting records");
        let complete = self.complete_entities(facts);
        let arity = self.schema.arity();
        let mut records = Vec::with_capacity(complete.len() as usize);
        // RoaringTreemap iterates in ascending order, so records come out sorted
        for entity in complete.iter() {
            let Some(slots) = facts.values_of(entity) else {
                continue;
            };
            let values: Vec<Arc<str>> = slots.iter().take(arity).flatten().cloned().collect();
            if values.len() == arity {
                records.push(Record { entity, values });
            }
        }
        let dropped = facts.entity_count() - records.len() as u64;
        self.finish(records, dropped)
    }

    /// Projects straight from a fact stream without a fact set. Facts of one
    /// entity must arrive contiguously, as [`crate::builder::FactStream`]
    /// yields them; an entity that shows up again after its group was closed
    /// is an error. The first value seen for an attribute wins.
    pub fn project_stream<I>(&self, facts: I) -> Result<Projection>
    where
        I: IntoIterator<Item = Fact>,
    {
        info!("projecting records from fact stream");
        let arity = self.schema.arity();
        let mut records = Vec::new();
        let mut dropped = 0u64;
        let mut closed = RoaringTreemap::new();
        let mut current: Option<(Entity, Vec<Option<Arc<str>>>)> = None;
        for fact in facts {
            if fact.attribute() >= arity {
                continue;
            }
            let same_entity = matches!(&current, Some((entity, _)) if *entity == fact.entity());
            if !same_entity {
                if let Some(group) = current.take() {
                    close_group(group, &mut records, &mut dropped, &mut closed);
                }
                if closed.contains(fact.entity()) {
                    return Err(BarometerError::Invariant(format!(
                        "facts of entity {} are not contiguous in the stream",
                        fact.entity()
                    )));
                }
                current = Some((fact.entity(), vec![None; arity]));
            }
            if let Some((_, slots)) = current.as_mut() {
                let slot = &mut slots[fact.attribute()];
                if slot.is_none() {
                    *slot = Some(fact.shared_value());
                }
            }
        }
        if let Some(group) = current.take() {
            close_group(group, &mut records, &mut dropped, &mut closed);
        }
        records.sort_by_key(Record::entity);
        Ok(self.finish(records, dropped))
    }

    fn finish(&self, records: Vec<Record>, dropped: u64) -> Projection {
        if dropped > 0 {
            warn!(dropped, "entities missing attributes were left out of the projection");
        }
        debug!(records = records.len(), "projection size");
        info!("done projecting records");
        Projection {
            columns: self.schema.output_columns(),
            records,
            dropped,
        }
    }
}

fn close_group(
    (entity, slots): (Entity, Vec<Option<Arc<str>>>),
    records: &mut Vec<Record>,
    dropped: &mut u64,
    closed: &mut RoaringTreemap,
) {
    closed.insert(entity);
    if slots.iter().all(Option::is_some) {
        let values = slots.into_iter().flatten().collect();
        records.push(Record { entity, values });
    } else {
        *dropped += 1;
    }
}
