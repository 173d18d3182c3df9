use std::sync::Arc;

// keepers and indexes use HashSet or HashMap with a fast hasher
use core::hash::BuildHasherDefault;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use seahash::SeaHasher;

// attribute presence is kept as one bitmap of entities per attribute
use roaring::RoaringTreemap;

// used to print out readable forms of a construct
use std::fmt;

use crate::error::{BarometerError, Result};
use crate::schema::Schema;

// ------------- Entity -------------
// An arena index into one fact set. It means nothing outside the build/project
// cycle that issued it.
pub type Entity = u64;

pub type EntityHasher = BuildHasherDefault<SeaHasher>;
pub type OtherHasher = BuildHasherDefault<SeaHasher>;

pub const GENESIS: Entity = 0;

#[derive(Debug)]
pub struct EntityGenerator {
    next: Entity,
}

impl EntityGenerator {
    pub fn new() -> Self {
        Self { next: GENESIS }
    }
    // Entities handed in from elsewhere (a fact stream) must not be issued again.
    pub fn retain(&mut self, e: Entity) -> Result<()> {
        if e >= self.next {
            self.next = e.checked_add(1).ok_or_else(|| {
                BarometerError::Invariant(format!("entity {e} leaves no room for another"))
            })?;
        }
        Ok(())
    }
    pub fn generate(&mut self) -> Result<Entity> {
        let e = self.next;
        self.next = e
            .checked_add(1)
            .ok_or_else(|| BarometerError::Invariant("entity ids exhausted".into()))?;
        Ok(e)
    }
}

impl Default for EntityGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// ------------- Value -------------
// Fact values repeat heavily (countries, pathogens, dates), so they are interned.
#[derive(Debug, Default)]
pub struct ValueKeeper {
    kept: HashSet<Arc<str>, OtherHasher>,
}
impl ValueKeeper {
    pub fn new() -> Self {
        Self {
            kept: HashSet::default(),
        }
    }
    pub fn keep(&mut self, value: &str) -> (Arc<str>, bool) {
        if let Some(kept) = self.kept.get(value) {
            return (Arc::clone(kept), true);
        }
        let keepsake: Arc<str> = Arc::from(value);
        self.kept.insert(Arc::clone(&keepsake));
        (keepsake, false)
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}

// --------------- Fact ----------------
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fact {
    entity: Entity,
    attribute: usize, // position in the schema
    value: Arc<str>,  // always a string, typing is restored on materialization
}
impl Fact {
    pub fn new(entity: Entity, attribute: usize, value: Arc<str>) -> Self {
        Self {
            entity,
            attribute,
            value,
        }
    }
    pub fn entity(&self) -> Entity {
        self.entity
    }
    pub fn attribute(&self) -> usize {
        self.attribute
    }
    pub fn value(&self) -> &str {
        &self.value
    }
    pub fn shared_value(&self) -> Arc<str> {
        Arc::clone(&self.value)
    }
}
impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} [{}, {:?}]", self.entity, self.attribute, self.value)
    }
}

// ------------- FactSet -------------
/// The append-only graph of facts produced by one build call.
#[derive(Debug)]
pub struct FactSet {
    arity: usize,
    generator: EntityGenerator,
    values: ValueKeeper,
    facts: Vec<Fact>,
    // every entity that holds at least one fact
    entities: RoaringTreemap,
    // attribute position -> entities holding that attribute
    presence: Vec<RoaringTreemap>,
    // entity -> value per attribute position
    records: HashMap<Entity, Box<[Option<Arc<str>>]>, EntityHasher>,
}

impl FactSet {
    pub fn new(arity: usize) -> Self {
        Self {
            arity,
            generator: EntityGenerator::new(),
            values: ValueKeeper::new(),
            facts: Vec::new(),
            entities: RoaringTreemap::new(),
            presence: vec![RoaringTreemap::new(); arity],
            records: HashMap::default(),
        }
    }
    pub fn for_schema(schema: &Schema) -> Self {
        Self::new(schema.arity())
    }
    pub fn create_entity(&mut self) -> Result<Entity> {
        self.generator.generate()
    }
    /// Adds the fact `(entity, attribute, value)`. Returns whether an identical
    /// fact was already kept. A different value for a kept (entity, attribute)
    /// pair is refused.
    pub fn keep(&mut self, entity: Entity, attribute: usize, value: &str) -> Result<bool> {
        if attribute >= self.arity {
            return Err(BarometerError::Invariant(format!(
                "attribute position {} outside a schema of {} attributes",
                attribute, self.arity
            )));
        }
        self.generator.retain(entity)?;
        let arity = self.arity;
        let slots = match self.records.entry(entity) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(vec![None; arity].into_boxed_slice()),
        };
        if let Some(kept) = &slots[attribute] {
            if kept.as_ref() == value {
                return Ok(true);
            }
            return Err(BarometerError::ConflictingFact {
                entity,
                attribute: attribute.to_string(),
            });
        }
        let (value, _) = self.values.keep(value);
        slots[attribute] = Some(Arc::clone(&value));
        self.entities.insert(entity);
        self.presence[attribute].insert(entity);
        self.facts.push(Fact::new(entity, attribute, value));
        Ok(false)
    }
    pub fn keep_fact(&mut self, fact: &Fact) -> Result<bool> {
        self.keep(fact.entity(), fact.attribute(), fact.value())
    }
    pub fn arity(&self) -> usize {
        self.arity
    }
    pub fn len(&self) -> usize {
        self.facts.len()
    }
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
    pub fn entity_count(&self) -> u64 {
        self.entities.len()
    }
    pub fn distinct_values(&self) -> usize {
        self.values.len()
    }
    /// Facts in the order they were kept.
    pub fn iter(&self) -> std::slice::Iter<'_, Fact> {
        self.facts.iter()
    }
    pub fn entities(&self) -> &RoaringTreemap {
        &self.entities
    }
    pub fn entities_with(&self, attribute: usize) -> Option<&RoaringTreemap> {
        self.presence.get(attribute)
    }
    pub fn values_of(&self, entity: Entity) -> Option<&[Option<Arc<str>>]> {
        self.records.get(&entity).map(|slots| slots.as_ref())
    }
    pub fn value(&self, entity: Entity, attribute: usize) -> Option<&str> {
        self.records
            .get(&entity)
            .and_then(|slots| slots.get(attribute))
            .and_then(|slot| slot.as_deref())
    }
}

impl<'a> IntoIterator for &'a FactSet {
    type Item = &'a Fact;
    type IntoIter = std::slice::Iter<'a, Fact>;
    fn into_iter(self) -> Self::IntoIter {
        self.facts.iter()
    }
}
