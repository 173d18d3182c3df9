//! Turtle serialization of the fact graph.
//!
//! This is the optional interchange form for external semantic-graph tooling,
//! not a store: a fact set can be written out, read back into a fresh fact set,
//! and several documents can be merged into one. Entity IRIs are
//! `{namespace}{prefix}_{label}_{id}` and only mean something within the
//! build/project cycle that produced them.

use std::collections::HashMap;
use std::collections::HashSet;
use std::io::{BufRead, Write};

use lazy_static::lazy_static;
use regex::Regex;
use rio_api::formatter::TriplesFormatter;
use rio_api::model::{BlankNode, Literal, NamedNode, Subject, Term, Triple};
use rio_api::parser::TriplesParser;
use rio_turtle::{TurtleFormatter, TurtleParser};
use tracing::{debug, info, warn};

use crate::construct::{Entity, FactSet, OtherHasher};
use crate::error::{BarometerError, Result};
use crate::schema::Schema;

pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

lazy_static! {
    static ref LABEL: Regex = Regex::new(r"^[A-Za-z0-9_\-]*$").unwrap();
}

pub fn entity_iri(schema: &Schema, label: &str, entity: Entity) -> String {
    if label.is_empty() {
        format!("{}{}_{}", schema.namespace(), schema.entity_prefix(), entity)
    } else {
        format!("{}{}_{}_{}", schema.namespace(), schema.entity_prefix(), label, entity)
    }
}

/// Writes every fact of `facts` as one triple with an `xsd:string` literal.
/// Returns the writer and the number of triples written.
pub fn write_turtle<W: Write>(
    schema: &Schema,
    facts: &FactSet,
    label: &str,
    writer: W,
) -> Result<(W, usize)> {
    if !LABEL.is_match(label) {
        return Err(BarometerError::Config(format!("label {label:?} cannot be used in an IRI")));
    }
    info!(label, facts = facts.len(), "writing turtle");
    let predicates = (0..schema.arity())
        .map(|position| {
            schema.predicate_iri(position).ok_or_else(|| {
                BarometerError::Invariant(format!("no predicate for attribute {position}"))
            })
        })
        .collect::<Result<Vec<String>>>()?;
    let mut formatter = TurtleFormatter::new(writer);
    let mut written = 0;
    for fact in facts {
        let subject = entity_iri(schema, label, fact.entity());
        let predicate = predicates.get(fact.attribute()).ok_or_else(|| {
            BarometerError::Invariant(format!("fact {fact} outside the schema"))
        })?;
        formatter.format(&Triple {
            subject: NamedNode { iri: &subject }.into(),
            predicate: NamedNode { iri: predicate },
            object: Literal::Typed {
                value: fact.value(),
                datatype: NamedNode { iri: XSD_STRING },
            }
            .into(),
        })?;
        written += 1;
    }
    let writer = formatter.finish()?;
    info!(triples = written, "done writing turtle");
    Ok((writer, written))
}

#[derive(Debug)]
pub struct TurtleImport {
    pub facts: FactSet,
    // triples whose predicate, subject or object does not fit the schema
    pub skipped: usize,
}

/// Rebuilds a fact set from a Turtle document written by [`write_turtle`].
/// Subjects get fresh entity ids in the order they are first seen.
pub fn read_turtle<R: BufRead>(schema: &Schema, reader: R) -> Result<TurtleImport> {
    info!("reading turtle");
    let mut facts = FactSet::for_schema(schema);
    let mut entities: HashMap<String, Entity, OtherHasher> = HashMap::default();
    let mut skipped = 0;
    let mut parser = TurtleParser::new(reader, None);
    parser.parse_all(&mut |triple: Triple<'_>| -> Result<()> {
        let Subject::NamedNode(subject) = triple.subject else {
            skipped += 1;
            return Ok(());
        };
        let Some(attribute) = schema.position_of_predicate_iri(triple.predicate.iri) else {
            skipped += 1;
            return Ok(());
        };
        let value = match triple.object {
            Term::Literal(Literal::Simple { value }) => value,
            Term::Literal(Literal::Typed { value, .. }) => value,
            Term::Literal(Literal::LanguageTaggedString { value, .. }) => value,
            _ => {
                skipped += 1;
                return Ok(());
            }
        };
        let entity = match entities.get(subject.iri) {
            Some(entity) => *entity,
            None => {
                let entity = facts.create_entity()?;
                entities.insert(subject.iri.to_owned(), entity);
                entity
            }
        };
        facts.keep(entity, attribute, value).map_err(|e| match e {
            BarometerError::ConflictingFact { entity, .. } => BarometerError::ConflictingFact {
                entity,
                attribute: schema
                    .attribute(attribute)
                    .map(|spec| spec.predicate().to_owned())
                    .unwrap_or_else(|| attribute.to_string()),
            },
            other => other,
        })?;
        Ok(())
    })?;
    if skipped > 0 {
        warn!(skipped, "triples outside the schema were skipped");
    }
    debug!(facts = facts.len(), entities = facts.entity_count(), "imported fact graph size");
    info!("done reading turtle");
    Ok(TurtleImport { facts, skipped })
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum OwnedNode {
    Iri(String),
    Blank(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum OwnedTerm {
    Node(OwnedNode),
    Literal {
        value: String,
        datatype: Option<String>,
        language: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct OwnedTriple {
    subject: OwnedNode,
    predicate: String,
    object: OwnedTerm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeSummary {
    pub documents: usize,
    pub triples: usize,
    pub duplicates: usize,
}

/// Merges several Turtle documents into one. Identical triples are written
/// once; blank node labels are scoped per document so they cannot collide.
pub fn merge_turtle<R: BufRead, W: Write>(
    documents: impl IntoIterator<Item = R>,
    writer: W,
) -> Result<(W, MergeSummary)> {
    let mut summary = MergeSummary::default();
    let mut seen: HashSet<OwnedTriple, OtherHasher> = HashSet::default();
    let mut merged: Vec<OwnedTriple> = Vec::new();
    for (document, reader) in documents.into_iter().enumerate() {
        summary.documents += 1;
        let scope = |id: &str| format!("d{document}_{id}");
        let mut parser = TurtleParser::new(reader, None);
        parser.parse_all(&mut |triple: Triple<'_>| -> Result<()> {
            let subject = match triple.subject {
                Subject::NamedNode(n) => OwnedNode::Iri(n.iri.to_owned()),
                Subject::BlankNode(b) => OwnedNode::Blank(scope(b.id)),
                _ => {
                    return Err(BarometerError::Turtle(
                        "quoted triples are not supported".into(),
                    ));
                }
            };
            let object = match triple.object {
                Term::NamedNode(n) => OwnedTerm::Node(OwnedNode::Iri(n.iri.to_owned())),
                Term::BlankNode(b) => OwnedTerm::Node(OwnedNode::Blank(scope(b.id))),
                Term::Literal(Literal::Simple { value }) => OwnedTerm::Literal {
                    value: value.to_owned(),
                    datatype: None,
                    language: None,
                },
                Term::Literal(Literal::Typed { value, datatype }) => OwnedTerm::Literal {
                    value: value.to_owned(),
                    datatype: Some(datatype.iri.to_owned()),
                    language: None,
                },
                Term::Literal(Literal::LanguageTaggedString { value, language }) => {
                    OwnedTerm::Literal {
                        value: value.to_owned(),
                        datatype: None,
                        language: Some(language.to_owned()),
                    }
                }
                _ => {
                    return Err(BarometerError::Turtle(
                        "quoted triples are not supported".into(),
                    ));
                }
            };
            let owned = OwnedTriple {
                subject,
                predicate: triple.predicate.iri.to_owned(),
                object,
            };
            if seen.insert(owned.clone()) {
                merged.push(owned);
            } else {
                summary.duplicates += 1;
            }
            Ok(())
        })?;
    }
    let mut formatter = TurtleFormatter::new(writer);
    for triple in &merged {
        formatter.format(&borrow_triple(triple))?;
    }
    summary.triples = merged.len();
    info!(
        documents = summary.documents,
        triples = summary.triples,
        duplicates = summary.duplicates,
        "merged turtle documents"
    );
    Ok((formatter.finish()?, summary))
}

fn borrow_node(node: &OwnedNode) -> Subject<'_> {
    match node {
        OwnedNode::Iri(iri) => NamedNode { iri }.into(),
        OwnedNode::Blank(id) => BlankNode { id }.into(),
    }
}

fn borrow_triple(triple: &OwnedTriple) -> Triple<'_> {
    let object: Term<'_> = match &triple.object {
        OwnedTerm::Node(OwnedNode::Iri(iri)) => NamedNode { iri }.into(),
        OwnedTerm::Node(OwnedNode::Blank(id)) => BlankNode { id }.into(),
        OwnedTerm::Literal {
            value,
            datatype: Some(datatype),
            ..
        } => Literal::Typed {
            value,
            datatype: NamedNode { iri: datatype },
        }
        .into(),
        OwnedTerm::Literal {
            value,
            language: Some(language),
            ..
        } => Literal::LanguageTaggedString { value, language }.into(),
        OwnedTerm::Literal { value, .. } => Literal::Simple { value }.into(),
    };
    Triple {
        subject: borrow_node(&triple.subject),
        predicate: NamedNode {
            iri: &triple.predicate,
        },
        object,
    }
}
