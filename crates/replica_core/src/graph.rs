//! Dependency ordering of entity types.

use crate::error::{CoreError, CoreResult};
use replica_model::EntityType;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mark {
    New,
    Active,
    Done,
}

/// Directed graph of entity types built from belongs-to references.
///
/// An edge A→B means "A references B", so B must be synchronized
/// (pushed, then pulled) before A to keep referenced IDs valid on both
/// sides. [`DependencyGraph::topological_order`] yields one total
/// order satisfying every edge; ties among independent types are
/// broken by registration order, which keeps the order deterministic
/// across runs.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: Vec<EntityType>,
    edges: HashMap<EntityType, Vec<EntityType>>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity type and its outgoing belongs-to references.
    ///
    /// Registering the same type again replaces its references. Types
    /// that appear only as reference targets are treated as leaves.
    /// A self-reference does not constrain ordering and is ignored.
    pub fn add_type(&mut self, entity_type: EntityType, references: &[EntityType]) {
        if !self.edges.contains_key(&entity_type) {
            self.nodes.push(entity_type);
        }
        let targets = references
            .iter()
            .copied()
            .filter(|target| *target != entity_type)
            .collect();
        self.edges.insert(entity_type, targets);
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Computes one total order in which every type is preceded by all
    /// types it references.
    ///
    /// The same order is safe for both the push and the pull phase.
    /// Fails with [`CoreError::Cycle`] naming one cycle member if the
    /// declared references are cyclic.
    pub fn topological_order(&self) -> CoreResult<Vec<EntityType>> {
        let mut marks: HashMap<EntityType, Mark> = HashMap::new();
        let mut order = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            self.visit(*node, &mut marks, &mut order)?;
        }
        Ok(order)
    }

    fn visit(
        &self,
        node: EntityType,
        marks: &mut HashMap<EntityType, Mark>,
        order: &mut Vec<EntityType>,
    ) -> CoreResult<()> {
        match marks.get(&node).copied().unwrap_or(Mark::New) {
            Mark::Done => return Ok(()),
            Mark::Active => {
                return Err(CoreError::Cycle {
                    entity_type: node.as_str().to_string(),
                })
            }
            Mark::New => {}
        }
        marks.insert(node, Mark::Active);
        if let Some(targets) = self.edges.get(&node) {
            for target in targets {
                self.visit(*target, marks, order)?;
            }
        }
        marks.insert(node, Mark::Done);
        order.push(node);
        Ok(())
    }
}
