//! The workflow graph: agent nodes, control nodes and routing edges.
//!
//! A graph is built with the fluent [`GraphBuilder`]: register agents, add
//! unconditional and conditional edges, then [`compile`](GraphBuilder::compile)
//! into an immutable [`WorkflowGraph`]. The runner in [`runner`] walks the
//! compiled graph one node at a time.
//!
//! Two control nodes exist alongside the agents: [`WorkflowNode::Dispatcher`]
//! (deterministic plan-based routing, no completion call) and
//! [`WorkflowNode::FinalResponse`] (the terminal stamp).

pub mod runner;

pub use runner::{WorkflowError, WorkflowRunner};

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::agent::{Agent, AgentName};
use crate::state::AgentState;

/// A node in the workflow graph: an agent, or one of the two control nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkflowNode {
    Agent(AgentName),
    /// Pure routing node choosing a specialist from the plan.
    Dispatcher,
    /// Terminal node stamping the completed run.
    FinalResponse,
}

impl WorkflowNode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowNode::Agent(agent) => agent.as_str(),
            WorkflowNode::Dispatcher => "dispatcher",
            WorkflowNode::FinalResponse => "final_response",
        }
    }
}

impl fmt::Display for WorkflowNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<AgentName> for WorkflowNode {
    fn from(agent: AgentName) -> Self {
        WorkflowNode::Agent(agent)
    }
}

/// Predicate choosing the next node from the current state.
pub type EdgePredicate = Arc<dyn Fn(&AgentState) -> WorkflowNode + Send + Sync>;

enum Edge {
    Unconditional(WorkflowNode),
    Conditional(EdgePredicate),
}

/// Errors raised while building or walking a graph.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("no agent registered for node {node}")]
    #[diagnostic(
        code(colloquy::graph::unregistered_node),
        help("Every agent node referenced by an edge must be added with add_agent.")
    )]
    UnregisteredNode { node: &'static str },

    #[error("no outgoing edge from node {node}")]
    #[diagnostic(
        code(colloquy::graph::dangling_node),
        help("Every non-terminal node needs an edge or a conditional edge.")
    )]
    DanglingNode { node: &'static str },

    #[error("entry node {node} is not part of the graph")]
    #[diagnostic(code(colloquy::graph::bad_entry))]
    BadEntry { node: &'static str },
}

/// Fluent builder for [`WorkflowGraph`].
///
/// # Examples
///
/// ```
/// use colloquy::agent::AgentName;
/// use colloquy::graph::{GraphBuilder, WorkflowNode};
/// use colloquy::agents::ConversationAgent;
///
/// let graph = GraphBuilder::new(WorkflowNode::Agent(AgentName::Conversation))
///     .add_agent(ConversationAgent)
///     .add_edge(
///         WorkflowNode::Agent(AgentName::Conversation),
///         WorkflowNode::FinalResponse,
///     )
///     .compile()
///     .unwrap();
/// assert_eq!(graph.entry(), WorkflowNode::Agent(AgentName::Conversation));
/// ```
pub struct GraphBuilder {
    entry: WorkflowNode,
    agents: FxHashMap<AgentName, Arc<dyn Agent>>,
    edges: FxHashMap<WorkflowNode, Edge>,
}

impl GraphBuilder {
    #[must_use]
    pub fn new(entry: WorkflowNode) -> Self {
        Self {
            entry,
            agents: FxHashMap::default(),
            edges: FxHashMap::default(),
        }
    }

    /// Registers an agent under its own name.
    #[must_use]
    pub fn add_agent(mut self, agent: impl Agent + 'static) -> Self {
        self.agents.insert(agent.name(), Arc::new(agent));
        self
    }

    /// Adds an unconditional edge. A later edge from the same node replaces
    /// the earlier one; each node has exactly one outgoing route.
    #[must_use]
    pub fn add_edge(mut self, from: WorkflowNode, to: WorkflowNode) -> Self {
        self.edges.insert(from, Edge::Unconditional(to));
        self
    }

    /// Adds a conditional edge evaluated against the state at routing time.
    #[must_use]
    pub fn add_conditional_edge(mut self, from: WorkflowNode, predicate: EdgePredicate) -> Self {
        self.edges.insert(from, Edge::Conditional(predicate));
        self
    }

    /// Validates the topology and produces an immutable graph.
    ///
    /// Checks that the entry node exists, and that every agent node that is
    /// an edge source or an unconditional edge target is registered.
    /// (Conditional targets are computed at runtime and validated by the
    /// runner instead.)
    pub fn compile(self) -> Result<WorkflowGraph, GraphError> {
        let node_known = |node: &WorkflowNode| match node {
            WorkflowNode::Agent(agent) => self.agents.contains_key(agent),
            WorkflowNode::Dispatcher | WorkflowNode::FinalResponse => true,
        };
        if !node_known(&self.entry) {
            return Err(GraphError::BadEntry {
                node: self.entry.as_str(),
            });
        }
        for (from, edge) in &self.edges {
            if !node_known(from) {
                return Err(GraphError::UnregisteredNode {
                    node: from.as_str(),
                });
            }
            if let Edge::Unconditional(to) = edge {
                if !node_known(to) {
                    return Err(GraphError::UnregisteredNode { node: to.as_str() });
                }
            }
        }
        Ok(WorkflowGraph {
            entry: self.entry,
            agents: self.agents,
            edges: self.edges,
        })
    }
}

/// A compiled, immutable workflow graph.
pub struct WorkflowGraph {
    entry: WorkflowNode,
    agents: FxHashMap<AgentName, Arc<dyn Agent>>,
    edges: FxHashMap<WorkflowNode, Edge>,
}

impl fmt::Debug for WorkflowGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowGraph")
            .field("entry", &self.entry)
            .field("agents", &self.agents.keys().collect::<Vec<_>>())
            .field("edges", &self.edges.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl WorkflowGraph {
    #[must_use]
    pub fn entry(&self) -> WorkflowNode {
        self.entry
    }

    #[must_use]
    pub fn agent(&self, name: AgentName) -> Option<&Arc<dyn Agent>> {
        self.agents.get(&name)
    }

    /// Resolves the next node after `from` for the given state.
    pub fn next(&self, from: WorkflowNode, state: &AgentState) -> Result<WorkflowNode, GraphError> {
        match self.edges.get(&from) {
            Some(Edge::Unconditional(to)) => Ok(*to),
            Some(Edge::Conditional(predicate)) => Ok(predicate(state)),
            None => Err(GraphError::DanglingNode {
                node: from.as_str(),
            }),
        }
    }
}
