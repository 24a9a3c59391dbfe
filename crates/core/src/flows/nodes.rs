//! Typed dialogue graphs for the scripted flows.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flows::labels;
use crate::flows::states::Topic;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeId {
    MainMenu,
    TicketCategory,
    TicketOrderIssue,
    TicketPaymentIssue,
    TicketOther,
    TicketSubmitted,
    TicketTrackingStart,
    TicketList,
    FaqMenu,
    FaqOrdering,
    FaqTurnaround,
    FaqDelivery,
    ServicesMenu,
    ServicePrinting,
    ServiceLargeFormat,
    ServiceBinding,
    PaymentMenu,
    PaymentGcash,
    PaymentBank,
    PaymentCash,
    End,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    Node(NodeId),
    Flow(Topic),
    EndChat,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeOption {
    pub label: String,
    pub target: Target,
}

/// Side effect executed when a transition enters the node carrying it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeEffect {
    CreateTicket,
    ListTickets,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub prompt: Option<String>,
    pub options: Vec<NodeOption>,
    /// Unmatched free text is accumulated instead of rejected.
    pub collects_details: bool,
    pub effect: Option<NodeEffect>,
}

impl Node {
    pub fn new(id: NodeId, prompt: impl Into<String>) -> Self {
        Self {
            id,
            prompt: Some(prompt.into()),
            options: Vec::new(),
            collects_details: false,
            effect: None,
        }
    }

    pub fn option(mut self, label: impl Into<String>, target: Target) -> Self {
        self.options.push(NodeOption { label: label.into(), target });
        self
    }

    pub fn collects_details(mut self) -> Self {
        self.collects_details = true;
        self
    }

    pub fn effect(mut self, effect: NodeEffect) -> Self {
        self.effect = Some(effect);
        self
    }

    pub fn find_option(&self, input: &str) -> Option<&NodeOption> {
        self.options.iter().find(|option| labels::matches(input, &option.label))
    }

    pub fn labels(&self) -> Vec<String> {
        self.options.iter().map(|option| option.label.clone()).collect()
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("flow {topic:?} has no start node {start:?}")]
    MissingStart { topic: Topic, start: NodeId },
    #[error("node {node:?} option `{label}` targets unknown node {target:?}")]
    DanglingTarget { node: NodeId, label: String, target: NodeId },
    #[error("node {0:?} is defined twice")]
    DuplicateNode(NodeId),
    #[error("end node must offer exactly one `End Chat` option")]
    MalformedEnd,
}

/// An immutable dialogue graph, validated on construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowDefinition {
    topic: Topic,
    start: NodeId,
    nodes: HashMap<NodeId, Node>,
}

impl FlowDefinition {
    pub fn new(topic: Topic, start: NodeId, nodes: Vec<Node>) -> Result<Self, GraphError> {
        let mut by_id = HashMap::with_capacity(nodes.len());
        for node in nodes {
            let id = node.id;
            if by_id.insert(id, node).is_some() {
                return Err(GraphError::DuplicateNode(id));
            }
        }

        let definition = Self { topic, start, nodes: by_id };
        definition.validate()?;
        Ok(definition)
    }

    fn validate(&self) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&self.start) {
            return Err(GraphError::MissingStart { topic: self.topic, start: self.start });
        }

        for node in self.nodes.values() {
            for option in &node.options {
                if let Target::Node(target) = option.target {
                    if !self.nodes.contains_key(&target) {
                        return Err(GraphError::DanglingTarget {
                            node: node.id,
                            label: option.label.clone(),
                            target,
                        });
                    }
                }
            }
        }

        if let Some(end) = self.nodes.get(&NodeId::End) {
            let well_formed = matches!(
                end.options.as_slice(),
                [NodeOption { label, target: Target::EndChat }] if label == labels::END_CHAT
            );
            if !well_formed {
                return Err(GraphError::MalformedEnd);
            }
        }

        Ok(())
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn start(&self) -> &Node {
        &self.nodes[&self.start]
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }
}
