//! Graph orchestration for question answering.
//!
//! A [`QaGraph`] is a compiled set of named nodes over a shared [`QaState`].
//! Execution starts at the entry node and follows edges until the finish
//! node has run. The production graph is a single `qa_node` that calls the
//! RAG pipeline; the graph exists so further steps (query rewriting,
//! answer checking, ...) can be added as nodes without touching callers.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{ServiceError, ServiceResult};
use crate::rag::RagPipeline;

/// Name of the node that runs the RAG pipeline
pub const QA_NODE: &str = "qa_node";

/// State threaded through the graph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QaState {
    pub document: String,
    pub question: String,
    pub answer: Option<String>,
}

impl QaState {
    pub fn new(document: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            question: question.into(),
            answer: None,
        }
    }
}

/// One step of the graph
#[async_trait]
pub trait FlowNode: Send + Sync {
    async fn run(&self, state: QaState) -> ServiceResult<QaState>;
}

/// Runs the RAG pipeline and stores its answer
pub struct QaNode {
    pipeline: Arc<RagPipeline>,
}

impl QaNode {
    pub fn new(pipeline: Arc<RagPipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl FlowNode for QaNode {
    async fn run(&self, mut state: QaState) -> ServiceResult<QaState> {
        let answer = self.pipeline.answer(&state.document, &state.question).await?;
        state.answer = Some(answer);
        Ok(state)
    }
}

/// Graph under construction
#[derive(Default)]
pub struct QaGraphBuilder {
    nodes: HashMap<String, Arc<dyn FlowNode>>,
    edges: HashMap<String, String>,
    entry: Option<String>,
    finish: Option<String>,
}

impl QaGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(mut self, name: &str, node: Arc<dyn FlowNode>) -> Self {
        self.nodes.insert(name.to_string(), node);
        self
    }

    /// Run `to` after `from`; a node has at most one successor
    pub fn add_edge(mut self, from: &str, to: &str) -> Self {
        self.edges.insert(from.to_string(), to.to_string());
        self
    }

    pub fn set_entry_point(mut self, name: &str) -> Self {
        self.entry = Some(name.to_string());
        self
    }

    pub fn set_finish_point(mut self, name: &str) -> Self {
        self.finish = Some(name.to_string());
        self
    }

    /// Validate the graph and freeze it
    pub fn compile(self) -> ServiceResult<QaGraph> {
        let entry = self.entry.ok_or_else(|| flow_error("graph has no entry point"))?;
        let finish = self
            .finish
            .ok_or_else(|| flow_error("graph has no finish point"))?;

        for name in [&entry, &finish] {
            if !self.nodes.contains_key(name) {
                return Err(flow_error(format!("unknown node: {}", name)));
            }
        }
        for (from, to) in &self.edges {
            if !self.nodes.contains_key(from) || !self.nodes.contains_key(to) {
                return Err(flow_error(format!("edge {} -> {} references an unknown node", from, to)));
            }
        }

        // The finish node must be reachable from the entry without cycles
        let mut current = &entry;
        let mut visited = 1;
        while current != &finish {
            current = self
                .edges
                .get(current)
                .ok_or_else(|| flow_error(format!("finish node {} is unreachable", finish)))?;
            visited += 1;
            if visited > self.nodes.len() {
                return Err(flow_error("graph contains a cycle"));
            }
        }

        Ok(QaGraph {
            nodes: self.nodes,
            edges: self.edges,
            entry,
            finish,
        })
    }
}

/// A compiled, immutable QA graph
pub struct QaGraph {
    nodes: HashMap<String, Arc<dyn FlowNode>>,
    edges: HashMap<String, String>,
    entry: String,
    finish: String,
}

impl QaGraph {
    pub fn builder() -> QaGraphBuilder {
        QaGraphBuilder::new()
    }

    /// The single-node graph used in production
    pub fn single_node(pipeline: Arc<RagPipeline>) -> ServiceResult<Self> {
        Self::builder()
            .add_node(QA_NODE, Arc::new(QaNode::new(pipeline)))
            .set_entry_point(QA_NODE)
            .set_finish_point(QA_NODE)
            .compile()
    }

    /// Run the graph to completion and return the final state
    pub async fn invoke(&self, mut state: QaState) -> ServiceResult<QaState> {
        let mut current = self.entry.as_str();

        loop {
            let node = self
                .nodes
                .get(current)
                .ok_or_else(|| flow_error(format!("unknown node: {}", current)))?;

            debug!(node = %current, "Running QA graph node");
            state = node.run(state).await?;

            if current == self.finish {
                break;
            }
            current = self
                .edges
                .get(current)
                .map(String::as_str)
                .ok_or_else(|| flow_error(format!("node {} has no successor", current)))?;
        }

        if state.answer.is_none() {
            return Err(flow_error("graph finished without an answer"));
        }

        Ok(state)
    }
}

fn flow_error(message: impl Into<String>) -> ServiceError {
    ServiceError::Flow {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use crate::rag::testing::{EchoModel, LetterEmbedder};

    /// Appends a marker to the question
    struct Tag(&'static str);

    #[async_trait]
    impl FlowNode for Tag {
        async fn run(&self, mut state: QaState) -> ServiceResult<QaState> {
            state.question.push_str(self.0);
            Ok(state)
        }
    }

    /// Answers with the question it sees
    struct Parrot;

    #[async_trait]
    impl FlowNode for Parrot {
        async fn run(&self, mut state: QaState) -> ServiceResult<QaState> {
            state.answer = Some(state.question.clone());
            Ok(state)
        }
    }

    fn pipeline() -> Arc<RagPipeline> {
        Arc::new(RagPipeline::new(
            Arc::new(LetterEmbedder),
            Arc::new(EchoModel::default()),
            RetrievalConfig {
                chunk_size: 512,
                chunk_overlap: 64,
                top_k: 4,
            },
        ))
    }

    #[tokio::test]
    async fn test_single_node_graph_fills_answer() {
        let graph = QaGraph::single_node(pipeline()).unwrap();

        let state = graph
            .invoke(QaState::new("The sky is blue.", "What color is the sky?"))
            .await
            .unwrap();

        assert_eq!(state.document, "The sky is blue.");
        assert_eq!(state.question, "What color is the sky?");
        assert!(state.answer.unwrap().contains("blue"));
    }

    #[tokio::test]
    async fn test_nodes_run_in_edge_order() {
        let graph = QaGraph::builder()
            .add_node("a", Arc::new(Tag("-a")))
            .add_node("b", Arc::new(Tag("-b")))
            .add_node("answer", Arc::new(Parrot))
            .add_edge("a", "b")
            .add_edge("b", "answer")
            .set_entry_point("a")
            .set_finish_point("answer")
            .compile()
            .unwrap();

        let state = graph.invoke(QaState::new("doc", "q")).await.unwrap();
        assert_eq!(state.answer.as_deref(), Some("q-a-b"));
    }

    #[tokio::test]
    async fn test_missing_answer_is_an_error() {
        let graph = QaGraph::builder()
            .add_node("only", Arc::new(Tag("!")))
            .set_entry_point("only")
            .set_finish_point("only")
            .compile()
            .unwrap();

        let result = graph.invoke(QaState::new("doc", "q")).await;
        assert!(matches!(result, Err(ServiceError::Flow { .. })));
    }

    #[test]
    fn test_compile_rejects_bad_graphs() {
        let no_entry = QaGraph::builder()
            .add_node("a", Arc::new(Parrot))
            .set_finish_point("a")
            .compile();
        assert!(no_entry.is_err());

        let unknown_finish = QaGraph::builder()
            .add_node("a", Arc::new(Parrot))
            .set_entry_point("a")
            .set_finish_point("b")
            .compile();
        assert!(unknown_finish.is_err());

        let unreachable = QaGraph::builder()
            .add_node("a", Arc::new(Parrot))
            .add_node("b", Arc::new(Parrot))
            .set_entry_point("a")
            .set_finish_point("b")
            .compile();
        assert!(unreachable.is_err());

        let cycle = QaGraph::builder()
            .add_node("a", Arc::new(Tag("x")))
            .add_node("b", Arc::new(Tag("y")))
            .add_node("c", Arc::new(Parrot))
            .add_edge("a", "b")
            .add_edge("b", "a")
            .set_entry_point("a")
            .set_finish_point("c")
            .compile();
        assert!(cycle.is_err());
    }
}
