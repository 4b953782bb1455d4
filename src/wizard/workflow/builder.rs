// SPDX-License-Identifier: MIT

//! Workflow builder - turns definitions into a graph arena
//!
//! Node types are resolved through the [`NodeRegistry`]; sub-graph nodes are
//! built recursively, file references relative to the file that names them.

use crate::flow::error::{Result, WorkflowError};
use crate::flow::graph::{Graph, GraphArena, InteractiveSpec, NodeId, NodeRecord};
use crate::wizard::workflow::loader::WorkflowLoader;
use crate::wizard::workflow::registry::NodeRegistry;
use crate::wizard::workflow::types::{NodeDefinition, WorkflowDefinition};

use serde_json::json;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

type BuildFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// High-level builder for constructing graph arenas from YAML definitions
pub struct Builder {
    loader: WorkflowLoader,
    registry: NodeRegistry,
}

impl Builder {
    pub fn new(registry: NodeRegistry) -> Self {
        Self {
            loader: WorkflowLoader::new(),
            registry,
        }
    }

    /// Build a graph arena from a YAML file path
    pub async fn build_file<P: AsRef<Path>>(&self, path: P) -> Result<GraphArena> {
        let path = path.as_ref();
        let def = self.loader.load_workflow(path)?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let chain = vec![canonical(path)];
        self.build_arena(&def, base, chain).await
    }

    /// Build a graph arena from a parsed definition; file references are
    /// resolved against `base_dir`
    pub async fn build(&self, def: &WorkflowDefinition, base_dir: &Path) -> Result<GraphArena> {
        self.build_arena(def, base_dir.to_path_buf(), Vec::new()).await
    }

    async fn build_arena(
        &self,
        def: &WorkflowDefinition,
        base: PathBuf,
        chain: Vec<PathBuf>,
    ) -> Result<GraphArena> {
        let mut graphs = Vec::new();
        self.build_graph(def, NodeId::root(), base, chain, &mut graphs)
            .await?;

        let mut graphs = graphs.into_iter();
        let root = graphs.next().ok_or_else(|| WorkflowError::MissingSection {
            node: def.name.clone(),
            section: "nodes".to_string(),
        })?;
        let mut arena = GraphArena::new(root);
        for graph in graphs {
            arena.insert(graph)?;
        }
        arena.validate()?;

        log::info!(
            "Built workflow '{}' with {} graphs",
            def.name,
            arena.graphs().count()
        );
        Ok(arena)
    }

    /// Build the graph owned by `id`, then its sub-graphs; owners are pushed
    /// before the graphs they own
    fn build_graph<'a>(
        &'a self,
        def: &'a WorkflowDefinition,
        id: NodeId,
        base: PathBuf,
        chain: Vec<PathBuf>,
        graphs: &'a mut Vec<Graph>,
    ) -> BuildFuture<'a> {
        Box::pin(async move {
            let mut records = Vec::with_capacity(def.nodes.len());
            for node_def in &def.nodes {
                records.push(self.build_node(node_def, &id).await?);
            }

            let mut graph = Graph::new(id.clone(), def.name.clone(), records)?;
            if let Some(layout) = &def.layout {
                graph = graph.with_layout(layout.clone());
            }
            graphs.push(graph);
            log::debug!("Built graph {} ('{}')", id, def.name);

            for node_def in def.nodes.iter().filter(|n| n.kind == "subgraph") {
                let child_id = id.child(node_def.id);
                match (&node_def.workflow, &node_def.file) {
                    (Some(inline), _) => {
                        self.build_graph(inline, child_id, base.clone(), chain.clone(), graphs)
                            .await?;
                    }
                    (None, Some(file)) => {
                        let path = base.join(file);
                        let key = canonical(&path);
                        if chain.contains(&key) {
                            let mut cycle: Vec<String> =
                                chain.iter().map(|p| p.display().to_string()).collect();
                            cycle.push(key.display().to_string());
                            return Err(WorkflowError::CircularDependency(cycle).into());
                        }
                        let child = self.loader.load_workflow(&path)?;
                        let child_base = path.parent().map(Path::to_path_buf).unwrap_or_default();
                        let mut child_chain = chain.clone();
                        child_chain.push(key);
                        self.build_graph(&child, child_id, child_base, child_chain, graphs)
                            .await?;
                    }
                    // checked by build_node
                    (None, None) => {}
                }
            }
            Ok(())
        })
    }

    async fn build_node(&self, def: &NodeDefinition, graph: &NodeId) -> Result<NodeRecord> {
        let id = graph.child(def.id);
        let upstream: Vec<NodeId> = def
            .depends_on
            .to_vec()
            .into_iter()
            .map(|d| graph.child(d))
            .collect();
        let name = def.display_name();

        match def.kind.as_str() {
            "node" => {
                let type_name =
                    def.node_type
                        .as_deref()
                        .ok_or_else(|| WorkflowError::MissingSection {
                            node: id.to_string(),
                            section: "type".to_string(),
                        })?;
                let factory = self
                    .registry
                    .get(type_name)
                    .await
                    .ok_or_else(|| WorkflowError::UnknownNodeType(type_name.to_string()))?;
                let model = factory
                    .create(&def.config)
                    .map_err(|e| WorkflowError::InvalidConfig {
                        node: id.to_string(),
                        message: e.to_string(),
                    })?;
                Ok(NodeRecord::ordinary(id, name, model, upstream))
            }
            "input" => {
                let input = def.input.clone().unwrap_or_default();
                if !input.default.is_null() && !input.value_type.accepts(&input.default) {
                    return Err(WorkflowError::InvalidConfig {
                        node: id.to_string(),
                        message: format!("default is not a {} value", input.value_type),
                    }
                    .into());
                }
                let representation = json!({
                    "label": input.label.clone().unwrap_or_else(|| name.clone()),
                    "description": input.description.clone().unwrap_or_default(),
                    "value_type": input.value_type,
                });
                let mut spec = InteractiveSpec::new(input.value_type)
                    .with_representation(representation)
                    .with_resources(input.resources.clone());
                if input.hidden {
                    spec = spec.hidden();
                }
                Ok(NodeRecord::interactive(id, name, spec, input.default, upstream))
            }
            "subgraph" => {
                if def.workflow.is_none() && def.file.is_none() {
                    return Err(WorkflowError::MissingSection {
                        node: id.to_string(),
                        section: "workflow".to_string(),
                    }
                    .into());
                }
                Ok(NodeRecord::sub_graph(id, name, upstream))
            }
            other => Err(WorkflowError::UnknownKind(other.to_string()).into()),
        }
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
