//! The datastore: one committed tree, edited through validation
//! transactions.
//!
//! Transactions are serialized by `&mut self`; the schema index and the
//! dependency graph are built once and shared by every transaction.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use yangval_core::config::EngineConfig;
use yangval_core::deps::DependencyGraph;
use yangval_core::errors::{ErrorKind, RpcError};
use yangval_core::schema::SchemaIndex;
use yangval_core::tree::{json, DataTree, EditDiff, NodeRef};
use yangval_core::validate::{Commit, Transaction};
use yangval_core::xpath::{CompiledExpr, Document, Evaluator};
use yangval_core::{log_op_end, log_op_error, log_op_start};
use yangval_core_types::{RequestContext, TransactionId};

use crate::history::{CommitHistory, CommitRecord};

/// Edit outcome; failures carry exactly one error
pub type EditResult<T> = std::result::Result<T, Vec<RpcError>>;

pub struct Datastore {
    schema: Arc<SchemaIndex>,
    deps: Arc<DependencyGraph>,
    config: EngineConfig,
    committed: Arc<DataTree>,
    history: CommitHistory,
}

impl Datastore {
    /// Create a datastore whose initial tree holds the schema's top-level
    /// defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the defaults do not
    /// validate.
    pub fn new(schema: impl Into<Arc<SchemaIndex>>, config: EngineConfig) -> EditResult<Self> {
        config.validate().map_err(|e| {
            vec![RpcError::new(ErrorKind::Internal).with_message(e.to_string())]
        })?;

        let schema = schema.into();
        let deps = Arc::new(DependencyGraph::build(&schema));
        let mut store = Self {
            history: CommitHistory::new(config.history_limit),
            schema,
            deps,
            config,
            committed: Arc::new(DataTree::new()),
        };

        let commit = store.validate(&EditDiff::new(), TransactionId::new())?;
        store.committed = Arc::new(commit.tree);
        Ok(store)
    }

    /// Create a datastore from persisted JSON state
    ///
    /// The document is read as a merge diff and validated like any edit.
    ///
    /// # Errors
    ///
    /// Returns the structural or constraint error the document triggers.
    pub fn load_json(
        schema: impl Into<Arc<SchemaIndex>>,
        config: EngineConfig,
        document: &serde_json::Value,
    ) -> EditResult<Self> {
        let mut store = Self::new(schema, config)?;
        let ctx = RequestContext::new();
        log_op_start!("load_json", txn_id = %ctx.txn_id);
        let start = Instant::now();

        let diff = json::diff_from_json(&store.schema, document).map_err(|e| {
            let rpc = RpcError::from(e).with_txn_id(ctx.txn_id.clone());
            log_op_error!(
                "load_json",
                rpc.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            vec![rpc]
        })?;
        store.commit(&diff, &ctx).map_err(|errors| {
            if let Some(rpc) = errors.first() {
                log_op_error!(
                    "load_json",
                    rpc.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
            }
            errors
        })?;

        log_op_end!(
            "load_json",
            duration_ms = start.elapsed().as_millis() as u64,
            txn_id = %ctx.txn_id
        );
        Ok(store)
    }

    /// Apply an edit-config request
    ///
    /// # Errors
    ///
    /// Returns a single structural or constraint error; the committed tree
    /// is unchanged.
    pub fn apply_edit_config(&mut self, diff: &EditDiff) -> EditResult<()> {
        self.apply_edit_config_with(diff, &RequestContext::new())
    }

    /// Apply an edit-config request under a caller-supplied context
    ///
    /// # Errors
    ///
    /// Same as [`Datastore::apply_edit_config`]; the error carries the
    /// context's transaction and request ids.
    pub fn apply_edit_config_with(&mut self, diff: &EditDiff, ctx: &RequestContext) -> EditResult<()> {
        log_op_start!(
            "apply_edit_config",
            txn_id = %ctx.txn_id,
            request_id = ctx.request_id.as_ref().map(|id| id.as_str()),
            nodes = diff.nodes.len()
        );
        let start = Instant::now();

        let touched = self.commit(diff, ctx).map_err(|errors| {
            if let Some(rpc) = errors.first() {
                log_op_error!(
                    "apply_edit_config",
                    rpc.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    txn_id = %ctx.txn_id
                );
            }
            errors
        })?;

        log_op_end!(
            "apply_edit_config",
            duration_ms = start.elapsed().as_millis() as u64,
            txn_id = %ctx.txn_id,
            touched = touched
        );
        Ok(())
    }

    /// Node at an instance identifier such as
    /// `/val:validation/val:must-validation[name='must3']`
    ///
    /// `""` and `"/"` address the document root. Returns `None` when nothing
    /// matches or the path does not parse.
    pub fn get_subtree(&self, path: &str) -> Option<NodeRef<'_>> {
        let doc = Document::new(&self.schema, &self.committed);
        let path = path.trim();
        if path.is_empty() || path == "/" {
            return Some(NodeRef::new(&self.schema, &self.committed, doc.root()));
        }

        let expr = CompiledExpr::compile(path);
        if !expr.is_valid() {
            tracing::debug!(path, "unparseable instance identifier");
            return None;
        }
        Evaluator::new(doc, doc.root())
            .evaluate(&expr, doc.root())
            .into_nodes()
            .into_iter()
            .next()
            .map(|node| NodeRef::new(&self.schema, &self.committed, node))
    }

    pub fn committed(&self) -> &DataTree {
        &self.committed
    }

    pub fn schema(&self) -> &SchemaIndex {
        &self.schema
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn history(&self) -> &CommitHistory {
        &self.history
    }

    /// Canonical JSON rendering of the committed tree
    pub fn to_json(&self) -> serde_json::Value {
        json::render(&self.schema, &self.committed)
    }

    /// SHA-256 of [`Datastore::to_json`]
    pub fn digest(&self) -> String {
        json::digest(&self.schema, &self.committed)
    }

    /// Validate and install; returns the number of touched locations
    fn commit(&mut self, diff: &EditDiff, ctx: &RequestContext) -> EditResult<usize> {
        let commit = self.validate(diff, ctx.txn_id.clone()).map_err(|errors| {
            errors
                .into_iter()
                .map(|e| match &ctx.request_id {
                    Some(id) => e.with_request_id(id.clone()),
                    None => e,
                })
                .collect::<Vec<_>>()
        })?;

        let touched = commit.touched.len();
        self.committed = Arc::new(commit.tree);
        self.history.push(CommitRecord {
            txn_id: ctx.txn_id.clone(),
            committed_at: Utc::now(),
            digest: self.digest(),
            touched: commit.touched,
        });
        Ok(touched)
    }

    fn validate(&self, diff: &EditDiff, txn_id: TransactionId) -> EditResult<Commit> {
        let mut txn = Transaction::begin(&self.schema, &self.deps, &self.config, txn_id.clone());
        txn.run(&self.committed, diff)
            .map_err(|e| vec![RpcError::from(e).with_txn_id(txn_id)])
    }
}

impl std::fmt::Debug for Datastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Datastore")
            .field("config", &self.config)
            .field("nodes", &self.committed.len())
            .field("history", &self.history.len())
            .finish()
    }
}
