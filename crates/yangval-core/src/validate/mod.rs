//! Transaction orchestration
//!
//! A transaction owns one candidate tree, cloned from the committed tree.
//! It moves through
//! `Applying -> DefaultPass -> MandatoryCheck -> WhenCheck -> MustCheck`
//! and ends in `Committed` or `RolledBack`. Structural mutation settles
//! completely before any constraint is evaluated. The first failure ends the
//! transaction; the candidate is dropped and the committed tree is never
//! touched.
//!
//! ```
//! use yangval_core::config::EngineConfig;
//! use yangval_core::deps::DependencyGraph;
//! use yangval_core::schema::{LeafType, SchemaBuilder};
//! use yangval_core::tree::{DataTree, EditDiff, EditNode};
//! use yangval_core::validate::{Transaction, TxnState};
//! use yangval_core_types::TransactionId;
//!
//! let mut b = SchemaBuilder::new();
//! b.module("m", "m", "urn:m");
//! let top = b.container(b.root(), "m:top");
//! let speed = b.leaf(top, "speed", LeafType::Int);
//! b.must(speed, ". < 100");
//! let schema = b.build().unwrap();
//! let graph = DependencyGraph::build(&schema);
//! let config = EngineConfig::default();
//!
//! let diff = EditDiff::new()
//!     .with_node(EditNode::new("m:top").child(EditNode::leaf("speed", 200i64)));
//! let mut txn = Transaction::begin(&schema, &graph, &config, TransactionId::new());
//! assert!(txn.run(&DataTree::new(), &diff).is_err());
//! assert_eq!(txn.state(), TxnState::RolledBack);
//! ```

mod constraints;
mod defaults;
mod mandatory;

use crate::config::EngineConfig;
use crate::deps::{impact_set, DependencyGraph};
use crate::errors::Result;
use crate::report;
use crate::schema::SchemaIndex;
use crate::tree::{apply, DataTree, EditDiff};
use crate::xpath::Document;
use yangval_core_types::TransactionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
    Applying,
    DefaultPass,
    MandatoryCheck,
    WhenCheck,
    MustCheck,
    Committed,
    RolledBack,
}

impl TxnState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxnState::Applying => "applying",
            TxnState::DefaultPass => "default_pass",
            TxnState::MandatoryCheck => "mandatory_check",
            TxnState::WhenCheck => "when_check",
            TxnState::MustCheck => "must_check",
            TxnState::Committed => "committed",
            TxnState::RolledBack => "rolled_back",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TxnState::Committed | TxnState::RolledBack)
    }
}

/// A validated candidate, ready to replace the committed tree
#[derive(Debug, Clone)]
pub struct Commit {
    pub tree: DataTree,
    /// Instance paths of every directly changed location, default pass
    /// changes included
    pub touched: Vec<String>,
}

/// One edit transaction against a committed tree
pub struct Transaction<'a> {
    schema: &'a SchemaIndex,
    graph: &'a DependencyGraph,
    config: &'a EngineConfig,
    txn_id: TransactionId,
    state: TxnState,
}

impl<'a> Transaction<'a> {
    pub fn begin(
        schema: &'a SchemaIndex,
        graph: &'a DependencyGraph,
        config: &'a EngineConfig,
        txn_id: TransactionId,
    ) -> Self {
        Self {
            schema,
            graph,
            config,
            txn_id,
            state: TxnState::Applying,
        }
    }

    pub fn state(&self) -> TxnState {
        self.state
    }

    pub fn txn_id(&self) -> &TransactionId {
        &self.txn_id
    }

    /// Apply `diff` to a copy of `committed` and validate the result
    ///
    /// # Errors
    ///
    /// Returns the first structural error or constraint violation. The
    /// transaction ends in `RolledBack` and `committed` is unchanged.
    pub fn run(&mut self, committed: &DataTree, diff: &EditDiff) -> Result<Commit> {
        match self.execute(committed, diff) {
            Ok(commit) => {
                self.transition(TxnState::Committed);
                Ok(commit)
            }
            Err(err) => {
                tracing::debug!(
                    txn_id = %self.txn_id,
                    failed_in = self.state.as_str(),
                    error = %err,
                    "transaction rolled back"
                );
                self.transition(TxnState::RolledBack);
                Err(err)
            }
        }
    }

    fn execute(&mut self, committed: &DataTree, diff: &EditDiff) -> Result<Commit> {
        self.transition(TxnState::Applying);
        let (mut candidate, mut changes) = apply(committed.clone(), self.schema, diff)?;

        self.transition(TxnState::DefaultPass);
        defaults::run(
            self.schema,
            &mut candidate,
            &mut changes,
            self.config.max_default_passes,
        )?;

        self.transition(TxnState::MandatoryCheck);
        mandatory::check(self.schema, &candidate, &changes)?;

        let impacted = impact_set(
            self.schema,
            self.graph,
            &candidate,
            &changes.touched,
            self.config.impact_policy,
        );

        self.transition(TxnState::WhenCheck);
        constraints::check_when(self.schema, &candidate, &changes, &impacted)?;

        self.transition(TxnState::MustCheck);
        constraints::check_must(self.schema, &candidate, &changes, &impacted)?;

        let doc = Document::new(self.schema, &candidate);
        let mut touched: Vec<String> = changes
            .touched
            .iter()
            .map(|t| report::touched_path(&doc, t))
            .collect();
        touched.dedup();

        Ok(Commit {
            tree: candidate.compacted(),
            touched,
        })
    }

    fn transition(&mut self, next: TxnState) {
        if self.state != next {
            tracing::debug!(
                txn_id = %self.txn_id,
                from = self.state.as_str(),
                to = next.as_str(),
                "transaction state"
            );
        }
        self.state = next;
    }
}
