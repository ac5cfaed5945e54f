//! Line-protocol binding for the versioned store
//!
//! Translates lines like `begin t1` / `insert t1 doc1 some text` /
//! `query t1 cute dogs` into store operations against transactions bound to
//! user-chosen names. The store is the component under test; this layer is
//! a thin driver whose output strings are contractual:
//!
//! - `began <name> T<id>` / `committed <name> T<id>` / `aborted <name> T<id>`
//! - `ok` for each successful write
//! - `{"id": "value", ...}` for query results, closest first
//! - `error: <message>` for a failed operation, after which the shell aborts
//!   the offending transaction (the store itself never auto-aborts)

use std::collections::HashMap;
use std::sync::Arc;

use memvex_core::{Result, StoreConfig, TxnId};
use memvex_mvcc::VersionedStore;
use tracing::debug;

/// Stateful line interpreter over one store
pub struct Shell {
    store: Arc<VersionedStore>,
    /// User-visible transaction names -> store transaction ids
    txns: HashMap<String, TxnId>,
    /// k used for `query` lines
    query_k: usize,
}

impl Shell {
    /// Create a shell over an existing store
    pub fn new(store: Arc<VersionedStore>, query_k: usize) -> Self {
        Shell {
            store,
            txns: HashMap::new(),
            query_k,
        }
    }

    /// Create a shell with its own store built from `config`
    pub fn with_config(config: &StoreConfig) -> Result<Self> {
        let store = Arc::new(VersionedStore::with_config(config)?);
        Ok(Shell::new(store, config.query_k))
    }

    /// The underlying store (shared with other shells in tests)
    pub fn store(&self) -> &Arc<VersionedStore> {
        &self.store
    }

    /// Execute one line and produce its output string
    pub fn process_line(&mut self, line: &str) -> String {
        let Some(tokens) = shlex::split(line.trim()) else {
            return "error: invalid quoting".to_string();
        };
        let Some((verb, args)) = tokens.split_first() else {
            return String::new();
        };

        match verb.as_str() {
            "begin" => self.cmd_begin(args),
            "insert" => self.cmd_write(args, "insert", |store, txn, key, value| {
                store.insert(txn, key, value)
            }),
            "update" => self.cmd_write(args, "update", |store, txn, key, value| {
                store.update(txn, key, value)
            }),
            "delete" => self.cmd_delete(args),
            "commit" => self.cmd_commit(args),
            "abort" => self.cmd_abort(args),
            "query" => self.cmd_query(args),
            other => format!("unknown command: {}", other),
        }
    }

    fn cmd_begin(&mut self, args: &[String]) -> String {
        let Some(name) = args.first() else {
            return "usage: begin <txn>".to_string();
        };
        let txn = self.store.begin();
        self.txns.insert(name.clone(), txn);
        debug!(name = name.as_str(), txn, "shell bound transaction");
        format!("began {} T{}", name, txn)
    }

    fn cmd_write(
        &mut self,
        args: &[String],
        verb: &str,
        op: impl Fn(&VersionedStore, TxnId, &str, &str) -> Result<()>,
    ) -> String {
        let [name, key, rest @ ..] = args else {
            return format!("usage: {} <txn> <key> <value...>", verb);
        };
        let Some(txn) = self.txns.get(name).copied() else {
            return format!("error: unknown transaction name {:?}", name);
        };
        let value = rest.join(" ");
        match op(&self.store, txn, key, &value) {
            Ok(()) => "ok".to_string(),
            Err(e) => self.fail(txn, e),
        }
    }

    fn cmd_delete(&mut self, args: &[String]) -> String {
        let [name, key] = args else {
            return "usage: delete <txn> <key>".to_string();
        };
        let Some(txn) = self.txns.get(name).copied() else {
            return format!("error: unknown transaction name {:?}", name);
        };
        match self.store.delete(txn, key) {
            Ok(()) => "ok".to_string(),
            Err(e) => self.fail(txn, e),
        }
    }

    fn cmd_commit(&mut self, args: &[String]) -> String {
        let Some(name) = args.first() else {
            return "usage: commit <txn>".to_string();
        };
        let Some(txn) = self.txns.get(name).copied() else {
            return format!("error: unknown transaction name {:?}", name);
        };
        match self.store.commit(txn) {
            Ok(()) => format!("committed {} T{}", name, txn),
            Err(e) => format!("error: {}", e),
        }
    }

    fn cmd_abort(&mut self, args: &[String]) -> String {
        let Some(name) = args.first() else {
            return "usage: abort <txn>".to_string();
        };
        let Some(txn) = self.txns.get(name).copied() else {
            return format!("error: unknown transaction name {:?}", name);
        };
        match self.store.abort(txn) {
            Ok(()) => format!("aborted {} T{}", name, txn),
            Err(e) => format!("error: {}", e),
        }
    }

    fn cmd_query(&mut self, args: &[String]) -> String {
        let Some((name, rest)) = args.split_first() else {
            return "usage: query <txn> <text...>".to_string();
        };
        let Some(txn) = self.txns.get(name).copied() else {
            return format!("error: unknown transaction name {:?}", name);
        };
        let query = rest.join(" ");
        match self.store.read(txn, &query, self.query_k) {
            Ok(results) => {
                // {id: value} in the order the index returned, JSON-escaped
                let pairs: Vec<String> = results
                    .iter()
                    .map(|v| {
                        format!(
                            "{}: {}",
                            serde_json::to_string(v.id()).expect("string serializes"),
                            serde_json::to_string(v.value()).expect("string serializes"),
                        )
                    })
                    .collect();
                format!("{{{}}}", pairs.join(", "))
            }
            Err(e) => self.fail(txn, e),
        }
    }

    /// Report an operation error and abort the offending transaction
    fn fail(&mut self, txn: TxnId, e: memvex_core::Error) -> String {
        let message = format!("error: {}", e);
        // Best effort: the transaction may already be terminated
        let _ = self.store.abort(txn);
        message
    }
}

/// Run a newline-separated script, returning one output per non-empty line
pub fn run_script(shell: &mut Shell, script: &str) -> Vec<String> {
    script
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| shell.process_line(line))
        .collect()
}
