//! Hook registry: per-category ordered hook lists published as immutable
//! snapshots.
//!
//! Readers load the current list of a category without locking and keep
//! using it for the rest of their dispatch, even if the list is replaced in
//! the meantime. Writers serialize on a single async mutex, build a fresh
//! list from the current one, and publish it with an atomic swap. A reader
//! therefore sees the list either before or after a change, never a mix.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use dirsrv_core::error::AppError;
use dirsrv_core::result::AppResult;

use super::category::{HookCategory, HookCategorySet};
use super::order::{OrderDiagnostic, OrderSpec};
use crate::traits::DirectoryHook;

/// Immutable, ordered list of the hooks of one category.
pub type HookSnapshot = Arc<Vec<Arc<RegisteredHook>>>;

/// Stable identity of a registered hook: its configuration location, for
/// example `cn=UID Unique,cn=Plugins,cn=config`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HookId(String);

impl HookId {
    /// Creates a hook id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the name ordering expressions refer to this hook by.
    ///
    /// For a DN this is the lower-cased value of the first RDN, so
    /// `cn=UID Unique,cn=Plugins,cn=config` is ordered as `uid unique`.
    /// Any other id is used whole, lower-cased.
    pub fn order_name(&self) -> String {
        let rdn = first_rdn(&self.0);
        let value = match rdn.split_once('=') {
            Some((_, value)) => value,
            None => return self.0.trim().to_lowercase(),
        };
        // Only the first attribute of a multi-valued RDN names the hook.
        let value = value.split('+').next().unwrap_or(value);
        value.trim().replace("\\,", ",").to_lowercase()
    }
}

fn first_rdn(dn: &str) -> &str {
    let mut escaped = false;
    for (i, c) in dn.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            ',' if !escaped => return &dn[..i],
            _ => escaped = false,
        }
    }
    dn
}

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HookId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for HookId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A hook together with its registration record.
#[derive(Debug)]
pub struct RegisteredHook {
    /// Hook identity.
    id: HookId,
    /// Lower-cased name matched by ordering expressions.
    order_name: String,
    /// Factory kind the hook was built by.
    kind: String,
    /// Categories the hook is registered for.
    categories: HookCategorySet,
    /// Whether the hook runs for internal operations. Updated in place.
    invoke_for_internal: AtomicBool,
    /// Registration sequence, used to keep arrival order.
    sequence: u64,
    /// The hook.
    hook: Arc<dyn DirectoryHook>,
}

impl RegisteredHook {
    /// Creates a registration record.
    pub fn new(
        id: impl Into<HookId>,
        kind: impl Into<String>,
        categories: HookCategorySet,
        invoke_for_internal: bool,
        hook: Arc<dyn DirectoryHook>,
    ) -> Self {
        let id = id.into();
        Self {
            order_name: id.order_name(),
            id,
            kind: kind.into(),
            categories,
            invoke_for_internal: AtomicBool::new(invoke_for_internal),
            sequence: 0,
            hook,
        }
    }

    /// Returns the hook identity.
    pub fn id(&self) -> &HookId {
        &self.id
    }

    /// Returns the name ordering expressions refer to.
    pub fn order_name(&self) -> &str {
        &self.order_name
    }

    /// Returns the factory kind.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the categories the hook is registered for.
    pub fn categories(&self) -> &HookCategorySet {
        &self.categories
    }

    /// Whether the hook wants to see internal operations.
    pub fn invokes_for_internal(&self) -> bool {
        self.invoke_for_internal.load(Ordering::Acquire)
    }

    /// Changes the internal-operation flag. Takes effect for the next hook
    /// invocation, including in dispatches already running.
    pub fn set_invoke_for_internal(&self, invoke: bool) {
        self.invoke_for_internal.store(invoke, Ordering::Release);
    }

    /// Returns the hook implementation.
    pub fn hook(&self) -> &Arc<dyn DirectoryHook> {
        &self.hook
    }
}

/// Current hooks and ordering of one category.
#[derive(Debug)]
struct CategoryTable {
    hooks: ArcSwap<Vec<Arc<RegisteredHook>>>,
    order: ArcSwap<OrderSpec>,
}

impl CategoryTable {
    fn new() -> Self {
        Self {
            hooks: ArcSwap::from_pointee(Vec::new()),
            order: ArcSwap::from_pointee(OrderSpec::arrival()),
        }
    }
}

/// Arranges hooks by an ordering, unordered ones in registration order.
fn rebuild(order: &OrderSpec, mut hooks: Vec<Arc<RegisteredHook>>) -> Vec<Arc<RegisteredHook>> {
    hooks.sort_by_key(|h| h.sequence);
    order.arrange(&hooks, |h| h.order_name())
}

/// Registry of hooks organized by category.
pub struct HookRegistry {
    /// One table per category, indexed by the category discriminant.
    tables: Vec<CategoryTable>,
    /// Every registered hook by id.
    hooks: DashMap<HookId, Arc<RegisteredHook>>,
    /// Next registration sequence number.
    next_sequence: AtomicU64,
    /// Serializes all mutations.
    write_lock: Mutex<()>,
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

impl HookRegistry {
    /// Creates a new empty hook registry.
    pub fn new() -> Self {
        Self {
            tables: HookCategory::ALL.iter().map(|_| CategoryTable::new()).collect(),
            hooks: DashMap::new(),
            next_sequence: AtomicU64::new(0),
            write_lock: Mutex::new(()),
        }
    }

    fn table(&self, category: HookCategory) -> &CategoryTable {
        &self.tables[category as usize]
    }

    /// Registers a hook in every category it is configured for.
    ///
    /// Fails with a conflict if a hook with the same id is registered.
    pub async fn register(&self, mut hook: RegisteredHook) -> AppResult<Arc<RegisteredHook>> {
        let _guard = self.write_lock.lock().await;

        if self.hooks.contains_key(&hook.id) {
            return Err(AppError::conflict(format!(
                "Hook '{}' is already registered",
                hook.id
            )));
        }

        hook.sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        let hook = Arc::new(hook);

        for category in hook.categories() {
            let table = self.table(*category);
            let mut hooks: Vec<_> = table.hooks.load().iter().cloned().collect();
            hooks.push(hook.clone());
            table.hooks.store(Arc::new(rebuild(&table.order.load(), hooks)));
        }

        self.hooks.insert(hook.id.clone(), hook.clone());

        info!(
            hook_id = %hook.id,
            kind = %hook.kind,
            categories = hook.categories.len(),
            "Hook registered"
        );

        Ok(hook)
    }

    /// Removes a hook from every category.
    ///
    /// Categories that did not contain the hook keep their current list.
    /// Returns the removed hook, or `None` if it was not registered.
    pub async fn deregister(&self, id: &HookId) -> Option<Arc<RegisteredHook>> {
        let _guard = self.write_lock.lock().await;

        let (_, hook) = self.hooks.remove(id)?;
        for category in hook.categories() {
            let table = self.table(*category);
            let current = table.hooks.load();
            if !current.iter().any(|h| h.id == hook.id) {
                continue;
            }
            let remaining: Vec<_> = current.iter().filter(|h| h.id != hook.id).cloned().collect();
            table.hooks.store(Arc::new(remaining));
        }

        info!(hook_id = %id, "Hook deregistered");
        Some(hook)
    }

    /// Returns the current hook list of a category.
    pub fn snapshot(&self, category: HookCategory) -> HookSnapshot {
        self.table(category).hooks.load_full()
    }

    /// Returns the current ordering of a category.
    pub fn order(&self, category: HookCategory) -> Arc<OrderSpec> {
        self.table(category).order.load_full()
    }

    /// Installs a new ordering expression for a category and re-arranges
    /// the hooks already registered there.
    ///
    /// Problems in the expression are logged and returned; the expression
    /// is applied on a best-effort basis.
    pub async fn set_order(&self, category: HookCategory, raw: &str) -> Vec<OrderDiagnostic> {
        let parsed = OrderSpec::parse(raw);
        for diagnostic in &parsed.diagnostics {
            warn!(
                category = %category,
                order = %raw,
                diagnostic = %diagnostic,
                "Problem in plugin order"
            );
        }

        let _guard = self.write_lock.lock().await;
        let table = self.table(category);
        let hooks: Vec<_> = table.hooks.load().iter().cloned().collect();
        table.hooks.store(Arc::new(rebuild(&parsed.spec, hooks)));
        table.order.store(Arc::new(parsed.spec));

        debug!(category = %category, order = %raw, "Plugin order installed");
        parsed.diagnostics
    }

    /// Gets a registered hook by id.
    pub fn get(&self, id: &HookId) -> Option<Arc<RegisteredHook>> {
        self.hooks.get(id).map(|entry| entry.value().clone())
    }

    /// Checks whether a hook is registered.
    pub fn contains(&self, id: &HookId) -> bool {
        self.hooks.contains_key(id)
    }

    /// Returns the ids of all registered hooks in registration order.
    pub fn registered_ids(&self) -> Vec<HookId> {
        let mut hooks: Vec<_> = self.hooks.iter().map(|e| e.value().clone()).collect();
        hooks.sort_by_key(|h| h.sequence);
        hooks.into_iter().map(|h| h.id.clone()).collect()
    }

    /// Returns the number of hooks registered for a category.
    pub fn hook_count(&self, category: HookCategory) -> usize {
        self.table(category).hooks.load().len()
    }

    /// Returns the total number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Removes every hook from every category and returns them in
    /// registration order.
    pub async fn drain(&self) -> Vec<Arc<RegisteredHook>> {
        let _guard = self.write_lock.lock().await;

        for table in &self.tables {
            if !table.hooks.load().is_empty() {
                table.hooks.store(Arc::new(Vec::new()));
            }
        }

        let ids: Vec<HookId> = self.hooks.iter().map(|e| e.key().clone()).collect();
        let mut drained: Vec<_> = ids
            .iter()
            .filter_map(|id| self.hooks.remove(id).map(|(_, hook)| hook))
            .collect();
        drained.sort_by_key(|h| h.sequence);

        info!(count = drained.len(), "All hooks deregistered");
        drained
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}
