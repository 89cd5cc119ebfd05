// Copyright 2026 The Scheduler Cache Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::CacheOpts;
use crate::error::{fatal, CacheError, CacheResult};
use crate::manager::reaper;
use crate::manager::resize::{self, ResizeAction};
use crate::model::node::{NodeDescriptor, NodeInfo};
use crate::model::pdb::DisruptionBudget;
use crate::model::workload::{Workload, WorkloadKey, WorkloadPhase};
use crate::selector::LabelSelector;

/// Bookkeeping kept per tracked workload, independent of its cached copy.
#[derive(Debug, Clone)]
struct WorkloadState {
    pod: Workload,
    deadline: Option<Instant>,
    binding_finished: bool,
}

/// A structurally independent point-in-time copy, per [`Cache::snapshot`].
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    pub nodes: HashMap<String, NodeInfo>,
    pub assumed_pods: HashSet<WorkloadKey>,
    pub pdbs: HashMap<String, DisruptionBudget>,
}

/// The mutex-guarded state backing [`Cache`]. Never exposed directly —
/// every access goes through `Cache`'s lock-and-call methods.
struct CacheCore {
    nodes: HashMap<String, NodeInfo>,
    pod_states: HashMap<WorkloadKey, WorkloadState>,
    assumed_pods: HashSet<WorkloadKey>,
    pdbs: HashMap<String, DisruptionBudget>,
}

impl CacheCore {
    fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            pod_states: HashMap::new(),
            assumed_pods: HashSet::new(),
            pdbs: HashMap::new(),
        }
    }

    fn node_mut_or_new(&mut self, name: &str) -> &mut NodeInfo {
        self.nodes.entry(name.to_string()).or_insert_with(NodeInfo::new)
    }

    fn prune_node_if_deletable(&mut self, name: &str) {
        if self.nodes.get(name).is_some_and(NodeInfo::is_deletable) {
            self.nodes.remove(name);
        }
    }

    fn assume(&mut self, w: Workload) -> CacheResult<()> {
        let key = w.key.clone();
        if self.pod_states.contains_key(&key) {
            return Err(CacheError::AlreadyPresent(key));
        }
        let node_name = w.node_name.clone();
        if let Some(name) = &node_name {
            self.node_mut_or_new(name).add_pod(w.clone());
        }
        self.assumed_pods.insert(key.clone());
        self.pod_states.insert(
            key,
            WorkloadState {
                pod: w,
                deadline: None,
                binding_finished: false,
            },
        );
        Ok(())
    }

    fn finish_binding(&mut self, key: &WorkloadKey, now: Instant, ttl: std::time::Duration) {
        if !self.assumed_pods.contains(key) {
            return;
        }
        if let Some(state) = self.pod_states.get_mut(key) {
            state.binding_finished = true;
            state.deadline = Some(now + ttl);
        }
    }

    fn forget(&mut self, w: &Workload) -> CacheResult<()> {
        let key = &w.key;
        if !self.assumed_pods.contains(key) {
            return Err(CacheError::NotAssumed(key.clone()));
        }
        let state = self
            .pod_states
            .get(key)
            .ok_or_else(|| CacheError::NotAssumed(key.clone()))?;
        if state.pod.node_name != w.node_name {
            return Err(CacheError::NodeMismatch {
                key: key.clone(),
                cached: state.pod.node_name.clone(),
                submitted: w.node_name.clone(),
            });
        }
        if let Some(name) = &w.node_name {
            if let Some(node) = self.nodes.get_mut(name) {
                if node.remove_pod(key).is_err() {
                    fatal(format!("forget: {key} missing from node {name}"));
                }
                self.prune_node_if_deletable(name);
            }
        }
        self.assumed_pods.remove(key);
        self.pod_states.remove(key);
        Ok(())
    }

    fn add_pod(&mut self, w: Workload) -> CacheResult<()> {
        let key = w.key.clone();
        let Some(existing) = self.pod_states.get(&key) else {
            let node_name = w.node_name.clone();
            if let Some(name) = &node_name {
                self.node_mut_or_new(name).add_pod(w.clone());
            }
            self.pod_states.insert(
                key,
                WorkloadState {
                    pod: w,
                    deadline: None,
                    binding_finished: false,
                },
            );
            return Ok(());
        };

        if !self.assumed_pods.contains(&key) {
            return Err(CacheError::AlreadyAdded(key));
        }

        // Move old -> new strictly before clearing the assumed flag and
        // replacing the cached object (Open Question 3).
        let old_node_name = existing.pod.node_name.clone();
        if old_node_name != w.node_name {
            if let Some(old_name) = &old_node_name {
                if let Some(node) = self.nodes.get_mut(old_name) {
                    if node.remove_pod(&key).is_err() {
                        fatal(format!("add_pod: {key} missing from node {old_name}"));
                    }
                    self.prune_node_if_deletable(old_name);
                }
            }
            if let Some(new_name) = &w.node_name {
                self.node_mut_or_new(new_name).add_pod(w.clone());
            }
        }

        self.assumed_pods.remove(&key);
        self.pod_states.insert(
            key,
            WorkloadState {
                pod: w,
                deadline: None,
                binding_finished: false,
            },
        );
        Ok(())
    }

    fn update_pod(
        &mut self,
        old_w: &Workload,
        mut new_w: Workload,
        resize_enabled: bool,
        resize_policy: resize::ResizePolicy,
    ) -> CacheResult<Option<ResizeAction>> {
        let key = new_w.key.clone();
        if self.assumed_pods.contains(&key) || !self.pod_states.contains_key(&key) {
            return Err(CacheError::NotAdded(key));
        }
        if old_w.node_name != new_w.node_name {
            fatal(format!(
                "update_pod: node mismatch for {key}: old={:?} new={:?}",
                old_w.node_name, new_w.node_name
            ));
        }
        let node_name = old_w
            .node_name
            .clone()
            .ok_or_else(|| CacheError::UnknownNode(String::new()))?;

        {
            let node = self
                .nodes
                .get_mut(&node_name)
                .ok_or_else(|| CacheError::UnknownNode(node_name.clone()))?;
            if node.remove_pod(&key).is_err() {
                fatal(format!("update_pod: {key} missing from node {node_name}"));
            }
        }

        // The incoming event object never carries the cache-internal
        // bookkeeping for a resize committed on a prior update; transplant it
        // from the cached copy so `resolve_pending_resize` can correlate it
        // against `new_w.resize_conditions`. Carried forward unconditionally,
        // like `deadline`/`binding_finished` below, so an update that doesn't
        // qualify for resize processing this round doesn't drop it.
        new_w.pending_resize = self
            .pod_states
            .get(&key)
            .and_then(|s| s.pod.pending_resize.clone());

        let mut action = None;
        let should_resize = resize_enabled
            && old_w.phase == WorkloadPhase::Running
            && new_w.phase == WorkloadPhase::Running
            && !new_w.is_being_deleted()
            && new_w.resize_request.is_some();
        if should_resize {
            let node = self
                .nodes
                .get(&node_name)
                .ok_or_else(|| CacheError::UnknownNode(node_name.clone()))?;
            action = resize::decide(node, &mut new_w, resize_policy, &self.pdbs)?;
        }

        self.node_mut_or_new(&node_name).add_pod(new_w.clone());
        let prior = self.pod_states.get(&key);
        let (deadline, binding_finished) = prior
            .map(|s| (s.deadline, s.binding_finished))
            .unwrap_or((None, false));
        self.pod_states.insert(
            key,
            WorkloadState {
                pod: new_w,
                deadline,
                binding_finished,
            },
        );
        Ok(action)
    }

    fn remove_pod(&mut self, w: &Workload) -> CacheResult<()> {
        let key = &w.key;
        if self.assumed_pods.contains(key) {
            return Err(CacheError::NotAdded(key.clone()));
        }
        let state = self
            .pod_states
            .get(key)
            .ok_or_else(|| CacheError::NotAdded(key.clone()))?;
        if state.pod.node_name != w.node_name {
            fatal(format!("remove_pod: node mismatch for {key}"));
        }
        if let Some(name) = &w.node_name {
            if let Some(node) = self.nodes.get_mut(name) {
                if node.remove_pod(key).is_err() {
                    fatal(format!("remove_pod: {key} missing from node {name}"));
                }
                self.prune_node_if_deletable(name);
            }
        }
        self.pod_states.remove(key);
        Ok(())
    }

    fn reap_expired(&mut self, now: Instant) {
        let keys: Vec<WorkloadKey> = self.assumed_pods.iter().cloned().collect();
        for key in keys {
            let (binding_finished, deadline, node_name) = {
                let state = self
                    .pod_states
                    .get(&key)
                    .unwrap_or_else(|| fatal(format!("assumed key {key} missing from pod states")));
                (state.binding_finished, state.deadline, state.pod.node_name.clone())
            };
            if !binding_finished {
                continue;
            }
            let Some(deadline) = deadline else { continue };
            if now > deadline {
                if let Some(name) = &node_name {
                    if let Some(node) = self.nodes.get_mut(name) {
                        if node.remove_pod(&key).is_err() {
                            fatal(format!("reap: {key} missing from node {name}"));
                        }
                        self.prune_node_if_deletable(name);
                    }
                }
                self.assumed_pods.remove(&key);
                self.pod_states.remove(&key);
                tracing::info!(key = %key, "reaper expired assumed workload");
            }
        }
    }
}

/// The scheduler-side cache: a concurrency-safe projection of cluster state.
/// `Cache::new` also spawns the expiration reaper bound to the returned
/// stop sender, mirroring how `ClusterManager::start_heartbeat_checker`
/// is paired with its manager in the crate this one is modeled on.
pub struct Cache {
    core: Mutex<CacheCore>,
    opts: CacheOpts,
}

impl Cache {
    /// Constructs a cache and spawns its expiration reaper. Drop the
    /// returned sender (or send on it) to stop the reaper; await the
    /// `JoinHandle` to observe it finish.
    pub fn new(opts: CacheOpts) -> (Arc<Cache>, JoinHandle<()>, oneshot::Sender<()>) {
        let cache = Arc::new(Cache {
            core: Mutex::new(CacheCore::new()),
            opts,
        });
        let (handle, stop_tx) = reaper::spawn(cache.clone());
        (cache, handle, stop_tx)
    }

    pub fn for_test() -> (Arc<Cache>, JoinHandle<()>, oneshot::Sender<()>) {
        Cache::new(CacheOpts::for_test())
    }

    pub(crate) fn opts(&self) -> &CacheOpts {
        &self.opts
    }

    pub async fn assume(&self, w: Workload) -> CacheResult<()> {
        let key = w.key.clone();
        let mut core = self.core.lock().await;
        let result = core.assume(w);
        match &result {
            Ok(()) => tracing::debug!(%key, "assumed workload"),
            Err(err) => tracing::debug!(%key, %err, "assume rejected"),
        }
        result
    }

    pub async fn finish_binding(&self, key: &WorkloadKey) {
        let mut core = self.core.lock().await;
        core.finish_binding(key, Instant::now(), self.opts.assumed_pod_ttl);
        tracing::debug!(%key, "finished binding");
    }

    pub async fn forget(&self, w: &Workload) -> CacheResult<()> {
        let mut core = self.core.lock().await;
        let result = core.forget(w);
        match &result {
            Ok(()) => tracing::debug!(key = %w.key, "forgot assumed workload"),
            Err(err) => tracing::debug!(key = %w.key, %err, "forget rejected"),
        }
        result
    }

    pub async fn add_pod(&self, w: Workload) -> CacheResult<()> {
        let mut core = self.core.lock().await;
        let result = core.add_pod(w);
        match &result {
            Ok(()) => tracing::info!("confirmed workload added"),
            Err(err) => tracing::warn!(%err, "add_pod rejected"),
        }
        result
    }

    pub async fn update_pod(
        &self,
        old_w: Workload,
        new_w: Workload,
    ) -> CacheResult<Option<ResizeAction>> {
        let key = new_w.key.clone();
        let mut core = self.core.lock().await;
        let result = core.update_pod(
            &old_w,
            new_w,
            self.opts.resize_feature_enabled,
            self.opts.default_resize_policy,
        );
        match &result {
            Ok(action) => tracing::info!(%key, ?action, "updated workload"),
            Err(err) => tracing::warn!(%key, %err, "update_pod rejected"),
        }
        result
    }

    pub async fn remove_pod(&self, w: &Workload) -> CacheResult<()> {
        let mut core = self.core.lock().await;
        let result = core.remove_pod(w);
        match &result {
            Ok(()) => tracing::info!(key = %w.key, "confirmed workload removed"),
            Err(err) => tracing::warn!(key = %w.key, %err, "remove_pod rejected"),
        }
        result
    }

    pub async fn add_node(&self, node: NodeDescriptor) {
        let mut core = self.core.lock().await;
        let name = node.name.clone();
        core.node_mut_or_new(&name).set_node(node);
        tracing::info!(node = %name, "node added");
    }

    pub async fn update_node(&self, node: NodeDescriptor) {
        self.add_node(node).await;
    }

    pub async fn remove_node(&self, name: &str) {
        let mut core = self.core.lock().await;
        if let Some(node) = core.nodes.get_mut(name) {
            node.remove_node();
        }
        core.prune_node_if_deletable(name);
        tracing::info!(node = %name, "node removed");
    }

    pub async fn add_pdb(&self, pdb: DisruptionBudget) {
        let mut core = self.core.lock().await;
        tracing::debug!(pdb = %pdb.id, "disruption budget added");
        core.pdbs.insert(pdb.id.clone(), pdb);
    }

    pub async fn update_pdb(&self, pdb: DisruptionBudget) {
        self.add_pdb(pdb).await;
    }

    pub async fn remove_pdb(&self, id: &str) {
        let mut core = self.core.lock().await;
        core.pdbs.remove(id);
        tracing::debug!(pdb = %id, "disruption budget removed");
    }

    pub async fn get_pod(&self, key: &WorkloadKey) -> Option<Workload> {
        let core = self.core.lock().await;
        core.pod_states.get(key).map(|s| s.pod.clone())
    }

    pub async fn is_assumed_pod(&self, key: &WorkloadKey) -> bool {
        let core = self.core.lock().await;
        core.assumed_pods.contains(key)
    }

    /// Applies `filter` then `selector` to every cached workload across
    /// every node. Pre-sizes the result by summing `len(pods)` to avoid
    /// growth churn; the returned order is unspecified.
    ///
    /// Serves both a plain label-selector listing and a filtered listing —
    /// pass `|_| true` for the former.
    pub async fn list(
        &self,
        filter: impl Fn(&Workload) -> bool,
        selector: &LabelSelector,
    ) -> Vec<Workload> {
        let core = self.core.lock().await;
        let cap: usize = core.nodes.values().map(|n| n.pods().len()).sum();
        let mut out = Vec::with_capacity(cap);
        for node in core.nodes.values() {
            for pod in node.pods() {
                if filter(pod) && selector.matches(&pod.labels) {
                    out.push(pod.clone());
                }
            }
        }
        out
    }

    pub async fn list_pdbs(&self, selector: &LabelSelector) -> Vec<DisruptionBudget> {
        let core = self.core.lock().await;
        core.pdbs
            .values()
            .filter(|b| selector.matches(&b.labels))
            .cloned()
            .collect()
    }

    /// A structurally independent deep copy of `nodes`, `assumedPods`, and
    /// `pdbs`, taken atomically under the lock. Expensive; not for the
    /// scheduling hot path.
    pub async fn snapshot(&self) -> CacheSnapshot {
        let core = self.core.lock().await;
        CacheSnapshot {
            nodes: core.nodes.clone(),
            assumed_pods: core.assumed_pods.clone(),
            pdbs: core.pdbs.clone(),
        }
    }

    /// Incrementally reconciles `target` against the cache's current node
    /// map: entries whose generation already matches are left untouched,
    /// changed entries are re-cloned, entries absent from the cache are
    /// deleted from `target`.
    pub async fn update_node_name_to_info_map(&self, target: &mut HashMap<String, NodeInfo>) {
        let core = self.core.lock().await;
        target.retain(|name, _| core.nodes.contains_key(name));
        for (name, node) in core.nodes.iter() {
            let up_to_date = target
                .get(name)
                .is_some_and(|t| t.generation() == node.generation());
            if !up_to_date {
                target.insert(name.clone(), node.clone());
            }
        }
    }

    pub async fn is_up_to_date(&self, node_name: &str, generation: u64) -> bool {
        let core = self.core.lock().await;
        core.nodes
            .get(node_name)
            .is_some_and(|n| n.generation() == generation)
    }

    /// Invoked once per reaper tick; not part of the public surface.
    pub(crate) async fn reap_tick(&self, now: Instant) {
        let mut core = self.core.lock().await;
        core.reap_expired(now);
    }
}
