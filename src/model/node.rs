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

use std::collections::HashMap;

use crate::model::resource::ResourceVector;
use crate::model::workload::{Workload, WorkloadKey};

/// The authoritative descriptor of a node, as reported by the event feed.
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    pub name: String,
    pub labels: HashMap<String, String>,
    pub allocatable: ResourceVector,
}

/// Per-scheduling-cycle scratch space, feature-gated and reset whenever a
/// [`NodeInfo`] is handed off from the cache's internal map to a caller-owned
/// snapshot map (see `Cache::update_node_name_to_info_map`).
#[derive(Debug, Clone, Default)]
pub struct TransientInfo {
    pub requested_volume_size: i64,
}

/// Error returned by [`NodeInfo::remove_pod`] when the workload is not
/// accounted on this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("workload not found on node")]
pub struct NotFound;

/// The per-node aggregate view the scheduler consults for placement:
/// which workloads are accounted here, their summed resource requests, and
/// a generation stamp for staleness detection.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub node: Option<NodeDescriptor>,
    pods: Vec<Workload>,
    requested_resource: ResourceVector,
    non_zero_request: ResourceVector,
    allocatable_resource: ResourceVector,
    generation: u64,
    pub transient_info: Option<TransientInfo>,
}

impl NodeInfo {
    pub fn new() -> Self {
        Self {
            node: None,
            pods: Vec::new(),
            requested_resource: ResourceVector::default(),
            non_zero_request: ResourceVector::default(),
            allocatable_resource: ResourceVector::default(),
            generation: 0,
            transient_info: None,
        }
    }

    pub fn pods(&self) -> &[Workload] {
        &self.pods
    }

    pub fn requested_resource(&self) -> &ResourceVector {
        &self.requested_resource
    }

    pub fn non_zero_request(&self) -> &ResourceVector {
        &self.non_zero_request
    }

    pub fn allocatable_resource(&self) -> &ResourceVector {
        &self.allocatable_resource
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Per invariant 5: a `NodeInfo` may be deleted from the cache only when
    /// it has no accounted pods and no known node descriptor.
    pub fn is_deletable(&self) -> bool {
        self.pods.is_empty() && self.node.is_none()
    }

    fn bump_generation(&mut self) {
        self.generation += 1;
    }

    /// Appends `pod` to the tracked set and adds its resource vectors to the
    /// running sums.
    pub fn add_pod(&mut self, pod: Workload) {
        self.requested_resource += &pod.requested_resource();
        self.non_zero_request += &pod.non_zero_request();
        self.pods.push(pod);
        self.bump_generation();
    }

    /// Locates the workload by key, subtracts its resource vectors, and
    /// removes it. Fails [`NotFound`] if the key is not accounted here.
    pub fn remove_pod(&mut self, key: &WorkloadKey) -> Result<Workload, NotFound> {
        let idx = self.pods.iter().position(|p| &p.key == key).ok_or(NotFound)?;
        let removed = self.pods.remove(idx);
        self.requested_resource -= &removed.requested_resource();
        self.non_zero_request -= &removed.non_zero_request();
        self.bump_generation();
        Ok(removed)
    }

    /// Replaces the cached copy of an already-tracked workload in place
    /// (used by the resize decision engine to commit a resize without a
    /// remove/add round trip), adjusting the running sums by the delta.
    pub fn replace_pod(&mut self, key: &WorkloadKey, new_pod: Workload) -> Result<(), NotFound> {
        let idx = self.pods.iter().position(|p| &p.key == key).ok_or(NotFound)?;
        let old_requested = self.pods[idx].requested_resource();
        let old_non_zero = self.pods[idx].non_zero_request();
        self.requested_resource -= &old_requested;
        self.non_zero_request -= &old_non_zero;
        self.requested_resource += &new_pod.requested_resource();
        self.non_zero_request += &new_pod.non_zero_request();
        self.pods[idx] = new_pod;
        self.bump_generation();
        Ok(())
    }

    pub fn pod(&self, key: &WorkloadKey) -> Option<&Workload> {
        self.pods.iter().find(|p| &p.key == key)
    }

    pub fn pod_mut(&mut self, key: &WorkloadKey) -> Option<&mut Workload> {
        self.pods.iter_mut().find(|p| &p.key == key)
    }

    /// Stores the node descriptor and recomputes `allocatableResource`.
    /// Idempotent on repeated calls with an equivalent descriptor, but still
    /// bumps the generation so consumers holding a prior clone re-read.
    pub fn set_node(&mut self, node: NodeDescriptor) {
        self.allocatable_resource = node.allocatable.clone();
        self.node = Some(node);
        self.bump_generation();
    }

    pub fn remove_node(&mut self) {
        self.node = None;
        self.bump_generation();
    }

    /// Recomputes both resource sums from scratch by summing `pods`. Used by
    /// tests to validate invariant 4 (`requestedResource` equals the literal
    /// sum), never by the incremental mutation path above.
    #[cfg(test)]
    pub fn recompute(&self) -> (ResourceVector, ResourceVector) {
        let mut requested = ResourceVector::default();
        let mut non_zero = ResourceVector::default();
        for pod in &self.pods {
            requested += &pod.requested_resource();
            non_zero += &pod.non_zero_request();
        }
        (requested, non_zero)
    }
}

impl Default for NodeInfo {
    fn default() -> Self {
        Self::new()
    }
}
