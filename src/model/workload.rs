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

use crate::manager::resize::PendingResize;
use crate::model::resource::ResourceVector;

/// Stable identity of a workload, derived from its namespace and name.
/// Two [`Workload`] values with the same key refer to the same workload
/// across its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkloadKey {
    pub namespace: String,
    pub name: String,
}

impl WorkloadKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for WorkloadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

/// A single named container's requests and limits.
#[derive(Debug, Clone, Default)]
pub struct Container {
    pub name: String,
    pub requests: ResourceVector,
    pub limits: ResourceVector,
}

/// Per-container overlay requested by an in-place vertical resize.
#[derive(Debug, Clone, Default)]
pub struct ResizeRequest {
    /// Container name -> requested resources, replacing that container's
    /// current requests (and limits, symmetrically) if admitted.
    pub container_requests: HashMap<String, ResourceVector>,
}

impl ResizeRequest {
    pub fn is_empty(&self) -> bool {
        self.container_requests.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeOutcome {
    Success,
    Failure,
}

/// A status condition reported back (by the out-of-scope kubelet-equivalent)
/// against a specific resize action-version.
#[derive(Debug, Clone)]
pub struct ResizeStatusCondition {
    pub action_version: String,
    pub outcome: ResizeOutcome,
}

/// The cached copy of a schedulable unit.
#[derive(Debug, Clone)]
pub struct Workload {
    pub key: WorkloadKey,
    pub node_name: Option<String>,
    pub containers: Vec<Container>,
    pub labels: HashMap<String, String>,
    pub phase: WorkloadPhase,
    pub deletion_timestamp: Option<std::time::SystemTime>,
    /// Opaque version tag; also used as the resize action-version.
    pub resource_version: String,
    pub resize_request: Option<ResizeRequest>,
    pub resize_conditions: Vec<ResizeStatusCondition>,
    /// Rollback-able record of the last in-place resize committed against
    /// this workload, pending resolution by a status condition.
    pub pending_resize: Option<PendingResize>,
}

impl Workload {
    pub fn new(key: WorkloadKey, node_name: impl Into<String>) -> Self {
        Self {
            key,
            node_name: Some(node_name.into()),
            containers: Vec::new(),
            labels: HashMap::new(),
            phase: WorkloadPhase::Pending,
            deletion_timestamp: None,
            resource_version: String::from("0"),
            resize_request: None,
            resize_conditions: Vec::new(),
            pending_resize: None,
        }
    }

    pub fn is_being_deleted(&self) -> bool {
        self.deletion_timestamp.is_some()
    }

    /// Sum of every container's request vector.
    pub fn requested_resource(&self) -> ResourceVector {
        self.containers
            .iter()
            .fold(ResourceVector::default(), |mut acc, c| {
                acc += &c.requests;
                acc
            })
    }

    /// Sum of every container's non-zero request vector.
    pub fn non_zero_request(&self) -> ResourceVector {
        self.containers
            .iter()
            .fold(ResourceVector::default(), |mut acc, c| {
                acc += &c.requests.non_zero();
                acc
            })
    }

    pub fn container_mut(&mut self, name: &str) -> Option<&mut Container> {
        self.containers.iter_mut().find(|c| c.name == name)
    }
}
