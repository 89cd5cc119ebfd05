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

//! An in-memory, concurrency-safe projection of cluster state (nodes,
//! workloads, disruption budgets) for a scheduler to consult while deciding
//! placement. Optimistically commits placement decisions ("assumed"
//! workloads) ahead of authoritative confirmation, reconciling with later
//! add/update/remove events without double-booking node capacity; also
//! hosts the in-place vertical-resize decision engine consulted on
//! workload updates.

pub mod config;
pub mod error;
pub mod manager;
pub mod model;
pub mod selector;

pub use config::CacheOpts;
pub use error::{CacheError, CacheResult};
pub use manager::cache::{Cache, CacheSnapshot};
pub use manager::resize::{PendingResize, ResizeAction, ResizePolicy};
pub use model::node::{NodeDescriptor, NodeInfo, TransientInfo};
pub use model::pdb::DisruptionBudget;
pub use model::resource::ResourceVector;
pub use model::workload::{
    Container, ResizeOutcome, ResizeRequest, ResizeStatusCondition, Workload, WorkloadKey,
    WorkloadPhase,
};
pub use selector::{LabelSelector, SelectorOp, SelectorRequirement};
