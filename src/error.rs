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

use crate::model::workload::WorkloadKey;

/// Recoverable errors the cache signals to callers.
///
/// Invariant violations (a node-name mismatch on a confirmed `Update`/`Remove`,
/// or the reaper finding a dangling assumed key) are not represented here —
/// they are fatal and surface as a panic, because downstream scheduling
/// decisions can no longer be trusted once they occur. See [`crate::fatal`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("workload {0:?} is already present in the cache")]
    AlreadyPresent(WorkloadKey),

    #[error("workload {0:?} is not assumed")]
    NotAssumed(WorkloadKey),

    #[error("workload {0:?} is already confirmed")]
    AlreadyAdded(WorkloadKey),

    #[error("workload {0:?} is not in the cache")]
    NotAdded(WorkloadKey),

    #[error("workload {key:?} node mismatch: cached on {cached:?}, submitted {submitted:?}")]
    NodeMismatch {
        key: WorkloadKey,
        cached: Option<String>,
        submitted: Option<String>,
    },

    #[error("node {0:?} is not tracked by the cache")]
    UnknownNode(String),

    #[error("label selector is invalid: {0}")]
    SelectorInvalid(String),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Raises a fatal invariant violation: logs at `error!` and panics.
///
/// Used for states the cache's own invariants guarantee cannot occur — a
/// dangling assumed key, or a confirmed workload whose submitted `nodeName`
/// disagrees with its cached assignment. Treat every call site as a defect
/// in the cache itself, never a caller input error.
#[track_caller]
pub fn fatal(msg: impl std::fmt::Display) -> ! {
    tracing::error!(%msg, "cache invariant violated, terminating");
    panic!("cache corrupt: {msg}");
}
