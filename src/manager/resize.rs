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

//! In-place vertical-resize decision engine.
//!
//! Invoked from [`crate::manager::cache::Cache::update_pod`] only when the
//! feature is enabled, both the old and new workload are in the `Running`
//! phase, the new workload is not being deleted, and it carries a resize
//! request. The caller has already removed the old workload from `node`
//! before calling [`decide`], so `node`'s aggregates here already reflect
//! every *other* workload on the node; `decide` only mutates `new_pod`, and
//! the caller re-adds it afterwards.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CacheResult;
use crate::model::node::NodeInfo;
use crate::model::pdb::DisruptionBudget;
use crate::model::resource::ResourceVector;
use crate::model::workload::{ResizeOutcome, Workload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizePolicy {
    /// Prefer an in-place resize; fall back to a reschedule if the node
    /// lacks capacity (subject to disruption budgets).
    InPlacePreferred,
    /// Only ever resize in place; never fall back to a reschedule.
    InPlaceOnly,
    /// Never resize in place; always reschedule.
    Restart,
}

/// The outcome stamped on a resize request: what the cache decided to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAction {
    /// Committed in place; the workload's requests/limits were overwritten.
    Update,
    /// The workload should be rescheduled elsewhere.
    Reschedule,
    /// Rejected: capacity was insufficient and policy forbids a reschedule.
    NonePerPolicy,
    /// Rejected: capacity was insufficient and a matching disruption budget
    /// blocks every candidate reschedule.
    NonePerPDBViolation,
}

/// The rollback-able record of the last in-place resize committed against a
/// workload, kept until a status condition resolves it one way or the
/// other. `action_version` is the workload's resource-version at the time
/// the action was stamped, so a later status condition can be correlated
/// with exactly the action it reports on.
#[derive(Debug, Clone, Default)]
pub struct PendingResize {
    pub action_version: String,
    /// Container name -> (requests, limits) as they were immediately before
    /// this action overwrote them. Empty unless the action was `Update`.
    pub rollback: HashMap<String, (ResourceVector, ResourceVector)>,
}

/// Processes any resize-status condition on `pod` that resolves its
/// existing [`PendingResize`] (step 2 of §4.4): rolls back on failure, just
/// clears on success. Only the first matching condition is honored
/// ("first match wins").
fn resolve_pending_resize(pod: &mut Workload) {
    let Some(pending) = pod.pending_resize.take() else {
        return;
    };
    let matched = pod
        .resize_conditions
        .iter()
        .find(|c| c.action_version == pending.action_version);

    if matched.map(|c| c.outcome) == Some(ResizeOutcome::Failure) {
        for (name, (requests, limits)) in &pending.rollback {
            if let Some(container) = pod.container_mut(name) {
                container.requests = requests.clone();
                container.limits = limits.clone();
            }
        }
    }
    // Success, or no report yet: nothing to roll back. `pending` stays
    // dropped either way (`take()` already cleared it on `pod`).
}

/// Overlays a resize request's per-container requests on top of a
/// workload's current containers, returning the prospective aggregate
/// request across all containers.
fn prospective_request(
    pod: &Workload,
    request: &HashMap<String, ResourceVector>,
) -> ResourceVector {
    pod.containers
        .iter()
        .fold(ResourceVector::default(), |mut acc, c| {
            let effective = request.get(&c.name).unwrap_or(&c.requests);
            acc += effective;
            acc
        })
}

/// Runs the resize decision engine for an `Update(old, new)` transition
/// whose preconditions already hold. `node` reflects the node's aggregates
/// with `new_pod` itself already removed (the caller does this before
/// calling `decide`, then re-adds `new_pod` afterwards regardless of the
/// outcome). Mutates `new_pod`'s containers, `resize_request`, and
/// `pending_resize` in place.
///
/// Returns `Ok(None)` if `new_pod` no longer carries a resize request after
/// step 2 — defensive, even though the precondition already guarantees one
/// is present on entry.
pub fn decide(
    node: &NodeInfo,
    new_pod: &mut Workload,
    policy: ResizePolicy,
    pdbs: &HashMap<String, DisruptionBudget>,
) -> CacheResult<Option<ResizeAction>> {
    resolve_pending_resize(new_pod);

    let Some(request) = new_pod.resize_request.clone() else {
        return Ok(None);
    };
    if request.is_empty() {
        return Ok(None);
    }

    if policy == ResizePolicy::Restart {
        new_pod.resize_request = None;
        stamp(new_pod, ResizeAction::Reschedule, HashMap::new());
        return Ok(Some(ResizeAction::Reschedule));
    }

    let prospective = prospective_request(new_pod, &request.container_requests);
    let combined = node.requested_resource() + &prospective;
    // Strict inequality on both dimensions: ties are not admitted.
    let fits = combined.strictly_less_on_cpu_and_mem(node.allocatable_resource());

    if fits {
        let mut rollback = HashMap::new();
        for (name, new_resources) in &request.container_requests {
            if let Some(container) = new_pod.container_mut(name) {
                rollback.insert(
                    name.clone(),
                    (container.requests.clone(), container.limits.clone()),
                );
                container.requests = new_resources.clone();
                container.limits = new_resources.clone();
            }
        }
        new_pod.resize_request = None;
        stamp(new_pod, ResizeAction::Update, rollback);
        return Ok(Some(ResizeAction::Update));
    }

    match policy {
        ResizePolicy::InPlaceOnly => {
            stamp(new_pod, ResizeAction::NonePerPolicy, HashMap::new());
            Ok(Some(ResizeAction::NonePerPolicy))
        }
        ResizePolicy::Restart => unreachable!("handled above"),
        ResizePolicy::InPlacePreferred => {
            if !new_pod.labels.is_empty() {
                for pdb in pdbs.values() {
                    if pdb.selector.is_empty() || !pdb.selector.matches(&new_pod.labels) {
                        continue;
                    }
                    if pdb.blocks_disruption() {
                        stamp(new_pod, ResizeAction::NonePerPDBViolation, HashMap::new());
                        return Ok(Some(ResizeAction::NonePerPDBViolation));
                    }
                }
            }
            stamp(new_pod, ResizeAction::Reschedule, HashMap::new());
            Ok(Some(ResizeAction::Reschedule))
        }
    }
}

fn stamp(
    pod: &mut Workload,
    action: ResizeAction,
    rollback: HashMap<String, (ResourceVector, ResourceVector)>,
) {
    if action == ResizeAction::Update {
        pod.pending_resize = Some(PendingResize {
            action_version: pod.resource_version.clone(),
            rollback,
        });
    } else {
        pod.pending_resize = None;
    }
}
