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

use crate::selector::LabelSelector;

/// A policy object bounding how many workloads of a labeled group may be
/// concurrently unavailable.
#[derive(Debug, Clone)]
pub struct DisruptionBudget {
    pub id: String,
    /// Own labels, matched by `List(selector)`.
    pub labels: HashMap<String, String>,
    /// Matched against a candidate workload's labels during consultation.
    pub selector: LabelSelector,
    pub pod_disruptions_allowed: i32,
}

impl DisruptionBudget {
    pub fn blocks_disruption(&self) -> bool {
        self.pod_disruptions_allowed <= 0
    }
}
