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

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::manager::resize::ResizePolicy;

/// Reaper tick period used when [`CacheOpts`] does not override it.
pub const DEFAULT_REAPER_PERIOD: Duration = Duration::from_secs(1);

/// Cache-wide configuration, separate from the mutable core state.
///
/// Deserializable so a host process can load it alongside its own config
/// file; the cache itself never re-reads or watches this value after
/// construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOpts {
    /// Duration between `FinishBinding` and reaper-driven expiration.
    #[serde(with = "humantime_serde")]
    pub assumed_pod_ttl: Duration,
    /// Reaper tick interval. Defaults to [`DEFAULT_REAPER_PERIOD`].
    #[serde(with = "humantime_serde")]
    pub reaper_period: Duration,
    /// Default policy applied by the resize decision engine.
    pub default_resize_policy: ResizePolicy,
    /// Whether `update_pod` runs the resize decision engine at all. Off by
    /// default so a host that has not wired status-condition reporting back
    /// does not silently accumulate unresolved `pending_resize` entries.
    pub resize_feature_enabled: bool,
}

impl Default for CacheOpts {
    fn default() -> Self {
        Self {
            assumed_pod_ttl: Duration::from_secs(30),
            reaper_period: DEFAULT_REAPER_PERIOD,
            default_resize_policy: ResizePolicy::InPlacePreferred,
            resize_feature_enabled: false,
        }
    }
}

impl CacheOpts {
    pub fn for_test() -> Self {
        Self {
            assumed_pod_ttl: Duration::from_millis(10),
            reaper_period: Duration::from_millis(5),
            resize_feature_enabled: true,
            ..Default::default()
        }
    }
}
