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

//! The expiration reaper: a single background task bound to a stop signal,
//! ticking at a fixed period to evict assumed workloads whose binding has
//! finished and whose deadline has passed. A `tokio::spawn`ed loop racing
//! `interval.tick()` against a `oneshot::Receiver<()>`.

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::manager::cache::Cache;

pub(crate) fn spawn(cache: Arc<Cache>) -> (JoinHandle<()>, oneshot::Sender<()>) {
    let (stop_tx, mut stop_rx) = oneshot::channel();
    let period = cache.opts().reaper_period;

    let handle = tokio::spawn(async move {
        let mut tick = tokio::time::interval(period);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = tick.tick() => {},
                _ = &mut stop_rx => {
                    tracing::info!("expiration reaper stopped");
                    return;
                }
            }
            cache.reap_tick(tokio::time::Instant::now()).await;
        }
    });

    (handle, stop_tx)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::config::CacheOpts;
    use crate::manager::cache::Cache;
    use crate::model::node::NodeDescriptor;
    use crate::model::resource::ResourceVector;
    use crate::model::workload::{Workload, WorkloadKey};
    use std::collections::HashMap;

    #[tokio::test(start_paused = true)]
    async fn reaper_expires_assumed_workload_past_its_deadline() {
        let opts = CacheOpts {
            assumed_pod_ttl: Duration::from_millis(10),
            reaper_period: Duration::from_millis(5),
            ..CacheOpts::for_test()
        };
        let (cache, handle, stop) = Cache::new(opts);

        cache
            .add_node(NodeDescriptor {
                name: "nodeA".into(),
                labels: HashMap::new(),
                allocatable: ResourceVector::new(2000, 4 * 1024 * 1024 * 1024),
            })
            .await;

        let key = WorkloadKey::new("default", "a");
        let w = Workload::new(key.clone(), "nodeA");
        cache.assume(w.clone()).await.unwrap();
        cache.finish_binding(&key).await;

        tokio::time::advance(Duration::from_millis(15)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(cache.get_pod(&key).await.is_none());
        assert!(!cache.is_assumed_pod(&key).await);

        let _ = stop.send(());
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn reaper_leaves_binding_in_flight_workload_untouched() {
        let opts = CacheOpts {
            assumed_pod_ttl: Duration::from_millis(10),
            reaper_period: Duration::from_millis(5),
            ..CacheOpts::for_test()
        };
        let (cache, handle, stop) = Cache::new(opts);

        cache
            .add_node(NodeDescriptor {
                name: "nodeA".into(),
                labels: HashMap::new(),
                allocatable: ResourceVector::new(2000, 4 * 1024 * 1024 * 1024),
            })
            .await;

        let key = WorkloadKey::new("default", "a");
        let w = Workload::new(key.clone(), "nodeA");
        cache.assume(w).await.unwrap();
        // Never call finish_binding: the commit is still in flight.

        tokio::time::advance(Duration::from_millis(50)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(cache.is_assumed_pod(&key).await);

        let _ = stop.send(());
        handle.await.unwrap();
    }
}
