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

//! End-to-end scenarios exercising the assumed-workload lifecycle and the
//! resize decision engine as full-flow integration tests.

use std::collections::HashMap;
use std::time::Duration;

use scheduler_cache::{
    Cache, CacheOpts, Container, DisruptionBudget, LabelSelector, NodeDescriptor, ResizeAction,
    ResizePolicy, ResizeRequest, ResourceVector, Workload, WorkloadKey, WorkloadPhase,
};

fn node(name: &str, cpu: i64, mem: i64) -> NodeDescriptor {
    NodeDescriptor {
        name: name.to_string(),
        labels: HashMap::new(),
        allocatable: ResourceVector::new(cpu, mem),
    }
}

fn pod_with(key: WorkloadKey, node_name: &str, cpu: i64, mem: i64) -> Workload {
    let mut w = Workload::new(key, node_name);
    w.containers.push(Container {
        name: "main".into(),
        requests: ResourceVector::new(cpu, mem),
        limits: ResourceVector::new(cpu, mem),
    });
    w
}

#[tokio::test(start_paused = true)]
async fn s1_assume_finish_expire_returns_capacity() {
    let opts = CacheOpts {
        assumed_pod_ttl: Duration::from_millis(10),
        reaper_period: Duration::from_millis(2),
        ..CacheOpts::for_test()
    };
    let (cache, handle, stop) = Cache::new(opts);
    cache.add_node(node("nodeN", 2000, 4 * 1024 * 1024 * 1024)).await;

    let key = WorkloadKey::new("default", "a");
    let a = pod_with(key.clone(), "nodeN", 500, 1024 * 1024 * 1024);
    cache.assume(a).await.unwrap();
    cache.finish_binding(&key).await;

    let snap = cache.snapshot().await;
    assert_eq!(snap.nodes["nodeN"].requested_resource().milli_cpu, 500);

    tokio::time::advance(Duration::from_millis(15)).await;
    tokio::time::sleep(Duration::from_millis(1)).await;

    assert!(cache.get_pod(&key).await.is_none());
    assert!(!cache.is_assumed_pod(&key).await);
    let snap = cache.snapshot().await;
    assert_eq!(snap.nodes["nodeN"].requested_resource().milli_cpu, 0);

    let _ = stop.send(());
    handle.await.unwrap();
}

#[tokio::test]
async fn s2_assume_add_on_same_node() {
    let (cache, _handle, stop) = Cache::for_test();
    cache.add_node(node("nodeN", 2000, 4 * 1024 * 1024 * 1024)).await;

    let key = WorkloadKey::new("default", "a");
    let a = pod_with(key.clone(), "nodeN", 500, 1024 * 1024 * 1024);
    cache.assume(a.clone()).await.unwrap();
    cache.add_pod(a).await.unwrap();

    assert!(!cache.is_assumed_pod(&key).await);
    assert_eq!(cache.get_pod(&key).await.unwrap().node_name.as_deref(), Some("nodeN"));
    let snap = cache.snapshot().await;
    assert_eq!(snap.nodes["nodeN"].pods().len(), 1);

    let _ = stop.send(());
}

#[tokio::test]
async fn s3_assume_add_on_different_node() {
    let (cache, _handle, stop) = Cache::for_test();
    cache.add_node(node("nodeN1", 2000, 4 * 1024 * 1024 * 1024)).await;
    cache.add_node(node("nodeN2", 2000, 4 * 1024 * 1024 * 1024)).await;

    let key = WorkloadKey::new("default", "a");
    let assumed = pod_with(key.clone(), "nodeN1", 500, 1024 * 1024 * 1024);
    cache.assume(assumed).await.unwrap();

    let confirmed = pod_with(key.clone(), "nodeN2", 500, 1024 * 1024 * 1024);
    cache.add_pod(confirmed).await.unwrap();

    assert!(!cache.is_assumed_pod(&key).await);
    let snap = cache.snapshot().await;
    assert!(snap.nodes["nodeN1"].pods().is_empty());
    assert_eq!(snap.nodes["nodeN2"].pods().len(), 1);
    assert_eq!(snap.nodes["nodeN2"].pods()[0].key, key);

    let _ = stop.send(());
}

#[tokio::test]
async fn s4_in_place_resize_accepted() {
    let (cache, _handle, stop) = Cache::for_test();
    cache.add_node(node("nodeN", 2000, 4 * 1024 * 1024 * 1024)).await;

    let key = WorkloadKey::new("default", "a");
    let mut old = pod_with(key.clone(), "nodeN", 500, 1024 * 1024 * 1024);
    old.phase = WorkloadPhase::Running;
    cache.add_pod(old.clone()).await.unwrap();

    let mut new = old.clone();
    let mut req = HashMap::new();
    req.insert("main".to_string(), ResourceVector::new(800, 1536 * 1024 * 1024));
    new.resize_request = Some(ResizeRequest {
        container_requests: req,
    });

    let action = cache.update_pod(old, new).await.unwrap();
    assert_eq!(action, Some(ResizeAction::Update));

    let updated = cache.get_pod(&key).await.unwrap();
    assert_eq!(updated.containers[0].requests.milli_cpu, 800);
    assert!(updated.pending_resize.is_some());

    let snap = cache.snapshot().await;
    assert_eq!(snap.nodes["nodeN"].requested_resource().milli_cpu, 800);
    assert_eq!(
        snap.nodes["nodeN"].requested_resource().memory_bytes,
        (1536 * 1024 * 1024) as i64
    );

    let _ = stop.send(());
}

#[tokio::test]
async fn s5_in_place_resize_rejected_by_capacity_in_place_only() {
    let (cache, _handle, stop) = Cache::for_test();
    cache.add_node(node("nodeN", 2000, 4 * 1024 * 1024 * 1024)).await;

    let key = WorkloadKey::new("default", "a");
    let mut old = pod_with(key.clone(), "nodeN", 500, 1024 * 1024 * 1024);
    old.phase = WorkloadPhase::Running;
    cache.add_pod(old.clone()).await.unwrap();

    let mut new = old.clone();
    let mut req = HashMap::new();
    req.insert("main".to_string(), ResourceVector::new(2000, 0));
    new.resize_request = Some(ResizeRequest {
        container_requests: req,
    });

    // Re-create the cache with InPlaceOnly as the default policy.
    let opts = CacheOpts {
        default_resize_policy: ResizePolicy::InPlaceOnly,
        ..CacheOpts::for_test()
    };
    let (cache2, _h2, stop2) = Cache::new(opts);
    cache2.add_node(node("nodeN", 2000, 4 * 1024 * 1024 * 1024)).await;
    cache2.add_pod(old.clone()).await.unwrap();

    let action = cache2.update_pod(old, new).await.unwrap();
    assert_eq!(action, Some(ResizeAction::NonePerPolicy));

    let unchanged = cache2.get_pod(&key).await.unwrap();
    assert_eq!(unchanged.containers[0].requests.milli_cpu, 500);
    let snap = cache2.snapshot().await;
    assert_eq!(snap.nodes["nodeN"].requested_resource().milli_cpu, 500);

    let _ = stop.send(());
    let _ = stop2.send(());
}

#[tokio::test]
async fn s6_resize_falls_back_to_reschedule_blocked_by_pdb() {
    let (cache, _handle, stop) = Cache::for_test();
    cache.add_node(node("nodeN", 1000, 2 * 1024 * 1024 * 1024)).await;
    cache
        .add_pdb(DisruptionBudget {
            id: "pdb1".into(),
            labels: HashMap::new(),
            selector: LabelSelector::parse("app=web").unwrap(),
            pod_disruptions_allowed: 0,
        })
        .await;

    let key = WorkloadKey::new("default", "a");
    let mut old = pod_with(key.clone(), "nodeN", 500, 1024 * 1024 * 1024);
    old.phase = WorkloadPhase::Running;
    old.labels.insert("app".into(), "web".into());
    cache.add_pod(old.clone()).await.unwrap();

    let mut new = old.clone();
    let mut req = HashMap::new();
    req.insert("main".to_string(), ResourceVector::new(2000, 0));
    new.resize_request = Some(ResizeRequest {
        container_requests: req,
    });

    let action = cache.update_pod(old, new).await.unwrap();
    assert_eq!(action, Some(ResizeAction::NonePerPDBViolation));

    let _ = stop.send(());
}

#[tokio::test]
async fn s7_list_filter_and_selector() {
    let (cache, _handle, stop) = Cache::for_test();
    cache.add_node(node("nodeN1", 4000, 8 * 1024 * 1024 * 1024)).await;
    cache.add_node(node("nodeN2", 4000, 8 * 1024 * 1024 * 1024)).await;

    let mut pods = Vec::new();
    for (i, (node_name, label, phase)) in [
        ("nodeN1", "web", WorkloadPhase::Running),
        ("nodeN1", "db", WorkloadPhase::Running),
        ("nodeN1", "web", WorkloadPhase::Succeeded),
        ("nodeN2", "web", WorkloadPhase::Running),
        ("nodeN2", "cache", WorkloadPhase::Running),
    ]
    .into_iter()
    .enumerate()
    {
        let key = WorkloadKey::new("default", &format!("w{i}"));
        let mut w = pod_with(key, node_name, 100, 64 * 1024 * 1024);
        w.labels.insert("app".into(), label.to_string());
        w.phase = phase;
        cache.add_pod(w.clone()).await.unwrap();
        pods.push(w);
    }

    let non_terminating = |w: &Workload| {
        !matches!(w.phase, WorkloadPhase::Succeeded | WorkloadPhase::Failed)
    };
    let selector = LabelSelector::parse("app=web").unwrap();
    let result = cache.list(non_terminating, &selector).await;

    assert_eq!(result.len(), 2);
    assert!(result.iter().all(|w| w.labels.get("app").map(String::as_str) == Some("web")));
    assert!(result
        .iter()
        .all(|w| !matches!(w.phase, WorkloadPhase::Succeeded)));

    let total_pods: usize = 5;
    assert!(result.len() <= total_pods);

    let _ = stop.send(());
}
