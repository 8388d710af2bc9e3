//! Contention tests against the in-memory store on a multi-threaded
//! runtime.

#![allow(clippy::panic)]

mod common;

use std::sync::Arc;

use eventflow::persistence::{EnrollmentStore, MemoryStore};

use common::scenarios::{self, Harness};

fn harness() -> Harness {
    Harness::new(Arc::new(MemoryStore::new()))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn last_seat_goes_to_one_user() {
    scenarios::last_seat_goes_to_one_user(&harness()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn oversubscribed_event_fills_exactly() {
    scenarios::oversubscribed_event_fills_exactly(&harness()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn double_submit_enrolls_once() {
    scenarios::double_submit_enrolls_once(&harness()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn churn_keeps_counter_exact() {
    scenarios::churn_keeps_counter_exact(&harness()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn repeated_races_never_overbook() {
    let store = Arc::new(MemoryStore::new());
    for _ in 0..20 {
        let h = Harness::new(Arc::clone(&store) as Arc<dyn EnrollmentStore>);
        scenarios::last_seat_goes_to_one_user(&h).await;
    }
}
