//! Reservation exclusivity with agents on real threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use glam::Vec2;
use hallway_ai::prelude::*;
use hallway_common::AgentId;

#[test]
fn test_shared_arbiter_grants_each_edge_once() {
    let mut arbiter = ReservationArbiter::new();
    let mut edges = Vec::new();
    for i in 0..4 {
        edges.push(
            arbiter
                .register_edge(WarpSpec::new(format!("Door_{i}"), "Hall", format!("Room{i}"), Vec2::ZERO))
                .expect("edge should register"),
        );
    }
    let agents: Vec<AgentId> = (0..8).map(|_| AgentId::new()).collect();
    for agent in &agents {
        arbiter.register_resident(*agent, "Hall");
    }

    let shared = arbiter.into_shared();
    let wins = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = agents
        .iter()
        .map(|&agent| {
            let shared = Arc::clone(&shared);
            let wins = Arc::clone(&wins);
            thread::spawn(move || {
                let mut rng = fastrand::Rng::with_seed(agent.raw());
                for _ in 0..50 {
                    // Listing and reserving are separate lock scopes on purpose.
                    let pick = shared.lock().random_available_edge("Hall", agent, &mut rng);
                    let Some(edge) = pick else {
                        thread::yield_now();
                        continue;
                    };
                    if shared.lock().reserve(edge, agent) {
                        wins.fetch_add(1, Ordering::Relaxed);
                        return Some(edge);
                    }
                }
                None
            })
        })
        .collect();

    let won: Vec<_> = handles
        .into_iter()
        .filter_map(|h| h.join().expect("thread should not panic"))
        .collect();

    let arbiter = shared.lock();
    assert_eq!(won.len(), wins.load(Ordering::Relaxed));
    assert!(won.len() <= edges.len());
    for edge in &edges {
        let holders = won.iter().filter(|e| *e == edge).count();
        assert!(holders <= 1, "{edge} granted {holders} times");
        assert_eq!(holders == 1, arbiter.holder(*edge).is_some());
    }
}
