//! Property tests for the arbiter and the escalation machine.

use glam::Vec2;
use hallway_ai::prelude::*;
use hallway_common::{AgentId, EdgeId};
use proptest::prelude::*;

const ZONES: [&str; 3] = ["A", "B", "C"];
const AGENTS: usize = 4;

#[derive(Debug, Clone)]
enum Op {
    Reserve { edge: usize, agent: usize },
    Release { edge: usize, agent: usize },
    Clear { agent: usize, zone: usize },
    Cancel { agent: usize },
    Unregister { agent: usize },
    Register { agent: usize, zone: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let agent = 0..AGENTS;
    let edge = 0..6usize;
    let zone = 0..ZONES.len();
    prop_oneof![
        3 => (edge.clone(), agent.clone()).prop_map(|(edge, agent)| Op::Reserve { edge, agent }),
        3 => (edge, agent.clone()).prop_map(|(edge, agent)| Op::Release { edge, agent }),
        1 => (agent.clone(), zone.clone()).prop_map(|(agent, zone)| Op::Clear { agent, zone }),
        1 => agent.clone().prop_map(|agent| Op::Cancel { agent }),
        1 => agent.clone().prop_map(|agent| Op::Unregister { agent }),
        1 => (agent, zone).prop_map(|(agent, zone)| Op::Register { agent, zone }),
    ]
}

/// Fully connected triangle with each agent resident in zone A or B.
fn triangle() -> (ReservationArbiter, Vec<AgentId>) {
    let mut arbiter = ReservationArbiter::new();
    for from in ZONES {
        for to in ZONES {
            if from != to {
                arbiter
                    .register_edge(WarpSpec::new(format!("{from}{to}"), from, to, Vec2::ZERO))
                    .expect("edge should register");
            }
        }
    }
    let agents: Vec<AgentId> = (0..AGENTS).map(|_| AgentId::new()).collect();
    for (i, agent) in agents.iter().enumerate() {
        arbiter.register_resident(*agent, ZONES[i % 2]);
    }
    (arbiter, agents)
}

fn apply(arbiter: &mut ReservationArbiter, agents: &[AgentId], op: &Op) {
    match *op {
        Op::Reserve { edge, agent } => {
            let edge = EdgeId::new(edge as u32);
            let requester = agents[agent];
            let before = arbiter.holder(edge);
            let won = arbiter.reserve(edge, requester);

            if let Some(other) = before.filter(|&h| h != requester) {
                assert!(!won);
                assert_eq!(arbiter.holder(edge), Some(other));
            }
            if won {
                let dest = arbiter.edge(edge).expect("edge exists").dest().clone();
                assert!(!arbiter.is_zone_occupied_by_other(dest.as_str(), requester));
                assert_eq!(arbiter.holder(edge), Some(requester));
            }
        },
        Op::Release { edge, agent } => arbiter.release(EdgeId::new(edge as u32), agents[agent]),
        Op::Clear { agent, zone } => arbiter.clear_destination_membership(agents[agent], ZONES[zone]),
        Op::Cancel { agent } => {
            arbiter.cancel_reservation(agents[agent]);
        },
        Op::Unregister { agent } => {
            arbiter.unregister(agents[agent]);
        },
        Op::Register { agent, zone } => arbiter.register_resident(agents[agent], ZONES[zone]),
    }
}

fn check_invariants(arbiter: &ReservationArbiter, agents: &[AgentId]) {
    for agent in agents {
        let homes = ZONES
            .iter()
            .filter(|zone| arbiter.residents(zone).any(|a| a == *agent))
            .count();
        let expected = usize::from(arbiter.is_resident(*agent));
        assert_eq!(homes, expected, "{agent} resident in {homes} zones");
    }

    for edge in arbiter.registry().edges() {
        if let Some(holder) = arbiter.holder(edge.id()) {
            assert!(arbiter.is_resident(holder), "{} held by non-resident", edge.name());
        }
        for arrived in arbiter.arrivals(edge.id()) {
            assert!(arbiter.is_resident(arrived), "{} remembers non-resident", edge.name());
        }
    }
}

proptest! {
    #[test]
    fn prop_reservations_stay_exclusive(ops in prop::collection::vec(op_strategy(), 1..80)) {
        let (mut arbiter, agents) = triangle();
        for op in &ops {
            apply(&mut arbiter, &agents, op);
            check_invariants(&arbiter, &agents);
        }
    }

    #[test]
    fn prop_release_is_idempotent(
        ops in prop::collection::vec(op_strategy(), 0..40),
        edge in 0..6u32,
        agent in 0..AGENTS,
    ) {
        let (mut arbiter, agents) = triangle();
        for op in &ops {
            apply(&mut arbiter, &agents, op);
        }
        let edge = EdgeId::new(edge);

        arbiter.release(edge, agents[agent]);
        let once = arbiter.snapshot();
        arbiter.release(edge, agents[agent]);
        prop_assert_eq!(arbiter.snapshot(), once);
    }

    #[test]
    fn prop_escalation_never_decreases(
        samples in prop::collection::vec((any::<bool>(), any::<bool>()), 1..100),
    ) {
        let mut vision = VisionEscalation::new();
        let mut previous = vision.state();
        for (enemy_sees_player, player_sees_enemy) in samples {
            vision.update(VisionSample { enemy_sees_player, player_sees_enemy }, false);
            prop_assert!(vision.state() >= previous);
            previous = vision.state();
        }
    }

    #[test]
    fn prop_hiding_never_touches_latches(
        samples in prop::collection::vec((any::<bool>(), any::<bool>(), any::<bool>()), 1..100),
    ) {
        let mut vision = VisionEscalation::new();
        for (enemy_sees_player, player_sees_enemy, hiding) in samples {
            let latches = (vision.stalk_latched(), vision.hunt_latched());
            vision.update(VisionSample { enemy_sees_player, player_sees_enemy }, hiding);
            if hiding {
                prop_assert_eq!(vision.state(), EscalationState::Patrol);
                prop_assert_eq!((vision.stalk_latched(), vision.hunt_latched()), latches);
            }
        }
    }
}
