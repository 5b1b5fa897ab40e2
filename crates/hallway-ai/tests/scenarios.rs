//! End-to-end scenes driven through the director.

use std::cell::Cell;

use glam::Vec2;
use hallway_ai::prelude::*;
use hallway_common::{AgentId, ZoneId};

/// Probe that replays a script of samples, one per tick, then repeats the
/// last one.
struct ScriptedProbe {
    script: Vec<VisionSample>,
    cursor: Cell<usize>,
}

impl ScriptedProbe {
    fn new(script: Vec<VisionSample>) -> Self {
        Self {
            script,
            cursor: Cell::new(0),
        }
    }

    fn current(&self) -> VisionSample {
        let index = self.cursor.get().min(self.script.len().saturating_sub(1));
        self.script.get(index).copied().unwrap_or_default()
    }
}

impl VisionProbe for ScriptedProbe {
    fn enemy_sees_player(&self, _: &AgentState, _: &PlayerTracker) -> bool {
        self.current().enemy_sees_player
    }

    fn player_sees_enemy(&self, _: &AgentState, _: &PlayerTracker) -> bool {
        self.current().player_sees_enemy
    }

    fn sample(&self, _: &AgentState, _: &PlayerTracker) -> VisionSample {
        let sample = self.current();
        self.cursor.set(self.cursor.get() + 1);
        sample
    }
}

const SEEN_BY_STALKER: VisionSample = VisionSample {
    enemy_sees_player: true,
    player_sees_enemy: false,
};

/// Four floors stacked with stairs both ways between neighbours.
fn building(seed: u64) -> Director {
    let config = SceneConfig {
        seed: Some(seed),
        ..SceneConfig::default()
    };
    let mut director = Director::new(config);
    for floor in 1..4 {
        let (lower, upper) = (format!("Floor{floor}"), format!("Floor{}", floor + 1));
        director
            .register_zone_edge(
                WarpSpec::new(format!("Stairs_{floor}_up"), lower.as_str(), upper.as_str(), Vec2::new(12.0, 0.0))
                    .with_exit(Vec2::new(-12.0, 0.0)),
            )
            .expect("edge should register");
        director
            .register_zone_edge(
                WarpSpec::new(format!("Stairs_{floor}_down"), upper.as_str(), lower.as_str(), Vec2::new(-12.0, 0.0))
                    .with_exit(Vec2::new(12.0, 0.0)),
            )
            .expect("edge should register");
    }
    director
}

fn assert_fully_released(director: &Director, agent: AgentId) {
    let arbiter = director.arbiter();
    assert!(!arbiter.is_resident(agent));
    for edge in arbiter.registry().edges() {
        assert_ne!(arbiter.holder(edge.id()), Some(agent));
        assert!(!arbiter.has_arrived_via(edge.id(), agent));
    }
    for zone in arbiter.registry().zones() {
        assert!(arbiter.residents(zone.as_str()).all(|a| a != agent));
    }
}

#[test]
fn test_duplicate_edge_and_destination_occupancy() {
    let mut arbiter = ReservationArbiter::new();
    for zone in ["A", "B", "C"] {
        arbiter.register_zone(zone);
    }
    let edge = arbiter
        .register_edge(WarpSpec::new("Door_AB", "A", "B", Vec2::ZERO))
        .expect("edge should register");
    let first = AgentId::new();
    let second = AgentId::new();
    arbiter.register_resident(first, "A");
    arbiter.register_resident(second, "A");

    assert!(arbiter.reserve(edge, first));
    assert!(arbiter
        .register_edge(WarpSpec::new("Door_AB", "A", "B", Vec2::ZERO))
        .is_err());
    assert_eq!(arbiter.registry().edges_from("A").len(), 1);

    arbiter.release(edge, first);
    arbiter.clear_destination_membership(first, "B");
    assert_eq!(arbiter.list_available_edges("A", first), vec![edge]);
    assert!(arbiter.list_available_edges("A", second).is_empty());
    assert!(!arbiter.reserve(edge, second));
}

#[test]
fn test_single_sighting_keeps_stalking_until_hide_cycle() {
    let mut director = building(1);
    director.notify_player_zone("Floor1");
    director
        .spawn_agent("Stalker", AgentRole::Stalker, "Floor1", 0.0)
        .expect("stalker should register");

    let probe = ScriptedProbe::new(vec![SEEN_BY_STALKER, VisionSample::NONE]);
    for _ in 0..100 {
        director.tick(0.1, &probe);
        assert_eq!(director.escalation(), EscalationState::Stalk);
    }

    director.notify_player_hiding();
    director.notify_player_unhiding();
    director.tick(0.1, &probe);
    assert_eq!(director.escalation(), EscalationState::Patrol);
}

#[test]
fn test_hide_mid_transit_releases_everything() {
    let mut director = building(2);
    director.notify_player_zone("Floor3");
    let stalker = director
        .spawn_agent("Stalker", AgentRole::Stalker, "Floor1", 0.0)
        .expect("stalker should register");
    let probe = ScriptedProbe::new(vec![SEEN_BY_STALKER]);

    // Walk up one floor, then start toward the next one.
    director.notify_player_zone("Floor2");
    let mut arrived = false;
    for _ in 0..200 {
        director.tick(0.1, &probe);
        if director.agent(stalker).is_some_and(|s| s.zone.as_str() == "Floor2") {
            arrived = true;
            break;
        }
    }
    assert!(arrived);
    let up = director
        .arbiter()
        .registry()
        .edge_by_name("Stairs_1_up")
        .expect("edge exists")
        .id();
    assert!(director.arbiter().has_arrived_via(up, stalker));

    director.notify_player_zone("Floor3");
    let mut walking = false;
    for _ in 0..200 {
        director.tick(0.01, &probe);
        if director.agent(stalker).is_some_and(AgentState::is_in_transit) {
            walking = true;
            break;
        }
    }
    assert!(walking);

    director.notify_player_hiding();

    assert_fully_released(&director, stalker);
    let state = director.agent(stalker).expect("stalker exists");
    assert!(!state.active);
    assert!(!state.is_in_transit());
}

#[test]
fn test_unhide_restores_single_residency() {
    let mut director = building(3);
    director.notify_player_zone("Floor2");
    let stalker = director
        .spawn_agent("Stalker", AgentRole::Stalker, "Floor4", 0.0)
        .expect("stalker should register");
    let probe = ScriptedProbe::new(vec![VisionSample {
        enemy_sees_player: false,
        player_sees_enemy: true,
    }]);
    director.tick(0.1, &probe);
    assert_eq!(director.escalation(), EscalationState::Hunt);

    director.notify_player_hiding();
    assert_fully_released(&director, stalker);

    director.notify_player_unhiding();
    let arbiter = director.arbiter();
    let homes: Vec<&ZoneId> = arbiter
        .registry()
        .zones()
        .iter()
        .filter(|zone| arbiter.residents(zone.as_str()).any(|a| a == stalker))
        .collect();
    assert_eq!(homes.len(), 1);
    assert_eq!(director.escalation(), EscalationState::Patrol);

    let events = director.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        SceneEvent::EscalationChanged { to: EscalationState::Patrol, .. }
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        SceneEvent::AgentActivated { agent, .. } if *agent == stalker
    )));
}

#[test]
fn test_guard_absent_while_stalker_aggressive() {
    let mut director = building(4);
    director.notify_player_zone("Floor1");
    director
        .spawn_agent("Stalker", AgentRole::Stalker, "Floor4", 0.0)
        .expect("stalker should register");
    let guard = director
        .spawn_agent("Guard", AgentRole::Guard, "Floor2", 0.0)
        .expect("guard should register");

    let mut script = vec![VisionSample::NONE; 30];
    script.push(SEEN_BY_STALKER);
    let probe = ScriptedProbe::new(script);

    for tick in 0..400 {
        director.tick(0.1, &probe);
        if director.escalation().is_aggressive() {
            let state = director.agent(guard).expect("guard exists");
            assert!(!state.active, "guard active on tick {tick}");
            assert!(!director.arbiter().is_resident(guard));
        }

        if tick == 200 {
            director.notify_player_hiding();
            let guard_state = director.agent(guard).expect("guard exists");
            assert!(guard_state.active);
            assert_ne!(&guard_state.zone, director.player().zone());
            director.notify_player_unhiding();
        }
    }
}

#[test]
fn test_guard_patrols_between_floors() {
    let mut director = building(5);
    director.notify_player_zone("Floor4");
    let guard = director
        .spawn_agent("Guard", AgentRole::Guard, "Floor1", 0.0)
        .expect("guard should register");
    let probe = ScriptedProbe::new(vec![VisionSample::NONE]);

    for _ in 0..600 {
        director.tick(0.1, &probe);
    }

    let events = director.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        SceneEvent::TransitCompleted { agent, .. } if *agent == guard
    )));
    let state = director.agent(guard).expect("guard exists");
    assert_eq!(director.arbiter().zone_of(guard), Some(&state.zone));
}

#[test]
fn test_layout_file_round_trip() {
    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("layout.toml");
    let layout = SceneLayout {
        zones: vec!["Lobby".to_owned()],
        edges: vec![EdgeEntry {
            name: "Elevator".to_owned(),
            from: "Lobby".to_owned(),
            to: "Roof".to_owned(),
            transit_x: 3.0,
            exit_x: None,
        }],
        agents: vec![AgentEntry {
            name: "Guard".to_owned(),
            role: AgentRole::Guard,
            zone: "Roof".to_owned(),
            x: 1.0,
        }],
    };
    let text = toml::to_string(&layout).expect("layout should serialize");
    std::fs::write(&path, text).expect("Failed to write layout");

    let loaded = SceneLayout::load(&path).expect("layout should load");
    assert_eq!(loaded, layout);

    let director = Director::from_layout(SceneConfig::default(), &loaded);
    assert_eq!(director.arbiter().registry().zone_count(), 2);
    assert_eq!(director.arbiter().resident_count("Roof"), 1);
}
