//! Scene director: the inbound interface used by the host.
//!
//! One `Director` is created per scene. The host registers zones, warps
//! and agents at load time, forwards player movement and concealment, and
//! calls [`Director::tick`] once per frame. Outbound notifications are
//! collected on the director's [`EventBus`].
//!
//! Per tick the stalker's vision is sampled first. An escalation out of
//! patrol disables every guard; a return to patrol respawns them. Then
//! every active agent acts in registration order:
//! - an escalated stalker in another zone chases through warps,
//! - an escalated stalker in the player's zone keeps its standoff,
//! - everyone else patrols.

use glam::Vec2;
use hallway_common::{AgentError, AgentId, AgentResult, EdgeId, ZoneId, ZoneResult};
use tracing::{debug, error, info, warn};

use crate::agent::{AgentRole, AgentState};
use crate::chase::{FloorChaseCoordinator, ProximityController};
use crate::config::{SceneConfig, SceneLayout};
use crate::events::{EventBus, SceneEvent};
use crate::lifecycle;
use crate::patrol::PatrolController;
use crate::player::PlayerTracker;
use crate::reservation::{ArbiterSnapshot, ReservationArbiter};
use crate::transit::{self, TransitEvent};
use crate::vision::{
    EscalationState, EscalationTransition, VisionEscalation, VisionProbe, VisionSample,
};
use crate::zone::WarpSpec;

/// Coordinates all agents of one scene.
#[derive(Debug)]
pub struct Director {
    config: SceneConfig,
    arbiter: ReservationArbiter,
    /// Agents in registration order
    agents: Vec<AgentState>,
    /// Index of the stalker in `agents`
    stalker: Option<usize>,
    escalation: VisionEscalation,
    player: PlayerTracker,
    chase: FloorChaseCoordinator,
    proximity: ProximityController,
    events: EventBus,
    rng: fastrand::Rng,
}

impl Director {
    /// Creates an empty scene.
    #[must_use]
    pub fn new(mut config: SceneConfig) -> Self {
        config.validate();
        let rng = config.seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
        Self {
            arbiter: ReservationArbiter::new(),
            agents: Vec::new(),
            stalker: None,
            escalation: VisionEscalation::new(),
            player: PlayerTracker::new(config.player_start_zone.as_str()),
            chase: FloorChaseCoordinator::new(config.arrival_epsilon),
            proximity: ProximityController::new(config.proximity_tuning()),
            events: EventBus::new(config.event_capacity),
            rng,
            config,
        }
    }

    /// Creates a scene and registers everything a layout describes.
    ///
    /// Bad entries are logged and skipped.
    #[must_use]
    pub fn from_layout(config: SceneConfig, layout: &SceneLayout) -> Self {
        let mut director = Self::new(config);

        for zone in &layout.zones {
            director.register_zone(zone.as_str());
        }
        for entry in &layout.edges {
            if let Err(e) = director.register_zone_edge(entry.to_spec()) {
                warn!("Skipping warp {}: {e}", entry.name);
            }
        }
        for entry in &layout.agents {
            if let Err(e) = director.spawn_agent(&entry.name, entry.role, entry.zone.as_str(), entry.x) {
                warn!("Skipping agent {}: {e}", entry.name);
            }
        }

        info!(
            "Scene ready: {} zones, {} warps, {} agents",
            director.arbiter.registry().zone_count(),
            director.arbiter.registry().edge_count(),
            director.agents.len()
        );
        director
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Registers a zone with no warps (yet).
    pub fn register_zone(&mut self, zone: impl Into<ZoneId>) -> bool {
        self.arbiter.register_zone(zone)
    }

    /// Registers one physical warp object.
    pub fn register_zone_edge(&mut self, spec: WarpSpec) -> ZoneResult<EdgeId> {
        self.arbiter.register_edge(spec).map_err(|e| {
            error!("Warp registration failed: {e}");
            e
        })
    }

    /// Registers an agent under a host-provided ID.
    ///
    /// Only one stalker may exist. A guard registered while the stalker is
    /// aggressive starts disabled.
    pub fn register_agent(
        &mut self,
        id: AgentId,
        name: &str,
        role: AgentRole,
        zone: impl Into<ZoneId>,
        x: f32,
    ) -> AgentResult<()> {
        if self.agents.iter().any(|a| a.id == id) {
            return Err(AgentError::AlreadyRegistered(id));
        }
        if role == AgentRole::Stalker {
            if let Some(existing) = self.stalker() {
                return Err(AgentError::StalkerTaken(existing.id));
            }
        }

        let zone = zone.into();
        let patrol = PatrolController::new(self.config.patrol_tuning(), x, &mut self.rng);
        let mut agent = AgentState::new(id, name, role, zone.clone(), Vec2::new(x, 0.0), patrol);

        if role == AgentRole::Guard && self.escalation.state().is_aggressive() {
            agent.active = false;
            info!("{name} registered disabled while the stalker is aggressive");
        } else if role == AgentRole::Stalker && self.player.is_hiding() {
            agent.active = false;
            info!("{name} registered disabled while the player is hiding");
        } else {
            self.arbiter.register_resident(id, zone.clone());
            self.events.publish(SceneEvent::AgentActivated { agent: id, zone });
        }

        if role == AgentRole::Stalker {
            self.stalker = Some(self.agents.len());
        }
        self.agents.push(agent);
        Ok(())
    }

    /// Registers an agent under a fresh ID.
    pub fn spawn_agent(
        &mut self,
        name: &str,
        role: AgentRole,
        zone: impl Into<ZoneId>,
        x: f32,
    ) -> AgentResult<AgentId> {
        let id = AgentId::new();
        self.register_agent(id, name, role, zone, x)?;
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Player notifications
    // ------------------------------------------------------------------

    /// The player crossed into a new zone.
    pub fn notify_player_zone(&mut self, zone: impl Into<ZoneId>) {
        self.player.set_zone(zone);
    }

    /// The player moved within its zone.
    pub fn notify_player_position(&mut self, position: Vec2) {
        self.player.set_position(position);
    }

    /// The player hid.
    ///
    /// The stalker is disabled (releasing everything it held) and its
    /// level drops to patrol with the latches kept. Guards respawn, now
    /// only avoiding the player's zone.
    pub fn notify_player_hiding(&mut self) {
        if !self.player.set_hiding(true) {
            return;
        }
        info!("Player is hiding");

        if let Some(index) = self.stalker {
            let stalker = &mut self.agents[index];
            lifecycle::deactivate(&mut self.arbiter, stalker, &self.events);
            if let Some(transition) = self.escalation.update(VisionSample::NONE, true) {
                self.publish_escalation(index, transition);
            }
        }
        self.respawn_guards();
    }

    /// The player stopped hiding.
    ///
    /// The stalker returns at a random zone with its latches reset, then
    /// guards respawn away from both the player and the stalker.
    pub fn notify_player_unhiding(&mut self) {
        if !self.player.set_hiding(false) {
            return;
        }
        info!("Player stopped hiding");

        if let Some(index) = self.stalker {
            let stalker = &mut self.agents[index];
            lifecycle::respawn_stalker(&mut self.arbiter, stalker, &mut self.rng, &self.events);
            let previous = self.escalation.state();
            self.escalation.reset();
            if previous != EscalationState::Patrol {
                self.publish_escalation(
                    index,
                    EscalationTransition {
                        from: previous,
                        to: EscalationState::Patrol,
                    },
                );
            }
        }
        self.respawn_guards();
    }

    // ------------------------------------------------------------------
    // Simulation
    // ------------------------------------------------------------------

    /// Advances the scene by `dt` seconds.
    pub fn tick<V: VisionProbe>(&mut self, dt: f32, vision: &V) {
        self.update_escalation(vision);

        for index in 0..self.agents.len() {
            if !self.agents[index].active {
                continue;
            }
            let escalated = Some(index) == self.stalker && self.escalation.state().is_aggressive();
            if escalated {
                self.run_stalker(index, dt);
            } else {
                let agent = &mut self.agents[index];
                let event = transit::run_patrol(
                    &mut self.arbiter,
                    agent,
                    dt,
                    self.config.arrival_epsilon,
                    &mut self.rng,
                );
                if let Some(event) = event {
                    self.publish_transit(index, event);
                }
            }
        }
    }

    fn update_escalation<V: VisionProbe>(&mut self, vision: &V) {
        let Some(index) = self.stalker else {
            return;
        };
        let stalker = &self.agents[index];
        if !stalker.active {
            return;
        }

        let sample = vision.sample(stalker, &self.player);
        let Some(transition) = self.escalation.update(sample, self.player.is_hiding()) else {
            return;
        };
        self.publish_escalation(index, transition);

        if transition.left_patrol() {
            self.disable_guards();
        } else if transition.returned_to_patrol() {
            self.respawn_guards();
        }
    }

    fn run_stalker(&mut self, index: usize, dt: f32) {
        let state = self.escalation.state();
        let player_zone = self.player.zone().clone();
        let agent = &mut self.agents[index];

        if agent.zone != player_zone {
            let outcome = self
                .chase
                .step(&mut self.arbiter, agent, &player_zone, dt, &mut self.rng);
            debug!("{} chase: {outcome:?}", agent.name);
            if let Some(event) = outcome.transit_event() {
                self.publish_transit(index, event);
            }
            return;
        }

        if agent.is_in_transit() {
            if let Some(edge) = self.arbiter.cancel_reservation(agent.id) {
                debug!("{} abandoned {edge}, player is here", agent.name);
            }
            agent.transit = None;
        }
        agent.position.x = self
            .proximity
            .step(state, agent.position.x, self.player.position().x, dt);
    }

    fn disable_guards(&mut self) {
        for guard in self.agents.iter_mut().filter(|a| a.role == AgentRole::Guard) {
            lifecycle::deactivate(&mut self.arbiter, guard, &self.events);
        }
    }

    fn respawn_guards(&mut self) {
        let stalker_zone = self
            .stalker()
            .filter(|s| s.active)
            .map(|s| s.zone.clone());
        let player_zone = self.player.zone().clone();

        for guard in self.agents.iter_mut().filter(|a| a.role == AgentRole::Guard) {
            lifecycle::respawn_guard(
                &mut self.arbiter,
                guard,
                &player_zone,
                stalker_zone.as_ref(),
                &mut self.rng,
                &self.events,
            );
        }
    }

    fn publish_escalation(&self, index: usize, transition: EscalationTransition) {
        let agent = &self.agents[index];
        info!("{}: {:?} → {:?}", agent.name, transition.from, transition.to);
        self.events.publish(SceneEvent::EscalationChanged {
            agent: agent.id,
            from: transition.from,
            to: transition.to,
        });
    }

    fn publish_transit(&self, index: usize, event: TransitEvent) {
        let agent = self.agents[index].id;
        match event {
            TransitEvent::Reserved(edge) => {
                self.events.publish(SceneEvent::ReservationAcquired { agent, edge });
            },
            TransitEvent::Arrived { edge, zone } => {
                self.events.publish(SceneEvent::TransitCompleted { agent, edge });
                self.events.publish(SceneEvent::AgentArrivedAtZone { agent, zone });
            },
            TransitEvent::Abandoned(_) => {},
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Returns the scene tuning.
    #[must_use]
    pub const fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Returns the reservation arbiter.
    #[must_use]
    pub const fn arbiter(&self) -> &ReservationArbiter {
        &self.arbiter
    }

    /// Returns the tracked player.
    #[must_use]
    pub const fn player(&self) -> &PlayerTracker {
        &self.player
    }

    /// Returns an agent by ID.
    #[must_use]
    pub fn agent(&self, id: AgentId) -> Option<&AgentState> {
        self.agents.iter().find(|a| a.id == id)
    }

    /// Returns all agents in registration order.
    #[must_use]
    pub fn agents(&self) -> &[AgentState] {
        &self.agents
    }

    /// Returns the stalker, if one is registered.
    #[must_use]
    pub fn stalker(&self) -> Option<&AgentState> {
        self.stalker.and_then(|index| self.agents.get(index))
    }

    /// Returns the stalker's escalation level.
    #[must_use]
    pub const fn escalation(&self) -> EscalationState {
        self.escalation.state()
    }

    /// Returns the outbound event bus.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Drains pending outbound events.
    pub fn drain_events(&self) -> Vec<SceneEvent> {
        self.events.drain()
    }

    /// Captures the reservation table.
    #[must_use]
    pub fn snapshot(&self) -> ArbiterSnapshot {
        self.arbiter.snapshot()
    }
}
