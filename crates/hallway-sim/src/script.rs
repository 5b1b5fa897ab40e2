//! Scripted player timeline.

use glam::Vec2;
use hallway_ai::Director;
use tracing::info;

/// One thing the player does.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerAction {
    /// Walk into a zone
    Enter(&'static str),
    /// Stand at a horizontal position
    MoveTo(f32),
    /// Duck into a hiding spot
    Hide,
    /// Come out of hiding
    Unhide,
}

/// Player actions keyed by tick.
#[derive(Debug, Clone, Default)]
pub struct PlayerScript {
    steps: Vec<(u32, PlayerAction)>,
}

impl PlayerScript {
    /// Adds an action at `tick`.
    #[must_use]
    pub fn at(mut self, tick: u32, action: PlayerAction) -> Self {
        self.steps.push((tick, action));
        self
    }

    /// The demo run: wander upstairs into the stalker, hide, come out.
    #[must_use]
    pub fn demo() -> Self {
        Self::default()
            .at(0, PlayerAction::Enter("Floor1"))
            .at(0, PlayerAction::MoveTo(0.0))
            .at(150, PlayerAction::Enter("Floor2"))
            .at(300, PlayerAction::Enter("Floor3"))
            .at(300, PlayerAction::MoveTo(-4.0))
            .at(450, PlayerAction::Hide)
            .at(600, PlayerAction::Unhide)
            .at(620, PlayerAction::Enter("Floor1"))
    }

    /// Applies every action scheduled for `tick`.
    pub fn apply(&self, tick: u32, director: &mut Director) {
        for (_, action) in self.steps.iter().filter(|(at, _)| *at == tick) {
            info!("tick {tick}: player {action:?}");
            match action {
                PlayerAction::Enter(zone) => director.notify_player_zone(*zone),
                PlayerAction::MoveTo(x) => director.notify_player_position(Vec2::new(*x, 0.0)),
                PlayerAction::Hide => director.notify_player_hiding(),
                PlayerAction::Unhide => director.notify_player_unhiding(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hallway_ai::SceneConfig;

    #[test]
    fn test_script_applies_actions_on_their_tick() {
        let mut director = Director::new(SceneConfig::default());
        let script = PlayerScript::default()
            .at(2, PlayerAction::Enter("Floor2"))
            .at(3, PlayerAction::Hide);

        script.apply(1, &mut director);
        assert_eq!(director.player().zone().as_str(), "Floor1");

        script.apply(2, &mut director);
        assert_eq!(director.player().zone().as_str(), "Floor2");
        assert!(!director.player().is_hiding());

        script.apply(3, &mut director);
        assert!(director.player().is_hiding());
    }
}
