use serde::{Deserialize, Serialize};

/// Closed set of sprite variants. Rules that depend on "what kind of thing is
/// this" compare these tags by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpriteKind {
    Camera,
    Player,
    Monster,
    Projectile,
    Particles,
    Scenery,
    Barrier,
    Door,
    Statue,
    Picture,
    Panel,
    Pickup,
}

impl SpriteKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Player => "player",
            Self::Monster => "monster",
            Self::Projectile => "projectile",
            Self::Particles => "particles",
            Self::Scenery => "scenery",
            Self::Barrier => "barrier",
            Self::Door => "door",
            Self::Statue => "statue",
            Self::Picture => "picture",
            Self::Panel => "panel",
            Self::Pickup => "pickup",
        }
    }
}
