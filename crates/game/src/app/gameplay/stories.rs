//! Title screen, levels and game over, and the hand-offs between them.

use std::sync::Arc;

use lattice_engine::{
    AssetError, Environment, InputAction, InputSnapshot, Point3, SpriteKind, SpriteManager, Story,
    StoryEvent, StoryStep,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::actors::Player;
use super::effects::fountain;
use super::level::build_level;
use super::pictures::{AnimPicture, ScorePanel, Stage};
use super::{Assets, COIN_COLLECTED, PLAYER_DIED, PLAYER_FELL};

const STARTING_LIVES: u32 = 3;
const PROMPT_ON_TICKS: i32 = 20;
const PROMPT_OFF_TICKS: i32 = 10;

/// Turns the level-triggered Fire action into presses. Starts out "held" so a
/// press that ended the previous story does not also start the next one.
#[derive(Debug, Clone, Copy)]
struct FireLatch {
    was_down: bool,
}

impl Default for FireLatch {
    fn default() -> Self {
        Self { was_down: true }
    }
}

impl FireLatch {
    fn pressed(&mut self, input: &InputSnapshot) -> bool {
        let down = input.is_down(InputAction::Fire);
        let pressed = down && !self.was_down;
        self.was_down = down;
        pressed
    }
}

fn resumed(events: &[StoryEvent]) -> bool {
    events.contains(&StoryEvent::StoryContinues)
}

fn state_value(story: &'static str, state: &impl Serialize) -> Value {
    match serde_json::to_value(state) {
        Ok(value) => value,
        Err(error) => {
            warn!(story, error = %error, "story_state_not_saved");
            Value::Null
        }
    }
}

fn screen_centre_x(env: &Environment) -> i32 {
    env.screen().width as i32 / 2
}

pub(crate) struct TitleStory {
    assets: Assets,
    built: bool,
    fire: FireLatch,
}

impl TitleStory {
    pub(crate) const NAME: &'static str = "title";

    pub(crate) fn new(assets: Assets) -> Self {
        Self {
            assets,
            built: false,
            fire: FireLatch::default(),
        }
    }

    fn build(&self, sprites: &mut SpriteManager, env: &Environment) -> Result<(), AssetError> {
        let centre = screen_centre_x(env);
        let height = env.screen().height as i32;
        sprites.remove_all_sprites();
        sprites.add(AnimPicture::still(
            (centre, height / 5),
            "title",
            &self.assets,
        )?);
        sprites.add(AnimPicture::new(
            (centre, height * 3 / 4),
            vec![
                Stage::on("press_fire", PROMPT_ON_TICKS),
                Stage::off(PROMPT_OFF_TICKS),
            ],
            &self.assets,
        )?);
        sprites.add(fountain(Point3::new(0.0, 0.0, 0.0)).with_collision_countdown(-1));
        Ok(())
    }
}

impl Story for TitleStory {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn advance(
        &mut self,
        events: &[StoryEvent],
        sprites: &mut SpriteManager,
        env: &mut Environment,
    ) -> StoryStep {
        if resumed(events) {
            self.built = true;
        }
        if !self.built {
            self.build(sprites, env)?;
            self.built = true;
        }

        if self.fire.pressed(env.input()) {
            env.play("start");
            sprites.remove_all_sprites();
            return Ok(Some(Box::new(LevelStory::new(Arc::clone(&self.assets)))));
        }
        Ok(None)
    }
}

/// Progress that survives a save.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub(crate) struct LevelProgress {
    pub(crate) level: u32,
    pub(crate) score: u32,
    pub(crate) lives: u32,
    pub(crate) coins_left: u32,
    pub(crate) spawn: Point3,
}

impl Default for LevelProgress {
    fn default() -> Self {
        Self {
            level: 1,
            score: 0,
            lives: STARTING_LIVES,
            coins_left: 0,
            spawn: Point3::ZERO,
        }
    }
}

pub(crate) struct LevelStory {
    assets: Assets,
    progress: LevelProgress,
    built: bool,
}

impl LevelStory {
    pub(crate) const NAME: &'static str = "level";

    pub(crate) fn new(assets: Assets) -> Self {
        Self::resumed(assets, LevelProgress::default())
    }

    pub(crate) fn resumed(assets: Assets, progress: LevelProgress) -> Self {
        Self {
            assets,
            progress,
            built: false,
        }
    }

    fn build(
        &mut self,
        sprites: &mut SpriteManager,
        env: &mut Environment,
    ) -> Result<(), AssetError> {
        let summary = build_level(self.progress.level, sprites, env, &self.assets)?;
        self.progress.coins_left = summary.coins;
        self.progress.spawn = summary.spawn;
        self.refresh_panel(sprites);
        env.loop_cue("level_theme");
        Ok(())
    }

    fn refresh_panel(&self, sprites: &mut SpriteManager) {
        if let Some(panel) = sprites.find_kind(SpriteKind::Panel) {
            sprites.remove_sprite(panel);
        }
        sprites.add(ScorePanel::new(self.progress.score, self.progress.lives));
    }
}

impl Story for LevelStory {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn advance(
        &mut self,
        events: &[StoryEvent],
        sprites: &mut SpriteManager,
        env: &mut Environment,
    ) -> StoryStep {
        if resumed(events) {
            self.built = true;
        }
        if !self.built {
            self.build(sprites, env)?;
            self.built = true;
            return Ok(None);
        }

        let mut changed = false;
        let mut lost_life = false;
        for event in events {
            if let Some(value) = event.signal_value(COIN_COLLECTED) {
                self.progress.score = self.progress.score.saturating_add(value.max(0) as u32);
                self.progress.coins_left = self.progress.coins_left.saturating_sub(1);
                changed = true;
            } else if event.is_signal(PLAYER_DIED) || event.is_signal(PLAYER_FELL) {
                lost_life = true;
            }
        }

        if lost_life {
            self.progress.lives = self.progress.lives.saturating_sub(1);
            changed = true;
            if self.progress.lives == 0 {
                info!(score = self.progress.score, level = self.progress.level, "game_over");
                sprites.remove_all_sprites();
                return Ok(Some(Box::new(GameOverStory::new(
                    Arc::clone(&self.assets),
                    self.progress.score,
                ))));
            }
            sprites.add(Player::new(self.progress.spawn, &self.assets)?);
        }

        if self.progress.coins_left == 0 {
            self.progress.level += 1;
            info!(level = self.progress.level, score = self.progress.score, "level_cleared");
            env.play("level_clear");
            self.build(sprites, env)?;
            return Ok(None);
        }

        if changed {
            self.refresh_panel(sprites);
        }
        Ok(None)
    }

    fn save_state(&self) -> Value {
        state_value(Self::NAME, &self.progress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct FinalScore {
    pub(crate) score: u32,
}

pub(crate) struct GameOverStory {
    assets: Assets,
    score: u32,
    built: bool,
    fire: FireLatch,
}

impl GameOverStory {
    pub(crate) const NAME: &'static str = "game_over";

    pub(crate) fn new(assets: Assets, score: u32) -> Self {
        Self {
            assets,
            score,
            built: false,
            fire: FireLatch::default(),
        }
    }

    fn build(&self, sprites: &mut SpriteManager, env: &Environment) -> Result<(), AssetError> {
        let centre = screen_centre_x(env);
        let height = env.screen().height as i32;
        sprites.remove_all_sprites();
        sprites.add(AnimPicture::new(
            (centre, height / 3),
            vec![
                Stage::on("game_over", PROMPT_ON_TICKS * 2),
                Stage::off(PROMPT_OFF_TICKS),
            ],
            &self.assets,
        )?);
        sprites.add(AnimPicture::still(
            (centre, height * 3 / 4),
            "press_fire",
            &self.assets,
        )?);
        sprites.add(ScorePanel::new(self.score, 0));
        Ok(())
    }
}

impl Story for GameOverStory {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn advance(
        &mut self,
        events: &[StoryEvent],
        sprites: &mut SpriteManager,
        env: &mut Environment,
    ) -> StoryStep {
        if resumed(events) {
            self.built = true;
        }
        if !self.built {
            self.build(sprites, env)?;
            self.built = true;
        }

        if self.fire.pressed(env.input()) {
            sprites.remove_all_sprites();
            return Ok(Some(Box::new(TitleStory::new(Arc::clone(&self.assets)))));
        }
        Ok(None)
    }

    fn save_state(&self) -> Value {
        state_value(Self::NAME, &FinalScore { score: self.score })
    }
}
