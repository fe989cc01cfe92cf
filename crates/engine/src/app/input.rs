use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    Fire,
    Left,
    Right,
    Up,
    Down,
    Quit,
}

impl InputAction {
    const ALL: [InputAction; 6] = [
        InputAction::Fire,
        InputAction::Left,
        InputAction::Right,
        InputAction::Up,
        InputAction::Down,
        InputAction::Quit,
    ];

    fn bit(self) -> u8 {
        let position = Self::ALL
            .iter()
            .position(|action| *action == self)
            .unwrap_or_default();
        1 << position
    }

    fn for_key(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::KeyW | KeyCode::ArrowUp => Some(InputAction::Up),
            KeyCode::KeyS | KeyCode::ArrowDown => Some(InputAction::Down),
            KeyCode::KeyA | KeyCode::ArrowLeft => Some(InputAction::Left),
            KeyCode::KeyD | KeyCode::ArrowRight => Some(InputAction::Right),
            KeyCode::Space | KeyCode::Enter => Some(InputAction::Fire),
            KeyCode::Escape => Some(InputAction::Quit),
            _ => None,
        }
    }
}

/// Input sampled once at the start of a tick. Held actions are levels; save
/// and load are single-tick press edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    held: u8,
    save_pressed: bool,
    load_pressed: bool,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn quit_requested(&self) -> bool {
        self.is_down(InputAction::Quit)
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.held & action.bit() != 0
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        if is_down {
            self.held |= action.bit();
        } else {
            self.held &= !action.bit();
        }
        self
    }

    pub fn with_save_pressed(mut self, save_pressed: bool) -> Self {
        self.save_pressed = save_pressed;
        self
    }

    pub fn with_load_pressed(mut self, load_pressed: bool) -> Self {
        self.load_pressed = load_pressed;
        self
    }

    pub fn save_pressed(&self) -> bool {
        self.save_pressed
    }

    pub fn load_pressed(&self) -> bool {
        self.load_pressed
    }
}

/// Press detector for a one-shot key: reports a press once, and not again
/// until the key has been released.
#[derive(Debug, Default, Clone, Copy)]
struct KeyEdge {
    down: bool,
    pending: bool,
}

impl KeyEdge {
    fn update(&mut self, state: ElementState) {
        let pressed = state == ElementState::Pressed;
        if pressed && !self.down {
            self.pending = true;
        }
        self.down = pressed;
    }

    fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}

/// Folds window key events into per-tick snapshots.
#[derive(Debug, Default)]
pub(crate) struct InputCollector {
    held: InputSnapshot,
    quit: bool,
    save: KeyEdge,
    load: KeyEdge,
}

impl InputCollector {
    pub(crate) fn request_quit(&mut self) {
        self.quit = true;
    }

    pub(crate) fn quit_requested(&self) -> bool {
        self.quit
    }

    pub(crate) fn handle_key_event(&mut self, event: &KeyEvent) {
        if let PhysicalKey::Code(code) = event.physical_key {
            self.handle_key(code, event.state);
        }
    }

    fn handle_key(&mut self, code: KeyCode, state: ElementState) {
        match code {
            KeyCode::F5 => self.save.update(state),
            KeyCode::F9 => self.load.update(state),
            _ => {
                let Some(action) = InputAction::for_key(code) else {
                    return;
                };
                let is_down = state == ElementState::Pressed;
                self.held = self.held.with_action_down(action, is_down);
                if action == InputAction::Quit && is_down {
                    self.request_quit();
                }
            }
        }
    }

    pub(crate) fn snapshot_for_tick(&mut self) -> InputSnapshot {
        self.held
            .with_action_down(InputAction::Quit, self.quit)
            .with_save_pressed(self.save.take())
            .with_load_pressed(self.load.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_independent_actions() {
        let snapshot = InputSnapshot::empty()
            .with_action_down(InputAction::Fire, true)
            .with_action_down(InputAction::Left, true)
            .with_action_down(InputAction::Left, false);
        assert!(snapshot.is_down(InputAction::Fire));
        assert!(!snapshot.is_down(InputAction::Left));
        assert!(!snapshot.quit_requested());
    }

    #[test]
    fn wasd_arrows_and_fire_keys_map_to_actions() {
        let mut input = InputCollector::default();
        input.handle_key(KeyCode::KeyW, ElementState::Pressed);
        input.handle_key(KeyCode::ArrowLeft, ElementState::Pressed);
        input.handle_key(KeyCode::Enter, ElementState::Pressed);
        let snapshot = input.snapshot_for_tick();
        assert!(snapshot.is_down(InputAction::Up));
        assert!(snapshot.is_down(InputAction::Left));
        assert!(snapshot.is_down(InputAction::Fire));
        assert!(!snapshot.is_down(InputAction::Down));
    }

    #[test]
    fn movement_stays_down_until_released() {
        let mut input = InputCollector::default();
        input.handle_key(KeyCode::KeyD, ElementState::Pressed);
        assert!(input.snapshot_for_tick().is_down(InputAction::Right));
        assert!(input.snapshot_for_tick().is_down(InputAction::Right));
        input.handle_key(KeyCode::KeyD, ElementState::Released);
        assert!(!input.snapshot_for_tick().is_down(InputAction::Right));
    }

    #[test]
    fn escape_sticks_as_quit() {
        let mut input = InputCollector::default();
        input.handle_key(KeyCode::Escape, ElementState::Pressed);
        input.handle_key(KeyCode::Escape, ElementState::Released);
        assert!(input.quit_requested());
        assert!(input.snapshot_for_tick().quit_requested());
    }

    #[test]
    fn save_press_is_reported_for_one_tick() {
        let mut input = InputCollector::default();
        input.handle_key(KeyCode::F5, ElementState::Pressed);
        assert!(input.snapshot_for_tick().save_pressed());
        assert!(!input.snapshot_for_tick().save_pressed());
    }

    #[test]
    fn key_repeat_needs_a_release_to_retrigger() {
        let mut input = InputCollector::default();
        input.handle_key(KeyCode::F9, ElementState::Pressed);
        assert!(input.snapshot_for_tick().load_pressed());
        input.handle_key(KeyCode::F9, ElementState::Pressed);
        assert!(!input.snapshot_for_tick().load_pressed());
        input.handle_key(KeyCode::F9, ElementState::Released);
        input.handle_key(KeyCode::F9, ElementState::Pressed);
        let snapshot = input.snapshot_for_tick();
        assert!(snapshot.load_pressed());
        assert!(!snapshot.save_pressed());
    }
}
