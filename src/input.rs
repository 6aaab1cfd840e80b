//! Keyboard and mouse handling.
//!
//! Window events only record what happened; [`InputState::apply`] turns the
//! accumulated input into state changes once per frame.

use std::collections::HashSet;

use glam::Vec2;
use winit::keyboard::KeyCode;

use crate::camera::Movement;
use crate::config::Features;
use crate::state::ProgramState;

/// Painting offset change per frame while an arrow key is held.
pub const PAINTING_STEP: f32 = 0.01;

/// Things the caller has to act on after [`InputState::apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameActions {
    pub exit: bool,
    /// The panel was shown or hidden; cursor capture must follow.
    pub panel_toggled: bool,
}

#[derive(Debug, Default)]
pub struct InputState {
    held: HashSet<KeyCode>,
    mouse_delta: Vec2,
    scroll: f32,
    panel_toggle_pending: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_event(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            // F11 acts on the press, not while held
            if self.held.insert(key) && key == KeyCode::F11 {
                self.panel_toggle_pending = true;
            }
        } else {
            self.held.remove(&key);
        }
    }

    /// Raw pointer motion in device units, `y` pointing down.
    pub fn mouse_motion(&mut self, dx: f64, dy: f64) {
        self.mouse_delta += Vec2::new(dx as f32, dy as f32);
    }

    /// Wheel movement in lines, positive away from the user.
    pub fn scroll(&mut self, lines: f32) {
        self.scroll += lines;
    }

    pub fn is_held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    /// Forgets held keys, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.held.clear();
    }

    /// Applies one frame of input to `state`.
    pub fn apply(&mut self, state: &mut ProgramState, features: &Features, dt: f32) -> FrameActions {
        let mut actions = FrameActions::default();

        if self.is_held(KeyCode::Escape) {
            actions.exit = true;
        }

        if features.spotlight {
            if self.is_held(KeyCode::KeyL) {
                state.spot_light_enabled = true;
            }
            if self.is_held(KeyCode::KeyN) {
                state.spot_light_enabled = false;
            }
        }

        if features.blur {
            if self.is_held(KeyCode::KeyB) {
                state.blur_enabled = true;
            }
            if self.is_held(KeyCode::KeyU) {
                state.blur_enabled = false;
            }
        }

        if features.painting {
            let offset = &mut state.painting_offset;
            if self.is_held(KeyCode::ArrowUp) {
                offset.y += PAINTING_STEP;
            }
            if self.is_held(KeyCode::ArrowDown) {
                offset.y -= PAINTING_STEP;
            }
            if self.is_held(KeyCode::ArrowLeft) {
                offset.x -= PAINTING_STEP;
            }
            if self.is_held(KeyCode::ArrowRight) {
                offset.x += PAINTING_STEP;
            }
        }

        for (key, movement) in [
            (KeyCode::KeyW, Movement::Forward),
            (KeyCode::KeyS, Movement::Backward),
            (KeyCode::KeyA, Movement::Left),
            (KeyCode::KeyD, Movement::Right),
        ] {
            if self.is_held(key) {
                state.camera.process_keyboard(movement, dt);
            }
        }

        if std::mem::take(&mut self.panel_toggle_pending) && features.debug_panel {
            state.set_panel_visible(!state.ui_visible);
            actions.panel_toggled = true;
        }

        let delta = std::mem::take(&mut self.mouse_delta);
        if state.camera_mouse_enabled && delta != Vec2::ZERO {
            // screen y grows downwards, pitch grows upwards
            state.camera.process_mouse_movement(delta.x, -delta.y, true);
        }

        let scroll = std::mem::take(&mut self.scroll);
        if scroll != 0.0 {
            state.camera.process_mouse_scroll(scroll);
        }

        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Vec3;

    fn frame(input: &mut InputState, state: &mut ProgramState) -> FrameActions {
        input.apply(state, &Features::default(), 1.0 / 60.0)
    }

    #[test]
    fn l_and_n_switch_the_spotlight() {
        let mut input = InputState::new();
        let mut state = ProgramState::new();

        input.key_event(KeyCode::KeyL, true);
        frame(&mut input, &mut state);
        assert!(state.spot_light_enabled);

        input.key_event(KeyCode::KeyL, false);
        frame(&mut input, &mut state);
        assert!(state.spot_light_enabled, "releasing L keeps the light on");

        input.key_event(KeyCode::KeyN, true);
        frame(&mut input, &mut state);
        assert!(!state.spot_light_enabled);
    }

    #[test]
    fn b_and_u_switch_blur_only_when_available() {
        let mut input = InputState::new();
        let mut state = ProgramState::new();
        input.key_event(KeyCode::KeyB, true);

        let no_blur = Features {
            blur: false,
            ..Features::default()
        };
        input.apply(&mut state, &no_blur, 0.016);
        assert!(!state.blur_enabled);

        frame(&mut input, &mut state);
        assert!(state.blur_enabled);

        input.key_event(KeyCode::KeyB, false);
        input.key_event(KeyCode::KeyU, true);
        frame(&mut input, &mut state);
        assert!(!state.blur_enabled);
    }

    #[test]
    fn l_does_nothing_without_the_spotlight() {
        let mut input = InputState::new();
        let mut state = ProgramState::new();
        let no_spotlight = Features {
            spotlight: false,
            ..Features::default()
        };

        input.key_event(KeyCode::KeyL, true);
        input.apply(&mut state, &no_spotlight, 0.016);
        assert!(!state.spot_light_enabled);

        state.spot_light_enabled = true;
        input.key_event(KeyCode::KeyL, false);
        input.key_event(KeyCode::KeyN, true);
        input.apply(&mut state, &no_spotlight, 0.016);
        assert!(state.spot_light_enabled, "N is ignored too");
    }

    #[test]
    fn arrows_leave_a_missing_painting_alone() {
        let mut input = InputState::new();
        let mut state = ProgramState::new();
        let no_painting = Features {
            painting: false,
            ..Features::default()
        };
        for key in [
            KeyCode::ArrowUp,
            KeyCode::ArrowDown,
            KeyCode::ArrowLeft,
            KeyCode::ArrowRight,
        ] {
            input.key_event(key, true);
            input.apply(&mut state, &no_painting, 0.016);
            input.key_event(key, false);
        }
        assert_eq!(state.painting_offset, glam::Vec2::ZERO);
    }

    #[test]
    fn mouse_look_works_after_restoring_a_shown_panel_without_the_panel() {
        let text = "0\n0\n0\n1\n1\n1.5\n-1\n0\n0\n-1\n";
        let mut state = ProgramState::new();
        state.read_from(text.as_bytes()).unwrap();
        let features = Features {
            debug_panel: false,
            ..Features::default()
        };
        state.restrict_to(&features);

        let mut input = InputState::new();
        input.key_event(KeyCode::F11, true);
        input.mouse_motion(100.0, 0.0);
        let actions = input.apply(&mut state, &features, 0.016);

        assert!(!actions.panel_toggled);
        assert!(!state.ui_visible && state.camera_mouse_enabled);
        assert_relative_eq!(state.camera.yaw, -80.0, epsilon = 1e-4);
    }

    #[test]
    fn arrows_nudge_the_painting_every_frame() {
        let mut input = InputState::new();
        let mut state = ProgramState::new();
        input.key_event(KeyCode::ArrowUp, true);
        input.key_event(KeyCode::ArrowLeft, true);
        for _ in 0..10 {
            frame(&mut input, &mut state);
        }
        assert_relative_eq!(state.painting_offset.y, 0.1, epsilon = 1e-5);
        assert_relative_eq!(state.painting_offset.x, -0.1, epsilon = 1e-5);
    }

    #[test]
    fn f11_toggles_the_panel_once_per_press() {
        let mut input = InputState::new();
        let mut state = ProgramState::new();

        input.key_event(KeyCode::F11, true);
        // key repeat while held
        input.key_event(KeyCode::F11, true);
        let actions = frame(&mut input, &mut state);
        assert!(actions.panel_toggled);
        assert!(state.ui_visible && !state.camera_mouse_enabled);

        let actions = frame(&mut input, &mut state);
        assert!(!actions.panel_toggled);
        assert!(state.ui_visible);

        input.key_event(KeyCode::F11, false);
        input.key_event(KeyCode::F11, true);
        frame(&mut input, &mut state);
        assert!(!state.ui_visible && state.camera_mouse_enabled);
    }

    #[test]
    fn panel_feature_off_ignores_f11() {
        let mut input = InputState::new();
        let mut state = ProgramState::new();
        let features = Features {
            debug_panel: false,
            ..Features::default()
        };
        input.key_event(KeyCode::F11, true);
        let actions = input.apply(&mut state, &features, 0.016);
        assert!(!actions.panel_toggled);
        assert!(!state.ui_visible);
    }

    #[test]
    fn mouse_look_respects_the_panel() {
        let mut input = InputState::new();
        let mut state = ProgramState::new();

        input.mouse_motion(100.0, 0.0);
        frame(&mut input, &mut state);
        assert_relative_eq!(state.camera.yaw, -80.0, epsilon = 1e-4);

        // moving the mouse up looks up
        input.mouse_motion(0.0, -50.0);
        frame(&mut input, &mut state);
        assert_relative_eq!(state.camera.pitch, 5.0, epsilon = 1e-4);

        state.set_panel_visible(true);
        input.mouse_motion(100.0, 100.0);
        frame(&mut input, &mut state);
        assert_relative_eq!(state.camera.yaw, -80.0, epsilon = 1e-4);

        // the discarded motion does not come back later
        state.set_panel_visible(false);
        frame(&mut input, &mut state);
        assert_relative_eq!(state.camera.yaw, -80.0, epsilon = 1e-4);
    }

    #[test]
    fn wasd_moves_by_speed_times_dt() {
        let mut input = InputState::new();
        let mut state = ProgramState::new();
        input.key_event(KeyCode::KeyW, true);
        input.apply(&mut state, &Features::default(), 0.5);
        assert!(state.camera.position.abs_diff_eq(Vec3::new(0.0, 0.0, -1.25), 1e-5));
    }

    #[test]
    fn scroll_zooms_and_escape_exits() {
        let mut input = InputState::new();
        let mut state = ProgramState::new();
        input.scroll(3.0);
        input.key_event(KeyCode::Escape, true);
        let actions = frame(&mut input, &mut state);
        assert_relative_eq!(state.camera.zoom, 42.0);
        assert!(actions.exit);
    }
}
