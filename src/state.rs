//! Mutable viewer state shared by input handling, the debug panel and the
//! render loop.
//!
//! The state file is plain text, one value per line, in a fixed order:
//! clear color r/g/b, panel flag (`0`/`1`), camera position x/y/z and camera
//! front x/y/z. Files without the panel flag (nine values) are accepted too.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use glam::{Vec2, Vec3};

use crate::camera::Camera;
use crate::config::Features;
use crate::error::{ViewerError, ViewerResult};
use crate::lights::{DirectionalLight, PointLight, SpotLight};

/// Axis-aligned box the camera must stay inside.
pub const CAMERA_MIN: Vec3 = Vec3::new(-2.9, 0.25, -2.8);
pub const CAMERA_MAX: Vec3 = Vec3::new(3.1, 2.91, 2.3);

/// Painting offset limits, `x` horizontal and `y` vertical.
pub const PAINTING_MIN: Vec2 = Vec2::new(-2.48, -1.23);
pub const PAINTING_MAX: Vec2 = Vec2::new(2.485, 0.77);

const VALUES_WITHOUT_FLAG: usize = 9;
const VALUES_WITH_FLAG: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct ProgramState {
    pub clear_color: Vec3,
    pub camera: Camera,
    pub ui_visible: bool,
    pub camera_mouse_enabled: bool,
    pub room_position: Vec3,
    pub room_scale: f32,
    pub point_light: PointLight,
    pub spot_light: SpotLight,
    pub dir_light: DirectionalLight,
    /// Painting nudge: `x` along the wall, `y` up.
    pub painting_offset: Vec2,
    pub spot_light_enabled: bool,
    pub blur_enabled: bool,
}

impl ProgramState {
    pub fn new() -> Self {
        Self {
            clear_color: Vec3::ZERO,
            camera: Camera::new(Vec3::ZERO),
            ui_visible: false,
            camera_mouse_enabled: true,
            room_position: Vec3::ZERO,
            room_scale: 1.0,
            point_light: PointLight::default(),
            spot_light: SpotLight::default(),
            dir_light: DirectionalLight::default(),
            painting_offset: Vec2::ZERO,
            spot_light_enabled: false,
            blur_enabled: false,
        }
    }

    /// Keeps the camera inside the room and the painting on its wall.
    pub fn clamp_to_bounds(&mut self) {
        self.camera.position = self.camera.position.clamp(CAMERA_MIN, CAMERA_MAX);
        self.painting_offset = self.painting_offset.clamp(PAINTING_MIN, PAINTING_MAX);
    }

    /// Shows or hides the debug panel. Mouse look is active only while the
    /// panel is hidden.
    pub fn set_panel_visible(&mut self, visible: bool) {
        self.ui_visible = visible;
        self.camera_mouse_enabled = !visible;
    }

    /// Clears toggles whose feature is switched off, including a panel flag
    /// restored from the state file.
    pub fn restrict_to(&mut self, features: &Features) {
        if !features.debug_panel {
            self.set_panel_visible(false);
        }
        self.spot_light_enabled &= features.spotlight;
        self.blur_enabled &= features.blur;
    }

    /// Spot light follows the camera.
    pub fn attach_spot_light_to_camera(&mut self) {
        self.spot_light.position = self.camera.position;
        self.spot_light.direction = self.camera.front;
    }

    pub fn write_to<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        let c = self.clear_color;
        let p = self.camera.position;
        let f = self.camera.front;
        writeln!(out, "{}\n{}\n{}", c.x, c.y, c.z)?;
        writeln!(out, "{}", u8::from(self.ui_visible))?;
        writeln!(out, "{}\n{}\n{}", p.x, p.y, p.z)?;
        writeln!(out, "{}\n{}\n{}", f.x, f.y, f.z)?;
        out.flush()
    }

    /// Overwrites the persisted fields with values read from `input`.
    pub fn read_from<R: BufRead>(&mut self, input: R) -> ViewerResult<()> {
        let mut tokens = Vec::new();
        for line in input.lines() {
            let line = line.map_err(|e| ViewerError::StateFile(e.to_string()))?;
            tokens.extend(line.split_whitespace().map(str::to_owned));
        }

        let has_flag = match tokens.len() {
            VALUES_WITH_FLAG => true,
            VALUES_WITHOUT_FLAG => false,
            n => {
                return Err(ViewerError::StateFile(format!(
                    "expected {VALUES_WITHOUT_FLAG} or {VALUES_WITH_FLAG} values, found {n}"
                )))
            }
        };

        let mut values = tokens.iter().enumerate();
        let mut next_float = || -> ViewerResult<f32> {
            let (index, token) = values
                .next()
                .ok_or_else(|| ViewerError::StateFile("unexpected end of file".into()))?;
            token.parse::<f32>().map_err(|e| {
                ViewerError::StateFile(format!("value {} (`{token}`): {e}", index + 1))
            })
        };

        let clear_color = Vec3::new(next_float()?, next_float()?, next_float()?);
        let ui_visible = if has_flag {
            Some(next_float()? != 0.0)
        } else {
            None
        };
        let position = Vec3::new(next_float()?, next_float()?, next_float()?);
        let front = Vec3::new(next_float()?, next_float()?, next_float()?);

        self.clear_color = clear_color;
        if let Some(visible) = ui_visible {
            self.set_panel_visible(visible);
        }
        self.camera.position = position;
        self.camera.set_front(front);
        Ok(())
    }

    pub fn save(&self, path: &Path) -> ViewerResult<()> {
        let file = fs::File::create(path).map_err(|e| ViewerError::io(path, e))?;
        self.write_to(std::io::BufWriter::new(file))
            .map_err(|e| ViewerError::io(path, e))
    }

    /// Returns `Ok(false)` when there is no state file yet.
    pub fn load(&mut self, path: &Path) -> ViewerResult<bool> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(ViewerError::io(path, e)),
        };
        self.read_from(BufReader::new(file))?;
        Ok(true)
    }
}

impl Default for ProgramState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sweep(min: f32, max: f32) -> impl Iterator<Item = f32> {
        let span = max - min;
        (0..=200).map(move |i| min - span + span * 3.0 * (i as f32 / 200.0))
    }

    #[test]
    fn camera_stays_inside_room() {
        let mut state = ProgramState::new();
        for x in sweep(-2.9, 3.1) {
            for (y, z) in sweep(0.25, 2.91).zip(sweep(-2.8, 2.3)) {
                state.camera.position = Vec3::new(x, y, z);
                state.clamp_to_bounds();
                let p = state.camera.position;
                assert!((-2.9..=3.1).contains(&p.x), "x = {}", p.x);
                assert!((0.25..=2.91).contains(&p.y), "y = {}", p.y);
                assert!((-2.8..=2.3).contains(&p.z), "z = {}", p.z);
            }
        }
    }

    #[test]
    fn clamping_keeps_in_range_positions() {
        let mut state = ProgramState::new();
        state.camera.position = Vec3::new(1.0, 1.5, -1.0);
        state.clamp_to_bounds();
        assert_eq!(state.camera.position, Vec3::new(1.0, 1.5, -1.0));

        // the default origin sits below the floor limit
        let mut state = ProgramState::new();
        state.clamp_to_bounds();
        assert_eq!(state.camera.position, Vec3::new(0.0, 0.25, 0.0));
    }

    #[test]
    fn painting_stays_on_wall() {
        let mut state = ProgramState::new();
        for vertical in sweep(-1.23, 0.77) {
            for horizontal in sweep(-2.48, 2.485) {
                state.painting_offset = Vec2::new(horizontal, vertical);
                state.clamp_to_bounds();
                let o = state.painting_offset;
                assert!((-1.23..=0.77).contains(&o.y), "vertical = {}", o.y);
                assert!((-2.48..=2.485).contains(&o.x), "horizontal = {}", o.x);
            }
        }
    }

    #[test]
    fn state_file_round_trips_bit_for_bit() {
        let mut state = ProgramState::new();
        state.clear_color = Vec3::new(0.1, 0.2 / 3.0, 1.0e-7);
        state.camera.position = Vec3::new(-2.123_456_7, 0.333_333_34, 2.299_999_9);
        state.camera.set_front(Vec3::new(0.3, -0.2, -0.9).normalize());
        state.set_panel_visible(true);

        let mut buf = Vec::new();
        state.write_to(&mut buf).unwrap();
        assert_eq!(String::from_utf8_lossy(&buf).lines().count(), VALUES_WITH_FLAG);

        let mut restored = ProgramState::new();
        restored.read_from(buf.as_slice()).unwrap();

        let bits = |v: Vec3| v.to_array().map(f32::to_bits);
        assert_eq!(bits(restored.clear_color), bits(state.clear_color));
        assert_eq!(bits(restored.camera.position), bits(state.camera.position));
        assert_eq!(bits(restored.camera.front), bits(state.camera.front));
        assert!(restored.ui_visible);
        assert!(!restored.camera_mouse_enabled);
    }

    #[test]
    fn reads_files_without_panel_flag() {
        let text = "0.2\n0.3\n0.4\n1\n1.5\n-1\n0\n0\n-1\n";
        let mut state = ProgramState::new();
        state.read_from(text.as_bytes()).unwrap();
        assert_eq!(state.clear_color, Vec3::new(0.2, 0.3, 0.4));
        assert_eq!(state.camera.position, Vec3::new(1.0, 1.5, -1.0));
        assert_eq!(state.camera.front, Vec3::new(0.0, 0.0, -1.0));
        assert!(!state.ui_visible);
    }

    #[test]
    fn malformed_files_leave_state_untouched() {
        let mut state = ProgramState::new();
        let before = state.clone();

        assert!(matches!(
            state.read_from("1\n2\n3\n".as_bytes()),
            Err(ViewerError::StateFile(_))
        ));
        assert!(matches!(
            state.read_from("0\n0\n0\n0\nnan-ish\n0\n0\n0\n0\n-1\n".as_bytes()),
            Err(ViewerError::StateFile(_))
        ));
        assert_eq!(state, before);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let path = std::env::temp_dir().join("tearoom-3d-missing-state-file.txt");
        let _ = fs::remove_file(&path);
        let mut state = ProgramState::new();
        assert!(!state.load(&path).unwrap());
    }

    #[test]
    fn save_then_load_through_filesystem() {
        let path = std::env::temp_dir()
            .join(format!("tearoom-3d-state-{}.txt", std::process::id()));
        let mut state = ProgramState::new();
        state.clear_color = Vec3::new(0.5, 0.25, 0.125);
        state.camera.position = Vec3::new(1.0, 2.0, -2.0);
        state.save(&path).unwrap();

        let mut restored = ProgramState::new();
        assert!(restored.load(&path).unwrap());
        assert_eq!(restored.clear_color, state.clear_color);
        assert_eq!(restored.camera.position, state.camera.position);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn restored_panel_flag_is_dropped_without_the_panel() {
        let text = "0\n0\n0\n1\n1\n1.5\n-1\n0\n0\n-1\n";
        let mut state = ProgramState::new();
        state.read_from(text.as_bytes()).unwrap();
        assert!(state.ui_visible && !state.camera_mouse_enabled);

        state.restrict_to(&Features {
            debug_panel: false,
            ..Features::default()
        });
        assert!(!state.ui_visible);
        assert!(state.camera_mouse_enabled);
    }

    #[test]
    fn restricting_keeps_enabled_features() {
        let mut state = ProgramState::new();
        state.set_panel_visible(true);
        state.spot_light_enabled = true;
        state.blur_enabled = true;

        state.restrict_to(&Features::default());
        assert!(state.ui_visible && state.spot_light_enabled && state.blur_enabled);

        state.restrict_to(&Features {
            spotlight: false,
            blur: false,
            ..Features::default()
        });
        assert!(state.ui_visible);
        assert!(!state.spot_light_enabled && !state.blur_enabled);
    }

    #[test]
    fn panel_visibility_controls_mouse_look() {
        let mut state = ProgramState::new();
        assert!(state.camera_mouse_enabled);
        state.set_panel_visible(true);
        assert!(state.ui_visible && !state.camera_mouse_enabled);
        state.set_panel_visible(false);
        assert!(!state.ui_visible && state.camera_mouse_enabled);
    }
}
