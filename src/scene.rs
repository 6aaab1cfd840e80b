// Scene layout of the tea room

use glam::{Mat4, Vec3};

use crate::config::Features;
use crate::math::Transform;
use crate::state::ProgramState;

/// OBJ files of the loaded models, relative to the resources directory.
pub const MODEL_ASSETS: &[(&str, &str)] = &[
    ("room", "objects/soba_zavrsena/soba_zavrsena.obj"),
    ("table", "objects/sto_iz_blendera/table.obj"),
    (
        "chair",
        "objects/stolica/Lucien_Lilippe_Chaise_Louis_XVI/Chaise_louisXVI_deco2.obj",
    ),
    ("teapot", "objects/teapot/teapot_n_glass.obj"),
    ("cup", "objects/soljica/cup.obj"),
];

pub const PAINTING_DIFFUSE: &str = "textures/difuzna.jpg";
pub const PAINTING_SPECULAR: &str = "textures/spekularna1.jpg";

/// What gets drawn for an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drawable {
    /// A loaded model, keyed as in [`MODEL_ASSETS`].
    Model(&'static str),
    Lamp,
    Painting,
}

/// The frame an object's local transform is applied in. Resolved against
/// the current state every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Room position and room scale.
    Room,
    /// Room position only.
    RoomOrigin,
    /// Position of the point light.
    PointLight,
    /// Room position shifted by the painting offset.
    Painting,
}

impl Anchor {
    pub fn matrix(self, state: &ProgramState) -> Mat4 {
        match self {
            Anchor::Room => {
                Mat4::from_translation(state.room_position)
                    * Mat4::from_scale(Vec3::splat(state.room_scale))
            }
            Anchor::RoomOrigin => Mat4::from_translation(state.room_position),
            Anchor::PointLight => Mat4::from_translation(state.point_light.position),
            Anchor::Painting => {
                let offset = state.painting_offset;
                Mat4::from_translation(state.room_position + Vec3::new(0.0, offset.y, offset.x))
            }
        }
    }
}

/// Represents an object within the 3D scene.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: &'static str,
    pub drawable: Drawable,
    pub anchor: Anchor,
    pub transform: Transform,
    pub shininess: f32,
}

impl SceneObject {
    pub fn new(name: &'static str, drawable: Drawable, anchor: Anchor, transform: Transform) -> Self {
        Self {
            name,
            drawable,
            anchor,
            transform,
            shininess: 16.0,
        }
    }

    pub fn with_shininess(mut self, shininess: f32) -> Self {
        self.shininess = shininess;
        self
    }

    pub fn world_matrix(&self, state: &ProgramState) -> Mat4 {
        self.anchor.matrix(state) * self.transform.matrix()
    }
}

/// Every object of the scene in draw order.
#[derive(Debug, Default)]
pub struct Scene {
    pub objects: Vec<SceneObject>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
        }
    }

    /// The furnished tea room. The painting is left out when its feature is off.
    pub fn tea_room(features: &Features) -> Self {
        use Anchor::*;

        let mut scene = Self::new();
        scene.add_object(
            SceneObject::new("room", Drawable::Model("room"), Room, Transform::identity())
                .with_shininess(2.0),
        );
        scene.add_object(SceneObject::new(
            "table",
            Drawable::Model("table"),
            Room,
            Transform::from_translation(Vec3::new(0.0, -0.55, 0.0))
                .with_scale(Vec3::new(0.2, 0.25, 0.2)),
        ));
        scene.add_object(SceneObject::new(
            "chair_right",
            Drawable::Model("chair"),
            RoomOrigin,
            Transform::from_translation(Vec3::new(0.5, 0.0, 0.0))
                .with_yaw_degrees(-25.0)
                .with_uniform_scale(1.5),
        ));
        scene.add_object(SceneObject::new(
            "chair_left",
            Drawable::Model("chair"),
            RoomOrigin,
            Transform::from_translation(Vec3::new(-0.5, 0.0, 0.0))
                .with_yaw_degrees(155.0)
                .with_uniform_scale(1.5),
        ));
        scene.add_object(SceneObject::new(
            "teapot",
            Drawable::Model("teapot"),
            RoomOrigin,
            Transform::from_translation(Vec3::new(-0.65, 0.415, 0.45)),
        ));
        for (name, z) in [("cup_front", 0.58), ("cup_back", -0.58)] {
            scene.add_object(SceneObject::new(
                name,
                Drawable::Model("cup"),
                RoomOrigin,
                Transform::from_translation(Vec3::new(0.0, 1.15, z)).with_uniform_scale(0.5),
            ));
        }
        scene.add_object(SceneObject::new(
            "lamp",
            Drawable::Lamp,
            PointLight,
            Transform::from_scale(Vec3::splat(0.3)),
        ));
        if features.painting {
            scene.add_object(
                SceneObject::new(
                    "painting",
                    Drawable::Painting,
                    Painting,
                    Transform::from_translation(Vec3::new(3.3, 1.8, 0.0))
                        .with_scale(Vec3::new(0.1, 1.1, 1.0)),
                )
                .with_shininess(64.0),
            );
        }
        scene
    }

    pub fn add_object(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    /// Model keys the scene draws, each once.
    pub fn model_keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        for object in &self.objects {
            if let Drawable::Model(key) = object.drawable {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn object<'a>(scene: &'a Scene, name: &str) -> Option<&'a SceneObject> {
        scene.objects.iter().find(|obj| obj.name == name)
    }
    use glam::{Vec2, Vec4Swizzles};

    fn assert_near(actual: Vec3, expected: Vec3) {
        assert!(
            actual.abs_diff_eq(expected, 1e-5),
            "expected {expected}, got {actual}"
        );
    }

    fn origin_of(scene: &Scene, name: &str, state: &ProgramState) -> Vec3 {
        let found = object(scene, name).unwrap();
        (found.world_matrix(state) * Vec3::ZERO.extend(1.0)).xyz()
    }

    #[test]
    fn tea_room_has_every_object() {
        let scene = Scene::tea_room(&Features::default());
        let names: Vec<_> = scene.objects.iter().map(|o| o.name).collect();
        assert_eq!(
            names,
            vec![
                "room",
                "table",
                "chair_right",
                "chair_left",
                "teapot",
                "cup_front",
                "cup_back",
                "lamp",
                "painting"
            ]
        );
        assert_eq!(scene.model_keys(), vec!["room", "table", "chair", "teapot", "cup"]);
        for key in scene.model_keys() {
            assert!(MODEL_ASSETS.iter().any(|(k, _)| *k == key), "no asset for {key}");
        }
        assert_eq!(object(&scene, "room").unwrap().shininess, 2.0);
        assert_eq!(object(&scene, "painting").unwrap().shininess, 64.0);
    }

    #[test]
    fn painting_feature_controls_the_painting() {
        let features = Features {
            painting: false,
            ..Features::default()
        };
        let scene = Scene::tea_room(&features);
        assert!(object(&scene, "painting").is_none());
        assert_eq!(scene.objects.len(), 8);
    }

    #[test]
    fn room_anchor_carries_position_and_scale() {
        let scene = Scene::tea_room(&Features::default());
        let mut state = ProgramState::new();
        state.room_position = Vec3::new(1.0, 0.0, -2.0);
        state.room_scale = 2.0;

        // the table inherits the room scale, the chairs do not
        assert_near(origin_of(&scene, "table", &state), Vec3::new(1.0, -1.1, -2.0));
        assert_near(origin_of(&scene, "chair_right", &state), Vec3::new(1.5, 0.0, -2.0));
        assert_near(origin_of(&scene, "cup_back", &state), Vec3::new(1.0, 1.15, -2.58));

        let table = object(&scene, "table").unwrap().world_matrix(&state);
        assert_near(table.transform_vector3(Vec3::ONE), Vec3::new(0.4, 0.5, 0.4));
    }

    #[test]
    fn chairs_face_each_other() {
        let scene = Scene::tea_room(&Features::default());
        let state = ProgramState::new();
        let facing = |name| {
            let m = object(&scene, name).unwrap().world_matrix(&state);
            m.transform_vector3(Vec3::Z).normalize()
        };
        assert_relative_eq!(facing("chair_right").dot(facing("chair_left")), -1.0, epsilon = 1e-5);
    }

    #[test]
    fn lamp_follows_point_light() {
        let scene = Scene::tea_room(&Features::default());
        let mut state = ProgramState::new();
        state.point_light.position = Vec3::new(0.5, 2.5, -1.0);
        state.room_position = Vec3::new(9.0, 9.0, 9.0);
        assert_near(origin_of(&scene, "lamp", &state), Vec3::new(0.5, 2.5, -1.0));
    }

    #[test]
    fn painting_moves_with_offset() {
        let scene = Scene::tea_room(&Features::default());
        let mut state = ProgramState::new();
        state.room_position = Vec3::new(0.0, 0.1, 0.0);
        state.painting_offset = Vec2::new(-1.0, 0.5);
        assert_near(origin_of(&scene, "painting", &state), Vec3::new(3.3, 2.4, -1.0));
    }
}
