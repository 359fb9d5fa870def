//! Skeletal animation component
//!
//! Each tick the component advances its [`AnimationController`] and writes the
//! sampled joint poses into the owner's skeleton. The skeleton is found by
//! name: the owner must have a child called [`CONTROL_GROUP_NAME`] whose child
//! [`SKELETON_ROOT_NAME`] roots the bone hierarchy. Every bone whose entity
//! name matches a joint name in the animation data receives that joint's
//! local position and rotation; bones without a matching joint keep their
//! transform.

use crate::components::ComponentType;
use crate::foundation::math::{Quat, Vec3};
use crate::scene::{EntityKey, Scene};
use std::fmt;

/// Name of the owner's child that groups animation controls
pub const CONTROL_GROUP_NAME: &str = "Ctrl_Grp";

/// Name of the skeleton root under the control group
pub const SKELETON_ROOT_NAME: &str = "Root";

/// Source of animated joint transforms.
///
/// Implemented outside the scene core by whatever plays back imported clips.
pub trait AnimationController: Send + Sync {
    /// Local pose of a joint, or `None` if the clip has no such joint
    fn get_transform(&self, joint_name: &str) -> Option<(Vec3, Quat)>;

    /// Begin playback
    fn play(&mut self);

    /// Stop playback and rewind
    fn stop(&mut self);

    /// Advance playback by `delta_time` seconds of simulation time
    fn update(&mut self, delta_time: f32);

    /// Clone into a new box, used when entities are duplicated
    fn clone_box(&self) -> Box<dyn AnimationController>;
}

/// One bone's sampled pose, ready to be written into its transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointPose {
    /// Bone entity
    pub entity: EntityKey,
    /// Local position
    pub position: Vec3,
    /// Local rotation
    pub rotation: Quat,
}

/// Drives a named skeleton under the owner from an animation controller
pub struct AnimationComponent {
    controller: Box<dyn AnimationController>,
}

impl AnimationComponent {
    /// The controller is required up front; there is no controller-less state.
    pub fn new(controller: Box<dyn AnimationController>) -> Self {
        Self { controller }
    }

    /// Underlying controller
    pub fn controller(&self) -> &dyn AnimationController {
        self.controller.as_ref()
    }

    /// Mutable access to the underlying controller
    pub fn controller_mut(&mut self) -> &mut dyn AnimationController {
        self.controller.as_mut()
    }

    pub(crate) fn update(&mut self, delta_time: f32) {
        self.controller.update(delta_time);
    }

    pub(crate) fn on_play(&mut self) {
        self.controller.play();
    }

    pub(crate) fn on_stop(&mut self) {
        self.controller.stop();
    }

    /// Sample poses for every bone under `owner`'s skeleton root.
    ///
    /// Walks the skeleton iteratively in pre-order.
    pub fn sample_pose(&self, scene: &Scene, owner: EntityKey) -> Vec<JointPose> {
        let mut poses = Vec::new();
        let Some(owner_object) = scene.game_object(owner) else {
            return poses;
        };

        let skeleton_roots = owner_object
            .children()
            .iter()
            .filter_map(|&key| scene.game_object(key).map(|object| (key, object)))
            .filter(|(_, object)| object.name() == CONTROL_GROUP_NAME)
            .flat_map(|(_, group)| group.children().iter().copied())
            .filter(|&key| scene.game_object(key).is_some_and(|object| object.name() == SKELETON_ROOT_NAME));

        let mut stack: Vec<EntityKey> = skeleton_roots.collect();
        stack.reverse();

        while let Some(key) = stack.pop() {
            let Some(bone) = scene.game_object(key) else {
                continue;
            };

            if bone.has_component(ComponentType::Transform) {
                if let Some((position, rotation)) = self.controller.get_transform(bone.name()) {
                    poses.push(JointPose { entity: key, position, rotation });
                }
            }

            stack.extend(bone.children().iter().rev().copied());
        }

        poses
    }
}

impl Clone for AnimationComponent {
    fn clone(&self) -> Self {
        Self {
            controller: self.controller.clone_box(),
        }
    }
}

impl fmt::Debug for AnimationComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationComponent").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Controller that moves every known joint along +X at one unit per second
    #[derive(Debug, Clone, Default)]
    pub struct LinearController {
        pub joints: HashMap<String, Vec3>,
        pub time: f32,
        pub playing: bool,
        pub plays: Arc<AtomicU32>,
    }

    impl LinearController {
        pub fn with_joints(names: &[&str]) -> Self {
            Self {
                joints: names.iter().map(|n| ((*n).to_string(), Vec3::zeros())).collect(),
                ..Default::default()
            }
        }
    }

    impl AnimationController for LinearController {
        fn get_transform(&self, joint_name: &str) -> Option<(Vec3, Quat)> {
            self.joints
                .get(joint_name)
                .map(|base| (base + Vec3::new(self.time, 0.0, 0.0), Quat::identity()))
        }

        fn play(&mut self) {
            self.playing = true;
            self.plays.fetch_add(1, Ordering::SeqCst);
        }

        fn stop(&mut self) {
            self.playing = false;
            self.time = 0.0;
        }

        fn update(&mut self, delta_time: f32) {
            self.time += delta_time;
        }

        fn clone_box(&self) -> Box<dyn AnimationController> {
            Box::new(self.clone())
        }
    }
}
