use relay_core::pool::Poolable;

use crate::camera::Camera;
use crate::resources::{ConstantBufferHandle, DepthStencilViewHandle, RenderTargetViewHandle};
use crate::shader::VertexShaderFlags;
use crate::types::Viewport;

use super::{BlendMode, BucketKind, DepthTestMode, DrawOpHandle, PassConfig, PassKind};

/// What an action renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActionKind {
    /// The main camera view, all passes.
    #[default]
    Primary,
    /// Depth only, into one depth target.
    ShadowMap,
    /// Depth only, into the six faces of a cube depth target.
    ShadowCubeMap,
}

/// Lifecycle of an action.
///
/// `Recording` on the producer until `end_action`, `Queued` until the render
/// thread picks the frame up, `Executing` while it draws, `Retired` once the
/// producer reclaimed the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActionState {
    #[default]
    Retired,
    Recording,
    Queued,
    Executing,
}

/// Targets and options of a primary action.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryTargets {
    pub viewport: Viewport,
    /// Empty means the back buffer.
    pub color: Vec<RenderTargetViewHandle>,
    pub depth: Option<DepthStencilViewHandle>,
    pub clear_color: Option<[f32; 4]>,
    /// Lay down depth before the opaque pass. Needs `depth`.
    pub z_prepass: bool,
    /// Enable the editor overlay pass.
    pub editor: bool,
}

impl PrimaryTargets {
    /// Back buffer with a black clear and no depth target.
    pub fn back_buffer(viewport: Viewport) -> Self {
        Self {
            viewport,
            color: Vec::new(),
            depth: None,
            clear_color: Some([0.0, 0.0, 0.0, 1.0]),
            z_prepass: false,
            editor: false,
        }
    }

    pub fn with_depth(mut self, depth: DepthStencilViewHandle) -> Self {
        self.depth = Some(depth);
        self
    }
}

/// One complete render submission: a camera, the pass table and the draw-op buckets.
#[derive(Debug, Clone, Default)]
pub struct Action {
    pub kind: ActionKind,
    pub state: ActionState,
    pub camera: Camera,
    pub passes: [PassConfig; PassKind::COUNT],
    pub buckets: [Vec<DrawOpHandle>; BucketKind::COUNT],
    /// Temp constant buffer holding the camera constants.
    pub constants: Option<ConstantBufferHandle>,
}

impl Action {
    pub fn pass(&self, kind: PassKind) -> &PassConfig {
        &self.passes[kind.index()]
    }

    pub fn bucket(&self, kind: BucketKind) -> &[DrawOpHandle] {
        &self.buckets[kind.index()]
    }

    /// Passes that will run, in execution order.
    pub fn enabled_passes(&self) -> impl Iterator<Item = PassKind> + '_ {
        PassKind::ALL
            .into_iter()
            .filter(|kind| self.passes[kind.index()].enabled)
    }

    fn begin(&mut self, kind: ActionKind, camera: Camera, constants: ConstantBufferHandle) {
        debug_assert_eq!(self.state, ActionState::Retired);
        self.kind = kind;
        self.state = ActionState::Recording;
        self.camera = camera;
        self.constants = Some(constants);
    }

    pub(crate) fn begin_primary(
        &mut self,
        camera: Camera,
        constants: ConstantBufferHandle,
        targets: &PrimaryTargets,
    ) {
        self.begin(ActionKind::Primary, camera, constants);
        let z_prepass = targets.z_prepass && targets.depth.is_some();
        if targets.z_prepass && !z_prepass {
            log::warn!("Z prepass requested without a depth target; disabled");
        }
        let depth_test = |mode| {
            if targets.depth.is_some() {
                mode
            } else {
                DepthTestMode::Disabled
            }
        };
        let color_pass = |passes: &mut [PassConfig; PassKind::COUNT], kind: PassKind| {
            let pass = &mut passes[kind.index()];
            pass.enabled = true;
            pass.viewport = targets.viewport;
            pass.color_targets.extend_from_slice(&targets.color);
            pass.depth_stencil = targets.depth;
        };

        self.passes[PassKind::Compute.index()].enabled = true;

        if z_prepass {
            let pass = &mut self.passes[PassKind::ZPrepass.index()];
            pass.enabled = true;
            pass.viewport = targets.viewport;
            pass.depth_stencil = targets.depth;
            pass.depth_test = DepthTestMode::Less;
            pass.depth_write = true;
            pass.clear_depth = Some(1.0);
            pass.shader_flags = VertexShaderFlags::DEPTH_ONLY;
        }

        for kind in [
            PassKind::Opaque,
            PassKind::Decal,
            PassKind::Sky,
            PassKind::Alpha,
            PassKind::Ui,
        ] {
            color_pass(&mut self.passes, kind);
        }
        if targets.editor {
            color_pass(&mut self.passes, PassKind::Editor);
        }

        let opaque = &mut self.passes[PassKind::Opaque.index()];
        opaque.clear_color = targets.clear_color;
        if z_prepass {
            opaque.depth_test = DepthTestMode::Equal;
        } else {
            opaque.depth_test = depth_test(DepthTestMode::Less);
            opaque.depth_write = targets.depth.is_some();
            opaque.clear_depth = targets.depth.map(|_| 1.0);
        }

        let decal = &mut self.passes[PassKind::Decal.index()];
        decal.depth_test = depth_test(DepthTestMode::LessEqual);
        decal.blend = BlendMode::Alpha;

        self.passes[PassKind::Sky.index()].depth_test = depth_test(DepthTestMode::LessEqual);

        let alpha = &mut self.passes[PassKind::Alpha.index()];
        alpha.depth_test = depth_test(DepthTestMode::Less);
        alpha.blend = BlendMode::Alpha;

        let editor = &mut self.passes[PassKind::Editor.index()];
        editor.depth_test = depth_test(DepthTestMode::LessEqual);
        editor.blend = BlendMode::Alpha;

        let ui = &mut self.passes[PassKind::Ui.index()];
        ui.depth_stencil = None;
        ui.blend = BlendMode::Alpha;
    }

    pub(crate) fn begin_shadow(
        &mut self,
        kind: ActionKind,
        camera: Camera,
        constants: ConstantBufferHandle,
        depth: DepthStencilViewHandle,
        viewport: Viewport,
    ) {
        self.begin(kind, camera, constants);
        let mut shader_flags = VertexShaderFlags::DEPTH_ONLY;
        if kind == ActionKind::ShadowCubeMap {
            shader_flags |= VertexShaderFlags::CUBE_MAP_CAPTURE;
        }
        let pass = &mut self.passes[PassKind::ZPrepass.index()];
        pass.enabled = true;
        pass.viewport = viewport;
        pass.depth_stencil = Some(depth);
        pass.depth_test = DepthTestMode::Less;
        pass.depth_write = true;
        pass.clear_depth = Some(1.0);
        pass.shader_flags = shader_flags;
    }
}

impl Poolable for Action {
    fn new_empty() -> Self {
        Self::default()
    }

    fn reset(&mut self) {
        self.kind = ActionKind::default();
        self.state = ActionState::Retired;
        self.camera = Camera::default();
        self.constants = None;
        for pass in &mut self.passes {
            pass.reset();
        }
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::pool::{Handle, Pooled};

    fn constants() -> ConstantBufferHandle {
        Handle::from_raw(0, 0)
    }

    fn depth() -> DepthStencilViewHandle {
        Handle::from_raw(3, 0)
    }

    #[test]
    fn test_primary_without_depth() {
        let mut action = Action::default();
        let targets = PrimaryTargets::back_buffer(Viewport::from_dimensions(640, 480));
        action.begin_primary(Camera::default(), constants(), &targets);

        let enabled: Vec<_> = action.enabled_passes().collect();
        assert_eq!(
            enabled,
            [
                PassKind::Compute,
                PassKind::Opaque,
                PassKind::Decal,
                PassKind::Sky,
                PassKind::Alpha,
                PassKind::Ui
            ]
        );
        let opaque = action.pass(PassKind::Opaque);
        assert_eq!(opaque.depth_test, DepthTestMode::Disabled);
        assert_eq!(opaque.clear_color, Some([0.0, 0.0, 0.0, 1.0]));
        assert_eq!(action.state, ActionState::Recording);
    }

    #[test]
    fn test_primary_with_z_prepass() {
        let mut action = Action::default();
        let mut targets = PrimaryTargets::back_buffer(Viewport::from_dimensions(640, 480)).with_depth(depth());
        targets.z_prepass = true;
        targets.editor = true;
        action.begin_primary(Camera::default(), constants(), &targets);

        let prepass = action.pass(PassKind::ZPrepass);
        assert!(prepass.enabled && prepass.is_depth_only());
        assert_eq!(prepass.clear_depth, Some(1.0));
        let opaque = action.pass(PassKind::Opaque);
        assert_eq!(opaque.depth_test, DepthTestMode::Equal);
        assert!(!opaque.depth_write);
        assert_eq!(opaque.clear_depth, None);
        assert!(action.pass(PassKind::Editor).enabled);
        assert_eq!(action.pass(PassKind::Ui).depth_stencil, None);
    }

    #[test]
    fn test_shadow_cube_map_is_single_depth_pass() {
        let mut action = Action::default();
        action.begin_shadow(
            ActionKind::ShadowCubeMap,
            Camera::default(),
            constants(),
            depth(),
            Viewport::from_dimensions(512, 512),
        );
        assert_eq!(action.enabled_passes().collect::<Vec<_>>(), [PassKind::ZPrepass]);
        assert_eq!(
            action.pass(PassKind::ZPrepass).shader_flags,
            VertexShaderFlags::DEPTH_ONLY | VertexShaderFlags::CUBE_MAP_CAPTURE
        );
    }

    #[test]
    fn test_release_resets_and_keeps_capacity() {
        let mut slot: Pooled<Action> = Pooled::default();
        let action = slot.activate();
        let targets = PrimaryTargets::back_buffer(Viewport::from_dimensions(8, 8));
        action.begin_primary(Camera::default(), constants(), &targets);
        action.buckets[BucketKind::Opaque.index()].extend((0..32).map(|i| Handle::from_raw(i, 0)));

        slot.release();
        let action = slot.activate();
        assert_eq!(action.state, ActionState::Retired);
        assert!(action.enabled_passes().next().is_none());
        assert!(action.bucket(BucketKind::Opaque).is_empty());
        assert!(action.buckets[BucketKind::Opaque.index()].capacity() >= 32);
    }
}
