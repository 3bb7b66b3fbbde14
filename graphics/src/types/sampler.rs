//! Sampler states bound per texture slot.

/// Fixed sampler presets a draw-op can select per texture slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SamplerState {
    /// Trilinear filtering, repeat addressing.
    #[default]
    LinearWrap,
    /// Trilinear filtering, clamp to edge.
    LinearClamp,
    /// Nearest filtering, repeat addressing.
    PointWrap,
    /// Nearest filtering, clamp to edge.
    PointClamp,
    /// Anisotropic filtering, repeat addressing.
    AnisotropicWrap,
    /// Depth comparison, used to sample shadow maps.
    ShadowCompare,
}
