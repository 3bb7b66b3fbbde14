use bitflags::bitflags;

use super::ShaderDefine;

/// Vertex layouts the fixed passes know how to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexShaderType {
    #[default]
    StaticMesh,
    SkinnedMesh,
    Billboard,
    /// Full-screen triangle, no vertex input.
    Fullscreen,
}

impl VertexShaderType {
    pub const ALL: [VertexShaderType; 4] = [
        VertexShaderType::StaticMesh,
        VertexShaderType::SkinnedMesh,
        VertexShaderType::Billboard,
        VertexShaderType::Fullscreen,
    ];

    /// Asset name of the shader source.
    pub fn file_name(self) -> &'static str {
        match self {
            VertexShaderType::StaticMesh => "shaders/static_mesh.vs",
            VertexShaderType::SkinnedMesh => "shaders/skinned_mesh.vs",
            VertexShaderType::Billboard => "shaders/billboard.vs",
            VertexShaderType::Fullscreen => "shaders/fullscreen.vs",
        }
    }
}

bitflags! {
    /// Variant switches a pass applies to every vertex shader it draws with.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VertexShaderFlags: u8 {
        /// Position only, no pixel shader bound.
        const DEPTH_ONLY = 1 << 0;
        /// Render into six cube faces in one pass.
        const CUBE_MAP_CAPTURE = 1 << 1;
    }
}

impl VertexShaderFlags {
    /// Every combination in the default vertex shader table.
    pub const VARIANTS: [VertexShaderFlags; 4] = [
        VertexShaderFlags::empty(),
        VertexShaderFlags::DEPTH_ONLY,
        VertexShaderFlags::CUBE_MAP_CAPTURE,
        VertexShaderFlags::DEPTH_ONLY.union(VertexShaderFlags::CUBE_MAP_CAPTURE),
    ];

    /// Preprocessor defines selecting this variant, sorted by name.
    pub fn defines(self) -> Vec<ShaderDefine> {
        let mut defines = Vec::new();
        if self.contains(VertexShaderFlags::CUBE_MAP_CAPTURE) {
            defines.push(ShaderDefine::flag("CUBE_MAP_CAPTURE"));
        }
        if self.contains(VertexShaderFlags::DEPTH_ONLY) {
            defines.push(ShaderDefine::flag("DEPTH_ONLY"));
        }
        defines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_defines() {
        assert!(VertexShaderFlags::empty().defines().is_empty());
        let both = VertexShaderFlags::VARIANTS[3].defines();
        let names: Vec<_> = both.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["CUBE_MAP_CAPTURE", "DEPTH_ONLY"]);
    }

    #[test]
    fn test_variants_are_distinct() {
        let variants = VertexShaderFlags::VARIANTS;
        for (i, a) in variants.iter().enumerate() {
            for b in &variants[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
