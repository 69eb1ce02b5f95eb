use crate::bindings::{BufferHandle, SrvHandle, UavHandle};

bitflags::bitflags! {
    /// What a buffer may be bound as.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const VERTEX = 1 << 0;
        const INDEX = 1 << 1;
        const CONSTANT = 1 << 2;
        const STORAGE = 1 << 3;
    }
}

bitflags::bitflags! {
    /// Which views a texture is created with.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const SHADER_RESOURCE = 1 << 0;
        const UNORDERED_ACCESS = 1 << 1;
        const RENDER_TARGET = 1 << 2;
    }
}

/// Texture dimensionality, carried as data instead of a class hierarchy.
///
/// Hazard resolution and view selection match on this exhaustively, so "what
/// native resource backs this entry" is checked at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    D1 { width: u32 },
    D2 { width: u32, height: u32 },
    D3 { width: u32, height: u32, depth: u32 },
    Cube { size: u32 },
    Array { width: u32, height: u32, layers: u32 },
}

impl TextureKind {
    pub fn describe(&self) -> &'static str {
        match self {
            TextureKind::D1 { .. } => "texture1d",
            TextureKind::D2 { .. } => "texture2d",
            TextureKind::D3 { .. } => "texture3d",
            TextureKind::Cube { .. } => "texture-cube",
            TextureKind::Array { .. } => "texture2d-array",
        }
    }
}

/// How a shader binding will access a resource, declared at bind time so the
/// usage-mode change can be routed through the hazard resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    pub fn is_write(self) -> bool {
        matches!(self, AccessMode::WriteOnly | AccessMode::ReadWrite)
    }
}

/// GPU usage mode a resource is currently in. Transitions between distinct
/// modes require a native barrier and clearing of conflicting bindings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UsageMode {
    #[default]
    Undefined,
    ShaderRead,
    RenderTarget,
    UnorderedAccess,
}

impl UsageMode {
    /// Does an SRV binding of the resource conflict with this target mode?
    pub fn conflicts_with_srv(self) -> bool {
        matches!(self, UsageMode::RenderTarget | UsageMode::UnorderedAccess)
    }

    /// Does a UAV binding of the resource conflict with this target mode?
    pub fn conflicts_with_uav(self) -> bool {
        matches!(self, UsageMode::ShaderRead | UsageMode::RenderTarget)
    }
}

/// A logical texture and the native views minted for it at creation.
///
/// Either view may be absent; binding through a missing view degrades to a
/// warned clear rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub kind: TextureKind,
    pub srv: Option<SrvHandle>,
    pub uav: Option<UavHandle>,
}

/// A logical buffer and its native handle plus optional structured views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDesc {
    pub size: u32,
    pub native: BufferHandle,
    pub srv: Option<SrvHandle>,
    pub uav: Option<UavHandle>,
}

/// A logical resource entry in the [`crate::ResourceTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceDesc {
    Texture(TextureDesc),
    Buffer(BufferDesc),
}

impl ResourceDesc {
    pub fn srv(&self) -> Option<SrvHandle> {
        match self {
            ResourceDesc::Texture(t) => t.srv,
            ResourceDesc::Buffer(b) => b.srv,
        }
    }

    pub fn uav(&self) -> Option<UavHandle> {
        match self {
            ResourceDesc::Texture(t) => t.uav,
            ResourceDesc::Buffer(b) => b.uav,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            ResourceDesc::Texture(t) => t.kind.describe(),
            ResourceDesc::Buffer(_) => "buffer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_matrix_matches_mode_semantics() {
        assert!(!UsageMode::ShaderRead.conflicts_with_srv());
        assert!(UsageMode::ShaderRead.conflicts_with_uav());

        assert!(UsageMode::UnorderedAccess.conflicts_with_srv());
        assert!(!UsageMode::UnorderedAccess.conflicts_with_uav());

        assert!(UsageMode::RenderTarget.conflicts_with_srv());
        assert!(UsageMode::RenderTarget.conflicts_with_uav());

        assert!(!UsageMode::Undefined.conflicts_with_srv());
        assert!(!UsageMode::Undefined.conflicts_with_uav());
    }
}
