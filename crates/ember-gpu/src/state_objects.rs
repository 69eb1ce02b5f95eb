//! Fixed-function state descriptors and their interning cache.
//!
//! Every distinct descriptor is assigned a stable small id at creation time.
//! Composite pipeline keys pack those ids instead of re-hashing descriptor
//! contents, keeping key comparison O(1).

use std::collections::HashMap;
use std::hash::Hash;

use tracing::warn;

/// Stable small id of an interned fixed-function state object.
///
/// Ids must fit the 12-bit fields of
/// [`crate::pipeline_key::PipelineStateKey`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StateId(pub u16);

pub const MAX_STATE_OBJECTS: usize = 1 << 12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FillMode {
    #[default]
    Solid,
    Wireframe,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CullMode {
    #[default]
    Back,
    Front,
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RasterizerDesc {
    pub fill: FillMode,
    pub cull: CullMode,
    pub front_counter_clockwise: bool,
    pub depth_clip: bool,
    pub scissor: bool,
    pub multisample: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    #[default]
    One,
    Zero,
    SrcAlpha,
    InvSrcAlpha,
    DstAlpha,
    InvDstAlpha,
    SrcColor,
    InvSrcColor,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BlendOp {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendDesc {
    pub enable: bool,
    pub src_color: BlendFactor,
    pub dst_color: BlendFactor,
    pub color_op: BlendOp,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    pub alpha_op: BlendOp,
    pub write_mask: u8,
}

impl Default for BlendDesc {
    fn default() -> Self {
        Self {
            enable: false,
            src_color: BlendFactor::One,
            dst_color: BlendFactor::Zero,
            color_op: BlendOp::Add,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
            alpha_op: BlendOp::Add,
            write_mask: 0xf,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CompareFunc {
    Never,
    #[default]
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StencilOp {
    #[default]
    Keep,
    Zero,
    Replace,
    IncrementClamp,
    DecrementClamp,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilDesc {
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_func: CompareFunc,
    pub stencil_test: bool,
    pub stencil_func: CompareFunc,
    pub stencil_fail: StencilOp,
    pub stencil_depth_fail: StencilOp,
    pub stencil_pass: StencilOp,
    pub stencil_read_mask: u8,
    pub stencil_write_mask: u8,
}

impl Default for DepthStencilDesc {
    fn default() -> Self {
        Self {
            depth_test: true,
            depth_write: true,
            depth_func: CompareFunc::Less,
            stencil_test: false,
            stencil_func: CompareFunc::Always,
            stencil_fail: StencilOp::Keep,
            stencil_depth_fail: StencilOp::Keep,
            stencil_pass: StencilOp::Keep,
            stencil_read_mask: 0xff,
            stencil_write_mask: 0xff,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float1,
    Float2,
    Float3,
    Float4,
    Uint1,
    Uint4,
    Unorm8x4,
}

/// One vertex attribute; the semantic is pre-hashed by the shader system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputElement {
    pub semantic_hash: u32,
    pub semantic_index: u8,
    pub format: VertexFormat,
    pub stream_slot: u8,
    pub byte_offset: u16,
    pub per_instance: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct InputLayoutDesc {
    pub elements: Vec<InputElement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Rgba16Float,
    Rg11B10Float,
    R32Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthFormat {
    Depth24Stencil8,
    Depth32Float,
}

/// Formats of the currently bound render targets; part of the pipeline key
/// because native pipelines are compiled against target formats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RenderTargetFormatsDesc {
    pub colors: Vec<ColorFormat>,
    pub depth: Option<DepthFormat>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Point,
    #[default]
    Linear,
    Anisotropic,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AddressMode {
    #[default]
    Wrap,
    Clamp,
    Mirror,
    Border,
}

/// Sampler state description. Samplers are not part of the pipeline key; the
/// system caches them per distinct descriptor like the other state objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SamplerDesc {
    pub filter: FilterMode,
    pub address_u: AddressMode,
    pub address_v: AddressMode,
    pub address_w: AddressMode,
    pub compare: Option<CompareFunc>,
    pub max_anisotropy: u8,
}

#[derive(Debug)]
struct Interner<T> {
    map: HashMap<T, StateId>,
    items: Vec<T>,
}

impl<T: Hash + Eq + Clone> Default for Interner<T> {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
            items: Vec::new(),
        }
    }
}

impl<T: Hash + Eq + Clone> Interner<T> {
    fn intern(&mut self, desc: &T, family: &'static str) -> StateId {
        if let Some(&id) = self.map.get(desc) {
            return id;
        }
        if self.items.len() >= MAX_STATE_OBJECTS {
            // 4096 distinct states of one family exceeds the key's id field;
            // reuse id 0 so keys stay well-formed, at the cost of collisions.
            debug_assert!(false, "{family} state id space exhausted");
            warn!(family, "state id space exhausted; aliasing to id 0");
            return StateId(0);
        }
        let id = StateId(self.items.len() as u16);
        self.items.push(desc.clone());
        self.map.insert(desc.clone(), id);
        id
    }

    fn get(&self, id: StateId) -> Option<&T> {
        self.items.get(id.0 as usize)
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Interns fixed-function descriptors, one id space per family.
#[derive(Debug, Default)]
pub struct StateObjectCache {
    rasterizers: Interner<RasterizerDesc>,
    blends: Interner<BlendDesc>,
    depth_stencils: Interner<DepthStencilDesc>,
    input_layouts: Interner<InputLayoutDesc>,
    rt_formats: Interner<RenderTargetFormatsDesc>,
}

impl StateObjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern_rasterizer(&mut self, desc: &RasterizerDesc) -> StateId {
        self.rasterizers.intern(desc, "rasterizer")
    }

    pub fn intern_blend(&mut self, desc: &BlendDesc) -> StateId {
        self.blends.intern(desc, "blend")
    }

    pub fn intern_depth_stencil(&mut self, desc: &DepthStencilDesc) -> StateId {
        self.depth_stencils.intern(desc, "depth-stencil")
    }

    pub fn intern_input_layout(&mut self, desc: &InputLayoutDesc) -> StateId {
        self.input_layouts.intern(desc, "input-layout")
    }

    pub fn intern_rt_formats(&mut self, desc: &RenderTargetFormatsDesc) -> StateId {
        self.rt_formats.intern(desc, "render-target-formats")
    }

    pub fn rasterizer(&self, id: StateId) -> Option<&RasterizerDesc> {
        self.rasterizers.get(id)
    }

    pub fn blend(&self, id: StateId) -> Option<&BlendDesc> {
        self.blends.get(id)
    }

    pub fn depth_stencil(&self, id: StateId) -> Option<&DepthStencilDesc> {
        self.depth_stencils.get(id)
    }

    pub fn input_layout(&self, id: StateId) -> Option<&InputLayoutDesc> {
        self.input_layouts.get(id)
    }

    pub fn rt_formats(&self, id: StateId) -> Option<&RenderTargetFormatsDesc> {
        self.rt_formats.get(id)
    }

    pub fn total_interned(&self) -> usize {
        self.rasterizers.len()
            + self.blends.len()
            + self.depth_stencils.len()
            + self.input_layouts.len()
            + self.rt_formats.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent_per_family() {
        let mut cache = StateObjectCache::new();

        let a = cache.intern_rasterizer(&RasterizerDesc::default());
        let b = cache.intern_rasterizer(&RasterizerDesc::default());
        assert_eq!(a, b);

        let wire = cache.intern_rasterizer(&RasterizerDesc {
            fill: FillMode::Wireframe,
            ..Default::default()
        });
        assert_ne!(a, wire);

        assert_eq!(cache.rasterizer(wire).map(|d| d.fill), Some(FillMode::Wireframe));
    }

    #[test]
    fn families_have_independent_id_spaces() {
        let mut cache = StateObjectCache::new();
        let r = cache.intern_rasterizer(&RasterizerDesc::default());
        let b = cache.intern_blend(&BlendDesc::default());
        // Both get the first id of their own family.
        assert_eq!(r, StateId(0));
        assert_eq!(b, StateId(0));
        assert_eq!(cache.total_interned(), 2);
    }

    #[test]
    fn input_layouts_compare_by_element_contents() {
        let mut cache = StateObjectCache::new();
        let element = InputElement {
            semantic_hash: 0x1a21_df14,
            semantic_index: 0,
            format: VertexFormat::Float3,
            stream_slot: 0,
            byte_offset: 0,
            per_instance: false,
        };

        let one = cache.intern_input_layout(&InputLayoutDesc {
            elements: vec![element],
        });
        let same = cache.intern_input_layout(&InputLayoutDesc {
            elements: vec![element],
        });
        let different = cache.intern_input_layout(&InputLayoutDesc {
            elements: vec![InputElement {
                byte_offset: 12,
                ..element
            }],
        });

        assert_eq!(one, same);
        assert_ne!(one, different);
    }
}
