//! Structural keys for cached native pipeline objects.
//!
//! Keys combine the stable ids of the attached shaders with the small
//! interned ids of every fixed-function state object, packed into one `u64`.
//! Hashing and comparison never look at descriptor contents.

use crate::bindings::{stable_hash64, ShaderId, ShaderStage, StageMask};
use crate::state_objects::StateId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
}

impl PrimitiveTopology {
    const fn pack(self) -> u64 {
        match self {
            Self::PointList => 0,
            Self::LineList => 1,
            Self::LineStrip => 2,
            Self::TriangleList => 3,
            Self::TriangleStrip => 4,
        }
    }
}

/// The set of shaders attached to a pipeline, one optional id per stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ShaderBoundStateKey {
    pub shaders: [Option<ShaderId>; ShaderStage::COUNT],
}

impl ShaderBoundStateKey {
    pub fn graphics(vertex: ShaderId, pixel: Option<ShaderId>) -> Self {
        let mut shaders = [None; ShaderStage::COUNT];
        shaders[ShaderStage::Vertex.index()] = Some(vertex);
        shaders[ShaderStage::Pixel.index()] = pixel;
        Self { shaders }
    }

    pub fn compute(shader: ShaderId) -> Self {
        let mut shaders = [None; ShaderStage::COUNT];
        shaders[ShaderStage::Compute.index()] = Some(shader);
        Self { shaders }
    }

    pub fn with_stage(mut self, stage: ShaderStage, shader: ShaderId) -> Self {
        self.shaders[stage.index()] = Some(shader);
        self
    }

    pub fn shader(&self, stage: ShaderStage) -> Option<ShaderId> {
        self.shaders[stage.index()]
    }

    /// Which stages carry a shader; drives per-stage commit on draws.
    pub fn stage_mask(&self) -> StageMask {
        let mut mask = StageMask::empty();
        for stage in ShaderStage::ALL {
            if self.shaders[stage.index()].is_some() {
                mask |= stage.mask_bit();
            }
        }
        mask
    }

    /// Order-independent stable id of this shader combination, used to key
    /// persisted artifacts.
    pub fn stable_id(&self) -> u64 {
        stable_hash64(self)
    }
}

const ID_BITS: u32 = 12;
const ID_MASK: u64 = (1 << ID_BITS) - 1;

const INPUT_LAYOUT_SHIFT: u32 = 0;
const RASTERIZER_SHIFT: u32 = 12;
const BLEND_SHIFT: u32 = 24;
const DEPTH_STENCIL_SHIFT: u32 = 36;
const RT_FORMAT_SHIFT: u32 = 48;
const TOPOLOGY_SHIFT: u32 = 60;

/// Key of a compiled graphics/compute pipeline: the attached-shader set plus
/// the packed small ids of every fixed-function state object.
///
/// Equality compares the full shader array and the packed word, so hash
/// collisions can never alias two distinct pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineStateKey {
    pub bound_state: ShaderBoundStateKey,
    value: u64,
}

impl PipelineStateKey {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bound_state: ShaderBoundStateKey,
        input_layout: StateId,
        rasterizer: StateId,
        blend: StateId,
        depth_stencil: StateId,
        rt_formats: StateId,
        topology: PrimitiveTopology,
    ) -> Self {
        let value = ((input_layout.0 as u64) & ID_MASK) << INPUT_LAYOUT_SHIFT
            | ((rasterizer.0 as u64) & ID_MASK) << RASTERIZER_SHIFT
            | ((blend.0 as u64) & ID_MASK) << BLEND_SHIFT
            | ((depth_stencil.0 as u64) & ID_MASK) << DEPTH_STENCIL_SHIFT
            | ((rt_formats.0 as u64) & ID_MASK) << RT_FORMAT_SHIFT
            | topology.pack() << TOPOLOGY_SHIFT;
        Self { bound_state, value }
    }

    pub fn compute(bound_state: ShaderBoundStateKey) -> Self {
        Self {
            bound_state,
            value: 0,
        }
    }

    fn field(&self, shift: u32) -> u16 {
        ((self.value >> shift) & ID_MASK) as u16
    }

    pub fn input_layout_id(&self) -> StateId {
        StateId(self.field(INPUT_LAYOUT_SHIFT))
    }

    pub fn rasterizer_id(&self) -> StateId {
        StateId(self.field(RASTERIZER_SHIFT))
    }

    pub fn blend_id(&self) -> StateId {
        StateId(self.field(BLEND_SHIFT))
    }

    pub fn depth_stencil_id(&self) -> StateId {
        StateId(self.field(DEPTH_STENCIL_SHIFT))
    }

    pub fn rt_formats_id(&self) -> StateId {
        StateId(self.field(RT_FORMAT_SHIFT))
    }

    pub fn topology(&self) -> u8 {
        (self.value >> TOPOLOGY_SHIFT) as u8
    }
}

/// Backend-independent description of the full graphics state for one draw,
/// with every piece already reduced to its stable id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphicsStateDesc {
    pub shaders: ShaderBoundStateKey,
    pub input_layout: StateId,
    pub rasterizer: StateId,
    pub blend: StateId,
    pub depth_stencil: StateId,
    pub rt_formats: StateId,
    pub topology: PrimitiveTopology,
}

impl GraphicsStateDesc {
    pub fn key(&self) -> PipelineStateKey {
        PipelineStateKey::new(
            self.shaders,
            self.input_layout,
            self.rasterizer,
            self.blend,
            self.depth_stencil,
            self.rt_formats,
            self.topology,
        )
    }
}
