use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use tracing::warn;

use ember_gpu::bindings::{
    BufferHandle, CacheStats, PipelineHandle, SamplerHandle, ShaderId,
};
use ember_gpu::blob_cache::{BlobCacheKey, PipelineBlobCache};
use ember_gpu::pipeline_cache::{PipelineCache, ShaderBoundState};
use ember_gpu::pipeline_key::{GraphicsStateDesc, PipelineStateKey, ShaderBoundStateKey};
use ember_gpu::state_objects::{
    BlendDesc, DepthStencilDesc, InputLayoutDesc, RasterizerDesc, RenderTargetFormatsDesc,
    SamplerDesc, StateId, StateObjectCache,
};
use ember_gpu::stats::BindingStats;
use ember_gpu::{
    BufferDesc, BufferUsage, FenceClock, GpuError, ResourceDesc, ResourceId, ResourceTable,
    TextureDesc, TextureKind, TextureUsage,
};

use crate::backend::{DeviceCaps, NativeDevice};

/// Explicit registry replacing the process-wide device singleton: owns the
/// device, the resource table, and every shared cache, and is passed to each
/// recording context at construction.
///
/// Caches are read-mostly after warm-up. Lookups take the shared read lock;
/// the exclusive lock is held only around cache-miss construction (and pool/
/// table growth), which is rare relative to hits.
pub struct RhiSystem<D: NativeDevice> {
    device: Mutex<D>,
    backend_name: &'static str,
    caps: DeviceCaps,

    resources: RwLock<ResourceTable>,
    states: RwLock<StateObjectCache>,
    samplers: RwLock<HashMap<SamplerDesc, SamplerHandle>>,

    bound_states: RwLock<PipelineCache<ShaderBoundStateKey, ShaderBoundState>>,
    pipelines: RwLock<PipelineCache<PipelineStateKey, PipelineHandle>>,

    fence: Mutex<FenceClock>,
    blobs: Option<PipelineBlobCache>,
    stats: BindingStats,
}

impl<D: NativeDevice> RhiSystem<D> {
    pub fn new(device: D) -> Arc<Self> {
        Self::build(device, None)
    }

    /// Like [`Self::new`], with a persisted pipeline blob cache rooted at
    /// `blob_dir`.
    pub fn with_blob_cache(device: D, blob_dir: impl Into<PathBuf>) -> io::Result<Arc<Self>> {
        let blobs = PipelineBlobCache::open(blob_dir)?;
        Ok(Self::build(device, Some(blobs)))
    }

    fn build(device: D, blobs: Option<PipelineBlobCache>) -> Arc<Self> {
        let backend_name = device.backend_name();
        let caps = device.caps();
        Arc::new(Self {
            device: Mutex::new(device),
            backend_name,
            caps,
            resources: RwLock::new(ResourceTable::new()),
            states: RwLock::new(StateObjectCache::new()),
            samplers: RwLock::new(HashMap::new()),
            bound_states: RwLock::new(PipelineCache::new()),
            pipelines: RwLock::new(PipelineCache::new()),
            fence: Mutex::new(FenceClock::new()),
            blobs,
            stats: BindingStats::new(),
        })
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    pub fn caps(&self) -> DeviceCaps {
        self.caps
    }

    pub fn stats(&self) -> &BindingStats {
        &self.stats
    }

    pub fn blob_cache(&self) -> Option<&PipelineBlobCache> {
        self.blobs.as_ref()
    }

    /// Key for persisting a compiled shader-combination blob for this
    /// backend.
    pub fn shader_blob_key<'a>(
        &self,
        content: impl IntoIterator<Item = &'a [u8]>,
    ) -> BlobCacheKey {
        BlobCacheKey::from_content(self.backend_name, content)
    }

    // -----------------------------------------------------------------
    // Resources
    // -----------------------------------------------------------------

    pub fn create_texture(&self, kind: TextureKind, usage: TextureUsage) -> Option<ResourceId> {
        let desc = self.device.lock().unwrap().create_texture(kind, usage);
        let Some(desc) = desc else {
            warn!(kind = kind.describe(), "native texture creation failed");
            return None;
        };
        Some(self.insert_resource(ResourceDesc::Texture(desc)))
    }

    pub fn create_structured_buffer(&self, size: u32, usage: BufferUsage) -> Option<ResourceId> {
        let desc = self
            .device
            .lock()
            .unwrap()
            .create_structured_buffer(size, usage);
        let Some(desc) = desc else {
            warn!(size, "native structured buffer creation failed");
            return None;
        };
        Some(self.insert_resource(ResourceDesc::Buffer(desc)))
    }

    /// Register an externally created resource (e.g. a swapchain image).
    pub fn insert_resource(&self, desc: ResourceDesc) -> ResourceId {
        self.resources.write().unwrap().insert(desc)
    }

    pub fn resource(&self, id: ResourceId) -> Option<ResourceDesc> {
        self.resources.read().unwrap().get(id).copied()
    }

    pub fn buffer_desc(&self, id: ResourceId) -> Option<BufferDesc> {
        match self.resource(id)? {
            ResourceDesc::Buffer(desc) => Some(desc),
            ResourceDesc::Texture(_) => None,
        }
    }

    pub fn texture_desc(&self, id: ResourceId) -> Option<TextureDesc> {
        match self.resource(id)? {
            ResourceDesc::Texture(desc) => Some(desc),
            ResourceDesc::Buffer(_) => None,
        }
    }

    /// Remove a resource from the table. Contexts must clear their bindings
    /// of it first (see `CommandContext::clear_resource_bindings`).
    pub fn destroy_resource(&self, id: ResourceId) -> bool {
        self.resources.write().unwrap().remove(id).is_some()
    }

    /// Plain native buffer, for dynamic pools, staging and streams.
    pub fn create_buffer(&self, size: u32, usage: BufferUsage) -> Option<BufferHandle> {
        self.device.lock().unwrap().create_buffer(size, usage)
    }

    pub fn create_sampler(&self, desc: &SamplerDesc) -> Option<SamplerHandle> {
        if let Some(&handle) = self.samplers.read().unwrap().get(desc) {
            return Some(handle);
        }
        let mut samplers = self.samplers.write().unwrap();
        if let Some(&handle) = samplers.get(desc) {
            return Some(handle);
        }
        let handle = self.device.lock().unwrap().create_sampler(desc)?;
        samplers.insert(*desc, handle);
        Some(handle)
    }

    // -----------------------------------------------------------------
    // Fixed-function state objects
    // -----------------------------------------------------------------

    pub fn intern_rasterizer(&self, desc: &RasterizerDesc) -> StateId {
        self.states.write().unwrap().intern_rasterizer(desc)
    }

    pub fn intern_blend(&self, desc: &BlendDesc) -> StateId {
        self.states.write().unwrap().intern_blend(desc)
    }

    pub fn intern_depth_stencil(&self, desc: &DepthStencilDesc) -> StateId {
        self.states.write().unwrap().intern_depth_stencil(desc)
    }

    pub fn intern_input_layout(&self, desc: &InputLayoutDesc) -> StateId {
        self.states.write().unwrap().intern_input_layout(desc)
    }

    pub fn intern_rt_formats(&self, desc: &RenderTargetFormatsDesc) -> StateId {
        self.states.write().unwrap().intern_rt_formats(desc)
    }

    // -----------------------------------------------------------------
    // Pipeline / bound-state caches
    // -----------------------------------------------------------------

    /// The root/bind layout for an attached-shader set, built at most once
    /// per distinct key.
    pub fn bound_state_for(&self, key: &ShaderBoundStateKey) -> Option<Arc<ShaderBoundState>> {
        if let Some(hit) = self.bound_states.read().unwrap().get(key) {
            return Some(hit);
        }
        let mut cache = self.bound_states.write().unwrap();
        cache.get_or_create(key, || {
            let layout = self.device.lock().unwrap().create_bound_layout(key)?;
            Some(ShaderBoundState {
                key: *key,
                stage_mask: key.stage_mask(),
                layout,
            })
        })
    }

    /// The compiled graphics pipeline for `desc`, built at most once per
    /// distinct structural key. `None` means the native build failed; the
    /// next request retries.
    pub fn graphics_pipeline_for(
        &self,
        desc: &GraphicsStateDesc,
        bound_state: &ShaderBoundState,
    ) -> Option<Arc<PipelineHandle>> {
        let key = desc.key();
        if let Some(hit) = self.pipelines.read().unwrap().get(&key) {
            return Some(hit);
        }
        let mut cache = self.pipelines.write().unwrap();
        cache.get_or_create(&key, || {
            self.device
                .lock()
                .unwrap()
                .create_graphics_pipeline(desc, bound_state.layout)
        })
    }

    pub fn compute_pipeline_for(
        &self,
        shader: ShaderId,
        bound_state: &ShaderBoundState,
    ) -> Option<Arc<PipelineHandle>> {
        let key = PipelineStateKey::compute(ShaderBoundStateKey::compute(shader));
        if let Some(hit) = self.pipelines.read().unwrap().get(&key) {
            return Some(hit);
        }
        let mut cache = self.pipelines.write().unwrap();
        cache.get_or_create(&key, || {
            self.device
                .lock()
                .unwrap()
                .create_compute_pipeline(shader, bound_state.layout)
        })
    }

    pub fn pipeline_cache_stats(&self) -> CacheStats {
        self.pipelines.read().unwrap().stats()
    }

    pub fn bound_state_cache_stats(&self) -> CacheStats {
        self.bound_states.read().unwrap().stats()
    }

    // -----------------------------------------------------------------
    // Frame fence
    // -----------------------------------------------------------------

    /// Mint the fence value for the frame being submitted.
    pub fn signal_frame_fence(&self) -> u64 {
        self.fence.lock().unwrap().signal()
    }

    /// The value the next submission will be fenced with. Dynamic
    /// allocations handed out now are consumed by that submission.
    pub fn upcoming_fence_value(&self) -> u64 {
        self.fence.lock().unwrap().last_signaled() + 1
    }

    pub fn complete_fence_to(&self, value: u64) {
        self.fence.lock().unwrap().complete_to(value);
    }

    pub fn fence_snapshot(&self) -> FenceClock {
        self.fence.lock().unwrap().clone()
    }

    /// Bounded wait for `value`; `poll` reports the backend's completed
    /// value. Fails hard after `polls` attempts.
    pub fn wait_fence(
        &self,
        value: u64,
        polls: u32,
        poll: impl FnMut() -> u64,
    ) -> Result<(), GpuError> {
        self.fence.lock().unwrap().wait_with(value, polls, poll)
    }

    // -----------------------------------------------------------------
    // Device loss
    // -----------------------------------------------------------------

    /// Swap in a recreated device after device loss.
    ///
    /// Pipelines, bound layouts and samplers belong to the old device and are
    /// dropped wholesale; contexts must `reset_after_device_loss` before
    /// recording again.
    pub fn replace_device(&self, device: D) {
        {
            let mut slot = self.device.lock().unwrap();
            *slot = device;
        }
        self.pipelines.write().unwrap().clear();
        self.bound_states.write().unwrap().clear();
        self.samplers.write().unwrap().clear();
    }

    /// Run a closure against the native device, under the device lock. For
    /// backend-specific operations outside the narrow trait surface.
    pub fn with_device<R>(&self, f: impl FnOnce(&mut D) -> R) -> R {
        f(&mut self.device.lock().unwrap())
    }
}
