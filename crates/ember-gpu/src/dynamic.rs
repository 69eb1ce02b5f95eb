use tracing::warn;

use crate::bindings::BufferHandle;
use crate::error::GpuError;
use crate::fence::FenceClock;

/// Allocation granularity of the dynamic pool, in bytes.
pub const DYNAMIC_BUFFER_ALIGN: u32 = 4;

/// Round `value` up to the nearest multiple of `alignment`.
///
/// `alignment` must be > 0.
fn align_up(value: u32, alignment: u32) -> u32 {
    debug_assert!(alignment > 0);
    match value.checked_add(alignment - 1) {
        Some(v) => v / alignment * alignment,
        None => u32::MAX / alignment * alignment,
    }
}

/// A locked slice of dynamic pool memory.
///
/// `offset` is the byte offset of the data inside the native buffer; the
/// whole buffer is rewritten discard-style on unlock, so it is always 0.
#[derive(Debug)]
pub struct DynamicAllocation {
    buffer_index: usize,
    pub handle: BufferHandle,
    pub offset: u32,
    pub size: u32,
}

#[derive(Debug)]
struct PoolBuffer {
    handle: BufferHandle,
    capacity: u32,
    staging: Vec<u8>,
    /// Fence value recorded at last use; the buffer may not be handed out
    /// again until the clock has completed past it.
    last_fence: u64,
}

/// Pool of reusable GPU-visible buffers for immediate-mode draw data.
///
/// Buffers are kept sorted ascending by capacity; `lock` hands out the
/// smallest buffer that fits and whose previous use the GPU has finished,
/// growing the pool otherwise. The pool never shrinks.
#[derive(Debug, Default)]
pub struct DynamicBufferPool {
    buffers: Vec<PoolBuffer>,
    locked: Option<usize>,
}

impl DynamicBufferPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the pool with the given capacities (rounded up to
    /// [`DYNAMIC_BUFFER_ALIGN`]). Creation failures are skipped with a
    /// warning; the pool grows on demand later.
    pub fn with_initial_capacities(
        capacities: &[u32],
        mut create: impl FnMut(u32) -> Option<BufferHandle>,
    ) -> Self {
        let mut pool = Self::new();
        let mut sorted = capacities.to_vec();
        sorted.sort_unstable();
        for capacity in sorted {
            let capacity = align_up(capacity, DYNAMIC_BUFFER_ALIGN);
            match create(capacity) {
                Some(handle) => {
                    pool.push_buffer(handle, capacity);
                }
                None => warn!(capacity, "dynamic pool buffer creation failed; skipping"),
            }
        }
        pool
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    fn push_buffer(&mut self, handle: BufferHandle, capacity: u32) -> usize {
        let index = self
            .buffers
            .partition_point(|buffer| buffer.capacity <= capacity);
        self.buffers.insert(
            index,
            PoolBuffer {
                handle,
                capacity,
                staging: vec![0; capacity as usize],
                last_fence: 0,
            },
        );
        index
    }

    /// Reserve `size` bytes of transient memory.
    ///
    /// Returns the smallest pool buffer that fits and is no longer in flight
    /// per `fence`; otherwise grows the pool via `create`. Zero-size requests
    /// are rejected.
    pub fn lock(
        &mut self,
        size: u32,
        fence: &FenceClock,
        mut create: impl FnMut(u32) -> Option<BufferHandle>,
    ) -> Result<DynamicAllocation, GpuError> {
        if size == 0 {
            return Err(GpuError::ZeroSizeAllocation);
        }
        debug_assert!(self.locked.is_none(), "dynamic pool lock is not reentrant");

        let rounded = align_up(size, DYNAMIC_BUFFER_ALIGN);

        let index = self.buffers.iter().position(|buffer| {
            buffer.capacity >= rounded && fence.is_complete(buffer.last_fence)
        });

        let index = match index {
            Some(index) => index,
            None => {
                let handle = create(rounded).ok_or(GpuError::PoolGrowthFailed { size: rounded })?;
                self.push_buffer(handle, rounded)
            }
        };

        self.locked = Some(index);
        Ok(DynamicAllocation {
            buffer_index: index,
            handle: self.buffers[index].handle,
            offset: 0,
            size,
        })
    }

    /// CPU-visible bytes of a locked allocation.
    pub fn staging_mut(&mut self, alloc: &DynamicAllocation) -> &mut [u8] {
        debug_assert_eq!(self.locked, Some(alloc.buffer_index));
        &mut self.buffers[alloc.buffer_index].staging[..alloc.size as usize]
    }

    /// Publish a locked allocation: upload the written bytes and record the
    /// fence value that must complete before the buffer is reused.
    ///
    /// Returns the native buffer and the data's byte offset inside it.
    pub fn unlock(
        &mut self,
        alloc: DynamicAllocation,
        fence_value: u64,
        upload: impl FnOnce(BufferHandle, &[u8]),
    ) -> (BufferHandle, u32) {
        debug_assert_eq!(self.locked, Some(alloc.buffer_index));
        self.locked = None;

        let buffer = &mut self.buffers[alloc.buffer_index];
        buffer.last_fence = fence_value;
        upload(buffer.handle, &buffer.staging[..alloc.size as usize]);
        (buffer.handle, alloc.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_create(next: &mut u32) -> impl FnMut(u32) -> Option<BufferHandle> + '_ {
        move |_| {
            *next += 1;
            Some(BufferHandle(*next))
        }
    }

    #[test]
    fn align_up_rounds_to_multiple() {
        assert_eq!(align_up(0, 4), 0);
        assert_eq!(align_up(1, 4), 4);
        assert_eq!(align_up(4, 4), 4);
        assert_eq!(align_up(5, 4), 8);
    }

    #[test]
    fn zero_size_request_is_rejected() {
        let mut pool = DynamicBufferPool::new();
        let fence = FenceClock::new();
        let result = pool.lock(0, &fence, |_| Some(BufferHandle(1)));
        assert!(matches!(result, Err(GpuError::ZeroSizeAllocation)));
    }

    #[test]
    fn lock_picks_smallest_fitting_buffer() {
        let mut next = 0;
        let mut pool =
            DynamicBufferPool::with_initial_capacities(&[256, 64], counting_create(&mut next));
        assert_eq!(pool.buffer_count(), 2);
        let fence = FenceClock::new();

        // 64-byte buffer was created first (sorted ascending), so a 100-byte
        // request must skip it for the 256-byte one.
        let alloc = pool
            .lock(100, &fence, |_| panic!("pool should not grow"))
            .unwrap();
        assert_eq!(alloc.handle, BufferHandle(2));
        pool.unlock(alloc, 1, |_, _| {});
    }

    #[test]
    fn oversized_requests_grow_the_pool_and_never_fail() {
        let mut pool = DynamicBufferPool::new();
        let fence = FenceClock::new();
        let mut next = 0;

        for size in [10u32, 100, 1000, 10_000] {
            let alloc = pool.lock(size, &fence, counting_create(&mut next)).unwrap();
            assert_eq!(alloc.size, size);
            pool.unlock(alloc, 0, |_, _| {});
        }
        assert_eq!(pool.buffer_count(), 4);
    }

    #[test]
    fn staged_bytes_reach_the_upload_callback() {
        let mut pool = DynamicBufferPool::new();
        let fence = FenceClock::new();

        let alloc = pool.lock(8, &fence, |_| Some(BufferHandle(9))).unwrap();
        pool.staging_mut(&alloc).copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);

        let mut uploaded = Vec::new();
        let (handle, offset) = pool.unlock(alloc, 1, |_, bytes| uploaded = bytes.to_vec());
        assert_eq!(handle, BufferHandle(9));
        assert_eq!(offset, 0);
        assert_eq!(uploaded, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn in_flight_buffer_is_not_reused_before_its_fence() {
        let mut pool = DynamicBufferPool::new();
        let mut fence = FenceClock::new();
        let mut next = 0;

        let alloc = pool.lock(16, &fence, counting_create(&mut next)).unwrap();
        let first_handle = alloc.handle;
        let pending = fence.signal();
        pool.unlock(alloc, pending, |_, _| {});

        // GPU has not reached `pending`: the same-size request must get a
        // fresh buffer rather than overwrite in-flight memory.
        let alloc = pool.lock(16, &fence, counting_create(&mut next)).unwrap();
        assert_ne!(alloc.handle, first_handle);
        pool.unlock(alloc, pending, |_, _| {});

        // Once the fence completes, the original buffer is reusable again.
        fence.complete_to(pending);
        let alloc = pool.lock(16, &fence, |_| panic!("pool should not grow")).unwrap();
        assert_eq!(alloc.handle, first_handle);
        pool.unlock(alloc, pending + 1, |_, _| {});
    }
}
