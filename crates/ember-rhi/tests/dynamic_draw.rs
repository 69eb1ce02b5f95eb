//! Immediate-mode draws through the dynamic buffer pools.

mod common;

use bytemuck::{Pod, Zeroable};
use common::{start_rendering, test_context};
use ember_rhi::null::NativeCall;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    color: [f32; 4],
}

fn vertex(x: f32) -> Vertex {
    Vertex {
        position: [x, 0.0, 0.0],
        color: [1.0, 1.0, 1.0, 1.0],
    }
}

#[test]
fn draw_up_stages_vertices_and_draws() {
    let mut ctx = test_context();
    start_rendering(&mut ctx);

    let vertices = [vertex(0.0), vertex(1.0), vertex(2.0)];
    ctx.draw_primitive_up(&vertices).unwrap();

    let calls = ctx.native_mut().take_calls();
    let uploaded = calls
        .iter()
        .find_map(|c| match c {
            NativeCall::UpdateBuffer { bytes, .. } => Some(bytes.clone()),
            _ => None,
        })
        .expect("vertex data must be uploaded");
    assert_eq!(uploaded, bytemuck::cast_slice::<Vertex, u8>(&vertices));

    let stream = calls
        .iter()
        .find_map(|c| match c {
            NativeCall::SetVertexStream { slot, stride, offset, .. } => {
                Some((*slot, *stride, *offset))
            }
            _ => None,
        })
        .expect("stream must be bound from the pool");
    assert_eq!(stream, (0, std::mem::size_of::<Vertex>() as u32, 0));

    assert!(calls.contains(&NativeCall::Draw {
        start_vertex: 0,
        vertex_count: 3
    }));
}

#[test]
fn indexed_draw_up_uses_separate_index_pool() {
    let mut ctx = test_context();
    start_rendering(&mut ctx);

    let vertices = [vertex(0.0), vertex(1.0), vertex(2.0), vertex(3.0)];
    let indices = [0u32, 1, 2, 2, 1, 3];
    ctx.draw_indexed_primitive_up(&vertices, &indices).unwrap();

    let calls = ctx.native_mut().take_calls();
    let uploads: Vec<_> = calls
        .iter()
        .filter(|c| matches!(c, NativeCall::UpdateBuffer { .. }))
        .collect();
    assert_eq!(uploads.len(), 2);

    assert!(calls
        .iter()
        .any(|c| matches!(c, NativeCall::SetIndexBuffer { buffer: Some(_), .. })));
    assert!(calls.contains(&NativeCall::DrawIndexed {
        start_index: 0,
        index_count: 6,
        base_vertex: 0
    }));
}

#[test]
fn pool_buffers_are_not_reused_until_the_frame_fence_completes() {
    let mut ctx = test_context();
    start_rendering(&mut ctx);

    let vertices = [vertex(0.0), vertex(1.0), vertex(2.0)];
    ctx.draw_primitive_up(&vertices).unwrap();
    let first_buffer = last_upload_buffer(&mut ctx);
    let fence = ctx.end_frame().unwrap();

    // The GPU has not consumed frame 1 yet: the same-size draw must stage
    // through a different buffer.
    ctx.begin_frame().unwrap();
    ctx.begin_render().unwrap();
    ctx.commit_shader_state().unwrap();
    ctx.draw_primitive_up(&vertices).unwrap();
    let second_buffer = last_upload_buffer(&mut ctx);
    assert_ne!(first_buffer, second_buffer);
    ctx.end_frame().unwrap();

    // Frame 1 completes; its buffer is recycled for the next draw.
    ctx.native_mut().complete_fence_to(fence);
    ctx.begin_frame().unwrap();
    ctx.begin_render().unwrap();
    ctx.commit_shader_state().unwrap();
    ctx.draw_primitive_up(&vertices).unwrap();
    let third_buffer = last_upload_buffer(&mut ctx);
    assert_eq!(third_buffer, first_buffer);
}

#[test]
fn growing_requests_always_succeed() {
    let mut ctx = test_context();
    start_rendering(&mut ctx);

    for count in [3usize, 30, 300, 3000] {
        let vertices: Vec<Vertex> = (0..count).map(|i| vertex(i as f32)).collect();
        ctx.draw_primitive_up(&vertices).unwrap();
    }

    let draws = ctx
        .native_mut()
        .take_calls()
        .iter()
        .filter(|c| matches!(c, NativeCall::Draw { .. }))
        .count();
    assert_eq!(draws, 4);
}

#[test]
fn empty_draw_up_is_rejected() {
    let mut ctx = test_context();
    start_rendering(&mut ctx);

    let vertices: [Vertex; 0] = [];
    assert!(ctx.draw_primitive_up(&vertices).is_err());
    assert!(!ctx
        .native_mut()
        .take_calls()
        .iter()
        .any(|c| matches!(c, NativeCall::Draw { .. })));
}

fn last_upload_buffer(ctx: &mut common::TestContext) -> ember_gpu::bindings::BufferHandle {
    ctx.native_mut()
        .take_calls()
        .iter()
        .rev()
        .find_map(|c| match c {
            NativeCall::UpdateBuffer { buffer, .. } => Some(*buffer),
            _ => None,
        })
        .expect("an upload should have been recorded")
}
