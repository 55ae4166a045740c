//! Rebuilding a captured state as a stream of API commands.
//!
//! Object kinds are created in dependency order, so that every handle a
//! command refers to has been created by an earlier command:
//!
//! 1. instances, physical devices, surfaces, devices, queues, swapchains
//! 2. non-dedicated memory, then buffers and images (with their dedicated
//!    memory, bindings and contents)
//! 3. samplers, synchronization primitives, pools and caches
//! 4. layouts, render passes, shader modules, pipelines
//! 5. views, descriptor pools and sets, framebuffers, descriptor contents
//! 6. query pools, then secondary and primary command buffers
//!
//! Objects that cannot be rebuilt are skipped with a diagnostic; only fatal
//! errors abort the run.

mod device;
mod objects;
mod pipelines;
mod resources;
mod submission;

use tracing::{info, warn};

use vkstate_api::handle::Handle;
use vkstate_api::{AnyHandle, ApiCommand, BlobStore, CommandSink, RangeList, State};
use vkstate_core::{HandleAllocator, RebuildConfig, RebuildError};

use crate::emitter::Emitter;
use crate::scratch::ScratchResources;

pub use pipelines::{pipeline_order, PipelineSlot};

/// An object the rebuilder could not fully restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub handle: AnyHandle,
    pub reason: String,
}

/// Summary of one run.
#[derive(Debug, Clone, Default)]
pub struct RebuildOutput {
    /// Replay memory touched by the emitted commands, merged.
    pub ranges: RangeList,
    pub command_count: usize,
    pub skipped: Vec<Skipped>,
    /// First handle value not used by the rebuilt state or its temporaries.
    pub next_handle: u64,
}

/// Emit the commands that rebuild `state` into `sink`.
pub fn rebuild_state(
    state: &State,
    blobs: &dyn BlobStore,
    config: &RebuildConfig,
    sink: &mut dyn CommandSink,
) -> Result<RebuildOutput, RebuildError> {
    let handles = HandleAllocator::above(state.max_handle());
    let em = Emitter::new(sink, blobs, handles);
    let mut rebuilder = StateRebuilder {
        state,
        config,
        em,
        scratch: ScratchResources::new(config.scratch.clone()),
        skipped: Vec::new(),
    };
    rebuilder.run()?;

    let StateRebuilder { em, skipped, .. } = rebuilder;
    let next_handle = em.next_handle();
    let (ranges, _, command_count) = em.into_parts();
    info!(
        commands = command_count,
        skipped = skipped.len(),
        "state rebuild complete"
    );
    Ok(RebuildOutput {
        ranges,
        command_count,
        skipped,
        next_handle,
    })
}

pub(crate) struct StateRebuilder<'s, 'e> {
    state: &'s State,
    config: &'s RebuildConfig,
    em: Emitter<'e>,
    scratch: ScratchResources,
    skipped: Vec<Skipped>,
}

impl StateRebuilder<'_, '_> {
    fn run(&mut self) -> Result<(), RebuildError> {
        self.instances()?;
        self.physical_devices()?;
        self.surfaces()?;
        self.devices()?;
        self.queues()?;
        self.swapchains()?;

        self.device_memories()?;
        self.buffers()?;
        self.images()?;

        self.ycbcr_conversions()?;
        self.samplers()?;
        self.fences()?;
        self.semaphores()?;
        self.events()?;
        self.command_pools()?;
        self.pipeline_caches()?;

        self.descriptor_set_layouts()?;
        self.descriptor_update_templates()?;
        self.pipeline_layouts()?;
        self.render_passes()?;
        self.shader_modules()?;
        self.compute_pipelines()?;
        self.graphics_pipelines()?;

        self.image_views()?;
        self.buffer_views()?;
        self.descriptor_pools()?;
        self.framebuffers()?;
        self.descriptor_writes()?;

        self.query_pools()?;
        self.command_buffers()?;

        self.scratch.free_all(&mut self.em)?;
        if self.config.rebuild.restore_mappings {
            self.mappings()?;
        }
        Ok(())
    }

    /// Turn a non-fatal error into a skip entry; fatal errors propagate.
    fn recover<T>(
        &mut self,
        handle: impl Handle,
        result: Result<T, RebuildError>,
    ) -> Result<Option<T>, RebuildError> {
        match result {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                self.em.discard_pending();
                self.skip(handle, e.to_string());
                Ok(None)
            }
        }
    }

    fn skip(&mut self, handle: impl Handle, reason: String) {
        let handle = handle.any();
        warn!(%handle, %reason, "object not fully rebuilt");
        self.skipped.push(Skipped { handle, reason });
    }

    /// Whether `dep` exists; records `handle` as skipped when it does not.
    fn requires(&mut self, handle: impl Handle, dep: impl Into<AnyHandle>) -> bool {
        match self.em.new_state.require(dep) {
            Ok(()) => true,
            Err(e) => {
                self.skip(handle, e.to_string());
                false
            }
        }
    }
}

/// Destroy commands for temporary objects created to stand in for destroyed
/// dependencies; released once the dependent object exists.
#[derive(Default)]
pub(crate) struct Placeholders {
    destroys: Vec<ApiCommand>,
}

impl Placeholders {
    fn push(&mut self, destroy: ApiCommand) {
        self.destroys.push(destroy);
    }

    fn release(self, em: &mut Emitter<'_>) {
        for destroy in self.destroys {
            em.write(destroy);
        }
    }
}
