//! Work items the render thread executes (spec §4.7), grounded on
//! `render_task_itf.h`/`render_work_itf.h`.

/// Something the render thread can run. `tag` identifies the logical slot a
/// task occupies, so a later task with the same tag can replace an
/// already-queued one instead of piling up (spec §4.7 "overwrite" enqueue).
pub trait RenderTask: Send {
    fn run(self: Box<Self>);

    fn tag(&self) -> u64 {
        0
    }
}

impl<F: FnOnce() + Send> RenderTask for F {
    fn run(self: Box<Self>) {
        (*self)()
    }
}
