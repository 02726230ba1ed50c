use std::rc::Rc;

use crate::component::ComponentId;

/// Notified when the render queue goes from empty to non-empty. The
/// embedding environment decides when to call back into
/// [`Runtime::rerender`](crate::runtime::Runtime::rerender).
pub trait RenderScheduler {
    fn schedule_flush(&self);
}

/// Scheduler for hosts that drive flushes themselves; the wake-up is a no-op.
#[derive(Default)]
pub struct NoopScheduler;

impl RenderScheduler for NoopScheduler {
    fn schedule_flush(&self) {}
}

/// Pending re-renders, deduplicated through each instance's dirty flag by
/// the runtime. Flush order is most recently enqueued first.
pub struct RenderQueue {
    pending: Vec<ComponentId>,
    scheduler: Rc<dyn RenderScheduler>,
}

impl RenderQueue {
    pub fn new(scheduler: Rc<dyn RenderScheduler>) -> Self {
        Self {
            pending: Vec::new(),
            scheduler,
        }
    }

    /// Appends `id` and wakes the scheduler on the empty-to-non-empty edge.
    /// Callers must have checked and set the instance's dirty flag.
    pub(crate) fn push(&mut self, id: ComponentId) {
        self.pending.push(id);
        if self.pending.len() == 1 {
            self.scheduler.schedule_flush();
        }
    }

    /// Swaps out the whole pending list. Entries enqueued while the caller
    /// processes the snapshot land in a fresh list and wake the scheduler
    /// again.
    pub(crate) fn take(&mut self) -> Vec<ComponentId> {
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
