use relay_core::pool::{HandlePool, Pooled};

use crate::draw::{Action, ActionState, BucketKind, DrawOp, DrawOpHandle};
use crate::geometry::GeometryManager;

/// Everything one side of the double buffer records for a frame: the
/// actions and the draw ops filed into them.
#[derive(Debug)]
pub(crate) struct FrameState {
    /// Action slots; the first `active` are in use this frame.
    actions: Vec<Pooled<Action>>,
    active: usize,
    current: Option<usize>,
    pub(crate) draw_ops: HandlePool<DrawOp>,
}

impl FrameState {
    pub(crate) fn new(max_actions: usize, max_draw_ops: usize) -> Self {
        Self {
            actions: (0..max_actions).map(|_| Pooled::default()).collect(),
            active: 0,
            current: None,
            draw_ops: HandlePool::new("draw op", max_draw_ops),
        }
    }

    /// Start recording a fresh action.
    ///
    /// # Panics
    ///
    /// Panics if another action is still recording, or if the frame already
    /// holds the maximum number of actions.
    pub(crate) fn begin_action(&mut self) -> &mut Action {
        if let Some(current) = self.current {
            panic!("begin action while action {current} is still recording; call end_action first");
        }
        if self.active == self.actions.len() {
            panic!("too many actions in one frame (limit {})", self.actions.len());
        }
        let index = self.active;
        self.active += 1;
        self.current = Some(index);
        self.actions[index].activate()
    }

    pub(crate) fn current_mut(&mut self) -> Option<&mut Action> {
        let index = self.current?;
        self.actions[index].get_mut()
    }

    pub(crate) fn is_recording(&self) -> bool {
        self.current.is_some()
    }

    /// Finish the current action; it stays queued for the frame.
    pub(crate) fn end_action(&mut self) {
        match self.current_mut() {
            Some(action) => action.state = ActionState::Queued,
            None => {
                log::warn!("end_action called with no current action");
                return;
            }
        }
        self.current = None;
    }

    /// File `op` into `bucket` of the current action. An op joins at most one
    /// bucket; a repeated insert is ignored.
    ///
    /// # Panics
    ///
    /// Panics if no action is recording or `op` is not a live draw op of
    /// this frame.
    pub(crate) fn add_to_bucket(&mut self, op: DrawOpHandle, bucket: BucketKind) {
        let Some(action) = self.current.and_then(|index| self.actions[index].get_mut()) else {
            panic!("add_to_bucket called with no current action");
        };
        let Some(draw_op) = self.draw_ops.get_mut(op) else {
            panic!("add_to_bucket called with stale draw op {op:?}");
        };
        if draw_op.bucketed {
            log::warn!("add_to_bucket: draw op {op:?} already bucketed, {bucket:?} insert ignored");
            return;
        }
        draw_op.bucketed = true;
        action.buckets[bucket.index()].push(op);
    }

    /// Actions recorded this frame, in begin order.
    #[cfg(test)]
    pub(crate) fn actions_mut(&mut self) -> impl Iterator<Item = &mut Action> {
        self.actions[..self.active]
            .iter_mut()
            .filter_map(Pooled::get_mut)
    }

    /// Draw ops and the recorded actions, borrowed together for execution.
    pub(crate) fn execution_view(
        &mut self,
    ) -> (&HandlePool<DrawOp>, impl Iterator<Item = &mut Action>) {
        let actions = self.actions[..self.active]
            .iter_mut()
            .filter_map(Pooled::get_mut);
        (&self.draw_ops, actions)
    }

    #[cfg(test)]
    pub(crate) fn action_count(&self) -> usize {
        self.active
    }

    /// Return every draw op to the pool, release geometry owned by them and
    /// park the actions for reuse.
    pub(crate) fn retire(&mut self, geometry: &GeometryManager) {
        let owned: Vec<_> = self
            .draw_ops
            .iter()
            .filter(|(_, op)| op.owns_geo)
            .filter_map(|(_, op)| op.geo)
            .collect();
        for geo in owned {
            geometry.release_geo(geo);
        }
        let draw_ops = self.draw_ops.len();
        self.draw_ops.release_all();

        for slot in &mut self.actions[..self.active] {
            slot.release();
        }
        if self.active > 0 || draw_ops > 0 {
            log::trace!(
                "FrameState: retired {} actions, {draw_ops} draw ops",
                self.active
            );
        }
        self.active = 0;
        self.current = None;
    }
}
