use std::collections::VecDeque;

use crate::coords::Vec2;
use crate::frame::{InputBackend, InputSink};
use crate::scene::InputReceiverCandidate;

use super::{EventClass, EventResult, InputEvent, InputState, RoutedEvent};

/// Default bound on events held across dropped frames.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Outcome counters for one dispatch.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct DispatchReport {
    /// Callbacks that returned `Consumed`.
    pub consumed: u32,
    /// Callbacks that returned `Declined`.
    pub declined: u32,
    /// Callbacks that returned an error.
    pub failed: u32,
    /// Routable events no receiver consumed.
    pub unclaimed: u32,
}

impl DispatchReport {
    #[inline]
    pub fn events(&self) -> u32 {
        self.consumed + self.unclaimed
    }
}

#[derive(Debug, Clone)]
struct PendingEvent {
    event: InputEvent,
    /// Window logical pixels at queue time.
    pointer: Option<Vec2>,
}

/// Queues platform input and delivers it after the frame's draw order is known.
///
/// State tables (held keys, pointer position) update when an event is
/// queued. Delivery to entities waits for `dispatch`, which the loop calls
/// only after a committed render pass; a dropped frame leaves the queue
/// intact for the next one.
#[derive(Debug)]
pub struct InputDispatcher {
    state: InputState,
    pending: VecDeque<PendingEvent>,
    capacity: usize,
    overflowed: u64,
    /// Window logical pixels to render-space pixels.
    pointer_scale: Vec2,
}

impl Default for InputDispatcher {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }
}

impl InputDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: InputState::default(),
            pending: VecDeque::new(),
            capacity: capacity.max(1),
            overflowed: 0,
            pointer_scale: Vec2::new(1.0, 1.0),
        }
    }

    /// Sets the mapping from window logical size to render size.
    pub fn set_pointer_scale(&mut self, window: Vec2, render: Vec2) {
        if window.x > 0.0 && window.y > 0.0 && render.is_finite() {
            self.pointer_scale = Vec2::new(render.x / window.x, render.y / window.y);
        }
    }

    #[inline]
    pub fn state(&self) -> &InputState {
        &self.state
    }

    #[inline]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Events discarded because the queue was full.
    #[inline]
    pub fn overflowed(&self) -> u64 {
        self.overflowed
    }

    pub fn queue(&mut self, event: InputEvent) {
        self.state.apply_event(&event);

        if event.class() == EventClass::Bookkeeping {
            return;
        }

        if self.pending.len() >= self.capacity {
            self.pending.pop_front();
            self.overflowed += 1;
            log::warn!("input queue full ({}); dropping oldest event", self.capacity);
        }

        let pointer = match &event {
            InputEvent::PointerButton(b) => Some(Vec2::new(b.x, b.y)),
            _ => self.state.pointer_pos,
        };
        self.pending.push_back(PendingEvent { event, pointer });
    }

    /// Drops queued events without delivering them.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    fn to_render(&self, p: Vec2) -> Vec2 {
        p.scale(self.pointer_scale)
    }

    fn route_positional(
        receivers: &[InputReceiverCandidate],
        sink: &mut dyn InputSink,
        routed: &RoutedEvent,
        report: &mut DispatchReport,
    ) {
        let Some(point) = routed.pointer else {
            report.unclaimed += 1;
            return;
        };
        let interest = routed.event.interest();

        // Topmost first.
        let hits = receivers
            .iter()
            .rev()
            .filter(|r| r.wants(interest) && r.hit_region.is_some_and(|h| h.contains(point)));

        for r in hits {
            match sink.deliver(r.id, routed) {
                Ok(EventResult::Consumed) => {
                    report.consumed += 1;
                    return;
                }
                Ok(EventResult::Declined) => report.declined += 1,
                Err(err) => {
                    report.failed += 1;
                    log::warn!("input receiver {} failed: {err:#}", r.id);
                }
            }
        }

        report.unclaimed += 1;
    }

    fn route_broadcast(
        receivers: &[InputReceiverCandidate],
        sink: &mut dyn InputSink,
        routed: &RoutedEvent,
        report: &mut DispatchReport,
    ) {
        let interest = routed.event.interest();
        let mut claimed = false;

        for r in receivers.iter().filter(|r| r.wants(interest)) {
            match sink.deliver(r.id, routed) {
                Ok(EventResult::Consumed) => {
                    report.consumed += 1;
                    claimed = true;
                }
                Ok(EventResult::Declined) => report.declined += 1,
                Err(err) => {
                    report.failed += 1;
                    log::warn!("input receiver {} failed: {err:#}", r.id);
                }
            }
        }

        if !claimed {
            report.unclaimed += 1;
        }
    }
}

impl InputBackend for InputDispatcher {
    fn dispatch(
        &mut self,
        receivers: &[InputReceiverCandidate],
        sink: &mut dyn InputSink,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        while let Some(PendingEvent { event, pointer }) = self.pending.pop_front() {
            let routed = RoutedEvent {
                pointer: pointer.map(|p| self.to_render(p)),
                event,
            };

            match routed.event.class() {
                EventClass::Positional => {
                    Self::route_positional(receivers, sink, &routed, &mut report)
                }
                EventClass::Broadcast => {
                    Self::route_broadcast(receivers, sink, &routed, &mut report)
                }
                EventClass::Bookkeeping => {}
            }
        }

        if report.failed > 0 {
            log::debug!("input dispatch: {report:?}");
        }
        report
    }

    fn discard(&mut self) -> usize {
        let dropped = self.pending.len();
        self.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use anyhow::{bail, Result};

    use super::*;
    use crate::coords::Rect;
    use crate::input::{
        Interest, Key, KeyState, Modifiers, MouseButton, MouseButtonState, PointerButtonEvent,
    };
    use crate::scene::{DrawOrder, EntityId};

    #[derive(Copy, Clone)]
    enum Reply {
        Consume,
        Decline,
        Fail,
    }

    #[derive(Default)]
    struct ScriptedSink {
        replies: HashMap<EntityId, Reply>,
        log: Vec<(EntityId, RoutedEvent)>,
    }

    impl ScriptedSink {
        fn reply(mut self, id: u32, reply: Reply) -> Self {
            self.replies.insert(EntityId(id), reply);
            self
        }

        fn order(&self) -> Vec<u32> {
            self.log.iter().map(|(id, _)| id.0).collect()
        }
    }

    impl InputSink for ScriptedSink {
        fn deliver(&mut self, target: EntityId, event: &RoutedEvent) -> Result<EventResult> {
            self.log.push((target, event.clone()));
            match self.replies.get(&target).copied().unwrap_or(Reply::Consume) {
                Reply::Consume => Ok(EventResult::Consumed),
                Reply::Decline => Ok(EventResult::Declined),
                Reply::Fail => bail!("scripted failure"),
            }
        }
    }

    fn card(id: u32, key: u32, rect: Rect) -> InputReceiverCandidate {
        InputReceiverCandidate {
            id: EntityId(id),
            key: DrawOrder(key),
            hit_region: Some(rect),
            interest: Interest::POINTER | Interest::KEYS,
        }
    }

    /// A, B, C fully overlapping, drawn in that order.
    fn stacked() -> Vec<InputReceiverCandidate> {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        vec![card(1, 0, r), card(2, 1, r), card(3, 2, r)]
    }

    fn click(x: f32, y: f32) -> InputEvent {
        InputEvent::PointerButton(PointerButtonEvent {
            button: MouseButton::Left,
            state: MouseButtonState::Pressed,
            x,
            y,
            modifiers: Modifiers::default(),
        })
    }

    fn key(k: Key) -> InputEvent {
        InputEvent::Key {
            key: k,
            state: KeyState::Pressed,
            modifiers: Modifiers::default(),
            repeat: false,
        }
    }

    // ── positional routing ─────────────────────────────────────────────────

    #[test]
    fn topmost_receiver_gets_the_click() {
        let mut d = InputDispatcher::new();
        let mut sink = ScriptedSink::default();
        d.queue(click(5.0, 5.0));

        let report = d.dispatch(&stacked(), &mut sink);
        assert_eq!(sink.order(), vec![3]);
        assert_eq!(report.consumed, 1);
        assert_eq!(d.pending(), 0);
    }

    #[test]
    fn declined_click_falls_through_in_reverse_draw_order() {
        let mut d = InputDispatcher::new();
        let mut sink = ScriptedSink::default()
            .reply(3, Reply::Decline)
            .reply(2, Reply::Decline);
        d.queue(click(5.0, 5.0));

        let report = d.dispatch(&stacked(), &mut sink);
        assert_eq!(sink.order(), vec![3, 2, 1]);
        assert_eq!(report.declined, 2);
        assert_eq!(report.consumed, 1);
    }

    #[test]
    fn failing_receiver_is_skipped() {
        let mut d = InputDispatcher::new();
        let mut sink = ScriptedSink::default().reply(3, Reply::Fail);
        d.queue(click(5.0, 5.0));

        let report = d.dispatch(&stacked(), &mut sink);
        assert_eq!(sink.order(), vec![3, 2]);
        assert_eq!(report.failed, 1);
        assert_eq!(report.consumed, 1);
    }

    #[test]
    fn click_outside_every_region_is_unclaimed() {
        let mut d = InputDispatcher::new();
        let mut sink = ScriptedSink::default();
        d.queue(click(50.0, 50.0));

        let report = d.dispatch(&stacked(), &mut sink);
        assert!(sink.log.is_empty());
        assert_eq!(report.unclaimed, 1);
    }

    #[test]
    fn pointer_is_mapped_into_render_space() {
        let mut d = InputDispatcher::new();
        d.set_pointer_scale(Vec2::new(1280.0, 720.0), Vec2::new(640.0, 360.0));
        let mut sink = ScriptedSink::default();

        // Window (30, 30) is render (15, 15): outside a 10x10 card.
        d.queue(click(30.0, 30.0));
        d.queue(click(10.0, 10.0));

        d.dispatch(&stacked(), &mut sink);
        assert_eq!(sink.order(), vec![3]);
        assert_eq!(sink.log[0].1.pointer, Some(Vec2::new(5.0, 5.0)));
    }

    // ── broadcast routing ──────────────────────────────────────────────────

    #[test]
    fn keys_reach_every_interested_receiver_in_draw_order() {
        let mut d = InputDispatcher::new();
        let mut sink = ScriptedSink::default().reply(1, Reply::Decline);
        let mut receivers = stacked();
        receivers[1].interest = Interest::POINTER;

        d.queue(key(Key::Space));
        let report = d.dispatch(&receivers, &mut sink);

        assert_eq!(sink.order(), vec![1, 3]);
        assert_eq!(report.declined, 1);
        assert_eq!(report.consumed, 1);
    }

    // ── queueing ───────────────────────────────────────────────────────────

    #[test]
    fn bookkeeping_updates_state_without_queueing() {
        let mut d = InputDispatcher::new();
        d.queue(InputEvent::PointerMoved { x: 3.0, y: 4.0 });
        d.queue(InputEvent::Focused(true));

        assert_eq!(d.pending(), 0);
        assert_eq!(d.state().pointer_pos, Some(Vec2::new(3.0, 4.0)));
        assert!(d.state().focused);
    }

    #[test]
    fn queue_is_bounded_by_dropping_oldest() {
        let mut d = InputDispatcher::with_capacity(2);
        d.queue(key(Key::A));
        d.queue(key(Key::B));
        d.queue(key(Key::C));

        assert_eq!(d.pending(), 2);
        assert_eq!(d.overflowed(), 1);

        let mut sink = ScriptedSink::default();
        d.dispatch(&stacked()[..1], &mut sink);
        let keys: Vec<_> = sink
            .log
            .iter()
            .map(|(_, e)| match e.event {
                InputEvent::Key { key, .. } => key,
                _ => Key::Unknown(0),
            })
            .collect();
        assert_eq!(keys, vec![Key::B, Key::C]);
    }
}
