//! Frame scheduling seam.
//!
//! A visualiser never blocks or spawns. It asks its [`FrameHost`] for the
//! next display refresh or for a timer, and the host later calls back with a
//! [`Wake`] naming which request fired.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::time::Duration;

/// Identifies a pending animation-frame request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameRequestId(pub u64);

/// Identifies a pending timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

/// A scheduled callback coming due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    AnimationFrame(FrameRequestId),
    Timer(TimerId),
}

/// Scheduling and environment capabilities of the host.
///
/// Methods take `&self` because hosts are shared between everything that
/// renders into them, the way a browser window is.
pub trait FrameHost {
    /// Requests a wake-up at the next display refresh.
    fn request_animation_frame(&self) -> FrameRequestId;

    fn cancel_animation_frame(&self, id: FrameRequestId);

    /// Requests a wake-up once `delay` has elapsed.
    fn set_timeout(&self, delay: Duration) -> TimerId;

    fn clear_timeout(&self, id: TimerId);

    /// Physical pixels per CSS pixel.
    fn device_pixel_ratio(&self) -> f64 {
        1.0
    }
}

/// Receives wake-ups from a host.
pub trait WakeHandler {
    fn handle_wake(&mut self, wake: Wake);
}

/// Default refresh interval of [`HeadlessHost`], 60 Hz.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_nanos(16_666_667);

/// Deterministic host with a virtual clock.
///
/// Animation frames fire on a fixed refresh grid, timers at `now + delay`.
/// Nothing happens until [`HeadlessHost::advance`] moves the clock.
#[derive(Debug)]
pub struct HeadlessHost {
    refresh_interval: Duration,
    device_pixel_ratio: f64,
    now: Cell<Duration>,
    next_id: Cell<u64>,
    // keyed by (due time, id) so equal deadlines fire in request order
    queue: RefCell<BTreeMap<(Duration, u64), Wake>>,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::with_refresh(DEFAULT_REFRESH_INTERVAL, 1.0)
    }

    pub fn with_refresh(refresh_interval: Duration, device_pixel_ratio: f64) -> Self {
        Self {
            refresh_interval: refresh_interval.max(Duration::from_nanos(1)),
            device_pixel_ratio,
            now: Cell::new(Duration::ZERO),
            next_id: Cell::new(0),
            queue: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn now(&self) -> Duration {
        self.now.get()
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Moves the clock forward by `by`, delivering every wake-up that comes
    /// due, in time order, to `handler`. Wake-ups scheduled while advancing
    /// are delivered too if they fall inside the window.
    pub fn advance(&self, by: Duration, handler: &mut dyn WakeHandler) {
        let target = self.now.get().saturating_add(by);
        loop {
            let next = {
                let mut queue = self.queue.borrow_mut();
                match queue.keys().next().copied() {
                    Some(key) if key.0 <= target => queue.remove(&key).map(|wake| (key.0, wake)),
                    _ => None,
                }
            };

            let Some((due, wake)) = next else { break };
            self.now.set(due);
            handler.handle_wake(wake);
        }
        self.now.set(target);
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn next_refresh(&self) -> Duration {
        let interval = self.refresh_interval.as_nanos();
        let now = self.now.get().as_nanos();
        let ticks = now / interval + 1;
        Duration::from_nanos((ticks * interval) as u64)
    }

    fn remove(&self, wake: Wake) {
        self.queue.borrow_mut().retain(|_, queued| *queued != wake);
    }
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameHost for HeadlessHost {
    fn request_animation_frame(&self) -> FrameRequestId {
        let id = self.next_id();
        let due = self.next_refresh();
        self.queue
            .borrow_mut()
            .insert((due, id), Wake::AnimationFrame(FrameRequestId(id)));
        FrameRequestId(id)
    }

    fn cancel_animation_frame(&self, id: FrameRequestId) {
        self.remove(Wake::AnimationFrame(id));
    }

    fn set_timeout(&self, delay: Duration) -> TimerId {
        let id = self.next_id();
        let due = self.now.get().saturating_add(delay);
        self.queue
            .borrow_mut()
            .insert((due, id), Wake::Timer(TimerId(id)));
        TimerId(id)
    }

    fn clear_timeout(&self, id: TimerId) {
        self.remove(Wake::Timer(id));
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log(Vec<(Duration, Wake)>, Option<std::rc::Rc<HeadlessHost>>);

    impl WakeHandler for Log {
        fn handle_wake(&mut self, wake: Wake) {
            let now = self.1.as_ref().map(|host| host.now()).unwrap_or_default();
            self.0.push((now, wake));
        }
    }

    #[test]
    fn frames_land_on_refresh_grid() {
        let host = std::rc::Rc::new(HeadlessHost::with_refresh(Duration::from_millis(10), 1.0));
        let mut log = Log(Vec::new(), Some(host.clone()));

        host.advance(Duration::from_millis(3), &mut log);
        let frame = host.request_animation_frame();
        host.advance(Duration::from_millis(20), &mut log);

        assert_eq!(log.0, vec![(Duration::from_millis(10), Wake::AnimationFrame(frame))]);
        assert_eq!(host.now(), Duration::from_millis(23));
    }

    #[test]
    fn timers_fire_in_order_and_can_be_cleared() {
        let host = std::rc::Rc::new(HeadlessHost::new());
        let mut log = Log(Vec::new(), Some(host.clone()));

        let late = host.set_timeout(Duration::from_millis(50));
        let early = host.set_timeout(Duration::from_millis(5));
        let cleared = host.set_timeout(Duration::from_millis(7));
        host.clear_timeout(cleared);
        host.advance(Duration::from_millis(100), &mut log);

        let wakes: Vec<Wake> = log.0.iter().map(|(_, wake)| *wake).collect();
        assert_eq!(wakes, vec![Wake::Timer(early), Wake::Timer(late)]);
        assert_eq!(host.pending(), 0);
    }

    #[test]
    fn cancelled_frames_never_fire() {
        let host = HeadlessHost::new();
        let mut log = Log::default();
        let frame = host.request_animation_frame();
        host.cancel_animation_frame(frame);
        host.advance(Duration::from_secs(1), &mut log);
        assert!(log.0.is_empty());
    }

    #[test]
    fn far_future_timers_saturate_instead_of_overflowing() {
        let host = HeadlessHost::new();
        let mut log = Log::default();
        host.advance(Duration::from_secs(1), &mut log);

        let timer = host.set_timeout(Duration::MAX);
        host.advance(Duration::from_secs(3600), &mut log);
        assert!(log.0.is_empty());
        assert_eq!(host.pending(), 1);

        host.advance(Duration::MAX, &mut log);
        assert_eq!(log.0, vec![(Duration::ZERO, Wake::Timer(timer))]);
        assert_eq!(host.now(), Duration::MAX);
    }
}
