use std::time::Instant;

/// Per-frame values handed to uniform callbacks and frame hooks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    /// Timeline position in milliseconds, `0 <= time < period`.
    pub time: f64,
    /// Milliseconds since the previous tick (0 while paused).
    pub delta: f64,
    pub width: u32,
    pub height: u32,
}

/// Notifications delivered to clock listeners, always one tick late.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    Wrapped,
    Paused,
    Resumed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(ClockEvent)>;

/// Time source for every `timeBegin <= t <= timeEnd` guard.
///
/// Advances by wall-clock delta each [`RenderClock::frame`], wraps at the
/// timeline period and queues a [`ClockEvent::Wrapped`] per wrap. Listeners
/// run at the start of the following tick (or on an explicit
/// [`RenderClock::dispatch_pending`]), never inside the tick that caused them.
pub struct RenderClock {
    time: f64,
    delta: f64,
    period: f64,
    paused: bool,
    /// Wall-clock instant of the previous tick (or of the last resume).
    anchor: Option<Instant>,
    pending: Vec<ClockEvent>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl RenderClock {
    pub fn new(period: f64) -> Self {
        Self {
            time: 0.0,
            delta: 0.0,
            period: period.max(0.0),
            paused: false,
            anchor: None,
            pending: Vec::new(),
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Change the wrap period, renormalizing the current time into it.
    pub fn set_period(&mut self, period: f64) {
        self.period = period.max(0.0);
        self.time = if self.period > 0.0 {
            self.time.rem_euclid(self.period)
        } else {
            0.0
        };
    }

    /// Jump to a timeline position (scrubbing). Does not notify wraps.
    pub fn seek(&mut self, time: f64) {
        self.time = if self.period > 0.0 {
            time.rem_euclid(self.period)
        } else {
            0.0
        };
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.set_paused_at(paused, Instant::now());
    }

    pub fn set_paused_at(&mut self, paused: bool, now: Instant) {
        if paused == self.paused {
            return;
        }
        self.paused = paused;
        if paused {
            self.delta = 0.0;
            self.pending.push(ClockEvent::Paused);
        } else {
            // Re-anchor so the first tick after resume doesn't see the pause.
            self.anchor = Some(now);
            self.pending.push(ClockEvent::Resumed);
        }
    }

    pub fn frame(&mut self) {
        self.frame_at(Instant::now());
    }

    /// Advance to `now`. Delivers the previous tick's notifications first.
    pub fn frame_at(&mut self, now: Instant) {
        self.dispatch_pending();

        if self.paused {
            self.delta = 0.0;
            return;
        }

        self.delta = match self.anchor {
            Some(anchor) => now.saturating_duration_since(anchor).as_secs_f64() * 1000.0,
            None => 0.0,
        };
        self.anchor = Some(now);

        if self.period <= 0.0 {
            // Degenerate timeline: nothing to wrap around.
            self.time = 0.0;
            return;
        }

        self.time += self.delta;
        let mut wraps = 0u32;
        while self.time >= self.period {
            self.time -= self.period;
            wraps += 1;
        }
        if wraps > 0 {
            log::debug!("Clock wrapped {wraps} time(s) at period {:.0}ms", self.period);
            self.pending
                .extend(std::iter::repeat_n(ClockEvent::Wrapped, wraps as usize));
        }
    }

    pub fn on_event(&mut self, listener: impl FnMut(ClockEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Number of notifications queued but not yet delivered.
    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    /// Deliver queued notifications to every listener. Returns how many were delivered.
    pub fn dispatch_pending(&mut self) -> usize {
        let events = std::mem::take(&mut self.pending);
        for event in &events {
            for (_, listener) in &mut self.listeners {
                listener(*event);
            }
        }
        events.len()
    }

    pub fn frame_context(&self, width: u32, height: u32) -> FrameContext {
        FrameContext {
            time: self.time,
            delta: self.delta,
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use super::*;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    fn counting(clock: &mut RenderClock) -> Rc<RefCell<Vec<ClockEvent>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        clock.on_event(move |e| sink.borrow_mut().push(e));
        seen
    }

    #[test]
    fn first_tick_only_anchors() {
        let mut clock = RenderClock::new(1000.0);
        clock.frame_at(Instant::now());
        assert_eq!(clock.time(), 0.0);
        assert_eq!(clock.delta(), 0.0);
    }

    #[test]
    fn advances_by_wall_clock_delta() {
        let start = Instant::now();
        let mut clock = RenderClock::new(1000.0);
        clock.frame_at(start);
        clock.frame_at(start + Duration::from_millis(250));
        assert!(approx_eq(clock.delta(), 250.0, 1e-6));
        assert!(approx_eq(clock.time(), 250.0, 1e-6));
    }

    #[test]
    fn long_tick_wraps_twice_and_defers_notifications() {
        let start = Instant::now();
        let mut clock = RenderClock::new(1000.0);
        let seen = counting(&mut clock);
        clock.frame_at(start);
        clock.frame_at(start + Duration::from_millis(2500));

        assert!(clock.time() >= 0.0 && clock.time() < 1000.0);
        assert!(approx_eq(clock.time(), 500.0, 1e-6));
        // Nothing observable within the tick that wrapped.
        assert!(seen.borrow().is_empty());
        assert_eq!(clock.pending_events(), 2);

        assert_eq!(clock.dispatch_pending(), 2);
        assert_eq!(*seen.borrow(), vec![ClockEvent::Wrapped, ClockEvent::Wrapped]);
    }

    #[test]
    fn next_tick_delivers_previous_wraps() {
        let start = Instant::now();
        let mut clock = RenderClock::new(100.0);
        let seen = counting(&mut clock);
        clock.frame_at(start);
        clock.frame_at(start + Duration::from_millis(150));
        assert!(seen.borrow().is_empty());
        clock.frame_at(start + Duration::from_millis(160));
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn pause_freezes_time_and_delta() {
        let start = Instant::now();
        let mut clock = RenderClock::new(1000.0);
        clock.frame_at(start);
        clock.frame_at(start + Duration::from_millis(100));
        clock.set_paused_at(true, start + Duration::from_millis(100));
        clock.frame_at(start + Duration::from_millis(600));
        assert!(clock.is_paused());
        assert_eq!(clock.delta(), 0.0);
        assert!(approx_eq(clock.time(), 100.0, 1e-6));
    }

    #[test]
    fn resume_reanchors_wall_clock() {
        let start = Instant::now();
        let mut clock = RenderClock::new(10_000.0);
        clock.frame_at(start);
        clock.set_paused_at(true, start);
        clock.set_paused_at(false, start + Duration::from_millis(5000));
        clock.frame_at(start + Duration::from_millis(5016));
        assert!(approx_eq(clock.delta(), 16.0, 1e-6));
        assert!(approx_eq(clock.time(), 16.0, 1e-6));
    }

    #[test]
    fn pause_and_resume_notify_listeners() {
        let mut clock = RenderClock::new(1000.0);
        let seen = counting(&mut clock);
        clock.set_paused(true);
        clock.set_paused(true);
        clock.set_paused(false);
        assert!(seen.borrow().is_empty());
        clock.dispatch_pending();
        assert_eq!(*seen.borrow(), vec![ClockEvent::Paused, ClockEvent::Resumed]);
    }

    #[test]
    fn zero_period_never_advances() {
        let start = Instant::now();
        let mut clock = RenderClock::new(0.0);
        clock.frame_at(start);
        clock.frame_at(start + Duration::from_millis(5000));
        assert_eq!(clock.time(), 0.0);
        assert_eq!(clock.pending_events(), 0);
    }

    #[test]
    fn removed_listener_is_not_called() {
        let start = Instant::now();
        let mut clock = RenderClock::new(10.0);
        let hits = Rc::new(RefCell::new(0));
        let sink = hits.clone();
        let id = clock.on_event(move |_| *sink.borrow_mut() += 1);
        assert!(clock.remove_listener(id));
        clock.frame_at(start);
        clock.frame_at(start + Duration::from_millis(35));
        clock.dispatch_pending();
        assert_eq!(*hits.borrow(), 0);
    }

    #[test]
    fn seek_and_set_period_renormalize() {
        let mut clock = RenderClock::new(1000.0);
        clock.seek(2300.0);
        assert!(approx_eq(clock.time(), 300.0, 1e-9));
        clock.set_period(200.0);
        assert!(approx_eq(clock.time(), 100.0, 1e-9));
        clock.set_period(0.0);
        assert_eq!(clock.time(), 0.0);
    }
}
