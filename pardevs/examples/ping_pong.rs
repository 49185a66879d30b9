//! Two players exchanging a ball inside a coupled model, driven by a
//! minimal external event queue.
//!
//! ```text
//!            ┌────────────────────────────────────┐
//!            │ court                              │
//!            │  ┌────────┐ tx        rx ┌────────┐│
//!            │  │        ├────────────▶│        ││
//!            │  │  ping  │              │  pong  ││
//!            │  │        │◀────────────┤        ││
//!            │  └────────┘ rx        tx └────────┘│
//!            └────────────────────────────────────┘
//! ```
//!
//! The event queue implements the [`Scheduler`] boundary: the engine
//! requests internal transitions at absolute times and the queue fires them
//! back through `process_internal` in chronological order.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pardevs::model::{Atomic, OutputBag, ReportsState, StateField};
use pardevs::observer::StateBuffer;
use pardevs::ports::Message;
use pardevs::schedule::{EventKey, Scheduler};
use pardevs::simulation::{ModelId, Simulation};
use pardevs::time::{MonotonicTime, TimeAdvance};

#[derive(Copy, Clone, Debug)]
struct Ball;

/// A player holds the ball for a fixed time, then returns it.
struct Player {
    has_ball: bool,
    hold: Duration,
    returned: u64,
}

impl Player {
    fn new(hold: Duration) -> Self {
        Self {
            has_ball: false,
            hold,
            returned: 0,
        }
    }
}

impl ReportsState for Player {
    fn state_fields(&self) -> Vec<StateField> {
        vec![StateField::new("returned", self.returned)]
    }
}

impl Atomic for Player {
    fn time_advance(&self) -> TimeAdvance {
        if self.has_ball {
            TimeAdvance::new(self.hold)
        } else {
            TimeAdvance::INFINITY
        }
    }

    fn delta_internal(&mut self) {
        self.has_ball = false;
        self.returned += 1;
    }

    fn output(&mut self, output: &mut OutputBag) {
        output.push("tx", Ball);
    }

    fn delta_external(&mut self, _elapsed: Duration, _port: &str, _value: &dyn Message) {
        self.has_ball = true;
    }
}

/// A minimal chronological event queue implementing the scheduler boundary.
struct EventQueue {
    now: Mutex<MonotonicTime>,
    queue: Mutex<BinaryHeap<Reverse<(MonotonicTime, u64)>>>,
    targets: Mutex<HashMap<u64, ModelId>>,
    cancelled: Mutex<HashSet<u64>>,
    next_key: AtomicU64,
}

impl EventQueue {
    fn new() -> Self {
        Self {
            now: Mutex::new(MonotonicTime::EPOCH),
            queue: Mutex::new(BinaryHeap::new()),
            targets: Mutex::new(HashMap::new()),
            cancelled: Mutex::new(HashSet::new()),
            next_key: AtomicU64::new(0),
        }
    }

    /// Pops the next live event, advancing the clock to its timestamp.
    fn pop(&self) -> Option<(MonotonicTime, ModelId)> {
        let mut queue = self.queue.lock().unwrap();
        while let Some(Reverse((at, key))) = queue.pop() {
            if self.cancelled.lock().unwrap().remove(&key) {
                continue;
            }
            let model = self.targets.lock().unwrap().remove(&key).unwrap();
            *self.now.lock().unwrap() = at;
            return Some((at, model));
        }

        None
    }
}

impl Scheduler for EventQueue {
    fn schedule_internal(&self, model: ModelId, at: MonotonicTime) -> EventKey {
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);
        self.queue.lock().unwrap().push(Reverse((at, key)));
        self.targets.lock().unwrap().insert(key, model);

        EventKey::new(key)
    }

    fn cancel(&self, key: EventKey) {
        self.cancelled.lock().unwrap().insert(key.raw());
    }

    fn now(&self) -> MonotonicTime {
        *self.now.lock().unwrap()
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let queue = Arc::new(EventQueue::new());
    let mut simu = Simulation::new(queue.clone());

    // Court assembly.
    let court = simu.add_coupled("court", None)?;
    let ping = simu.add_atomic(Player::new(Duration::from_secs(1)), "ping", Some(court))?;
    let pong = simu.add_atomic(Player::new(Duration::from_secs(2)), "pong", Some(court))?;
    let ping_rx = simu.add_input_port::<Ball>(ping, "rx")?;
    let ping_tx = simu.add_output_port::<Ball>(ping, "tx")?;
    let pong_rx = simu.add_input_port::<Ball>(pong, "rx")?;
    let pong_tx = simu.add_output_port::<Ball>(pong, "tx")?;
    simu.add_internal_coupling(ping_tx, pong_rx)?;
    simu.add_internal_coupling(pong_tx, ping_rx)?;

    let updates = StateBuffer::with_capacity(64);
    simu.subscribe(court, Arc::new(updates.writer()))?;

    // Serve to ping and arm its return.
    simu.receive(ping_rx, &Ball, MonotonicTime::EPOCH)?;
    simu.rearm_internal(ping)?;

    // Play five volleys: returns at t=1 (ping), 3 (pong), 4, 6 and 7.
    let mut last = MonotonicTime::EPOCH;
    for _ in 0..5 {
        let (at, model) = queue.pop().expect("the rally died out");
        simu.process_internal(model)?;
        // The receiving player now holds the ball: resume its schedule.
        simu.rearm_internal(ping)?;
        simu.rearm_internal(pong)?;
        last = at;
    }

    for update in updates {
        println!(
            "{}: {} = {:?}",
            update.model(),
            update.field(),
            update.value()
        );
    }
    assert_eq!(last, MonotonicTime::EPOCH + Duration::from_secs(7));

    Ok(())
}
