use crate::sim::{Event, SimTime, Simulator, World};
use std::any::Any;
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<&'static str>>>;

#[derive(Default)]
struct Recorder {
    ticks: usize,
    tick_times: Vec<SimTime>,
}

impl World for Recorder {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn on_tick(&mut self, sim: &mut Simulator) {
        self.ticks += 1;
        self.tick_times.push(sim.now());
    }
}

/// 记录名字的事件；`then` 非空时在当前时刻再调度一个
struct Mark {
    name: &'static str,
    then: Option<&'static str>,
    log: Log,
}

impl Event for Mark {
    fn execute(self: Box<Self>, sim: &mut Simulator, _world: &mut dyn World) {
        let Mark { name, then, log } = *self;
        log.lock().expect("log lock").push(name);
        if let Some(next) = then {
            sim.schedule(
                sim.now(),
                Mark {
                    name: next,
                    then: None,
                    log,
                },
            );
        }
    }
}

fn mark(name: &'static str, log: &Log) -> Mark {
    Mark {
        name,
        then: None,
        log: Arc::clone(log),
    }
}

fn names(log: &Log) -> Vec<&'static str> {
    log.lock().expect("log lock").clone()
}

#[test]
fn equal_times_run_in_scheduling_order() {
    let log = Log::default();
    let mut sim = Simulator::default();
    sim.schedule(SimTime::from_millis(10), mark("late-a", &log));
    sim.schedule(SimTime::from_millis(5), mark("early", &log));
    sim.schedule(SimTime::from_millis(10), mark("late-b", &log));

    let mut world = Recorder::default();
    sim.run(&mut world);

    assert_eq!(names(&log), ["early", "late-a", "late-b"]);
    assert_eq!(world.ticks, 3);
    assert_eq!(
        world.tick_times,
        [
            SimTime::from_millis(5),
            SimTime::from_millis(10),
            SimTime::from_millis(10)
        ]
    );
    assert_eq!(sim.events_executed(), 3);
}

#[test]
fn stop_scheduled_at_install_beats_later_timer_at_same_instant() {
    // 应用的停止事件在安装时就入队，之后同一时刻的定时器排在它后面
    let log = Log::default();
    let mut sim = Simulator::default();
    sim.schedule(SimTime::from_secs(2), mark("stop", &log));
    sim.schedule(SimTime::from_secs(1), mark("start", &log));
    let mut world = Recorder::default();
    sim.run_until(SimTime::from_secs(1), &mut world);
    sim.schedule_in(SimTime::from_secs(1), mark("timer", &log));
    sim.run(&mut world);

    assert_eq!(names(&log), ["start", "stop", "timer"]);
}

#[test]
fn event_scheduled_now_from_inside_an_event_runs_next() {
    let log = Log::default();
    let mut sim = Simulator::default();
    sim.schedule(
        SimTime::ZERO,
        Mark {
            name: "first",
            then: Some("follow-up"),
            log: Arc::clone(&log),
        },
    );
    sim.schedule(SimTime::from_nanos(1), mark("later", &log));

    let mut world = Recorder::default();
    sim.run(&mut world);

    assert_eq!(names(&log), ["first", "follow-up", "later"]);
    assert_eq!(sim.now(), SimTime::from_nanos(1));
}

#[test]
fn run_until_is_inclusive_and_advances_clock() {
    let log = Log::default();
    let mut sim = Simulator::default();
    sim.schedule(SimTime::from_millis(5), mark("at-bound", &log));
    sim.schedule(SimTime::from_millis(6), mark("after", &log));

    let mut world = Recorder::default();
    sim.run_until(SimTime::from_millis(5), &mut world);
    assert_eq!(names(&log), ["at-bound"]);
    assert_eq!(sim.pending(), 1);

    sim.run_until(SimTime::from_millis(5), &mut world);
    assert_eq!(sim.now(), SimTime::from_millis(5));

    sim.run(&mut world);
    assert_eq!(names(&log), ["at-bound", "after"]);
    assert_eq!(sim.now(), SimTime::from_millis(6));
}

#[test]
fn empty_queue_still_moves_clock_to_bound() {
    let mut sim = Simulator::default();
    let mut world = Recorder::default();
    sim.run_until(SimTime::from_secs(3), &mut world);
    assert_eq!(sim.now(), SimTime::from_secs(3));
    assert_eq!(world.ticks, 0);
}

#[test]
fn past_times_are_clamped_to_now() {
    let log = Log::default();
    let mut sim = Simulator::default();
    let mut world = Recorder::default();
    sim.run_until(SimTime::from_millis(100), &mut world);

    sim.schedule(SimTime::from_millis(10), mark("stale", &log));
    sim.run(&mut world);

    assert_eq!(names(&log), ["stale"]);
    assert_eq!(world.tick_times, [SimTime::from_millis(100)]);
}

#[test]
fn stop_time_bounds_the_run() {
    let log = Log::default();
    let mut sim = Simulator::default();
    sim.schedule(SimTime::from_secs(1), mark("inside", &log));
    sim.schedule(SimTime::from_secs(11), mark("outside", &log));
    sim.stop_at(SimTime::from_secs(10));

    let mut world = Recorder::default();
    sim.run(&mut world);

    assert_eq!(names(&log), ["inside"]);
    assert_eq!(sim.now(), SimTime::from_secs(10));
    assert_eq!(sim.pending(), 1);
    assert_eq!(sim.events_executed(), 1);
}

#[test]
fn schedule_in_is_relative_to_now() {
    let log = Log::default();
    let mut sim = Simulator::default();
    let mut world = Recorder::default();
    sim.run_until(SimTime::from_millis(5), &mut world);
    sim.schedule_in(SimTime::from_millis(3), mark("relative", &log));
    sim.run(&mut world);

    assert_eq!(names(&log), ["relative"]);
    assert_eq!(sim.now(), SimTime::from_millis(8));
}

#[test]
fn event_label_is_the_short_type_name() {
    let log = Log::default();
    assert_eq!(mark("x", &log).label(), "Mark");
}
