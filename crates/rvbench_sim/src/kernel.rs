//! Virtual clock, timed signal events, and edge-task scheduling.
//!
//! [`SimKernel`] owns virtual time. It toggles the clock signal of a
//! [`SimTarget`] every half period, applies scheduled signal writes when
//! their time arrives, and resumes [`EdgeTask`]s on every clock transition.
//!
//! At a given time point the order is fixed:
//!
//! 1. scheduled writes due at that time are applied;
//! 2. the clock signal toggles;
//! 3. edge tasks run, sampling the values present before the edge;
//! 4. the target evaluates the edge.
//!
//! Tasks are borrowed for the duration of a single `advance` call. A task
//! that is not passed to the kernel is simply not resumed, so a bus model's
//! lifetime is whatever scope its owner gives it.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rvbench_common::LogicVec;
use tracing::trace;

use crate::error::SimError;
use crate::signal::{ClockEdge, SignalHandle, SimTarget};
use crate::time::SimTime;
use crate::waveform::WaveformRecorder;

/// A unit of harness behaviour resumed on every clock edge.
///
/// Bus slave models implement this; the kernel calls [`on_edge`] after the
/// clock signal has toggled and before the target evaluates the edge.
///
/// [`on_edge`]: EdgeTask::on_edge
pub trait EdgeTask {
    /// Error type of the task. Kernel failures convert into it.
    type Error: From<SimError>;

    /// Reacts to a clock transition at time `now`.
    fn on_edge(
        &mut self,
        edge: ClockEdge,
        now: SimTime,
        target: &mut dyn SimTarget,
    ) -> Result<(), Self::Error>;
}

impl EdgeTask for () {
    type Error = SimError;

    fn on_edge(&mut self, _: ClockEdge, _: SimTime, _: &mut dyn SimTarget) -> Result<(), SimError> {
        Ok(())
    }
}

impl<T: EdgeTask + ?Sized> EdgeTask for &mut T {
    type Error = T::Error;

    fn on_edge(
        &mut self,
        edge: ClockEdge,
        now: SimTime,
        target: &mut dyn SimTarget,
    ) -> Result<(), Self::Error> {
        (**self).on_edge(edge, now, target)
    }
}

impl<T: EdgeTask> EdgeTask for [T] {
    type Error = T::Error;

    fn on_edge(
        &mut self,
        edge: ClockEdge,
        now: SimTime,
        target: &mut dyn SimTarget,
    ) -> Result<(), Self::Error> {
        for task in self.iter_mut() {
            task.on_edge(edge, now, target)?;
        }
        Ok(())
    }
}

impl<T: EdgeTask> EdgeTask for Vec<T> {
    type Error = T::Error;

    fn on_edge(
        &mut self,
        edge: ClockEdge,
        now: SimTime,
        target: &mut dyn SimTarget,
    ) -> Result<(), Self::Error> {
        self.as_mut_slice().on_edge(edge, now, target)
    }
}

/// A signal write scheduled for a future time.
#[derive(Debug, Clone)]
struct SimEvent {
    time: SimTime,
    /// Insertion order; events at the same time apply first-in first-out.
    seq: u64,
    signal: SignalHandle,
    value: LogicVec,
}

impl PartialEq for SimEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for SimEvent {}

impl PartialOrd for SimEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.time, self.seq).cmp(&(other.time, other.seq))
    }
}

/// The virtual-clock scheduler.
///
/// The clock starts low at time zero; the first transition, half a period
/// later, is a rising edge.
pub struct SimKernel {
    current_time: SimTime,
    event_queue: BinaryHeap<Reverse<SimEvent>>,
    next_seq: u64,
    clock: SignalHandle,
    half_period: SimTime,
    clock_high: bool,
    next_edge: SimTime,
    edge_count: u64,
    recorder: Option<Box<dyn WaveformRecorder>>,
    traced: Vec<(SignalHandle, Option<LogicVec>)>,
}

impl SimKernel {
    /// Creates a kernel driving `clock` with the given period.
    ///
    /// The period must be a non-zero even number of femtoseconds. The clock
    /// signal is driven low immediately.
    pub fn new(
        target: &mut dyn SimTarget,
        clock: SignalHandle,
        period: SimTime,
    ) -> Result<Self, SimError> {
        if period.fs < 2 || period.fs % 2 != 0 {
            return Err(SimError::InvalidClock {
                reason: format!("period {period} is not a positive even number of femtoseconds"),
            });
        }
        let width = target.width(clock)?;
        if width != 1 {
            return Err(SimError::InvalidClock {
                reason: format!("clock '{}' is {width} bits wide", target.name(clock)),
            });
        }
        target.write(clock, LogicVec::from_bool(false))?;
        let half_period = SimTime::from_fs(period.fs / 2);
        Ok(Self {
            current_time: SimTime::ZERO,
            event_queue: BinaryHeap::new(),
            next_seq: 0,
            clock,
            half_period,
            clock_high: false,
            next_edge: half_period,
            edge_count: 0,
            recorder: None,
            traced: Vec::new(),
        })
    }

    /// Returns the current simulation time.
    pub fn current_time(&self) -> SimTime {
        self.current_time
    }

    /// Returns the clock period.
    pub fn period(&self) -> SimTime {
        self.half_period + self.half_period
    }

    /// Returns how many clock transitions have occurred.
    pub fn edge_count(&self) -> u64 {
        self.edge_count
    }

    /// Returns the time of the next clock transition.
    pub fn next_edge_time(&self) -> SimTime {
        self.next_edge
    }

    /// Schedules `value` to be written to `signal` at `time`.
    ///
    /// Times in the past are applied at the current time.
    pub fn schedule_event(&mut self, time: SimTime, signal: SignalHandle, value: LogicVec) {
        let time = time.max(self.current_time);
        self.event_queue.push(Reverse(SimEvent {
            time,
            seq: self.next_seq,
            signal,
            value,
        }));
        self.next_seq += 1;
    }

    /// Drives `value` onto `signal` at the current time.
    pub fn drive(
        &mut self,
        target: &mut dyn SimTarget,
        signal: SignalHandle,
        value: LogicVec,
    ) -> Result<(), SimError> {
        target.write(signal, value)?;
        self.sample_traced(target)
    }

    /// Advances time by `duration`.
    pub fn run_for<T: EdgeTask + ?Sized>(
        &mut self,
        target: &mut dyn SimTarget,
        tasks: &mut T,
        duration: SimTime,
    ) -> Result<(), T::Error> {
        let until = self.current_time + duration;
        self.advance(target, tasks, until)
    }

    /// Advances time up to and including the next edge of the given kind,
    /// returning the time of that edge.
    pub fn run_until_edge<T: EdgeTask + ?Sized>(
        &mut self,
        target: &mut dyn SimTarget,
        tasks: &mut T,
        edge: ClockEdge,
    ) -> Result<SimTime, T::Error> {
        let upcoming = if self.clock_high {
            ClockEdge::Falling
        } else {
            ClockEdge::Rising
        };
        let at = if upcoming == edge {
            self.next_edge
        } else {
            self.next_edge + self.half_period
        };
        self.advance(target, tasks, at)?;
        Ok(at)
    }

    /// Processes every event and clock edge up to and including `until`,
    /// then sets the current time to `until`.
    pub fn advance<T: EdgeTask + ?Sized>(
        &mut self,
        target: &mut dyn SimTarget,
        tasks: &mut T,
        until: SimTime,
    ) -> Result<(), T::Error> {
        if until < self.current_time {
            return Ok(());
        }
        loop {
            let point = match self.event_queue.peek() {
                Some(Reverse(event)) if event.time < self.next_edge => event.time,
                _ => self.next_edge,
            };
            if point > until {
                break;
            }
            self.current_time = point;
            self.apply_due_events(target)?;
            if point == self.next_edge {
                self.toggle_clock(target, tasks)?;
            }
            self.sample_traced(target)?;
        }
        self.current_time = until;
        Ok(())
    }

    /// Starts recording `signals` into `recorder`, beginning with their
    /// current values.
    pub fn trace(
        &mut self,
        target: &dyn SimTarget,
        mut recorder: Box<dyn WaveformRecorder>,
        signals: &[SignalHandle],
    ) -> Result<(), SimError> {
        recorder.begin_scope("bench")?;
        for &handle in signals {
            recorder.register_signal(handle, &target.name(handle), target.width(handle)?)?;
        }
        recorder.end_scope()?;
        self.traced = signals.iter().map(|&h| (h, None)).collect();
        self.recorder = Some(recorder);
        self.sample_traced(target)
    }

    /// Flushes and detaches the waveform recorder, if any.
    pub fn finish(&mut self) -> Result<(), SimError> {
        if let Some(mut recorder) = self.recorder.take() {
            recorder.finalize()?;
        }
        self.traced.clear();
        Ok(())
    }

    fn apply_due_events(&mut self, target: &mut dyn SimTarget) -> Result<(), SimError> {
        while let Some(Reverse(event)) = self.event_queue.peek() {
            if event.time > self.current_time {
                break;
            }
            if let Some(Reverse(event)) = self.event_queue.pop() {
                target.write(event.signal, event.value)?;
            }
        }
        Ok(())
    }

    fn toggle_clock<T: EdgeTask + ?Sized>(
        &mut self,
        target: &mut dyn SimTarget,
        tasks: &mut T,
    ) -> Result<(), T::Error> {
        self.clock_high = !self.clock_high;
        let edge = if self.clock_high {
            ClockEdge::Rising
        } else {
            ClockEdge::Falling
        };
        target.write(self.clock, LogicVec::from_bool(self.clock_high))?;
        tasks.on_edge(edge, self.current_time, target)?;
        target.eval_edge(edge)?;
        self.edge_count += 1;
        self.next_edge = self.next_edge + self.half_period;
        trace!(time = %self.current_time, %edge, "clock edge");
        Ok(())
    }

    fn sample_traced(&mut self, target: &dyn SimTarget) -> Result<(), SimError> {
        let Some(recorder) = self.recorder.as_mut() else {
            return Ok(());
        };
        for (handle, last) in &mut self.traced {
            let value = target.read(*handle)?;
            if last.as_ref() != Some(&value) {
                recorder.record_change(self.current_time.fs, *handle, &value)?;
                *last = Some(value);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalTable;
    use crate::waveform::VcdRecorder;
    use std::fs::File;
    use std::io::BufWriter;

    struct Bench {
        table: SignalTable,
        evaluated: Vec<ClockEdge>,
    }

    impl Bench {
        fn new() -> Self {
            let mut table = SignalTable::new();
            table.add("clk", 1);
            table.add("rst", 1);
            table.add("count", 8);
            Self {
                table,
                evaluated: Vec::new(),
            }
        }

        fn h(&self, name: &str) -> SignalHandle {
            self.table.resolve(name).unwrap()
        }
    }

    impl SimTarget for Bench {
        fn resolve(&self, name: &str) -> Result<SignalHandle, SimError> {
            self.table.resolve(name)
        }
        fn width(&self, handle: SignalHandle) -> Result<u32, SimError> {
            self.table.width(handle)
        }
        fn name(&self, handle: SignalHandle) -> String {
            self.table.name(handle).unwrap_or("?").to_string()
        }
        fn read(&self, handle: SignalHandle) -> Result<LogicVec, SimError> {
            self.table.get(handle).cloned()
        }
        fn write(&mut self, handle: SignalHandle, value: LogicVec) -> Result<(), SimError> {
            self.table.set(handle, value)
        }
        fn read_register(&self, _index: u8) -> Result<LogicVec, SimError> {
            Ok(LogicVec::new(32))
        }
        fn eval_edge(&mut self, edge: ClockEdge) -> Result<(), SimError> {
            if edge == ClockEdge::Rising {
                let count = self.h("count");
                let next = self.table.get_u64(count).unwrap_or(0) + 1;
                self.table.set_u64(count, next)?;
            }
            self.evaluated.push(edge);
            Ok(())
        }
    }

    /// Records what it sees at each edge.
    struct Watcher {
        signal: SignalHandle,
        seen: Vec<(ClockEdge, u64, Option<u64>)>,
    }

    impl EdgeTask for Watcher {
        type Error = SimError;

        fn on_edge(
            &mut self,
            edge: ClockEdge,
            now: SimTime,
            target: &mut dyn SimTarget,
        ) -> Result<(), SimError> {
            self.seen.push((edge, now.fs, target.read_u64(self.signal)?));
            Ok(())
        }
    }

    fn kernel(bench: &mut Bench) -> SimKernel {
        let clk = bench.h("clk");
        SimKernel::new(bench, clk, SimTime::from_ns(10)).unwrap()
    }

    #[test]
    fn clock_starts_low_and_rises_first() {
        let mut bench = Bench::new();
        let mut k = kernel(&mut bench);
        assert_eq!(bench.table.get_u64(bench.h("clk")), Some(0));
        k.run_for(&mut bench, &mut (), SimTime::from_ns(5)).unwrap();
        assert_eq!(bench.evaluated, vec![ClockEdge::Rising]);
        assert_eq!(bench.table.get_u64(bench.h("clk")), Some(1));
        k.run_for(&mut bench, &mut (), SimTime::from_ns(25)).unwrap();
        assert_eq!(k.edge_count(), 6);
        assert_eq!(k.current_time(), SimTime::from_ns(30));
        assert_eq!(k.period(), SimTime::from_ns(10));
    }

    #[test]
    fn tasks_sample_before_target_evaluates() {
        let mut bench = Bench::new();
        let mut k = kernel(&mut bench);
        let mut watcher = Watcher {
            signal: bench.h("count"),
            seen: Vec::new(),
        };
        k.run_for(&mut bench, &mut watcher, SimTime::from_ns(20))
            .unwrap();
        assert_eq!(
            watcher.seen,
            vec![
                (ClockEdge::Rising, 5_000_000, Some(0)),
                (ClockEdge::Falling, 10_000_000, Some(1)),
                (ClockEdge::Rising, 15_000_000, Some(1)),
                (ClockEdge::Falling, 20_000_000, Some(2)),
            ]
        );
    }

    #[test]
    fn scheduled_events_apply_before_coincident_edge() {
        let mut bench = Bench::new();
        let mut k = kernel(&mut bench);
        let rst = bench.h("rst");
        k.schedule_event(SimTime::from_ns(5), rst, LogicVec::from_bool(true));
        k.schedule_event(SimTime::from_ns(7), rst, LogicVec::from_bool(false));
        let mut watcher = Watcher {
            signal: rst,
            seen: Vec::new(),
        };
        k.run_for(&mut bench, &mut watcher, SimTime::from_ns(6))
            .unwrap();
        assert_eq!(watcher.seen, vec![(ClockEdge::Rising, 5_000_000, Some(1))]);
        k.run_for(&mut bench, &mut watcher, SimTime::from_ns(1))
            .unwrap();
        assert_eq!(bench.table.get_u64(rst), Some(0));
    }

    #[test]
    fn same_time_events_apply_in_order() {
        let mut bench = Bench::new();
        let mut k = kernel(&mut bench);
        let count = bench.h("count");
        k.schedule_event(SimTime::from_ns(2), count, LogicVec::from_u64(7, 8));
        k.schedule_event(SimTime::from_ns(2), count, LogicVec::from_u64(9, 8));
        k.run_for(&mut bench, &mut (), SimTime::from_ns(3)).unwrap();
        assert_eq!(bench.table.get_u64(count), Some(9));
    }

    #[test]
    fn run_until_edge_lands_on_requested_kind() {
        let mut bench = Bench::new();
        let mut k = kernel(&mut bench);
        let t = k
            .run_until_edge(&mut bench, &mut (), ClockEdge::Falling)
            .unwrap();
        assert_eq!(t, SimTime::from_ns(10));
        let t = k
            .run_until_edge(&mut bench, &mut (), ClockEdge::Falling)
            .unwrap();
        assert_eq!(t, SimTime::from_ns(20));
        let t = k
            .run_until_edge(&mut bench, &mut (), ClockEdge::Rising)
            .unwrap();
        assert_eq!(t, SimTime::from_ns(25));
        assert_eq!(k.current_time(), t);
    }

    #[test]
    fn task_collections_all_run() {
        let mut bench = Bench::new();
        let mut k = kernel(&mut bench);
        let count = bench.h("count");
        let mut watchers = vec![
            Watcher {
                signal: count,
                seen: Vec::new(),
            },
            Watcher {
                signal: count,
                seen: Vec::new(),
            },
        ];
        k.run_for(&mut bench, &mut watchers, SimTime::from_ns(10))
            .unwrap();
        assert!(watchers.iter().all(|w| w.seen.len() == 2));
    }

    #[test]
    fn rejects_bad_period() {
        let mut bench = Bench::new();
        let clk = bench.h("clk");
        assert!(matches!(
            SimKernel::new(&mut bench, clk, SimTime::from_fs(3)),
            Err(SimError::InvalidClock { .. })
        ));
        let count = bench.h("count");
        assert!(matches!(
            SimKernel::new(&mut bench, count, SimTime::from_ns(10)),
            Err(SimError::InvalidClock { .. })
        ));
    }

    #[test]
    fn traces_to_vcd() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.vcd");
        let mut bench = Bench::new();
        let mut k = kernel(&mut bench);
        let handles = [bench.h("clk"), bench.h("count")];
        let recorder = VcdRecorder::new(BufWriter::new(File::create(&path).unwrap()));
        k.trace(&bench, Box::new(recorder), &handles).unwrap();
        k.run_for(&mut bench, &mut (), SimTime::from_ns(10)).unwrap();
        k.finish().unwrap();
        let vcd = std::fs::read_to_string(&path).unwrap();
        assert!(vcd.contains("$var wire 1 ! clk $end"));
        assert!(vcd.contains("$var wire 8 \" count $end"));
        assert!(vcd.contains("#5000000"));
        assert!(vcd.contains("b00000001 \""));
    }
}
