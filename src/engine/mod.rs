//! Routing engine
//!
//! Owns the routes and runs each one on its own thread. The engine is
//! single-use: once stopped, build a new one to start again.

mod reporter;

pub use reporter::{log_snapshot, run_reporter};

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use crate::curve::VelocityCurveConfig;
use crate::error::{Error, Result};
use crate::routing::{
    ChannelControl, ChannelState, ControlRoute, InputStream, MessageTransformer, OutputSink,
    PrimaryRoute, RouteExit, RouteState, SharedOutput, Statistics, StatsSnapshot, StopSignal,
    DEFAULT_CHANNEL, DEFAULT_FILTER_CONTROL, POLL_INTERVAL,
};

/// Everything the engine needs besides its streams.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub curve: VelocityCurveConfig,
    pub channel_control: ChannelControl,
    pub initial_channel: u8,
    pub filter_control: u8,
    /// `None` disables periodic statistics logging
    pub stats_interval: Option<Duration>,
    pub poll_interval: Duration,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        self.curve.validate()?;
        self.channel_control.validate()?;
        ChannelState::new(self.initial_channel)?;
        if self.filter_control > 127 {
            return Err(Error::invalid(format!(
                "filter control must be in 0..=127, got {}",
                self.filter_control
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::invalid("poll interval must be positive"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            curve: VelocityCurveConfig::default(),
            channel_control: ChannelControl::default(),
            initial_channel: DEFAULT_CHANNEL,
            filter_control: DEFAULT_FILTER_CONTROL,
            stats_interval: Some(Duration::from_secs(5)),
            poll_interval: POLL_INTERVAL,
        }
    }
}

/// Clonable handle that stops an engine from anywhere, including a signal
/// handler.
#[derive(Debug, Clone)]
pub struct StopHandle {
    signal: StopSignal,
}

impl StopHandle {
    /// Request a stop. Calling it again does nothing.
    pub fn stop(&self) {
        if self.signal.stop() {
            info!("stop requested");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.signal.is_stopped()
    }
}

struct RouteThread {
    name: &'static str,
    handle: JoinHandle<RouteExit>,
}

/// The velocity routing engine
pub struct Engine {
    config: EngineConfig,
    primary: Option<Box<dyn InputStream>>,
    control: Option<Box<dyn InputStream>>,
    output: SharedOutput,
    channel: ChannelState,
    stats: Arc<Statistics>,
    stop: StopSignal,
    routes: Vec<RouteThread>,
    reporter: Option<JoinHandle<()>>,
    started: bool,
}

impl Engine {
    /// Create an engine reading `primary` and writing to `output`.
    pub fn new<I, O>(config: EngineConfig, primary: I, output: O) -> Result<Self>
    where
        I: InputStream + 'static,
        O: OutputSink + 'static,
    {
        config.validate()?;
        let channel = ChannelState::new(config.initial_channel)?;

        Ok(Self {
            config,
            primary: Some(Box::new(primary)),
            control: None,
            output: SharedOutput::new(output),
            channel,
            stats: Arc::new(Statistics::new()),
            stop: StopSignal::new(),
            routes: Vec::new(),
            reporter: None,
            started: false,
        })
    }

    /// Attach the channel control input. Only valid with
    /// [`ChannelControl::ControlPort`].
    pub fn with_control_input<I: InputStream + 'static>(mut self, input: I) -> Result<Self> {
        if !matches!(self.config.channel_control, ChannelControl::ControlPort { .. }) {
            return Err(Error::invalid(format!(
                "a control input needs the control_port mechanism, configured: {}",
                self.config.channel_control.name()
            )));
        }
        self.control = Some(Box::new(input));
        Ok(self)
    }

    /// Spawn the route threads.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(Error::AlreadyStarted);
        }
        let primary = self.primary.take().ok_or(Error::AlreadyStarted)?;
        self.started = true;

        info!(
            curve = self.config.curve.curve.name(),
            threshold = self.config.curve.threshold,
            channel = self.channel.current(),
            mechanism = self.config.channel_control.name(),
            "starting engine"
        );

        let transformer =
            MessageTransformer::new(self.config.curve.clone(), Arc::clone(&self.stats))
                .with_filter_control(self.config.filter_control);
        let route = PrimaryRoute::new(
            primary,
            self.output.clone(),
            transformer,
            self.channel.clone(),
            self.config.channel_control,
            Arc::clone(&self.stats),
            self.stop.clone(),
        )
        .with_poll_interval(self.config.poll_interval);
        self.spawn_route("primary", move || route.run())?;

        match (self.control.take(), self.config.channel_control) {
            (Some(input), ChannelControl::ControlPort { program_offset }) => {
                let route = ControlRoute::new(
                    input,
                    self.output.clone(),
                    self.channel.clone(),
                    program_offset,
                    Arc::clone(&self.stats),
                    self.stop.clone(),
                )
                .with_filter_control(self.config.filter_control)
                .with_poll_interval(self.config.poll_interval);
                self.spawn_route("control", move || route.run())?;
            }
            (None, ChannelControl::ControlPort { .. }) => {
                warn!("no control input attached, continuing without channel control");
            }
            _ => {}
        }

        if let Some(interval) = self.config.stats_interval {
            let stats = Arc::clone(&self.stats);
            let stop = self.stop.clone();
            let handle = thread::Builder::new()
                .name("stats-reporter".to_string())
                .spawn(move || run_reporter(stats, interval, stop))?;
            self.reporter = Some(handle);
        }

        Ok(())
    }

    fn spawn_route<F>(&mut self, name: &'static str, run: F) -> Result<()>
    where
        F: FnOnce() -> RouteExit + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(format!("{}-route", name))
            .spawn(run)?;
        self.routes.push(RouteThread { name, handle });
        Ok(())
    }

    /// Stop all routes. Safe to call any number of times.
    pub fn stop(&self) {
        self.stop_handle().stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            signal: self.stop.clone(),
        }
    }

    /// True while at least one route is still running.
    pub fn is_running(&self) -> bool {
        self.routes.iter().any(|r| !r.handle.is_finished())
    }

    /// State of each started route.
    pub fn route_states(&self) -> Vec<(&'static str, RouteState)> {
        self.routes
            .iter()
            .map(|r| {
                let state = if r.handle.is_finished() {
                    RouteState::Stopped
                } else {
                    RouteState::Running
                };
                (r.name, state)
            })
            .collect()
    }

    /// Handle to the shared output channel.
    pub fn channel(&self) -> ChannelState {
        self.channel.clone()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Wait for every route to finish, then shut down the reporter.
    ///
    /// Routes finish on their own when their input ends; call
    /// [`stop`](Self::stop) to end them sooner.
    pub fn join(&mut self) -> Vec<(&'static str, RouteExit)> {
        let exits = self
            .routes
            .drain(..)
            .map(|r| {
                let exit = r.handle.join().unwrap_or_else(|_| {
                    RouteExit::Failed(Error::Device(format!("{} route panicked", r.name)))
                });
                (r.name, exit)
            })
            .collect();

        self.stop.stop();
        if let Some(reporter) = self.reporter.take() {
            let _ = reporter.join();
        }
        exits
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop.stop();
        self.join();
    }
}

/// Summarize route exits as an error if any route failed.
pub fn check_exits(exits: &[(&'static str, RouteExit)]) -> anyhow::Result<()> {
    for (name, exit) in exits {
        if let RouteExit::Failed(e) = exit {
            return Err(anyhow::anyhow!("{}", e)).context(format!("{} route failed", name));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::VelocityCurve;
    use crate::midi::MidiMessage;
    use crate::routing::{MemorySink, QueueInput};
    use std::time::Instant;

    fn test_config(curve: VelocityCurve, control: ChannelControl) -> EngineConfig {
        EngineConfig {
            curve: VelocityCurveConfig { curve, threshold: 0 },
            channel_control: control,
            stats_interval: None,
            poll_interval: Duration::from_millis(5),
            ..EngineConfig::default()
        }
    }

    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn test_engine_creation() {
        let (_tx, input) = QueueInput::new("keys");
        let engine = Engine::new(EngineConfig::default(), input, MemorySink::new()).unwrap();
        assert!(!engine.is_running());
        assert_eq!(engine.channel().current(), 1);
        assert_eq!(engine.stats().messages_processed, 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (_tx, input) = QueueInput::new("keys");
        let config = test_config(
            VelocityCurve::Bezier { deviation: 150.0 },
            ChannelControl::Fixed,
        );
        assert!(matches!(
            Engine::new(config, input, MemorySink::new()),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_control_input_requires_control_port() {
        let (_tx, input) = QueueInput::new("keys");
        let (_ctx, control) = QueueInput::new("pads");
        let engine = Engine::new(
            test_config(VelocityCurve::default(), ChannelControl::primary_cc()),
            input,
            MemorySink::new(),
        )
        .unwrap();
        assert!(engine.with_control_input(control).is_err());
    }

    #[test]
    fn test_program_change_routes_notes() {
        let sink = MemorySink::new();
        let (keys, input) = QueueInput::new("keys");
        let (pads, control) = QueueInput::new("pads");
        let mut engine = Engine::new(
            test_config(
                VelocityCurve::Bezier { deviation: -60.0 },
                ChannelControl::control_port(),
            ),
            input,
            sink.clone(),
        )
        .unwrap()
        .with_control_input(control)
        .unwrap();
        engine.start().unwrap();

        pads.send(vec![0xC0, 5]).unwrap();
        let channel = engine.channel();
        assert!(wait_for(|| channel.current() == 4));

        keys.send(vec![0x90, 60, 40]).unwrap();
        assert!(wait_for(|| sink.messages().len() == 1));
        assert_eq!(sink.messages(), vec![MidiMessage::NoteOn(4, 60, 56)]);

        engine.stop();
        let exits = engine.join();
        assert_eq!(exits.len(), 2);
        assert!(exits.iter().all(|(_, e)| matches!(e, RouteExit::Stopped)));
        assert!(check_exits(&exits).is_ok());
    }

    #[test]
    fn test_primary_cc_routes_notes() {
        let sink = MemorySink::new();
        let (keys, input) = QueueInput::new("keys");
        let mut engine = Engine::new(
            test_config(
                VelocityCurve::Bezier { deviation: -60.0 },
                ChannelControl::primary_cc(),
            ),
            input,
            sink.clone(),
        )
        .unwrap();
        engine.start().unwrap();

        keys.send(vec![0xB0, 94, 10]).unwrap();
        keys.send(vec![0x90, 60, 40]).unwrap();
        drop(keys);

        let exits = engine.join();
        assert!(matches!(exits[0], ("primary", RouteExit::StreamEnded)));
        assert_eq!(engine.channel().current(), 10);
        assert_eq!(
            sink.messages(),
            vec![
                MidiMessage::ControlChange(0, 94, 10),
                MidiMessage::NoteOn(10, 60, 56),
            ]
        );
        let stats = engine.stats();
        assert_eq!(stats.messages_processed, 2);
        assert_eq!(stats.velocity_adjustments, 1);
    }

    #[test]
    fn test_start_twice_fails() {
        let (_tx, input) = QueueInput::new("keys");
        let mut engine = Engine::new(
            test_config(VelocityCurve::default(), ChannelControl::Fixed),
            input,
            MemorySink::new(),
        )
        .unwrap();
        engine.start().unwrap();
        assert!(matches!(engine.start(), Err(Error::AlreadyStarted)));
        engine.stop();
        engine.join();
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (_tx, input) = QueueInput::new("keys");
        let mut engine = Engine::new(
            test_config(VelocityCurve::default(), ChannelControl::Fixed),
            input,
            MemorySink::new(),
        )
        .unwrap();
        engine.start().unwrap();
        assert!(engine.is_running());

        let handle = engine.stop_handle();
        handle.stop();
        handle.stop();
        engine.stop();

        let exits = engine.join();
        assert!(matches!(exits[0].1, RouteExit::Stopped));
        assert!(!engine.is_running());
        assert!(handle.is_stopped());
    }

    #[test]
    fn test_route_states_after_stream_end() {
        let (keys, input) = QueueInput::new("keys");
        let mut engine = Engine::new(
            test_config(VelocityCurve::default(), ChannelControl::Fixed),
            input,
            MemorySink::new(),
        )
        .unwrap();
        engine.start().unwrap();
        drop(keys);

        assert!(wait_for(|| !engine.is_running()));
        assert_eq!(engine.route_states(), vec![("primary", RouteState::Stopped)]);
    }

    #[test]
    fn test_control_stream_end_leaves_primary_running() {
        let sink = MemorySink::new();
        let (keys, input) = QueueInput::new("keys");
        let (pads, control) = QueueInput::new("pads");
        let mut engine = Engine::new(
            test_config(VelocityCurve::default(), ChannelControl::control_port()),
            input,
            sink.clone(),
        )
        .unwrap()
        .with_control_input(control)
        .unwrap();
        engine.start().unwrap();

        drop(pads);
        assert!(wait_for(|| engine
            .route_states()
            .contains(&("control", RouteState::Stopped))));

        keys.send(vec![0x90, 60, 90]).unwrap();
        assert!(wait_for(|| sink.messages().len() == 1));
        assert!(engine.route_states().contains(&("primary", RouteState::Running)));

        engine.stop();
        engine.join();
    }

    #[test]
    fn test_check_exits_reports_failure() {
        let exits = vec![
            ("primary", RouteExit::Stopped),
            ("control", RouteExit::Failed(Error::Device("gone".to_string()))),
        ];
        let err = check_exits(&exits).unwrap_err();
        assert!(format!("{:#}", err).contains("control route failed"));
    }
}
