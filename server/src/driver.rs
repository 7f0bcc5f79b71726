use shared::{tick_period, Frame, GenerationReport, NeuralNet, SimConfig, SimStats};
use sim::{SimError, Simulation, StepOutcome};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Generations kept in the stats history
const HISTORY_LEN: usize = 256;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("tick rate must be positive with a representable period (got {0})")]
    InvalidTickRate(f64),

    #[error(transparent)]
    Sim(#[from] SimError),
}

/// Owns the simulation and schedules its ticks.
///
/// Ticks never overlap: a single task runs them back to back on an
/// interval. Readers only ever see the frame of the last completed tick.
#[derive(Clone)]
pub struct Driver {
    inner: Arc<Mutex<DriverInner>>,
    frame: Arc<RwLock<Frame>>,
    schedule: Arc<Mutex<Option<Schedule>>>,
}

struct DriverInner {
    sim: Simulation<NeuralNet>,
    tick_rate: f64,
    period: Duration,
    history: VecDeque<GenerationReport>,
    best_age_ever: u64,
}

struct Schedule {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Driver {
    pub fn new(config: SimConfig, seed: Option<u64>) -> Result<Self, DriverError> {
        let tick_rate = config.tick_rate;
        let sim = match seed {
            Some(seed) => Simulation::with_seed(config, seed)?,
            None => Simulation::new(config)?,
        };
        let period = tick_period(tick_rate).ok_or(DriverError::InvalidTickRate(tick_rate))?;
        let frame = sim.snapshot();

        Ok(Self {
            inner: Arc::new(Mutex::new(DriverInner {
                sim,
                tick_rate,
                period,
                history: VecDeque::with_capacity(HISTORY_LEN),
                best_age_ever: 0,
            })),
            frame: Arc::new(RwLock::new(frame)),
            schedule: Arc::new(Mutex::new(None)),
        })
    }

    /// Begin scheduling ticks at the current rate. No-op if already running.
    pub async fn start(&self) {
        let mut schedule = self.schedule.lock().await;
        if schedule.as_ref().is_some_and(|s| !s.handle.is_finished()) {
            return;
        }

        let (tick_rate, period) = {
            let inner = self.inner.lock().await;
            (inner.tick_rate, inner.period)
        };
        let (stop, mut stop_rx) = oneshot::channel();
        let driver = self.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = interval.tick() => {
                        if let Err(e) = driver.tick_once().await {
                            tracing::error!("Simulation halted: {}", e);
                            break;
                        }
                    }
                }
            }
        });

        tracing::info!("Tick schedule started at {} ticks/s", tick_rate);
        *schedule = Some(Schedule { stop, handle });
    }

    /// Stop scheduling ticks and wait for the tick task to exit
    pub async fn stop(&self) {
        let Some(schedule) = self.schedule.lock().await.take() else {
            return;
        };

        // the task may already have exited on its own
        let _ = schedule.stop.send(());
        if let Err(e) = schedule.handle.await {
            tracing::error!("Tick task failed: {}", e);
        }
        tracing::info!("Tick schedule stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.schedule
            .lock()
            .await
            .as_ref()
            .is_some_and(|s| !s.handle.is_finished())
    }

    /// Restart from generation zero with fresh controllers
    pub async fn reinitialize(&self) {
        let mut inner = self.inner.lock().await;
        inner.sim.reinitialize();
        inner.history.clear();
        inner.best_age_ever = 0;
        let frame = inner.sim.snapshot();
        drop(inner);

        *self.frame.write().await = frame;
        tracing::info!("Simulation reinitialized");
    }

    /// Change the tick rate: stop, optionally reinitialize, restart
    pub async fn set_tick_rate(&self, tick_rate: f64, reinitialize: bool) -> Result<(), DriverError> {
        let period = tick_period(tick_rate).ok_or(DriverError::InvalidTickRate(tick_rate))?;

        let was_running = self.is_running().await;
        self.stop().await;
        if reinitialize {
            self.reinitialize().await;
        }
        {
            let mut inner = self.inner.lock().await;
            inner.tick_rate = tick_rate;
            inner.period = period;
        }
        tracing::info!("Tick rate set to {} ticks/s", tick_rate);

        if was_running {
            self.start().await;
        }
        Ok(())
    }

    /// Run exactly one tick and publish its frame
    pub async fn tick_once(&self) -> Result<(), DriverError> {
        let mut inner = self.inner.lock().await;
        if let StepOutcome::Extinct(report) = inner.sim.step()? {
            inner.best_age_ever = inner.best_age_ever.max(report.best_age);
            if inner.history.len() == HISTORY_LEN {
                inner.history.pop_front();
            }
            inner.history.push_back(report);
        }
        let frame = inner.sim.snapshot();
        drop(inner);

        *self.frame.write().await = frame;
        Ok(())
    }

    /// Frame of the last completed tick
    pub async fn frame(&self) -> Frame {
        self.frame.read().await.clone()
    }

    pub async fn stats(&self) -> SimStats {
        let running = self.is_running().await;
        let inner = self.inner.lock().await;

        SimStats {
            generation: inner.sim.generation(),
            tick: inner.sim.tick(),
            live_agents: inner.sim.agents().len(),
            tick_rate: inner.tick_rate,
            running,
            best_age_ever: inner.best_age_ever,
            history: inner.history.iter().cloned().collect(),
        }
    }
}
