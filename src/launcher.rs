//! Starting the worker process with its environment.

use crate::{Environment, LaunchConfig, LaunchSection, LauncherError, WorkerIdentity};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};

#[cfg(feature = "tracing")]
use crate::tracing_utils::{trace_launch_event, LaunchEvent};

/// What to run, independent of the environment it receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub clear_env: bool,
    pub shutdown_grace_period: Duration,
}

impl LaunchSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            clear_env: false,
            shutdown_grace_period: Duration::from_secs(10),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn clear_env(mut self, clear: bool) -> Self {
        self.clear_env = clear;
        self
    }

    pub fn shutdown_grace_period(mut self, period: Duration) -> Self {
        self.shutdown_grace_period = period;
        self
    }
}

impl From<&LaunchSection> for LaunchSpec {
    fn from(section: &LaunchSection) -> Self {
        Self {
            program: section.program.clone(),
            args: section.args.clone(),
            working_dir: section.working_dir.clone(),
            clear_env: section.clear_env,
            shutdown_grace_period: Duration::from_secs(section.shutdown_grace_period),
        }
    }
}

/// Result of a completed worker run.
#[derive(Debug, Clone, Copy)]
pub struct LaunchOutcome {
    pub status: ExitStatus,
    pub duration: Duration,
    /// An interrupt arrived while the worker was running
    pub interrupted: bool,
}

impl LaunchOutcome {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code the launcher should report: the worker's own code, or
    /// `128 + signal` if it was killed by a signal.
    pub fn exit_code(&self) -> i32 {
        exit_code_of(&self.status)
    }
}

pub fn exit_code_of(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

/// Spawns one worker process with a prepared [`Environment`].
#[derive(Debug, Clone)]
pub struct Launcher {
    spec: LaunchSpec,
    env: Environment,
}

impl Launcher {
    pub fn new(spec: LaunchSpec, env: Environment) -> Self {
        Self { spec, env }
    }

    /// Build the environment for `config` with an already resolved identity.
    pub fn with_identity(config: &LaunchConfig, identity: &WorkerIdentity) -> Self {
        let env = Environment::build(config, identity);

        #[cfg(feature = "tracing")]
        trace_launch_event(LaunchEvent::EnvironmentBuilt {
            worker_key: identity.key.clone(),
            display_name: identity.display_name.clone(),
            variable_count: env.len(),
        });

        Self::new(LaunchSpec::from(&config.launch), env)
    }

    /// Build the environment for `config` using the current host name.
    pub fn from_config(config: &LaunchConfig) -> Result<Self, LauncherError> {
        let identity = WorkerIdentity::detect(&config.worker)?;
        Ok(Self::with_identity(config, &identity))
    }

    pub fn spec(&self) -> &LaunchSpec {
        &self.spec
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// The command that [`Launcher::spawn`] will run.
    ///
    /// Configured variables override inherited ones of the same name; with
    /// `clear_env` nothing is inherited.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.spec.program);
        cmd.args(&self.spec.args);

        if let Some(dir) = &self.spec.working_dir {
            cmd.current_dir(dir);
        }
        if self.spec.clear_env {
            cmd.env_clear();
        }
        cmd.envs(self.env.iter());

        cmd.stdin(Stdio::inherit());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
        cmd
    }

    /// Start the worker without waiting for it.
    pub fn spawn(&self) -> Result<Child, LauncherError> {
        match self.command().spawn() {
            Ok(child) => {
                #[cfg(feature = "tracing")]
                trace_launch_event(LaunchEvent::Spawned {
                    program: self.spec.program.clone(),
                    args: self.spec.args.clone(),
                    pid: child.id(),
                });
                Ok(child)
            }
            Err(source) => {
                #[cfg(feature = "tracing")]
                trace_launch_event(LaunchEvent::SpawnFailed {
                    program: self.spec.program.clone(),
                    error: source.to_string(),
                });
                Err(LauncherError::Spawn {
                    program: self.spec.program.clone(),
                    source,
                })
            }
        }
    }

    /// Start the worker and wait for it to finish.
    ///
    /// On SIGINT or SIGTERM the worker gets `shutdown_grace_period` to exit
    /// before it is killed. SIGINT from a terminal already reaches the worker
    /// through the shared process group; SIGTERM is forwarded to it.
    pub async fn run(&self) -> Result<LaunchOutcome, LauncherError> {
        let started = Instant::now();
        let mut child = self.spawn()?;
        let mut interrupted = false;

        let status = tokio::select! {
            res = child.wait() => res.map_err(LauncherError::Wait)?,
            sig = shutdown_signal() => {
                let signal = sig?;
                interrupted = true;

                #[cfg(feature = "tracing")]
                trace_launch_event(LaunchEvent::Interrupted {
                    signal: signal.name().to_string(),
                    grace_period_seconds: self.spec.shutdown_grace_period.as_secs(),
                });

                if signal == ShutdownSignal::Terminate {
                    forward_terminate(&child);
                }
                self.stop(&mut child).await?
            }
        };

        let outcome = LaunchOutcome {
            status,
            duration: started.elapsed(),
            interrupted,
        };

        #[cfg(feature = "tracing")]
        trace_launch_event(LaunchEvent::Exited {
            exit_code: outcome.exit_code(),
            success: outcome.success(),
            duration_ms: outcome.duration.as_millis() as u64,
        });

        Ok(outcome)
    }

    /// Wait up to `shutdown_grace_period` for the worker, then kill it.
    async fn stop(&self, child: &mut Child) -> Result<ExitStatus, LauncherError> {
        match tokio::time::timeout(self.spec.shutdown_grace_period, child.wait()).await {
            Ok(res) => res.map_err(LauncherError::Wait),
            Err(_) => {
                #[cfg(feature = "tracing")]
                trace_launch_event(LaunchEvent::Killed { pid: child.id() });

                child.kill().await.map_err(LauncherError::Wait)?;
                child.wait().await.map_err(LauncherError::Wait)
            }
        }
    }
}

/// Signal that asked the launcher to shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl ShutdownSignal {
    pub fn name(&self) -> &'static str {
        match self {
            ShutdownSignal::Interrupt => "SIGINT",
            ShutdownSignal::Terminate => "SIGTERM",
        }
    }
}

async fn shutdown_signal() -> Result<ShutdownSignal, LauncherError> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate()).map_err(LauncherError::Signal)?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res.map_err(LauncherError::Signal)?;
                Ok(ShutdownSignal::Interrupt)
            }
            _ = terminate.recv() => Ok(ShutdownSignal::Terminate),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.map_err(LauncherError::Signal)?;
        Ok(ShutdownSignal::Interrupt)
    }
}

#[cfg(unix)]
fn forward_terminate(child: &Child) {
    if let Some(pid) = child.id() {
        // The child has not been reaped yet, so the pid still names it.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
    }
}

#[cfg(not(unix))]
fn forward_terminate(_child: &Child) {}
