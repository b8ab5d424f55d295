//! Recovery supervisor
//!
//! Crash recovery is process-wide: when a sweep pass hits a fatal feedback
//! failure it persists the verdict, exits with a dedicated restart code, and
//! the supervisor re-executes the same command line. The fresh process
//! abandons all in-memory state and resumes purely from the stores, which is
//! what guarantees forward progress across restarts.

use crate::SweepError;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::Command;

/// Exit code a sweep pass uses to request re-execution (EX_TEMPFAIL)
pub const RESTART_EXIT_CODE: i32 = 75;

/// Pause between a restart exit and the respawn
const RESPAWN_DELAY: Duration = Duration::from_secs(2);

/// Spawns, awaits, and respawns one sweep process
pub struct RecoverySupervisor {
    program: PathBuf,
    args: Vec<OsString>,
    respawn_delay: Duration,
}

impl RecoverySupervisor {
    pub fn new(program: PathBuf, args: Vec<OsString>) -> Self {
        Self {
            program,
            args,
            respawn_delay: RESPAWN_DELAY,
        }
    }

    /// Supervises re-executions of the current executable with `args`
    pub fn current_process(args: Vec<OsString>) -> Result<Self, SweepError> {
        let program = std::env::current_exe()?;
        Ok(Self::new(program, args))
    }

    #[cfg(test)]
    fn with_respawn_delay(mut self, delay: Duration) -> Self {
        self.respawn_delay = delay;
        self
    }

    /// Runs the child until it exits with something other than the restart
    /// code, then returns that final exit code
    ///
    /// Working directory and environment are inherited, so the respawned
    /// process sees the same configuration path and store location.
    pub async fn run(&self) -> Result<i32, SweepError> {
        let mut respawns = 0u32;

        loop {
            tracing::info!(
                program = %self.program.display(),
                respawns,
                "starting sweep process"
            );

            let status = Command::new(&self.program)
                .args(&self.args)
                .status()
                .await
                .map_err(|e| {
                    SweepError::Supervisor(format!(
                        "failed to spawn {}: {}",
                        self.program.display(),
                        e
                    ))
                })?;

            if should_respawn(&status) {
                respawns += 1;
                tracing::warn!(respawns, "sweep process requested restart, respawning");
                tokio::time::sleep(self.respawn_delay).await;
                continue;
            }

            return match status.code() {
                Some(code) => {
                    tracing::info!(code, respawns, "sweep process finished");
                    Ok(code)
                }
                None => {
                    tracing::error!("sweep process terminated by signal");
                    Ok(1)
                }
            };
        }
    }
}

/// Only the dedicated restart code triggers a respawn; every other exit is
/// propagated outward
pub fn should_respawn(status: &ExitStatus) -> bool {
    status.code() == Some(RESTART_EXIT_CODE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_final_exit_code_is_propagated() {
        let supervisor = RecoverySupervisor::new(
            PathBuf::from("/bin/sh"),
            vec![OsString::from("-c"), OsString::from("exit 3")],
        );
        assert_eq!(supervisor.run().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_restart_code_respawns_until_clean_exit() {
        let dir = tempfile::tempdir().unwrap();
        let flag = dir.path().join("already-ran");

        // First execution exits with the restart code, second exits clean
        let script = format!(
            "if [ -f {flag} ]; then exit 0; else touch {flag}; exit {code}; fi",
            flag = flag.display(),
            code = RESTART_EXIT_CODE
        );

        let supervisor = RecoverySupervisor::new(
            PathBuf::from("/bin/sh"),
            vec![OsString::from("-c"), OsString::from(script)],
        )
        .with_respawn_delay(Duration::from_millis(1));

        assert_eq!(supervisor.run().await.unwrap(), 0);
        assert!(flag.exists());
    }

    #[tokio::test]
    async fn test_spawn_failure_is_an_error() {
        let supervisor =
            RecoverySupervisor::new(PathBuf::from("/nonexistent/stalesweep"), vec![]);
        assert!(supervisor.run().await.is_err());
    }
}
