//! Fire-and-forget execution of rule actions.
//!
//! Each action's command line is handed verbatim to `sh -c`.  The child is
//! put in its own process group so a Ctrl-C aimed at the daemon does not
//! reach it, and a detached reaper thread collects its exit status.  The
//! event loop never waits on a child.

use crate::rules::Action;
use crate::traits::{LaunchError, Launcher};
use log::{debug, error, info, warn};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};

/// Interpreter used for every action.
pub const SHELL: &str = "/bin/sh";

/// A [`Launcher`] that runs commands through the system shell.
#[derive(Debug, Clone)]
pub struct ShellLauncher {
    shell: String,
}

impl Default for ShellLauncher {
    fn default() -> Self {
        Self::new(SHELL)
    }
}

impl ShellLauncher {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Launcher for ShellLauncher {
    fn launch(&self, command: &str) -> Result<(), LaunchError> {
        let child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .process_group(0)
            .spawn()
            .map_err(|e| LaunchError {
                command: command.to_string(),
                reason: e.to_string(),
            })?;
        debug!("launched pid {} for {:?}", child.id(), command);
        reap_in_background(child, command.to_string());
        Ok(())
    }
}

/// Wait for `child` on a throwaway thread so it does not linger as a
/// zombie.  Nothing joins this thread.
fn reap_in_background(mut child: Child, command: String) {
    let spawned = std::thread::Builder::new()
        .name("hyperflow-reaper".into())
        .spawn(move || match child.wait() {
            Ok(status) if status.success() => debug!("{:?} exited", command),
            Ok(status) => warn!("{:?} exited with {}", command, status),
            Err(e) => warn!("failed to wait for {:?}: {}", command, e),
        });
    if let Err(e) = spawned {
        warn!("could not start reaper thread: {}", e);
    }
}

/// Launch every action in declared order.
///
/// A failed launch is logged and does not stop the remaining actions.
/// Returns the number of commands that were started.
pub fn dispatch<L: Launcher + ?Sized>(launcher: &L, actions: &[Action]) -> usize {
    let mut launched = 0;
    for action in actions {
        if action.command.trim().is_empty() {
            continue;
        }
        info!("executing: {}", action.command);
        match launcher.launch(&action.command) {
            Ok(()) => launched += 1,
            Err(e) => error!("{}", e),
        }
    }
    launched
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct Recording {
        log: RefCell<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl Launcher for Recording {
        fn launch(&self, command: &str) -> Result<(), LaunchError> {
            if self.fail_on == Some(command) {
                return Err(LaunchError {
                    command: command.into(),
                    reason: "not found".into(),
                });
            }
            self.log.borrow_mut().push(command.into());
            Ok(())
        }
    }

    fn actions(cmds: &[&str]) -> Vec<Action> {
        cmds.iter()
            .map(|c| Action {
                command: c.to_string(),
            })
            .collect()
    }

    #[test]
    fn launches_in_declared_order() {
        let l = Recording::default();
        assert_eq!(dispatch(&l, &actions(&["a", "b", "c"])), 3);
        assert_eq!(*l.log.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn failure_does_not_stop_siblings() {
        let l = Recording {
            fail_on: Some("b"),
            ..Default::default()
        };
        assert_eq!(dispatch(&l, &actions(&["a", "b", "c"])), 2);
        assert_eq!(*l.log.borrow(), vec!["a", "c"]);
    }

    #[test]
    fn blank_commands_are_skipped() {
        let l = Recording::default();
        assert_eq!(dispatch(&l, &actions(&["", "  ", "x"])), 1);
        assert_eq!(*l.log.borrow(), vec!["x"]);
    }

    #[test]
    fn missing_shell_is_a_launch_error() {
        let l = ShellLauncher::new("/nonexistent/hyperflow-shell");
        let err = l.launch("true").unwrap_err();
        assert_eq!(err.command, "true");
    }

    #[test]
    fn shell_launch_does_not_wait_for_child() {
        let start = Instant::now();
        ShellLauncher::default().launch("sleep 5").unwrap();
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn shell_runs_command_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let cmd = format!("echo \"$((1 + 2))\" > {}", out.display());
        ShellLauncher::default().launch(&cmd).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Ok(text) = std::fs::read_to_string(&out) {
                if text.trim() == "3" {
                    return;
                }
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        panic!("command output never appeared");
    }
}
