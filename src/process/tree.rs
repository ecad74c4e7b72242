// src/process/tree.rs

use std::collections::HashMap;

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

/// Snapshot of the live descendants of `root`, deepest first.
pub fn find_descendants(root: u32) -> Vec<u32> {
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::All,
        true,
        ProcessRefreshKind::default(),
    );

    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for (pid, process) in system.processes() {
        if let Some(parent) = process.parent() {
            children
                .entry(parent.as_u32())
                .or_default()
                .push(pid.as_u32());
        }
    }

    let mut result = Vec::new();
    collect_descendants(root, &children, &mut result);
    result
}

fn collect_descendants(parent: u32, children: &HashMap<u32, Vec<u32>>, result: &mut Vec<u32>) {
    let Some(kids) = children.get(&parent) else {
        return;
    };
    for &kid in kids {
        if kid == parent || result.contains(&kid) {
            continue;
        }
        collect_descendants(kid, children, result);
        result.push(kid);
    }
}

/// Send `SIGTERM` to `root`, its descendants and its process group.
///
/// `root_reaped` must be true once the root's exit status has been
/// collected: its PID may then belong to an unrelated process, so only the
/// process group (which outlives the root while members remain) is
/// signalled, and only while no other process holds that PID.
///
/// Returns the number of signals delivered. A target that no longer exists
/// is not an error.
#[cfg(unix)]
pub fn signal_tree(root: u32, root_reaped: bool) -> Result<usize, String> {
    use nix::errno::Errno;
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let mut delivered = 0;
    let mut first_error: Option<String> = None;

    let mut record = |target: &str, result: nix::Result<()>| match result {
        Ok(()) => delivered += 1,
        Err(Errno::ESRCH) => {}
        Err(e) => {
            if first_error.is_none() {
                first_error = Some(format!("SIGTERM to {target} failed: {e}"));
            }
        }
    };

    if !root_reaped {
        for pid in find_descendants(root) {
            let result = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            record(&format!("PID {pid}"), result);
        }
    }

    // Processes spawned by `ProcessHandle` lead their own group.
    let root_pid = Pid::from_raw(root as i32);
    if group_still_ours(root_reaped, nix::unistd::getpgid(Some(root_pid))) {
        let result = signal::killpg(root_pid, Signal::SIGTERM);
        record(&format!("process group {root}"), result);
    }

    if !root_reaped {
        let result = signal::kill(Pid::from_raw(root as i32), Signal::SIGTERM);
        record(&format!("PID {root}"), result);
    }

    match first_error {
        Some(reason) => Err(reason),
        None => Ok(delivered),
    }
}

/// Whether process group `root` can still be ours, given the result of
/// looking up the process currently holding PID `root`.
///
/// The kernel does not reuse a PID while a process group with that ID is
/// alive. After the root was reaped, a live process holding its PID
/// therefore means our group emptied and the ID may name someone else's.
#[cfg(unix)]
fn group_still_ours(root_reaped: bool, root_lookup: nix::Result<nix::unistd::Pid>) -> bool {
    !root_reaped || root_lookup == Err(nix::errno::Errno::ESRCH)
}

#[cfg(not(unix))]
pub fn signal_tree(root: u32, root_reaped: bool) -> Result<usize, String> {
    use std::process::Command;

    if root_reaped {
        return Ok(0);
    }

    let output = Command::new("taskkill")
        .args(["/T", "/F", "/PID", &root.to_string()])
        .output()
        .map_err(|e| format!("running taskkill failed: {e}"))?;

    if output.status.success() {
        Ok(1)
    } else {
        // taskkill exits with 128 when the process is already gone.
        match output.status.code() {
            Some(128) => Ok(0),
            _ => Err(String::from_utf8_lossy(&output.stderr).trim().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descendants_are_collected_deepest_first() {
        let mut children = HashMap::new();
        children.insert(1, vec![2, 3]);
        children.insert(2, vec![4]);
        children.insert(4, vec![5]);

        let mut result = Vec::new();
        collect_descendants(1, &children, &mut result);

        assert_eq!(result.len(), 4);
        let pos = |pid| result.iter().position(|&p| p == pid).unwrap();
        assert!(pos(5) < pos(4));
        assert!(pos(4) < pos(2));
        assert!(!result.contains(&1));
    }

    #[cfg(unix)]
    #[test]
    fn group_of_a_live_root_is_signalled() {
        use nix::unistd::Pid;
        assert!(group_still_ours(false, Ok(Pid::from_raw(4242))));
        assert!(group_still_ours(false, Err(nix::errno::Errno::ESRCH)));
    }

    #[cfg(unix)]
    #[test]
    fn reaped_root_group_is_signalled_only_while_its_pid_is_free() {
        use nix::errno::Errno;
        use nix::unistd::Pid;

        // Orphans keep the group alive; nobody holds the PID.
        assert!(group_still_ours(true, Err(Errno::ESRCH)));
        // PID reused: as a new group leader or inside another group.
        assert!(!group_still_ours(true, Ok(Pid::from_raw(4242))));
        assert!(!group_still_ours(true, Ok(Pid::from_raw(1))));
        assert!(!group_still_ours(true, Err(Errno::EPERM)));
    }

    #[test]
    fn unknown_root_has_no_descendants() {
        let children = HashMap::new();
        let mut result = Vec::new();
        collect_descendants(42, &children, &mut result);
        assert!(result.is_empty());
    }
}
