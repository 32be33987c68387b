use std::process::Command;

/// Puts a child process in its own process group so a terminal Ctrl-C only
/// reaches this process. The pipeline then stops the child itself.
pub(crate) fn detach_process_group(cmd: &mut Command) -> &mut Command {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        cmd.creation_flags(0x00000200); // CREATE_NEW_PROCESS_GROUP
    }

    cmd
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Stdio;

    #[cfg(target_os = "linux")]
    #[test]
    fn detached_child_leads_its_own_process_group() {
        let mut cmd = Command::new("sh");
        let output = detach_process_group(&mut cmd)
            .args(["-c", "exec cat /proc/self/stat"])
            .stdin(Stdio::null())
            .output()
            .unwrap();
        let stat = String::from_utf8(output.stdout).unwrap();
        let fields: Vec<&str> = stat.split_whitespace().collect();
        // pid (comm) state ppid pgrp ...
        assert_eq!(fields[0], fields[4]);
        assert_ne!(fields[4], std::process::id().to_string());
    }
}
