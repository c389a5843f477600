//! Pre-execution risk classification.
//!
//! Every command gets exactly one level from a fixed hierarchy before
//! anything runs. Rules are evaluated in severity order; the first match
//! wins, so a privilege-escalation wrapper is Critical no matter what it
//! wraps.

use std::path::Path;

use serde::Serialize;

use crate::config::CommandSpec;

/// Risk level assigned to a command.
///
/// Ordered `Low < Medium < High < Critical`. `Unknown` sits outside the
/// hierarchy: it marks commands the evaluator could not classify (empty or
/// non-decodable executable) and is never acceptable to a risk gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// No matching rule.
    Low,
    /// Network clients, service management, package installation.
    Medium,
    /// Data-destroying commands and remote shells.
    High,
    /// Privilege escalation.
    Critical,
    /// Classification was not possible.
    Unknown,
}

impl RiskLevel {
    /// Lowercase label used in reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commands that escalate privileges.
const PRIVILEGE_ESCALATION_COMMANDS: &[&str] = &["sudo", "su", "doas", "pkexec"];

/// Commands that destroy data outright.
const DESTRUCTIVE_COMMANDS: &[&str] = &["rm", "rmdir", "unlink", "shred", "dd"];

/// Remote-shell style commands.
const REMOTE_SHELL_COMMANDS: &[&str] = &["ssh", "scp", "sftp", "rsh", "telnet"];

/// Network clients.
const NETWORK_CLIENT_COMMANDS: &[&str] = &["wget", "curl", "ftp", "nc", "netcat"];

/// Service, filesystem, and scheduler management commands.
const SYSTEM_MANAGEMENT_COMMANDS: &[&str] = &[
    "systemctl",
    "service",
    "chkconfig",
    "update-rc.d",
    "mount",
    "umount",
    "fdisk",
    "parted",
    "mkfs",
    "fsck",
    "crontab",
    "at",
    "batch",
];

/// Package managers whose mutating subcommands are Medium.
const PACKAGE_MANAGERS: &[&str] = &[
    "apt", "apt-get", "yum", "dnf", "pacman", "zypper", "apk", "brew", "pip", "pip3", "npm", "gem",
];

/// Package-manager arguments that mutate the system.
const PACKAGE_MUTATING_ARGS: &[&str] = &["install", "remove", "uninstall", "upgrade", "update"];

/// rsync flags that delete on the receiving side.
const RSYNC_DELETE_FLAGS: &[&str] = &["--delete", "--delete-before", "--delete-after"];

/// Classifies a command, first matching rule wins.
///
/// The executable is reduced to its basename first, so `/usr/bin/sudo`
/// and `sudo` classify identically.
///
/// # Examples
///
/// ```
/// use vigil_core::config::CommandSpec;
/// use vigil_core::risk::RiskLevel;
/// use vigil_core::risk::evaluate_risk;
///
/// let cmd = CommandSpec {
///     name: "fetch".to_string(),
///     cmd: "wget".to_string(),
///     args: vec!["https://example.com/file".to_string()],
///     ..CommandSpec::default()
/// };
/// assert_eq!(evaluate_risk(&cmd), RiskLevel::Medium);
/// ```
#[must_use]
pub fn evaluate_risk(command: &CommandSpec) -> RiskLevel {
    let Some(base) = command_basename(&command.cmd) else {
        return RiskLevel::Unknown;
    };

    if PRIVILEGE_ESCALATION_COMMANDS.contains(&base) {
        return RiskLevel::Critical;
    }

    if DESTRUCTIVE_COMMANDS.contains(&base)
        || is_destructive_find(base, &command.args)
        || is_deleting_rsync(base, &command.args)
        || REMOTE_SHELL_COMMANDS.contains(&base)
    {
        return RiskLevel::High;
    }

    if NETWORK_CLIENT_COMMANDS.contains(&base)
        || SYSTEM_MANAGEMENT_COMMANDS.contains(&base)
        || is_mutating_package_manager(base, &command.args)
    {
        return RiskLevel::Medium;
    }

    RiskLevel::Low
}

/// Reduces an executable to its basename, if one exists.
fn command_basename(cmd: &str) -> Option<&str> {
    if cmd.is_empty() {
        return None;
    }
    Path::new(cmd)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
}

/// `find` with `-delete`, or `-exec` handing off to a destructive command.
fn is_destructive_find(base: &str, args: &[String]) -> bool {
    if base != "find" {
        return false;
    }
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "-delete" {
            return true;
        }
        if (arg == "-exec" || arg == "-execdir")
            && let Some(executed) = iter.next()
            && let Some(executed_base) = command_basename(executed)
            && (DESTRUCTIVE_COMMANDS.contains(&executed_base)
                || PRIVILEGE_ESCALATION_COMMANDS.contains(&executed_base))
        {
            return true;
        }
    }
    false
}

/// rsync carrying any receiving-side delete flag.
fn is_deleting_rsync(base: &str, args: &[String]) -> bool {
    base == "rsync"
        && args
            .iter()
            .any(|arg| RSYNC_DELETE_FLAGS.contains(&arg.as_str()))
}

/// Package manager invoked with a system-mutating argument.
fn is_mutating_package_manager(base: &str, args: &[String]) -> bool {
    PACKAGE_MANAGERS.contains(&base)
        && args
            .iter()
            .any(|arg| PACKAGE_MUTATING_ARGS.contains(&arg.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(cmd: &str, args: &[&str]) -> CommandSpec {
        CommandSpec {
            name: "test".to_string(),
            cmd: cmd.to_string(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
            ..CommandSpec::default()
        }
    }

    #[test]
    fn test_privilege_escalation_is_critical() {
        assert_eq!(
            evaluate_risk(&command("sudo", &["rm", "-rf", "/"])),
            RiskLevel::Critical
        );
        assert_eq!(evaluate_risk(&command("su", &["-"])), RiskLevel::Critical);
        assert_eq!(
            evaluate_risk(&command("doas", &["reboot"])),
            RiskLevel::Critical
        );
    }

    #[test]
    fn test_sudo_prefix_always_critical() {
        // Whatever the wrapped command, sudo itself is the executable.
        for wrapped in ["ls", "wget", "rm", "make"] {
            assert_eq!(
                evaluate_risk(&command("sudo", &[wrapped])),
                RiskLevel::Critical,
                "wrapped: {wrapped}"
            );
        }
    }

    #[test]
    fn test_absolute_path_classified_by_basename() {
        assert_eq!(
            evaluate_risk(&command("/usr/bin/sudo", &["id"])),
            RiskLevel::Critical
        );
        assert_eq!(
            evaluate_risk(&command("/bin/rm", &["-rf", "/tmp/x"])),
            RiskLevel::High
        );
    }

    #[test]
    fn test_destructive_commands_are_high() {
        for cmd in ["rm", "rmdir", "unlink", "shred", "dd"] {
            assert_eq!(evaluate_risk(&command(cmd, &[])), RiskLevel::High, "{cmd}");
        }
    }

    #[test]
    fn test_find_delete_is_high() {
        assert_eq!(
            evaluate_risk(&command("find", &["/tmp", "-delete"])),
            RiskLevel::High
        );
    }

    #[test]
    fn test_find_exec_destructive_is_high() {
        assert_eq!(
            evaluate_risk(&command("find", &["/tmp", "-exec", "rm", "{}", ";"])),
            RiskLevel::High
        );
    }

    #[test]
    fn test_find_exec_benign_is_low() {
        assert_eq!(
            evaluate_risk(&command("find", &["/tmp", "-exec", "cat", "{}", ";"])),
            RiskLevel::Low
        );
    }

    #[test]
    fn test_plain_find_is_low() {
        assert_eq!(
            evaluate_risk(&command("find", &["/tmp", "-name", "*.log"])),
            RiskLevel::Low
        );
    }

    #[test]
    fn test_rsync_delete_flags_are_high() {
        for flag in ["--delete", "--delete-before", "--delete-after"] {
            assert_eq!(
                evaluate_risk(&command("rsync", &["-a", flag, "src/", "dst/"])),
                RiskLevel::High,
                "flag: {flag}"
            );
        }
    }

    #[test]
    fn test_plain_rsync_is_low() {
        assert_eq!(
            evaluate_risk(&command("rsync", &["-a", "src/", "dst/"])),
            RiskLevel::Low
        );
    }

    #[test]
    fn test_remote_shell_is_high() {
        assert_eq!(
            evaluate_risk(&command("ssh", &["host", "uptime"])),
            RiskLevel::High
        );
    }

    #[test]
    fn test_network_clients_are_medium() {
        assert_eq!(
            evaluate_risk(&command("wget", &["https://example.com/file"])),
            RiskLevel::Medium
        );
        assert_eq!(
            evaluate_risk(&command("curl", &["-O", "https://example.com"])),
            RiskLevel::Medium
        );
    }

    #[test]
    fn test_system_management_is_medium() {
        for cmd in ["systemctl", "mount", "fdisk", "crontab"] {
            assert_eq!(
                evaluate_risk(&command(cmd, &["status"])),
                RiskLevel::Medium,
                "{cmd}"
            );
        }
    }

    #[test]
    fn test_package_manager_mutating_is_medium() {
        assert_eq!(
            evaluate_risk(&command("apt-get", &["install", "jq"])),
            RiskLevel::Medium
        );
        assert_eq!(
            evaluate_risk(&command("pip", &["install", "requests"])),
            RiskLevel::Medium
        );
    }

    #[test]
    fn test_package_manager_query_is_low() {
        assert_eq!(
            evaluate_risk(&command("apt-get", &["moo"])),
            RiskLevel::Low
        );
        assert_eq!(evaluate_risk(&command("pip", &["list"])), RiskLevel::Low);
    }

    #[test]
    fn test_ordinary_command_is_low() {
        for cmd in ["ls", "echo", "make", "cargo", "python3"] {
            assert_eq!(evaluate_risk(&command(cmd, &[])), RiskLevel::Low, "{cmd}");
        }
    }

    #[test]
    fn test_empty_cmd_is_unknown() {
        assert_eq!(evaluate_risk(&command("", &[])), RiskLevel::Unknown);
    }

    #[test]
    fn test_hierarchy_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }
}
