//! # Platform-specific utilities
//!
//! Questo modulo centralizza la logica cross-platform per i tool esterni
//! (`file`, `ffmpeg`, `exiftool`) e per l'abbassamento della priorità dei
//! worker, così che il batch non affami l'uso interattivo della macchina.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

/// Niceness applied to photo worker threads
pub const WORKER_NICENESS: i32 = 10;

/// Platform-specific command manager
pub struct PlatformCommands {
    commands: HashMap<&'static str, &'static str>,
    which_command: &'static str,
}

impl PlatformCommands {
    /// Get the singleton instance
    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<PlatformCommands> = OnceLock::new();
        INSTANCE.get_or_init(Self::new)
    }

    fn new() -> Self {
        let mut commands = HashMap::new();
        let which_command = if cfg!(windows) {
            commands.insert("file", "file.exe");
            commands.insert("ffmpeg", "ffmpeg.exe");
            commands.insert("exiftool", "exiftool.exe");
            "where"
        } else {
            commands.insert("file", "file");
            commands.insert("ffmpeg", "ffmpeg");
            commands.insert("exiftool", "exiftool");
            "which"
        };

        Self { commands, which_command }
    }

    /// Get the platform-specific command name
    pub fn get_command<'a>(&self, base_name: &'a str) -> &'a str {
        self.commands.get(base_name).copied().unwrap_or(base_name)
    }

    /// Get the command used to check if a program exists
    pub fn which_command(&self) -> &str {
        self.which_command
    }

    /// Check if a command is available on the system PATH
    pub async fn is_command_available(&self, base_name: &str) -> bool {
        let command_name = self.get_command(base_name);

        let result = tokio::process::Command::new(self.which_command)
            .arg(command_name)
            .output()
            .await;

        match result {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }

    /// Get system information for debugging
    pub fn system_info() -> SystemInfo {
        SystemInfo {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            family: std::env::consts::FAMILY,
        }
    }
}

/// System information structure
#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub os: &'static str,
    pub arch: &'static str,
    pub family: &'static str,
}

impl std::fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({})", self.os, self.arch, self.family)
    }
}

thread_local! {
    static PRIORITY_LOWERED: Cell<bool> = const { Cell::new(false) };
}

/// Lower the scheduling priority of the calling thread, once per thread.
///
/// Returns `true` when the thread runs at reduced priority after the call.
pub fn lower_current_thread_priority() -> bool {
    PRIORITY_LOWERED.with(|lowered| {
        if lowered.get() {
            return true;
        }
        let ok = set_thread_niceness(WORKER_NICENESS);
        if ok {
            lowered.set(true);
        } else {
            debug!("Could not lower worker priority on this platform");
        }
        ok
    })
}

#[cfg(target_os = "linux")]
fn set_thread_niceness(niceness: i32) -> bool {
    // On Linux the nice value is per thread; target our own tid.
    let tid = unsafe { libc::syscall(libc::SYS_gettid) } as libc::id_t;
    unsafe { libc::setpriority(libc::PRIO_PROCESS, tid, niceness) == 0 }
}

#[cfg(all(unix, not(target_os = "linux")))]
fn set_thread_niceness(niceness: i32) -> bool {
    unsafe { libc::setpriority(libc::PRIO_PROCESS, 0, niceness) == 0 }
}

#[cfg(not(unix))]
fn set_thread_niceness(_niceness: i32) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_commands() {
        let platform = PlatformCommands::instance();

        let exiftool = platform.get_command("exiftool");
        assert!(exiftool.starts_with("exiftool"));

        // Unknown tools fall through unchanged
        assert_eq!(platform.get_command("magick"), "magick");

        let which = platform.which_command();
        assert!(!which.is_empty());
    }

    #[tokio::test]
    async fn test_command_availability() {
        let platform = PlatformCommands::instance();
        // Command lookup must not panic in minimal environments
        let _ = platform.is_command_available("ffmpeg").await;
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_lower_priority_is_sticky_per_thread() {
        let handle = std::thread::spawn(|| {
            let first = lower_current_thread_priority();
            let second = lower_current_thread_priority();
            (first, second)
        });
        let (first, second) = handle.join().unwrap();
        // Raising niceness never needs privileges
        assert!(first);
        assert!(second);
    }

    #[test]
    fn test_system_info() {
        let info = PlatformCommands::system_info();
        assert!(!info.os.is_empty());
        assert!(!info.to_string().is_empty());
    }
}
