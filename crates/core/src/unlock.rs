//! The action granted by a successful verification.

use std::process::Command;

/// Side effect to run when access is granted.
///
/// Fire-and-forget: implementations must not block on, or report, the
/// launched program's outcome; a failed launch is a logging concern,
/// never a verification failure.
pub trait UnlockAction: Send + Sync {
    fn trigger(&self);
}

/// Spawns a fixed external program with no arguments.
pub struct CommandUnlock {
    program: String,
}

impl CommandUnlock {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The platform's stock text editor.
    pub fn default_editor() -> Self {
        #[cfg(target_os = "windows")]
        let program = "notepad.exe";
        #[cfg(not(target_os = "windows"))]
        let program = "gedit";
        Self::new(program)
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl UnlockAction for CommandUnlock {
    fn trigger(&self) {
        match Command::new(&self.program).spawn() {
            Ok(child) => log::info!("launched {} (pid {})", self.program, child.id()),
            Err(e) => log::error!("failed to launch {}: {e}", self.program),
        }
    }
}

/// Does nothing. Used by the CLI's `--no-unlock` mode and by tests.
pub struct NoopUnlock;

impl UnlockAction for NoopUnlock {
    fn trigger(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_editor_is_platform_specific() {
        let unlock = CommandUnlock::default_editor();
        #[cfg(target_os = "windows")]
        assert_eq!(unlock.program(), "notepad.exe");
        #[cfg(not(target_os = "windows"))]
        assert_eq!(unlock.program(), "gedit");
    }

    #[test]
    fn test_trigger_with_missing_program_does_not_panic() {
        // Launch failure is logged, not surfaced.
        CommandUnlock::new("facekey-test-nonexistent-program").trigger();
    }
}
