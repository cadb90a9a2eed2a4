//! Process-wide halt switch.
//!
//! While paused, every ledger-mutating entry point fails fast with
//! [`EscrowError::Paused`] before touching any state.

use escrowbook_types::{EscrowError, Result};

/// Boolean halt switch checked at the top of each guarded operation.
#[derive(Debug, Default)]
pub struct PauseGate {
    paused: bool,
}

impl PauseGate {
    /// Create a gate in the running state.
    #[must_use]
    pub fn new() -> Self {
        Self { paused: false }
    }

    /// Halt guarded operations.
    ///
    /// # Errors
    /// Returns `Paused` if already paused.
    pub fn pause(&mut self) -> Result<()> {
        self.ensure_running()?;
        self.paused = true;
        Ok(())
    }

    /// Resume guarded operations.
    ///
    /// # Errors
    /// Returns `NotPaused` if running.
    pub fn unpause(&mut self) -> Result<()> {
        if !self.paused {
            return Err(EscrowError::NotPaused);
        }
        self.paused = false;
        Ok(())
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Guard an operation. Returns `Ok(())` while running.
    pub fn ensure_running(&self) -> Result<()> {
        if self.paused {
            Err(EscrowError::Paused)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_running() {
        let gate = PauseGate::new();
        assert!(!gate.is_paused());
        assert!(gate.ensure_running().is_ok());
    }

    #[test]
    fn pause_blocks() {
        let mut gate = PauseGate::new();
        gate.pause().unwrap();
        let err = gate.ensure_running().unwrap_err();
        assert!(matches!(err, EscrowError::Paused));
        assert_eq!(err.to_string(), "Pausable: paused");
    }

    #[test]
    fn double_pause_fails() {
        let mut gate = PauseGate::new();
        gate.pause().unwrap();
        assert!(matches!(gate.pause().unwrap_err(), EscrowError::Paused));
        assert!(gate.is_paused());
    }

    #[test]
    fn unpause_when_running_fails() {
        let mut gate = PauseGate::new();
        assert!(matches!(gate.unpause().unwrap_err(), EscrowError::NotPaused));
    }

    #[test]
    fn pause_unpause_cycle() {
        let mut gate = PauseGate::new();
        gate.pause().unwrap();
        gate.unpause().unwrap();
        assert!(gate.ensure_running().is_ok());
        gate.pause().unwrap();
        assert!(gate.ensure_running().is_err());
    }
}
