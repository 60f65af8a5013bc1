//! Registration gate
//!
//! The host may withhold the bridge (for instance on an unlicensed
//! platform). Every bridge entry point consults the gate first and fails
//! with `NotRegistered` when it says no.

/// Decides whether the bridge may be used
pub trait RegistrationGate: Send + Sync {
    /// Whether bridge entry points are enabled
    fn is_registered(&self) -> bool;
}

/// Gate that always allows use
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRegistered;

impl RegistrationGate for AlwaysRegistered {
    fn is_registered(&self) -> bool {
        true
    }
}

impl<F> RegistrationGate for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_registered(&self) -> bool {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_gate() {
        let open = || true;
        let closed = || false;
        assert!(open.is_registered());
        assert!(!closed.is_registered());
        assert!(AlwaysRegistered.is_registered());
    }
}
