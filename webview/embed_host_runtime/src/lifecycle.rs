use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Identifies one frame mount; ids are never reused within a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MountId(pub u64);

impl fmt::Display for MountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Owner of a mount's liveness. Revoked explicitly or on drop.
#[derive(Debug)]
pub struct MountScope {
    id: MountId,
    live: Arc<AtomicBool>,
}

impl MountScope {
    pub fn new(id: MountId) -> Self {
        Self {
            id,
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn id(&self) -> MountId {
        self.id
    }

    pub fn guard(&self) -> LifecycleGuard {
        LifecycleGuard {
            id: self.id,
            live: self.live.clone(),
        }
    }

    pub fn revoke(&self) {
        self.live.store(false, Ordering::Release);
    }
}

impl Drop for MountScope {
    fn drop(&mut self) {
        self.revoke();
    }
}

/// Read-only view of a [`MountScope`]; cannot revive a revoked mount.
#[derive(Debug, Clone)]
pub struct LifecycleGuard {
    id: MountId,
    live: Arc<AtomicBool>,
}

impl LifecycleGuard {
    pub fn id(&self) -> MountId {
        self.id
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_follows_revocation() {
        let scope = MountScope::new(MountId(1));
        let guard = scope.guard();
        assert!(guard.is_live());
        scope.revoke();
        assert!(!guard.is_live());
    }

    #[test]
    fn dropping_the_scope_revokes_outstanding_guards() {
        let guard = MountScope::new(MountId(2)).guard();
        assert_eq!(guard.id(), MountId(2));
        assert!(!guard.is_live());
    }
}
