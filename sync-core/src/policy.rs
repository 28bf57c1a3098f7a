//! Scheduling policy for SpendSync.
//!
//! Decides, from a snapshot of the engine's conditions, whether a trigger
//! should start a push, a full pull, or nothing. The dispatcher in
//! sync-client owns the round guard and executes the decision; this
//! module only computes it, so the policy is testable without I/O.

/// What caused a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Application start.
    Startup,
    /// Network transitioned from disconnected to connected.
    Reconnect,
    /// The user pressed "retry" / "sync now".
    Manual,
    /// A mutation was enqueued.
    QueueChanged,
}

impl Trigger {
    /// Whether the user explicitly asked for this round.
    pub fn is_manual(&self) -> bool {
        matches!(self, Trigger::Manual)
    }
}

/// Conditions the policy decides from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchInputs {
    /// A push or pull round holds the guard.
    pub round_active: bool,
    /// Sync toggle.
    pub sync_enabled: bool,
    /// An account is signed in.
    pub signed_in: bool,
    /// Last network snapshot is usable.
    pub network_connected: bool,
    /// Initial full pull done or declined.
    pub has_hydrated_from_cloud: bool,
    /// Number of queued mutations.
    pub queue_len: usize,
}

/// Why a trigger did not start a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Another round is in flight.
    RoundActive,
    /// Sync is toggled off.
    SyncDisabled,
    /// No account to sync against.
    SignedOut,
    /// Automatic trigger while offline.
    Offline,
    /// Queue is empty.
    NothingToPush,
}

/// Outcome of the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Run `pull_all_data_for_new_device`.
    Pull,
    /// Run `push_changes`.
    Push,
    /// Do nothing.
    Skip(SkipReason),
}

/// A signed-in device that has not completed (or declined) its initial
/// full pull is a new device.
pub fn is_new_device(signed_in: bool, has_hydrated_from_cloud: bool) -> bool {
    signed_in && !has_hydrated_from_cloud
}

/// Decide what a trigger should do.
///
/// A new device always pulls first, even offline, so the pull can surface
/// the "continue offline" escape hatch. Established devices push when the
/// queue is non-empty. Offline automatic triggers are skipped; a manual
/// trigger still runs so the failure reaches the UI.
pub fn decide(inputs: DispatchInputs, trigger: Trigger) -> Decision {
    if inputs.round_active {
        return Decision::Skip(SkipReason::RoundActive);
    }
    if !inputs.sync_enabled {
        return Decision::Skip(SkipReason::SyncDisabled);
    }
    if !inputs.signed_in {
        return Decision::Skip(SkipReason::SignedOut);
    }
    if is_new_device(inputs.signed_in, inputs.has_hydrated_from_cloud) {
        return Decision::Pull;
    }
    if inputs.queue_len == 0 {
        return Decision::Skip(SkipReason::NothingToPush);
    }
    if !inputs.network_connected && !trigger.is_manual() {
        return Decision::Skip(SkipReason::Offline);
    }
    Decision::Push
}

#[cfg(test)]
mod tests {
    use super::*;

    fn established() -> DispatchInputs {
        DispatchInputs {
            round_active: false,
            sync_enabled: true,
            signed_in: true,
            network_connected: true,
            has_hydrated_from_cloud: true,
            queue_len: 3,
        }
    }

    #[test]
    fn new_device_requires_sign_in() {
        assert!(is_new_device(true, false));
        assert!(!is_new_device(true, true));
        assert!(!is_new_device(false, false));
    }

    #[test]
    fn established_device_with_queue_pushes() {
        assert_eq!(decide(established(), Trigger::Reconnect), Decision::Push);
    }

    #[test]
    fn new_device_pulls_instead_of_pushing() {
        let inputs = DispatchInputs {
            has_hydrated_from_cloud: false,
            ..established()
        };
        assert_eq!(decide(inputs, Trigger::Startup), Decision::Pull);
    }

    #[test]
    fn new_device_pulls_even_offline() {
        let inputs = DispatchInputs {
            has_hydrated_from_cloud: false,
            network_connected: false,
            ..established()
        };
        assert_eq!(decide(inputs, Trigger::Startup), Decision::Pull);
    }

    #[test]
    fn active_round_wins_over_everything() {
        let inputs = DispatchInputs {
            round_active: true,
            ..established()
        };
        for trigger in [Trigger::Manual, Trigger::Reconnect, Trigger::QueueChanged] {
            assert_eq!(
                decide(inputs, trigger),
                Decision::Skip(SkipReason::RoundActive)
            );
        }
    }

    #[test]
    fn disabled_sync_freezes_queue() {
        let inputs = DispatchInputs {
            sync_enabled: false,
            ..established()
        };
        assert_eq!(
            decide(inputs, Trigger::Manual),
            Decision::Skip(SkipReason::SyncDisabled)
        );
    }

    #[test]
    fn signed_out_skips() {
        let inputs = DispatchInputs {
            signed_in: false,
            ..established()
        };
        assert_eq!(
            decide(inputs, Trigger::Manual),
            Decision::Skip(SkipReason::SignedOut)
        );
    }

    #[test]
    fn empty_queue_skips() {
        let inputs = DispatchInputs {
            queue_len: 0,
            ..established()
        };
        assert_eq!(
            decide(inputs, Trigger::QueueChanged),
            Decision::Skip(SkipReason::NothingToPush)
        );
    }

    #[test]
    fn offline_automatic_trigger_skips_but_manual_runs() {
        let inputs = DispatchInputs {
            network_connected: false,
            ..established()
        };
        assert_eq!(
            decide(inputs, Trigger::QueueChanged),
            Decision::Skip(SkipReason::Offline)
        );
        assert_eq!(decide(inputs, Trigger::Manual), Decision::Push);
    }
}
