//! Microphone arbitration between the streaming and recording paths

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::error::AudioKitError;

/// Components that open the input device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceUser {
    AmplitudeStream,
    FileRecorder,
}

impl DeviceUser {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AmplitudeStream => "amplitude stream",
            Self::FileRecorder => "file recorder",
        }
    }
}

impl fmt::Display for DeviceUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How concurrent acquisitions are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePolicy {
    /// Second acquirer gets `DeviceBusy`
    #[default]
    Exclusive,
    /// Both paths may open the device at once. What the hardware does with
    /// two simultaneous opens is platform dependent.
    Shared,
}

/// Tracks which component currently holds the microphone.
///
/// Cloning yields a handle to the same arbiter.
#[derive(Debug, Clone, Default)]
pub struct DeviceArbiter {
    holders: Arc<Mutex<Vec<DeviceUser>>>,
    policy: DevicePolicy,
}

impl DeviceArbiter {
    pub fn new(policy: DevicePolicy) -> Self {
        Self {
            holders: Arc::new(Mutex::new(Vec::new())),
            policy,
        }
    }

    pub fn policy(&self) -> DevicePolicy {
        self.policy
    }

    /// Claim the device for `user`. The claim lasts until the lease drops.
    pub fn acquire(&self, user: DeviceUser) -> Result<DeviceLease, AudioKitError> {
        let mut holders = self.holders.lock();

        if holders.contains(&user) {
            return Err(AudioKitError::DeviceBusy { held_by: user });
        }
        if let Some(&held_by) = holders.first() {
            if self.policy == DevicePolicy::Exclusive {
                return Err(AudioKitError::DeviceBusy { held_by });
            }
            tracing::warn!(
                "{} opening input device already held by {} (shared policy)",
                user,
                held_by
            );
        }

        holders.push(user);
        tracing::debug!("Input device acquired by {}", user);

        Ok(DeviceLease {
            holders: Arc::clone(&self.holders),
            user,
        })
    }

    /// Current holders, oldest first
    pub fn holders(&self) -> Vec<DeviceUser> {
        self.holders.lock().clone()
    }
}

/// Proof of device ownership; releases the claim on drop
#[derive(Debug)]
pub struct DeviceLease {
    holders: Arc<Mutex<Vec<DeviceUser>>>,
    user: DeviceUser,
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        let mut holders = self.holders.lock();
        if let Some(pos) = holders.iter().position(|u| *u == self.user) {
            holders.remove(pos);
        }
        tracing::debug!("Input device released by {}", self.user);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusive_rejects_second_user() {
        let arbiter = DeviceArbiter::new(DevicePolicy::Exclusive);
        let _lease = arbiter.acquire(DeviceUser::AmplitudeStream).unwrap();

        let err = arbiter.acquire(DeviceUser::FileRecorder).unwrap_err();
        assert_eq!(
            err,
            AudioKitError::DeviceBusy {
                held_by: DeviceUser::AmplitudeStream
            }
        );
    }

    #[test]
    fn drop_releases() {
        let arbiter = DeviceArbiter::new(DevicePolicy::Exclusive);
        let lease = arbiter.acquire(DeviceUser::FileRecorder).unwrap();
        assert_eq!(arbiter.holders(), vec![DeviceUser::FileRecorder]);

        drop(lease);
        assert!(arbiter.holders().is_empty());
        assert!(arbiter.acquire(DeviceUser::AmplitudeStream).is_ok());
    }

    #[test]
    fn shared_allows_both_paths() {
        let arbiter = DeviceArbiter::new(DevicePolicy::Shared);
        let _a = arbiter.acquire(DeviceUser::AmplitudeStream).unwrap();
        let _b = arbiter.acquire(DeviceUser::FileRecorder).unwrap();
        assert_eq!(arbiter.holders().len(), 2);
    }

    #[test]
    fn shared_still_rejects_same_user_twice() {
        let arbiter = DeviceArbiter::new(DevicePolicy::Shared);
        let _a = arbiter.acquire(DeviceUser::FileRecorder).unwrap();
        assert!(arbiter.acquire(DeviceUser::FileRecorder).is_err());
    }

    #[test]
    fn clones_share_state() {
        let arbiter = DeviceArbiter::default();
        let other = arbiter.clone();
        let _lease = arbiter.acquire(DeviceUser::FileRecorder).unwrap();
        assert!(other.acquire(DeviceUser::AmplitudeStream).is_err());
    }
}
