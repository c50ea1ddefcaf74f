//! Pairing validation for port selections.
//!
//! Decides whether two selected ports can form a patch and, if so, which of
//! them is the sender.

use super::port::{PortDescriptor, PortRole};

/// Reasons two selected ports cannot be patched together.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PairingError {
    /// Both ports have the same role.
    #[error("no match: both are {}s", .0.name())]
    SameRole(PortRole),
    /// The ports carry different message categories.
    #[error("incompatible message category: {sender} cannot feed {receiver}")]
    CategoryMismatch { sender: String, receiver: String },
    /// Sender and receiver belong to the same module and self patching is
    /// switched off.
    #[error("cannot patch a module into itself")]
    SelfPatch,
}

/// Result of a pairing check, with the selections sorted by role.
pub type Pairing = Result<(PortDescriptor, PortDescriptor), PairingError>;

/// Validates two selections and orders them as `(sender, receiver)`.
///
/// # Pairing Rules
///
/// | Check                         | Outcome               |
/// |-------------------------------|-----------------------|
/// | sender + receiver, same category | `Ok((sender, receiver))` |
/// | two senders / two receivers   | `SameRole`            |
/// | categories differ             | `CategoryMismatch`    |
/// | same module, self patch off   | `SelfPatch`           |
///
/// Categories compare as exact strings; there is no wildcard.
pub fn validate_pairing(
    first: PortDescriptor,
    second: PortDescriptor,
    allow_self_patch: bool,
) -> Pairing {
    let (sender, receiver) = match (first.role, second.role) {
        (PortRole::Sender, PortRole::Receiver) => (first, second),
        (PortRole::Receiver, PortRole::Sender) => (second, first),
        (role, _) => return Err(PairingError::SameRole(role)),
    };

    if sender.category != receiver.category {
        return Err(PairingError::CategoryMismatch {
            sender: sender.category,
            receiver: receiver.category,
        });
    }

    if !allow_self_patch && sender.module == receiver.module {
        return Err(PairingError::SelfPatch);
    }

    Ok((sender, receiver))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleId;
    use crate::patch::port::category;

    fn sender(module: u64, cat: &str) -> PortDescriptor {
        PortDescriptor::sender(ModuleId(module), cat)
    }

    fn receiver(module: u64, cat: &str) -> PortDescriptor {
        PortDescriptor::receiver(ModuleId(module), cat)
    }

    #[test]
    fn test_sender_then_receiver() {
        let (s, r) = validate_pairing(sender(1, category::MIDI), receiver(2, category::MIDI), true)
            .unwrap();
        assert_eq!(s.module, ModuleId(1));
        assert_eq!(r.module, ModuleId(2));
    }

    #[test]
    fn test_receiver_then_sender_is_reordered() {
        let (s, r) = validate_pairing(receiver(2, category::MIDI), sender(1, category::MIDI), true)
            .unwrap();
        assert!(s.is_sender());
        assert!(r.is_receiver());
        assert_eq!(s.module, ModuleId(1));
    }

    #[test]
    fn test_two_senders_rejected() {
        let result = validate_pairing(sender(1, category::MIDI), sender(2, category::MIDI), true);
        assert_eq!(result, Err(PairingError::SameRole(PortRole::Sender)));
    }

    #[test]
    fn test_two_receivers_rejected() {
        let result = validate_pairing(receiver(1, category::MIDI), receiver(2, category::MIDI), true);
        assert_eq!(result, Err(PairingError::SameRole(PortRole::Receiver)));
    }

    #[test]
    fn test_category_mismatch_rejected() {
        let result = validate_pairing(sender(1, category::MIDI), receiver(2, category::HEARTBEAT), true);
        assert_eq!(
            result,
            Err(PairingError::CategoryMismatch {
                sender: "midi".to_string(),
                receiver: "heartbeat".to_string(),
            })
        );
    }

    #[test]
    fn test_role_checked_before_category() {
        let result = validate_pairing(sender(1, category::MIDI), sender(2, category::HEARTBEAT), true);
        assert!(matches!(result, Err(PairingError::SameRole(_))));
    }

    #[test]
    fn test_self_patch_policy() {
        assert!(validate_pairing(sender(1, category::MIDI), receiver(1, category::MIDI), true).is_ok());
        assert_eq!(
            validate_pairing(sender(1, category::MIDI), receiver(1, category::MIDI), false),
            Err(PairingError::SelfPatch)
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            PairingError::SameRole(PortRole::Sender).to_string(),
            "no match: both are senders"
        );
        assert!(PairingError::CategoryMismatch {
            sender: "midi".into(),
            receiver: "heartbeat".into(),
        }
        .to_string()
        .starts_with("incompatible message category"));
    }
}
