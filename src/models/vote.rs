use serde::{Deserialize, Serialize};

use super::record_id::RecordId;

/// Which of a poll's four options a vote selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollOption {
    A,
    B,
    C,
    D,
}

impl PollOption {
    /// All options in display order.
    pub const ALL: [PollOption; 4] = [Self::A, Self::B, Self::C, Self::D];
}

/// A single vote. The store enforces one vote per `(poll, user)` pair with
/// a unique constraint; a second insert is rejected with code `23505`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    /// Row identifier.
    pub id: RecordId,

    /// The poll voted on.
    pub poll_id: RecordId,

    /// The voting user.
    pub user_id: RecordId,

    /// The chosen option.
    pub option: PollOption,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_option_wire_form() {
        assert_eq!(serde_json::to_string(&PollOption::A).unwrap(), "\"a\"");
        let opt: PollOption = serde_json::from_str("\"d\"").unwrap();
        assert_eq!(opt, PollOption::D);
    }
}
