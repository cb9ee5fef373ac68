//! Field vocabulary translation between portal tickets and the helpdesk.
//!
//! The reverse tables fold several helpdesk states onto one portal status and
//! are therefore lossy: code 5 reads back as `pending` and is written out as 3.
//! Keep them that way.

use crate::models::{TicketPriority, TicketStatus};

/// Portal status → helpdesk `state_id`.
pub fn status_to_external(status: TicketStatus) -> i64 {
    match status {
        TicketStatus::Open => 1,
        TicketStatus::InProgress => 2,
        TicketStatus::Pending => 3,
        TicketStatus::Resolved => 4,
        TicketStatus::Closed => 6,
    }
}

/// Helpdesk `state_id` → portal status. Unknown codes read as `open`.
pub fn status_from_external(state_id: i64) -> TicketStatus {
    match state_id {
        1 => TicketStatus::Open,
        2 => TicketStatus::InProgress,
        3 | 5 => TicketStatus::Pending,
        4 | 6 | 7 => TicketStatus::Closed,
        _ => TicketStatus::Open,
    }
}

/// Portal priority → helpdesk `priority_id`.
pub fn priority_to_external(priority: TicketPriority) -> i64 {
    match priority {
        TicketPriority::Low => 1,
        TicketPriority::Medium => 2,
        TicketPriority::High => 3,
        TicketPriority::Critical => 4,
    }
}

/// Helpdesk `priority_id` → portal priority. Unknown codes read as `medium`.
pub fn priority_from_external(priority_id: i64) -> TicketPriority {
    match priority_id {
        1 => TicketPriority::Low,
        2 => TicketPriority::Medium,
        3 => TicketPriority::High,
        4 => TicketPriority::Critical,
        _ => TicketPriority::Medium,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_table() {
        assert_eq!(status_to_external(TicketStatus::Open), 1);
        assert_eq!(status_to_external(TicketStatus::InProgress), 2);
        assert_eq!(status_to_external(TicketStatus::Pending), 3);
        assert_eq!(status_to_external(TicketStatus::Resolved), 4);
        assert_eq!(status_to_external(TicketStatus::Closed), 6);
    }

    #[test]
    fn reverse_status_folds_many_to_one() {
        assert_eq!(status_from_external(3), TicketStatus::Pending);
        assert_eq!(status_from_external(5), TicketStatus::Pending);
        for code in [4, 6, 7] {
            assert_eq!(status_from_external(code), TicketStatus::Closed);
        }
        assert_eq!(status_from_external(0), TicketStatus::Open);
        assert_eq!(status_from_external(42), TicketStatus::Open);
    }

    #[test]
    fn status_round_trip_through_code_five_is_lossy() {
        assert_eq!(status_to_external(status_from_external(5)), 3);
        // `resolved` goes out as 4 and comes back as `closed`.
        assert_eq!(
            status_from_external(status_to_external(TicketStatus::Resolved)),
            TicketStatus::Closed
        );
    }

    #[test]
    fn priority_tables() {
        for (priority, code) in [
            (TicketPriority::Low, 1),
            (TicketPriority::Medium, 2),
            (TicketPriority::High, 3),
            (TicketPriority::Critical, 4),
        ] {
            assert_eq!(priority_to_external(priority), code);
            assert_eq!(priority_from_external(code), priority);
        }
        assert_eq!(priority_from_external(9), TicketPriority::Medium);
    }
}
