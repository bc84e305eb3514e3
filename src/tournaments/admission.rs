//! Capacity-gated admission. The decision itself is a pure function; its
//! inputs (`current_teams`, the waitlist count) must be read inside the
//! registration transaction, after the write lock is held, so two
//! concurrent registrations can never both observe one remaining slot.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::tournaments::Tournament;

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum Admission {
    /// A confirmed slot is available.
    Admit,
    /// Bracket full, waitlist open, entrant opted in.
    Waitlist,
    /// Bracket full, waitlist open, but the entrant has not opted in yet:
    /// they must be asked to confirm before anything is written.
    OfferWaitlist { slots_total: i64, slots_taken: i64 },
    /// Bracket full and the waitlist is closed or full.
    Reject,
}

pub fn decide(
    tournament: &Tournament,
    waitlisted_count: i64,
    join_waitlist: bool,
    now: NaiveDateTime,
) -> Admission {
    if tournament.current_teams < tournament.max_teams {
        return Admission::Admit;
    }

    let waitlist_open = !tournament.has_started(now)
        && waitlisted_count < tournament.max_waitlist_slots;

    if !waitlist_open {
        Admission::Reject
    } else if join_waitlist {
        Admission::Waitlist
    } else {
        Admission::OfferWaitlist {
            slots_total: tournament.max_waitlist_slots,
            slots_taken: waitlisted_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn tournament(current: i64, max: i64, max_waitlist: i64) -> Tournament {
        let now = Utc::now().naive_utc();
        Tournament {
            id: "t".to_string(),
            name: "Test Cup".to_string(),
            game: "chess".to_string(),
            mode: "solo".to_string(),
            status: "open".to_string(),
            entry_fee: 100,
            current_teams: current,
            max_teams: max,
            max_waitlist_slots: max_waitlist,
            start_date: now + Duration::hours(2),
            checkin_window_minutes: 30,
            auto_finalize: true,
            finalized_at: None,
            created_at: now,
        }
    }

    #[test]
    fn admits_while_slots_remain() {
        let now = Utc::now().naive_utc();
        let t = tournament(7, 8, 4);
        assert_eq!(decide(&t, 0, false, now), Admission::Admit);
    }

    #[test]
    fn full_bracket_offers_waitlist_until_opted_in() {
        let now = Utc::now().naive_utc();
        let t = tournament(8, 8, 4);

        assert_eq!(
            decide(&t, 1, false, now),
            Admission::OfferWaitlist {
                slots_total: 4,
                slots_taken: 1
            }
        );
        assert_eq!(decide(&t, 1, true, now), Admission::Waitlist);
    }

    #[test]
    fn rejects_when_waitlist_is_full() {
        let now = Utc::now().naive_utc();
        let t = tournament(8, 8, 4);
        assert_eq!(decide(&t, 4, true, now), Admission::Reject);
    }

    #[test]
    fn waitlist_closes_once_the_tournament_has_started() {
        let now = Utc::now().naive_utc();
        let mut t = tournament(8, 8, 4);
        t.start_date = now - Duration::minutes(1);
        assert_eq!(decide(&t, 0, true, now), Admission::Reject);
    }
}
