use nestcall_types_common::MemberId;
use nestcall_types_signaling::{Call, Participant, ParticipantStatus};

/// How a member relates to a call, from `CallCoordinator::list_active`'s point of
/// view (spec §4.5 `listActive`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Involvement {
    /// The caller is the initiator, or has accepted/joined — this call counts
    /// toward "active".
    Active,
    /// The caller is still `invited` — this call counts toward "incoming".
    Incoming,
    /// The caller has no stake in this call at all.
    None,
}

/// The read-side view over `(Call, Participant)` pairs already fetched from
/// `CallStore` (spec §4.4 "ParticipantRegistry").
///
/// This type owns no storage of its own — invariant 3 ("a participant's status
/// only moves forward") is enforced by [`crate::state_machine::CallStateMachine`],
/// the only place participant records are mutated.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParticipantRegistry;

impl ParticipantRegistry {
    /// The caller's own participant record in a call, if any ("my participation in
    /// call").
    pub fn my_participation<'a>(&self, participants: &'a [Participant], member_id: MemberId) -> Option<&'a Participant> {
        participants.iter().find(|p| p.member_id == member_id)
    }

    /// Whether `member_id` currently holds a non-terminal status in this call
    /// ("calls in which member has non-terminal status").
    pub fn has_non_terminal_status(&self, participants: &[Participant], member_id: MemberId) -> bool {
        self.my_participation(participants, member_id)
            .is_some_and(|p| !p.status.is_terminal())
    }

    /// Classify `member_id`'s relationship to `call` for `listActive` (spec §4.5):
    /// the call must be `ringing` or `active`, and the caller must be the
    /// initiator, or a participant who is `invited` (incoming) or
    /// `accepted`/`joined` (active).
    pub fn involvement(&self, call: &Call, participants: &[Participant], member_id: MemberId) -> Involvement {
        if !matches!(
            call.status,
            nestcall_types_signaling::CallStatus::Ringing | nestcall_types_signaling::CallStatus::Active
        ) {
            return Involvement::None;
        }
        if call.initiator_id == member_id {
            return Involvement::Active;
        }
        match self.my_participation(participants, member_id).map(|p| p.status) {
            Some(ParticipantStatus::Invited) => Involvement::Incoming,
            Some(ParticipantStatus::Accepted | ParticipantStatus::Joined) => Involvement::Active,
            _ => Involvement::None,
        }
    }

    /// Whether `member_id` is allowed to see signaling/recording data for this call:
    /// the initiator, or any participant record regardless of status (spec §4.5
    /// "verifying caller is a participant or the initiator").
    pub fn is_involved(&self, call: &Call, participants: &[Participant], member_id: MemberId) -> bool {
        call.initiator_id == member_id || self.my_participation(participants, member_id).is_some()
    }

    /// Whether `member_id` is actually in the call right now: the initiator, or a
    /// participant who has `accepted`/`joined` (spec §9 Open Question (a) — starting
    /// a recording requires more than having been invited or having already left).
    pub fn is_active_participant(&self, call: &Call, participants: &[Participant], member_id: MemberId) -> bool {
        if call.initiator_id == member_id {
            return true;
        }
        matches!(
            self.my_participation(participants, member_id).map(|p| p.status),
            Some(ParticipantStatus::Accepted | ParticipantStatus::Joined)
        )
    }
}

#[cfg(test)]
mod tests {
    use nestcall_types_common::{CallId, CallKind, GroupId, Timestamp};
    use nestcall_types_signaling::CallStatus;
    use pretty_assertions::assert_eq;

    use super::*;

    fn call(status: CallStatus, initiator: MemberId) -> Call {
        Call {
            id: CallId::generate(),
            group_id: GroupId::generate(),
            kind: CallKind::Voice,
            initiator_id: initiator,
            status,
            started_at: Timestamp::from_timestamp(0, 0).unwrap(),
            connected_at: None,
            ended_at: None,
            duration_ms: None,
            recording: nestcall_types_signaling::Recording::none(),
        }
    }

    fn participant(call_id: CallId, member_id: MemberId, status: ParticipantStatus) -> Participant {
        Participant {
            call_id,
            member_id,
            status,
            invited_at: Timestamp::from_timestamp(0, 0).unwrap(),
            responded_at: None,
            joined_at: None,
            left_at: None,
        }
    }

    #[test]
    fn initiator_is_always_active_while_ringing_or_active() {
        let initiator = MemberId::generate();
        let c = call(CallStatus::Ringing, initiator);
        let registry = ParticipantRegistry;
        assert_eq!(registry.involvement(&c, &[], initiator), Involvement::Active);
    }

    #[test]
    fn invited_participant_is_incoming() {
        let initiator = MemberId::generate();
        let invitee = MemberId::generate();
        let c = call(CallStatus::Ringing, initiator);
        let participants = vec![participant(c.id, invitee, ParticipantStatus::Invited)];
        let registry = ParticipantRegistry;
        assert_eq!(registry.involvement(&c, &participants, invitee), Involvement::Incoming);
    }

    #[test]
    fn accepted_participant_is_active_and_not_incoming() {
        let initiator = MemberId::generate();
        let invitee = MemberId::generate();
        let c = call(CallStatus::Active, initiator);
        let participants = vec![participant(c.id, invitee, ParticipantStatus::Accepted)];
        let registry = ParticipantRegistry;
        assert_eq!(registry.involvement(&c, &participants, invitee), Involvement::Active);
    }

    #[test]
    fn ended_call_has_no_involvement() {
        let initiator = MemberId::generate();
        let c = call(CallStatus::Ended, initiator);
        let registry = ParticipantRegistry;
        assert_eq!(registry.involvement(&c, &[], initiator), Involvement::None);
    }

    #[test]
    fn invited_participant_is_not_an_active_participant() {
        let initiator = MemberId::generate();
        let invitee = MemberId::generate();
        let c = call(CallStatus::Ringing, initiator);
        let participants = vec![participant(c.id, invitee, ParticipantStatus::Invited)];
        let registry = ParticipantRegistry;
        assert!(!registry.is_active_participant(&c, &participants, invitee));
    }

    #[test]
    fn accepted_participant_is_an_active_participant() {
        let initiator = MemberId::generate();
        let invitee = MemberId::generate();
        let c = call(CallStatus::Active, initiator);
        let participants = vec![participant(c.id, invitee, ParticipantStatus::Accepted)];
        let registry = ParticipantRegistry;
        assert!(registry.is_active_participant(&c, &participants, invitee));
    }

    #[test]
    fn participant_who_left_is_not_an_active_participant() {
        let initiator = MemberId::generate();
        let invitee = MemberId::generate();
        let c = call(CallStatus::Active, initiator);
        let participants = vec![participant(c.id, invitee, ParticipantStatus::Left)];
        let registry = ParticipantRegistry;
        assert!(!registry.is_active_participant(&c, &participants, invitee));
    }
}
