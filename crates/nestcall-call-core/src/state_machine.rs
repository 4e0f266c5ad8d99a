use nestcall_types_common::{MemberId, Timestamp};
use nestcall_types_signaling::{Call, CallStatus, Participant, ParticipantStatus};

use crate::error::{CallCoreError, InvalidInviteesSnafu};

/// The outcome of a [`CallStateMachine`] transition: the updated `Call` plus every
/// `Participant` whose record changed.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub call: Call,
    pub changed_participants: Vec<Participant>,
}

/// Enforces spec §4.3's transition table. Stateless: every method takes the current
/// snapshot and returns the next one (or a rejection), touching no storage and no
/// capability itself. Checks that require a capability (group read-only, role
/// lookups, group-membership lookups) are the caller's job — this type only ever
/// sees facts already resolved into plain values.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallStateMachine;

impl CallStateMachine {
    /// Build the initial `Call` + invited `Participant`s for `Initiate` (spec §4.3).
    ///
    /// Only checks the preconditions that do not require a capability: at least one
    /// invitee, and the initiator is not among them. The caller is responsible for
    /// the group-read-only, supervisor-role, and registered-member checks before
    /// calling this.
    pub fn initiate(
        &self,
        call_id: nestcall_types_common::CallId,
        group_id: nestcall_types_common::GroupId,
        kind: nestcall_types_common::CallKind,
        initiator: MemberId,
        invitees: &[MemberId],
        now: Timestamp,
    ) -> Result<TransitionOutcome, CallCoreError> {
        if invitees.is_empty() {
            return InvalidInviteesSnafu {
                reason: "at least one invitee is required",
            }
            .fail();
        }
        if invitees.iter().any(|invitee| *invitee == initiator) {
            return InvalidInviteesSnafu {
                reason: "the initiator cannot invite themselves",
            }
            .fail();
        }

        let call = Call {
            id: call_id,
            group_id,
            kind,
            initiator_id: initiator,
            status: CallStatus::Ringing,
            started_at: now,
            connected_at: None,
            ended_at: None,
            duration_ms: None,
            recording: nestcall_types_signaling::Recording::none(),
        };
        let participants = invitees
            .iter()
            .map(|&member_id| Participant {
                call_id,
                member_id,
                status: ParticipantStatus::Invited,
                invited_at: now,
                responded_at: None,
                joined_at: None,
                left_at: None,
            })
            .collect();

        Ok(TransitionOutcome {
            call,
            changed_participants: participants,
        })
    }

    /// `Respond(caller, accept)` (spec §4.3).
    pub fn respond(
        &self,
        call: &Call,
        participants: &[Participant],
        caller: MemberId,
        accept: bool,
        now: Timestamp,
    ) -> Result<TransitionOutcome, CallCoreError> {
        if !matches!(call.status, CallStatus::Ringing | CallStatus::Active) {
            return Err(CallCoreError::CallTerminal);
        }
        let mut participant = participants
            .iter()
            .find(|p| p.member_id == caller)
            .copied()
            .ok_or(CallCoreError::ParticipantNotFound)?;
        if participant.status != ParticipantStatus::Invited {
            return Err(CallCoreError::AlreadyResponded);
        }

        participant.status = if accept {
            ParticipantStatus::Accepted
        } else {
            ParticipantStatus::Rejected
        };
        participant.responded_at = Some(now);

        let mut call = call.clone();
        if accept {
            if call.connected_at.is_none() {
                call.connected_at = Some(now);
            }
            call.status = CallStatus::Active;
        } else {
            let all_rejected = participants.iter().all(|p| {
                if p.member_id == caller {
                    true
                } else {
                    p.status == ParticipantStatus::Rejected
                }
            });
            if all_rejected {
                call.status = CallStatus::Missed;
                call.ended_at = Some(now);
                call.duration_ms = call.compute_duration_ms(now);
            }
        }

        Ok(TransitionOutcome {
            call,
            changed_participants: vec![participant],
        })
    }

    /// `Leave(caller)` (spec §4.3). `caller_is_initiator` distinguishes the two
    /// branches of the table — the initiator leaving always ends the call, a
    /// participant leaving only sometimes does.
    pub fn leave(
        &self,
        call: &Call,
        participants: &[Participant],
        caller: MemberId,
        caller_is_initiator: bool,
        now: Timestamp,
    ) -> Result<TransitionOutcome, CallCoreError> {
        if caller_is_initiator {
            if call.status.is_terminal() {
                return Err(CallCoreError::CallTerminal);
            }
            return Ok(Self::end_call(call, participants, now));
        }

        let Some(mut participant) = participants.iter().find(|p| p.member_id == caller).copied() else {
            return Err(CallCoreError::ParticipantNotFound);
        };
        if participant.status == ParticipantStatus::Left {
            // Idempotent: leaving twice is a no-op success, even if the call itself
            // ended as a side effect of the first leave (spec §4.3 tie-break).
            return Ok(TransitionOutcome {
                call: call.clone(),
                changed_participants: vec![],
            });
        }
        if call.status.is_terminal() {
            return Err(CallCoreError::CallTerminal);
        }

        participant.status = ParticipantStatus::Left;
        participant.left_at = Some(now);

        let remaining_non_terminal = participants
            .iter()
            .any(|p| p.member_id != caller && !p.status.is_terminal());

        if remaining_non_terminal {
            Ok(TransitionOutcome {
                call: call.clone(),
                changed_participants: vec![participant],
            })
        } else {
            let mut outcome = Self::end_call(call, participants, now);
            outcome.changed_participants = merge_participant(outcome.changed_participants, participant);
            Ok(outcome)
        }
    }

    /// `End(caller)` (spec §4.3): identical effect to the initiator ending the call,
    /// regardless of who actually called it.
    pub fn end(
        &self,
        call: &Call,
        participants: &[Participant],
        now: Timestamp,
    ) -> Result<TransitionOutcome, CallCoreError> {
        if call.status.is_terminal() {
            return Err(CallCoreError::CallTerminal);
        }
        Ok(Self::end_call(call, participants, now))
    }

    fn end_call(call: &Call, participants: &[Participant], now: Timestamp) -> TransitionOutcome {
        let mut call = call.clone();
        let next_status = if call.status == CallStatus::Ringing {
            CallStatus::Missed
        } else {
            CallStatus::Ended
        };
        call.status = next_status;
        call.ended_at = Some(now);
        call.duration_ms = call.compute_duration_ms(now);

        let changed_participants = participants
            .iter()
            .filter(|p| !p.status.is_terminal())
            .map(|p| {
                let mut p = *p;
                p.status = ParticipantStatus::Left;
                p.left_at = Some(now);
                p
            })
            .collect();

        TransitionOutcome {
            call,
            changed_participants,
        }
    }
}

fn merge_participant(mut changed: Vec<Participant>, participant: Participant) -> Vec<Participant> {
    if !changed.iter().any(|p| p.member_id == participant.member_id) {
        changed.push(participant);
    }
    changed
}

#[cfg(test)]
mod tests {
    use nestcall_types_common::{CallId, CallKind, GroupId};
    use pretty_assertions::assert_eq;

    use super::*;

    fn now() -> Timestamp {
        Timestamp::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn later(seconds: i64) -> Timestamp {
        now() + chrono::Duration::seconds(seconds)
    }

    fn initiate(invitees: &[MemberId]) -> TransitionOutcome {
        CallStateMachine
            .initiate(
                CallId::generate(),
                GroupId::generate(),
                CallKind::Voice,
                MemberId::generate(),
                invitees,
                now(),
            )
            .unwrap()
    }

    #[test]
    fn initiate_rejects_empty_invitees() {
        let err = CallStateMachine
            .initiate(
                CallId::generate(),
                GroupId::generate(),
                CallKind::Voice,
                MemberId::generate(),
                &[],
                now(),
            )
            .unwrap_err();
        assert!(matches!(err, CallCoreError::InvalidInvitees { .. }));
    }

    #[test]
    fn initiate_rejects_self_invite() {
        let initiator = MemberId::generate();
        let err = CallStateMachine
            .initiate(
                CallId::generate(),
                GroupId::generate(),
                CallKind::Voice,
                initiator,
                &[initiator],
                now(),
            )
            .unwrap_err();
        assert!(matches!(err, CallCoreError::InvalidInvitees { .. }));
    }

    #[test]
    fn two_party_call_completes() {
        let b = MemberId::generate();
        let outcome = initiate(&[b]);
        let call = outcome.call;
        let participants = outcome.changed_participants;

        let accepted = CallStateMachine.respond(&call, &participants, b, true, later(1)).unwrap();
        assert_eq!(accepted.call.status, CallStatus::Active);
        assert_eq!(accepted.call.connected_at, Some(later(1)));

        let ended = CallStateMachine
            .end(&accepted.call, &accepted.changed_participants, later(31))
            .unwrap();
        assert_eq!(ended.call.status, CallStatus::Ended);
        assert_eq!(ended.call.duration_ms, Some(30_000));
        assert_eq!(ended.changed_participants[0].status, ParticipantStatus::Left);
    }

    #[test]
    fn three_party_reject_cascade_ends_in_missed() {
        let b = MemberId::generate();
        let c = MemberId::generate();
        let outcome = initiate(&[b, c]);
        let mut participants = outcome.changed_participants;

        let after_b = CallStateMachine
            .respond(&outcome.call, &participants, b, false, later(1))
            .unwrap();
        assert_eq!(after_b.call.status, CallStatus::Ringing);
        for changed in after_b.changed_participants {
            let slot = participants.iter_mut().find(|p| p.member_id == changed.member_id).unwrap();
            *slot = changed;
        }

        let after_c = CallStateMachine
            .respond(&after_b.call, &participants, c, false, later(2))
            .unwrap();
        assert_eq!(after_c.call.status, CallStatus::Missed);
        assert_eq!(after_c.call.duration_ms, None);
        assert!(after_c.call.ended_at.is_some());
    }

    #[test]
    fn respond_twice_is_already_responded() {
        let b = MemberId::generate();
        let outcome = initiate(&[b]);
        let first = CallStateMachine
            .respond(&outcome.call, &outcome.changed_participants, b, true, later(1))
            .unwrap();
        let err = CallStateMachine
            .respond(&first.call, &first.changed_participants, b, true, later(2))
            .unwrap_err();
        assert!(matches!(err, CallCoreError::AlreadyResponded));
    }

    #[test]
    fn initiator_leaving_while_ringing_misses_the_call() {
        let b = MemberId::generate();
        let outcome = initiate(&[b]);
        let left = CallStateMachine
            .leave(&outcome.call, &outcome.changed_participants, outcome.call.initiator_id, true, later(5))
            .unwrap();
        assert_eq!(left.call.status, CallStatus::Missed);
        assert_eq!(left.changed_participants[0].status, ParticipantStatus::Left);
    }

    #[test]
    fn leaving_twice_is_idempotent() {
        let b = MemberId::generate();
        let outcome = initiate(&[b]);
        let accepted = CallStateMachine
            .respond(&outcome.call, &outcome.changed_participants, b, true, later(1))
            .unwrap();
        let first_leave = CallStateMachine
            .leave(&accepted.call, &accepted.changed_participants, b, false, later(2))
            .unwrap();
        let second_leave = CallStateMachine
            .leave(&first_leave.call, &first_leave.changed_participants, b, false, later(3))
            .unwrap();
        assert!(second_leave.changed_participants.is_empty());
    }

    #[test]
    fn a_second_invitee_can_accept_after_the_call_is_already_active() {
        let b = MemberId::generate();
        let c = MemberId::generate();
        let outcome = initiate(&[b, c]);
        let mut participants = outcome.changed_participants;

        let after_b = CallStateMachine
            .respond(&outcome.call, &participants, b, true, later(1))
            .unwrap();
        assert_eq!(after_b.call.status, CallStatus::Active);
        assert_eq!(after_b.call.connected_at, Some(later(1)));
        for changed in after_b.changed_participants {
            let slot = participants.iter_mut().find(|p| p.member_id == changed.member_id).unwrap();
            *slot = changed;
        }

        let after_c = CallStateMachine
            .respond(&after_b.call, &participants, c, true, later(2))
            .unwrap();
        assert_eq!(after_c.call.status, CallStatus::Active);
        // connected_at is assigned exactly once, at the first acceptance
        assert_eq!(after_c.call.connected_at, Some(later(1)));
        assert_eq!(after_c.changed_participants[0].status, ParticipantStatus::Accepted);
    }
}
