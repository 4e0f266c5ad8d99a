use std::fmt;

use nestcall_types_common::MemberId;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use utoipa::ToSchema;

/// A party in a call's signaling topology (spec §9 "Polymorphic peer identity").
///
/// The wire format keeps the historical magic string (`"recorder"`), but internally
/// this is a tagged sum rather than a `MemberId` that happens to sometimes hold garbage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ToSchema)]
#[schema(value_type = String, example = "recorder")]
pub enum PeerId {
    Member(MemberId),
    Recorder,
}

const RECORDER_LITERAL: &str = "recorder";

impl PeerId {
    pub fn as_member(self) -> Option<MemberId> {
        match self {
            Self::Member(id) => Some(id),
            Self::Recorder => None,
        }
    }

    pub fn is_recorder(self) -> bool {
        matches!(self, Self::Recorder)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Member(id) => write!(f, "{id}"),
            Self::Recorder => f.write_str(RECORDER_LITERAL),
        }
    }
}

impl From<MemberId> for PeerId {
    fn from(value: MemberId) -> Self {
        Self::Member(value)
    }
}

impl std::str::FromStr for PeerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == RECORDER_LITERAL {
            Ok(Self::Recorder)
        } else {
            Ok(Self::Member(s.parse::<uuid::Uuid>()?.into()))
        }
    }
}

impl Serialize for PeerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PeerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn recorder_round_trips_through_the_magic_string() {
        let json = serde_json::to_string(&PeerId::Recorder).unwrap();
        assert_eq!(json, "\"recorder\"");
        let back: PeerId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PeerId::Recorder);
    }

    #[test]
    fn member_round_trips_through_its_uuid() {
        let member = MemberId::generate();
        let peer = PeerId::Member(member);
        let json = serde_json::to_string(&peer).unwrap();
        let back: PeerId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, peer);
        assert_eq!(back.as_member(), Some(member));
    }
}
