use serde::Deserialize;
use utoipa::IntoParams;

/// `limit`/`offset` pagination query shared by the call history endpoint.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
pub struct PageQuery {
    #[serde(default = "PageQuery::default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl PageQuery {
    const DEFAULT_LIMIT: i64 = 30;
    const MAX_LIMIT: i64 = 100;

    fn default_limit() -> i64 {
        Self::DEFAULT_LIMIT
    }

    /// Clamp to a sane range so a caller cannot force an unbounded scan.
    pub fn clamped(self) -> Self {
        Self {
            limit: self.limit.clamp(1, Self::MAX_LIMIT),
            offset: self.offset.max(0),
        }
    }
}
