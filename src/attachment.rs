//! Attachment model and progress state machine
//!
//! [`Progress`] is the single source of truth for where an attachment is in its
//! lifecycle. All state changes go through the transition methods on it, which
//! are pure and never touch storage; callers persist the result with a
//! conditional update keyed on the previous state.
//!
//! ```text
//!             start                 complete
//!   None ───────────────► Downloading ─────────► Done ──purge──► Deleted
//!    ▲                     │  ▲   │ report(p'>p)                    │
//!    │                     │  └───┘                                 │
//!    │                fail │                      start (not expired)
//!    │                     ▼                                        │
//!    └──── (never) ────  Failed ◄──────────────────────────────────-┘
//!                          │ start (retry)
//!                          └──────────► Downloading
//! ```

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

use crate::content::Locator;

/// Persisted integer codes for [`Progress`]
///
/// Values `0..=99` encode a determinate download percentage.
pub mod progress_code {
    /// No download attempted
    pub const NONE: i32 = -1;
    /// Downloading, total size unknown
    pub const INDETERMINATE: i32 = -2;
    /// Last attempt failed
    pub const FAILED: i32 = -3;
    /// Content purged
    pub const DELETED: i32 = -4;
    /// Content present
    pub const DONE: i32 = 100;
}

/// Highest percentage a running download may report; 100 is reserved for `Done`
pub const MAX_DOWNLOADING_PERCENT: u8 = 99;

/// Attachment download progress
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Progress {
    /// No download attempted yet
    None,
    /// Transfer running; `percent` is `None` while the total size is unknown
    Downloading {
        /// Percent complete in `0..=99`
        percent: Option<u8>,
    },
    /// Transfer complete, content present
    Done,
    /// Last attempt errored, was cancelled, or the source had expired
    Failed,
    /// Content purged by the user or by retention
    Deleted,
}

/// Rejected state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// A transfer is already running
    #[error("a download is already in progress")]
    AlreadyDownloading,

    /// The source URL is past its expiry
    #[error("the attachment source has expired")]
    Expired,

    /// Operation requires a running transfer
    #[error("no download in progress (state: {0:?})")]
    NotDownloading(Progress),

    /// Progress would move backwards
    #[error("progress must not decrease ({from:?} -> {to:?})")]
    NotMonotonic {
        /// Current percent
        from: Option<u8>,
        /// Rejected percent
        to: Option<u8>,
    },

    /// Percent outside `0..=99`
    #[error("percent {0} out of range")]
    OutOfRange(u8),

    /// Purge requires downloaded content
    #[error("attachment is not downloaded (state: {0:?})")]
    NotDone(Progress),
}

impl Progress {
    /// Decode a persisted progress code
    ///
    /// Unknown codes decode as `Failed` so a corrupt row can be retried.
    pub fn from_code(code: i32) -> Self {
        match code {
            progress_code::NONE => Progress::None,
            progress_code::INDETERMINATE => Progress::Downloading { percent: None },
            progress_code::FAILED => Progress::Failed,
            progress_code::DELETED => Progress::Deleted,
            progress_code::DONE => Progress::Done,
            p if (0..=MAX_DOWNLOADING_PERCENT as i32).contains(&p) => Progress::Downloading {
                percent: Some(p as u8),
            },
            _ => Progress::Failed,
        }
    }

    /// Encode for persistence
    pub fn to_code(self) -> i32 {
        match self {
            Progress::None => progress_code::NONE,
            Progress::Downloading { percent: None } => progress_code::INDETERMINATE,
            Progress::Downloading { percent: Some(p) } => p as i32,
            Progress::Done => progress_code::DONE,
            Progress::Failed => progress_code::FAILED,
            Progress::Deleted => progress_code::DELETED,
        }
    }

    /// Whether a transfer is running
    pub fn is_downloading(self) -> bool {
        matches!(self, Progress::Downloading { .. })
    }

    /// Begin a (new) transfer
    ///
    /// Starts at 0% when the size is known, indeterminate otherwise.
    pub fn start(self, expired: bool, size_known: bool) -> Result<Progress, TransitionError> {
        if self.is_downloading() {
            return Err(TransitionError::AlreadyDownloading);
        }
        if expired {
            return Err(TransitionError::Expired);
        }
        Ok(Progress::Downloading {
            percent: size_known.then_some(0),
        })
    }

    /// Record transfer progress
    pub fn report(self, percent: Option<u8>) -> Result<Progress, TransitionError> {
        let Progress::Downloading { percent: current } = self else {
            return Err(TransitionError::NotDownloading(self));
        };
        if let Some(p) = percent
            && p > MAX_DOWNLOADING_PERCENT
        {
            return Err(TransitionError::OutOfRange(p));
        }
        match (current, percent) {
            (Some(from), Some(to)) if to < from => Err(TransitionError::NotMonotonic {
                from: current,
                to: percent,
            }),
            (Some(_), None) => Err(TransitionError::NotMonotonic {
                from: current,
                to: percent,
            }),
            _ => Ok(Progress::Downloading { percent }),
        }
    }

    /// Finish a transfer successfully
    pub fn complete(self) -> Result<Progress, TransitionError> {
        if !self.is_downloading() {
            return Err(TransitionError::NotDownloading(self));
        }
        Ok(Progress::Done)
    }

    /// Finish a transfer unsuccessfully (error or cancellation)
    pub fn fail(self) -> Result<Progress, TransitionError> {
        if !self.is_downloading() {
            return Err(TransitionError::NotDownloading(self));
        }
        Ok(Progress::Failed)
    }

    /// Record that a download was refused because the source expired
    pub fn expire(self) -> Result<Progress, TransitionError> {
        if self.is_downloading() {
            return Err(TransitionError::AlreadyDownloading);
        }
        Ok(Progress::Failed)
    }

    /// Content removed
    pub fn purge(self) -> Result<Progress, TransitionError> {
        match self {
            Progress::Done => Ok(Progress::Deleted),
            other => Err(TransitionError::NotDone(other)),
        }
    }
}

/// Downloadable payload owned by a notification
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Attachment {
    /// Display file name
    pub name: String,
    /// Source location
    pub url: String,
    /// Local content, present only when `progress` is `Done`
    #[schema(value_type = Option<String>)]
    pub content_uri: Option<Locator>,
    /// MIME type, if announced
    pub mime_type: Option<String>,
    /// Size in bytes, if announced
    pub size: Option<u64>,
    /// Unix timestamp after which `url` is no longer fetchable
    pub expires: Option<i64>,
    /// Lifecycle state
    pub progress: Progress,
}

impl Attachment {
    /// Create a not-yet-downloaded attachment
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            content_uri: None,
            mime_type: None,
            size: None,
            expires: None,
            progress: Progress::None,
        }
    }

    /// Whether the source is past its expiry at `now`
    ///
    /// Expiry is exact: the source is still fetchable at `now == expires`.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires.is_some_and(|expires| expires < now)
    }

    /// Whether the content/progress invariants hold
    ///
    /// `content_uri` is set exactly when the attachment is `Done`.
    pub fn check_invariants(&self) -> bool {
        self.content_uri.is_some() == (self.progress == Progress::Done)
    }

    /// Copy with content attached and state `Done`
    pub fn completed(&self, locator: Locator, bytes: u64) -> Result<Self, TransitionError> {
        Ok(Self {
            progress: self.progress.complete()?,
            content_uri: Some(locator),
            size: self.size.or(Some(bytes)),
            ..self.clone()
        })
    }

    /// Copy with state `Failed`
    pub fn failed(&self) -> Result<Self, TransitionError> {
        Ok(Self {
            progress: self.progress.fail()?,
            content_uri: None,
            ..self.clone()
        })
    }

    /// Copy with content cleared and state `Deleted`
    pub fn purged(&self) -> Result<Self, TransitionError> {
        Ok(Self {
            progress: self.progress.purge()?,
            content_uri: None,
            ..self.clone()
        })
    }

    /// Human-readable status, given whether the local content still exists
    pub fn status(&self, exists: bool, now: i64) -> AttachmentStatus {
        let state = if exists && self.content_uri.is_some() {
            StatusKind::Downloaded
        } else {
            match self.progress {
                Progress::None => StatusKind::NotDownloaded,
                Progress::Downloading { percent } => StatusKind::Downloading(percent),
                Progress::Done | Progress::Deleted => StatusKind::Deleted,
                Progress::Failed => StatusKind::Failed,
            }
        };
        let expiry = match self.expires {
            Some(expires) if expires < now => Expiry::Expired,
            Some(expires) => Expiry::At(expires),
            None => Expiry::Never,
        };
        AttachmentStatus {
            size: self.size,
            state,
            expiry,
        }
    }
}

/// Percent complete for `bytes` out of `total`, capped below completion
pub fn percent_of(bytes: u64, total: Option<u64>) -> Option<u8> {
    let total = total.filter(|t| *t > 0)?;
    let percent = bytes.saturating_mul(100) / total;
    Some(percent.min(MAX_DOWNLOADING_PERCENT as u64) as u8)
}

/// Display-oriented summary of an attachment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AttachmentStatus {
    /// Announced size in bytes
    pub size: Option<u64>,
    /// What the user can do with it right now
    pub state: StatusKind,
    /// Source expiry relative to the time the status was computed
    pub expiry: Expiry,
}

/// Coarse attachment state as shown to a user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", content = "percent", rename_all = "snake_case")]
pub enum StatusKind {
    /// Never downloaded
    NotDownloaded,
    /// Transfer running
    Downloading(Option<u8>),
    /// Content present locally
    Downloaded,
    /// Content was present but has been removed
    Deleted,
    /// Last attempt failed
    Failed,
}

/// Source URL expiry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", content = "at", rename_all = "snake_case")]
pub enum Expiry {
    /// No expiry announced
    Never,
    /// Still fetchable until this unix timestamp
    At(i64),
    /// No longer fetchable
    Expired,
}

impl AttachmentStatus {
    /// Whether a download action makes sense
    pub fn can_download(&self) -> bool {
        !matches!(
            self.state,
            StatusKind::Downloaded | StatusKind::Downloading(_)
        ) && self.expiry != Expiry::Expired
    }
}

impl fmt::Display for AttachmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::with_capacity(3);
        if let Some(size) = self.size {
            parts.push(crate::utils::format_bytes(size));
        }

        let expiry_suffix = || match self.expiry {
            Expiry::Expired => Some("link expired".to_string()),
            Expiry::At(at) => Some(format!("expires {}", format_date(at))),
            Expiry::Never => None,
        };

        match self.state {
            StatusKind::Downloaded => {}
            StatusKind::Downloading(Some(percent)) => {
                parts.push(format!("downloading, {}%", percent));
            }
            StatusKind::Downloading(None) => parts.push("downloading".to_string()),
            StatusKind::NotDownloaded => {
                parts.push("not downloaded".to_string());
                parts.extend(expiry_suffix());
            }
            StatusKind::Deleted => {
                parts.push("deleted".to_string());
                parts.extend(expiry_suffix());
            }
            StatusKind::Failed => {
                parts.push("download failed".to_string());
                parts.extend(expiry_suffix());
            }
        }

        write!(f, "{}", parts.join(", "))
    }
}

fn format_date(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%b %-d, %Y").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
