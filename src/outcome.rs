//! Call outcomes, split into local, protocol and remote bands.
//!
//! Replies carry a one-byte state code:
//! ```text
//! 0x00        none (reads as an unknown remote result)
//! 0x01        ok
//! 0x02..0x0A  protocol states (queued, running, vote phases)
//! 0x81..0x8D  remote failures
//! ```
//! Local failures never travel on the wire.

use std::fmt;

/// Failures before or during transport I/O on this side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalFailure {
    /// No endpoint known for the station, or the pool is at its cap.
    NotReady,
    /// Sending the request failed.
    SendError,
    /// Receiving a reply failed at the transport level.
    RecvError,
    /// A reply could not be decoded, or local processing failed.
    LocalException,
    /// The exchange was malformed at the frame level.
    FrameInvalid,
}

/// Intermediate states observed between the first and final receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolState {
    /// Accepted into a queue or plan, not executing yet.
    Queued,
    /// Accepted and executing. The only state that continues to the result receive.
    Running,
    /// Vote phase: participant leaving.
    VoteBye,
    /// Vote phase: participant joined.
    Welcome,
    /// Vote phase: ballots sent.
    VoteSend,
    /// Vote phase: waiting for ballots.
    VoteWaiting,
    /// Vote phase: started.
    VoteStart,
    /// Vote phase: ended.
    VoteEnd,
    /// Vote phase: closed.
    VoteClose,
}

/// Terminal outcomes produced by the remote peer or inferred from its absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteStatus {
    /// Completed successfully.
    Ok,
    /// Command or station not found.
    NotFound,
    /// Command exists but is not supported.
    NotSupported,
    /// No worker is serving the station.
    NoWorkerAvailable,
    /// Station is unavailable.
    Unavailable,
    /// Access denied.
    Denied,
    /// No reply within the configured bound.
    TimedOut,
    /// Argument rejected by the remote.
    ArgumentInvalid,
    /// Station is paused.
    Paused,
    /// Business logic failed.
    Failed,
    /// Remote reported an internal bug.
    Bug,
    /// Remote internal error.
    Error,
    /// Network failure reported by an intermediary.
    NetError,
    /// A state code this build does not know.
    Unknown(u8),
}

/// Outcome of one call attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Outcome {
    /// Not yet decided.
    #[default]
    Unset,
    /// Local band.
    Local(LocalFailure),
    /// Protocol band.
    Protocol(ProtocolState),
    /// Remote band.
    Remote(RemoteStatus),
}

impl Outcome {
    /// Successful completion.
    pub const OK: Outcome = Outcome::Remote(RemoteStatus::Ok);
    /// Accepted and running.
    pub const RUNNING: Outcome = Outcome::Protocol(ProtocolState::Running);

    /// Map a reply state code to an outcome. Total over `u8`.
    pub fn from_wire(code: u8) -> Outcome {
        use ProtocolState::*;
        use RemoteStatus::*;
        match code {
            0x01 => Outcome::Remote(Ok),
            0x02 => Outcome::Protocol(Queued),
            0x03 => Outcome::Protocol(Running),
            0x04 => Outcome::Protocol(VoteBye),
            0x05 => Outcome::Protocol(Welcome),
            0x06 => Outcome::Protocol(VoteSend),
            0x07 => Outcome::Protocol(VoteWaiting),
            0x08 => Outcome::Protocol(VoteStart),
            0x09 => Outcome::Protocol(VoteEnd),
            0x0A => Outcome::Protocol(VoteClose),
            0x81 => Outcome::Remote(Error),
            0x82 => Outcome::Remote(Failed),
            0x83 => Outcome::Remote(NotFound),
            0x84 => Outcome::Remote(NotSupported),
            0x85 => Outcome::Local(LocalFailure::FrameInvalid),
            0x86 => Outcome::Remote(ArgumentInvalid),
            0x87 => Outcome::Remote(TimedOut),
            0x88 => Outcome::Remote(NetError),
            0x89 => Outcome::Remote(NoWorkerAvailable),
            0x8A => Outcome::Remote(Unavailable),
            0x8B => Outcome::Remote(Paused),
            0x8C => Outcome::Remote(Denied),
            0x8D => Outcome::Remote(Bug),
            other => Outcome::Remote(Unknown(other)),
        }
    }

    /// State code a remote peer would send for this outcome.
    ///
    /// `None` for `Unset` and for local failures other than `FrameInvalid`.
    pub fn wire_code(self) -> Option<u8> {
        use ProtocolState::*;
        use RemoteStatus::*;
        let code = match self {
            Outcome::Unset => return None,
            Outcome::Local(LocalFailure::FrameInvalid) => 0x85,
            Outcome::Local(_) => return None,
            Outcome::Protocol(state) => match state {
                Queued => 0x02,
                Running => 0x03,
                VoteBye => 0x04,
                Welcome => 0x05,
                VoteSend => 0x06,
                VoteWaiting => 0x07,
                VoteStart => 0x08,
                VoteEnd => 0x09,
                VoteClose => 0x0A,
            },
            Outcome::Remote(status) => match status {
                Ok => 0x01,
                Error => 0x81,
                Failed => 0x82,
                NotFound => 0x83,
                NotSupported => 0x84,
                ArgumentInvalid => 0x86,
                TimedOut => 0x87,
                NetError => 0x88,
                NoWorkerAvailable => 0x89,
                Unavailable => 0x8A,
                Paused => 0x8B,
                Denied => 0x8C,
                Bug => 0x8D,
                Unknown(code) => code,
            },
        };
        Some(code)
    }

    /// Whether the call completed successfully.
    #[inline]
    pub fn is_success(self) -> bool {
        self == Outcome::OK
    }

    /// Whether the outcome has been written.
    #[inline]
    pub fn is_set(self) -> bool {
        self != Outcome::Unset
    }

    /// Short name used in messages and logs.
    pub fn text(self) -> &'static str {
        use LocalFailure::*;
        use ProtocolState::*;
        use RemoteStatus::*;
        match self {
            Outcome::Unset => "Unset",
            Outcome::Local(f) => match f {
                NotReady => "NotReady",
                SendError => "SendError",
                RecvError => "RecvError",
                LocalException => "LocalException",
                FrameInvalid => "FrameInvalid",
            },
            Outcome::Protocol(s) => match s {
                Queued => "Queued",
                Running => "Running",
                VoteBye => "VoteBye",
                Welcome => "Welcome",
                VoteSend => "VoteSend",
                VoteWaiting => "VoteWaiting",
                VoteStart => "VoteStart",
                VoteEnd => "VoteEnd",
                VoteClose => "VoteClose",
            },
            Outcome::Remote(s) => match s {
                Ok => "Ok",
                NotFound => "NotFound",
                NotSupported => "NotSupported",
                NoWorkerAvailable => "NoWorkerAvailable",
                Unavailable => "Unavailable",
                Denied => "Denied",
                TimedOut => "TimedOut",
                ArgumentInvalid => "ArgumentInvalid",
                Paused => "Paused",
                Failed => "Failed",
                Bug => "Bug",
                Error => "Error",
                NetError => "NetError",
                Unknown(_) => "Unknown",
            },
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Remote(RemoteStatus::Unknown(code)) => write!(f, "Unknown({:#04x})", code),
            other => f.write_str(other.text()),
        }
    }
}
