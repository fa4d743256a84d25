pub mod domain;
pub mod ports;
pub mod srs;
pub mod stats;
pub mod streak;

pub use domain::{
    Card, Deck, Difficulty, InvalidDifficulty, InvalidSessionKind, SessionFilter, SessionKind,
    StudySession, Subject, User, UserCredentials, UserStats,
};
pub use ports::{CardDraft, CardGenerationService, PortError, PortResult, StudyStore};
pub use stats::{StudyStats, SubjectTotals};
