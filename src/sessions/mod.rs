mod lifecycle;

pub use lifecycle::{
    classify, ensure_cancellable, session_stats, CancelRefused, SessionBucket, SessionList, SessionStats,
};
