//! Status and resume policy applied when playback leaves an item.

/// Fraction of the duration after which an item counts as watched.
pub const SEEN_THRESHOLD: f64 = 0.95;

/// Last known playback progress of the current item, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Progress {
    pub position: f64,
    pub duration: Option<f64>,
}

impl Progress {
    /// Watched fraction, when the duration is known.
    pub fn fraction(&self) -> Option<f64> {
        self.duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| self.position / d)
    }
}

/// How playback of the item ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// The engine reached the end of the file.
    Completed,
    /// Skip, previous, guide jump, disconnect or shutdown.
    Interrupted,
    /// The engine failed while playing.
    Failed,
}

/// Catalog change to apply for the item being left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusDecision {
    MarkSeen,
    SaveResume(u64),
    Unchanged,
}

/// Decide what to persist for an item that stops playing.
///
/// Seen when forced, when playback completed or when at least 95% was
/// watched. Otherwise a position > 0 becomes the resume offset, never
/// beyond the known duration.
pub fn decide(progress: Progress, exit: ExitKind, force_seen: bool) -> StatusDecision {
    if force_seen || exit == ExitKind::Completed {
        return StatusDecision::MarkSeen;
    }
    if progress.fraction().map(|f| f >= SEEN_THRESHOLD).unwrap_or(false) {
        return StatusDecision::MarkSeen;
    }

    if progress.position.is_finite() && progress.position > 0.0 {
        let mut position = progress.position;
        if let Some(duration) = progress.duration.filter(|d| d.is_finite() && *d > 0.0) {
            position = position.min(duration);
        }
        let seconds = position.floor() as u64;
        if seconds > 0 {
            return StatusDecision::SaveResume(seconds);
        }
    }

    StatusDecision::Unchanged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(position: f64, duration: Option<f64>) -> Progress {
        Progress { position, duration }
    }

    #[test]
    fn test_threshold_marks_seen() {
        assert_eq!(
            decide(progress(95.0, Some(100.0)), ExitKind::Interrupted, false),
            StatusDecision::MarkSeen
        );
        assert_eq!(
            decide(progress(94.0, Some(100.0)), ExitKind::Interrupted, false),
            StatusDecision::SaveResume(94)
        );
    }

    #[test]
    fn test_forced_and_completed() {
        assert_eq!(decide(progress(1.0, None), ExitKind::Interrupted, true), StatusDecision::MarkSeen);
        assert_eq!(decide(progress(0.0, None), ExitKind::Completed, false), StatusDecision::MarkSeen);
    }

    #[test]
    fn test_failure_saves_resume() {
        assert_eq!(
            decide(progress(300.7, Some(3600.0)), ExitKind::Failed, false),
            StatusDecision::SaveResume(300)
        );
        assert_eq!(decide(progress(0.0, Some(3600.0)), ExitKind::Failed, false), StatusDecision::Unchanged);
    }

    #[test]
    fn test_resume_never_exceeds_duration() {
        // Stale position reported past a shorter duration.
        let decision = decide(progress(500.0, Some(40.0)), ExitKind::Interrupted, false);
        assert_eq!(decision, StatusDecision::MarkSeen);

        let decision = decide(progress(500.0, None), ExitKind::Interrupted, false);
        assert_eq!(decision, StatusDecision::SaveResume(500));
    }
}
