/*!
    Post-seek record filtering.
*/

use std::collections::BTreeSet;

use ffmpeg_types::{SeekMode, TIME_BASE_JITTER_US};

/**
    Decides which records to drop after a container seek.

    Container seeks land on the keyframe at or before the target. In
    [`SeekMode::Precise`] every record earlier than the target less the
    accuracy is dropped until each stream reaches it.
    In [`SeekMode::AnyFrame`] the first decodable frame is accepted as is.
*/
#[derive(Clone, Debug, Default)]
pub struct SeekController {
    target_us: Option<i64>,
    accuracy_us: i64,
    mode: SeekMode,
    reached: BTreeSet<usize>,
}

impl SeekController {
    pub fn new(accuracy_us: i64, mode: SeekMode) -> Self {
        Self {
            target_us: None,
            accuracy_us: accuracy_us.max(0),
            mode,
            reached: BTreeSet::new(),
        }
    }

    /**
        The timestamp, in `AV_TIME_BASE` units, to hand the container seek.

        Slightly earlier than the target so rounding in time base
        conversions cannot skip the frame that sits exactly on it.
    */
    pub fn container_timestamp(target_us: i64) -> i64 {
        (target_us - TIME_BASE_JITTER_US).max(0)
    }

    /**
        Start filtering for a new target, forgetting any previous one.
    */
    pub fn begin(&mut self, target_us: i64, mode: SeekMode) {
        self.target_us = Some(target_us.max(0));
        self.mode = mode;
        self.reached.clear();
    }

    pub fn clear(&mut self) {
        self.target_us = None;
        self.reached.clear();
    }

    pub fn target_us(&self) -> Option<i64> {
        self.target_us
    }

    pub fn mode(&self) -> SeekMode {
        self.mode
    }

    /**
        Earliest timestamp a precise seek accepts.

        The conversion jitter only widens the container seek, never this
        bound.
    */
    pub fn threshold_us(&self) -> Option<i64> {
        self.target_us.map(|target| target - self.accuracy_us)
    }

    /**
        Whether a record from `stream` at `pts_us` should be delivered.

        Once a stream has delivered a record, later ones always pass.
    */
    pub fn accept(&mut self, stream: usize, pts_us: i64) -> bool {
        let Some(threshold) = self.threshold_us() else {
            return true;
        };
        if self.reached.contains(&stream) {
            return true;
        }

        let accepted = match self.mode {
            SeekMode::AnyFrame => true,
            SeekMode::Precise => pts_us >= threshold,
        };
        if accepted {
            self.reached.insert(stream);
        }
        accepted
    }

    /**
        True once every stream in `streams` has delivered a record.
    */
    pub fn settled<I: IntoIterator<Item = usize>>(&self, streams: I) -> bool {
        self.target_us.is_none() || streams.into_iter().all(|s| self.reached.contains(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_controller_accepts_everything() {
        let mut seek = SeekController::new(10, SeekMode::Precise);
        assert!(seek.accept(0, -1));
        assert!(seek.settled([0, 1]));
    }

    #[test]
    fn container_timestamp_backs_off_by_jitter() {
        assert_eq!(SeekController::container_timestamp(5_000_000), 4_999_900);
        assert_eq!(SeekController::container_timestamp(50), 0);
    }

    #[test]
    fn precise_drops_until_target() {
        let mut seek = SeekController::new(10, SeekMode::Precise);
        seek.begin(5_000_000, SeekMode::Precise);
        assert_eq!(seek.threshold_us(), Some(4_999_990));

        assert!(!seek.accept(0, 4_666_667));
        assert!(!seek.accept(0, 4_966_667));
        assert!(!seek.settled([0]));
        assert!(seek.accept(0, 5_000_000));
        assert!(seek.settled([0]));
        // reordered frames after the first hit still pass
        assert!(seek.accept(0, 4_990_000));
    }

    #[test]
    fn precise_accepts_only_within_accuracy() {
        let mut seek = SeekController::new(10, SeekMode::Precise);
        seek.begin(1_000_000, SeekMode::Precise);
        assert!(!seek.accept(0, 999_950));
        assert!(!seek.accept(0, 999_989));
        assert!(seek.accept(0, 999_990));
    }

    #[test]
    fn container_seek_lands_before_the_accepted_range() {
        let mut seek = SeekController::new(10, SeekMode::Precise);
        seek.begin(5_000_000, SeekMode::Precise);
        let threshold = seek.threshold_us().unwrap();
        assert!(SeekController::container_timestamp(5_000_000) < threshold);
    }

    #[test]
    fn any_frame_accepts_first_record() {
        let mut seek = SeekController::new(10, SeekMode::Precise);
        seek.begin(5_000_000, SeekMode::AnyFrame);
        assert!(seek.accept(0, 4_666_667));
        assert!(seek.settled([0]));
    }

    #[test]
    fn streams_are_tracked_independently() {
        let mut seek = SeekController::new(0, SeekMode::Precise);
        seek.begin(2_000_000, SeekMode::Precise);
        assert!(seek.accept(1, 2_000_000));
        assert!(!seek.accept(0, 1_500_000));
        assert!(!seek.settled([0, 1]));
    }

    #[test]
    fn begin_resets_progress() {
        let mut seek = SeekController::new(10, SeekMode::Precise);
        seek.begin(1_000_000, SeekMode::Precise);
        assert!(seek.accept(0, 1_000_000));
        seek.begin(3_000_000, SeekMode::Precise);
        assert!(!seek.accept(0, 1_100_000));
        seek.clear();
        assert!(seek.accept(0, 0));
    }
}
