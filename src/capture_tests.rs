#[cfg(test)]
mod tests {
    use crate::capture::{select_direction, CaptureSlots, Direction, NoCaptureReason};
    use crate::config::CaptureConfig;
    use crate::direction::{classify, DirectionLabels, PitchLabel, RollLabel, YawLabel};
    use crate::types::PoseAngles;

    fn pick(slots: &CaptureSlots, pitch: f32, yaw: f32, confidence: f32) -> Result<Direction, NoCaptureReason> {
        let pose = PoseAngles::new(0.0, pitch, yaw);
        select_direction(slots, &pose, &classify(&pose), confidence, &CaptureConfig::default())
    }

    // =========================================================================
    // Gating: completion and confidence are checked before any pose rule
    // =========================================================================

    #[test]
    fn test_complete_session_wins_over_everything() {
        let full = CaptureSlots {
            straight: true,
            left: true,
            right: true,
            up: true,
            down: true,
        };
        // even a low-confidence frame reports completion first
        assert_eq!(pick(&full, 0.0, 0.0, 0.1), Err(NoCaptureReason::Complete));
        assert_eq!(pick(&full, 0.0, -30.0, 0.99), Err(NoCaptureReason::Complete));
    }

    #[test]
    fn test_confidence_threshold_is_inclusive() {
        let empty = CaptureSlots::default();
        assert_eq!(pick(&empty, 0.0, 0.0, 0.69), Err(NoCaptureReason::LowConfidence));
        assert_eq!(pick(&empty, 0.0, 0.0, 0.7), Ok(Direction::Straight));
    }

    // =========================================================================
    // Yaw rules: label AND magnitude above the turn threshold
    // =========================================================================

    #[test]
    fn test_turn_needs_more_than_label() {
        let empty = CaptureSlots::default();
        // labelled turn-left (|yaw| > 10) but not past 15: falls through
        assert_eq!(pick(&empty, 0.0, -12.0, 0.9), Err(NoCaptureReason::NoConditionMet));
        assert_eq!(pick(&empty, 0.0, -15.0, 0.9), Err(NoCaptureReason::NoConditionMet));
        assert_eq!(pick(&empty, 0.0, -15.5, 0.9), Ok(Direction::Left));
        assert_eq!(pick(&empty, 0.0, 16.0, 0.9), Ok(Direction::Right));
    }

    #[test]
    fn test_magnitude_without_label_does_not_turn() {
        // |yaw| past the threshold but labels say straight: no yaw rule fires
        let pose = PoseAngles::new(0.0, 0.0, 20.0);
        let labels = DirectionLabels {
            roll: RollLabel::Straight,
            pitch: PitchLabel::Straight,
            yaw: YawLabel::Straight,
        };
        let got = select_direction(
            &CaptureSlots::default(),
            &pose,
            &labels,
            0.9,
            &CaptureConfig::default(),
        );
        assert_eq!(got, Err(NoCaptureReason::NoConditionMet));
    }

    #[test]
    fn test_yaw_beats_pitch_when_both_qualify() {
        let empty = CaptureSlots::default();
        assert_eq!(pick(&empty, -12.0, -20.0, 0.9), Ok(Direction::Left));

        // once left is filled the same frame goes to up
        let left_done = CaptureSlots {
            left: true,
            ..CaptureSlots::default()
        };
        assert_eq!(pick(&left_done, -12.0, -20.0, 0.9), Ok(Direction::Up));
    }

    // =========================================================================
    // Pitch rules: negative pitch is "up"
    // =========================================================================

    #[test]
    fn test_up_and_down_boundaries() {
        let empty = CaptureSlots::default();
        assert_eq!(pick(&empty, -7.5, 0.0, 0.9), Ok(Direction::Up));
        assert_eq!(pick(&empty, 10.5, 0.0, 0.9), Ok(Direction::Down));

        // -7 and 10 exactly are not past the thresholds and land on straight
        assert_eq!(pick(&empty, -7.0, 0.0, 0.9), Ok(Direction::Straight));
        assert_eq!(pick(&empty, 10.0, 0.0, 0.9), Ok(Direction::Straight));
    }

    #[test]
    fn test_filled_up_slot_falls_back_to_straight() {
        let up_done = CaptureSlots {
            up: true,
            ..CaptureSlots::default()
        };
        // pitch -8 is within the straight band
        assert_eq!(pick(&up_done, -8.0, 0.0, 0.9), Ok(Direction::Straight));
    }

    // =========================================================================
    // Straight rule and fall-through
    // =========================================================================

    #[test]
    fn test_straight_band_and_no_match() {
        let straight_done = CaptureSlots {
            straight: true,
            ..CaptureSlots::default()
        };
        assert_eq!(pick(&straight_done, 0.0, 0.0, 0.9), Err(NoCaptureReason::NoConditionMet));

        let empty = CaptureSlots::default();
        // yaw 12 labelled turn-right but under 15, and outside the straight band
        assert_eq!(pick(&empty, 0.0, 12.0, 0.9), Err(NoCaptureReason::NoConditionMet));
        assert_eq!(pick(&empty, 0.0, 10.0, 0.9), Ok(Direction::Straight));
    }

    #[test]
    fn test_reason_text() {
        assert_eq!(NoCaptureReason::Complete.to_string(), "complete");
        assert_eq!(NoCaptureReason::LowConfidence.to_string(), "low confidence");
        assert_eq!(NoCaptureReason::NoConditionMet.to_string(), "no condition met");
    }
}
