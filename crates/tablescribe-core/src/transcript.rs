//! Transcript assembly.

use tablescribe_types::TranscriptionUnit;

/// Fallback label for units without a speaker attribution.
pub const UNKNOWN_SPEAKER: &str = "Unknown";

/// Format ordered units into the final speaker-labeled transcript.
///
/// Pure and deterministic: identical inputs always produce identical output.
/// Units must already be ordered by `start_ms`; anything not `Success` is
/// excluded.
pub fn assemble(units: &[TranscriptionUnit]) -> String {
    units
        .iter()
        .filter(|u| u.is_success())
        .map(|u| {
            format!(
                "{}: {}",
                u.speaker.as_deref().unwrap_or(UNKNOWN_SPEAKER),
                u.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablescribe_types::TranscriptionUnit;

    #[test]
    fn formats_speaker_labeled_lines() {
        let units = vec![
            TranscriptionUnit::success(0, 0, Some("GM".into()), "roll for initiative".into()),
            TranscriptionUnit::success(1, 4000, Some("Alice".into()), "natural twenty".into()),
        ];

        assert_eq!(
            assemble(&units),
            "GM: roll for initiative\nAlice: natural twenty"
        );
    }

    #[test]
    fn missing_speaker_renders_as_unknown() {
        let units = vec![TranscriptionUnit::success(0, 0, None, "who said that".into())];
        assert_eq!(assemble(&units), "Unknown: who said that");
    }

    #[test]
    fn failed_units_are_excluded() {
        let units = vec![
            TranscriptionUnit::success(0, 0, Some("GM".into()), "first".into()),
            TranscriptionUnit::failed(1, 1000),
            TranscriptionUnit::success(2, 2000, Some("GM".into()), "third".into()),
        ];

        assert_eq!(assemble(&units), "GM: first\nGM: third");
    }

    #[test]
    fn empty_input_yields_empty_transcript() {
        assert_eq!(assemble(&[]), "");
    }

    #[test]
    fn assembly_is_deterministic() {
        let units = vec![
            TranscriptionUnit::success(0, 0, Some("A".into()), "x".into()),
            TranscriptionUnit::success(1, 10, None, "y".into()),
        ];
        assert_eq!(assemble(&units), assemble(&units));
    }
}
