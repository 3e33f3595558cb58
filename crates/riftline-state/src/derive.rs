//! End-of-match derivations.
//!
//! Pure functions over per-player histories: multi-kill streak
//! segmentation, killing-spree computation, and the spree label map. All
//! inputs are chronologically sorted, which the sorted-set scoring of the
//! histories guarantees.

use riftline_types::{KillRecord, KillType};

use crate::time;

/// A streak run never grows past five kills; a sixth kill starts a new run.
const MAX_STREAK_LEN: usize = 5;

/// Segment a chronological list of kill timestamps into multi-kill labels.
///
/// Runs are formed greedily: a kill joins the current run when it lands
/// within `window` seconds of the *previous kill in the run*, not the
/// first. Runs of length 2–5 emit `Double`/`Triple`/`Quadra`/`Penta Kill`
/// labels stamped with the run's last kill; single kills emit nothing.
pub fn kill_streaks(kill_timestamps: &[f64], window: u64) -> Vec<String> {
    let mut streaks = Vec::new();
    let window = window as f64;
    let mut i = 0;

    while i < kill_timestamps.len() {
        let mut last = kill_timestamps[i];
        let mut len = 1;
        let mut j = i + 1;

        while j < kill_timestamps.len()
            && kill_timestamps[j] - last <= window
            && len < MAX_STREAK_LEN
        {
            last = kill_timestamps[j];
            len += 1;
            j += 1;
        }

        if len >= 2 {
            let label = match len {
                2 => "Double Kill",
                3 => "Triple Kill",
                4 => "Quadra Kill",
                _ => "Penta Kill",
            };
            streaks.push(format!("{} at {}", label, time::label_time(last)));
        }

        i = j;
    }

    streaks
}

/// Longest run of human kills between two deaths.
///
/// Walks the human kills in order, advancing a pointer through the death
/// history; each death passed resets the running streak after folding it
/// into the maximum. Kills after the final death do not count toward the
/// streak.
pub fn max_killing_spree(kill_history: &[KillRecord], death_history: &[f64]) -> i64 {
    let human_kills = kill_history
        .iter()
        .filter(|record| record.kill_type == KillType::Human)
        .map(|record| record.timestamp);

    let mut streak = 0i64;
    let mut max_streak = 0i64;
    let mut death_index = 0;

    for kill in human_kills {
        while death_index < death_history.len() && kill >= death_history[death_index] {
            max_streak = max_streak.max(streak);
            streak = 0;
            death_index += 1;
        }
        if death_index < death_history.len() {
            streak += 1;
        }
    }

    max_streak.max(streak)
}

/// Map a killing-spree count to its recognition label. Counts above seven
/// clamp to `Godlike`; counts below three have no label.
pub fn spree_label(spree: i64) -> Option<&'static str> {
    match spree.min(7) {
        3 => Some("Killing Spree"),
        4 => Some("Rampage"),
        5 => Some("Unstoppable"),
        6 => Some("Dominating"),
        7 => Some("Godlike"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kills(timestamps: &[f64]) -> Vec<KillRecord> {
        timestamps
            .iter()
            .map(|&timestamp| KillRecord { timestamp, kill_type: KillType::Human })
            .collect()
    }

    #[test]
    fn kill_streak_table() {
        // (timestamps, window, expected)
        let cases: &[(&[f64], u64, &[&str])] = &[
            (&[1.0, 2.0], 2, &["Double Kill at 1970-01-01 00:00:02"]),
            (&[1.0, 2.0, 3.0], 2, &["Triple Kill at 1970-01-01 00:00:03"]),
            (&[1.0, 2.0, 3.0, 4.0], 2, &["Quadra Kill at 1970-01-01 00:00:04"]),
            (&[1.0, 2.0, 3.0, 4.0, 5.0], 2, &["Penta Kill at 1970-01-01 00:00:05"]),
            (&[1.0, 4.0], 2, &[]),
            (&[1.0, 3.0, 5.0], 1, &[]),
            (
                &[1.0, 2.0, 5.0, 6.0],
                2,
                &["Double Kill at 1970-01-01 00:00:02", "Double Kill at 1970-01-01 00:00:06"],
            ),
            (&[1.0, 2.0, 3.0, 4.0, 5.0], 1, &["Penta Kill at 1970-01-01 00:00:05"]),
            (
                &[1.0, 2.0, 3.0, 5.0, 6.0, 7.0],
                1,
                &["Triple Kill at 1970-01-01 00:00:03", "Triple Kill at 1970-01-01 00:00:07"],
            ),
            (&[], 5, &[]),
            (&[1.0], 5, &[]),
            (&[1.0, 6.0, 11.0, 16.0, 21.0], 4, &[]),
            (
                &[1640995200.0, 1640995201.0, 1640995202.0],
                2,
                &["Triple Kill at 2022-01-01 00:00:02"],
            ),
            (&[5.0, 6.0, 7.0, 8.0], 2, &["Quadra Kill at 1970-01-01 00:00:08"]),
            (&[10.0, 11.0, 12.0, 13.0, 14.0], 1, &["Penta Kill at 1970-01-01 00:00:14"]),
            (&[20.0, 21.0, 24.0, 25.0], 3, &["Quadra Kill at 1970-01-01 00:00:25"]),
            (
                &[30.0, 31.0, 32.0, 34.0, 35.0, 37.0],
                2,
                &["Penta Kill at 1970-01-01 00:00:35"],
            ),
            (
                &[60.0, 61.0, 62.0, 63.0, 64.0, 66.0],
                2,
                &["Penta Kill at 1970-01-01 00:01:04"],
            ),
            (&[90.0, 91.0, 92.0, 93.0], 1, &["Quadra Kill at 1970-01-01 00:01:33"]),
        ];

        for (timestamps, window, expected) in cases {
            assert_eq!(
                kill_streaks(timestamps, *window),
                expected.to_vec(),
                "timestamps {timestamps:?} window {window}"
            );
        }
    }

    #[test]
    fn six_kill_run_is_penta_then_nothing() {
        // The sixth kill starts a fresh run of one, which emits no label.
        assert_eq!(
            kill_streaks(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2),
            vec!["Penta Kill at 1970-01-01 00:00:05"]
        );
    }

    #[test]
    fn window_is_measured_from_previous_kill_in_run() {
        // 20→21→24→25: each step is within 3 even though 25-20 > 3.
        assert_eq!(
            kill_streaks(&[20.0, 21.0, 24.0, 25.0], 3),
            vec!["Quadra Kill at 1970-01-01 00:00:25"]
        );
    }

    #[test]
    fn spree_counts_kills_before_a_death() {
        assert_eq!(max_killing_spree(&kills(&[1.0, 2.0, 3.0]), &[4.0]), 3);
    }

    #[test]
    fn spree_ignores_kills_after_last_death() {
        assert_eq!(max_killing_spree(&kills(&[1.0, 2.0, 3.0]), &[]), 0);
        assert_eq!(max_killing_spree(&kills(&[1.0, 2.0, 5.0]), &[3.0]), 2);
    }

    #[test]
    fn spree_resets_on_each_death() {
        assert_eq!(
            max_killing_spree(&kills(&[1.0, 2.0, 4.0, 5.0, 6.0]), &[3.0, 10.0]),
            3
        );
    }

    #[test]
    fn spree_only_counts_human_kills() {
        let history = vec![
            KillRecord { timestamp: 1.0, kill_type: KillType::Minion },
            KillRecord { timestamp: 2.0, kill_type: KillType::Human },
            KillRecord { timestamp: 3.0, kill_type: KillType::Dragon },
            KillRecord { timestamp: 4.0, kill_type: KillType::Human },
        ];
        assert_eq!(max_killing_spree(&history, &[10.0]), 2);
    }

    #[test]
    fn spree_labels() {
        assert_eq!(spree_label(0), None);
        assert_eq!(spree_label(2), None);
        assert_eq!(spree_label(3), Some("Killing Spree"));
        assert_eq!(spree_label(4), Some("Rampage"));
        assert_eq!(spree_label(5), Some("Unstoppable"));
        assert_eq!(spree_label(6), Some("Dominating"));
        assert_eq!(spree_label(7), Some("Godlike"));
        assert_eq!(spree_label(12), Some("Godlike"));
    }
}
