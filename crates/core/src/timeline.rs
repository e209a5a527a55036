//! Pure timeline arithmetic: cumulative start offsets and overrun shifts.
//!
//! The scene registry composes ordered scenes into one timeline. When a
//! scene's realized duration exceeds its planned duration by some delta,
//! every subsequent start offset shifts forward by exactly that delta and
//! the total duration grows by exactly that delta. Ordering never changes.

/// One scene's timing inputs, already sorted by `order`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineSlot {
    pub order: u32,
    pub planned_secs: f64,
    /// Filled after the scene's first successful execution.
    pub realized_secs: Option<f64>,
}

impl TimelineSlot {
    /// The duration that actually occupies the timeline.
    pub fn effective_secs(&self) -> f64 {
        self.realized_secs.unwrap_or(self.planned_secs)
    }
}

/// Computed placement of one scene on the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledSlot {
    pub order: u32,
    pub start_secs: f64,
    pub duration_secs: f64,
}

/// Assign cumulative start offsets to slots already sorted by order.
pub fn schedule(slots: &[TimelineSlot]) -> Vec<ScheduledSlot> {
    let mut start = 0.0_f64;
    let mut out = Vec::with_capacity(slots.len());
    for slot in slots {
        let duration = slot.effective_secs();
        out.push(ScheduledSlot {
            order: slot.order,
            start_secs: start,
            duration_secs: duration,
        });
        start += duration;
    }
    out
}

/// Total timeline duration: the end of the last scheduled slot.
pub fn total_duration(slots: &[TimelineSlot]) -> f64 {
    slots.iter().map(TimelineSlot::effective_secs).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(order: u32, planned: f64, realized: Option<f64>) -> TimelineSlot {
        TimelineSlot {
            order,
            planned_secs: planned,
            realized_secs: realized,
        }
    }

    #[test]
    fn offsets_accumulate() {
        let scheduled = schedule(&[
            slot(0, 2.0, None),
            slot(1, 3.0, None),
            slot(2, 1.5, None),
        ]);
        assert_eq!(scheduled[0].start_secs, 0.0);
        assert_eq!(scheduled[1].start_secs, 2.0);
        assert_eq!(scheduled[2].start_secs, 5.0);
    }

    #[test]
    fn overrun_shifts_all_subsequent_starts_by_exactly_delta() {
        let planned = [slot(0, 2.0, None), slot(1, 3.0, None), slot(2, 1.0, None)];
        let before = schedule(&planned);

        // Scene 0 overruns by 0.75s.
        let overrun = [
            slot(0, 2.0, Some(2.75)),
            slot(1, 3.0, None),
            slot(2, 1.0, None),
        ];
        let after = schedule(&overrun);

        let delta = 0.75;
        for i in 1..3 {
            assert!((after[i].start_secs - before[i].start_secs - delta).abs() < 1e-9);
        }
        assert!(
            (total_duration(&overrun) - total_duration(&planned) - delta).abs() < 1e-9
        );
    }

    #[test]
    fn underrun_shifts_backwards() {
        let slots = [slot(0, 2.0, Some(1.5)), slot(1, 3.0, None)];
        let scheduled = schedule(&slots);
        assert_eq!(scheduled[1].start_secs, 1.5);
        assert_eq!(total_duration(&slots), 4.5);
    }

    #[test]
    fn ordering_never_altered() {
        let slots = [
            slot(0, 1.0, Some(10.0)),
            slot(1, 1.0, None),
            slot(2, 1.0, None),
        ];
        let scheduled = schedule(&slots);
        let orders: Vec<u32> = scheduled.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert!(scheduled.windows(2).all(|w| w[0].start_secs <= w[1].start_secs));
    }

    #[test]
    fn empty_timeline_is_zero() {
        assert!(schedule(&[]).is_empty());
        assert_eq!(total_duration(&[]), 0.0);
    }

    #[test]
    fn realized_equal_to_planned_changes_nothing() {
        let a = [slot(0, 2.0, None), slot(1, 3.0, None)];
        let b = [slot(0, 2.0, Some(2.0)), slot(1, 3.0, None)];
        assert_eq!(schedule(&a), schedule(&b));
    }
}
