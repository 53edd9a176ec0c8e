use chrono::{DateTime, Duration, Local};

use crate::types::{Action, FetchedTimes, PrayerEvent, PrayerName};

/// Reminder/escalation state machine for the day's two prayer events.
///
/// Holds no clock and touches no I/O: callers pass `now` into every
/// time-dependent operation and execute the returned actions themselves,
/// so the decision logic is testable on its own.
pub struct ReminderTracker {
    events: [PrayerEvent; 2],
    notifications_enabled: bool,
    escalation_enabled: bool,
    notify_interval: Duration,
    escalation_threshold: u32,
}

impl ReminderTracker {
    pub fn new(notify_interval_secs: i64, escalation_threshold: u32, escalation_enabled: bool) -> Self {
        ReminderTracker {
            events: [
                PrayerEvent::new(PrayerName::Dhuhr),
                PrayerEvent::new(PrayerName::Maghrib),
            ],
            notifications_enabled: true,
            escalation_enabled,
            notify_interval: Duration::seconds(notify_interval_secs),
            escalation_threshold,
        }
    }

    pub fn events(&self) -> &[PrayerEvent] {
        &self.events
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifications_enabled
    }

    pub fn escalation_enabled(&self) -> bool {
        self.escalation_enabled
    }

    pub fn escalation_threshold(&self) -> u32 {
        self.escalation_threshold
    }

    fn event(&self, name: PrayerName) -> &PrayerEvent {
        // index 0/1 mirrors PrayerName::ALL
        match name {
            PrayerName::Dhuhr => &self.events[0],
            PrayerName::Maghrib => &self.events[1],
        }
    }

    fn event_mut(&mut self, name: PrayerName) -> &mut PrayerEvent {
        match name {
            PrayerName::Dhuhr => &mut self.events[0],
            PrayerName::Maghrib => &mut self.events[1],
        }
    }

    /// One pass over the events: decide what the outside world should do
    /// right now. Events without a target, acknowledged events, and events
    /// still in the future are skipped.
    pub fn update(&mut self, now: DateTime<Local>) -> Vec<Action> {
        let mut actions = Vec::new();
        if !self.notifications_enabled {
            return actions;
        }
        for ev in self.events.iter_mut() {
            let target = match ev.target {
                Some(t) => t,
                None => continue,
            };
            if now < target || ev.acknowledged {
                continue;
            }
            if !ev.prompted {
                ev.prompted = true;
                actions.push(Action::PromptAck(ev.name));
            }
            if ev.notify_count < self.escalation_threshold {
                let due = match ev.last_notify {
                    None => true,
                    Some(last) => now - last >= self.notify_interval,
                };
                if due {
                    ev.notify_count += 1;
                    ev.last_notify = Some(now);
                    actions.push(Action::Notify(ev.name));
                }
            } else if self.escalation_enabled && !ev.escalated {
                ev.escalated = true;
                actions.push(Action::Escalate(ev.name));
            }
        }
        actions
    }

    /// Record the user's answer to the "did you pray?" prompt. An
    /// acknowledged event stays silent until the next day's occurrence.
    pub fn acknowledge(&mut self, name: PrayerName, done: bool) {
        self.event_mut(name).acknowledged = done;
    }

    /// Invariant: toggling in either direction resets every notify count.
    pub fn toggle_notifications(&mut self, enabled: bool) {
        self.notifications_enabled = enabled;
        for ev in self.events.iter_mut() {
            ev.notify_count = 0;
        }
    }

    pub fn set_escalation(&mut self, enabled: bool) {
        self.escalation_enabled = enabled;
    }

    /// Merge one fetch result. A prayer the fetch could not resolve leaves
    /// the tracked event untouched; a target on a new date replaces the
    /// old occurrence and resets its per-occurrence state.
    pub fn apply_fetch(&mut self, times: &FetchedTimes) {
        for name in PrayerName::ALL {
            let fetched = match times.get(name) {
                Some(t) => t,
                None => continue,
            };
            let ev = self.event_mut(name);
            let rolled_over = match ev.target {
                Some(old) => old.date_naive() != fetched.date_naive(),
                None => true,
            };
            ev.target = Some(fetched);
            if rolled_over {
                ev.notify_count = 0;
                ev.last_notify = None;
                ev.acknowledged = false;
                ev.prompted = false;
                ev.escalated = false;
            }
        }
    }

    /// Human-readable countdown for one event, hour/minute breakdown.
    pub fn status_text(&self, name: PrayerName, now: DateTime<Local>) -> String {
        let target = match self.event(name).target {
            Some(t) => t,
            None => return "---".to_string(),
        };
        if target > now {
            let secs = (target - now).num_seconds();
            format!("{}س {}د مانده", secs / 3600, (secs % 3600) / 60)
        } else {
            let secs = (now - target).num_seconds();
            format!("{}س {}د گذشته", secs / 3600, (secs % 3600) / 60)
        }
    }

    /// Event closest to `now` by absolute distance; ties go to the
    /// first-iterated event. Events without a target don't participate.
    pub fn nearest(&self, now: DateTime<Local>) -> Option<PrayerName> {
        let mut best: Option<(PrayerName, i64)> = None;
        for ev in &self.events {
            let target = match ev.target {
                Some(t) => t,
                None => continue,
            };
            let dist = (target - now).num_seconds().abs();
            match best {
                Some((_, b)) if dist >= b => {}
                _ => best = Some((ev.name, dist)),
            }
        }
        best.map(|(name, _)| name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap()
    }

    fn tracker_with_dhuhr(target: DateTime<Local>) -> ReminderTracker {
        let mut tracker = ReminderTracker::new(20, 5, true);
        tracker.apply_fetch(&FetchedTimes {
            dhuhr: Some(target),
            maghrib: None,
        });
        tracker
    }

    #[test]
    fn test_status_remaining() {
        let tracker = tracker_with_dhuhr(at(13, 0, 0));
        assert_eq!(
            tracker.status_text(PrayerName::Dhuhr, at(11, 25, 0)),
            "1س 35د مانده"
        );
    }

    #[test]
    fn test_status_elapsed() {
        let tracker = tracker_with_dhuhr(at(13, 0, 0));
        assert_eq!(
            tracker.status_text(PrayerName::Dhuhr, at(13, 5, 0)),
            "0س 5د گذشته"
        );
    }

    #[test]
    fn test_status_at_target_counts_as_elapsed() {
        let tracker = tracker_with_dhuhr(at(13, 0, 0));
        assert_eq!(
            tracker.status_text(PrayerName::Dhuhr, at(13, 0, 0)),
            "0س 0د گذشته"
        );
    }

    #[test]
    fn test_status_without_target() {
        let tracker = ReminderTracker::new(20, 5, true);
        assert_eq!(tracker.status_text(PrayerName::Maghrib, at(12, 0, 0)), "---");
    }

    #[test]
    fn test_first_notify_immediate_second_after_interval() {
        let mut tracker = tracker_with_dhuhr(at(13, 0, 0));
        let actions = tracker.update(at(13, 0, 1));
        assert!(actions.contains(&Action::Notify(PrayerName::Dhuhr)));

        // 19s later: not yet due
        let actions = tracker.update(at(13, 0, 20));
        assert!(!actions.contains(&Action::Notify(PrayerName::Dhuhr)));

        // 20s after the first notify: due again
        let actions = tracker.update(at(13, 0, 21));
        assert!(actions.contains(&Action::Notify(PrayerName::Dhuhr)));
    }

    #[test]
    fn test_notify_count_capped_at_threshold() {
        let mut tracker = tracker_with_dhuhr(at(13, 0, 0));
        tracker.set_escalation(false);
        // run far past threshold * interval
        for minute in 0..30 {
            tracker.update(at(13, minute, 30));
        }
        assert_eq!(tracker.events()[0].notify_count, 5);
    }

    #[test]
    fn test_future_event_is_silent() {
        let mut tracker = tracker_with_dhuhr(at(13, 0, 0));
        assert!(tracker.update(at(12, 59, 59)).is_empty());
    }

    #[test]
    fn test_absent_target_is_skipped() {
        let mut tracker = ReminderTracker::new(20, 5, true);
        assert!(tracker.update(at(23, 59, 0)).is_empty());
    }

    #[test]
    fn test_disabled_notifications_emit_nothing() {
        let mut tracker = tracker_with_dhuhr(at(13, 0, 0));
        tracker.toggle_notifications(false);
        assert!(tracker.update(at(13, 5, 0)).is_empty());
    }

    #[test]
    fn test_toggle_resets_counts() {
        let mut tracker = tracker_with_dhuhr(at(13, 0, 0));
        tracker.update(at(13, 0, 1));
        tracker.update(at(13, 0, 30));
        assert_eq!(tracker.events()[0].notify_count, 2);

        tracker.toggle_notifications(false);
        assert_eq!(tracker.events()[0].notify_count, 0);

        tracker.toggle_notifications(true);
        assert_eq!(tracker.events()[0].notify_count, 0);
    }

    #[test]
    fn test_acknowledged_event_is_silent() {
        let mut tracker = tracker_with_dhuhr(at(13, 0, 0));
        tracker.acknowledge(PrayerName::Dhuhr, true);
        assert!(tracker.update(at(13, 5, 0)).is_empty());
    }

    #[test]
    fn test_prompt_fires_once() {
        let mut tracker = tracker_with_dhuhr(at(13, 0, 0));
        let actions = tracker.update(at(13, 0, 1));
        assert!(actions.contains(&Action::PromptAck(PrayerName::Dhuhr)));
        let actions = tracker.update(at(13, 0, 30));
        assert!(!actions.contains(&Action::PromptAck(PrayerName::Dhuhr)));
    }

    #[test]
    fn test_escalates_once_at_threshold() {
        let mut tracker = tracker_with_dhuhr(at(13, 0, 0));
        let mut escalations = 0;
        for minute in 0..30 {
            let actions = tracker.update(at(13, minute, 30));
            escalations += actions
                .iter()
                .filter(|a| matches!(a, Action::Escalate(_)))
                .count();
        }
        assert_eq!(escalations, 1);
        assert_eq!(tracker.events()[0].notify_count, 5);
    }

    #[test]
    fn test_escalation_disabled_never_escalates() {
        let mut tracker = tracker_with_dhuhr(at(13, 0, 0));
        tracker.set_escalation(false);
        for minute in 0..30 {
            let actions = tracker.update(at(13, minute, 30));
            assert!(!actions.iter().any(|a| matches!(a, Action::Escalate(_))));
        }
    }

    #[test]
    fn test_same_day_refresh_keeps_counters() {
        let mut tracker = tracker_with_dhuhr(at(13, 0, 0));
        tracker.update(at(13, 0, 1));
        assert_eq!(tracker.events()[0].notify_count, 1);

        // same day, slightly corrected time
        tracker.apply_fetch(&FetchedTimes {
            dhuhr: Some(at(13, 0, 30)),
            maghrib: None,
        });
        assert_eq!(tracker.events()[0].notify_count, 1);
        assert_eq!(tracker.events()[0].target, Some(at(13, 0, 30)));
    }

    #[test]
    fn test_new_day_refresh_resets_occurrence_state() {
        let mut tracker = tracker_with_dhuhr(at(13, 0, 0));
        for minute in 0..10 {
            tracker.update(at(13, minute, 30));
        }
        tracker.acknowledge(PrayerName::Dhuhr, true);

        let next_day = Local.with_ymd_and_hms(2024, 3, 2, 13, 1, 0).unwrap();
        tracker.apply_fetch(&FetchedTimes {
            dhuhr: Some(next_day),
            maghrib: None,
        });
        let ev = tracker.events()[0];
        assert_eq!(ev.notify_count, 0);
        assert_eq!(ev.last_notify, None);
        assert!(!ev.acknowledged);
        assert!(!ev.prompted);
        assert!(!ev.escalated);
    }

    #[test]
    fn test_fetch_miss_leaves_event_untouched() {
        let mut tracker = tracker_with_dhuhr(at(13, 0, 0));
        tracker.update(at(13, 0, 1));
        tracker.apply_fetch(&FetchedTimes::default());
        assert_eq!(tracker.events()[0].target, Some(at(13, 0, 0)));
        assert_eq!(tracker.events()[0].notify_count, 1);
    }

    #[test]
    fn test_nearest_picks_smallest_distance() {
        let mut tracker = ReminderTracker::new(20, 5, true);
        tracker.apply_fetch(&FetchedTimes {
            dhuhr: Some(at(13, 0, 0)),
            maghrib: Some(at(18, 30, 0)),
        });
        assert_eq!(tracker.nearest(at(14, 0, 0)), Some(PrayerName::Dhuhr));
        assert_eq!(tracker.nearest(at(17, 0, 0)), Some(PrayerName::Maghrib));
    }

    #[test]
    fn test_nearest_tie_breaks_to_first_event() {
        let mut tracker = ReminderTracker::new(20, 5, true);
        tracker.apply_fetch(&FetchedTimes {
            dhuhr: Some(at(13, 0, 0)),
            maghrib: Some(at(15, 0, 0)),
        });
        // exactly halfway between the two
        assert_eq!(tracker.nearest(at(14, 0, 0)), Some(PrayerName::Dhuhr));
    }

    #[test]
    fn test_nearest_ignores_unknown_targets() {
        let mut tracker = ReminderTracker::new(20, 5, true);
        assert_eq!(tracker.nearest(at(12, 0, 0)), None);
        tracker.apply_fetch(&FetchedTimes {
            dhuhr: None,
            maghrib: Some(at(18, 30, 0)),
        });
        assert_eq!(tracker.nearest(at(9, 0, 0)), Some(PrayerName::Maghrib));
    }
}
