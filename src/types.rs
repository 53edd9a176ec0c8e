use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Local};
use log::info;

use crate::constants::LOG_CAPACITY;
use crate::tracker::ReminderTracker;

// Types shared across multiple modules

/// The two tracked prayers: midday and sunset.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PrayerName {
    Dhuhr,
    Maghrib,
}

impl PrayerName {
    // Iteration order doubles as the tie-break order for nearest-event
    // selection.
    pub const ALL: [PrayerName; 2] = [PrayerName::Dhuhr, PrayerName::Maghrib];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrayerName::Dhuhr => "Dhuhr",
            PrayerName::Maghrib => "Maghrib",
        }
    }
}

// Per-occurrence reminder state for one prayer
#[derive(Clone, Copy, Debug)]
pub struct PrayerEvent {
    pub name: PrayerName,
    pub target: Option<DateTime<Local>>,
    pub notify_count: u32,
    pub last_notify: Option<DateTime<Local>>,
    pub acknowledged: bool,
    pub prompted: bool,
    pub escalated: bool,
}

impl PrayerEvent {
    pub fn new(name: PrayerName) -> Self {
        PrayerEvent {
            name,
            target: None,
            notify_count: 0,
            last_notify: None,
            acknowledged: false,
            prompted: false,
            escalated: false,
        }
    }
}

// Commands the tracker asks the outside world to run
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    Notify(PrayerName),
    PromptAck(PrayerName),
    Escalate(PrayerName),
}

// Button presses coming back from the status window
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UiEvent {
    Refresh,
    NotificationsOn,
    NotificationsOff,
    ToggleEscalation,
    ConfirmEscalation,
    CancelEscalation,
    Acknowledge(PrayerName, bool),
}

// Target times extracted from one fetch; a missing prayer stays None and
// leaves the tracked event untouched
#[derive(Clone, Copy, Debug, Default)]
pub struct FetchedTimes {
    pub dhuhr: Option<DateTime<Local>>,
    pub maghrib: Option<DateTime<Local>>,
}

impl FetchedTimes {
    pub fn get(&self, name: PrayerName) -> Option<DateTime<Local>> {
        match name {
            PrayerName::Dhuhr => self.dhuhr,
            PrayerName::Maghrib => self.maghrib,
        }
    }
}

/// Everything the tick loop, the fetch task and the status window share,
/// behind a single mutex.
pub struct AppState {
    pub tracker: ReminderTracker,
    pub log: VecDeque<String>,
    // One-time "did you pray?" prompt currently shown in the window
    pub pending_ack: Option<PrayerName>,
    // Escalation toggle waiting for confirmation; holds the value to apply
    pub pending_escalation_toggle: Option<bool>,
}

impl AppState {
    pub fn new(tracker: ReminderTracker) -> Self {
        AppState {
            tracker,
            log: VecDeque::new(),
            pending_ack: None,
            pending_escalation_toggle: None,
        }
    }

    /// Append a timestamped line to the window log pane and mirror it to
    /// the process log.
    pub fn log_msg(&mut self, msg: &str) {
        info!("{}", msg);
        self.log
            .push_back(format!("{} - {}", Local::now().format("%H:%M:%S"), msg));
        while self.log.len() > LOG_CAPACITY {
            self.log.pop_front();
        }
    }
}

// A poisoned lock still holds consistent counters; recover the guard.
pub fn lock_state(state: &Mutex<AppState>) -> MutexGuard<'_, AppState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
