use anyhow::{Context, Result};
use chrono::Local;
use log::{error, warn};
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time;

mod config;
mod constants;
mod fetch;
mod lockscreen;
mod notify;
mod tracker;
mod types;
mod window;

use config::Config;
use constants::UI_TICK_MILLIS;
use tracker::ReminderTracker;
use types::{lock_state, Action, AppState, UiEvent};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = Config::load().context("Failed to load configuration")?;
    let client = Client::new();

    let tracker = ReminderTracker::new(
        config.notify_interval_secs,
        config.escalation_threshold,
        config.escalation_enabled,
    );
    let state = Arc::new(Mutex::new(AppState::new(tracker)));
    let escalating = Arc::new(AtomicBool::new(false));

    let (ui_tx, ui_rx) = mpsc::channel();

    // The status window runs its own blocking X11 loop
    {
        let state = Arc::clone(&state);
        std::thread::spawn(move || {
            if let Err(e) = window::run(state, ui_tx) {
                error!("Status window exited: {:#}", e);
            }
        });
    }

    // Periodic fetch of prayer times; the first tick fires immediately
    {
        let state = Arc::clone(&state);
        let client = client.clone();
        let config = config.clone();
        tokio::spawn(async move {
            let mut interval =
                time::interval(Duration::from_secs(config.fetch_interval_secs.max(1)));
            loop {
                interval.tick().await;
                refresh_times(&client, &config, &state).await;
            }
        });
    }

    // Tick loop: drain button presses, run the tracker, execute its actions
    let mut tick = time::interval(Duration::from_millis(UI_TICK_MILLIS));
    loop {
        tick.tick().await;

        while let Ok(event) = ui_rx.try_recv() {
            if event == UiEvent::Refresh {
                refresh_times(&client, &config, &state).await;
            } else {
                handle_ui_event(event, &state);
            }
        }

        let actions = {
            let mut st = lock_state(&state);
            st.tracker.update(Local::now())
        };
        for action in actions {
            run_action(action, &config, &state, &escalating);
        }
    }
}

async fn refresh_times(client: &Client, config: &Config, state: &Arc<Mutex<AppState>>) {
    match fetch::fetch_prayer_times(
        client,
        &config.api_url,
        config.dhuhr_hours,
        config.maghrib_hours,
    )
    .await
    {
        Ok(times) => {
            let mut st = lock_state(state);
            st.tracker.apply_fetch(&times);
            st.log_msg("اوقات شرعی بروز شد.");
        }
        Err(e) => {
            warn!("Failed to fetch prayer times: {:#}", e);
            lock_state(state).log_msg("خطا در دریافت اوقات شرعی.");
        }
    }
}

fn handle_ui_event(event: UiEvent, state: &Mutex<AppState>) {
    let mut st = lock_state(state);
    match event {
        // needs async, handled by the tick loop directly
        UiEvent::Refresh => {}
        UiEvent::NotificationsOn => {
            st.tracker.toggle_notifications(true);
            st.log_msg("اعلان‌ها روشن شدند.");
        }
        UiEvent::NotificationsOff => {
            st.tracker.toggle_notifications(false);
            st.log_msg("اعلان‌ها خاموش شدند.");
        }
        UiEvent::ToggleEscalation => {
            let target = !st.tracker.escalation_enabled();
            st.pending_escalation_toggle = Some(target);
        }
        UiEvent::ConfirmEscalation => {
            if let Some(enable) = st.pending_escalation_toggle.take() {
                st.tracker.set_escalation(enable);
                st.log_msg(if enable {
                    "قفل خودکار روشن شد."
                } else {
                    "قفل خودکار خاموش شد."
                });
            }
        }
        UiEvent::CancelEscalation => {
            st.pending_escalation_toggle = None;
        }
        UiEvent::Acknowledge(name, done) => {
            st.tracker.acknowledge(name, done);
            st.pending_ack = None;
            if done {
                st.log_msg(&format!("نماز {} ثبت شد.", name.as_str()));
            }
        }
    }
}

fn run_action(
    action: Action,
    config: &Config,
    state: &Arc<Mutex<AppState>>,
    escalating: &Arc<AtomicBool>,
) {
    match action {
        Action::Notify(name) => {
            notify::send_prayer_notification(name);
            let mut st = lock_state(state);
            let count = st
                .tracker
                .events()
                .iter()
                .find(|e| e.name == name)
                .map(|e| e.notify_count)
                .unwrap_or(0);
            let threshold = st.tracker.escalation_threshold();
            st.log_msg(&format!(
                "اعلان {} ارسال شد ({}/{})",
                name.as_str(),
                count,
                threshold
            ));
        }
        Action::PromptAck(name) => {
            lock_state(state).pending_ack = Some(name);
        }
        Action::Escalate(_) => {
            // one escalation sequence at a time
            if escalating
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return;
            }
            lock_state(state).log_msg("سیستم قفل می‌شود! برای نماز بلند شوید.");
            let hold = config.pointer_hold_secs;
            let delay = config.lock_delay_secs;
            let escalating = Arc::clone(escalating);
            tokio::spawn(async move {
                let joined =
                    tokio::task::spawn_blocking(move || lockscreen::escalate(hold, delay)).await;
                if let Err(e) = joined {
                    warn!("Escalation task failed: {}", e);
                }
                escalating.store(false, Ordering::SeqCst);
            });
        }
    }
}
