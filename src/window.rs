use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::protocol::Event;

use crate::constants::{
    BG_COLOR, BUTTON_COLOR, FONT_NAME, HEADER_COLOR, LOG_VISIBLE_LINES, MARKER_COLOR, TEXT_COLOR,
};
use crate::types::{lock_state, AppState, UiEvent};

const WIN_WIDTH: u16 = 480;
const WIN_HEIGHT: u16 = 380;
const CHAR_WIDTH: i16 = 7; // the fixed font is 7x13
const BUTTON_HEIGHT: i16 = 16;

const HEADER_Y: i16 = 28;
const TABLE_Y: i16 = 64;
const ROW_STEP: i16 = 22;
const BUTTON_ROW_Y: i16 = 128;
const PROMPT_Y: i16 = 158;
const LOG_LABEL_Y: i16 = 192;
const LOG_Y: i16 = 212;
const LOG_STEP: i16 = 18;

// A clickable label; `y` is the text baseline
struct Button {
    x: i16,
    y: i16,
    width: i16,
    label: String,
    event: UiEvent,
}

impl Button {
    fn contains(&self, px: i16, py: i16) -> bool {
        px >= self.x && px < self.x + self.width && py > self.y - BUTTON_HEIGHT && py <= self.y + 4
    }
}

fn make_button(x: i16, y: i16, label: &str, event: UiEvent) -> Button {
    let label = format!("[{}]", label);
    let width = (label.len() as i16) * CHAR_WIDTH;
    Button {
        x,
        y,
        width,
        label,
        event,
    }
}

/// The status window: a two-row table (time, countdown), control buttons,
/// the acknowledgement/confirmation prompts and the log pane. Blocking;
/// runs on its own thread and reports button presses back over `events`.
pub fn run(state: Arc<Mutex<AppState>>, events: Sender<UiEvent>) -> Result<()> {
    // Connect to the X server
    let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X server")?;

    let conn = Arc::new(conn);
    let screen = &conn.setup().roots[screen_num];

    let win = conn.generate_id()?;
    let values = CreateWindowAux::new()
        .background_pixel(BG_COLOR)
        .event_mask(EventMask::EXPOSURE | EventMask::BUTTON_PRESS);

    conn.create_window(
        screen.root_depth,
        win,
        screen.root,
        0,
        0,
        WIN_WIDTH,
        WIN_HEIGHT,
        0,
        WindowClass::INPUT_OUTPUT,
        screen.root_visual,
        &values,
    )?;

    conn.change_property8(
        PropMode::REPLACE,
        win,
        AtomEnum::WM_NAME,
        AtomEnum::STRING,
        b"bilal - azan reminder",
    )?;

    // Load font
    let font = conn.generate_id()?;
    conn.open_font(font, FONT_NAME.as_bytes())?;

    // Create graphics context
    let gc = conn.generate_id()?;
    let gc_aux = CreateGCAux::new()
        .foreground(TEXT_COLOR)
        .background(BG_COLOR)
        .font(font);
    conn.create_gc(gc, win, &gc_aux)?;

    conn.map_window(win)?;
    conn.flush()?;

    let mut buttons: Vec<Button> = Vec::new();
    let mut last_draw: Option<Instant> = None;

    loop {
        let mut needs_redraw = false;

        while let Ok(Some(event)) = conn.poll_for_event() {
            match event {
                Event::Expose(_) => needs_redraw = true,
                Event::ButtonPress(press) => {
                    let hit = buttons
                        .iter()
                        .find(|b| b.contains(press.event_x, press.event_y))
                        .map(|b| b.event);
                    if let Some(ui_event) = hit {
                        if events.send(ui_event).is_err() {
                            // main loop is gone, nothing left to do
                            return Ok(());
                        }
                        needs_redraw = true;
                    }
                }
                _ => {}
            }
        }

        let stale = last_draw.map_or(true, |t| t.elapsed() >= Duration::from_secs(1));
        if needs_redraw || stale {
            let now = Local::now();
            let (texts, new_buttons) = {
                let st = lock_state(&state);
                compose(&st, now)
            };
            buttons = new_buttons;

            conn.clear_area(false, win, 0, 0, 0, 0)?;
            for (text, x, y, color) in &texts {
                draw_text(&conn, win, gc, text, *x, *y, *color)?;
            }
            for button in &buttons {
                draw_text(&conn, win, gc, &button.label, button.x, button.y, BUTTON_COLOR)?;
            }
            conn.flush()?;
            last_draw = Some(Instant::now());
        }

        thread::sleep(Duration::from_millis(50));
    }
}

// Snapshot the shared state into plain text items and clickable buttons so
// drawing happens without holding the lock.
fn compose(state: &AppState, now: DateTime<Local>) -> (Vec<(String, i16, i16, u32)>, Vec<Button>) {
    let mut texts: Vec<(String, i16, i16, u32)> = Vec::new();
    let mut buttons: Vec<Button> = Vec::new();

    texts.push((
        "Dhuhr & Maghrib azan reminder".to_string(),
        20,
        HEADER_Y,
        HEADER_COLOR,
    ));

    let nearest = state.tracker.nearest(now);
    for (i, ev) in state.tracker.events().iter().enumerate() {
        let y = TABLE_Y + (i as i16) * ROW_STEP;
        if nearest == Some(ev.name) {
            texts.push(("*".to_string(), 10, y, MARKER_COLOR));
        }
        let time_str = match ev.target {
            Some(t) => t.format("%H:%M:%S").to_string(),
            None => "---".to_string(),
        };
        let status = state.tracker.status_text(ev.name, now);
        texts.push((
            format!("{:<8} {:>9}  {}", ev.name.as_str(), time_str, status),
            24,
            y,
            TEXT_COLOR,
        ));
        if ev.target.is_some() && !ev.acknowledged {
            buttons.push(make_button(400, y, "prayed", UiEvent::Acknowledge(ev.name, true)));
        }
    }

    let mut x = 20;
    let escalation_label = format!(
        "escalation: {}",
        if state.tracker.escalation_enabled() {
            "on"
        } else {
            "off"
        }
    );
    let row: [(&str, UiEvent); 4] = [
        ("refresh", UiEvent::Refresh),
        ("notify on", UiEvent::NotificationsOn),
        ("notify off", UiEvent::NotificationsOff),
        (&escalation_label, UiEvent::ToggleEscalation),
    ];
    for (label, event) in row {
        let button = make_button(x, BUTTON_ROW_Y, label, event);
        x += button.width + 12;
        buttons.push(button);
    }

    // at most one prompt at a time; the escalation confirmation wins
    if let Some(enable) = state.pending_escalation_toggle {
        let text = format!("Turn escalation {}?", if enable { "on" } else { "off" });
        let x0 = 20 + (text.len() as i16) * CHAR_WIDTH + 12;
        texts.push((text, 20, PROMPT_Y, HEADER_COLOR));
        let confirm = make_button(x0, PROMPT_Y, "confirm", UiEvent::ConfirmEscalation);
        let cancel = make_button(
            x0 + confirm.width + 12,
            PROMPT_Y,
            "cancel",
            UiEvent::CancelEscalation,
        );
        buttons.push(confirm);
        buttons.push(cancel);
    } else if let Some(name) = state.pending_ack {
        let text = format!("Did you pray {}?", name.as_str());
        let x0 = 20 + (text.len() as i16) * CHAR_WIDTH + 12;
        texts.push((text, 20, PROMPT_Y, HEADER_COLOR));
        let yes = make_button(x0, PROMPT_Y, "yes", UiEvent::Acknowledge(name, true));
        let no = make_button(
            x0 + yes.width + 12,
            PROMPT_Y,
            "no",
            UiEvent::Acknowledge(name, false),
        );
        buttons.push(yes);
        buttons.push(no);
    }

    texts.push(("Log:".to_string(), 20, LOG_LABEL_Y, HEADER_COLOR));
    let skip = state.log.len().saturating_sub(LOG_VISIBLE_LINES);
    for (i, line) in state.log.iter().skip(skip).enumerate() {
        texts.push((line.clone(), 20, LOG_Y + (i as i16) * LOG_STEP, TEXT_COLOR));
    }

    (texts, buttons)
}

// Draw text on the window with the specified color
fn draw_text(
    conn: &Arc<x11rb::rust_connection::RustConnection>,
    win: Window,
    gc: Gcontext,
    text: &str,
    x: i16,
    y: i16,
    color: u32,
) -> Result<()> {
    // Update color
    let values = ChangeGCAux::new().foreground(color);
    conn.change_gc(gc, &values)?;

    // Draw text
    conn.image_text8(win, gc, x, y, text.as_bytes())?;

    Ok(())
}
