use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use std::process::Command;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::protocol::Event;
use x11rb::CURRENT_TIME;

use crate::constants::{ALERT_COLOR, BG_COLOR, FONT_NAME, TEXT_COLOR};

const HOLD_WIN_WIDTH: u16 = 400;
const HOLD_WIN_HEIGHT: u16 = 200;

/// Run the full escalation sequence: hold the pointer at screen center for
/// `hold_secs`, then lock the session. Blocking; call from a dedicated
/// thread. Every failure is best-effort logged, never fatal.
pub fn escalate(hold_secs: u64, lock_delay_secs: u64) {
    info!(
        "Escalating: holding pointer for {}s before locking the session",
        hold_secs
    );
    if let Err(e) = hold_pointer(hold_secs) {
        warn!("Pointer hold failed: {:#}", e);
    }
    lock_session(lock_delay_secs);
}

/// Pin the pointer to the center of the screen for `seconds`, showing a
/// small countdown window. Key presses are ignored; the hold always runs
/// to completion.
pub fn hold_pointer(seconds: u64) -> Result<()> {
    // Connect to the X server
    let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X server")?;

    let conn = Arc::new(conn);
    let screen = &conn.setup().roots[screen_num];

    // Small centered window for the countdown
    let win = conn.generate_id()?;
    let values = CreateWindowAux::new()
        .background_pixel(BG_COLOR)
        .override_redirect(1)
        .event_mask(EventMask::EXPOSURE | EventMask::KEY_PRESS);

    conn.create_window(
        screen.root_depth,
        win,
        screen.root,
        0,
        0,
        HOLD_WIN_WIDTH,
        HOLD_WIN_HEIGHT,
        0,
        WindowClass::INPUT_OUTPUT,
        screen.root_visual,
        &values,
    )?;

    // Hide the cursor while it is pinned
    let cursor = create_invisible_cursor(&conn, win)?;
    let values = ChangeWindowAttributesAux::new().cursor(cursor);
    conn.change_window_attributes(win, &values)?;

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

    // Grab keyboard and mouse for the duration of the hold
    grab_keyboard_and_pointer(&conn, screen)?;

    conn.map_window(win)?;

    // Center the window on screen
    let x = (screen.width_in_pixels as i16 - HOLD_WIN_WIDTH as i16) / 2;
    let y = (screen.height_in_pixels as i16 - HOLD_WIN_HEIGHT as i16) / 2;
    let values = ConfigureWindowAux::new().x(x as i32).y(y as i32);
    conn.configure_window(win, &values)?;
    conn.flush()?;

    let center_x = (screen.width_in_pixels / 2) as i16;
    let center_y = (screen.height_in_pixels / 2) as i16;
    let hold = Duration::from_secs(seconds);
    let start = Instant::now();

    while start.elapsed() < hold {
        // Drain events; key presses are ignored
        while let Ok(Some(event)) = conn.poll_for_event() {
            match event {
                Event::KeyPress(_) => {}
                Event::Expose(_) => {}
                _ => {}
            }
        }

        // Keep the pointer pinned
        conn.warp_pointer(x11rb::NONE, screen.root, 0, 0, 0, 0, center_x, center_y)?;

        // Redraw the countdown
        let remaining = hold.saturating_sub(start.elapsed());
        let countdown_text = format!(
            "Remaining: {}:{:02}",
            remaining.as_secs() / 60,
            remaining.as_secs() % 60
        );

        conn.clear_area(true, win, 0, 0, 0, 0)?;
        draw_hold_text(&conn, win, gc, "Prayer time has passed", 50, 50, ALERT_COLOR)?;
        draw_hold_text(&conn, win, gc, &countdown_text, 50, 90, TEXT_COLOR)?;
        draw_hold_text(
            &conn,
            win,
            gc,
            "The screen unlocks when the timer ends",
            50,
            130,
            TEXT_COLOR,
        )?;
        conn.flush()?;

        thread::sleep(Duration::from_millis(100));
    }

    conn.ungrab_keyboard(CURRENT_TIME)?;
    conn.ungrab_pointer(CURRENT_TIME)?;
    conn.unmap_window(win)?;
    conn.destroy_window(win)?;
    conn.flush()?;

    Ok(())
}

/// Lock the session after a short delay. Tries loginctl first, then the
/// xdg screensaver fallback; best-effort.
pub fn lock_session(delay_secs: u64) {
    thread::sleep(Duration::from_secs(delay_secs));

    let candidates: [(&str, &[&str]); 2] = [
        ("loginctl", &["lock-session"]),
        ("xdg-screensaver", &["lock"]),
    ];

    for (cmd, args) in candidates {
        match Command::new(cmd).args(args).status() {
            Ok(status) if status.success() => {
                info!("Session locked via {}", cmd);
                return;
            }
            Ok(status) => warn!("{} exited with {}", cmd, status),
            Err(e) => warn!("Failed to run {}: {}", cmd, e),
        }
    }

    warn!("Could not lock the session with any known command");
}

fn grab_keyboard_and_pointer(
    conn: &Arc<x11rb::rust_connection::RustConnection>,
    screen: &Screen,
) -> Result<()> {
    // Try to grab keyboard and mouse for 600ms, similar to slock
    for _ in 0..6 {
        let kb_grab = conn
            .grab_keyboard(
                false,
                screen.root,
                CURRENT_TIME,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
            )?
            .reply();

        let ptr_grab = conn
            .grab_pointer(
                false,
                screen.root,
                EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                x11rb::NONE,
                x11rb::NONE,
                CURRENT_TIME,
            )?
            .reply();

        if let (Ok(kb), Ok(ptr)) = (&kb_grab, &ptr_grab) {
            if kb.status == GrabStatus::SUCCESS && ptr.status == GrabStatus::SUCCESS {
                return Ok(());
            }
        }

        thread::sleep(Duration::from_millis(100));
    }

    Err(anyhow!("Failed to grab keyboard and mouse"))
}

fn draw_hold_text(
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

// Create an invisible cursor
fn create_invisible_cursor(
    conn: &Arc<x11rb::rust_connection::RustConnection>,
    win: Window,
) -> Result<Cursor> {
    let cursor = conn.generate_id()?;
    let pixmap = conn.generate_id()?;

    // Create a 1x1 pixmap for the invisible cursor
    conn.create_pixmap(1, pixmap, win, 1, 1)?;

    // Create an empty cursor
    conn.create_cursor(
        cursor,
        pixmap,
        pixmap,
        0, 0, 0, // Foreground color (RGB)
        0, 0, 0, // Background color (RGB)
        0, 0, // X and Y position
    )?;

    conn.free_pixmap(pixmap)?;

    Ok(cursor)
}
