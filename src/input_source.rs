//! Reads raw keyboard events from `libinput` and feeds the chord recognizer,
//! distinguishing the five configured chord keys from everything else.
//!
//! Uses a udev-backed `Libinput` context, the usual `+8` libinput-to-XKB
//! keycode offset, and a `nix::poll`-driven dispatch loop: each decoded key
//! is routed to the five-key chord recognizer instead of being assembled
//! into a shell-command string.

use std::fs::OpenOptions;
use std::os::fd::AsFd;
use std::os::unix::{fs::OpenOptionsExt, io::OwnedFd};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use input::event::keyboard::{KeyState, KeyboardEvent, KeyboardEventTrait};
use input::{Libinput, LibinputInterface};
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use xkbcommon::xkb;

use crate::recognizer::ChordRecognizer;

struct Interface;

impl LibinputInterface for Interface {
    fn open_restricted(&mut self, path: &Path, flags: i32) -> Result<OwnedFd, i32> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(flags)
            .open(path)
            .map(|file| file.into())
            .map_err(|err| err.raw_os_error().unwrap_or(1))
    }

    fn close_restricted(&mut self, _fd: OwnedFd) {}
}

/// The libinput-and-xkb half of the daemon's input side: decodes raw events
/// into keysyms and dispatches them to a [`ChordRecognizer`].
pub struct InputSource {
    libinput: Libinput,
    xkb_state: xkb::State,
    chord_keysyms: [u32; 5],
    pressed: [bool; 5],
    keep_running: Arc<AtomicBool>,
}

impl InputSource {
    /// `chord_keysyms` are the five platform key descriptors (already
    /// resolved to X keysyms) bound to `chord_key_0`..`chord_key_4`.
    pub fn new(chord_keysyms: [u32; 5], keep_running: Arc<AtomicBool>) -> Result<Self> {
        let mut libinput = Libinput::new_with_udev(Interface);
        libinput.udev_assign_seat("seat0").map_err(|_| anyhow!("failed to assign seat 'seat0'"))?;

        let context = xkb::Context::new(xkb::CONTEXT_NO_FLAGS);
        let keymap = xkb::Keymap::new_from_names(&context, "", "", "", "", None, xkb::KEYMAP_COMPILE_NO_FLAGS)
            .ok_or_else(|| anyhow!("failed to create XKB keymap"))?;

        Ok(InputSource {
            libinput,
            xkb_state: xkb::State::new(&keymap),
            chord_keysyms,
            pressed: [false; 5],
            keep_running,
        })
    }

    fn chord_index(&self, keysym: u32) -> Option<u8> {
        self.chord_keysyms.iter().position(|&k| k == keysym).map(|i| i as u8)
    }

    fn handle_event(&mut self, event: &KeyboardEvent, recognizer: &mut ChordRecognizer) {
        let xkb_code: xkb::Keycode = (event.key() + 8).into();
        let keysym: u32 = self.xkb_state.key_get_one_sym(xkb_code).into();

        match event.key_state() {
            KeyState::Pressed => {
                if let Some(index) = self.chord_index(keysym) {
                    self.pressed[index as usize] = true;
                    recognizer.chord_key_down(index);
                } else {
                    recognizer.other_key_pressed(keysym);
                }
            }
            KeyState::Released => {
                if let Some(index) = self.chord_index(keysym) {
                    self.pressed[index as usize] = false;
                    let pressed = self.pressed;
                    recognizer.key_state_changed(move |i| pressed[i as usize], Instant::now());
                }
            }
        }
    }

    /// Runs the event loop until `keep_running` is cleared. Cooperatively
    /// drives the recognizer's release-settle timer alongside libinput
    /// dispatch, waking up exactly when the timer is due rather than
    /// spinning or spawning a timer thread.
    pub fn run(&mut self, recognizer: &mut ChordRecognizer) -> Result<()> {
        log::info!("input source started, waiting for chord key events...");

        while self.keep_running.load(Ordering::SeqCst) {
            let mut fds = [PollFd::new(self.libinput.as_fd(), PollFlags::POLLIN)];
            let timeout = settle_timeout(recognizer.next_deadline());

            match poll(&mut fds, timeout) {
                Ok(_) => {}
                Err(nix::errno::Errno::EINTR) => continue,
                Err(err) => return Err(anyhow!("poll failed: {err}")),
            }

            if let Some(deadline) = recognizer.next_deadline() {
                if Instant::now() >= deadline {
                    recognizer.fire_settle_timer();
                }
            }

            self.libinput.dispatch().context("failed to dispatch libinput events")?;
            for event in &mut self.libinput {
                if let input::Event::Keyboard(kb_event) = event {
                    self.handle_event(&kb_event, recognizer);
                }
            }
        }

        log::info!("input source stopped.");
        Ok(())
    }
}

/// Translates the recognizer's next wake-up instant into a poll timeout,
/// capped to what `PollTimeout` can represent in milliseconds.
fn settle_timeout(deadline: Option<Instant>) -> PollTimeout {
    let Some(deadline) = deadline else {
        return PollTimeout::NONE;
    };
    let remaining = deadline.saturating_duration_since(Instant::now());
    let millis = remaining.as_millis().min(u16::MAX as u128) as u16;
    PollTimeout::from(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_pending_deadline_waits_forever() {
        assert_eq!(settle_timeout(None), PollTimeout::NONE);
    }

    #[test]
    fn an_elapsed_deadline_yields_a_zero_timeout() {
        let past = Instant::now() - Duration::from_millis(50);
        assert_eq!(settle_timeout(Some(past)), PollTimeout::from(0));
    }
}
