//! Audible tone capability. Fire-and-forget: the ring must never block or
//! fail the caller, so playback runs on a detached thread and every error
//! is swallowed.

use std::path::Path;
use std::process::{Command, Stdio};

pub trait Bell: Send + Sync {
    fn ring(&self);
}

/// Plays the first available system completion sound.
pub struct SystemBell;

impl Bell for SystemBell {
    fn ring(&self) {
        std::thread::spawn(|| {
            for (command, file) in [
                ("paplay", "/usr/share/sounds/freedesktop/stereo/complete.oga"),
                ("aplay", "/usr/share/sounds/sound-icons/guitar-11.wav"),
                ("aplay", "/usr/share/sounds/generic.wav"),
            ] {
                if Path::new(file).exists() {
                    let _ = Command::new(command)
                        .arg(file)
                        .stdout(Stdio::null())
                        .stderr(Stdio::null())
                        .spawn();
                    break;
                }
            }
        });
    }
}
