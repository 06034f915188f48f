use std::time::{Duration, Instant};

use a8remote_core::core::machine::Machine;
use a8remote_core::server::Remote;

/// NTSC frame period (~59.92 Hz).
pub const FRAME_PERIOD: Duration = Duration::from_nanos(16_688_154);

pub struct RunOptions {
    /// Stop after this many frames.
    pub frames: Option<u64>,
    /// Skip real-time pacing.
    pub turbo: bool,
}

/// Drive the machine until the frame limit is reached (forever without one).
/// Returns the number of frames run.
///
/// With a remote attached, each frame goes through [`Remote::frame`], which
/// blocks while a client holds the machine paused. Pacing restarts from the
/// moment control comes back so a long pause does not cause a catch-up burst.
pub fn run(machine: &mut dyn Machine, mut remote: Option<&mut Remote>, opts: &RunOptions) -> u64 {
    let mut frames = 0u64;
    let mut deadline = Instant::now() + FRAME_PERIOD;

    loop {
        if opts.frames.is_some_and(|limit| frames >= limit) {
            break;
        }

        let started = Instant::now();
        match remote.as_deref_mut() {
            Some(remote) => remote.frame(machine),
            None => {
                machine.poll_input();
                machine.run_frame();
            }
        }
        frames += 1;

        if opts.turbo {
            continue;
        }
        let now = Instant::now();
        if now.duration_since(started) > FRAME_PERIOD * 4 {
            deadline = now + FRAME_PERIOD;
            continue;
        }
        if let Some(wait) = deadline.checked_duration_since(now) {
            std::thread::sleep(wait);
        }
        deadline += FRAME_PERIOD;
        if deadline < now {
            deadline = now + FRAME_PERIOD;
        }
    }

    log::debug!("Runner stopped after {frames} frames");
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use a8remote_machines::HeadlessMachine;

    #[test]
    fn frame_limit_is_honoured() {
        let mut machine = HeadlessMachine::new();
        let opts = RunOptions {
            frames: Some(5),
            turbo: true,
        };
        assert_eq!(run(&mut machine, None, &opts), 5);
        assert_eq!(machine.frame_count(), 5);
    }

    #[test]
    fn paced_run_takes_real_time() {
        let mut machine = HeadlessMachine::new();
        let opts = RunOptions {
            frames: Some(3),
            turbo: false,
        };
        let started = Instant::now();
        run(&mut machine, None, &opts);
        assert!(started.elapsed() >= FRAME_PERIOD * 2);
    }

    #[test]
    fn remote_free_running_advances_frames() {
        let dir = tempfile::tempdir().unwrap();
        let config = a8remote_core::config::RemoteConfig {
            enabled: true,
            socket_path: dir.path().join("runner.sock"),
            start_running: true,
            ..Default::default()
        };
        let mut machine = HeadlessMachine::new();
        let mut remote = Remote::bind(&config, &mut machine).unwrap();
        let opts = RunOptions {
            frames: Some(4),
            turbo: true,
        };
        assert_eq!(run(&mut machine, Some(&mut remote), &opts), 4);
        assert_eq!(machine.frame_count(), 4);
    }
}
