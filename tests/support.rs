// Helpers shared by the integration tests that run a full logging session.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serial_logger::{CancelToken, Phase, Session, SessionConfig};

// A session running on its own thread.
pub struct RunningSession {
    cancel: CancelToken,
    handle: JoinHandle<(serial_logger::Result<()>, Phase)>,
}

impl RunningSession {
    pub fn start(config: SessionConfig) -> Self {
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let handle = thread::spawn(move || {
            let mut session = Session::new(config);
            let result = session.run(&token);
            (result, session.phase())
        });
        RunningSession { cancel, handle }
    }

    // Cancels the session and waits for it to close.
    pub fn stop(self) -> (serial_logger::Result<()>, Phase) {
        self.cancel.cancel();
        self.handle.join().unwrap()
    }
}

// Log files in `dir`, sorted by name.
pub fn log_files<P: AsRef<Path>>(dir: P) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().map_or(false, |ext| ext == "txt"))
        .collect();
    files.sort();
    files
}

// Polls the log files in `dir` until they hold at least `count` lines or `timeout` has passed.
pub fn wait_for_lines<P: AsRef<Path>>(dir: P, count: usize, timeout: Duration) -> Vec<String> {
    let end = Instant::now() + timeout;

    loop {
        let lines: Vec<String> = log_files(&dir)
            .iter()
            .flat_map(|path| {
                fs::read_to_string(path)
                    .unwrap_or_default()
                    .lines()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect();

        if lines.len() >= count || Instant::now() > end {
            return lines;
        }

        thread::sleep(Duration::from_millis(50));
    }
}
