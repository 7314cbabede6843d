//! Scripted instrument used by the measurement tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use hardware::scpi::{ErrorQueueEntry, OpenOptions, ScpiError, ScpiResult, ScpiSession};
use power_meter::SessionFactory;

#[derive(Debug, Default)]
struct FakeState {
    log: Vec<String>,
    opens: u32,
    closes: u32,
    open_options: Vec<OpenOptions>,
    timeout: Option<Duration>,
    status_checking: Option<bool>,
    busy_polls: u32,
    fetch: String,
    fail_on: Option<String>,
    refuse_open: bool,
}

/// Fake NRP sensor shared between a factory and the sessions it opens.
///
/// `STAT:OPER:COND?` reports `MEASURING` for the configured number of polls,
/// then `0`. `FETCH?` returns the configured response. A command starting
/// with the `fail_on` prefix fails as if the instrument queued an error.
#[derive(Debug, Clone)]
pub struct FakeInstrument {
    state: Arc<Mutex<FakeState>>,
}

impl FakeInstrument {
    pub fn new(fetch: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                fetch: fetch.to_string(),
                ..FakeState::default()
            })),
        }
    }

    pub fn busy_polls(self, polls: u32) -> Self {
        self.state.lock().unwrap().busy_polls = polls;
        self
    }

    pub fn fail_on(self, prefix: &str) -> Self {
        self.state.lock().unwrap().fail_on = Some(prefix.to_string());
        self
    }

    pub fn refuse_open(self) -> Self {
        self.state.lock().unwrap().refuse_open = true;
        self
    }

    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn poll_count(&self) -> usize {
        self.log().iter().filter(|c| *c == "STAT:OPER:COND?").count()
    }

    pub fn opens(&self) -> u32 {
        self.state.lock().unwrap().opens
    }

    pub fn closes(&self) -> u32 {
        self.state.lock().unwrap().closes
    }

    pub fn open_options(&self) -> Vec<OpenOptions> {
        self.state.lock().unwrap().open_options.clone()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.state.lock().unwrap().timeout
    }

    pub fn status_checking(&self) -> Option<bool> {
        self.state.lock().unwrap().status_checking
    }
}

impl SessionFactory for FakeInstrument {
    type Session = FakeSession;

    fn open(&self, resource_name: &str, options: OpenOptions) -> ScpiResult<FakeSession> {
        let mut state = self.state.lock().unwrap();
        if state.refuse_open {
            return Err(ScpiError::ConnectionFailed(format!(
                "Failed to connect to {resource_name}: connection refused"
            )));
        }
        state.opens += 1;
        state.open_options.push(options);
        Ok(FakeSession {
            state: Arc::clone(&self.state),
        })
    }
}

pub struct FakeSession {
    state: Arc<Mutex<FakeState>>,
}

impl FakeSession {
    fn record(&self, command: &str) -> ScpiResult<()> {
        let mut state = self.state.lock().unwrap();
        state.log.push(command.to_string());

        match &state.fail_on {
            Some(prefix) if command.starts_with(prefix.as_str()) => {
                Err(ScpiError::InstrumentStatus {
                    command: command.to_string(),
                    errors: vec![ErrorQueueEntry {
                        code: -222,
                        message: "Data out of range".to_string(),
                    }],
                })
            }
            _ => Ok(()),
        }
    }
}

impl ScpiSession for FakeSession {
    fn write(&mut self, command: &str) -> ScpiResult<()> {
        self.record(command)
    }

    fn query_string(&mut self, command: &str) -> ScpiResult<String> {
        self.record(command)?;

        let mut state = self.state.lock().unwrap();
        match command {
            "STAT:OPER:COND?" => {
                if state.busy_polls > 0 {
                    state.busy_polls -= 1;
                    Ok("16".to_string())
                } else {
                    Ok("0".to_string())
                }
            }
            "FETCH?" => Ok(state.fetch.clone()),
            "*IDN?" => Ok("Rohde&Schwarz,NRP18S,100001,02.50".to_string()),
            _ => Err(ScpiError::Timeout),
        }
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.state.lock().unwrap().timeout = Some(timeout);
    }

    fn set_status_checking(&mut self, enabled: bool) {
        self.state.lock().unwrap().status_checking = Some(enabled);
    }

    fn close(&mut self) -> ScpiResult<()> {
        self.state.lock().unwrap().closes += 1;
        Ok(())
    }
}

/// Two-port fixture with |S21| of -1, -3 and -6 dB at 1, 2 and 4 GHz.
pub const FIXTURE_S2P: &str = "\
! Fixture loss
# GHz S DB R 50
1.0  -30 0  -1.0 0  -1.0 0  -30 0
2.0  -30 0  -3.0 0  -3.0 0  -30 0
4.0  -30 0  -6.0 0  -6.0 0  -30 0
";
