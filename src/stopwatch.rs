use crate::section::SubSection;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StopwatchError {
    #[error("select a target section first")]
    NoTarget,
    #[error("{0} is not timed by hand")]
    Untimed(SubSection),
    #[error("no time has elapsed")]
    NothingElapsed,
}

/// Manual stopwatch for one timed section at a time.
///
/// Time only advances through `tick`, so the owner decides the clock.
#[derive(Debug, Clone, Default)]
pub struct Stopwatch {
    target: Option<SubSection>,
    elapsed: Duration,
    running: bool,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(&self) -> Option<SubSection> {
        self.target
    }

    pub fn set_target(&mut self, sub: SubSection) -> Result<(), StopwatchError> {
        if !sub.is_timed() {
            return Err(StopwatchError::Untimed(sub));
        }
        self.target = Some(sub);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) -> Result<(), StopwatchError> {
        if self.target.is_none() {
            return Err(StopwatchError::NoTarget);
        }
        self.running = true;
        Ok(())
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn toggle(&mut self) -> Result<(), StopwatchError> {
        if self.running {
            self.pause();
            Ok(())
        } else {
            self.start()
        }
    }

    pub fn tick(&mut self, dt: Duration) {
        if self.running {
            self.elapsed += dt;
        }
    }

    pub fn reset(&mut self) {
        self.running = false;
        self.elapsed = Duration::ZERO;
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed.as_secs()
    }

    /// Whole minutes for the target, rounded up, then stops and clears the clock
    pub fn log_and_reset(&mut self) -> Result<(SubSection, u32), StopwatchError> {
        let target = self.target.ok_or(StopwatchError::NoTarget)?;
        let secs = self.elapsed_secs();
        if secs == 0 {
            return Err(StopwatchError::NothingElapsed);
        }
        let minutes = u32::try_from(secs.div_ceil(60)).unwrap_or(u32::MAX);
        self.reset();
        log::debug!("logged {minutes} min ({secs}s) against {target}");
        Ok((target, minutes))
    }

    pub fn format_elapsed(&self) -> String {
        let secs = self.elapsed_secs();
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listening_cannot_be_targeted() {
        let mut sw = Stopwatch::new();
        assert_eq!(
            sw.set_target(SubSection::Lecture1),
            Err(StopwatchError::Untimed(SubSection::Lecture1))
        );
        assert_eq!(sw.target(), None);
    }

    #[test]
    fn test_start_requires_target() {
        let mut sw = Stopwatch::new();
        assert_eq!(sw.start(), Err(StopwatchError::NoTarget));
        sw.set_target(SubSection::Matching).unwrap();
        sw.start().unwrap();
        assert!(sw.is_running());
    }

    #[test]
    fn test_ticks_only_count_while_running() {
        let mut sw = Stopwatch::new();
        sw.set_target(SubSection::Writing).unwrap();
        sw.tick(Duration::from_secs(5));
        assert_eq!(sw.elapsed_secs(), 0);
        sw.toggle().unwrap();
        sw.tick(Duration::from_secs(65));
        sw.toggle().unwrap();
        sw.tick(Duration::from_secs(100));
        assert_eq!(sw.elapsed_secs(), 65);
        assert_eq!(sw.format_elapsed(), "01:05");
    }

    #[test]
    fn test_log_rounds_up_to_whole_minutes() {
        let mut sw = Stopwatch::new();
        sw.set_target(SubSection::BankedCloze).unwrap();
        sw.start().unwrap();
        sw.tick(Duration::from_secs(61));
        assert_eq!(sw.log_and_reset(), Ok((SubSection::BankedCloze, 2)));
        assert_eq!(sw.elapsed_secs(), 0);
        assert!(!sw.is_running());

        sw.start().unwrap();
        sw.tick(Duration::from_secs(120));
        assert_eq!(sw.log_and_reset(), Ok((SubSection::BankedCloze, 2)));
    }

    #[test]
    fn test_log_without_time_is_rejected() {
        let mut sw = Stopwatch::new();
        sw.set_target(SubSection::Translation).unwrap();
        assert_eq!(sw.log_and_reset(), Err(StopwatchError::NothingElapsed));
    }
}
