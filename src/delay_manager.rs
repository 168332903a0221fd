use std::thread;
use std::time::Duration;

use log::debug;
use rand::Rng;

use crate::config::Delays;

/// Action categories that carry a named pacing delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    AfterSend,
    BetweenActions,
    TypingSimulation,
    NewChatSearch,
    SelectResult,
    PostSend,
    Teardown,
}

#[derive(Debug, Clone)]
pub struct Pacer {
    delays: Delays,
}

impl Pacer {
    pub fn new(delays: Delays) -> Self {
        Pacer { delays }
    }

    pub fn base(&self, pace: Pace) -> Duration {
        let ms = match pace {
            Pace::AfterSend => self.delays.after_send_ms,
            Pace::BetweenActions => self.delays.between_actions_ms,
            Pace::TypingSimulation => self.delays.typing_simulation_ms,
            Pace::NewChatSearch => self.delays.new_chat_search_ms,
            Pace::SelectResult => self.delays.select_result_ms,
            Pace::PostSend => self.delays.post_send_ms,
            Pace::Teardown => self.delays.teardown_ms,
        };
        Duration::from_millis(ms)
    }

    /// Base delay plus a random jitter in `0..=jitter_ms`.
    pub fn duration(&self, pace: Pace) -> Duration {
        let base = self.base(pace);
        if self.delays.jitter_ms == 0 {
            return base;
        }
        let mut rng = rand::thread_rng();
        base + Duration::from_millis(rng.gen_range(0..=self.delays.jitter_ms))
    }

    pub fn pause(&self, pace: Pace) {
        let wait = self.duration(pace);
        if wait.is_zero() {
            return;
        }
        debug!("Waiting {} ms ({:?})", wait.as_millis(), pace);
        thread::sleep(wait);
    }
}
