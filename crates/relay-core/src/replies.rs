//! User-facing reply texts.

pub const START_TEXT: &str = "Hello and welcome here!\nUse /help to see how you can use me.";

pub const HELP_TEXT: &str = "You can send me integers to start a timer.\n\
I will send you a message after the timer has finished.";

pub const THINKING: &str = "Let me think about that...";

pub const STILL_THINKING: &str = "I'm still thinking about your last message. 🤔";

pub const APOLOGY: &str = "I'm sorry, but I couldn't think of a response. 😔";

pub const TIMER_FINISHED: &str = "This timer has finished! 🎉";

pub fn timer_started(seconds: u64) -> String {
    format!("Starting timer for {seconds} seconds...")
}
