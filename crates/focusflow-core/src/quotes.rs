//! Motivational lines shown while the timer runs.

use rand::seq::SliceRandom;
use rand::Rng;

/// Shown instead of a quote while the timer is paused.
pub const IDLE_PROMPT: &str = "Ready to focus?";

pub const QUOTES: [&str; 10] = [
    "Focus on a process!",
    "You can do it! 😊",
    "Stay present.",
    "One step at a time.",
    "Breathe and focus.",
    "Make it happen.",
    "Keep the momentum.",
    "Small steps, big progress.",
    "Trust the process.",
    "Here and now.",
];

/// Pick a quote using `rng`.
pub fn pick<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    QUOTES.choose(rng).copied().unwrap_or(QUOTES[0])
}

/// Pick a quote from the thread-local generator.
pub fn random_quote() -> &'static str {
    pick(&mut rand::thread_rng())
}

/// Line to display for the given running state.
pub fn headline(is_active: bool, quote: &'static str) -> &'static str {
    if is_active {
        quote
    } else {
        IDLE_PROMPT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn picks_from_the_list() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            assert!(QUOTES.contains(&pick(&mut rng)));
        }
        assert!(QUOTES.contains(&random_quote()));
    }

    #[test]
    fn paused_timer_shows_prompt() {
        assert_eq!(headline(false, QUOTES[3]), "Ready to focus?");
        assert_eq!(headline(true, QUOTES[3]), "One step at a time.");
    }
}
