use std::time::Duration;
use tokio::time::Instant;

/// Token bucket guarding the tap button. Local only; the store does not
/// rate limit anything.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    tokens: u32,
    max_tokens: u32,
    refill_rate: Duration,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::new_with_limits(20, Duration::from_millis(50))
    }

    pub fn new_with_limits(max_tokens: u32, refill_rate: Duration) -> Self {
        Self {
            tokens: max_tokens, // Start with full bucket
            max_tokens,
            refill_rate: refill_rate.max(Duration::from_millis(1)),
            last_refill: Instant::now(),
        }
    }

    pub fn try_acquire(&mut self) -> bool {
        self.refill_tokens();

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill_tokens(&mut self) {
        let now = Instant::now();
        let time_passed = now.duration_since(self.last_refill);

        if time_passed >= self.refill_rate {
            let periods = (time_passed.as_millis() / self.refill_rate.as_millis())
                .min(self.max_tokens as u128) as u32;
            self.tokens = self.tokens.saturating_add(periods).min(self.max_tokens);
            if self.tokens == self.max_tokens {
                self.last_refill = now;
            } else {
                // Carry the partial period over
                self.last_refill += self.refill_rate * periods;
            }
        }
    }

    pub fn remaining_tokens(&mut self) -> u32 {
        self.refill_tokens();
        self.tokens
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
