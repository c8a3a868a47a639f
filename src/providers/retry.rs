use std::time::Duration;

/// Classification of a failed provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Timeouts, 5xx, 429 - worth retrying.
    Transient,
    /// 401/403 - retrying cannot help.
    Auth,
    /// Other 4xx (unsupported codec, oversized body) - retrying cannot help.
    Payload,
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    Abort,
}

/// Pure backoff policy: `(attempt, class) -> decision`, no clock, no
/// network, so it is testable in isolation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Decide the fate of attempt number `attempt` (1-based) that failed
    /// with `class`. Auth and payload errors abort immediately; transient
    /// errors back off exponentially until the attempt budget is spent.
    pub fn decide(&self, attempt: u32, class: ErrorClass) -> RetryDecision {
        match class {
            ErrorClass::Auth | ErrorClass::Payload => RetryDecision::Abort,
            ErrorClass::Transient => {
                if attempt >= self.max_attempts {
                    return RetryDecision::Abort;
                }
                let exp = attempt.saturating_sub(1).min(16);
                let delay = self
                    .base_delay
                    .saturating_mul(2u32.saturating_pow(exp))
                    .min(self.max_delay);
                RetryDecision::RetryAfter(delay)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_backoff_doubles_until_capped() {
        let policy = RetryPolicy::default();

        assert_eq!(
            policy.decide(1, ErrorClass::Transient),
            RetryDecision::RetryAfter(Duration::from_secs(1))
        );
        assert_eq!(
            policy.decide(2, ErrorClass::Transient),
            RetryDecision::RetryAfter(Duration::from_secs(2))
        );
        assert_eq!(
            policy.decide(3, ErrorClass::Transient),
            RetryDecision::RetryAfter(Duration::from_secs(4))
        );
    }

    #[test]
    fn transient_aborts_after_budget_spent() {
        let policy = RetryPolicy {
            max_attempts: 3,
            ..Default::default()
        };
        assert!(matches!(
            policy.decide(2, ErrorClass::Transient),
            RetryDecision::RetryAfter(_)
        ));
        assert_eq!(policy.decide(3, ErrorClass::Transient), RetryDecision::Abort);
    }

    #[test]
    fn auth_and_payload_never_retry() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.decide(1, ErrorClass::Auth), RetryDecision::Abort);
        assert_eq!(policy.decide(1, ErrorClass::Payload), RetryDecision::Abort);
    }

    #[test]
    fn delay_is_capped_at_max() {
        let policy = RetryPolicy {
            max_attempts: 20,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        };
        assert_eq!(
            policy.decide(10, ErrorClass::Transient),
            RetryDecision::RetryAfter(Duration::from_secs(30))
        );
    }
}
