use std::env;

/// Circulation policy knobs. Services take this by value so tests can run
/// against `CirculationPolicy::default()` without touching the environment.
#[derive(Clone, Copy, Debug)]
pub struct CirculationPolicy {
    /// Fine accrued per day a loan is overdue, in currency units
    pub fine_per_day: f64,
    /// Default loan length when the caller does not supply a due date
    pub loan_period_days: i64,
    /// How long a reservation holds its place before lapsing
    pub reservation_expiry_days: i64,
    /// Multiplier for estimated queue wait
    pub average_loan_days: i64,
}

impl Default for CirculationPolicy {
    fn default() -> Self {
        Self {
            fine_per_day: 1.00,
            loan_period_days: 14,
            reservation_expiry_days: 7,
            average_loan_days: 14,
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub policy: CirculationPolicy,
}

impl Config {
    pub fn from_env() -> Self {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://openshelf.db?mode=rwc".to_string());

        let defaults = CirculationPolicy::default();
        let policy = CirculationPolicy {
            fine_per_day: env::var("FINE_PER_DAY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.fine_per_day),
            loan_period_days: env::var("LOAN_PERIOD_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.loan_period_days),
            reservation_expiry_days: env::var("RESERVATION_EXPIRY_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.reservation_expiry_days),
            average_loan_days: env::var("AVERAGE_LOAN_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.average_loan_days),
        };

        Self {
            database_url,
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(Vec::new),
            policy,
        }
    }
}
