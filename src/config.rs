use std::env;

use crate::domain::services::lottery::DrawPolicy;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub draw_policy: DrawPolicy,
    pub lottery_seed: Option<u64>, // Fixed seed for reproducible draws
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://lottery.db?mode=rwc".to_string()),
            port: env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().expect("PORT must be a number"),
            draw_policy: DrawPolicy {
                auto_enroll_divisor: env::var("AUTO_ENROLL_DIVISOR")
                    .map(|v| v.parse().expect("AUTO_ENROLL_DIVISOR must be a non-negative integer"))
                    .unwrap_or(DrawPolicy::default().auto_enroll_divisor),
            },
            lottery_seed: env::var("LOTTERY_SEED")
                .ok()
                .map(|v| v.parse().expect("LOTTERY_SEED must be a u64")),
        }
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url == "memory"
    }
}
