use std::sync::Arc;
use crate::models::{Spending, User};
use crate::rate_limit::Registry;
use crate::store::Store;
// app's shared state

pub struct AppState {
    pub users: Store<User>,
    pub spendings: Store<Spending>,
    pub limiter: Arc<Registry>, // shared with the idle sweeper
}

impl AppState {
    pub fn new(limiter: Arc<Registry>) -> Self {
        Self {
            users: Store::new("user"),
            spendings: Store::new("spending"),
            limiter,
        }
    }
}
