use chrono::NaiveDate;

/// Per-strategy count of executed trades for the current trading day.
///
/// Resets to 0 exactly once per date change; never decreases otherwise.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DailyTradeCounter {
    last_date: Option<NaiveDate>,
    count: u32,
}

impl DailyTradeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Day rollover. Returns `true` when `date` differs from the last
    /// processed date and the count was reset.
    pub fn tick(&mut self, date: NaiveDate) -> bool {
        if self.last_date == Some(date) {
            return false;
        }
        self.last_date = Some(date);
        self.count = 0;
        true
    }

    /// Count one executed trade.
    pub fn record(&mut self) {
        self.count = self.count.saturating_add(1);
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn limit_reached(&self, max_daily_trades: u32) -> bool {
        self.count >= max_daily_trades
    }

    pub fn last_processed_date(&self) -> Option<NaiveDate> {
        self.last_date
    }
}
