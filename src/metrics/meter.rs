use crate::{clock::Clock, data::Rates, error::Result, metrics::Attachment};

/// Rate of events, smoothed over 1, 5 and 15 minutes.
pub struct Meter {
    pub(crate) attachment: Attachment,
    rates: Rates,
}

impl Meter {
    pub(crate) fn new(name: String, clock: Clock) -> Meter {
        Meter {
            attachment: Attachment::new(name),
            rates: Rates::new(clock),
        }
    }

    /// Marks a single event.
    pub fn mark(&self) -> Result<()> { self.mark_n(1) }

    /// Marks `n` events.  Negative values are accepted.
    pub fn mark_n(&self, n: i64) -> Result<()> {
        self.attachment.check()?;
        self.rates.mark(n);
        Ok(())
    }

    pub fn count(&self) -> i64 { self.rates.count() }

    pub fn one_minute_rate(&self) -> f64 { self.rates.one_minute_rate() }

    pub fn five_minute_rate(&self) -> f64 { self.rates.five_minute_rate() }

    pub fn fifteen_minute_rate(&self) -> f64 { self.rates.fifteen_minute_rate() }

    pub fn mean_rate(&self) -> f64 { self.rates.mean_rate() }
}

#[cfg(test)]
mod tests {
    use super::Meter;
    use crate::{clock::Clock, error::MetricsError};
    use std::time::Duration;

    #[test]
    fn test_meter_counts_and_rates() {
        let (clock, mock) = Clock::mock();
        let meter = Meter::new("m".to_owned(), clock);

        meter.mark().unwrap();
        meter.mark_n(9).unwrap();
        assert_eq!(meter.count(), 10);

        mock.increment(Duration::from_secs(10));
        assert!((meter.mean_rate() - 1.0).abs() < 1e-9);
        assert!(meter.one_minute_rate() > 0.0);
    }

    #[test]
    fn test_meter_detached() {
        let (clock, _) = Clock::mock();
        let meter = Meter::new("m".to_owned(), clock);
        meter.attachment.detach();
        assert_eq!(meter.mark(), Err(MetricsError::DetachedMetric("m".to_owned())));
        assert_eq!(meter.count(), 0);
    }
}
