use crate::{data::Percentile, source::ConfigSource};
use log::warn;
use std::time::Duration;

/// Property holding per-metric percentile overrides.
pub const PERCENTILES_PROPERTY: &str = "mp.metrics.distribution.percentiles";

/// Property holding per-metric histogram bucket overrides.
pub const HISTOGRAM_BUCKETS_PROPERTY: &str = "mp.metrics.distribution.histogram.buckets";

/// Property holding per-metric timer bucket overrides.
pub const TIMER_BUCKETS_PROPERTY: &str = "mp.metrics.distribution.timer.buckets";

/// Which metric names a rule applies to.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Selector {
    Exact(String),
    Prefix(String),
}

impl Selector {
    fn parse(raw: &str) -> Option<Selector> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(match raw.strip_suffix('*') {
            Some(prefix) => Selector::Prefix(prefix.to_owned()),
            None => Selector::Exact(raw.to_owned()),
        })
    }

    // Higher is more specific; `None` when the selector does not match.
    fn specificity(&self, name: &str) -> Option<usize> {
        match self {
            Selector::Exact(exact) if exact == name => Some(usize::max_value()),
            Selector::Prefix(prefix) if name.starts_with(prefix.as_str()) => Some(prefix.len()),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
struct Rule<T> {
    selector: Selector,
    values: T,
}

/// Distribution settings resolved for a single metric name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resolved {
    /// Percentiles to report; `None` means the registry default, an empty list disables them.
    pub percentiles: Option<Vec<Percentile>>,
    /// Upper bounds for histogram buckets.
    pub histogram_buckets: Vec<f64>,
    /// Upper bounds for timer buckets.
    pub timer_buckets: Vec<Duration>,
}

/// Per-metric percentile and bucket overrides.
///
/// Each setting is a list of `selector=v1,v2,...` rules separated by `;`.  A selector is an exact
/// metric name or a prefix ending in `*`.  For a given name an exact selector beats any prefix,
/// and a longer prefix beats a shorter one.  Invalid values are dropped one by one; the valid
/// values of the same rule still apply.
#[derive(Clone, Debug, Default)]
pub struct DistributionConfig {
    percentiles: Vec<Rule<Vec<Percentile>>>,
    histogram_buckets: Vec<Rule<Vec<f64>>>,
    timer_buckets: Vec<Rule<Vec<Duration>>>,
}

impl DistributionConfig {
    pub fn new() -> DistributionConfig { DistributionConfig::default() }

    /// Reads all three settings from a configuration source.
    pub fn from_source(source: &dyn ConfigSource) -> DistributionConfig {
        let mut config = DistributionConfig::new();
        if let Some(raw) = source.get(PERCENTILES_PROPERTY) {
            config = config.percentiles(&raw);
        }
        if let Some(raw) = source.get(HISTOGRAM_BUCKETS_PROPERTY) {
            config = config.histogram_buckets(&raw);
        }
        if let Some(raw) = source.get(TIMER_BUCKETS_PROPERTY) {
            config = config.timer_buckets(&raw);
        }
        config
    }

    /// Adds percentile rules, e.g. `requests.*=0.5,0.99;latency=`.
    ///
    /// A rule with no values disables percentiles for matching metrics.
    pub fn percentiles(mut self, raw: &str) -> Self {
        for (selector, tokens) in rules(raw) {
            let values: Vec<Percentile> = tokens
                .iter()
                .filter_map(|token| match token.parse::<f64>().ok().map(Percentile::new) {
                    Some(Ok(p)) => Some(p),
                    _ => {
                        warn!("ignoring invalid percentile {:?} for {:?}", token, selector);
                        None
                    },
                })
                .collect();

            if values.is_empty() && !tokens.is_empty() {
                continue;
            }

            let mut values = values;
            values.sort_by(|a, b| a.quantile().total_cmp(&b.quantile()));
            values.dedup();
            self.percentiles.push(Rule { selector, values });
        }
        self
    }

    /// Adds histogram bucket rules, e.g. `sizes*=10,100,1000`.
    pub fn histogram_buckets(mut self, raw: &str) -> Self {
        for (selector, tokens) in rules(raw) {
            let mut values: Vec<f64> = tokens
                .iter()
                .filter_map(|token| match token.parse::<f64>() {
                    Ok(v) if v.is_finite() && v > 0.0 => Some(v),
                    _ => {
                        warn!("ignoring invalid histogram bucket {:?} for {:?}", token, selector);
                        None
                    },
                })
                .collect();
            if values.is_empty() {
                continue;
            }

            values.sort_by(|a, b| a.total_cmp(b));
            values.dedup();
            self.histogram_buckets.push(Rule { selector, values });
        }
        self
    }

    /// Adds timer bucket rules, e.g. `latency=100ms,1s,2m`.
    ///
    /// Durations are an integer followed by `ms`, `s`, `m` or `h`; a bare integer is milliseconds.
    pub fn timer_buckets(mut self, raw: &str) -> Self {
        for (selector, tokens) in rules(raw) {
            let mut values: Vec<Duration> = tokens
                .iter()
                .filter_map(|token| match parse_duration(token) {
                    Some(d) if d > Duration::from_secs(0) => Some(d),
                    _ => {
                        warn!("ignoring invalid timer bucket {:?} for {:?}", token, selector);
                        None
                    },
                })
                .collect();
            if values.is_empty() {
                continue;
            }

            values.sort();
            values.dedup();
            self.timer_buckets.push(Rule { selector, values });
        }
        self
    }

    /// Whether no rule of any kind is configured.
    pub fn is_empty(&self) -> bool {
        self.percentiles.is_empty() && self.histogram_buckets.is_empty() && self.timer_buckets.is_empty()
    }

    /// Resolves the settings that apply to `name`.
    pub fn resolve(&self, name: &str) -> Resolved {
        Resolved {
            percentiles: best(&self.percentiles, name).cloned(),
            histogram_buckets: best(&self.histogram_buckets, name).cloned().unwrap_or_default(),
            timer_buckets: best(&self.timer_buckets, name).cloned().unwrap_or_default(),
        }
    }
}

// Splits `a=1,2;b*=3` into selectors and their trimmed, non-empty value tokens.
fn rules(raw: &str) -> Vec<(Selector, Vec<String>)> {
    let mut out = Vec::new();
    for rule in raw.split(';') {
        if rule.trim().is_empty() {
            continue;
        }

        let mut parts = rule.splitn(2, '=');
        let selector = parts.next().and_then(Selector::parse);
        let values = parts.next();
        match (selector, values) {
            (Some(selector), Some(values)) => {
                let tokens = values
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_owned)
                    .collect();
                out.push((selector, tokens));
            },
            _ => warn!("ignoring malformed distribution rule {:?}", rule),
        }
    }
    out
}

// Most specific matching rule; among equals the last one declared.
fn best<'a, T>(rules: &'a [Rule<T>], name: &str) -> Option<&'a T> {
    let mut winner: Option<(usize, &T)> = None;
    for rule in rules {
        if let Some(score) = rule.selector.specificity(name) {
            if winner.map_or(true, |(best, _)| score >= best) {
                winner = Some((score, &rule.values));
            }
        }
    }
    winner.map(|(_, values)| values)
}

fn parse_duration(token: &str) -> Option<Duration> {
    let split = token.find(|c: char| !c.is_ascii_digit()).unwrap_or(token.len());
    let (digits, unit) = token.split_at(split);
    let amount: u64 = digits.parse().ok()?;

    let duration = match unit {
        "" | "ms" => Duration::from_millis(amount),
        "s" => Duration::from_secs(amount),
        "m" => Duration::from_secs(amount.checked_mul(60)?),
        "h" => Duration::from_secs(amount.checked_mul(3600)?),
        _ => return None,
    };
    Some(duration)
}
