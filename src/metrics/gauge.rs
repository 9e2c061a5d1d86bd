use crate::metrics::Attachment;

/// A value read on demand from a caller-supplied function.
pub struct Gauge {
    pub(crate) attachment: Attachment,
    supplier: Box<dyn Fn() -> f64 + Send + Sync>,
}

impl Gauge {
    pub(crate) fn new<F>(name: String, supplier: F) -> Gauge
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        Gauge {
            attachment: Attachment::new(name),
            supplier: Box::new(supplier),
        }
    }

    /// Polls the supplier.
    pub fn value(&self) -> f64 { (self.supplier)() }
}
