// ABOUTME: Turns submit_sm_resp and delivery receipt bodies into caller callbacks
// ABOUTME: Callbacks run on their own tasks so slow handlers never stall the read loop

use regex::Regex;
use std::sync::{Arc, LazyLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Called with (domain id, command_status, SMSC message id)
pub type SubmitHandler = Arc<dyn Fn(u32, u32, String) + Send + Sync>;

/// Called with (SMSC message id, final status keyword such as `DELIVRD`)
pub type DeliverHandler = Arc<dyn Fn(String, String) + Send + Sync>;

static RECEIPT: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"(?s)id:(.+?) .* stat:([A-Z]+)").unwrap()
});

/// Fields extracted from an SMSC delivery receipt text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub smsc_id: String,
    pub status: String,
}

impl DeliveryReceipt {
    /// Parses `id:<id> ... stat:<STATUS>`. Bodies with zero or several
    /// receipts in them are rejected.
    pub fn parse(body: &str) -> Option<Self> {
        let mut matches = RECEIPT.captures_iter(body);
        let captures = matches.next()?;
        if matches.next().is_some() {
            return None;
        }

        Some(DeliveryReceipt {
            smsc_id: captures[1].to_string(),
            status: captures[2].to_string(),
        })
    }
}

/// Routes correlated events to the registered handlers
#[derive(Clone, Default)]
pub struct Correlator {
    submit: Option<SubmitHandler>,
    deliver: Option<DeliverHandler>,
}

impl Correlator {
    pub fn new(submit: Option<SubmitHandler>, deliver: Option<DeliverHandler>) -> Self {
        Self { submit, deliver }
    }

    pub fn set_submit_handler(&mut self, handler: SubmitHandler) {
        self.submit = Some(handler);
    }

    pub fn set_deliver_handler(&mut self, handler: DeliverHandler) {
        self.deliver = Some(handler);
    }

    /// A submit_sm_resp arrived. Sequence 0 belongs to a non-final part and
    /// is ignored.
    pub fn on_submit_response(
        &self,
        sequence_number: u32,
        status: u32,
        smsc_id: String,
    ) -> Option<JoinHandle<()>> {
        if sequence_number == 0 {
            return None;
        }

        info!(domain_id = sequence_number, %smsc_id, status, "submit_sm_resp");

        let Some(handler) = self.submit.clone() else {
            debug!(domain_id = sequence_number, "no submit handler bound");
            return None;
        };

        Some(tokio::spawn(async move {
            handler(sequence_number, status, smsc_id);
        }))
    }

    /// A deliver_sm body arrived. Anything that is not exactly one receipt
    /// is logged and dropped.
    pub fn on_delivery(&self, body: &str) -> Option<JoinHandle<()>> {
        let Some(receipt) = DeliveryReceipt::parse(body) else {
            warn!(body, "deliver_sm is not a delivery receipt");
            return None;
        };

        info!(smsc_id = %receipt.smsc_id, status = %receipt.status, "delivery receipt");

        let Some(handler) = self.deliver.clone() else {
            debug!(smsc_id = %receipt.smsc_id, "no deliver handler bound");
            return None;
        };

        Some(tokio::spawn(async move {
            handler(receipt.smsc_id, receipt.status);
        }))
    }
}
