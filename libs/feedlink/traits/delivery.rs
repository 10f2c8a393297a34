/// A raw frame received from the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Topic routing key, e.g. `hi.-.live.odds_change.1.sr:match.123.-`
    pub routing_key: String,
    /// Undecoded message body
    pub body: Vec<u8>,
    /// Broker timestamp in milliseconds since epoch, when the broker set one
    pub timestamp: Option<i64>,
}

impl Delivery {
    pub fn new(routing_key: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            routing_key: routing_key.into(),
            body: body.into(),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}
