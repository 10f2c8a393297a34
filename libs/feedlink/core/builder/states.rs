/// Type-state markers for the builder pattern
///
/// These types are used to track which fields have been set
/// in the builder at compile-time, preventing invalid configurations.

/// Marker trait for Connector state
pub trait ConnectorState {}

/// Connector has not been set
pub struct NoConnector;
impl ConnectorState for NoConnector {}

/// Connector has been set
pub struct HasConnector;
impl ConnectorState for HasConnector {}
