pub(crate) mod fake_target;

/// An error raised by the transport between the probe and the target.
#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum DebugProbeError {
    /// The {access} access to address {address:#010x} was not acknowledged by the target
    TransferFailed {
        /// Kind of access, e.g. `write_16`.
        access: &'static str,
        /// Target address of the failed access.
        address: u64,
    },

    /// You need to be attached to the target to perform this action
    NotAttached,

    /// An error specific to a probe type occurred
    ProbeSpecific(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// An error occurred: {0}
    Other(#[from] anyhow::Error),
}
