use crate::env;
use crate::formatter::Formatter;
use crate::handler::CaptureHandler;
use crate::layer::CaptureLayer;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the global subscriber installed by [`init_tracing`].
///
/// **Fields**
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   added next to [`CaptureLayer`] so events are also printed to the
///   console.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self { enable_stdout: true }
    }
}

impl LayerConfig {
    /// Defaults overridden by `CLOUD_LOG_STDOUT` when set.
    pub fn from_env() -> Self {
        let defaults = LayerConfig::default();
        LayerConfig {
            enable_stdout: env::env_flag(env::CLOUD_LOG_STDOUT_ENV, defaults.enable_stdout),
        }
    }
}

/// Install a global `tracing` subscriber that routes every event through
/// `handler`.
///
/// **Effects**
///
/// Installs a [`Registry`] combined with [`CaptureLayer`] as the global
/// default subscriber. Fails if a global subscriber is already set.
pub fn init_tracing_with_config<F: Formatter>(
    handler: CaptureHandler<F>,
    config: LayerConfig,
) -> Result<(), SetGlobalDefaultError> {
    let layer = CaptureLayer::new(handler);

    // The two subscriber shapes have different types, hence two branches.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)
    }
}

/// Equivalent to [`init_tracing_with_config`] with
/// [`LayerConfig::from_env`]. This is the recommended entrypoint for
/// typical services.
pub fn init_tracing<F: Formatter>(handler: CaptureHandler<F>) -> Result<(), SetGlobalDefaultError> {
    init_tracing_with_config(handler, LayerConfig::from_env())
}
