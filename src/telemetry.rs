use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

pub fn init() -> Result<()> {
  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  fmt().with_env_filter(env_filter).with_target(true).init();
  Ok(())
}

/// Test-friendly variant: routes output through the capture writer and
/// tolerates repeated initialisation across test binaries.
pub fn init_for_tests() {
  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let _ = fmt()
    .with_env_filter(env_filter)
    .with_target(false)
    .without_time()
    .with_test_writer()
    .try_init();
}
