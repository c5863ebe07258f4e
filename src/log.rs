use once_cell::sync::OnceCell;

static LOG_INIT: OnceCell<()> = OnceCell::new();

/// Idempotent logger init, safe to call at the top of every test.
pub fn init_log() {
    LOG_INIT.get_or_init(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}
