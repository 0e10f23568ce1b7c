pub mod server;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        frontend_base_url: String,
        session_ttl_seconds: i64,
        lockout_threshold: i32,
        lockout_window_seconds: i64,
        reset_token_ttl_seconds: i64,
        store_timeout_ms: u64,
    },
}
